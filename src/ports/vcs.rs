use std::path::Path;
use std::sync::Arc;

use crate::ports::fs::FileSystem;
use crate::types::GitInfo;

/// Outcome of probing the project root for version control.
#[derive(Debug, Clone, PartialEq)]
pub enum VcsStatus {
    /// No probe is wired in.
    NotConfigured,
    /// The probe looked and found no repository.
    NotARepository,
    Repository(GitInfo),
}

impl VcsStatus {
    /// Git fields for the project overview, if a repository was found.
    pub fn git_info(&self) -> Option<GitInfo> {
        match self {
            VcsStatus::Repository(info) => Some(info.clone()),
            VcsStatus::NotARepository => Some(GitInfo::default()),
            VcsStatus::NotConfigured => None,
        }
    }
}

pub trait VcsProbe: Send + Sync {
    fn probe(&self, root: &Path) -> VcsStatus;
}

/// Probe that is never configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVcsProbe;

impl VcsProbe for NoVcsProbe {
    fn probe(&self, _root: &Path) -> VcsStatus {
        VcsStatus::NotConfigured
    }
}

/// Reads the `.git` directory directly: `HEAD`, loose refs, `packed-refs`,
/// and the `origin` remote from `config`.
///
/// Any read failure degrades to missing fields rather than an error.
pub struct GitDirProbe {
    fs: Arc<dyn FileSystem>,
}

impl GitDirProbe {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    fn resolve_ref(&self, git_dir: &Path, reference: &str) -> Option<String> {
        if let Ok(contents) = self.fs.read_to_string(&git_dir.join(reference)) {
            let sha = contents.trim();
            if !sha.is_empty() {
                return Some(sha.to_string());
            }
        }
        let packed = self.fs.read_to_string(&git_dir.join("packed-refs")).ok()?;
        packed
            .lines()
            .filter(|l| !l.starts_with('#') && !l.starts_with('^'))
            .filter_map(|l| l.split_once(' '))
            .find(|(_, name)| name.trim() == reference)
            .map(|(sha, _)| sha.to_string())
    }

    fn origin_url(&self, git_dir: &Path) -> Option<String> {
        let config = self.fs.read_to_string(&git_dir.join("config")).ok()?;
        parse_origin_url(&config)
    }
}

impl VcsProbe for GitDirProbe {
    fn probe(&self, root: &Path) -> VcsStatus {
        let git_dir = root.join(".git");
        if !self.fs.is_dir(&git_dir) {
            return VcsStatus::NotARepository;
        }

        let mut info = GitInfo {
            is_repository: true,
            ..GitInfo::default()
        };

        if let Ok(head) = self.fs.read_to_string(&git_dir.join("HEAD")) {
            let head = head.trim();
            match head.strip_prefix("ref:") {
                Some(reference) => {
                    let reference = reference.trim();
                    info.branch = Some(
                        reference
                            .strip_prefix("refs/heads/")
                            .unwrap_or(reference)
                            .to_string(),
                    );
                    info.commit = self.resolve_ref(&git_dir, reference);
                }
                None if !head.is_empty() => info.commit = Some(head.to_string()),
                None => {}
            }
        }
        info.remote_url = self.origin_url(&git_dir);

        VcsStatus::Repository(info)
    }
}

/// Extracts the `url` of `[remote "origin"]` from a git config file.
pub fn parse_origin_url(config: &str) -> Option<String> {
    let mut in_origin = false;
    for line in config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_origin = line == "[remote \"origin\"]";
            continue;
        }
        if in_origin {
            if let Some((key, value)) = line.split_once('=') {
                if key.trim() == "url" {
                    return Some(value.trim().to_string());
                }
            }
        }
    }
    None
}
