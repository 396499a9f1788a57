use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::classifier::{detect_framework, detect_language, detect_package_manager};
use crate::analysis::dependencies::{read_dependencies, read_manifest};
use crate::analysis::traversal::{format_system_time, format_unix_secs, Traversal, TreeOptions};
use crate::config::{load_config, ServerConfig};
use crate::errors::{ContextError, Result};
use crate::ports::{
    ChangeHistory, FileSystem, GitDirProbe, LocalFileSystem, NoHistoryBackend,
    NoVulnerabilityScanner, VcsProbe, VulnerabilityScanner,
};
use crate::types::*;

/// Central orchestrator tying the configuration, the capability ports, and
/// the analysis passes to one project root.
///
/// Holds no per-request state: every query recomputes from the file system.
pub struct ProjectContext {
    root: PathBuf,
    config: ServerConfig,
    fs: Arc<dyn FileSystem>,
    vcs: Arc<dyn VcsProbe>,
    history: Arc<dyn ChangeHistory>,
    scanner: Arc<dyn VulnerabilityScanner>,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl ProjectContext {
    /// Opens a project root with its on-disk configuration (or defaults) and
    /// the local file system.
    ///
    /// The root is canonicalized first, so a symlinked root is accepted.
    pub fn open(project_root: &Path) -> Result<Self> {
        let not_a_dir = || {
            ContextError::not_found(format!(
                "project root is not a directory: {}",
                project_root.display()
            ))
        };
        let root = std::fs::canonicalize(project_root).map_err(|_| not_a_dir())?;
        if !LocalFileSystem.is_dir(&root) {
            return Err(not_a_dir());
        }
        let config = load_config(&root)?;
        Ok(Self::with_config(&root, config))
    }

    /// Builds a context from an explicit configuration, with default ports.
    pub fn with_config(project_root: &Path, config: ServerConfig) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem);
        Self {
            root: project_root.to_path_buf(),
            config,
            vcs: Arc::new(GitDirProbe::new(fs.clone())),
            fs,
            history: Arc::new(NoHistoryBackend),
            scanner: Arc::new(NoVulnerabilityScanner),
        }
    }

    pub fn with_vcs_probe(mut self, vcs: Arc<dyn VcsProbe>) -> Self {
        self.vcs = vcs;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn ChangeHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn VulnerabilityScanner>) -> Self {
        self.scanner = scanner;
        self
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

impl ProjectContext {
    /// A traversal over the project root under the configured policy.
    pub fn traversal(&self) -> Traversal<'_> {
        Traversal::new(self.fs.as_ref(), &self.config.traversal, &self.root)
    }

    /// Identity, technology, and aggregate statistics of the project.
    pub fn overview(&self) -> Result<ProjectOverview> {
        let manifest = read_manifest(self.fs.as_ref(), &self.root).unwrap_or_default();
        let stats = self.traversal().collect_stats();
        let package_manager = detect_package_manager(self.fs.as_ref(), &self.root);

        let last_modified = match stats.last_modified {
            Some(secs) => format_unix_secs(secs),
            None => self
                .fs
                .metadata(&self.root)
                .ok()
                .and_then(|m| m.modified)
                .map(format_system_time)
                .unwrap_or_else(|| format_unix_secs(0)),
        };

        Ok(ProjectOverview {
            name: manifest.name.clone().unwrap_or_else(|| self.root_name()),
            version: manifest.version.clone().unwrap_or_else(|| "0.0.0".to_string()),
            description: manifest.description.clone().unwrap_or_default(),
            root_path: self.root.to_string_lossy().to_string(),
            language: detect_language(&stats.extension_counts),
            framework: detect_framework(&manifest),
            package_manager,
            last_modified,
            file_count: stats.file_count,
            size_in_bytes: stats.total_size,
            git: self.vcs.probe(&self.root).git_info(),
        })
    }

    /// The full structure tree.
    pub fn structure(&self) -> ProjectStructureNode {
        self.traversal().build_tree(&TreeOptions::default())
    }

    /// The dependency set for the detected package manager.
    pub fn dependencies(&self) -> DependencySet {
        let manager = detect_package_manager(self.fs.as_ref(), &self.root);
        read_dependencies(self.fs.as_ref(), &self.root, manager.as_deref())
    }

    /// Reads a file relative to the root, bounded by the size ceiling.
    pub fn read_file(&self, rel: &str) -> Result<FileContent> {
        self.traversal().read_file(rel)
    }

    fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string())
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl ProjectContext {
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vcs(&self) -> &dyn VcsProbe {
        self.vcs.as_ref()
    }

    pub fn history(&self) -> &dyn ChangeHistory {
        self.history.as_ref()
    }

    pub fn scanner(&self) -> &dyn VulnerabilityScanner {
        self.scanner.as_ref()
    }
}
