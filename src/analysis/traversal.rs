//! Depth-first walks over the project tree under a [`TraversalPolicy`].
//!
//! Every walk lists a directory at most once, sorts its entries with
//! directories first and then by case-sensitive name, and treats a
//! directory that cannot be listed as having no children.

use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::TraversalPolicy;
use crate::errors::{ContextError, Result};
use crate::ports::fs::{DirEntryInfo, FileSystem};
use crate::types::{EntryKind, FileContent, ProjectStructureNode, TreeStats};

/// Options for [`Traversal::build_tree`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeOptions {
    /// Directory levels to expand below the start node; `None` is unbounded.
    pub max_depth: Option<usize>,
    /// Keep only files whose extension is in this list (case-insensitive,
    /// leading dot optional). Directories are always kept.
    pub extensions: Option<Vec<String>>,
    /// Leave files out of the tree entirely.
    pub directories_only: bool,
}

impl TreeOptions {
    fn accepts_file(&self, name: &str) -> bool {
        if self.directories_only {
            return false;
        }
        match &self.extensions {
            None => true,
            Some(allowed) if allowed.is_empty() => true,
            Some(allowed) => match extension_of(name) {
                Some(ext) => allowed
                    .iter()
                    .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext)),
                None => false,
            },
        }
    }
}

/// Walks one project root through a [`FileSystem`].
pub struct Traversal<'a> {
    fs: &'a dyn FileSystem,
    policy: &'a TraversalPolicy,
    root: &'a Path,
}

impl<'a> Traversal<'a> {
    pub fn new(fs: &'a dyn FileSystem, policy: &'a TraversalPolicy, root: &'a Path) -> Self {
        Self { fs, policy, root }
    }

    pub fn policy(&self) -> &TraversalPolicy {
        self.policy
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    /// Lists `dir`, dropping ignored entries and anything that is neither a
    /// file nor a directory, sorted directories-first then by name.
    ///
    /// Returns `None` if the directory cannot be read.
    pub fn list_dir(&self, dir: &Path) -> Option<Vec<DirEntryInfo>> {
        let mut entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "directory unreadable, treating as empty");
                return None;
            }
        };
        entries.retain(|e| {
            (e.meta.is_dir || e.meta.is_file) && !self.policy.is_ignored(&e.name, e.meta.is_dir)
        });
        entries.sort_by(compare_entries);
        Some(entries)
    }

    /// Single pass collecting file count, total size, latest modification
    /// time, and extension frequencies.
    pub fn collect_stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let _ = self.visit_files(&mut |_: &str, entry: &DirEntryInfo| {
            stats.file_count += 1;
            stats.total_size += entry.meta.len;
            if let Some(secs) = entry.meta.modified.map(unix_secs) {
                stats.last_modified = Some(stats.last_modified.map_or(secs, |m| m.max(secs)));
            }
            if let Some(ext) = extension_of(&entry.name) {
                stats.record_extension(&ext.to_ascii_lowercase());
            }
            ControlFlow::Continue(())
        });
        stats
    }

    /// Builds the structure tree rooted at the project root.
    pub fn build_tree(&self, options: &TreeOptions) -> ProjectStructureNode {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.root.to_string_lossy().to_string());
        let modified = self.fs.metadata(self.root).ok().and_then(|m| m.modified);
        ProjectStructureNode {
            path: String::new(),
            kind: EntryKind::Directory,
            name,
            extension: None,
            size: None,
            last_modified: modified.map(format_system_time),
            children: self.children_of(self.root, "", 0, options),
        }
    }

    /// Builds the tree rooted at a sub-directory given relative to the root.
    pub fn build_subtree(&self, rel: &str, options: &TreeOptions) -> Result<ProjectStructureNode> {
        let abs = self.resolve(rel)?;
        let rel = relative_string(self.root, &abs);
        if rel.is_empty() {
            return Ok(self.build_tree(options));
        }
        let meta = self
            .fs
            .metadata(&abs)
            .map_err(|_| ContextError::not_found(format!("path not found: {}", rel)))?;
        if !meta.is_dir {
            return Err(ContextError::validation(format!(
                "path is not a directory: {}",
                rel
            )));
        }
        let name = abs
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(ProjectStructureNode {
            path: rel.clone(),
            kind: EntryKind::Directory,
            name,
            extension: None,
            size: None,
            last_modified: meta.modified.map(format_system_time),
            children: self.children_of(&abs, &rel, 0, options),
        })
    }

    fn children_of(
        &self,
        dir: &Path,
        rel: &str,
        depth: usize,
        options: &TreeOptions,
    ) -> Option<Vec<ProjectStructureNode>> {
        if options.max_depth.is_some_and(|max| depth >= max) {
            return None;
        }
        let entries = self.list_dir(dir)?;
        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            let child_rel = join_rel(rel, &entry.name);
            if entry.meta.is_dir {
                children.push(ProjectStructureNode {
                    children: self.children_of(&entry.path, &child_rel, depth + 1, options),
                    path: child_rel,
                    kind: EntryKind::Directory,
                    name: entry.name,
                    extension: None,
                    size: None,
                    last_modified: entry.meta.modified.map(format_system_time),
                });
            } else if options.accepts_file(&entry.name) {
                children.push(ProjectStructureNode {
                    path: child_rel,
                    kind: EntryKind::File,
                    extension: extension_of(&entry.name),
                    size: Some(entry.meta.len),
                    last_modified: entry.meta.modified.map(format_system_time),
                    name: entry.name,
                    children: None,
                });
            }
        }
        Some(children)
    }

    /// Visits every non-ignored file depth-first in sorted order, passing the
    /// `/`-separated relative path. Stops as soon as the visitor breaks.
    pub fn visit_files(
        &self,
        visitor: &mut dyn FnMut(&str, &DirEntryInfo) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        self.visit_dir(self.root, "", visitor)
    }

    fn visit_dir(
        &self,
        dir: &Path,
        rel: &str,
        visitor: &mut dyn FnMut(&str, &DirEntryInfo) -> ControlFlow<()>,
    ) -> ControlFlow<()> {
        let Some(entries) = self.list_dir(dir) else {
            return ControlFlow::Continue(());
        };
        for entry in &entries {
            let child_rel = join_rel(rel, &entry.name);
            if entry.meta.is_dir {
                self.visit_dir(&entry.path, &child_rel, visitor)?;
            } else {
                visitor(&child_rel, entry)?;
            }
        }
        ControlFlow::Continue(())
    }

    /// Resolves a caller-supplied relative path against the root.
    ///
    /// `..` components are applied lexically; a path that would climb above
    /// the root, or an absolute path, is rejected as not found. So is a path
    /// passing through an existing entry that is neither a file nor a
    /// directory (a symbolic link), since the file system would follow it.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let outside =
            || ContextError::not_found(format!("path is outside the project root: {}", rel));
        let mut out = PathBuf::new();
        for component in Path::new(rel).components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !out.pop() {
                        return Err(outside());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside()),
            }
        }

        let mut abs = self.root.to_path_buf();
        for part in out.iter() {
            abs.push(part);
            match self.fs.metadata(&abs) {
                Ok(meta) if !meta.is_dir && !meta.is_file => {
                    return Err(ContextError::not_found(format!(
                        "symbolic links are not followed: {}",
                        rel
                    )));
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        Ok(self.root.join(out))
    }

    /// Reads a file under the root, refusing anything above the size ceiling.
    pub fn read_file(&self, rel: &str) -> Result<FileContent> {
        let abs = self.resolve(rel)?;
        let meta = self
            .fs
            .metadata(&abs)
            .map_err(|_| ContextError::not_found(format!("file not found: {}", rel)))?;
        if !meta.is_file {
            return Err(ContextError::not_found(format!("not a regular file: {}", rel)));
        }
        if !self.policy.is_readable_size(meta.len) {
            return Err(ContextError::not_found(format!(
                "file too large: {} ({} bytes exceeds the {} byte limit)",
                rel, meta.len, self.policy.max_file_size
            )));
        }
        let text = self.fs.read_to_string(&abs).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => {
                ContextError::validation(format!("file is not UTF-8 text: {}", rel))
            }
            _ => ContextError::from(e),
        })?;
        Ok(FileContent {
            path: relative_string(self.root, &abs),
            mime_type: mime_type_for(rel).to_string(),
            text,
        })
    }
}

fn compare_entries(a: &DirEntryInfo, b: &DirEntryInfo) -> Ordering {
    b.meta.is_dir.cmp(&a.meta.is_dir).then_with(|| a.name.cmp(&b.name))
}

fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn relative_string(root: &Path, abs: &Path) -> String {
    abs.strip_prefix(root)
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

/// Extension of a file name without the dot; `None` for dotfiles without one.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}

/// Content type for a file, inferred from its extension.
pub fn mime_type_for(path: &str) -> &'static str {
    let ext = extension_of(path.rsplit('/').next().unwrap_or(path))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => "application/json",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" | "cjs" | "jsx" => "text/javascript",
        "ts" | "tsx" => "text/typescript",
        "py" => "text/x-python",
        "rs" => "text/x-rust",
        "go" => "text/x-go",
        "java" => "text/x-java",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "sh" => "text/x-shellscript",
        _ => "text/plain",
    }
}

pub fn unix_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub fn format_system_time(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).to_rfc3339()
}

pub fn format_unix_secs(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339()
}
