use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Metadata of one file-system entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMeta {
    pub is_dir: bool,
    pub is_file: bool,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// One entry returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntryInfo {
    pub name: String,
    pub path: PathBuf,
    pub meta: FileMeta,
}

/// The file-system operations project analysis needs.
pub trait FileSystem: Send + Sync {
    fn metadata(&self, path: &Path) -> io::Result<FileMeta>;

    /// Lists a directory. Entries are returned in no particular order.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.metadata(path).map(|m| m.is_dir).unwrap_or(false)
    }
}

/// [`FileSystem`] backed by `std::fs`.
///
/// Symbolic links are reported as neither file nor directory, so traversal
/// never follows them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

fn to_meta(md: &fs::Metadata) -> FileMeta {
    let ft = md.file_type();
    FileMeta {
        is_dir: ft.is_dir(),
        is_file: ft.is_file(),
        len: md.len(),
        modified: md.modified().ok(),
    }
}

impl FileSystem for LocalFileSystem {
    fn metadata(&self, path: &Path) -> io::Result<FileMeta> {
        fs::symlink_metadata(path).map(|md| to_meta(&md))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let md = match fs::symlink_metadata(entry.path()) {
                Ok(md) => md,
                Err(_) => continue,
            };
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.path(),
                meta: to_meta(&md),
            });
        }
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}
