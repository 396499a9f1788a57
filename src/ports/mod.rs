//! Swappable capabilities the project analysis is built on.
//!
//! Each integration that is not backed by a real implementation answers with
//! an explicit "not configured" variant, so a future backend replaces the
//! port without changing what callers see on the success path.

/// File-system access (stat, list, read).
pub mod fs;

/// Commit history backend.
pub mod history;

/// Vulnerability database backend.
pub mod security;

/// Version-control presence probe.
pub mod vcs;

pub use fs::{DirEntryInfo, FileMeta, FileSystem, LocalFileSystem};
pub use history::{ChangeHistory, ChangeQuery, CommitSummary, HistoryOutcome, NoHistoryBackend};
pub use security::{NoVulnerabilityScanner, ScanOutcome, VulnerabilityScanner};
pub use vcs::{GitDirProbe, NoVcsProbe, VcsProbe, VcsStatus};
