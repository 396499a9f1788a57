use std::path::Path;

use serde::{Deserialize, Serialize};

/// Parameters of a recent-changes query, already validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeQuery {
    pub days: u32,
    pub max_commits: u32,
    pub include_merges: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
    pub files_changed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryOutcome {
    /// No history backend is wired in.
    NotConfigured,
    /// The backend ran; the list may be empty.
    Commits(Vec<CommitSummary>),
}

pub trait ChangeHistory: Send + Sync {
    fn recent_changes(&self, root: &Path, query: &ChangeQuery) -> HistoryOutcome;
}

/// The default backend: history mining is not available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistoryBackend;

impl ChangeHistory for NoHistoryBackend {
    fn recent_changes(&self, _root: &Path, _query: &ChangeQuery) -> HistoryOutcome {
        HistoryOutcome::NotConfigured
    }
}
