//! Substring search over file names and, optionally, file contents.

use std::ops::ControlFlow;

use glob::{MatchOptions, Pattern};
use serde::Serialize;

use crate::analysis::traversal::Traversal;
use crate::ports::fs::DirEntryInfo;

/// Longest line excerpt returned for a content match.
const MAX_LINE_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: String,
    /// Glob matched against the file name or the relative path.
    pub file_pattern: Option<Pattern>,
    pub max_results: usize,
    pub case_sensitive: bool,
    pub include_content: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Filename,
    Content,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: MatchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub matches: Vec<SearchMatch>,
    pub files_scanned: usize,
    /// Set when the walk stopped because `max_results` was reached.
    pub limit_reached: bool,
}

/// Walks the project depth-first and collects matches until `max_results`.
///
/// Files above the size ceiling are never opened; files that are not valid
/// text are skipped for content matching.
pub fn search_project(traversal: &Traversal<'_>, options: &SearchOptions) -> SearchOutcome {
    let needle = normalize(&options.query, options.case_sensitive);
    let glob_opts = MatchOptions {
        case_sensitive: options.case_sensitive,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let mut outcome = SearchOutcome::default();
    if options.max_results == 0 {
        return outcome;
    }

    let flow = traversal.visit_files(&mut |rel: &str, entry: &DirEntryInfo| {
        if let Some(pattern) = &options.file_pattern {
            if !pattern.matches_with(&entry.name, glob_opts)
                && !pattern.matches_with(rel, glob_opts)
            {
                return ControlFlow::Continue(());
            }
        }
        outcome.files_scanned += 1;

        if normalize(&entry.name, options.case_sensitive).contains(&needle) {
            outcome.matches.push(SearchMatch {
                path: rel.to_string(),
                kind: MatchKind::Filename,
                line: None,
                content: None,
            });
            if outcome.matches.len() >= options.max_results {
                return ControlFlow::Break(());
            }
        }

        if !options.include_content || !traversal.policy().is_readable_size(entry.meta.len) {
            return ControlFlow::Continue(());
        }
        let Ok(text) = traversal.file_system().read_to_string(&entry.path) else {
            return ControlFlow::Continue(());
        };
        for (idx, line) in text.lines().enumerate() {
            if normalize(line, options.case_sensitive).contains(&needle) {
                outcome.matches.push(SearchMatch {
                    path: rel.to_string(),
                    kind: MatchKind::Content,
                    line: Some(idx + 1),
                    content: Some(excerpt(line)),
                });
                if outcome.matches.len() >= options.max_results {
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    });

    outcome.limit_reached = flow.is_break();
    outcome
}

fn normalize(s: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_lowercase()
    }
}

fn excerpt(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() <= MAX_LINE_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_LINE_CHARS).collect();
        format!("{}...", cut)
    }
}
