//! MCP tool definitions, parameter validation, and dispatch.
//!
//! Each tool is a [`ToolHandler`] registered by name. Tool definitions carry
//! JSON Schema descriptions so that MCP clients can discover them.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::Instant;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::analysis::report::{analyze_dependencies, render, OutputFormat};
use crate::analysis::search::{search_project, SearchOptions};
use crate::analysis::traversal::TreeOptions;
use crate::errors::{ContextError, Result};
use crate::ports::{ChangeQuery, HistoryOutcome, VcsStatus};
use crate::project::ProjectContext;
use crate::types::short_hash;

/// Maximum character length for a text tool response before truncation.
const MAX_RESPONSE_CHARS: usize = 50_000;

/// A tool definition exposed by the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool. `args` is always a JSON object.
    fn call(&self, project: &ProjectContext, args: &Args<'_>) -> Result<Value>;
}

/// Typed access to tool arguments. Missing or `null` values take the
/// default; values of the wrong type are validation errors.
pub struct Args<'a>(&'a Value);

impl<'a> Args<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(value)
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| {
                ContextError::validation(format!("parameter '{}' must be a boolean", key))
            }),
        }
    }

    pub fn u64_in(&self, key: &str, default: u64, range: RangeInclusive<u64>) -> Result<u64> {
        let value = match self.get(key) {
            None => return Ok(default),
            Some(v) => v.as_u64().ok_or_else(|| {
                ContextError::validation(format!(
                    "parameter '{}' must be a non-negative integer",
                    key
                ))
            })?,
        };
        if !range.contains(&value) {
            return Err(ContextError::validation(format!(
                "parameter '{}' must be between {} and {}",
                key,
                range.start(),
                range.end()
            )));
        }
        Ok(value)
    }

    pub fn str_opt(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v.as_str().map(Some).ok_or_else(|| {
                ContextError::validation(format!("parameter '{}' must be a string", key))
            }),
        }
    }

    pub fn str_required(&self, key: &str) -> Result<&'a str> {
        match self.str_opt(key)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(ContextError::validation(format!(
                "missing required parameter: {}",
                key
            ))),
        }
    }

    pub fn str_list_opt(&self, key: &str) -> Result<Option<Vec<String>>> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        let invalid = || {
            ContextError::validation(format!("parameter '{}' must be an array of strings", key))
        };
        let items = v.as_array().ok_or_else(invalid)?;
        items
            .iter()
            .map(|i| i.as_str().map(str::to_string).ok_or_else(invalid))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

/// Wraps text in the MCP tool result shape.
pub fn text_result(text: &str) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }]
    })
}

/// Truncates a string to the maximum response character limit, appending
/// a truncation notice if necessary.
fn truncate_response(s: &str) -> String {
    if s.len() <= MAX_RESPONSE_CHARS {
        s.to_string()
    } else {
        let mut end = MAX_RESPONSE_CHARS;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}\n\n[... truncated at {} chars]", &s[..end], end)
    }
}

// ---------------------------------------------------------------------------
// analyze_dependencies
// ---------------------------------------------------------------------------

pub struct AnalyzeDependenciesTool;

impl ToolHandler for AnalyzeDependenciesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "analyze_dependencies".to_string(),
            description: "Analyze the project's declared dependencies, optionally including development dependencies and a security scan.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "includeDevDependencies": {
                        "type": "boolean",
                        "description": "Include development dependencies (default: true)"
                    },
                    "checkSecurity": {
                        "type": "boolean",
                        "description": "Run a vulnerability scan if a backend is configured (default: false)"
                    },
                    "outputFormat": {
                        "type": "string",
                        "enum": ["summary", "detailed", "json"],
                        "description": "Rendering of the report (default: summary)"
                    }
                },
                "required": []
            }),
        }
    }

    fn call(&self, project: &ProjectContext, args: &Args<'_>) -> Result<Value> {
        let include_dev = args.bool_or("includeDevDependencies", true)?;
        let check_security = args.bool_or("checkSecurity", false)?;
        let format = match args.str_opt("outputFormat")? {
            None => OutputFormat::default(),
            Some(s) => OutputFormat::from_str(s).ok_or_else(|| {
                ContextError::validation(format!(
                    "parameter 'outputFormat' must be one of summary, detailed, json (got '{}')",
                    s
                ))
            })?,
        };

        let set = project.dependencies();
        let scanner = check_security.then(|| project.scanner());
        let analysis = analyze_dependencies(&set, include_dev, scanner);
        let text = render(&analysis, format);
        Ok(text_result(&match format {
            OutputFormat::Json => text,
            _ => truncate_response(&text),
        }))
    }
}

// ---------------------------------------------------------------------------
// get_recent_changes
// ---------------------------------------------------------------------------

/// Validates its parameters and asks the configured history backend. With
/// the default backend the answer is always "not available".
pub struct RecentChangesTool;

impl ToolHandler for RecentChangesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_recent_changes".to_string(),
            description: "List recent commits. Requires a Git history backend; without one the tool reports that history is unavailable.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "days": {
                        "type": "number",
                        "description": "How many days back to look, 1-365 (default: 7)"
                    },
                    "maxCommits": {
                        "type": "number",
                        "description": "Maximum number of commits, 1-500 (default: 20)"
                    },
                    "includeMerges": {
                        "type": "boolean",
                        "description": "Include merge commits (default: false)"
                    },
                    "author": {
                        "type": "string",
                        "description": "Only commits by this author"
                    }
                },
                "required": []
            }),
        }
    }

    fn call(&self, project: &ProjectContext, args: &Args<'_>) -> Result<Value> {
        let query = ChangeQuery {
            days: args.u64_in("days", 7, 1..=365)? as u32,
            max_commits: args.u64_in("maxCommits", 20, 1..=500)? as u32,
            include_merges: args.bool_or("includeMerges", false)?,
            author: args.str_opt("author")?.map(str::to_string),
        };

        let mut out = String::from("# Recent Changes\n\n");
        match project.history().recent_changes(project.root(), &query) {
            HistoryOutcome::NotConfigured => {
                out.push_str("Git history is not available: no Git backend is configured for this server.\n\n");
                out.push_str(&format!(
                    "Requested: last {} days, up to {} commits, merges {}",
                    query.days,
                    query.max_commits,
                    if query.include_merges { "included" } else { "excluded" }
                ));
                if let Some(author) = &query.author {
                    out.push_str(&format!(", author '{}'", author));
                }
                out.push_str(".\n");
                if let VcsStatus::Repository(info) = project.vcs().probe(project.root()) {
                    out.push_str(&format!(
                        "\nRepository detected on branch {} at commit {}.\n",
                        info.branch.as_deref().unwrap_or("(detached)"),
                        info.commit.as_deref().unwrap_or("(unknown)")
                    ));
                }
            }
            HistoryOutcome::Commits(commits) if commits.is_empty() => {
                out.push_str(&format!("No commits in the last {} days.\n", query.days));
            }
            HistoryOutcome::Commits(commits) => {
                for c in commits.iter().take(query.max_commits as usize) {
                    out.push_str(&format!(
                        "- {} {} ({}): {}\n",
                        short_hash(&c.hash),
                        c.date,
                        c.author,
                        c.message
                    ));
                    for f in &c.files_changed {
                        out.push_str(&format!("  - {}\n", f));
                    }
                }
            }
        }
        Ok(text_result(&truncate_response(&out)))
    }
}

// ---------------------------------------------------------------------------
// navigate_structure
// ---------------------------------------------------------------------------

pub struct NavigateStructureTool;

#[derive(Debug, Serialize)]
struct Breadcrumb {
    name: String,
    path: String,
}

fn breadcrumbs(root_name: &str, path: &str) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        name: root_name.to_string(),
        path: String::new(),
    }];
    let mut acc = String::new();
    for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
        if !acc.is_empty() {
            acc.push('/');
        }
        acc.push_str(part);
        crumbs.push(Breadcrumb {
            name: part.to_string(),
            path: acc.clone(),
        });
    }
    crumbs
}

impl ToolHandler for NavigateStructureTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "navigate_structure".to_string(),
            description: "List the contents of a directory in the project, optionally several levels deep and filtered by file extension.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory relative to the project root (default: root)"
                    },
                    "depth": {
                        "type": "number",
                        "description": "Levels to expand, 1-10 (default: 1)"
                    },
                    "includeFiles": {
                        "type": "boolean",
                        "description": "Include files as well as directories (default: true)"
                    },
                    "filterExtensions": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Only list files with these extensions, e.g. [\"ts\", \".rs\"]"
                    }
                },
                "required": []
            }),
        }
    }

    fn call(&self, project: &ProjectContext, args: &Args<'_>) -> Result<Value> {
        let path = args.str_opt("path")?.unwrap_or("");
        let options = TreeOptions {
            max_depth: Some(args.u64_in("depth", 1, 1..=10)? as usize),
            extensions: args.str_list_opt("filterExtensions")?,
            directories_only: !args.bool_or("includeFiles", true)?,
        };

        let node = project.traversal().build_subtree(path, &options)?;
        let items = node.children.clone().unwrap_or_default();
        let total_items = node.node_count() - 1;
        let root_name = project
            .root()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());

        let output = json!({
            "path": node.path,
            "breadcrumbs": breadcrumbs(&root_name, &node.path),
            "items": items,
            "totalItems": total_items,
        });
        let text = serde_json::to_string_pretty(&output)?;
        Ok(text_result(&truncate_response(&text)))
    }
}

// ---------------------------------------------------------------------------
// search_project
// ---------------------------------------------------------------------------

pub struct SearchProjectTool;

impl ToolHandler for SearchProjectTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_project".to_string(),
            description: "Search file names and, optionally, file contents for a substring.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Text to search for"
                    },
                    "filePattern": {
                        "type": "string",
                        "description": "Glob restricting which files are searched, e.g. \"*.ts\" or \"src/**/*.rs\""
                    },
                    "maxResults": {
                        "type": "number",
                        "description": "Maximum number of matches (default: 50)"
                    },
                    "caseSensitive": {
                        "type": "boolean",
                        "description": "Match case exactly in names and contents (default: false)"
                    },
                    "includeContent": {
                        "type": "boolean",
                        "description": "Also search inside files, line by line (default: false)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    fn call(&self, project: &ProjectContext, args: &Args<'_>) -> Result<Value> {
        let query = args.str_required("query")?;
        let defaults = &project.config().search;
        let file_pattern = args
            .str_opt("filePattern")?
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    ContextError::validation(format!("invalid filePattern '{}': {}", p, e))
                })
            })
            .transpose()?;
        let options = SearchOptions {
            query: query.to_string(),
            file_pattern,
            max_results: args.u64_in(
                "maxResults",
                defaults.max_results as u64,
                1..=defaults.max_results_ceiling as u64,
            )? as usize,
            case_sensitive: args.bool_or("caseSensitive", false)?,
            include_content: args.bool_or("includeContent", false)?,
        };

        let start = Instant::now();
        let outcome = search_project(&project.traversal(), &options);
        let search_time = start.elapsed().as_millis() as u64;

        let output = json!({
            "query": query,
            "totalMatches": outcome.matches.len(),
            "results": outcome.matches,
            "filesScanned": outcome.files_scanned,
            "limitReached": outcome.limit_reached,
            "searchTime": search_time,
        });
        Ok(text_result(&serde_json::to_string_pretty(&output)?))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Tool handlers keyed by name, listed in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: Vec<Box<dyn ToolHandler>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AnalyzeDependenciesTool));
        registry.register(Box::new(RecentChangesTool));
        registry.register(Box::new(NavigateStructureTool));
        registry.register(Box::new(SearchProjectTool));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        let name = handler.definition().name;
        self.by_name.insert(name, self.handlers.len());
        self.handlers.push(handler);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers.iter().map(|h| h.definition()).collect()
    }

    /// Dispatches a tool call.
    ///
    /// Unknown tools are not-found errors. Validation and not-found errors
    /// from the tool pass through; anything else is logged and replaced by a
    /// generic validation error so internal details stay inside the server.
    pub fn call(&self, project: &ProjectContext, name: &str, args: &Value) -> Result<Value> {
        let handler = self
            .by_name
            .get(name)
            .map(|&idx| &self.handlers[idx])
            .ok_or_else(|| ContextError::not_found(format!("unknown tool: {}", name)))?;

        let empty = json!({});
        let args = match args {
            Value::Null => &empty,
            Value::Object(_) => args,
            _ => return Err(ContextError::validation("tool arguments must be an object")),
        };

        match handler.call(project, &Args::new(args)) {
            Ok(value) => Ok(value),
            Err(e @ (ContextError::Validation { .. } | ContextError::NotFound { .. })) => Err(e),
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                Err(ContextError::validation(format!(
                    "tool '{}' failed to execute",
                    name
                )))
            }
        }
    }
}
