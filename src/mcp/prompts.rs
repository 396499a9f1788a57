//! Prompt templates filled from the project snapshots.
//!
//! Every prompt renders into a single user message. A snapshot that cannot
//! be computed is replaced by a short note instead of failing the prompt.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::analysis::traversal::extension_of;
use crate::config::PromptLimits;
use crate::errors::{ContextError, Result};
use crate::project::ProjectContext;
use crate::types::{DependencySet, DependencyType, ProjectOverview, ProjectStructureNode};

#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl PromptArgument {
    fn new(name: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

pub trait PromptHandler: Send + Sync {
    fn definition(&self) -> PromptDefinition;

    /// Renders the message text. Required arguments are already checked.
    fn render(&self, project: &ProjectContext, args: &PromptArgs) -> Result<String>;
}

/// String arguments of a `prompts/get` call.
#[derive(Debug, Default)]
pub struct PromptArgs(HashMap<String, String>);

impl PromptArgs {
    /// Accepts string values; numbers and booleans are stringified.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        let mut map = HashMap::new();
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(Self(map));
        };
        let obj = value
            .as_object()
            .ok_or_else(|| ContextError::validation("prompt arguments must be an object"))?;
        for (k, v) in obj {
            let s = match v {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                Value::Number(_) | Value::Bool(_) => v.to_string(),
                _ => {
                    return Err(ContextError::validation(format!(
                        "prompt argument '{}' must be a string",
                        k
                    )))
                }
            };
            map.insert(k.clone(), s);
        }
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    fn one_of<'a>(&'a self, key: &str, allowed: &[&'a str], default: &'a str) -> Result<&'a str> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if allowed.contains(&v) => Ok(v),
            Some(v) => Err(ContextError::validation(format!(
                "argument '{}' must be one of {} (got '{}')",
                key,
                allowed.join(", "),
                v
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot rendering
// ---------------------------------------------------------------------------

const CONTEXT_UNAVAILABLE: &str = "_context not available_";

fn overview_section(overview: &Result<ProjectOverview>) -> String {
    let Ok(o) = overview else {
        return format!("## Project\n\n{}\n", CONTEXT_UNAVAILABLE);
    };
    let mut out = format!("## Project\n\n- **Name:** {} {}\n", o.name, o.version);
    if !o.description.is_empty() {
        out.push_str(&format!("- **Description:** {}\n", o.description));
    }
    out.push_str(&format!("- **Language:** {}\n", o.language));
    if let Some(fw) = &o.framework {
        out.push_str(&format!("- **Framework:** {}\n", fw));
    }
    if let Some(pm) = &o.package_manager {
        out.push_str(&format!("- **Package manager:** {}\n", pm));
    }
    out.push_str(&format!(
        "- **Files:** {} ({} bytes)\n- **Last modified:** {}\n",
        o.file_count, o.size_in_bytes, o.last_modified
    ));
    if let Some(git) = o.git.as_ref().filter(|g| g.is_repository) {
        out.push_str(&format!(
            "- **Git branch:** {}\n",
            git.branch.as_deref().unwrap_or("(detached)")
        ));
    }
    out
}

fn render_tree(node: &ProjectStructureNode, limits: &PromptLimits, depth: usize, out: &mut String) {
    let Some(children) = &node.children else {
        return;
    };
    if depth >= limits.max_depth {
        return;
    }
    let indent = "  ".repeat(depth);
    for child in children.iter().take(limits.max_children) {
        if child.is_dir() {
            out.push_str(&format!("{}- {}/\n", indent, child.name));
            render_tree(child, limits, depth + 1, out);
        } else {
            out.push_str(&format!("{}- {}\n", indent, child.name));
        }
    }
    if children.len() > limits.max_children {
        out.push_str(&format!(
            "{}- ... and {} more\n",
            indent,
            children.len() - limits.max_children
        ));
    }
}

fn structure_section(structure: &ProjectStructureNode, limits: &PromptLimits) -> String {
    let mut out = String::from("## Structure\n\n");
    if structure.children.is_none() {
        out.push_str(CONTEXT_UNAVAILABLE);
        out.push('\n');
        return out;
    }
    render_tree(structure, limits, 0, &mut out);
    out
}

fn dependencies_section(deps: &DependencySet) -> String {
    let mut out = format!(
        "## Dependencies\n\n- **Package manager:** {}\n- **Total:** {}\n- **Lock file:** {}\n",
        deps.package_manager,
        deps.total_count,
        if deps.lock_file_exists { "yes" } else { "no" }
    );
    for dep_type in DependencyType::all() {
        let group = deps.dependencies.get(dep_type);
        if group.is_empty() {
            continue;
        }
        let names: Vec<String> = group
            .iter()
            .map(|d| format!("{}@{}", d.name, d.version))
            .collect();
        out.push_str(&format!("- **{}:** {}\n", dep_type.as_str(), names.join(", ")));
    }
    out
}

fn file_section(project: &ProjectContext, path: &str) -> String {
    let limit = project.config().prompts.max_file_chars;
    match project.read_file(path) {
        Ok(file) => {
            let name = file.path.rsplit('/').next().unwrap_or(&file.path);
            let lang = extension_of(name).unwrap_or_default();
            let mut body: String = file.text.chars().take(limit).collect();
            if file.text.chars().count() > limit {
                body.push_str(&format!("\n... (truncated to {} characters)", limit));
            }
            format!("## File `{}`\n\n```{}\n{}\n```\n", file.path, lang, body)
        }
        Err(e) => format!("## File `{}`\n\n_file could not be read: {}_\n", path, e),
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

pub struct ProjectOverviewPrompt;

impl PromptHandler for ProjectOverviewPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "project_overview".to_string(),
            description: "Explain what this project is and how it is put together".to_string(),
            arguments: vec![PromptArgument::new(
                "detail",
                "brief, standard, or comprehensive (default: standard)",
                false,
            )],
        }
    }

    fn render(&self, project: &ProjectContext, args: &PromptArgs) -> Result<String> {
        let detail = args.one_of("detail", &["brief", "standard", "comprehensive"], "standard")?;
        let limits = &project.config().prompts;

        let mut text = String::from("Please give an overview of this project.\n\n");
        text.push_str(&overview_section(&project.overview()));
        if detail != "brief" {
            text.push('\n');
            text.push_str(&structure_section(&project.structure(), limits));
        }
        if detail == "comprehensive" {
            text.push('\n');
            text.push_str(&dependencies_section(&project.dependencies()));
        }
        text.push_str(match detail {
            "brief" => "\nKeep it to a short paragraph: purpose and main technology.\n",
            "comprehensive" => "\nCover purpose, architecture, main modules, dependencies, and how to build and run it.\n",
            _ => "\nDescribe the purpose, the technology stack, and the layout of the code.\n",
        });
        Ok(text)
    }
}

pub struct CodeAnalysisPrompt;

impl PromptHandler for CodeAnalysisPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "code_analysis".to_string(),
            description: "Review code for quality, security, performance, or maintainability".to_string(),
            arguments: vec![
                PromptArgument::new(
                    "analysisType",
                    "quality, security, performance, or maintainability (default: quality)",
                    false,
                ),
                PromptArgument::new(
                    "filePath",
                    "File to analyze, relative to the project root",
                    false,
                ),
            ],
        }
    }

    fn render(&self, project: &ProjectContext, args: &PromptArgs) -> Result<String> {
        let kind = args.one_of(
            "analysisType",
            &["quality", "security", "performance", "maintainability"],
            "quality",
        )?;
        let mut text = format!("Please perform a {} analysis of this code.\n\n", kind);
        text.push_str(&overview_section(&project.overview()));
        text.push('\n');
        match args.get("filePath") {
            Some(path) => text.push_str(&file_section(project, path)),
            None => text.push_str(&structure_section(
                &project.structure(),
                &project.config().prompts,
            )),
        }
        text.push_str(match kind {
            "security" => "\nLook for injection, unsafe input handling, secrets in code, and risky dependencies.\n",
            "performance" => "\nLook for unnecessary work, blocking calls, and poor data structure choices.\n",
            "maintainability" => "\nLook at naming, module boundaries, duplication, and test coverage.\n",
            _ => "\nLook at correctness, readability, and error handling.\n",
        });
        Ok(text)
    }
}

pub struct DebuggingAssistancePrompt;

impl PromptHandler for DebuggingAssistancePrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "debugging_assistance".to_string(),
            description: "Help track down a bug using the project context".to_string(),
            arguments: vec![
                PromptArgument::new("issue", "Description of the problem", true),
                PromptArgument::new("errorMessage", "Error message or stack trace", false),
                PromptArgument::new("filePath", "File where the problem shows up", false),
            ],
        }
    }

    fn render(&self, project: &ProjectContext, args: &PromptArgs) -> Result<String> {
        let issue = args
            .get("issue")
            .ok_or_else(|| ContextError::validation("missing required argument: issue"))?;
        let mut text = format!("I need help debugging an issue.\n\n## Issue\n\n{}\n\n", issue);
        if let Some(err) = args.get("errorMessage") {
            text.push_str(&format!("## Error\n\n```\n{}\n```\n\n", err));
        }
        text.push_str(&overview_section(&project.overview()));
        if let Some(path) = args.get("filePath") {
            text.push('\n');
            text.push_str(&file_section(project, path));
        }
        text.push_str("\nSuggest likely causes, how to confirm each one, and a fix.\n");
        Ok(text)
    }
}

pub struct ArchitectureReviewPrompt;

impl PromptHandler for ArchitectureReviewPrompt {
    fn definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: "architecture_review".to_string(),
            description: "Review the architecture of the project or one part of it".to_string(),
            arguments: vec![
                PromptArgument::new(
                    "scope",
                    "full, frontend, backend, or data (default: full)",
                    false,
                ),
                PromptArgument::new("focus", "Specific concern to emphasize", false),
            ],
        }
    }

    fn render(&self, project: &ProjectContext, args: &PromptArgs) -> Result<String> {
        let scope = args.one_of("scope", &["full", "frontend", "backend", "data"], "full")?;
        let mut text = match scope {
            "full" => String::from("Please review the architecture of this project.\n\n"),
            s => format!("Please review the {} architecture of this project.\n\n", s),
        };
        if let Some(focus) = args.get("focus") {
            text.push_str(&format!("Focus especially on: {}\n\n", focus));
        }
        text.push_str(&overview_section(&project.overview()));
        text.push('\n');
        text.push_str(&structure_section(&project.structure(), &project.config().prompts));
        text.push('\n');
        text.push_str(&dependencies_section(&project.dependencies()));
        text.push_str("\nComment on layering, coupling, scalability, and anything you would change.\n");
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct PromptRegistry {
    handlers: Vec<Box<dyn PromptHandler>>,
    by_name: HashMap<String, usize>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ProjectOverviewPrompt));
        registry.register(Box::new(CodeAnalysisPrompt));
        registry.register(Box::new(DebuggingAssistancePrompt));
        registry.register(Box::new(ArchitectureReviewPrompt));
        registry
    }

    pub fn register(&mut self, handler: Box<dyn PromptHandler>) {
        let name = handler.definition().name;
        self.by_name.insert(name, self.handlers.len());
        self.handlers.push(handler);
    }

    pub fn list(&self) -> Vec<PromptDefinition> {
        self.handlers.iter().map(|h| h.definition()).collect()
    }

    /// Renders a prompt into the `{description, messages}` response body.
    pub fn get(&self, project: &ProjectContext, name: &str, args: Option<&Value>) -> Result<Value> {
        let handler = self
            .by_name
            .get(name)
            .map(|&idx| &self.handlers[idx])
            .ok_or_else(|| ContextError::not_found(format!("unknown prompt: {}", name)))?;
        let definition = handler.definition();
        let args = PromptArgs::from_value(args)?;
        for arg in definition.arguments.iter().filter(|a| a.required) {
            if args.get(&arg.name).is_none() {
                return Err(ContextError::validation(format!(
                    "missing required argument: {}",
                    arg.name
                )));
            }
        }

        let text = handler.render(project, &args)?;
        Ok(json!({
            "description": definition.description,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": text }
            }]
        }))
    }
}
