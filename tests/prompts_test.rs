use projectlens::config::ServerConfig;
use projectlens::errors::ContextError;
use projectlens::mcp::prompts::PromptRegistry;
use projectlens::project::ProjectContext;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{"name": "storefront", "version": "1.0.0", "dependencies": {"express": "^4.0.0"}}"#,
    )
    .unwrap();
    fs::create_dir(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/server.js"), "const express = require('express');\n").unwrap();
    dir
}

fn prompt_text(dir: &TempDir, name: &str, args: Value) -> String {
    let ctx = ProjectContext::with_config(dir.path(), ServerConfig::default());
    let out = PromptRegistry::with_defaults().get(&ctx, name, Some(&args)).unwrap();
    assert_eq!(out["messages"][0]["role"], "user");
    assert_eq!(out["messages"][0]["content"]["type"], "text");
    assert!(out["description"].as_str().is_some());
    out["messages"][0]["content"]["text"].as_str().unwrap().to_string()
}

#[test]
fn test_project_overview_detail_levels() {
    let dir = sample_project();
    let brief = prompt_text(&dir, "project_overview", json!({"detail": "brief"}));
    assert!(brief.contains("storefront"));
    assert!(!brief.contains("## Structure"));

    let standard = prompt_text(&dir, "project_overview", json!({}));
    assert!(standard.contains("## Structure"));
    assert!(standard.contains("- src/"));

    let full = prompt_text(&dir, "project_overview", json!({"detail": "comprehensive"}));
    assert!(full.contains("## Dependencies"));
    assert!(full.contains("express@^4.0.0"));
}

#[test]
fn test_code_analysis_embeds_file() {
    let dir = sample_project();
    let text = prompt_text(
        &dir,
        "code_analysis",
        json!({"analysisType": "security", "filePath": "src/server.js"}),
    );
    assert!(text.contains("security analysis"));
    assert!(text.contains("require('express')"));
}

#[test]
fn test_code_fence_language_follows_extension() {
    let dir = sample_project();
    fs::write(dir.path().join("Makefile"), "all:\n\techo hi\n").unwrap();
    let text = prompt_text(&dir, "code_analysis", json!({"filePath": "Makefile"}));
    assert!(text.contains("## File `Makefile`\n\n```\nall:"));

    let text = prompt_text(&dir, "code_analysis", json!({"filePath": "src/server.js"}));
    assert!(text.contains("```js\nconst express"));
}

#[test]
fn test_code_analysis_truncates_long_files() {
    let dir = sample_project();
    fs::write(dir.path().join("long.txt"), "y".repeat(5000)).unwrap();
    let text = prompt_text(&dir, "code_analysis", json!({"filePath": "long.txt"}));
    assert!(text.contains(&"y".repeat(2000)));
    assert!(!text.contains(&"y".repeat(2001)));
    assert!(text.contains("truncated to 2000 characters"));
}

#[test]
fn test_missing_file_is_noted_not_fatal() {
    let dir = sample_project();
    let text = prompt_text(
        &dir,
        "debugging_assistance",
        json!({"issue": "crash", "filePath": "nope.js"}),
    );
    assert!(text.contains("could not be read"));
}

#[test]
fn test_debugging_requires_issue() {
    let dir = sample_project();
    let ctx = ProjectContext::with_config(dir.path(), ServerConfig::default());
    let err = PromptRegistry::with_defaults()
        .get(&ctx, "debugging_assistance", Some(&json!({"errorMessage": "boom"})))
        .unwrap_err();
    assert!(matches!(err, ContextError::Validation { .. }));
    assert!(err.message().contains("issue"));
}

#[test]
fn test_debugging_includes_error() {
    let dir = sample_project();
    let text = prompt_text(
        &dir,
        "debugging_assistance",
        json!({"issue": "server exits", "errorMessage": "EADDRINUSE"}),
    );
    assert!(text.contains("server exits"));
    assert!(text.contains("EADDRINUSE"));
}

#[test]
fn test_architecture_review_scope_and_focus() {
    let dir = sample_project();
    let text = prompt_text(
        &dir,
        "architecture_review",
        json!({"scope": "backend", "focus": "error handling"}),
    );
    assert!(text.contains("backend architecture"));
    assert!(text.contains("error handling"));
    assert!(text.contains("## Dependencies"));
}

#[test]
fn test_unknown_prompt_is_not_found() {
    let dir = sample_project();
    let ctx = ProjectContext::with_config(dir.path(), ServerConfig::default());
    let err = PromptRegistry::with_defaults().get(&ctx, "nope", None).unwrap_err();
    assert!(matches!(err, ContextError::NotFound { .. }));
}
