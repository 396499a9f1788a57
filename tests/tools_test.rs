use projectlens::config::{ServerConfig, DEFAULT_MAX_FILE_SIZE};
use projectlens::errors::ContextError;
use projectlens::mcp::tools::ToolRegistry;
use projectlens::ports::{
    ChangeHistory, ChangeQuery, CommitSummary, HistoryOutcome, NoVcsProbe, ScanOutcome,
    VulnerabilityScanner,
};
use projectlens::project::ProjectContext;
use projectlens::types::{Dependency, Vulnerability};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn project(dir: &TempDir) -> ProjectContext {
    ProjectContext::with_config(dir.path(), ServerConfig::default())
}

fn call_text(ctx: &ProjectContext, name: &str, args: Value) -> String {
    let out = ToolRegistry::with_defaults().call(ctx, name, &args).unwrap();
    assert_eq!(out["content"][0]["type"], "text");
    out["content"][0]["text"].as_str().unwrap().to_string()
}

fn call_json(ctx: &ProjectContext, name: &str, args: Value) -> Value {
    serde_json::from_str(&call_text(ctx, name, args)).unwrap()
}

fn call_err(ctx: &ProjectContext, name: &str, args: Value) -> ContextError {
    ToolRegistry::with_defaults().call(ctx, name, &args).unwrap_err()
}

fn write_package_json(dir: &Path) {
    fs::write(
        dir.join("package.json"),
        r#"{
            "name": "app",
            "dependencies": {"lodash": "^4.17.21", "express": "^4.18.0"},
            "devDependencies": {"jest": "^29.0.0"}
        }"#,
    )
    .unwrap();
}

// ---------------------------------------------------------------------------
// analyze_dependencies
// ---------------------------------------------------------------------------

#[test]
fn test_dev_dependencies_counted_only_when_requested() {
    let dir = TempDir::new().unwrap();
    write_package_json(dir.path());
    let ctx = project(&dir);

    let with_dev = call_text(&ctx, "analyze_dependencies", json!({}));
    assert!(with_dev.contains("**Total dependencies:** 3"));

    let without_dev = call_text(
        &ctx,
        "analyze_dependencies",
        json!({"includeDevDependencies": false}),
    );
    assert!(without_dev.contains("**Total dependencies:** 2"));
}

#[test]
fn test_json_output_and_security_not_configured() {
    let dir = TempDir::new().unwrap();
    write_package_json(dir.path());
    let report = call_json(
        &project(&dir),
        "analyze_dependencies",
        json!({"outputFormat": "json", "checkSecurity": true}),
    );
    assert_eq!(report["totalDependencies"], 3);
    assert_eq!(report["packageManager"], "npm");
    assert_eq!(report["security"]["status"], "not_configured");
}

struct FlagLodash;

impl VulnerabilityScanner for FlagLodash {
    fn scan(&self, dependencies: &[Dependency]) -> ScanOutcome {
        ScanOutcome::Scanned(
            dependencies
                .iter()
                .filter(|d| d.name == "lodash")
                .map(|d| Vulnerability {
                    id: "GHSA-0001".to_string(),
                    package: d.name.clone(),
                    severity: "high".to_string(),
                    title: "Prototype pollution".to_string(),
                })
                .collect(),
        )
    }
}

#[test]
fn test_configured_scanner_reports_findings() {
    let dir = TempDir::new().unwrap();
    write_package_json(dir.path());
    let ctx = project(&dir).with_scanner(Arc::new(FlagLodash));

    let report = call_json(
        &ctx,
        "analyze_dependencies",
        json!({"outputFormat": "json", "checkSecurity": true}),
    );
    assert_eq!(report["security"]["status"], "scanned");
    assert_eq!(report["security"]["vulnerabilities"][0]["package"], "lodash");

    let text = call_text(&ctx, "analyze_dependencies", json!({"checkSecurity": true}));
    assert!(text.contains("- [high] GHSA-0001 in lodash: Prototype pollution"));

    let unscanned = call_json(&ctx, "analyze_dependencies", json!({"outputFormat": "json"}));
    assert!(unscanned.get("security").map_or(true, Value::is_null));
}

#[test]
fn test_bad_output_format_rejected() {
    let dir = TempDir::new().unwrap();
    let err = call_err(&project(&dir), "analyze_dependencies", json!({"outputFormat": "xml"}));
    assert!(matches!(err, ContextError::Validation { .. }));
}

// ---------------------------------------------------------------------------
// get_recent_changes
// ---------------------------------------------------------------------------

#[test]
fn test_recent_changes_without_backend() {
    let dir = TempDir::new().unwrap();
    let text = call_text(&project(&dir), "get_recent_changes", json!({"days": 30}));
    assert!(text.contains("not available"));
    assert!(text.contains("last 30 days"));
}

#[test]
fn test_recent_changes_parameter_ranges() {
    let dir = TempDir::new().unwrap();
    let ctx = project(&dir);
    for args in [json!({"days": 0}), json!({"days": 366}), json!({"maxCommits": 501})] {
        let err = call_err(&ctx, "get_recent_changes", args);
        assert!(matches!(err, ContextError::Validation { .. }));
    }
}

struct FixedHistory;

impl ChangeHistory for FixedHistory {
    fn recent_changes(&self, _root: &Path, query: &ChangeQuery) -> HistoryOutcome {
        assert_eq!(query.max_commits, 5);
        HistoryOutcome::Commits(vec![CommitSummary {
            hash: "0123456789abcdef".to_string(),
            author: "dev".to_string(),
            date: "2024-05-01T10:00:00+00:00".to_string(),
            message: "Fix parser".to_string(),
            files_changed: vec!["src/parser.rs".to_string()],
        }])
    }
}

#[test]
fn test_recent_changes_with_backend() {
    let dir = TempDir::new().unwrap();
    let ctx = project(&dir).with_history(Arc::new(FixedHistory));
    let text = call_text(&ctx, "get_recent_changes", json!({"maxCommits": 5}));
    assert!(text.contains("01234567"));
    assert!(text.contains("Fix parser"));
    assert!(text.contains("src/parser.rs"));
}

#[test]
fn test_recent_changes_mentions_detected_repository() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".git/refs/heads")).unwrap();
    fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(dir.path().join(".git/refs/heads/main"), "abc123\n").unwrap();

    let text = call_text(&project(&dir), "get_recent_changes", json!({}));
    assert!(text.contains("Repository detected on branch main"));

    let ctx = project(&dir).with_vcs_probe(Arc::new(NoVcsProbe));
    let text = call_text(&ctx, "get_recent_changes", json!({}));
    assert!(text.contains("not available"));
    assert!(!text.contains("Repository detected"));
    assert!(ctx.overview().unwrap().git.is_none());
}

// ---------------------------------------------------------------------------
// navigate_structure
// ---------------------------------------------------------------------------

fn nested_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/components")).unwrap();
    fs::write(dir.path().join("src/index.ts"), "").unwrap();
    fs::write(dir.path().join("src/styles.css"), "").unwrap();
    fs::write(dir.path().join("src/components/Button.tsx"), "").unwrap();
    fs::write(dir.path().join("README.md"), "").unwrap();
    dir
}

#[test]
fn test_navigate_root_depth_one() {
    let dir = nested_project();
    let out = call_json(&project(&dir), "navigate_structure", json!({}));
    let items = out["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "src");
    assert!(items[0].get("children").is_none());
    assert_eq!(out["breadcrumbs"].as_array().unwrap().len(), 1);
}

#[test]
fn test_navigate_subdirectory_with_filter() {
    let dir = nested_project();
    let out = call_json(
        &project(&dir),
        "navigate_structure",
        json!({"path": "src", "depth": 2, "filterExtensions": [".tsx", "ts"]}),
    );
    let names: Vec<&str> = out["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["components", "index.ts"]);
    assert_eq!(out["items"][0]["children"][0]["name"], "Button.tsx");
    assert_eq!(out["breadcrumbs"][1]["path"], "src");
    assert_eq!(out["totalItems"], 3);
}

#[test]
fn test_navigate_directories_only() {
    let dir = nested_project();
    let out = call_json(&project(&dir), "navigate_structure", json!({"includeFiles": false}));
    assert_eq!(out["items"].as_array().unwrap().len(), 1);
}

#[test]
fn test_navigate_missing_path() {
    let dir = nested_project();
    let ctx = project(&dir);
    assert!(matches!(
        call_err(&ctx, "navigate_structure", json!({"path": "nope"})),
        ContextError::NotFound { .. }
    ));
    assert!(matches!(
        call_err(&ctx, "navigate_structure", json!({"depth": 11})),
        ContextError::Validation { .. }
    ));
}

// ---------------------------------------------------------------------------
// search_project
// ---------------------------------------------------------------------------

#[test]
fn test_search_requires_query() {
    let dir = TempDir::new().unwrap();
    let ctx = project(&dir);
    for args in [json!({}), json!({"query": ""}), json!({"query": "   "})] {
        assert!(matches!(
            call_err(&ctx, "search_project", args),
            ContextError::Validation { .. }
        ));
    }
}

#[test]
fn test_search_max_results_one() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "needle\nneedle\n").unwrap();
    fs::write(dir.path().join("b.txt"), "needle\n").unwrap();

    let out = call_json(
        &project(&dir),
        "search_project",
        json!({"query": "needle", "includeContent": true, "maxResults": 1}),
    );
    assert_eq!(out["results"].as_array().unwrap().len(), 1);
    assert_eq!(out["totalMatches"], 1);
    assert_eq!(out["limitReached"], true);
    assert!(out["searchTime"].as_u64().is_some());
}

#[test]
fn test_search_skips_oversized_files() {
    let dir = TempDir::new().unwrap();
    let mut big = b"needle\n".to_vec();
    big.resize(DEFAULT_MAX_FILE_SIZE as usize + 1, b'x');
    fs::write(dir.path().join("big.txt"), big).unwrap();

    let out = call_json(
        &project(&dir),
        "search_project",
        json!({"query": "needle", "includeContent": true}),
    );
    assert_eq!(out["totalMatches"], 0);
}

#[test]
fn test_search_file_pattern_and_case() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Config.ts"), "").unwrap();
    fs::write(dir.path().join("config.rs"), "").unwrap();
    let ctx = project(&dir);

    let out = call_json(&ctx, "search_project", json!({"query": "config", "filePattern": "*.rs"}));
    assert_eq!(out["totalMatches"], 1);
    assert_eq!(out["results"][0]["path"], "config.rs");
    assert_eq!(out["results"][0]["type"], "filename");

    let out = call_json(&ctx, "search_project", json!({"query": "Config", "caseSensitive": true}));
    assert_eq!(out["totalMatches"], 1);

    assert!(matches!(
        call_err(&ctx, "search_project", json!({"query": "x", "filePattern": "[unclosed"})),
        ContextError::Validation { .. }
    ));
}

#[test]
fn test_unknown_tool_names_the_tool() {
    let dir = TempDir::new().unwrap();
    let err = call_err(&project(&dir), "unknown_tool", json!({}));
    assert!(matches!(err, ContextError::NotFound { .. }));
    assert!(err.message().contains("unknown_tool"));
}

#[test]
fn test_non_object_arguments_rejected() {
    let dir = TempDir::new().unwrap();
    let err = call_err(&project(&dir), "search_project", json!(["needle"]));
    assert!(matches!(err, ContextError::Validation { .. }));
}
