use projectlens::config::{save_config, ServerConfig};
use projectlens::mcp::transport::ErrorCode;
use projectlens::mcp::McpServer;
use projectlens::project::ProjectContext;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn rpc(server: &McpServer, id: u64, method: &str, params: Value) -> Value {
    let line = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string();
    let resp = server.handle_line(&line).unwrap();
    serde_json::to_value(resp).unwrap()
}

fn text_of(resp: &Value) -> String {
    resp["result"]["content"][0]["text"].as_str().unwrap().to_string()
}

fn build_project(root: &std::path::Path) {
    fs::create_dir_all(root.join("src/bin")).unwrap();
    fs::write(
        root.join("Cargo.toml"),
        r#"[package]
name = "widget"
version = "0.3.1"
description = "Widget toolkit"

[dependencies]
serde = { version = "1", features = ["derive"] }
axum = "0.7"

[dev-dependencies]
tempfile = "3"
"#,
    )
    .unwrap();
    fs::write(root.join("Cargo.lock"), "# lock\n").unwrap();
    fs::write(root.join("src/lib.rs"), "pub fn widget() {}\n").unwrap();
    fs::write(root.join("src/bin/cli.rs"), "fn main() { widget::widget(); }\n").unwrap();
    fs::create_dir_all(root.join("target/debug")).unwrap();
    fs::write(root.join("target/debug/widget"), "binary").unwrap();

    fs::create_dir_all(root.join(".git/refs/heads")).unwrap();
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(
        root.join(".git/refs/heads/main"),
        "89abcdef0123456789abcdef0123456789abcdef\n",
    )
    .unwrap();
}

#[test]
fn test_full_session() {
    let dir = TempDir::new().unwrap();
    build_project(dir.path());
    save_config(
        dir.path(),
        &ServerConfig {
            root_dir: dir.path().to_string_lossy().to_string(),
            ..ServerConfig::default()
        },
    )
    .unwrap();
    let server = McpServer::new(ProjectContext::open(dir.path()).unwrap());

    let init = rpc(&server, 1, "initialize", json!({"clientInfo": {"name": "it"}}));
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");

    let overview = rpc(&server, 2, "resources/read", json!({"uri": "context://project/overview"}));
    let overview: Value =
        serde_json::from_str(overview["result"]["contents"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(overview["name"], "widget");
    assert_eq!(overview["version"], "0.3.1");
    assert_eq!(overview["language"], "Rust");
    assert_eq!(overview["framework"], "Axum");
    assert_eq!(overview["packageManager"], "cargo");
    assert_eq!(overview["git"]["isRepository"], true);
    assert_eq!(overview["git"]["branch"], "main");
    // Cargo.toml, Cargo.lock, lib.rs, cli.rs; target/ and .git/ are skipped.
    assert_eq!(overview["fileCount"], 4);

    let deps = rpc(
        &server,
        3,
        "tools/call",
        json!({"name": "analyze_dependencies", "arguments": {"outputFormat": "json"}}),
    );
    let deps: Value = serde_json::from_str(&text_of(&deps)).unwrap();
    assert_eq!(deps["totalDependencies"], 3);
    assert_eq!(deps["lockFileExists"], true);

    let search = rpc(
        &server,
        4,
        "tools/call",
        json!({"name": "search_project", "arguments": {"query": "widget", "includeContent": true}}),
    );
    let search: Value = serde_json::from_str(&text_of(&search)).unwrap();
    let paths: Vec<&str> = search["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"src/lib.rs"));
    assert!(!paths.iter().any(|p| p.starts_with("target/")));

    let prompt = rpc(&server, 5, "prompts/get", json!({"name": "architecture_review"}));
    let text = prompt["result"]["messages"][0]["content"]["text"].as_str().unwrap();
    assert!(text.contains("widget"));
    assert!(!text.contains("target/"));

    let missing = rpc(
        &server,
        6,
        "resources/read",
        json!({"uri": "context://file/src/missing.rs"}),
    );
    assert_eq!(missing["error"]["code"], ErrorCode::ResourceNotFound.as_i32());
    assert!(missing["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Resource not found:"));

    let stats = server.server_stats_json();
    assert_eq!(stats["tool_calls"], 2);
    assert_eq!(stats["errors"], 1);
}

#[test]
fn test_open_rejects_missing_root() {
    let dir = TempDir::new().unwrap();
    let err = ProjectContext::open(&dir.path().join("absent")).err().unwrap();
    assert_eq!(err.kind(), "not_found");
}
