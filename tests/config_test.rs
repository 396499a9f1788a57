use projectlens::config::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_policy_skips_build_directories() {
    let policy = TraversalPolicy::default();
    assert!(policy.is_ignored("node_modules", true));
    assert!(policy.is_ignored("target", true));
    assert!(policy.is_ignored(".git", true));
    assert!(!policy.is_ignored("src", true));
    assert!(!policy.is_ignored("main.rs", false));
}

#[test]
fn test_hidden_names_except_git_prefix() {
    let policy = TraversalPolicy::default();
    assert!(policy.is_ignored(".env", false));
    assert!(policy.is_ignored(".vscode", true));
    assert!(!policy.is_ignored(".gitignore", false));
    assert!(!policy.is_ignored(".github", true));
}

#[test]
fn test_size_limit_is_inclusive() {
    let policy = TraversalPolicy::default();
    assert!(policy.is_readable_size(DEFAULT_MAX_FILE_SIZE));
    assert!(!policy.is_readable_size(DEFAULT_MAX_FILE_SIZE + 1));
}

#[test]
fn test_missing_config_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.root_dir, dir.path().to_string_lossy());
    assert_eq!(config.rate_limit, RateLimitConfig::default());
    assert_eq!(config.search.max_results, 50);
    assert_eq!(config.prompts.max_children, 10);
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let mut config = ServerConfig::default();
    config.rate_limit.max_requests = 7;
    config.traversal.skip_dirs.push("generated".to_string());
    save_config(dir.path(), &config).unwrap();

    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded.rate_limit.max_requests, 7);
    assert!(loaded.traversal.skip_dirs.iter().any(|d| d == "generated"));
    assert!(get_config_path(dir.path()).ends_with(".projectlens/config.json"));
}

#[test]
fn test_partial_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(get_projectlens_dir(dir.path())).unwrap();
    fs::write(
        get_config_path(dir.path()),
        r#"{"search": {"max_results": 5}}"#,
    )
    .unwrap();
    let loaded = load_config(dir.path()).unwrap();
    assert_eq!(loaded.search.max_results, 5);
    assert_eq!(loaded.search.max_results_ceiling, 1000);
    assert_eq!(loaded.traversal.max_file_size, DEFAULT_MAX_FILE_SIZE);
    assert!(!loaded.root_dir.is_empty());
}

#[test]
fn test_malformed_config_is_validation_error() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(get_projectlens_dir(dir.path())).unwrap();
    fs::write(get_config_path(dir.path()), "{not json").unwrap();
    let err = load_config(dir.path()).unwrap_err();
    assert_eq!(err.kind(), "validation");
}
