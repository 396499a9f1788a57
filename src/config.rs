use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ContextError, Result};

/// Name of the configuration file stored inside the `.projectlens` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory holding projectlens settings.
pub const PROJECTLENS_DIR: &str = ".projectlens";

/// Files above this size are never read.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Directory names that are never descended into.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    "target",
    "coverage",
    ".next",
    ".nuxt",
    ".cache",
    "__pycache__",
    ".venv",
    "venv",
    "vendor",
];

/// Server configuration for one project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Root directory of the project being described.
    pub root_dir: String,
    pub traversal: TraversalPolicy,
    pub rate_limit: RateLimitConfig,
    pub prompts: PromptLimits,
    pub search: SearchDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            root_dir: String::new(),
            traversal: TraversalPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            prompts: PromptLimits::default(),
            search: SearchDefaults::default(),
        }
    }
}

/// Ignore rules and read ceiling shared by the traversal engine and the tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalPolicy {
    /// Directory names never descended into, regardless of filters.
    pub skip_dirs: Vec<String>,
    /// Maximum file size in bytes; larger files are never read.
    pub max_file_size: u64,
    /// Dot-prefixed names are hidden unless they start with this prefix.
    pub hidden_allow_prefix: String,
}

impl Default for TraversalPolicy {
    fn default() -> Self {
        Self {
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            hidden_allow_prefix: ".git".to_string(),
        }
    }
}

impl TraversalPolicy {
    /// Returns `true` if an entry with this name should be left out entirely.
    ///
    /// Hidden names are skipped unless they carry the allow prefix; skip-set
    /// directories are skipped even when the allow prefix matches.
    pub fn is_ignored(&self, name: &str, is_dir: bool) -> bool {
        if name.starts_with('.') && !name.starts_with(&self.hidden_allow_prefix) {
            return true;
        }
        is_dir && self.skip_dirs.iter().any(|d| d == name)
    }

    /// Returns `true` if a file of `size` bytes may be read.
    pub fn is_readable_size(&self, size: u64) -> bool {
        size <= self.max_file_size
    }
}

/// Sliding-window rate limit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per caller inside one window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 120,
            window_secs: 60,
        }
    }
}

/// Limits applied when prompts embed project data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptLimits {
    /// Characters kept from each embedded file.
    pub max_file_chars: usize,
    /// Children rendered per directory before an "N more" line.
    pub max_children: usize,
    /// Directory levels rendered in structure outlines.
    pub max_depth: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_file_chars: 2000,
            max_children: 10,
            max_depth: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub max_results: usize,
    pub max_results_ceiling: usize,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            max_results: 50,
            max_results_ceiling: 1000,
        }
    }
}

/// Returns the path to the `.projectlens` directory within the given project root.
pub fn get_projectlens_dir(project_root: &Path) -> PathBuf {
    project_root.join(PROJECTLENS_DIR)
}

/// Returns the path to `config.json` within the `.projectlens` directory.
pub fn get_config_path(project_root: &Path) -> PathBuf {
    get_projectlens_dir(project_root).join(CONFIG_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns a default configuration
/// with `root_dir` set to the given project root. Missing fields in an
/// existing file take their defaults.
pub fn load_config(project_root: &Path) -> Result<ServerConfig> {
    let config_path = get_config_path(project_root);

    if !config_path.exists() {
        return Ok(ServerConfig {
            root_dir: project_root.to_string_lossy().to_string(),
            ..ServerConfig::default()
        });
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| {
        ContextError::internal(format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    let mut config: ServerConfig = serde_json::from_str(&contents).map_err(|e| {
        ContextError::validation(format!(
            "failed to parse config file '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    if config.root_dir.is_empty() {
        config.root_dir = project_root.to_string_lossy().to_string();
    }
    Ok(config)
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it into place.
pub fn save_config(project_root: &Path, config: &ServerConfig) -> Result<()> {
    let dir = get_projectlens_dir(project_root);
    fs::create_dir_all(&dir).map_err(|e| {
        ContextError::internal(format!(
            "failed to create config directory '{}': {}",
            dir.display(),
            e
        ))
    })?;

    let config_path = get_config_path(project_root);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config)?;

    fs::write(&tmp_path, &json).map_err(|e| {
        ContextError::internal(format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ))
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| {
        ContextError::internal(format!(
            "failed to rename '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_names_skipped_except_git_prefix() {
        let policy = TraversalPolicy::default();
        assert!(policy.is_ignored(".env", false));
        assert!(policy.is_ignored(".vscode", true));
        assert!(!policy.is_ignored(".gitignore", false));
        assert!(!policy.is_ignored(".github", true));
    }

    #[test]
    fn test_skip_set_applies_to_directories_only() {
        let policy = TraversalPolicy::default();
        assert!(policy.is_ignored("node_modules", true));
        assert!(policy.is_ignored(".git", true));
        assert!(!policy.is_ignored("build", false));
        assert!(!policy.is_ignored("src", true));
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        let policy = TraversalPolicy::default();
        assert!(policy.is_readable_size(DEFAULT_MAX_FILE_SIZE));
        assert!(!policy.is_readable_size(DEFAULT_MAX_FILE_SIZE + 1));
    }
}
