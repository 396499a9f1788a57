//! Manifest parsing and normalized dependency sets.
//!
//! npm-family projects are read from `package.json`, cargo projects from
//! `Cargo.toml`. Any other manager yields an empty set carrying the manager
//! name, and a manifest that fails to parse degrades the same way.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::analysis::classifier::lock_file_for;
use crate::errors::{ContextError, Result};
use crate::ports::fs::FileSystem;
use crate::types::{Dependency, DependencyGroups, DependencySet, DependencyType};

pub const PACKAGE_JSON: &str = "package.json";
pub const CARGO_TOML: &str = "Cargo.toml";

/// Manager name used when none could be detected.
pub const UNKNOWN_MANAGER: &str = "unknown";

/// Identity and declared dependencies of a project, independent of the
/// manifest format it came from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub optional_dependencies: BTreeMap<String, String>,
    pub peer_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    fn declared(&self, dep_type: DependencyType) -> &BTreeMap<String, String> {
        match dep_type {
            DependencyType::Production => &self.dependencies,
            DependencyType::Development => &self.dev_dependencies,
            DependencyType::Optional => &self.optional_dependencies,
            DependencyType::Peer => &self.peer_dependencies,
        }
    }
}

/// Parses a `package.json` document.
pub fn parse_package_json(text: &str) -> Result<Manifest> {
    serde_json::from_str(text)
        .map_err(|e| ContextError::validation(format!("malformed {}: {}", PACKAGE_JSON, e)))
}

/// Parses a `Cargo.toml` document.
///
/// `optional = true` dependencies are reported as optional, and
/// `[build-dependencies]` are folded into the development group.
pub fn parse_cargo_toml(text: &str) -> Result<Manifest> {
    let doc: toml::Table = toml::from_str(text)
        .map_err(|e| ContextError::validation(format!("malformed {}: {}", CARGO_TOML, e)))?;

    let package = doc.get("package").and_then(|p| p.as_table());
    let field = |key: &str| -> Option<String> {
        package.and_then(|p| p.get(key)).map(|v| match v {
            toml::Value::String(s) => s.clone(),
            toml::Value::Table(t) if t.get("workspace").and_then(|w| w.as_bool()) == Some(true) => {
                "workspace".to_string()
            }
            other => other.to_string(),
        })
    };

    let mut manifest = Manifest {
        name: field("name"),
        version: field("version"),
        description: field("description"),
        ..Manifest::default()
    };

    if let Some(deps) = doc.get("dependencies").and_then(|d| d.as_table()) {
        for (name, spec) in deps {
            let target = if is_optional_cargo_dep(spec) {
                &mut manifest.optional_dependencies
            } else {
                &mut manifest.dependencies
            };
            target.insert(name.clone(), cargo_version(spec));
        }
    }
    for section in ["dev-dependencies", "build-dependencies"] {
        if let Some(deps) = doc.get(section).and_then(|d| d.as_table()) {
            for (name, spec) in deps {
                manifest
                    .dev_dependencies
                    .entry(name.clone())
                    .or_insert_with(|| cargo_version(spec));
            }
        }
    }

    Ok(manifest)
}

fn is_optional_cargo_dep(spec: &toml::Value) -> bool {
    spec.as_table()
        .and_then(|t| t.get("optional"))
        .and_then(|o| o.as_bool())
        .unwrap_or(false)
}

fn cargo_version(spec: &toml::Value) -> String {
    match spec {
        toml::Value::String(v) => v.clone(),
        toml::Value::Table(t) => {
            if let Some(v) = t.get("version").and_then(|v| v.as_str()) {
                v.to_string()
            } else if let Some(p) = t.get("path").and_then(|v| v.as_str()) {
                format!("path:{}", p)
            } else if let Some(g) = t.get("git").and_then(|v| v.as_str()) {
                format!("git:{}", g)
            } else if t.get("workspace").and_then(|w| w.as_bool()) == Some(true) {
                "workspace".to_string()
            } else {
                "*".to_string()
            }
        }
        _ => "*".to_string(),
    }
}

/// The version a range asks for, with range operators stripped.
///
/// `^4.17.21` → `4.17.21`, `>=1.2 <2` → `1.2`. Anything that does not start
/// with a version after stripping is returned unchanged.
pub fn requested_version(range: &str) -> String {
    let stripped = range
        .trim()
        .trim_start_matches(|c: char| matches!(c, '^' | '~' | '>' | '<' | '=' | 'v' | ' '));
    let first = stripped
        .split(|c: char| c.is_whitespace() || c == ',')
        .next()
        .unwrap_or_default();
    if first.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        first.to_string()
    } else {
        range.to_string()
    }
}

/// Manifest file name for a package manager this reader can parse.
pub fn manifest_file_for(package_manager: &str) -> Option<&'static str> {
    match package_manager {
        "npm" | "yarn" | "pnpm" => Some(PACKAGE_JSON),
        "cargo" => Some(CARGO_TOML),
        _ => None,
    }
}

/// Reads and parses the project manifest, trying `package.json` first.
///
/// A missing manifest yields `None`; a malformed one is logged and also
/// yields `None`.
pub fn read_manifest(fs: &dyn FileSystem, root: &Path) -> Option<Manifest> {
    for (file, parse) in [
        (PACKAGE_JSON, parse_package_json as fn(&str) -> Result<Manifest>),
        (CARGO_TOML, parse_cargo_toml),
    ] {
        let path = root.join(file);
        let Ok(text) = fs.read_to_string(&path) else {
            continue;
        };
        match parse(&text) {
            Ok(manifest) => return Some(manifest),
            Err(e) => {
                warn!(manifest = file, error = %e, "ignoring malformed manifest");
                return None;
            }
        }
    }
    None
}

/// Builds the dependency set for the detected package manager.
pub fn read_dependencies(
    fs: &dyn FileSystem,
    root: &Path,
    package_manager: Option<&str>,
) -> DependencySet {
    let Some(manager) = package_manager else {
        return DependencySet::empty(UNKNOWN_MANAGER);
    };
    let Some(manifest_file) = manifest_file_for(manager) else {
        debug!(package_manager = manager, "no dependency parser for package manager");
        return DependencySet::empty(manager);
    };

    let parsed = fs
        .read_to_string(&root.join(manifest_file))
        .map_err(ContextError::from)
        .and_then(|text| match manifest_file {
            CARGO_TOML => parse_cargo_toml(&text),
            _ => parse_package_json(&text),
        });
    let manifest = match parsed {
        Ok(m) => m,
        Err(e) => {
            warn!(package_manager = manager, error = %e, "failed to read dependencies");
            return DependencySet::empty(manager);
        }
    };

    let dependencies = group_dependencies(&manifest);
    let lock_file_exists = lock_file_for(manager)
        .map(|lock| fs.exists(&root.join(lock)))
        .unwrap_or(false);

    DependencySet {
        package_manager: manager.to_string(),
        total_count: dependencies.len(),
        dependencies,
        lock_file_exists,
    }
}

/// One `Dependency` per declared name, grouped by type and sorted by name.
pub fn group_dependencies(manifest: &Manifest) -> DependencyGroups {
    let mut groups = DependencyGroups::default();
    for dep_type in DependencyType::all() {
        let group = groups.get_mut(dep_type);
        for (name, range) in manifest.declared(dep_type) {
            group.push(Dependency {
                name: name.clone(),
                version: range.clone(),
                resolved_version: requested_version(range),
                dep_type,
                license: None,
                homepage: None,
                vulnerabilities: None,
            });
        }
    }
    groups
}
