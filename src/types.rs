use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A URI-addressed, read-only snapshot advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Stable identifier; may contain a `{placeholder}` for templated resources.
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

/// Version-control facts about the project root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitInfo {
    pub is_repository: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
}

/// Abbreviates a commit hash to its first eight characters.
pub fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(8) {
        Some((end, _)) => &hash[..end],
        None => hash,
    }
}

/// Identity and aggregate statistics of the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    pub name: String,
    pub version: String,
    pub description: String,
    pub root_path: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,
    /// RFC 3339 timestamp of the most recent modification seen.
    pub last_modified: String,
    pub file_count: u64,
    pub size_in_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
}

/// Kind of an entry in the structure tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// One node of the project structure tree.
///
/// File nodes never have children. Directory nodes carry `Some(children)`
/// once listed; `None` means the directory was not expanded (unreadable or
/// beyond the depth bound).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStructureNode {
    /// Path relative to the project root, `/`-separated; empty for the root.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ProjectStructureNode>>,
}

impl ProjectStructureNode {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(ProjectStructureNode::node_count)
            .sum::<usize>()
    }
}

/// How a dependency was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Production,
    Development,
    Optional,
    Peer,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::Production => "production",
            DependencyType::Development => "development",
            DependencyType::Optional => "optional",
            DependencyType::Peer => "peer",
        }
    }

    pub fn all() -> [DependencyType; 4] {
        [
            DependencyType::Production,
            DependencyType::Development,
            DependencyType::Optional,
            DependencyType::Peer,
        ]
    }
}

/// A known vulnerability affecting a dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub id: String,
    pub package: String,
    pub severity: String,
    pub title: String,
}

/// One declared dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,
    /// The range exactly as declared in the manifest.
    pub version: String,
    /// The version the range requests, with range operators stripped.
    pub resolved_version: String,
    #[serde(rename = "type")]
    pub dep_type: DependencyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<Vulnerability>>,
}

/// Dependencies grouped by declaration type, each group sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGroups {
    pub production: Vec<Dependency>,
    pub development: Vec<Dependency>,
    pub optional: Vec<Dependency>,
    pub peer: Vec<Dependency>,
}

impl DependencyGroups {
    pub fn get(&self, dep_type: DependencyType) -> &[Dependency] {
        match dep_type {
            DependencyType::Production => &self.production,
            DependencyType::Development => &self.development,
            DependencyType::Optional => &self.optional,
            DependencyType::Peer => &self.peer,
        }
    }

    pub fn get_mut(&mut self, dep_type: DependencyType) -> &mut Vec<Dependency> {
        match dep_type {
            DependencyType::Production => &mut self.production,
            DependencyType::Development => &mut self.development,
            DependencyType::Optional => &mut self.optional,
            DependencyType::Peer => &mut self.peer,
        }
    }

    /// All dependencies in type order (production, development, optional, peer).
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        DependencyType::all()
            .into_iter()
            .flat_map(move |t| self.get(t).iter())
    }

    pub fn len(&self) -> usize {
        self.production.len() + self.development.len() + self.optional.len() + self.peer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The parsed dependency set of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySet {
    pub package_manager: String,
    pub dependencies: DependencyGroups,
    pub total_count: usize,
    pub lock_file_exists: bool,
}

impl DependencySet {
    /// An empty set for a manager that is unknown or not parsed.
    pub fn empty(package_manager: impl Into<String>) -> Self {
        Self {
            package_manager: package_manager.into(),
            dependencies: DependencyGroups::default(),
            total_count: 0,
            lock_file_exists: false,
        }
    }
}

/// Raw text of one project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub path: String,
    pub mime_type: String,
    pub text: String,
}

/// Aggregate result of a statistics traversal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeStats {
    pub file_count: u64,
    pub total_size: u64,
    /// Most recent modification time seen, as seconds since the UNIX epoch.
    pub last_modified: Option<i64>,
    /// Lower-cased extensions in first-seen order with their occurrence counts.
    pub extension_counts: Vec<(String, usize)>,
}

impl TreeStats {
    /// Records one occurrence of `ext`, keeping first-seen order.
    pub fn record_extension(&mut self, ext: &str) {
        match self.extension_counts.iter_mut().find(|(e, _)| e == ext) {
            Some((_, count)) => *count += 1,
            None => self.extension_counts.push((ext.to_string(), 1)),
        }
    }
}
