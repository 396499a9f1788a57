//! Project introspection: tree walks, technology detection, dependency
//! parsing, content search, and dependency reports.

/// Language, framework, and package-manager detection.
pub mod classifier;

/// Manifest parsing into normalized dependency sets.
pub mod dependencies;

/// Dependency analysis rendering.
pub mod report;

/// File name and content search.
pub mod search;

/// Policy-driven directory traversal.
pub mod traversal;

pub use classifier::{detect_framework, detect_language, detect_package_manager};
pub use dependencies::{read_dependencies, read_manifest, Manifest};
pub use report::{analyze_dependencies, DependencyAnalysis, OutputFormat};
pub use search::{search_project, SearchMatch, SearchOptions, SearchOutcome};
pub use traversal::{Traversal, TreeOptions};
