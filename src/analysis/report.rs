//! Dependency analysis and its three textual renderings.

use serde::Serialize;

use crate::ports::security::{ScanOutcome, VulnerabilityScanner};
use crate::types::{Dependency, DependencySet, DependencyType, Vulnerability};

/// Rendering selected by the `outputFormat` tool parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Summary,
    Detailed,
    Json,
}

#[allow(clippy::should_implement_trait)]
impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Summary => "summary",
            OutputFormat::Detailed => "detailed",
            OutputFormat::Json => "json",
        }
    }

    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s {
            "summary" => Some(OutputFormat::Summary),
            "detailed" => Some(OutputFormat::Detailed),
            "json" | "raw" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScan {
    /// `not_configured` when no vulnerability backend is wired in.
    pub status: String,
    pub vulnerabilities: Vec<Vulnerability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCounts {
    pub production: usize,
    pub development: usize,
    pub optional: usize,
    pub peer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyAnalysis {
    pub package_manager: String,
    pub total_dependencies: usize,
    pub lock_file_exists: bool,
    pub by_type: TypeCounts,
    pub dependencies: Vec<Dependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityScan>,
}

/// Selects the dependencies to report and optionally runs a security scan.
///
/// Development dependencies are left out unless `include_dev` is set.
pub fn analyze_dependencies(
    set: &DependencySet,
    include_dev: bool,
    scanner: Option<&dyn VulnerabilityScanner>,
) -> DependencyAnalysis {
    let dependencies: Vec<Dependency> = set
        .dependencies
        .iter()
        .filter(|d| include_dev || d.dep_type != DependencyType::Development)
        .cloned()
        .collect();

    let mut by_type = TypeCounts::default();
    for dep in &dependencies {
        match dep.dep_type {
            DependencyType::Production => by_type.production += 1,
            DependencyType::Development => by_type.development += 1,
            DependencyType::Optional => by_type.optional += 1,
            DependencyType::Peer => by_type.peer += 1,
        }
    }

    let security = scanner.map(|s| {
        let outcome = s.scan(&dependencies);
        SecurityScan {
            status: outcome.status().to_string(),
            vulnerabilities: outcome.vulnerabilities().to_vec(),
        }
    });

    DependencyAnalysis {
        package_manager: set.package_manager.clone(),
        total_dependencies: dependencies.len(),
        lock_file_exists: set.lock_file_exists,
        by_type,
        dependencies,
        security,
    }
}

pub fn render(analysis: &DependencyAnalysis, format: OutputFormat) -> String {
    match format {
        OutputFormat::Summary => render_summary(analysis),
        OutputFormat::Detailed => render_detailed(analysis),
        OutputFormat::Json => serde_json::to_string_pretty(analysis).unwrap_or_default(),
    }
}

fn render_summary(analysis: &DependencyAnalysis) -> String {
    let mut out = String::new();
    out.push_str("# Dependency Summary\n\n");
    out.push_str(&format!("**Package manager:** {}\n", analysis.package_manager));
    out.push_str(&format!(
        "**Lock file:** {}\n",
        if analysis.lock_file_exists { "present" } else { "missing" }
    ));
    out.push_str(&format!(
        "**Total dependencies:** {}\n\n",
        analysis.total_dependencies
    ));
    let counts = &analysis.by_type;
    for (label, n) in [
        ("Production", counts.production),
        ("Development", counts.development),
        ("Optional", counts.optional),
        ("Peer", counts.peer),
    ] {
        if n > 0 {
            out.push_str(&format!("- {}: {}\n", label, n));
        }
    }
    push_security(&mut out, analysis);
    out
}

fn render_detailed(analysis: &DependencyAnalysis) -> String {
    let mut out = String::new();
    out.push_str("# Dependency Analysis\n\n");
    out.push_str(&format!("**Package manager:** {}\n", analysis.package_manager));
    out.push_str(&format!(
        "**Total dependencies:** {}\n",
        analysis.total_dependencies
    ));

    for dep_type in DependencyType::all() {
        let deps: Vec<&Dependency> = analysis
            .dependencies
            .iter()
            .filter(|d| d.dep_type == dep_type)
            .collect();
        if deps.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {} ({})\n", title_case(dep_type.as_str()), deps.len()));
        for dep in deps {
            if dep.version == dep.resolved_version {
                out.push_str(&format!("- {} {}\n", dep.name, dep.version));
            } else {
                out.push_str(&format!(
                    "- {} {} (requests {})\n",
                    dep.name, dep.version, dep.resolved_version
                ));
            }
        }
    }
    if analysis.dependencies.is_empty() {
        out.push_str("\n_No dependencies declared._\n");
    }
    push_security(&mut out, analysis);
    out
}

fn push_security(out: &mut String, analysis: &DependencyAnalysis) {
    let Some(scan) = &analysis.security else {
        return;
    };
    out.push_str("\n## Security\n");
    if scan.status == ScanOutcome::NotConfigured.status() {
        out.push_str("No vulnerability database is configured; no scan was performed.\n");
    } else if scan.vulnerabilities.is_empty() {
        out.push_str("No known vulnerabilities found.\n");
    } else {
        for v in &scan.vulnerabilities {
            out.push_str(&format!(
                "- [{}] {} in {}: {}\n",
                v.severity, v.id, v.package, v.title
            ));
        }
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::dependencies::{group_dependencies, parse_package_json};
    use crate::ports::security::NoVulnerabilityScanner;

    fn set() -> DependencySet {
        let manifest = parse_package_json(
            r#"{"dependencies": {"a": "^1.0.0", "b": "2.0.0"}, "devDependencies": {"c": "~3.1.0"}}"#,
        )
        .unwrap();
        let dependencies = group_dependencies(&manifest);
        DependencySet {
            package_manager: "npm".to_string(),
            total_count: dependencies.len(),
            dependencies,
            lock_file_exists: false,
        }
    }

    #[test]
    fn test_dev_dependencies_toggle() {
        assert_eq!(analyze_dependencies(&set(), true, None).total_dependencies, 3);
        assert_eq!(analyze_dependencies(&set(), false, None).total_dependencies, 2);
    }

    #[test]
    fn test_not_configured_scan_is_explicit() {
        let analysis = analyze_dependencies(&set(), true, Some(&NoVulnerabilityScanner));
        let scan = analysis.security.as_ref().unwrap();
        assert_eq!(scan.status, "not_configured");
        assert!(scan.vulnerabilities.is_empty());
        assert!(render(&analysis, OutputFormat::Summary).contains("No vulnerability database"));
    }

    #[test]
    fn test_renderings() {
        let analysis = analyze_dependencies(&set(), true, None);
        let summary = render(&analysis, OutputFormat::Summary);
        assert!(summary.contains("**Total dependencies:** 3"));
        assert!(summary.contains("- Development: 1"));

        let detailed = render(&analysis, OutputFormat::Detailed);
        assert!(detailed.contains("## Production (2)"));
        assert!(detailed.contains("- a ^1.0.0 (requests 1.0.0)"));
        assert!(detailed.contains("- b 2.0.0\n"));

        let json: serde_json::Value =
            serde_json::from_str(&render(&analysis, OutputFormat::Json)).unwrap();
        assert_eq!(json["totalDependencies"], 3);
        assert_eq!(json["byType"]["production"], 2);
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::from_str("detailed"), Some(OutputFormat::Detailed));
        assert_eq!(OutputFormat::from_str("raw"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("xml"), None);
    }
}
