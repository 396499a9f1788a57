use crate::types::{Dependency, Vulnerability};

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// No vulnerability database is wired in.
    NotConfigured,
    /// The scan ran; the list may be empty.
    Scanned(Vec<Vulnerability>),
}

impl ScanOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            ScanOutcome::NotConfigured => "not_configured",
            ScanOutcome::Scanned(_) => "scanned",
        }
    }

    pub fn vulnerabilities(&self) -> &[Vulnerability] {
        match self {
            ScanOutcome::NotConfigured => &[],
            ScanOutcome::Scanned(v) => v,
        }
    }
}

pub trait VulnerabilityScanner: Send + Sync {
    fn scan(&self, dependencies: &[Dependency]) -> ScanOutcome;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoVulnerabilityScanner;

impl VulnerabilityScanner for NoVulnerabilityScanner {
    fn scan(&self, _dependencies: &[Dependency]) -> ScanOutcome {
        ScanOutcome::NotConfigured
    }
}
