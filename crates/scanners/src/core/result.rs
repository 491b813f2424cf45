use crate::core::{CoreFinding, Severity};
use serde::{Deserialize, Serialize};

/// Counters for one scan. Only successfully processed units are counted;
/// a file or chunk whose processing failed is excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub scanned_chunks: usize,
    pub duration_ms: u64,
}

/// Output of one full scan.
///
/// `findings` is the raw, phase-ordered signal; `composite_findings` is the
/// correlator's deduplicated, promotion-applied view of the same data. The
/// two coexist: consumers wanting the full signal read `findings`, report
/// consumers read `composite_findings`. The result is immutable once the
/// pipeline returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreScanResult {
    pub findings: Vec<CoreFinding>,
    pub composite_findings: Vec<CoreFinding>,
    pub stats: ScanStats,
}

impl CoreScanResult {
    /// Findings the eval matcher and report renderers should consume:
    /// the correlated view when present, the raw view otherwise.
    pub fn report_findings(&self) -> &[CoreFinding] {
        if self.composite_findings.is_empty() {
            &self.findings
        } else {
            &self.composite_findings
        }
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.report_findings()
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty() && self.composite_findings.is_empty()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FindingKind, Severity};

    #[test]
    fn report_findings_prefers_composite() {
        let raw = CoreFinding::new(FindingKind::Static, "det", Severity::Low, "raw");
        let merged =
            CoreFinding::new(FindingKind::RepositoryComposite, "postprocess", Severity::High, "merged");

        let result = CoreScanResult {
            findings: vec![raw.clone()],
            composite_findings: vec![merged],
            stats: ScanStats::default(),
        };
        assert_eq!(result.report_findings().len(), 1);
        assert_eq!(result.report_findings()[0].severity, Severity::High);

        let result = CoreScanResult {
            findings: vec![raw],
            composite_findings: vec![],
            stats: ScanStats::default(),
        };
        assert_eq!(result.report_findings()[0].summary, "raw");
    }
}
