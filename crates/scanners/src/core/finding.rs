use crate::core::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Origin class of a finding. Composite findings encode more corroboration
/// than single-pass findings, which in turn outrank raw pattern hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Static,
    Repository,
    RepositoryComposite,
}

impl FindingKind {
    /// Tie-break rank for deduplication: more corroboration wins.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Static => 0,
            Self::Repository => 1,
            Self::RepositoryComposite => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Repository => "repository",
            Self::RepositoryComposite => "repository_composite",
        }
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured position of a finding. An absent `Location` on a finding means
/// repository-wide, not unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_id: Option<String>,
}

impl Location {
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            start_line: None,
            end_line: None,
            node_id: None,
        }
    }

    pub fn with_lines(mut self, start: usize, end: usize) -> Self {
        self.start_line = Some(start);
        self.end_line = Some(end.max(start));
        self
    }

    pub fn with_line(self, line: usize) -> Self {
        self.with_lines(line, line)
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Line-range overlap against another location in the same file, with
    /// each range widened by `slack` lines on both ends. A location without
    /// lines covers the whole file and overlaps any range in that file.
    pub fn overlaps(&self, other: &Location, slack: usize) -> bool {
        if self.file != other.file {
            return false;
        }

        match (self.line_span(), other.line_span()) {
            (Some((a0, a1)), Some((b0, b1))) => {
                let a0 = a0.saturating_sub(slack);
                let b0 = b0.saturating_sub(slack);
                a0 <= b1 + slack && b0 <= a1 + slack
            }
            // Whole-file locations overlap anything in the same file.
            _ => true,
        }
    }

    pub fn line_span(&self) -> Option<(usize, usize)> {
        let start = self.start_line?;
        Some((start, self.end_line.unwrap_or(start)))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line_span() {
            Some((start, end)) if start != end => write!(f, "{}:{}-{}", self.file, start, end),
            Some((start, _)) => write!(f, "{}:{}", self.file, start),
            None => f.write_str(&self.file),
        }
    }
}

/// Atomic unit of the scan report.
///
/// `kind`, `source`, `severity` and `summary` are always present. `category`
/// and `location` are optional and their absence is meaningful: an
/// uncategorized finding has no class, a location-less finding is
/// repository-wide. `details` is an open map carried through correlation
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreFinding {
    #[serde(rename = "type")]
    pub kind: FindingKind,

    pub source: String,

    pub severity: Severity,

    pub summary: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<Location>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub details: BTreeMap<String, String>,
}

impl CoreFinding {
    pub fn new(
        kind: FindingKind,
        source: impl Into<String>,
        severity: Severity,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            severity,
            summary: summary.into(),
            category: None,
            location: None,
            details: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.file.as_str())
    }

    pub fn start_line(&self) -> Option<usize> {
        self.location.as_ref().and_then(|l| l.start_line)
    }

    /// Files this finding claims reachability from, recorded by the
    /// composite pass as a comma-separated detail. Used for cross-file
    /// promotion.
    pub fn reachable_from(&self) -> Vec<&str> {
        self.details
            .get("reachable_from")
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Total order used everywhere determinism matters: category (absent
    /// first), file (repository-wide first), severity descending, kind rank
    /// descending, then start line, source and summary.
    pub fn canonical_key(&self) -> CanonicalKey<'_> {
        CanonicalKey {
            category: self.category.as_deref(),
            file: self.file(),
            severity_desc: std::cmp::Reverse(self.severity),
            kind_desc: std::cmp::Reverse(self.kind.rank()),
            start_line: self.start_line().unwrap_or(0),
            source: &self.source,
            summary: &self.summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CanonicalKey<'a> {
    category: Option<&'a str>,
    file: Option<&'a str>,
    severity_desc: std::cmp::Reverse<Severity>,
    kind_desc: std::cmp::Reverse<u8>,
    start_line: usize,
    source: &'a str,
    summary: &'a str,
}

/// Sort findings into the canonical order in place.
pub fn sort_canonical(findings: &mut [CoreFinding]) {
    findings.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_overlap_same_file() {
        let a = Location::file("src/a.ts").with_lines(10, 20);
        let b = Location::file("src/a.ts").with_lines(18, 30);
        let c = Location::file("src/a.ts").with_lines(25, 30);

        assert!(a.overlaps(&b, 0));
        assert!(!a.overlaps(&c, 0));
        assert!(a.overlaps(&c, 5));
    }

    #[test]
    fn location_overlap_requires_same_file() {
        let a = Location::file("src/a.ts").with_lines(10, 20);
        let b = Location::file("src/b.ts").with_lines(10, 20);
        assert!(!a.overlaps(&b, 100));
    }

    #[test]
    fn whole_file_location_overlaps_any_range() {
        let a = Location::file("src/a.ts");
        let b = Location::file("src/a.ts").with_lines(1, 2);
        assert!(a.overlaps(&b, 0));
        assert!(b.overlaps(&a, 0));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&FindingKind::RepositoryComposite).unwrap();
        assert_eq!(json, "\"repository_composite\"");
    }

    #[test]
    fn canonical_sort_is_total() {
        let mut findings = vec![
            CoreFinding::new(FindingKind::Static, "b", Severity::Low, "z"),
            CoreFinding::new(FindingKind::Static, "a", Severity::High, "a"),
            CoreFinding::new(FindingKind::Repository, "a", Severity::High, "a"),
        ];
        sort_canonical(&mut findings);
        assert_eq!(findings[0].severity, Severity::High);
        // Same severity: higher kind rank first.
        assert_eq!(findings[0].kind, FindingKind::Repository);
    }
}
