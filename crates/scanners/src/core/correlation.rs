//! Finding correlation and deduplication engine.
//!
//! Collapses duplicate findings reported by different phases and promotes
//! multi-signal agreement into composite findings. The transform is
//! order-independent (any permutation of the same input yields the same
//! output) and idempotent (feeding the output back in yields no new merges).

use crate::core::{sort_canonical, CoreFinding, FindingKind, Location};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Merge thresholds. These are tuned against the eval fixtures rather than
/// fixed by the data model, so they stay configurable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorrelatorConfig {
    /// Two findings can only be duplicates when their severities are within
    /// this many levels of each other.
    pub severity_tolerance: u8,

    /// Line ranges are widened by this many lines on both ends before the
    /// overlap test.
    pub line_slack: usize,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            severity_tolerance: 1,
            line_slack: 0,
        }
    }
}

pub struct Correlator {
    config: CorrelatorConfig,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new(CorrelatorConfig::default())
    }
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self { config }
    }

    /// Transform phase-level findings into the deduplicated, promoted
    /// composite view.
    pub fn correlate(&self, findings: &[CoreFinding]) -> Vec<CoreFinding> {
        let mut input: Vec<CoreFinding> = findings.to_vec();
        sort_canonical(&mut input);

        let survivors = self.deduplicate(input);
        let mut merged = self.promote(survivors);

        sort_canonical(&mut merged);
        merged
    }

    /// Two findings are duplicates when they share a category (or both have
    /// none), their locations overlap (same file with overlapping ranges, or
    /// both repository-wide), and their severities are within tolerance.
    fn is_duplicate(&self, a: &CoreFinding, b: &CoreFinding) -> bool {
        if a.category != b.category {
            return false;
        }

        if !a.severity.within(b.severity, self.config.severity_tolerance) {
            return false;
        }

        match (&a.location, &b.location) {
            (None, None) => true,
            (Some(la), Some(lb)) => la.overlaps(lb, self.config.line_slack),
            _ => false,
        }
    }

    /// Duplicate preference: highest severity wins; on a severity tie the
    /// kind with more corroboration wins; remaining ties keep the earlier
    /// finding in canonical order.
    fn keeps_over(candidate: &CoreFinding, kept: &CoreFinding) -> bool {
        (candidate.severity, candidate.kind.rank()) > (kept.severity, kept.kind.rank())
    }

    fn deduplicate(&self, input: Vec<CoreFinding>) -> Vec<CoreFinding> {
        let mut kept: Vec<CoreFinding> = Vec::with_capacity(input.len());

        for candidate in input {
            match kept.iter_mut().find(|k| self.is_duplicate(k, &candidate)) {
                Some(existing) => {
                    if Self::keeps_over(&candidate, existing) {
                        *existing = candidate;
                    }
                }
                None => kept.push(candidate),
            }
        }

        kept
    }

    /// Promote agreement across signal classes: every group of surviving
    /// findings that spans at least two kinds and references one site (same
    /// file, or files connected by recorded reachability edges) collapses
    /// into a single composite finding.
    fn promote(&self, survivors: Vec<CoreFinding>) -> Vec<CoreFinding> {
        let mut sites = SiteUnion::new();

        for finding in &survivors {
            if let Some(file) = finding.file() {
                sites.add(file);
                for other in finding.reachable_from() {
                    sites.add(other);
                    sites.union(file, other);
                }
            }
        }

        let mut groups: BTreeMap<String, Vec<CoreFinding>> = BTreeMap::new();
        let mut repo_wide: Vec<CoreFinding> = Vec::new();

        for finding in survivors {
            match finding.file() {
                Some(file) => {
                    let root = sites.root(file);
                    groups.entry(root).or_default().push(finding);
                }
                None => repo_wide.push(finding),
            }
        }

        let mut output = repo_wide;

        for (_, mut group) in groups {
            let distinct_kinds = {
                let mut kinds: Vec<FindingKind> = group.iter().map(|f| f.kind).collect();
                kinds.sort();
                kinds.dedup();
                kinds.len()
            };

            if group.len() >= 2 && distinct_kinds >= 2 {
                debug!(members = group.len(), "promoting corroborated group to composite");
                output.push(self.merge_group(&mut group));
            } else {
                output.append(&mut group);
            }
        }

        output
    }

    fn merge_group(&self, group: &mut Vec<CoreFinding>) -> CoreFinding {
        sort_canonical(group);

        // Severity is the maximum across the group; the first max-severity
        // member in canonical order donates the category and the
        // representative file.
        let severity = group.iter().map(|f| f.severity).max().expect("non-empty group");
        let head = group
            .iter()
            .find(|f| f.severity == severity)
            .expect("member with max severity");
        let category = head.category.clone();
        let file = head.file().unwrap_or_default().to_string();

        let mut files: Vec<&str> = group.iter().filter_map(|f| f.file()).collect();
        files.sort();
        files.dedup();

        let span = group
            .iter()
            .filter(|f| f.file() == Some(file.as_str()))
            .filter_map(|f| f.location.as_ref().and_then(Location::line_span))
            .fold(None::<(usize, usize)>, |acc, (s, e)| match acc {
                Some((lo, hi)) => Some((lo.min(s), hi.max(e))),
                None => Some((s, e)),
            });

        let mut location = Location::file(&file);
        if let Some((start, end)) = span {
            location = location.with_lines(start, end);
        }

        let summaries: Vec<&str> = group.iter().map(|f| f.summary.as_str()).collect();
        let sources: Vec<&str> = group.iter().map(|f| f.source.as_str()).collect();

        let mut merged = CoreFinding::new(
            FindingKind::RepositoryComposite,
            "postprocess",
            severity,
            format!(
                "{} corroborating signals indicate one vulnerability in {}",
                group.len(),
                file
            ),
        )
        .with_location(location)
        .with_detail("contributing_summaries", summaries.join("; "))
        .with_detail("contributing_sources", sources.join(","));

        if files.len() > 1 {
            merged = merged.with_detail("related_files", files.join(","));
        }
        if let Some(category) = category {
            merged = merged.with_category(category);
        }

        merged
    }
}

/// Union-find over file paths, for reachability-linked promotion groups.
struct SiteUnion {
    parent: BTreeMap<String, String>,
}

impl SiteUnion {
    fn new() -> Self {
        Self {
            parent: BTreeMap::new(),
        }
    }

    fn add(&mut self, file: &str) {
        self.parent
            .entry(file.to_string())
            .or_insert_with(|| file.to_string());
    }

    fn root(&self, file: &str) -> String {
        let mut current = file.to_string();
        while let Some(parent) = self.parent.get(&current) {
            if *parent == current {
                break;
            }
            current = parent.clone();
        }
        current
    }

    fn union(&mut self, a: &str, b: &str) {
        let ra = self.root(a);
        let rb = self.root(b);
        if ra != rb {
            // Smaller path string becomes the root, keeping roots stable
            // regardless of insertion order.
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(merge, keep);
        }
    }
}
