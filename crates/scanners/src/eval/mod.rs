//! Evaluation harness: scores a scan result against a labeled group
//! specification of expected and disallowed findings.
//!
//! A mismatch is not an error. The matcher always returns a `MatchReport`;
//! failing the group is a normal value the harness inspects.

use crate::core::{CoreFinding, CoreScanResult, Severity};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One expected finding in a labeled fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedFinding {
    pub filepath: String,

    /// Free-text description of what the scanner is expected to report.
    pub expectation: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rule_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub anchor_node_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_line: Option<usize>,

    pub severity: Severity,
}

/// Ground truth for one vulnerability-class fixture. Authored once, loaded
/// at eval time, never mutated by the scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalGroupSpec {
    pub id: String,
    pub description: String,
    pub allow_unexpected: bool,
    pub expected_findings: Vec<ExpectedFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedExpectation {
    pub expected: ExpectedFinding,
    pub finding: CoreFinding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    pub group_id: String,
    pub matched: Vec<MatchedExpectation>,
    pub missed: Vec<ExpectedFinding>,
    pub unexpected: Vec<CoreFinding>,
    pub allow_unexpected: bool,
}

impl MatchReport {
    /// Zero missed, and zero unexpected unless the spec tolerates them.
    pub fn passed(&self) -> bool {
        self.missed.is_empty() && (self.allow_unexpected || self.unexpected.is_empty())
    }
}

fn lines_overlap(expected: &ExpectedFinding, finding: &CoreFinding) -> bool {
    let expected_span = expected
        .start_line
        .map(|start| (start, expected.end_line.unwrap_or(start)));
    let finding_span = finding.location.as_ref().and_then(|l| l.line_span());

    match (expected_span, finding_span) {
        // The range constraint only binds when both sides specify one.
        (Some((e0, e1)), Some((f0, f1))) => e0 <= f1 && f0 <= e1,
        _ => true,
    }
}

fn anchors_agree(expected: &ExpectedFinding, finding: &CoreFinding) -> bool {
    match (
        expected.anchor_node_id.as_deref(),
        finding.location.as_ref().and_then(|l| l.node_id.as_deref()),
    ) {
        (Some(expected_anchor), Some(found_anchor)) => expected_anchor == found_anchor,
        _ => true,
    }
}

fn satisfies(expected: &ExpectedFinding, finding: &CoreFinding) -> bool {
    finding.file() == Some(expected.filepath.as_str())
        && lines_overlap(expected, finding)
        && anchors_agree(expected, finding)
        && finding.severity >= expected.severity
}

/// Score one finished scan against one group spec.
///
/// Candidates come from `composite_findings`, falling back to the raw
/// `findings` when composite is empty. Candidates are consumed in a
/// deterministic order (file path, then line, then severity) and each can
/// satisfy at most one expected entry.
pub fn match_result(result: &CoreScanResult, spec: &EvalGroupSpec) -> MatchReport {
    let pool = result.report_findings();

    let mut candidate_order: Vec<usize> = (0..pool.len()).collect();
    candidate_order.sort_by(|&a, &b| {
        let fa = &pool[a];
        let fb = &pool[b];
        fa.file()
            .cmp(&fb.file())
            .then_with(|| fa.start_line().cmp(&fb.start_line()))
            .then_with(|| fa.severity.cmp(&fb.severity))
            .then_with(|| a.cmp(&b))
    });

    let mut consumed = vec![false; pool.len()];
    let mut matched = Vec::new();
    let mut missed = Vec::new();

    for expected in &spec.expected_findings {
        let candidate = candidate_order
            .iter()
            .copied()
            .find(|&i| !consumed[i] && satisfies(expected, &pool[i]));

        match candidate {
            Some(i) => {
                consumed[i] = true;
                matched.push(MatchedExpectation {
                    expected: expected.clone(),
                    finding: pool[i].clone(),
                });
            }
            None => missed.push(expected.clone()),
        }
    }

    let unexpected: Vec<CoreFinding> = candidate_order
        .iter()
        .copied()
        .filter(|&i| !consumed[i])
        .map(|i| pool[i].clone())
        .collect();

    MatchReport {
        group_id: spec.id.clone(),
        matched,
        missed,
        unexpected,
        allow_unexpected: spec.allow_unexpected,
    }
}

/// Load group specs from a JSON/YAML file (one spec or a list) or from a
/// directory of such files in path order.
pub fn load_specs(path: impl AsRef<Path>) -> Result<Vec<EvalGroupSpec>> {
    let path = path.as_ref();

    if path.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(path)
            .with_context(|| format!("reading spec directory {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|ext| ext.to_str()),
                    Some("json") | Some("yaml") | Some("yml")
                )
            })
            .collect();
        entries.sort();

        let mut specs = Vec::new();
        for entry in entries {
            specs.extend(load_spec_file(&entry)?);
        }
        return Ok(specs);
    }

    load_spec_file(path)
}

fn load_spec_file(path: &Path) -> Result<Vec<EvalGroupSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading spec file {}", path.display()))?;

    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");

    let parsed = if is_json {
        serde_json::from_str::<Vec<EvalGroupSpec>>(&content)
            .or_else(|_| serde_json::from_str::<EvalGroupSpec>(&content).map(|s| vec![s]))
            .map_err(anyhow::Error::from)
    } else {
        serde_yaml::from_str::<Vec<EvalGroupSpec>>(&content)
            .or_else(|_| serde_yaml::from_str::<EvalGroupSpec>(&content).map(|s| vec![s]))
            .map_err(anyhow::Error::from)
    };

    parsed.with_context(|| format!("parsing spec file {}", path.display()))
}
