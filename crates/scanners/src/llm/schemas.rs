//! Wire schemas for model pass responses.
//!
//! Model output is JSON (possibly wrapped in a code fence); the parsers here
//! are the only place raw model text is interpreted. A response that fails
//! to parse is a unit failure for the chunk that produced it.

use crate::core::{CoreFinding, FindingKind, Location, Severity};
use crate::llm::LlmError;
use serde::{Deserialize, Serialize};

/// Triage priority assigned by the map pass. Orders chunks for the deeper
/// passes; `Medium` is the default when the map pass fails for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResponse {
    pub risk: RiskLevel,

    #[serde(default)]
    pub areas: Vec<String>,
}

/// Severity vocabulary the model is allowed to use. `Informational` maps
/// down to `Low` in the core model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl From<SeverityLevel> for Severity {
    fn from(level: SeverityLevel) -> Self {
        match level {
            SeverityLevel::Critical => Severity::Critical,
            SeverityLevel::High => Severity::High,
            SeverityLevel::Medium => Severity::Medium,
            SeverityLevel::Low | SeverityLevel::Informational => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFinding {
    pub title: String,

    pub severity: SeverityLevel,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rule_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rationale: Option<String>,

    /// Files from which this site is reachable, when the pass traced a
    /// cross-file path.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub reachable_from: Vec<String>,
}

impl ModelFinding {
    /// Lower into the core model. `fallback_file` anchors findings the
    /// model did not attach to a file (the chunk's own file for chunk
    /// passes, none for the composite pass).
    pub fn into_core(
        self,
        kind: FindingKind,
        source: &str,
        fallback_file: Option<&str>,
    ) -> CoreFinding {
        let mut finding = CoreFinding::new(kind, source, self.severity.into(), self.title);

        if let Some(category) = self.category {
            finding = finding.with_category(category);
        }
        if let Some(rule_id) = self.rule_id {
            finding = finding.with_detail("rule_id", rule_id);
        }
        if let Some(rationale) = self.rationale {
            finding = finding.with_detail("rationale", rationale);
        }
        if !self.reachable_from.is_empty() {
            finding = finding.with_detail("reachable_from", self.reachable_from.join(","));
        }

        let file = self.file.or_else(|| fallback_file.map(str::to_string));
        if let Some(file) = file {
            let mut location = Location::file(file);
            if let Some(start) = self.start_line {
                location = location.with_lines(start, self.end_line.unwrap_or(start));
            }
            finding = finding.with_location(location);
        }

        finding
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassResponse {
    #[serde(default)]
    pub findings: Vec<ModelFinding>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub summary: Option<String>,
}

pub fn parse_map_response(content: &str) -> Result<MapResponse, LlmError> {
    let json = extract_json(content);
    serde_json::from_str(json).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

pub fn parse_pass_response(content: &str) -> Result<PassResponse, LlmError> {
    let json = extract_json(content);
    serde_json::from_str(json).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

/// Models occasionally wrap JSON in a code fence or prose. Take the fenced
/// block when present, otherwise the first balanced object.
fn extract_json(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    if let Some(start) = text.find('{') {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, byte) in text.as_bytes()[start..].iter().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            match byte {
                b'\\' if in_string => escaped = true,
                b'"' => in_string = !in_string,
                b'{' if !in_string => depth += 1,
                b'}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return &text[start..=start + i];
                    }
                }
                _ => {}
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_pass_response() {
        let content = r#"{"findings":[{"title":"Unsanitized SQL","severity":"high","category":"sql-injection","file":"src/db.ts","start_line":16,"end_line":19}],"summary":"one hit"}"#;
        let response = parse_pass_response(content).unwrap();
        assert_eq!(response.findings.len(), 1);
        assert_eq!(response.findings[0].start_line, Some(16));
    }

    #[test]
    fn parses_fenced_response() {
        let content = "Here is the result:\n```json\n{\"risk\": \"high\", \"areas\": [\"auth\"]}\n```\n";
        let response = parse_map_response(content).unwrap();
        assert_eq!(response.risk, RiskLevel::High);
    }

    #[test]
    fn parses_response_with_prose_prefix() {
        let content = "Sure! {\"findings\": [], \"summary\": \"clean\"} Hope that helps.";
        let response = parse_pass_response(content).unwrap();
        assert!(response.findings.is_empty());
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_pass_response("I could not analyze this.").is_err());
    }

    #[test]
    fn informational_maps_to_low() {
        let severity: Severity = SeverityLevel::Informational.into();
        assert_eq!(severity, Severity::Low);
    }

    #[test]
    fn into_core_uses_fallback_file() {
        let model_finding = ModelFinding {
            title: "weak check".into(),
            severity: SeverityLevel::Medium,
            category: None,
            rule_id: None,
            file: None,
            start_line: None,
            end_line: None,
            rationale: None,
            reachable_from: vec![],
        };

        let finding = model_finding.into_core(FindingKind::Repository, "llm_rule", Some("src/a.ts"));
        assert_eq!(finding.file(), Some("src/a.ts"));
        assert!(finding.start_line().is_none());
    }
}
