//! Deterministic collaborator stand-in for tests.

use crate::llm::schemas::{MapResponse, ModelFinding, PassResponse, RiskLevel};
use crate::llm::{LlmClient, LlmError, PromptKind, RawModelOutput, TokenUsage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CannedFinding {
    kind: PromptKind,
    pattern: String,
    finding: ModelFinding,
}

/// Serves canned pass responses keyed by (pass kind, content substring).
/// Content matching no canned entry yields an empty findings list, so a
/// clean fixture produces a clean scan.
pub struct MockLlmClient {
    canned: Vec<CannedFinding>,
    high_risk_patterns: Vec<String>,
    fail_patterns: Vec<(Option<PromptKind>, String)>,
    call_count: AtomicUsize,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            canned: Vec::new(),
            high_risk_patterns: Vec::new(),
            fail_patterns: Vec::new(),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Return `finding` whenever a pass of `kind` sees `pattern` in its
    /// content.
    pub fn with_finding(
        mut self,
        kind: PromptKind,
        pattern: impl Into<String>,
        finding: ModelFinding,
    ) -> Self {
        self.canned.push(CannedFinding {
            kind,
            pattern: pattern.into(),
            finding,
        });
        self
    }

    /// Map passes rate chunks containing `pattern` as high risk.
    pub fn with_high_risk(mut self, pattern: impl Into<String>) -> Self {
        self.high_risk_patterns.push(pattern.into());
        self
    }

    /// Fail every pass whose content contains `pattern`; restrict to one
    /// pass kind with `kind`.
    pub fn failing_on(mut self, kind: Option<PromptKind>, pattern: impl Into<String>) -> Self {
        self.fail_patterns.push((kind, pattern.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn render(&self, kind: PromptKind, content: &str) -> Result<String, LlmError> {
        let response = match kind {
            PromptKind::Map => {
                let high = self.high_risk_patterns.iter().any(|p| content.contains(p.as_str()));
                serde_json::to_string(&MapResponse {
                    risk: if high { RiskLevel::High } else { RiskLevel::Medium },
                    areas: vec![],
                })
            }
            _ => {
                let findings: Vec<ModelFinding> = self
                    .canned
                    .iter()
                    .filter(|c| c.kind == kind && content.contains(c.pattern.as_str()))
                    .map(|c| c.finding.clone())
                    .collect();
                serde_json::to_string(&PassResponse {
                    findings,
                    summary: None,
                })
            }
        };

        response.map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn run_pass(
        &self,
        kind: PromptKind,
        content: &str,
        _context: &str,
    ) -> Result<RawModelOutput, LlmError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        for (fail_kind, pattern) in &self.fail_patterns {
            let kind_matches = fail_kind.map_or(true, |k| k == kind);
            if kind_matches && content.contains(pattern.as_str()) {
                return Err(LlmError::Api("mock configured to fail".to_string()));
            }
        }

        Ok(RawModelOutput {
            content: self.render(kind, content)?,
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            },
        })
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Canned-finding constructor used across the test suites.
pub fn model_finding(
    title: &str,
    severity: crate::llm::schemas::SeverityLevel,
    category: &str,
    file: &str,
    start_line: usize,
    end_line: usize,
) -> ModelFinding {
    ModelFinding {
        title: title.to_string(),
        severity,
        category: Some(category.to_string()),
        rule_id: None,
        file: Some(file.to_string()),
        start_line: Some(start_line),
        end_line: Some(end_line),
        rationale: None,
        reachable_from: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schemas::{parse_map_response, parse_pass_response, SeverityLevel};

    #[tokio::test]
    async fn canned_finding_matches_kind_and_pattern() {
        let client = MockLlmClient::new().with_finding(
            PromptKind::Rule,
            "db.query",
            model_finding("SQL injection", SeverityLevel::High, "sql-injection", "src/db.ts", 16, 19),
        );

        let hit = client
            .run_pass(PromptKind::Rule, "db.query(raw)", "")
            .await
            .unwrap();
        assert_eq!(parse_pass_response(&hit.content).unwrap().findings.len(), 1);

        let wrong_kind = client
            .run_pass(PromptKind::Open, "db.query(raw)", "")
            .await
            .unwrap();
        assert!(parse_pass_response(&wrong_kind.content).unwrap().findings.is_empty());
    }

    #[tokio::test]
    async fn map_pass_rates_configured_patterns_high() {
        let client = MockLlmClient::new().with_high_risk("admin");

        let high = client.run_pass(PromptKind::Map, "fn admin()", "").await.unwrap();
        assert_eq!(parse_map_response(&high.content).unwrap().risk, RiskLevel::High);

        let medium = client.run_pass(PromptKind::Map, "fn index()", "").await.unwrap();
        assert_eq!(parse_map_response(&medium.content).unwrap().risk, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn failure_pattern_fails_only_matching_calls() {
        let client = MockLlmClient::new().failing_on(Some(PromptKind::Rule), "poison");

        assert!(client.run_pass(PromptKind::Rule, "poison pill", "").await.is_err());
        assert!(client.run_pass(PromptKind::Open, "poison pill", "").await.is_ok());
        assert!(client.run_pass(PromptKind::Rule, "clean", "").await.is_ok());
        assert_eq!(client.call_count(), 3);
    }
}
