use crate::core::Severity;
use crate::detect::{evidence_at, Evidence, SignalDetector};
use regex::Regex;

/// Detects code reachable as an inbound HTTP request handler under common
/// routing conventions. The evidence is not a vulnerability by itself; it
/// marks attack surface that downstream passes correlate against.
pub struct ReachableHandlerDetector {
    patterns: Vec<Regex>,
}

impl ReachableHandlerDetector {
    pub fn new() -> Self {
        // Ordered: Express-style registration first, then decorator routes,
        // then Go mux registration, then Rust attribute routes.
        let patterns = [
            r#"\b(?:app|router|server)\.(?:get|post|put|delete|patch|all|use)\s*\(\s*["'`]/"#,
            r#"@(?:app|router|api|bp)\.(?:route|get|post|put|delete|patch)\s*\("#,
            r#"\b(?:http\.|mux\.|r\.)?HandleFunc\s*\(\s*""#,
            r##"#\[(?:get|post|put|delete|patch|route)\s*\("##,
        ];

        Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("handler pattern compiles"))
                .collect(),
        }
    }
}

impl Default for ReachableHandlerDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalDetector for ReachableHandlerDetector {
    fn id(&self) -> &'static str {
        "reachable-handler"
    }

    fn category(&self) -> &'static str {
        "attack-surface"
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn detect(&self, content: &str) -> Option<Evidence> {
        for pattern in &self.patterns {
            if let Some(m) = pattern.find(content) {
                return Some(evidence_at(content, m.start(), m.as_str()));
            }
        }
        None
    }
}
