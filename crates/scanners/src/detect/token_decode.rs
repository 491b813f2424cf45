use crate::core::Severity;
use crate::detect::{evidence_at, Evidence, SignalDetector};
use regex::Regex;

/// Detects auth-token decoding with no verifying call in the same scope:
/// `jwt.decode(..)` with no nearby `verify`, an explicit `verify: false`,
/// or a none-algorithm allowance.
pub struct UnsafeTokenDecodeDetector {
    verify_disabled: Regex,
    none_algorithm: Regex,
    bare_decode: Regex,
    verifying_call: Regex,
}

/// Window, in lines, treated as "the same scope" around a decode call when
/// looking for a verifying call.
const SCOPE_WINDOW_LINES: usize = 8;

impl UnsafeTokenDecodeDetector {
    pub fn new() -> Self {
        Self {
            verify_disabled: Regex::new(r"(?i)\bverify\s*[:=]\s*false").expect("pattern compiles"),
            none_algorithm: Regex::new(r#"(?i)\balgorithms?\s*[:=]\s*\[?\s*["']none["']"#)
                .expect("pattern compiles"),
            bare_decode: Regex::new(r"\b(?:jwt|jose|token)\s*\.\s*decode\s*\(")
                .expect("pattern compiles"),
            verifying_call: Regex::new(r"\b(?:jwt|jose|token)\s*\.\s*verify\s*\(|\bverify(?:Signature|Token)?\s*\(")
                .expect("pattern compiles"),
        }
    }

    fn scope_has_verify(&self, content: &str, decode_line: usize) -> bool {
        let lines: Vec<&str> = content.lines().collect();
        let start = decode_line.saturating_sub(SCOPE_WINDOW_LINES + 1);
        let end = (decode_line + SCOPE_WINDOW_LINES).min(lines.len());

        lines[start..end]
            .iter()
            .any(|line| self.verifying_call.is_match(line))
    }
}

impl Default for UnsafeTokenDecodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalDetector for UnsafeTokenDecodeDetector {
    fn id(&self) -> &'static str {
        "unsafe-token-decode"
    }

    fn category(&self) -> &'static str {
        "auth"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn detect(&self, content: &str) -> Option<Evidence> {
        if let Some(m) = self.verify_disabled.find(content) {
            return Some(evidence_at(content, m.start(), m.as_str()));
        }

        if let Some(m) = self.none_algorithm.find(content) {
            return Some(evidence_at(content, m.start(), m.as_str()));
        }

        if let Some(m) = self.bare_decode.find(content) {
            let evidence = evidence_at(content, m.start(), m.as_str());
            if !self.scope_has_verify(content, evidence.line) {
                return Some(evidence);
            }
        }

        None
    }
}
