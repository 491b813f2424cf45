//! Deterministic signal detectors.
//!
//! A detector is a pure function from file content to at most one piece of
//! evidence. Each detector evaluates a fixed, ordered pattern list; the
//! first pattern that matches wins and its matched text becomes the
//! evidence string, so evidence is reproducible across runs on identical
//! input. A detector never fails: content it cannot make sense of is simply
//! no match.

pub mod command_exec;
pub mod handlers;
pub mod sql_concat;
pub mod token_decode;

pub use command_exec::CommandExecDetector;
pub use handlers::ReachableHandlerDetector;
pub use sql_concat::SqlConcatDetector;
pub use token_decode::UnsafeTokenDecodeDetector;

use crate::core::Severity;
use std::sync::Arc;

/// Matched-text proof that a structural pattern is present. `text` is the
/// contract; `line` (1-based, where the match begins) feeds the finding
/// location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub text: String,
    pub line: usize,
}

pub trait SignalDetector: Send + Sync {
    fn id(&self) -> &'static str;

    fn category(&self) -> &'static str;

    fn severity(&self) -> Severity;

    /// First matching pattern wins; `None` means no structural signal,
    /// including for malformed input.
    fn detect(&self, content: &str) -> Option<Evidence>;
}

/// The registry, in its fixed evaluation order. Order is part of the
/// determinism contract; append new detectors at the end.
pub fn default_detectors() -> Vec<Arc<dyn SignalDetector>> {
    vec![
        Arc::new(ReachableHandlerDetector::new()),
        Arc::new(UnsafeTokenDecodeDetector::new()),
        Arc::new(SqlConcatDetector::new()),
        Arc::new(CommandExecDetector::new()),
    ]
}

/// 1-based line of a byte offset.
pub(crate) fn line_of_offset(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

pub(crate) fn evidence_at(content: &str, start: usize, matched: &str) -> Evidence {
    Evidence {
        text: matched.trim().to_string(),
        line: line_of_offset(content, start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_is_stable() {
        let ids: Vec<&str> = default_detectors().iter().map(|d| d.id()).collect();
        assert_eq!(
            ids,
            vec![
                "reachable-handler",
                "unsafe-token-decode",
                "sql-string-concat",
                "command-exec-concat",
            ]
        );
    }

    #[test]
    fn line_of_offset_is_one_based() {
        let content = "a\nb\nc";
        assert_eq!(line_of_offset(content, 0), 1);
        assert_eq!(line_of_offset(content, 2), 2);
        assert_eq!(line_of_offset(content, 4), 3);
    }

    #[test]
    fn detectors_are_deterministic() {
        let content = r#"
app.post("/login", (req, res) => {
  const payload = jwt.decode(req.headers.token);
  db.query("SELECT * FROM users WHERE name = '" + req.body.name + "'");
});
"#;
        for detector in default_detectors() {
            let first = detector.detect(content);
            let second = detector.detect(content);
            assert_eq!(first, second, "{} must be deterministic", detector.id());
        }
    }

    #[test]
    fn detectors_tolerate_garbage_input() {
        let garbage = "\u{0}\u{1}\u{2}ï¿½ not code at all \n\n\t{{{{";
        for detector in default_detectors() {
            let _ = detector.detect(garbage);
            let _ = detector.detect("");
        }
    }
}
