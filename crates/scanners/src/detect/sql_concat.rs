use crate::core::Severity;
use crate::detect::{evidence_at, Evidence, SignalDetector};
use regex::Regex;

/// Detects SQL text assembled by string concatenation or template
/// interpolation of non-literal input.
pub struct SqlConcatDetector {
    patterns: Vec<Regex>,
}

impl SqlConcatDetector {
    pub fn new() -> Self {
        // Ordered: quoted-keyword concatenation first (per quote type, so a
        // nested opposite quote does not end the literal early), then
        // continuation concatenation, then template interpolation, then
        // f-string style.
        let patterns = [
            r#"(?i)"\s*(?:SELECT|INSERT|UPDATE|DELETE|DROP)\b[^"]*"\s*\+"#,
            r#"(?i)'\s*(?:SELECT|INSERT|UPDATE|DELETE|DROP)\b[^']*'\s*\+"#,
            r#"(?i)\+\s*"[^"]*\b(?:FROM|WHERE|VALUES|INTO)\b"#,
            r#"(?i)\+\s*'[^']*\b(?:FROM|WHERE|VALUES|INTO)\b"#,
            r#"(?i)`[^`]*\b(?:SELECT|INSERT|UPDATE|DELETE)\b[^`]*\$\{"#,
            r#"(?i)f["'][^"']*\b(?:SELECT|INSERT|UPDATE|DELETE)\b[^"']*\{"#,
        ];

        Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("sql pattern compiles"))
                .collect(),
        }
    }
}

impl Default for SqlConcatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalDetector for SqlConcatDetector {
    fn id(&self) -> &'static str {
        "sql-string-concat"
    }

    fn category(&self) -> &'static str {
        "sql-injection"
    }

    fn severity(&self) -> Severity {
        Severity::High
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_quoted_select_concatenation() {
        let detector = SqlConcatDetector::new();
        let content =
            "const q = \"SELECT * FROM users WHERE name = '\" + req.body.name + \"'\";";
        let evidence = detector.detect(content).unwrap();
        assert_eq!(evidence.line, 1);
    }

    #[test]
    fn flags_template_interpolation() {
        let detector = SqlConcatDetector::new();
        let content = "db.query(`SELECT id FROM accounts WHERE owner = ${userId}`);";
        assert!(detector.detect(content).is_some());
    }

    #[test]
    fn flags_python_fstring() {
        let detector = SqlConcatDetector::new();
        let content = "cursor.execute(f\"DELETE FROM sessions WHERE token = {token}\")";
        assert!(detector.detect(content).is_some());
    }

    #[test]
    fn ignores_parameterized_queries() {
        let detector = SqlConcatDetector::new();
        let content = "db.query(\"SELECT * FROM users WHERE name = $1\", [name]);";
        assert!(detector.detect(content).is_none());
    }
}
