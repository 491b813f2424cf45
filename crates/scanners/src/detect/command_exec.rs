use crate::core::Severity;
use crate::detect::{evidence_at, Evidence, SignalDetector};
use regex::Regex;

/// Detects process or shell execution fed by concatenated or interpolated
/// input.
pub struct CommandExecDetector {
    patterns: Vec<Regex>,
}

impl CommandExecDetector {
    pub fn new() -> Self {
        let patterns = [
            r#"\b(?:exec|execSync|system|popen)\s*\(\s*["'`][^"'`]*["'`]\s*\+"#,
            r#"\b(?:exec|execSync|spawn)\s*\(\s*`[^`]*\$\{"#,
            r#"(?i)\bos\.system\s*\(\s*f?["'][^"']*[\{\+]"#,
            r#"\bChildProcess|\bshell\s*[:=]\s*true"#,
        ];

        Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("command pattern compiles"))
                .collect(),
        }
    }
}

impl Default for CommandExecDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalDetector for CommandExecDetector {
    fn id(&self) -> &'static str {
        "command-exec-concat"
    }

    fn category(&self) -> &'static str {
        "command-injection"
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
    fn flags_exec_with_concatenation() {
        let detector = CommandExecDetector::new();
        let content = "exec(\"ping -c 1 \" + host, cb);";
        assert!(detector.detect(content).is_some());
    }

    #[test]
    fn flags_template_exec() {
        let detector = CommandExecDetector::new();
        let content = "execSync(`tar xzf ${archive}`);";
        assert!(detector.detect(content).is_some());
    }

    #[test]
    fn flags_shell_true_option() {
        let detector = CommandExecDetector::new();
        let content = "spawn(cmd, args, { shell: true });";
        assert!(detector.detect(content).is_some());
    }

    #[test]
    fn ignores_fixed_commands() {
        let detector = CommandExecDetector::new();
        let content = "exec(\"git status\", cb);";
        assert!(detector.detect(content).is_none());
    }
}
