//! Static domain-knowledge context for model passes.
//!
//! A small built-in corpus ships with the crate; operators can extend it
//! with a directory of `.md`/`.txt` notes. Load failures degrade to the
//! built-in corpus (or to empty context) rather than aborting a scan.

use std::path::Path;
use tracing::warn;

const BUILTIN_KNOWLEDGE: &str = r#"Audit guidance:
- Treat every HTTP handler parameter, header and cookie as attacker-controlled.
- A decoded token is unauthenticated data until its signature is verified.
- SQL and shell text assembled from request data is injectable unless parameterized.
- Authorization checks must happen server-side on every privileged path, not only in middleware that can be bypassed.
- Correlate attack surface (reachable handlers) with dangerous sinks before raising severity."#;

pub struct KnowledgeBase {
    sections: Vec<String>,
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        Self {
            sections: vec![BUILTIN_KNOWLEDGE.to_string()],
        }
    }

    /// Built-in corpus plus every readable `.md`/`.txt` file under `dir`,
    /// in path order. Unreadable entries are logged and skipped.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut base = Self::builtin();
        let dir = dir.as_ref();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "knowledge directory unreadable, using builtin corpus");
                return base;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                matches!(
                    path.extension().and_then(|ext| ext.to_str()),
                    Some("md") | Some("txt")
                )
            })
            .collect();
        paths.sort();

        for path in paths {
            match std::fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => base.sections.push(text.trim().to_string()),
                Ok(_) => {}
                Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable knowledge file"),
            }
        }

        base
    }

    /// One scan consumes this once and passes it read-only into the model
    /// phases.
    pub fn build_context(&self) -> String {
        self.sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_context_is_not_empty() {
        let context = KnowledgeBase::builtin().build_context();
        assert!(context.contains("attacker-controlled"));
    }

    #[test]
    fn missing_directory_degrades_to_builtin() {
        let kb = KnowledgeBase::with_dir("/definitely/not/a/real/path");
        assert_eq!(kb.build_context(), KnowledgeBase::builtin().build_context());
    }

    #[test]
    fn directory_files_are_appended_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = std::fs::File::create(dir.path().join("a.md")).unwrap();
        writeln!(a, "first note").unwrap();
        let mut b = std::fs::File::create(dir.path().join("b.txt")).unwrap();
        writeln!(b, "second note").unwrap();
        std::fs::File::create(dir.path().join("ignored.bin")).unwrap();

        let context = KnowledgeBase::with_dir(dir.path()).build_context();
        let first = context.find("first note").unwrap();
        let second = context.find("second note").unwrap();
        assert!(first < second);
        assert!(!context.contains("ignored"));
    }
}
