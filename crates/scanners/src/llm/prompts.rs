//! Prompt assembly for the OpenAI-backed collaborator.
//!
//! Each pass kind carries its own system prompt and response-shape
//! instructions. The pipeline never sees prompt text; it hands over chunk
//! content and read-only context and gets raw model output back.

use crate::llm::PromptKind;

const MAP_SYSTEM_PROMPT: &str = r#"You are a security triage assistant. You receive one chunk of source code from a repository under audit. Classify how likely this chunk is to contain or enable a security vulnerability.

Respond with JSON only:
{"risk": "low" | "medium" | "high", "areas": ["short risk area tags"]}"#;

const RULE_SYSTEM_PROMPT: &str = r#"You are a security auditor applying a fixed catalogue of vulnerability classes to one chunk of source code:

- sql-injection: SQL built from unsanitized input
- command-injection: shell/process execution from unsanitized input
- auth: missing or bypassable authentication/authorization, unverified tokens
- deserialization: unsafe deserialization of untrusted data
- path-traversal: file access from unsanitized paths
- ssrf: outbound requests to attacker-controlled destinations
- misconfiguration: dangerous defaults, disabled protections, leaked secrets

Report only concrete hits in the provided code. For each hit use the category tag from the catalogue and cite the file and line range.

Respond with JSON only:
{"findings": [{"title": "...", "severity": "critical|high|medium|low", "category": "<catalogue tag>", "rule_id": "<catalogue tag>", "file": "...", "start_line": N, "end_line": N, "rationale": "..."}], "summary": "..."}"#;

const OPEN_SYSTEM_PROMPT: &str = r#"You are a security auditor performing an open-ended review of one chunk of source code. Look for anything exploitable that a fixed rule catalogue would miss: logic flaws, trust-boundary mistakes, race conditions, information leaks.

Do not report style issues. Only report findings you can justify from the code shown.

Respond with JSON only:
{"findings": [{"title": "...", "severity": "critical|high|medium|low", "category": "...", "file": "...", "start_line": N, "end_line": N, "rationale": "..."}], "summary": "..."}"#;

const COMPOSITE_SYSTEM_PROMPT: &str = r#"You are a security auditor correlating previously collected findings across a repository. You receive a digest of per-file findings plus cross-file context. Identify cases where multiple weak signals jointly indicate one vulnerability, such as an unguarded handler in one file reaching a privilege check bypass in another.

Only report correlations; do not restate individual findings. When a finding is reachable from another file, list that file in reachable_from.

Respond with JSON only:
{"findings": [{"title": "...", "severity": "critical|high|medium|low", "category": "...", "file": "...", "start_line": N, "end_line": N, "rationale": "...", "reachable_from": ["..."]}], "summary": "..."}"#;

pub fn system_prompt(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Map => MAP_SYSTEM_PROMPT,
        PromptKind::Rule => RULE_SYSTEM_PROMPT,
        PromptKind::Open => OPEN_SYSTEM_PROMPT,
        PromptKind::Composite => COMPOSITE_SYSTEM_PROMPT,
    }
}

pub fn user_prompt(kind: PromptKind, content: &str, context: &str) -> String {
    let mut prompt = String::new();

    if !context.is_empty() {
        prompt.push_str("Context:\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }

    match kind {
        PromptKind::Composite => prompt.push_str("Finding digest:\n"),
        _ => prompt.push_str("Code under audit:\n"),
    }
    prompt.push_str(content);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_system_prompt() {
        for kind in [
            PromptKind::Map,
            PromptKind::Rule,
            PromptKind::Open,
            PromptKind::Composite,
        ] {
            assert!(system_prompt(kind).contains("JSON"));
        }
    }

    #[test]
    fn user_prompt_includes_context_when_present() {
        let prompt = user_prompt(PromptKind::Rule, "code", "knowledge");
        assert!(prompt.starts_with("Context:\nknowledge"));
        assert!(prompt.ends_with("code"));

        let bare = user_prompt(PromptKind::Rule, "code", "");
        assert!(bare.starts_with("Code under audit:"));
    }
}
