use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which analysis pass a request belongs to. The collaborator owns prompt
/// construction per kind; the pipeline only picks the kind and supplies
/// content and context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Coarse risk triage of a chunk. Produces a priority, not findings.
    Map,
    /// Known-vulnerability-class catalogue applied to a chunk.
    Rule,
    /// Unconstrained "what looks wrong here" pass over a chunk.
    Open,
    /// Cross-file re-examination of accumulated findings.
    Composite,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Rule => "rule",
            Self::Open => "open",
            Self::Composite => "composite",
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

impl LlmError {
    /// Worth another attempt under the pipeline's retry contract.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Network(_) | Self::Timeout(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Raw output of one model pass. Interpretation (JSON parsing into pass
/// responses) happens on the pipeline side.
#[derive(Debug, Clone)]
pub struct RawModelOutput {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

/// The external language-model collaborator. Implementations own provider
/// and model selection and prompt construction; the pipeline owns retry and
/// timeout policy around each call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn run_pass(
        &self,
        kind: PromptKind,
        content: &str,
        context: &str,
    ) -> Result<RawModelOutput, LlmError>;

    fn model_name(&self) -> &str;

    fn estimate_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }
}
