//! Language-model collaborator interface and implementations.
//!
//! The pipeline talks to models exclusively through [`LlmClient`]; prompt
//! construction and provider selection live behind that trait. Response
//! parsing into the core model lives in [`schemas`].

pub mod client;
pub mod mock;
pub mod openai;
pub mod prompts;
pub mod schemas;

pub use client::{LlmClient, LlmError, PromptKind, RawModelOutput, TokenUsage};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use schemas::{MapResponse, ModelFinding, PassResponse, RiskLevel, SeverityLevel};
