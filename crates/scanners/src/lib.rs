//! saguru scanners — hybrid static/LLM vulnerability detection for source
//! repositories.
//!
//! Deterministic signal detectors extract structural evidence; staged
//! language-model passes escalate ambiguous and cross-file cases; a
//! correlation engine merges everything into one deduplicated finding set;
//! an eval matcher scores scan runs against labeled fixtures.

pub mod core;
pub mod detect;
pub mod error;
pub mod eval;
pub mod knowledge;
pub mod llm;
pub mod pipeline;
pub mod store;

pub use crate::core::{
    CoreFinding, CoreScanResult, Correlator, CorrelatorConfig, FindingKind, Location, ScanStats,
    Severity,
};
pub use crate::detect::{default_detectors, Evidence, SignalDetector};
pub use crate::error::ScanError;
pub use crate::eval::{load_specs, match_result, EvalGroupSpec, ExpectedFinding, MatchReport};
pub use crate::knowledge::KnowledgeBase;
pub use crate::llm::{LlmClient, LlmError, MockLlmClient, OpenAiClient, PromptKind};
pub use crate::pipeline::{
    CancelFlag, DirRepository, InMemoryRepository, PipelineConfig, ProgressSink, Repository,
    ScanPhase, ScanPipeline, ScanProgressEvent, SourceFile,
};
pub use crate::store::{FileMetadataStore, MetadataStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
