use crate::pipeline::ScanPhase;
use thiserror::Error;

/// Terminal scan failures. Unit-level trouble (one file, one chunk, one
/// model call) never surfaces here; it is logged and excluded where it
/// happens.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Raised before any phase starts; the scan never begins.
    #[error("configuration error: {0}")]
    Config(String),

    /// A phase could not proceed at all. Aborts the scan; no partial
    /// result is returned.
    #[error("phase {phase} failed: {source}")]
    PhaseFatal {
        phase: ScanPhase,
        #[source]
        source: anyhow::Error,
    },

    /// Caller cancelled between units or at a phase boundary.
    #[error("scan cancelled during {phase}")]
    Cancelled { phase: ScanPhase },
}

impl ScanError {
    pub fn fatal(phase: ScanPhase, source: impl Into<anyhow::Error>) -> Self {
        Self::PhaseFatal {
            phase,
            source: source.into(),
        }
    }
}
