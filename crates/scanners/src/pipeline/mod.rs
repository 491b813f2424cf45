//! Scan phase pipeline.
//!
//! Six ordered, non-skippable phases per repository scan: static signal
//! detection, model triage, the catalogue and open-ended model passes, the
//! cross-file composite pass, and postprocess correlation. The orchestrator
//! is the only writer of the running result; workers hand values back.

pub mod chunk;
pub mod config;
pub mod phase;
pub mod progress;
pub mod repo;
pub mod scan;

pub use chunk::{chunk_files, Chunk, PrioritizedChunk};
pub use config::PipelineConfig;
pub use phase::ScanPhase;
pub use progress::{CancelFlag, CollectingSink, NullSink, ProgressSink, ScanProgressEvent};
pub use repo::{DirRepository, InMemoryRepository, Repository, SourceFile};
pub use scan::ScanPipeline;
