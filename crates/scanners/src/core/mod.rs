//! Core data model and correlation infrastructure.
//!
//! Everything that flows between scan phases lives here: the tagged
//! `CoreFinding` unit, the immutable `CoreScanResult`, and the correlation
//! engine that turns raw per-phase signals into a deduplicated report. All
//! signal sources — deterministic detectors and LLM passes alike — feed the
//! same finding type so the correlator can treat them uniformly.

pub mod correlation;
pub mod finding;
pub mod result;
pub mod severity;

pub use correlation::{Correlator, CorrelatorConfig};
pub use finding::{sort_canonical, CoreFinding, FindingKind, Location};
pub use result::{CoreScanResult, ScanStats};
pub use severity::Severity;
