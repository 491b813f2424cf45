use crate::pipeline::ScanPhase;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One progress observation. `current`/`total` count sub-units completed
/// within `phase`, not global scan progress; observers coalescing UI state
/// must key it by phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgressEvent {
    pub phase: ScanPhase,
    pub current: usize,
    pub total: usize,
    pub message: Option<String>,
}

/// Caller-supplied progress observer. Handlers must return quickly; the
/// pipeline invokes them inline and does not await them.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ScanProgressEvent);
}

/// Discards all events.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&self, _event: ScanProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ScanProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: ScanProgressEvent) {
        self(event)
    }
}

/// Buffers every event; test observer.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ScanProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ScanProgressEvent> {
        self.events.lock().expect("sink lock").clone()
    }
}

impl ProgressSink for CollectingSink {
    fn on_event(&self, event: ScanProgressEvent) {
        self.events.lock().expect("sink lock").push(event);
    }
}

/// Cooperative cancellation handle. Checked at phase boundaries and between
/// file/chunk units; a phase in flight is never preempted mid-unit.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_order() {
        let sink = CollectingSink::new();
        for current in 0..3 {
            sink.on_event(ScanProgressEvent {
                phase: ScanPhase::StaticScanners,
                current,
                total: 3,
                message: None,
            });
        }

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].current, 2);
    }

    #[test]
    fn cancel_flag_latches() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        assert!(flag.clone().is_cancelled());
    }
}
