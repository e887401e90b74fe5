//! Cooperative run-control flags and the batch run context.
//!
//! Pause, resume and cancel are *requests*, observed by the orchestrator at
//! well-defined checkpoints (before each dequeue, and inside the pause
//! poll). Nothing here preempts an in-flight recognition call — the single
//! item that is mid-flight when a flag flips always finishes naturally.

use crate::batch::queue::BatchQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// The run-state flags: single-writer, single-flight.
///
/// Only one run may be active per context at a time; that is a caller
/// precondition, asserted in debug builds when a second run begins.
#[derive(Debug, Default)]
pub struct RunControl {
    processing: AtomicBool,
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the orchestrator stop consuming items at the next
    /// item boundary. The in-flight item is not interrupted.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Let a paused run continue.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Request cancellation. Takes effect even while paused; once observed,
    /// no further item leaves `Pending`.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Mark the run active and reset pause/cancel left over from a
    /// previous run.
    pub(crate) fn begin_run(&self) {
        let was_processing = self.processing.swap(true, Ordering::SeqCst);
        debug_assert!(!was_processing, "a run is already active on this context");
        self.paused.store(false, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub(crate) fn end_run(&self) {
        self.processing.store(false, Ordering::SeqCst);
    }
}

/// Everything a run reads and writes: the queue plus the control flags.
///
/// Passed by reference into the orchestrator entry points — the
/// orchestrator touches no ambient global state, which is what makes it
/// testable against a fabricated in-memory queue. User actions
/// (add/remove/clear) must not be issued while a run is active; the
/// orchestrator is the queue's only writer for the duration.
#[derive(Debug, Default)]
pub struct BatchRunContext {
    pub queue: Mutex<BatchQueue>,
    pub control: RunControl,
}

impl BatchRunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue(queue: BatchQueue) -> Self {
        Self {
            queue: Mutex::new(queue),
            control: RunControl::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_start_cleared() {
        let c = RunControl::new();
        assert!(!c.is_paused());
        assert!(!c.is_cancelled());
        assert!(!c.is_processing());
    }

    #[test]
    fn pause_resume_cancel() {
        let c = RunControl::new();
        c.pause();
        assert!(c.is_paused());
        c.resume();
        assert!(!c.is_paused());
        c.cancel();
        assert!(c.is_cancelled());
    }

    #[test]
    fn begin_run_resets_stale_flags() {
        let c = RunControl::new();
        c.pause();
        c.cancel();
        c.begin_run();
        assert!(c.is_processing());
        assert!(!c.is_paused());
        assert!(!c.is_cancelled());
        c.end_run();
        assert!(!c.is_processing());
    }
}
