//! Progress-callback trait for per-item batch events.
//!
//! Inject an `Arc<dyn BatchProgressCallback>` via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive
//! real-time events as the orchestrator walks the queue.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a channel, a WebSocket, a database record, or a
//! terminal progress bar without the library knowing anything about how the
//! host application communicates. Note that authoritative progress is always
//! the derived [`crate::batch::BatchQueue::progress`] read — these events
//! are a convenience layer on top, never a second source of truth.

use std::sync::Arc;

/// Called by the orchestrator as it processes each queue item.
///
/// Items are processed strictly sequentially, so unlike a concurrent
/// pipeline these methods are never called from two threads at once.
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any item is attempted.
    ///
    /// `total` is the number of items the run will consider (the full
    /// queue, or the failed subset for a retry run).
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before an item's recognition request is sent.
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item completes with a full output bundle.
    fn on_item_complete(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item fails after all retries are exhausted.
    fn on_item_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once when the run ends (normally or via cancellation).
    fn on_batch_complete(&self, total: usize, completed: usize, failed: usize) {
        let _ = (total, completed, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_item_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _index: usize, _total: usize, _name: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_item_start(0, 3, "a.png");
        cb.on_item_complete(0, 3, "a.png");
        cb.on_item_error(1, 3, "b.png", "some error");
        cb.on_batch_complete(3, 2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };

        tracker.on_item_start(0, 2, "a.png");
        tracker.on_item_complete(0, 2, "a.png");
        tracker.on_item_start(1, 2, "b.png");
        tracker.on_item_error(1, 2, "b.png", "quota exhausted");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn BatchProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_item_start(0, 10, "x.png");
    }
}
