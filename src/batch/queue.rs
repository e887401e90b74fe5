//! The batch queue: insertion-ordered work items with derived progress.

use crate::error::ItemError;
use crate::output::OutputBundle;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one queue item.
///
/// Transitions are monotonic (`Pending → Processing → Completed | Failed`)
/// with one exception: `Failed → Processing` on an explicit retry run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }
}

/// One unit of batch work: an image reference and, eventually, either a
/// full output bundle or a terminal error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// Unique within the queue, monotonically increasing with insertion.
    pub id: u64,
    /// Local path or HTTP/HTTPS URL of the source image.
    pub source: String,
    /// Display name (basename of the source).
    pub name: String,
    pub status: ItemStatus,
    /// Present iff `status == Completed`.
    pub outputs: Option<OutputBundle>,
    /// Present iff `status == Failed`.
    pub error: Option<ItemError>,
    /// Recognition attempts consumed by the most recent processing pass.
    pub attempts: u32,
}

/// Derived status counts — always computed from the queue at the moment of
/// query, never cached, so reported progress cannot drift from queue state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchProgress {
    /// Items in a terminal state.
    pub fn done(&self) -> usize {
        self.completed + self.failed
    }
}

/// Insertion-ordered collection of [`BatchItem`]s.
///
/// `Clone` takes a deep snapshot — handy for exporting results without
/// holding the context lock.
#[derive(Debug, Clone, Default)]
pub struct BatchQueue {
    items: Vec<BatchItem>,
    next_id: u64,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, deriving its display name from the source.
    pub fn enqueue(&mut self, source: impl Into<String>) -> u64 {
        let source = source.into();
        let name = display_name(&source);
        self.enqueue_named(source, name)
    }

    /// Add an item with an explicit display name.
    pub fn enqueue_named(&mut self, source: impl Into<String>, name: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(BatchItem {
            id,
            source: source.into(),
            name: name.into(),
            status: ItemStatus::Pending,
            outputs: None,
            error: None,
            attempts: 0,
        });
        id
    }

    /// Remove an item by id. Returns true when something was removed.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn get(&self, id: u64) -> Option<&BatchItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Snapshot of item ids in insertion order, optionally restricted to
    /// failed items (the retry scope).
    pub(crate) fn ids(&self, failed_only: bool) -> Vec<u64> {
        self.items
            .iter()
            .filter(|item| !failed_only || item.status == ItemStatus::Failed)
            .map(|item| item.id)
            .collect()
    }

    /// Derived status counts.
    pub fn progress(&self) -> BatchProgress {
        let mut p = BatchProgress {
            total: self.items.len(),
            ..Default::default()
        };
        for item in &self.items {
            match item.status {
                ItemStatus::Pending => p.pending += 1,
                ItemStatus::Processing => p.processing += 1,
                ItemStatus::Completed => p.completed += 1,
                ItemStatus::Failed => p.failed += 1,
            }
        }
        p
    }

    /// Completed items in queue order, with their bundles.
    pub fn completed_items(&self) -> impl Iterator<Item = (&BatchItem, &OutputBundle)> {
        self.items
            .iter()
            .filter_map(|item| item.outputs.as_ref().map(|bundle| (item, bundle)))
    }

    pub(crate) fn mark_processing(&mut self, id: u64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            debug_assert!(
                item.status == ItemStatus::Pending || item.status == ItemStatus::Failed,
                "illegal transition {:?} -> Processing",
                item.status
            );
            item.status = ItemStatus::Processing;
            item.error = None;
            item.attempts = 0;
        }
    }

    pub(crate) fn mark_completed(&mut self, id: u64, outputs: OutputBundle, attempts: u32) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            debug_assert_eq!(item.status, ItemStatus::Processing);
            item.status = ItemStatus::Completed;
            item.outputs = Some(outputs);
            item.error = None;
            item.attempts = attempts;
        }
    }

    pub(crate) fn mark_failed(&mut self, id: u64, error: ItemError, attempts: u32) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            debug_assert_eq!(item.status, ItemStatus::Processing);
            item.status = ItemStatus::Failed;
            item.outputs = None;
            item.error = Some(error);
            item.attempts = attempts;
        }
    }
}

/// Basename of a path or final segment of a URL.
fn display_name(source: &str) -> String {
    source
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(source)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FORMATS;

    fn bundle() -> OutputBundle {
        OutputBundle::from_entries(FORMATS.iter().map(|f| (f.id, String::new())))
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut q = BatchQueue::new();
        let a = q.enqueue("a.png");
        let b = q.enqueue("b.png");
        q.remove(a);
        let c = q.enqueue("c.png");
        assert!(a < b && b < c, "ids must never be reused");
    }

    #[test]
    fn display_names_derive_from_source() {
        let mut q = BatchQueue::new();
        q.enqueue("/scans/deep/eq-01.png");
        q.enqueue("https://example.com/img/eq-02.png");
        q.enqueue("bare.png");
        let names: Vec<_> = q.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["eq-01.png", "eq-02.png", "bare.png"]);
    }

    #[test]
    fn progress_is_derived_from_statuses() {
        let mut q = BatchQueue::new();
        let a = q.enqueue("a.png");
        let b = q.enqueue("b.png");
        q.enqueue("c.png");

        q.mark_processing(a);
        q.mark_completed(a, bundle(), 1);
        q.mark_processing(b);
        q.mark_failed(
            b,
            ItemError::RecognitionFailed {
                name: "b.png".into(),
                attempts: 3,
                detail: "quota".into(),
            },
            3,
        );

        let p = q.progress();
        assert_eq!(p.total, 3);
        assert_eq!(p.completed, 1);
        assert_eq!(p.failed, 1);
        assert_eq!(p.pending, 1);
        assert_eq!(p.done(), 2);
    }

    #[test]
    fn completed_iff_outputs_failed_iff_error() {
        let mut q = BatchQueue::new();
        let a = q.enqueue("a.png");
        q.mark_processing(a);
        q.mark_completed(a, bundle(), 2);

        let item = q.get(a).unwrap();
        assert_eq!(item.status, ItemStatus::Completed);
        assert!(item.outputs.is_some());
        assert!(item.error.is_none());
        assert_eq!(item.attempts, 2);
    }

    #[test]
    fn retry_transition_clears_prior_error() {
        let mut q = BatchQueue::new();
        let a = q.enqueue("a.png");
        q.mark_processing(a);
        q.mark_failed(
            a,
            ItemError::RecognitionFailed {
                name: "a.png".into(),
                attempts: 3,
                detail: "boom".into(),
            },
            3,
        );

        q.mark_processing(a);
        let item = q.get(a).unwrap();
        assert_eq!(item.status, ItemStatus::Processing);
        assert!(item.error.is_none());
    }

    #[test]
    fn failed_only_snapshot() {
        let mut q = BatchQueue::new();
        let a = q.enqueue("a.png");
        let b = q.enqueue("b.png");
        q.mark_processing(a);
        q.mark_completed(a, bundle(), 1);
        q.mark_processing(b);
        q.mark_failed(
            b,
            ItemError::RecognitionFailed {
                name: "b.png".into(),
                attempts: 1,
                detail: "x".into(),
            },
            1,
        );

        assert_eq!(q.ids(false).len(), 2);
        assert_eq!(q.ids(true), vec![b]);
    }

    #[test]
    fn clear_and_remove() {
        let mut q = BatchQueue::new();
        let a = q.enqueue("a.png");
        q.enqueue("b.png");
        assert!(q.remove(a));
        assert!(!q.remove(a));
        assert_eq!(q.len(), 1);
        q.clear();
        assert!(q.is_empty());
    }
}
