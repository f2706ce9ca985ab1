//! Progress-callback trait for per-item pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as a merge, image batch or rasterisation works through its
//! items. An "item" is a source file for merges and image batches, and a
//! page when rasterising.
//!
//! # Example
//!
//! ```rust
//! use pdf_combiner::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("item {}/{} done", index + 1, total);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ItemError;
use std::sync::Arc;

/// Called by the pipelines as they process each item.
///
/// Implementations must be `Send + Sync` because async operations run the
/// pipeline on a `spawn_blocking` thread. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the first item.
    ///
    /// # Arguments
    /// * `total`: number of items that will be attempted
    fn on_start(&self, total: usize) {
        let _ = total;
    }

    /// Called when an item was processed successfully.
    ///
    /// # Arguments
    /// * `index`: 0-based item index
    /// * `total`: total items
    fn on_item_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an item failed and was skipped under
    /// [`crate::config::OnItemError::SkipAndContinue`].
    fn on_item_skipped(&self, index: usize, total: usize, error: &ItemError) {
        let _ = (index, total, error);
    }

    /// Called once after every item has been attempted and the output is
    /// written.
    ///
    /// # Arguments
    /// * `total`    : items attempted
    /// * `succeeded`: items that made it into the output
    fn on_finish(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        skips: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _index: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_skipped(&self, _index: usize, _total: usize, _error: &ItemError) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_finish(&self, _total: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_start(2);
        cb.on_item_complete(0, 2);
        cb.on_item_skipped(
            1,
            2,
            &ItemError::PageSkipped {
                page: 2,
                code: "page_render_failed".into(),
                detail: "boom".into(),
            },
        );
        cb.on_finish(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_start(3);
        tracker.on_item_complete(0, 3);
        tracker.on_item_skipped(
            1,
            3,
            &ItemError::SourceSkipped {
                index: 1,
                path: "b.pdf".into(),
                code: "document_loading_failed".into(),
                detail: "not a PDF".into(),
            },
        );
        tracker.on_item_complete(2, 3);
        tracker.on_finish(3, 2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_start(10);
        cb.on_item_complete(0, 10);
    }
}
