//! The three document pipelines and the batch bookkeeping they share.
//!
//! Each submodule implements one component. None of them keeps state
//! between invocations; engine, decoder and config are borrowed per call.
//!
//! ## Data Flow
//!
//! ```text
//! merge:      open ──▶ import pages ──▶ save ──▶ write
//! assemble:   decode ──▶ resize ──▶ swizzle ──▶ add image page ──▶ save ──▶ write
//! rasterize:  open ──▶ render (BGRA) ──▶ [blit into canvas] ──▶ RGBA ──▶ PNG
//! ```
//!
//! 1. [`merge`]    : [`PdfMerger`], page concatenation
//! 2. [`assemble`] : [`ImageToPdfAssembler`], one image per page
//! 3. [`rasterize`]: [`PdfToImageRasterizer`], separate or stacked PNGs
//! 4. [`write`]    : output sinks shared by all three

pub mod assemble;
pub mod merge;
pub mod rasterize;
pub mod write;

pub use assemble::ImageToPdfAssembler;
pub use merge::PdfMerger;
pub use rasterize::{CanvasLayout, CombinedRasterCanvas, PdfToImageRasterizer, RasterOptions};

use crate::config::{OnItemError, PipelineConfig};
use crate::engine::EngineError;
use crate::error::{ItemError, PipelineError};
use crate::model::SourceFile;
use crate::progress::{NoopProgressCallback, PipelineProgressCallback};
use serde::Serialize;
use tracing::warn;

/// What happened to the items of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: Vec<ItemError>,
}

/// Applies the [`OnItemError`] policy and drives the progress callback for
/// one batch.
pub(crate) struct Batch<'c> {
    policy: OnItemError,
    progress: &'c dyn PipelineProgressCallback,
    summary: BatchSummary,
    first_error: Option<String>,
}

impl<'c> Batch<'c> {
    pub(crate) fn start(config: &'c PipelineConfig, total: usize) -> Self {
        let progress: &'c dyn PipelineProgressCallback = match &config.progress_callback {
            Some(cb) => cb.as_ref(),
            None => &NoopProgressCallback,
        };
        progress.on_start(total);
        Self {
            policy: config.on_item_error,
            progress,
            summary: BatchSummary {
                total,
                ..BatchSummary::default()
            },
            first_error: None,
        }
    }

    pub(crate) fn complete(&mut self, index: usize) {
        self.summary.succeeded += 1;
        self.progress.on_item_complete(index, self.summary.total);
    }

    /// Record a failed source. Under `Abort` the error is handed back for
    /// the caller to return.
    pub(crate) fn source_failed(
        &mut self,
        index: usize,
        source: &SourceFile,
        error: PipelineError,
    ) -> Result<(), PipelineError> {
        let item = ItemError::SourceSkipped {
            index,
            path: source.path().to_path_buf(),
            code: error.code().to_string(),
            detail: error.to_string(),
        };
        self.skip_or_abort(index, error, item)
    }

    /// Record a failed page (0-based `index`).
    pub(crate) fn page_failed(
        &mut self,
        index: usize,
        error: PipelineError,
    ) -> Result<(), PipelineError> {
        let item = ItemError::PageSkipped {
            page: index + 1,
            code: error.code().to_string(),
            detail: error.to_string(),
        };
        self.skip_or_abort(index, error, item)
    }

    fn skip_or_abort(
        &mut self,
        index: usize,
        error: PipelineError,
        item: ItemError,
    ) -> Result<(), PipelineError> {
        if self.policy == OnItemError::Abort {
            return Err(error);
        }
        warn!("{}", item);
        self.progress
            .on_item_skipped(index, self.summary.total, &item);
        self.first_error.get_or_insert_with(|| error.to_string());
        self.summary.skipped.push(item);
        Ok(())
    }

    /// Fails with [`PipelineError::AllItemsFailed`] when every item was
    /// skipped.
    pub(crate) fn ensure_any_succeeded(&self) -> Result<(), PipelineError> {
        if self.summary.succeeded == 0 && !self.summary.skipped.is_empty() {
            return Err(PipelineError::AllItemsFailed {
                total: self.summary.total,
                first_error: self.first_error.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> BatchSummary {
        self.progress
            .on_finish(self.summary.total, self.summary.succeeded);
        self.summary
    }
}

/// Map an allocation failure to its own error, anything else via `other`.
pub(crate) fn engine_error(
    e: EngineError,
    other: impl FnOnce(String) -> PipelineError,
) -> PipelineError {
    match e {
        EngineError::Allocation { width, height } => {
            PipelineError::BitmapAllocationFailed { width, height }
        }
        EngineError::Failed(detail) => other(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn load_error(name: &str) -> PipelineError {
        PipelineError::DocumentLoadFailed {
            path: name.into(),
            detail: "bad header".into(),
        }
    }

    #[test]
    fn abort_returns_the_first_error() {
        let config = PipelineConfig::default();
        let mut batch = Batch::start(&config, 2);
        let err = batch
            .source_failed(0, &SourceFile::from("a.pdf"), load_error("a.pdf"))
            .unwrap_err();
        assert_eq!(err.code(), "document_loading_failed");
    }

    #[test]
    fn skip_records_and_continues() {
        #[derive(Default)]
        struct Skips(AtomicUsize);
        impl PipelineProgressCallback for Skips {
            fn on_item_skipped(&self, _: usize, _: usize, _: &ItemError) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let skips = Arc::new(Skips::default());
        let config = PipelineConfig::builder()
            .on_item_error(OnItemError::SkipAndContinue)
            .progress_callback(skips.clone() as ProgressCallback)
            .build()
            .unwrap();

        let mut batch = Batch::start(&config, 2);
        batch
            .source_failed(0, &SourceFile::from("a.pdf"), load_error("a.pdf"))
            .unwrap();
        batch.complete(1);
        batch.ensure_any_succeeded().unwrap();
        let summary = batch.finish();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(skips.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn all_skipped_is_all_items_failed() {
        let config = PipelineConfig::builder()
            .on_item_error(OnItemError::SkipAndContinue)
            .build()
            .unwrap();
        let mut batch = Batch::start(&config, 1);
        batch
            .page_failed(
                0,
                PipelineError::RenderFailed {
                    page: 1,
                    detail: "x".into(),
                },
            )
            .unwrap();
        let err = batch.ensure_any_succeeded().unwrap_err();
        assert_eq!(err.code(), "all_items_failed");
        assert!(err.to_string().contains("page 1"));
    }

    #[test]
    fn allocation_errors_keep_their_code() {
        let e = engine_error(
            EngineError::Allocation {
                width: 1,
                height: 2,
            },
            PipelineError::Internal,
        );
        assert_eq!(e.code(), "bitmap_allocation_failed");
    }
}
