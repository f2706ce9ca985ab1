//! Error types for the pdf-combiner library.
//!
//! * [`PipelineError`] is fatal: exactly one is reported per failed
//!   invocation, and its [`PipelineError::code`] is what the bridge sends
//!   back to the host.
//!
//! * [`ItemError`] is non-fatal: one source (or page) failed while the
//!   batch ran under [`crate::config::OnItemError::SkipAndContinue`]. It is
//!   logged, handed to the progress callback and kept in the operation
//!   summary.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-combiner library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Argument errors ───────────────────────────────────────────────────
    /// Missing field, wrong type or out-of-range value in a method call.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The operation was given an empty list of sources.
    #[error("No input files were provided to {operation}")]
    EmptyInput { operation: &'static str },

    // ── Resource errors ───────────────────────────────────────────────────
    /// A source PDF could not be opened or parsed.
    #[error("Failed to load PDF '{path}': {detail}")]
    DocumentLoadFailed { path: PathBuf, detail: String },

    /// The source PDF opened fine but has no pages to rasterise.
    #[error("PDF '{path}' has no pages")]
    EmptyDocument { path: PathBuf },

    /// A source image could not be decoded.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    // ── Processing errors ─────────────────────────────────────────────────
    /// The engine refused to create an empty output document.
    #[error("Failed to create output document: {0}")]
    DocumentCreationFailed(String),

    /// Pages or an image could not be placed into the output document.
    #[error("Failed to compose '{path}' into the output document: {detail}")]
    ComposeFailed { path: PathBuf, detail: String },

    /// Resampling an image to its target size failed.
    #[error("Failed to resize image '{path}': {detail}")]
    ImageResizeFailed { path: PathBuf, detail: String },

    /// A pixel buffer of the requested size could not be allocated.
    #[error("Cannot allocate a {width}x{height} bitmap")]
    BitmapAllocationFailed { width: u64, height: u64 },

    /// The engine failed to render a page.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Every source in the batch failed and was skipped.
    #[error("All {total} inputs failed.\nFirst error: {first_error}")]
    AllItemsFailed { total: usize, first_error: String },

    // ── Persistence errors ────────────────────────────────────────────────
    /// PNG encoding or writing failed.
    #[error("Failed to save image '{path}': {detail}")]
    ImageSaveFailed { path: PathBuf, detail: String },

    /// The output document could not be serialised.
    #[error("Failed to serialise output document: {0}")]
    DocumentSaveFailed(String),

    /// The serialised document could not be written.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Engine / internal ─────────────────────────────────────────────────
    /// No PDFium library could be bound.
    #[error(
        "PDF engine unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or enable automatic download."
    )]
    EngineUnavailable(String),

    /// Invalid library configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable machine-readable code reported to the host.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArguments(_) | Self::InvalidConfig(_) => "invalid_arguments",
            Self::EmptyInput { .. } => "empty_input",
            Self::DocumentLoadFailed { .. } => "document_loading_failed",
            Self::EmptyDocument { .. } => "empty_document",
            Self::ImageDecodeFailed { .. } => "image_decode_failed",
            Self::DocumentCreationFailed(_) => "document_creation_failed",
            Self::ComposeFailed { .. } => "document_compose_failed",
            Self::ImageResizeFailed { .. } => "image_resize_failed",
            Self::BitmapAllocationFailed { .. } => "bitmap_allocation_failed",
            Self::RenderFailed { .. } => "page_render_failed",
            Self::AllItemsFailed { .. } => "all_items_failed",
            Self::ImageSaveFailed { .. } => "image_save_failed",
            Self::DocumentSaveFailed(_) | Self::OutputWriteFailed { .. } => "document_save_failed",
            Self::EngineUnavailable(_) => "engine_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// A non-fatal failure of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// A source file in a merge or image batch was skipped.
    #[error("Input {index} ('{path}') skipped: {detail}")]
    SourceSkipped {
        index: usize,
        path: PathBuf,
        code: String,
        detail: String,
    },

    /// A page was skipped while rasterising.
    #[error("Page {page} skipped: {detail}")]
    PageSkipped {
        page: usize,
        code: String,
        detail: String,
    },
}
