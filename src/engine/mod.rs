//! The PDF engine seam.
//!
//! The pipelines never call PDFium directly. They talk to a
//! [`DocumentEngine`], which exposes exactly the capabilities they need:
//! open/create a document, import pages, add a full-bleed image page,
//! render a page to pixels and serialise. [`pdfium::PdfiumEngine`] is the
//! production implementation; tests drive the pipelines with an in-memory
//! engine instead.

pub mod handle;
pub mod pdfium;

use crate::model::PageSpec;
use crate::pixels::{ChannelOrder, PixelBuffer};
use std::path::Path;
use thiserror::Error;

pub use handle::{EngineHandle, EngineRegistry};
pub use pdfium::PdfiumEngine;

/// Failure reported by an engine call. The pipelines attach path or page
/// context when mapping it into a [`crate::error::PipelineError`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Failed(String),

    #[error("cannot allocate a {width}x{height} bitmap")]
    Allocation { width: u64, height: u64 },
}

impl From<crate::pixels::PixelError> for EngineError {
    fn from(e: crate::pixels::PixelError) -> Self {
        match e {
            crate::pixels::PixelError::Allocation { width, height } => {
                Self::Allocation { width, height }
            }
            other => Self::Failed(other.to_string()),
        }
    }
}

/// Document operations the pipelines depend on.
///
/// Documents borrow the engine (`Document<'a>`), so a document can never
/// outlive the engine that loaded it.
pub trait DocumentEngine {
    type Document<'a>
    where
        Self: 'a;

    /// A new, empty output document.
    fn create_document(&self) -> Result<Self::Document<'_>, EngineError>;

    fn open_document(&self, path: &Path) -> Result<Self::Document<'_>, EngineError>;

    fn page_count(&self, doc: &Self::Document<'_>) -> usize;

    /// Page size in points.
    fn page_size(&self, doc: &Self::Document<'_>, index: usize) -> Result<(f32, f32), EngineError>;

    /// Copy every page of `source` into `target`, inserting at page index
    /// `at`. Returns the number of pages copied.
    fn import_pages(
        &self,
        target: &mut Self::Document<'_>,
        source: &Self::Document<'_>,
        at: usize,
    ) -> Result<usize, EngineError>;

    /// Channel order [`Self::append_image_page`] expects its pixels in.
    fn image_channel_order(&self) -> ChannelOrder;

    /// Append a page of `image.width()` × `image.height()` points holding
    /// `image` as a full-bleed image object.
    fn append_image_page(
        &self,
        doc: &mut Self::Document<'_>,
        image: PixelBuffer,
    ) -> Result<(), EngineError>;

    /// Render page `index` at exactly `size` pixels, white background, BGRA
    /// or RGBA as the engine produces it.
    fn render_page(
        &self,
        doc: &Self::Document<'_>,
        index: usize,
        size: PageSpec,
    ) -> Result<PixelBuffer, EngineError>;

    fn save_to_bytes(&self, doc: &Self::Document<'_>) -> Result<Vec<u8>, EngineError>;
}
