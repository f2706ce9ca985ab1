//! [`DocumentEngine`] backed by PDFium through `pdfium-render`.
//!
//! PDFium's global state lives in one process-wide [`EngineRegistry`]:
//! `FPDF_InitLibrary` runs when the first [`PdfiumEngine`] is acquired and
//! `FPDF_DestroyLibrary` when the last one is dropped.
//!
//! Library lookup order:
//!
//! 1. [`PipelineConfig::pdfium_library_path`], if set (no fallback).
//! 2. `PDFIUM_LIB_PATH` or the pdfium-auto cache.
//! 3. The system library search path.
//! 4. A download into the pdfium-auto cache, if
//!    [`PipelineConfig::allow_pdfium_download`] is set.

use super::{DocumentEngine, EngineError, EngineHandle, EngineRegistry};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::model::PageSpec;
use crate::pixels::{ChannelOrder, PixelBuffer};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

static PDFIUM: EngineRegistry<Pdfium> = EngineRegistry::new();

impl From<PdfiumError> for EngineError {
    fn from(e: PdfiumError) -> Self {
        EngineError::Failed(format!("{:?}", e))
    }
}

/// A shared, initialised PDFium instance.
#[derive(Clone)]
pub struct PdfiumEngine {
    pdfium: EngineHandle<Pdfium>,
}

impl PdfiumEngine {
    /// Acquire the process-wide PDFium instance, binding the library first
    /// if no other engine is alive.
    pub fn acquire(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let pdfium = PDFIUM.acquire(|| bind(config))?;
        Ok(Self { pdfium })
    }

    /// Number of live engine handles in this process.
    pub fn active_handles() -> usize {
        PDFIUM.active_handles()
    }
}

fn bind(config: &PipelineConfig) -> Result<Pdfium, PipelineError> {
    if let Some(path) = &config.pdfium_library_path {
        info!("Binding PDFium from {}", path.display());
        return pdfium_auto::bind_pdfium_from_path(path)
            .map_err(|e| PipelineError::EngineUnavailable(e.to_string()));
    }

    if let Some(path) = pdfium_auto::cached_pdfium_path() {
        match pdfium_auto::bind_pdfium_from_path(&path) {
            Ok(pdfium) => {
                info!("Bound cached PDFium at {}", path.display());
                return Ok(pdfium);
            }
            Err(e) => warn!("Cached PDFium unusable: {}", e),
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            info!("Bound system PDFium library");
            return Ok(Pdfium::new(bindings));
        }
        Err(e) => debug!("No system PDFium: {:?}", e),
    }

    if !config.allow_pdfium_download {
        return Err(PipelineError::EngineUnavailable(
            "no PDFium library found and downloading is disabled".into(),
        ));
    }

    info!(
        "Downloading PDFium {} into {}",
        pdfium_auto::PDFIUM_VERSION,
        pdfium_auto::pdfium_cache_dir().display()
    );
    pdfium_auto::bind_pdfium(None).map_err(|e| PipelineError::EngineUnavailable(e.to_string()))
}

fn page_index(index: usize) -> Result<PdfPageIndex, EngineError> {
    PdfPageIndex::try_from(index)
        .map_err(|_| EngineError::Failed(format!("page index {index} out of range")))
}

impl DocumentEngine for PdfiumEngine {
    type Document<'a> = PdfDocument<'a>;

    fn create_document(&self) -> Result<PdfDocument<'_>, EngineError> {
        Ok(self.pdfium.create_new_pdf()?)
    }

    fn open_document(&self, path: &Path) -> Result<PdfDocument<'_>, EngineError> {
        Ok(self.pdfium.load_pdf_from_file(path, None)?)
    }

    fn page_count(&self, doc: &PdfDocument<'_>) -> usize {
        doc.pages().len() as usize
    }

    fn page_size(&self, doc: &PdfDocument<'_>, index: usize) -> Result<(f32, f32), EngineError> {
        let page = doc.pages().get(page_index(index)?)?;
        Ok((page.width().value, page.height().value))
    }

    fn import_pages(
        &self,
        target: &mut PdfDocument<'_>,
        source: &PdfDocument<'_>,
        at: usize,
    ) -> Result<usize, EngineError> {
        let count = source.pages().len();
        if count == 0 {
            return Ok(0);
        }
        target
            .pages_mut()
            .copy_page_range_from_document(source, 0..=(count - 1), page_index(at)?)?;
        Ok(count as usize)
    }

    fn image_channel_order(&self) -> ChannelOrder {
        // PdfPageImageObject takes a DynamicImage, which is RGBA.
        ChannelOrder::Rgba
    }

    fn append_image_page(
        &self,
        doc: &mut PdfDocument<'_>,
        image: PixelBuffer,
    ) -> Result<(), EngineError> {
        let width = PdfPoints::new(image.width() as f32);
        let height = PdfPoints::new(image.height() as f32);
        let image = DynamicImage::ImageRgba8(image.into_rgba_image()?);

        let mut page = doc
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::from_points(width, height))?;
        let object = PdfPageImageObject::new_with_size(doc, &image, width, height)?;
        page.objects_mut().add_image_object(object)?;
        Ok(())
    }

    fn render_page(
        &self,
        doc: &PdfDocument<'_>,
        index: usize,
        size: PageSpec,
    ) -> Result<PixelBuffer, EngineError> {
        let bytes_needed = u64::from(size.width)
            .checked_mul(u64::from(size.height))
            .and_then(|n| n.checked_mul(4));
        if size.width > i32::MAX as u32
            || size.height > i32::MAX as u32
            || bytes_needed.map_or(true, |n| n > isize::MAX as u64)
        {
            return Err(EngineError::Allocation {
                width: u64::from(size.width),
                height: u64::from(size.height),
            });
        }

        let page = doc.pages().get(page_index(index)?)?;
        let render_config = PdfRenderConfig::new()
            .set_target_size(size.width as i32, size.height as i32)
            .set_format(PdfBitmapFormat::BGRA)
            .set_clear_color(PdfColor::WHITE);

        let bitmap = page.render_with_config(&render_config)?;
        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let data: Vec<u8> = Vec::from(bitmap.as_raw_bytes());
        let stride = data.len() / (height.max(1) as usize);
        debug!("Rendered page {} → {}x{} px", index + 1, width, height);

        let pixels = PixelBuffer::from_raw(width, height, stride, ChannelOrder::Bgra, data)?;
        if width == size.width && height == size.height {
            Ok(pixels)
        } else {
            // PDFium may round the target by a pixel.
            Ok(pixels.resize(size.width, size.height)?)
        }
    }

    fn save_to_bytes(&self, doc: &PdfDocument<'_>) -> Result<Vec<u8>, EngineError> {
        Ok(doc.save_to_bytes()?)
    }
}
