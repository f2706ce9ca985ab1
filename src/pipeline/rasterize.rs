//! PDF pages to PNG, either one file per page or one stacked canvas.
//!
//! Separate mode writes `image_<n>.png` (n = 1-based page number) and drops
//! each page's pixels before rendering the next. Combined mode plans the
//! canvas first ([`CanvasLayout::plan`]), allocates it once, then blits
//! every page at `x = 0` below the previous one and writes `image.png`.

use super::write::write_png;
use super::{engine_error, Batch, BatchSummary};
use crate::config::PipelineConfig;
use crate::engine::DocumentEngine;
use crate::error::PipelineError;
use crate::model::{PageSpec, PngCompression, ResizePolicy, SourceFile};
use crate::pixels::{ChannelOrder, PixelBuffer, PixelError, WHITE};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the stacked image.
pub const COMBINED_FILE_NAME: &str = "image.png";

/// `image_<page>.png`, 1-based.
pub fn page_file_name(page: usize) -> String {
    format!("image_{page}.png")
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RasterOptions {
    /// Fixed pixel size per page; 0 keeps the native size of that dimension.
    pub size: ResizePolicy,
    pub compression: PngCompression,
    /// Stack every page into one image.
    pub combine: bool,
}

/// Where each page goes on the combined canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasLayout {
    pub width: u32,
    pub height: u32,
    /// Per page: vertical offset and size.
    pub slots: Vec<(u32, PageSpec)>,
}

impl CanvasLayout {
    /// Stack `pages` top to bottom: width is the widest page, height the
    /// sum of all heights, and each offset the sum of the heights above.
    pub fn plan(pages: &[PageSpec]) -> Result<Self, PipelineError> {
        let mut slots = Vec::with_capacity(pages.len());
        let mut width = 0u32;
        let mut height = 0u64;
        for page in pages {
            slots.push((height as u32, *page));
            width = width.max(page.width);
            height += u64::from(page.height);
            if height > u64::from(u32::MAX) {
                return Err(PipelineError::BitmapAllocationFailed {
                    width: u64::from(width),
                    height,
                });
            }
        }
        Ok(Self {
            width,
            height: height as u32,
            slots,
        })
    }
}

/// The white canvas pages are blitted into. Kept in BGRA so PDFium output
/// copies straight in; converted to RGBA once when written.
pub struct CombinedRasterCanvas {
    layout: CanvasLayout,
    pixels: PixelBuffer,
}

impl CombinedRasterCanvas {
    pub fn new(layout: CanvasLayout) -> Result<Self, PipelineError> {
        let pixels = PixelBuffer::filled(layout.width, layout.height, ChannelOrder::Bgra, WHITE)
            .map_err(|e| match e {
                PixelError::Allocation { width, height } => {
                    PipelineError::BitmapAllocationFailed { width, height }
                }
                other => PipelineError::Internal(other.to_string()),
            })?;
        Ok(Self { layout, pixels })
    }

    pub fn layout(&self) -> &CanvasLayout {
        &self.layout
    }

    /// Copy the rendered page `index` into its slot.
    pub fn place(&mut self, index: usize, page: &PixelBuffer) -> Result<(), PipelineError> {
        let (y, size) = *self.layout.slots.get(index).ok_or_else(|| {
            PipelineError::Internal(format!("no canvas slot for page {}", index + 1))
        })?;
        if page.width() != size.width || page.height() != size.height {
            return Err(PipelineError::Internal(format!(
                "page {} rendered at {}x{}, slot is {}",
                index + 1,
                page.width(),
                page.height(),
                size
            )));
        }
        self.pixels.blit_region(page, 0, y);
        Ok(())
    }

    pub fn into_pixels(self) -> PixelBuffer {
        self.pixels
    }
}

pub struct PdfToImageRasterizer<'a, E: DocumentEngine> {
    engine: &'a E,
    config: &'a PipelineConfig,
}

impl<'a, E: DocumentEngine> PdfToImageRasterizer<'a, E> {
    pub fn new(engine: &'a E, config: &'a PipelineConfig) -> Self {
        Self { engine, config }
    }

    /// Rasterise `source` into `output_dir`, returning the written paths in
    /// page order.
    pub fn rasterize(
        &self,
        source: &SourceFile,
        output_dir: &Path,
        options: RasterOptions,
    ) -> Result<(Vec<PathBuf>, BatchSummary), PipelineError> {
        let document = self.engine.open_document(source.path()).map_err(|e| {
            PipelineError::DocumentLoadFailed {
                path: source.path().to_path_buf(),
                detail: e.to_string(),
            }
        })?;
        let page_count = self.engine.page_count(&document);
        if page_count == 0 {
            return Err(PipelineError::EmptyDocument {
                path: source.path().to_path_buf(),
            });
        }
        std::fs::create_dir_all(output_dir).map_err(|e| PipelineError::ImageSaveFailed {
            path: output_dir.to_path_buf(),
            detail: e.to_string(),
        })?;

        info!(
            "Rasterising {} pages of {} into {} ({})",
            page_count,
            source,
            output_dir.display(),
            if options.combine { "combined" } else { "separate" }
        );

        if options.combine {
            self.rasterize_combined(&document, page_count, output_dir, options)
        } else {
            self.rasterize_separate(&document, page_count, output_dir, options)
        }
    }

    fn target_size(
        &self,
        document: &E::Document<'a>,
        index: usize,
        size: ResizePolicy,
    ) -> Result<PageSpec, PipelineError> {
        let (w, h) = self
            .engine
            .page_size(document, index)
            .map_err(|e| render_error(index, e))?;
        Ok(size.fixed_target(PageSpec::from_points(w, h)))
    }

    fn render(
        &self,
        document: &E::Document<'a>,
        index: usize,
        size: ResizePolicy,
    ) -> Result<PixelBuffer, PipelineError> {
        let target = self.target_size(document, index, size)?;
        let pixels = self
            .engine
            .render_page(document, index, target)
            .map_err(|e| render_error(index, e))?;
        debug!("Page {} rendered at {}", index + 1, target);
        Ok(pixels)
    }

    fn rasterize_separate(
        &self,
        document: &E::Document<'a>,
        page_count: usize,
        output_dir: &Path,
        options: RasterOptions,
    ) -> Result<(Vec<PathBuf>, BatchSummary), PipelineError> {
        let mut batch = Batch::start(self.config, page_count);
        let mut paths = Vec::with_capacity(page_count);

        for index in 0..page_count {
            let pixels = match self.render(document, index, options.size) {
                Ok(pixels) => pixels,
                Err(error) => {
                    batch.page_failed(index, error)?;
                    continue;
                }
            };
            let path = output_dir.join(page_file_name(index + 1));
            write_png(
                &path,
                pixels.into_channel_order(ChannelOrder::Rgba),
                options.compression,
            )?;
            paths.push(path);
            batch.complete(index);
        }

        batch.ensure_any_succeeded()?;
        Ok((paths, batch.finish()))
    }

    fn rasterize_combined(
        &self,
        document: &E::Document<'a>,
        page_count: usize,
        output_dir: &Path,
        options: RasterOptions,
    ) -> Result<(Vec<PathBuf>, BatchSummary), PipelineError> {
        let sizes = (0..page_count)
            .map(|index| self.target_size(document, index, options.size))
            .collect::<Result<Vec<_>, _>>()?;
        let layout = CanvasLayout::plan(&sizes)?;
        debug!("Canvas {}x{}", layout.width, layout.height);
        let mut canvas = CombinedRasterCanvas::new(layout)?;

        // Every page has a fixed slot, so a failing page always aborts.
        let mut batch = Batch::start(self.config, page_count);
        for (index, size) in sizes.iter().enumerate() {
            let pixels = self
                .engine
                .render_page(document, index, *size)
                .map_err(|e| render_error(index, e))?;
            canvas.place(index, &pixels)?;
            batch.complete(index);
        }

        let path = output_dir.join(COMBINED_FILE_NAME);
        write_png(&path, canvas.into_pixels(), options.compression)?;
        Ok((vec![path], batch.finish()))
    }
}

fn render_error(index: usize, e: crate::engine::EngineError) -> PipelineError {
    engine_error(e, |detail| PipelineError::RenderFailed {
        page: index + 1,
        detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_stacks_pages() {
        let layout = CanvasLayout::plan(&[
            PageSpec::new(100, 50),
            PageSpec::new(300, 20),
            PageSpec::new(200, 30),
        ])
        .unwrap();
        assert_eq!((layout.width, layout.height), (300, 100));
        let offsets: Vec<u32> = layout.slots.iter().map(|(y, _)| *y).collect();
        assert_eq!(offsets, vec![0, 50, 70]);
    }

    #[test]
    fn layout_height_overflow_is_an_allocation_error() {
        let tall = PageSpec::new(1, u32::MAX);
        let err = CanvasLayout::plan(&[tall, tall]).unwrap_err();
        assert_eq!(err.code(), "bitmap_allocation_failed");
    }

    #[test]
    fn canvas_places_pages_and_keeps_white_margin() {
        let layout = CanvasLayout::plan(&[PageSpec::new(2, 1), PageSpec::new(4, 2)]).unwrap();
        let mut canvas = CombinedRasterCanvas::new(layout).unwrap();
        assert_eq!((canvas.layout().width, canvas.layout().height), (4, 3));
        assert_eq!(canvas.layout().slots[1], (1, PageSpec::new(4, 2)));

        let narrow = PixelBuffer::filled(2, 1, ChannelOrder::Bgra, [0, 0, 0, 255]).unwrap();
        let wide = PixelBuffer::filled(4, 2, ChannelOrder::Bgra, [255, 0, 0, 255]).unwrap();
        canvas.place(0, &narrow).unwrap();
        canvas.place(1, &wide).unwrap();

        let rgba = canvas.into_pixels().into_channel_order(ChannelOrder::Rgba);
        assert_eq!(rgba.pixel(1, 0), [0, 0, 0, 255]);
        assert_eq!(rgba.pixel(3, 0), WHITE);
        assert_eq!(rgba.pixel(3, 2), [0, 0, 255, 255]);
    }

    #[test]
    fn canvas_rejects_wrongly_sized_pages() {
        let layout = CanvasLayout::plan(&[PageSpec::new(2, 2)]).unwrap();
        let mut canvas = CombinedRasterCanvas::new(layout).unwrap();
        let page = PixelBuffer::filled(3, 2, ChannelOrder::Bgra, WHITE).unwrap();
        assert!(canvas.place(0, &page).is_err());
        assert!(canvas.place(1, &page).is_err());
    }

    #[test]
    fn file_names_are_one_based() {
        assert_eq!(page_file_name(1), "image_1.png");
        assert_eq!(page_file_name(12), "image_12.png");
    }
}
