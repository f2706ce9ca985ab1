//! Images to PDF: one full-bleed image per page.

use super::write::write_document;
use super::{engine_error, Batch, BatchSummary};
use crate::config::PipelineConfig;
use crate::decode::ImageDecoder;
use crate::engine::DocumentEngine;
use crate::error::PipelineError;
use crate::model::{PageSpec, ResizePolicy, SourceFile};
use crate::pixels::PixelError;
use std::path::Path;
use tracing::{debug, info};

pub struct ImageToPdfAssembler<'a, E: DocumentEngine, D: ImageDecoder + ?Sized> {
    engine: &'a E,
    decoder: &'a D,
    config: &'a PipelineConfig,
}

impl<'a, E: DocumentEngine, D: ImageDecoder + ?Sized> ImageToPdfAssembler<'a, E, D> {
    pub fn new(engine: &'a E, decoder: &'a D, config: &'a PipelineConfig) -> Self {
        Self {
            engine,
            decoder,
            config,
        }
    }

    /// Build a PDF at `output` where page *i* holds image *i*, sized per
    /// `policy`. Each page measures exactly the (resized) image in points.
    pub fn assemble(
        &self,
        sources: &[SourceFile],
        policy: ResizePolicy,
        output: &Path,
    ) -> Result<BatchSummary, PipelineError> {
        if sources.is_empty() {
            return Err(PipelineError::EmptyInput {
                operation: "imagesToPdf",
            });
        }
        info!(
            "Building a {}-page PDF at {} (max {}x{}, keep aspect ratio: {})",
            sources.len(),
            output.display(),
            policy.max_width,
            policy.max_height,
            policy.keep_aspect_ratio
        );

        let mut batch = Batch::start(self.config, sources.len());
        let mut document = self
            .engine
            .create_document()
            .map_err(|e| PipelineError::DocumentCreationFailed(e.to_string()))?;

        for (index, source) in sources.iter().enumerate() {
            match self.add_page(&mut document, source, policy) {
                Ok(()) => batch.complete(index),
                Err(error) => batch.source_failed(index, source, error)?,
            }
        }

        batch.ensure_any_succeeded()?;

        let bytes = self
            .engine
            .save_to_bytes(&document)
            .map_err(|e| PipelineError::DocumentSaveFailed(e.to_string()))?;
        drop(document);
        write_document(output, &bytes)?;

        info!("Wrote {}", output.display());
        Ok(batch.finish())
    }

    fn add_page(
        &self,
        document: &mut E::Document<'a>,
        source: &SourceFile,
        policy: ResizePolicy,
    ) -> Result<(), PipelineError> {
        let path = source.path();
        let pixels = self
            .decoder
            .decode(path)
            .map_err(|e| PipelineError::ImageDecodeFailed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let native = PageSpec::new(pixels.width(), pixels.height());
        let target = policy.target_for(native);
        let pixels = if target == native {
            pixels
        } else {
            pixels
                .resize(target.width, target.height)
                .map_err(|e| match e {
                    PixelError::Allocation { width, height } => {
                        PipelineError::BitmapAllocationFailed { width, height }
                    }
                    other => PipelineError::ImageResizeFailed {
                        path: path.to_path_buf(),
                        detail: other.to_string(),
                    },
                })?
        };
        debug!("{}: {} → {}", source, native, target);

        let pixels = pixels.into_channel_order(self.engine.image_channel_order());
        self.engine
            .append_image_page(document, pixels)
            .map_err(|e| {
                engine_error(e, |detail| PipelineError::ComposeFailed {
                    path: path.to_path_buf(),
                    detail,
                })
            })
    }
}
