//! The three public operations, bound to the PDFium engine.
//!
//! Every operation comes in two flavours:
//!
//! * `*_blocking` runs on the calling thread. PDFium work is CPU-bound and
//!   blocking, so call these from plain threads or `spawn_blocking`.
//! * the `async` variant moves the blocking call onto
//!   `tokio::task::spawn_blocking` and awaits it.
//!
//! Each call acquires a [`PdfiumEngine`] handle for its duration; the
//! engine is shared with any other call running at the same time.

use crate::config::PipelineConfig;
use crate::decode::AnyImageDecoder;
use crate::engine::PdfiumEngine;
use crate::error::PipelineError;
use crate::model::{PngCompression, ResizePolicy, SourceFile};
use crate::pipeline::{
    BatchSummary, ImageToPdfAssembler, PdfMerger, PdfToImageRasterizer, RasterOptions,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

// ── Requests ─────────────────────────────────────────────────────────────

/// Concatenate `sources` into the PDF at `output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub sources: Vec<SourceFile>,
    pub output: PathBuf,
}

/// One page per image in `sources`, written to `output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagesToPdfRequest {
    pub sources: Vec<SourceFile>,
    pub output: PathBuf,
    #[serde(default)]
    pub resize: ResizePolicy,
}

/// Render every page of `source` into PNGs under `output_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfToImagesRequest {
    pub source: SourceFile,
    pub output_dir: PathBuf,
    /// Fixed page size in pixels; 0 keeps the native size.
    #[serde(default)]
    pub size: ResizePolicy,
    #[serde(default)]
    pub compression: PngCompression,
    #[serde(default)]
    pub combine: bool,
}

// ── Outputs ──────────────────────────────────────────────────────────────

/// Result of a merge or image batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutput {
    pub path: PathBuf,
    pub summary: BatchSummary,
}

/// Result of a rasterisation, paths in page order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagesOutput {
    pub paths: Vec<PathBuf>,
    pub summary: BatchSummary,
}

// ── Blocking entry points ────────────────────────────────────────────────

/// Merge PDFs on the calling thread.
pub fn merge_pdfs_blocking(
    request: &MergeRequest,
    config: &PipelineConfig,
) -> Result<DocumentOutput, PipelineError> {
    let start = Instant::now();
    if request.sources.is_empty() {
        return Err(PipelineError::EmptyInput {
            operation: "mergePdfs",
        });
    }
    let engine = PdfiumEngine::acquire(config)?;
    let summary = PdfMerger::new(&engine, config).merge(&request.sources, &request.output)?;
    info!(
        "mergePdfs finished in {}ms ({} of {} sources)",
        start.elapsed().as_millis(),
        summary.succeeded,
        summary.total
    );
    Ok(DocumentOutput {
        path: request.output.clone(),
        summary,
    })
}

/// Build a PDF from images on the calling thread.
pub fn images_to_pdf_blocking(
    request: &ImagesToPdfRequest,
    config: &PipelineConfig,
) -> Result<DocumentOutput, PipelineError> {
    let start = Instant::now();
    if request.sources.is_empty() {
        return Err(PipelineError::EmptyInput {
            operation: "imagesToPdf",
        });
    }
    let engine = PdfiumEngine::acquire(config)?;
    let decoder = AnyImageDecoder::from_config(config);
    let summary = ImageToPdfAssembler::new(&engine, &decoder, config).assemble(
        &request.sources,
        request.resize,
        &request.output,
    )?;
    info!(
        "imagesToPdf finished in {}ms ({} of {} images)",
        start.elapsed().as_millis(),
        summary.succeeded,
        summary.total
    );
    Ok(DocumentOutput {
        path: request.output.clone(),
        summary,
    })
}

/// Rasterise a PDF on the calling thread.
pub fn pdf_to_images_blocking(
    request: &PdfToImagesRequest,
    config: &PipelineConfig,
) -> Result<ImagesOutput, PipelineError> {
    let start = Instant::now();
    let engine = PdfiumEngine::acquire(config)?;
    let options = RasterOptions {
        size: request.size,
        compression: request.compression,
        combine: request.combine,
    };
    let (paths, summary) = PdfToImageRasterizer::new(&engine, config).rasterize(
        &request.source,
        &request.output_dir,
        options,
    )?;
    info!(
        "pdfToImages finished in {}ms ({} images)",
        start.elapsed().as_millis(),
        paths.len()
    );
    Ok(ImagesOutput { paths, summary })
}

// ── Async entry points ───────────────────────────────────────────────────

/// Merge PDFs without blocking the async runtime.
pub async fn merge_pdfs(
    request: MergeRequest,
    config: &PipelineConfig,
) -> Result<DocumentOutput, PipelineError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || merge_pdfs_blocking(&request, &config))
        .await
        .map_err(|e| PipelineError::Internal(format!("Merge task panicked: {}", e)))?
}

/// Build a PDF from images without blocking the async runtime.
pub async fn images_to_pdf(
    request: ImagesToPdfRequest,
    config: &PipelineConfig,
) -> Result<DocumentOutput, PipelineError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || images_to_pdf_blocking(&request, &config))
        .await
        .map_err(|e| PipelineError::Internal(format!("Image task panicked: {}", e)))?
}

/// Rasterise a PDF without blocking the async runtime.
pub async fn pdf_to_images(
    request: PdfToImagesRequest,
    config: &PipelineConfig,
) -> Result<ImagesOutput, PipelineError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || pdf_to_images_blocking(&request, &config))
        .await
        .map_err(|e| PipelineError::Internal(format!("Render task panicked: {}", e)))?
}
