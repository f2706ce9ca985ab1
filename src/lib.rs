//! # pdf-combiner
//!
//! Merge PDFs, build PDFs from images and rasterise PDF pages to PNG,
//! driven either directly from Rust or through a method-call bridge.
//!
//! PDF parsing, writing and rendering is done by PDFium (via
//! `pdfium-render`); image decoding, resampling and PNG encoding by the
//! `image` crate. HEIC/HEIF photos are decoded by an external converter.
//!
//! ## Pipeline Overview
//!
//! ```text
//! host ──▶ bridge     MethodCall → validated request → MethodResponse
//!            │
//!            ▼
//!          operations merge_pdfs / images_to_pdf / pdf_to_images (async + blocking)
//!            │
//!            ▼
//!          pipeline   PdfMerger / ImageToPdfAssembler / PdfToImageRasterizer
//!            │
//!            ├─ engine   DocumentEngine (PDFium, refcounted handle)
//!            ├─ decode   ImageDecoder (image crate, HEIC converter)
//!            └─ write    file sink, PNG encoder
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_combiner::{merge_pdfs, MergeRequest, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = MergeRequest {
//!         sources: vec!["a.pdf".into(), "b.pdf".into()],
//!         output: "merged.pdf".into(),
//!     };
//!     let output = merge_pdfs(request, &PipelineConfig::default()).await?;
//!     eprintln!("wrote {}", output.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-combiner` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-combiner = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bridge;
pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod model;
pub mod operations;
pub mod pipeline;
pub mod pixels;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bridge::{MethodCall, MethodResponse, PdfCombinerPlugin};
pub use config::{HeicConverter, OnItemError, PipelineConfig, PipelineConfigBuilder};
pub use engine::{DocumentEngine, EngineError, PdfiumEngine};
pub use error::{ItemError, PipelineError};
pub use model::{PageSpec, PngCompression, ResizePolicy, SourceFile};
pub use operations::{
    images_to_pdf, images_to_pdf_blocking, merge_pdfs, merge_pdfs_blocking, pdf_to_images,
    pdf_to_images_blocking, DocumentOutput, ImagesOutput, ImagesToPdfRequest, MergeRequest,
    PdfToImagesRequest,
};
pub use pipeline::BatchSummary;
pub use pixels::{ChannelOrder, PixelBuffer};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
