//! PDF concatenation.
//!
//! Pages are imported at a running insertion index, so the output holds
//! every page of source 0, then every page of source 1, and so on, each in
//! its original order. Sources are dropped as soon as their pages are
//! copied.

use super::write::write_document;
use super::{engine_error, Batch, BatchSummary};
use crate::config::PipelineConfig;
use crate::engine::DocumentEngine;
use crate::error::PipelineError;
use crate::model::SourceFile;
use std::path::Path;
use tracing::{debug, info};

pub struct PdfMerger<'a, E: DocumentEngine> {
    engine: &'a E,
    config: &'a PipelineConfig,
}

impl<'a, E: DocumentEngine> PdfMerger<'a, E> {
    pub fn new(engine: &'a E, config: &'a PipelineConfig) -> Self {
        Self { engine, config }
    }

    /// Merge `sources` into a single PDF written to `output`.
    pub fn merge(&self, sources: &[SourceFile], output: &Path) -> Result<BatchSummary, PipelineError> {
        if sources.is_empty() {
            return Err(PipelineError::EmptyInput {
                operation: "mergePdfs",
            });
        }
        info!("Merging {} PDFs into {}", sources.len(), output.display());

        let mut batch = Batch::start(self.config, sources.len());
        let mut merged = self
            .engine
            .create_document()
            .map_err(|e| PipelineError::DocumentCreationFailed(e.to_string()))?;
        let mut total_pages = 0usize;

        for (index, source) in sources.iter().enumerate() {
            let document = match self.engine.open_document(source.path()) {
                Ok(document) => document,
                Err(e) => {
                    let error = PipelineError::DocumentLoadFailed {
                        path: source.path().to_path_buf(),
                        detail: e.to_string(),
                    };
                    batch.source_failed(index, source, error)?;
                    continue;
                }
            };

            match self.engine.import_pages(&mut merged, &document, total_pages) {
                Ok(copied) => {
                    debug!(
                        "Imported {} pages from {} at index {}",
                        copied, source, total_pages
                    );
                    total_pages += copied;
                    batch.complete(index);
                }
                Err(e) => {
                    let error = engine_error(e, |detail| PipelineError::ComposeFailed {
                        path: source.path().to_path_buf(),
                        detail,
                    });
                    batch.source_failed(index, source, error)?;
                }
            }
        }

        batch.ensure_any_succeeded()?;

        let bytes = self
            .engine
            .save_to_bytes(&merged)
            .map_err(|e| PipelineError::DocumentSaveFailed(e.to_string()))?;
        drop(merged);
        write_document(output, &bytes)?;

        info!("Merged {} pages into {}", total_pages, output.display());
        Ok(batch.finish())
    }
}
