//! Output sinks: serialised PDFs and PNG files.
//!
//! Both create-or-overwrite their target with no atomic rename. A failure
//! partway through leaves a partial file behind; callers must treat the
//! output as invalid whenever an error is returned.

use crate::error::PipelineError;
use crate::model::PngCompression;
use crate::pixels::PixelBuffer;
use image::codecs::png::{FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

const BLOCK: usize = 64 * 1024;

/// Write a serialised document to `path`, creating parent directories.
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let fail = |source: std::io::Error| PipelineError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }
    let mut file = File::create(path).map_err(fail)?;
    for block in bytes.chunks(BLOCK) {
        file.write_all(block).map_err(fail)?;
    }
    file.flush().map_err(fail)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Encode `pixels` as an RGBA PNG at `path`.
pub fn write_png(
    path: &Path,
    pixels: PixelBuffer,
    compression: PngCompression,
) -> Result<(), PipelineError> {
    let fail = |detail: String| PipelineError::ImageSaveFailed {
        path: path.to_path_buf(),
        detail,
    };

    let image = pixels.into_rgba_image().map_err(|e| fail(e.to_string()))?;
    let file = File::create(path).map_err(|e| fail(e.to_string()))?;
    let mut writer = BufWriter::with_capacity(BLOCK, file);

    PngEncoder::new_with_quality(&mut writer, compression.compression_type(), FilterType::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| fail(e.to_string()))?;
    writer.flush().map_err(|e| fail(e.to_string()))?;

    debug!(
        "Wrote {}x{} PNG to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}
