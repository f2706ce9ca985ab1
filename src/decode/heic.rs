//! HEIC/HEIF decoding through an external converter process.
//!
//! The converter writes an intermediate PNG into a private
//! [`tempfile::TempDir`], which is then decoded natively. The directory is
//! removed when the call returns, on success and on every error path.

use super::{DecodeError, ImageDecoder, NativeImageDecoder};
use crate::config::HeicConverter;
use crate::pixels::PixelBuffer;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const INTERMEDIATE_NAME: &str = "decoded.png";

pub struct ExternalConverterDecoder {
    converter: HeicConverter,
    scratch_root: Option<PathBuf>,
}

impl ExternalConverterDecoder {
    pub fn new(converter: HeicConverter) -> Self {
        Self {
            converter,
            scratch_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn converter_error(&self, detail: impl Into<String>) -> DecodeError {
        DecodeError::Converter {
            program: self.converter.program.clone(),
            detail: detail.into(),
        }
    }
}

impl ImageDecoder for ExternalConverterDecoder {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError> {
        if !path.is_file() {
            return Err(DecodeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("'{}' does not exist", path.display()),
            )));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("pdf-combiner-heic-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let output = scratch.path().join(INTERMEDIATE_NAME);
        let args = self.converter.render_args(path, &output);

        debug!("Converting {} with {}", path.display(), self.converter.program);
        let result = Command::new(&self.converter.program)
            .args(&args)
            .output()
            .map_err(|e| self.converter_error(format!("cannot start: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(self.converter_error(format!(
                "exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        if !output.is_file() {
            return Err(self.converter_error("no output image was written"));
        }

        NativeImageDecoder.decode(&output)
    }
}
