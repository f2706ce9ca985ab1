//! Image decoding: "decode any image file into a pixel buffer".
//!
//! [`NativeImageDecoder`] covers every format the `image` crate was built
//! with and applies EXIF orientation. HEIC/HEIF has no pure-Rust decoder,
//! so those files go through [`heic::ExternalConverterDecoder`].
//! [`AnyImageDecoder`] routes by file extension.

pub mod heic;

use crate::config::PipelineConfig;
use crate::model::SourceFile;
use crate::pixels::PixelBuffer;
use image::{DynamicImage, ImageReader};
use std::path::Path;
use thiserror::Error;

pub use heic::ExternalConverterDecoder;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("converter '{program}' failed: {detail}")]
    Converter { program: String, detail: String },
}

/// Turns an image file into pixels.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError>;
}

/// Decoder for the formats compiled into the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeImageDecoder;

impl ImageDecoder for NativeImageDecoder {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError> {
        use image::ImageDecoder as _;

        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        let mut image = DynamicImage::from_decoder(decoder)?;
        image.apply_orientation(orientation);
        Ok(PixelBuffer::from_rgba_image(image.into_rgba8()))
    }
}

/// Routes `.heic` / `.heif` to the HEIF backend and everything else to
/// [`NativeImageDecoder`].
pub struct AnyImageDecoder {
    native: NativeImageDecoder,
    heif: Box<dyn ImageDecoder>,
}

impl AnyImageDecoder {
    pub fn new(heif: Box<dyn ImageDecoder>) -> Self {
        Self {
            native: NativeImageDecoder,
            heif,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(Box::new(ExternalConverterDecoder::new(
            config.heic_converter.clone(),
        )))
    }
}

impl ImageDecoder for AnyImageDecoder {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError> {
        if SourceFile::new(path).is_heif() {
            self.heif.decode(path)
        } else {
            self.native.decode(path)
        }
    }
}
