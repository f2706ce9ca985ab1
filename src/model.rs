//! Value types shared by the three pipelines: source references, page
//! sizes, the resize policy and PNG compression levels.

use image::codecs::png::CompressionType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A caller-supplied input file (PDF or image).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFile {
    path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    /// `true` for `.heic` / `.heif` files, which need the HEIF-capable decoder.
    pub fn is_heif(&self) -> bool {
        matches!(self.extension().as_deref(), Some("heic" | "heif"))
    }
}

impl From<&str> for SourceFile {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for SourceFile {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for SourceFile {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Page or raster dimensions. PDF points map to pixels 1:1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageSpec {
    pub width: u32,
    pub height: u32,
}

impl PageSpec {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Convert a page size in points, rounding to whole pixels (minimum 1).
    pub fn from_points(width: f32, height: f32) -> Self {
        let px = |v: f32| (v.round().max(1.0)).min(u32::MAX as f32) as u32;
        Self::new(px(width), px(height))
    }
}

impl fmt::Display for PageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Caller constraint on output dimensions. Zero means "unconstrained".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResizePolicy {
    pub max_width: u32,
    pub max_height: u32,
    pub keep_aspect_ratio: bool,
}

impl ResizePolicy {
    /// Keep native dimensions.
    pub const NONE: Self = Self {
        max_width: 0,
        max_height: 0,
        keep_aspect_ratio: false,
    };

    pub const fn new(max_width: u32, max_height: u32, keep_aspect_ratio: bool) -> Self {
        Self {
            max_width,
            max_height,
            keep_aspect_ratio,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.max_width == 0 && self.max_height == 0
    }

    /// Target size for an image placed on a PDF page.
    ///
    /// With `keep_aspect_ratio` and a non-zero `max_width`, the height is
    /// derived from the source ratio and any `max_height` is ignored. With
    /// `keep_aspect_ratio` and only `max_height`, the width is derived the
    /// same way. Otherwise each non-zero maximum replaces the native
    /// dimension as is.
    pub fn target_for(&self, native: PageSpec) -> PageSpec {
        if self.is_noop() {
            return native;
        }

        if self.keep_aspect_ratio {
            if self.max_width != 0 && native.width != 0 {
                let height = scale(native.height, self.max_width, native.width);
                return PageSpec::new(self.max_width, height);
            }
            if self.max_width == 0 && native.height != 0 {
                let width = scale(native.width, self.max_height, native.height);
                return PageSpec::new(width, self.max_height);
            }
        }

        self.fixed_target(native)
    }

    /// Fixed raster target for a rendered page: each non-zero dimension
    /// overrides the native one, with no aspect correction.
    pub fn fixed_target(&self, native: PageSpec) -> PageSpec {
        PageSpec::new(
            if self.max_width != 0 { self.max_width } else { native.width },
            if self.max_height != 0 { self.max_height } else { native.height },
        )
    }
}

/// `value × to / from`, rounded and clamped to at least 1.
fn scale(value: u32, to: u32, from: u32) -> u32 {
    let scaled = (f64::from(value) * f64::from(to) / f64::from(from)).round();
    scaled.clamp(1.0, f64::from(u32::MAX)) as u32
}

/// PNG compression effort.
///
/// Levels 0–9 follow zlib. Larger values are read as an Android-style
/// 0–100 quality and divided by ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct PngCompression(u8);

impl PngCompression {
    pub const MAX_INPUT: u32 = 100;

    pub fn from_level(level: u32) -> Self {
        let level = level.min(Self::MAX_INPUT);
        let level = if level > 9 { level / 10 } else { level };
        Self(level.min(9) as u8)
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub(crate) fn compression_type(&self) -> CompressionType {
        match self.0 {
            0..=2 => CompressionType::Fast,
            3..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        }
    }
}

impl From<u32> for PngCompression {
    fn from(level: u32) -> Self {
        Self::from_level(level)
    }
}

impl From<PngCompression> for u32 {
    fn from(c: PngCompression) -> Self {
        u32::from(c.0)
    }
}

impl Default for PngCompression {
    fn default() -> Self {
        Self(6)
    }
}
