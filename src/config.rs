//! Configuration types for the pdf-combiner pipelines.
//!
//! Everything that is not part of an individual request lives in
//! [`PipelineConfig`], built via its [`PipelineConfigBuilder`]. Request
//! data (paths, sizes, compression) travels in the request types of
//! [`crate::operations`] instead.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Placeholder replaced by the source path in [`HeicConverter::args`].
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced by the intermediate PNG path in [`HeicConverter::args`].
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Configuration shared by every operation.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_combiner::{OnItemError, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .on_item_error(OnItemError::SkipAndContinue)
///     .allow_pdfium_download(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// What to do when one source (or page) of a batch fails. Default: [`OnItemError::Abort`].
    pub on_item_error: OnItemError,

    /// External program used to decode `.heic` / `.heif` sources.
    pub heic_converter: HeicConverter,

    /// Explicit path to the PDFium shared library. When `None`, the
    /// pdfium-auto cache, then the system library, are tried.
    pub pdfium_library_path: Option<PathBuf>,

    /// Download PDFium into the cache when no library can be found. Default: true.
    pub allow_pdfium_download: bool,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            on_item_error: OnItemError::default(),
            heic_converter: HeicConverter::default(),
            pdfium_library_path: None,
            allow_pdfium_download: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("on_item_error", &self.on_item_error)
            .field("heic_converter", &self.heic_converter)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("allow_pdfium_download", &self.allow_pdfium_download)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn on_item_error(mut self, policy: OnItemError) -> Self {
        self.config.on_item_error = policy;
        self
    }

    pub fn heic_converter(mut self, converter: HeicConverter) -> Self {
        self.config.heic_converter = converter;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn allow_pdfium_download(mut self, v: bool) -> Self {
        self.config.allow_pdfium_download = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        c.heic_converter.validate()?;
        if let Some(path) = &c.pdfium_library_path {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::InvalidConfig(
                    "PDFium library path must not be empty".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Policy for a failing item inside a batch.
///
/// | Policy | Merge / images | Rasterise (separate) | Rasterise (combined) |
/// |--------|----------------|----------------------|----------------------|
/// | `Abort` | first failure is returned | first failure is returned | first failure is returned |
/// | `SkipAndContinue` | source skipped, `AllItemsFailed` if none remain | page skipped | first failure is returned |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnItemError {
    /// Stop the whole operation at the first failure. (default)
    #[default]
    Abort,
    /// Log the failure, report it to the progress callback and move on.
    SkipAndContinue,
}

impl std::str::FromStr for OnItemError {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "abort" => Ok(Self::Abort),
            "skip" | "skip_and_continue" => Ok(Self::SkipAndContinue),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown item error policy '{other}' (expected 'abort' or 'skip')"
            ))),
        }
    }
}

/// Command line of the external HEIC/HEIF converter.
///
/// `args` may reference [`INPUT_PLACEHOLDER`] and [`OUTPUT_PLACEHOLDER`];
/// the converter must write a PNG (or any format the `image` crate reads)
/// to the output path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeicConverter {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for HeicConverter {
    fn default() -> Self {
        Self {
            program: "heif-convert".into(),
            args: vec![INPUT_PLACEHOLDER.into(), OUTPUT_PLACEHOLDER.into()],
        }
    }
}

impl HeicConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command template such as
    /// `"magick {input} {output}"`.
    pub fn from_template(template: &str) -> Result<Self, PipelineError> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            PipelineError::InvalidConfig("HEIC converter command is empty".into())
        })?;
        let converter = Self::new(program, parts.collect());
        converter.validate()?;
        Ok(converter)
    }

    /// Arguments with both placeholders substituted.
    pub fn render_args(&self, input: &std::path::Path, output: &std::path::Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| {
                a.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.program.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "HEIC converter program must not be empty".into(),
            ));
        }
        let has = |p: &str| self.args.iter().any(|a| a.contains(p));
        if !has(INPUT_PLACEHOLDER) || !has(OUTPUT_PLACEHOLDER) {
            return Err(PipelineError::InvalidConfig(format!(
                "HEIC converter arguments must contain both {INPUT_PLACEHOLDER} and {OUTPUT_PLACEHOLDER}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.on_item_error, OnItemError::Abort);
        assert!(c.allow_pdfium_download);
        assert!(c.pdfium_library_path.is_none());
        assert_eq!(c.heic_converter.program, "heif-convert");
    }

    #[test]
    fn builder_sets_fields() {
        let c = PipelineConfig::builder()
            .on_item_error(OnItemError::SkipAndContinue)
            .pdfium_library_path("/opt/pdfium/libpdfium.so")
            .allow_pdfium_download(false)
            .build()
            .unwrap();
        assert_eq!(c.on_item_error, OnItemError::SkipAndContinue);
        assert!(!c.allow_pdfium_download);
        assert_eq!(
            c.pdfium_library_path.as_deref(),
            Some(Path::new("/opt/pdfium/libpdfium.so"))
        );
    }

    #[test]
    fn builder_rejects_converter_without_placeholders() {
        let err = PipelineConfig::builder()
            .heic_converter(HeicConverter::new("magick", vec!["in.heic".into()]))
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn template_parsing_and_substitution() {
        let conv = HeicConverter::from_template("magick {input} -quality 100 {output}").unwrap();
        assert_eq!(conv.program, "magick");
        let args = conv.render_args(Path::new("/a/b.heic"), Path::new("/tmp/x.png"));
        assert_eq!(args, vec!["/a/b.heic", "-quality", "100", "/tmp/x.png"]);
    }

    #[test]
    fn empty_template_is_rejected() {
        assert!(HeicConverter::from_template("   ").is_err());
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("abort".parse::<OnItemError>().unwrap(), OnItemError::Abort);
        assert_eq!(
            "Skip-And-Continue".parse::<OnItemError>().unwrap(),
            OnItemError::SkipAndContinue
        );
        assert_eq!("skip".parse::<OnItemError>().unwrap(), OnItemError::SkipAndContinue);
        assert!("retry".parse::<OnItemError>().is_err());
    }

    #[test]
    fn policy_serde_names() {
        let json = serde_json::to_string(&OnItemError::SkipAndContinue).unwrap();
        assert_eq!(json, "\"skip_and_continue\"");
    }

    #[test]
    fn debug_hides_callback() {
        let c = PipelineConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn PipelineProgressCallback>"));
    }
}
