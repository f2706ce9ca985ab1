//! # pdfium-auto
//!
//! Find a [PDFium](https://pdfium.googlesource.com/pdfium/) shared library
//! for `pdfium-render`, downloading and caching the platform build from
//! [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//! when nothing usable is installed.
//!
//! Lookup order:
//!
//! 1. `PDFIUM_LIB_PATH`, when it names an existing file.
//! 2. The per-version cache directory ([`pdfium_cache_dir`]).
//! 3. Download + extract into the cache ([`ensure_pdfium_library`] only).
//!
//! ```rust,no_run
//! use pdfium_auto::{bind_pdfium_from_path, ensure_pdfium_library};
//!
//! let path = ensure_pdfium_library(None).expect("download failed");
//! let pdfium = bind_pdfium_from_path(&path).expect("bind failed");
//! ```
//!
//! `PDFIUM_AUTO_CACHE_DIR` overrides the cache root.

mod fetch;
mod platform;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;

pub use platform::Platform;

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

/// Explicit library path override.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Cache root override.
pub const CACHE_DIR_ENV: &str = "PDFIUM_AUTO_CACHE_DIR";

/// Errors returned by pdfium-auto operations.
#[derive(Error, Debug)]
pub enum PdfiumAutoError {
    /// The current OS/architecture combination is not published upstream.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create or write inside the cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// gzip/tar extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// `pdfium-render` could not load the library.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// Per-version cache directory for the library.
///
/// `{cache}/pdf-combiner/pdfium-{VERSION}/`, where `{cache}` is
/// `PDFIUM_AUTO_CACHE_DIR` if set, else the OS cache directory.
pub fn pdfium_cache_dir() -> PathBuf {
    cache_dir_under(std::env::var_os(CACHE_DIR_ENV).map(PathBuf::from))
}

fn cache_dir_under(root: Option<PathBuf>) -> PathBuf {
    let versioned = format!("pdfium-{PDFIUM_VERSION}");
    if let Some(root) = root {
        return root.join(versioned);
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("pdf-combiner")
        .join(versioned)
}

/// Path of an already available library, without touching the network.
pub fn cached_pdfium_path() -> Option<PathBuf> {
    if let Some(path) = RESOLVED.get() {
        return Some(path.clone());
    }
    if let Some(path) = env_override() {
        return Some(path);
    }
    let platform = Platform::current().ok()?;
    let path = pdfium_cache_dir().join(platform.lib_name);
    path.exists().then_some(path)
}

/// Returns a usable library path, downloading it into the cache if needed.
///
/// `on_progress` receives `(bytes_downloaded, total_bytes)` during the
/// download. The result is memoised for the rest of the process.
pub fn ensure_pdfium_library(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, PdfiumAutoError> {
    if let Some(path) = cached_pdfium_path() {
        let _ = RESOLVED.set(path.clone());
        return Ok(path);
    }

    let platform = Platform::current()?;
    let cache_dir = pdfium_cache_dir();
    std::fs::create_dir_all(&cache_dir).map_err(PdfiumAutoError::CacheDir)?;

    let url = fetch::release_url(PDFIUM_VERSION, platform.archive_name);
    let archive = fetch::download(&url, on_progress)?;
    let lib_path = cache_dir.join(platform.lib_name);
    fetch::unpack_member(&archive, platform.member, &lib_path)?;

    let _ = RESOLVED.set(lib_path.clone());
    Ok(lib_path)
}

/// Binds to the library at `path`.
pub fn bind_pdfium_from_path(path: &Path) -> Result<Pdfium, PdfiumAutoError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| PdfiumAutoError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Download if necessary, then bind.
pub fn bind_pdfium(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Pdfium, PdfiumAutoError> {
    let path = ensure_pdfium_library(on_progress)?;
    bind_pdfium_from_path(&path)
}

fn env_override() -> Option<PathBuf> {
    existing(std::env::var_os(LIB_PATH_ENV).map(PathBuf::from))
}

fn existing(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_is_versioned() {
        let dir = cache_dir_under(None);
        assert_eq!(dir, cache_dir_under(None));
        assert!(dir.to_string_lossy().ends_with(&format!("pdfium-{PDFIUM_VERSION}")));
    }

    #[test]
    fn cache_dir_override() {
        let dir = cache_dir_under(Some("/tmp/pdf_combiner_cache_override".into()));
        assert_eq!(
            dir,
            PathBuf::from("/tmp/pdf_combiner_cache_override").join(format!("pdfium-{PDFIUM_VERSION}"))
        );
    }

    #[test]
    fn missing_override_file_is_ignored() {
        assert!(existing(Some("/definitely/not/libpdfium.so".into())).is_none());
        assert!(existing(None).is_none());

        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            existing(Some(file.path().to_path_buf())).as_deref(),
            Some(file.path())
        );
    }

    #[test]
    fn bind_reports_the_path() {
        let err = bind_pdfium_from_path(Path::new("/definitely/not/libpdfium.so")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/libpdfium.so"));
    }
}
