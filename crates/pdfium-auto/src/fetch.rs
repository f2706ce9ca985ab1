//! Download and unpack a pdfium-binaries release archive.

use crate::PdfiumAutoError;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tar::Archive;

/// GitHub release base URL.
const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

const CHUNK: usize = 64 * 1024;

/// Release asset URL for a given chromium build and archive name.
pub(crate) fn release_url(version: &str, archive_name: &str) -> String {
    format!("{BASE_URL}/chromium%2F{version}/{archive_name}")
}

/// Read `url` fully into memory, reporting `(downloaded, total)` after
/// every chunk.
pub(crate) fn download(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, PdfiumAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-auto/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| PdfiumAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| PdfiumAutoError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(PdfiumAutoError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; CHUNK];
    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                body.extend_from_slice(&chunk[..n]);
                if let Some(cb) = on_progress {
                    cb(body.len() as u64, total);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PdfiumAutoError::Download(format!("read error: {e}"))),
        }
    }
    Ok(body)
}

/// Unpack the single `member` of a gzipped tarball to `dest`.
///
/// The member is first written next to `dest` with a `.partial` suffix and
/// renamed into place, so an interrupted run never leaves a truncated
/// library where the cache lookup would find it.
pub(crate) fn unpack_member(
    archive: &[u8],
    member: &str,
    dest: &Path,
) -> Result<(), PdfiumAutoError> {
    let mut tarball = Archive::new(GzDecoder::new(archive));
    let entries = tarball
        .entries()
        .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        let matches = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .map_err(|e| PdfiumAutoError::Extract(e.to_string()))?;
        if !matches {
            continue;
        }

        let partial = dest.with_extension("partial");
        entry
            .unpack(&partial)
            .map_err(|e| PdfiumAutoError::Extract(format!("unpack failed: {e}")))?;
        std::fs::rename(&partial, dest).map_err(PdfiumAutoError::CacheDir)?;
        return Ok(());
    }

    Err(PdfiumAutoError::Extract(format!(
        "'{member}' not found in archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn release_url_escapes_the_tag_slash() {
        let url = release_url("7690", "pdfium-linux-x64.tgz");
        assert!(url.ends_with("/chromium%2F7690/pdfium-linux-x64.tgz"));
    }

    #[test]
    fn unpacks_only_the_requested_member() {
        let archive = tarball(&[
            ("include/fpdfview.h", b"header"),
            ("lib/libpdfium.so", b"\x7fELF-library"),
        ]);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");

        unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"\x7fELF-library");
        assert!(!dest.with_extension("partial").exists());
    }

    #[test]
    fn missing_member_is_an_extract_error() {
        let archive = tarball(&[("README", b"nothing here")]);
        let dir = tempfile::tempdir().unwrap();
        let err = unpack_member(&archive, "lib/libpdfium.so", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, PdfiumAutoError::Extract(_)));
    }
}
