//! Release asset names for the platforms pdfium-binaries publishes.

use crate::PdfiumAutoError;

/// Where the library lives for one OS/architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Release asset, e.g. `pdfium-linux-x64.tgz`.
    pub archive_name: &'static str,
    /// Path of the library inside the archive.
    pub member: &'static str,
    /// File name written to the cache directory.
    pub lib_name: &'static str,
}

const MAC_LIB: (&str, &str) = ("lib/libpdfium.dylib", "libpdfium.dylib");
const LINUX_LIB: (&str, &str) = ("lib/libpdfium.so", "libpdfium.so");
const WINDOWS_LIB: (&str, &str) = ("bin/pdfium.dll", "pdfium.dll");

impl Platform {
    /// Look up the platform record for an `(os, arch)` pair as reported by
    /// `std::env::consts`.
    pub fn lookup(os: &str, arch: &str) -> Result<Self, PdfiumAutoError> {
        let (archive_name, (member, lib_name)) = match (os, arch) {
            ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", MAC_LIB),
            ("macos", "x86_64") => ("pdfium-mac-x64.tgz", MAC_LIB),
            ("linux", "x86_64") => ("pdfium-linux-x64.tgz", LINUX_LIB),
            ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", LINUX_LIB),
            ("windows", "x86_64") => ("pdfium-win-x64.tgz", WINDOWS_LIB),
            ("windows", "aarch64") => ("pdfium-win-arm64.tgz", WINDOWS_LIB),
            ("windows", "x86") => ("pdfium-win-x86.tgz", WINDOWS_LIB),
            _ => {
                return Err(PdfiumAutoError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
        Ok(Self {
            archive_name,
            member,
            lib_name,
        })
    }

    /// The platform this binary was compiled for.
    pub fn current() -> Result<Self, PdfiumAutoError> {
        Self::lookup(std::env::consts::OS, std::env::consts::ARCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_x64_uses_shared_object() {
        let p = Platform::lookup("linux", "x86_64").unwrap();
        assert_eq!(p.archive_name, "pdfium-linux-x64.tgz");
        assert_eq!(p.member, "lib/libpdfium.so");
        assert_eq!(p.lib_name, "libpdfium.so");
    }

    #[test]
    fn windows_library_sits_in_bin() {
        let p = Platform::lookup("windows", "x86").unwrap();
        assert!(p.member.starts_with("bin/"));
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = Platform::lookup("haiku", "riscv64").unwrap_err();
        assert!(err.to_string().contains("haiku/riscv64"));
    }
}
