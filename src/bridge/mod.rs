//! Method-call bridge between a host application and the operations.
//!
//! A host sends a [`MethodCall`] (method name plus a JSON map of
//! arguments) and gets exactly one [`MethodResponse`] back: a result, a
//! `{code, message}` error, or "not implemented" for unknown methods.
//!
//! ```text
//! host ──MethodCall──▶ BridgeHandle ──mpsc──▶ server task ──▶ PdfCombinerPlugin
//!      ◀─MethodResponse────────────── oneshot ◀──────────────────┘
//! ```
//!
//! Arguments are validated in full ([`args`]) before any file is touched.

pub mod args;
pub mod plugin;
pub mod server;

pub use plugin::PdfCombinerPlugin;
pub use server::{serve_json_lines, spawn_bridge, BridgeHandle};

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// The single reply to a [`MethodCall`].
///
/// Serialised with a `status` tag:
/// `{"status":"success","result":…}`,
/// `{"status":"error","code":…,"message":…}` or
/// `{"status":"not_implemented","method":…}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented { method: String },
}

impl MethodResponse {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<&PipelineError> for MethodResponse {
    fn from(e: &PipelineError) -> Self {
        Self::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

/// Methods the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    MergePdfs,
    ImagesToPdf,
    PdfToImages,
    PlatformVersion,
}

impl Method {
    /// Resolve a method name, including the legacy plugin names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "mergePdfs" | "mergeMultiplePDF" => Some(Self::MergePdfs),
            "imagesToPdf" | "createPDFFromMultipleImage" => Some(Self::ImagesToPdf),
            "pdfToImages" | "createImageFromPDF" => Some(Self::PdfToImages),
            "getPlatformVersion" => Some(Self::PlatformVersion),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MergePdfs => "mergePdfs",
            Self::ImagesToPdf => "imagesToPdf",
            Self::PdfToImages => "pdfToImages",
            Self::PlatformVersion => "getPlatformVersion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_names_resolve() {
        assert_eq!(Method::parse("mergeMultiplePDF"), Some(Method::MergePdfs));
        assert_eq!(
            Method::parse("createPDFFromMultipleImage"),
            Some(Method::ImagesToPdf)
        );
        assert_eq!(Method::parse("createImageFromPDF"), Some(Method::PdfToImages));
        assert_eq!(Method::parse("pdfToImages").map(|m| m.name()), Some("pdfToImages"));
        assert_eq!(Method::parse("rotatePdf"), None);
    }

    #[test]
    fn response_wire_format() {
        let ok = serde_json::to_value(MethodResponse::success("/out/merged.pdf")).unwrap();
        assert_eq!(ok, json!({"status": "success", "result": "/out/merged.pdf"}));

        let err = PipelineError::InvalidArguments("missing 'paths'".into());
        let wire = serde_json::to_value(MethodResponse::from(&err)).unwrap();
        assert_eq!(wire["status"], "error");
        assert_eq!(wire["code"], "invalid_arguments");

        let ni = serde_json::to_value(MethodResponse::NotImplemented {
            method: "rotatePdf".into(),
        })
        .unwrap();
        assert_eq!(ni, json!({"status": "not_implemented", "method": "rotatePdf"}));
    }

    #[test]
    fn call_without_arguments_parses() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"getPlatformVersion"}"#).unwrap();
        assert_eq!(call.arguments, Value::Null);
    }
}
