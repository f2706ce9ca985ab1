//! Dispatch of bridge calls to the operations.

use super::{args, Method, MethodCall, MethodResponse};
use crate::config::PipelineConfig;
use crate::engine::PdfiumEngine;
use crate::error::PipelineError;
use crate::operations;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Answers [`MethodCall`]s.
///
/// The first PDF call pins a [`PdfiumEngine`] handle for the plugin's
/// lifetime, so PDFium is initialised once while the plugin is attached
/// and torn down when it is dropped.
pub struct PdfCombinerPlugin {
    config: PipelineConfig,
    engine: OnceLock<PdfiumEngine>,
}

impl PdfCombinerPlugin {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            engine: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle one call on the current thread. Never panics on bad input.
    pub fn handle(&self, call: &MethodCall) -> MethodResponse {
        let Some(method) = Method::parse(&call.method) else {
            debug!("Unknown method '{}'", call.method);
            return MethodResponse::NotImplemented {
                method: call.method.clone(),
            };
        };

        match self.dispatch(method, &call.arguments) {
            Ok(result) => MethodResponse::Success { result },
            Err(e) => {
                warn!("{} failed: {}", method.name(), e);
                MethodResponse::from(&e)
            }
        }
    }

    fn dispatch(&self, method: Method, arguments: &Value) -> Result<Value, PipelineError> {
        match method {
            Method::PlatformVersion => Ok(Value::String(platform_version())),
            Method::MergePdfs => {
                let request = args::merge_request(arguments)?;
                if !request.sources.is_empty() {
                    self.pin_engine()?;
                }
                let output = operations::merge_pdfs_blocking(&request, &self.config)?;
                Ok(path_value(&output.path))
            }
            Method::ImagesToPdf => {
                let request = args::images_request(arguments)?;
                if !request.sources.is_empty() {
                    self.pin_engine()?;
                }
                let output = operations::images_to_pdf_blocking(&request, &self.config)?;
                Ok(path_value(&output.path))
            }
            Method::PdfToImages => {
                let request = args::raster_request(arguments)?;
                self.pin_engine()?;
                let output = operations::pdf_to_images_blocking(&request, &self.config)?;
                Ok(Value::Array(output.paths.iter().map(|p| path_value(p)).collect()))
            }
        }
    }

    fn pin_engine(&self) -> Result<(), PipelineError> {
        if self.engine.get().is_none() {
            let engine = PdfiumEngine::acquire(&self.config)?;
            // A concurrent caller may have won; its handle is equivalent.
            let _ = self.engine.set(engine);
        }
        Ok(())
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

/// `"<os> <arch>"` of the running build, e.g. `"linux x86_64"`.
pub fn platform_version() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plugin() -> PdfCombinerPlugin {
        PdfCombinerPlugin::new(
            PipelineConfig::builder()
                .allow_pdfium_download(false)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let resp = plugin().handle(&MethodCall::new("rotatePdf", json!({})));
        assert_eq!(
            resp,
            MethodResponse::NotImplemented {
                method: "rotatePdf".into()
            }
        );
    }

    #[test]
    fn platform_version_needs_no_engine() {
        let resp = plugin().handle(&MethodCall::new("getPlatformVersion", Value::Null));
        match resp {
            MethodResponse::Success { result } => {
                assert_eq!(result, Value::String(platform_version()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_arguments_are_reported_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("merged.pdf");
        let resp = plugin().handle(&MethodCall::new(
            "mergePdfs",
            json!({ "outputDirPath": output.to_string_lossy() }),
        ));

        match resp {
            MethodResponse::Error { code, .. } => assert_eq!(code, "invalid_arguments"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn empty_path_list_is_empty_input() {
        let resp = plugin().handle(&MethodCall::new(
            "mergeMultiplePDF",
            json!({ "paths": [], "outputDirPath": "/tmp/never.pdf" }),
        ));
        match resp {
            MethodResponse::Error { code, .. } => assert_eq!(code, "empty_input"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
