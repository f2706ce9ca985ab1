//! Strict argument validation for bridge calls.
//!
//! Every required key must be present with exactly the expected JSON type.
//! Integers must be non-negative and fit in a `u32`. Anything else is
//! [`PipelineError::InvalidArguments`], raised before any I/O.

use crate::error::PipelineError;
use crate::model::{PngCompression, ResizePolicy, SourceFile};
use crate::operations::{ImagesToPdfRequest, MergeRequest, PdfToImagesRequest};
use serde_json::{Map, Value};

/// Borrowed view of an argument map.
pub struct Args<'a> {
    map: &'a Map<String, Value>,
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidArguments(msg.into())
}

impl<'a> Args<'a> {
    pub fn new(value: &'a Value) -> Result<Self, PipelineError> {
        value
            .as_object()
            .map(|map| Self { map })
            .ok_or_else(|| invalid("arguments must be a map"))
    }

    fn get(&self, key: &str) -> Result<&'a Value, PipelineError> {
        self.map
            .get(key)
            .ok_or_else(|| invalid(format!("missing '{key}'")))
    }

    pub fn string(&self, key: &str) -> Result<&'a str, PipelineError> {
        match self.get(key)? {
            Value::String(s) if !s.is_empty() => Ok(s),
            Value::String(_) => Err(invalid(format!("'{key}' must not be empty"))),
            _ => Err(invalid(format!("'{key}' must be a string"))),
        }
    }

    pub fn string_list(&self, key: &str) -> Result<Vec<String>, PipelineError> {
        let items = self
            .get(key)?
            .as_array()
            .ok_or_else(|| invalid(format!("'{key}' must be a list of strings")))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) if !s.is_empty() => Ok(s.clone()),
                _ => Err(invalid(format!("'{key}[{i}]' must be a non-empty string"))),
            })
            .collect()
    }

    pub fn uint(&self, key: &str) -> Result<u32, PipelineError> {
        self.get(key)?
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid(format!("'{key}' must be a non-negative 32-bit integer")))
    }

    pub fn boolean(&self, key: &str) -> Result<bool, PipelineError> {
        self.get(key)?
            .as_bool()
            .ok_or_else(|| invalid(format!("'{key}' must be a boolean")))
    }
}

fn sources(list: Vec<String>) -> Vec<SourceFile> {
    list.into_iter().map(SourceFile::from).collect()
}

/// `mergePdfs { paths, outputDirPath }`
pub fn merge_request(arguments: &Value) -> Result<MergeRequest, PipelineError> {
    let args = Args::new(arguments)?;
    Ok(MergeRequest {
        sources: sources(args.string_list("paths")?),
        output: args.string("outputDirPath")?.into(),
    })
}

/// `imagesToPdf { paths, outputDirPath, width, height, keepAspectRatio }`
pub fn images_request(arguments: &Value) -> Result<ImagesToPdfRequest, PipelineError> {
    let args = Args::new(arguments)?;
    Ok(ImagesToPdfRequest {
        sources: sources(args.string_list("paths")?),
        output: args.string("outputDirPath")?.into(),
        resize: ResizePolicy::new(
            args.uint("width")?,
            args.uint("height")?,
            args.boolean("keepAspectRatio")?,
        ),
    })
}

/// `pdfToImages { path, outputDirPath, width, height, compression, createOneImage }`
pub fn raster_request(arguments: &Value) -> Result<PdfToImagesRequest, PipelineError> {
    let args = Args::new(arguments)?;
    let compression = args.uint("compression")?;
    if compression > PngCompression::MAX_INPUT {
        return Err(invalid(format!(
            "'compression' must be between 0 and {}, got {compression}",
            PngCompression::MAX_INPUT
        )));
    }
    Ok(PdfToImagesRequest {
        source: SourceFile::from(args.string("path")?),
        output_dir: args.string("outputDirPath")?.into(),
        size: ResizePolicy::new(args.uint("width")?, args.uint("height")?, false),
        compression: PngCompression::from_level(compression),
        combine: args.boolean("createOneImage")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_arguments() {
        let req = merge_request(&json!({
            "paths": ["/a.pdf", "/b.pdf"],
            "outputDirPath": "/out/merged.pdf"
        }))
        .unwrap();
        assert_eq!(req.sources.len(), 2);
        assert_eq!(req.output, std::path::PathBuf::from("/out/merged.pdf"));
    }

    #[test]
    fn missing_paths_is_invalid() {
        let err = merge_request(&json!({"outputDirPath": "/out/merged.pdf"})).unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
        assert!(err.to_string().contains("paths"));
    }

    #[test]
    fn non_map_arguments_are_invalid() {
        assert!(merge_request(&json!(["/a.pdf"])).is_err());
        assert!(merge_request(&Value::Null).is_err());
    }

    #[test]
    fn wrong_types_are_invalid() {
        let base = json!({
            "paths": ["/a.png"],
            "outputDirPath": "/out.pdf",
            "width": 50,
            "height": 0,
            "keepAspectRatio": true
        });
        assert!(images_request(&base).is_ok());

        for (key, bad) in [
            ("width", json!("50")),
            ("width", json!(-1)),
            ("height", json!(1.5)),
            ("height", json!(u64::from(u32::MAX) + 1)),
            ("keepAspectRatio", json!(1)),
            ("paths", json!("/a.png")),
            ("paths", json!([1, 2])),
            ("outputDirPath", json!("")),
        ] {
            let mut args = base.clone();
            args[key] = bad.clone();
            let err = images_request(&args).unwrap_err();
            assert_eq!(err.code(), "invalid_arguments", "{key} = {bad}");
        }
    }

    #[test]
    fn empty_path_list_is_left_to_the_pipeline() {
        let req = merge_request(&json!({"paths": [], "outputDirPath": "/o.pdf"})).unwrap();
        assert!(req.sources.is_empty());
    }

    #[test]
    fn raster_arguments() {
        let req = raster_request(&json!({
            "path": "/doc.pdf",
            "outputDirPath": "/out",
            "width": 0,
            "height": 300,
            "compression": 90,
            "createOneImage": true
        }))
        .unwrap();
        assert_eq!(req.size, ResizePolicy::new(0, 300, false));
        assert_eq!(req.compression.level(), 9);
        assert!(req.combine);
    }

    #[test]
    fn compression_over_100_is_invalid() {
        let err = raster_request(&json!({
            "path": "/doc.pdf",
            "outputDirPath": "/out",
            "width": 0,
            "height": 0,
            "compression": 101,
            "createOneImage": false
        }))
        .unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
    }
}
