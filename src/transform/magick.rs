//! External ImageMagick backend.
//!
//! The last rung of the fallback chain: shells out to the `convert` tool.
//! Slow (process spawn, scratch file) but the most capable backend: it
//! handles the formats the in-process codecs do not (JPEG 2000, PDF) and is
//! the only backend supporting arbitrary rotation angles.
//!
//! Output goes to a scratch file that is removed on every exit path,
//! including failures, so aborted transforms never leave artifacts behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use bytes::Bytes;
use tracing::debug;

use crate::error::TransformError;
use crate::iiif::{extension_for_media_type, Mirror, Quality, Rotation};

use super::backend::{Capabilities, ImageBackend, TransformTask};
use super::raster::DEFAULT_JPEG_QUALITY;

/// Media types the CLI tool converts between.
const MAGICK_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/tiff",
    "image/webp",
    "image/jp2",
    "application/pdf",
];

/// Background fill for arbitrary-angle rotation.
const ROTATE_BACKGROUND: &str = "white";

// =============================================================================
// Magick Backend
// =============================================================================

/// Backend shelling out to ImageMagick's `convert`.
pub struct MagickBackend {
    convert_path: PathBuf,
    capabilities: Capabilities,
    jpeg_quality: u8,
}

impl MagickBackend {
    /// Create a backend using the given `convert` executable.
    pub fn new(convert_path: impl Into<PathBuf>) -> Self {
        Self {
            convert_path: convert_path.into(),
            capabilities: Capabilities {
                inputs: MAGICK_MEDIA_TYPES.to_vec(),
                outputs: MAGICK_MEDIA_TYPES.to_vec(),
                arbitrary_rotation: true,
            },
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Probe for a working `convert` executable.
    ///
    /// Runs `convert -version` once; an unavailable tool returns `None` and
    /// the backend simply stays out of the registry.
    pub fn detect(convert_path: impl Into<PathBuf>) -> Option<Self> {
        let convert_path = convert_path.into();
        match Command::new(&convert_path).arg("-version").output() {
            Ok(output) if output.status.success() => Some(Self::new(convert_path)),
            Ok(output) => {
                debug!(
                    path = %convert_path.display(),
                    status = %output.status,
                    "convert probe failed"
                );
                None
            }
            Err(e) => {
                debug!(path = %convert_path.display(), "convert not available: {e}");
                None
            }
        }
    }

    /// Argument list for one task, writing to `output_path`.
    ///
    /// Operators follow the fixed pipeline order: crop, resample, mirror,
    /// rotate, quality filter; the output path's extension selects the
    /// encoder.
    fn build_args(&self, task: &TransformTask, output_path: &Path) -> Vec<String> {
        let plan = task.plan;
        let mut args = Vec::new();

        // PDF sources render their first page only
        if task.source_media_type == "application/pdf" {
            args.push(format!("{}[0]", task.source_path.display()));
        } else {
            args.push(task.source_path.display().to_string());
        }

        args.push("-crop".to_string());
        args.push(format!(
            "{}x{}+{}+{}",
            plan.source_width, plan.source_height, plan.source_x, plan.source_y
        ));
        args.push("+repage".to_string());

        if !plan.is_identity_scale() {
            args.push("-resize".to_string());
            // The ! suffix forces exact dimensions without preserving aspect
            args.push(format!("{}x{}!", plan.dest_width, plan.dest_height));
        }

        match task.mirror {
            Mirror::Default => {}
            Mirror::Horizontal => args.push("-flop".to_string()),
            Mirror::Vertical => args.push("-flip".to_string()),
            Mirror::Both => {
                args.push("-flop".to_string());
                args.push("-flip".to_string());
            }
        }

        match task.rotation {
            Rotation::None => {}
            Rotation::Quarter(degrees) => {
                args.push("-rotate".to_string());
                args.push(degrees.to_string());
            }
            Rotation::Arbitrary(degrees) => {
                args.push("-background".to_string());
                args.push(ROTATE_BACKGROUND.to_string());
                args.push("-rotate".to_string());
                args.push(degrees.to_string());
            }
        }

        match task.quality {
            Quality::Default | Quality::Color => {}
            Quality::Gray => {
                args.push("-colorspace".to_string());
                args.push("Gray".to_string());
            }
            Quality::Bitonal => {
                args.push("-colorspace".to_string());
                args.push("Gray".to_string());
                args.push("-threshold".to_string());
                args.push("50%".to_string());
            }
        }

        if task.output_media_type == "image/jpeg" {
            args.push("-quality".to_string());
            args.push(self.jpeg_quality.to_string());
        }

        args.push(output_path.display().to_string());
        args
    }
}

impl ImageBackend for MagickBackend {
    fn name(&self) -> &'static str {
        "magick"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn transform(&self, task: &TransformTask) -> Result<Bytes, TransformError> {
        let failure = |message: String| TransformError::BackendFailure {
            backend: "magick",
            path: task.source_path.display().to_string(),
            message,
        };

        let extension = extension_for_media_type(task.output_media_type)
            .ok_or_else(|| failure(format!("no extension for {}", task.output_media_type)))?;

        // Scratch output file; removed when `scratch` drops, on every path
        let scratch = tempfile::Builder::new()
            .prefix("iiif-transform-")
            .suffix(&format!(".{extension}"))
            .tempfile()
            .map_err(|e| failure(format!("cannot create scratch file: {e}")))?;

        let args = self.build_args(task, scratch.path());
        let output = Command::new(&self.convert_path)
            .args(&args)
            .output()
            .map_err(|e| failure(format!("failed to run convert: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failure(format!(
                "convert exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let bytes = fs::read(scratch.path()).map_err(|e| TransformError::Io {
            path: scratch.path().display().to_string(),
            message: e.to_string(),
        })?;

        if bytes.is_empty() {
            return Err(TransformError::EmptyOutput {
                backend: "magick",
                path: task.source_path.display().to_string(),
            });
        }

        Ok(Bytes::from(bytes))
    }
}

// =============================================================================
// Tests
// =============================================================================
