//! In-process raster backend built on the `image` crate.
//!
//! This is the preferred backend: no process spawn, no scratch files, and
//! deterministic codecs. It is also the most restrictive one: it handles
//! the common raster formats only and refuses arbitrary rotation angles, so
//! requests needing either fall through to the next backend in the registry.

use std::fs::File;
use std::io::{BufReader, Cursor};

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Luma};

use crate::error::TransformError;
use crate::iiif::{Mirror, Quality, Rotation};

use super::backend::{Capabilities, ImageBackend, TransformTask};

/// Default JPEG encode quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Luminance cutoff for the bitonal quality filter.
const BITONAL_THRESHOLD: u8 = 128;

/// Media types the `image` crate decodes and encodes here.
const RASTER_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/tiff",
    "image/webp",
];

/// Map a media type to the `image` crate's format enum.
fn image_format(media_type: &str) -> Option<ImageFormat> {
    match media_type {
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/gif" => Some(ImageFormat::Gif),
        "image/tiff" => Some(ImageFormat::Tiff),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

// =============================================================================
// Raster Backend
// =============================================================================

/// Pure-Rust backend over the `image` crate.
pub struct RasterBackend {
    capabilities: Capabilities,
    jpeg_quality: u8,
}

impl RasterBackend {
    /// Create a backend with the default JPEG quality.
    pub fn new() -> Self {
        Self::with_jpeg_quality(DEFAULT_JPEG_QUALITY)
    }

    /// Create a backend with a specific JPEG encode quality (clamped to
    /// 1-100).
    pub fn with_jpeg_quality(jpeg_quality: u8) -> Self {
        Self {
            capabilities: Capabilities {
                inputs: RASTER_MEDIA_TYPES.to_vec(),
                outputs: RASTER_MEDIA_TYPES.to_vec(),
                arbitrary_rotation: false,
            },
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    fn failure(&self, task: &TransformTask, message: impl Into<String>) -> TransformError {
        TransformError::BackendFailure {
            backend: self.name(),
            path: task.source_path.display().to_string(),
            message: message.into(),
        }
    }

    fn decode(&self, task: &TransformTask) -> Result<DynamicImage, TransformError> {
        let format = image_format(task.source_media_type)
            .ok_or_else(|| self.failure(task, format!("cannot decode {}", task.source_media_type)))?;

        let file = File::open(&task.source_path).map_err(|e| TransformError::Io {
            path: task.source_path.display().to_string(),
            message: e.to_string(),
        })?;

        ImageReader::with_format(BufReader::new(file), format)
            .decode()
            .map_err(|e| self.failure(task, e.to_string()))
    }

    fn encode(&self, task: &TransformTask, img: &DynamicImage) -> Result<Bytes, TransformError> {
        let format = image_format(task.output_media_type)
            .ok_or_else(|| self.failure(task, format!("cannot encode {}", task.output_media_type)))?;

        let mut buffer = Vec::new();
        if format == ImageFormat::Jpeg {
            // JPEG has no alpha channel; flatten before encoding
            let flat;
            let img = if img.color().has_alpha() {
                flat = DynamicImage::ImageRgb8(img.to_rgb8());
                &flat
            } else {
                img
            };
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality);
            encoder
                .encode_image(img)
                .map_err(|e| self.failure(task, e.to_string()))?;
        } else {
            img.write_to(&mut Cursor::new(&mut buffer), format)
                .map_err(|e| self.failure(task, e.to_string()))?;
        }

        if buffer.is_empty() {
            return Err(TransformError::EmptyOutput {
                backend: self.name(),
                path: task.source_path.display().to_string(),
            });
        }

        Ok(Bytes::from(buffer))
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RasterBackend {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn transform(&self, task: &TransformTask) -> Result<Bytes, TransformError> {
        let plan = task.plan;
        let mut img = self.decode(task)?;

        // Crop. A plan that reaches outside the decoded image means the
        // source record and the file disagree; refuse rather than clamp.
        if plan.source_x + plan.source_width > img.width()
            || plan.source_y + plan.source_height > img.height()
        {
            return Err(self.failure(
                task,
                format!(
                    "crop {}x{}+{}+{} exceeds decoded image {}x{}",
                    plan.source_width,
                    plan.source_height,
                    plan.source_x,
                    plan.source_y,
                    img.width(),
                    img.height()
                ),
            ));
        }
        if !plan.is_identity_crop(img.width(), img.height()) {
            img = img.crop_imm(plan.source_x, plan.source_y, plan.source_width, plan.source_height);
        }

        // Resample
        if !plan.is_identity_scale() {
            img = img.resize_exact(plan.dest_width, plan.dest_height, FilterType::Lanczos3);
        }

        // Mirror
        img = match task.mirror {
            Mirror::Default => img,
            Mirror::Horizontal => img.fliph(),
            Mirror::Vertical => img.flipv(),
            Mirror::Both => img.fliph().flipv(),
        };

        // Rotate
        img = match task.rotation {
            Rotation::None => img,
            Rotation::Quarter(90) => img.rotate90(),
            Rotation::Quarter(180) => img.rotate180(),
            Rotation::Quarter(270) => img.rotate270(),
            Rotation::Quarter(other) => {
                return Err(self.failure(task, format!("unexpected quarter rotation {other}")));
            }
            Rotation::Arbitrary(_) => {
                // Filtered out by capabilities; refuse if reached anyway
                return Err(self.failure(task, "arbitrary rotation is not supported"));
            }
        };

        // Quality filter
        img = match task.quality {
            Quality::Default | Quality::Color => img,
            Quality::Gray => DynamicImage::ImageLuma8(img.to_luma8()),
            Quality::Bitonal => {
                let mut luma = img.to_luma8();
                for pixel in luma.pixels_mut() {
                    *pixel = if pixel.0[0] < BITONAL_THRESHOLD {
                        Luma([0])
                    } else {
                        Luma([255])
                    };
                }
                DynamicImage::ImageLuma8(luma)
            }
        };

        self.encode(task, &img)
    }
}

// =============================================================================
// Tests
// =============================================================================
