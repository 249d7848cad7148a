//! Media storage abstraction.
//!
//! The engine does not own file storage: it only needs to resolve an
//! identifier to a source record (path, media type, pixel dimensions) and to
//! probe for pre-generated derivatives. The [`MediaStore`] trait is that
//! seam; [`FsMediaStore`] is the local-filesystem implementation the server
//! runs with. The trait is synchronous on purpose: the whole transform core
//! is a blocking computation with no suspension points.
//!
//! # Layout
//!
//! ```text
//! <media_root>/<identifier>              original files
//! <media_root>/<dir>/<base>.jpg          derivatives, one subdirectory per
//!                                        configured derivative kind
//! ```
//!
//! A derivative is a fixed-resolution JPEG rendition of the whole original
//! (e.g., "fullsize", "thumbnail") and is unrelated to tile pyramids.

use std::fs;
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::debug;

use crate::error::StoreError;
use crate::iiif::{media_type_for_extension, SourceImage};

// =============================================================================
// Derivative
// =============================================================================

/// A pre-generated rendition of an original image.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivative {
    /// Configured derivative kind (e.g., "fullsize")
    pub name: String,

    /// Path of the derivative file
    pub path: PathBuf,

    /// Media type of the derivative file
    pub media_type: &'static str,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

// =============================================================================
// MediaStore trait
// =============================================================================

/// Identifier resolution and derivative lookup.
///
/// Implementations are shared read-only across requests; resolution must not
/// mutate any state.
pub trait MediaStore: Send + Sync {
    /// Resolve an identifier to its source record.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no such file exists, `InvalidIdentifier`
    /// when the identifier is unsafe, `Unreadable` when the file exists but
    /// its pixel dimensions cannot be determined.
    fn resolve(&self, identifier: &str) -> Result<SourceImage, StoreError>;

    /// Probe for derivatives of an identifier, in configured preference
    /// order. Missing derivatives are simply absent from the result.
    fn derivatives(&self, identifier: &str) -> Vec<Derivative>;

    /// The storage-relative base name (extension stripped) used to address
    /// pyramids and derivatives belonging to an identifier.
    fn base_name(&self, identifier: &str) -> String {
        match identifier.rsplit_once('.') {
            Some((base, _ext)) => base.to_string(),
            None => identifier.to_string(),
        }
    }
}

// =============================================================================
// Filesystem implementation
// =============================================================================

/// Default derivative probe order.
pub const DEFAULT_DERIVATIVE_DIRS: &[&str] = &["fullsize", "thumbnail"];

/// [`MediaStore`] over a local directory tree.
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    media_root: PathBuf,
    derivative_dirs: Vec<String>,
}

impl FsMediaStore {
    /// Create a store with the default derivative roster.
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self::with_derivatives(
            media_root,
            DEFAULT_DERIVATIVE_DIRS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Create a store with an explicit, ordered derivative roster.
    pub fn with_derivatives(media_root: impl Into<PathBuf>, derivative_dirs: Vec<String>) -> Self {
        Self {
            media_root: media_root.into(),
            derivative_dirs,
        }
    }

    /// The configured media root.
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Validate an identifier and turn it into a path under the media root.
    ///
    /// Identifiers may contain subdirectories but must not escape the root.
    fn identifier_path(&self, identifier: &str) -> Result<PathBuf, StoreError> {
        if identifier.is_empty()
            || identifier.starts_with('/')
            || identifier
                .split('/')
                .any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(StoreError::InvalidIdentifier {
                identifier: identifier.to_string(),
            });
        }
        Ok(self.media_root.join(identifier))
    }
}

impl MediaStore for FsMediaStore {
    fn resolve(&self, identifier: &str) -> Result<SourceImage, StoreError> {
        let filepath = self.identifier_path(identifier)?;
        if !filepath.is_file() {
            return Err(StoreError::NotFound {
                identifier: identifier.to_string(),
            });
        }

        let extension = filepath
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let media_type =
            media_type_for_extension(extension).ok_or_else(|| StoreError::Unreadable {
                path: filepath.display().to_string(),
                message: format!("unrecognized extension {extension:?}"),
            })?;

        let (width, height) = read_dimensions(&filepath)?;

        Ok(SourceImage {
            filepath,
            media_type,
            width,
            height,
        })
    }

    fn derivatives(&self, identifier: &str) -> Vec<Derivative> {
        let base = self.base_name(identifier);
        let mut found = Vec::new();

        for dir in &self.derivative_dirs {
            let path = self.media_root.join(dir).join(format!("{base}.jpg"));
            if !path.is_file() {
                continue;
            }
            match read_dimensions(&path) {
                Ok((width, height)) => found.push(Derivative {
                    name: dir.clone(),
                    path,
                    media_type: "image/jpeg",
                    width,
                    height,
                }),
                Err(e) => {
                    // A broken derivative is skipped, not fatal
                    debug!(path = %path.display(), "Skipping unreadable derivative: {e}");
                }
            }
        }

        found
    }
}

/// Read pixel dimensions without decoding the full image.
fn read_dimensions(path: &Path) -> Result<(u32, u32), StoreError> {
    let reader = ImageReader::open(path).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let reader = reader.with_guessed_format().map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    reader.into_dimensions().map_err(|e| StoreError::Unreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Size of a file in bytes, for the dynamic-transform guard.
pub fn file_size(path: &Path) -> Result<u64, StoreError> {
    fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

// =============================================================================
// Tests
// =============================================================================
