//! Configuration management for the IIIF image server.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `IIIF_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `IIIF_HOST` - Server bind address (default: 0.0.0.0)
//! - `IIIF_PORT` - Server port (default: 3000)
//! - `IIIF_MEDIA_ROOT` - Directory holding original files (required)
//! - `IIIF_TILE_ROOT` - Directory holding tile pyramids (default: media root)
//! - `IIIF_DERIVATIVE_DIRS` - Ordered derivative subdirectories (default: fullsize,thumbnail)
//! - `IIIF_MAX_DYNAMIC_BYTES` - Dynamic-transform source ceiling (default: 64MB)
//! - `IIIF_JPEG_QUALITY` - JPEG encode quality (default: 80)
//! - `IIIF_CONVERT_PATH` - ImageMagick convert executable (default: convert)
//! - `IIIF_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)

use std::path::PathBuf;

use clap::Parser;

use crate::transform::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DYNAMIC_BYTES};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default ImageMagick executable name.
pub const DEFAULT_CONVERT_PATH: &str = "convert";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// IIIF Streamer - an IIIF Image API 2.x image server.
///
/// Serves regions, sizes and rotations of local images, reusing pre-built
/// DeepZoom/Zoomify pyramids and derivative renditions whenever an existing
/// artifact already satisfies the request exactly.
#[derive(Parser, Debug, Clone)]
#[command(name = "iiif-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IIIF_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IIIF_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory holding the original media files.
    #[arg(long, env = "IIIF_MEDIA_ROOT")]
    pub media_root: PathBuf,

    /// Directory holding tile pyramids (descriptors and tile directories).
    ///
    /// Defaults to the media root when not set.
    #[arg(long, env = "IIIF_TILE_ROOT")]
    pub tile_root: Option<PathBuf>,

    /// Ordered derivative subdirectories to probe (comma-separated).
    #[arg(
        long,
        env = "IIIF_DERIVATIVE_DIRS",
        value_delimiter = ',',
        default_values_t = vec!["fullsize".to_string(), "thumbnail".to_string()]
    )]
    pub derivative_dirs: Vec<String>,

    // =========================================================================
    // Transform Configuration
    // =========================================================================
    /// Maximum original file size in bytes for dynamic transforms.
    ///
    /// Originals above this size are only served through pre-built artifacts
    /// (derivatives, tiles); dynamic requests against them fail.
    #[arg(long, default_value_t = DEFAULT_MAX_DYNAMIC_BYTES, env = "IIIF_MAX_DYNAMIC_BYTES")]
    pub max_dynamic_bytes: u64,

    /// JPEG encode quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "IIIF_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Path of the ImageMagick convert executable for the CLI fallback
    /// backend.
    #[arg(long, default_value = DEFAULT_CONVERT_PATH, env = "IIIF_CONVERT_PATH")]
    pub convert_path: String,

    /// Disable the ImageMagick fallback backend even when available.
    #[arg(long, default_value_t = false)]
    pub no_magick: bool,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "IIIF_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.media_root.as_os_str().is_empty() {
            return Err("media_root is required. Set --media-root or IIIF_MEDIA_ROOT".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.max_dynamic_bytes == 0 {
            return Err("max_dynamic_bytes must be greater than 0".to_string());
        }

        if self.derivative_dirs.iter().any(|dir| dir.is_empty()) {
            return Err("derivative_dirs must not contain empty names".to_string());
        }

        if self.convert_path.is_empty() && !self.no_magick {
            return Err(
                "convert_path must not be empty. Set --convert-path or pass --no-magick"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The effective tile root (falls back to the media root).
    pub fn effective_tile_root(&self) -> PathBuf {
        self.tile_root
            .clone()
            .unwrap_or_else(|| self.media_root.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
