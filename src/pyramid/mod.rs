//! Pre-built tile pyramid support.
//!
//! A pyramid is a multi-resolution decomposition of an image into fixed-size
//! tiles, generated ahead of time by an external tiler. This module consumes
//! the two common on-disk dialects (it never builds pyramids):
//!
//! - [`deepzoom`] - Deep Zoom descriptors (`.dzi` XML and `.js` JSON-P)
//! - [`zoomify`] - Zoomify `ImageProperties.xml` and tile-group arithmetic
//! - [`locator`] - ordered descriptor probing into a normalized [`TileInfo`]
//! - [`address`] - exact region/size to level/column/row cell resolution
//!
//! Everything here is advisory: absence of a pyramid, a corrupt descriptor,
//! or a region no cell covers exactly all mean "serve dynamically", never an
//! error to the client.

use thiserror::Error;

pub mod address;
pub mod deepzoom;
pub mod info;
pub mod locator;
mod xml;
pub mod zoomify;

pub use address::{
    level_count, max_deepzoom_level, resolve_cell, scale_factors, CellAddress,
};
pub use deepzoom::{parse_dzi_jsonp, parse_dzi_xml, DziDescriptor};
pub use info::{TileInfo, TileType};
pub use locator::TileLocator;
pub use zoomify::{parse_image_properties, tier_count, tier_grid, tile_group, ZoomifyDescriptor};

/// Errors raised while parsing a pyramid descriptor.
///
/// These never cross the module boundary as failures: the locator logs them
/// at debug level and reports "no pyramid", because a broken tile set must
/// degrade to dynamic transforms silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The document is not the expected descriptor shape at all
    #[error("Malformed descriptor: {message}")]
    Malformed { message: String },

    /// A required field is absent
    #[error("Missing descriptor field: {field}")]
    MissingField { field: &'static str },

    /// A field is present but its value is unusable
    #[error("Invalid descriptor field: {field}")]
    InvalidField { field: &'static str },
}
