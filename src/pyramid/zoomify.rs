//! Zoomify descriptor parsing and tile-group arithmetic.
//!
//! A Zoomify pyramid is a `<base>_zdata` directory holding an
//! `ImageProperties.xml` descriptor and `TileGroup{n}` subdirectories. Tiles
//! have no overlap and are always JPEG. Tier 0 is the coarsest level (the
//! whole image fits one tile); each following tier doubles the resolution.
//!
//! Tile groups keep per-directory file counts bounded: tiles are numbered in
//! a cumulative level-major, row-major order across the whole pyramid and
//! bucketed into groups of `tile_size` tiles each.

use super::xml;
use super::DescriptorError;

/// Fields of a Zoomify `ImageProperties.xml` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomifyDescriptor {
    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Total tile count across all tiers, as declared by the descriptor
    pub num_tiles: u64,

    /// Full-resolution width
    pub width: u32,

    /// Full-resolution height
    pub height: u32,
}

/// Parse an `ImageProperties.xml` document.
///
/// The canonical shape is a single self-closing element:
/// `<IMAGE_PROPERTIES WIDTH="..." HEIGHT="..." NUMTILES="..." NUMIMAGES="1"
/// VERSION="1.8" TILESIZE="..." />`
pub fn parse_image_properties(document: &str) -> Result<ZoomifyDescriptor, DescriptorError> {
    if !document.contains("IMAGE_PROPERTIES") {
        return Err(DescriptorError::Malformed {
            message: "missing IMAGE_PROPERTIES element".to_string(),
        });
    }

    let width = xml::attribute_u32(document, "WIDTH")
        .ok_or(DescriptorError::MissingField { field: "WIDTH" })?;
    let height = xml::attribute_u32(document, "HEIGHT")
        .ok_or(DescriptorError::MissingField { field: "HEIGHT" })?;
    let tile_size = xml::attribute_u32(document, "TILESIZE")
        .ok_or(DescriptorError::MissingField { field: "TILESIZE" })?;
    let num_tiles = xml::attribute(document, "NUMTILES")
        .and_then(|v| v.trim().parse().ok())
        .ok_or(DescriptorError::MissingField { field: "NUMTILES" })?;

    if tile_size == 0 {
        return Err(DescriptorError::InvalidField { field: "TILESIZE" });
    }
    if width == 0 || height == 0 {
        return Err(DescriptorError::InvalidField { field: "WIDTH" });
    }

    Ok(ZoomifyDescriptor {
        tile_size,
        num_tiles,
        width,
        height,
    })
}

// =============================================================================
// Tier arithmetic
// =============================================================================

/// Number of tiers in a pyramid, halving down from full resolution until the
/// whole image fits a single tile.
pub fn tier_count(width: u32, height: u32, tile_size: u32) -> u32 {
    let mut tiers = 1;
    let mut edge = u64::from(tile_size);
    let max_dim = u64::from(width.max(height));
    while edge < max_dim {
        edge *= 2;
        tiers += 1;
    }
    tiers
}

/// Tile grid (columns, rows) of one tier.
///
/// Tier 0 is the coarsest. At tier `t` of `n`, one tile covers
/// `tile_size * 2^(n-1-t)` source pixels per axis.
pub fn tier_grid(width: u32, height: u32, tile_size: u32, tier: u32) -> (u32, u32) {
    let tiers = tier_count(width, height, tile_size);
    debug_assert!(tier < tiers);
    let covered = u64::from(tile_size) << (tiers - 1 - tier);
    let columns = u64::from(width).div_ceil(covered) as u32;
    let rows = u64::from(height).div_ceil(covered) as u32;
    (columns, rows)
}

/// The `TileGroup` bucket holding one tile.
///
/// The absolute tile index is cumulative across tiers (coarsest first) in
/// row-major order within each tier; groups hold `tile_size` tiles each.
pub fn tile_group(width: u32, height: u32, tile_size: u32, tier: u32, column: u32, row: u32) -> u32 {
    let mut index = 0u64;
    for earlier in 0..tier {
        let (columns, rows) = tier_grid(width, height, tile_size, earlier);
        index += u64::from(columns) * u64::from(rows);
    }
    let (columns, _) = tier_grid(width, height, tile_size, tier);
    index += u64::from(row) * u64::from(columns) + u64::from(column);
    (index / u64::from(tile_size)) as u32
}

// =============================================================================
// Tests
// =============================================================================
