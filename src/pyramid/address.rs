//! Mapping a requested region and size onto a single pyramid cell.
//!
//! The resolver answers one question: does some pre-built tile cover this
//! request *exactly*? If yes, the planner serves that tile (plus a light
//! residual transform) instead of decoding the original. If no, the answer is
//! simply `None`, never an error, and the planner falls back to a dynamic
//! transform.
//!
//! # Level model
//!
//! Internally levels are indexed by their power-of-two scale factor: index
//! `k` means one cell covers `tile_size * 2^k` source pixels per axis. The
//! number of addressable levels stops where the whole image fits a single
//! tile; coarser levels are not addressable. The public [`CellAddress`]
//! carries the dialect's own numbering: DeepZoom counts levels up from a
//! 1x1-pixel level 0 (so the finest level is `ceil(log2(max_dim))`), Zoomify
//! numbers tiers up from the coarsest addressable one.
//!
//! Exactness is two-fold: the region must equal the cell's source-space
//! rectangle (short last cells included), and the requested size must equal
//! the cell's native pixel dimensions under the request's size semantics.
//! The single-cell case (region is the whole image, which fits one tile at
//! the coarsest level) additionally accepts smaller destinations, since
//! downscaling a whole-image tile is still a crop-free light transform.

use crate::iiif::{Rect, Size};

use super::info::{TileInfo, TileType};
use super::zoomify;

// =============================================================================
// CellAddress
// =============================================================================

/// A resolved position in a tile pyramid.
///
/// Ephemeral: produced by [`resolve_cell`], consumed immediately by the
/// planner to build the tile path and the residual transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    /// Level number in the pyramid's own dialect convention
    pub level: u32,

    /// Cell column at that level
    pub column: u32,

    /// Cell row at that level
    pub row: u32,

    /// Tile edge length in pixels
    pub size: u32,

    /// Native pixel width of this cell's content (without overlap borders)
    pub width: u32,

    /// Native pixel height of this cell's content (without overlap borders)
    pub height: u32,

    /// Tile group bucket (Zoomify only)
    pub tile_group: Option<u32>,

    /// The cell touches the left edge of the image
    pub is_first_column: bool,

    /// The cell touches the top edge of the image
    pub is_first_row: bool,

    /// The cell touches the right edge (may be narrower than a full tile)
    pub is_last_column: bool,

    /// The cell touches the bottom edge (may be shorter than a full tile)
    pub is_last_row: bool,

    /// The cell covers the entire image
    pub is_single_cell: bool,
}

// =============================================================================
// Level arithmetic
// =============================================================================

/// Number of addressable levels: how often the cell coverage doubles from one
/// tile's worth of pixels until it spans the whole image.
pub fn level_count(width: u32, height: u32, tile_size: u32) -> u32 {
    let mut levels = 1;
    let mut covered = u64::from(tile_size);
    let max_dim = u64::from(width.max(height));
    while covered < max_dim {
        covered *= 2;
        levels += 1;
    }
    levels
}

/// The power-of-two scale factors of the addressable levels, finest first.
pub fn scale_factors(width: u32, height: u32, tile_size: u32) -> Vec<u32> {
    (0..level_count(width, height, tile_size))
        .map(|k| 1u32 << k)
        .collect()
}

/// The finest Deep Zoom level number: `ceil(log2(max(width, height)))`.
///
/// Deep Zoom level 0 is a single 1x1-pixel-equivalent tile, so the full
/// resolution level sits at this index.
pub fn max_deepzoom_level(width: u32, height: u32) -> u32 {
    let max_dim = f64::from(width.max(height));
    if max_dim <= 1.0 {
        return 0;
    }
    max_dim.log2().ceil() as u32
}

/// Ceiling division of a pixel extent by a scale factor.
fn scaled_extent(extent: u32, scale: u64) -> u32 {
    u64::from(extent).div_ceil(scale) as u32
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve the request's region and size to the single pyramid cell that
/// covers them exactly, if one exists.
///
/// `region` must already be in absolute pixels (the parser guarantees this).
/// `None` means no cell matches; the caller falls back to a dynamic
/// transform.
pub fn resolve_cell(info: &TileInfo, region: Rect, size: Size) -> Option<CellAddress> {
    let (width, height) = (info.width, info.height);
    if width == 0 || height == 0 || info.size == 0 {
        return None;
    }
    // The parser clamps regions, but the pyramid may describe different
    // dimensions than the source record; never address past its bounds.
    if u64::from(region.x) + u64::from(region.width) > u64::from(width)
        || u64::from(region.y) + u64::from(region.height) > u64::from(height)
    {
        return None;
    }

    let is_first_column = region.x == 0;
    let is_first_row = region.y == 0;
    let is_last_column = region.x + region.width == width;
    let is_last_row = region.y + region.height == height;

    let levels = level_count(width, height, info.size);
    let (dest_width, dest_height) = size.resolve(region.width, region.height)?;

    // Whole image in one request: the coarsest level holds it in one cell
    if is_first_column && is_first_row && is_last_column && is_last_row {
        let scale = 1u64 << (levels - 1);
        let cell_width = scaled_extent(width, scale);
        let cell_height = scaled_extent(height, scale);
        if dest_width > cell_width || dest_height > cell_height {
            // The tile cannot serve this without upscaling
            return None;
        }
        let mut cell = make_cell(info, levels, levels - 1, 0, 0, cell_width, cell_height);
        cell.is_single_cell = true;
        return Some(cell);
    }

    // Scan coarsest to finest, accepting the first exact geometric match
    for k in (0..levels).rev() {
        let scale = 1u64 << k;
        let tile_factor = scale * u64::from(info.size);

        if u64::from(region.x) % tile_factor != 0 || u64::from(region.y) % tile_factor != 0 {
            continue;
        }
        let column = (u64::from(region.x) / tile_factor) as u32;
        let row = (u64::from(region.y) / tile_factor) as u32;
        let columns = u64::from(width).div_ceil(tile_factor) as u32;
        let rows = u64::from(height).div_ceil(tile_factor) as u32;

        // Last cells are whatever is left over, every other cell is a full
        // tile's coverage
        let expected_width = if column == columns - 1 {
            width - (u64::from(column) * tile_factor) as u32
        } else {
            tile_factor as u32
        };
        let expected_height = if row == rows - 1 {
            height - (u64::from(row) * tile_factor) as u32
        } else {
            tile_factor as u32
        };
        if region.width != expected_width || region.height != expected_height {
            continue;
        }

        // The cell's native pixel dimensions at this level
        let cell_width = scaled_extent(region.width, scale);
        let cell_height = scaled_extent(region.height, scale);

        // The size must address this cell's own resolution, matched under
        // the request's size semantics (a width-only size checks width only)
        let size_matches = match size {
            Size::Width(w) => w == cell_width,
            Size::Height(h) => h == cell_height,
            Size::Full => scale == 1,
            _ => dest_width == cell_width && dest_height == cell_height,
        };
        if !size_matches {
            continue;
        }

        return Some(make_cell(info, levels, k, column, row, cell_width, cell_height));
    }

    None
}

/// Assemble a cell address in the pyramid's own level-numbering convention.
///
/// Edge flags are derived from the cell geometry; the single-cell flag is
/// set by the caller for the whole-image short circuit.
fn make_cell(
    info: &TileInfo,
    levels: u32,
    k: u32,
    column: u32,
    row: u32,
    cell_width: u32,
    cell_height: u32,
) -> CellAddress {
    // Internal tier: 0 = coarsest addressable, levels-1 = finest
    let tier = (levels - 1) - k;

    let (level, tile_group) = match info.tile_type {
        TileType::DeepZoom => (max_deepzoom_level(info.width, info.height) - k, None),
        TileType::Zoomify => (
            tier,
            Some(zoomify::tile_group(
                info.width, info.height, info.size, tier, column, row,
            )),
        ),
    };

    let tile_factor = u64::from(info.size) << k;
    let columns = u64::from(info.width).div_ceil(tile_factor) as u32;
    let rows = u64::from(info.height).div_ceil(tile_factor) as u32;

    CellAddress {
        level,
        column,
        row,
        size: info.size,
        width: cell_width,
        height: cell_height,
        tile_group,
        is_first_column: column == 0,
        is_first_row: row == 0,
        is_last_column: column == columns - 1,
        is_last_row: row == rows - 1,
        is_single_cell: false,
    }
}

// =============================================================================
// Tests
// =============================================================================
