//! Normalized pyramid metadata.
//!
//! Both supported pyramid dialects (DeepZoom and Zoomify) are reduced to the
//! same [`TileInfo`] shape by the locator so the address resolver and the
//! planner never branch on descriptor syntax.

use std::path::PathBuf;

use super::address::CellAddress;

// =============================================================================
// TileType
// =============================================================================

/// The pyramid dialect a tile set was built with.
///
/// The two dialects differ in level numbering (DeepZoom counts from a 1x1
/// pixel level, Zoomify from the first level that fits one tile), in tile
/// file layout, and in whether tiles carry an overlap border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    /// Microsoft Deep Zoom: `<base>_files/{level}/{col}_{row}.{fmt}`
    DeepZoom,

    /// Zoomify: `<base>_zdata/TileGroup{n}/{level}-{col}-{row}.{fmt}`
    Zoomify,
}

impl TileType {
    /// Human-readable dialect name.
    pub const fn name(&self) -> &'static str {
        match self {
            TileType::DeepZoom => "deepzoom",
            TileType::Zoomify => "zoomify",
        }
    }
}

// =============================================================================
// TileInfo
// =============================================================================

/// Normalized metadata for one pre-built tile pyramid.
///
/// Built once per request from the on-disk descriptor and never mutated.
/// `width`/`height` are the dimensions of the referenced original image and
/// must match the source record before any cell is reused.
#[derive(Debug, Clone, PartialEq)]
pub struct TileInfo {
    /// Pyramid dialect
    pub tile_type: TileType,

    /// Tile edge length in pixels
    pub size: u32,

    /// Overlap border in pixels (DeepZoom only, 0 for Zoomify)
    pub overlap: u32,

    /// Total tile count across all levels (Zoomify descriptors only)
    pub total: Option<u64>,

    /// Width of the referenced original image
    pub width: u32,

    /// Height of the referenced original image
    pub height: u32,

    /// Tile image format extension (e.g., "jpg")
    pub format: String,

    /// Storage-relative base name of the source this pyramid was built from
    pub media_path: String,

    /// Directory containing the tile files
    pub path_base: PathBuf,

    /// Path of the descriptor this info was parsed from
    pub metadata_path: PathBuf,
}

impl TileInfo {
    /// Filesystem path of one tile, following the dialect's layout.
    ///
    /// For Zoomify the cell must carry its tile group.
    pub fn tile_path(&self, cell: &CellAddress) -> PathBuf {
        match self.tile_type {
            TileType::DeepZoom => self
                .path_base
                .join(cell.level.to_string())
                .join(format!("{}_{}.{}", cell.column, cell.row, self.format)),
            TileType::Zoomify => {
                let group = cell.tile_group.unwrap_or(0);
                self.path_base.join(format!("TileGroup{group}")).join(format!(
                    "{}-{}-{}.{}",
                    cell.level, cell.column, cell.row, self.format
                ))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
