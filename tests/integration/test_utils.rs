//! Shared fixtures for integration tests.
//!
//! Builds a temporary media tree holding:
//!
//! - `sample.jpg` - a 400x300 gradient original
//! - `fullsize/sample.jpg` (200x150) and `thumbnail/sample.jpg` (100x75)
//! - `zoom.jpg` - a 512x512 original with a complete Zoomify pyramid
//! - `deep.jpg` - a 512x512 original with the finest Deep Zoom level tiles
//!   (tile size 256, overlap 1)

use std::path::Path;

use axum::Router;
use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::TempDir;

use iiif_streamer::pyramid::TileLocator;
use iiif_streamer::service::ImageService;
use iiif_streamer::store::FsMediaStore;
use iiif_streamer::transform::{
    BackendRegistry, RasterBackend, TransformEngine, TransformPlanner,
};
use iiif_streamer::{create_router, RouterConfig};

/// A gradient image whose pixels encode their position, so crops are
/// distinguishable.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn write_jpeg(path: &Path, img: &DynamicImage) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    img.save_with_format(path, ImageFormat::Jpeg).unwrap();
}

/// Write a complete 2-tier Zoomify pyramid for a 512x512 image.
fn write_zoomify_pyramid(root: &Path, base: &str, img: &DynamicImage) {
    let zdata = root.join(format!("{base}_zdata"));
    let group = zdata.join("TileGroup0");
    std::fs::create_dir_all(&group).unwrap();

    std::fs::write(
        zdata.join("ImageProperties.xml"),
        r#"<IMAGE_PROPERTIES WIDTH="512" HEIGHT="512" NUMTILES="5" NUMIMAGES="1" VERSION="1.8" TILESIZE="256" />"#,
    )
    .unwrap();

    // Tier 0: the whole image in one 256x256 tile
    let coarse = img.resize_exact(256, 256, image::imageops::FilterType::Lanczos3);
    write_jpeg(&group.join("0-0-0.jpg"), &coarse);

    // Tier 1: four full-resolution 256x256 tiles
    for row in 0..2u32 {
        for column in 0..2u32 {
            let tile = img.crop_imm(column * 256, row * 256, 256, 256);
            write_jpeg(&group.join(format!("1-{column}-{row}.jpg")), &tile);
        }
    }
}

/// Write the finest Deep Zoom level for a 512x512 image (tile size 256,
/// overlap 1), enough for single-tile requests against level 9.
fn write_deepzoom_tiles(root: &Path, base: &str, img: &DynamicImage) {
    std::fs::write(
        root.join(format!("{base}.dzi")),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008" TileSize="256" Overlap="1" Format="jpg">
  <Size Width="512" Height="512" />
</Image>"#,
    )
    .unwrap();

    // Finest level number is ceil(log2(512)) = 9
    let level_dir = root.join(format!("{base}_files")).join("9");
    std::fs::create_dir_all(&level_dir).unwrap();

    // Interior edges carry a 1px overlap border, so every tile of this
    // 2x2 level is 257x257
    for row in 0..2u32 {
        for column in 0..2u32 {
            let x = if column == 0 { 0 } else { column * 256 - 1 };
            let y = if row == 0 { 0 } else { row * 256 - 1 };
            let right = ((column + 1) * 256 + 1).min(512);
            let bottom = ((row + 1) * 256 + 1).min(512);
            let tile = img.crop_imm(x, y, right - x, bottom - y);
            write_jpeg(&level_dir.join(format!("{column}_{row}.jpg")), &tile);
        }
    }
}

/// Build the full fixture tree and a router over it.
///
/// The returned `TempDir` must outlive the router.
pub fn test_media_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let sample = gradient(400, 300);
    write_jpeg(&root.join("sample.jpg"), &sample);
    write_jpeg(
        &root.join("fullsize/sample.jpg"),
        &sample.resize_exact(200, 150, image::imageops::FilterType::Lanczos3),
    );
    write_jpeg(
        &root.join("thumbnail/sample.jpg"),
        &sample.resize_exact(100, 75, image::imageops::FilterType::Lanczos3),
    );

    let zoom = gradient(512, 512);
    write_jpeg(&root.join("zoom.jpg"), &zoom);
    write_zoomify_pyramid(root, "zoom", &zoom);

    let deep = gradient(512, 512);
    write_jpeg(&root.join("deep.jpg"), &deep);
    write_deepzoom_tiles(root, "deep", &deep);

    dir
}

/// Build a router over a media tree with the in-process backend only.
pub fn build_router(root: &Path) -> Router {
    let store = FsMediaStore::new(root);
    let planner = TransformPlanner::new(TileLocator::new(root));
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(RasterBackend::new()));
    let service = ImageService::new(store, planner, TransformEngine::new(registry));

    create_router(service, RouterConfig::new().with_tracing(false))
}

/// Check JPEG SOI magic bytes.
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}
