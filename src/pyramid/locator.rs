//! Pyramid discovery.
//!
//! Given the storage-relative base name of a source image (extension
//! stripped), the locator probes the tile root for the known descriptor
//! locations, in order:
//!
//! 1. `<base>.dzi` - Deep Zoom XML
//! 2. `<base>.js` - Deep Zoom JSON-P
//! 3. `<base>_zdata/ImageProperties.xml` - Zoomify
//!
//! Most sources have no pyramid at all; that is the expected common case and
//! returns `None` without logging a failure. A descriptor that exists but
//! does not parse is treated the same way (the next probe still runs), so a
//! corrupt tile set degrades to dynamic transforms instead of erroring.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::deepzoom;
use super::info::{TileInfo, TileType};
use super::zoomify;

/// Locates and normalizes pre-built tile pyramids under a tile root.
///
/// Construction is cheap; the locator holds nothing but the root path and is
/// shared read-only across requests.
#[derive(Debug, Clone)]
pub struct TileLocator {
    tile_root: PathBuf,
}

impl TileLocator {
    /// Create a locator over the given tile root directory.
    pub fn new(tile_root: impl Into<PathBuf>) -> Self {
        Self {
            tile_root: tile_root.into(),
        }
    }

    /// The configured tile root.
    pub fn tile_root(&self) -> &Path {
        &self.tile_root
    }

    /// Probe for a pyramid belonging to `base` (a storage-relative name with
    /// the extension already stripped).
    ///
    /// Returns `None` when no descriptor exists or none parses.
    pub fn locate(&self, base: &str) -> Option<TileInfo> {
        if let Some(info) = self.probe_deepzoom_xml(base) {
            return Some(info);
        }
        if let Some(info) = self.probe_deepzoom_jsonp(base) {
            return Some(info);
        }
        self.probe_zoomify(base)
    }

    fn probe_deepzoom_xml(&self, base: &str) -> Option<TileInfo> {
        let metadata_path = self.tile_root.join(format!("{base}.dzi"));
        let document = read_descriptor(&metadata_path)?;
        match deepzoom::parse_dzi_xml(&document) {
            Ok(descriptor) => Some(self.deepzoom_info(base, metadata_path, descriptor)),
            Err(e) => {
                debug!(path = %metadata_path.display(), "Ignoring unparseable DZI descriptor: {e}");
                None
            }
        }
    }

    fn probe_deepzoom_jsonp(&self, base: &str) -> Option<TileInfo> {
        let metadata_path = self.tile_root.join(format!("{base}.js"));
        let document = read_descriptor(&metadata_path)?;
        match deepzoom::parse_dzi_jsonp(&document) {
            Ok(descriptor) => Some(self.deepzoom_info(base, metadata_path, descriptor)),
            Err(e) => {
                debug!(path = %metadata_path.display(), "Ignoring unparseable JSON-P descriptor: {e}");
                None
            }
        }
    }

    fn probe_zoomify(&self, base: &str) -> Option<TileInfo> {
        let path_base = self.tile_root.join(format!("{base}_zdata"));
        let metadata_path = path_base.join("ImageProperties.xml");
        let document = read_descriptor(&metadata_path)?;
        match zoomify::parse_image_properties(&document) {
            Ok(descriptor) => Some(TileInfo {
                tile_type: TileType::Zoomify,
                size: descriptor.tile_size,
                overlap: 0,
                total: Some(descriptor.num_tiles),
                width: descriptor.width,
                height: descriptor.height,
                // Zoomify tiles are always JPEG
                format: "jpg".to_string(),
                media_path: base.to_string(),
                path_base,
                metadata_path,
            }),
            Err(e) => {
                debug!(path = %metadata_path.display(), "Ignoring unparseable Zoomify descriptor: {e}");
                None
            }
        }
    }

    fn deepzoom_info(
        &self,
        base: &str,
        metadata_path: PathBuf,
        descriptor: deepzoom::DziDescriptor,
    ) -> TileInfo {
        TileInfo {
            tile_type: TileType::DeepZoom,
            size: descriptor.tile_size,
            overlap: descriptor.overlap,
            total: None,
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
            media_path: base.to_string(),
            path_base: self.tile_root.join(format!("{base}_files")),
            metadata_path,
        }
    }
}

/// Read a descriptor file, quietly returning `None` when it does not exist.
fn read_descriptor(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(document) => Some(document),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            debug!(path = %path.display(), "Failed reading descriptor: {e}");
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DZI_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008" TileSize="254" Overlap="1" Format="jpg">
  <Size Width="4000" Height="3000" />
</Image>"#;

    const DZI_JSONP: &str = r#"cb({"Image":{"Format":"png","Overlap":0,"TileSize":256,"Size":{"Width":1024,"Height":768}}})"#;

    const ZOOMIFY: &str = r#"<IMAGE_PROPERTIES WIDTH="1000" HEIGHT="1000" NUMTILES="21" NUMIMAGES="1" VERSION="1.8" TILESIZE="256" />"#;

    #[test]
    fn test_locate_nothing() {
        let dir = TempDir::new().unwrap();
        let locator = TileLocator::new(dir.path());
        assert!(locator.locate("sample").is_none());
    }

    #[test]
    fn test_locate_deepzoom_xml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sample.dzi"), DZI_XML).unwrap();

        let locator = TileLocator::new(dir.path());
        let info = locator.locate("sample").unwrap();

        assert_eq!(info.tile_type, TileType::DeepZoom);
        assert_eq!(info.size, 254);
        assert_eq!(info.overlap, 1);
        assert_eq!(info.width, 4000);
        assert_eq!(info.height, 3000);
        assert_eq!(info.format, "jpg");
        assert_eq!(info.path_base, dir.path().join("sample_files"));
        assert_eq!(info.media_path, "sample");
    }

    #[test]
    fn test_locate_deepzoom_jsonp() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sample.js"), DZI_JSONP).unwrap();

        let locator = TileLocator::new(dir.path());
        let info = locator.locate("sample").unwrap();

        assert_eq!(info.tile_type, TileType::DeepZoom);
        assert_eq!(info.size, 256);
        assert_eq!(info.overlap, 0);
        assert_eq!(info.format, "png");
    }

    #[test]
    fn test_locate_zoomify() {
        let dir = TempDir::new().unwrap();
        let zdata = dir.path().join("sample_zdata");
        std::fs::create_dir(&zdata).unwrap();
        std::fs::write(zdata.join("ImageProperties.xml"), ZOOMIFY).unwrap();

        let locator = TileLocator::new(dir.path());
        let info = locator.locate("sample").unwrap();

        assert_eq!(info.tile_type, TileType::Zoomify);
        assert_eq!(info.size, 256);
        assert_eq!(info.total, Some(21));
        assert_eq!(info.format, "jpg");
        assert_eq!(info.path_base, zdata);
    }

    #[test]
    fn test_probe_order_prefers_deepzoom() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sample.dzi"), DZI_XML).unwrap();
        let zdata = dir.path().join("sample_zdata");
        std::fs::create_dir(&zdata).unwrap();
        std::fs::write(zdata.join("ImageProperties.xml"), ZOOMIFY).unwrap();

        let locator = TileLocator::new(dir.path());
        assert_eq!(locator.locate("sample").unwrap().tile_type, TileType::DeepZoom);
    }

    #[test]
    fn test_corrupt_descriptor_falls_through() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sample.dzi"), "not xml at all").unwrap();
        let zdata = dir.path().join("sample_zdata");
        std::fs::create_dir(&zdata).unwrap();
        std::fs::write(zdata.join("ImageProperties.xml"), ZOOMIFY).unwrap();

        // The broken DZI is skipped, the Zoomify descriptor still resolves
        let locator = TileLocator::new(dir.path());
        assert_eq!(locator.locate("sample").unwrap().tile_type, TileType::Zoomify);
    }

    #[test]
    fn test_corrupt_only_descriptor_is_no_pyramid() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("sample.dzi"), "<Image garbage").unwrap();

        let locator = TileLocator::new(dir.path());
        assert!(locator.locate("sample").is_none());
    }
}
