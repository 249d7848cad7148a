//! IIIF Image Information (`info.json`) document builder.
//!
//! The info document advertises what a client may ask for: the source
//! dimensions, the pre-generated sizes worth requesting directly, the tile
//! grid when a pyramid exists, and the compliance profile.

use serde::Serialize;

use crate::pyramid::scale_factors;
use crate::service::ImageDescription;

/// JSON-LD context for Image API 2 responses.
pub const IIIF_CONTEXT: &str = "http://iiif.io/api/image/2/context.json";

/// Protocol identifier required by the Image API.
pub const IIIF_PROTOCOL: &str = "http://iiif.io/api/image";

/// Compliance profile advertised by this server.
pub const IIIF_LEVEL2_PROFILE: &str = "http://iiif.io/api/image/2/level2.json";

// =============================================================================
// Document shape
// =============================================================================

/// One advertised size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeEntry {
    pub width: u32,
    pub height: u32,
}

/// One advertised tile grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileEntry {
    /// Tile edge length in pixels
    pub width: u32,

    /// Power-of-two downsampling ratios, finest (1) first
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
}

/// The Image Information document.
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    #[serde(rename = "@context")]
    pub context: &'static str,

    #[serde(rename = "@id")]
    pub id: String,

    pub protocol: &'static str,

    pub width: u32,

    pub height: u32,

    pub sizes: Vec<SizeEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<TileEntry>>,

    pub profile: Vec<&'static str>,
}

// =============================================================================
// Builder
// =============================================================================

/// Build the info document for one described identifier.
///
/// `id` is the canonical URI of the image endpoint (base URL plus encoded
/// identifier). Sizes list the derivatives plus the full resolution,
/// ascending and de-duplicated. The tile section appears only for pyramids
/// with at least two useful scale factors, since a one-level pyramid offers a
/// client nothing over plain region requests.
pub fn build_info(id: String, description: &ImageDescription) -> ImageInfo {
    let source = &description.source;

    let mut sizes: Vec<SizeEntry> = description
        .derivatives
        .iter()
        .map(|derivative| SizeEntry {
            width: derivative.width,
            height: derivative.height,
        })
        .collect();
    sizes.push(SizeEntry {
        width: source.width,
        height: source.height,
    });
    sizes.sort_by_key(|entry| (entry.width, entry.height));
    sizes.dedup();

    let tiles = description.pyramid.as_ref().and_then(|info| {
        let factors = scale_factors(info.width, info.height, info.size);
        if factors.len() < 2 {
            return None;
        }
        Some(vec![TileEntry {
            width: info.size,
            scale_factors: factors,
        }])
    });

    ImageInfo {
        context: IIIF_CONTEXT,
        id,
        protocol: IIIF_PROTOCOL,
        width: source.width,
        height: source.height,
        sizes,
        tiles,
        profile: vec![IIIF_LEVEL2_PROFILE],
    }
}

// =============================================================================
// Tests
// =============================================================================
