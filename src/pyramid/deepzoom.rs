//! Deep Zoom descriptor parsing.
//!
//! Deep Zoom pyramids ship one of two descriptor flavors next to the tile
//! directory:
//!
//! - `<base>.dzi` - the XML descriptor
//! - `<base>.js` - a JSON-P wrapper around the same fields, as emitted by
//!   some tiling tools for same-origin viewers
//!
//! Both reduce to the same [`DziDescriptor`] fields. Deep Zoom is the only
//! dialect with a tile overlap border; its level numbering counts up from a
//! 1x1-pixel level 0, which the address resolver compensates for.

use serde_json::Value;

use super::xml;
use super::DescriptorError;

/// Fields shared by both Deep Zoom descriptor flavors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DziDescriptor {
    /// Tile edge length in pixels
    pub tile_size: u32,

    /// Overlap border in pixels on interior tile edges
    pub overlap: u32,

    /// Tile image format extension
    pub format: String,

    /// Full-resolution width
    pub width: u32,

    /// Full-resolution height
    pub height: u32,
}

/// Parse the XML descriptor flavor.
pub fn parse_dzi_xml(document: &str) -> Result<DziDescriptor, DescriptorError> {
    if !document.contains("<Image") {
        return Err(DescriptorError::Malformed {
            message: "missing <Image> element".to_string(),
        });
    }

    let tile_size = xml::attribute_u32(document, "TileSize")
        .ok_or(DescriptorError::MissingField { field: "TileSize" })?;
    let overlap = xml::attribute_u32(document, "Overlap")
        .ok_or(DescriptorError::MissingField { field: "Overlap" })?;
    let format = xml::attribute(document, "Format")
        .ok_or(DescriptorError::MissingField { field: "Format" })?;
    let width = xml::attribute_u32(document, "Width")
        .ok_or(DescriptorError::MissingField { field: "Width" })?;
    let height = xml::attribute_u32(document, "Height")
        .ok_or(DescriptorError::MissingField { field: "Height" })?;

    validate(DziDescriptor {
        tile_size,
        overlap,
        format,
        width,
        height,
    })
}

/// Parse the JSON-P descriptor flavor.
///
/// The payload is whatever sits between the outermost parentheses of the
/// callback invocation; field values may be JSON numbers or strings
/// depending on the producing tool, so both are accepted.
pub fn parse_dzi_jsonp(document: &str) -> Result<DziDescriptor, DescriptorError> {
    let start = document.find('(').ok_or_else(|| DescriptorError::Malformed {
        message: "not a JSON-P callback".to_string(),
    })?;
    let end = document.rfind(')').filter(|end| *end > start).ok_or_else(|| {
        DescriptorError::Malformed {
            message: "unterminated JSON-P callback".to_string(),
        }
    })?;

    let payload: Value =
        serde_json::from_str(document[start + 1..end].trim()).map_err(|e| {
            DescriptorError::Malformed {
                message: format!("invalid JSON payload: {e}"),
            }
        })?;

    let image = &payload["Image"];
    if image.is_null() {
        return Err(DescriptorError::MissingField { field: "Image" });
    }

    let tile_size = value_u32(&image["TileSize"])
        .ok_or(DescriptorError::MissingField { field: "TileSize" })?;
    let overlap = value_u32(&image["Overlap"])
        .ok_or(DescriptorError::MissingField { field: "Overlap" })?;
    let format = match &image["Format"] {
        Value::String(s) => s.clone(),
        _ => return Err(DescriptorError::MissingField { field: "Format" }),
    };
    let width = value_u32(&image["Size"]["Width"])
        .ok_or(DescriptorError::MissingField { field: "Width" })?;
    let height = value_u32(&image["Size"]["Height"])
        .ok_or(DescriptorError::MissingField { field: "Height" })?;

    validate(DziDescriptor {
        tile_size,
        overlap,
        format,
        width,
        height,
    })
}

/// Read a JSON value that may be a number or a numeric string.
fn value_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn validate(descriptor: DziDescriptor) -> Result<DziDescriptor, DescriptorError> {
    if descriptor.tile_size == 0 {
        return Err(DescriptorError::InvalidField { field: "TileSize" });
    }
    if descriptor.width == 0 || descriptor.height == 0 {
        return Err(DescriptorError::InvalidField { field: "Size" });
    }
    if descriptor.overlap >= descriptor.tile_size {
        return Err(DescriptorError::InvalidField { field: "Overlap" });
    }
    Ok(descriptor)
}

// =============================================================================
// Tests
// =============================================================================
