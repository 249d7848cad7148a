//! Parser for the IIIF Image API 2.x request syntax.
//!
//! Turns the four path tokens (`region`, `size`, `rotation`, `quality`) and
//! the format extension into a validated [`TransformRequest`]. Parsing needs
//! the source's true pixel dimensions because percentage regions are resolved
//! to absolute pixels immediately: nothing downstream ever sees a relative
//! coordinate.
//!
//! # Permissiveness
//!
//! Following the published semantics, a region that extends past the source
//! is clamped to the source edge rather than rejected. Only tokens that are
//! syntactically malformed, or that reduce to an empty area after clamping,
//! fail with a [`ParseError`].

use crate::error::ParseError;

use super::request::{
    Mirror, Quality, Rect, Region, Rotation, Size, SourceImage, TransformRequest,
};

// =============================================================================
// Format mapping
// =============================================================================

/// Known format extensions and their canonical media types.
///
/// The first entry for a media type is its canonical extension.
const FORMAT_MAP: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("gif", "image/gif"),
    ("pdf", "application/pdf"),
    ("jp2", "image/jp2"),
    ("webp", "image/webp"),
];

/// Map a format extension to its canonical media type.
///
/// Matching is case-insensitive. Returns `None` for unknown extensions.
pub fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    let lower = extension.to_ascii_lowercase();
    FORMAT_MAP
        .iter()
        .find(|(ext, _)| *ext == lower)
        .map(|(_, media_type)| *media_type)
}

/// Map a media type back to its canonical extension.
pub fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    FORMAT_MAP
        .iter()
        .find(|(_, mt)| *mt == media_type)
        .map(|(ext, _)| *ext)
}

// =============================================================================
// Request parsing
// =============================================================================

/// Parse a complete request from its path tokens.
///
/// `rotation_token` may carry the leading `!` mirror flag. `format_extension`
/// is the bare extension after the final dot (e.g., "jpg").
///
/// # Errors
///
/// Returns the first [`ParseError`] encountered, in request-path order.
pub fn parse_request(
    source: SourceImage,
    region_token: &str,
    size_token: &str,
    rotation_token: &str,
    quality_token: &str,
    format_extension: &str,
) -> Result<TransformRequest, ParseError> {
    let region = parse_region(region_token, source.width, source.height)?;
    let size = parse_size(size_token)?;
    let (mirror, rotation) = parse_rotation(rotation_token)?;
    let quality = parse_quality(quality_token)?;
    let format = media_type_for_extension(format_extension).ok_or_else(|| {
        ParseError::UnsupportedFormat {
            token: format_extension.to_string(),
        }
    })?;

    let request = TransformRequest::builder(source)
        .region(region)
        .size(size)
        .mirror(mirror)
        .rotation(rotation)
        .quality(quality)
        .format(format)
        .build()
        .expect("all components are set");

    Ok(request)
}

// =============================================================================
// Region
// =============================================================================

/// Parse a region token against the source dimensions.
///
/// Accepted forms: `full`, `pct:x,y,w,h` (floats), `x,y,w,h` (integers).
/// Out-of-bounds selections are clamped to the source edge; a selection that
/// clamps to nothing is an error. A rectangle equal to the full source is
/// canonicalized to [`Region::Full`], so `pct:0,0,100,100` and an explicit
/// `0,0,{w},{h}` both compare equal to `full`.
pub fn parse_region(
    token: &str,
    source_width: u32,
    source_height: u32,
) -> Result<Region, ParseError> {
    if token == "full" {
        return Ok(Region::Full);
    }

    let invalid = || ParseError::InvalidRegion {
        token: token.to_string(),
    };

    let (x, y, w, h) = if let Some(rest) = token.strip_prefix("pct:") {
        let values = parse_number_list(rest, 4).ok_or_else(invalid)?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(invalid());
        }
        // Resolve percentages against the source before clamping
        (
            f64::from(source_width) * values[0] / 100.0,
            f64::from(source_height) * values[1] / 100.0,
            f64::from(source_width) * values[2] / 100.0,
            f64::from(source_height) * values[3] / 100.0,
        )
    } else {
        let values = parse_integer_list(token, 4).ok_or_else(invalid)?;
        (
            values[0] as f64,
            values[1] as f64,
            values[2] as f64,
            values[3] as f64,
        )
    };

    // Clamp to the source edge instead of rejecting
    let x = x.round().clamp(0.0, f64::from(source_width)) as u32;
    let y = y.round().clamp(0.0, f64::from(source_height)) as u32;
    let w = (w.round().max(0.0) as u32).min(source_width - x);
    let h = (h.round().max(0.0) as u32).min(source_height - y);

    if w == 0 || h == 0 {
        return Err(ParseError::EmptyRegion {
            token: token.to_string(),
        });
    }

    if x == 0 && y == 0 && w == source_width && h == source_height {
        return Ok(Region::Full);
    }

    Ok(Region::Pixels(Rect::new(x, y, w, h)))
}

// =============================================================================
// Size
// =============================================================================

/// Parse a size token.
///
/// Accepted forms: `full`, `pct:n` (0 < n ≤ 100, where 100 canonicalizes to
/// `full`), `!w,h` (fit within), `w,h` (exact), `w,` and `,h` (one dimension
/// given, the other derived later from the region aspect).
pub fn parse_size(token: &str) -> Result<Size, ParseError> {
    let invalid = || ParseError::InvalidSize {
        token: token.to_string(),
    };
    let empty = || ParseError::EmptySize {
        token: token.to_string(),
    };

    if token == "full" {
        return Ok(Size::Full);
    }

    if let Some(rest) = token.strip_prefix("pct:") {
        let pct: f64 = rest.parse().map_err(|_| invalid())?;
        if !pct.is_finite() || pct <= 0.0 || pct > 100.0 {
            return Err(invalid());
        }
        if pct == 100.0 {
            return Ok(Size::Full);
        }
        return Ok(Size::Percentage(pct));
    }

    let (fit_within, dimensions) = match token.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let mut parts = dimensions.split(',');
    let (width_part, height_part) = match (parts.next(), parts.next(), parts.next()) {
        (Some(w), Some(h), None) => (w, h),
        _ => return Err(invalid()),
    };

    let parse_dim = |part: &str| -> Result<Option<u32>, ParseError> {
        if part.is_empty() {
            return Ok(None);
        }
        let value: u32 = part.parse().map_err(|_| invalid())?;
        if value == 0 {
            return Err(empty());
        }
        Ok(Some(value))
    };

    let width = parse_dim(width_part)?;
    let height = parse_dim(height_part)?;

    match (fit_within, width, height) {
        (true, Some(width), Some(height)) => Ok(Size::FitWithin { width, height }),
        (false, Some(width), Some(height)) => Ok(Size::Exact { width, height }),
        (false, Some(width), None) => Ok(Size::Width(width)),
        (false, None, Some(height)) => Ok(Size::Height(height)),
        _ => Err(invalid()),
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Parse the combined mirror + rotation token.
///
/// A leading `!` requests horizontal mirroring. The remaining token is a
/// non-negative degree value, normalized by numeric parsing (so `090` is 90
/// and `0.00` is 0) and reduced modulo 360. Exactly 90/180/270 classify as a
/// lossless quarter turn; everything else nonzero is an arbitrary angle some
/// backends may reject. An empty value after the mirror flag means no
/// rotation.
pub fn parse_rotation(token: &str) -> Result<(Mirror, Rotation), ParseError> {
    let (mirror, degrees_token) = match token.strip_prefix('!') {
        Some(rest) => (Mirror::Horizontal, rest),
        None => (Mirror::Default, token),
    };

    if degrees_token.is_empty() {
        return Ok((mirror, Rotation::None));
    }

    let degrees: f64 = degrees_token.parse().map_err(|_| ParseError::InvalidRotation {
        token: token.to_string(),
    })?;
    if !degrees.is_finite() || degrees < 0.0 {
        return Err(ParseError::InvalidRotation {
            token: token.to_string(),
        });
    }

    let degrees = degrees % 360.0;

    let rotation = if degrees == 0.0 {
        Rotation::None
    } else if degrees == 90.0 || degrees == 180.0 || degrees == 270.0 {
        Rotation::Quarter(degrees as u16)
    } else {
        Rotation::Arbitrary(degrees)
    };

    Ok((mirror, rotation))
}

// =============================================================================
// Quality
// =============================================================================

/// Parse a quality token.
pub fn parse_quality(token: &str) -> Result<Quality, ParseError> {
    match token {
        "default" => Ok(Quality::Default),
        "color" => Ok(Quality::Color),
        "gray" => Ok(Quality::Gray),
        "bitonal" => Ok(Quality::Bitonal),
        _ => Err(ParseError::InvalidQuality {
            token: token.to_string(),
        }),
    }
}

// =============================================================================
// Token helpers
// =============================================================================

/// Parse a comma-separated list of exactly `count` floats.
fn parse_number_list(input: &str, count: usize) -> Option<Vec<f64>> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != count {
        return None;
    }
    parts.iter().map(|part| part.parse().ok()).collect()
}

/// Parse a comma-separated list of exactly `count` integers.
///
/// Values are signed so that negative coordinates survive parsing and get
/// clamped like any other out-of-bounds selection.
fn parse_integer_list(input: &str, count: usize) -> Option<Vec<i64>> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != count {
        return None;
    }
    parts.iter().map(|part| part.parse().ok()).collect()
}

// =============================================================================
// Tests
// =============================================================================
