//! Request model for the IIIF Image API.
//!
//! A [`TransformRequest`] is the validated, normalized form of one image
//! request. It is assembled through [`TransformRequestBuilder`] once every
//! path segment has been parsed, and is immutable afterwards: the planner and
//! the transform engine only ever read it.
//!
//! Region coordinates are always absolute pixels relative to the source by
//! the time a request exists: percentage regions are resolved at parse time.

use std::path::PathBuf;

// =============================================================================
// Source
// =============================================================================

/// The original image a request addresses.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    /// Absolute path of the original file
    pub filepath: PathBuf,

    /// Media type of the original file (e.g., "image/jpeg")
    pub media_type: &'static str,

    /// Width of the original in pixels
    pub width: u32,

    /// Height of the original in pixels
    pub height: u32,
}

// =============================================================================
// Region
// =============================================================================

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// The requested region of the source image.
///
/// `Pixels` rectangles are already clamped to the source bounds and are never
/// empty. A rectangle that covers the entire source is canonicalized to
/// `Full` by the parser, so `Full` is the only representation of the whole
/// image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The complete source image
    Full,

    /// An absolute pixel rectangle inside the source
    Pixels(Rect),
}

impl Region {
    /// Whether this region is the whole source image.
    pub fn is_full(&self) -> bool {
        matches!(self, Region::Full)
    }

    /// Resolve to an absolute rectangle against the source dimensions.
    pub fn rect(&self, source_width: u32, source_height: u32) -> Rect {
        match self {
            Region::Full => Rect::new(0, 0, source_width, source_height),
            Region::Pixels(rect) => *rect,
        }
    }
}

// =============================================================================
// Size
// =============================================================================

/// The requested output size.
///
/// `Width`/`Height` derive the missing dimension from the aspect ratio of the
/// *region* (not the source). `Exact` does not preserve aspect; `FitWithin`
/// scales to fit inside the box, whichever dimension binds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Size {
    /// Native size of the region ("full")
    Full,

    /// Exact width, height derived from the region aspect ("w,")
    Width(u32),

    /// Exact height, width derived from the region aspect (",h")
    Height(u32),

    /// Scale both dimensions by a percentage, 0 < pct < 100 ("pct:n")
    Percentage(f64),

    /// Exact output dimensions, aspect not preserved ("w,h")
    Exact { width: u32, height: u32 },

    /// Largest size preserving aspect that fits inside the box ("!w,h")
    FitWithin { width: u32, height: u32 },
}

impl Size {
    /// Whether this size is the region's native size.
    pub fn is_full(&self) -> bool {
        matches!(self, Size::Full)
    }

    /// Destination pixel dimensions for a region of the given extent.
    ///
    /// Missing dimensions derive from the region aspect ratio; `FitWithin`
    /// picks whichever dimension binds. Returns `None` when the result would
    /// be zero pixels on either axis.
    pub fn resolve(&self, region_width: u32, region_height: u32) -> Option<(u32, u32)> {
        if region_width == 0 || region_height == 0 {
            return None;
        }
        let rw = f64::from(region_width);
        let rh = f64::from(region_height);

        let (width, height) = match *self {
            Size::Full => (region_width, region_height),
            Size::Width(width) => {
                let height = (f64::from(width) * rh / rw).round() as u32;
                (width, height)
            }
            Size::Height(height) => {
                let width = (f64::from(height) * rw / rh).round() as u32;
                (width, height)
            }
            Size::Percentage(pct) => {
                let width = (rw * pct / 100.0).round() as u32;
                let height = (rh * pct / 100.0).round() as u32;
                (width, height)
            }
            Size::Exact { width, height } => (width, height),
            Size::FitWithin { width, height } => {
                // The binding dimension is the one needing the stronger shrink
                let scale = (f64::from(width) / rw).min(f64::from(height) / rh);
                let width = (rw * scale).round() as u32;
                let height = (rh * scale).round() as u32;
                (width, height)
            }
        };

        if width == 0 || height == 0 {
            None
        } else {
            Some((width, height))
        }
    }
}

// =============================================================================
// Mirror
// =============================================================================

/// Mirroring applied before rotation.
///
/// The request syntax only produces `Default` or `Horizontal` (the leading
/// `!` on the rotation segment); the transform pipeline supports all four so
/// internal callers can reuse it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    Default,
    Horizontal,
    Vertical,
    Both,
}

impl Mirror {
    /// Whether mirroring is a no-op.
    pub fn is_default(&self) -> bool {
        matches!(self, Mirror::Default)
    }
}

// =============================================================================
// Rotation
// =============================================================================

/// Rotation class, decided by the parser after degree normalization.
///
/// The split matters to backends: quarter turns are lossless and universally
/// supported, arbitrary angles need background fill and are a queried
/// capability that not every backend has.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// 0 degrees, nothing to do
    None,

    /// Exactly 90, 180 or 270 degrees
    Quarter(u16),

    /// Any other angle, in degrees
    Arbitrary(f64),
}

impl Rotation {
    /// Whether rotation is a no-op.
    pub fn is_none(&self) -> bool {
        matches!(self, Rotation::None)
    }

    /// The rotation angle in degrees.
    pub fn degrees(&self) -> f64 {
        match self {
            Rotation::None => 0.0,
            Rotation::Quarter(d) => f64::from(*d),
            Rotation::Arbitrary(d) => *d,
        }
    }
}

// =============================================================================
// Quality
// =============================================================================

/// Output quality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Default,
    Color,
    Gray,
    Bitonal,
}

impl Quality {
    /// Whether the filter leaves pixels untouched.
    ///
    /// `color` is explicitly a no-op: sources are already color (or already
    /// gray), and the request merely states the default expectation.
    pub fn is_noop(&self) -> bool {
        matches!(self, Quality::Default | Quality::Color)
    }

    /// The request-syntax name of this quality.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Default => "default",
            Quality::Color => "color",
            Quality::Gray => "gray",
            Quality::Bitonal => "bitonal",
        }
    }
}

// =============================================================================
// Transform Request
// =============================================================================

/// A fully parsed and validated IIIF image request.
///
/// Created once per request via [`TransformRequestBuilder`], immutable
/// afterwards, dropped when the response has been emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    /// The original image being addressed
    pub source: SourceImage,

    /// Requested region, absolute pixels or full
    pub region: Region,

    /// Requested output size
    pub size: Size,

    /// Mirroring, applied before rotation
    pub mirror: Mirror,

    /// Rotation class and angle
    pub rotation: Rotation,

    /// Quality filter
    pub quality: Quality,

    /// Output media type (e.g., "image/png")
    pub format: &'static str,
}

impl TransformRequest {
    /// Start building a request for the given source.
    pub fn builder(source: SourceImage) -> TransformRequestBuilder {
        TransformRequestBuilder::new(source)
    }

    /// The requested region as an absolute rectangle.
    pub fn region_rect(&self) -> Rect {
        self.region.rect(self.source.width, self.source.height)
    }

    /// Whether the request changes nothing at all: full region, native size,
    /// no mirror/rotation/quality change, and the source's own format.
    ///
    /// The planner streams the original file verbatim for such requests.
    pub fn is_identity(&self) -> bool {
        self.region.is_full()
            && self.size.is_full()
            && self.mirror.is_default()
            && self.rotation.is_none()
            && self.quality == Quality::Default
            && self.format == self.source.media_type
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder assembling an immutable [`TransformRequest`].
///
/// Every component must be supplied before [`build`](Self::build) succeeds,
/// so no stage downstream can ever observe a partially constructed request.
#[derive(Debug, Clone)]
pub struct TransformRequestBuilder {
    source: SourceImage,
    region: Option<Region>,
    size: Option<Size>,
    mirror: Option<Mirror>,
    rotation: Option<Rotation>,
    quality: Option<Quality>,
    format: Option<&'static str>,
}

impl TransformRequestBuilder {
    pub fn new(source: SourceImage) -> Self {
        Self {
            source,
            region: None,
            size: None,
            mirror: None,
            rotation: None,
            quality: None,
            format: None,
        }
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn format(mut self, media_type: &'static str) -> Self {
        self.format = Some(media_type);
        self
    }

    /// Build the request, naming the first missing component on failure.
    pub fn build(self) -> Result<TransformRequest, &'static str> {
        Ok(TransformRequest {
            source: self.source,
            region: self.region.ok_or("region")?,
            size: self.size.ok_or("size")?,
            mirror: self.mirror.ok_or("mirror")?,
            rotation: self.rotation.ok_or("rotation")?,
            quality: self.quality.ok_or("quality")?,
            format: self.format.ok_or("format")?,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
