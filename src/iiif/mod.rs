//! IIIF Image API request model and parser.
//!
//! This module owns the request side of the engine:
//!
//! - [`request`] - the immutable [`TransformRequest`] and its component types
//! - [`parser`] - the path-token grammar (region/size/rotation/quality/format)
//!
//! The parser resolves everything relative (percentage regions, derived
//! dimensions) against the source's true pixel size up front, so the planner
//! and the backends work exclusively in absolute pixels.

pub mod parser;
pub mod request;

pub use parser::{
    extension_for_media_type, media_type_for_extension, parse_quality, parse_region,
    parse_request, parse_rotation, parse_size,
};
pub use request::{
    Mirror, Quality, Rect, Region, Rotation, Size, SourceImage, TransformRequest,
    TransformRequestBuilder,
};
