use thiserror::Error;

/// Errors produced while parsing the IIIF request path segments.
///
/// Each variant carries the offending token so the HTTP layer can echo it back
/// in the 400 response. Parsing happens before any I/O: a request that fails
/// here never touches the store or a backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Region token is malformed (wrong arity, non-numeric values)
    #[error("Invalid region: {token:?}")]
    InvalidRegion { token: String },

    /// Region clamping reduced the selection to an empty area
    #[error("Region selects an empty area: {token:?}")]
    EmptyRegion { token: String },

    /// Size token is malformed (wrong arity, non-numeric, out-of-range pct)
    #[error("Invalid size: {token:?}")]
    InvalidSize { token: String },

    /// Derived output dimensions are zero
    #[error("Size reduces to zero pixels: {token:?}")]
    EmptySize { token: String },

    /// Rotation token is not a non-negative number (after the mirror flag)
    #[error("Invalid rotation: {token:?}")]
    InvalidRotation { token: String },

    /// Quality is not one of default|color|gray|bitonal
    #[error("Invalid quality: {token:?}")]
    InvalidQuality { token: String },

    /// Format extension has no known media type mapping
    #[error("Unsupported format: {token:?}")]
    UnsupportedFormat { token: String },
}

impl ParseError {
    /// The request token this error is complaining about.
    pub fn token(&self) -> &str {
        match self {
            ParseError::InvalidRegion { token }
            | ParseError::EmptyRegion { token }
            | ParseError::InvalidSize { token }
            | ParseError::EmptySize { token }
            | ParseError::InvalidRotation { token }
            | ParseError::InvalidQuality { token }
            | ParseError::UnsupportedFormat { token } => token,
        }
    }
}

/// Errors from identifier resolution and derivative lookup.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No file matches the requested identifier
    #[error("Media not found: {identifier}")]
    NotFound { identifier: String },

    /// Identifier escapes the media root (path traversal)
    #[error("Invalid identifier: {identifier}")]
    InvalidIdentifier { identifier: String },

    /// The file exists but its pixel dimensions could not be read
    #[error("Unreadable image {path}: {message}")]
    Unreadable { path: String, message: String },

    /// Filesystem error while probing
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

/// Errors from the transform engine and its backends.
///
/// `UnsupportedConversion` is only surfaced after every registered backend has
/// been consulted; a single backend lacking a capability is recovered
/// internally by falling through to the next one.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// No registered backend supports this (input, output, rotation) combination
    #[error("No backend can convert {input} to {output}")]
    UnsupportedConversion { input: String, output: String },

    /// Source exceeds the configured dynamic-transform byte ceiling
    #[error("Source {path} is {size} bytes, above the {limit} byte limit for dynamic transforms")]
    SourceTooLarge { path: String, size: u64, limit: u64 },

    /// A backend failed mid-pipeline (codec or runtime error)
    #[error("Backend {backend} failed on {path}: {message}")]
    BackendFailure {
        backend: &'static str,
        path: String,
        message: String,
    },

    /// A backend ran to completion but produced no bytes
    #[error("Backend {backend} produced empty output for {path}")]
    EmptyOutput { backend: &'static str, path: String },

    /// The crop/resize instruction is geometrically invalid
    #[error("Invalid extraction plan: {message}")]
    InvalidPlan { message: String },

    /// I/O error reading the transform source
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}
