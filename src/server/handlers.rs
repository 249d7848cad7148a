//! HTTP request handlers for the IIIF Image API.
//!
//! # Endpoints
//!
//! - `GET /{identifier}/{region}/{size}/{rotation}/{quality}.{format}` - image request
//! - `GET /{identifier}/info.json` - image information document
//! - `GET /{identifier}` - redirect to the info document
//! - `GET /health` - health check

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{ParseError, StoreError, TransformError};
use crate::iiif::parse_request;
use crate::service::ImageService;
use crate::store::MediaStore;

use super::info::{build_info, IIIF_CONTEXT, IIIF_LEVEL2_PROFILE};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the image service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: MediaStore> {
    /// The image service for processing requests
    pub service: Arc<ImageService<S>>,

    /// Cache-Control max-age in seconds for successful responses
    pub cache_max_age: u32,
}

impl<S: MediaStore> AppState<S> {
    /// Create a new application state with the default cache max-age (1h).
    pub fn new(service: ImageService<S>) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age: 3600,
        }
    }

    /// Create a new application state with a custom cache max-age.
    pub fn with_cache_max_age(service: ImageService<S>, cache_max_age: u32) -> Self {
        Self {
            service: Arc::new(service),
            cache_max_age,
        }
    }
}

impl<S: MediaStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for image requests.
///
/// Extracted from:
/// `/{identifier}/{region}/{size}/{rotation}/{filename}` where filename is
/// `{quality}.{format}`.
#[derive(Debug, Deserialize)]
pub struct ImagePathParams {
    /// URL-encoded source identifier
    pub identifier: String,

    /// Region token (`full`, `pct:x,y,w,h`, `x,y,w,h`)
    pub region: String,

    /// Size token (`full`, `pct:n`, `w,h`, `!w,h`, `w,`, `,h`)
    pub size: String,

    /// Rotation token, optionally with a leading `!` mirror flag
    pub rotation: String,

    /// Combined quality and format (e.g., "default.jpg")
    pub filename: String,
}

impl ImagePathParams {
    /// Split the filename into its quality and format tokens.
    pub fn quality_and_format(&self) -> Result<(&str, &str), ParseError> {
        self.filename
            .rsplit_once('.')
            .ok_or_else(|| ParseError::UnsupportedFormat {
                token: self.filename.clone(),
            })
    }
}

/// Decode a percent-encoded identifier path segment.
fn decode_identifier(raw: &str) -> Result<String, StoreError> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| StoreError::InvalidIdentifier {
            identifier: raw.to_string(),
        })
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Unified handler error wrapping the three error domains.
#[derive(Debug)]
pub enum HandlerError {
    Parse(ParseError),
    Store(StoreError),
    Transform(TransformError),
}

impl From<ParseError> for HandlerError {
    fn from(err: ParseError) -> Self {
        HandlerError::Parse(err)
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        HandlerError::Store(err)
    }
}

impl From<TransformError> for HandlerError {
    fn from(err: TransformError) -> Self {
        HandlerError::Transform(err)
    }
}

/// Convert handler errors to HTTP responses.
///
/// Severity drives logging: 5xx at ERROR, 404 at DEBUG (common and
/// expected), other client errors and 501 at WARN.
impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            // Malformed request syntax aborts before any I/O
            HandlerError::Parse(err) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                err.to_string(),
            ),

            HandlerError::Store(StoreError::NotFound { identifier }) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("No media found for identifier: {identifier}"),
            ),
            HandlerError::Store(StoreError::InvalidIdentifier { identifier }) => (
                StatusCode::BAD_REQUEST,
                "invalid_identifier",
                format!("Invalid identifier: {identifier}"),
            ),
            HandlerError::Store(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                err.to_string(),
            ),

            // Valid request, but nothing registered can satisfy it
            HandlerError::Transform(err @ TransformError::UnsupportedConversion { .. }) => (
                StatusCode::NOT_IMPLEMENTED,
                "unsupported_conversion",
                err.to_string(),
            ),
            HandlerError::Transform(err @ TransformError::SourceTooLarge { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "source_too_large",
                err.to_string(),
            ),
            // Geometry that only degenerates after resolution (e.g., a
            // percentage size collapsing to zero pixels)
            HandlerError::Transform(err @ TransformError::InvalidPlan { .. }) => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                err.to_string(),
            ),
            HandlerError::Transform(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "transform_failed",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image requests.
///
/// # Endpoint
///
/// `GET /{identifier}/{region}/{size}/{rotation}/{quality}.{format}`
///
/// # Response
///
/// - `200 OK`: image bytes with the negotiated `Content-Type`
/// - `400 Bad Request`: malformed region/size/rotation/quality/format token
/// - `404 Not Found`: unknown identifier
/// - `500 Internal Server Error`: oversize source or transform failure
/// - `501 Not Implemented`: valid request no backend can satisfy
///
/// # Headers
///
/// - `Content-Type`: negotiated output media type
/// - `Link`: the level-2 compliance profile
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Delivery-Plan`: which data path produced the bytes
///   (`passthrough`, `derivative`, `tile`, `dynamic`, ...)
pub async fn image_handler<S: MediaStore + 'static>(
    State(state): State<AppState<S>>,
    Path(params): Path<ImagePathParams>,
) -> Result<Response, HandlerError> {
    let identifier = decode_identifier(&params.identifier)?;
    let (quality, format) = params.quality_and_format()?;

    // Resolve the source first: parsing needs its true pixel dimensions
    let source = state.service.resolve_source(&identifier)?;
    let request = parse_request(
        source,
        &params.region,
        &params.size,
        &params.rotation,
        quality,
        format,
    )?;

    // The transform core is a blocking computation; keep it off the
    // async runtime's worker threads
    let service = Arc::clone(&state.service);
    let rendered = tokio::task::spawn_blocking(move || service.render(&identifier, &request))
        .await
        .map_err(|e| {
            HandlerError::Transform(TransformError::Io {
                path: params.identifier.clone(),
                message: format!("render task failed: {e}"),
            })
        })??;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, rendered.media_type)
        .header(
            header::LINK,
            format!("<{IIIF_LEVEL2_PROFILE}>; rel=\"profile\""),
        )
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        )
        .header("X-Delivery-Plan", rendered.plan_kind)
        .body(axum::body::Body::from(rendered.data))
        .unwrap();

    Ok(response)
}

/// Handle image information requests.
///
/// # Endpoint
///
/// `GET /{identifier}/info.json`
///
/// # Content negotiation
///
/// Returns `application/ld+json` when the `Accept` header asks for it;
/// otherwise `application/json` plus a `Link` header naming the JSON-LD
/// context.
pub async fn info_handler<S: MediaStore + 'static>(
    State(state): State<AppState<S>>,
    Path(identifier): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let decoded = decode_identifier(&identifier)?;
    let description = state.service.describe(&decoded)?;

    let id = format!(
        "{}/{}",
        base_url(&headers),
        urlencoding::encode(&decoded)
    );
    let info = build_info(id, &description);
    let body = serde_json::to_vec(&info).map_err(|e| {
        HandlerError::Transform(TransformError::Io {
            path: decoded.clone(),
            message: format!("info serialization failed: {e}"),
        })
    })?;

    let wants_json_ld = headers
        .get(header::ACCEPT)
        .and_then(|accept| accept.to_str().ok())
        .is_some_and(|accept| accept.contains("application/ld+json"));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        );
    if wants_json_ld {
        builder = builder.header(header::CONTENT_TYPE, "application/ld+json");
    } else {
        builder = builder.header(header::CONTENT_TYPE, "application/json").header(
            header::LINK,
            format!("<{IIIF_CONTEXT}>; rel=\"http://www.w3.org/ns/json-ld#context\"; type=\"application/ld+json\""),
        );
    }

    Ok(builder.body(axum::body::Body::from(body)).unwrap())
}

/// Redirect a bare identifier to its info document.
///
/// # Endpoint
///
/// `GET /{identifier}` responds `303 See Other` pointing at
/// `/{identifier}/info.json`.
pub async fn identifier_handler(Path(identifier): Path<String>) -> Redirect {
    Redirect::to(&format!("/{identifier}/info.json"))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Reconstruct the externally visible base URL from request headers.
///
/// Honors `X-Forwarded-Proto` for reverse proxy deployments and falls back
/// to plain HTTP on localhost for development.
fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:3000");

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    format!("{proto}://{host}")
}

// =============================================================================
// Tests
// =============================================================================
