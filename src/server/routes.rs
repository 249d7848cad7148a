//! Router configuration for the IIIF Image API server.
//!
//! # Route Structure
//!
//! ```text
//! /health                                                - health check
//! /{identifier}                                          - redirect to info.json
//! /{identifier}/info.json                                - image information
//! /{identifier}/{region}/{size}/{rotation}/{filename}    - image request
//! ```
//!
//! Cross-origin access is always open (`Access-Control-Allow-Origin: *`), as
//! viewers are expected to embed images from anywhere.

use axum::{routing::get, Router};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::Method;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::ImageService;
use crate::store::MediaStore;

use super::handlers::{
    health_handler, identifier_handler, image_handler, info_handler, AppState,
};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration with the defaults: 1 hour cache max-age,
    /// tracing enabled.
    pub fn new() -> Self {
        Self {
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// # Arguments
///
/// * `service` - The image service handling requests
/// * `config` - Router configuration
pub fn create_router<S>(service: ImageService<S>, config: RouterConfig) -> Router
where
    S: MediaStore + 'static,
{
    let app_state = AppState::with_cache_max_age(service, config.cache_max_age);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/{identifier}", get(identifier_handler))
        .route("/{identifier}/info.json", get(info_handler::<S>))
        .route(
            "/{identifier}/{region}/{size}/{rotation}/{filename}",
            get(image_handler::<S>),
        )
        .with_state(app_state)
        .layer(build_cors_layer());

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the wide-open CORS layer.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400))
}

// =============================================================================
// Tests
// =============================================================================
