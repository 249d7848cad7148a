//! HTTP server layer for the IIIF Image API.
//!
//! A deliberately thin shell over [`ImageService`](crate::service::ImageService):
//! it routes the five-part request path, negotiates the info document's
//! content type, maps the engine's error taxonomy to status codes, and sets
//! the CORS/profile/caching headers. Everything image-shaped happens below
//! this layer, synchronously.

pub mod handlers;
pub mod info;
pub mod routes;

pub use handlers::{
    health_handler, identifier_handler, image_handler, info_handler, AppState, ErrorResponse,
    HandlerError, HealthResponse, ImagePathParams,
};
pub use info::{
    build_info, ImageInfo, SizeEntry, TileEntry, IIIF_CONTEXT, IIIF_LEVEL2_PROFILE, IIIF_PROTOCOL,
};
pub use routes::{create_router, RouterConfig};
