//! # IIIF Streamer
//!
//! An IIIF Image API 2.x image server for locally stored media.
//!
//! This library implements the full request pipeline behind the canonical
//! `{identifier}/{region}/{size}/{rotation}/{quality}.{format}` URL syntax:
//! parsing and normalizing the request, choosing the cheapest data path that
//! satisfies it exactly, and running a capability-negotiated transform
//! backend chain only when no pre-built artifact already matches.
//!
//! ## Features
//!
//! - **Exact request parsing**: IIIF 2.x region/size/rotation/quality/format
//!   grammar with percentage resolution, clamping and canonicalization
//! - **Artifact reuse**: zero-op passthrough, derivative reuse, and
//!   single-tile reuse from pre-built DeepZoom or Zoomify pyramids
//! - **Pyramid addressing**: exact region-to-cell resolution including edge
//!   cells, overlap borders and Zoomify tile groups
//! - **Backend fallback**: in-process raster backend first, external
//!   ImageMagick as the most capable last resort
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`iiif`] - request model and path-token parser
//! - [`pyramid`] - DeepZoom/Zoomify descriptors, locator and cell resolver
//! - [`store`] - identifier resolution and derivative probing
//! - [`transform`] - extraction plans, backends, engine and planner
//! - [`service`] - the request pipeline facade
//! - [`server`] - Axum-based HTTP routes and handlers
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use iiif_streamer::pyramid::TileLocator;
//! use iiif_streamer::service::ImageService;
//! use iiif_streamer::store::FsMediaStore;
//! use iiif_streamer::transform::{
//!     BackendRegistry, RasterBackend, TransformEngine, TransformPlanner,
//! };
//! use iiif_streamer::{create_router, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = FsMediaStore::new("/var/media");
//!     let planner = TransformPlanner::new(TileLocator::new("/var/media"));
//!
//!     let mut registry = BackendRegistry::new();
//!     registry.register(Box::new(RasterBackend::new()));
//!     let engine = TransformEngine::new(registry);
//!
//!     let service = ImageService::new(store, planner, engine);
//!     let router = create_router(service, RouterConfig::new());
//!
//!     // Start the server...
//! }
//! ```

pub mod config;
pub mod error;
pub mod iiif;
pub mod pyramid;
pub mod server;
pub mod service;
pub mod store;
pub mod transform;

// Re-export commonly used types
pub use config::Config;
pub use error::{ParseError, StoreError, TransformError};
pub use iiif::{
    media_type_for_extension, parse_request, Mirror, Quality, Rect, Region, Rotation, Size,
    SourceImage, TransformRequest, TransformRequestBuilder,
};
pub use pyramid::{resolve_cell, CellAddress, TileInfo, TileLocator, TileType};
pub use server::{create_router, AppState, ImageInfo, RouterConfig};
pub use service::{ImageDescription, ImageService, RenderedImage};
pub use store::{Derivative, FsMediaStore, MediaStore};
pub use transform::{
    BackendRegistry, Capabilities, DeliveryPlan, ExtractionPlan, ImageBackend, MagickBackend,
    RasterBackend, TransformEngine, TransformPlanner, TransformTask,
};
