//! IIIF Streamer - an IIIF Image API 2.x image server.
//!
//! This binary starts the HTTP server and wires all components together.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iiif_streamer::{
    config::Config,
    pyramid::TileLocator,
    server::{create_router, RouterConfig},
    service::ImageService,
    store::FsMediaStore,
    transform::{
        BackendRegistry, MagickBackend, RasterBackend, TransformEngine, TransformPlanner,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    if !config.media_root.is_dir() {
        error!(
            "Media root {} does not exist or is not a directory",
            config.media_root.display()
        );
        return ExitCode::FAILURE;
    }

    let tile_root = config.effective_tile_root();

    info!("Configuration:");
    info!("  Media root: {}", config.media_root.display());
    info!("  Tile root: {}", tile_root.display());
    info!("  Derivatives: {}", config.derivative_dirs.join(", "));
    info!(
        "  Dynamic transform ceiling: {}MB",
        config.max_dynamic_bytes / (1024 * 1024)
    );

    // Build the backend registry: in-process raster first, CLI fallback last
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(RasterBackend::with_jpeg_quality(
        config.jpeg_quality,
    )));

    if config.no_magick {
        info!("  ImageMagick backend: disabled");
    } else {
        match MagickBackend::detect(&config.convert_path) {
            Some(backend) => {
                info!("  ImageMagick backend: {}", config.convert_path);
                registry.register(Box::new(backend));
            }
            None => {
                warn!(
                    "  ImageMagick not found at {:?}; JPEG 2000/PDF output and \
                     arbitrary rotation will be unavailable",
                    config.convert_path
                );
            }
        }
    }
    info!("  Backends: {}", registry.names().join(" -> "));

    // Wire the pipeline
    let store = FsMediaStore::with_derivatives(&config.media_root, config.derivative_dirs.clone());
    let locator = TileLocator::new(tile_root);
    let planner = TransformPlanner::with_max_dynamic_bytes(locator, config.max_dynamic_bytes);
    let engine = TransformEngine::new(registry);
    let service = ImageService::new(store, planner, engine);

    let router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);
    let router = create_router(service, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/<identifier>/info.json", addr);
    info!("    curl http://{}/<identifier>/full/full/0/default.jpg", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "iiif_streamer=debug,tower_http=debug"
    } else {
        "iiif_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
