//! Image service orchestrating the full request pipeline.
//!
//! The service ties the store, the planner and the transform engine
//! together. Handlers hand it an identifier plus a parsed request and get
//! bytes back; everything in between (derivative probing, pyramid lookup,
//! backend fallback) happens behind [`render`](ImageService::render).
//!
//! Each call runs synchronously end to end. There is no request coalescing
//! and no cross-request result cache: two identical concurrent requests each
//! run the whole pipeline. Shared state is limited to the read-only
//! configuration the service was built with.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{StoreError, TransformError};
use crate::iiif::{SourceImage, TransformRequest};
use crate::pyramid::TileInfo;
use crate::store::{Derivative, MediaStore};
use crate::transform::{DeliveryPlan, TransformEngine, TransformPlanner};

// =============================================================================
// Rendered Image
// =============================================================================

/// The outcome of one image request.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    /// Encoded image bytes
    pub data: Bytes,

    /// Media type of `data`
    pub media_type: &'static str,

    /// Which data path produced the bytes (for logs and the delivery header)
    pub plan_kind: &'static str,
}

/// Everything the info document needs to know about one identifier.
#[derive(Debug, Clone)]
pub struct ImageDescription {
    /// The resolved source record
    pub source: SourceImage,

    /// Available derivatives, in probe order
    pub derivatives: Vec<Derivative>,

    /// The pyramid belonging to this source, when one exists and matches
    pub pyramid: Option<TileInfo>,
}

// =============================================================================
// Image Service
// =============================================================================

/// Request-pipeline facade over store, planner and engine.
///
/// # Type Parameters
///
/// * `S` - The media store implementation (filesystem in production, mocks in
///   tests)
pub struct ImageService<S: MediaStore> {
    store: S,
    planner: TransformPlanner,
    engine: TransformEngine,
}

impl<S: MediaStore> ImageService<S> {
    /// Create a service from its three collaborators.
    pub fn new(store: S, planner: TransformPlanner, engine: TransformEngine) -> Self {
        Self {
            store,
            planner,
            engine,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve an identifier to its source record.
    pub fn resolve_source(&self, identifier: &str) -> Result<SourceImage, StoreError> {
        self.store.resolve(identifier)
    }

    /// Describe an identifier for the info document.
    ///
    /// A pyramid that describes different dimensions than the source is
    /// omitted, mirroring the planner's behavior.
    pub fn describe(&self, identifier: &str) -> Result<ImageDescription, StoreError> {
        let source = self.store.resolve(identifier)?;
        let derivatives = self.store.derivatives(identifier);
        let pyramid = self
            .planner
            .locator()
            .locate(&self.store.base_name(identifier))
            .filter(|info| info.width == source.width && info.height == source.height);

        Ok(ImageDescription {
            source,
            derivatives,
            pyramid,
        })
    }

    /// Plan and execute one request.
    ///
    /// Reuse plans stream an existing file; transform plans run the backend
    /// chain. Either way the caller receives complete bytes or an error,
    /// never partial output.
    pub fn render(
        &self,
        identifier: &str,
        request: &TransformRequest,
    ) -> Result<RenderedImage, TransformError> {
        let plan = self.planner.plan(&self.store, identifier, request)?;
        let plan_kind = plan.kind();
        let media_type = plan.media_type();

        debug!(identifier, plan = plan_kind, "Delivery plan chosen");

        let data = match plan {
            DeliveryPlan::Passthrough { path, .. } => read_asset(&path)?,
            DeliveryPlan::DerivativeReuse { derivative } => read_asset(&derivative.path)?,
            DeliveryPlan::TileReuse { path, .. } => read_asset(&path)?,
            DeliveryPlan::DerivativeTransform { task, .. }
            | DeliveryPlan::TileTransform { task, .. }
            | DeliveryPlan::Dynamic { task } => self.engine.transform(&task)?,
        };

        info!(
            identifier,
            plan = plan_kind,
            bytes = data.len(),
            media_type,
            "Request served"
        );

        Ok(RenderedImage {
            data,
            media_type,
            plan_kind,
        })
    }
}

/// Read an existing asset for verbatim streaming.
///
/// An empty or missing file at this point means the store or the pyramid is
/// internally inconsistent with what the planner saw, which is a server
/// error, not a fallback.
fn read_asset(path: &Path) -> Result<Bytes, TransformError> {
    let data = fs::read(path).map_err(|e| TransformError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    if data.is_empty() {
        return Err(TransformError::Io {
            path: path.display().to_string(),
            message: "file is empty".to_string(),
        });
    }
    Ok(Bytes::from(data))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iiif::parse_request;
    use crate::pyramid::TileLocator;
    use crate::store::FsMediaStore;
    use crate::transform::{BackendRegistry, RasterBackend};
    use image::{DynamicImage, RgbImage};
    use std::path::Path;
    use tempfile::TempDir;

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 200, 90])))
            .save_with_format(path, image::ImageFormat::Jpeg)
            .unwrap();
    }

    fn service(dir: &TempDir) -> ImageService<FsMediaStore> {
        let store = FsMediaStore::new(dir.path());
        let planner = TransformPlanner::new(TileLocator::new(dir.path()));
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(RasterBackend::new()));
        ImageService::new(store, planner, TransformEngine::new(registry))
    }

    #[test]
    fn test_passthrough_returns_original_bytes() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("sample.jpg"), 100, 80);
        let service = service(&dir);

        let source = service.resolve_source("sample.jpg").unwrap();
        let request = parse_request(source, "full", "full", "0", "default", "jpg").unwrap();
        let rendered = service.render("sample.jpg", &request).unwrap();

        assert_eq!(rendered.plan_kind, "passthrough");
        assert_eq!(rendered.media_type, "image/jpeg");
        let original = fs::read(dir.path().join("sample.jpg")).unwrap();
        assert_eq!(&rendered.data[..], &original[..]);
    }

    #[test]
    fn test_dynamic_render_produces_requested_dimensions() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("sample.jpg"), 400, 300);
        let service = service(&dir);

        let source = service.resolve_source("sample.jpg").unwrap();
        let request = parse_request(source, "full", "100,", "0", "default", "png").unwrap();
        let rendered = service.render("sample.jpg", &request).unwrap();

        assert_eq!(rendered.plan_kind, "dynamic");
        assert_eq!(rendered.media_type, "image/png");
        let img = image::load_from_memory(&rendered.data).unwrap();
        assert_eq!((img.width(), img.height()), (100, 75));
    }

    #[test]
    fn test_describe_reports_derivatives() {
        let dir = TempDir::new().unwrap();
        write_jpeg(&dir.path().join("sample.jpg"), 400, 300);
        write_jpeg(&dir.path().join("thumbnail/sample.jpg"), 100, 75);
        let service = service(&dir);

        let description = service.describe("sample.jpg").unwrap();
        assert_eq!(description.source.width, 400);
        assert_eq!(description.derivatives.len(), 1);
        assert_eq!(description.derivatives[0].name, "thumbnail");
        assert!(description.pyramid.is_none());
    }

    #[test]
    fn test_describe_unknown_identifier() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        assert!(matches!(
            service.describe("missing.jpg"),
            Err(StoreError::NotFound { .. })
        ));
    }
}
