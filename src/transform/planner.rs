//! The transform planner: pick the cheapest data path that satisfies the
//! request exactly.
//!
//! Decision order, stopping at the first hit:
//!
//! 1. **Passthrough**: the request changes nothing; stream the original.
//! 2. **Derivative reuse**: for full-region requests, a pre-generated
//!    rendition either matches the output byte-for-byte or serves as the
//!    source of a lighter, crop-free transform.
//! 3. **Tile reuse**: the region/size maps onto exactly one pyramid cell;
//!    serve that tile (cropping the Deep Zoom overlap border) with only the
//!    residual transform.
//! 4. **Dynamic**: decode the original, guarded by a byte-size ceiling so a
//!    pathological source cannot monopolize CPU and memory.
//!
//! Matching is always exact. An approximate hit (a derivative that is
//! almost the right size, a cell that nearly covers the region) is not a
//! hit, because the client must receive pixel-correct output.

use std::path::PathBuf;

use tracing::debug;

use crate::error::TransformError;
use crate::iiif::{media_type_for_extension, Size, TransformRequest};
use crate::pyramid::{resolve_cell, CellAddress, TileLocator};
use crate::store::{file_size, Derivative, MediaStore};

use super::backend::TransformTask;
use super::plan::ExtractionPlan;

/// Default ceiling for dynamic transforms of the original file.
pub const DEFAULT_MAX_DYNAMIC_BYTES: u64 = 64 * 1024 * 1024;

// =============================================================================
// Delivery Plan
// =============================================================================

/// The planner's verdict: where the response bytes come from.
#[derive(Debug, Clone)]
pub enum DeliveryPlan {
    /// Stream the original file verbatim
    Passthrough {
        path: PathBuf,
        media_type: &'static str,
    },

    /// Stream a derivative file verbatim
    DerivativeReuse { derivative: Derivative },

    /// Transform with a derivative as the (smaller) source
    DerivativeTransform { name: String, task: TransformTask },

    /// Stream a pyramid tile verbatim
    TileReuse {
        path: PathBuf,
        media_type: &'static str,
        cell: CellAddress,
    },

    /// Transform with a pyramid tile as the source
    TileTransform { cell: CellAddress, task: TransformTask },

    /// Full transform from the original
    Dynamic { task: TransformTask },
}

impl DeliveryPlan {
    /// Short name for logs and the delivery header.
    pub fn kind(&self) -> &'static str {
        match self {
            DeliveryPlan::Passthrough { .. } => "passthrough",
            DeliveryPlan::DerivativeReuse { .. } => "derivative",
            DeliveryPlan::DerivativeTransform { .. } => "derivative-transform",
            DeliveryPlan::TileReuse { .. } => "tile",
            DeliveryPlan::TileTransform { .. } => "tile-transform",
            DeliveryPlan::Dynamic { .. } => "dynamic",
        }
    }

    /// Media type of the bytes this plan produces.
    pub fn media_type(&self) -> &'static str {
        match self {
            DeliveryPlan::Passthrough { media_type, .. }
            | DeliveryPlan::TileReuse { media_type, .. } => media_type,
            DeliveryPlan::DerivativeReuse { derivative } => derivative.media_type,
            DeliveryPlan::DerivativeTransform { task, .. }
            | DeliveryPlan::TileTransform { task, .. }
            | DeliveryPlan::Dynamic { task } => task.output_media_type,
        }
    }

    /// Whether this plan invokes a transform backend at all.
    pub fn is_reuse(&self) -> bool {
        matches!(
            self,
            DeliveryPlan::Passthrough { .. }
                | DeliveryPlan::DerivativeReuse { .. }
                | DeliveryPlan::TileReuse { .. }
        )
    }
}

// =============================================================================
// Planner
// =============================================================================

/// Chooses a [`DeliveryPlan`] for each request.
///
/// Holds only read-only configuration; shared across requests.
pub struct TransformPlanner {
    locator: TileLocator,
    max_dynamic_bytes: u64,
}

impl TransformPlanner {
    /// Create a planner with the default dynamic-transform ceiling.
    pub fn new(locator: TileLocator) -> Self {
        Self::with_max_dynamic_bytes(locator, DEFAULT_MAX_DYNAMIC_BYTES)
    }

    /// Create a planner with an explicit dynamic-transform byte ceiling.
    pub fn with_max_dynamic_bytes(locator: TileLocator, max_dynamic_bytes: u64) -> Self {
        Self {
            locator,
            max_dynamic_bytes,
        }
    }

    /// The pyramid locator this planner consults.
    pub fn locator(&self) -> &TileLocator {
        &self.locator
    }

    /// Decide the data path for one request.
    pub fn plan<S: MediaStore>(
        &self,
        store: &S,
        identifier: &str,
        request: &TransformRequest,
    ) -> Result<DeliveryPlan, TransformError> {
        // Step 1: nothing to do at all
        if request.is_identity() {
            return Ok(DeliveryPlan::Passthrough {
                path: request.source.filepath.clone(),
                media_type: request.source.media_type,
            });
        }

        // Step 2: full-region requests may be covered by a derivative
        if request.region.is_full() {
            if let Some(plan) = self.plan_from_derivatives(store, identifier, request)? {
                return Ok(plan);
            }
        }

        // Step 3: a single pyramid cell may cover the request
        if let Some(plan) = self.plan_from_pyramid(store, identifier, request)? {
            return Ok(plan);
        }

        // Step 4: dynamic transform from the original
        self.plan_dynamic(request)
    }

    fn plan_from_derivatives<S: MediaStore>(
        &self,
        store: &S,
        identifier: &str,
        request: &TransformRequest,
    ) -> Result<Option<DeliveryPlan>, TransformError> {
        let region = request.region_rect();
        let Some((dest_width, dest_height)) = request.size.resolve(region.width, region.height)
        else {
            return Err(TransformError::InvalidPlan {
                message: "size resolves to zero pixels".to_string(),
            });
        };

        let derivatives = store.derivatives(identifier);
        if derivatives.is_empty() {
            return Ok(None);
        }

        // First pass: a derivative that IS the answer, byte for byte
        let residual_free = request.mirror.is_default()
            && request.rotation.is_none()
            && request.quality.is_noop();
        if residual_free {
            for derivative in &derivatives {
                if derivative.width == dest_width
                    && derivative.height == dest_height
                    && derivative.media_type == request.format
                {
                    debug!(derivative = %derivative.name, "Reusing derivative verbatim");
                    return Ok(Some(DeliveryPlan::DerivativeReuse {
                        derivative: derivative.clone(),
                    }));
                }
            }
        }

        // Second pass: a derivative with enough pixels becomes the source of
        // a lighter, crop-free transform
        for derivative in &derivatives {
            let satisfied = match request.size {
                // A native-size request needs the original's resolution
                Size::Full => false,
                Size::Width(width) => width <= derivative.width,
                Size::Height(height) => height <= derivative.height,
                Size::Percentage(pct) => {
                    pct <= f64::from(derivative.width) / f64::from(request.source.width) * 100.0
                }
                Size::Exact { .. } | Size::FitWithin { .. } => {
                    dest_width <= derivative.width && dest_height <= derivative.height
                }
            };
            if !satisfied {
                continue;
            }

            let plan = ExtractionPlan::new(
                0,
                0,
                derivative.width,
                derivative.height,
                dest_width,
                dest_height,
            )?;
            debug!(derivative = %derivative.name, "Transforming from derivative");
            return Ok(Some(DeliveryPlan::DerivativeTransform {
                name: derivative.name.clone(),
                task: TransformTask {
                    source_path: derivative.path.clone(),
                    source_media_type: derivative.media_type,
                    plan,
                    mirror: request.mirror,
                    rotation: request.rotation,
                    quality: request.quality,
                    output_media_type: request.format,
                },
            }));
        }

        Ok(None)
    }

    fn plan_from_pyramid<S: MediaStore>(
        &self,
        store: &S,
        identifier: &str,
        request: &TransformRequest,
    ) -> Result<Option<DeliveryPlan>, TransformError> {
        let base = store.base_name(identifier);
        let Some(info) = self.locator.locate(&base) else {
            return Ok(None);
        };

        // A pyramid describing different dimensions than the source record
        // was built from something else; ignore it
        if info.width != request.source.width || info.height != request.source.height {
            debug!(
                pyramid = %info.metadata_path.display(),
                "Pyramid dimensions {}x{} do not match source {}x{}, ignoring",
                info.width, info.height, request.source.width, request.source.height
            );
            return Ok(None);
        }

        let Some(tile_media_type) = media_type_for_extension(&info.format) else {
            debug!(format = %info.format, "Unknown tile format, ignoring pyramid");
            return Ok(None);
        };

        let region = request.region_rect();
        let Some(cell) = resolve_cell(&info, region, request.size) else {
            return Ok(None);
        };

        let Some((dest_width, dest_height)) = request.size.resolve(region.width, region.height)
        else {
            return Ok(None);
        };

        // Deep Zoom tiles carry an overlap border on interior edges
        let crop_x = if cell.is_first_column { 0 } else { info.overlap };
        let crop_y = if cell.is_first_row { 0 } else { info.overlap };
        let plan = ExtractionPlan::new(
            crop_x,
            crop_y,
            cell.width,
            cell.height,
            dest_width,
            dest_height,
        )?;

        let path = info.tile_path(&cell);

        // The tile file holds exactly the cell content when there is no
        // overlap border to shave off
        let crop_free = info.overlap == 0 || cell.is_single_cell;
        let residual_free = request.mirror.is_default()
            && request.rotation.is_none()
            && request.quality.is_noop()
            && request.format == tile_media_type;
        if crop_free && plan.is_identity_scale() && residual_free {
            debug!(tile = %path.display(), "Reusing pyramid tile verbatim");
            return Ok(Some(DeliveryPlan::TileReuse {
                path,
                media_type: tile_media_type,
                cell,
            }));
        }

        debug!(tile = %path.display(), "Transforming from pyramid tile");
        Ok(Some(DeliveryPlan::TileTransform {
            cell,
            task: TransformTask {
                source_path: path,
                source_media_type: tile_media_type,
                plan,
                mirror: request.mirror,
                rotation: request.rotation,
                quality: request.quality,
                output_media_type: request.format,
            },
        }))
    }

    fn plan_dynamic(&self, request: &TransformRequest) -> Result<DeliveryPlan, TransformError> {
        // Bound the worst case: decoding an arbitrarily large original
        let size = file_size(&request.source.filepath).map_err(|e| TransformError::Io {
            path: request.source.filepath.display().to_string(),
            message: e.to_string(),
        })?;
        if size > self.max_dynamic_bytes {
            return Err(TransformError::SourceTooLarge {
                path: request.source.filepath.display().to_string(),
                size,
                limit: self.max_dynamic_bytes,
            });
        }

        let plan = ExtractionPlan::for_region(
            request.region_rect(),
            request.size,
            (request.source.width, request.source.height),
        )?;

        Ok(DeliveryPlan::Dynamic {
            task: TransformTask {
                source_path: request.source.filepath.clone(),
                source_media_type: request.source.media_type,
                plan,
                mirror: request.mirror,
                rotation: request.rotation,
                quality: request.quality,
                output_media_type: request.format,
            },
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
