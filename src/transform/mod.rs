//! Transform planning and execution.
//!
//! The planner decides *where* response bytes come from; the engine decides
//! *who* produces them:
//!
//! - [`plan`] - the validated crop + resample instruction
//! - [`backend`] - the [`ImageBackend`] trait, capabilities and registry
//! - [`raster`] - in-process backend on the `image` crate (preferred)
//! - [`magick`] - external ImageMagick fallback (most capable, slowest)
//! - [`engine`] - ordered capability fallback over the registry
//! - [`planner`] - passthrough / derivative / tile / dynamic decision
//!
//! # Pipeline order
//!
//! Every backend applies the same fixed step order: crop, resample, mirror,
//! rotate, quality filter, encode.

pub mod backend;
pub mod engine;
pub mod magick;
pub mod plan;
pub mod planner;
pub mod raster;

pub use backend::{BackendRegistry, Capabilities, ImageBackend, TransformTask};
pub use engine::TransformEngine;
pub use magick::MagickBackend;
pub use plan::ExtractionPlan;
pub use planner::{DeliveryPlan, TransformPlanner, DEFAULT_MAX_DYNAMIC_BYTES};
pub use raster::{RasterBackend, DEFAULT_JPEG_QUALITY};
