//! The pixel-processing backend seam.
//!
//! Backends are interchangeable implementations of the fixed transform
//! pipeline (crop, resample, mirror, rotate, quality filter, encode). Each
//! advertises its capabilities (which input/output media type pairs it
//! handles, and whether it can rotate by arbitrary angles) and the
//! [`BackendRegistry`] keeps them in preference order so the engine can fall
//! through from the fastest backend to the most capable one.

use std::path::PathBuf;

use bytes::Bytes;

use crate::error::TransformError;
use crate::iiif::{Mirror, Quality, Rotation};

use super::plan::ExtractionPlan;

// =============================================================================
// Transform Task
// =============================================================================

/// Everything a backend needs to produce output bytes.
///
/// The geometry is already reduced to an [`ExtractionPlan`]; backends apply
/// the remaining steps in the fixed pipeline order and encode the result.
#[derive(Debug, Clone)]
pub struct TransformTask {
    /// File to read pixels from (original, derivative, or pyramid tile)
    pub source_path: PathBuf,

    /// Media type of the source file
    pub source_media_type: &'static str,

    /// Crop + resample geometry
    pub plan: ExtractionPlan,

    /// Mirror step
    pub mirror: Mirror,

    /// Rotation step
    pub rotation: Rotation,

    /// Quality filter step
    pub quality: Quality,

    /// Media type to encode to
    pub output_media_type: &'static str,
}

impl TransformTask {
    /// Whether the task needs arbitrary-angle rotation support.
    pub fn needs_arbitrary_rotation(&self) -> bool {
        matches!(self.rotation, Rotation::Arbitrary(_))
    }
}

// =============================================================================
// Capabilities
// =============================================================================

/// What one backend can do.
///
/// A backend supports a task when it can decode the input media type, encode
/// the output media type, and (if the task rotates by a non-quarter angle)
/// rotate arbitrarily.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Media types the backend can decode
    pub inputs: Vec<&'static str>,

    /// Media types the backend can encode
    pub outputs: Vec<&'static str>,

    /// Whether non-quarter rotation angles are supported
    pub arbitrary_rotation: bool,
}

impl Capabilities {
    /// Whether this backend handles the given conversion pair.
    pub fn supports(&self, input: &str, output: &str) -> bool {
        self.inputs.contains(&input) && self.outputs.contains(&output)
    }

    /// Whether this backend can run the whole task.
    pub fn supports_task(&self, task: &TransformTask) -> bool {
        if task.needs_arbitrary_rotation() && !self.arbitrary_rotation {
            return false;
        }
        self.supports(task.source_media_type, task.output_media_type)
    }
}

// =============================================================================
// Backend trait
// =============================================================================

/// One pixel-processing implementation.
///
/// `transform` must be all-or-nothing: on any mid-pipeline failure it returns
/// an error and the engine tries the next backend; partial or corrupt output
/// is never handed back.
pub trait ImageBackend: Send + Sync {
    /// Short backend name, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// The backend's advertised capabilities.
    fn capabilities(&self) -> &Capabilities;

    /// Run the full pipeline and return the encoded bytes.
    fn transform(&self, task: &TransformTask) -> Result<Bytes, TransformError>;
}

// =============================================================================
// Registry
// =============================================================================

/// Ordered collection of backends, fastest and most restrictive first.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn ImageBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend at the end of the preference order.
    pub fn register(&mut self, backend: Box<dyn ImageBackend>) {
        self.backends.push(backend);
    }

    /// All backends in preference order.
    pub fn backends(&self) -> impl Iterator<Item = &dyn ImageBackend> {
        self.backends.iter().map(|b| b.as_ref())
    }

    /// Registered backend names, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Whether any registered backend handles the conversion pair.
    pub fn any_supports(&self, input: &str, output: &str) -> bool {
        self.backends
            .iter()
            .any(|b| b.capabilities().supports(input, output))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Backend stub with fixed capabilities and a canned response.
    pub struct StubBackend {
        pub name: &'static str,
        pub capabilities: Capabilities,
        pub response: Result<Vec<u8>, String>,
    }

    impl StubBackend {
        pub fn ok(name: &'static str, outputs: Vec<&'static str>, bytes: &[u8]) -> Self {
            Self {
                name,
                capabilities: Capabilities {
                    inputs: vec!["image/jpeg", "image/png"],
                    outputs,
                    arbitrary_rotation: false,
                },
                response: Ok(bytes.to_vec()),
            }
        }

        pub fn failing(name: &'static str, outputs: Vec<&'static str>) -> Self {
            Self {
                name,
                capabilities: Capabilities {
                    inputs: vec!["image/jpeg", "image/png"],
                    outputs,
                    arbitrary_rotation: false,
                },
                response: Err("simulated codec failure".to_string()),
            }
        }
    }

    impl ImageBackend for StubBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn capabilities(&self) -> &Capabilities {
            &self.capabilities
        }

        fn transform(&self, task: &TransformTask) -> Result<Bytes, TransformError> {
            match &self.response {
                Ok(bytes) => Ok(Bytes::from(bytes.clone())),
                Err(message) => Err(TransformError::BackendFailure {
                    backend: self.name,
                    path: task.source_path.display().to_string(),
                    message: message.clone(),
                }),
            }
        }
    }

    pub fn test_task(output: &'static str) -> TransformTask {
        TransformTask {
            source_path: PathBuf::from("/media/original/sample.jpg"),
            source_media_type: "image/jpeg",
            plan: ExtractionPlan::new(0, 0, 100, 100, 50, 50).unwrap(),
            mirror: Mirror::Default,
            rotation: Rotation::None,
            quality: Quality::Default,
            output_media_type: output,
        }
    }

    #[test]
    fn test_capability_pairs() {
        let caps = Capabilities {
            inputs: vec!["image/jpeg"],
            outputs: vec!["image/png", "image/webp"],
            arbitrary_rotation: false,
        };
        assert!(caps.supports("image/jpeg", "image/webp"));
        assert!(!caps.supports("image/png", "image/webp"));
        assert!(!caps.supports("image/jpeg", "image/jpeg"));
    }

    #[test]
    fn test_arbitrary_rotation_gates_tasks() {
        let caps = Capabilities {
            inputs: vec!["image/jpeg"],
            outputs: vec!["image/jpeg"],
            arbitrary_rotation: false,
        };

        let mut task = test_task("image/jpeg");
        assert!(caps.supports_task(&task));

        task.rotation = Rotation::Arbitrary(22.5);
        assert!(!caps.supports_task(&task));

        task.rotation = Rotation::Quarter(90);
        assert!(caps.supports_task(&task));
    }

    #[test]
    fn test_registry_order_and_lookup() {
        let mut registry = BackendRegistry::new();
        assert!(registry.is_empty());

        registry.register(Box::new(StubBackend::ok("first", vec!["image/jpeg"], b"x")));
        registry.register(Box::new(StubBackend::ok("second", vec!["image/webp"], b"y")));

        assert_eq!(registry.names(), vec!["first", "second"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.any_supports("image/jpeg", "image/webp"));
        assert!(!registry.any_supports("image/jpeg", "application/pdf"));
    }
}
