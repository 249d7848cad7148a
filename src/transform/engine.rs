//! The transform engine: ordered capability fallback over backends.
//!
//! The engine never produces pixels itself. It asks each registered backend,
//! in preference order, whether it supports the task's conversion (and
//! rotation class), runs the first that does, and falls through to the next
//! on failure. A backend failure is logged but recoverable; only exhausting
//! the registry surfaces an error. Partial output cannot leak: backends
//! return complete byte buffers or errors, nothing in between.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::TransformError;

use super::backend::{BackendRegistry, TransformTask};

/// Capability-negotiated transform executor.
pub struct TransformEngine {
    registry: BackendRegistry,
}

impl TransformEngine {
    /// Create an engine over an ordered backend registry.
    pub fn new(registry: BackendRegistry) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Run the task on the first capable backend, falling through on
    /// failure.
    ///
    /// # Errors
    ///
    /// `UnsupportedConversion` when no registered backend advertises the
    /// task's conversion pair (surfaced as 501 by the server); otherwise the
    /// last backend's failure when every capable backend errored.
    pub fn transform(&self, task: &TransformTask) -> Result<Bytes, TransformError> {
        let mut last_failure: Option<TransformError> = None;

        for backend in self.registry.backends() {
            if !backend.capabilities().supports_task(task) {
                continue;
            }

            debug!(
                backend = backend.name(),
                source = %task.source_path.display(),
                output = task.output_media_type,
                "Running transform"
            );

            match backend.transform(task) {
                Ok(bytes) if bytes.is_empty() => {
                    // A backend must not claim success with nothing to show
                    let error = TransformError::EmptyOutput {
                        backend: backend.name(),
                        path: task.source_path.display().to_string(),
                    };
                    warn!(backend = backend.name(), "{error}");
                    last_failure = Some(error);
                }
                Ok(bytes) => return Ok(bytes),
                Err(error) => {
                    warn!(
                        backend = backend.name(),
                        source = %task.source_path.display(),
                        "Backend failed, trying next: {error}"
                    );
                    last_failure = Some(error);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| TransformError::UnsupportedConversion {
            input: task.source_media_type.to_string(),
            output: task.output_media_type.to_string(),
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================
