use crate::camera::CameraError;
use crate::device::BackendError;

/// Re-render failures. A failed render leaves the engine usable for the next one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("render requested before {0} upload")]
    NotReady(&'static str),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}
