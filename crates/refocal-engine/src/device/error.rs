/// Failures of the headless rasterization backend.
///
/// Every variant carries a human-readable diagnostic; nothing here panics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("no usable GPU adapter: {0}")]
    NoAdapter(String),

    #[error("device request failed for every limit tier: {0}")]
    DeviceUnavailable(String),

    #[error("{stage} shader failed to compile:\n{log}")]
    ShaderCompile { stage: &'static str, log: String },

    #[error("program link failed: {0}")]
    ProgramLink(String),

    #[error("framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),

    #[error("empty upload: {0}")]
    EmptyUpload(&'static str),

    #[error("malformed upload: {0}")]
    InvalidGeometry(String),

    #[error("{what} exceeds device limit ({size} > {limit})")]
    LimitExceeded { what: &'static str, size: u64, limit: u64 },

    #[error("cannot draw without {0}")]
    MissingState(&'static str),

    #[error("draw failed: {0}")]
    Draw(String),

    #[error("readback failed: {0}")]
    Readback(String),
}
