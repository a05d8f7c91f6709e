//! Errors reported at the GPU seam

use thiserror::Error;

/// Construction-time failures raised by a [`crate::RenderBackend`].
///
/// The `Renderer` never propagates these to draw callers; it logs them, marks
/// the affected resource invalid (id 0) and keeps the message for inspection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("shader compilation failed for {shader}: {log}")]
    ShaderCompilation { shader: String, log: String },

    #[error("shader link failed for {shader}: {log}")]
    ShaderLink { shader: String, log: String },

    #[error("texture creation failed ({width}x{height}): {reason}")]
    TextureCreation {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("invalid texture size {width}x{height}")]
    InvalidTextureSize { width: u32, height: u32 },

    #[error("surface error: {0}")]
    Surface(String),

    #[error("backend initialization failed: {0}")]
    Initialization(String),

    #[error("backend lost: {0}")]
    DeviceLost(String),
}

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, RenderError>;
