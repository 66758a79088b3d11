use thiserror::Error;

/// Precondition violations reported by the capture session and catalog
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Capture session is not active")]
    NotActive,

    #[error("Resolution index {index} out of range ({available} available)")]
    ResolutionIndexOutOfRange { index: usize, available: usize },

    #[error("Camera index {index} out of range ({available} available)")]
    CameraIndexOutOfRange { index: usize, available: usize },

    #[error("Failed to open camera stream: {0}")]
    StreamOpen(#[source] anyhow::Error),
}
