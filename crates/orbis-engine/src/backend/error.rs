use std::fmt;

use crate::material::TextureFormat;

/// Failure reported by a [`GraphicsBackend`](super::GraphicsBackend).
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Program source was rejected.
    Compile { label: String, message: String },
    /// Texture format not supported by the device.
    UnsupportedFormat(TextureFormat),
    /// Buffer or texture data could not be uploaded.
    Upload(String),
    /// Surface acquisition or presentation failed.
    Surface(String),
    OutOfMemory,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile { label, message } => write!(f, "program '{label}' failed to compile: {message}"),
            Self::UnsupportedFormat(format) => write!(f, "texture format {format:?} is not supported"),
            Self::Upload(msg) => write!(f, "upload failed: {msg}"),
            Self::Surface(msg) => write!(f, "surface error: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
        }
    }
}

impl std::error::Error for BackendError {}
