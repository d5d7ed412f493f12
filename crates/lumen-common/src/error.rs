//! Error types for Lumen.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for Lumen operations.
#[derive(Debug, Error)]
pub enum LumenError {
    /// A resource (texture) could not be loaded
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceLoadError),

    /// GPU-related errors
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to load an on-disk resource.
#[derive(Debug, Error)]
pub enum ResourceLoadError {
    /// File does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File exists but could not be read or decoded
    #[error("Failed to decode {}: {message}", path.display())]
    Decode {
        /// Path of the offending file
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// Decoded image has no pixels
    #[error("Image has zero size: {}", .0.display())]
    Empty(PathBuf),
}

/// Graphics resource errors.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Buffer allocation failed
    #[error("Buffer allocation failed: {0}")]
    BufferAlloc(String),

    /// Texture creation or upload failed
    #[error("Texture upload failed: {0}")]
    TextureUpload(String),

    /// Texture handle not known to the backend
    #[error("Unknown texture handle {0}")]
    UnknownTexture(u32),

    /// Mesh handle not known to the backend
    #[error("Unknown mesh handle {0}")]
    UnknownMesh(u32),

    /// Value type does not match what the uniform slot accepts
    #[error("Uniform `{uniform}` does not accept a {value} value")]
    UniformMismatch {
        /// Uniform name
        uniform: &'static str,
        /// Kind of value that was supplied
        value: &'static str,
    },

    /// A draw was issued before any texture was bound
    #[error("No texture bound for draw")]
    MissingTexture,
}

/// Result type alias for Lumen operations.
pub type LumenResult<T> = Result<T, LumenError>;
