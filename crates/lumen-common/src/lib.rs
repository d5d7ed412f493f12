//! # Lumen Common
//!
//! Shared error taxonomy for the Lumen particle demo.
//!
//! - [`ResourceLoadError`]: texture files that cannot be found or decoded
//! - [`GpuError`]: graphics resource failures (allocation, upload, unknown handles)
//! - [`LumenError`]: umbrella error returned by fallible kernel operations

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
}

pub use prelude::*;
