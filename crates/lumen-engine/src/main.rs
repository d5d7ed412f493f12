//! # Lumen
//!
//! Rain particle demo: a fixed pool of textured, billboarded quads falling
//! through a window.
//!
//! Controls: Arrow keys / WASD turn the camera, `B` toggles billboarding,
//! `P` pauses the simulation, Escape quits. Settings are read from
//! `lumen.toml` in the working directory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod camera;
mod config;
mod input;
mod renderer;
mod timing;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("lumen=info".parse()?))
        .init();

    info!("Lumen starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    app::run()?;

    info!("Lumen shutdown complete");
    Ok(())
}
