//! Texture loading for particle sprites.
//!
//! Decodes PNG/JPEG files into tightly packed RGBA8 pixels ready for upload.

use std::path::Path;

use lumen_common::ResourceLoadError;
use tracing::debug;

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long.
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Bytes per row of pixel data.
    #[must_use]
    pub const fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }
}

/// Load an image file and convert it to RGBA8.
pub fn load_texture_rgba<P: AsRef<Path>>(path: P) -> Result<TextureImage, ResourceLoadError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ResourceLoadError::NotFound(path.to_path_buf()));
    }

    let file_data = std::fs::read(path).map_err(|e| ResourceLoadError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let img = image::load_from_memory(&file_data).map_err(|e| ResourceLoadError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ResourceLoadError::Empty(path.to_path_buf()));
    }

    debug!("Loaded {}x{} texture from {}", width, height, path.display());

    Ok(TextureImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}
