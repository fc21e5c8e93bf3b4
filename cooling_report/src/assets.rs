//! Optional logo artwork for the page header.

use std::path::Path;

use image::DynamicImage;
use tracing::{debug, warn};

/// Decoded logo pixels, split into colour and alpha planes for embedding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogoImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    /// Present only when some pixel is not fully opaque.
    pub alpha: Option<Vec<u8>>,
}

impl LogoImage {
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = (width * height) as usize;
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let translucent = alpha.iter().any(|&a| a < u8::MAX);
        Self {
            width,
            height,
            rgb,
            alpha: translucent.then_some(alpha),
        }
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 {
            return 0.0;
        }
        self.height as f32 / self.width as f32
    }
}

/// Load the logo, or `None` when no path is set or it cannot be decoded.
/// A broken logo never fails the report.
pub fn load_logo(path: Option<&Path>) -> Option<LogoImage> {
    let path = path?;
    match image::open(path) {
        Ok(image) => {
            let logo = LogoImage::from_dynamic(&image);
            debug!("Loaded logo {} ({}x{})", path.display(), logo.width, logo.height);
            Some(logo)
        }
        Err(err) => {
            warn!("Logo {} unavailable, rendering without it: {err}", path.display());
            None
        }
    }
}
