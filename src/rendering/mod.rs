//! Rendering: layout, paint list, resource loading and rasterization.

pub mod layout;
pub mod paint;
pub mod raster;
pub mod resources;

use image::RgbaImage;
use sha2::{Digest, Sha256};

pub use raster::{RasterOptions, Rasterizer, SoftwareRasterizer};
pub use resources::{DefaultResourceLoader, ResourceLoader, ResourceRequest};

/// In-memory RGBA pixel buffer produced by a rasterizer, pre-encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapSurface {
    image: RgbaImage,
}

impl BitmapSurface {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Transparent surface, used by tests and custom rasterizers.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Hex SHA-256 of dimensions and pixels; stable across runs for static
    /// content.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width().to_le_bytes());
        hasher.update(self.height().to_le_bytes());
        hasher.update(self.image.as_raw());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_surface_dimensions() {
        let s = BitmapSurface::blank(128, 64);
        assert_eq!(s.width(), 128);
        assert_eq!(s.height(), 64);
    }

    #[test]
    fn digest_depends_on_shape() {
        let a = BitmapSurface::blank(4, 2);
        let b = BitmapSurface::blank(2, 4);
        assert_eq!(a.digest(), BitmapSurface::blank(4, 2).digest());
        assert_ne!(a.digest(), b.digest());
    }
}
