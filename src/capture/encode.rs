//! Bitmap to encoded buffer conversion.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::rendering::resources::encode_data_url;
use crate::rendering::BitmapSurface;
use crate::{Blob, CaptureResult, Error, ImageFormat, Result};

const BLOB_FAILED: &str = "Failed to generate screenshot blob";

fn unit_quality(quality: f32) -> f32 {
    if quality.is_nan() {
        1.0
    } else {
        quality.clamp(0.0, 1.0)
    }
}

/// JPEG quality for a `0.0..=1.0` input.
pub fn jpeg_quality(quality: f32) -> u8 {
    ((unit_quality(quality) * 100.0).round() as u8).clamp(1, 100)
}

/// libwebp quality factor (`0.0..=100.0`) for a `0.0..=1.0` input.
pub fn webp_quality(quality: f32) -> f32 {
    unit_quality(quality) * 100.0
}

/// Encode `surface` as `format`.
///
/// `quality` affects the lossy formats (JPEG and WebP); PNG ignores it.
pub fn encode(surface: &BitmapSurface, format: ImageFormat, quality: f32) -> Result<CaptureResult> {
    let (width, height) = (surface.width(), surface.height());
    if width == 0 || height == 0 {
        return Err(Error::Encode(BLOB_FAILED.into()));
    }

    let mut bytes = Vec::new();
    let written = match format {
        ImageFormat::Png => PngEncoder::new(&mut bytes)
            .write_image(surface.image().as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|e| e.to_string()),
        ImageFormat::Jpeg => {
            let flat = flatten_on_white(surface);
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality))
                .write_image(flat.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(|e| e.to_string())
        }
        ImageFormat::Webp => webp::Encoder::from_rgba(surface.image().as_raw(), width, height)
            .encode_simple(false, webp_quality(quality))
            .map(|encoded| bytes.extend_from_slice(&encoded))
            .map_err(|e| format!("{:?}", e)),
    };

    if let Err(e) = written {
        log::warn!("{} encoding failed: {}", format, e);
        return Err(Error::Encode(BLOB_FAILED.into()));
    }
    if bytes.is_empty() {
        return Err(Error::Encode(BLOB_FAILED.into()));
    }

    log::debug!("encoded {}x{} {} ({} bytes)", width, height, format, bytes.len());
    let data_url = encode_data_url(format.mime_type(), &bytes);
    Ok(CaptureResult {
        blob: Blob::new(format.mime_type(), bytes),
        data_url,
        width,
        height,
    })
}

fn flatten_on_white(surface: &BitmapSurface) -> RgbImage {
    let src = surface.image();
    RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let mix = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([mix(r), mix(g), mix(b)])
    })
}
