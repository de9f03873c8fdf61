/// Rasterization of a document subtree onto an RGBA bitmap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{Rgba as Pixel, RgbaImage};

use crate::dom::{NodeId, Rgba, SharedDocument};
use crate::rendering::paint::{self, PaintCommand};
use crate::rendering::resources::{DefaultResourceLoader, ResourceLoader, ResourceRequest};
use crate::rendering::BitmapSurface;
use crate::{Error, Result};

/// Largest surface side in device pixels.
pub const MAX_CANVAS_SIDE: u32 = 32_767;
/// Largest surface area in device pixels.
pub const MAX_CANVAS_AREA: u64 = 268_435_456;

/// Options passed to a [`Rasterizer`] for one capture.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Device-pixel multiplier
    pub scale: f32,
    /// Explicit output width in CSS px (defaults to the node's border box)
    pub width: Option<f32>,
    /// Explicit output height in CSS px
    pub height: Option<f32>,
    /// Colour painted under the subtree
    pub background: Rgba,
    /// Upper bound for loading every referenced resource
    pub image_timeout: Duration,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            width: None,
            height: None,
            background: Rgba::WHITE,
            image_timeout: Duration::from_millis(15000),
        }
    }
}

/// Paints a document subtree into a bitmap.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(
        &self,
        document: &SharedDocument,
        node: NodeId,
        options: &RasterOptions,
    ) -> Result<BitmapSurface>;
}

/// Built-in CPU rasterizer.
///
/// Layout and display-list building happen under the document lock, image
/// loading happens without it, and painting runs on the blocking pool.
pub struct SoftwareRasterizer {
    loader: Arc<dyn ResourceLoader>,
}

impl SoftwareRasterizer {
    pub fn new() -> Result<Self> {
        Ok(Self::with_loader(Arc::new(DefaultResourceLoader::new()?)))
    }

    pub fn with_loader(loader: Arc<dyn ResourceLoader>) -> Self {
        Self { loader }
    }

    async fn load_images(
        &self,
        requests: Vec<(String, ResourceRequest)>,
    ) -> Result<Vec<(String, RgbaImage)>> {
        let loads = requests.into_iter().map(|(src, req)| {
            let loader = Arc::clone(&self.loader);
            async move {
                let bytes = loader.load(&req).await?;
                let decoded = image::load_from_memory(&bytes)
                    .map_err(|e| Error::Resource(format!("{}: {}", src, e)))?;
                Ok::<_, Error>((src, decoded.to_rgba8()))
            }
        });
        futures::future::join_all(loads).await.into_iter().collect()
    }
}

#[async_trait]
impl Rasterizer for SoftwareRasterizer {
    async fn rasterize(
        &self,
        document: &SharedDocument,
        node: NodeId,
        options: &RasterOptions,
    ) -> Result<BitmapSurface> {
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(Error::Rasterize(format!("invalid scale {}", options.scale)));
        }

        let (commands, css_width, css_height, requests) = {
            let doc = document
                .lock()
                .map_err(|_| Error::Rasterize("document lock poisoned".into()))?;
            let tree = doc.layout();
            let target = tree
                .find(node)
                .ok_or_else(|| Error::Rasterize("target produced no layout box".into()))?;
            let commands = paint::build_display_list(target);
            let width = options.width.unwrap_or(target.rect.width);
            let height = options.height.unwrap_or(target.rect.height);
            let mut requests = Vec::new();
            for src in paint::image_sources(&commands) {
                let req = ResourceRequest::resolve(&src, doc.base_url())
                    .map_err(|e| Error::Rasterize(e.to_string()))?;
                requests.push((src, req));
            }
            (commands, width, height, requests)
        };

        let px_width = (css_width * options.scale).round();
        let px_height = (css_height * options.scale).round();
        if !(px_width >= 1.0 && px_height >= 1.0) {
            return Err(Error::Rasterize("target has no paintable area".into()));
        }
        check_canvas_size(px_width, px_height)?;
        for cmd in &commands {
            if let PaintCommand::Image { width, height, .. } = cmd {
                check_canvas_size(
                    (width * options.scale).round().max(1.0),
                    (height * options.scale).round().max(1.0),
                )?;
            }
        }

        log::debug!(
            "rasterizing {} commands at {}x{} ({} images)",
            commands.len(),
            px_width,
            px_height,
            requests.len()
        );

        let timeout_ms = options.image_timeout.as_millis() as u64;
        let images = match tokio::time::timeout(options.image_timeout, self.load_images(requests)).await {
            Ok(loaded) => loaded.map_err(|e| Error::Rasterize(e.to_string()))?,
            Err(_) => {
                log::warn!("resource loading exceeded {}ms", timeout_ms);
                return Err(Error::RasterizeTimeout(timeout_ms));
            }
        };

        let scale = options.scale;
        let background = options.background;
        let (w, h) = (px_width as u32, px_height as u32);
        tokio::task::spawn_blocking(move || {
            let mut canvas = RgbaImage::from_pixel(w, h, Pixel(background.to_array()));
            for cmd in &commands {
                paint_command(&mut canvas, cmd, scale, &images);
            }
            BitmapSurface::new(canvas)
        })
        .await
        .map_err(|e| Error::Rasterize(format!("paint task failed: {}", e)))
    }
}

/// Rejects surfaces a browser canvas would refuse before anything is allocated.
fn check_canvas_size(px_width: f32, px_height: f32) -> Result<()> {
    let side = MAX_CANVAS_SIDE as f32;
    if !(px_width <= side && px_height <= side)
        || (px_width as u64) * (px_height as u64) > MAX_CANVAS_AREA
    {
        log::warn!("refusing {}x{} surface", px_width, px_height);
        return Err(Error::Rasterize("target exceeds maximum canvas size".into()));
    }
    Ok(())
}

fn paint_command(canvas: &mut RgbaImage, cmd: &PaintCommand, scale: f32, images: &[(String, RgbaImage)]) {
    match cmd {
        PaintCommand::SolidRect {
            x,
            y,
            width,
            height,
            rgba,
        } => fill_rect(canvas, *x * scale, *y * scale, *width * scale, *height * scale, *rgba),
        PaintCommand::Text {
            x,
            y,
            text,
            font_size,
            line_height,
            rgba,
        } => {
            // Block glyphs: one box per visible character on the text baseline
            let advance = font_size * 0.6;
            let glyph_top = y + (line_height - font_size * 0.7) / 2.0;
            for (i, ch) in text.chars().enumerate() {
                if ch.is_whitespace() {
                    continue;
                }
                let gx = x + i as f32 * advance + advance * 0.1;
                fill_rect(
                    canvas,
                    gx * scale,
                    glyph_top * scale,
                    advance * 0.8 * scale,
                    font_size * 0.7 * scale,
                    *rgba,
                );
            }
        }
        PaintCommand::Image {
            x,
            y,
            width,
            height,
            src,
            opacity,
        } => {
            let Some((_, img)) = images.iter().find(|(s, _)| s == src) else {
                return;
            };
            let w = (width * scale).round().max(1.0) as u32;
            let h = (height * scale).round().max(1.0) as u32;
            let mut resized = imageops::resize(img, w, h, FilterType::Triangle);
            if *opacity < 1.0 {
                for p in resized.pixels_mut() {
                    p.0[3] = (f32::from(p.0[3]) * opacity).round() as u8;
                }
            }
            imageops::overlay(
                canvas,
                &resized,
                (x * scale).round() as i64,
                (y * scale).round() as i64,
            );
        }
    }
}

/// Source-over fill of a rectangle, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
    if color.a == 0 || width <= 0.0 || height <= 0.0 {
        return;
    }
    let (cw, ch) = (canvas.width() as f32, canvas.height() as f32);
    let x0 = x.round().clamp(0.0, cw) as u32;
    let y0 = y.round().clamp(0.0, ch) as u32;
    let x1 = (x + width).round().clamp(0.0, cw) as u32;
    let y1 = (y + height).round().clamp(0.0, ch) as u32;
    for py in y0..y1 {
        for px in x0..x1 {
            let dst = canvas.get_pixel_mut(px, py);
            *dst = blend(*dst, color);
        }
    }
}

fn blend(dst: Pixel<u8>, src: Rgba) -> Pixel<u8> {
    if src.a == 255 {
        return Pixel(src.to_array());
    }
    let sa = f32::from(src.a) / 255.0;
    let da = f32::from(dst.0[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Pixel([0, 0, 0, 0]);
    }
    let mix = |s: u8, d: u8| {
        ((f32::from(s) * sa + f32::from(d) * da * (1.0 - sa)) / out_a).round() as u8
    };
    Pixel([
        mix(src.r, dst.0[0]),
        mix(src.g, dst.0[1]),
        mix(src.b, dst.0[2]),
        (out_a * 255.0).round() as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    const FRAME: &str = r#"<html><body><div id="frame" style="width: 100px; height: 50px; background-color: #0000ff">
<p style="color: #000">two</p><p>lines</p></div></body></html>"#;

    #[tokio::test]
    async fn surface_is_scaled_border_box() {
        let doc = Document::parse(FRAME).into_shared();
        let node = doc.lock().unwrap().element_by_id("frame").unwrap();
        let r = SoftwareRasterizer::new().unwrap();
        let surface = r
            .rasterize(&doc, node, &RasterOptions { scale: 2.0, ..Default::default() })
            .await
            .unwrap();
        assert_eq!((surface.width(), surface.height()), (200, 100));
        // corner is the blue background, some glyph pixels are black
        assert_eq!(surface.image().get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert!(surface.image().pixels().any(|p| p.0 == [0, 0, 0, 255]));
    }

    #[tokio::test]
    async fn explicit_bounds_override_natural_size() {
        let doc = Document::parse(FRAME).into_shared();
        let node = doc.lock().unwrap().element_by_id("frame").unwrap();
        let r = SoftwareRasterizer::new().unwrap();
        let opts = RasterOptions {
            scale: 1.0,
            width: Some(40.0),
            height: Some(30.0),
            ..Default::default()
        };
        let surface = r.rasterize(&doc, node, &opts).await.unwrap();
        assert_eq!((surface.width(), surface.height()), (40, 30));
    }

    #[tokio::test]
    async fn broken_image_fails_the_capture() {
        let html = r#"<html><body><div id="t" style="width: 10px; height: 10px">
<img src="data:image/png;base64,AAAA" width="4" height="4"></div></body></html>"#;
        let doc = Document::parse(html).into_shared();
        let node = doc.lock().unwrap().element_by_id("t").unwrap();
        let r = SoftwareRasterizer::new().unwrap();
        let err = r.rasterize(&doc, node, &RasterOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Rasterize(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn oversized_target_is_refused() {
        let html = r#"<html><body><div id="t" style="width: 100000000px; height: 100px"></div></body></html>"#;
        let doc = Document::parse(html).into_shared();
        let node = doc.lock().unwrap().element_by_id("t").unwrap();
        let r = SoftwareRasterizer::new().unwrap();
        let err = r.rasterize(&doc, node, &RasterOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::Rasterize(_)), "{:?}", err);
        assert!(err.to_string().contains("maximum canvas size"), "{}", err);

        // each side fits but the area does not
        let opts = RasterOptions {
            scale: 1.0,
            width: Some(30_000.0),
            height: Some(30_000.0),
            ..Default::default()
        };
        let err = r.rasterize(&doc, node, &opts).await.unwrap_err();
        assert!(matches!(err, Error::Rasterize(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn oversized_image_is_refused_before_resizing() {
        let png = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";
        let html = format!(
            r#"<html><body><div id="t" style="width: 10px; height: 10px">
<img src="data:image/png;base64,{}" width="50000" height="4"></div></body></html>"#,
            png
        );
        let doc = Document::parse(&html).into_shared();
        let node = doc.lock().unwrap().element_by_id("t").unwrap();
        let r = SoftwareRasterizer::new().unwrap();
        let opts = RasterOptions { scale: 1.0, width: Some(10.0), height: Some(10.0), ..Default::default() };
        let err = r.rasterize(&doc, node, &opts).await.unwrap_err();
        assert!(err.to_string().contains("maximum canvas size"), "{}", err);
    }

    #[test]
    fn blend_half_alpha_over_white() {
        let out = blend(Pixel([255, 255, 255, 255]), Rgba { r: 0, g: 0, b: 0, a: 128 });
        assert_eq!(out.0[3], 255);
        assert!(out.0[0] > 120 && out.0[0] < 135);
    }
}
