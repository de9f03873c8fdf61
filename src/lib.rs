//! dmshot
//!
//! Capture pipeline for rendered direct-message previews: validate a node of
//! an in-process document, apply temporary capture styles, rasterize the
//! subtree, encode it and hand the result to a downloader.
//!
//! # Features
//!
//! - **remote** (default): load `http(s)` images with `reqwest`, honouring CORS
//! - **Software rasterizer**: block layout and painting onto an RGBA bitmap
//! - **Orchestrator**: progress reporting, callbacks and automatic reset
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dmshot::capture::{CaptureOrchestrator, DirectoryDownloader};
//! use dmshot::{CaptureConfig, CaptureTarget, Document};
//!
//! # async fn run() -> dmshot::Result<()> {
//! let html = r#"<html><body><div id="dm-preview" style="width: 375px">hi</div></body></html>"#;
//! let document = Document::parse(html).into_shared();
//! let target = CaptureTarget::by_id(document, "dm-preview")?;
//!
//! let downloader = Arc::new(DirectoryDownloader::new("./shots"));
//! let orchestrator = CaptureOrchestrator::new(CaptureConfig::default(), downloader)?;
//! let result = orchestrator.capture(&target).await?;
//! println!("{}x{} {}", result.width, result.height, result.blob.mime_type);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod capture;
pub mod dom;
pub mod error;
pub mod platform;
pub mod preview;
pub mod rendering;

pub use dom::{Document, NodeId, SharedDocument};
pub use error::{Error, Result};
pub use rendering::BitmapSurface;

/// Document viewport in CSS px
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    /// Whether `quality` has any effect on the encoded output.
    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::Webp)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(Error::Config(format!("unsupported image format '{}'", other))),
        }
    }
}

/// Per-capture output options
///
/// # Examples
///
/// ```
/// let opts = dmshot::CaptureOptions::default();
/// assert_eq!(opts.scale, 2.0);
/// assert_eq!(opts.format, dmshot::ImageFormat::Png);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Device-pixel multiplier
    pub scale: f32,
    /// Encoded format
    pub format: ImageFormat,
    /// Encoder quality in 0.0..=1.0 (lossy formats only)
    pub quality: f32,
    /// Output width in CSS px; defaults to the node's bounding box
    pub width: Option<f32>,
    /// Output height in CSS px; defaults to the node's bounding box
    pub height: Option<f32>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            format: ImageFormat::Png,
            quality: 1.0,
            width: None,
            height: None,
        }
    }
}

impl CaptureOptions {
    /// Quality clamped into range; NaN becomes 1.0.
    pub fn clamped_quality(&self) -> f32 {
        if self.quality.is_nan() {
            1.0
        } else {
            self.quality.clamp(0.0, 1.0)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::Config(format!("scale must be positive, got {}", self.scale)));
        }
        for (name, v) in [("width", self.width), ("height", self.height)] {
            if let Some(v) = v {
                if !(v.is_finite() && v > 0.0) {
                    return Err(Error::Config(format!("{} must be positive, got {}", name, v)));
                }
            }
        }
        Ok(())
    }
}

/// Configuration for a [`capture::CaptureOrchestrator`]
///
/// Timing fields are in milliseconds. The defaults match the behaviour of
/// the preview UI: a short settle delay before capture, a progress ticker
/// that never reaches 100 on its own, and status messages that clear after
/// a couple of seconds.
///
/// # Examples
///
/// ```
/// let cfg = dmshot::CaptureConfig::from_json_str(r#"{"settle_delay_ms": 0}"#).unwrap();
/// assert_eq!(cfg.settle_delay_ms, 0);
/// assert_eq!(cfg.success_reset_ms, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Output options
    pub options: CaptureOptions,
    /// Wait before rasterizing so pending layout settles
    pub settle_delay_ms: u64,
    /// Time spent in `success` before returning to idle
    pub success_reset_ms: u64,
    /// Time spent in `error` before returning to idle
    pub error_reset_ms: u64,
    /// Progress ticker period
    pub progress_interval_ms: u64,
    /// Progress added per tick
    pub progress_step: u8,
    /// Highest value the ticker may reach (must stay below 100)
    pub progress_cap: u8,
    /// Upper bound for loading every image in the subtree
    pub image_timeout_ms: u64,
    /// Colour painted under the captured subtree
    pub background: String,
    /// Name used as the filename prefix
    pub subject: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            options: CaptureOptions::default(),
            settle_delay_ms: 500,
            success_reset_ms: 2000,
            error_reset_ms: 3000,
            progress_interval_ms: 100,
            progress_step: 10,
            progress_cap: 90,
            image_timeout_ms: 15000,
            background: "#ffffff".to_string(),
            subject: None,
        }
    }
}

impl CaptureConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: CaptureConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        if self.progress_interval_ms == 0 {
            return Err(Error::Config("progress_interval_ms must be non-zero".into()));
        }
        if self.progress_step == 0 {
            return Err(Error::Config("progress_step must be non-zero".into()));
        }
        if self.progress_cap >= 100 {
            return Err(Error::Config(format!(
                "progress_cap must be below 100, got {}",
                self.progress_cap
            )));
        }
        self.background_color()?;
        Ok(())
    }

    pub fn background_color(&self) -> Result<dom::Rgba> {
        dom::Rgba::parse(&self.background)
            .ok_or_else(|| Error::Config(format!("invalid background colour '{}'", self.background)))
    }

    /// Raster options derived from this config.
    pub fn raster_options(&self) -> Result<rendering::RasterOptions> {
        Ok(rendering::RasterOptions {
            scale: self.options.scale,
            width: self.options.width,
            height: self.options.height,
            background: self.background_color()?,
            image_timeout: std::time::Duration::from_millis(self.image_timeout_ms),
        })
    }
}

/// Encoded image bytes with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Output of a successful capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    /// Encoded image
    pub blob: Blob,
    /// `data:` URL of the same bytes
    pub data_url: String,
    /// Output width in device pixels
    pub width: u32,
    /// Output height in device pixels
    pub height: u32,
}

/// What to capture: a shared document and a node inside it.
///
/// A `None` node models a reference that was never resolved; validation
/// reports it as not found.
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    pub document: SharedDocument,
    pub node: Option<NodeId>,
}

impl CaptureTarget {
    pub fn new(document: SharedDocument, node: Option<NodeId>) -> Self {
        Self { document, node }
    }

    /// Resolve `id` now. A missing id still yields a target so the failure
    /// surfaces through validation.
    pub fn by_id(document: SharedDocument, id: &str) -> Result<Self> {
        let node = document
            .lock()
            .map_err(|_| Error::Other("document lock poisoned".into()))?
            .element_by_id(id);
        Ok(Self { document, node })
    }
}
