//! End-to-end capture through the software rasterizer.

use std::sync::{Arc, Mutex};

use dmshot::capture::{CaptureOrchestrator, DirectoryDownloader, MemoryDownloader, Status};
use dmshot::platform::{get_config, PlatformId, Theme};
use dmshot::preview::{render_preview, ChatData, Message, Sender, PREVIEW_ID};
use dmshot::rendering::{Rasterizer, SoftwareRasterizer};
use dmshot::{CaptureConfig, CaptureOptions, CaptureTarget, Document, Error, ImageFormat};
use regex::Regex;

const FRAME: &str = r#"<html><head><style>
#frame { width: 375px; height: 600px; background-color: #fafafa }
p { font-size: 14px; color: #262626 }
</style></head><body>
<div id="frame"><p>first line of the conversation</p><p>second line</p></div>
</body></html>"#;

fn config(format: ImageFormat, quality: f32) -> CaptureConfig {
    CaptureConfig {
        options: CaptureOptions {
            format,
            quality,
            ..Default::default()
        },
        settle_delay_ms: 0,
        success_reset_ms: 0,
        error_reset_ms: 0,
        ..Default::default()
    }
}

fn frame_target() -> CaptureTarget {
    CaptureTarget::by_id(Document::parse(FRAME).into_shared(), "frame").unwrap()
}

#[tokio::test]
async fn scaled_png_of_fixed_frame() {
    let downloads = Arc::new(MemoryDownloader::new());
    let orch = CaptureOrchestrator::new(config(ImageFormat::Png, 1.0), downloads.clone()).unwrap();

    let result = orch.capture(&frame_target()).await.unwrap();
    assert_eq!((result.width, result.height), (750, 1200));
    assert_eq!(result.blob.mime_type, "image/png");
    assert!(result.data_url.starts_with("data:image/png;base64,"));

    let decoded = image::load_from_memory(&result.blob.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (750, 1200));
    assert_eq!(downloads.files().len(), 1);
}

#[tokio::test]
async fn jpeg_quality_shrinks_output() {
    let high = CaptureOrchestrator::new(config(ImageFormat::Jpeg, 1.0), Arc::new(MemoryDownloader::new()))
        .unwrap()
        .capture(&frame_target())
        .await
        .unwrap();
    let low = CaptureOrchestrator::new(config(ImageFormat::Jpeg, 0.5), Arc::new(MemoryDownloader::new()))
        .unwrap()
        .capture(&frame_target())
        .await
        .unwrap();
    assert_eq!(low.blob.mime_type, "image/jpeg");
    assert_eq!((low.width, low.height), (high.width, high.height));
    assert!(low.blob.len() < high.blob.len(), "{} >= {}", low.blob.len(), high.blob.len());
}

#[tokio::test]
async fn repeated_captures_are_identical() {
    let target = frame_target();
    let node = target.node.unwrap();
    let rasterizer = SoftwareRasterizer::new().unwrap();
    let options = config(ImageFormat::Png, 1.0).raster_options().unwrap();

    let a = rasterizer.rasterize(&target.document, node, &options).await.unwrap();
    let b = rasterizer.rasterize(&target.document, node, &options).await.unwrap();
    assert_eq!((a.width(), a.height()), (b.width(), b.height()));
    assert_eq!(a.digest(), b.digest());

    let orch = CaptureOrchestrator::new(config(ImageFormat::Png, 1.0), Arc::new(MemoryDownloader::new())).unwrap();
    let first = orch.capture(&target).await.unwrap();
    let second = orch.capture(&target).await.unwrap();
    assert_eq!(first.blob, second.blob);
}

#[tokio::test]
async fn detached_target_never_rasterizes() {
    let target = frame_target();
    let node = target.node.unwrap();
    target.document.lock().unwrap().detach(node);

    let mut orch = CaptureOrchestrator::new(config(ImageFormat::Png, 1.0), Arc::new(MemoryDownloader::new())).unwrap();
    let generating = Arc::new(Mutex::new(Vec::new()));
    let g = generating.clone();
    orch.on_generating(move |v| g.lock().unwrap().push(v));

    let err = orch.capture(&target).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "Element is not in the DOM");
    assert!(generating.lock().unwrap().is_empty());
    // zero error delay: already back to idle
    assert_eq!(orch.state().status(), Status::Idle);
}

#[tokio::test]
async fn readonly_style_fails_preparation() {
    let target = frame_target();
    let node = target.node.unwrap();
    target.document.lock().unwrap().get_mut(node).unwrap().style.set_readonly(true);

    let mut orch = CaptureOrchestrator::new(config(ImageFormat::Png, 1.0), Arc::new(MemoryDownloader::new())).unwrap();
    let generating = Arc::new(Mutex::new(Vec::new()));
    let g = generating.clone();
    orch.on_generating(move |v| g.lock().unwrap().push(v));

    let err = orch.capture(&target).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to prepare element: inline style is read-only");
    assert_eq!(*generating.lock().unwrap(), vec![true, false]);
    assert!(target.document.lock().unwrap().get(node).unwrap().style.is_empty());
}

#[tokio::test]
async fn preview_to_file() -> anyhow::Result<()> {
    let mut chat = ChatData::new("Alex");
    chat.push_message(Message::new(Sender::Contact, "are we still on for tonight?", chrono::Utc::now()));
    chat.push_message(Message::new(Sender::User, "yes! 8pm", chrono::Utc::now()));
    let html = render_preview(&chat, &get_config(PlatformId::WhatsApp), Theme::Dark);

    let document = Document::parse(&html).into_shared();
    let target = CaptureTarget::by_id(document, PREVIEW_ID)?;

    let dir = tempfile::tempdir()?;
    let mut cfg = config(ImageFormat::Png, 1.0);
    cfg.subject = Some("whatsapp".into());
    let orch = CaptureOrchestrator::new(cfg, Arc::new(DirectoryDownloader::new(dir.path())))?;
    let result = orch.capture(&target).await?;
    assert_eq!(result.width, 750);

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir.path())? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    assert_eq!(names.len(), 1);
    let pattern = Regex::new(r"^whatsapp-dm-screenshot-\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}\.png$")?;
    assert!(pattern.is_match(&names[0]), "{}", names[0]);

    let saved = std::fs::read(dir.path().join(&names[0]))?;
    assert_eq!(saved, result.blob.bytes);

    // dark WhatsApp background is painted in the corner
    let decoded = image::load_from_memory(&saved)?.to_rgba8();
    assert_eq!(decoded.get_pixel(0, 0).0, [0x0B, 0x14, 0x1A, 255]);
    Ok(())
}

#[test]
fn generated_filenames_match_pattern() {
    let pattern = Regex::new(r"^[A-Za-z0-9_-]+-dm-screenshot-\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}\.(png|jpeg|webp)$").unwrap();
    for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp] {
        for subject in [None, Some("tinder"), Some("  ../../etc  "), Some("")] {
            let name = dmshot::capture::screenshot_filename(subject, format);
            assert!(pattern.is_match(&name), "{}", name);
        }
    }
}
