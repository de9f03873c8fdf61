//! Remote image loading: CORS enforcement and the load timeout.

#![cfg(feature = "remote")]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use dmshot::capture::{CaptureOrchestrator, MemoryDownloader};
use dmshot::{CaptureConfig, CaptureTarget, Document, Error};
use tiny_http::{Header, Response, Server};

fn red_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Serves `/open.png` (CORS allowed), `/closed.png` (no CORS header) and
/// `/slow.png` (answers after two seconds). Each request gets its own
/// thread so a slow response does not hold up the others.
fn start_image_server() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    let png = red_png();
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let png = png.clone();
            std::thread::spawn(move || {
                let content_type: Header = "Content-Type: image/png".parse().unwrap();
                let allow: Header = "Access-Control-Allow-Origin: *".parse().unwrap();
                let url = request.url().to_string();
                let resp = Response::from_data(png).with_header(content_type);
                let resp = match url.as_str() {
                    "/open.png" => resp.with_header(allow),
                    "/slow.png" => {
                        std::thread::sleep(Duration::from_secs(2));
                        resp.with_header(allow)
                    }
                    _ => resp,
                };
                let _ = request.respond(resp);
            });
        }
    });
    format!("http://{}", addr)
}

fn target_with_image(src: &str) -> CaptureTarget {
    target_with_image_at(src, "https://app.example/chat/")
}

fn target_with_image_at(src: &str, base: &str) -> CaptureTarget {
    let html = format!(
        r#"<html><body><div id="t" style="width: 40px; height: 40px; background-color: #ffffff">
<img src="{}" width="20" height="20"></div></body></html>"#,
        src
    );
    let mut doc = Document::parse(&html);
    doc.set_base_url(url::Url::parse(base).unwrap());
    CaptureTarget::by_id(doc.into_shared(), "t").unwrap()
}

fn orchestrator(image_timeout_ms: u64) -> CaptureOrchestrator {
    let mut cfg = CaptureConfig {
        settle_delay_ms: 0,
        success_reset_ms: 0,
        error_reset_ms: 0,
        image_timeout_ms,
        ..Default::default()
    };
    cfg.options.scale = 1.0;
    CaptureOrchestrator::new(cfg, Arc::new(MemoryDownloader::new())).unwrap()
}

#[tokio::test]
async fn cors_allowed_image_is_painted() {
    let base = start_image_server();
    let target = target_with_image(&format!("{}/open.png", base));
    let result = orchestrator(5000).capture(&target).await.unwrap();

    let img = image::load_from_memory(&result.blob.bytes).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(30, 30).0, [255, 255, 255, 255]);
}

#[tokio::test]
async fn image_without_cors_header_fails_capture() {
    let base = start_image_server();
    let target = target_with_image(&format!("{}/closed.png", base));
    let err = orchestrator(5000).capture(&target).await.unwrap_err();
    assert!(matches!(err, Error::Rasterize(_)), "{:?}", err);
    assert!(err.to_string().contains("CORS"), "{}", err);
}

#[tokio::test]
async fn same_origin_image_needs_no_cors_header() {
    let base = start_image_server();
    let target = target_with_image_at("closed.png", &format!("{}/chat/", base));
    let result = orchestrator(5000).capture(&target).await.unwrap();

    let img = image::load_from_memory(&result.blob.bytes).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0, 255]);
}

#[tokio::test]
async fn slow_image_times_out() {
    let base = start_image_server();
    let target = target_with_image(&format!("{}/slow.png", base));
    let orch = orchestrator(200);
    let mut rx = orch.subscribe();

    let err = orch.capture(&target).await.unwrap_err();
    assert!(matches!(err, Error::RasterizeTimeout(200)), "{:?}", err);
    assert_eq!(err.to_string(), "Screenshot generation timed out after 200ms");

    // the attempt settled and, with no reset delay, is idle again
    assert!(!rx.borrow_and_update().status().is_busy());
}
