use criterion::{criterion_group, criterion_main, Criterion};

use dmshot::capture::encode;
use dmshot::platform::{get_config, PlatformId, Theme};
use dmshot::preview::{render_preview, ChatData, Message, Sender, PREVIEW_ID};
use dmshot::rendering::{RasterOptions, Rasterizer, SoftwareRasterizer};
use dmshot::{Document, ImageFormat};

fn sample_chat() -> ChatData {
    let mut chat = ChatData::new("Sam");
    let now = chrono::Utc::now();
    for i in 0..20 {
        let sender = if i % 2 == 0 { Sender::Contact } else { Sender::User };
        chat.push_message(Message::new(sender, format!("message number {} with a bit of text", i), now));
    }
    chat
}

fn bench_render_and_layout(c: &mut Criterion) {
    let chat = sample_chat();
    let config = get_config(PlatformId::Instagram);

    c.bench_function("render_preview_and_layout", |b| {
        b.iter(|| {
            let html = render_preview(&chat, &config, Theme::Light);
            let doc = Document::parse(&html);
            let root = doc.element_by_id(PREVIEW_ID).expect("preview root");
            doc.bounding_box(root).expect("layout box")
        })
    });
}

fn bench_rasterize_and_encode(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let html = render_preview(&sample_chat(), &get_config(PlatformId::WhatsApp), Theme::Dark);
    let doc = Document::parse(&html);
    let node = doc.element_by_id(PREVIEW_ID).expect("preview root");
    let doc = doc.into_shared();
    let rasterizer = SoftwareRasterizer::new().expect("rasterizer");
    let options = RasterOptions::default();

    c.bench_function("rasterize_preview_2x", |b| {
        b.iter(|| rt.block_on(rasterizer.rasterize(&doc, node, &options)).expect("rasterize"))
    });

    let surface = rt
        .block_on(rasterizer.rasterize(&doc, node, &options))
        .expect("rasterize");
    c.bench_function("encode_png", |b| {
        b.iter(|| encode(&surface, ImageFormat::Png, 1.0).expect("encode"))
    });
    c.bench_function("encode_jpeg_0_8", |b| {
        b.iter(|| encode(&surface, ImageFormat::Jpeg, 0.8).expect("encode"))
    });
}

criterion_group!(benches, bench_render_and_layout, bench_rasterize_and_encode);
criterion_main!(benches);
