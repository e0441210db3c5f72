//! End-to-end watermarking through the public API.

use bytes::Bytes;
use image::{Rgba, RgbaImage};
use std::sync::Arc;

use sukashi::codec;
use sukashi::{
    BlockShaper, ErrorMask, MimeType, PictureWatermark, ProcessRequest, TextWatermark,
    WatermarkProcessor, WatermarkSpec,
};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn processor() -> WatermarkProcessor {
    init_logging();
    WatermarkProcessor::new(Arc::new(BlockShaper))
}

fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Bytes {
    let image = RgbaImage::from_pixel(width, height, color);
    Bytes::from(codec::encode(&image, MimeType::Png).unwrap())
}

fn text_watermark(text: &str) -> WatermarkSpec {
    WatermarkSpec::Text(TextWatermark {
        text: Some(text.to_string()),
        font_size: Some(20.0),
        ..Default::default()
    })
}

#[tokio::test]
async fn styled_text_watermark_renders_over_png() {
    let base = png_bytes(200, 150, Rgba([255, 255, 255, 255]));
    let request = ProcessRequest::new(
        base,
        "image/png",
        WatermarkSpec::Text(TextWatermark {
            text: Some("DRAFT".to_string()),
            font_size: Some(24.0),
            color: Some("cc0000".to_string()),
            opacity: Some(0.8),
            font_decorations: Some("u".to_string()),
            rotation_angle: Some(-30.0),
            density_level: Some(4.0),
            ..Default::default()
        }),
    );

    let output = processor().process(request).await.unwrap();
    assert_eq!(output.mime, MimeType::Png);

    let decoded = codec::decode(&output.buffer, MimeType::Png).unwrap();
    assert_eq!(decoded.dimensions(), (200, 150));
    // Reddish ink must be present; the canvas must not be fully covered.
    assert!(decoded.pixels().any(|p| p[0] > 150 && p[1] < 150));
    assert!(decoded
        .pixels()
        .any(|p| p[0] == 255 && p[1] == 255 && p[2] == 255));
}

#[tokio::test]
async fn density_changes_coverage() {
    let coverage = |density: f64| async move {
        let base = png_bytes(300, 300, Rgba([255, 255, 255, 255]));
        let request = ProcessRequest::new(
            base,
            "image/png",
            WatermarkSpec::Text(TextWatermark {
                text: Some("X".to_string()),
                font_size: Some(16.0),
                density_level: Some(density),
                ..Default::default()
            }),
        );
        let output = processor().process(request).await.unwrap();
        let decoded = codec::decode(&output.buffer, MimeType::Png).unwrap();
        decoded.pixels().filter(|p| p[0] < 128).count()
    };

    let sparse = coverage(1.0).await;
    let dense = coverage(5.0).await;
    assert!(dense > sparse, "dense {} <= sparse {}", dense, sparse);
}

#[tokio::test]
async fn picture_watermark_over_jpeg_base() {
    let base_image = RgbaImage::from_pixel(120, 90, Rgba([240, 240, 240, 255]));
    let base = Bytes::from(codec::encode(&base_image, MimeType::Jpeg).unwrap());
    let mark = png_bytes(10, 10, Rgba([0, 0, 255, 255]));

    let request = ProcessRequest::new(
        base,
        "image/jpeg",
        WatermarkSpec::Picture(PictureWatermark {
            buffer: Some(mark),
            mime_type: Some("image/png".to_string()),
            opacity: Some(0.7),
            rotation_angle: Some(15.0),
            ..Default::default()
        }),
    );

    let output = processor().process(request).await.unwrap();
    assert_eq!(output.mime, MimeType::Jpeg);
    assert_eq!(&output.buffer[0..2], &[0xFF, 0xD8]);

    let decoded = codec::decode(&output.buffer, MimeType::Jpeg).unwrap();
    assert_eq!(decoded.dimensions(), (120, 90));
    assert!(decoded.pixels().any(|p| u16::from(p[2]) > u16::from(p[0]) + 30));
}

#[tokio::test]
async fn svg_watermark_over_png_base() {
    let base = png_bytes(100, 100, Rgba([255, 255, 255, 255]));
    let mark = Bytes::from_static(
        br##"<svg xmlns="http://www.w3.org/2000/svg" width="12" height="12">
            <circle cx="6" cy="6" r="6" fill="#008000"/>
        </svg>"##,
    );

    let request = ProcessRequest::new(
        base,
        "image/png",
        WatermarkSpec::Picture(PictureWatermark {
            buffer: Some(mark),
            mime_type: Some("image/svg+xml".to_string()),
            ..Default::default()
        }),
    );

    let output = processor().process(request).await.unwrap();
    let decoded = codec::decode(&output.buffer, MimeType::Png).unwrap();
    assert!(decoded.pixels().any(|p| p[1] > 100 && p[0] < 128));
}

#[tokio::test]
async fn svg_base_round_trips_as_svg_document() {
    let base = Bytes::from_static(
        br##"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="48">
            <rect width="64" height="48" fill="#eeeeee"/>
        </svg>"##,
    );
    let request = ProcessRequest::new(base, "image/svg+xml", text_watermark("HI"));

    let output = processor().process(request).await.unwrap();
    assert_eq!(output.mime, MimeType::Svg);

    let document = std::str::from_utf8(&output.buffer).unwrap();
    assert!(document.starts_with("<svg"));
    assert!(document.contains("width=\"64\""));

    // The embedded raster is itself a decodable SVG surface.
    let decoded = codec::decode(&output.buffer, MimeType::Svg).unwrap();
    assert_eq!(decoded.dimensions(), (64, 48));
}

#[tokio::test]
async fn structural_faults_combine_into_one_mask() {
    let request = ProcessRequest {
        buffer: None,
        mime_type: Some("image/webp".to_string()),
        watermark: Some(WatermarkSpec::Text(TextWatermark::default())),
    };

    let err = processor().process(request).await.unwrap_err();
    let mask = err.mask();
    assert!(mask.contains(ErrorMask::UNSUPPORTED_MIME_TYPE));
    assert!(mask.contains(ErrorMask::INVALID_BUFFER_TYPE));
    assert!(mask.contains(ErrorMask::INVALID_WATERMARK_TEXT_TYPE));
}

#[tokio::test]
async fn decode_failure_reported_after_validation_passes() {
    let request = ProcessRequest::new(
        Bytes::from_static(b"not a real png"),
        "image/png",
        text_watermark("HI"),
    );

    let err = processor().process(request).await.unwrap_err();
    assert_eq!(err.mask(), ErrorMask::IMAGE_DECODE_FAILED);
}

#[tokio::test]
async fn cosmetic_garbage_still_produces_output() {
    // Wrong-typed cosmetic fields resolve to defaults instead of failing.
    let watermark: WatermarkSpec = serde_json::from_value(serde_json::json!({
        "type": "text",
        "text": "OK",
        "fontSize": "gigantic",
        "color": "+12345",
        "opacity": 7,
        "densityLevel": "many",
        "rotationAngle": "sideways"
    }))
    .unwrap();

    let base = png_bytes(60, 60, Rgba([255, 255, 255, 255]));
    let request = ProcessRequest::new(base, "image/png", watermark);

    let output = processor().process(request).await.unwrap();
    let decoded = codec::decode(&output.buffer, MimeType::Png).unwrap();
    assert!(decoded.pixels().any(|p| p[0] < 128));
}
