//! Building requests from JSON bodies and attached buffers.

use bytes::Bytes;
use image::{Rgba, RgbaImage};
use serde_json::json;
use std::sync::Arc;

use sukashi::codec;
use sukashi::{
    BlockShaper, ErrorMask, MimeType, ProcessRequest, WatermarkProcessor, WatermarkSpec,
};

fn png_bytes(width: u32, height: u32) -> Bytes {
    let image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    Bytes::from(codec::encode(&image, MimeType::Png).unwrap())
}

#[tokio::test]
async fn json_text_request_processes() {
    let request = ProcessRequest::from_json(&json!({
        "mimeType": "image/png",
        "watermark": {
            "type": "text",
            "text": "HI",
            "fontSize": 18,
            "densityLevel": 2
        }
    }))
    .unwrap()
    .with_buffer(png_bytes(90, 90));

    let processor = WatermarkProcessor::new(Arc::new(BlockShaper));
    let output = processor.process(request).await.unwrap();
    assert_eq!(output.mime, MimeType::Png);
}

#[tokio::test]
async fn json_picture_request_carries_watermark_buffer() {
    let request = ProcessRequest::from_json(&json!({
        "mimeType": "image/png",
        "watermark": {
            "type": "picture",
            "mimeType": "image/png",
            "opacity": 0.4
        }
    }))
    .unwrap()
    .with_buffer(png_bytes(80, 80))
    .with_watermark_buffer(png_bytes(8, 8));

    assert!(matches!(
        request.watermark,
        Some(WatermarkSpec::Picture(_))
    ));

    let processor = WatermarkProcessor::new(Arc::new(BlockShaper));
    assert!(processor.process(request).await.is_ok());
}

#[test]
fn non_object_body_is_a_params_fault() {
    let err = ProcessRequest::from_json(&json!(["not", "an", "object"])).unwrap_err();
    assert!(err.contains(ErrorMask::INVALID_PARAMS_TYPE));
}

#[tokio::test]
async fn unknown_watermark_variant_is_a_description_fault() {
    // A watermark whose "type" tag matches neither variant fails to parse
    // and is reported as a missing description.
    let request = ProcessRequest::from_json(&json!({
        "mimeType": "image/png",
        "watermark": { "type": "hologram" }
    }))
    .unwrap()
    .with_buffer(png_bytes(10, 10));

    let processor = WatermarkProcessor::new(Arc::new(BlockShaper));
    let err = processor.process(request).await.unwrap_err();
    assert!(err
        .mask()
        .contains(ErrorMask::INVALID_WATERMARK_DESCRIPTION_TYPE));
}
