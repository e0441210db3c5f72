//! Decoding and encoding of the supported image surfaces.
//!
//! PNG and JPEG go through the `image` crate. SVG bases are rasterized at
//! their intrinsic size with `usvg`/`resvg`, composited as pixels, and
//! re-wrapped on output as an SVG document embedding the raster.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};
use std::fmt;
use std::io::Cursor;

use crate::format::MimeType;

/// JPEG output quality (1-100).
const JPEG_QUALITY: u8 = 90;

/// Upper bound on either rasterized SVG dimension.
const MAX_SVG_DIMENSION: u32 = 16_384;

/// Errors from decoding or encoding an image surface.
#[derive(Debug, Clone)]
pub enum CodecError {
    /// Input bytes could not be decoded as the declared mime type.
    DecodeFailed { message: String },
    /// Encoding the composited pixels failed.
    EncodeFailed {
        format: &'static str,
        message: String,
    },
    /// Rasterizing the SVG would exceed the size limit.
    OversizedSurface { width: u32, height: u32 },
}

impl CodecError {
    pub fn decode_failed(message: impl Into<String>) -> Self {
        CodecError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: &'static str, message: impl Into<String>) -> Self {
        CodecError::EncodeFailed {
            format,
            message: message.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            CodecError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            CodecError::OversizedSurface { width, height } => {
                write!(
                    f,
                    "Surface {}x{} exceeds limit of {}x{}",
                    width, height, MAX_SVG_DIMENSION, MAX_SVG_DIMENSION
                )
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Decode an image buffer into straight-alpha RGBA pixels.
pub fn decode(bytes: &[u8], mime: MimeType) -> Result<RgbaImage, CodecError> {
    match mime {
        MimeType::Png => decode_raster(bytes, ImageFormat::Png),
        MimeType::Jpeg | MimeType::Jpg => decode_raster(bytes, ImageFormat::Jpeg),
        MimeType::Svg => decode_svg(bytes),
    }
}

fn decode_raster(bytes: &[u8], format: ImageFormat) -> Result<RgbaImage, CodecError> {
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CodecError::decode_failed(e.to_string()))?;
    Ok(decoded.to_rgba8())
}

/// Rasterize an SVG document at its intrinsic size.
fn decode_svg(bytes: &[u8]) -> Result<RgbaImage, CodecError> {
    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| CodecError::decode_failed(e.to_string()))?;

    let size = tree.size();
    let width = svg_dimension(size.width())?;
    let height = svg_dimension(size.height())?;
    if width > MAX_SVG_DIMENSION || height > MAX_SVG_DIMENSION {
        return Err(CodecError::OversizedSurface { width, height });
    }

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CodecError::decode_failed("failed to allocate svg pixmap"))?;

    let sx = width as f32 / size.width();
    let sy = height as f32 / size.height();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(sx, sy),
        &mut pixmap.as_mut(),
    );

    // tiny-skia pixels are premultiplied; the compositor wants straight alpha.
    let mut surface = RgbaImage::new(width, height);
    for (pixel, out) in pixmap.pixels().iter().zip(surface.pixels_mut()) {
        let straight = pixel.demultiply();
        *out = Rgba([
            straight.red(),
            straight.green(),
            straight.blue(),
            straight.alpha(),
        ]);
    }
    Ok(surface)
}

fn svg_dimension(value: f32) -> Result<u32, CodecError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CodecError::decode_failed("svg has invalid width/height"));
    }
    Ok((value.ceil() as u32).max(1))
}

/// Encode composited pixels back under the caller's mime type.
pub fn encode(image: &RgbaImage, mime: MimeType) -> Result<Vec<u8>, CodecError> {
    match mime {
        MimeType::Png => encode_png(image),
        MimeType::Jpeg | MimeType::Jpg => encode_jpeg(image),
        MimeType::Svg => encode_svg(image),
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CodecError> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder as _;

    let mut output = Cursor::new(Vec::new());
    PngEncoder::new(&mut output)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| CodecError::encode_failed("png", e.to_string()))?;
    Ok(output.into_inner())
}

fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>, CodecError> {
    use image::codecs::jpeg::JpegEncoder;
    use image::ImageEncoder as _;

    // JPEG carries no alpha. The base image covers the whole canvas so the
    // surface is already opaque; the channel is simply dropped.
    let rgb = rgba_to_rgb(image.as_raw());

    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY)
        .write_image(&rgb, image.width(), image.height(), image::ColorType::Rgb8)
        .map_err(|e| CodecError::encode_failed("jpeg", e.to_string()))?;
    Ok(output.into_inner())
}

/// Wrap the composited raster in an SVG document so the output stays under
/// the `image/svg+xml` mime type the caller sent.
fn encode_svg(image: &RgbaImage) -> Result<Vec<u8>, CodecError> {
    let png = encode_png(image)?;
    let payload = BASE64.encode(&png);
    let document = format!(
        concat!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" ",
            "xmlns:xlink=\"http://www.w3.org/1999/xlink\" ",
            "width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            "<image width=\"{w}\" height=\"{h}\" ",
            "xlink:href=\"data:image/png;base64,{data}\"/>",
            "</svg>"
        ),
        w = image.width(),
        h = image.height(),
        data = payload,
    );
    Ok(document.into_bytes())
}

fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn test_png_round_trip() {
        let original = checker(4, 3);
        let encoded = encode(&original, MimeType::Png).unwrap();
        assert_eq!(&encoded[0..4], &[0x89, 0x50, 0x4E, 0x47]);

        let decoded = decode(&encoded, MimeType::Png).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_jpeg_magic_bytes() {
        let encoded = encode(&checker(4, 4), MimeType::Jpeg).unwrap();
        assert_eq!(&encoded[0..2], &[0xFF, 0xD8]);

        let decoded = decode(&encoded, MimeType::Jpg).unwrap();
        assert_eq!(decoded.dimensions(), (4, 4));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode(b"not an image", MimeType::Png).is_err());
        assert!(decode(b"not an image", MimeType::Jpeg).is_err());
        assert!(decode(b"not an image", MimeType::Svg).is_err());
        assert!(decode(&[], MimeType::Png).is_err());
    }

    #[test]
    fn test_decode_wrong_format_fails() {
        // PNG bytes declared as JPEG must not decode by sniffing.
        let png = encode(&checker(2, 2), MimeType::Png).unwrap();
        assert!(decode(&png, MimeType::Jpeg).is_err());
    }

    #[test]
    fn test_decode_svg_intrinsic_size() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="8">
            <rect width="10" height="8" fill="#ff0000"/>
        </svg>"##;
        let decoded = decode(svg, MimeType::Svg).unwrap();
        assert_eq!(decoded.dimensions(), (10, 8));
        assert_eq!(*decoded.get_pixel(5, 4), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_decode_svg_transparency_is_straight_alpha() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4">
            <rect width="4" height="4" fill="#00ff00" fill-opacity="0.5"/>
        </svg>"##;
        let decoded = decode(svg, MimeType::Svg).unwrap();
        let pixel = decoded.get_pixel(1, 1);
        assert!(pixel[3] > 100 && pixel[3] < 155, "alpha {}", pixel[3]);
        assert!(pixel[1] > 200, "green {} should not be premultiplied", pixel[1]);
    }

    #[test]
    fn test_encode_svg_embeds_raster() {
        let encoded = encode(&checker(6, 5), MimeType::Svg).unwrap();
        let document = String::from_utf8(encoded).unwrap();
        assert!(document.starts_with("<svg"));
        assert!(document.contains("width=\"6\""));
        assert!(document.contains("height=\"5\""));
        assert!(document.contains("data:image/png;base64,"));
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let mut image = checker(2, 2);
        image.put_pixel(0, 0, Rgba([10, 20, 30, 0]));
        let encoded = encode(&image, MimeType::Jpg).unwrap();
        let decoded = decode(&encoded, MimeType::Jpg).unwrap();
        assert!(decoded.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_rgba_to_rgb_strips_every_fourth_byte() {
        let rgba = [255, 128, 64, 255, 0, 0, 0, 128];
        assert_eq!(rgba_to_rgb(&rgba), vec![255, 128, 64, 0, 0, 0]);
    }
}
