//! Watermark stamp rendering.
//!
//! A stamp is the single tile repeated across the canvas: a text line with
//! its shadow, fill, stroke, and decoration layers, or a picture with its
//! opacity applied. The stamp is rendered once per request in its own
//! coordinate space, rotated once, and then blitted at every tile position.

use image::{imageops, GrayImage, Rgba, RgbaImage};

use crate::compositor::blend_pixels;
use crate::fonts::{FontError, TextShaper};
use crate::geometry::normalize_degrees;
use crate::params::{ResolvedPicture, ResolvedText};
use crate::tiling::TileAnchor;

/// A rendered watermark tile.
#[derive(Debug, Clone)]
pub struct Stamp {
    pub image: RgbaImage,
    /// How tile offsets address this stamp.
    pub anchor: TileAnchor,
    /// The anchor point's position inside `image`.
    pub anchor_x: f64,
    pub anchor_y: f64,
    /// Logical footprint used for grid computation. Smaller than the image
    /// when shadow or stroke padding extends past the glyph box.
    pub item_width: f64,
    pub item_height: f64,
}

/// Render a text watermark stamp.
///
/// Layers are painted back to front the way a canvas draws them: shadow,
/// fill, stroke outline, then decoration bars. The anchor is the left end of
/// the baseline.
pub fn text_stamp(params: &ResolvedText, shaper: &dyn TextShaper) -> Result<Stamp, FontError> {
    let coverage = shaper.rasterize(&params.text, &params.font)?;
    let metrics = coverage.metrics;
    let decoration_height = (metrics.height() / 10.0).max(1.0);

    let mask_width = coverage.mask.width() as i64;
    let mask_height = coverage.mask.height() as i64;

    // An underline can dip below the glyph box.
    let underline_bottom = (metrics.ascent + 2.0 * decoration_height).ceil() as i64;
    let content_width = mask_width;
    let content_height = mask_height.max(underline_bottom);

    let shadow = params.shadow;
    let shadow_visible = !shadow.is_invisible();
    let blur = if shadow_visible {
        shadow.blur_radius as i64
    } else {
        0
    };
    let (shadow_dx, shadow_dy) = if shadow_visible {
        (shadow.offset_x as i64, shadow.offset_y as i64)
    } else {
        (0, 0)
    };
    let stroke_pad: i64 = if params.stroke[3] > 0 { 1 } else { 0 };

    let pad_left = stroke_pad + blur + (-shadow_dx).max(0);
    let pad_top = stroke_pad + blur + (-shadow_dy).max(0);
    let pad_right = stroke_pad + blur + shadow_dx.max(0);
    let pad_bottom = stroke_pad + blur + shadow_dy.max(0);

    let width = (content_width + pad_left + pad_right).max(1) as u32;
    let height = (content_height + pad_top + pad_bottom).max(1) as u32;
    let mut image = RgbaImage::new(width, height);

    let baseline = pad_top as f64 + metrics.ascent;
    let underline_top = (baseline + decoration_height).round() as i64;
    let line_through_top = (baseline - metrics.height() / 2.0).round() as i64;
    let bar_height = decoration_height.round().max(1.0) as i64;

    if shadow_visible {
        // The shadow layer gets every shape the ink layers paint, at the
        // shadow offset, then a single blur pass.
        let mut layer = RgbaImage::from_pixel(
            width,
            height,
            Rgba([shadow.color[0], shadow.color[1], shadow.color[2], 0]),
        );
        stamp_alpha(
            &mut layer,
            &coverage.mask,
            pad_left + shadow_dx,
            pad_top + shadow_dy,
            shadow.color[3],
        );
        if params.underline {
            fill_rect_alpha(
                &mut layer,
                pad_left + shadow_dx,
                underline_top + shadow_dy,
                content_width,
                bar_height,
                shadow.color[3],
            );
        }
        if params.line_through {
            fill_rect_alpha(
                &mut layer,
                pad_left + shadow_dx,
                line_through_top + shadow_dy,
                content_width,
                bar_height,
                shadow.color[3],
            );
        }
        if blur > 0 {
            layer = imageops::blur(&layer, blur as f32 / 2.0);
        }
        blend_over(&mut image, &layer);
    }

    paint_mask(&mut image, &coverage.mask, pad_left, pad_top, params.fill);

    if params.stroke[3] > 0 {
        let ring = edge_ring(&coverage.mask);
        paint_mask(&mut image, &ring, pad_left - 1, pad_top - 1, params.stroke);
    }

    if params.underline {
        fill_rect(
            &mut image,
            pad_left,
            underline_top,
            content_width,
            bar_height,
            params.fill,
        );
    }
    if params.line_through {
        fill_rect(
            &mut image,
            pad_left,
            line_through_top,
            content_width,
            bar_height,
            params.fill,
        );
    }

    Ok(Stamp {
        image,
        anchor: TileAnchor::Baseline,
        anchor_x: pad_left as f64,
        anchor_y: baseline,
        item_width: metrics.width,
        item_height: metrics.height(),
    })
}

/// Render a picture watermark stamp. The configured opacity multiplies the
/// image's own alpha channel.
pub fn picture_stamp(mut image: RgbaImage, params: &ResolvedPicture) -> Stamp {
    let opacity = params.opacity.clamp(0.0, 1.0);
    if opacity < 1.0 {
        for pixel in image.pixels_mut() {
            pixel[3] = (pixel[3] as f64 * opacity).round() as u8;
        }
    }

    let (width, height) = image.dimensions();
    Stamp {
        image,
        anchor: TileAnchor::TopLeft,
        anchor_x: 0.0,
        anchor_y: 0.0,
        item_width: width as f64,
        item_height: height as f64,
    }
}

/// Rotate an image about its center, expanding the canvas to the rotated
/// bounding box. Sampling is bilinear with transparent fill.
pub fn rotate_image(image: &RgbaImage, degrees: f64) -> RgbaImage {
    if normalize_degrees(degrees) == 0.0 {
        return image.clone();
    }

    let radians = degrees.to_radians();
    let cos = radians.cos() as f32;
    let sin = radians.sin() as f32;

    let src_w = image.width() as f32;
    let src_h = image.height() as f32;
    let cx = src_w / 2.0;
    let cy = src_h / 2.0;

    let dst_w = ((src_w * cos.abs() + src_h * sin.abs()).ceil() as u32).max(1);
    let dst_h = ((src_h * cos.abs() + src_w * sin.abs()).ceil() as u32).max(1);

    let mut rotated = RgbaImage::new(dst_w, dst_h);
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let rx = dx as f32 - dst_cx;
            let ry = dy as f32 - dst_cy;

            // Inverse mapping back into the source image.
            let sx = rx * cos + ry * sin + cx;
            let sy = -rx * sin + ry * cos + cy;

            if sx >= 0.0 && sx < src_w - 1.0 && sy >= 0.0 && sy < src_h - 1.0 {
                let x0 = sx.floor() as u32;
                let y0 = sy.floor() as u32;
                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;

                let p00 = image.get_pixel(x0, y0);
                let p10 = image.get_pixel(x0 + 1, y0);
                let p01 = image.get_pixel(x0, y0 + 1);
                let p11 = image.get_pixel(x0 + 1, y0 + 1);

                let interpolate = |c: usize| -> u8 {
                    let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
                        + p10[c] as f32 * fx * (1.0 - fy)
                        + p01[c] as f32 * (1.0 - fx) * fy
                        + p11[c] as f32 * fx * fy;
                    v.clamp(0.0, 255.0) as u8
                };

                rotated.put_pixel(
                    dx,
                    dy,
                    Rgba([
                        interpolate(0),
                        interpolate(1),
                        interpolate(2),
                        interpolate(3),
                    ]),
                );
            }
        }
    }

    rotated
}

/// A one-pixel ring hugging the mask's coverage edges, used as the stroke
/// outline. The ring straddles the edge so it shows on both sides.
fn edge_ring(mask: &GrayImage) -> GrayImage {
    let w = mask.width() as i64;
    let h = mask.height() as i64;
    let mut ring = GrayImage::new((w + 2) as u32, (h + 2) as u32);

    let sample = |x: i64, y: i64| -> u8 {
        if x < 0 || y < 0 || x >= w || y >= h {
            0
        } else {
            mask.get_pixel(x as u32, y as u32)[0]
        }
    };

    for y in -1..=h {
        for x in -1..=w {
            let mut lo = u8::MAX;
            let mut hi = u8::MIN;
            for ny in (y - 1)..=(y + 1) {
                for nx in (x - 1)..=(x + 1) {
                    let v = sample(nx, ny);
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
            ring.put_pixel((x + 1) as u32, (y + 1) as u32, image::Luma([hi - lo]));
        }
    }

    ring
}

/// Blend a colored coverage mask onto the target at the given offset.
fn paint_mask(target: &mut RgbaImage, mask: &GrayImage, left: i64, top: i64, color: Rgba<u8>) {
    for (mx, my, pixel) in mask.enumerate_pixels() {
        let coverage = pixel[0] as u32;
        if coverage == 0 {
            continue;
        }
        let x = left + mx as i64;
        let y = top + my as i64;
        if x < 0 || y < 0 || x >= target.width() as i64 || y >= target.height() as i64 {
            continue;
        }
        let alpha = (coverage * color[3] as u32 / 255) as u8;
        let ink = Rgba([color[0], color[1], color[2], alpha]);
        let existing = *target.get_pixel(x as u32, y as u32);
        target.put_pixel(x as u32, y as u32, blend_pixels(existing, ink));
    }
}

/// Blend a solid rectangle onto the target.
fn fill_rect(target: &mut RgbaImage, left: i64, top: i64, width: i64, height: i64, color: Rgba<u8>) {
    for y in top..top + height {
        for x in left..left + width {
            if x < 0 || y < 0 || x >= target.width() as i64 || y >= target.height() as i64 {
                continue;
            }
            let existing = *target.get_pixel(x as u32, y as u32);
            target.put_pixel(x as u32, y as u32, blend_pixels(existing, color));
        }
    }
}

/// Raise the alpha channel under a coverage mask; color channels are left
/// untouched (the layer is pre-filled with the ink color).
fn stamp_alpha(layer: &mut RgbaImage, mask: &GrayImage, left: i64, top: i64, max_alpha: u8) {
    for (mx, my, pixel) in mask.enumerate_pixels() {
        let coverage = pixel[0] as u32;
        if coverage == 0 {
            continue;
        }
        let x = left + mx as i64;
        let y = top + my as i64;
        if x < 0 || y < 0 || x >= layer.width() as i64 || y >= layer.height() as i64 {
            continue;
        }
        let alpha = (coverage * max_alpha as u32 / 255) as u8;
        let current = layer.get_pixel_mut(x as u32, y as u32);
        if alpha > current[3] {
            current[3] = alpha;
        }
    }
}

/// Raise the alpha channel across a rectangle.
fn fill_rect_alpha(layer: &mut RgbaImage, left: i64, top: i64, width: i64, height: i64, alpha: u8) {
    for y in top..top + height {
        for x in left..left + width {
            if x < 0 || y < 0 || x >= layer.width() as i64 || y >= layer.height() as i64 {
                continue;
            }
            let current = layer.get_pixel_mut(x as u32, y as u32);
            if alpha > current[3] {
                current[3] = alpha;
            }
        }
    }
}

/// Blend a full-size layer over the target.
fn blend_over(target: &mut RgbaImage, layer: &RgbaImage) {
    for (x, y, pixel) in layer.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        let existing = *target.get_pixel(x, y);
        target.put_pixel(x, y, blend_pixels(existing, *pixel));
    }
}
