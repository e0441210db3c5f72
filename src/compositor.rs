//! Tiled compositing of a watermark stamp onto a decoded base image.
//!
//! The tiling plane is the bounding box of the canvas rotated about its
//! center. Tile positions are computed on that plane with axis-aligned
//! arithmetic, then each stamp is drawn once: the stamp image is rotated by
//! the plane angle and alpha-blended centered at the mapped tile position.

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::geometry::PlaneTransform;
use crate::stamp::{rotate_image, Stamp};
use crate::tiling::TileGrid;

/// Tile a stamp across the base image, rotated by `rotation_angle` degrees.
pub fn composite_tiled(
    base: &mut RgbaImage,
    stamp: &Stamp,
    rotation_angle: f64,
    density_level: u8,
) {
    let transform = PlaneTransform::new(base.width(), base.height(), rotation_angle);
    let (plane_width, plane_height) = transform.plane_size();
    let grid = TileGrid::compute(
        plane_width,
        plane_height,
        stamp.item_width,
        stamp.item_height,
        density_level,
        stamp.anchor,
    );

    debug!(
        columns = grid.columns,
        rows = grid.rows,
        angle = rotation_angle,
        density = density_level,
        "tiling watermark"
    );

    let rotated = rotate_image(&stamp.image, rotation_angle);

    // Offset from the tile anchor to the stamp image's center, measured on
    // the unrotated plane where the stamp is axis-aligned.
    let center_dx = stamp.image.width() as f64 / 2.0 - stamp.anchor_x;
    let center_dy = stamp.image.height() as f64 / 2.0 - stamp.anchor_y;

    for (anchor_x, anchor_y) in grid.offsets() {
        let (cx, cy) = transform.apply(anchor_x + center_dx, anchor_y + center_dy);
        blit_centered(base, &rotated, cx, cy);
    }
}

/// Alpha-blend `image` onto `target` with its center at `(cx, cy)`.
/// Out-of-bounds regions are clipped.
fn blit_centered(target: &mut RgbaImage, image: &RgbaImage, cx: f64, cy: f64) {
    let left = (cx - image.width() as f64 / 2.0).round() as i64;
    let top = (cy - image.height() as f64 / 2.0).round() as i64;

    let target_width = target.width() as i64;
    let target_height = target.height() as i64;

    let x_start = left.max(0);
    let y_start = top.max(0);
    let x_end = (left + image.width() as i64).min(target_width);
    let y_end = (top + image.height() as i64).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let sx = (tx - left) as u32;
            let sy = (ty - top) as u32;

            let source = *image.get_pixel(sx, sy);
            if source[3] == 0 {
                continue;
            }
            let existing = *target.get_pixel(tx as u32, ty as u32);
            target.put_pixel(tx as u32, ty as u32, blend_pixels(existing, source));
        }
    }
}

/// Blend two RGBA pixels with the "over" operator.
pub(crate) fn blend_pixels(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0).clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0) as u8,
    ])
}
