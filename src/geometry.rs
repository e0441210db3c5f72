//! Rotation geometry for the tiling plane.
//!
//! The watermark grid is laid out on a virtual plane that is rotated about
//! the canvas center. The plane is sized to the rotated bounding box of the
//! canvas so the tile pattern still covers the corners after rotation.

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let remainder = angle % 360.0;
    if remainder < 0.0 {
        remainder + 360.0
    } else {
        remainder
    }
}

/// Axis-aligned bounding box of a `width x height` rectangle rotated by
/// `angle_degrees` about its center.
pub fn rotated_bounding_box(width: f64, height: f64, angle_degrees: f64) -> (f64, f64) {
    let radians = normalize_degrees(angle_degrees).to_radians();
    let sin = radians.sin().abs();
    let cos = radians.cos().abs();

    (width * cos + height * sin, height * cos + width * sin)
}

/// Mapping from tiling-plane coordinates to canvas coordinates.
///
/// Composes translate(canvas center) . rotate(angle) . translate(-plane/2),
/// i.e. the plane rotates as a whole about the canvas center. Tiles keep
/// their plane-local layout; the tilt is a property of the plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneTransform {
    sin: f64,
    cos: f64,
    center_x: f64,
    center_y: f64,
    plane_width: f64,
    plane_height: f64,
}

impl PlaneTransform {
    /// Create the transform for a canvas of the given size tilted by
    /// `angle_degrees`. The plane is the rotated bounding box of the canvas.
    pub fn new(canvas_width: u32, canvas_height: u32, angle_degrees: f64) -> Self {
        let radians = normalize_degrees(angle_degrees).to_radians();
        let (plane_width, plane_height) =
            rotated_bounding_box(canvas_width as f64, canvas_height as f64, angle_degrees);

        Self {
            sin: radians.sin(),
            cos: radians.cos(),
            center_x: canvas_width as f64 / 2.0,
            center_y: canvas_height as f64 / 2.0,
            plane_width,
            plane_height,
        }
    }

    /// Size of the drawable plane.
    pub fn plane_size(&self) -> (f64, f64) {
        (self.plane_width, self.plane_height)
    }

    /// Map a plane point to canvas coordinates.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.plane_width / 2.0;
        let dy = y - self.plane_height / 2.0;

        (
            self.center_x + dx * self.cos - dy * self.sin,
            self.center_y + dx * self.sin + dy * self.cos,
        )
    }
}
