//! Watermark descriptions and parameter resolution.
//!
//! Every cosmetic/styling field is optional at the API boundary and has
//! exactly one default. A wrong-typed or out-of-range cosmetic value never
//! fails the request; it silently resolves to its default. Only the
//! structural fields (text, buffers, mime types) are hard requirements and
//! those are enforced by the validator, not here.
//!
//! Raw descriptions deserialize leniently: a field of the wrong JSON type
//! becomes `None` instead of a deserialization error. A single `resolve()`
//! pass then produces an immutable resolved-parameters value; rendering
//! reads only resolved values.

use bytes::Bytes;
use image::Rgba;
use serde::{Deserialize, Deserializer};

use crate::color::{parse_hex_rgb, rgba_from_hex};
use crate::error::ErrorMask;
use crate::fonts::FontSpec;

pub const DEFAULT_FONT_FAMILY: &str = "Roboto";
pub const DEFAULT_FONT_SIZE: u32 = 24;
pub const DEFAULT_FONT_WEIGHT: u16 = 400;
pub const DEFAULT_COLOR: u32 = 0x000000;
pub const DEFAULT_FILL_OPACITY: f64 = 1.0;
pub const DEFAULT_STROKE_OPACITY: f64 = 0.0;
pub const DEFAULT_SHADOW_OPACITY: f64 = 0.0;
pub const DEFAULT_ROTATION_ANGLE: f64 = 0.0;
pub const DEFAULT_DENSITY_LEVEL: u8 = 3;
pub const DEFAULT_PICTURE_OPACITY: f64 = 1.0;
pub const MIN_DENSITY_LEVEL: u8 = 1;
pub const MAX_DENSITY_LEVEL: u8 = 5;
/// Magnitude bound for sizes and offsets.
pub const MAX_MAGNITUDE: f64 = 9999.0;

/// Deserialize a field, mapping a wrong-typed value to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// One processing request: base image bytes, its mime type, and the
/// watermark to tile over it.
///
/// Fields are optional so the validator can report missing or wrong-typed
/// values as combinable flags instead of refusing to construct the request.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub buffer: Option<Bytes>,
    pub mime_type: Option<String>,
    pub watermark: Option<WatermarkSpec>,
}

impl ProcessRequest {
    pub fn new(buffer: Bytes, mime_type: impl Into<String>, watermark: WatermarkSpec) -> Self {
        Self {
            buffer: Some(buffer),
            mime_type: Some(mime_type.into()),
            watermark: Some(watermark),
        }
    }

    /// Build a request from a JSON body.
    ///
    /// Buffers travel outside the JSON document (multipart file parts);
    /// attach them with [`ProcessRequest::with_buffer`] and
    /// [`ProcessRequest::with_watermark_buffer`].
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ErrorMask> {
        let object = match value.as_object() {
            Some(object) => object,
            None => return Err(ErrorMask::INVALID_PARAMS_TYPE),
        };

        let mime_type = object
            .get("mimeType")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        let watermark = object
            .get("watermark")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        Ok(Self {
            buffer: None,
            mime_type,
            watermark,
        })
    }

    pub fn with_buffer(mut self, buffer: Bytes) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Attach the picture watermark's image bytes; a no-op for text
    /// watermarks.
    pub fn with_watermark_buffer(mut self, buffer: Bytes) -> Self {
        if let Some(WatermarkSpec::Picture(ref mut picture)) = self.watermark {
            picture.buffer = Some(buffer);
        }
        self
    }
}

/// The two watermark variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatermarkSpec {
    Text(TextWatermark),
    Picture(PictureWatermark),
}

/// Raw text watermark description as supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextWatermark {
    #[serde(deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub font_family: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub font_size: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub font_italic: Option<bool>,
    /// Decoration flags: underline iff the string contains `u`,
    /// line-through iff it contains `t`.
    #[serde(deserialize_with = "lenient")]
    pub font_decorations: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub font_weight: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub opacity: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub stroke_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub stroke_opacity: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub shadow_offset_x: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub shadow_offset_y: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub shadow_blur_radius: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub shadow_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub shadow_opacity: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub rotation_angle: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub density_level: Option<f64>,
}

/// Raw picture watermark description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PictureWatermark {
    /// Watermark image bytes; arrives outside the JSON document.
    #[serde(skip)]
    pub buffer: Option<Bytes>,
    #[serde(deserialize_with = "lenient")]
    pub mime_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub opacity: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub rotation_angle: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub density_level: Option<f64>,
}

/// Resolved shadow styling; color carries the resolved opacity in alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedShadow {
    pub offset_x: i32,
    pub offset_y: i32,
    pub blur_radius: u32,
    pub color: Rgba<u8>,
}

impl ResolvedShadow {
    /// True when the shadow would paint nothing.
    pub fn is_invisible(&self) -> bool {
        self.color[3] == 0
    }
}

/// Text watermark parameters after validation and defaulting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedText {
    pub text: String,
    pub font: FontSpec,
    pub underline: bool,
    pub line_through: bool,
    pub fill: Rgba<u8>,
    pub stroke: Rgba<u8>,
    pub shadow: ResolvedShadow,
    pub rotation_angle: f64,
    pub density_level: u8,
}

/// Picture watermark parameters after validation and defaulting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPicture {
    pub opacity: f64,
    pub rotation_angle: f64,
    pub density_level: u8,
}

fn resolve_opacity(raw: Option<f64>, default: f64) -> f64 {
    match raw {
        Some(v) if (0.0..=1.0).contains(&v) => v,
        _ => default,
    }
}

fn resolve_color(raw: Option<&str>) -> u32 {
    raw.and_then(parse_hex_rgb).unwrap_or(DEFAULT_COLOR)
}

fn resolve_bounded_int(raw: Option<f64>) -> i32 {
    match raw {
        Some(v) if v.is_finite() && v.abs() <= MAX_MAGNITUDE => v.round() as i32,
        _ => 0,
    }
}

fn resolve_rotation(raw: Option<f64>) -> f64 {
    match raw {
        Some(v) if v.is_finite() => v,
        _ => DEFAULT_ROTATION_ANGLE,
    }
}

fn resolve_density(raw: Option<f64>) -> u8 {
    match raw {
        Some(v)
            if v.is_finite()
                && (MIN_DENSITY_LEVEL as f64..=MAX_DENSITY_LEVEL as f64).contains(&v) =>
        {
            v.round() as u8
        }
        _ => DEFAULT_DENSITY_LEVEL,
    }
}

impl TextWatermark {
    /// Apply the full validation/defaulting pass once, producing immutable
    /// resolved parameters. The text itself must already have passed the
    /// validator; a missing text resolves to an empty string here.
    pub fn resolve(&self) -> ResolvedText {
        let family = match self.font_family.as_deref() {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => DEFAULT_FONT_FAMILY.to_string(),
        };

        let size = match self.font_size {
            Some(v) if v.is_finite() && (0.0..=MAX_MAGNITUDE).contains(&v) => v.round() as u32,
            _ => DEFAULT_FONT_SIZE,
        };

        let weight = match self.font_weight {
            Some(v) if v.is_finite() && v % 100.0 == 0.0 && (100.0..=900.0).contains(&v) => {
                v as u16
            }
            _ => DEFAULT_FONT_WEIGHT,
        };

        let underline = self
            .font_decorations
            .as_deref()
            .map(|d| d.contains('u'))
            .unwrap_or(false);
        let line_through = self
            .font_decorations
            .as_deref()
            .map(|d| d.contains('t'))
            .unwrap_or(false);

        let fill = rgba_from_hex(
            resolve_color(self.color.as_deref()),
            resolve_opacity(self.opacity, DEFAULT_FILL_OPACITY),
        );
        let stroke = rgba_from_hex(
            resolve_color(self.stroke_color.as_deref()),
            resolve_opacity(self.stroke_opacity, DEFAULT_STROKE_OPACITY),
        );
        let shadow = ResolvedShadow {
            offset_x: resolve_bounded_int(self.shadow_offset_x),
            offset_y: resolve_bounded_int(self.shadow_offset_y),
            // Negative blur magnitudes pass the bound check but cannot
            // blur; they collapse to zero.
            blur_radius: resolve_bounded_int(self.shadow_blur_radius).max(0) as u32,
            color: rgba_from_hex(
                resolve_color(self.shadow_color.as_deref()),
                resolve_opacity(self.shadow_opacity, DEFAULT_SHADOW_OPACITY),
            ),
        };

        ResolvedText {
            text: self.text.clone().unwrap_or_default(),
            font: FontSpec {
                family,
                size,
                weight,
                italic: self.font_italic.unwrap_or(false),
            },
            underline,
            line_through,
            fill,
            stroke,
            shadow,
            rotation_angle: resolve_rotation(self.rotation_angle),
            density_level: resolve_density(self.density_level),
        }
    }
}

impl PictureWatermark {
    /// Apply the validation/defaulting pass for the picture variant.
    pub fn resolve(&self) -> ResolvedPicture {
        ResolvedPicture {
            opacity: resolve_opacity(self.opacity, DEFAULT_PICTURE_OPACITY),
            rotation_angle: resolve_rotation(self.rotation_angle),
            density_level: resolve_density(self.density_level),
        }
    }
}
