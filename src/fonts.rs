//! Font registration and text shaping.
//!
//! Text measurement and glyph rasterization sit behind the [`TextShaper`]
//! trait so the compositing pipeline never touches font files directly.
//! [`FontBook`] is the production shaper over `ab_glyph`; faces are
//! registered process-wide exactly once via [`FontBook::install`] and are
//! read-only afterwards. [`BlockShaper`] is a fixed-metrics fallback for
//! environments with no font files (tests, minimal containers).

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::GrayImage;
use std::fmt;
use std::sync::OnceLock;

/// Resolved font description for a text watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    pub family: String,
    /// Size in pixels.
    pub size: u32,
    /// CSS-style weight, a multiple of 100 in 100..=900.
    pub weight: u16,
    pub italic: bool,
}

/// Layout metrics for one line of shaped text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    pub width: f64,
    /// Distance from the baseline up to the top of the glyph box.
    pub ascent: f64,
    /// Distance from the baseline down to the bottom of the glyph box.
    pub descent: f64,
}

impl TextMetrics {
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

/// Grayscale glyph coverage for one line of text.
///
/// The mask is `ceil(metrics.width)` x `ceil(metrics.height())` pixels with
/// the baseline at row `metrics.ascent`.
#[derive(Debug, Clone)]
pub struct CoverageMask {
    pub mask: GrayImage,
    pub metrics: TextMetrics,
}

/// Text shaping errors.
#[derive(Debug, Clone)]
pub enum FontError {
    /// No font faces are registered.
    NotInstalled,
    /// A registered face could not be parsed.
    InvalidFontData(String),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "no font faces installed"),
            Self::InvalidFontData(msg) => write!(f, "invalid font data: {}", msg),
        }
    }
}

impl std::error::Error for FontError {}

/// Shapes text into metrics and coverage masks.
///
/// The compositor consumes this as an opaque capability; implementations
/// must be cheap to call repeatedly (shaping happens once per request).
pub trait TextShaper: Send + Sync {
    /// Measure one line of text.
    fn measure(&self, text: &str, font: &FontSpec) -> Result<TextMetrics, FontError>;

    /// Rasterize one line of text into a coverage mask.
    fn rasterize(&self, text: &str, font: &FontSpec) -> Result<CoverageMask, FontError>;
}

/// One registered font face.
pub struct FontFace {
    pub family: String,
    pub weight: u16,
    pub italic: bool,
    pub data: Vec<u8>,
}

struct LoadedFace {
    family: String,
    weight: u16,
    italic: bool,
    font: FontArc,
}

impl Clone for LoadedFace {
    fn clone(&self) -> Self {
        Self {
            family: self.family.clone(),
            weight: self.weight,
            italic: self.italic,
            font: self.font.clone(),
        }
    }
}

static INSTALLED_FONTS: OnceLock<FontBook> = OnceLock::new();

/// Catalog of registered font faces backing the production shaper.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: Vec<LoadedFace>,
}

impl FontBook {
    /// Build a catalog from raw face data.
    pub fn from_faces(faces: Vec<FontFace>) -> Result<Self, FontError> {
        let mut loaded = Vec::with_capacity(faces.len());
        for face in faces {
            let font = FontArc::try_from_vec(face.data)
                .map_err(|e| FontError::InvalidFontData(format!("{} ({})", face.family, e)))?;
            loaded.push(LoadedFace {
                family: face.family.to_lowercase(),
                weight: face.weight,
                italic: face.italic,
                font,
            });
        }
        Ok(Self { faces: loaded })
    }

    /// Register the process-wide font catalog.
    ///
    /// The first successful call wins; every later call is a no-op returning
    /// `Ok`. The catalog is never torn down during the process lifetime.
    pub fn install(faces: Vec<FontFace>) -> Result<(), FontError> {
        if INSTALLED_FONTS.get().is_some() {
            return Ok(());
        }
        let book = Self::from_faces(faces)?;
        // A concurrent installer may have won the race; either catalog is a
        // complete registration, so losing is fine.
        let _ = INSTALLED_FONTS.set(book);
        Ok(())
    }

    /// The process-wide catalog, if one has been installed.
    pub fn installed() -> Option<&'static FontBook> {
        INSTALLED_FONTS.get()
    }

    /// Number of registered faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Pick the face closest to the requested description.
    ///
    /// Exact (family, style, weight) first, then nearest weight within the
    /// family and style, then nearest weight within the family, then the
    /// first registered face.
    fn select(&self, spec: &FontSpec) -> Result<&FontArc, FontError> {
        if self.faces.is_empty() {
            return Err(FontError::NotInstalled);
        }

        let family = spec.family.to_lowercase();

        let best = self
            .faces
            .iter()
            .min_by_key(|face| {
                let family_penalty: u32 = if face.family == family { 0 } else { 1_000_000 };
                let style_penalty: u32 = if face.italic == spec.italic { 0 } else { 10_000 };
                let weight_penalty = (face.weight as i32 - spec.weight as i32).unsigned_abs();
                family_penalty + style_penalty + weight_penalty
            })
            .map(|face| &face.font);

        best.ok_or(FontError::NotInstalled)
    }
}

impl TextShaper for FontBook {
    fn measure(&self, text: &str, font: &FontSpec) -> Result<TextMetrics, FontError> {
        let face = self.select(font)?;
        let scale = PxScale::from(font.size as f32);
        let scaled = face.as_scaled(scale);

        let mut width = 0.0f32;
        let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

        for c in text.chars() {
            let glyph_id = scaled.glyph_id(c);
            if let Some(prev) = prev_glyph {
                width += scaled.kern(prev, glyph_id);
            }
            width += scaled.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        Ok(TextMetrics {
            width: width as f64,
            ascent: scaled.ascent() as f64,
            descent: (-scaled.descent()) as f64,
        })
    }

    fn rasterize(&self, text: &str, font: &FontSpec) -> Result<CoverageMask, FontError> {
        let metrics = self.measure(text, font)?;
        let face = self.select(font)?;
        let scale = PxScale::from(font.size as f32);
        let scaled = face.as_scaled(scale);

        let mask_width = (metrics.width.ceil() as u32).max(1);
        let mask_height = (metrics.height().ceil() as u32).max(1);
        let mut mask = GrayImage::new(mask_width, mask_height);

        let baseline_y = metrics.ascent as f32;
        let mut cursor_x = 0.0f32;
        let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

        for c in text.chars() {
            let glyph_id = scaled.glyph_id(c);
            if let Some(prev) = prev_glyph {
                cursor_x += scaled.kern(prev, glyph_id);
            }

            let glyph =
                glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

            if let Some(outlined) = face.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    let x = px as i32 + bounds.min.x as i32;
                    let y = py as i32 + bounds.min.y as i32;
                    if x >= 0 && y >= 0 && x < mask_width as i32 && y < mask_height as i32 {
                        let value = (coverage * 255.0) as u8;
                        let pixel = mask.get_pixel_mut(x as u32, y as u32);
                        // Overlapping glyphs keep the strongest coverage.
                        if value > pixel[0] {
                            pixel[0] = value;
                        }
                    }
                });
            }

            cursor_x += scaled.h_advance(glyph_id);
            prev_glyph = Some(glyph_id);
        }

        Ok(CoverageMask { mask, metrics })
    }
}

/// Fixed-metrics shaper that rasterizes every character as a solid block.
///
/// Every glyph advances `0.6 * size` with an ascent of `0.8 * size` and a
/// descent of `0.2 * size`; whitespace leaves its cell blank. Deterministic
/// and font-file free, which makes it the shaper of choice for tests and for
/// headless deployments that only need placement to be exercised.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockShaper;

impl BlockShaper {
    const ADVANCE_RATIO: f64 = 0.6;
    const ASCENT_RATIO: f64 = 0.8;
    const DESCENT_RATIO: f64 = 0.2;
}

impl TextShaper for BlockShaper {
    fn measure(&self, text: &str, font: &FontSpec) -> Result<TextMetrics, FontError> {
        let size = font.size as f64;
        let count = text.chars().count() as f64;
        Ok(TextMetrics {
            width: count * size * Self::ADVANCE_RATIO,
            ascent: size * Self::ASCENT_RATIO,
            descent: size * Self::DESCENT_RATIO,
        })
    }

    fn rasterize(&self, text: &str, font: &FontSpec) -> Result<CoverageMask, FontError> {
        let metrics = self.measure(text, font)?;
        let mask_width = (metrics.width.ceil() as u32).max(1);
        let mask_height = (metrics.height().ceil() as u32).max(1);
        let mut mask = GrayImage::new(mask_width, mask_height);

        let advance = font.size as f64 * Self::ADVANCE_RATIO;
        let bearing = advance * 0.1;

        for (index, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let x0 = (index as f64 * advance + bearing).floor() as u32;
            let x1 = (((index + 1) as f64 * advance - bearing).ceil() as u32).min(mask_width);
            for y in 0..mask_height {
                for x in x0..x1 {
                    mask.put_pixel(x, y, image::Luma([255]));
                }
            }
        }

        Ok(CoverageMask { mask, metrics })
    }
}
