//! High-level watermark processing.
//!
//! [`WatermarkProcessor`] is the public entry point: it validates a request,
//! decodes the base and watermark surfaces, renders and tiles the stamp, and
//! encodes the result back under the caller's mime type. The pixel work runs
//! on the blocking thread pool so the async runtime stays responsive.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codec;
use crate::compositor::composite_tiled;
use crate::error::{ErrorMask, ProcessError};
use crate::fonts::{FontBook, FontError, TextShaper};
use crate::format::MimeType;
use crate::params::ProcessRequest;
use crate::stamp;
use crate::validator::{validate, ValidRequest, ValidWatermark};

/// A finished watermarked image.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub buffer: Bytes,
    /// Always the mime type the request declared for the base image.
    pub mime: MimeType,
}

/// Applies tiled watermarks to images.
#[derive(Clone)]
pub struct WatermarkProcessor {
    shaper: Arc<dyn TextShaper>,
}

impl WatermarkProcessor {
    /// Create a processor over an explicit text shaper.
    pub fn new(shaper: Arc<dyn TextShaper>) -> Self {
        Self { shaper }
    }

    /// Create a processor over the process-wide font catalog.
    ///
    /// Fails with [`FontError::NotInstalled`] until [`FontBook::install`]
    /// has been called.
    pub fn with_installed_fonts() -> Result<Self, FontError> {
        let book = FontBook::installed().ok_or(FontError::NotInstalled)?;
        Ok(Self::new(Arc::new(book.clone())))
    }

    /// Process one request on the blocking thread pool.
    pub async fn process(&self, request: ProcessRequest) -> Result<ProcessOutput, ProcessError> {
        let valid = validate(&request).map_err(ProcessError::Flagged)?;
        let shaper = Arc::clone(&self.shaper);

        tokio::task::spawn_blocking(move || render(valid, shaper.as_ref()))
            .await
            .map_err(|e| ProcessError::Join(e.to_string()))?
    }

    /// Process one request on the calling thread.
    pub fn process_blocking(&self, request: &ProcessRequest) -> Result<ProcessOutput, ProcessError> {
        let valid = validate(request).map_err(ProcessError::Flagged)?;
        render(valid, self.shaper.as_ref())
    }
}

fn render(request: ValidRequest, shaper: &dyn TextShaper) -> Result<ProcessOutput, ProcessError> {
    let mut mask = ErrorMask::NONE;

    let base = match codec::decode(&request.buffer, request.mime) {
        Ok(image) => Some(image),
        Err(err) => {
            warn!(mime = request.mime.as_str(), error = %err, "base image decode failed");
            mask |= ErrorMask::IMAGE_DECODE_FAILED;
            None
        }
    };

    // The picture watermark decode is attempted even when the base failed,
    // so one response carries both flags.
    let watermark_image = match &request.watermark {
        ValidWatermark::Picture { buffer, mime, .. } => match codec::decode(buffer, *mime) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(mime = mime.as_str(), error = %err, "watermark image decode failed");
                mask |= ErrorMask::WATERMARK_IMAGE_DECODE_FAILED;
                None
            }
        },
        ValidWatermark::Text(_) => None,
    };

    if !mask.is_empty() {
        return Err(ProcessError::Flagged(mask));
    }

    let mut canvas = match base {
        Some(image) => image,
        None => return Err(ProcessError::Flagged(ErrorMask::IMAGE_DECODE_FAILED)),
    };

    info!(
        width = canvas.width(),
        height = canvas.height(),
        mime = request.mime.as_str(),
        "compositing watermark"
    );

    let (tile, rotation_angle, density_level) = match request.watermark {
        ValidWatermark::Text(params) => {
            debug!(text = %params.text, font = %params.font.family, "rendering text stamp");
            let tile = stamp::text_stamp(&params, shaper).map_err(ProcessError::Render)?;
            (tile, params.rotation_angle, params.density_level)
        }
        ValidWatermark::Picture { params, .. } => {
            let image = match watermark_image {
                Some(image) => image,
                None => {
                    return Err(ProcessError::Flagged(
                        ErrorMask::WATERMARK_IMAGE_DECODE_FAILED,
                    ))
                }
            };
            (
                stamp::picture_stamp(image, &params),
                params.rotation_angle,
                params.density_level,
            )
        }
    };

    composite_tiled(&mut canvas, &tile, rotation_angle, density_level);

    let buffer = codec::encode(&canvas, request.mime).map_err(ProcessError::Encode)?;
    Ok(ProcessOutput {
        buffer: Bytes::from(buffer),
        mime: request.mime,
    })
}
