//! Request validation.
//!
//! Mime type, buffer, and watermark description are checked independently
//! and their failure flags OR-combined, so one response reports every
//! structural problem. A clean request is re-packaged as a [`ValidRequest`]
//! whose fields are guaranteed present and whose watermark parameters are
//! already resolved; the compositor never re-checks anything.

use bytes::Bytes;

use crate::error::ErrorMask;
use crate::format::MimeType;
use crate::params::{ProcessRequest, ResolvedPicture, ResolvedText, WatermarkSpec};

/// A request that passed validation, with resolved parameters.
#[derive(Debug, Clone)]
pub struct ValidRequest {
    pub buffer: Bytes,
    pub mime: MimeType,
    pub watermark: ValidWatermark,
}

/// Validated watermark with resolved styling.
#[derive(Debug, Clone)]
pub enum ValidWatermark {
    Text(ResolvedText),
    Picture {
        buffer: Bytes,
        mime: MimeType,
        params: ResolvedPicture,
    },
}

/// Validate a processing request.
///
/// Returns the re-packaged request on success, or the union of every
/// failure flag otherwise. Decode failures are not detectable here; they
/// surface later from the processor.
pub fn validate(request: &ProcessRequest) -> Result<ValidRequest, ErrorMask> {
    let mut mask = ErrorMask::NONE;

    mask |= validate_mime_type(
        request.mime_type.as_deref(),
        ErrorMask::INVALID_MIME_TYPE_TYPE,
        ErrorMask::UNSUPPORTED_MIME_TYPE,
    );
    mask |= validate_buffer(request.buffer.as_ref(), ErrorMask::INVALID_BUFFER_TYPE);
    mask |= validate_watermark(request.watermark.as_ref());

    if !mask.is_empty() {
        return Err(mask);
    }

    assemble(request).ok_or(ErrorMask::INVALID_PARAMS_TYPE)
}

fn validate_mime_type(
    mime_type: Option<&str>,
    type_flag: ErrorMask,
    support_flag: ErrorMask,
) -> ErrorMask {
    match mime_type {
        None => type_flag,
        Some(value) if MimeType::parse(value).is_none() => support_flag,
        Some(_) => ErrorMask::NONE,
    }
}

fn validate_buffer(buffer: Option<&Bytes>, type_flag: ErrorMask) -> ErrorMask {
    match buffer {
        None => type_flag,
        Some(_) => ErrorMask::NONE,
    }
}

fn validate_watermark(watermark: Option<&WatermarkSpec>) -> ErrorMask {
    match watermark {
        None => ErrorMask::INVALID_WATERMARK_DESCRIPTION_TYPE,
        Some(WatermarkSpec::Text(text)) => match text.text.as_deref() {
            None => ErrorMask::INVALID_WATERMARK_TEXT_TYPE,
            Some("") => ErrorMask::WATERMARK_TEXT_EMPTY,
            Some(_) => ErrorMask::NONE,
        },
        Some(WatermarkSpec::Picture(picture)) => {
            validate_mime_type(
                picture.mime_type.as_deref(),
                ErrorMask::INVALID_WATERMARK_MIME_TYPE_TYPE,
                ErrorMask::UNSUPPORTED_WATERMARK_MIME_TYPE,
            ) | validate_buffer(
                picture.buffer.as_ref(),
                ErrorMask::INVALID_WATERMARK_BUFFER_TYPE,
            )
        }
    }
}

/// Re-package a request whose mask came back empty. Always succeeds for
/// such requests; the `Option` exists only to avoid unwraps.
fn assemble(request: &ProcessRequest) -> Option<ValidRequest> {
    let buffer = request.buffer.clone()?;
    let mime = MimeType::parse(request.mime_type.as_deref()?)?;

    let watermark = match request.watermark.as_ref()? {
        WatermarkSpec::Text(text) => ValidWatermark::Text(text.resolve()),
        WatermarkSpec::Picture(picture) => ValidWatermark::Picture {
            buffer: picture.buffer.clone()?,
            mime: MimeType::parse(picture.mime_type.as_deref()?)?,
            params: picture.resolve(),
        },
    };

    Some(ValidRequest {
        buffer,
        mime,
        watermark,
    })
}
