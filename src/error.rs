//! Processing error types.
//!
//! Structural validation problems are reported as a bitwise union of
//! independent flags rather than a first-match error, so a caller learns
//! about every problem with a request in one round trip. Decode failures use
//! the same flag space but are raised later, once the decode is attempted.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::codec::CodecError;
use crate::fonts::FontError;

/// A set of independent validation/decode failure flags.
///
/// Flags combine with `|`; an empty mask means the request is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorMask(u32);

impl ErrorMask {
    /// No failure.
    pub const NONE: Self = Self(0);

    /// Request body is not a processing-request object.
    pub const INVALID_PARAMS_TYPE: Self = Self(1 << 0);
    /// Base image mime type is not a supported codec.
    pub const UNSUPPORTED_MIME_TYPE: Self = Self(1 << 1);
    /// Base image mime type is missing or not a string.
    pub const INVALID_MIME_TYPE_TYPE: Self = Self(1 << 2);
    /// Base image buffer is missing or not a byte buffer.
    pub const INVALID_BUFFER_TYPE: Self = Self(1 << 3);
    /// Watermark description is missing or of an unknown variant.
    pub const INVALID_WATERMARK_DESCRIPTION_TYPE: Self = Self(1 << 4);
    /// Text watermark text is missing or not a string.
    pub const INVALID_WATERMARK_TEXT_TYPE: Self = Self(1 << 5);
    /// Text watermark text is empty.
    pub const WATERMARK_TEXT_EMPTY: Self = Self(1 << 6);
    /// Picture watermark mime type is missing or not a string.
    pub const INVALID_WATERMARK_MIME_TYPE_TYPE: Self = Self(1 << 7);
    /// Picture watermark mime type is not a supported codec.
    pub const UNSUPPORTED_WATERMARK_MIME_TYPE: Self = Self(1 << 8);
    /// Picture watermark buffer is missing or not a byte buffer.
    pub const INVALID_WATERMARK_BUFFER_TYPE: Self = Self(1 << 9);
    /// Base image bytes could not be decoded.
    pub const IMAGE_DECODE_FAILED: Self = Self(1 << 10);
    /// Picture watermark bytes could not be decoded.
    pub const WATERMARK_IMAGE_DECODE_FAILED: Self = Self(1 << 11);

    const FLAG_NAMES: [(Self, &'static str); 12] = [
        (Self::INVALID_PARAMS_TYPE, "invalid params type"),
        (Self::UNSUPPORTED_MIME_TYPE, "unsupported mime type"),
        (Self::INVALID_MIME_TYPE_TYPE, "invalid mime type"),
        (Self::INVALID_BUFFER_TYPE, "invalid buffer"),
        (
            Self::INVALID_WATERMARK_DESCRIPTION_TYPE,
            "invalid watermark description",
        ),
        (Self::INVALID_WATERMARK_TEXT_TYPE, "invalid watermark text"),
        (Self::WATERMARK_TEXT_EMPTY, "watermark text empty"),
        (
            Self::INVALID_WATERMARK_MIME_TYPE_TYPE,
            "invalid watermark mime type",
        ),
        (
            Self::UNSUPPORTED_WATERMARK_MIME_TYPE,
            "unsupported watermark mime type",
        ),
        (Self::INVALID_WATERMARK_BUFFER_TYPE, "invalid watermark buffer"),
        (Self::IMAGE_DECODE_FAILED, "image decode failed"),
        (
            Self::WATERMARK_IMAGE_DECODE_FAILED,
            "watermark image decode failed",
        ),
    ];

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the set flags, in bit order.
    pub fn flag_names(self) -> Vec<&'static str> {
        Self::FLAG_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for ErrorMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ErrorMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ErrorMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no error");
        }
        write!(f, "{}", self.flag_names().join(", "))
    }
}

/// Terminal failure of one processing call.
#[derive(Debug)]
pub enum ProcessError {
    /// The request was rejected with one or more failure flags set.
    Flagged(ErrorMask),

    /// Text shaping or font selection failed.
    Render(FontError),

    /// The composited surface could not be encoded.
    Encode(CodecError),

    /// The blocking render task was cancelled or panicked.
    Join(String),
}

impl ProcessError {
    /// The failure flags carried by this error; empty for non-flag failures.
    pub fn mask(&self) -> ErrorMask {
        match self {
            Self::Flagged(mask) => *mask,
            _ => ErrorMask::NONE,
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flagged(mask) => {
                write!(f, "request rejected (mask {:#05x}): {}", mask.bits(), mask)
            }
            Self::Render(err) => write!(f, "text rendering failed: {}", err),
            Self::Encode(err) => write!(f, "encoding failed: {}", err),
            Self::Join(msg) => write!(f, "render task failed: {}", msg),
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Flagged(_) => None,
            Self::Render(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Join(_) => None,
        }
    }
}

impl From<ErrorMask> for ProcessError {
    fn from(mask: ErrorMask) -> Self {
        Self::Flagged(mask)
    }
}
