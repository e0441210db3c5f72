//! Supported mime types and surface flavors.
//!
//! `image/jpeg` and `image/jpg` are distinct variants so the output buffer
//! is encoded under exactly the mime string the caller sent.

/// Mime type of a base or watermark image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Png,
    Jpeg,
    /// Alias spelling some clients send; decoded and encoded as JPEG.
    Jpg,
    Svg,
}

impl MimeType {
    /// Parse a mime string, returning `None` for unsupported values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/jpg" => Some(Self::Jpg),
            "image/svg+xml" => Some(Self::Svg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Jpg => "image/jpg",
            Self::Svg => "image/svg+xml",
        }
    }

    /// True for the vector-capable surface flavor.
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Svg)
    }
}
