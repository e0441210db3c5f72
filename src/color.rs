//! Color helpers for watermark styling.
//!
//! Colors arrive at the API boundary as six-hex-digit strings (no `#`
//! prefix) and are carried internally as 24-bit RGB integers paired with a
//! 0.0-1.0 opacity. Channel values are 0-255 integers throughout.

use image::Rgba;

/// Build an RGBA color from a 24-bit RGB integer and an opacity.
///
/// Channels are extracted with bit shifts (`>>16`, `>>8`, `>>0`); opacity is
/// mapped to the 0-255 alpha range.
pub fn rgba_from_hex(rgb: u32, opacity: f64) -> Rgba<u8> {
    let red = ((rgb >> 16) & 0xFF) as u8;
    let green = ((rgb >> 8) & 0xFF) as u8;
    let blue = (rgb & 0xFF) as u8;
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;

    Rgba([red, green, blue, alpha])
}

/// Parse a color string of exactly six hex digits into a 24-bit RGB value.
///
/// Returns `None` for any other length or any non-hex character; callers
/// fall back to their documented default color.
pub fn parse_hex_rgb(value: &str) -> Option<u32> {
    if value.len() != 6 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    u32::from_str_radix(value, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_from_hex_extracts_channels() {
        assert_eq!(rgba_from_hex(0xFF0000, 1.0), Rgba([255, 0, 0, 255]));
        assert_eq!(rgba_from_hex(0x00FF00, 1.0), Rgba([0, 255, 0, 255]));
        assert_eq!(rgba_from_hex(0x0000FF, 1.0), Rgba([0, 0, 255, 255]));
        assert_eq!(rgba_from_hex(0x123456, 1.0), Rgba([0x12, 0x34, 0x56, 255]));
    }

    #[test]
    fn test_rgba_from_hex_opacity_to_alpha() {
        assert_eq!(rgba_from_hex(0x000000, 0.0)[3], 0);
        assert_eq!(rgba_from_hex(0x000000, 0.5)[3], 128);
        assert_eq!(rgba_from_hex(0x000000, 1.0)[3], 255);
    }

    #[test]
    fn test_rgba_from_hex_clamps_opacity() {
        assert_eq!(rgba_from_hex(0x000000, -1.0)[3], 0);
        assert_eq!(rgba_from_hex(0x000000, 2.0)[3], 255);
    }

    #[test]
    fn test_parse_hex_rgb_valid() {
        assert_eq!(parse_hex_rgb("000000"), Some(0x000000));
        assert_eq!(parse_hex_rgb("ffffff"), Some(0xFFFFFF));
        assert_eq!(parse_hex_rgb("AbCdEf"), Some(0xABCDEF));
    }

    #[test]
    fn test_parse_hex_rgb_rejects_bad_input() {
        // Unparseable hex
        assert_eq!(parse_hex_rgb("zzzzzz"), None);
        // Wrong lengths
        assert_eq!(parse_hex_rgb(""), None);
        assert_eq!(parse_hex_rgb("fff"), None);
        assert_eq!(parse_hex_rgb("fffffff"), None);
        // Signs are not hex digits even though from_str_radix accepts them
        assert_eq!(parse_hex_rgb("+12345"), None);
        assert_eq!(parse_hex_rgb("#12345"), None);
    }
}
