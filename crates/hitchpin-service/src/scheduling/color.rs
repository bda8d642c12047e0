//! Event color derivation.

use crate::error::{ServiceError, ServiceResult};

/// Blend fraction toward white applied to completed jobs.
pub const COMPLETED_LIGHTEN_FACTOR: f64 = 0.3;

/// ## Summary
/// Lightens a `#rrggbb` color by blending each channel toward white.
///
/// `factor` is the blend fraction: 0.0 returns the input color, 1.0 returns
/// white.
///
/// ## Errors
/// Returns a `ParseError` for strings that are not six-digit hex colors.
pub fn lighten_hex(color: &str, factor: f64) -> ServiceResult<String> {
    let (r, g, b) = parse_hex(color)?;
    Ok(format!(
        "#{:02x}{:02x}{:02x}",
        blend_channel(r, factor),
        blend_channel(g, factor),
        blend_channel(b, factor)
    ))
}

fn parse_hex(color: &str) -> ServiceResult<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 {
        return Err(ServiceError::ParseError(format!(
            "expected a #rrggbb color, got: {color}"
        )));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_err| {
            ServiceError::ParseError(format!("expected a #rrggbb color, got: {color}"))
        })
    };
    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // blended value is clamped to 0..=255
fn blend_channel(channel: u8, factor: f64) -> u8 {
    let blended = f64::from(channel) + (255.0 - f64::from(channel)) * factor;
    blended.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighten_blends_toward_white() {
        assert_eq!(lighten_hex("#000000", 0.3).expect("parses"), "#4d4d4d");
        assert_eq!(lighten_hex("#ffffff", 0.3).expect("parses"), "#ffffff");
        assert_eq!(lighten_hex("#3788d8", 0.0).expect("parses"), "#3788d8");
        assert_eq!(lighten_hex("#000000", 1.0).expect("parses"), "#ffffff");
    }

    #[test]
    fn lighten_accepts_missing_hash_prefix() {
        assert_eq!(lighten_hex("3788d8", 0.0).expect("parses"), "#3788d8");
    }

    #[test]
    fn lighten_rejects_malformed_colors() {
        assert!(lighten_hex("#38d", 0.3).is_err());
        assert!(lighten_hex("#gggggg", 0.3).is_err());
        assert!(lighten_hex("blue", 0.3).is_err());
    }
}
