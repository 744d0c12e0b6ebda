use std::sync::OnceLock;

use regex::Regex;

use crate::settings::Theme;

/// Returned for any color string that is not a six-digit hex triple.
pub const FALLBACK_RGB: Rgb = Rgb::new(255, 255, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or `rrggbb`, case-insensitive.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let captures = hex_pattern().captures(value.trim())?;
        let channel = |index: usize| u8::from_str_radix(&captures[index], 16).ok();
        Some(Self::new(channel(1)?, channel(2)?, channel(3)?))
    }

    pub fn from_hex_or_fallback(value: &str) -> Self {
        Self::parse_hex(value).unwrap_or(FALLBACK_RGB)
    }

    pub fn with_alpha(self, alpha: f64) -> Rgba {
        Rgba { rgb: self, alpha }
    }

    pub fn gray(level: u8) -> Self {
        Self::new(level, level, level)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn hex_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^#?([a-f\d]{2})([a-f\d]{2})([a-f\d]{2})$")
            .unwrap_or_else(|error| unreachable!("hex color pattern is valid: {error}"))
    })
}

/// An RGB color with a canvas-style alpha in `0.0..=1.0`. Out-of-range alphas
/// are clamped when the color is resolved for drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: f64,
}

impl Rgba {
    pub fn alpha_u8(self) -> u8 {
        let alpha = if self.alpha.is_finite() {
            self.alpha.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (alpha * 255.0).round() as u8
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.rgb.r, self.rgb.g, self.rgb.b, self.alpha_u8())
    }
}

/// Per-channel linear interpolation, `round(a + (b - a) * ratio)`.
///
/// Rounding is half-up, matching the reference rendering.
pub fn blend(a: Rgb, b: Rgb, ratio: f64) -> Rgb {
    let channel = |from: u8, to: u8| {
        let from = f64::from(from);
        let value = (from + (f64::from(to) - from) * ratio + 0.5).floor();
        value.clamp(0.0, 255.0) as u8
    };
    Rgb::new(channel(a.r, b.r), channel(a.g, b.g), channel(a.b, b.b))
}

/// String form of [`blend`]; unparseable inputs resolve to [`FALLBACK_RGB`].
pub fn blend_hex(a: &str, b: &str, ratio: f64) -> Rgb {
    blend(
        Rgb::from_hex_or_fallback(a),
        Rgb::from_hex_or_fallback(b),
        ratio,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTriple {
    pub primary_background: Rgb,
    pub card_background: Rgb,
    pub accent: Rgb,
}

impl ColorTriple {
    pub const DARK: Self = Self {
        primary_background: Rgb::new(0x14, 0x14, 0x14),
        card_background: Rgb::new(0x19, 0x19, 0x19),
        accent: Rgb::new(0xff, 0x73, 0x00),
    };

    pub const LIGHT: Self = Self {
        primary_background: Rgb::new(0xf8, 0xf8, 0xf8),
        card_background: Rgb::new(0xff, 0xff, 0xff),
        accent: Rgb::new(0xff, 0x73, 0x00),
    };

    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self::DARK,
            Theme::Light => Self::LIGHT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_endpoints_return_inputs() {
        let a = Rgb::new(0x14, 0x14, 0x14);
        let b = Rgb::new(0xff, 0x73, 0x00);
        assert_eq!(blend(a, b, 0.0), a);
        assert_eq!(blend(a, b, 1.0), b);
    }

    #[test]
    fn blend_midpoint_rounds_half_up() {
        let a = Rgb::new(0x14, 0x14, 0x14);
        let b = Rgb::new(0x19, 0x19, 0x19);
        // 20 + 5 * 0.5 = 22.5
        assert_eq!(blend(a, b, 0.5), Rgb::gray(23));
        assert_eq!(blend(b, a, 0.5), Rgb::gray(23));
        assert_eq!(
            blend(Rgb::new(0, 10, 255), Rgb::new(255, 0, 0), 0.5),
            Rgb::new(128, 5, 128)
        );
    }

    #[test]
    fn parse_hex_accepts_optional_hash_and_mixed_case() {
        assert_eq!(Rgb::parse_hex("#FF7300"), Some(Rgb::new(255, 115, 0)));
        assert_eq!(Rgb::parse_hex("f8f8f8"), Some(Rgb::gray(0xf8)));
        assert_eq!(Rgb::parse_hex("#fff"), None);
        assert_eq!(Rgb::parse_hex("rgb(1, 2, 3)"), None);
    }

    #[test]
    fn malformed_colors_blend_from_white() {
        assert_eq!(blend_hex("not-a-color", "#000000", 0.0), FALLBACK_RGB);
        assert_eq!(blend_hex("#000000", "zzz", 1.0), FALLBACK_RGB);
    }

    #[test]
    fn accent_is_theme_invariant() {
        assert_eq!(
            ColorTriple::for_theme(Theme::Dark).accent,
            ColorTriple::for_theme(Theme::Light).accent
        );
        assert_eq!(ColorTriple::DARK.primary_background.to_hex(), "#141414");
        assert_eq!(ColorTriple::LIGHT.card_background.to_hex(), "#ffffff");
    }

    #[test]
    fn alpha_is_clamped_when_resolved() {
        assert_eq!(Rgb::gray(0).with_alpha(1.7).alpha_u8(), 255);
        assert_eq!(Rgb::gray(0).with_alpha(-0.2).alpha_u8(), 0);
        assert_eq!(Rgb::gray(0).with_alpha(0.5).alpha_u8(), 128);
    }
}
