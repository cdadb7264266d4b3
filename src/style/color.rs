//! Color values and their ASS / hex notations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGB color with ASS-style alpha (0 = opaque, 255 = fully transparent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);

    /// Opaque color from components
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 0 }
    }

    /// Same color with the given ASS alpha
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self {
            r: self.r,
            g: self.g,
            b: self.b,
            alpha,
        }
    }

    /// Parse `#RRGGBB` (leading `#` optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Self::rgb(r, g, b))
    }

    /// Parse `&HBBGGRR` or `&HAABBGGRR`, with or without the trailing `&`
    pub fn from_ass(ass: &str) -> Option<Self> {
        let body = ass.trim().strip_prefix("&H")?.trim_end_matches('&');
        if !body.is_ascii() {
            return None;
        }

        let (alpha, bgr) = match body.len() {
            6 => (0, body),
            8 => (u8::from_str_radix(&body[0..2], 16).ok()?, &body[2..]),
            _ => return None,
        };

        let b = u8::from_str_radix(&bgr[0..2], 16).ok()?;
        let g = u8::from_str_radix(&bgr[2..4], 16).ok()?;
        let r = u8::from_str_radix(&bgr[4..6], 16).ok()?;
        Some(Self { r, g, b, alpha })
    }

    /// `#RRGGBB`
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Style record notation: `&HAABBGGRR`
    pub fn to_ass_style(&self) -> String {
        format!(
            "&H{:02X}{:02X}{:02X}{:02X}",
            self.alpha, self.b, self.g, self.r
        )
    }

    /// Override tag notation: `&HBBGGRR&`
    pub fn to_ass_tag(&self) -> String {
        format!("&H{:02X}{:02X}{:02X}&", self.b, self.g, self.r)
    }
}

/// Accepts either `#RRGGBB` or ASS notation
impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = if s.trim_start().starts_with("&H") {
            Self::from_ass(s)
        } else {
            Self::from_hex(s)
        };
        parsed.ok_or_else(|| format!("not a color: {} (expected #RRGGBB or &HBBGGRR&)", s))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_ass_swaps_channels() {
        let gold = Color::from_hex("#FFD700").unwrap();
        assert_eq!(gold.to_ass_tag(), "&H00D7FF&");
        assert_eq!(gold.to_ass_style(), "&H0000D7FF");
    }

    #[test]
    fn test_ass_to_hex() {
        let blue = Color::from_ass("&He2904a").unwrap();
        assert_eq!(blue.to_hex(), "#4A90E2");
    }

    #[test]
    fn test_ass_with_alpha() {
        let shade = Color::from_ass("&H80000000").unwrap();
        assert_eq!(shade.alpha, 0x80);
        assert_eq!(shade.to_ass_style(), "&H80000000");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(Color::from_hex("#FFF").is_none());
        assert!(Color::from_hex("zzzzzz").is_none());
        assert!(Color::from_ass("FFFFFF").is_none());
        assert!(Color::from_ass("&H12345").is_none());
    }

    #[test]
    fn test_parse_either_notation() {
        let hex: Color = "#00FF7F".parse().unwrap();
        let ass: Color = "&H7FFF00&".parse().unwrap();
        assert_eq!(hex, ass);
        assert!("green".parse::<Color>().unwrap_err().contains("green"));
    }
}
