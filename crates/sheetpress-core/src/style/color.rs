//! Colors as they appear in SpreadsheetML

use std::fmt;

/// A color reference.
///
/// Theme and indexed colors are kept symbolic; they are only meaningful
/// together with the workbook theme/palette, which templates carry through
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Automatic (application default)
    #[default]
    Auto,
    /// Opaque RGB
    Rgb { r: u8, g: u8, b: u8 },
    /// RGB with alpha
    Argb { a: u8, r: u8, g: u8, b: u8 },
    /// Theme slot with tint in percent (-100..=100)
    Theme { index: u8, tint: i8 },
    /// Legacy palette index
    Indexed(u8),
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    pub const fn theme(index: u8, tint: i8) -> Self {
        Color::Theme { index, tint }
    }

    /// Parse `RRGGBB` or `AARRGGBB`, with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Color::Rgb {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
            }),
            8 => Some(Color::Argb {
                a: byte(0)?,
                r: byte(2)?,
                g: byte(4)?,
                b: byte(6)?,
            }),
            _ => None,
        }
    }

    /// The 8-digit `AARRGGBB` form used by the `rgb` attribute, if the color
    /// has a literal value.
    pub fn to_argb_hex(&self) -> Option<String> {
        match self {
            Color::Rgb { r, g, b } => Some(format!("FF{:02X}{:02X}{:02X}", r, g, b)),
            Color::Argb { a, r, g, b } => Some(format!("{:02X}{:02X}{:02X}{:02X}", a, r, g, b)),
            _ => None,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Color::Auto)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => write!(f, "auto"),
            Color::Rgb { r, g, b } => write!(f, "#{:02X}{:02X}{:02X}", r, g, b),
            Color::Argb { a, r, g, b } => write!(f, "#{:02X}{:02X}{:02X}{:02X}", a, r, g, b),
            Color::Theme { index, tint } => write!(f, "theme({}, {}%)", index, tint),
            Color::Indexed(i) => write!(f, "indexed({})", i),
        }
    }
}
