//! Cell formatting
//!
//! A [`Style`] is a complete, self-contained description of how a cell is
//! drawn. Worksheets intern styles in a [`StylePool`], so equality of two
//! cells' formatting is plain `==` on their resolved `Style`s.

mod alignment;
mod border;
mod color;
mod fill;
mod font;
mod number_format;
mod pool;

pub use alignment::{Alignment, HorizontalAlignment, VerticalAlignment};
pub use border::{BorderEdge, BorderLineStyle, BorderSide, BorderStyle};
pub use color::Color;
pub use fill::{FillStyle, PatternType};
pub use font::{FontStyle, Underline};
pub use number_format::NumberFormat;
pub use pool::StylePool;

/// Complete cell style
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub font: FontStyle,
    pub fill: FillStyle,
    pub border: BorderStyle,
    pub alignment: Alignment,
    pub number_format: NumberFormat,
    pub protection: Protection,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font.size = size;
        self
    }

    pub fn font_name<S: Into<String>>(mut self, name: S) -> Self {
        self.font.name = name.into();
        self
    }

    pub fn font_color(mut self, color: Color) -> Self {
        self.font.color = color;
        self
    }

    pub fn fill(mut self, fill: FillStyle) -> Self {
        self.fill = fill;
        self
    }

    pub fn border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    pub fn number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = format;
        self
    }

    pub fn horizontal_alignment(mut self, align: HorizontalAlignment) -> Self {
        self.alignment.horizontal = align;
        self
    }

    pub fn wrap_text(mut self, wrap: bool) -> Self {
        self.alignment.wrap_text = wrap;
        self
    }
}

/// Cell protection flags (effective only on protected sheets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}
