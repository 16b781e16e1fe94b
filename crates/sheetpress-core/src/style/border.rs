use super::Color;

/// The five edges of a cell border
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BorderStyle {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
    pub diagonal: Option<BorderEdge>,
    pub diagonal_up: bool,
    pub diagonal_down: bool,
}

impl BorderStyle {
    /// Same edge on left, right, top and bottom.
    pub fn outline(style: BorderLineStyle, color: Color) -> Self {
        let edge = Some(BorderEdge { style, color });
        Self {
            left: edge.clone(),
            right: edge.clone(),
            top: edge.clone(),
            bottom: edge,
            ..Self::default()
        }
    }

    pub fn edge(&self, side: BorderSide) -> &Option<BorderEdge> {
        match side {
            BorderSide::Left => &self.left,
            BorderSide::Right => &self.right,
            BorderSide::Top => &self.top,
            BorderSide::Bottom => &self.bottom,
            BorderSide::Diagonal => &self.diagonal,
        }
    }

    pub fn edge_mut(&mut self, side: BorderSide) -> &mut Option<BorderEdge> {
        match side {
            BorderSide::Left => &mut self.left,
            BorderSide::Right => &mut self.right,
            BorderSide::Top => &mut self.top,
            BorderSide::Bottom => &mut self.bottom,
            BorderSide::Diagonal => &mut self.diagonal,
        }
    }

    pub fn is_empty(&self) -> bool {
        BorderSide::ALL.iter().all(|side| self.edge(*side).is_none())
    }
}

/// Which edge of a [`BorderStyle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderSide {
    Left,
    Right,
    Top,
    Bottom,
    Diagonal,
}

impl BorderSide {
    /// Order required by the `<border>` schema.
    pub const ALL: [BorderSide; 5] = [
        BorderSide::Left,
        BorderSide::Right,
        BorderSide::Top,
        BorderSide::Bottom,
        BorderSide::Diagonal,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            BorderSide::Left => "left",
            BorderSide::Right => "right",
            BorderSide::Top => "top",
            BorderSide::Bottom => "bottom",
            BorderSide::Diagonal => "diagonal",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        Some(match tag {
            b"left" | b"start" => BorderSide::Left,
            b"right" | b"end" => BorderSide::Right,
            b"top" => BorderSide::Top,
            b"bottom" => BorderSide::Bottom,
            b"diagonal" => BorderSide::Diagonal,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BorderEdge {
    pub style: BorderLineStyle,
    pub color: Color,
}

impl BorderEdge {
    pub fn new(style: BorderLineStyle, color: Color) -> Self {
        Self { style, color }
    }

    pub fn thin() -> Self {
        Self::new(BorderLineStyle::Thin, Color::BLACK)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderLineStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

impl BorderLineStyle {
    pub fn as_xml(&self) -> Option<&'static str> {
        Some(match self {
            BorderLineStyle::None => return None,
            BorderLineStyle::Thin => "thin",
            BorderLineStyle::Medium => "medium",
            BorderLineStyle::Thick => "thick",
            BorderLineStyle::Dashed => "dashed",
            BorderLineStyle::Dotted => "dotted",
            BorderLineStyle::Double => "double",
            BorderLineStyle::Hair => "hair",
            BorderLineStyle::MediumDashed => "mediumDashed",
            BorderLineStyle::DashDot => "dashDot",
            BorderLineStyle::MediumDashDot => "mediumDashDot",
            BorderLineStyle::DashDotDot => "dashDotDot",
            BorderLineStyle::MediumDashDotDot => "mediumDashDotDot",
            BorderLineStyle::SlantDashDot => "slantDashDot",
        })
    }

    pub fn from_xml(s: &str) -> Self {
        match s {
            "thin" => BorderLineStyle::Thin,
            "medium" => BorderLineStyle::Medium,
            "thick" => BorderLineStyle::Thick,
            "dashed" => BorderLineStyle::Dashed,
            "dotted" => BorderLineStyle::Dotted,
            "double" => BorderLineStyle::Double,
            "hair" => BorderLineStyle::Hair,
            "mediumDashed" => BorderLineStyle::MediumDashed,
            "dashDot" => BorderLineStyle::DashDot,
            "mediumDashDot" => BorderLineStyle::MediumDashDot,
            "dashDotDot" => BorderLineStyle::DashDotDot,
            "mediumDashDotDot" => BorderLineStyle::MediumDashDotDot,
            "slantDashDot" => BorderLineStyle::SlantDashDot,
            _ => BorderLineStyle::None,
        }
    }
}
