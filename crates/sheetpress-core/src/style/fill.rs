use super::Color;

/// Cell background
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FillStyle {
    #[default]
    None,
    Solid {
        color: Color,
    },
    Pattern {
        pattern: PatternType,
        foreground: Color,
        background: Color,
    },
}

impl FillStyle {
    pub fn solid(color: Color) -> Self {
        FillStyle::Solid { color }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FillStyle::None)
    }
}

/// `patternType` values of `<patternFill>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatternType {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

const PATTERN_NAMES: [(PatternType, &str); 19] = [
    (PatternType::None, "none"),
    (PatternType::Solid, "solid"),
    (PatternType::MediumGray, "mediumGray"),
    (PatternType::DarkGray, "darkGray"),
    (PatternType::LightGray, "lightGray"),
    (PatternType::DarkHorizontal, "darkHorizontal"),
    (PatternType::DarkVertical, "darkVertical"),
    (PatternType::DarkDown, "darkDown"),
    (PatternType::DarkUp, "darkUp"),
    (PatternType::DarkGrid, "darkGrid"),
    (PatternType::DarkTrellis, "darkTrellis"),
    (PatternType::LightHorizontal, "lightHorizontal"),
    (PatternType::LightVertical, "lightVertical"),
    (PatternType::LightDown, "lightDown"),
    (PatternType::LightUp, "lightUp"),
    (PatternType::LightGrid, "lightGrid"),
    (PatternType::LightTrellis, "lightTrellis"),
    (PatternType::Gray125, "gray125"),
    (PatternType::Gray0625, "gray0625"),
];

impl PatternType {
    pub fn as_xml(&self) -> &'static str {
        PATTERN_NAMES
            .iter()
            .find(|(p, _)| p == self)
            .map(|(_, name)| *name)
            .unwrap_or("none")
    }

    pub fn from_xml(s: &str) -> Option<Self> {
        PATTERN_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(p, _)| *p)
    }
}
