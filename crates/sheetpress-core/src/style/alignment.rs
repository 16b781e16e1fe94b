/// Text placement inside a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u8,
    /// Degrees, or 255 for stacked text
    pub rotation: i16,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

const HORIZONTAL_NAMES: [(HorizontalAlignment, &str); 8] = [
    (HorizontalAlignment::General, "general"),
    (HorizontalAlignment::Left, "left"),
    (HorizontalAlignment::Center, "center"),
    (HorizontalAlignment::Right, "right"),
    (HorizontalAlignment::Fill, "fill"),
    (HorizontalAlignment::Justify, "justify"),
    (HorizontalAlignment::CenterContinuous, "centerContinuous"),
    (HorizontalAlignment::Distributed, "distributed"),
];

impl HorizontalAlignment {
    /// The `horizontal` attribute value in styles.xml
    pub fn as_xml(&self) -> &'static str {
        lookup_name(&HORIZONTAL_NAMES, *self)
    }

    pub fn from_xml(s: &str) -> Option<Self> {
        lookup_value(&HORIZONTAL_NAMES, s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

const VERTICAL_NAMES: [(VerticalAlignment, &str); 5] = [
    (VerticalAlignment::Top, "top"),
    (VerticalAlignment::Center, "center"),
    (VerticalAlignment::Bottom, "bottom"),
    (VerticalAlignment::Justify, "justify"),
    (VerticalAlignment::Distributed, "distributed"),
];

impl VerticalAlignment {
    pub fn as_xml(&self) -> &'static str {
        lookup_name(&VERTICAL_NAMES, *self)
    }

    pub fn from_xml(s: &str) -> Option<Self> {
        lookup_value(&VERTICAL_NAMES, s)
    }
}

fn lookup_name<T: PartialEq>(table: &[(T, &'static str)], value: T) -> &'static str {
    table
        .iter()
        .find(|(v, _)| *v == value)
        .map_or("", |(_, name)| *name)
}

fn lookup_value<T: Copy>(table: &[(T, &'static str)], name: &str) -> Option<T> {
    table.iter().find(|(_, n)| *n == name).map(|(v, _)| *v)
}
