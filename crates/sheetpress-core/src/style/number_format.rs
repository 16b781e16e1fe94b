/// Number format of a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    #[default]
    General,
    /// One of the implicit formats with an id below 164
    BuiltIn(u32),
    /// A format code stored in the workbook's `<numFmts>`
    Custom(String),
}

impl NumberFormat {
    /// First id available for workbook-defined formats
    pub const FIRST_CUSTOM_ID: u32 = 164;

    pub fn custom<S: Into<String>>(code: S) -> Self {
        NumberFormat::Custom(code.into())
    }

    /// Resolve a `numFmtId` against the workbook's custom codes.
    pub fn from_id(id: u32, custom_code: Option<&str>) -> Self {
        match (id, custom_code) {
            (_, Some(code)) => NumberFormat::Custom(code.to_string()),
            (0, None) => NumberFormat::General,
            (id, None) => NumberFormat::BuiltIn(id),
        }
    }

    pub fn is_general(&self) -> bool {
        matches!(self, NumberFormat::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id() {
        assert_eq!(NumberFormat::from_id(0, None), NumberFormat::General);
        assert_eq!(NumberFormat::from_id(14, None), NumberFormat::BuiltIn(14));
        assert_eq!(
            NumberFormat::from_id(164, Some("0.000")),
            NumberFormat::custom("0.000")
        );
    }
}
