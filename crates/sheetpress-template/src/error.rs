//! Error types for sheetpress-template

use thiserror::Error;

/// Result type alias using [`TemplateError`]
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// Fatal template errors. Rows and columns are 1-based, as a user sees them.
///
/// Values that fail to resolve are never errors; they render as empty.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `FOR_EACH` without `END_EACH`, or the other way round
    #[error("Sheet '{sheet}', row {row}: {message}")]
    UnbalancedDirective {
        sheet: String,
        row: u32,
        message: String,
    },

    /// Unknown keyword or malformed path in a directive cell
    #[error("Sheet '{sheet}', row {row}, column {col}: {message}")]
    InvalidDirective {
        sheet: String,
        row: u32,
        col: u32,
        message: String,
    },

    /// Directives that cannot share a row
    #[error("Sheet '{sheet}', row {row}: {message}")]
    ConflictingDirectives {
        sheet: String,
        row: u32,
        message: String,
    },

    #[error("Sheet '{sheet}', row {row}: merge {range} crosses a region boundary")]
    MergeStraddlesRegion {
        sheet: String,
        range: String,
        row: u32,
    },

    #[error("Sheet '{sheet}', template row {row}: expansion exceeds {limit} rows")]
    RowLimitExceeded { sheet: String, row: u32, limit: u32 },

    #[error(transparent)]
    Core(#[from] sheetpress_core::Error),
}

impl TemplateError {
    /// Worksheet the error was raised for, if any
    pub fn sheet(&self) -> Option<&str> {
        match self {
            TemplateError::UnbalancedDirective { sheet, .. }
            | TemplateError::InvalidDirective { sheet, .. }
            | TemplateError::ConflictingDirectives { sheet, .. }
            | TemplateError::MergeStraddlesRegion { sheet, .. }
            | TemplateError::RowLimitExceeded { sheet, .. } => Some(sheet),
            TemplateError::Core(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_position() {
        let err = TemplateError::InvalidDirective {
            sheet: "Invoice".into(),
            row: 5,
            col: 2,
            message: "unknown directive 'LOOP'".into(),
        };
        assert_eq!(
            err.to_string(),
            "Sheet 'Invoice', row 5, column 2: unknown directive 'LOOP'"
        );
        assert_eq!(err.sheet(), Some("Invoice"));

        let core = TemplateError::from(sheetpress_core::Error::other("boom"));
        assert_eq!(core.to_string(), "boom");
        assert_eq!(core.sheet(), None);
    }
}
