//! Error types for sheetpress-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the document model
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u16, u16),

    #[error("Sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: String },

    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// A new merge overlaps an existing one
    #[error("Merge {new} overlaps existing merge {existing}")]
    MergedCellConflict { new: String, existing: String },

    #[error("Picture '{picture}' references unknown media #{media}")]
    UnknownMedia { picture: String, media: u32 },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    pub(crate) fn invalid_sheet_name(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidSheetName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
