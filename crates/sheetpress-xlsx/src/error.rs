//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur while reading or writing an XLSX package
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The package is not a spreadsheet (no content types, no workbook)
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// A part was present but its content could not be understood
    #[error("Parse error in {part}: {message}")]
    Parse { part: String, message: String },

    #[error(transparent)]
    Core(#[from] sheetpress_core::Error),
}

impl XlsxError {
    pub(crate) fn parse(part: &str, message: impl Into<String>) -> Self {
        XlsxError::Parse {
            part: part.to_string(),
            message: message.into(),
        }
    }
}
