//! Error type for the sheetpress facade

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] sheetpress_template::TemplateError),

    #[error(transparent)]
    Xlsx(#[from] sheetpress_xlsx::XlsxError),

    #[error(transparent)]
    Core(#[from] sheetpress_core::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid view-model: {0}")]
    ViewModel(#[from] serde_json::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}
