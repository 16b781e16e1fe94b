//! Prelude module - common imports for sheetpress users
//!
//! ```rust
//! use sheetpress::prelude::*;
//! ```

pub use crate::compare::{compare_workbooks, CompareOptions, Difference};
pub use crate::{
    // Cell types
    CellAddress,
    CellRange,
    CellValue,

    // Error types
    Error,
    RenderOptions,
    // Rendering
    Renderer,
    Result,

    Style,
    TemplateError,
    Value,
    // Main types
    Workbook,
    // Extension traits
    WorkbookExt,
    Worksheet,

    // I/O types
    XlsxReader,
    XlsxWriter,
};
