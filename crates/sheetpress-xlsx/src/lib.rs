//! # sheetpress-xlsx
//!
//! Reads and writes the parts of the XLSX (Office Open XML) format that
//! sheetpress templates use: cell values and formulas, styles, row heights
//! and column widths, merged regions and embedded pictures.

pub mod error;
pub mod reader;
pub mod writer;

mod drawing;
mod shared_formula;
mod styles;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
