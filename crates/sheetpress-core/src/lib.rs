//! # sheetpress-core
//!
//! Grid document model shared by the sheetpress crates.
//!
//! - [`CellValue`], [`CellAddress`] and [`CellRange`] for cell content and addressing
//! - [`Style`] and [`StylePool`] for formatting
//! - [`Worksheet`] with row heights, column widths, merges and [`Picture`]s
//! - [`Workbook`] holding worksheets and the [`MediaStore`] pictures point into
//!
//! ## Example
//!
//! ```rust
//! use sheetpress_core::{CellRange, Style, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Invoice").unwrap();
//! sheet.set_cell_style("A1", &Style::new().bold(true)).unwrap();
//! sheet.merge_cells(&CellRange::parse("A1:C1").unwrap()).unwrap();
//! sheet.set_row_height(0, 24.0);
//! ```

pub mod cell;
pub mod error;
pub mod image;
pub mod style;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellData, CellError, CellRange, CellStorage, CellValue};
pub use error::{Error, Result};
pub use image::{
    content_type_for_extension, Anchor, AnchorPoint, Extent, Media, MediaId, MediaStore, Picture,
    Position, EMU_PER_PIXEL,
};
pub use workbook::{validate_sheet_name, Workbook};
pub use worksheet::{Worksheet, DEFAULT_COLUMN_WIDTH, DEFAULT_ROW_HEIGHT};

pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderSide, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, PatternType, Protection, Style, StylePool, Underline,
    VerticalAlignment,
};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
