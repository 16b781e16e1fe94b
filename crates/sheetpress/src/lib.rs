//! # sheetpress
//!
//! Render data-driven spreadsheets from XLSX templates.
//!
//! A template is an ordinary workbook whose cells hold `{{ path }}`
//! placeholders and `#!` directives. Rendering it against a JSON view-model
//! fills in the values and repeats rows to fit the data, keeping styles,
//! merges, row heights, column widths and pictures intact.
//!
//! ## Features
//!
//! - Placeholders with field and index paths and a few filters
//!   (`{{ order.lines[0].sku | upper }}`)
//! - Block regions (`#! FOR_EACH` ... `#! END_EACH`), single-row regions
//!   (`#! REPEAT_ROW`) and conditional rows (`#! IF` / `#! IF NOT`), nested
//!   to any depth
//! - Typed output: a cell holding only a placeholder keeps the value's type
//! - XLSX reading and writing
//! - A workbook comparison harness for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use sheetpress::prelude::*;
//!
//! let model = sheetpress::load_view_model("invoice.json").unwrap();
//! sheetpress::render_to_file("invoice-template.xlsx", &model, "invoice.xlsx").unwrap();
//! ```

pub mod compare;
pub mod error;
pub mod prelude;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub use error::{Error, Result};

// Re-export core types
pub use sheetpress_core::{
    Anchor, AnchorPoint, CellAddress, CellError, CellRange, CellValue, Color, Extent, FillStyle,
    FontStyle, HorizontalAlignment, Media, MediaId, NumberFormat, Picture, Position, Style,
    VerticalAlignment, Workbook, Worksheet, MAX_COLS, MAX_ROWS,
};

// Re-export template types
pub use sheetpress_template::{
    RegionReport, RenderOptions, RenderReport, Renderer, SheetReport, TemplateError,
    TemplateLayout, Value,
};

// Re-export I/O types
pub use sheetpress_xlsx::{XlsxError, XlsxReader, XlsxWriter};

/// Template internals: layout classification, placeholder parsing and the
/// row expansion passes
pub use sheetpress_template as template;

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from an `.xlsx` / `.xlsm` file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to an `.xlsx` file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") | Some("xlsm") => {
                let file = File::open(path)?;
                Ok(XlsxReader::read(BufReader::new(file))?)
            }
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension(path).as_deref() {
            Some("xlsx") => {
                let file = File::create(path)?;
                Ok(XlsxWriter::write(self, file)?)
            }
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read a JSON view-model file.
pub fn load_view_model<P: AsRef<Path>>(path: P) -> Result<Value> {
    let file = File::open(path)?;
    read_view_model(BufReader::new(file))
}

/// Read a JSON view-model from any reader, e.g. stdin.
pub fn read_view_model<R: Read>(reader: R) -> Result<Value> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load a template and render it with default options.
pub fn render_file<P: AsRef<Path>>(template: P, model: &Value) -> Result<Workbook> {
    render_file_with(&Renderer::new(), template, model)
}

/// Load a template and render it with `renderer`.
pub fn render_file_with<P: AsRef<Path>>(
    renderer: &Renderer,
    template: P,
    model: &Value,
) -> Result<Workbook> {
    let template = Workbook::open(template)?;
    Ok(renderer.render(&template, model)?)
}

/// Load, render and save. Nothing is written if rendering fails.
pub fn render_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
    template: P,
    model: &Value,
    output: Q,
) -> Result<()> {
    render_file(template, model)?.save(output)
}
