//! Workbook comparison
//!
//! Compares two workbooks the way a person checking a rendered report
//! would: sheet names, pictures, and within a square grid the column widths,
//! row heights, cell styles, displayed text and values.
//!
//! ```rust
//! use sheetpress::compare::{compare_workbooks, CompareOptions};
//! use sheetpress::Workbook;
//!
//! let expected = Workbook::new();
//! let mut actual = Workbook::new();
//! actual.worksheet_mut(0).unwrap().set_cell_value("B2", "x").unwrap();
//!
//! let differences = compare_workbooks(&expected, &actual, &CompareOptions::default());
//! assert_eq!(differences.len(), 1);
//! assert_eq!(
//!     differences[0].to_string(),
//!     "Sheet 'Sheet1' B2: expected text '', found 'x'"
//! );
//! ```

use std::fmt;

use sheetpress_core::{Anchor, AnchorPoint, CellAddress, CellValue, Picture, Workbook, Worksheet};

/// Options for [`compare_workbooks`]
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Side of the square grid compared cell by cell (default: 10)
    pub grid: u32,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self { grid: 10 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    SheetCount {
        expected: usize,
        actual: usize,
    },
    SheetName {
        index: usize,
        expected: String,
        actual: String,
    },
    PictureCount {
        sheet: String,
        expected: usize,
        actual: usize,
    },
    Picture {
        sheet: String,
        index: usize,
        expected: String,
        actual: String,
    },
    ColumnWidth {
        sheet: String,
        col: u16,
        expected: f64,
        actual: f64,
    },
    RowHeight {
        sheet: String,
        row: u32,
        expected: f64,
        actual: f64,
    },
    Style {
        sheet: String,
        cell: String,
    },
    Text {
        sheet: String,
        cell: String,
        expected: String,
        actual: String,
    },
    /// Same displayed text, different content (`1` against `"1"`)
    Value {
        sheet: String,
        cell: String,
        expected: CellValue,
        actual: CellValue,
    },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::SheetCount { expected, actual } => {
                write!(f, "expected {expected} worksheets, found {actual}")
            }
            Difference::SheetName {
                index,
                expected,
                actual,
            } => write!(
                f,
                "worksheet {}: expected name '{expected}', found '{actual}'",
                index + 1
            ),
            Difference::PictureCount {
                sheet,
                expected,
                actual,
            } => write!(f, "Sheet '{sheet}': expected {expected} pictures, found {actual}"),
            Difference::Picture {
                sheet,
                index,
                expected,
                actual,
            } => write!(
                f,
                "Sheet '{sheet}' picture {}: expected {expected}, found {actual}",
                index + 1
            ),
            Difference::ColumnWidth {
                sheet,
                col,
                expected,
                actual,
            } => write!(
                f,
                "Sheet '{sheet}' column {}: expected width {expected}, found {actual}",
                CellAddress::column_to_letters(*col)
            ),
            Difference::RowHeight {
                sheet,
                row,
                expected,
                actual,
            } => write!(
                f,
                "Sheet '{sheet}' row {}: expected height {expected}, found {actual}",
                row + 1
            ),
            Difference::Style { sheet, cell } => write!(f, "Sheet '{sheet}' {cell}: style differs"),
            Difference::Text {
                sheet,
                cell,
                expected,
                actual,
            } => write!(
                f,
                "Sheet '{sheet}' {cell}: expected text '{expected}', found '{actual}'"
            ),
            Difference::Value {
                sheet,
                cell,
                expected,
                actual,
            } => write!(
                f,
                "Sheet '{sheet}' {cell}: expected {} value, found {}",
                expected.type_name(),
                actual.type_name()
            ),
        }
    }
}

/// All differences between `expected` and `actual`, in worksheet order.
pub fn compare_workbooks(
    expected: &Workbook,
    actual: &Workbook,
    options: &CompareOptions,
) -> Vec<Difference> {
    let mut differences = Vec::new();

    if expected.sheet_count() != actual.sheet_count() {
        differences.push(Difference::SheetCount {
            expected: expected.sheet_count(),
            actual: actual.sheet_count(),
        });
    }

    for (index, (want, got)) in expected.worksheets().zip(actual.worksheets()).enumerate() {
        if want.name() != got.name() {
            differences.push(Difference::SheetName {
                index,
                expected: want.name().to_string(),
                actual: got.name().to_string(),
            });
        }
        compare_pictures(want, got, &mut differences);
        compare_grid(want, got, options.grid, &mut differences);
    }
    differences
}

fn describe_point(point: &AnchorPoint) -> String {
    format!(
        "{}+({},{})",
        CellAddress::new(point.row, point.col),
        point.col_off,
        point.row_off
    )
}

fn describe_picture(picture: &Picture) -> String {
    let anchor = match &picture.anchor {
        Anchor::TwoCell { from, to } => {
            format!("{} -> {}", describe_point(from), describe_point(to))
        }
        Anchor::OneCell { from, ext } => {
            format!("{} size {}x{}", describe_point(from), ext.cx, ext.cy)
        }
        Anchor::Absolute { pos, ext } => {
            format!("at ({},{}) size {}x{}", pos.x, pos.y, ext.cx, ext.cy)
        }
    };
    format!("media #{} {anchor}", picture.media.0)
}

fn compare_pictures(want: &Worksheet, got: &Worksheet, differences: &mut Vec<Difference>) {
    let sheet = want.name();
    if want.pictures().len() != got.pictures().len() {
        differences.push(Difference::PictureCount {
            sheet: sheet.to_string(),
            expected: want.pictures().len(),
            actual: got.pictures().len(),
        });
    }
    for (index, (a, b)) in want.pictures().iter().zip(got.pictures()).enumerate() {
        if a.media != b.media || a.anchor != b.anchor {
            differences.push(Difference::Picture {
                sheet: sheet.to_string(),
                index,
                expected: describe_picture(a),
                actual: describe_picture(b),
            });
        }
    }
}

fn compare_grid(want: &Worksheet, got: &Worksheet, grid: u32, differences: &mut Vec<Difference>) {
    let sheet = want.name();
    let cols = grid.min(u32::from(sheetpress_core::MAX_COLS)) as u16;

    for col in 0..cols {
        let (expected, actual) = (want.column_width(col), got.column_width(col));
        if expected != actual {
            differences.push(Difference::ColumnWidth {
                sheet: sheet.to_string(),
                col,
                expected,
                actual,
            });
        }
    }
    for row in 0..grid {
        let (expected, actual) = (want.row_height(row), got.row_height(row));
        if expected != actual {
            differences.push(Difference::RowHeight {
                sheet: sheet.to_string(),
                row,
                expected,
                actual,
            });
        }
    }

    for row in 0..grid {
        for col in 0..cols {
            let cell = CellAddress::new(row, col).to_string();
            if want.cell_style_at(row, col) != got.cell_style_at(row, col) {
                differences.push(Difference::Style {
                    sheet: sheet.to_string(),
                    cell: cell.clone(),
                });
            }

            let (expected, actual) = (want.get_value_at(row, col), got.get_value_at(row, col));
            let (expected_text, actual_text) = (expected.to_string(), actual.to_string());
            if expected_text != actual_text {
                differences.push(Difference::Text {
                    sheet: sheet.to_string(),
                    cell,
                    expected: expected_text,
                    actual: actual_text,
                });
            } else if expected != actual {
                differences.push(Difference::Value {
                    sheet: sheet.to_string(),
                    cell,
                    expected,
                    actual,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetpress_core::{Media, Style};

    #[test]
    fn test_identical_workbooks() {
        let mut workbook = Workbook::new();
        let ws = workbook.worksheet_mut(0).unwrap();
        ws.set_cell_value("A1", "same").unwrap();
        ws.set_row_height(3, 30.0);
        assert!(compare_workbooks(&workbook, &workbook.clone(), &CompareOptions::default()).is_empty());
    }

    #[test]
    fn test_sheet_level_differences() {
        let expected = Workbook::new();
        let mut actual = Workbook::new();
        actual.rename_worksheet(0, "Other").unwrap();
        actual.add_worksheet().unwrap();

        let differences = compare_workbooks(&expected, &actual, &CompareOptions::default());
        assert_eq!(
            differences,
            vec![
                Difference::SheetCount { expected: 1, actual: 2 },
                Difference::SheetName {
                    index: 0,
                    expected: "Sheet1".into(),
                    actual: "Other".into()
                },
            ]
        );
    }

    #[test]
    fn test_grid_differences() {
        let mut expected = Workbook::new();
        let mut actual = Workbook::new();
        {
            let ws = expected.worksheet_mut(0).unwrap();
            ws.set_cell_value("A1", 1).unwrap();
            ws.set_cell_value("B1", "b").unwrap();
            ws.set_column_width(2, 20.0);
            ws.set_row_height(1, 25.0);
        }
        {
            let ws = actual.worksheet_mut(0).unwrap();
            ws.set_cell_value("A1", "1").unwrap();
            ws.set_cell_value("B1", "b").unwrap();
            ws.set_cell_style("B1", &Style::new().bold(true)).unwrap();
            // Outside the grid
            ws.set_cell_value("L20", "ignored").unwrap();
        }

        let differences = compare_workbooks(&expected, &actual, &CompareOptions::default());
        let messages: Vec<String> = differences.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Sheet 'Sheet1' column C: expected width 20, found 8.43",
                "Sheet 'Sheet1' row 2: expected height 25, found 15",
                "Sheet 'Sheet1' A1: expected number value, found string",
                "Sheet 'Sheet1' B1: style differs",
            ]
        );
    }

    #[test]
    fn test_picture_differences() {
        let mut expected = Workbook::new();
        let media = expected.add_media(Media::new(vec![1], "png"));
        let mut actual = expected.clone();

        let picture = |row| {
            Picture::new(
                media,
                "p",
                Anchor::TwoCell {
                    from: AnchorPoint::new(row, 1).with_offsets(10, 20),
                    to: AnchorPoint::new(row + 1, 2),
                },
            )
        };
        expected.worksheet_mut(0).unwrap().add_picture(picture(4));
        actual.worksheet_mut(0).unwrap().add_picture(picture(5));
        actual.worksheet_mut(0).unwrap().add_picture(picture(6));

        let differences = compare_workbooks(&expected, &actual, &CompareOptions::default());
        assert_eq!(differences.len(), 2);
        assert_eq!(
            differences[1].to_string(),
            "Sheet 'Sheet1' picture 1: expected media #0 B5+(10,20) -> C6+(0,0), \
             found media #0 B6+(10,20) -> C7+(0,0)"
        );
    }
}
