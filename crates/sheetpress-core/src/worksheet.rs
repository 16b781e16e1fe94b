//! Worksheet type

use std::collections::{BTreeMap, BTreeSet};

use crate::cell::{CellAddress, CellData, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::image::Picture;
use crate::style::Style;
use crate::{MAX_COLS, MAX_ROWS};

/// Default row height in points
pub const DEFAULT_ROW_HEIGHT: f64 = 15.0;

/// Default column width in characters
pub const DEFAULT_COLUMN_WIDTH: f64 = 8.43;

/// A single sheet of a workbook
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    cells: CellStorage,
    visible: bool,
    default_row_height: f64,
    default_column_width: f64,
    row_heights: BTreeMap<u32, f64>,
    hidden_rows: BTreeSet<u32>,
    column_widths: BTreeMap<u16, f64>,
    hidden_columns: BTreeSet<u16>,
    merged_regions: Vec<CellRange>,
    pictures: Vec<Picture>,
}

impl Worksheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
            visible: true,
            default_row_height: DEFAULT_ROW_HEIGHT,
            default_column_width: DEFAULT_COLUMN_WIDTH,
            row_heights: BTreeMap::new(),
            hidden_rows: BTreeSet::new(),
            column_widths: BTreeMap::new(),
            hidden_columns: BTreeSet::new(),
            merged_regions: Vec::new(),
            pictures: Vec::new(),
        }
    }

    /// An empty sheet sharing this sheet's column layout and defaults.
    pub fn blank_like<S: Into<String>>(&self, name: S) -> Self {
        Self {
            name: name.into(),
            visible: self.visible,
            default_row_height: self.default_row_height,
            default_column_width: self.default_column_width,
            column_widths: self.column_widths.clone(),
            hidden_columns: self.hidden_columns.clone(),
            ..Self::new("")
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    // === Cell Access ===

    pub fn cells(&self) -> &CellStorage {
        &self.cells
    }

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cells.get(addr.row, addr.col))
    }

    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(row, col)
    }

    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells
            .get(row, col)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Resolved style of a cell; the default style if the cell is absent.
    pub fn cell_style_at(&self, row: u32, col: u16) -> &Style {
        self.cells.style_of(self.cells.get(row, col))
    }

    pub fn cell_style(&self, address: &str) -> Result<&Style> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_style_at(addr.row, addr.col))
    }

    /// Style stored under `index` in this sheet's pool.
    pub fn style_by_index(&self, index: u32) -> Option<&Style> {
        self.cells.styles().get(index)
    }

    // === Cell Modification ===

    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        validate_cell_position(row, col)?;
        self.cells.set_value(row, col, value.into());
        Ok(())
    }

    /// Set a formula; a leading `=` is optional.
    pub fn set_cell_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, CellValue::formula(formula))
    }

    pub fn set_cell_style(&mut self, address: &str, style: &Style) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_style_at(addr.row, addr.col, style)
    }

    pub fn set_cell_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        validate_cell_position(row, col)?;
        self.cells.set_style(row, col, style.clone());
        Ok(())
    }

    /// Write a value together with its style in one step.
    pub fn set_cell_at(&mut self, row: u32, col: u16, value: CellValue, style: &Style) -> Result<()> {
        validate_cell_position(row, col)?;
        let style_index = self.cells.intern_style(style);
        self.cells.set(row, col, CellData::new(value, style_index));
        Ok(())
    }

    pub fn clear_cell_at(&mut self, row: u32, col: u16) -> Option<CellData> {
        self.cells.remove(row, col)
    }

    /// Bounding range of all stored cells
    pub fn used_range(&self) -> Option<CellRange> {
        let (r0, c0, r1, c1) = self.cells.used_bounds()?;
        Some(CellRange::from_indices(r0, c0, r1, c1))
    }

    // === Rows and Columns ===

    pub fn default_row_height(&self) -> f64 {
        self.default_row_height
    }

    pub fn set_default_row_height(&mut self, height: f64) {
        self.default_row_height = height;
    }

    pub fn default_column_width(&self) -> f64 {
        self.default_column_width
    }

    pub fn set_default_column_width(&mut self, width: f64) {
        self.default_column_width = width;
    }

    /// Effective height of a row in points
    pub fn row_height(&self, row: u32) -> f64 {
        self.custom_row_height(row)
            .unwrap_or(self.default_row_height)
    }

    pub fn custom_row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn clear_row_height(&mut self, row: u32) {
        self.row_heights.remove(&row);
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(&row)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        if hidden {
            self.hidden_rows.insert(row);
        } else {
            self.hidden_rows.remove(&row);
        }
    }

    pub fn custom_row_heights(&self) -> &BTreeMap<u32, f64> {
        &self.row_heights
    }

    pub fn hidden_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.hidden_rows.iter().copied()
    }

    /// Effective width of a column in characters
    pub fn column_width(&self, col: u16) -> f64 {
        self.custom_column_width(col)
            .unwrap_or(self.default_column_width)
    }

    pub fn custom_column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn is_column_hidden(&self, col: u16) -> bool {
        self.hidden_columns.contains(&col)
    }

    pub fn set_column_hidden(&mut self, col: u16, hidden: bool) {
        if hidden {
            self.hidden_columns.insert(col);
        } else {
            self.hidden_columns.remove(&col);
        }
    }

    pub fn custom_column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }

    pub fn hidden_columns(&self) -> impl Iterator<Item = u16> + '_ {
        self.hidden_columns.iter().copied()
    }

    // === Merged Cells ===

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged_regions
    }

    /// Merge a range; fails if it overlaps an existing merge.
    pub fn merge_cells(&mut self, range: &CellRange) -> Result<()> {
        if let Some(existing) = self.merged_regions.iter().find(|m| m.overlaps(range)) {
            return Err(Error::MergedCellConflict {
                new: range.to_string(),
                existing: existing.to_string(),
            });
        }
        self.merged_regions.push(*range);
        Ok(())
    }

    /// Append merges without the overlap scan of [`merge_cells`].
    ///
    /// The ranges must not overlap each other or any existing merge.
    ///
    /// [`merge_cells`]: Worksheet::merge_cells
    pub fn extend_merges<I: IntoIterator<Item = CellRange>>(&mut self, ranges: I) {
        self.merged_regions.extend(ranges);
    }

    /// Remove the merge exactly matching `range`.
    pub fn unmerge_cells(&mut self, range: &CellRange) -> bool {
        let before = self.merged_regions.len();
        self.merged_regions.retain(|m| m != range);
        self.merged_regions.len() != before
    }

    // === Pictures ===

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn add_picture(&mut self, picture: Picture) {
        self.pictures.push(picture);
    }
}

fn validate_cell_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Anchor, AnchorPoint, MediaId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_values() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_value("A1", "Hello").unwrap();
        ws.set_cell_value("B1", 42.0).unwrap();
        ws.set_cell_formula("C1", "=A1&B1").unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("Hello"));
        assert_eq!(ws.get_value_at(0, 1).as_number(), Some(42.0));
        assert_eq!(ws.get_value("C1").unwrap().formula_text(), Some("A1&B1"));
        assert!(ws.get_value("Z9").unwrap().is_empty());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut ws = Worksheet::new("Test");
        assert!(ws.set_cell_value_at(MAX_ROWS, 0, 1.0).is_err());
        assert!(ws.set_cell_value_at(0, MAX_COLS, 1.0).is_err());
    }

    #[test]
    fn test_styles_and_values_together() {
        let mut ws = Worksheet::new("Test");
        let bold = Style::new().bold(true);
        ws.set_cell_at(3, 1, CellValue::from("x"), &bold).unwrap();
        ws.set_cell_at(4, 1, CellValue::Empty, &bold).unwrap();

        assert!(ws.cell_style_at(3, 1).font.bold);
        assert!(ws.cell_style_at(4, 1).font.bold);
        assert!(!ws.cell_style_at(5, 1).font.bold);
        assert_eq!(ws.cell_at(3, 1).unwrap().style_index, ws.cell_at(4, 1).unwrap().style_index);
    }

    #[test]
    fn test_row_and_column_metadata() {
        let mut ws = Worksheet::new("Test");
        ws.set_row_height(4, 30.0);
        ws.set_row_hidden(6, true);
        ws.set_column_width(2, 20.0);

        assert_eq!(ws.row_height(4), 30.0);
        assert_eq!(ws.row_height(5), DEFAULT_ROW_HEIGHT);
        assert!(ws.is_row_hidden(6));
        assert_eq!(ws.column_width(2), 20.0);
        assert_eq!(ws.custom_column_width(3), None);

        let copy = ws.blank_like("Copy");
        assert_eq!(copy.column_width(2), 20.0);
        assert_eq!(copy.custom_row_height(4), None);
    }

    #[test]
    fn test_merge_overlap_rejected() {
        let mut ws = Worksheet::new("Test");
        ws.merge_cells(&CellRange::parse("B5:C5").unwrap()).unwrap();
        ws.merge_cells(&CellRange::parse("B6:C6").unwrap()).unwrap();
        assert!(ws.merge_cells(&CellRange::parse("C5:D5").unwrap()).is_err());

        assert!(ws.unmerge_cells(&CellRange::parse("B5:C5").unwrap()));
        assert_eq!(ws.merged_regions().len(), 1);
    }

    #[test]
    fn test_extend_merges_appends_in_order() {
        let mut ws = Worksheet::new("Test");
        ws.merge_cells(&CellRange::parse("A1:B1").unwrap()).unwrap();
        ws.extend_merges((1..4).map(|row| CellRange::from_indices(row, 0, row, 1)));
        let merges: Vec<String> = ws.merged_regions().iter().map(ToString::to_string).collect();
        assert_eq!(merges, vec!["A1:B1", "A2:B2", "A3:B3", "A4:B4"]);
    }

    #[test]
    fn test_pictures() {
        let mut ws = Worksheet::new("Test");
        let anchor = Anchor::TwoCell {
            from: AnchorPoint::new(4, 3),
            to: AnchorPoint::new(5, 4),
        };
        ws.add_picture(Picture::new(MediaId(0), "Logo", anchor));
        assert_eq!(ws.pictures().len(), 1);
        assert_eq!(ws.pictures()[0].anchor.top_row(), Some(4));
    }
}
