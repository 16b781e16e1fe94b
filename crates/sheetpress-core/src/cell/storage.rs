//! Sparse cell storage
//!
//! Only cells with a value or a non-default style are stored, in a
//! row-major `BTreeMap<row, BTreeMap<col, CellData>>` so iteration yields
//! cells in the order a worksheet part lists them.

use std::collections::BTreeMap;

use super::CellValue;
use crate::style::{Style, StylePool};

/// A stored cell: its value and an index into the sheet's [`StylePool`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellData {
    pub value: CellValue,
    pub style_index: u32,
}

impl CellData {
    pub fn new(value: CellValue, style_index: u32) -> Self {
        Self { value, style_index }
    }

    /// No value and the default style.
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,
    styles: StylePool,
}

impl CellStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row)?.get(&col)
    }

    /// Store `data`; blank cells are removed instead.
    pub fn set(&mut self, row: u32, col: u16, data: CellData) {
        if data.is_blank() {
            self.remove(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, data);
        }
    }

    /// Replace the value, keeping the cell's style.
    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        let style_index = self.get(row, col).map_or(0, |c| c.style_index);
        self.set(row, col, CellData::new(value, style_index));
    }

    /// Replace the style, keeping the cell's value.
    pub fn set_style(&mut self, row: u32, col: u16, style: Style) {
        let style_index = self.styles.get_or_insert(style);
        let value = self
            .get(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default();
        self.set(row, col, CellData::new(value, style_index));
    }

    /// Pool index of `style`, cloning it only on first use.
    pub fn intern_style(&mut self, style: &Style) -> u32 {
        match self.styles.index_of(style) {
            Some(idx) => idx,
            None => self.styles.get_or_insert(style.clone()),
        }
    }

    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellData> {
        let cols = self.rows.get_mut(&row)?;
        let removed = cols.remove(&col);
        if cols.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    pub fn styles(&self) -> &StylePool {
        &self.styles
    }

    /// Resolved style of a cell; the default style for absent cells.
    pub fn style_of(&self, data: Option<&CellData>) -> &Style {
        let index = data.map_or(0, |c| c.style_index);
        self.styles
            .get(index)
            .unwrap_or_else(|| self.styles.default_style())
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(min_row, min_col, max_row, max_col)` of stored cells.
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;
        let min_col = self.rows.values().filter_map(|r| r.keys().next()).min()?;
        let max_col = self.rows.values().filter_map(|r| r.keys().next_back()).max()?;
        Some((min_row, *min_col, max_row, *max_col))
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, data)| (row, col, data)))
    }

    pub fn iter_row(&self, row: u32) -> impl Iterator<Item = (u16, &CellData)> {
        self.rows
            .get(&row)
            .into_iter()
            .flat_map(|cols| cols.iter().map(|(&col, data)| (col, data)))
    }

    pub fn row_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }
}
