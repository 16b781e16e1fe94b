//! What a render did, per worksheet

use serde::Serialize;

use crate::layout::RegionKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderReport {
    pub sheets: Vec<SheetReport>,
}

impl RenderReport {
    pub fn sheet(&self, name: &str) -> Option<&SheetReport> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetReport {
    /// Name in the output workbook
    pub name: String,
    pub template_name: String,
    /// `false` for sheets copied without rendering
    pub rendered: bool,
    pub template_rows: u32,
    pub output_rows: u32,
    pub regions: Vec<RegionReport>,
}

/// One evaluation of a region's binding. Nested regions are reported once
/// per iteration of their parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReport {
    pub path: String,
    pub binding: String,
    pub kind: RegionKind,
    /// 1-based template rows
    pub start_row: u32,
    pub end_row: u32,
    pub depth: usize,
    /// Number of iterations; 0 when the region was gated off by `IF`
    pub cardinality: usize,
}
