//! Template classification
//!
//! [`TemplateLayout::classify`] finds the directive cells of a worksheet and
//! turns its rows into a tree: plain rows, and regions holding further rows
//! and regions. It also records, for every template row, the chain of
//! regions enclosing it, which is what merge remapping checks boundaries
//! against.

use std::collections::BTreeMap;

use ahash::AHashSet;
use serde::Serialize;
use sheetpress_core::Worksheet;

use crate::directive::{Binding, Directive};
use crate::error::{TemplateError, TemplateResult};
use crate::resolve::{Path, Scope};

pub type RegionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// `FOR_EACH` ... `END_EACH`, directive rows elided
    Block,
    /// `REPEAT_ROW`, the directive row itself repeats
    Row,
}

/// An `IF` / `IF NOT` marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub negated: bool,
    pub path: Path,
}

impl Condition {
    pub fn holds(&self, scope: &Scope<'_>) -> bool {
        let truthy = scope.resolve(&self.path).is_some_and(|v| v.is_truthy());
        truthy != self.negated
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    pub row: u32,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub kind: RegionKind,
    pub binding: Binding,
    /// Gate evaluated in the enclosing scope before the binding is resolved
    pub condition: Option<Condition>,
    /// First template row, the `FOR_EACH` row for blocks
    pub start_row: u32,
    /// Last template row, the `END_EACH` row for blocks
    pub end_row: u32,
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Row(RowNode),
    Region(Region),
}

#[derive(Debug, Default)]
struct RowDirectives {
    structural: Option<(u16, Directive)>,
    condition: Option<(u16, Condition)>,
}

/// A classified template worksheet
#[derive(Debug, Clone, Default)]
pub struct TemplateLayout {
    nodes: Vec<TemplateNode>,
    chains: Vec<Vec<RegionId>>,
    markers: AHashSet<(u32, u16)>,
    row_count: u32,
}

impl TemplateLayout {
    pub fn classify(worksheet: &Worksheet) -> TemplateResult<Self> {
        let sheet = worksheet.name();
        let mut directives = scan_directives(worksheet)?;
        let row_count = template_row_count(worksheet);

        let mut layout = TemplateLayout {
            row_count,
            chains: Vec::with_capacity(row_count as usize),
            ..Default::default()
        };
        let mut open: Vec<Region> = Vec::new();
        let mut next_id: RegionId = 0;

        for row in 0..row_count {
            let entry = directives.remove(&row).unwrap_or_default();
            let condition = entry.condition.map(|(col, condition)| {
                layout.markers.insert((row, col));
                condition
            });
            let chain: Vec<RegionId> = open.iter().map(|r| r.id).collect();

            match entry.structural {
                Some((_, Directive::ForEach(binding))) => {
                    open.push(Region {
                        id: next_id,
                        kind: RegionKind::Block,
                        binding,
                        condition,
                        start_row: row,
                        end_row: row,
                        children: Vec::new(),
                    });
                    next_id += 1;
                    layout.chains.push(open.iter().map(|r| r.id).collect());
                }
                Some((_, Directive::EndEach)) => {
                    layout.chains.push(chain);
                    let Some(mut region) = open.pop() else {
                        return Err(TemplateError::UnbalancedDirective {
                            sheet: sheet.to_string(),
                            row: row + 1,
                            message: "END_EACH without a matching FOR_EACH".into(),
                        });
                    };
                    region.end_row = row;
                    attach(&mut open, &mut layout.nodes, TemplateNode::Region(region));
                }
                Some((col, Directive::RepeatRow(binding))) => {
                    layout.markers.insert((row, col));
                    let mut chain = chain;
                    chain.push(next_id);
                    layout.chains.push(chain);
                    let region = Region {
                        id: next_id,
                        kind: RegionKind::Row,
                        binding,
                        condition,
                        start_row: row,
                        end_row: row,
                        children: vec![TemplateNode::Row(RowNode {
                            row,
                            condition: None,
                        })],
                    };
                    next_id += 1;
                    attach(&mut open, &mut layout.nodes, TemplateNode::Region(region));
                }
                // Conditionals never occupy the structural slot
                Some((_, Directive::If { .. })) | None => {
                    layout.chains.push(chain);
                    attach(
                        &mut open,
                        &mut layout.nodes,
                        TemplateNode::Row(RowNode { row, condition }),
                    );
                }
            }
        }

        if let Some(region) = open.last() {
            return Err(TemplateError::UnbalancedDirective {
                sheet: sheet.to_string(),
                row: region.start_row + 1,
                message: format!("FOR_EACH {} has no matching END_EACH", region.binding.path),
            });
        }
        Ok(layout)
    }

    /// Top-level nodes in row order
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    /// Rows the template spans: cells, row metadata, merges and pictures.
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Regions enclosing `row`, outermost first
    pub fn chain(&self, row: u32) -> &[RegionId] {
        self.chains.get(row as usize).map_or(&[], Vec::as_slice)
    }

    /// Directive cells kept on rendered rows; they render blank.
    pub fn is_marker(&self, row: u32, col: u16) -> bool {
        self.markers.contains(&(row, col))
    }

    /// All regions in document order, outer before inner.
    pub fn regions(&self) -> Vec<&Region> {
        fn collect<'a>(nodes: &'a [TemplateNode], out: &mut Vec<&'a Region>) {
            for node in nodes {
                if let TemplateNode::Region(region) = node {
                    out.push(region);
                    collect(&region.children, out);
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }

    /// Content rows carrying an `IF` marker, with the marker.
    pub fn conditional_rows(&self) -> Vec<(u32, &Condition)> {
        fn collect<'a>(nodes: &'a [TemplateNode], out: &mut Vec<(u32, &'a Condition)>) {
            for node in nodes {
                match node {
                    TemplateNode::Row(RowNode {
                        row,
                        condition: Some(condition),
                    }) => out.push((*row, condition)),
                    TemplateNode::Row(_) => {}
                    TemplateNode::Region(region) => collect(&region.children, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }
}

fn attach(open: &mut [Region], top: &mut Vec<TemplateNode>, node: TemplateNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn scan_directives(worksheet: &Worksheet) -> TemplateResult<BTreeMap<u32, RowDirectives>> {
    let sheet = worksheet.name();
    let conflict = |row: u32, message: String| TemplateError::ConflictingDirectives {
        sheet: sheet.to_string(),
        row: row + 1,
        message,
    };

    let mut rows: BTreeMap<u32, RowDirectives> = BTreeMap::new();
    for (row, col, data) in worksheet.cells().iter() {
        let directive = match Directive::from_cell(&data.value) {
            None => continue,
            Some(Ok(directive)) => directive,
            Some(Err(err)) => {
                return Err(TemplateError::InvalidDirective {
                    sheet: sheet.to_string(),
                    row: row + 1,
                    col: u32::from(col) + 1,
                    message: err.to_string(),
                });
            }
        };

        let entry = rows.entry(row).or_default();
        match directive {
            Directive::If { negated, path } => {
                if entry.condition.is_some() {
                    return Err(conflict(row, "more than one IF on a row".into()));
                }
                entry.condition = Some((col, Condition { negated, path }));
            }
            structural => {
                if let Some((_, existing)) = &entry.structural {
                    return Err(conflict(
                        row,
                        format!(
                            "{} and {} on the same row",
                            existing.keyword(),
                            structural.keyword()
                        ),
                    ));
                }
                entry.structural = Some((col, structural));
            }
        }
    }

    for (&row, entry) in &rows {
        if matches!(entry.structural, Some((_, Directive::EndEach))) && entry.condition.is_some() {
            return Err(conflict(row, "IF cannot be applied to END_EACH".into()));
        }
    }
    Ok(rows)
}

fn template_row_count(worksheet: &Worksheet) -> u32 {
    let last = [
        worksheet.cells().row_indices().last(),
        worksheet.custom_row_heights().keys().next_back().copied(),
        worksheet.hidden_rows().last(),
        worksheet.merged_regions().iter().map(|m| m.end.row).max(),
        worksheet
            .pictures()
            .iter()
            .filter_map(|p| p.anchor.top_row())
            .max(),
    ]
    .into_iter()
    .flatten()
    .max();
    last.map_or(0, |row| row + 1)
}
