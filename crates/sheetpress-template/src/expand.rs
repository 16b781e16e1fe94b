//! Layout expansion
//!
//! Walks the classified template tree against the view-model and produces
//! the output rows in order, each remembering the template row it copies
//! and the scope it renders in. The same walk builds the
//! [`CoordinateMapping`] that cells, merges and pictures are remapped
//! through.

use std::borrow::Cow;

use crate::error::{TemplateError, TemplateResult};
use crate::layout::{Region, TemplateLayout, TemplateNode};
use crate::report::RegionReport;
use crate::resolve::{Frame, Scope};
use crate::value::Value;

/// Instance id of rows outside every region
pub const TOP_LEVEL: u32 = 0;

/// One output image of a template row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub output_row: u32,
    /// Innermost region iteration that produced the row
    pub instance: u32,
}

/// Template row -> output rows, in output order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateMapping {
    targets: Vec<Vec<Target>>,
}

impl CoordinateMapping {
    fn with_rows(row_count: u32) -> Self {
        Self {
            targets: vec![Vec::new(); row_count as usize],
        }
    }

    fn push(&mut self, template_row: u32, target: Target) {
        if let Some(targets) = self.targets.get_mut(template_row as usize) {
            targets.push(target);
        }
    }

    /// Empty for elided rows and rows of regions with no items.
    pub fn targets(&self, template_row: u32) -> &[Target] {
        self.targets
            .get(template_row as usize)
            .map_or(&[], Vec::as_slice)
    }

    pub fn output_rows(&self, template_row: u32) -> impl Iterator<Item = u32> + '_ {
        self.targets(template_row).iter().map(|t| t.output_row)
    }

    /// Output cells a template cell is copied to; columns never move.
    pub fn map_cell(&self, row: u32, col: u16) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.output_rows(row).map(move |out| (out, col))
    }
}

/// An output row: which template row it copies and its rendering scope
#[derive(Debug, Clone)]
pub struct OutputRow<'a> {
    pub template_row: u32,
    pub instance: u32,
    pub scope: Scope<'a>,
}

#[derive(Debug)]
pub struct Expansion<'a> {
    /// Indexed by output row
    pub rows: Vec<OutputRow<'a>>,
    pub mapping: CoordinateMapping,
    pub regions: Vec<RegionReport>,
}

/// Expand `layout` against `model`, failing once more than `max_rows` rows
/// would be produced.
pub fn expand<'a>(
    layout: &'a TemplateLayout,
    model: &'a Value,
    sheet: &str,
    max_rows: u32,
) -> TemplateResult<Expansion<'a>> {
    let mut expander = Expander {
        sheet,
        max_rows,
        rows: Vec::new(),
        mapping: CoordinateMapping::with_rows(layout.row_count()),
        regions: Vec::new(),
        last_instance: TOP_LEVEL,
    };
    let mut scope = Scope::new(model);
    expander.walk(layout.nodes(), &mut scope, TOP_LEVEL)?;

    Ok(Expansion {
        rows: expander.rows,
        mapping: expander.mapping,
        regions: expander.regions,
    })
}

struct Expander<'a, 's> {
    sheet: &'s str,
    max_rows: u32,
    rows: Vec<OutputRow<'a>>,
    mapping: CoordinateMapping,
    regions: Vec<RegionReport>,
    last_instance: u32,
}

impl<'a> Expander<'a, '_> {
    fn walk(
        &mut self,
        nodes: &'a [TemplateNode],
        scope: &mut Scope<'a>,
        instance: u32,
    ) -> TemplateResult<()> {
        for node in nodes {
            match node {
                TemplateNode::Row(row) => {
                    if row.condition.as_ref().map_or(true, |c| c.holds(scope)) {
                        self.emit(row.row, instance, scope)?;
                    }
                }
                TemplateNode::Region(region) => self.expand_region(region, scope)?,
            }
        }
        Ok(())
    }

    fn expand_region(&mut self, region: &'a Region, scope: &mut Scope<'a>) -> TemplateResult<()> {
        let gated_off = region.condition.as_ref().is_some_and(|c| !c.holds(scope));
        let items: &'a [Value] = if gated_off {
            &[]
        } else {
            match scope.resolve(&region.binding.path) {
                Some(Cow::Borrowed(value)) => value.as_sequence().unwrap_or(&[]),
                _ => &[],
            }
        };

        tracing::debug!(
            path = %region.binding.path,
            binding = %region.binding.name,
            row = region.start_row + 1,
            cardinality = items.len(),
            gated_off,
            "expanding region"
        );
        self.regions.push(RegionReport {
            path: region.binding.path.to_string(),
            binding: region.binding.name.clone(),
            kind: region.kind,
            start_row: region.start_row + 1,
            end_row: region.end_row + 1,
            depth: scope.depth(),
            cardinality: items.len(),
        });

        for (index, item) in items.iter().enumerate() {
            self.last_instance += 1;
            let instance = self.last_instance;
            scope.push(Frame {
                name: &region.binding.name,
                item,
                index,
            });
            let result = self.walk(&region.children, scope, instance);
            scope.pop();
            result?;
        }
        Ok(())
    }

    fn emit(&mut self, template_row: u32, instance: u32, scope: &Scope<'a>) -> TemplateResult<()> {
        if self.rows.len() >= self.max_rows as usize {
            return Err(TemplateError::RowLimitExceeded {
                sheet: self.sheet.to_string(),
                row: template_row + 1,
                limit: self.max_rows,
            });
        }
        let output_row = self.rows.len() as u32;
        self.mapping.push(
            template_row,
            Target {
                output_row,
                instance,
            },
        );
        self.rows.push(OutputRow {
            template_row,
            instance,
            scope: scope.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetpress_core::Worksheet;

    fn layout(rows: &[&str]) -> TemplateLayout {
        let mut ws = Worksheet::new("T");
        for (r, text) in rows.iter().enumerate() {
            if !text.is_empty() {
                ws.set_cell_value_at(r as u32, 0, *text).unwrap();
            }
        }
        TemplateLayout::classify(&ws).unwrap()
    }

    fn template_rows(expansion: &Expansion<'_>) -> Vec<u32> {
        expansion.rows.iter().map(|r| r.template_row).collect()
    }

    #[test]
    fn test_identity_without_regions() {
        let layout = layout(&["a", "", "c"]);
        let model = Value::Null;
        let expansion = expand(&layout, &model, "T", 100).unwrap();
        assert_eq!(template_rows(&expansion), vec![0, 1, 2]);
        assert_eq!(expansion.mapping.output_rows(2).collect::<Vec<_>>(), vec![2]);
        assert_eq!(expansion.mapping.map_cell(1, 4).collect::<Vec<_>>(), vec![(1, 4)]);
    }

    #[test]
    fn test_block_cardinality() {
        let layout = layout(&["head", "#! FOR_EACH items", "{{ name }}", "", "#! END_EACH", "foot"]);
        let model = Value::from(serde_json::json!({"items": [{"name": "a"}, {"name": "b"}]}));
        let expansion = expand(&layout, &model, "T", 100).unwrap();

        assert_eq!(template_rows(&expansion), vec![0, 2, 3, 2, 3, 5]);
        assert!(expansion.mapping.targets(1).is_empty());
        assert!(expansion.mapping.targets(4).is_empty());
        assert_eq!(
            expansion.mapping.targets(2),
            &[
                Target { output_row: 1, instance: 1 },
                Target { output_row: 3, instance: 2 }
            ]
        );
        assert_eq!(expansion.rows[3].scope.frames()[0].index, 1);
        assert_eq!(expansion.regions[0].cardinality, 2);
    }

    #[test]
    fn test_empty_and_missing_sequences_vanish() {
        let layout = layout(&["head", "#! REPEAT_ROW items", "foot"]);
        for model in [
            serde_json::json!({"items": []}),
            serde_json::json!({}),
            serde_json::json!({"items": "not a list"}),
        ] {
            let model = Value::from(model);
            let expansion = expand(&layout, &model, "T", 100).unwrap();
            assert_eq!(template_rows(&expansion), vec![0, 2]);
            assert_eq!(expansion.mapping.output_rows(2).collect::<Vec<_>>(), vec![1]);
        }
    }

    #[test]
    fn test_nested_instances() {
        let layout = layout(&[
            "#! FOR_EACH groups AS g",
            "{{ g.title }}",
            "#! REPEAT_ROW g.members",
            "#! END_EACH",
        ]);
        let model = Value::from(serde_json::json!({"groups": [
            {"title": "x", "members": [1, 2]},
            {"title": "y", "members": []},
            {"title": "z", "members": [3]}
        ]}));
        let expansion = expand(&layout, &model, "T", 100).unwrap();

        assert_eq!(template_rows(&expansion), vec![1, 2, 2, 1, 1, 2]);
        let instances: Vec<u32> = expansion.rows.iter().map(|r| r.instance).collect();
        // Each group and each member iteration gets its own id
        assert_eq!(instances, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(
            expansion.regions.iter().map(|r| r.cardinality).collect::<Vec<_>>(),
            vec![3, 2, 0, 1]
        );
        assert_eq!(expansion.regions[1].depth, 1);
    }

    #[test]
    fn test_conditions() {
        let layout = layout(&["#! IF show", "always", "#! FOR_EACH items", "{{ $index }}", "#! END_EACH"]);
        let model = Value::from(serde_json::json!({"show": false, "items": [1, 2]}));
        let expansion = expand(&layout, &model, "T", 100).unwrap();
        assert_eq!(template_rows(&expansion), vec![1, 3, 3]);
    }

    #[test]
    fn test_condition_gates_region_before_binding() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value_at(0, 0, "#! REPEAT_ROW items").unwrap();
        ws.set_cell_value_at(0, 1, "#! IF NOT hide").unwrap();
        let layout = TemplateLayout::classify(&ws).unwrap();

        let model = Value::from(serde_json::json!({"hide": true, "items": [1, 2, 3]}));
        let expansion = expand(&layout, &model, "T", 100).unwrap();
        assert!(expansion.rows.is_empty());
        assert_eq!(expansion.regions[0].cardinality, 0);

        let model = Value::from(serde_json::json!({"hide": false, "items": [1, 2, 3]}));
        assert_eq!(expand(&layout, &model, "T", 100).unwrap().rows.len(), 3);
    }

    #[test]
    fn test_row_limit() {
        let layout = layout(&["head", "#! REPEAT_ROW items"]);
        let model = Value::from(serde_json::json!({"items": [1, 2, 3]}));
        assert_eq!(expand(&layout, &model, "T", 4).unwrap().rows.len(), 4);

        let err = expand(&layout, &model, "T", 3).unwrap_err();
        assert!(
            matches!(err, TemplateError::RowLimitExceeded { row: 2, limit: 3, .. }),
            "{err}"
        );
    }
}
