//! Merge and picture remapping
//!
//! Both go through the same [`CoordinateMapping`] the cells were written
//! with, so a merge or picture inside a region is copied once per iteration
//! and everything below an expanded region moves with it.

use std::collections::BTreeMap;

use sheetpress_core::{CellRange, Picture};

use crate::error::{TemplateError, TemplateResult};
use crate::expand::CoordinateMapping;
use crate::layout::TemplateLayout;

/// Output merges for the template's merges.
///
/// A merge must cover rows with the same enclosing regions. Each region
/// iteration yields one copy spanning the output rows its covered template
/// rows produced; copies shrunk to a single cell or to nothing are dropped.
pub fn remap_merges(
    sheet: &str,
    merges: &[CellRange],
    layout: &TemplateLayout,
    mapping: &CoordinateMapping,
) -> TemplateResult<Vec<CellRange>> {
    let mut output = Vec::new();

    for range in merges {
        let chain = layout.chain(range.start.row);
        if let Some(row) = range.rows().find(|&row| layout.chain(row) != chain) {
            return Err(TemplateError::MergeStraddlesRegion {
                sheet: sheet.to_string(),
                range: range.to_string(),
                row: row + 1,
            });
        }

        // instance -> (first, last) output row
        let mut spans: BTreeMap<u32, (u32, u32)> = BTreeMap::new();
        for row in range.rows() {
            for target in mapping.targets(row) {
                spans
                    .entry(target.instance)
                    .and_modify(|(first, last)| {
                        *first = (*first).min(target.output_row);
                        *last = (*last).max(target.output_row);
                    })
                    .or_insert((target.output_row, target.output_row));
            }
        }

        for (first, last) in spans.into_values() {
            let copy = CellRange::from_indices(first, range.start.col, last, range.end.col);
            if copy.is_single_cell() {
                tracing::trace!(merge = %range, "merge shrunk to one cell, dropped");
                continue;
            }
            output.push(copy);
        }
    }

    output.sort();
    Ok(output)
}

/// Output pictures for the template's pictures.
///
/// Pictures follow their top-left anchor row: one copy per output image of
/// that row, moved by the row's displacement with sub-cell offsets kept.
/// Absolute anchors are copied once, unchanged.
pub fn remap_pictures(pictures: &[Picture], mapping: &CoordinateMapping) -> Vec<Picture> {
    let mut output = Vec::new();

    for picture in pictures {
        let Some(top) = picture.anchor.top_row() else {
            output.push(picture.clone());
            continue;
        };
        for out_row in mapping.output_rows(top) {
            let delta = i64::from(out_row) - i64::from(top);
            match picture.anchor.offset_rows(delta) {
                Some(anchor) => output.push(Picture {
                    anchor,
                    ..picture.clone()
                }),
                None => tracing::warn!(
                    picture = %picture.name,
                    "picture would extend past the last row, dropped"
                ),
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use sheetpress_core::{Anchor, AnchorPoint, Extent, MediaId, Position, Worksheet};

    fn template(rows: &[&str]) -> Worksheet {
        let mut ws = Worksheet::new("T");
        for (r, text) in rows.iter().enumerate() {
            if !text.is_empty() {
                ws.set_cell_value_at(r as u32, 0, *text).unwrap();
            }
        }
        ws
    }

    fn ranges(list: &[&str]) -> Vec<CellRange> {
        list.iter().map(|r| CellRange::parse(r).unwrap()).collect()
    }

    fn merges_for(ws: &Worksheet, merges: &[&str], model: serde_json::Value) -> TemplateResult<Vec<String>> {
        let model = Value::from(model);
        let layout = TemplateLayout::classify(ws).unwrap();
        let expansion = expand(&layout, &model, "T", 1000).unwrap();
        let out = remap_merges("T", &ranges(merges), &layout, &expansion.mapping)?;
        Ok(out.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_merges_follow_regions() {
        let ws = template(&["head", "#! FOR_EACH items", "{{ a }}", "{{ b }}", "#! END_EACH", "foot"]);
        let model = serde_json::json!({"items": [1, 2, 3]});
        assert_eq!(
            merges_for(&ws, &["A1:C1", "B3:C4", "A6:B6"], model).unwrap(),
            vec!["A1:C1", "B2:C3", "B4:C5", "B6:C7", "A8:B8"]
        );
    }

    #[test]
    fn test_merges_vanish_with_empty_region() {
        let ws = template(&["#! REPEAT_ROW items", "foot"]);
        assert_eq!(
            merges_for(&ws, &["B1:D1", "A2:B2"], serde_json::json!({"items": []})).unwrap(),
            vec!["A1:B1"]
        );
    }

    #[test]
    fn test_merge_over_directive_row_only_is_dropped() {
        let ws = template(&["#! FOR_EACH items", "x", "#! END_EACH"]);
        let model = serde_json::json!({"items": [1]});
        assert_eq!(merges_for(&ws, &["B1:C1"], model.clone()).unwrap(), Vec::<String>::new());
        // Including the directive row is fine; only the content row survives
        assert_eq!(merges_for(&ws, &["B1:C2"], model).unwrap(), vec!["B1:C1"]);
    }

    #[test]
    fn test_conditional_rows_shrink_merges() {
        let ws = template(&[
            "#! FOR_EACH items AS it",
            "#! IF it.show",
            "{{ it.name }}",
            "#! END_EACH",
        ]);
        let model = serde_json::json!({"items": [
            {"name": "hidden", "show": false},
            {"name": "shown", "show": true}
        ]});
        // B2:C3 shrinks to one row, D2:D3 to one cell, E2:F2 to nothing
        assert_eq!(
            merges_for(&ws, &["B2:C3", "D2:D3", "E2:F2"], model).unwrap(),
            vec!["B1:C1", "B2:C3", "D2:D3", "E2:F2"]
        );
    }

    #[test]
    fn test_merge_straddling_region_is_fatal() {
        let ws = template(&["head", "#! REPEAT_ROW items"]);
        let err = merges_for(&ws, &["A1:A2"], serde_json::json!({"items": [1]})).unwrap_err();
        match err {
            TemplateError::MergeStraddlesRegion { sheet, range, row } => {
                assert_eq!((sheet.as_str(), range.as_str(), row), ("T", "A1:A2", 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pictures_duplicate_and_shift() {
        let ws = template(&["head", "#! REPEAT_ROW items", "foot"]);
        let model = Value::from(serde_json::json!({"items": [1, 2, 3]}));
        let layout = TemplateLayout::classify(&ws).unwrap();
        let expansion = expand(&layout, &model, "T", 1000).unwrap();

        let in_region = Picture::new(
            MediaId(0),
            "row",
            Anchor::TwoCell {
                from: AnchorPoint::new(1, 3).with_offsets(100, 200),
                to: AnchorPoint::new(2, 4).with_offsets(5, 6),
            },
        );
        let below = Picture::new(
            MediaId(0),
            "below",
            Anchor::OneCell {
                from: AnchorPoint::new(2, 0),
                ext: Extent { cx: 10, cy: 10 },
            },
        );
        let floating = Picture::new(
            MediaId(1),
            "floating",
            Anchor::Absolute {
                pos: Position { x: 1, y: 2 },
                ext: Extent { cx: 3, cy: 4 },
            },
        );

        let out = remap_pictures(&[in_region, below, floating.clone()], &expansion.mapping);
        let tops: Vec<(String, Option<u32>)> = out
            .iter()
            .map(|p| (p.name.clone(), p.anchor.top_row()))
            .collect();
        assert_eq!(
            tops,
            vec![
                ("row".to_string(), Some(1)),
                ("row".to_string(), Some(2)),
                ("row".to_string(), Some(3)),
                ("below".to_string(), Some(4)),
                ("floating".to_string(), None),
            ]
        );
        assert_eq!(
            out[2].anchor,
            Anchor::TwoCell {
                from: AnchorPoint::new(3, 3).with_offsets(100, 200),
                to: AnchorPoint::new(4, 4).with_offsets(5, 6),
            }
        );
        assert_eq!(out[4], floating);
    }
}
