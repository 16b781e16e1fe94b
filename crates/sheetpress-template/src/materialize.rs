//! Cell materialization
//!
//! Every output row copies its template row: each template cell is written
//! with its template style and its content rendered in the row's scope.
//! Template cells are analysed once and the result cached, since a row inside
//! a region is rendered many times.

use ahash::AHashMap;
use sheetpress_core::{CellValue, Worksheet};

use crate::error::TemplateResult;
use crate::expand::Expansion;
use crate::layout::TemplateLayout;
use crate::placeholder::{Expression, ParsedText};
use crate::resolve::Scope;

#[derive(Debug)]
enum CellPlan {
    /// No placeholders; copied as is
    Static(CellValue),
    /// A directive marker on a rendered row
    Blank,
    /// Exactly one placeholder; the output keeps the value's type
    Typed(Expression),
    Text(ParsedText),
    Formula { parsed: ParsedText, original: CellValue },
}

impl CellPlan {
    fn build(value: &CellValue) -> Self {
        match value {
            CellValue::String(text) => {
                let parsed = ParsedText::parse(text);
                if !parsed.has_placeholders() {
                    CellPlan::Static(value.clone())
                } else if let Some(expr) = parsed.single_expression() {
                    CellPlan::Typed(expr.clone())
                } else {
                    CellPlan::Text(parsed)
                }
            }
            CellValue::Formula { text, .. } => {
                let parsed = ParsedText::parse(text);
                if parsed.has_placeholders() {
                    CellPlan::Formula {
                        parsed,
                        original: value.clone(),
                    }
                } else {
                    CellPlan::Static(value.clone())
                }
            }
            other => CellPlan::Static(other.clone()),
        }
    }

    fn render(&self, scope: &Scope<'_>) -> CellValue {
        match self {
            CellPlan::Static(value) => value.clone(),
            CellPlan::Blank => CellValue::Empty,
            CellPlan::Typed(expr) => match expr.evaluate(scope).map(|v| v.to_cell_value()) {
                Some(CellValue::String(s)) if s.is_empty() => CellValue::Empty,
                Some(value) => value,
                None => CellValue::Empty,
            },
            CellPlan::Text(parsed) => {
                let text = parsed.render_text(scope);
                if text.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::string(text)
                }
            }
            CellPlan::Formula { parsed, original } => {
                let text = parsed.render_text(scope);
                match original {
                    // Unchanged text keeps the cached result
                    CellValue::Formula { text: before, .. } if *before == text => original.clone(),
                    _ => CellValue::Formula {
                        text,
                        cached_value: None,
                    },
                }
            }
        }
    }
}

pub(crate) struct Materializer<'t> {
    template: &'t Worksheet,
    layout: &'t TemplateLayout,
    plans: AHashMap<(u32, u16), CellPlan>,
}

impl<'t> Materializer<'t> {
    pub(crate) fn new(template: &'t Worksheet, layout: &'t TemplateLayout) -> Self {
        Self {
            template,
            layout,
            plans: AHashMap::new(),
        }
    }

    /// Write every output row of `expansion` into `output`, with row heights
    /// and hidden flags.
    pub(crate) fn write(
        &mut self,
        expansion: &Expansion<'_>,
        output: &mut Worksheet,
    ) -> TemplateResult<()> {
        let template = self.template;
        let layout = self.layout;

        for (out_row, row) in expansion.rows.iter().enumerate() {
            let out_row = out_row as u32;
            let source = row.template_row;

            for (col, data) in template.cells().iter_row(source) {
                let plan = self.plans.entry((source, col)).or_insert_with(|| {
                    if layout.is_marker(source, col) {
                        CellPlan::Blank
                    } else {
                        CellPlan::build(&data.value)
                    }
                });
                let style = template.cells().style_of(Some(data));
                output.set_cell_at(out_row, col, plan.render(&row.scope), style)?;
            }

            if let Some(height) = template.custom_row_height(source) {
                output.set_row_height(out_row, height);
            }
            if template.is_row_hidden(source) {
                output.set_row_hidden(out_row, true);
            }
        }
        Ok(())
    }
}
