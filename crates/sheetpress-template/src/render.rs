//! The renderer: classify, expand, materialize and remap each worksheet
//!
//! # Example
//!
//! ```rust
//! use sheetpress_core::{CellValue, Workbook};
//! use sheetpress_template::{Renderer, Value};
//!
//! let mut template = Workbook::new();
//! let sheet = template.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", "Invoice {{ number }}").unwrap();
//! sheet.set_cell_value("A2", "#! REPEAT_ROW lines").unwrap();
//! sheet.set_cell_value("B2", "{{ sku }}").unwrap();
//! sheet.set_cell_value("C2", "{{ qty }}").unwrap();
//!
//! let model = Value::from(serde_json::json!({
//!     "number": 7,
//!     "lines": [{"sku": "A-1", "qty": 2}, {"sku": "B-9", "qty": 5}]
//! }));
//! let output = Renderer::new().render(&template, &model).unwrap();
//!
//! let sheet = output.worksheet(0).unwrap();
//! assert_eq!(sheet.get_value("A1").unwrap(), CellValue::string("Invoice 7"));
//! assert_eq!(sheet.get_value("C3").unwrap(), CellValue::Number(5.0));
//! ```

use sheetpress_core::{Workbook, Worksheet, MAX_ROWS};

use crate::error::TemplateResult;
use crate::expand::expand;
use crate::layout::TemplateLayout;
use crate::materialize::Materializer;
use crate::placeholder::ParsedText;
use crate::remap::{remap_merges, remap_pictures};
use crate::report::{RenderReport, SheetReport};
use crate::resolve::Scope;
use crate::value::Value;

/// Options for rendering a template workbook
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Render placeholders in worksheet names (default: true)
    pub render_sheet_names: bool,
    /// Only render worksheets with these names; others are copied verbatim.
    /// `None` renders every worksheet.
    pub sheets: Option<Vec<String>>,
    /// Maximum number of output rows per worksheet (default: 1,048,576)
    pub max_rows: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            render_sheet_names: true,
            sheets: None,
            max_rows: MAX_ROWS,
        }
    }
}

impl RenderOptions {
    fn selects(&self, sheet: &str) -> bool {
        self.sheets
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n.eq_ignore_ascii_case(sheet)))
    }
}

/// Renders template workbooks against view-models.
///
/// A renderer holds only its options; the template is never modified, so
/// one template can be rendered many times, from several threads at once.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render every worksheet of `template` into a new workbook.
    ///
    /// The output shares the template's media, so picture media ids stay
    /// valid. Nothing is returned if any worksheet fails.
    pub fn render(&self, template: &Workbook, model: &Value) -> TemplateResult<Workbook> {
        self.render_with_report(template, model)
            .map(|(workbook, _)| workbook)
    }

    pub fn render_with_report(
        &self,
        template: &Workbook,
        model: &Value,
    ) -> TemplateResult<(Workbook, RenderReport)> {
        let mut output = Workbook::empty();
        output.set_media(template.media().clone());
        let mut report = RenderReport::default();

        for sheet in template.worksheets() {
            let selected = self.options.selects(sheet.name());
            let (mut rendered, mut sheet_report) = if selected {
                self.render_sheet(sheet, model)?
            } else {
                tracing::debug!(sheet = %sheet.name(), "copying worksheet without rendering");
                (sheet.clone(), verbatim_report(sheet))
            };

            let raw_name = if selected && self.options.render_sheet_names {
                render_sheet_name(sheet.name(), model)
            } else {
                sheet.name().to_string()
            };
            let name = output.unique_sheet_name(&raw_name);
            rendered.set_name(name.clone());
            sheet_report.name = name;

            output.add_existing_worksheet(rendered)?;
            report.sheets.push(sheet_report);
        }

        if template.active_sheet() < output.sheet_count() {
            output.set_active_sheet(template.active_sheet())?;
        }
        Ok((output, report))
    }

    /// Render one worksheet. The result keeps the template's name and its
    /// pictures keep their media ids.
    pub fn render_worksheet(&self, template: &Worksheet, model: &Value) -> TemplateResult<Worksheet> {
        self.render_sheet(template, model).map(|(sheet, _)| sheet)
    }

    fn render_sheet(
        &self,
        template: &Worksheet,
        model: &Value,
    ) -> TemplateResult<(Worksheet, SheetReport)> {
        let span = tracing::info_span!("render_worksheet", sheet = %template.name());
        let _enter = span.enter();

        let name = template.name();
        let layout = TemplateLayout::classify(template)?;
        let expansion = expand(&layout, model, name, self.options.max_rows)?;

        let mut output = template.blank_like(name);
        Materializer::new(template, &layout).write(&expansion, &mut output)?;
        // Template merges are disjoint and every copy lands on its own rows
        output.extend_merges(remap_merges(
            name,
            template.merged_regions(),
            &layout,
            &expansion.mapping,
        )?);
        for picture in remap_pictures(template.pictures(), &expansion.mapping) {
            output.add_picture(picture);
        }

        let output_rows = expansion.rows.len() as u32;
        tracing::info!(
            template_rows = layout.row_count(),
            output_rows,
            regions = expansion.regions.len(),
            "worksheet rendered"
        );

        let report = SheetReport {
            name: name.to_string(),
            template_name: name.to_string(),
            rendered: true,
            template_rows: layout.row_count(),
            output_rows,
            regions: expansion.regions,
        };
        Ok((output, report))
    }
}

/// Placeholders in a sheet name render at the root scope.
fn render_sheet_name(name: &str, model: &Value) -> String {
    let parsed = ParsedText::parse(name);
    if parsed.has_placeholders() {
        parsed.render_text(&Scope::new(model))
    } else {
        name.to_string()
    }
}

fn verbatim_report(sheet: &Worksheet) -> SheetReport {
    let rows = sheet
        .used_range()
        .map_or(0, |range| range.end.row + 1);
    SheetReport {
        name: sheet.name().to_string(),
        template_name: sheet.name().to_string(),
        rendered: false,
        template_rows: rows,
        output_rows: rows,
        regions: Vec::new(),
    }
}
