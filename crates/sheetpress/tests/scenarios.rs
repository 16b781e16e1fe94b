//! End-to-end rendering through XLSX files (template file -> render -> output file)

use std::io::Cursor;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use sheetpress::compare::{compare_workbooks, CompareOptions};
use sheetpress::prelude::*;
use sheetpress::{Anchor, AnchorPoint, Color, FillStyle, Media, Picture};
use tempfile::TempDir;

/// Write `template` into `dir`, render it against `model` and read the
/// saved output back.
fn render_through_files(dir: &TempDir, template: &Workbook, model: serde_json::Value) -> Workbook {
    let template_path = dir.path().join("template.xlsx");
    let model_path = dir.path().join("model.json");
    let output_path = dir.path().join("output.xlsx");

    template.save(&template_path).unwrap();
    std::fs::write(&model_path, model.to_string()).unwrap();

    let model = sheetpress::load_view_model(&model_path).unwrap();
    sheetpress::render_to_file(&template_path, &model, &output_path).unwrap();
    Workbook::open(&output_path).unwrap()
}

fn roundtrip(workbook: &Workbook) -> Workbook {
    let mut buf = Vec::new();
    XlsxWriter::write(workbook, Cursor::new(&mut buf)).unwrap();
    XlsxReader::read(Cursor::new(buf)).unwrap()
}

fn header_style() -> Style {
    Style::new()
        .bold(true)
        .fill(FillStyle::solid(Color::from_hex("FFE699").unwrap()))
}

fn row_style() -> Style {
    Style::new().italic(true)
}

/// Title block on rows 1-4, the item row on row 5, a footer on row 6
fn scenario_sheet(region_row: &str) -> Worksheet {
    let mut ws = Worksheet::new("Items");
    ws.set_cell_at(0, 0, CellValue::string("Inventory"), &header_style()).unwrap();
    ws.set_cell_value("A2", "Generated for {{ owner | default: nobody }}").unwrap();
    ws.set_cell_value("A4", "Name").unwrap();
    ws.set_cell_value("A5", region_row).unwrap();
    ws.set_cell_at(4, 1, CellValue::string("{{ items.name }}"), &row_style()).unwrap();
    ws.set_row_height(4, 24.0);
    ws.set_cell_value("A6", "End of list").unwrap();
    ws.set_column_width(1, 30.0);
    ws
}

fn scenario_template() -> Workbook {
    let mut workbook = Workbook::empty();
    workbook
        .add_existing_worksheet(scenario_sheet("#! REPEAT_ROW items"))
        .unwrap();
    workbook
}

fn abc() -> serde_json::Value {
    serde_json::json!({"items": [{"name": "a"}, {"name": "b"}, {"name": "c"}]})
}

#[test]
fn scenario_a_template_without_directives_is_reproduced() {
    let dir = TempDir::new().unwrap();
    let mut template = Workbook::empty();
    let mut ws = Worksheet::new("Static");
    ws.set_cell_at(0, 0, CellValue::string("Title"), &header_style()).unwrap();
    ws.set_cell_value("B2", 12.5).unwrap();
    ws.set_cell_value("C3", true).unwrap();
    ws.set_cell_value_at(
        3,
        0,
        CellValue::Formula {
            text: "B2*2".into(),
            cached_value: Some(Box::new(CellValue::Number(25.0))),
        },
    )
    .unwrap();
    ws.merge_cells(&CellRange::parse("A1:C1").unwrap()).unwrap();
    ws.set_row_height(1, 18.0);
    ws.set_column_width(2, 15.0);
    template.add_existing_worksheet(ws).unwrap();

    let output = render_through_files(&dir, &template, serde_json::json!({}));

    let differences = compare_workbooks(&roundtrip(&template), &output, &CompareOptions::default());
    assert!(differences.is_empty(), "{differences:#?}");
    assert_eq!(
        output.worksheet(0).unwrap().merged_regions(),
        &[CellRange::parse("A1:C1").unwrap()]
    );
}

#[test]
fn scenario_b_region_row_repeats_per_item() {
    let dir = TempDir::new().unwrap();
    let output = render_through_files(&dir, &scenario_template(), abc());

    let mut expected = Workbook::empty();
    let mut ws = Worksheet::new("Items");
    ws.set_cell_at(0, 0, CellValue::string("Inventory"), &header_style()).unwrap();
    ws.set_cell_value("A2", "Generated for nobody").unwrap();
    ws.set_cell_value("A4", "Name").unwrap();
    for (row, name) in [(4, "a"), (5, "b"), (6, "c")] {
        ws.set_cell_at(row, 1, CellValue::string(name), &row_style()).unwrap();
        ws.set_row_height(row, 24.0);
    }
    ws.set_cell_value("A8", "End of list").unwrap();
    ws.set_column_width(1, 30.0);
    expected.add_existing_worksheet(ws).unwrap();

    let differences = compare_workbooks(&roundtrip(&expected), &output, &CompareOptions::default());
    assert!(differences.is_empty(), "{differences:#?}");
}

#[test]
fn scenario_c_empty_region_collapses() {
    let dir = TempDir::new().unwrap();
    let output = render_through_files(&dir, &scenario_template(), serde_json::json!({"items": []}));
    let ws = output.worksheet(0).unwrap();

    assert_eq!(ws.get_value("A5").unwrap(), CellValue::string("End of list"));
    assert_eq!(ws.get_value("B5").unwrap(), CellValue::Empty);
    assert_eq!(ws.custom_row_height(4), None);
    assert_eq!(ws.get_value("A6").unwrap(), CellValue::Empty);
}

#[test]
fn scenario_d_merges_repeat_per_item() {
    let dir = TempDir::new().unwrap();
    let mut template = scenario_template();
    template
        .worksheet_mut(0)
        .unwrap()
        .merge_cells(&CellRange::parse("B5:C5").unwrap())
        .unwrap();

    let output = render_through_files(&dir, &template, abc());
    let merges: Vec<String> = output
        .worksheet(0)
        .unwrap()
        .merged_regions()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(merges, vec!["B5:C5", "B6:C6", "B7:C7"]);
}

#[test]
fn scenario_e_images_repeat_per_item() {
    let dir = TempDir::new().unwrap();
    let mut template = scenario_template();
    let media = template.add_media(Media::new(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A], "png"));
    template.worksheet_mut(0).unwrap().add_picture(Picture::new(
        media,
        "Thumb",
        Anchor::TwoCell {
            from: AnchorPoint::new(4, 3).with_offsets(19050, 9525),
            to: AnchorPoint::new(4, 4).with_offsets(0, 190500),
        },
    ));

    let output = render_through_files(&dir, &template, abc());
    let pictures = output.worksheet(0).unwrap().pictures();
    assert_eq!(pictures.len(), 3);
    for (picture, row) in pictures.iter().zip(4..) {
        assert_eq!(
            picture.anchor,
            Anchor::TwoCell {
                from: AnchorPoint::new(row, 3).with_offsets(19050, 9525),
                to: AnchorPoint::new(row, 4).with_offsets(0, 190500),
            }
        );
        assert_eq!(picture.media, pictures[0].media);
    }
    assert_eq!(output.media().len(), 1);
}

#[test]
fn block_regions_and_conditions_through_files() {
    let dir = TempDir::new().unwrap();
    let mut template = Workbook::empty();
    let mut ws = Worksheet::new("Teams");
    ws.set_cell_value("A1", "#! FOR_EACH teams AS team").unwrap();
    ws.set_cell_value("A2", "{{ $number }}. {{ team.name | upper }}").unwrap();
    ws.set_cell_value("A3", "#! REPEAT_ROW team.members AS member").unwrap();
    ws.set_cell_value("B3", "{{ member.name }}").unwrap();
    ws.set_cell_value("C3", "{{ member.score }}").unwrap();
    ws.set_cell_value("A4", "#! IF NOT team.members").unwrap();
    ws.set_cell_value("B4", "(no members)").unwrap();
    ws.set_cell_value("A5", "#! END_EACH").unwrap();
    ws.set_cell_value("A6", "#! IF show_total").unwrap();
    ws.set_cell_value("B6", "Teams: {{ teams | len }}").unwrap();
    template.add_existing_worksheet(ws).unwrap();

    let output = render_through_files(
        &dir,
        &template,
        serde_json::json!({
            "show_total": true,
            "teams": [
                {"name": "red", "members": [{"name": "Ann", "score": 3}, {"name": "Bo", "score": 4.5}]},
                {"name": "blue", "members": []}
            ]
        }),
    );
    let ws = output.worksheet(0).unwrap();
    let text = |row: u32, col: u16| ws.get_value_at(row, col).to_string();

    assert_eq!(text(0, 0), "1. RED");
    assert_eq!((text(1, 1), text(2, 1)), ("Ann".to_string(), "Bo".to_string()));
    assert_eq!(ws.get_value_at(2, 2), CellValue::Number(4.5));
    assert_eq!(text(1, 0), "");
    assert_eq!(text(3, 0), "2. BLUE");
    assert_eq!(text(4, 1), "(no members)");
    assert_eq!(text(5, 1), "Teams: 2");
    assert_eq!(ws.used_range().unwrap().end.row, 5);
}

#[test]
fn multiple_sheets_and_sheet_names() {
    let dir = TempDir::new().unwrap();
    let mut template = Workbook::empty();
    let mut summary = Worksheet::new("Summary");
    summary.set_cell_value("A1", "{{ region }}").unwrap();
    let mut detail = Worksheet::new("{{ region }} detail");
    detail.set_cell_value("A1", "#! REPEAT_ROW rows").unwrap();
    detail.set_cell_value("B1", "{{ rows }}").unwrap();
    let mut hidden = Worksheet::new("Lookup");
    hidden.set_cell_value("A1", "static").unwrap();
    hidden.set_visible(false);
    template.add_existing_worksheet(summary).unwrap();
    template.add_existing_worksheet(detail).unwrap();
    template.add_existing_worksheet(hidden).unwrap();

    let output = render_through_files(
        &dir,
        &template,
        serde_json::json!({"region": "EMEA", "rows": [10, 20]}),
    );
    let names: Vec<&str> = output.worksheets().map(|ws| ws.name()).collect();
    assert_eq!(names, vec!["Summary", "EMEA detail", "Lookup"]);

    let detail = output.worksheet(1).unwrap();
    assert_eq!(detail.get_value("B2").unwrap(), CellValue::Number(20.0));
    assert!(!output.worksheet(2).unwrap().is_visible());
}

#[test]
fn template_errors_surface_with_position() {
    let dir = TempDir::new().unwrap();
    let mut template = Workbook::empty();
    let mut ws = Worksheet::new("Broken");
    ws.set_cell_value("A1", "ok").unwrap();
    ws.set_cell_value("A3", "#! FOR_EACH items").unwrap();
    template.add_existing_worksheet(ws).unwrap();

    let template_path = dir.path().join("broken.xlsx");
    let output_path = dir.path().join("never.xlsx");
    template.save(&template_path).unwrap();

    let err = sheetpress::render_to_file(&template_path, &Value::Null, &output_path).unwrap_err();
    assert!(matches!(err, Error::Template(TemplateError::UnbalancedDirective { row: 3, .. })));
    assert_eq!(
        err.to_string(),
        "Sheet 'Broken', row 3: FOR_EACH items has no matching END_EACH"
    );
    assert!(!output_path.exists());
}

#[test]
fn io_and_format_errors() {
    let dir = TempDir::new().unwrap();
    let missing: PathBuf = dir.path().join("missing.xlsx");

    let err = sheetpress::render_file(&missing, &Value::Null).unwrap_err();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));

    let err = Workbook::open(Path::new("template.ods")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));

    let bad_model = dir.path().join("model.json");
    std::fs::write(&bad_model, "{ not json").unwrap();
    assert!(matches!(
        sheetpress::load_view_model(&bad_model).unwrap_err(),
        Error::ViewModel(_)
    ));
}
