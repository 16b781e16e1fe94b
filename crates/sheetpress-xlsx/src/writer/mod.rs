//! XLSX writer

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use crate::drawing::write_drawing_xml;
use crate::error::{XlsxError, XlsxResult};
use crate::styles::XlsxStyleTable;
use crate::xml::escape_xml;
use sheetpress_core::{
    content_type_for_extension, CellAddress, CellValue, MediaId, Picture, Workbook, Worksheet,
};

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PACKAGE_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Part numbering decided before anything is written
#[derive(Debug, Default)]
struct PackageLayout {
    /// Per worksheet: number of its drawing part, if it has pictures
    drawings: Vec<Option<usize>>,
    /// Media referenced by any picture, with its file name under xl/media
    media_files: BTreeMap<MediaId, String>,
}

impl PackageLayout {
    fn plan(workbook: &Workbook) -> XlsxResult<Self> {
        let mut layout = PackageLayout::default();
        let mut next_drawing = 1;

        for sheet in workbook.worksheets() {
            if sheet.pictures().is_empty() {
                layout.drawings.push(None);
                continue;
            }
            layout.drawings.push(Some(next_drawing));
            next_drawing += 1;

            for picture in sheet.pictures() {
                let media = workbook.media().get(picture.media).ok_or_else(|| {
                    XlsxError::Core(sheetpress_core::Error::UnknownMedia {
                        picture: picture.name.clone(),
                        media: picture.media.0,
                    })
                })?;
                let extension = if media.extension.is_empty() {
                    "bin"
                } else {
                    media.extension.as_str()
                };
                layout
                    .media_files
                    .entry(picture.media)
                    .or_insert_with(|| format!("image{}.{}", picture.media.0 + 1, extension));
            }
        }

        Ok(layout)
    }

    fn extensions(&self) -> BTreeSet<&str> {
        self.media_files
            .values()
            .filter_map(|file| file.rsplit_once('.').map(|(_, ext)| ext))
            .collect()
    }
}

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, BufWriter::new(file))
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat(
                "a workbook needs at least one worksheet".into(),
            ));
        }

        let mut zip = zip::ZipWriter::new(writer);
        let style_table = XlsxStyleTable::build(workbook);
        let layout = PackageLayout::plan(workbook)?;

        Self::write_content_types(&mut zip, workbook, &layout)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_core_properties(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook)?;
        Self::write_part(&mut zip, "xl/styles.xml", &style_table.to_styles_xml())?;

        for (i, sheet) in workbook.worksheets().enumerate() {
            let drawing = layout.drawings.get(i).copied().flatten();
            Self::write_worksheet(&mut zip, sheet, i, &style_table, drawing.is_some())?;

            if let Some(number) = drawing {
                Self::write_drawing(&mut zip, sheet, i, number, &layout)?;
            }
        }

        for (&id, file_name) in &layout.media_files {
            if let Some(media) = workbook.media().get(id) {
                zip.start_file(
                    format!("xl/media/{file_name}"),
                    zip::write::SimpleFileOptions::default(),
                )?;
                zip.write_all(&media.data)?;
            }
        }

        zip.finish()?.flush()?;
        log::debug!(
            "wrote {} sheets, {} media files",
            workbook.sheet_count(),
            layout.media_files.len()
        );
        Ok(())
    }

    fn write_part<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        name: &str,
        content: &str,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
        layout: &PackageLayout,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>"#,
        );

        for ext in layout.extensions() {
            content.push_str(&format!(
                r#"
    <Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                content_type_for_extension(ext).unwrap_or("application/octet-stream")
            ));
        }

        content.push_str(
            r#"
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        for number in layout.drawings.iter().flatten() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/drawings/drawing{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>"#
            ));
        }

        content.push_str("\n</Types>");
        Self::write_part(zip, "[Content_Types].xml", &content)
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PACKAGE_REL_NS}">
    <Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#
        );
        Self::write_part(zip, "_rels/.rels", &content)
    }

    fn write_core_properties<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:creator>sheetpress</dc:creator>
    <dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>
    <dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>
</cp:coreProperties>"#
        );
        Self::write_part(zip, "docProps/core.xml", &content)
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">
    <bookViews>
        <workbookView activeTab="{}"/>
    </bookViews>
    <sheets>"#,
            workbook.active_sheet()
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            let state = if sheet.is_visible() {
                ""
            } else {
                r#" state="hidden""#
            };
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
                escape_xml(sheet.name()),
                i + 1,
                state,
                i + 1
            ));
        }

        content.push_str(
            r#"
    </sheets>
</workbook>"#,
        );

        Self::write_part(zip, "xl/workbook.xml", &content)
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PACKAGE_REL_NS}">"#
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="{REL_NS}/styles" Target="styles.xml"/>
</Relationships>"#,
            workbook.sheet_count() + 1
        ));

        Self::write_part(zip, "xl/_rels/workbook.xml.rels", &content)
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet: &Worksheet,
        index: usize,
        style_table: &XlsxStyleTable,
        has_drawing: bool,
    ) -> XlsxResult<()> {
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">"#
        );

        if let Some(range) = sheet.used_range() {
            content.push_str(&format!("\n    <dimension ref=\"{range}\"/>"));
        }

        let custom_default = (sheet.default_row_height() - sheetpress_core::DEFAULT_ROW_HEIGHT)
            .abs()
            > f64::EPSILON;
        content.push_str(&format!(
            "\n    <sheetFormatPr defaultRowHeight=\"{}\"{}{}/>",
            sheet.default_row_height(),
            if custom_default { " customHeight=\"1\"" } else { "" },
            if (sheet.default_column_width() - sheetpress_core::DEFAULT_COLUMN_WIDTH).abs()
                > f64::EPSILON
            {
                format!(" defaultColWidth=\"{}\"", sheet.default_column_width())
            } else {
                String::new()
            }
        ));

        Self::write_columns(&mut content, sheet);

        content.push_str("\n    <sheetData>");

        // Rows are written when they hold cells or carry a height or
        // hidden flag of their own
        let rows: BTreeSet<u32> = sheet
            .cells()
            .row_indices()
            .chain(sheet.custom_row_heights().keys().copied())
            .chain(sheet.hidden_rows())
            .collect();

        for row in rows {
            let mut attrs = format!(" r=\"{}\"", row + 1);
            if let Some(height) = sheet.custom_row_height(row) {
                attrs.push_str(&format!(" ht=\"{height}\" customHeight=\"1\""));
            }
            if sheet.is_row_hidden(row) {
                attrs.push_str(" hidden=\"1\"");
            }

            let mut cells = String::new();
            for (col, cell) in sheet.cells().iter_row(row) {
                let xf_id = style_table.xf_id_for(index, cell.style_index);
                Self::write_cell(&mut cells, CellAddress::new(row, col), xf_id, &cell.value);
            }

            if cells.is_empty() {
                content.push_str(&format!("\n        <row{attrs}/>"));
            } else {
                content.push_str(&format!("\n        <row{attrs}>{cells}\n        </row>"));
            }
        }

        content.push_str("\n    </sheetData>");

        let merged_regions = sheet.merged_regions();
        if !merged_regions.is_empty() {
            content.push_str(&format!(
                "\n    <mergeCells count=\"{}\">",
                merged_regions.len()
            ));
            for range in merged_regions {
                content.push_str(&format!("\n        <mergeCell ref=\"{}\"/>", range));
            }
            content.push_str("\n    </mergeCells>");
        }

        if has_drawing {
            content.push_str("\n    <drawing r:id=\"rId1\"/>");
        }

        content.push_str("\n</worksheet>");

        Self::write_part(zip, &format!("xl/worksheets/sheet{}.xml", index + 1), &content)
    }

    /// `<cols>`, with runs of identical columns collapsed into one element
    fn write_columns(content: &mut String, sheet: &Worksheet) {
        let columns: BTreeSet<u16> = sheet
            .custom_column_widths()
            .keys()
            .copied()
            .chain(sheet.hidden_columns())
            .collect();
        if columns.is_empty() {
            return;
        }

        let describe = |col: u16| (sheet.column_width(col), sheet.is_column_hidden(col));
        let mut runs: Vec<(u16, u16, (f64, bool))> = Vec::new();
        for col in columns {
            let props = describe(col);
            match runs.last_mut() {
                Some((_, last, run_props)) if *last + 1 == col && *run_props == props => {
                    *last = col;
                }
                _ => runs.push((col, col, props)),
            }
        }

        content.push_str("\n    <cols>");
        for (first, last, (width, hidden)) in runs {
            content.push_str(&format!(
                "\n        <col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"{}/>",
                first + 1,
                last + 1,
                width,
                if hidden { " hidden=\"1\"" } else { "" }
            ));
        }
        content.push_str("\n    </cols>");
    }

    fn write_cell(out: &mut String, address: CellAddress, xf_id: u32, value: &CellValue) {
        let style_attr = if xf_id != 0 {
            format!(" s=\"{}\"", xf_id)
        } else {
            String::new()
        };

        match value {
            CellValue::Number(n) if n.is_finite() => {
                out.push_str(&format!("<c r=\"{address}\"{style_attr}><v>{n}</v></c>"));
            }
            CellValue::Number(_) => {
                out.push_str(&format!(
                    "<c r=\"{address}\"{style_attr} t=\"e\"><v>#NUM!</v></c>"
                ));
            }
            CellValue::String(s) => {
                out.push_str(&format!(
                    "<c r=\"{address}\"{style_attr} t=\"inlineStr\"><is>{}</is></c>",
                    text_element(s)
                ));
            }
            CellValue::Boolean(b) => {
                out.push_str(&format!(
                    "<c r=\"{address}\"{style_attr} t=\"b\"><v>{}</v></c>",
                    u8::from(*b)
                ));
            }
            CellValue::Error(e) => {
                out.push_str(&format!(
                    "<c r=\"{address}\"{style_attr} t=\"e\"><v>{}</v></c>",
                    escape_xml(e.as_str())
                ));
            }
            CellValue::Formula { text, cached_value } => {
                let (type_attr, cached) = match cached_value.as_deref() {
                    Some(CellValue::Number(n)) if n.is_finite() => ("", format!("<v>{n}</v>")),
                    Some(CellValue::String(s)) => (" t=\"str\"", format!("<v>{}</v>", escape_xml(s))),
                    Some(CellValue::Boolean(b)) => (" t=\"b\"", format!("<v>{}</v>", u8::from(*b))),
                    Some(CellValue::Error(e)) => (" t=\"e\"", format!("<v>{}</v>", e.as_str())),
                    _ => ("", String::new()),
                };
                out.push_str(&format!(
                    "<c r=\"{address}\"{style_attr}{type_attr}><f>{}</f>{cached}</c>",
                    escape_xml(text)
                ));
            }
            CellValue::Empty => {
                if xf_id != 0 {
                    out.push_str(&format!("<c r=\"{address}\"{style_attr}/>"));
                }
            }
        }
    }

    /// Drawing part, its relationships, and the worksheet's link to it
    fn write_drawing<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet: &Worksheet,
        sheet_index: usize,
        number: usize,
        layout: &PackageLayout,
    ) -> XlsxResult<()> {
        Self::write_part(
            zip,
            &format!("xl/worksheets/_rels/sheet{}.xml.rels", sheet_index + 1),
            &format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PACKAGE_REL_NS}">
    <Relationship Id="rId1" Type="{REL_NS}/drawing" Target="../drawings/drawing{number}.xml"/>
</Relationships>"#
            ),
        )?;

        // One image relationship per distinct media in this drawing
        let mut image_rels: Vec<MediaId> = Vec::new();
        let pictures: Vec<&Picture> = sheet.pictures().iter().collect();
        let embeds: Vec<String> = pictures
            .iter()
            .map(|picture| {
                let position = match image_rels.iter().position(|&m| m == picture.media) {
                    Some(p) => p,
                    None => {
                        image_rels.push(picture.media);
                        image_rels.len() - 1
                    }
                };
                format!("rId{}", position + 1)
            })
            .collect();

        Self::write_part(
            zip,
            &format!("xl/drawings/drawing{number}.xml"),
            &write_drawing_xml(&pictures, &embeds),
        )?;

        let mut rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{PACKAGE_REL_NS}">"#
        );
        for (i, media) in image_rels.iter().enumerate() {
            if let Some(file_name) = layout.media_files.get(media) {
                rels.push_str(&format!(
                    r#"
    <Relationship Id="rId{}" Type="{REL_NS}/image" Target="../media/{}"/>"#,
                    i + 1,
                    escape_xml(file_name)
                ));
            }
        }
        rels.push_str("\n</Relationships>");

        Self::write_part(
            zip,
            &format!("xl/drawings/_rels/drawing{number}.xml.rels"),
            &rels,
        )
    }
}

/// `<t>` element, preserving leading and trailing whitespace
fn text_element(s: &str) -> String {
    let preserve = s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace);
    if preserve {
        format!("<t xml:space=\"preserve\">{}</t>", escape_xml(s))
    } else {
        format!("<t>{}</t>", escape_xml(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn part(buf: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(buf)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_write_cells_and_rows() {
        let mut workbook = Workbook::new();
        let ws = workbook.worksheet_mut(0).unwrap();
        ws.set_cell_value("A1", " padded").unwrap();
        ws.set_cell_value("B1", 3.0).unwrap();
        ws.set_cell_value("C1", true).unwrap();
        ws.set_cell_value_at(
            1,
            0,
            CellValue::Formula {
                text: "B1*2".into(),
                cached_value: Some(Box::new(CellValue::Number(6.0))),
            },
        )
        .unwrap();
        ws.set_row_height(4, 32.0);
        ws.set_row_hidden(5, true);

        let mut buf = Vec::new();
        XlsxWriter::write(&workbook, Cursor::new(&mut buf)).unwrap();
        let sheet = part(&buf, "xl/worksheets/sheet1.xml");

        assert!(sheet.contains(r#"<t xml:space="preserve"> padded</t>"#));
        assert!(sheet.contains(r#"<c r="B1"><v>3</v></c>"#));
        assert!(sheet.contains(r#"<c r="C1" t="b"><v>1</v></c>"#));
        assert!(sheet.contains(r#"<c r="A2"><f>B1*2</f><v>6</v></c>"#));
        assert!(sheet.contains(r#"<row r="5" ht="32" customHeight="1"/>"#));
        assert!(sheet.contains(r#"<row r="6" hidden="1"/>"#));
    }

    #[test]
    fn test_write_column_runs() {
        let mut workbook = Workbook::new();
        let ws = workbook.worksheet_mut(0).unwrap();
        ws.set_column_width(1, 12.0);
        ws.set_column_width(2, 12.0);
        ws.set_column_width(4, 30.0);

        let mut buf = Vec::new();
        XlsxWriter::write(&workbook, Cursor::new(&mut buf)).unwrap();
        let sheet = part(&buf, "xl/worksheets/sheet1.xml");

        assert!(sheet.contains(r#"<col min="2" max="3" width="12" customWidth="1"/>"#));
        assert!(sheet.contains(r#"<col min="5" max="5" width="30" customWidth="1"/>"#));
    }

    #[test]
    fn test_sheet_names_are_escaped() {
        let mut workbook = Workbook::empty();
        workbook.add_worksheet_with_name("R&D <2024>").unwrap();

        let mut buf = Vec::new();
        XlsxWriter::write(&workbook, Cursor::new(&mut buf)).unwrap();
        assert!(part(&buf, "xl/workbook.xml").contains(r#"name="R&amp;D &lt;2024&gt;""#));
    }

    #[test]
    fn test_empty_workbook_is_rejected() {
        let mut buf = Vec::new();
        assert!(XlsxWriter::write(&Workbook::empty(), Cursor::new(&mut buf)).is_err());
    }
}
