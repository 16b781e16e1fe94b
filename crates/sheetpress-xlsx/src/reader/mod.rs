//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::drawing::read_drawing_xml;
use crate::error::{XlsxError, XlsxResult};
use crate::shared_formula::shift_formula;
use crate::styles::read_styles_xml;
use crate::xml::{
    attr, attr_flag, attr_parse, decode_excel_escapes, local_name, rels_path, resolve_target,
};
use sheetpress_core::style::Style;
use sheetpress_core::{
    CellAddress, CellError, CellRange, CellValue, Media, MediaId, Picture, Workbook, Worksheet,
    MAX_COLS,
};

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// A `<sheet>` entry of workbook.xml
#[derive(Debug)]
struct SheetEntry {
    name: String,
    r_id: String,
    hidden: bool,
}

/// One `<Relationship>` with its target resolved to a package path
#[derive(Debug)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

impl Relationship {
    fn is(&self, kind: &str) -> bool {
        !self.external && self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// Cell being assembled from `<c>` and its children
#[derive(Debug, Default)]
struct PendingCell {
    address: Option<CellAddress>,
    cell_type: Option<String>,
    style: u32,
    value: Option<String>,
    formula: Option<String>,
    /// `si` of a `<f t="shared">`
    shared_index: Option<u32>,
    inline: Option<String>,
}

/// Shared lookups while reading worksheets
struct ReadContext<'a> {
    shared_strings: &'a [String],
    styles: &'a [Style],
    default_style: Style,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let styles = Self::read_styles(&mut archive)?;
        let sheets = Self::read_workbook_xml(&mut archive)?;
        let workbook_rels = Self::read_relationships(&mut archive, WORKBOOK_PART)?;
        let ctx = ReadContext {
            shared_strings: &shared_strings,
            styles: &styles,
            default_style: Style::default(),
        };

        let mut workbook = Workbook::empty();
        // Package path -> media id, so an image used on several sheets is
        // stored once
        let mut media_by_path: HashMap<String, MediaId> = HashMap::new();

        for entry in &sheets {
            let Some(rel) = workbook_rels
                .iter()
                .find(|r| r.id == entry.r_id && r.is("worksheet"))
            else {
                log::warn!("sheet '{}' has no worksheet part, skipping", entry.name);
                continue;
            };

            let mut worksheet = Worksheet::new(entry.name.as_str());
            worksheet.set_visible(!entry.hidden);
            let drawing_rid = Self::read_worksheet(&mut archive, &rel.target, &mut worksheet, &ctx)?;

            if let Some(drawing_rid) = drawing_rid {
                let sheet_rels = Self::read_relationships(&mut archive, &rel.target)?;
                match sheet_rels.iter().find(|r| r.id == drawing_rid && r.is("drawing")) {
                    Some(drawing) => Self::read_drawing(
                        &mut archive,
                        &drawing.target,
                        &mut worksheet,
                        &mut workbook,
                        &mut media_by_path,
                    )?,
                    None => log::warn!(
                        "sheet '{}' references missing drawing {}",
                        entry.name,
                        drawing_rid
                    ),
                }
            }

            log::debug!(
                "read sheet '{}': {} cells, {} merges, {} pictures",
                worksheet.name(),
                worksheet.cells().cell_count(),
                worksheet.merged_regions().len(),
                worksheet.pictures().len()
            );
            workbook.add_existing_worksheet(worksheet)?;
        }

        if workbook.is_empty() {
            workbook.add_worksheet()?;
        }

        Ok(workbook)
    }

    /// Read the shared strings table. Rich text runs are flattened and
    /// phonetic hints dropped.
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                // <si/> and <t/> are empty strings but still take an index
                Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Event::End(e) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Event::Text(e) if in_t => current.push_str(&e.unescape()?),
                Event::CData(e) if in_t => current.push_str(&String::from_utf8_lossy(&e)),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<Style>> {
        match archive.by_name("xl/styles.xml") {
            Ok(file) => read_styles_xml(file),
            Err(_) => Ok(vec![Style::default()]),
        }
    }

    /// Sheet names, relationship ids and visibility, in tab order
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<SheetEntry>> {
        let file = archive
            .by_name(WORKBOOK_PART)
            .map_err(|_| XlsxError::MissingPart(WORKBOOK_PART.into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"sheet" => {
                    let r_id = e
                        .attributes()
                        .flatten()
                        .find(|a| local_name(a.key.as_ref()) == b"id")
                        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                    if let (Some(name), Some(r_id)) = (attr(&e, b"name"), r_id) {
                        let hidden = matches!(
                            attr(&e, b"state").as_deref(),
                            Some("hidden") | Some("veryHidden")
                        );
                        sheets.push(SheetEntry { name, r_id, hidden });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Relationships of `part`; an absent rels part means none.
    fn read_relationships<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        part: &str,
    ) -> XlsxResult<Vec<Relationship>> {
        let file = match archive.by_name(&rels_path(part)) {
            Ok(f) => f,
            Err(_) => return Ok(Vec::new()),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf)? {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"Relationship" => {
                    if let (Some(id), Some(rel_type), Some(target)) =
                        (attr(&e, b"Id"), attr(&e, b"Type"), attr(&e, b"Target"))
                    {
                        let external = attr(&e, b"TargetMode").as_deref() == Some("External");
                        let target = if external {
                            target
                        } else {
                            resolve_target(part, &target)
                        };
                        rels.push(Relationship {
                            id,
                            rel_type,
                            target,
                            external,
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet part into `worksheet`. Returns the relationship id
    /// of the sheet's drawing, if it has one.
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        ctx: &ReadContext<'_>,
    ) -> XlsxResult<Option<String>> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        // Text is not trimmed: leading and trailing spaces in cell strings
        // are content
        let mut xml_reader = Reader::from_reader(BufReader::new(file));

        let mut buf = Vec::new();
        let mut drawing_rid = None;

        let mut current_row: u32 = 0;
        let mut next_row: u32 = 0;
        let mut next_col: u16 = 0;
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_text = false;
        let mut in_phonetic = false;
        // si -> master cell and its formula text
        let mut shared_formulas: HashMap<u32, (CellAddress, String)> = HashMap::new();

        loop {
            let event = xml_reader.read_event_into(&mut buf)?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                    b"sheetFormatPr" => {
                        if let Some(height) = attr_parse::<f64>(e, b"defaultRowHeight") {
                            worksheet.set_default_row_height(height);
                        }
                        if let Some(width) = attr_parse::<f64>(e, b"defaultColWidth") {
                            worksheet.set_default_column_width(width);
                        }
                    }
                    b"col" => Self::read_column(e, worksheet),
                    b"row" => {
                        current_row = attr_parse::<u32>(e, b"r")
                            .map_or(next_row, |r| r.saturating_sub(1));
                        next_row = current_row.saturating_add(1);
                        next_col = 0;
                        Self::read_row_attrs(e, current_row, worksheet);
                    }
                    b"c" => {
                        let pending = Self::start_cell(e, current_row, next_col, path)?;
                        next_col = pending
                            .address
                            .map_or(next_col, |a| a.col.saturating_add(1));
                        if is_empty {
                            Self::finish_cell(worksheet, pending, &mut shared_formulas, ctx, path)?;
                        } else {
                            cell = Some(pending);
                        }
                    }
                    b"v" if cell.is_some() && !is_empty => in_value = true,
                    b"f" if cell.is_some() => {
                        if let Some(c) = cell.as_mut() {
                            c.formula.get_or_insert_with(String::new);
                            if attr(e, b"t").as_deref() == Some("shared") {
                                c.shared_index = attr_parse(e, b"si");
                            }
                        }
                        in_formula = !is_empty;
                    }
                    b"is" if cell.is_some() => {
                        if let Some(c) = cell.as_mut() {
                            c.inline.get_or_insert_with(String::new);
                        }
                    }
                    b"rPh" if cell.is_some() && !is_empty => in_phonetic = true,
                    b"t" if cell.is_some() && !is_empty && !in_phonetic => in_inline_text = true,
                    b"mergeCell" => {
                        if let Some(reference) = attr(e, b"ref") {
                            let range = CellRange::parse(&reference).map_err(|err| {
                                XlsxError::parse(path, format!("bad merge '{reference}': {err}"))
                            })?;
                            if let Err(err) = worksheet.merge_cells(&range) {
                                log::warn!("{path}: ignoring merge {reference}: {err}");
                            }
                        }
                    }
                    b"drawing" => {
                        drawing_rid = e
                            .attributes()
                            .flatten()
                            .find(|a| local_name(a.key.as_ref()) == b"id")
                            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                    }
                    _ => {}
                },
                Event::Text(ref t) => {
                    if let Some(c) = cell.as_mut() {
                        if in_value {
                            c.value.get_or_insert_with(String::new).push_str(&t.unescape()?);
                        } else if in_formula {
                            c.formula.get_or_insert_with(String::new).push_str(&t.unescape()?);
                        } else if in_inline_text {
                            c.inline.get_or_insert_with(String::new).push_str(&t.unescape()?);
                        }
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            Self::finish_cell(worksheet, pending, &mut shared_formulas, ctx, path)?;
                        }
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_inline_text = false,
                    b"rPh" => in_phonetic = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(drawing_rid)
    }

    /// `<col min max width hidden>` covers a run of 1-based columns.
    fn read_column(e: &BytesStart<'_>, worksheet: &mut Worksheet) {
        let (Some(min), Some(max)) = (attr_parse::<u32>(e, b"min"), attr_parse::<u32>(e, b"max"))
        else {
            return;
        };
        let width = attr_parse::<f64>(e, b"width");
        let hidden = attr_flag(e, b"hidden");
        let last = max.min(MAX_COLS as u32);
        for col in min.max(1)..=last {
            let col = (col - 1) as u16;
            if let Some(w) = width {
                worksheet.set_column_width(col, w);
            }
            if hidden {
                worksheet.set_column_hidden(col, true);
            }
        }
    }

    fn read_row_attrs(e: &BytesStart<'_>, row: u32, worksheet: &mut Worksheet) {
        if attr_flag(e, b"customHeight") {
            if let Some(height) = attr_parse::<f64>(e, b"ht") {
                worksheet.set_row_height(row, height);
            }
        }
        if attr_flag(e, b"hidden") {
            worksheet.set_row_hidden(row, true);
        }
    }

    fn start_cell(
        e: &BytesStart<'_>,
        row: u32,
        next_col: u16,
        path: &str,
    ) -> XlsxResult<PendingCell> {
        let address = match attr(e, b"r") {
            Some(r) => CellAddress::parse(&r)
                .map_err(|err| XlsxError::parse(path, format!("bad cell reference '{r}': {err}")))?,
            None => CellAddress::new(row, next_col),
        };
        Ok(PendingCell {
            address: Some(address),
            cell_type: attr(e, b"t"),
            style: attr_parse(e, b"s").unwrap_or(0),
            ..PendingCell::default()
        })
    }

    /// Store a finished cell in the worksheet.
    fn finish_cell(
        worksheet: &mut Worksheet,
        cell: PendingCell,
        shared_formulas: &mut HashMap<u32, (CellAddress, String)>,
        ctx: &ReadContext<'_>,
        path: &str,
    ) -> XlsxResult<()> {
        let Some(address) = cell.address else {
            return Ok(());
        };
        let cell_type = cell.cell_type.as_deref();

        let scalar = match (cell_type, cell.inline, cell.value.as_deref()) {
            (Some("inlineStr"), Some(text), _) => Some(CellValue::string(decode_excel_escapes(&text))),
            (_, _, Some(raw)) => Some(Self::parse_value(cell_type, raw, ctx, path)?),
            _ => None,
        };

        let formula = match (cell.shared_index, cell.formula) {
            (Some(si), Some(text)) if !text.trim().is_empty() => {
                shared_formulas.insert(si, (address, text.clone()));
                Some(text)
            }
            (Some(si), _) => match shared_formulas.get(&si) {
                Some((master, text)) => Some(shift_formula(
                    text,
                    i64::from(address.row) - i64::from(master.row),
                    i64::from(address.col) - i64::from(master.col),
                )),
                None => {
                    log::warn!(
                        "{path}: cell {address} uses unknown shared formula {si}, keeping its cached value"
                    );
                    None
                }
            },
            (None, text) => text,
        };

        let value = match formula {
            Some(text) if !text.is_empty() => CellValue::Formula {
                text: text.strip_prefix('=').unwrap_or(&text).to_string(),
                cached_value: scalar.map(Box::new),
            },
            _ => scalar.unwrap_or(CellValue::Empty),
        };

        let style = match ctx.styles.get(cell.style as usize) {
            Some(style) => style,
            None => {
                log::warn!("{path}: cell {address} uses unknown style {}", cell.style);
                &ctx.default_style
            }
        };
        worksheet.set_cell_at(address.row, address.col, value, style)?;
        Ok(())
    }

    fn parse_value(
        cell_type: Option<&str>,
        raw: &str,
        ctx: &ReadContext<'_>,
        path: &str,
    ) -> XlsxResult<CellValue> {
        Ok(match cell_type {
            Some("s") => {
                let index: usize = raw.trim().parse().map_err(|_| {
                    XlsxError::parse(path, format!("invalid shared string index '{raw}'"))
                })?;
                let text = ctx.shared_strings.get(index).ok_or_else(|| {
                    XlsxError::parse(path, format!("shared string {index} out of bounds"))
                })?;
                CellValue::string(text)
            }
            Some("b") => CellValue::Boolean(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
            Some("e") => CellError::parse(raw.trim())
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::string(raw)),
            Some("str") | Some("inlineStr") => CellValue::string(decode_excel_escapes(raw)),
            None | Some("n") => match raw.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::string(raw),
            },
            Some(_) => CellValue::string(raw),
        })
    }

    /// Read a drawing part and its images, adding pictures to `worksheet`
    /// and image bytes to the workbook's media.
    fn read_drawing<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        drawing_path: &str,
        worksheet: &mut Worksheet,
        workbook: &mut Workbook,
        media_by_path: &mut HashMap<String, MediaId>,
    ) -> XlsxResult<()> {
        let pictures = {
            let file = archive
                .by_name(drawing_path)
                .map_err(|_| XlsxError::MissingPart(drawing_path.to_string()))?;
            read_drawing_xml(BufReader::new(file))?
        };
        let rels = Self::read_relationships(archive, drawing_path)?;

        for found in pictures {
            let Some(image) = rels.iter().find(|r| r.id == found.embed && r.is("image")) else {
                log::warn!(
                    "{drawing_path}: picture '{}' has no image relationship {}",
                    found.name,
                    found.embed
                );
                continue;
            };

            let media = match media_by_path.get(&image.target) {
                Some(&id) => id,
                None => {
                    let mut data = Vec::new();
                    archive
                        .by_name(&image.target)
                        .map_err(|_| XlsxError::MissingPart(image.target.clone()))?
                        .read_to_end(&mut data)?;
                    let extension = image.target.rsplit_once('.').map_or("", |(_, ext)| ext);
                    let id = workbook.add_media(Media::new(data, extension));
                    media_by_path.insert(image.target.clone(), id);
                    id
                }
            };

            let mut picture = Picture::new(media, found.name, found.anchor);
            picture.description = found.description;
            worksheet.add_picture(picture);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetpress_core::Anchor;
    use std::io::{Cursor, Write};

    const CONTENT_TYPES: &str = r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;
    const WORKBOOK_RELS: &str = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

    fn package(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            for (name, data) in parts {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn workbook_xml(sheets: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheets}</sheets></workbook>"#
        )
    }

    #[test]
    fn test_read_empty_xlsx() {
        let workbook = workbook_xml(r#"<sheet name="Sheet1" sheetId="1" r:id="rId1"/>"#);
        let buf = package(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("xl/workbook.xml", workbook.as_bytes()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            (
                "xl/worksheets/sheet1.xml",
                br#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData></sheetData></worksheet>"#,
            ),
        ]);

        let workbook = XlsxReader::read(Cursor::new(buf)).unwrap();
        assert_eq!(workbook.sheet_count(), 1);
        assert_eq!(workbook.worksheet(0).unwrap().name(), "Sheet1");
    }

    #[test]
    fn test_missing_content_types_is_rejected() {
        let buf = package(&[("xl/workbook.xml", b"<workbook/>")]);
        assert!(matches!(
            XlsxReader::read(Cursor::new(buf)),
            Err(XlsxError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_cells_rows_and_merges() {
        let workbook = workbook_xml(r#"<sheet name="Data" sheetId="1" r:id="rId1" state="hidden"/>"#);
        let shared = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><si><t xml:space="preserve"> padded </t></si><si><r><t>Rich </t></r><r><rPr><b/></rPr><t>text</t></r><rPh><t>ignored</t></rPh></si></sst>"#;
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetFormatPr defaultRowHeight="16.5"/>
<cols><col min="2" max="3" width="20.5" customWidth="1"/><col min="5" max="5" width="9" hidden="1"/></cols>
<sheetData>
<row r="1" ht="30" customHeight="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2" hidden="1"><c r="A2"><v>42.5</v></c><c r="B2" t="b"><v>1</v></c><c r="C2" t="e"><v>#N/A</v></c></row>
<row r="3"><c r="A3"><f>SUM(A1:A2)</f><v>42.5</v></c><c r="B3" t="inlineStr"><is><t>inline</t></is></c><c t="str"><f>"x"&amp;"y"</f><v>xy</v></c></row>
</sheetData>
<mergeCells count="1"><mergeCell ref="A5:C6"/></mergeCells>
</worksheet>"#;
        let buf = package(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("xl/workbook.xml", workbook.as_bytes()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/sharedStrings.xml", shared.as_bytes()),
            ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
        ]);

        let workbook = XlsxReader::read(Cursor::new(buf)).unwrap();
        let ws = workbook.worksheet(0).unwrap();

        assert!(!ws.is_visible());
        assert_eq!(ws.get_value_at(0, 0), CellValue::string(" padded "));
        assert_eq!(ws.get_value_at(0, 1), CellValue::string("Rich text"));
        assert_eq!(ws.get_value_at(1, 0), CellValue::Number(42.5));
        assert_eq!(ws.get_value_at(1, 1), CellValue::Boolean(true));
        assert_eq!(ws.get_value_at(1, 2), CellValue::Error(CellError::Na));
        assert_eq!(
            ws.get_value_at(2, 0),
            CellValue::Formula {
                text: "SUM(A1:A2)".into(),
                cached_value: Some(Box::new(CellValue::Number(42.5))),
            }
        );
        assert_eq!(ws.get_value_at(2, 1), CellValue::string("inline"));
        // Cell without `r` follows its left neighbour
        assert_eq!(ws.get_value_at(2, 2).formula_text(), Some(r#""x"&"y""#));

        assert_eq!(ws.default_row_height(), 16.5);
        assert_eq!(ws.custom_row_height(0), Some(30.0));
        assert!(ws.is_row_hidden(1));
        assert_eq!(ws.custom_column_width(1), Some(20.5));
        assert_eq!(ws.custom_column_width(2), Some(20.5));
        assert!(ws.is_column_hidden(4));
        assert_eq!(ws.merged_regions(), &[CellRange::parse("A5:C6").unwrap()]);
    }

    #[test]
    fn test_read_shared_formula_followers() {
        let workbook = workbook_xml(r#"<sheet name="Calc" sheetId="1" r:id="rId1"/>"#);
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="2"><c r="B2"><f t="shared" ref="B2:C4" si="0">A2*$A$1</f><v>2</v></c><c r="C2"><f t="shared" si="0"/><v>4</v></c></row>
<row r="4"><c r="B4"><f t="shared" si="0"/><v>8</v></c><c r="D4"><f t="shared" si="3"/><v>7</v></c></row>
</sheetData></worksheet>"#;
        let buf = package(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("xl/workbook.xml", workbook.as_bytes()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
            ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
        ]);

        let workbook = XlsxReader::read(Cursor::new(buf)).unwrap();
        let ws = workbook.worksheet(0).unwrap();

        assert_eq!(ws.get_value_at(1, 1).formula_text(), Some("A2*$A$1"));
        assert_eq!(ws.get_value_at(1, 2).formula_text(), Some("B2*$A$1"));
        assert_eq!(
            ws.get_value_at(3, 1),
            CellValue::Formula {
                text: "A4*$A$1".into(),
                cached_value: Some(Box::new(CellValue::Number(8.0))),
            }
        );
        // No master for group 3
        assert_eq!(ws.get_value_at(3, 3), CellValue::Number(7.0));
    }

    #[test]
    fn test_read_pictures_share_media() {
        let workbook = workbook_xml(
            r#"<sheet name="One" sheetId="1" r:id="rId1"/><sheet name="Two" sheetId="2" r:id="rId2"/>"#,
        );
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#;
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData/><drawing r:id="rId7"/></worksheet>"#;
        let sheet_rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/></Relationships>"#;
        let drawing = r#"<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><xdr:oneCellAnchor><xdr:from><xdr:col>2</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>3</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from><xdr:ext cx="100" cy="50"/><xdr:pic><xdr:nvPicPr><xdr:cNvPr id="2" name="Logo"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill><xdr:spPr/></xdr:pic><xdr:clientData/></xdr:oneCellAnchor></xdr:wsDr>"#;
        let drawing_rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.PNG"/></Relationships>"#;

        let buf = package(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("xl/workbook.xml", workbook.as_bytes()),
            ("xl/_rels/workbook.xml.rels", rels.as_bytes()),
            ("xl/worksheets/sheet1.xml", sheet.as_bytes()),
            ("xl/worksheets/sheet2.xml", sheet.as_bytes()),
            ("xl/worksheets/_rels/sheet1.xml.rels", sheet_rels.as_bytes()),
            ("xl/worksheets/_rels/sheet2.xml.rels", sheet_rels.as_bytes()),
            ("xl/drawings/drawing1.xml", drawing.as_bytes()),
            ("xl/drawings/_rels/drawing1.xml.rels", drawing_rels.as_bytes()),
            ("xl/media/image1.PNG", &[0x89, b'P', b'N', b'G']),
        ]);

        let workbook = XlsxReader::read(Cursor::new(buf)).unwrap();
        assert_eq!(workbook.media().len(), 1);
        let media = workbook.media().get(MediaId(0)).unwrap();
        assert_eq!(media.extension, "png");
        assert_eq!(&media.data[..], &[0x89, b'P', b'N', b'G']);

        for ws in workbook.worksheets() {
            let pictures = ws.pictures();
            assert_eq!(pictures.len(), 1);
            assert_eq!(pictures[0].media, MediaId(0));
            assert_eq!(pictures[0].name, "Logo");
            assert_eq!(pictures[0].anchor.top_row(), Some(3));
            assert!(matches!(pictures[0].anchor, Anchor::OneCell { .. }));
        }
    }
}
