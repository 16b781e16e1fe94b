//! XLSX styles (styles.xml) read/write helpers

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::{attr, attr_flag, attr_parse, escape_xml};
use sheetpress_core::style::{
    Alignment, BorderEdge, BorderLineStyle, BorderSide, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, PatternType, Protection, Style, Underline,
    VerticalAlignment,
};
use sheetpress_core::Workbook;

// === Writing ===

/// Workbook-wide `cellXfs` table built from the per-sheet style pools
#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Deduplicated styles; the position is the xf id
    styles: Vec<Style>,
    /// Per worksheet: local pool index -> xf id
    sheet_maps: Vec<HashMap<u32, u32>>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    num_fmt_id: u32,
}

/// Position of `item` in `table`, appending it when new.
fn intern<T: Clone + Eq + std::hash::Hash>(
    table: &mut Vec<T>,
    ids: &mut HashMap<T, usize>,
    item: &T,
) -> usize {
    if let Some(&id) = ids.get(item) {
        return id;
    }
    table.push(item.clone());
    ids.insert(item.clone(), table.len() - 1);
    table.len() - 1
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut styles = vec![Style::default()];
        let mut style_ids: HashMap<Style, usize> = HashMap::new();
        style_ids.insert(Style::default(), 0);

        let sheet_maps = workbook
            .worksheets()
            .map(|sheet| {
                sheet
                    .cells()
                    .styles()
                    .iter()
                    .map(|(local, style)| (local, intern(&mut styles, &mut style_ids, style) as u32))
                    .collect()
            })
            .collect();

        Self { styles, sheet_maps }
    }

    pub(crate) fn xf_id_for(&self, sheet_index: usize, local_style_index: u32) -> u32 {
        self.sheet_maps
            .get(sheet_index)
            .and_then(|m| m.get(&local_style_index).copied())
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        let mut fonts = vec![FontStyle::default()];
        let mut font_ids = HashMap::from([(FontStyle::default(), 0)]);

        // The first two fills are reserved: none and gray125
        let mut fills = vec![
            FillStyle::None,
            FillStyle::Pattern {
                pattern: PatternType::Gray125,
                foreground: Color::Auto,
                background: Color::Auto,
            },
        ];
        let mut fill_ids = HashMap::from([(FillStyle::None, 0)]);

        let mut borders = vec![BorderStyle::default()];
        let mut border_ids = HashMap::from([(BorderStyle::default(), 0)]);

        let mut numfmts: Vec<(u32, String)> = Vec::new();
        let mut numfmt_ids: HashMap<String, u32> = HashMap::new();

        let resolved: Vec<ResolvedXfIds> = self
            .styles
            .iter()
            .map(|style| ResolvedXfIds {
                font_id: intern(&mut fonts, &mut font_ids, &style.font),
                fill_id: intern(&mut fills, &mut fill_ids, &style.fill),
                border_id: intern(&mut borders, &mut border_ids, &style.border),
                num_fmt_id: match &style.number_format {
                    NumberFormat::General => 0,
                    NumberFormat::BuiltIn(id) => *id,
                    NumberFormat::Custom(code) => *numfmt_ids.entry(code.clone()).or_insert_with(|| {
                        let id = NumberFormat::FIRST_CUSTOM_ID + numfmts.len() as u32;
                        numfmts.push((id, code.clone()));
                        id
                    }),
                },
            })
            .collect();

        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_xml(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        push_table(&mut xml, "fonts", &fonts, write_font);
        push_table(&mut xml, "fills", &fills, write_fill);
        push_table(&mut xml, "borders", &borders, write_border);

        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (style, ids) in self.styles.iter().zip(&resolved) {
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>
</styleSheet>"#,
        );
        xml
    }
}

fn push_table<T>(xml: &mut String, tag: &str, items: &[T], write: fn(&T) -> String) {
    xml.push_str(&format!("\n  <{tag} count=\"{}\">", items.len()));
    for item in items {
        xml.push_str("\n    ");
        xml.push_str(&write(item));
    }
    xml.push_str(&format!("\n  </{tag}>"));
}

fn color_attrs(color: &Color) -> String {
    match color {
        Color::Auto => " auto=\"1\"".to_string(),
        Color::Rgb { .. } | Color::Argb { .. } => {
            format!(" rgb=\"{}\"", color.to_argb_hex().unwrap_or_default())
        }
        Color::Indexed(i) => format!(" indexed=\"{}\"", i),
        Color::Theme { index, tint: 0 } => format!(" theme=\"{}\"", index),
        Color::Theme { index, tint } => {
            format!(" theme=\"{}\" tint=\"{}\"", index, *tint as f64 / 100.0)
        }
    }
}

fn write_color(tag: &str, color: &Color) -> String {
    format!("<{tag}{}/>", color_attrs(color))
}

fn write_font(font: &FontStyle) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.strikethrough {
        s.push_str("<strike/>");
    }
    match font.underline.as_xml() {
        None => {}
        Some("single") => s.push_str("<u/>"),
        Some(val) => s.push_str(&format!("<u val=\"{val}\"/>")),
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));
    if !font.color.is_auto() {
        s.push_str(&write_color("color", &font.color));
    }
    s.push_str(&format!("<name val=\"{}\"/></font>", escape_xml(&font.name)));
    s
}

fn write_fill(fill: &FillStyle) -> String {
    match fill {
        FillStyle::None => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        FillStyle::Solid { color } => format!(
            "<fill><patternFill patternType=\"solid\">{}<bgColor indexed=\"64\"/></patternFill></fill>",
            write_color("fgColor", color)
        ),
        FillStyle::Pattern {
            pattern,
            foreground,
            background,
        } => format!(
            "<fill><patternFill patternType=\"{}\">{}{}</patternFill></fill>",
            pattern.as_xml(),
            write_color("fgColor", foreground),
            write_color("bgColor", background)
        ),
    }
}

fn write_border(border: &BorderStyle) -> String {
    let mut s = String::from("<border");
    if border.diagonal_up {
        s.push_str(" diagonalUp=\"1\"");
    }
    if border.diagonal_down {
        s.push_str(" diagonalDown=\"1\"");
    }
    s.push('>');
    for side in BorderSide::ALL {
        let tag = side.tag();
        match border
            .edge(side)
            .as_ref()
            .and_then(|e| Some((e.style.as_xml()?, e)))
        {
            Some((style, edge)) => s.push_str(&format!(
                "<{tag} style=\"{style}\">{}</{tag}>",
                write_color("color", &edge.color)
            )),
            None => s.push_str(&format!("<{tag}/>")),
        }
    }
    s.push_str("</border>");
    s
}

fn write_alignment(al: &Alignment) -> String {
    if al.is_default() {
        return String::new();
    }
    let default = Alignment::default();
    let mut s = String::from("<alignment");
    if al.horizontal != default.horizontal {
        s.push_str(&format!(" horizontal=\"{}\"", al.horizontal.as_xml()));
    }
    if al.vertical != default.vertical {
        s.push_str(&format!(" vertical=\"{}\"", al.vertical.as_xml()));
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    if al.shrink_to_fit {
        s.push_str(" shrinkToFit=\"1\"");
    }
    if al.indent != 0 {
        s.push_str(&format!(" indent=\"{}\"", al.indent));
    }
    if al.rotation != 0 {
        s.push_str(&format!(" textRotation=\"{}\"", al.rotation));
    }
    s.push_str("/>");
    s
}

fn write_protection(p: &Protection) -> String {
    if *p == Protection::default() {
        return String::new();
    }
    format!(
        "<protection locked=\"{}\" hidden=\"{}\"/>",
        p.locked as u8, p.hidden as u8
    )
}

fn write_xf(style: &Style, ids: ResolvedXfIds) -> String {
    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"",
        ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id
    );
    let applied = [
        ("applyNumberFormat", ids.num_fmt_id != 0),
        ("applyFont", ids.font_id != 0),
        ("applyFill", ids.fill_id != 0),
        ("applyBorder", ids.border_id != 0),
        ("applyAlignment", !style.alignment.is_default()),
        ("applyProtection", style.protection != Protection::default()),
    ];
    for (name, on) in applied {
        if on {
            s.push_str(&format!(" {name}=\"1\""));
        }
    }

    let children = write_alignment(&style.alignment) + &write_protection(&style.protection);
    if children.is_empty() {
        s.push_str("/>");
    } else {
        s.push('>');
        s.push_str(&children);
        s.push_str("</xf>");
    }
    s
}

// === Reading ===

/// The pieces of an `<xf>` before they are resolved against the tables
#[derive(Debug, Default)]
struct XfRecord {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: Alignment,
    protection: Protection,
}

impl XfRecord {
    fn from_attrs(e: &BytesStart<'_>) -> Self {
        Self {
            num_fmt_id: attr_parse(e, b"numFmtId").unwrap_or(0),
            font_id: attr_parse(e, b"fontId").unwrap_or(0),
            fill_id: attr_parse(e, b"fillId").unwrap_or(0),
            border_id: attr_parse(e, b"borderId").unwrap_or(0),
            ..Self::default()
        }
    }
}

/// Fill being assembled from `<patternFill>` and its color children
#[derive(Debug, Default)]
struct PendingFill {
    pattern: Option<PatternType>,
    fg: Color,
    bg: Color,
}

impl PendingFill {
    fn finish(self) -> FillStyle {
        match self.pattern.unwrap_or(PatternType::None) {
            PatternType::None | PatternType::Gray125 => FillStyle::None,
            PatternType::Solid => FillStyle::Solid { color: self.fg },
            pattern => FillStyle::Pattern {
                pattern,
                foreground: self.fg,
                background: self.bg,
            },
        }
    }
}

/// Parsed `styles.xml` tables
#[derive(Debug, Default)]
struct StyleSheet {
    numfmts: HashMap<u32, String>,
    fonts: Vec<FontStyle>,
    fills: Vec<FillStyle>,
    borders: Vec<BorderStyle>,
}

impl StyleSheet {
    fn resolve(&self, xf: XfRecord) -> Style {
        Style {
            font: self.fonts.get(xf.font_id).cloned().unwrap_or_default(),
            fill: self.fills.get(xf.fill_id).cloned().unwrap_or_default(),
            border: self.borders.get(xf.border_id).cloned().unwrap_or_default(),
            alignment: xf.alignment,
            protection: xf.protection,
            number_format: NumberFormat::from_id(
                xf.num_fmt_id,
                self.numfmts.get(&xf.num_fmt_id).map(String::as_str),
            ),
        }
    }
}

/// Read `cellXfs` as fully resolved styles, indexed by xf id.
pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<Vec<Style>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheet = StyleSheet::default();
    let mut cell_xfs: Vec<Style> = Vec::new();

    let mut current_font: Option<FontStyle> = None;
    let mut current_fill: Option<PendingFill> = None;
    let mut current_border: Option<BorderStyle> = None;
    let mut current_edge: Option<BorderSide> = None;
    let mut current_xf: Option<XfRecord> = None;
    let mut in_cell_xfs = false;
    // dxfs carry partial styles; their contents are skipped
    let mut in_dxfs = false;

    loop {
        let event = xml_reader.read_event_into(&mut buf)?;
        let is_start = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name();
                match name.as_ref() {
                    b"dxfs" => in_dxfs = is_start,
                    _ if in_dxfs => {}
                    b"cellXfs" => in_cell_xfs = is_start,
                    b"numFmt" => {
                        if let (Some(id), Some(code)) =
                            (attr_parse::<u32>(e, b"numFmtId"), attr(e, b"formatCode"))
                        {
                            sheet.numfmts.insert(id, code);
                        }
                    }
                    b"font" => {
                        if is_start {
                            current_font = Some(FontStyle::default());
                        } else {
                            sheet.fonts.push(FontStyle::default());
                        }
                    }
                    b"b" | b"i" | b"strike" | b"u" | b"sz" | b"name" => {
                        if let Some(font) = current_font.as_mut() {
                            apply_font_property(font, name.as_ref(), e);
                        }
                    }
                    b"fill" => {
                        if is_start {
                            current_fill = Some(PendingFill::default());
                        } else {
                            sheet.fills.push(FillStyle::None);
                        }
                    }
                    b"patternFill" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.pattern = attr(e, b"patternType")
                                .and_then(|v| PatternType::from_xml(&v));
                        }
                    }
                    b"fgColor" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.fg = parse_color_attrs(e);
                        }
                    }
                    b"bgColor" => {
                        if let Some(fill) = current_fill.as_mut() {
                            fill.bg = parse_color_attrs(e);
                        }
                    }
                    b"border" => {
                        let border = BorderStyle {
                            diagonal_up: attr_flag(e, b"diagonalUp"),
                            diagonal_down: attr_flag(e, b"diagonalDown"),
                            ..BorderStyle::default()
                        };
                        if is_start {
                            current_border = Some(border);
                        } else {
                            sheet.borders.push(border);
                        }
                    }
                    b"left" | b"right" | b"top" | b"bottom" | b"diagonal" | b"start" | b"end" => {
                        if let (Some(border), Some(side)) =
                            (current_border.as_mut(), BorderSide::from_tag(name.as_ref()))
                        {
                            let style = attr(e, b"style")
                                .map(|v| BorderLineStyle::from_xml(&v))
                                .unwrap_or_default();
                            if style != BorderLineStyle::None {
                                *border.edge_mut(side) = Some(BorderEdge::new(style, Color::Auto));
                            }
                            if is_start {
                                current_edge = Some(side);
                            }
                        }
                    }
                    b"color" => {
                        let color = parse_color_attrs(e);
                        if let Some(font) = current_font.as_mut() {
                            font.color = color;
                        } else if let (Some(border), Some(side)) =
                            (current_border.as_mut(), current_edge)
                        {
                            if let Some(edge) = border.edge_mut(side).as_mut() {
                                edge.color = color;
                            }
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        let record = XfRecord::from_attrs(e);
                        if is_start {
                            current_xf = Some(record);
                        } else {
                            cell_xfs.push(sheet.resolve(record));
                        }
                    }
                    b"alignment" => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.alignment = parse_alignment(e);
                        }
                    }
                    b"protection" => {
                        if let Some(xf) = current_xf.as_mut() {
                            xf.protection = Protection {
                                locked: attr(e, b"locked").map_or(true, |v| v == "1" || v == "true"),
                                hidden: attr_flag(e, b"hidden"),
                            };
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"dxfs" => in_dxfs = false,
                _ if in_dxfs => {}
                b"font" => {
                    if let Some(font) = current_font.take() {
                        sheet.fonts.push(font);
                    }
                }
                b"fill" => {
                    if let Some(fill) = current_fill.take() {
                        sheet.fills.push(fill.finish());
                    }
                }
                b"border" => {
                    if let Some(border) = current_border.take() {
                        sheet.borders.push(border);
                    }
                    current_edge = None;
                }
                b"left" | b"right" | b"top" | b"bottom" | b"diagonal" | b"start" | b"end" => {
                    current_edge = None;
                }
                b"xf" => {
                    if let Some(record) = current_xf.take() {
                        cell_xfs.push(sheet.resolve(record));
                    }
                }
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if cell_xfs.is_empty() {
        cell_xfs.push(Style::default());
    }
    Ok(cell_xfs)
}

fn apply_font_property(font: &mut FontStyle, tag: &[u8], e: &BytesStart<'_>) {
    // `<b val="0"/>` switches the property off
    let on = attr(e, b"val").map_or(true, |v| v != "0" && v != "false");
    match tag {
        b"b" => font.bold = on,
        b"i" => font.italic = on,
        b"strike" => font.strikethrough = on,
        b"u" => {
            font.underline = attr(e, b"val")
                .map(|v| Underline::from_xml(&v))
                .unwrap_or(Underline::Single)
        }
        b"sz" => font.size = attr_parse(e, b"val").unwrap_or(font.size),
        b"name" => {
            if let Some(name) = attr(e, b"val") {
                font.name = name;
            }
        }
        _ => {}
    }
}

fn parse_alignment(e: &BytesStart<'_>) -> Alignment {
    Alignment {
        horizontal: attr(e, b"horizontal")
            .and_then(|v| HorizontalAlignment::from_xml(&v))
            .unwrap_or_default(),
        vertical: attr(e, b"vertical")
            .and_then(|v| VerticalAlignment::from_xml(&v))
            .unwrap_or_default(),
        wrap_text: attr_flag(e, b"wrapText"),
        shrink_to_fit: attr_flag(e, b"shrinkToFit"),
        indent: attr_parse(e, b"indent").unwrap_or(0),
        rotation: attr_parse(e, b"textRotation").unwrap_or(0),
    }
}

/// Priority: rgb > theme > indexed > auto
fn parse_color_attrs(e: &BytesStart<'_>) -> Color {
    match attr(e, b"rgb").and_then(|v| Color::from_hex(&v)) {
        Some(Color::Argb { a: 0xFF, r, g, b }) => return Color::Rgb { r, g, b },
        Some(color) => return color,
        None => {}
    }
    if let Some(index) = attr_parse::<u8>(e, b"theme") {
        let tint = attr_parse::<f64>(e, b"tint")
            .map(|t| (t * 100.0).round().clamp(-100.0, 100.0) as i8)
            .unwrap_or(0);
        return Color::Theme { index, tint };
    }
    match attr_parse::<u8>(e, b"indexed") {
        // 64 is the system foreground, i.e. automatic
        Some(64) | None => Color::Auto,
        Some(i) => Color::Indexed(i),
    }
}
