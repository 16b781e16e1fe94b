//! Worksheet drawing parts (`xl/drawings/drawingN.xml`)
//!
//! Only pictures are kept. Shapes, charts and group frames inside a drawing
//! are skipped while reading.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XlsxResult;
use crate::xml::{attr, escape_xml, local_name};
use sheetpress_core::{Anchor, AnchorPoint, Extent, Picture, Position};

pub(crate) const XDR_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";
pub(crate) const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const R_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A picture as found in a drawing part, before its image relationship is
/// resolved to media.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawingPicture {
    pub anchor: Anchor,
    /// Relationship id of the image (`r:embed`)
    pub embed: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AnchorKind {
    TwoCell,
    OneCell,
    Absolute,
}

#[derive(Debug, Clone, Copy)]
enum PointField {
    Col,
    ColOff,
    Row,
    RowOff,
}

/// Anchor under construction
#[derive(Debug, Default)]
struct PendingAnchor {
    from: AnchorPoint,
    to: AnchorPoint,
    ext: Extent,
    pos: Position,
    embed: Option<String>,
    name: String,
    description: Option<String>,
}

impl PendingAnchor {
    fn finish(self, kind: AnchorKind) -> Option<DrawingPicture> {
        let anchor = match kind {
            AnchorKind::TwoCell => Anchor::TwoCell {
                from: self.from,
                to: self.to,
            },
            AnchorKind::OneCell => Anchor::OneCell {
                from: self.from,
                ext: self.ext,
            },
            AnchorKind::Absolute => Anchor::Absolute {
                pos: self.pos,
                ext: self.ext,
            },
        };
        Some(DrawingPicture {
            anchor,
            embed: self.embed?,
            name: self.name,
            description: self.description,
        })
    }
}

/// `r:embed` regardless of the prefix the producer picked for the
/// relationships namespace.
fn embed_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| local_name(a.key.as_ref()) == b"embed")
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn ext_attrs(e: &BytesStart<'_>) -> Extent {
    Extent {
        cx: attr(e, b"cx").and_then(|v| v.trim().parse().ok()).unwrap_or(0),
        cy: attr(e, b"cy").and_then(|v| v.trim().parse().ok()).unwrap_or(0),
    }
}

/// Parse a drawing part and return its pictures in document order.
pub(crate) fn read_drawing_xml<R: BufRead>(reader: R) -> XlsxResult<Vec<DrawingPicture>> {
    let mut xml_reader = Reader::from_reader(reader);
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut pictures = Vec::new();

    let mut kind: Option<AnchorKind> = None;
    let mut pending = PendingAnchor::default();
    // true while inside <xdr:to>, false inside <xdr:from>
    let mut in_to = false;
    let mut in_point = false;
    let mut field: Option<PointField> = None;
    // Depth of <xdr:pic>/<xdr:sp>/... below the anchor; sizes in there
    // belong to the shape transform, not the anchor.
    let mut object_depth = 0usize;
    let mut in_pic = false;

    loop {
        let event = xml_reader.read_event_into(&mut buf)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"twoCellAnchor" if !is_empty => {
                        kind = Some(AnchorKind::TwoCell);
                        pending = PendingAnchor::default();
                    }
                    b"oneCellAnchor" if !is_empty => {
                        kind = Some(AnchorKind::OneCell);
                        pending = PendingAnchor::default();
                    }
                    b"absoluteAnchor" if !is_empty => {
                        kind = Some(AnchorKind::Absolute);
                        pending = PendingAnchor::default();
                    }
                    _ if kind.is_none() => {}
                    b"from" if object_depth == 0 && !is_empty => {
                        in_point = true;
                        in_to = false;
                    }
                    b"to" if object_depth == 0 && !is_empty => {
                        in_point = true;
                        in_to = true;
                    }
                    b"col" if in_point => field = Some(PointField::Col),
                    b"colOff" if in_point => field = Some(PointField::ColOff),
                    b"row" if in_point => field = Some(PointField::Row),
                    b"rowOff" if in_point => field = Some(PointField::RowOff),
                    b"ext" if object_depth == 0 => pending.ext = ext_attrs(e),
                    b"pos" if object_depth == 0 => {
                        pending.pos = Position {
                            x: attr(e, b"x").and_then(|v| v.trim().parse().ok()).unwrap_or(0),
                            y: attr(e, b"y").and_then(|v| v.trim().parse().ok()).unwrap_or(0),
                        };
                    }
                    b"pic" if object_depth == 0 && !is_empty => {
                        in_pic = true;
                        object_depth = 1;
                    }
                    b"sp" | b"grpSp" | b"graphicFrame" | b"cxnSp" if !is_empty => {
                        object_depth += 1;
                    }
                    b"cNvPr" if in_pic => {
                        pending.name = attr(e, b"name").unwrap_or_default();
                        pending.description = attr(e, b"descr").filter(|d| !d.is_empty());
                    }
                    b"blip" if in_pic => pending.embed = embed_attr(e),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let (Some(f), true) = (field, in_point) {
                    let text = t.unescape()?;
                    let value: i64 = text.trim().parse().unwrap_or(0);
                    let point = if in_to { &mut pending.to } else { &mut pending.from };
                    match f {
                        PointField::Col => point.col = value.clamp(0, u16::MAX as i64) as u16,
                        PointField::ColOff => point.col_off = value,
                        PointField::Row => point.row = value.clamp(0, u32::MAX as i64) as u32,
                        PointField::RowOff => point.row_off = value,
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor" => {
                        if let Some(k) = kind.take() {
                            let done = std::mem::take(&mut pending);
                            match done.finish(k) {
                                Some(picture) => pictures.push(picture),
                                None => log::debug!("skipping drawing anchor without a picture"),
                            }
                        }
                        object_depth = 0;
                        in_pic = false;
                    }
                    b"from" | b"to" if object_depth == 0 => in_point = false,
                    b"col" | b"colOff" | b"row" | b"rowOff" => field = None,
                    b"pic" if in_pic && object_depth == 1 => {
                        in_pic = false;
                        object_depth = 0;
                    }
                    b"sp" | b"grpSp" | b"graphicFrame" | b"cxnSp" => {
                        object_depth = object_depth.saturating_sub(1);
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(pictures)
}

fn write_point(out: &mut String, tag: &str, point: &AnchorPoint) {
    out.push_str(&format!(
        "<xdr:{tag}><xdr:col>{}</xdr:col><xdr:colOff>{}</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>{}</xdr:rowOff></xdr:{tag}>",
        point.col, point.col_off, point.row, point.row_off
    ));
}

fn write_pic(out: &mut String, object_id: usize, picture: &Picture, embed: &str, size: Extent) {
    let descr = picture
        .description
        .as_deref()
        .map(|d| format!(r#" descr="{}""#, escape_xml(d)))
        .unwrap_or_default();
    out.push_str(&format!(
        r#"<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{object_id}" name="{}"{descr}/><xdr:cNvPicPr><a:picLocks noChangeAspect="1"/></xdr:cNvPicPr></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr></xdr:pic><xdr:clientData/>"#,
        escape_xml(&picture.name),
        escape_xml(embed),
        size.cx,
        size.cy,
    ));
}

/// Serialize pictures into a drawing part. `embeds[i]` is the image
/// relationship id of `pictures[i]`.
pub(crate) fn write_drawing_xml(pictures: &[&Picture], embeds: &[String]) -> String {
    let mut out = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="{XDR_NS}" xmlns:a="{A_NS}" xmlns:r="{R_NS}">"#
    );

    for (i, (picture, embed)) in pictures.iter().zip(embeds).enumerate() {
        let object_id = i + 2;
        match &picture.anchor {
            Anchor::TwoCell { from, to } => {
                out.push_str(r#"<xdr:twoCellAnchor editAs="oneCell">"#);
                write_point(&mut out, "from", from);
                write_point(&mut out, "to", to);
                write_pic(&mut out, object_id, picture, embed, Extent::default());
                out.push_str("</xdr:twoCellAnchor>");
            }
            Anchor::OneCell { from, ext } => {
                out.push_str("<xdr:oneCellAnchor>");
                write_point(&mut out, "from", from);
                out.push_str(&format!(r#"<xdr:ext cx="{}" cy="{}"/>"#, ext.cx, ext.cy));
                write_pic(&mut out, object_id, picture, embed, *ext);
                out.push_str("</xdr:oneCellAnchor>");
            }
            Anchor::Absolute { pos, ext } => {
                out.push_str("<xdr:absoluteAnchor>");
                out.push_str(&format!(r#"<xdr:pos x="{}" y="{}"/>"#, pos.x, pos.y));
                out.push_str(&format!(r#"<xdr:ext cx="{}" cy="{}"/>"#, ext.cx, ext.cy));
                write_pic(&mut out, object_id, picture, embed, *ext);
                out.push_str("</xdr:absoluteAnchor>");
            }
        }
    }

    out.push_str("</xdr:wsDr>");
    out
}
