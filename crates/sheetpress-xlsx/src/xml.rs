//! Small helpers shared by the part readers and writers

use std::str::FromStr;

use quick_xml::events::BytesStart;

/// Unescaped value of attribute `key`.
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Attribute `key` parsed as `T`; `None` when absent or malformed.
pub(crate) fn attr_parse<T: FromStr>(e: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

/// OOXML boolean attribute (`1`/`true`); absent means false.
pub(crate) fn attr_flag(e: &BytesStart<'_>, key: &[u8]) -> bool {
    attr(e, key).map_or(false, |v| v == "1" || v == "true")
}

/// Element name without its namespace prefix (`xdr:from` -> `from`).
pub(crate) fn local_name<'a>(name: &'a [u8]) -> &'a [u8] {
    match name.iter().position(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters are not allowed in XML 1.0; Excel escapes them
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {
                out.push_str(&format!("_x{:04X}_", c as u32))
            }
            c => out.push(c),
        }
    }
    out
}

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses this format to encode characters XML cannot carry:
/// - `_x000d_` = CR
/// - `_x000a_` = LF
/// - `_x0009_` = Tab
/// - `_x005f_` = an escaped underscore
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(c) => {
                result.push(c);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Resolve a relationship target against the directory of its source part.
///
/// `("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml")` gives
/// `xl/drawings/drawing1.xml`; absolute targets drop their leading `/`.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = source_part.split('/').collect();
    parts.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Path of the relationships part belonging to `part`.
pub(crate) fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}
