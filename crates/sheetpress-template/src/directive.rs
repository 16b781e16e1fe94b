//! Structural directives
//!
//! A directive is a string cell whose trimmed text starts with `#!`:
//!
//! ```text
//! #! FOR_EACH order.lines AS line
//! #! END_EACH
//! #! REPEAT_ROW items
//! #! IF NOT customer.vip
//! ```
//!
//! Keywords are case-insensitive. The whole cell is the directive.

use lazy_regex::regex_captures;
use sheetpress_core::CellValue;
use thiserror::Error;

use crate::resolve::{Path, PathError};

pub const SENTINEL: &str = "#!";

/// Binding name used when the path has no field step to borrow one from
pub const DEFAULT_BINDING: &str = "item";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("empty directive")]
    Empty,

    #[error("unknown directive '{0}'")]
    UnknownKeyword(String),

    #[error("{0} needs a path")]
    MissingPath(&'static str),

    #[error("unexpected text after {keyword}: '{text}'")]
    TrailingText { keyword: &'static str, text: String },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// A region's bound sequence and the name its items are visible under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub path: Path,
    pub name: String,
}

impl Binding {
    fn parse(keyword: &'static str, text: &str) -> Result<Self, DirectiveError> {
        let (path_text, alias) =
            match regex_captures!(r"^(.*?)\s*\bAS\s+([A-Za-z_][A-Za-z0-9_-]*)$"i, text) {
                Some((_, path, alias)) => (path, Some(alias)),
                None => (text, None),
            };
        if path_text.trim().is_empty() {
            return Err(DirectiveError::MissingPath(keyword));
        }
        let path = Path::parse(path_text)?;
        let name = alias
            .or_else(|| path.last_field())
            .unwrap_or(DEFAULT_BINDING)
            .to_string();
        Ok(Self { path, name })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Opens a block region; its row is not rendered
    ForEach(Binding),
    /// Closes the innermost block region; its row is not rendered
    EndEach,
    /// Repeats its own row once per item
    RepeatRow(Binding),
    /// Keeps the row (or the region opened on it) only if the path is truthy
    If { negated: bool, path: Path },
}

impl Directive {
    /// `None` when the cell is not a directive at all.
    pub fn from_cell(value: &CellValue) -> Option<Result<Self, DirectiveError>> {
        match value {
            CellValue::String(text) => Self::parse(text),
            _ => None,
        }
    }

    /// `None` when `text` does not start with the sentinel.
    pub fn parse(text: &str) -> Option<Result<Self, DirectiveError>> {
        let body = text.trim().strip_prefix(SENTINEL)?.trim();
        Some(Self::parse_body(body))
    }

    fn parse_body(body: &str) -> Result<Self, DirectiveError> {
        let Some((_, keyword, rest)) = regex_captures!(r"^([A-Za-z_]+)\s*(.*)$"s, body) else {
            return Err(if body.is_empty() {
                DirectiveError::Empty
            } else {
                DirectiveError::UnknownKeyword(body.to_string())
            });
        };
        let rest = rest.trim();

        match keyword.to_ascii_uppercase().as_str() {
            "FOR_EACH" => Binding::parse("FOR_EACH", rest).map(Directive::ForEach),
            "REPEAT_ROW" => Binding::parse("REPEAT_ROW", rest).map(Directive::RepeatRow),
            "END_EACH" if rest.is_empty() => Ok(Directive::EndEach),
            "END_EACH" => Err(DirectiveError::TrailingText {
                keyword: "END_EACH",
                text: rest.to_string(),
            }),
            "IF" => {
                let (negated, path_text) = match regex_captures!(r"^NOT\s+(.*)$"i, rest) {
                    Some((_, path)) => (true, path),
                    None if rest.eq_ignore_ascii_case("NOT") => (true, ""),
                    None => (false, rest),
                };
                if path_text.trim().is_empty() {
                    return Err(DirectiveError::MissingPath(if negated {
                        "IF NOT"
                    } else {
                        "IF"
                    }));
                }
                Ok(Directive::If {
                    negated,
                    path: Path::parse(path_text)?,
                })
            }
            _ => Err(DirectiveError::UnknownKeyword(keyword.to_string())),
        }
    }

    pub fn is_structural(&self) -> bool {
        !matches!(self, Directive::If { .. })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Directive::ForEach(_) => "FOR_EACH",
            Directive::EndEach => "END_EACH",
            Directive::RepeatRow(_) => "REPEAT_ROW",
            Directive::If { negated: false, .. } => "IF",
            Directive::If { negated: true, .. } => "IF NOT",
        }
    }
}
