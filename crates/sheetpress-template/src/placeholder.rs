//! Placeholder parsing and text rendering
//!
//! Cell text is split into literal runs and `{{ path | filter ... }}`
//! expressions. Anything that does not parse as an expression stays literal,
//! so parsing never fails and [`ParsedText`] always reproduces its source
//! through `Display`.

use std::borrow::Cow;
use std::fmt;

use crate::resolve::{Path, Scope};
use crate::value::Value;

pub const OPEN: &str = "{{";
pub const CLOSE: &str = "}}";

/// Modifier applied after path resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Upper,
    Lower,
    Trim,
    /// Length of a string, sequence or mapping
    Len,
    /// Replaces a missing or null value
    Default(Value),
}

impl Filter {
    fn parse(text: &str) -> Option<Self> {
        let (name, arg) = match text.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (text.trim(), None),
        };
        let filter = match (name.to_ascii_lowercase().as_str(), arg) {
            ("upper", None) => Filter::Upper,
            ("lower", None) => Filter::Lower,
            ("trim", None) => Filter::Trim,
            ("len", None) => Filter::Len,
            ("default", Some(arg)) => Filter::Default(parse_literal(arg)?),
            _ => return None,
        };
        Some(filter)
    }

    fn apply<'a>(&self, value: Option<Cow<'a, Value>>) -> Option<Cow<'a, Value>> {
        match self {
            Filter::Default(fallback) => match value {
                Some(v) if !v.is_null() => Some(v),
                _ => Some(Cow::Owned(fallback.clone())),
            },
            Filter::Len => value?.len().map(|n| Cow::Owned(Value::from(n))),
            Filter::Upper | Filter::Lower | Filter::Trim => {
                let value = value?;
                let changed = match (self, value.as_ref()) {
                    (Filter::Upper, Value::String(s)) => s.to_uppercase(),
                    (Filter::Lower, Value::String(s)) => s.to_lowercase(),
                    (_, Value::String(s)) => s.trim().to_string(),
                    _ => return Some(value),
                };
                Some(Cow::Owned(Value::String(changed)))
            }
        }
    }
}

/// `42`, `-1.5`, `true`, `"quoted text"`, `'quoted'` or a bare word
fn parse_literal(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(Value::from(inner));
        }
    }
    if text.starts_with(['"', '\'']) {
        return None;
    }
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" => return Some(Value::Null),
        _ => {}
    }
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() => Some(Value::Number(n)),
        _ => Some(Value::from(text)),
    }
}

/// Split on `|` outside of quotes.
fn split_pipes(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '|') => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// A parsed `{{ ... }}` body
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    path: Path,
    filters: Vec<Filter>,
    /// Text between the delimiters, untrimmed
    source: String,
}

impl Expression {
    /// Parse the text between `{{` and `}}`.
    pub fn parse(source: &str) -> Option<Self> {
        let mut parts = split_pipes(source).into_iter();
        let path = Path::parse(parts.next()?).ok()?;
        let filters = parts.map(Filter::parse).collect::<Option<Vec<_>>>()?;
        Some(Self {
            path,
            filters,
            source: source.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolve and filter; `None` is MISSING.
    pub fn evaluate<'a>(&self, scope: &Scope<'a>) -> Option<Cow<'a, Value>> {
        let resolved = scope.resolve(&self.path);
        if resolved.is_none() {
            tracing::trace!(path = %self.path, depth = scope.depth(), "unresolved placeholder");
        }
        self.filters
            .iter()
            .fold(resolved, |value, filter| filter.apply(value))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OPEN}{}{CLOSE}", self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(Expression),
}

/// Cell text split into literal and expression segments
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedText {
    segments: Vec<Segment>,
}

impl ParsedText {
    pub fn parse(text: &str) -> Self {
        let mut parsed = ParsedText::default();
        let mut rest = text;

        while let Some(close) = rest.find(CLOSE) {
            // The innermost `{{` before the first `}}` opens the expression
            let Some(open) = rest[..close].rfind(OPEN) else {
                parsed.push_literal(&rest[..close + CLOSE.len()]);
                rest = &rest[close + CLOSE.len()..];
                continue;
            };
            parsed.push_literal(&rest[..open]);

            let body = &rest[open + OPEN.len()..close];
            match Expression::parse(body) {
                Some(expr) => parsed.segments.push(Segment::Expr(expr)),
                None => {
                    tracing::debug!(placeholder = body, "not a valid placeholder, kept as text");
                    parsed.push_literal(&rest[open..close + CLOSE.len()]);
                }
            }
            rest = &rest[close + CLOSE.len()..];
        }
        parsed.push_literal(rest);
        parsed
    }

    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Literal(last)) => last.push_str(text),
            _ => self.segments.push(Segment::Literal(text.to_string())),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_placeholders(&self) -> bool {
        self.expressions().next().is_some()
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expr(e) => Some(e),
            Segment::Literal(_) => None,
        })
    }

    /// The expression of a cell holding exactly one placeholder and no
    /// other text apart from surrounding whitespace.
    pub fn single_expression(&self) -> Option<&Expression> {
        let mut found = None;
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) if text.trim().is_empty() => {}
                Segment::Literal(_) => return None,
                Segment::Expr(_) if found.is_some() => return None,
                Segment::Expr(e) => found = Some(e),
            }
        }
        found
    }

    /// Concatenate the segments, rendering each value with the text rule.
    pub fn render_text(&self, scope: &Scope<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expr(expr) => {
                    if let Some(value) = expr.evaluate(scope) {
                        out.push_str(&value.to_text());
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for ParsedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Expr(expr) => write!(f, "{expr}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Frame;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn model() -> Value {
        Value::from(serde_json::json!({
            "name": "  Widget  ",
            "qty": 3,
            "price": 2.5,
            "paid": false,
            "tags": ["a", "b"],
            "empty": null
        }))
    }

    fn render(text: &str) -> String {
        let model = model();
        ParsedText::parse(text).render_text(&Scope::new(&model))
    }

    #[test]
    fn test_segments() {
        let parsed = ParsedText::parse("Total: {{ qty }} x {{price}}");
        assert_eq!(parsed.segments().len(), 4);
        assert_eq!(
            parsed.expressions().map(|e| e.path().to_string()).collect::<Vec<_>>(),
            vec!["qty", "price"]
        );
        assert!(parsed.single_expression().is_none());
        assert!(ParsedText::parse("  {{ qty }} ").single_expression().is_some());
        assert!(!ParsedText::parse("plain").has_placeholders());
    }

    #[test]
    fn test_unmatched_and_invalid_stay_literal() {
        for text in [
            "{{ qty",
            "qty }}",
            "{{ }}",
            "{{ a..b }}",
            "{{ qty | shout }}",
            "{{ qty | default }}",
            "}} {{",
        ] {
            let parsed = ParsedText::parse(text);
            assert!(!parsed.has_placeholders(), "{text:?}");
            assert_eq!(render(text), text);
        }
    }

    #[test]
    fn test_innermost_open_delimiter_wins() {
        assert_eq!(render("{{ x {{ qty }}"), "{{ x 3");
    }

    #[test]
    fn test_text_rule() {
        assert_eq!(render("{{qty}} @ {{price}}"), "3 @ 2.5");
        assert_eq!(render("paid={{paid}}"), "paid=FALSE");
        assert_eq!(render("[{{missing}}][{{empty}}][{{tags}}]"), "[][][]");
    }

    #[test]
    fn test_filters() {
        assert_eq!(render("{{ name | trim | upper }}"), "WIDGET");
        assert_eq!(render("{{ name|trim|lower }}"), "widget");
        assert_eq!(render("{{ tags | len }}"), "2");
        assert_eq!(render("{{ missing | default: n/a }}"), "n/a");
        assert_eq!(render("{{ empty | default: \"a | b\" }}"), "a | b");
        assert_eq!(render("{{ qty | default: 0 }}"), "3");
        assert_eq!(render("{{ missing | len }}"), "");
        // Non-strings pass through case filters untouched
        assert_eq!(render("{{ qty | upper }}"), "3");
    }

    #[test]
    fn test_default_keeps_type() {
        let model = model();
        let scope = Scope::new(&model);
        let expr = Expression::parse(" missing | default: 7 ").unwrap();
        assert_eq!(expr.evaluate(&scope).as_deref(), Some(&Value::Number(7.0)));
        let expr = Expression::parse("missing | default: true").unwrap();
        assert_eq!(expr.evaluate(&scope).as_deref(), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_iteration_names() {
        let model = model();
        let tags = model.field("tags").unwrap().as_sequence().unwrap();
        let scope = Scope::with_frames(
            &model,
            vec![Frame {
                name: "tag",
                item: &tags[1],
                index: 1,
            }],
        );
        let parsed = ParsedText::parse("{{ $number }}. {{ tag | upper }} of {{ $root.tags | len }}");
        assert_eq!(parsed.render_text(&scope), "2. B of 2");
    }

    proptest! {
        #[test]
        fn display_reproduces_source(text in "[a-z{}| .\\[\\]0-9\"]{0,40}") {
            prop_assert_eq!(ParsedText::parse(&text).to_string(), text);
        }

        #[test]
        fn text_without_delimiters_is_one_literal(text in "[^{}]{1,40}") {
            let parsed = ParsedText::parse(&text);
            prop_assert_eq!(parsed.segments(), &[Segment::Literal(text.clone())][..]);
        }
    }
}
