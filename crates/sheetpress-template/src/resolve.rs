//! Path expressions and their resolution against a scope stack

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Iteration index (0-based) of the innermost region
pub const INDEX_NAME: &str = "$index";
/// Iteration number (1-based) of the innermost region
pub const NUMBER_NAME: &str = "$number";
/// The whole view-model, skipping every iteration scope
pub const ROOT_NAME: &str = "$root";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid path '{path}': {reason}")]
pub struct PathError {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Field(String),
    Index(usize),
}

/// `name`, `order.lines[0].sku`, `[2]`, `$root.title`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-')
}

impl Path {
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let source = text.trim();
        let fail = |reason: &str| PathError {
            path: source.to_string(),
            reason: reason.to_string(),
        };

        let mut steps = Vec::new();
        let mut rest = source;
        if rest.is_empty() {
            return Err(fail("empty path"));
        }

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let close = after.find(']').ok_or_else(|| fail("unclosed '['"))?;
                let index = after[..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| fail("index must be a non-negative integer"))?;
                steps.push(PathStep::Index(index));
                rest = &after[close + 1..];
                continue;
            }

            let ident_text = if steps.is_empty() {
                rest
            } else {
                rest.strip_prefix('.')
                    .ok_or_else(|| fail("expected '.' or '[' between steps"))?
            };
            if !ident_text.starts_with(is_ident_start) {
                return Err(fail("expected a field name"));
            }
            let end = ident_text
                .find(|c: char| !is_ident_char(c))
                .unwrap_or(ident_text.len());
            steps.push(PathStep::Field(ident_text[..end].to_string()));
            rest = &ident_text[end..];
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Last field step, used as the default binding name of a region.
    pub fn last_field(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|step| match step {
            PathStep::Field(name) => Some(name.as_str()),
            PathStep::Index(_) => None,
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Field(name) if i == 0 => f.write_str(name)?,
                PathStep::Field(name) => write!(f, ".{name}")?,
                PathStep::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// One region iteration: the item being rendered and its position
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub name: &'a str,
    pub item: &'a Value,
    pub index: usize,
}

/// The root view-model plus the iteration frames active at some output row
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    root: &'a Value,
    frames: Vec<Frame<'a>>,
}

impl<'a> Scope<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            frames: Vec::new(),
        }
    }

    pub fn with_frames(root: &'a Value, frames: Vec<Frame<'a>>) -> Self {
        Self { root, frames }
    }

    pub fn push(&mut self, frame: Frame<'a>) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame<'a>> {
        self.frames.pop()
    }

    /// Frames outermost first
    pub fn frames(&self) -> &[Frame<'a>] {
        &self.frames
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Resolve `path`; `None` is a miss, never an error.
    pub fn resolve(&self, path: &Path) -> Option<Cow<'a, Value>> {
        let (first, rest) = path.steps.split_first()?;

        let start: Cow<'a, Value> = match first {
            PathStep::Index(i) => Cow::Borrowed(self.root.index(*i)?),
            PathStep::Field(name) => self.resolve_name(name)?,
        };

        match start {
            Cow::Borrowed(value) => walk(value, rest).map(Cow::Borrowed),
            // Computed values ($index, $number) have no fields
            Cow::Owned(value) => rest.is_empty().then_some(Cow::Owned(value)),
        }
    }

    fn resolve_name(&self, name: &str) -> Option<Cow<'a, Value>> {
        match name {
            ROOT_NAME => return Some(Cow::Borrowed(self.root)),
            INDEX_NAME => {
                return self.frames.last().map(|f| Cow::Owned(Value::from(f.index)));
            }
            NUMBER_NAME => {
                return self.frames.last().map(|f| Cow::Owned(Value::from(f.index + 1)));
            }
            _ => {}
        }

        for frame in self.frames.iter().rev() {
            if frame.name == name {
                return Some(Cow::Borrowed(frame.item));
            }
            if let Some(field) = frame.item.field(name) {
                return Some(Cow::Borrowed(field));
            }
        }
        self.root.field(name).map(Cow::Borrowed)
    }
}

fn walk<'a>(mut value: &'a Value, steps: &[PathStep]) -> Option<&'a Value> {
    for step in steps {
        value = match step {
            PathStep::Field(name) => value.field(name)?,
            PathStep::Index(i) => value.index(*i)?,
        };
    }
    Some(value)
}
