//! # sheetpress-template
//!
//! Renders template worksheets against a view-model.
//!
//! A template is an ordinary workbook. Cells carry `{{ path }}` placeholders,
//! and directive cells starting with `#!` mark rows that repeat or depend on
//! a condition:
//!
//! | Directive                      | Effect                                          |
//! |--------------------------------|-------------------------------------------------|
//! | `#! FOR_EACH path [AS name]`   | opens a block repeated once per item; row elided |
//! | `#! END_EACH`                  | closes the innermost block; row elided          |
//! | `#! REPEAT_ROW path [AS name]` | repeats its own row once per item               |
//! | `#! IF path` / `#! IF NOT path`| keeps the row (or region) only when truthy      |
//!
//! Rendering runs four steps per worksheet:
//!
//! 1. [`TemplateLayout::classify`] builds the row/region tree
//! 2. [`expand`] walks it against the view-model into output rows and a
//!    [`CoordinateMapping`]
//! 3. the materializer writes styled cells, row heights and hidden flags
//! 4. [`remap_merges`] and [`remap_pictures`] carry merges and pictures over
//!
//! [`Renderer`] runs the whole pipeline for a workbook.

pub mod directive;
pub mod error;
pub mod expand;
pub mod layout;
mod materialize;
pub mod placeholder;
pub mod remap;
pub mod render;
pub mod report;
pub mod resolve;
pub mod value;

pub use directive::{Binding, Directive, DirectiveError};
pub use error::{TemplateError, TemplateResult};
pub use expand::{expand, CoordinateMapping, Expansion, OutputRow, Target};
pub use layout::{Condition, Region, RegionId, RegionKind, RowNode, TemplateLayout, TemplateNode};
pub use placeholder::{Expression, Filter, ParsedText, Segment};
pub use remap::{remap_merges, remap_pictures};
pub use render::{RenderOptions, Renderer};
pub use report::{RegionReport, RenderReport, SheetReport};
pub use resolve::{Frame, Path, PathError, PathStep, Scope};
pub use value::Value;
