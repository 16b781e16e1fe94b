//! Per-sheet style deduplication

use super::Style;
use ahash::AHashMap;

/// Interned styles of one worksheet.
///
/// Cells store a `u32` index into the pool; index 0 is always the default
/// style. Identical styles share an index.
#[derive(Debug, Clone)]
pub struct StylePool {
    styles: Vec<Style>,
    index: AHashMap<Style, u32>,
}

impl StylePool {
    pub fn new() -> Self {
        let mut index = AHashMap::with_capacity(64);
        index.insert(Style::default(), 0);
        Self {
            styles: vec![Style::default()],
            index,
        }
    }

    /// Index of `style`, interning it on first sight.
    pub fn get_or_insert(&mut self, style: Style) -> u32 {
        if let Some(&idx) = self.index.get(&style) {
            return idx;
        }
        let idx = self.styles.len() as u32;
        self.index.insert(style.clone(), idx);
        self.styles.push(style);
        idx
    }

    pub fn index_of(&self, style: &Style) -> Option<u32> {
        self.index.get(style).copied()
    }

    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    /// The style at index 0.
    pub fn default_style(&self) -> &Style {
        &self.styles[0]
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// True when only the default style is present.
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Style)> {
        self.styles.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}
