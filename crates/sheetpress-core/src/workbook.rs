//! Workbook type - the main document structure

use crate::error::{Error, Result};
use crate::image::{Media, MediaId, MediaStore};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Characters Excel refuses in sheet names
const INVALID_SHEET_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];

/// A workbook: ordered worksheets plus the media their pictures point at
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    media: MediaStore,
    active_sheet: usize,
}

impl Workbook {
    /// A workbook with a single empty `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            media: MediaStore::new(),
            active_sheet: 0,
        }
    }

    /// A workbook without worksheets, for readers and renderers to fill
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            media: MediaStore::new(),
            active_sheet: 0,
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).map(|i| &self.worksheets[i])
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheet_index(name).map(move |i| &mut self.worksheets[i])
    }

    /// Case-insensitive lookup, as Excel does it
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| ws.name().to_lowercase() == name.to_lowercase())
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Append an empty worksheet with a generated `SheetN` name.
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = (self.worksheets.len() + 1..)
            .map(|n| format!("Sheet{n}"))
            .find(|name| self.sheet_index(name).is_none())
            .unwrap_or_default();
        self.add_worksheet_with_name(&name)
    }

    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.add_existing_worksheet(Worksheet::new(name))
    }

    /// Append a prepared worksheet. Its name must be valid and unused, and
    /// every picture must point at media already in the store.
    pub fn add_existing_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name(), None)?;
        if let Some(picture) = worksheet
            .pictures()
            .iter()
            .find(|p| !self.media.contains(p.media))
        {
            return Err(Error::UnknownMedia {
                picture: picture.name.clone(),
                media: picture.media.0,
            });
        }
        self.worksheets.push(worksheet);
        Ok(self.worksheets.len() - 1)
    }

    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        let removed = self.worksheets.remove(index);
        if self.active_sheet >= self.worksheets.len() {
            self.active_sheet = self.worksheets.len().saturating_sub(1);
        }
        Ok(removed)
    }

    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(new_name, Some(index))?;
        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    pub fn set_active_sheet(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.active_sheet = index;
        Ok(())
    }

    // === Media ===

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub fn add_media(&mut self, media: Media) -> MediaId {
        self.media.add(media)
    }

    /// Replace the media store wholesale; used to share a template's media.
    pub fn set_media(&mut self, media: MediaStore) {
        self.media = media;
    }

    // === Sheet names ===

    /// Turn arbitrary text into a valid sheet name not yet used in this
    /// workbook: invalid characters become `_`, the name is cut to 31
    /// characters, and clashes get a ` (2)`, ` (3)`, ... suffix.
    pub fn unique_sheet_name(&self, raw: &str) -> String {
        let cleaned: String = raw
            .trim()
            .chars()
            .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
            .collect();
        let base = fit_sheet_name(&cleaned, MAX_SHEET_NAME_LEN);

        if self.sheet_index(&base).is_none() {
            return base;
        }
        (2usize..)
            .map(|n| {
                let suffix = format!(" ({n})");
                let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
                format!("{}{}", fit_sheet_name(&base, keep), suffix)
            })
            .find(|candidate| self.sheet_index(candidate).is_none())
            .unwrap_or(base)
    }

    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        validate_sheet_name(name)?;
        match self.sheet_index(name) {
            Some(i) if Some(i) != exclude_index => Err(Error::DuplicateSheetName(name.into())),
            _ => Ok(()),
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a name against Excel's rules, ignoring uniqueness.
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_sheet_name(name, "name cannot be empty"));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::invalid_sheet_name(
            name,
            format!("longer than {MAX_SHEET_NAME_LEN} characters"),
        ));
    }
    if let Some(c) = name.chars().find(|c| INVALID_SHEET_CHARS.contains(c)) {
        return Err(Error::invalid_sheet_name(name, format!("contains '{c}'")));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(Error::invalid_sheet_name(
            name,
            "cannot start or end with an apostrophe",
        ));
    }
    Ok(())
}

/// Cut to `max` characters, then drop edge apostrophes; truncation can
/// expose one.
fn fit_sheet_name(s: &str, max: usize) -> String {
    let cut: String = s.chars().take(max).collect();
    match cut.trim_matches('\'') {
        "" => "Sheet".to_string(),
        trimmed => trimmed.to_string(),
    }
}
