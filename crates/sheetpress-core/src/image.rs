//! Embedded pictures and their anchors
//!
//! Picture bytes live once in the workbook's [`MediaStore`]; worksheets hold
//! [`Picture`]s that point at the bytes through a [`MediaId`] and describe
//! where the picture sits with an [`Anchor`]. All offsets and extents are in
//! EMU (English Metric Units, 914400 per inch).

use std::sync::Arc;

/// EMU per pixel at 96 dpi
pub const EMU_PER_PIXEL: i64 = 9525;

/// Index of a media entry in a [`MediaStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(pub u32);

/// Raw image bytes and the file extension they were stored under
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub data: Arc<[u8]>,
    /// Lowercase, without the dot (`png`, `jpeg`, ...)
    pub extension: String,
}

impl Media {
    pub fn new(data: impl Into<Arc<[u8]>>, extension: &str) -> Self {
        Self {
            data: data.into(),
            extension: extension.trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    /// MIME type for the extension, `None` for formats the writer does not know.
    pub fn content_type(&self) -> Option<&'static str> {
        content_type_for_extension(&self.extension)
    }
}

/// MIME type of an image file extension (lowercase, no dot).
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "emf" => Some("image/x-emf"),
        "wmf" => Some("image/x-wmf"),
        _ => None,
    }
}

/// Workbook-level media entries, cheap to clone (bytes are shared)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaStore {
    entries: Vec<Media>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, media: Media) -> MediaId {
        self.entries.push(media);
        MediaId(self.entries.len() as u32 - 1)
    }

    pub fn get(&self, id: MediaId) -> Option<&Media> {
        self.entries.get(id.0 as usize)
    }

    pub fn contains(&self, id: MediaId) -> bool {
        (id.0 as usize) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MediaId, &Media)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, m)| (MediaId(i as u32), m))
    }
}

/// A cell corner plus an offset into that cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AnchorPoint {
    pub col: u16,
    pub col_off: i64,
    pub row: u32,
    pub row_off: i64,
}

impl AnchorPoint {
    pub const fn new(row: u32, col: u16) -> Self {
        Self {
            col,
            col_off: 0,
            row,
            row_off: 0,
        }
    }

    pub const fn with_offsets(mut self, col_off: i64, row_off: i64) -> Self {
        self.col_off = col_off;
        self.row_off = row_off;
        self
    }

    fn offset_rows(&self, delta: i64) -> Option<Self> {
        let row = self.row as i64 + delta;
        (0..crate::MAX_ROWS as i64).contains(&row).then(|| Self {
            row: row as u32,
            ..*self
        })
    }
}

/// Width and height in EMU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    pub cx: i64,
    pub cy: i64,
}

/// Absolute position on the sheet in EMU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

/// How a picture is attached to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Both corners follow cells
    TwoCell { from: AnchorPoint, to: AnchorPoint },
    /// Top-left follows a cell, size is fixed
    OneCell { from: AnchorPoint, ext: Extent },
    /// Not attached to cells
    Absolute { pos: Position, ext: Extent },
}

impl Anchor {
    /// Row of the top-left corner, `None` for absolute anchors.
    pub fn top_row(&self) -> Option<u32> {
        match self {
            Anchor::TwoCell { from, .. } | Anchor::OneCell { from, .. } => Some(from.row),
            Anchor::Absolute { .. } => None,
        }
    }

    /// Cell-attached corners moved by `delta` rows, offsets kept. Absolute
    /// anchors are returned unchanged. `None` if a corner leaves the sheet.
    pub fn offset_rows(&self, delta: i64) -> Option<Self> {
        Some(match *self {
            Anchor::TwoCell { from, to } => Anchor::TwoCell {
                from: from.offset_rows(delta)?,
                to: to.offset_rows(delta)?,
            },
            Anchor::OneCell { from, ext } => Anchor::OneCell {
                from: from.offset_rows(delta)?,
                ext,
            },
            absolute @ Anchor::Absolute { .. } => absolute,
        })
    }
}

/// A picture placed on a worksheet
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub media: MediaId,
    pub name: String,
    pub description: Option<String>,
    pub anchor: Anchor,
}

impl Picture {
    pub fn new(media: MediaId, name: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            media,
            name: name.into(),
            description: None,
            anchor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_store_ids() {
        let mut store = MediaStore::new();
        let a = store.add(Media::new(vec![1u8, 2, 3], "PNG"));
        let b = store.add(Media::new(vec![4u8], ".jpg"));

        assert_eq!(a, MediaId(0));
        assert_eq!(b, MediaId(1));
        assert_eq!(store.get(a).unwrap().extension, "png");
        assert_eq!(store.get(b).unwrap().content_type(), Some("image/jpeg"));
        assert!(!store.contains(MediaId(2)));
    }

    #[test]
    fn test_two_cell_offset_keeps_emu_offsets() {
        let anchor = Anchor::TwoCell {
            from: AnchorPoint::new(4, 3).with_offsets(9525, 19050),
            to: AnchorPoint::new(6, 5).with_offsets(100, 200),
        };
        let moved = anchor.offset_rows(2).unwrap();
        assert_eq!(
            moved,
            Anchor::TwoCell {
                from: AnchorPoint::new(6, 3).with_offsets(9525, 19050),
                to: AnchorPoint::new(8, 5).with_offsets(100, 200),
            }
        );
        assert_eq!(moved.top_row(), Some(6));
        assert_eq!(anchor.offset_rows(-5), None);
    }

    #[test]
    fn test_absolute_anchor_does_not_move() {
        let anchor = Anchor::Absolute {
            pos: Position { x: 10, y: 20 },
            ext: Extent { cx: 30, cy: 40 },
        };
        assert_eq!(anchor.offset_rows(7), Some(anchor));
        assert_eq!(anchor.top_row(), None);
    }
}
