//! A1-style cell addresses and rectangular ranges

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// A cell position, 0-based (`A1` is row 0, col 0).
///
/// Ordering is row-major, which is the order cells are laid out in a
/// worksheet part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse `A1` notation. `$` markers are accepted and ignored.
    ///
    /// ```
    /// use sheetpress_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$C$7").unwrap();
    /// assert_eq!((addr.row, addr.col), (6, 2));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let unmarked: String = s.chars().filter(|c| *c != '$').collect();
        let split = unmarked
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(unmarked.len());
        let (letters, digits) = unmarked.split_at(split);

        if letters.is_empty() || digits.is_empty() {
            return Err(Error::InvalidAddress(s.to_string()));
        }

        let col = Self::letters_to_column(letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        if row == 0 {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        if row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1));
        }

        Ok(Self { row: row - 1, col })
    }

    /// `0 -> A`, `25 -> Z`, `26 -> AA`
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::with_capacity(3);
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.reverse();
        String::from_utf8_lossy(&letters).into_owned()
    }

    /// Inverse of [`column_to_letters`](Self::column_to_letters), case-insensitive.
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(letters.to_string()));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(MAX_COLS, MAX_COLS - 1));
            }
        }
        match col {
            0 => Err(Error::InvalidAddress(letters.to_string())),
            n => Ok((n - 1) as u16),
        }
    }

    /// Same column, row moved by `delta`; `None` if it leaves the sheet.
    pub fn offset_rows(&self, delta: i64) -> Option<Self> {
        let row = self.row as i64 + delta;
        (0..MAX_ROWS as i64).contains(&row).then(|| Self {
            row: row as u32,
            col: self.col,
        })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// An inclusive rectangle of cells, always stored top-left to bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Build from any two opposite corners.
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Parse `A1:B2`, or a single `A1` as a one-cell range.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => {
                let addr = CellAddress::parse(s)?;
                Ok(Self::new(addr, addr))
            }
        }
    }

    pub fn contains(&self, addr: &CellAddress) -> bool {
        self.rows().contains(&addr.row)
            && (self.start.col..=self.end.col).contains(&addr.col)
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && other.start.row <= self.end.row
            && self.start.col <= other.end.col
            && other.start.col <= self.end.col
    }

    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    pub fn rows(&self) -> RangeInclusive<u32> {
        self.start.row..=self.end.row
    }

    /// The same rectangle moved vertically by `delta` rows.
    pub fn offset_rows(&self, delta: i64) -> Option<Self> {
        Some(Self {
            start: self.start.offset_rows(delta)?,
            end: self.end.offset_rows(delta)?,
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_address() {
        assert_eq!(CellAddress::parse("A1").unwrap(), CellAddress::new(0, 0));
        assert_eq!(CellAddress::parse("d5").unwrap(), CellAddress::new(4, 3));
        assert_eq!(CellAddress::parse("$AA$10").unwrap(), CellAddress::new(9, 26));
        assert_eq!(
            CellAddress::parse("XFD1048576").unwrap(),
            CellAddress::new(MAX_ROWS - 1, MAX_COLS - 1)
        );
    }

    #[test]
    fn test_parse_address_errors() {
        for bad in ["", "A", "12", "A0", "1A", "A1B", "XFE1", "A1048577"] {
            assert!(CellAddress::parse(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(701), "ZZ");
        assert_eq!(CellAddress::column_to_letters(702), "AAA");
        assert_eq!(CellAddress::letters_to_column("ZZ").unwrap(), 701);
    }

    #[test]
    fn test_display() {
        assert_eq!(CellAddress::new(4, 1).to_string(), "B5");
        assert_eq!(CellRange::parse("C5:B5").unwrap().to_string(), "B5:C5");
        assert_eq!(CellRange::parse("D7").unwrap().to_string(), "D7");
    }

    #[test]
    fn test_range_geometry() {
        let r = CellRange::parse("B2:D5").unwrap();
        assert_eq!(r.row_count(), 4);
        assert_eq!(r.col_count(), 3);
        assert!(r.contains(&CellAddress::new(3, 2)));
        assert!(!r.contains(&CellAddress::new(5, 2)));
        assert!(r.overlaps(&CellRange::parse("D5:F9").unwrap()));
        assert!(!r.overlaps(&CellRange::parse("E1:F9").unwrap()));
    }

    #[test]
    fn test_offset_rows() {
        let r = CellRange::parse("B5:C5").unwrap();
        assert_eq!(r.offset_rows(2), Some(CellRange::parse("B7:C7").unwrap()));
        assert_eq!(r.offset_rows(-5), None);
    }
}
