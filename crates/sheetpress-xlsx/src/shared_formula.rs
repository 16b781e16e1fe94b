//! Shared formulas
//!
//! Excel stores a run of similar formulas once, on a master cell
//! (`<f t="shared" ref="B2:B9" si="0">A2*2</f>`), and followers carry only
//! the group index (`<f t="shared" si="0"/>`). A follower's formula is the
//! master's with its relative references moved by the distance between the
//! two cells.

use lazy_regex::regex_captures;
use sheetpress_core::{CellAddress, MAX_COLS, MAX_ROWS};

/// Move every relative reference in `formula` by `rows` and `cols`.
///
/// String literals and quoted sheet names are left alone, as are function
/// names and sheet prefixes. A reference pushed off the sheet becomes
/// `#REF!`.
pub(crate) fn shift_formula(formula: &str, rows: i64, cols: i64) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut chars = formula.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c == '"' || c == '\'' {
            out.push(c);
            for (_, next) in chars.by_ref() {
                out.push(next);
                if next == c {
                    break;
                }
            }
            continue;
        }
        if !is_word_char(c) {
            out.push(c);
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if !is_word_char(next) {
                break;
            }
            end = i + next.len_utf8();
            chars.next();
        }
        let word = &formula[start..end];
        let followed_by = chars.peek().map(|&(_, next)| next);

        match followed_by {
            Some('(') | Some('!') => out.push_str(word),
            _ => match shift_reference(word, rows, cols) {
                Some(shifted) => out.push_str(&shifted),
                None => out.push_str(word),
            },
        }
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '.')
}

/// `None` when `word` is not an A1 reference.
fn shift_reference(word: &str, rows: i64, cols: i64) -> Option<String> {
    let (_, col_abs, letters, row_abs, digits) =
        regex_captures!(r"^(\$?)([A-Za-z]{1,3})(\$?)([0-9]+)$", word)?;
    let col = i64::from(CellAddress::letters_to_column(letters).ok()?);
    let row = digits.parse::<i64>().ok()?.checked_sub(1)?;
    if row < 0 || row >= i64::from(MAX_ROWS) {
        return None;
    }

    let col = if col_abs.is_empty() { col + cols } else { col };
    let row = if row_abs.is_empty() { row + rows } else { row };
    if !(0..i64::from(MAX_COLS)).contains(&col) || !(0..i64::from(MAX_ROWS)).contains(&row) {
        return Some("#REF!".to_string());
    }
    Some(format!(
        "{col_abs}{}{row_abs}{}",
        CellAddress::column_to_letters(col as u16),
        row + 1
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_relative_references_move() {
        assert_eq!(shift_formula("A2*2", 3, 0), "A5*2");
        assert_eq!(shift_formula("SUM(A1:B2)+C3", 1, 1), "SUM(B2:C3)+D4");
        assert_eq!(shift_formula("Z1+1", 0, 1), "AA1+1");
    }

    #[test]
    fn test_absolute_parts_stay() {
        assert_eq!(shift_formula("$A$1+$B2+C$3", 2, 2), "$A$1+$B4+E$3");
    }

    #[test]
    fn test_literals_functions_and_sheets_are_kept() {
        assert_eq!(
            shift_formula(r#"IF(A1>0,"B2 ""C3""",'Q1 A1'!B2)"#, 1, 0),
            r#"IF(A2>0,"B2 ""C3""",'Q1 A1'!B3)"#
        );
        assert_eq!(shift_formula("LOG10(A1)+Data!A1", 1, 0), "LOG10(A2)+Data!A2");
        assert_eq!(shift_formula("TRUE+1.5E3", 4, 4), "TRUE+1.5E3");
    }

    #[test]
    fn test_reference_off_the_sheet() {
        assert_eq!(shift_formula("A2-A1", -1, 0), "A1-#REF!");
    }
}
