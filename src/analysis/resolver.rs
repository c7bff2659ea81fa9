//! Cell reference extraction from formula text.
//!
//! This is a lexical scan, not a formula parser: it walks the text once,
//! skips quoted string spans, and picks out tokens shaped like cell
//! references (`A1`, `$B$2`, `Sheet2!C3`, `'My Sheet'!A1:B4`). Function
//! calls, numeric literals, and names that merely resemble references
//! (`LOG10(...)`) are not matched. The scan is a pure function of the
//! formula text and the sheet it belongs to; it never consults workbook
//! state and never validates that referenced cells exist.

use crate::addr;
use std::collections::BTreeSet;

/// Expanded-range safety cap. A rectangle larger than this contributes only
/// its first `RANGE_EXPANSION_CAP` cells (row-major) to the reference set.
pub const RANGE_EXPANSION_CAP: usize = 65_536;

/// One reference occurrence in a formula, with its byte span in the source
/// text so callers can rewrite the formula in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RefSpan {
    pub start: usize,
    pub end: usize,
    /// Explicit sheet qualifier, unquoted; `None` inherits the current sheet.
    pub sheet: Option<String>,
    /// 0-based (row, col) of the reference (or the range's first corner).
    pub from: (u32, u32),
    /// Second corner for ranges (`A1:B4`); `None` for single cells.
    pub to: Option<(u32, u32)>,
}

/// Scan a formula for reference occurrences, in source order.
pub fn scan_references(formula: &str) -> Vec<RefSpan> {
    Scanner::new(formula).run()
}

/// Resolve a formula attached to `sheet` into its normalized reference set
/// (`Sheet!A1` strings, ranges expanded, deduplicated, sorted).
pub fn extract_references(formula: &str, sheet: &str) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    for span in scan_references(formula) {
        let target_sheet = span.sheet.as_deref().unwrap_or(sheet);
        for (row, col) in span.cells() {
            refs.insert(addr::format_node(target_sheet, row, col));
        }
    }
    refs
}

impl RefSpan {
    /// Member cells: the single cell, or the range rectangle in row-major
    /// order, truncated at [`RANGE_EXPANSION_CAP`].
    pub fn cells(&self) -> Vec<(u32, u32)> {
        let Some((to_row, to_col)) = self.to else {
            return vec![self.from];
        };
        let (r0, r1) = (self.from.0.min(to_row), self.from.0.max(to_row));
        let (c0, c1) = (self.from.1.min(to_col), self.from.1.max(to_col));

        let mut cells = Vec::new();
        'rows: for row in r0..=r1 {
            for col in c0..=c1 {
                cells.push((row, col));
                if cells.len() >= RANGE_EXPANSION_CAP {
                    break 'rows;
                }
            }
        }
        cells
    }
}

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: Vec<RefSpan>,
}

impl<'a> Scanner<'a> {
    fn new(formula: &'a str) -> Self {
        Self {
            text: formula,
            bytes: formula.as_bytes(),
            pos: 0,
            out: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<RefSpan> {
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'"' => self.skip_string(),
                b'\'' => self.quoted_sheet_or_skip(),
                b'0'..=b'9' => self.skip_number(),
                c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' => self.token(),
                _ => self.pos += 1,
            }
        }
        self.out
    }

    /// Skip a double-quoted string literal; `""` is an embedded quote.
    fn skip_string(&mut self) {
        self.pos += 1;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'"' {
                if self.bytes.get(self.pos + 1) == Some(&b'"') {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return;
            }
            self.pos += 1;
        }
    }

    /// `'Sheet Name'!A1`: a single-quoted span is only a reference when
    /// followed by `!`; otherwise it is skipped like a literal. The name is
    /// built from slices of the source so multi-byte characters survive;
    /// `''` is an embedded quote.
    fn quoted_sheet_or_skip(&mut self) {
        let start = self.pos;
        self.pos += 1;
        let mut name = String::new();
        let mut segment = self.pos;
        loop {
            match self.bytes.get(self.pos) {
                None => return,
                Some(b'\'') if self.bytes.get(self.pos + 1) == Some(&b'\'') => {
                    name.push_str(&self.text[segment..self.pos + 1]);
                    self.pos += 2;
                    segment = self.pos;
                }
                Some(b'\'') => {
                    name.push_str(&self.text[segment..self.pos]);
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        if self.bytes.get(self.pos) != Some(&b'!') {
            return;
        }
        self.pos += 1;
        self.qualified_ref(start, name);
    }

    /// Skip a numeric literal, exponent included, so `1E2` never yields a
    /// phantom `E2` reference.
    fn skip_number(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(c) if c.is_ascii_digit() || *c == b'.') {
            self.pos += 1;
        }
        if matches!(self.bytes.get(self.pos), Some(&b'e') | Some(&b'E')) {
            let mut ahead = self.pos + 1;
            if matches!(self.bytes.get(ahead), Some(&b'+') | Some(&b'-')) {
                ahead += 1;
            }
            if matches!(self.bytes.get(ahead), Some(c) if c.is_ascii_digit()) {
                self.pos = ahead;
                while matches!(self.bytes.get(self.pos), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
    }

    /// An identifier-shaped token: a bare sheet qualifier, a cell reference,
    /// or something to ignore (function name, defined name).
    fn token(&mut self) {
        let start = self.pos;
        while matches!(
            self.bytes.get(self.pos),
            Some(&c) if c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'$')
        ) {
            self.pos += 1;
        }
        let text = &self.bytes[start..self.pos];

        if self.bytes.get(self.pos) == Some(&b'!') {
            self.pos += 1;
            let name = String::from_utf8_lossy(text).into_owned();
            self.qualified_ref(start, name);
            return;
        }

        let Some(cell) = parse_cell_token(text) else {
            return;
        };
        // A trailing `(` means this was a function call (SUM, LOG10, ...).
        if self.next_nonspace() == Some(b'(') {
            return;
        }
        let to = self.try_range_tail();
        self.out.push(RefSpan {
            start,
            end: self.pos,
            sheet: None,
            from: cell,
            to,
        });
    }

    /// Parse the cell (and optional range tail) after a `!` qualifier.
    fn qualified_ref(&mut self, start: usize, sheet: String) {
        let cell_start = self.pos;
        while matches!(
            self.bytes.get(self.pos),
            Some(&c) if c.is_ascii_alphanumeric() || matches!(c, b'_' | b'$')
        ) {
            self.pos += 1;
        }
        let Some(cell) = parse_cell_token(&self.bytes[cell_start..self.pos]) else {
            return;
        };
        let to = self.try_range_tail();
        self.out.push(RefSpan {
            start,
            end: self.pos,
            sheet: Some(sheet),
            from: cell,
            to,
        });
    }

    /// After a matched cell, `:B4` extends it into a range. The colon is
    /// left unconsumed when what follows is not a cell.
    fn try_range_tail(&mut self) -> Option<(u32, u32)> {
        if self.bytes.get(self.pos) != Some(&b':') {
            return None;
        }
        let mut ahead = self.pos + 1;
        let tail_start = ahead;
        while matches!(
            self.bytes.get(ahead),
            Some(&c) if c.is_ascii_alphanumeric() || matches!(c, b'_' | b'$')
        ) {
            ahead += 1;
        }
        let cell = parse_cell_token(&self.bytes[tail_start..ahead])?;
        self.pos = ahead;
        Some(cell)
    }

    fn next_nonspace(&self) -> Option<u8> {
        self.bytes[self.pos..]
            .iter()
            .copied()
            .find(|c| !c.is_ascii_whitespace())
    }
}

/// Full-token cell match: optional `$`, 1-3 letters, optional `$`, 1-7
/// digits. Anything else (including trailing characters) is not a cell.
fn parse_cell_token(token: &[u8]) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(token).ok()?;
    let stripped = text.replace('$', "");
    let letters = stripped
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    let digits = stripped.len() - letters;
    if !(1..=3).contains(&letters) || !(1..=7).contains(&digits) {
        return None;
    }
    addr::parse_cell(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(formula: &str) -> Vec<String> {
        extract_references(formula, "Sheet1").into_iter().collect()
    }

    #[test]
    fn test_bare_references() {
        assert_eq!(refs("=A1+B2"), vec!["Sheet1!A1", "Sheet1!B2"]);
        assert_eq!(refs("A2*B2"), vec!["Sheet1!A2", "Sheet1!B2"]);
    }

    #[test]
    fn test_absolute_markers_stripped() {
        assert_eq!(refs("=$A$1+$B2+C$3"), vec!["Sheet1!A1", "Sheet1!B2", "Sheet1!C3"]);
    }

    #[test]
    fn test_sheet_qualified() {
        assert_eq!(refs("=Sheet2!B3*2"), vec!["Sheet2!B3"]);
        assert_eq!(refs("='My Sheet'!A1"), vec!["My Sheet!A1"]);
    }

    #[test]
    fn test_quoted_sheet_names_keep_special_characters() {
        assert_eq!(refs("='Übersicht'!A1"), vec!["Übersicht!A1"]);
        assert_eq!(refs("='予算2026'!B2"), vec!["予算2026!B2"]);
        // Doubled quotes embed a literal quote in the name.
        assert_eq!(refs("='It''s here'!C3"), vec!["It's here!C3"]);
    }

    #[test]
    fn test_function_names_not_matched() {
        assert_eq!(refs("=LOG10(5)"), Vec::<String>::new());
        assert_eq!(refs("=SUM(A1,B1)"), vec!["Sheet1!A1", "Sheet1!B1"]);
        assert_eq!(refs("=LOG10 (5)"), Vec::<String>::new());
    }

    #[test]
    fn test_string_literals_skipped() {
        assert_eq!(refs("=CONCAT(\"A1\",B2)"), vec!["Sheet1!B2"]);
        assert_eq!(refs("=\"see B2 and \"\"C3\"\"\""), Vec::<String>::new());
    }

    #[test]
    fn test_numeric_literals_skipped() {
        assert_eq!(refs("=1E2+3.5e-1"), Vec::<String>::new());
        assert_eq!(refs("=12+A3"), vec!["Sheet1!A3"]);
    }

    #[test]
    fn test_range_expansion() {
        assert_eq!(refs("=SUM(C2:C3)"), vec!["Sheet1!C2", "Sheet1!C3"]);
        assert_eq!(
            refs("=SUM(A1:B2)"),
            vec!["Sheet1!A1", "Sheet1!A2", "Sheet1!B1", "Sheet1!B2"]
        );
        // Reversed corners normalize to the same rectangle.
        assert_eq!(
            refs("=SUM(B2:A1)"),
            vec!["Sheet1!A1", "Sheet1!A2", "Sheet1!B1", "Sheet1!B2"]
        );
    }

    #[test]
    fn test_qualified_range() {
        assert_eq!(refs("=SUM(Data!A1:A3)"), vec!["Data!A1", "Data!A2", "Data!A3"]);
    }

    #[test]
    fn test_whole_column_ranges_ignored() {
        // Column-only spans carry no row digits; the lexical scan skips them.
        assert_eq!(refs("=SUM(A:A)"), Vec::<String>::new());
    }

    #[test]
    fn test_pure_function_determinism() {
        let a = extract_references("=SUM(A1:A3)+Other!B2", "S");
        let b = extract_references("=SUM(A1:A3)+Other!B2", "S");
        assert_eq!(a, b);
    }

    #[test]
    fn test_spans_support_rewriting() {
        let spans = scan_references("=A1+'My Sheet'!B2:C3");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].from, (0, 0));
        assert_eq!(spans[1].sheet.as_deref(), Some("My Sheet"));
        assert_eq!(spans[1].to, Some((2, 2)));
        let src = "=A1+'My Sheet'!B2:C3";
        assert_eq!(&src[spans[1].start..spans[1].end], "'My Sheet'!B2:C3");
    }
}
