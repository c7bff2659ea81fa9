//! Cell address encoding.
//!
//! Rows and columns are 0-based everywhere inside the crate; the public
//! session API is 1-based like a spreadsheet UI. Rendered addresses use the
//! `SHEET!COLROW` form (`Sheet1!C3`). Absolute markers (`$`) are accepted on
//! input and never rendered, so `$A$1` and `A1` name the same cell.

/// Convert a 0-based column index to spreadsheet letters (0→A, 25→Z, 26→AA).
pub fn column_letters(col: u32) -> String {
    let mut result = String::new();
    let mut num = col as u64;

    loop {
        let remainder = (num % 26) as u8;
        result.insert(0, (b'A' + remainder) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }

    result
}

/// Parse spreadsheet column letters into a 0-based index (A→0, AA→26).
/// Case-insensitive. Returns `None` for empty or non-alphabetic input.
pub fn parse_column(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: u64 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (c.to_ascii_uppercase() as u64 - 'A' as u64 + 1);
    }
    Some((col - 1) as u32)
}

/// Format a cell as `A1` text from 0-based row/column.
pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", column_letters(col), row + 1)
}

/// Parse `A1`-style text (optionally with `$` markers) into 0-based
/// (row, col). Returns `None` when the text is not a cell reference.
pub fn parse_cell(text: &str) -> Option<(u32, u32)> {
    let text = text.trim();
    let mut chars = text.chars().peekable();

    if chars.peek() == Some(&'$') {
        chars.next();
    }
    let mut letters = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphabetic() {
            letters.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if chars.peek() == Some(&'$') {
        chars.next();
    }
    let digits: String = chars.collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let col = parse_column(&letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

/// Render a graph node identifier: `Sheet1!C3`.
pub fn format_node(sheet: &str, row: u32, col: u32) -> String {
    format!("{}!{}", sheet, cell_name(row, col))
}

/// Split a node identifier back into (sheet, row, col). The sheet component
/// is everything before the last `!`, so sheet names containing `!` survive.
pub fn split_node(node: &str) -> Option<(&str, u32, u32)> {
    let idx = node.rfind('!')?;
    let (sheet, rest) = (&node[..idx], &node[idx + 1..]);
    let (row, col) = parse_cell(rest)?;
    Some((sheet, row, col))
}
