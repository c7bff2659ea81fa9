//! In-memory workbook model.
//!
//! A workbook is an ordered collection of named sheets; each sheet is a
//! sparse grid of cells keyed by 0-based (row, column). Sparse storage uses a
//! `BTreeMap` so iteration is always row-major sorted, which keeps dependency
//! graph construction deterministic across runs.

use crate::addr;
use crate::error::{SheetError, SheetResult};
use serde::Serialize;
use std::collections::BTreeMap;

//==============================================================================
// Cell values
//==============================================================================

/// A cell's stored value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// Type tag reported alongside the value ("empty", "number", "text",
    /// "boolean").
    pub fn type_tag(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Bool(_) => "boolean",
        }
    }

    /// Display rendering: integers without a decimal point, floats trimmed
    /// of trailing zeros.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// Format a number, trimming float noise to six decimal places.
pub fn format_number(n: f64) -> String {
    let rounded = (n * 1e6).round() / 1e6;
    format!("{:.6}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// One cell: a value plus an optional formula string (kept with its leading
/// `=` stripped or not, exactly as the caller supplied it).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Cell {
    pub value: CellValue,
    pub formula: Option<String>,
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl Cell {
    pub fn value(value: CellValue) -> Self {
        Self {
            value,
            formula: None,
        }
    }

    pub fn formula(formula: impl Into<String>) -> Self {
        Self {
            value: CellValue::Empty,
            formula: Some(formula.into()),
        }
    }
}

//==============================================================================
// Sheets
//==============================================================================

/// A named sheet holding a sparse cell grid.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        let entry = self.cells.entry((row, col)).or_default();
        entry.value = value;
    }

    pub fn set_formula(&mut self, row: u32, col: u32, formula: impl Into<String>) {
        let entry = self.cells.entry((row, col)).or_default();
        entry.formula = Some(formula.into());
    }

    pub fn clear_cell(&mut self, row: u32, col: u32) {
        self.cells.remove(&(row, col));
    }

    /// Row-major sorted iteration over occupied cells.
    pub fn iter(&self) -> impl Iterator<Item = (&(u32, u32), &Cell)> {
        self.cells.iter()
    }

    pub fn formula_count(&self) -> usize {
        self.cells.values().filter(|c| c.formula.is_some()).count()
    }

    /// Inclusive bounding box of occupied cells, or `None` when empty.
    pub fn used_range(&self) -> Option<((u32, u32), (u32, u32))> {
        let mut bounds: Option<((u32, u32), (u32, u32))> = None;
        for &(row, col) in self.cells.keys() {
            let ((r0, c0), (r1, c1)) = bounds.unwrap_or(((row, col), (row, col)));
            bounds = Some((
                (r0.min(row), c0.min(col)),
                (r1.max(row), c1.max(col)),
            ));
        }
        bounds
    }

    /// Populate a sheet from CSV text starting at A1. Numeric fields become
    /// numbers, `TRUE`/`FALSE` become booleans, everything else is text.
    pub fn from_csv(name: impl Into<String>, data: &str) -> SheetResult<Self> {
        let mut sheet = Sheet::new(name);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (col, field) in record.iter().enumerate() {
                if field.is_empty() {
                    continue;
                }
                sheet.set_value(row as u32, col as u32, parse_csv_field(field));
            }
        }
        Ok(sheet)
    }

    /// Render the sheet's used range as CSV, using display text for every
    /// cell. An empty sheet renders as an empty string.
    pub fn to_csv(&self) -> SheetResult<String> {
        let Some(((r0, c0), (r1, c1))) = self.used_range() else {
            return Ok(String::new());
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in r0..=r1 {
            let record: Vec<String> = (c0..=c1)
                .map(|col| {
                    self.cell(row, col)
                        .map(|c| c.value.display())
                        .unwrap_or_default()
                })
                .collect();
            writer.write_record(&record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| SheetError::Workbook(format!("CSV write failed: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| SheetError::Workbook(format!("CSV output not UTF-8: {}", e)))
    }
}

fn parse_csv_field(field: &str) -> CellValue {
    if let Ok(n) = field.parse::<f64>() {
        return CellValue::Number(n);
    }
    match field {
        "TRUE" | "true" => CellValue::Bool(true),
        "FALSE" | "false" => CellValue::Bool(false),
        _ => CellValue::Text(field.to_string()),
    }
}

//==============================================================================
// Workbook
//==============================================================================

/// Ordered sheet collection. Sheet names are unique case-insensitively, the
/// way spreadsheet applications treat them.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    /// Look up a sheet by name, case-insensitively.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Canonical stored casing for a referenced sheet name, if it exists.
    pub fn canonical_sheet_name(&self, name: &str) -> Option<&str> {
        self.sheet(name).map(|s| s.name.as_str())
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> SheetResult<&mut Sheet> {
        let name = name.into();
        self.insert_sheet(Sheet::new(name))
    }

    pub fn insert_sheet(&mut self, sheet: Sheet) -> SheetResult<&mut Sheet> {
        if sheet.name.trim().is_empty() {
            return Err(SheetError::InvalidInput(
                "Sheet name must not be empty".to_string(),
            ));
        }
        if self.sheet(&sheet.name).is_some() {
            return Err(SheetError::DuplicateSheet(sheet.name.clone()));
        }
        self.sheets.push(sheet);
        Ok(self.sheets.last_mut().unwrap())
    }

    pub fn remove_sheet(&mut self, name: &str) -> SheetResult<Sheet> {
        let idx = self
            .sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SheetError::SheetNotFound(name.to_string()))?;
        Ok(self.sheets.remove(idx))
    }

    pub fn rename_sheet(&mut self, from: &str, to: &str) -> SheetResult<()> {
        if to.trim().is_empty() {
            return Err(SheetError::InvalidInput(
                "Sheet name must not be empty".to_string(),
            ));
        }
        if !from.eq_ignore_ascii_case(to) && self.sheet(to).is_some() {
            return Err(SheetError::DuplicateSheet(to.to_string()));
        }
        let sheet = self
            .sheet_mut(from)
            .ok_or_else(|| SheetError::SheetNotFound(from.to_string()))?;
        sheet.set_name(to.to_string());
        Ok(())
    }

    /// Total formula cell count across all sheets.
    pub fn formula_count(&self) -> usize {
        self.sheets.iter().map(Sheet::formula_count).sum()
    }

    /// Cell lookup through a normalized node identifier (`Sheet1!C3`).
    pub fn cell_at_node(&self, node: &str) -> Option<&Cell> {
        let (sheet, row, col) = addr::split_node(node)?;
        self.sheet(sheet)?.cell(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Number(20.0).display(), "20");
        assert_eq!(CellValue::Number(3.5).display(), "3.5");
        assert_eq!(CellValue::Number(1.0000004).display(), "1");
        assert_eq!(CellValue::Text("hi".into()).display(), "hi");
        assert_eq!(CellValue::Bool(true).display(), "TRUE");
        assert_eq!(CellValue::Empty.display(), "");
    }

    #[test]
    fn test_duplicate_sheet_rejected() {
        let mut wb = Workbook::new();
        wb.add_sheet("Sheet1").unwrap();
        let err = wb.add_sheet("sheet1").unwrap_err();
        assert!(matches!(err, SheetError::DuplicateSheet(_)));
    }

    #[test]
    fn test_empty_sheet_name_rejected() {
        let mut wb = Workbook::new();
        let err = wb.add_sheet("   ").unwrap_err();
        assert!(matches!(err, SheetError::InvalidInput(_)));
    }

    #[test]
    fn test_rename_sheet() {
        let mut wb = Workbook::new();
        wb.add_sheet("Data").unwrap();
        wb.add_sheet("Other").unwrap();
        wb.rename_sheet("Data", "Inputs").unwrap();
        assert!(wb.sheet("Inputs").is_some());
        assert!(matches!(
            wb.rename_sheet("Inputs", "other"),
            Err(SheetError::DuplicateSheet(_))
        ));
    }

    #[test]
    fn test_used_range() {
        let mut sheet = Sheet::new("S");
        assert_eq!(sheet.used_range(), None);
        sheet.set_value(1, 2, CellValue::Number(1.0));
        sheet.set_value(4, 0, CellValue::Number(2.0));
        assert_eq!(sheet.used_range(), Some(((1, 0), (4, 2))));
    }

    #[test]
    fn test_csv_roundtrip() {
        let sheet = Sheet::from_csv("S", "name,qty\nwidget,10\ngadget,2.5\n").unwrap();
        assert_eq!(
            sheet.cell(1, 1).map(|c| c.value.clone()),
            Some(CellValue::Number(10.0))
        );
        assert_eq!(
            sheet.cell(2, 0).map(|c| c.value.clone()),
            Some(CellValue::Text("gadget".into()))
        );

        let csv = sheet.to_csv().unwrap();
        assert_eq!(csv, "name,qty\nwidget,10\ngadget,2.5\n");
    }

    #[test]
    fn test_cell_at_node() {
        let mut wb = Workbook::new();
        wb.add_sheet("Sheet1").unwrap();
        wb.sheet_mut("Sheet1")
            .unwrap()
            .set_value(2, 2, CellValue::Number(7.0));
        let cell = wb.cell_at_node("Sheet1!C3").unwrap();
        assert_eq!(cell.value, CellValue::Number(7.0));
        assert!(wb.cell_at_node("Missing!A1").is_none());
    }
}
