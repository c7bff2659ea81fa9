//! Workbook session facade.
//!
//! One session owns a workbook, its formula registry, and the asset
//! resolver for the backing file. Cell coordinates on this surface are
//! 1-based, matching how spreadsheet users count; everything below the
//! facade is 0-based.

use crate::analysis::{
    self, CellEvaluation, CircularReference, EvaluateOptions, EvaluationReport, FormulaGraph,
    FormulaSummary,
};
use crate::assets::{AssetResolver, ChartInfo, ImageInfo, MacroModule};
use crate::engine::{CustomFn, FormulaRegistry};
use crate::error::{SheetError, SheetResult};
use crate::model::{Cell, CellValue, Sheet, Workbook};
use crate::addr;
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub struct WorkbookSession {
    workbook: Workbook,
    registry: FormulaRegistry,
    assets: AssetResolver,
    last_evaluated: Option<DateTime<Utc>>,
}

impl WorkbookSession {
    /// An empty in-memory session. Asset queries return nothing until a
    /// file-backed session is opened instead.
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            registry: FormulaRegistry::new(),
            assets: AssetResolver::detached(),
            last_evaluated: None,
        }
    }

    /// An in-memory session over a pre-populated registry, for callers that
    /// share one custom formula setup across sessions.
    pub fn with_registry(registry: FormulaRegistry) -> Self {
        Self {
            registry,
            ..Self::new()
        }
    }

    /// Open a workbook file, importing cell values and formulas.
    pub fn open(path: impl AsRef<Path>) -> SheetResult<Self> {
        let path = path.as_ref();
        let mut excel: Xlsx<_> = open_workbook(path)
            .map_err(|e| SheetError::Workbook(format!("Cannot open workbook: {}", e)))?;

        let mut workbook = Workbook::new();
        for sheet_name in excel.sheet_names().to_vec() {
            let sheet = workbook.add_sheet(&sheet_name)?;

            if let Ok(range) = excel.worksheet_range(&sheet_name) {
                let (base_row, base_col) = range.start().unwrap_or((0, 0));
                for (row, col, data) in range.used_cells() {
                    let value = import_value(data);
                    if value != CellValue::Empty {
                        sheet.set_value(base_row + row as u32, base_col + col as u32, value);
                    }
                }
            }

            if let Ok(formulas) = excel.worksheet_formula(&sheet_name) {
                let (base_row, base_col) = formulas.start().unwrap_or((0, 0));
                for (row, col, formula) in formulas.used_cells() {
                    if !formula.is_empty() {
                        sheet.set_formula(
                            base_row + row as u32,
                            base_col + col as u32,
                            formula.clone(),
                        );
                    }
                }
            }
        }

        info!(path = %path.display(), sheets = workbook.sheets().len(), "workbook opened");
        Ok(Self {
            workbook,
            registry: FormulaRegistry::new(),
            assets: AssetResolver::for_file(path),
            last_evaluated: None,
        })
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    // --- cells (1-based surface) ---

    pub fn get_cell(&self, sheet: &str, row: u32, col: u32) -> SheetResult<Cell> {
        let (row, col) = check_coords(row, col)?;
        let sheet = self.sheet(sheet)?;
        Ok(sheet.cell(row, col).cloned().unwrap_or_default())
    }

    pub fn set_cell(&mut self, sheet: &str, row: u32, col: u32, value: CellValue) -> SheetResult<()> {
        let (row, col) = check_coords(row, col)?;
        self.sheet_mut(sheet)?.set_value(row, col, value);
        Ok(())
    }

    pub fn set_cell_formula(
        &mut self,
        sheet: &str,
        row: u32,
        col: u32,
        formula: &str,
    ) -> SheetResult<()> {
        let (row, col) = check_coords(row, col)?;
        if formula.trim().is_empty() {
            return Err(SheetError::InvalidInput(
                "Formula must not be empty".to_string(),
            ));
        }
        self.sheet_mut(sheet)?.set_formula(row, col, formula);
        Ok(())
    }

    // --- sheets ---

    pub fn add_sheet(&mut self, name: &str) -> SheetResult<()> {
        self.workbook.add_sheet(name).map(|_| ())
    }

    pub fn add_sheet_from_csv(&mut self, name: &str, data: &str) -> SheetResult<()> {
        let sheet = Sheet::from_csv(name, data)?;
        self.workbook.insert_sheet(sheet).map(|_| ())
    }

    pub fn delete_sheet(&mut self, name: &str) -> SheetResult<()> {
        self.workbook.remove_sheet(name).map(|_| ())
    }

    pub fn rename_sheet(&mut self, from: &str, to: &str) -> SheetResult<()> {
        self.workbook.rename_sheet(from, to)
    }

    pub fn to_csv(&self, sheet: &str) -> SheetResult<String> {
        self.sheet(sheet)?.to_csv()
    }

    // --- evaluation ---

    /// Evaluate every formula, updating cell values in place.
    pub fn evaluate_all(&mut self, options: &EvaluateOptions) -> SheetResult<EvaluationReport> {
        let report = analysis::evaluate_all(&mut self.workbook, &self.registry, options)?;
        self.last_evaluated = Some(Utc::now());
        Ok(report)
    }

    /// Evaluate the workbook and read back one cell; never fails.
    pub fn evaluate_cell(&mut self, sheet: &str, row: u32, col: u32) -> CellEvaluation {
        let Ok((row0, col0)) = check_coords(row, col) else {
            return CellEvaluation {
                address: format!("{}!R{}C{}", sheet, row, col),
                value: CellValue::Empty,
                type_tag: CellValue::Empty.type_tag().to_string(),
                formula: None,
                error: Some("Row and column must be positive".to_string()),
            };
        };
        let Some(canonical) = self.workbook.canonical_sheet_name(sheet).map(str::to_string)
        else {
            return CellEvaluation {
                address: addr::format_node(sheet, row0, col0),
                value: CellValue::Empty,
                type_tag: CellValue::Empty.type_tag().to_string(),
                formula: None,
                error: Some(format!("Sheet not found: {}", sheet)),
            };
        };
        let node = addr::format_node(&canonical, row0, col0);
        analysis::evaluate_cell(&mut self.workbook, &self.registry, &node)
    }

    pub fn find_circular_references(&self) -> Vec<CircularReference> {
        analysis::find_cycles(&FormulaGraph::build(&self.workbook))
    }

    pub fn formula_summary(&self) -> FormulaSummary {
        analysis::formula_summary(&self.workbook, &self.registry, self.last_evaluated)
    }

    // --- custom formulas ---

    pub fn register_formula(&mut self, name: &str, function: CustomFn) -> SheetResult<()> {
        self.registry.register(name, function)
    }

    pub fn register_formulas(
        &mut self,
        functions: impl IntoIterator<Item = (String, CustomFn)>,
    ) -> SheetResult<()> {
        self.registry.register_many(functions)
    }

    pub fn set_formula_locale(&mut self, dictionary: HashMap<String, String>) {
        self.registry.localize(dictionary);
    }

    // --- assets ---

    pub fn charts(&mut self) -> &[ChartInfo] {
        self.assets.charts()
    }

    pub fn images(&mut self) -> &[ImageInfo] {
        self.assets.images()
    }

    pub fn macros(&mut self) -> &[MacroModule] {
        self.assets.macros()
    }

    // --- internal ---

    fn sheet(&self, name: &str) -> SheetResult<&Sheet> {
        self.workbook
            .sheet(name)
            .ok_or_else(|| SheetError::SheetNotFound(name.to_string()))
    }

    fn sheet_mut(&mut self, name: &str) -> SheetResult<&mut Sheet> {
        self.workbook
            .sheet_mut(name)
            .ok_or_else(|| SheetError::SheetNotFound(name.to_string()))
    }
}

impl Default for WorkbookSession {
    fn default() -> Self {
        Self::new()
    }
}

/// 1-based surface coordinates to 0-based internal ones.
fn check_coords(row: u32, col: u32) -> SheetResult<(u32, u32)> {
    if row == 0 || col == 0 {
        return Err(SheetError::InvalidInput(
            "Row and column are 1-based and must be positive".to_string(),
        ));
    }
    Ok((row - 1, col - 1))
}

fn import_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_are_one_based() {
        let mut session = WorkbookSession::new();
        session.add_sheet("Sheet1").unwrap();
        session
            .set_cell("Sheet1", 2, 1, CellValue::Number(10.0))
            .unwrap();

        let cell = session.get_cell("Sheet1", 2, 1).unwrap();
        assert_eq!(cell.value, CellValue::Number(10.0));
        assert!(session.get_cell("Sheet1", 0, 1).is_err());
        assert!(session.get_cell("Missing", 1, 1).is_err());
    }

    #[test]
    fn test_empty_formula_rejected() {
        let mut session = WorkbookSession::new();
        session.add_sheet("Sheet1").unwrap();
        let err = session.set_cell_formula("Sheet1", 1, 1, "  ").unwrap_err();
        assert!(matches!(err, SheetError::InvalidInput(_)));
    }

    #[test]
    fn test_in_memory_session_has_no_assets() {
        let mut session = WorkbookSession::new();
        assert!(session.charts().is_empty());
        assert!(session.images().is_empty());
        assert!(session.macros().is_empty());
    }
}
