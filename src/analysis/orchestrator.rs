//! Evaluation orchestration and reporting.
//!
//! Wraps the calculation engine adapter with circularity policy: bulk
//! evaluation is strict by default and permissive on request, per-cell
//! evaluation never fails. Evaluation mutates cell values in place; callers
//! observing a "read-like" summary after evaluating will see updated cells.

use crate::analysis::cycles::{self, CircularReference};
use crate::analysis::graph::FormulaGraph;
use crate::engine::{self, EngineError, FormulaRegistry};
use crate::error::{SheetError, SheetResult};
use crate::model::{CellValue, Workbook};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateOptions {
    /// Return a partial report instead of failing when the workbook has
    /// circular references.
    pub ignore_circular: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalFailure {
    pub address: String,
    pub message: String,
}

/// Outcome of a whole-workbook evaluation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    /// Every formula node present at call time.
    pub evaluated: Vec<String>,
    pub circular: Vec<CircularReference>,
    pub errors: Vec<EvalFailure>,
}

/// Per-cell evaluation result. Never an `Err`: failures are carried in
/// `error` alongside the last-known value.
#[derive(Debug, Clone, Serialize)]
pub struct CellEvaluation {
    pub address: String,
    pub value: CellValue,
    pub type_tag: String,
    pub formula: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormulaSummary {
    pub total_formulas: usize,
    pub sheets_with_formulas: usize,
    pub circular_references: usize,
    pub last_evaluated: Option<DateTime<Utc>>,
    pub custom_formulas: Vec<String>,
}

/// Evaluate every formula in the workbook, writing results into the cells.
///
/// Circular references fail the call unless `options.ignore_circular` is
/// set, in which case the report carries the detected cycles and no cell is
/// modified. Any other engine failure is fatal; the report with the
/// recorded failure travels inside the returned [`SheetError::Eval`]. On
/// success the dependency graph is re-checked for cycles rather than
/// trusting the engine's ordering alone.
pub fn evaluate_all(
    workbook: &mut Workbook,
    registry: &FormulaRegistry,
    options: &EvaluateOptions,
) -> SheetResult<EvaluationReport> {
    let mut report = EvaluationReport::default();

    match engine::evaluate_workbook(workbook, registry) {
        Ok(()) => {}
        Err(EngineError::Circular(message)) => {
            let graph = FormulaGraph::build(workbook);
            report.evaluated = graph.formula_nodes().to_vec();
            report.circular = cycles::find_cycles(&graph);
            if !options.ignore_circular {
                return Err(SheetError::CircularDependency(message));
            }
            debug!(cycles = report.circular.len(), "circular references ignored");
            return Ok(report);
        }
        Err(EngineError::Formula { address, message }) => {
            let graph = FormulaGraph::build(workbook);
            report.evaluated = graph.formula_nodes().to_vec();
            report.errors.push(EvalFailure {
                address: address.clone(),
                message: message.clone(),
            });
            warn!(%address, "formula evaluation failed");
            return Err(SheetError::Eval {
                message: format!("{}: {}", address, message),
                report: Box::new(report),
            });
        }
    }

    let graph = FormulaGraph::build(workbook);
    report.evaluated = graph.formula_nodes().to_vec();
    // The engine's ordering already failed on cycles, but the detector is
    // the source of truth for the report.
    report.circular = cycles::find_cycles(&graph);
    Ok(report)
}

/// Evaluate the workbook and read back one cell.
///
/// Evaluation is workbook-global (formulas may depend on other formulas),
/// so this re-runs [`evaluate_all`] with circular suppression. A cell on a
/// cycle gets an explicit error annotation; any failure yields the
/// last-known value with the error message attached.
pub fn evaluate_cell(
    workbook: &mut Workbook,
    registry: &FormulaRegistry,
    node: &str,
) -> CellEvaluation {
    let previous = workbook
        .cell_at_node(node)
        .map(|c| (c.value.clone(), c.formula.clone()))
        .unwrap_or((CellValue::Empty, None));

    let options = EvaluateOptions {
        ignore_circular: true,
    };
    match evaluate_all(workbook, registry, &options) {
        Ok(report) => {
            let (value, formula) = workbook
                .cell_at_node(node)
                .map(|c| (c.value.clone(), c.formula.clone()))
                .unwrap_or((CellValue::Empty, None));
            let error = report
                .circular
                .iter()
                .any(|cycle| cycle.involves(node))
                .then(|| "circular reference detected".to_string());
            CellEvaluation {
                address: node.to_string(),
                type_tag: value.type_tag().to_string(),
                value,
                formula,
                error,
            }
        }
        Err(err) => CellEvaluation {
            address: node.to_string(),
            type_tag: previous.0.type_tag().to_string(),
            value: previous.0,
            formula: previous.1,
            error: Some(err.to_string()),
        },
    }
}

/// Aggregate formula statistics from the workbook's current state.
pub fn formula_summary(
    workbook: &Workbook,
    registry: &FormulaRegistry,
    last_evaluated: Option<DateTime<Utc>>,
) -> FormulaSummary {
    let graph = FormulaGraph::build(workbook);
    let sheets_with_formulas = workbook
        .sheets()
        .iter()
        .filter(|s| s.formula_count() > 0)
        .count();
    FormulaSummary {
        total_formulas: graph.formula_nodes().len(),
        sheets_with_formulas,
        circular_references: cycles::find_cycles(&graph).len(),
        last_evaluated,
        custom_formulas: registry.names(),
    }
}
