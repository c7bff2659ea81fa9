//! Workbook analysis: reference extraction, dependency graph, cycle
//! detection, and evaluation orchestration.

pub mod cycles;
pub mod graph;
pub mod orchestrator;
pub mod resolver;

pub use cycles::{find_cycles, CircularReference};
pub use graph::FormulaGraph;
pub use orchestrator::{
    evaluate_all, evaluate_cell, formula_summary, CellEvaluation, EvalFailure, EvaluateOptions,
    EvaluationReport, FormulaSummary,
};
pub use resolver::{extract_references, scan_references, RefSpan};
