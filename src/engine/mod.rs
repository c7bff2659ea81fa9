//! Formula evaluation: custom function registry and the calculation
//! engine adapter.

pub mod calc;
pub mod registry;

pub use calc::{evaluate_workbook, EngineError};
pub use registry::{CustomFn, FormulaRegistry};
