//! Sheetlens - workbook analysis engine
//!
//! This library opens spreadsheet workbooks, builds a dependency graph over
//! their formulas, detects circular references, evaluates formulas in
//! dependency order, and discovers embedded assets (charts, images, macro
//! modules) from the workbook's zip package.
//!
//! # Features
//!
//! - Formula dependency graph with deterministic construction
//! - Circular reference detection with full cycle paths
//! - Evaluation via an Excel-compatible calculation engine
//! - User-registered custom formulas and localized function names
//! - Chart, image, and macro discovery through XML relationship resolution
//! - CSV import/export of individual sheets
//!
//! # Example
//!
//! ```no_run
//! use sheetlens::analysis::EvaluateOptions;
//! use sheetlens::session::WorkbookSession;
//!
//! let mut session = WorkbookSession::open("model.xlsx")?;
//!
//! let report = session.evaluate_all(&EvaluateOptions::default())?;
//! println!("Evaluated {} formulas", report.evaluated.len());
//!
//! for cycle in session.find_circular_references() {
//!     println!("Cycle: {}", cycle.path.join(" -> "));
//! }
//! # Ok::<(), sheetlens::error::SheetError>(())
//! ```

pub mod addr;
pub mod analysis;
pub mod assets;
pub mod cli;
pub mod engine;
pub mod error;
pub mod model;
pub mod session;

// Re-export commonly used types
pub use analysis::{CellEvaluation, CircularReference, EvaluateOptions, EvaluationReport, FormulaSummary};
pub use assets::{ChartInfo, ImageInfo, MacroModule};
pub use engine::{CustomFn, FormulaRegistry};
pub use error::{SheetError, SheetResult};
pub use model::{Cell, CellValue, Sheet, Workbook};
pub use session::WorkbookSession;
