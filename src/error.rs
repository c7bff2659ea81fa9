use crate::analysis::EvaluationReport;
use thiserror::Error;

pub type SheetResult<T> = Result<T, SheetError>;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Sheet already exists: {0}")]
    DuplicateSheet(String),

    #[error("Formula evaluation error: {message}")]
    Eval {
        message: String,
        /// Evaluation state recorded up to the failure, including the
        /// per-cell errors.
        report: Box<EvaluationReport>,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetError {
    /// True for the circularity failure class, which callers may opt to
    /// suppress during bulk evaluation. Every other variant is fatal.
    pub fn is_circular(&self) -> bool {
        matches!(self, SheetError::CircularDependency(_))
    }
}
