use fc_core::{CellId, FcError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FloodError {
    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Invalid parameters for cell {cell}: {what}")]
    InvalidCell { cell: CellId, what: String },

    #[error("Regression for cell {cell} produced a non-finite depth: {value}")]
    NonFinite { cell: CellId, value: f64 },

    #[error("Regression ran over {cells} cells but produced no predictions")]
    NoPredictions { cells: usize },

    #[error("Batch {batch} commit failed: {what}")]
    Commit { batch: usize, what: String },

    #[error("Core error: {0}")]
    Core(#[from] FcError),
}

pub type FloodResult<T> = Result<T, FloodError>;

impl FloodError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        FloodError::InvalidInput { what: what.into() }
    }
}
