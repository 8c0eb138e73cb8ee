//! fc-results: run cache, record storage and the depth-prediction store.

pub mod hash;
pub mod predictions;
pub mod store;
pub mod types;

pub use hash::{RunInputs, compute_run_id};
pub use predictions::{BatchDiff, PredictionStore};
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Project error: {0}")]
    Project(#[from] fc_project::ProjectError),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },
}
