//! Error types for the fc-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the backend crates' errors for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Project(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config validation failed: {0}")]
    Validation(String),

    #[error("River flow model error: {0}")]
    Hydro(String),

    #[error("Flood model error: {0}")]
    Flood(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Benchmark error: {0}")]
    Benchmark(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fc-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<fc_project::ProjectError> for AppError {
    fn from(err: fc_project::ProjectError) -> Self {
        match err {
            fc_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<fc_hydro::HydroError> for AppError {
    fn from(err: fc_hydro::HydroError) -> Self {
        AppError::Hydro(err.to_string())
    }
}

impl From<fc_flood::FloodError> for AppError {
    fn from(err: fc_flood::FloodError) -> Self {
        AppError::Flood(err.to_string())
    }
}

impl From<fc_results::ResultsError> for AppError {
    fn from(err: fc_results::ResultsError) -> Self {
        match err {
            fc_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
