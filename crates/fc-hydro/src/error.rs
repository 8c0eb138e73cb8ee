//! Error types for rainfall-runoff operations.

use fc_core::FcError;
use thiserror::Error;

/// Errors raised while preparing forcing or running the catchment model.
#[derive(Error, Debug)]
pub enum HydroError {
    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter row {row}: {what}")]
    InvalidParameters { row: usize, what: String },

    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Core error: {0}")]
    Core(#[from] FcError),
}

pub type HydroResult<T> = Result<T, HydroError>;

impl HydroError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        HydroError::InvalidInput { what: what.into() }
    }

    /// Attach a parameter row index to a lower-level validation failure.
    pub(crate) fn for_row(self, row: usize) -> Self {
        match self {
            HydroError::InvalidParameters { what, .. } => HydroError::InvalidParameters { row, what },
            other => HydroError::InvalidParameters {
                row,
                what: other.to_string(),
            },
        }
    }
}

impl From<HydroError> for FcError {
    fn from(e: HydroError) -> Self {
        match e {
            HydroError::InvalidInput { .. } => FcError::InvalidArg { what: "input" },
            HydroError::LengthMismatch {
                what,
                expected,
                actual,
            } => FcError::LengthMismatch {
                what,
                expected,
                actual,
            },
            HydroError::InvalidParameters { .. } => FcError::InvalidArg { what: "parameters" },
            HydroError::NonFinite { what, value } => FcError::NonFinite { what, value },
            HydroError::Core(inner) => inner,
        }
    }
}
