//! Flood-depth prediction over a grid of cells.
//!
//! Each cell carries regression coefficients that map ensemble river flow
//! to a depth distribution. Predictions are summarised as centiles,
//! aggregated into coarser square bins for display, and counted into a
//! percentage flood risk per forecast timestamp.

pub mod aggregation;
pub mod cell;
pub mod error;
pub mod grid;
pub mod model;
pub mod regression;
pub mod risk;

pub use aggregation::{AggregatedDepth, DEFAULT_LEVELS, aggregate, aggregate_levels};
pub use cell::{BoundingBox, ChannelMask, FloodCellParameters};
pub use error::{FloodError, FloodResult};
pub use grid::{CellOutcome, CellPrediction, GridOptions, GridRun, predict_grid};
pub use model::{FloodModel, ModelRegistry};
pub use regression::{DepthStatistics, EnsembleFlows, RegressionForm, percentile, predict_depth};
pub use risk::{RiskPoint, RiskThresholds, risk_series};
