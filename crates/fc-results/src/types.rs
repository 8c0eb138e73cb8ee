//! Result data types.

use chrono::{DateTime, Utc};
use fc_core::CellId;
use fc_flood::{AggregatedDepth, DepthStatistics};
use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub catchment_id: String,
    /// RFC 3339 creation time
    pub timestamp: String,
    /// Time of the first forecast step
    pub start: DateTime<Utc>,
    pub run_type: RunType,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunType {
    RiverFlow {
        steps: usize,
        members: usize,
        dt_days: f64,
    },
    Flood {
        /// River-flow run the depths were predicted from
        source_run: RunId,
        timestamps: usize,
        failed: usize,
    },
}

/// Flow of one ensemble member at one lead step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FlowRecord {
    pub lead: usize,
    pub member: usize,
    pub time: DateTime<Utc>,
    pub flow_m3s: f64,
    /// Rainfall at this step [mm/day]
    pub rainfall: f64,
    /// Reference evapotranspiration at this step [mm/day]
    pub pet: f64,
}

/// Stored depth prediction for one cell at one time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepthPrediction {
    pub time: DateTime<Utc>,
    pub cell: CellId,
    pub model_version: String,
    pub statistics: DepthStatistics,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AggregatedRecord {
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub depth: AggregatedDepth,
}
