//! Percentage flood risk from the number of flooded cells.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FloodError, FloodResult};
use crate::regression::DepthStatistics;

pub const CHANNEL_CELL_COUNT: u64 = 93_794;
pub const LARGE_FLOOD_COUNT: u64 = 1_440_811;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Wet cells expected from the river channel alone
    pub channel_cell_count: u64,
    /// Wet cells at which risk saturates
    pub large_flood_count: u64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            channel_cell_count: CHANNEL_CELL_COUNT,
            large_flood_count: LARGE_FLOOD_COUNT,
        }
    }
}

impl RiskThresholds {
    pub fn new(channel_cell_count: u64, large_flood_count: u64) -> FloodResult<Self> {
        if large_flood_count <= channel_cell_count {
            return Err(FloodError::invalid(format!(
                "large flood count {large_flood_count} must exceed channel cell count {channel_cell_count}"
            )));
        }
        Ok(Self {
            channel_cell_count,
            large_flood_count,
        })
    }

    /// 0 below the channel count, 1 above the large-flood count, linear between.
    pub fn classify(&self, count: u64) -> f64 {
        if count < self.channel_cell_count {
            0.0
        } else if count > self.large_flood_count {
            1.0
        } else {
            (count - self.channel_cell_count) as f64
                / (self.large_flood_count - self.channel_cell_count) as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPoint {
    pub time: DateTime<Utc>,
    /// Cells with a positive median depth
    pub flooded_cells: u64,
    pub risk: f64,
}

/// One risk point per timestamp, in time order.
pub fn risk_series(
    predictions: &[(DateTime<Utc>, DepthStatistics)],
    thresholds: &RiskThresholds,
) -> Vec<RiskPoint> {
    let mut counts: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
    for (time, stats) in predictions {
        let count = counts.entry(*time).or_default();
        if stats.median > 0.0 {
            *count += 1;
        }
    }

    let series: Vec<RiskPoint> = counts
        .into_iter()
        .map(|(time, flooded_cells)| RiskPoint {
            time,
            flooded_cells,
            risk: thresholds.classify(flooded_cells),
        })
        .collect();
    info!(points = series.len(), "flood risk computed");
    series
}
