//! Multi-resolution aggregation of stored cell predictions.
//!
//! The extent of all contributing cells is tiled from its min corner with
//! square bins of side min(width, height) / level. A cell contributes to a
//! bin when its footprint lies inside the bin, edges included, and the bin
//! carries the mean of each statistic over its contributors.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cell::BoundingBox;
use crate::error::{FloodError, FloodResult};
use crate::regression::DepthStatistics;

pub const DEFAULT_LEVELS: [u32; 4] = [32, 64, 128, 256];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDepth {
    pub bounding_box: BoundingBox,
    pub level: u32,
    pub contributors: usize,
    pub statistics: DepthStatistics,
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    sums: [f64; 4],
}

impl Accumulator {
    fn add(&mut self, stats: &DepthStatistics) {
        self.count += 1;
        for (sum, v) in self.sums.iter_mut().zip(stats.values()) {
            *sum += v;
        }
    }

    fn mean(&self) -> DepthStatistics {
        let n = self.count as f64;
        DepthStatistics {
            lower_centile: self.sums[0] / n,
            mid_lower_centile: self.sums[1] / n,
            median: self.sums[2] / n,
            upper_centile: self.sums[3] / n,
        }
    }
}

/// Bin edges from `start`, stepping by `block` while below `end`.
fn edges(start: f64, end: f64, block: f64) -> Vec<f64> {
    let mut out = Vec::new();
    let mut v = start;
    while v < end {
        out.push(v);
        v += block;
    }
    out
}

/// Candidate bins whose span [e, e + block] can contain [lo, hi].
fn containing(edges: &[f64], block: f64, lo: f64, hi: f64) -> impl Iterator<Item = usize> + '_ {
    let last_start = edges.partition_point(|&e| e <= lo);
    let first = last_start.saturating_sub(2);
    (first..last_start).filter(move |&i| edges[i] <= lo && hi <= edges[i] + block)
}

/// Aggregate `predictions` at one level.
pub fn aggregate(
    predictions: &[(BoundingBox, DepthStatistics)],
    level: u32,
) -> FloodResult<Vec<AggregatedDepth>> {
    if level == 0 {
        return Err(FloodError::invalid("aggregation level must be at least 1"));
    }
    let Some(extent) = predictions
        .iter()
        .map(|(b, _)| *b)
        .reduce(|acc, b| acc.union(&b))
    else {
        return Err(FloodError::invalid("no predictions to aggregate"));
    };

    let block = extent.width().min(extent.height()) / level as f64;
    if !(block.is_finite() && block > 0.0) {
        return Err(FloodError::invalid(format!(
            "degenerate extent {extent:?} for aggregation level {level}"
        )));
    }

    let xs = edges(extent.min_x, extent.max_x, block);
    let ys = edges(extent.min_y, extent.max_y, block);

    let mut bins: BTreeMap<(usize, usize), Accumulator> = BTreeMap::new();
    for (bbox, stats) in predictions {
        for row in containing(&ys, block, bbox.min_y, bbox.max_y) {
            for col in containing(&xs, block, bbox.min_x, bbox.max_x) {
                bins.entry((row, col)).or_default().add(stats);
            }
        }
    }

    debug!(level, block, bins = bins.len(), "aggregated level");

    Ok(bins
        .into_iter()
        .map(|((row, col), acc)| AggregatedDepth {
            bounding_box: BoundingBox::new(xs[col], ys[row], xs[col] + block, ys[row] + block),
            level,
            contributors: acc.count,
            statistics: acc.mean(),
        })
        .collect())
}

/// Aggregate every level in parallel, returned in the order given.
pub fn aggregate_levels(
    predictions: &[(BoundingBox, DepthStatistics)],
    levels: &[u32],
) -> FloodResult<Vec<AggregatedDepth>> {
    let per_level = levels
        .par_iter()
        .map(|&level| aggregate(predictions, level))
        .collect::<FloodResult<Vec<_>>>()?;
    let out: Vec<_> = per_level.into_iter().flatten().collect();
    info!(levels = levels.len(), bins = out.len(), "aggregation complete");
    Ok(out)
}
