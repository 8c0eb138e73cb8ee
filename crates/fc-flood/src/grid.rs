//! Batched depth prediction over every cell of a flood model.

use fc_core::CellId;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cell::ChannelMask;
use crate::error::{FloodError, FloodResult};
use crate::model::FloodModel;
use crate::regression::{DepthStatistics, EnsembleFlows, predict_depth};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridOptions {
    pub batch_size: usize,
    /// Batches before this index were committed by an earlier attempt.
    pub resume_from_batch: usize,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            resume_from_batch: 0,
        }
    }
}

/// What the store should do with a cell's prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellOutcome {
    /// Create or update the stored prediction.
    Store(DepthStatistics),
    /// Upper centile is not positive; remove any stored prediction.
    Prune,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellPrediction {
    pub cell: CellId,
    pub outcome: CellOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridRun {
    /// No ensemble flow reaches any cell's threshold; nothing was evaluated.
    NoFlood,
    Completed {
        batches: usize,
        stored: usize,
        pruned: usize,
        masked: usize,
    },
}

/// Predict every unmasked cell, handing each finished batch to `commit`
/// before the next one starts.
pub fn predict_grid<F>(
    flows: &EnsembleFlows,
    model: &FloodModel,
    mask: &ChannelMask,
    options: &GridOptions,
    mut commit: F,
) -> FloodResult<GridRun>
where
    F: FnMut(usize, &[CellPrediction]) -> FloodResult<()>,
{
    if options.batch_size == 0 {
        return Err(FloodError::invalid("batch size must be at least 1"));
    }

    let max_flow = flows.max();
    if let Some(threshold) = model.common_min_q()
        && max_flow < threshold
    {
        warn!(
            version = model.version(),
            max_flow, threshold, "flow below every cell threshold, no flood"
        );
        return Ok(GridRun::NoFlood);
    }

    let form = model.form();
    let cells = model.cells();
    let batches = cells.len().div_ceil(options.batch_size);
    info!(
        version = model.version(),
        cells = cells.len(),
        batches,
        resume_from = options.resume_from_batch,
        "predicting flood depths"
    );

    let mut stored = 0;
    let mut pruned = 0;
    let mut masked = 0;

    for (index, batch) in cells
        .chunks(options.batch_size)
        .enumerate()
        .skip(options.resume_from_batch)
    {
        let predictions = batch
            .par_iter()
            .filter(|cell| !mask.masks(cell))
            .map(|cell| {
                let stats = predict_depth(flows, cell, form)?;
                let outcome = if stats.upper_centile > 0.0 {
                    CellOutcome::Store(stats)
                } else {
                    CellOutcome::Prune
                };
                Ok(CellPrediction {
                    cell: cell.id,
                    outcome,
                })
            })
            .collect::<FloodResult<Vec<_>>>()?;

        let batch_stored = predictions
            .iter()
            .filter(|p| matches!(p.outcome, CellOutcome::Store(_)))
            .count();
        masked += batch.len() - predictions.len();
        stored += batch_stored;
        pruned += predictions.len() - batch_stored;

        commit(index, &predictions)?;
        debug!(batch = index, stored = batch_stored, "batch committed");
    }

    // A resumed run cannot see what earlier attempts stored
    if options.resume_from_batch == 0 && stored == 0 {
        return Err(FloodError::NoPredictions { cells: cells.len() });
    }

    info!(stored, pruned, masked, "flood depths predicted");
    Ok(GridRun::Completed {
        batches,
        stored,
        pruned,
        masked,
    })
}
