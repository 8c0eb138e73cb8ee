//! Depth-prediction store adapter.
//!
//! Grid batches arrive as per-cell outcomes; the store turns them into
//! creates, updates and deletes keyed by (time, cell). Zero-depth
//! predictions are never kept.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fc_core::CellId;
use fc_flood::{CellOutcome, CellPrediction, DepthStatistics, RiskPoint};
use tracing::debug;

use crate::types::DepthPrediction;

/// Counts of what one batch changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchDiff {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl std::ops::AddAssign for BatchDiff {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

#[derive(Default)]
struct Tables {
    depths: BTreeMap<(DateTime<Utc>, CellId), DepthPrediction>,
    risk: BTreeMap<DateTime<Utc>, RiskPoint>,
}

/// All writes go through one lock.
#[derive(Default)]
pub struct PredictionStore {
    tables: Mutex<Tables>,
}

impl PredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_predictions(predictions: Vec<DepthPrediction>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.lock();
            for p in predictions {
                tables.depths.insert((p.time, p.cell), p);
            }
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn apply_batch(
        &self,
        time: DateTime<Utc>,
        model_version: &str,
        batch: &[CellPrediction],
    ) -> BatchDiff {
        let mut diff = BatchDiff::default();
        let mut tables = self.lock();
        for prediction in batch {
            let key = (time, prediction.cell);
            match prediction.outcome {
                CellOutcome::Store(statistics) => {
                    let record = DepthPrediction {
                        time,
                        cell: prediction.cell,
                        model_version: model_version.to_string(),
                        statistics,
                    };
                    if tables.depths.insert(key, record).is_some() {
                        diff.updated += 1;
                    } else {
                        diff.created += 1;
                    }
                }
                CellOutcome::Prune => {
                    if tables.depths.remove(&key).is_some() {
                        diff.deleted += 1;
                    }
                }
            }
        }
        debug!(%time, ?diff, "prediction batch applied");
        diff
    }

    /// Remove every prediction at `time`, returning how many were removed.
    pub fn delete_time(&self, time: DateTime<Utc>) -> usize {
        let mut tables = self.lock();
        let before = tables.depths.len();
        tables.depths.retain(|(t, _), _| *t != time);
        before - tables.depths.len()
    }

    pub fn predictions_at(&self, time: DateTime<Utc>) -> Vec<DepthPrediction> {
        self.lock()
            .depths
            .values()
            .filter(|p| p.time == time)
            .cloned()
            .collect()
    }

    /// Predictions at `time` made with `model_version`, as pairs for aggregation.
    pub fn statistics_at(
        &self,
        time: DateTime<Utc>,
        model_version: &str,
    ) -> Vec<(CellId, DepthStatistics)> {
        self.lock()
            .depths
            .values()
            .filter(|p| p.time == time && p.model_version == model_version)
            .map(|p| (p.cell, p.statistics))
            .collect()
    }

    pub fn all(&self) -> Vec<DepthPrediction> {
        self.lock().depths.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace any stored risk value for each point's timestamp.
    pub fn replace_risk(&self, points: &[RiskPoint]) {
        let mut tables = self.lock();
        for point in points {
            tables.risk.insert(point.time, *point);
        }
    }

    pub fn risk(&self) -> Vec<RiskPoint> {
        self.lock().risk.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stats(upper: f64) -> DepthStatistics {
        DepthStatistics {
            lower_centile: 0.0,
            mid_lower_centile: 0.0,
            median: upper / 2.0,
            upper_centile: upper,
        }
    }

    fn store_outcome(i: u32, upper: f64) -> CellPrediction {
        CellPrediction {
            cell: CellId::from_index(i),
            outcome: CellOutcome::Store(stats(upper)),
        }
    }

    fn prune(i: u32) -> CellPrediction {
        CellPrediction {
            cell: CellId::from_index(i),
            outcome: CellOutcome::Prune,
        }
    }

    #[test]
    fn batches_create_update_and_delete() {
        let store = PredictionStore::new();
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let diff = store.apply_batch(t, "v1", &[store_outcome(0, 1.0), store_outcome(1, 2.0), prune(2)]);
        assert_eq!(
            diff,
            BatchDiff {
                created: 2,
                updated: 0,
                deleted: 0
            }
        );

        let second = store.apply_batch(t, "v2", &[store_outcome(0, 3.0), prune(1)]);
        assert_eq!(
            second,
            BatchDiff {
                created: 0,
                updated: 1,
                deleted: 1
            }
        );

        let mut total = diff;
        total += second;
        assert_eq!(
            total,
            BatchDiff {
                created: 2,
                updated: 1,
                deleted: 1
            }
        );

        let at = store.predictions_at(t);
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].model_version, "v2");
        assert_eq!(at[0].statistics.upper_centile, 3.0);
    }

    #[test]
    fn delete_time_leaves_other_times() {
        let store = PredictionStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        store.apply_batch(t0, "v1", &[store_outcome(0, 1.0), store_outcome(1, 1.0)]);
        store.apply_batch(t1, "v1", &[store_outcome(0, 1.0)]);

        assert_eq!(store.delete_time(t0), 2);
        assert_eq!(store.len(), 1);
        assert!(store.predictions_at(t0).is_empty());
    }

    #[test]
    fn risk_is_replaced_per_time() {
        let store = PredictionStore::new();
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let point = |risk| RiskPoint {
            time: t,
            flooded_cells: 10,
            risk,
        };
        store.replace_risk(&[point(0.2)]);
        store.replace_risk(&[point(0.7)]);
        let risk = store.risk();
        assert_eq!(risk.len(), 1);
        assert_eq!(risk[0].risk, 0.7);
    }

    #[test]
    fn statistics_filter_by_model_version() {
        let store = PredictionStore::new();
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        store.apply_batch(t, "v1", &[store_outcome(0, 1.0)]);
        store.apply_batch(t, "v2", &[store_outcome(1, 1.0)]);
        assert_eq!(store.statistics_at(t, "v2").len(), 1);
    }
}
