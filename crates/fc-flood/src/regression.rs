//! Per-cell regression from ensemble flow to depth centiles.

use serde::{Deserialize, Serialize};

use crate::cell::FloodCellParameters;
use crate::error::{FloodError, FloodResult};

/// Flow [m³/s] for every ensemble member at one forecast time.
///
/// Each member carries one value per inflow point; a single gauge gives
/// one inflow.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleFlows {
    values: Vec<f64>,
    inflows: usize,
}

impl EnsembleFlows {
    /// One gauge, one value per member.
    pub fn single(values: Vec<f64>) -> FloodResult<Self> {
        Self::new(values, 1)
    }

    /// Member-major `values` with `inflows` values per member.
    pub fn new(values: Vec<f64>, inflows: usize) -> FloodResult<Self> {
        if inflows == 0 {
            return Err(FloodError::invalid("ensemble needs at least one inflow"));
        }
        if values.is_empty() {
            return Err(FloodError::invalid("ensemble has no members"));
        }
        if values.len() % inflows != 0 {
            return Err(FloodError::invalid(format!(
                "{} flow values do not divide into {inflows} inflows",
                values.len()
            )));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(FloodError::invalid(format!("flow value {v} is not finite")));
        }
        Ok(Self { values, inflows })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> FloodResult<Self> {
        let inflows = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|r| r.len() != inflows) {
            return Err(FloodError::invalid(format!(
                "member has {} inflows, expected {inflows}",
                row.len()
            )));
        }
        Self::new(rows.into_iter().flatten().collect(), inflows)
    }

    pub fn members(&self) -> usize {
        self.values.len() / self.inflows
    }

    pub fn inflows(&self) -> usize {
        self.inflows
    }

    pub fn member(&self, index: usize) -> &[f64] {
        &self.values[index * self.inflows..(index + 1) * self.inflows]
    }

    pub fn iter_members(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.inflows)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// How a cell's coefficients combine flow into depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionForm {
    /// depth = Σ beta_j q^j, applied to every flow value
    #[default]
    Polynomial,
    /// depth = beta0 + Σ beta_{j+1} q_j over a member's inflows
    ///
    /// A single inflow evaluates as beta0 + q + beta1.
    InflowWeighted,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepthStatistics {
    /// 10th percentile
    pub lower_centile: f64,
    /// 30th percentile
    pub mid_lower_centile: f64,
    pub median: f64,
    /// 90th percentile
    pub upper_centile: f64,
}

impl DepthStatistics {
    pub fn from_depths(depths: &[f64]) -> FloodResult<Self> {
        if depths.is_empty() {
            return Err(FloodError::invalid("no depths to summarise"));
        }
        let mut sorted = depths.to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(Self {
            lower_centile: sorted_percentile(&sorted, 10.0),
            mid_lower_centile: sorted_percentile(&sorted, 30.0),
            median: sorted_percentile(&sorted, 50.0),
            upper_centile: sorted_percentile(&sorted, 90.0),
        })
    }

    pub fn values(&self) -> [f64; 4] {
        [
            self.lower_centile,
            self.mid_lower_centile,
            self.median,
            self.upper_centile,
        ]
    }
}

/// Percentile `p` (0..=100) with linear interpolation between the closest
/// ranks, rank = p/100 (n - 1).
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(sorted_percentile(&sorted, p))
}

fn sorted_percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Depth for every flow sample of the ensemble, clamped at zero.
pub fn member_depths(
    flows: &EnsembleFlows,
    cell: &FloodCellParameters,
    form: RegressionForm,
) -> FloodResult<Vec<f64>> {
    let below_threshold = |q: f64| cell.min_q.is_some_and(|min_q| q < min_q);

    let raw: Vec<(f64, bool)> = match form {
        RegressionForm::Polynomial => flows
            .values()
            .iter()
            .map(|&q| (horner(&cell.betas, q), below_threshold(q)))
            .collect(),
        RegressionForm::InflowWeighted => {
            let needed = flows.inflows() + 1;
            if cell.betas.len() < needed {
                return Err(FloodError::InvalidCell {
                    cell: cell.id,
                    what: format!(
                        "{} coefficients for {} inflows, need {needed}",
                        cell.betas.len(),
                        flows.inflows()
                    ),
                });
            }
            flows
                .iter_members()
                .map(|inflows| {
                    let depth = inflow_weighted(&cell.betas, inflows);
                    let gated = inflows.iter().all(|&q| below_threshold(q));
                    (depth, gated)
                })
                .collect()
        }
    };

    raw.into_iter()
        .map(|(depth, gated)| {
            if !depth.is_finite() {
                Err(FloodError::NonFinite {
                    cell: cell.id,
                    value: depth,
                })
            } else if gated || depth < 0.0 {
                Ok(0.0)
            } else {
                Ok(depth)
            }
        })
        .collect()
}

/// Depth centiles for one cell.
pub fn predict_depth(
    flows: &EnsembleFlows,
    cell: &FloodCellParameters,
    form: RegressionForm,
) -> FloodResult<DepthStatistics> {
    DepthStatistics::from_depths(&member_depths(flows, cell, form)?)
}

fn horner(betas: &[f64], q: f64) -> f64 {
    betas.iter().rev().fold(0.0, |acc, &b| acc * q + b)
}

fn inflow_weighted(betas: &[f64], inflows: &[f64]) -> f64 {
    if let [q] = inflows {
        return betas[0] + q + betas[1];
    }
    inflows
        .iter()
        .zip(&betas[1..])
        .fold(betas[0], |acc, (q, b)| acc + q * b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::CellId;

    fn cell(betas: Vec<f64>, min_q: Option<f64>) -> FloodCellParameters {
        FloodCellParameters {
            id: CellId::from_index(7),
            x: 0.0,
            y: 0.0,
            size: 1.0,
            betas,
            min_q,
        }
    }

    fn assert_stats(stats: DepthStatistics, expected: [f64; 4]) {
        for (got, want) in stats.values().iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{stats:?} != {expected:?}");
        }
    }

    #[test]
    fn inflow_weighted_matrix() {
        let flows =
            EnsembleFlows::from_rows(vec![vec![4.0, 5.0], vec![6.0, 7.0], vec![8.0, 9.0]]).unwrap();
        let stats = predict_depth(
            &flows,
            &cell(vec![1.0, 2.0, 3.0], None),
            RegressionForm::InflowWeighted,
        )
        .unwrap();
        assert_stats(stats, [26.0, 30.0, 34.0, 42.0]);
    }

    #[test]
    fn inflow_weighted_single_gauge() {
        let flows = EnsembleFlows::single(vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        let stats = predict_depth(
            &flows,
            &cell(vec![1.0, 2.0, 3.0], None),
            RegressionForm::InflowWeighted,
        )
        .unwrap();
        assert_stats(stats, [16.0, 22.0, 28.0, 40.0]);
    }

    #[test]
    fn polynomial_uses_every_coefficient() {
        let flows = EnsembleFlows::single(vec![2.0]).unwrap();
        let depths = member_depths(
            &flows,
            &cell(vec![1.0, -1.0, 0.5, 0.25], None),
            RegressionForm::Polynomial,
        )
        .unwrap();
        // 1 - 2 + 2 + 2
        assert_eq!(depths, vec![3.0]);
    }

    #[test]
    fn negative_depth_clamps_to_zero() {
        let flows = EnsembleFlows::single(vec![1.0, 5.0]).unwrap();
        let depths = member_depths(
            &flows,
            &cell(vec![-3.0, 1.0], None),
            RegressionForm::Polynomial,
        )
        .unwrap();
        assert_eq!(depths, vec![0.0, 2.0]);
    }

    #[test]
    fn flow_below_threshold_floods_nothing() {
        let flows = EnsembleFlows::single(vec![5.0, 15.0, 25.0]).unwrap();
        let depths = member_depths(
            &flows,
            &cell(vec![0.0, 1.0], Some(10.0)),
            RegressionForm::Polynomial,
        )
        .unwrap();
        assert_eq!(depths, vec![0.0, 15.0, 25.0]);
    }

    #[test]
    fn overflowing_polynomial_is_an_error() {
        let flows = EnsembleFlows::single(vec![1e300]).unwrap();
        let err = predict_depth(
            &flows,
            &cell(vec![0.0, 0.0, 1e10], None),
            RegressionForm::Polynomial,
        )
        .unwrap_err();
        assert!(matches!(err, FloodError::NonFinite { .. }));
    }

    #[test]
    fn too_few_coefficients_for_inflows() {
        let flows = EnsembleFlows::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        let err = predict_depth(&flows, &cell(vec![1.0, 2.0], None), RegressionForm::InflowWeighted)
            .unwrap_err();
        assert!(matches!(err, FloodError::InvalidCell { .. }));
    }

    #[test]
    fn percentile_interpolates() {
        let v = [40.0, 10.0, 30.0, 20.0];
        assert_eq!(percentile(&v, 0.0), Some(10.0));
        assert_eq!(percentile(&v, 100.0), Some(40.0));
        assert_eq!(percentile(&v, 50.0), Some(25.0));
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&v, 101.0), None);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(EnsembleFlows::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
