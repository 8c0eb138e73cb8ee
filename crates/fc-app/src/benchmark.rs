//! Comparison of a river-flow run against stored benchmark tables.
//!
//! A benchmark directory holds four headerless tables: `Q_Benchmark.csv`
//! (steps × members flow), `qp_Benchmark.csv` (rainfall per step),
//! `Eq_Benchmark.csv` (evapotranspiration per step) and `F0_Benchmark.csv`
//! (members × 3 next state). Every value must agree within a relative
//! tolerance.

use std::path::Path;

use fc_hydro::{RiverFlowForecast, StoreState};
use fc_results::FlowRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

pub const DEFAULT_TOLERANCE: f64 = 1e-4;

pub const FLOW_FILE: &str = "Q_Benchmark.csv";
pub const RAINFALL_FILE: &str = "qp_Benchmark.csv";
pub const EVAPOTRANSPIRATION_FILE: &str = "Eq_Benchmark.csv";
pub const STATE_FILE: &str = "F0_Benchmark.csv";

/// Tables of one river-flow run in benchmark layout.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkData {
    pub flows: Vec<Vec<f64>>,
    pub rainfall: Vec<f64>,
    pub pet: Vec<f64>,
    pub next_state: Vec<[f64; 3]>,
}

impl BenchmarkData {
    pub fn from_forecast(forecast: &RiverFlowForecast) -> Self {
        let flows = &forecast.flows;
        Self {
            flows: (0..flows.steps())
                .map(|step| flows.step_values(step))
                .collect(),
            rainfall: forecast.rainfall.clone(),
            pet: forecast.pet.clone(),
            next_state: state_rows(&forecast.next_state),
        }
    }

    /// Rebuild from stored flow records (lead-major) and the next state.
    pub fn from_records(records: &[FlowRecord], next_state: &[StoreState]) -> AppResult<Self> {
        let steps = records.iter().map(|r| r.lead + 1).max().unwrap_or(0);
        let members = records.iter().map(|r| r.member + 1).max().unwrap_or(0);
        if records.len() != steps * members {
            return Err(AppError::Benchmark(format!(
                "{} records do not fill a {steps} x {members} flow matrix",
                records.len()
            )));
        }

        let mut flows = vec![vec![f64::NAN; members]; steps];
        let mut rainfall = vec![f64::NAN; steps];
        let mut pet = vec![f64::NAN; steps];
        for r in records {
            flows[r.lead][r.member] = r.flow_m3s;
            rainfall[r.lead] = r.rainfall;
            pet[r.lead] = r.pet;
        }

        Ok(Self {
            flows,
            rainfall,
            pet,
            next_state: state_rows(next_state),
        })
    }
}

fn state_rows(state: &[StoreState]) -> Vec<[f64; 3]> {
    state
        .iter()
        .map(|s| [s.storage, s.slow_flow, s.fast_flow])
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkCheck {
    pub name: String,
    pub values: usize,
    pub max_relative_error: f64,
    pub passed: bool,
    /// Shape mismatch or other reason the check could not compare values
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub tolerance: f64,
    pub checks: Vec<BenchmarkCheck>,
}

impl BenchmarkReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

fn compare(name: &str, actual: &[Vec<f64>], expected: &[Vec<f64>], tolerance: f64) -> BenchmarkCheck {
    let shape = |t: &[Vec<f64>]| t.iter().map(Vec::len).collect::<Vec<_>>();
    if shape(actual) != shape(expected) {
        return BenchmarkCheck {
            name: name.to_string(),
            values: 0,
            max_relative_error: f64::INFINITY,
            passed: false,
            message: Some(format!(
                "shape mismatch: {} rows against {} expected",
                actual.len(),
                expected.len()
            )),
        };
    }

    let errors: Vec<f64> = actual
        .iter()
        .flatten()
        .zip(expected.iter().flatten())
        .map(|(a, e)| fc_core::relative_error(*a, *e))
        .collect();
    // NaN fails the check rather than vanishing in the max
    let max_relative_error = errors
        .iter()
        .copied()
        .fold(0.0_f64, |acc, e| {
            if acc.is_nan() || e.is_nan() {
                f64::NAN
            } else {
                acc.max(e)
            }
        });
    let passed = max_relative_error <= tolerance;
    if !passed {
        warn!(check = name, max_relative_error, tolerance, "benchmark check failed");
    }

    BenchmarkCheck {
        name: name.to_string(),
        values: errors.len(),
        max_relative_error,
        passed,
        message: None,
    }
}

fn column(values: &[f64]) -> Vec<Vec<f64>> {
    values.iter().map(|v| vec![*v]).collect()
}

fn read_table(dir: &Path, file: &str) -> AppResult<Vec<Vec<f64>>> {
    Ok(fc_project::tables::read_numeric_table(&dir.join(file))?)
}

/// Compare `data` against the tables in `dir`.
pub fn compare_with_benchmark(
    data: &BenchmarkData,
    dir: &Path,
    tolerance: f64,
) -> AppResult<BenchmarkReport> {
    if !(tolerance.is_finite() && tolerance >= 0.0) {
        return Err(AppError::Benchmark(format!("invalid tolerance {tolerance}")));
    }
    if !dir.is_dir() {
        return Err(AppError::Benchmark(format!(
            "benchmark directory {} not found",
            dir.display()
        )));
    }

    let state: Vec<Vec<f64>> = data.next_state.iter().map(|row| row.to_vec()).collect();
    let checks = vec![
        compare("Q", &data.flows, &read_table(dir, FLOW_FILE)?, tolerance),
        compare("qp", &column(&data.rainfall), &read_table(dir, RAINFALL_FILE)?, tolerance),
        compare("Eq", &column(&data.pet), &read_table(dir, EVAPOTRANSPIRATION_FILE)?, tolerance),
        compare("F0", &state, &read_table(dir, STATE_FILE)?, tolerance),
    ];

    let report = BenchmarkReport { tolerance, checks };
    info!(dir = %dir.display(), passed = report.passed(), "benchmark comparison complete");
    Ok(report)
}

fn write_table(path: &Path, rows: &[Vec<f64>]) -> AppResult<()> {
    let to_err = |e: csv::Error| AppError::Benchmark(format!("{}: {e}", path.display()));
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(to_err)?;
    for row in rows {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(to_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `data` as a benchmark directory.
pub fn write_benchmark(data: &BenchmarkData, dir: &Path) -> AppResult<()> {
    std::fs::create_dir_all(dir)?;
    write_table(&dir.join(FLOW_FILE), &data.flows)?;
    write_table(&dir.join(RAINFALL_FILE), &column(&data.rainfall))?;
    write_table(&dir.join(EVAPOTRANSPIRATION_FILE), &column(&data.pet))?;
    let state: Vec<Vec<f64>> = data.next_state.iter().map(|row| row.to_vec()).collect();
    write_table(&dir.join(STATE_FILE), &state)
}
