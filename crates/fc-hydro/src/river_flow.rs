//! Ensemble river-flow simulation for one catchment.

use fc_core::constants::mm_per_day_to_m3ps;
use fc_core::ensure_all_finite;
use fc_core::units::{Area, area_km2};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::constants::PARETO_SHAPE;
use crate::error::{HydroError, HydroResult};
use crate::params::{CatchmentParameters, StoreState};
use crate::pdm::{StorageModel, run_storage};
use crate::routing::RoutingStore;

/// Rainfall and potential evapotranspiration driving the stores.
#[derive(Debug, Clone)]
pub struct RunoffForcing {
    /// qp [mm/day]
    pub rainfall: Vec<f64>,
    /// Ep [mm/day]
    pub pet: Vec<f64>,
    /// Step length [day]
    pub dt: f64,
}

impl RunoffForcing {
    fn validate(&self) -> HydroResult<()> {
        if self.rainfall.is_empty() {
            return Err(HydroError::invalid("forcing series is empty"));
        }
        if self.rainfall.len() != self.pet.len() {
            return Err(HydroError::LengthMismatch {
                what: "potential evapotranspiration",
                expected: self.rainfall.len(),
                actual: self.pet.len(),
            });
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(HydroError::invalid(format!(
                "time step must be positive, got {}",
                self.dt
            )));
        }
        Ok(())
    }
}

/// Flows in m³/s, `steps` rows by `members` columns, stored one member
/// column after another.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowMatrix {
    steps: usize,
    members: usize,
    data: Vec<f64>,
}

impl FlowMatrix {
    pub fn from_columns(columns: Vec<Vec<f64>>) -> HydroResult<Self> {
        let members = columns.len();
        let steps = columns.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(steps * members);
        for column in columns {
            if column.len() != steps {
                return Err(HydroError::LengthMismatch {
                    what: "flow column",
                    expected: steps,
                    actual: column.len(),
                });
            }
            data.extend(column);
        }
        Ok(Self {
            steps,
            members,
            data,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn members(&self) -> usize {
        self.members
    }

    /// Flow series of one ensemble member.
    pub fn member(&self, member: usize) -> Option<&[f64]> {
        if member < self.members {
            Some(&self.data[member * self.steps..(member + 1) * self.steps])
        } else {
            None
        }
    }

    pub fn get(&self, step: usize, member: usize) -> Option<f64> {
        if step < self.steps && member < self.members {
            Some(self.data[member * self.steps + step])
        } else {
            None
        }
    }

    /// All members' flows at one step.
    pub fn step_values(&self, step: usize) -> Vec<f64> {
        (0..self.members)
            .filter_map(|member| self.get(step, member))
            .collect()
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Result of [`simulate`].
#[derive(Debug, Clone)]
pub struct RiverFlowRun {
    pub flows: FlowMatrix,
    /// Initial state for the next chronological run, one per parameter row.
    pub next_state: Vec<StoreState>,
}

struct MemberRun {
    flow: Vec<f64>,
    next: StoreState,
}

/// Run every parameter row through the storage and routing stores.
pub fn simulate(
    forcing: &RunoffForcing,
    area: Area,
    params: &[CatchmentParameters],
    state: &[StoreState],
) -> HydroResult<RiverFlowRun> {
    forcing.validate()?;
    if params.is_empty() {
        return Err(HydroError::invalid("no catchment parameter rows"));
    }
    if state.len() != params.len() {
        return Err(HydroError::LengthMismatch {
            what: "initial conditions",
            expected: params.len(),
            actual: state.len(),
        });
    }
    let area_km2 = area_km2(area);
    if !(area_km2.is_finite() && area_km2 > 0.0) {
        return Err(HydroError::invalid(format!(
            "catchment area must be positive, got {area_km2} km²"
        )));
    }

    info!(
        members = params.len(),
        steps = forcing.rainfall.len(),
        "simulating river flows"
    );

    let runs = params
        .par_iter()
        .zip(state.par_iter())
        .enumerate()
        .map(|(row, (p, s0))| run_member(forcing, area_km2, p, s0).map_err(|e| e.for_row(row)))
        .collect::<HydroResult<Vec<_>>>()?;

    let mut columns = Vec::with_capacity(runs.len());
    let mut next_state = Vec::with_capacity(runs.len());
    for run in runs {
        columns.push(run.flow);
        next_state.push(run.next);
    }
    let flows = FlowMatrix::from_columns(columns)?;
    debug!(max_flow = flows.max(), "members simulated");

    Ok(RiverFlowRun { flows, next_state })
}

fn run_member(
    forcing: &RunoffForcing,
    area_km2: f64,
    p: &CatchmentParameters,
    s0: &StoreState,
) -> HydroResult<MemberRun> {
    p.validate()?;
    s0.validate()?;

    let model = StorageModel {
        smax: p.smax,
        gamma: PARETO_SHAPE,
        k: p.k,
        dt: forcing.dt,
    };
    let store = run_storage(&forcing.rainfall, &forcing.pet, &model, s0.storage)?;

    let slow = RoutingStore::linear(p.tr, forcing.dt)?.route(&store.drainage, s0.slow_flow)?;
    let fast =
        RoutingStore::non_linear(p.qmax, forcing.dt)?.route(&store.surface_runoff, s0.fast_flow)?;

    let flow: Vec<f64> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| mm_per_day_to_m3ps(f + s, area_km2))
        .collect();
    ensure_all_finite(&flow, "river flow")?;

    // Series are non-empty after validation
    let last = forcing.rainfall.len() - 1;
    let next = StoreState {
        storage: store.storage[last],
        slow_flow: slow[last],
        fast_flow: fast[last],
    };

    Ok(MemberRun { flow, next })
}
