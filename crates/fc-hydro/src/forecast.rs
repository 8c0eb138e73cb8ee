//! End-to-end river-flow forecast from a weather series.

use fc_core::units::{Area, km2};
use tracing::info;

use crate::constants::ROUGHNESS_LENGTH_M;
use crate::error::HydroResult;
use crate::fao56::{Fao56Input, Site, evapotranspiration};
use crate::params::{CatchmentParameters, StoreState};
use crate::river_flow::{FlowMatrix, RunoffForcing, simulate};
use crate::weather::WeatherSeries;

/// Physical description of the catchment being forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Catchment {
    pub area: Area,
    /// Mean altitude [m]
    pub altitude_m: f64,
    /// Mean latitude [degrees]
    pub latitude_deg: f64,
    /// Surface roughness used to reduce 10 m wind to 2 m [m]
    pub roughness_length_m: f64,
}

impl Default for Catchment {
    /// The Majalaya catchment of the upper Citarum.
    fn default() -> Self {
        Self {
            area: km2(212.2640),
            altitude_m: 1157.0,
            latitude_deg: -7.125,
            roughness_length_m: ROUGHNESS_LENGTH_M,
        }
    }
}

impl Catchment {
    pub fn site(&self) -> Site {
        Site {
            altitude_m: self.altitude_m,
            latitude_deg: self.latitude_deg,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiverFlowForecast {
    /// Flow [m³/s], steps by ensemble members
    pub flows: FlowMatrix,
    /// qp [mm/day]
    pub rainfall: Vec<f64>,
    /// Ep [mm/day]
    pub pet: Vec<f64>,
    /// E0 [mm/day]
    pub open_water: Vec<f64>,
    pub dt: f64,
    pub next_state: Vec<StoreState>,
}

/// Prepare forcing, estimate evapotranspiration and simulate every row.
pub fn generate_river_flows(
    weather: &WeatherSeries,
    catchment: &Catchment,
    params: &[CatchmentParameters],
    state: &[StoreState],
) -> HydroResult<RiverFlowForecast> {
    let prepared = weather.prepare(catchment.roughness_length_m)?;
    let et = evapotranspiration(
        &Fao56Input {
            t_min: &prepared.t_min,
            t_max: &prepared.t_max,
            t_mean: &prepared.t_mean,
            relative_humidity: &prepared.relative_humidity,
            wind_2m: &prepared.wind_2m,
        },
        prepared.dt,
        &catchment.site(),
    )?;

    let forcing = RunoffForcing {
        rainfall: prepared.rainfall,
        pet: et.reference,
        dt: prepared.dt,
    };
    let run = simulate(&forcing, catchment.area, params, state)?;

    info!(
        days = weather.days(),
        members = run.flows.members(),
        "river flow forecast complete"
    );

    Ok(RiverFlowForecast {
        flows: run.flows,
        rainfall: forcing.rainfall,
        pet: forcing.pet,
        open_water: et.open_water,
        dt: forcing.dt,
        next_state: run.next_state,
    })
}
