//! Rainfall-runoff model for a single catchment.
//!
//! Raw weather records are prepared into model forcing, turned into
//! potential evapotranspiration with FAO56, and fed through a
//! probability-distributed soil moisture store (PDM) and two routing stores
//! for every catchment parameter row. The result is an ensemble of river
//! flow series plus the store state to start the next run from.

pub mod constants;
pub mod error;
pub mod fao56;
pub mod forecast;
pub mod params;
pub mod pdm;
pub mod river_flow;
pub mod routing;
pub mod station;
pub mod weather;

pub use error::{HydroError, HydroResult};
pub use fao56::{Evapotranspiration, Fao56Input, Site, evapotranspiration};
pub use forecast::{Catchment, RiverFlowForecast, generate_river_flows};
pub use params::{CatchmentParameters, StoreState};
pub use pdm::{StorageModel, StorageOutput, StorageStep, run_storage, storage_step};
pub use river_flow::{FlowMatrix, RiverFlowRun, RunoffForcing, simulate};
pub use routing::{RoutingStore, StoreKind};
pub use station::{StationReading, aggregate_readings};
pub use weather::{PreparedForcing, WeatherRecord, WeatherSeries, wind_at_2m};
