//! Config loading and the tabular inputs it references.

use std::path::{Path, PathBuf};

use fc_flood::{FloodCellParameters, FloodModel};
use fc_hydro::{Catchment, CatchmentParameters, StoreState, WeatherRecord, WeatherSeries};
use fc_project::schema::{FloodDef, ForecastConfig};
use fc_project::tables;

use crate::error::{AppError, AppResult};

/// Summary of a config for listing.
#[derive(Debug, Clone)]
pub struct ConfigSummary {
    pub name: String,
    pub catchment_id: String,
    pub area_km2: f64,
    pub steps_per_day: usize,
    pub has_flood_model: bool,
}

/// Load, migrate and validate a config file.
pub fn load_config(path: &Path) -> AppResult<ForecastConfig> {
    if !path.exists() {
        return Err(AppError::ConfigFileRead {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        });
    }
    Ok(fc_project::load_yaml(path)?)
}

pub fn save_config(path: &Path, config: &ForecastConfig) -> AppResult<()> {
    Ok(fc_project::save_yaml(path, config)?)
}

pub fn summarize(config: &ForecastConfig) -> ConfigSummary {
    ConfigSummary {
        name: config.name.clone(),
        catchment_id: config.catchment.id.clone(),
        area_km2: config.catchment.area_km2,
        steps_per_day: config.weather.steps_per_day,
        has_flood_model: config.inputs.flood_parameters.is_some(),
    }
}

pub fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Inputs for one river-flow run, read from the config's tables.
#[derive(Debug, Clone)]
pub struct FlowInputs {
    pub records: Vec<WeatherRecord>,
    pub weather: WeatherSeries,
    pub catchment: Catchment,
    pub parameters: Vec<CatchmentParameters>,
    pub initial_state: Vec<StoreState>,
}

pub fn load_flow_inputs(config_path: &Path, config: &ForecastConfig) -> AppResult<FlowInputs> {
    let dir = config_dir(config_path);
    let records = tables::read_weather(&config.resolve(&dir, &config.inputs.weather))?;
    let weather = WeatherSeries::new(records.clone(), config.weather.steps_per_day)?;
    let parameters = tables::read_parameters(&config.resolve(&dir, &config.inputs.parameters))?;
    let initial_state =
        tables::read_initial_conditions(&config.resolve(&dir, &config.inputs.initial_conditions))?;

    if initial_state.len() != parameters.len() {
        return Err(AppError::InvalidInput(format!(
            "{} initial conditions for {} parameter rows",
            initial_state.len(),
            parameters.len()
        )));
    }

    Ok(FlowInputs {
        records,
        weather,
        catchment: config.catchment.to_catchment(&config.weather),
        parameters,
        initial_state,
    })
}

pub fn flood_settings(config: &ForecastConfig) -> AppResult<&FloodDef> {
    config
        .flood
        .as_ref()
        .ok_or_else(|| AppError::Validation("config has no flood section".to_string()))
}

pub fn load_flood_cells(
    config_path: &Path,
    config: &ForecastConfig,
) -> AppResult<Vec<FloodCellParameters>> {
    let Some(path) = config.inputs.flood_parameters.as_ref() else {
        return Err(AppError::InvalidInput(
            "config names no flood parameter table".to_string(),
        ));
    };
    Ok(tables::read_flood_parameters(
        &config.resolve(&config_dir(config_path), path),
    )?)
}

pub fn load_flood_model(config_path: &Path, config: &ForecastConfig) -> AppResult<FloodModel> {
    let flood = flood_settings(config)?;
    let cells = load_flood_cells(config_path, config)?;
    Ok(FloodModel::new(
        flood.model_version.clone(),
        flood.regression_form,
        cells,
    )?)
}
