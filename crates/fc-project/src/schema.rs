//! Forecast configuration schema.

use std::path::{Path, PathBuf};

use fc_core::units::km2;
use fc_flood::{ChannelMask, FloodResult, RegressionForm, RiskThresholds};
use fc_hydro::Catchment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastConfig {
    pub version: u32,
    pub name: String,
    pub catchment: CatchmentDef,
    #[serde(default)]
    pub weather: WeatherDef,
    pub inputs: InputsDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flood: Option<FloodDef>,
}

impl ForecastConfig {
    /// Resolve an input path against the directory holding the config file.
    pub fn resolve(&self, config_dir: &Path, input: &Path) -> PathBuf {
        if input.is_absolute() {
            input.to_path_buf()
        } else {
            config_dir.join(input)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatchmentDef {
    pub id: String,
    pub name: String,
    pub area_km2: f64,
    pub altitude_m: f64,
    pub latitude_deg: f64,
}

impl CatchmentDef {
    pub fn to_catchment(&self, weather: &WeatherDef) -> Catchment {
        Catchment {
            area: km2(self.area_km2),
            altitude_m: self.altitude_m,
            latitude_deg: self.latitude_deg,
            roughness_length_m: weather.roughness_length_m,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherDef {
    #[serde(default = "default_steps_per_day")]
    pub steps_per_day: usize,
    #[serde(default = "default_roughness_length")]
    pub roughness_length_m: f64,
}

impl Default for WeatherDef {
    fn default() -> Self {
        Self {
            steps_per_day: default_steps_per_day(),
            roughness_length_m: default_roughness_length(),
        }
    }
}

fn default_steps_per_day() -> usize {
    fc_hydro::constants::DEFAULT_STEPS_PER_DAY
}

fn default_roughness_length() -> f64 {
    fc_hydro::constants::ROUGHNESS_LENGTH_M
}

/// Paths to the tabular inputs, relative to the config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputsDef {
    pub weather: PathBuf,
    pub parameters: PathBuf,
    pub initial_conditions: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flood_parameters: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FloodDef {
    #[serde(default = "default_model_version")]
    pub model_version: String,
    #[serde(default)]
    pub regression_form: RegressionForm,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_levels")]
    pub aggregation_levels: Vec<u32>,
    #[serde(default = "default_channel_cells")]
    pub channel_cell_count: u64,
    #[serde(default = "default_large_flood")]
    pub large_flood_count: u64,
    /// Polygons as lists of [x, y] vertices
    #[serde(default)]
    pub river_channels: Vec<Vec<[f64; 2]>>,
}

impl Default for FloodDef {
    fn default() -> Self {
        Self {
            model_version: default_model_version(),
            regression_form: RegressionForm::default(),
            batch_size: default_batch_size(),
            aggregation_levels: default_levels(),
            channel_cell_count: default_channel_cells(),
            large_flood_count: default_large_flood(),
            river_channels: Vec::new(),
        }
    }
}

impl FloodDef {
    pub fn thresholds(&self) -> FloodResult<RiskThresholds> {
        RiskThresholds::new(self.channel_cell_count, self.large_flood_count)
    }

    pub fn channel_mask(&self) -> FloodResult<ChannelMask> {
        ChannelMask::new(
            self.river_channels
                .iter()
                .map(|polygon| polygon.iter().map(|[x, y]| (*x, *y)).collect())
                .collect(),
        )
    }
}

fn default_model_version() -> String {
    "v1".to_string()
}

fn default_batch_size() -> usize {
    fc_flood::grid::DEFAULT_BATCH_SIZE
}

fn default_levels() -> Vec<u32> {
    fc_flood::DEFAULT_LEVELS.to_vec()
}

fn default_channel_cells() -> u64 {
    fc_flood::risk::CHANNEL_CELL_COUNT
}

fn default_large_flood() -> u64 {
    fc_flood::risk::LARGE_FLOOD_COUNT
}
