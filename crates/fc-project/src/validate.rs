//! Forecast configuration validation.

use crate::schema::{CatchmentDef, FloodDef, ForecastConfig, WeatherDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing section: {section}")]
    MissingSection { section: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

/// Coarse map tiles are served at no fewer than this many resolutions.
pub const MIN_AGGREGATION_LEVELS: usize = 4;

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_config(config: &ForecastConfig) -> Result<(), ValidationError> {
    if config.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }
    if config.name.trim().is_empty() {
        return Err(invalid("name", &config.name, "must not be empty"));
    }

    validate_catchment(&config.catchment)?;
    validate_weather(&config.weather)?;

    for (field, path) in [
        ("inputs.weather", &config.inputs.weather),
        ("inputs.parameters", &config.inputs.parameters),
        ("inputs.initial_conditions", &config.inputs.initial_conditions),
    ] {
        if path.as_os_str().is_empty() {
            return Err(invalid(field, "", "path must not be empty"));
        }
    }

    match &config.flood {
        Some(flood) => validate_flood(flood)?,
        None => {
            return Err(ValidationError::MissingSection {
                section: "flood".to_string(),
            });
        }
    }

    Ok(())
}

fn validate_catchment(catchment: &CatchmentDef) -> Result<(), ValidationError> {
    if catchment.id.trim().is_empty() {
        return Err(invalid("catchment.id", &catchment.id, "must not be empty"));
    }
    if !(catchment.area_km2.is_finite() && catchment.area_km2 > 0.0) {
        return Err(invalid("catchment.area_km2", catchment.area_km2, "must be positive"));
    }
    if !catchment.altitude_m.is_finite() {
        return Err(invalid("catchment.altitude_m", catchment.altitude_m, "must be finite"));
    }
    // Sunset hour angle is undefined towards the poles
    if !(catchment.latitude_deg.is_finite() && catchment.latitude_deg.abs() < 66.0) {
        return Err(invalid(
            "catchment.latitude_deg",
            catchment.latitude_deg,
            "must lie within ±66°",
        ));
    }
    Ok(())
}

fn validate_weather(weather: &WeatherDef) -> Result<(), ValidationError> {
    if weather.steps_per_day == 0 || 24 % weather.steps_per_day != 0 {
        return Err(invalid(
            "weather.steps_per_day",
            weather.steps_per_day,
            "must divide 24 hours evenly",
        ));
    }
    if !(weather.roughness_length_m > 0.0 && weather.roughness_length_m < 2.0) {
        return Err(invalid(
            "weather.roughness_length_m",
            weather.roughness_length_m,
            "must lie in (0, 2) m",
        ));
    }
    Ok(())
}

fn validate_flood(flood: &FloodDef) -> Result<(), ValidationError> {
    if flood.model_version.trim().is_empty() {
        return Err(invalid("flood.model_version", &flood.model_version, "must not be empty"));
    }
    if flood.batch_size == 0 {
        return Err(invalid("flood.batch_size", 0, "must be at least 1"));
    }
    if flood.aggregation_levels.len() < MIN_AGGREGATION_LEVELS {
        return Err(invalid(
            "flood.aggregation_levels",
            format!("{:?}", flood.aggregation_levels),
            "at least four levels required",
        ));
    }
    if let Some(level) = flood.aggregation_levels.iter().find(|&&l| l == 0) {
        return Err(invalid("flood.aggregation_levels", level, "levels must be positive"));
    }
    if flood.large_flood_count <= flood.channel_cell_count {
        return Err(invalid(
            "flood.large_flood_count",
            flood.large_flood_count,
            "must exceed flood.channel_cell_count",
        ));
    }
    for (i, polygon) in flood.river_channels.iter().enumerate() {
        if polygon.len() < 3 {
            return Err(invalid(
                &format!("flood.river_channels[{i}]"),
                polygon.len(),
                "a polygon needs at least 3 vertices",
            ));
        }
        if polygon.iter().flatten().any(|v| !v.is_finite()) {
            return Err(invalid(
                &format!("flood.river_channels[{i}]"),
                "non-finite",
                "vertices must be finite",
            ));
        }
    }
    Ok(())
}
