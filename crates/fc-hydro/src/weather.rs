//! Weather feed records and their preparation into model forcing.

use fc_core::constants::KELVIN_OFFSET;
use serde::{Deserialize, Serialize};

use crate::constants::{LOG_PROFILE_FACTOR, WIND_HEIGHT_10M, WIND_HEIGHT_2M};
use crate::error::{HydroError, HydroResult};

/// One step of the weather feed, in feed units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Relative humidity [%]
    pub relative_humidity: f64,
    /// Maximum temperature over the step [K]
    pub max_temperature: f64,
    /// Minimum temperature over the step [K]
    pub min_temperature: f64,
    /// Eastward wind at 10 m [m/s]
    pub wind_u: f64,
    /// Northward wind at 10 m [m/s]
    pub wind_v: f64,
    /// Precipitation accumulated over the step [mm]
    pub precipitation: f64,
}

impl WeatherRecord {
    fn values(&self) -> [(&'static str, f64); 6] {
        [
            ("relative_humidity", self.relative_humidity),
            ("max_temperature", self.max_temperature),
            ("min_temperature", self.min_temperature),
            ("wind_u", self.wind_u),
            ("wind_v", self.wind_v),
            ("precipitation", self.precipitation),
        ]
    }
}

/// Validated weather series at a fixed number of steps per day.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct WeatherSeries {
    records: Vec<WeatherRecord>,
    steps_per_day: usize,
}

impl WeatherSeries {
    /// Validates:
    /// - at least one full day of records
    /// - length is a multiple of `steps_per_day`
    /// - every value is finite
    pub fn new(records: Vec<WeatherRecord>, steps_per_day: usize) -> HydroResult<Self> {
        if steps_per_day == 0 {
            return Err(HydroError::invalid("steps_per_day must be at least 1"));
        }
        if records.is_empty() {
            return Err(HydroError::invalid("weather series is empty"));
        }
        if records.len() % steps_per_day != 0 {
            return Err(HydroError::invalid(format!(
                "weather series length {} is not a multiple of {} steps per day",
                records.len(),
                steps_per_day
            )));
        }
        for record in &records {
            for (what, value) in record.values() {
                if !value.is_finite() {
                    return Err(HydroError::NonFinite { what, value });
                }
            }
        }
        Ok(Self {
            records,
            steps_per_day,
        })
    }

    pub fn records(&self) -> &[WeatherRecord] {
        &self.records
    }

    pub fn steps_per_day(&self) -> usize {
        self.steps_per_day
    }

    /// Time step in days.
    pub fn dt(&self) -> f64 {
        1.0 / self.steps_per_day as f64
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn days(&self) -> usize {
        self.records.len() / self.steps_per_day
    }

    /// Convert the feed into model forcing.
    ///
    /// Temperatures become °C. Minimum and maximum temperature are replaced by
    /// the extremes of each day's block of steps; the mean temperature stays
    /// per step. Wind is reduced to 2 m and precipitation becomes mm/day.
    pub fn prepare(&self, roughness_length_m: f64) -> HydroResult<PreparedForcing> {
        if !(roughness_length_m > 0.0 && roughness_length_m < WIND_HEIGHT_2M) {
            return Err(HydroError::invalid(format!(
                "roughness length {roughness_length_m} m must lie in (0, {WIND_HEIGHT_2M})"
            )));
        }

        let dt = self.dt();
        let n = self.records.len();
        let t_max_step: Vec<f64> = self
            .records
            .iter()
            .map(|r| r.max_temperature - KELVIN_OFFSET)
            .collect();
        let t_min_step: Vec<f64> = self
            .records
            .iter()
            .map(|r| r.min_temperature - KELVIN_OFFSET)
            .collect();

        let t_mean = t_min_step
            .iter()
            .zip(&t_max_step)
            .map(|(lo, hi)| (lo + hi) / 2.0)
            .collect();

        let mut t_min = Vec::with_capacity(n);
        let mut t_max = Vec::with_capacity(n);
        for (lo_block, hi_block) in t_min_step
            .chunks(self.steps_per_day)
            .zip(t_max_step.chunks(self.steps_per_day))
        {
            let day_min = lo_block.iter().copied().fold(f64::INFINITY, f64::min);
            let day_max = hi_block.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            t_min.extend(std::iter::repeat_n(day_min, lo_block.len()));
            t_max.extend(std::iter::repeat_n(day_max, hi_block.len()));
        }

        let wind_2m = self
            .records
            .iter()
            .map(|r| wind_at_2m(r.wind_u.hypot(r.wind_v), roughness_length_m))
            .collect();

        let relative_humidity = self.records.iter().map(|r| r.relative_humidity).collect();
        let rainfall = self.records.iter().map(|r| r.precipitation / dt).collect();

        Ok(PreparedForcing {
            t_mean,
            t_min,
            t_max,
            relative_humidity,
            wind_2m,
            rainfall,
            dt,
        })
    }
}

/// Model forcing derived from a weather series, one value per step.
#[derive(Debug, Clone)]
pub struct PreparedForcing {
    /// Mean of the step's min and max temperature [°C]
    pub t_mean: Vec<f64>,
    /// Daily minimum temperature [°C]
    pub t_min: Vec<f64>,
    /// Daily maximum temperature [°C]
    pub t_max: Vec<f64>,
    /// Relative humidity [%]
    pub relative_humidity: Vec<f64>,
    /// Wind speed at 2 m [m/s]
    pub wind_2m: Vec<f64>,
    /// Rainfall rate [mm/day]
    pub rainfall: Vec<f64>,
    /// Step length [day]
    pub dt: f64,
}

/// Reduce a 10 m wind speed to 2 m with a logarithmic profile.
///
/// Friction velocity u* = (u10 / 2.5) / ln(10 / z0), then u2 = 2.5 u* ln(2 / z0).
pub fn wind_at_2m(u10: f64, roughness_length_m: f64) -> f64 {
    let u0 = 0.0;
    let u_tau = ((u10 - u0) / LOG_PROFILE_FACTOR) / (WIND_HEIGHT_10M / roughness_length_m).ln();
    LOG_PROFILE_FACTOR * u_tau * (WIND_HEIGHT_2M / roughness_length_m).ln() + u0
}
