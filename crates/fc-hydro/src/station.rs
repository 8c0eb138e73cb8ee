//! Aggregation of ground-station readings into forecast-step weather records.
//!
//! Stations report every few minutes in °C with wind as speed and direction.
//! Readings are bucketed into windows of `24 / steps_per_day` hours so the
//! station path yields the same records as the gridded forecast feed.

use chrono::{DateTime, Duration, Utc};
use fc_core::constants::KELVIN_OFFSET;
use serde::{Deserialize, Serialize};

use crate::error::{HydroError, HydroResult};
use crate::weather::WeatherRecord;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationReading {
    pub time: DateTime<Utc>,
    /// [%]
    pub relative_humidity: f64,
    /// Accumulated since the previous reading [mm]
    pub precipitation: f64,
    /// [°C]
    pub air_temperature: f64,
    /// [m/s]
    pub wind_speed: f64,
    /// Direction the wind blows from, clockwise from north [degrees]
    pub wind_direction: f64,
}

impl StationReading {
    /// Wind vector (u, v) in the meteorological convention.
    fn wind_components(&self) -> (f64, f64) {
        let dir = self.wind_direction.to_radians();
        (-self.wind_speed * dir.sin(), -self.wind_speed * dir.cos())
    }
}

#[derive(Default)]
struct Window {
    count: usize,
    humidity_sum: f64,
    precipitation_sum: f64,
    t_min: f64,
    t_max: f64,
    u_sum: f64,
    v_sum: f64,
}

impl Window {
    fn add(&mut self, reading: &StationReading) {
        if self.count == 0 {
            self.t_min = reading.air_temperature;
            self.t_max = reading.air_temperature;
        } else {
            self.t_min = self.t_min.min(reading.air_temperature);
            self.t_max = self.t_max.max(reading.air_temperature);
        }
        let (u, v) = reading.wind_components();
        self.count += 1;
        self.humidity_sum += reading.relative_humidity;
        self.precipitation_sum += reading.precipitation;
        self.u_sum += u;
        self.v_sum += v;
    }

    fn finish(&self) -> WeatherRecord {
        let n = self.count as f64;
        WeatherRecord {
            relative_humidity: self.humidity_sum / n,
            max_temperature: self.t_max + KELVIN_OFFSET,
            min_temperature: self.t_min + KELVIN_OFFSET,
            wind_u: self.u_sum / n,
            wind_v: self.v_sum / n,
            precipitation: self.precipitation_sum,
        }
    }
}

/// Aggregate `days` worth of readings starting at `start`.
///
/// Readings outside `[start, start + days)` are ignored. Every window must
/// contain at least one reading.
pub fn aggregate_readings(
    readings: &[StationReading],
    start: DateTime<Utc>,
    days: usize,
    steps_per_day: usize,
) -> HydroResult<Vec<WeatherRecord>> {
    if steps_per_day == 0 || 24 * 60 % steps_per_day != 0 {
        return Err(HydroError::invalid(format!(
            "{steps_per_day} steps per day does not divide a day into whole minutes"
        )));
    }
    let window_minutes = (24 * 60 / steps_per_day) as i64;
    let window = Duration::minutes(window_minutes);
    let n_windows = days * steps_per_day;
    let end = start + window * n_windows as i32;

    let mut windows: Vec<Window> = (0..n_windows).map(|_| Window::default()).collect();
    for reading in readings {
        if reading.time < start || reading.time >= end {
            continue;
        }
        let offset = (reading.time - start).num_minutes() / window_minutes;
        windows[offset as usize].add(reading);
    }

    windows
        .iter()
        .enumerate()
        .map(|(i, w)| {
            if w.count == 0 {
                Err(HydroError::invalid(format!(
                    "no station readings in window {i} starting {}",
                    start + window * i as i32
                )))
            } else {
                Ok(w.finish())
            }
        })
        .collect()
}
