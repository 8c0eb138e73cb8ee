//! Reference crop evapotranspiration and open water evaporation (FAO56).
//!
//! Radiation is estimated from the temperature range with the Hargreaves
//! relation, so only temperature, humidity and wind are required. Equation
//! numbers refer to FAO Irrigation and Drainage Paper 56.

use std::f64::consts::PI;

use fc_core::constants::KELVIN_OFFSET;

use crate::constants::{
    ALBEDO_OPEN_WATER, ALBEDO_REFERENCE, BAROMETRIC_EXPONENT, CP_AIR, EPOCH_DAY_OF_YEAR,
    EPSILON_MW, HARGREAVES_KRS, LATENT_HEAT, SOLAR_CONSTANT, STEFAN_BOLTZMANN,
};
use crate::error::{HydroError, HydroResult};

/// Location of the catchment for the radiation geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    /// Mean altitude above sea level [m]
    pub altitude_m: f64,
    /// Mean latitude [degrees]
    pub latitude_deg: f64,
}

/// Parallel per-step inputs to the estimator.
#[derive(Debug, Clone, Copy)]
pub struct Fao56Input<'a> {
    /// [°C]
    pub t_min: &'a [f64],
    /// [°C]
    pub t_max: &'a [f64],
    /// [°C]
    pub t_mean: &'a [f64],
    /// [%]
    pub relative_humidity: &'a [f64],
    /// [m/s]
    pub wind_2m: &'a [f64],
}

impl Fao56Input<'_> {
    fn len(&self) -> HydroResult<usize> {
        let n = self.t_mean.len();
        for (what, len) in [
            ("t_min", self.t_min.len()),
            ("t_max", self.t_max.len()),
            ("relative_humidity", self.relative_humidity.len()),
            ("wind_2m", self.wind_2m.len()),
        ] {
            if len != n {
                return Err(HydroError::LengthMismatch {
                    what,
                    expected: n,
                    actual: len,
                });
            }
        }
        Ok(n)
    }
}

/// Output series, both in mm/day.
#[derive(Debug, Clone, Default)]
pub struct Evapotranspiration {
    /// Reference crop evapotranspiration Ep
    pub reference: Vec<f64>,
    /// Open water evaporation E0
    pub open_water: Vec<f64>,
}

/// Saturation vapour pressure [kPa] (Eq. 11).
#[inline]
fn saturation_vapour_pressure(t: f64) -> f64 {
    0.6108 * ((17.27 * t) / (t + 237.3)).exp()
}

/// Slope of the saturation vapour pressure curve [kPa/°C] (Eq. 13).
#[inline]
fn vapour_curve_slope(t: f64) -> f64 {
    (4098.0 * (0.6108 * ((17.27 * t) / (t + 237.3)).exp())) / (t + 237.3).powi(2)
}

/// Atmospheric pressure [kPa] from altitude (Eq. 7).
#[inline]
pub fn atmospheric_pressure(altitude_m: f64) -> f64 {
    101.3 * ((293.0 - 0.0065 * altitude_m) / 293.0).powf(BAROMETRIC_EXPONENT)
}

/// Psychrometric constant [kPa/°C] (Eq. 8).
#[inline]
pub fn psychrometric_constant(pressure_kpa: f64) -> f64 {
    ((CP_AIR * pressure_kpa) / EPSILON_MW) / LATENT_HEAT
}

/// Extraterrestrial radiation [MJ m⁻² day⁻¹] for a (fractional) day number
/// (Eqs. 21-25).
pub fn extraterrestrial_radiation(day: f64, latitude_rad: f64) -> f64 {
    let dr = 1.0 + 0.033 * ((2.0 * PI / 365.0) * day).cos();
    let delta = 0.409 * ((2.0 * PI / 365.0) * day - 1.39).sin();
    let ws = (-latitude_rad.tan() * delta.tan()).acos();
    ((24.0 * 60.0) / PI * SOLAR_CONSTANT)
        * dr
        * (ws * latitude_rad.sin() * delta.sin() + latitude_rad.cos() * delta.cos() * ws.sin())
}

/// Estimate Ep and E0 for every step.
///
/// Day numbers advance by `dt` from the fixed 1 January 2010 epoch.
pub fn evapotranspiration(
    input: &Fao56Input<'_>,
    dt: f64,
    site: &Site,
) -> HydroResult<Evapotranspiration> {
    let n = input.len()?;
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(HydroError::invalid(format!("time step {dt} must be positive")));
    }

    let pressure = atmospheric_pressure(site.altitude_m);
    let gamma = psychrometric_constant(pressure);
    let latitude = site.latitude_deg * PI / 180.0;
    let clear_sky_factor = 0.75 + 2e-5 * site.altitude_m;
    let soil_heat_flux = 0.0;

    let mut out = Evapotranspiration {
        reference: Vec::with_capacity(n),
        open_water: Vec::with_capacity(n),
    };

    for i in 0..n {
        let (mut t_min, mut t_max) = (input.t_min[i], input.t_max[i]);
        if t_max < t_min {
            std::mem::swap(&mut t_min, &mut t_max);
        }
        let t = input.t_mean[i];
        let u2 = input.wind_2m[i];

        let del = vapour_curve_slope(t);
        let es = (saturation_vapour_pressure(t_max) + saturation_vapour_pressure(t_min)) / 2.0;
        let ea = (input.relative_humidity[i] / 100.0) * es;

        let day = EPOCH_DAY_OF_YEAR + i as f64 * dt;
        let ra = extraterrestrial_radiation(day, latitude);

        // Eq. 50, 37
        let rs = HARGREAVES_KRS * (t_max - t_min).sqrt() * ra;
        let rso = clear_sky_factor * ra;

        // Eq. 39
        let sig_t4 = (STEFAN_BOLTZMANN * (t_max + KELVIN_OFFSET).powi(4)
            + STEFAN_BOLTZMANN * (t_min + KELVIN_OFFSET).powi(4))
            / 2.0;
        let ratio = rs / rso;
        let rs_rso = if ratio > 1.0 { 1.0 } else { ratio };
        let rnl = sig_t4 * (0.34 - 0.14 * ea.sqrt()) * (1.35 * rs_rso - 0.35);

        // Eq. 6 with zero soil heat flux
        let rn = (1.0 - ALBEDO_REFERENCE) * rs - rnl;
        let t1 = 0.408 * del * (rn - soil_heat_flux);
        let t2 = ((gamma * 900.0) / (t + 273.0)) * u2 * (es - ea);
        let t3 = del + gamma * (1.0 + 0.34 * u2);
        let eto = (t1 + t2) / t3;

        // Open water: low albedo, no surface resistance
        let rn_water = (1.0 - ALBEDO_OPEN_WATER) * rs - rnl;
        let t1_water = 0.408 * del * (rn_water - soil_heat_flux);
        let e0 = (t1_water + t2) / (del + gamma);

        if !eto.is_finite() {
            return Err(HydroError::NonFinite {
                what: "reference evapotranspiration",
                value: eto,
            });
        }
        if !e0.is_finite() {
            return Err(HydroError::NonFinite {
                what: "open water evaporation",
                value: e0,
            });
        }
        out.reference.push(eto);
        out.open_water.push(e0);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAJALAYA: Site = Site {
        altitude_m: 1157.0,
        latitude_deg: -7.125,
    };

    fn run(t_min: f64, t_max: f64, rh: f64, u2: f64) -> (f64, f64) {
        let t_mean = (t_min + t_max) / 2.0;
        let input = Fao56Input {
            t_min: &[t_min],
            t_max: &[t_max],
            t_mean: &[t_mean],
            relative_humidity: &[rh],
            wind_2m: &[u2],
        };
        let et = evapotranspiration(&input, 0.25, &MAJALAYA).unwrap();
        (et.reference[0], et.open_water[0])
    }

    #[test]
    fn pressure_at_sea_level_is_standard() {
        assert!((atmospheric_pressure(0.0) - 101.3).abs() < 1e-12);
        // FAO56 Example 2: 1800 m gives 81.8 kPa.
        assert!((atmospheric_pressure(1800.0) - 81.8).abs() < 0.1);
    }

    #[test]
    fn psychrometric_constant_matches_table() {
        // FAO56 Annex 2 lists 0.054 kPa/°C at 81.8 kPa.
        assert!((psychrometric_constant(81.8) - 0.054).abs() < 5e-4);
    }

    #[test]
    fn extraterrestrial_radiation_example_8() {
        // FAO56 Example 8: 3 September (J = 246), 20°S gives 32.2 MJ/m²/day.
        let ra = extraterrestrial_radiation(246.0, -20.0_f64.to_radians());
        assert!((ra - 32.2).abs() < 0.1, "Ra = {ra}");
    }

    #[test]
    fn tropical_day_gives_plausible_rates() {
        let (ep, e0) = run(18.0, 28.0, 75.0, 1.5);
        assert!(ep > 1.0 && ep < 8.0, "Ep = {ep}");
        // Lower albedo and no surface resistance evaporate more.
        assert!(e0 > ep);
    }

    #[test]
    fn tropical_day_matches_reference_rates() {
        let (ep, e0) = run(18.0, 28.0, 75.0, 1.5);
        assert!((ep - 4.057603290617737).abs() < 1e-4 * 4.057603290617737, "Ep = {ep}");
        assert!((e0 - 5.651510674342446).abs() < 1e-4 * 5.651510674342446, "E0 = {e0}");
    }

    #[test]
    fn swapped_temperatures_are_reordered() {
        let input_ok = run(18.0, 28.0, 75.0, 1.5);
        let t_mean = 23.0;
        let input = Fao56Input {
            t_min: &[28.0],
            t_max: &[18.0],
            t_mean: &[t_mean],
            relative_humidity: &[75.0],
            wind_2m: &[1.5],
        };
        let et = evapotranspiration(&input, 0.25, &MAJALAYA).unwrap();
        assert_eq!(et.reference[0], input_ok.0);
        assert_eq!(et.open_water[0], input_ok.1);
    }

    #[test]
    fn saturated_air_has_no_aerodynamic_term() {
        // At 100% humidity es == ea, so wind no longer matters for E0's numerator.
        let (_, e0_calm) = run(18.0, 28.0, 100.0, 0.0);
        let (_, e0_windy) = run(18.0, 28.0, 100.0, 5.0);
        assert!((e0_calm - e0_windy).abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_is_reported() {
        let input = Fao56Input {
            t_min: &[18.0, 18.0],
            t_max: &[28.0],
            t_mean: &[23.0, 23.0],
            relative_humidity: &[75.0, 75.0],
            wind_2m: &[1.0, 1.0],
        };
        let err = evapotranspiration(&input, 0.25, &MAJALAYA).unwrap_err();
        assert!(matches!(err, HydroError::LengthMismatch { what: "t_max", .. }));
    }

    #[test]
    fn polar_night_is_non_finite() {
        let site = Site {
            altitude_m: 0.0,
            latitude_deg: 80.0,
        };
        let input = Fao56Input {
            t_min: &[-20.0],
            t_max: &[-10.0],
            t_mean: &[-15.0],
            relative_humidity: &[80.0],
            wind_2m: &[2.0],
        };
        let err = evapotranspiration(&input, 0.25, &site).unwrap_err();
        assert!(matches!(err, HydroError::NonFinite { .. }));
    }
}
