// fc-core/src/units.rs

use uom::si::f64::Area as UomArea;

// Public canonical unit types (SI, f64)
pub type Area = UomArea;

#[inline]
pub fn km2(v: f64) -> Area {
    use uom::si::area::square_kilometer;
    Area::new::<square_kilometer>(v)
}

#[inline]
pub fn area_km2(area: Area) -> f64 {
    use uom::si::area::square_kilometer;
    area.get::<square_kilometer>()
}

pub mod constants {
    pub const HOURS_PER_DAY: f64 = 24.0;
    pub const SECONDS_PER_HOUR: f64 = 3600.0;
    /// mm over km² expressed in m³.
    pub const M3_PER_MM_KM2: f64 = 1e3;
    pub const KELVIN_OFFSET: f64 = 273.15;

    /// Convert a runoff depth rate (mm/day) over `area_km2` to m³/s.
    ///
    /// Evaluated in the fixed order mm/day · km² · 1e3 / 24 / 3600.
    #[inline]
    pub fn mm_per_day_to_m3ps(q_mm_day: f64, area_km2: f64) -> f64 {
        (q_mm_day * area_km2 * M3_PER_MM_KM2 / HOURS_PER_DAY) / SECONDS_PER_HOUR
    }
}
