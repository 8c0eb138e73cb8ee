//! Catchment parameter rows and the store state carried between runs.

use serde::{Deserialize, Serialize};

use crate::error::{HydroError, HydroResult};

/// One calibrated parameter set (one ensemble member).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatchmentParameters {
    /// Maximum soil moisture storage [mm]
    pub smax: f64,
    /// Fast store capacity flow [mm/day]
    pub qmax: f64,
    /// Drainage coefficient [mm/day]
    pub k: f64,
    /// Slow store residence time [day]
    pub tr: f64,
}

impl CatchmentParameters {
    pub fn validate(&self) -> HydroResult<()> {
        let positive = [("Smax", self.smax), ("qmax", self.qmax), ("Tr", self.tr)];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(HydroError::InvalidParameters {
                    row: 0,
                    what: format!("{name} must be positive and finite, got {value}"),
                });
            }
        }
        if !(self.k.is_finite() && self.k >= 0.0) {
            return Err(HydroError::InvalidParameters {
                row: 0,
                what: format!("k must be non-negative and finite, got {}", self.k),
            });
        }
        Ok(())
    }
}

/// Store levels at the boundary between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreState {
    /// Soil moisture storage [mm]
    pub storage: f64,
    /// Slow store outflow [mm/day]
    pub slow_flow: f64,
    /// Fast store outflow [mm/day]
    pub fast_flow: f64,
}

impl StoreState {
    pub fn validate(&self) -> HydroResult<()> {
        let values = [
            ("storage", self.storage),
            ("slow_flow", self.slow_flow),
            ("fast_flow", self.fast_flow),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(HydroError::InvalidParameters {
                    row: 0,
                    what: format!("initial {name} is not finite"),
                });
            }
        }
        if self.storage < 0.0 {
            return Err(HydroError::InvalidParameters {
                row: 0,
                what: format!("initial storage must be non-negative, got {}", self.storage),
            });
        }
        Ok(())
    }
}
