//! Linear and non-linear routing stores.
//!
//! Both follow q = a * v^b. The linear store (b = 1) drains with residence
//! time Tr. The non-linear store (b = 5/3) is parameterised by its daily
//! capacity flow qmax and caps its volume at vmax to keep the explicit step
//! stable.

use fc_core::ensure_all_finite;

use crate::constants::{DT_DAY, LINEAR_EXPONENT, NON_LINEAR_EXPONENT};
use crate::error::{HydroError, HydroResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Linear,
    NonLinear,
}

/// A store ready to route one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingStore {
    kind: StoreKind,
    a: f64,
    b: f64,
    vmax: f64,
    dt: f64,
}

impl RoutingStore {
    /// Slow store with residence time `residence_time` [day].
    pub fn linear(residence_time: f64, dt: f64) -> HydroResult<Self> {
        check_dt(dt)?;
        if !(residence_time.is_finite() && residence_time > 0.0) {
            return Err(HydroError::InvalidParameters {
                row: 0,
                what: format!("Tr must be positive, got {residence_time}"),
            });
        }
        Ok(Self {
            kind: StoreKind::Linear,
            a: 1.0 / residence_time,
            b: LINEAR_EXPONENT,
            vmax: f64::INFINITY,
            dt,
        })
    }

    /// Fast store with capacity flow `qmax` [mm/day].
    pub fn non_linear(qmax: f64, dt: f64) -> HydroResult<Self> {
        check_dt(dt)?;
        if !(qmax.is_finite() && qmax > 0.0) {
            return Err(HydroError::InvalidParameters {
                row: 0,
                what: format!("qmax must be positive, got {qmax}"),
            });
        }
        let b = NON_LINEAR_EXPONENT;
        // qmax comes from daily data, hence DT_DAY rather than dt
        let a = qmax.powf(1.0 - b) * (b * DT_DAY).powf(-b);
        let vmax = (a * b * dt).powf(1.0 / (1.0 - b));
        Ok(Self {
            kind: StoreKind::NonLinear,
            a,
            b,
            vmax,
            dt,
        })
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn coefficient(&self) -> f64 {
        self.a
    }

    pub fn exponent(&self) -> f64 {
        self.b
    }

    /// Volume cap of the store; infinite for the linear store.
    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    /// Route `inflow` [mm/day] starting from outflow `q0` [mm/day].
    ///
    /// `out[i]` is the outflow over step i. When a trial volume would reach
    /// vmax the volume is pinned there and the outflow takes up the excess,
    /// which can make it negative.
    pub fn route(&self, inflow: &[f64], q0: f64) -> HydroResult<Vec<f64>> {
        ensure_all_finite(inflow, "routing inflow")?;

        let mut v = (q0 / self.a).powf(1.0 / self.b);
        if !v.is_finite() {
            return Err(HydroError::NonFinite {
                what: "initial store volume",
                value: v,
            });
        }

        let dt = self.dt;
        let mut q = Vec::with_capacity(inflow.len());
        for &qs in inflow {
            let qtrial = self.a * v.powf(self.b);
            let vtrial = v + (qs - qtrial) * dt;
            if vtrial < self.vmax {
                q.push(qtrial);
                v = vtrial;
            } else {
                q.push(qs - (self.vmax - v) / dt);
                v = self.vmax;
            }
        }
        Ok(q)
    }
}

fn check_dt(dt: f64) -> HydroResult<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(HydroError::invalid(format!("time step must be positive, got {dt}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_store_recedes_exponentially_without_inflow() {
        let store = RoutingStore::linear(4.0, 0.25).unwrap();
        let q = store.route(&[0.0; 8], 2.0).unwrap();
        assert_eq!(q[0], 2.0);
        // v[i+1] = v[i] (1 - dt/Tr)
        for w in q.windows(2) {
            assert!((w[1] / w[0] - (1.0 - 0.25 / 4.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_store_has_no_cap() {
        let store = RoutingStore::linear(1.0, 0.25).unwrap();
        assert!(store.vmax().is_infinite());
        assert_eq!(store.kind(), StoreKind::Linear);
    }

    #[test]
    fn non_linear_coefficients() {
        let store = RoutingStore::non_linear(20.0, 0.25).unwrap();
        let b = 5.0 / 3.0;
        let a = 20.0_f64.powf(1.0 - b) * b.powf(-b);
        assert!((store.coefficient() - a).abs() < 1e-15);
        assert!((store.vmax() - (a * b * 0.25).powf(1.0 / (1.0 - b))).abs() < 1e-9);
    }

    #[test]
    fn capped_volume_passes_excess_to_outflow() {
        let store = RoutingStore::non_linear(20.0, 0.25).unwrap();
        let q = store.route(&[1.0e5, 1.0e5], 5.0).unwrap();
        let a = store.coefficient();
        let v0 = (5.0 / a).powf(3.0 / 5.0);
        assert!((q[0] - (1.0e5 - (store.vmax() - v0) / 0.25)).abs() < 1e-6);
        // second step starts at vmax
        assert!((q[1] - 1.0e5).abs() < 1e-9);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(RoutingStore::non_linear(0.0, 0.25).is_err());
        assert!(RoutingStore::linear(0.0, 0.25).is_err());
        assert!(RoutingStore::linear(3.0, 0.0).is_err());
    }

    #[test]
    fn negative_initial_flow_on_non_linear_store_is_rejected() {
        let store = RoutingStore::non_linear(20.0, 0.25).unwrap();
        let err = store.route(&[1.0], -1.0).unwrap_err();
        assert!(matches!(err, HydroError::NonFinite { .. }));
    }

    #[test]
    fn output_matches_input_length() {
        let store = RoutingStore::non_linear(15.0, 0.25).unwrap();
        assert_eq!(store.route(&[1.0; 17], 1.0).unwrap().len(), 17);
        assert!(store.route(&[], 1.0).unwrap().is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn linear_store_holds_steady_inflow(tr in 0.5_f64..50.0, q0 in 0.0_f64..100.0, n in 1usize..100) {
            let store = RoutingStore::linear(tr, 0.25).unwrap();
            let q = store.route(&vec![q0; n], q0).unwrap();
            for value in q {
                prop_assert!((value - q0).abs() <= 1e-9 * q0.max(1.0));
            }
        }

        #[test]
        fn non_linear_store_holds_steady_inflow(qmax in 5.0_f64..100.0, frac in 0.01_f64..0.5, n in 1usize..100) {
            let store = RoutingStore::non_linear(qmax, 0.25).unwrap();
            let q0 = frac * qmax;
            let q = store.route(&vec![q0; n], q0).unwrap();
            for value in q {
                prop_assert!((value - q0).abs() <= 1e-8 * q0);
            }
        }
    }
}
