use crate::{FcError, FcResult};

/// Floating point type used throughout system
pub type Real = f64;

/// |a - reference| / |reference|, or the absolute difference when the
/// reference is exactly zero.
pub fn relative_error(value: Real, reference: Real) -> Real {
    let diff = (value - reference).abs();
    if reference == 0.0 {
        diff
    } else {
        diff / reference.abs()
    }
}

/// Check every element of a series, reporting the first non-finite value.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> FcResult<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&value) => Err(FcError::NonFinite { what, value }),
        None => Ok(()),
    }
}

/// Check that a series has the length its companion series implies.
pub fn ensure_same_len(expected: usize, actual: usize, what: &'static str) -> FcResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(FcError::LengthMismatch {
            what,
            expected,
            actual,
        })
    }
}
