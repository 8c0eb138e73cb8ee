//! fc-core: stable foundation for floodcast.
//!
//! Contains:
//! - units (uom area type + runoff unit conversion)
//! - numeric (Real + finiteness and length checks)
//! - ids (compact IDs for grid cells)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{FcError, FcResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
