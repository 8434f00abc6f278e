//! Compute equipment: unit power curves and rack aggregation.

/// Rack packing and batched rack evaluation.
pub mod rack;
pub mod types;
/// Single-unit power and fan model.
pub mod unit;

pub use rack::{Rack, RackOutput, UnitId, clamp_supply_approach_temp, pack_units};
pub use types::{RatioBounds, UnitCalibration, UnitSpec, fan_affinity_power};
pub use unit::{UnitOutput, UnitPowerModel};
