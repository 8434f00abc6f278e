//! Facility cooling: chiller, HVAC composition and cooling tower.

pub mod chiller;
pub mod hvac;
pub mod tower;

pub use chiller::{ChillerConfig, ChillerModel, ChillerOperation};
pub use hvac::{HvacBreakdown, HvacConfig, HvacModel, PumpConfig};
pub use tower::{
    CoolingTowerConfig, CoolingTowerSizer, CoolingTowerState, SizingConditions, TowerSizing,
    WaterModel, WaterUse,
};
