//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use datacenter_sim::cooling::{
    ChillerConfig, CoolingTowerConfig, CoolingTowerSizer, CoolingTowerState, HvacConfig,
    HvacModel, SizingConditions, WaterModel,
};
use datacenter_sim::datacenter::{DatacenterModel, RackLayout, ThermalConfig};
use datacenter_sim::equipment::{UnitCalibration, UnitSpec};
use datacenter_sim::sim::engine::Engine;
use datacenter_sim::sim::schedule::SetpointPolicy;
use datacenter_sim::sim::types::{AirProperties, CoolingType, SimConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default simulation configuration (96 steps/day, 1 day).
pub fn default_config() -> SimConfig {
    SimConfig::new(96, 1)
}

/// Layout with `num_racks` racks and default units.
pub fn layout(num_racks: usize) -> RackLayout {
    RackLayout {
        num_racks,
        supply_approach_temps_c: vec![4.5; num_racks],
        return_approach_temps_c: vec![-1.5; num_racks],
        ..RackLayout::default()
    }
}

/// Datacenter with default calibration and thermal correlation.
pub fn datacenter(num_racks: usize) -> DatacenterModel {
    DatacenterModel::from_layout(
        &layout(num_racks),
        &UnitCalibration::default(),
        ThermalConfig::default(),
        AirProperties::default(),
    )
}

/// HVAC model with default constants and chiller.
pub fn hvac() -> HvacModel {
    HvacModel::new(
        HvacConfig::default(),
        ChillerConfig::default(),
        AirProperties::default(),
    )
}

/// Engine over `num_racks` default racks, tower sized at default conditions.
pub fn engine(num_racks: usize, cooling_type: CoolingType) -> Engine {
    let config = default_config();
    let dc = datacenter(num_racks);
    let hvac = hvac();
    let sizing = CoolingTowerSizer::size(&dc, &hvac, &SizingConditions::default());
    let tower = CoolingTowerConfig::default();
    let water = WaterModel::new(tower.evaporation_coefficient_per_c, config.interval_minutes());
    Engine::new(
        config,
        dc,
        hvac,
        sizing,
        CoolingTowerState::from_config(&tower),
        water,
        cooling_type,
        SetpointPolicy::default(),
    )
}

/// Random unit specs: full load 100–2000 W, idle 0–40 % of full load.
pub fn random_specs(rng: &mut StdRng, count: usize) -> Vec<UnitSpec> {
    (0..count)
        .map(|_| {
            let full = rng.random_range(100.0..2000.0);
            let idle = full * rng.random_range(0.0..0.4);
            UnitSpec::new(full, idle)
        })
        .collect()
}

/// Seeded RNG so property tests are reproducible.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
