//! Cooling tower: one-off airflow sizing and per-interval water use.

use std::ops::Add;

use log::debug;
use serde::Deserialize;

use super::hvac::HvacModel;
use crate::datacenter::DatacenterModel;

/// Worst-case conditions the tower is sized for.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingConditions {
    pub min_setpoint_c: f64,
    pub max_setpoint_c: f64,
    pub max_ambient_c: f64,
}

impl Default for SizingConditions {
    fn default() -> Self {
        Self {
            min_setpoint_c: 16.0,
            max_setpoint_c: 22.0,
            max_ambient_c: 40.0,
        }
    }
}

/// Tower calibration produced once ahead of the simulation loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerSizing {
    /// Airflow at which the tower fan draws its reference power (m³/s).
    pub reference_airflow_m3s: f64,
    /// IT load the tower was sized against (W).
    pub rated_load_w: f64,
}

/// Sizes the cooling tower by running the facility at full utilization.
pub struct CoolingTowerSizer;

impl CoolingTowerSizer {
    /// Runs one synthetic full-load evaluation.
    ///
    /// The racks are driven at the warmest setpoint, which gives the hottest
    /// return air; the tower must then reject that heat against the coldest
    /// setpoint at the hottest ambient.
    pub fn size(
        datacenter: &DatacenterModel,
        hvac: &HvacModel,
        conditions: &SizingConditions,
    ) -> TowerSizing {
        let full = vec![1.0; datacenter.num_racks()];
        let thermal = datacenter.step(&full, conditions.max_setpoint_c);
        let avg_return_temp_c = datacenter.avg_return_temp_c(&thermal.rack_outlet_temp_c);
        let rated_load_w = thermal.total_it_load_w();

        let crac_load_w =
            hvac.crac_cooling_load_w(conditions.min_setpoint_c, avg_return_temp_c, rated_load_w);
        let reference_airflow_m3s = hvac.tower_airflow_m3s(
            crac_load_w,
            conditions.max_ambient_c,
            conditions.min_setpoint_c,
        );

        debug!(
            "tower sized: {reference_airflow_m3s:.3} m³/s at {:.1} kW IT, return {:.1} °C",
            rated_load_w / 1000.0,
            avg_return_temp_c
        );

        TowerSizing {
            reference_airflow_m3s,
            rated_load_w,
        }
    }
}

/// Cooling-tower water-side configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoolingTowerConfig {
    /// Circulating water flow (L/min).
    pub flow_rate_l_per_min: f64,
    /// Must be greater than 1.
    pub cycles_of_concentration: f64,
    /// Fraction of circulating water lost as drift.
    pub drift_rate: f64,
    /// Evaporated fraction per °C of range.
    pub evaporation_coefficient_per_c: f64,
    /// Wet bulb used when a step carries none (°C).
    pub default_wet_bulb_temp_c: f64,
    /// Overrides the sized reference airflow (m³/s).
    pub reference_airflow_m3s: Option<f64>,
    pub sizing: SizingConditions,
}

impl Default for CoolingTowerConfig {
    fn default() -> Self {
        Self {
            flow_rate_l_per_min: 66.0,
            cycles_of_concentration: 6.0,
            drift_rate: 0.0002,
            evaporation_coefficient_per_c: 0.00153,
            default_wet_bulb_temp_c: 18.0,
            reference_airflow_m3s: None,
            sizing: SizingConditions::default(),
        }
    }
}

/// Tower water state. Hot and cold water temperatures are refreshed from the
/// thermal model every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoolingTowerState {
    pub flow_rate_l_per_min: f64,
    pub hot_water_temp_c: f64,
    pub cold_water_temp_c: f64,
    pub wet_bulb_temp_c: f64,
    pub cycles_of_concentration: f64,
    pub drift_rate: f64,
}

impl CoolingTowerState {
    pub fn from_config(config: &CoolingTowerConfig) -> Self {
        Self {
            flow_rate_l_per_min: config.flow_rate_l_per_min,
            hot_water_temp_c: config.default_wet_bulb_temp_c,
            cold_water_temp_c: config.default_wet_bulb_temp_c,
            wet_bulb_temp_c: config.default_wet_bulb_temp_c,
            cycles_of_concentration: config.cycles_of_concentration,
            drift_rate: config.drift_rate,
        }
    }

    /// Returns a copy with refreshed water temperatures.
    pub fn with_temperatures(
        mut self,
        hot_water_temp_c: f64,
        cold_water_temp_c: f64,
        wet_bulb_temp_c: f64,
    ) -> Self {
        self.hot_water_temp_c = hot_water_temp_c;
        self.cold_water_temp_c = cold_water_temp_c;
        self.wet_bulb_temp_c = wet_bulb_temp_c;
        self
    }

    /// Hot minus cold water temperature (°C).
    pub fn range_c(&self) -> f64 {
        self.hot_water_temp_c - self.cold_water_temp_c
    }

    /// Cold water minus wet bulb (°C).
    pub fn approach_c(&self) -> f64 {
        self.cold_water_temp_c - self.wet_bulb_temp_c
    }
}

/// Water lost over one interval (L).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WaterUse {
    pub evaporation_l: f64,
    pub blowdown_l: f64,
    pub drift_l: f64,
}

impl WaterUse {
    pub fn total_l(&self) -> f64 {
        self.evaporation_l + self.blowdown_l + self.drift_l
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            evaporation_l: self.evaporation_l * factor,
            blowdown_l: self.blowdown_l * factor,
            drift_l: self.drift_l * factor,
        }
    }
}

impl Add for WaterUse {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            evaporation_l: self.evaporation_l + rhs.evaporation_l,
            blowdown_l: self.blowdown_l + rhs.blowdown_l,
            drift_l: self.drift_l + rhs.drift_l,
        }
    }
}

/// Evaporative, blowdown and drift loss estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterModel {
    evaporation_coefficient_per_c: f64,
    interval_minutes: f64,
}

impl WaterModel {
    /// # Panics
    ///
    /// Panics if `interval_minutes` is negative.
    pub fn new(evaporation_coefficient_per_c: f64, interval_minutes: f64) -> Self {
        assert!(interval_minutes >= 0.0, "interval_minutes must be >= 0");
        Self {
            evaporation_coefficient_per_c,
            interval_minutes,
        }
    }

    pub fn interval_minutes(&self) -> f64 {
        self.interval_minutes
    }

    /// Water consumed over one interval.
    ///
    /// Each loss is a fraction of the circulating flow: evaporation grows
    /// linearly with range, blowdown is `evaporation / (cycles - 1)`, drift is
    /// the configured drift rate. Negative ratios are clamped to zero.
    pub fn water_use(&self, state: &CoolingTowerState) -> WaterUse {
        let evaporation_ratio = (self.evaporation_coefficient_per_c * state.range_c()).max(0.0);
        let blowdown_ratio = if state.cycles_of_concentration > 1.0 {
            evaporation_ratio / (state.cycles_of_concentration - 1.0)
        } else {
            0.0
        };
        let drift_ratio = state.drift_rate.max(0.0);

        let liters = state.flow_rate_l_per_min.max(0.0) * self.interval_minutes;
        WaterUse {
            evaporation_l: evaporation_ratio * liters,
            blowdown_l: blowdown_ratio * liters,
            drift_l: drift_ratio * liters,
        }
    }

    /// Total liters consumed over one interval.
    pub fn water_use_liters_per_interval(&self, state: &CoolingTowerState) -> f64 {
        self.water_use(state).total_l()
    }
}

impl Default for WaterModel {
    fn default() -> Self {
        Self::new(CoolingTowerConfig::default().evaporation_coefficient_per_c, 15.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooling::chiller::ChillerConfig;
    use crate::cooling::hvac::HvacConfig;
    use crate::datacenter::{RackLayout, ThermalConfig};
    use crate::equipment::UnitCalibration;
    use crate::sim::types::AirProperties;

    fn state(hot: f64, cold: f64) -> CoolingTowerState {
        CoolingTowerState::from_config(&CoolingTowerConfig::default())
            .with_temperatures(hot, cold, 18.0)
    }

    #[test]
    fn breakdown_matches_ratios() {
        let w = WaterModel::default().water_use(&state(30.0, 20.0));
        let liters = 66.0 * 15.0;
        let evap = 0.00153 * 10.0;
        assert!((w.evaporation_l - evap * liters).abs() < 1e-9);
        assert!((w.blowdown_l - evap / 5.0 * liters).abs() < 1e-9);
        assert!((w.drift_l - 0.0002 * liters).abs() < 1e-9);
    }

    #[test]
    fn negative_range_leaves_only_drift() {
        let w = WaterModel::default().water_use(&state(18.0, 22.0));
        assert_eq!(w.evaporation_l, 0.0);
        assert_eq!(w.blowdown_l, 0.0);
        assert!(w.drift_l > 0.0);
    }

    #[test]
    fn linear_in_flow_rate() {
        let model = WaterModel::default();
        let base = state(30.0, 20.0);
        let doubled = CoolingTowerState {
            flow_rate_l_per_min: base.flow_rate_l_per_min * 2.0,
            ..base
        };
        let a = model.water_use_liters_per_interval(&base);
        let b = model.water_use_liters_per_interval(&doubled);
        assert!((b - 2.0 * a).abs() < 1e-9);
    }

    #[test]
    fn add_and_scale() {
        let w = WaterUse {
            evaporation_l: 1.0,
            blowdown_l: 2.0,
            drift_l: 3.0,
        };
        assert_eq!((w + w).total_l(), 12.0);
        assert_eq!(w.scaled(0.5).total_l(), 3.0);
    }

    #[test]
    fn sizing_uses_full_utilization_load() {
        let air = AirProperties::default();
        let dc = DatacenterModel::from_layout(
            &RackLayout::default(),
            &UnitCalibration::default(),
            ThermalConfig::default(),
            air,
        );
        let hvac = HvacModel::new(HvacConfig::default(), ChillerConfig::default(), air);
        let conditions = SizingConditions::default();
        let sizing = CoolingTowerSizer::size(&dc, &hvac, &conditions);

        let full = dc.step(&vec![1.0; dc.num_racks()], 22.0);
        assert_eq!(sizing.rated_load_w, full.total_it_load_w());
        assert!(sizing.reference_airflow_m3s > 0.0);
    }
}
