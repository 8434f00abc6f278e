//! HVAC power composition: CRAC fan, cooling-tower fan, chiller and the two
//! circulation pumps.

use serde::Deserialize;

use super::chiller::{ChillerConfig, ChillerModel, ChillerOperation};
use super::tower::TowerSizing;
use crate::equipment::fan_affinity_power;
use crate::sim::types::AirProperties;

/// One water loop's pump parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PumpConfig {
    pub pressure_drop_pa: f64,
    pub flow_rate_m3s: f64,
    pub efficiency: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            pressure_drop_pa: 300_000.0,
            flow_rate_m3s: 0.0011,
            efficiency: 0.87,
        }
    }
}

impl PumpConfig {
    /// Hydraulic power `Δp · Q / η` (W).
    pub fn power_w(&self) -> f64 {
        if self.efficiency <= 0.0 {
            return 0.0;
        }
        self.pressure_drop_pa * self.flow_rate_m3s / self.efficiency
    }
}

/// HVAC physical constants and tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HvacConfig {
    /// CRAC supply airflow per watt of IT load (m³/s/W).
    pub crac_supply_airflow_per_w: f64,
    /// CRAC reference airflow per watt of IT load (m³/s/W).
    pub crac_reference_airflow_per_w: f64,
    /// CRAC fan power at reference airflow (W).
    pub crac_fan_reference_power_w: f64,
    /// Cooling-tower fan power at reference airflow (W).
    pub tower_fan_reference_power_w: f64,
    /// Air temperature rise across the tower at design (°C).
    pub tower_design_air_delta_c: f64,
    pub chilled_water_pump: PumpConfig,
    pub condenser_water_pump: PumpConfig,
    /// Below this ambient the tower fan and condenser pump are off (°C).
    pub free_cooling_ambient_c: f64,
    /// Multiplies the CRAC cooling load.
    pub cooling_efficiency_factor: f64,
    /// Multiplies chiller power.
    pub pue_overhead: f64,
}

impl Default for HvacConfig {
    fn default() -> Self {
        Self {
            crac_supply_airflow_per_w: 0.000_056_63,
            crac_reference_airflow_per_w: 0.000_094_38,
            crac_fan_reference_power_w: 150.0,
            tower_fan_reference_power_w: 1000.0,
            tower_design_air_delta_c: 50.0,
            chilled_water_pump: PumpConfig::default(),
            condenser_water_pump: PumpConfig::default(),
            free_cooling_ambient_c: 5.0,
            cooling_efficiency_factor: 1.0,
            pue_overhead: 1.1,
        }
    }
}

/// HVAC power breakdown for one timestep (W).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HvacBreakdown {
    pub crac_fan_power_w: f64,
    pub tower_fan_power_w: f64,
    pub crac_cooling_load_w: f64,
    pub chiller_power_w: f64,
    pub chilled_water_pump_power_w: f64,
    pub condenser_water_pump_power_w: f64,
    /// Chiller operating point; its `power_w` excludes `pue_overhead`.
    pub chiller: ChillerOperation,
}

impl HvacBreakdown {
    /// Electrical draw of every component. `crac_cooling_load_w` is heat, not
    /// power, and is excluded.
    pub fn total_power_w(&self) -> f64 {
        self.crac_fan_power_w
            + self.tower_fan_power_w
            + self.chiller_power_w
            + self.chilled_water_pump_power_w
            + self.condenser_water_pump_power_w
    }

    /// Power counted by an air-cooled facility: CRAC fan plus chiller.
    pub fn air_cooled_power_w(&self) -> f64 {
        self.crac_fan_power_w + self.chiller_power_w
    }
}

/// Heat the CRAC units remove from the hall (W).
pub fn crac_cooling_load_w(
    mass_flow_kg_s: f64,
    avg_return_temp_c: f64,
    crac_setpoint_c: f64,
    air: &AirProperties,
    efficiency_factor: f64,
) -> f64 {
    mass_flow_kg_s
        * air.specific_heat_j_per_kg_k
        * (avg_return_temp_c - crac_setpoint_c).max(0.0)
        * efficiency_factor
}

/// Tower airflow needed to reject `load_w` (m³/s).
///
/// The air-side rise shrinks as ambient approaches the setpoint and is
/// floored at 1 °C.
pub fn tower_airflow_required_m3s(
    load_w: f64,
    ambient_temp_c: f64,
    crac_setpoint_c: f64,
    design_air_delta_c: f64,
    air: &AirProperties,
) -> f64 {
    let air_delta_c = (design_air_delta_c - (ambient_temp_c - crac_setpoint_c)).max(1.0);
    let mass_flow_kg_s = load_w.max(0.0) / (air.specific_heat_j_per_kg_k * air_delta_c);
    mass_flow_kg_s / air.density_kg_per_m3
}

/// Composes all HVAC components for one timestep.
#[derive(Debug, Clone)]
pub struct HvacModel {
    config: HvacConfig,
    air: AirProperties,
    chiller: ChillerModel,
}

impl HvacModel {
    pub fn new(config: HvacConfig, chiller: ChillerConfig, air: AirProperties) -> Self {
        Self {
            config,
            air,
            chiller: ChillerModel::new(chiller),
        }
    }

    pub fn config(&self) -> &HvacConfig {
        &self.config
    }

    pub fn chiller(&self) -> &ChillerModel {
        &self.chiller
    }

    /// CRAC supply mass flow for an IT load (kg/s).
    pub fn crac_mass_flow_kg_s(&self, total_it_load_w: f64) -> f64 {
        self.air.density_kg_per_m3 * self.config.crac_supply_airflow_per_w * total_it_load_w
    }

    /// CRAC cooling load for a return/supply pair at the given IT load (W).
    pub fn crac_cooling_load_w(
        &self,
        crac_setpoint_c: f64,
        avg_return_temp_c: f64,
        total_it_load_w: f64,
    ) -> f64 {
        crac_cooling_load_w(
            self.crac_mass_flow_kg_s(total_it_load_w),
            avg_return_temp_c,
            crac_setpoint_c,
            &self.air,
            self.config.cooling_efficiency_factor,
        )
    }

    /// Tower airflow for a cooling load (m³/s).
    pub fn tower_airflow_m3s(&self, load_w: f64, ambient_temp_c: f64, crac_setpoint_c: f64) -> f64 {
        tower_airflow_required_m3s(
            load_w,
            ambient_temp_c,
            crac_setpoint_c,
            self.config.tower_design_air_delta_c,
            &self.air,
        )
    }

    /// Evaluates all HVAC components.
    ///
    /// # Arguments
    ///
    /// * `crac_setpoint_c` - CRAC supply setpoint (°C)
    /// * `avg_return_temp_c` - Average CRAC return temperature (°C)
    /// * `ambient_temp_c` - Outdoor dry-bulb temperature (°C)
    /// * `total_it_load_w` - IT load, also the chiller's default nominal capacity (W)
    /// * `tower` - Reference airflow the tower fan is bounded by
    pub fn power(
        &self,
        crac_setpoint_c: f64,
        avg_return_temp_c: f64,
        ambient_temp_c: f64,
        total_it_load_w: f64,
        tower: &TowerSizing,
    ) -> HvacBreakdown {
        let c = &self.config;

        let crac_cooling_load_w =
            self.crac_cooling_load_w(crac_setpoint_c, avg_return_temp_c, total_it_load_w);

        let crac_fan_power_w = if c.crac_reference_airflow_per_w > 0.0 {
            fan_affinity_power(
                c.crac_fan_reference_power_w,
                c.crac_supply_airflow_per_w,
                c.crac_reference_airflow_per_w,
            )
        } else {
            0.0
        };

        let nominal_capacity_w = self
            .chiller
            .config()
            .nominal_capacity_w
            .unwrap_or(total_it_load_w);
        let chiller = self
            .chiller
            .operate(nominal_capacity_w, crac_cooling_load_w, ambient_temp_c);

        let free_cooling = ambient_temp_c < c.free_cooling_ambient_c;
        let (tower_fan_power_w, condenser_water_pump_power_w) = if free_cooling {
            (0.0, 0.0)
        } else {
            let airflow =
                self.tower_airflow_m3s(crac_cooling_load_w, ambient_temp_c, crac_setpoint_c);
            let ratio = if tower.reference_airflow_m3s > 0.0 {
                (airflow / tower.reference_airflow_m3s).min(1.0)
            } else {
                0.0
            };
            (
                fan_affinity_power(c.tower_fan_reference_power_w, ratio, 1.0),
                c.condenser_water_pump.power_w(),
            )
        };

        HvacBreakdown {
            crac_fan_power_w,
            tower_fan_power_w,
            crac_cooling_load_w,
            chiller_power_w: chiller.power_w * c.pue_overhead,
            chilled_water_pump_power_w: c.chilled_water_pump.power_w(),
            condenser_water_pump_power_w,
            chiller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> HvacModel {
        HvacModel::new(
            HvacConfig::default(),
            ChillerConfig::default(),
            AirProperties::default(),
        )
    }

    fn sizing(reference_airflow_m3s: f64) -> TowerSizing {
        TowerSizing {
            reference_airflow_m3s,
            rated_load_w: 0.0,
        }
    }

    #[test]
    fn pump_power_follows_hydraulic_relation() {
        let pump = PumpConfig::default();
        assert!((pump.power_w() - 300_000.0 * 0.0011 / 0.87).abs() < 1e-9);
        let broken = PumpConfig {
            efficiency: 0.0,
            ..pump
        };
        assert_eq!(broken.power_w(), 0.0);
    }

    #[test]
    fn cooling_load_is_zero_when_return_below_setpoint() {
        let hvac = model();
        let b = hvac.power(22.0, 21.0, 30.0, 1.0e5, &sizing(10.0));
        assert_eq!(b.crac_cooling_load_w, 0.0);
    }

    #[test]
    fn cooling_load_uses_mass_flow_and_delta() {
        let hvac = model();
        let it = 1.0e5;
        let b = hvac.power(20.0, 30.0, 30.0, it, &sizing(10.0));
        let air = AirProperties::default();
        let m = 1.225 * 0.000_056_63 * it;
        assert!((b.crac_cooling_load_w - m * air.specific_heat_j_per_kg_k * 10.0).abs() < 1e-6);
    }

    #[test]
    fn crac_fan_follows_affinity_ratio() {
        let b = model().power(20.0, 30.0, 30.0, 1.0e5, &sizing(10.0));
        let ratio: f64 = 0.000_056_63 / 0.000_094_38;
        assert!((b.crac_fan_power_w - 150.0 * ratio.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn chiller_power_includes_overhead() {
        let hvac = model();
        let b = hvac.power(20.0, 30.0, 30.0, 1.0e5, &sizing(10.0));
        let raw = hvac
            .chiller()
            .power_w(1.0e5, b.crac_cooling_load_w, 30.0);
        assert!((b.chiller_power_w - raw * 1.1).abs() < 1e-9);
    }

    #[test]
    fn free_cooling_turns_off_tower_side() {
        let b = model().power(20.0, 30.0, 2.0, 1.0e5, &sizing(10.0));
        assert_eq!(b.tower_fan_power_w, 0.0);
        assert_eq!(b.condenser_water_pump_power_w, 0.0);
        assert!(b.chilled_water_pump_power_w > 0.0);
    }

    #[test]
    fn tower_fan_bounded_by_reference_power() {
        let b = model().power(20.0, 40.0, 35.0, 1.0e7, &sizing(1e-6));
        assert!((b.tower_fan_power_w - 1000.0).abs() < 1e-9);
        let b = model().power(20.0, 40.0, 35.0, 1.0e7, &sizing(0.0));
        assert_eq!(b.tower_fan_power_w, 0.0);
    }

    #[test]
    fn tower_air_delta_floored() {
        let air = AirProperties::default();
        let v = tower_airflow_required_m3s(1232.35, 100.0, 20.0, 50.0, &air);
        assert!((v - 1232.35 / 1006.0 / 1.225).abs() < 1e-9);
    }

    #[test]
    fn total_excludes_cooling_load() {
        let b = HvacBreakdown {
            crac_fan_power_w: 1.0,
            tower_fan_power_w: 2.0,
            crac_cooling_load_w: 1000.0,
            chiller_power_w: 3.0,
            chilled_water_pump_power_w: 4.0,
            condenser_water_pump_power_w: 5.0,
            ..HvacBreakdown::default()
        };
        assert_eq!(b.total_power_w(), 15.0);
        assert_eq!(b.air_cooled_power_w(), 4.0);
    }
}
