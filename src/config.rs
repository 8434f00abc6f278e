//! TOML-based scenario configuration and preset definitions.

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::cooling::{
    ChillerConfig, CoolingTowerConfig, CoolingTowerSizer, CoolingTowerState, HvacConfig,
    HvacModel, PumpConfig, TowerSizing, WaterModel,
};
use crate::datacenter::{DatacenterModel, RackLayout, ThermalConfig};
use crate::equipment::{UnitCalibration, UnitSpec};
use crate::sim::engine::Engine;
use crate::sim::schedule::{DailyWorkload, SetpointPolicy, diurnal_ambient_c};
use crate::sim::types::{AirProperties, CoolingType, SimConfig, StepInput};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Facility-wide settings.
    #[serde(default)]
    pub site: SiteConfig,
    /// Unit power-curve calibration.
    #[serde(default)]
    pub units: UnitCalibration,
    /// Rack layout and approach temperatures.
    #[serde(default)]
    pub racks: RackLayout,
    /// Outlet-temperature correlation.
    #[serde(default)]
    pub thermal: ThermalConfig,
    /// HVAC constants.
    #[serde(default)]
    pub hvac: HvacConfig,
    /// Chiller curves.
    #[serde(default)]
    pub chiller: ChillerConfig,
    /// Cooling tower water side and sizing.
    #[serde(default)]
    pub cooling_tower: CoolingTowerConfig,
}

/// Simulation timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of timesteps per simulated day (must be > 0).
    pub steps_per_day: usize,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps_per_day: 96,
            days: 1,
        }
    }
}

/// Facility-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// `"air"` or `"water"`.
    pub cooling_type: CoolingType,
    /// Target IT capacity (MW); results are scaled to it when set.
    pub capacity_mw: Option<f64>,
    /// Mean outdoor temperature of the synthetic weather (°C).
    pub ambient_mean_c: f64,
    /// Half the daily outdoor temperature swing (°C).
    pub ambient_swing_c: f64,
    /// Multiplier on the counted cooling power.
    pub cooling_power_factor: f64,
    /// Multiplier on IT plus cooling power for lighting, distribution
    /// losses and other miscellaneous loads (>= 1).
    pub facility_overhead: f64,
    /// CRAC setpoint policy used when a step carries no setpoint.
    pub setpoint: SetpointPolicy,
    pub air: AirProperties,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            cooling_type: CoolingType::Air,
            capacity_mw: None,
            ambient_mean_c: 25.0,
            ambient_swing_c: 5.0,
            cooling_power_factor: 1.0,
            facility_overhead: 1.1,
            setpoint: SetpointPolicy::default(),
            air: AirProperties::default(),
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.steps_per_day"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl Error for ConfigError {}

impl ScenarioConfig {
    /// Returns the baseline scenario: ten air-cooled racks of 500 W units.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the water-cooled preset: evaporative tower, scaled to 5 MW.
    pub fn water_cooled() -> Self {
        Self {
            site: SiteConfig {
                cooling_type: CoolingType::Water,
                capacity_mw: Some(5.0),
                ..SiteConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the high-density preset: twenty 30 kW racks of 800 W units in
    /// a hot climate.
    pub fn high_density() -> Self {
        let num_racks = 20;
        Self {
            site: SiteConfig {
                cooling_type: CoolingType::Water,
                ambient_mean_c: 32.0,
                ambient_swing_c: 6.0,
                ..SiteConfig::default()
            },
            racks: RackLayout {
                num_racks,
                units_per_rack: 40,
                unit: UnitSpec::new(800.0, 150.0),
                max_power_per_rack_w: 30_000.0,
                supply_approach_temps_c: vec![5.0; num_racks],
                return_approach_temps_c: vec![-1.0; num_racks],
            },
            hvac: HvacConfig {
                chilled_water_pump: PumpConfig {
                    flow_rate_m3s: 0.0022,
                    ..PumpConfig::default()
                },
                condenser_water_pump: PumpConfig {
                    flow_rate_m3s: 0.0022,
                    ..PumpConfig::default()
                },
                ..HvacConfig::default()
            },
            cooling_tower: CoolingTowerConfig {
                flow_rate_l_per_min: 132.0,
                default_wet_bulb_temp_c: 24.0,
                ..CoolingTowerConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "water_cooled", "high_density"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "water_cooled" => Ok(Self::water_cooled()),
            "high_density" => Ok(Self::high_density()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |ok: bool, field: &str, message: &str| {
            if !ok {
                errors.push(ConfigError::new(field, message));
            }
        };

        let s = &self.simulation;
        check(s.steps_per_day > 0, "simulation.steps_per_day", "must be > 0");
        check(s.days > 0, "simulation.days", "must be > 0");

        let site = &self.site;
        check(
            site.capacity_mw.is_none_or(|mw| mw > 0.0),
            "site.capacity_mw",
            "must be > 0 when set",
        );
        check(
            site.cooling_power_factor >= 0.0,
            "site.cooling_power_factor",
            "must be >= 0",
        );
        check(
            site.facility_overhead >= 1.0,
            "site.facility_overhead",
            "must be >= 1",
        );
        check(
            site.setpoint.min_setpoint_c <= site.setpoint.max_setpoint_c,
            "site.setpoint.min_setpoint_c",
            "must be <= site.setpoint.max_setpoint_c",
        );
        check(
            site.air.specific_heat_j_per_kg_k > 0.0,
            "site.air.specific_heat_j_per_kg_k",
            "must be > 0",
        );
        check(
            site.air.density_kg_per_m3 > 0.0,
            "site.air.density_kg_per_m3",
            "must be > 0",
        );

        let u = &self.units;
        check(
            u.utilization_bounds[0] < u.utilization_bounds[1],
            "units.utilization_bounds",
            "must be increasing",
        );
        check(
            u.utilization_bounds[0] >= 0.0,
            "units.utilization_bounds",
            "lower bound must be >= 0",
        );
        check(
            u.inlet_temp_range[0] < u.inlet_temp_range[1],
            "units.inlet_temp_range",
            "must be increasing",
        );
        check(
            u.fan_reference_ratio > 0.0,
            "units.fan_reference_ratio",
            "must be > 0",
        );
        check(
            u.fan_reference_power_w >= 0.0,
            "units.fan_reference_power_w",
            "must be >= 0",
        );

        let r = &self.racks;
        check(r.num_racks > 0, "racks.num_racks", "must be > 0");
        check(
            r.unit.full_load_power_w > 0.0,
            "racks.unit.full_load_power_w",
            "must be > 0",
        );
        check(
            (0.0..=r.unit.full_load_power_w).contains(&r.unit.idle_power_w),
            "racks.unit.idle_power_w",
            "must be in [0, racks.unit.full_load_power_w]",
        );
        if u.utilization_bounds[0] < u.utilization_bounds[1] && r.unit.full_load_power_w > 0.0 {
            check(
                u.zero_utilization_power_ratio() <= r.unit.idle_power_w / r.unit.full_load_power_w,
                "units.power_ratio_bounds.lower",
                "zero-utilization power ratio must not exceed racks.unit idle ratio",
            );
        }
        check(
            r.max_power_per_rack_w.is_finite() && r.max_power_per_rack_w >= 0.0,
            "racks.max_power_per_rack_w",
            "must be finite and >= 0",
        );
        check(
            r.supply_approach_temps_c.len() == r.num_racks,
            "racks.supply_approach_temps_c",
            "must have one entry per rack",
        );
        check(
            r.return_approach_temps_c.len() == r.num_racks,
            "racks.return_approach_temps_c",
            "must have one entry per rack",
        );

        let t = &self.thermal;
        check(
            t.min_outlet_delta_c <= t.low_outlet_delta_c,
            "thermal.min_outlet_delta_c",
            "must be <= thermal.low_outlet_delta_c",
        );

        let h = &self.hvac;
        for (field, pump) in [
            ("hvac.chilled_water_pump.efficiency", &h.chilled_water_pump),
            ("hvac.condenser_water_pump.efficiency", &h.condenser_water_pump),
        ] {
            check(pump.efficiency > 0.0, field, "must be > 0");
        }
        check(h.pue_overhead > 0.0, "hvac.pue_overhead", "must be > 0");
        check(
            h.cooling_efficiency_factor >= 0.0,
            "hvac.cooling_efficiency_factor",
            "must be >= 0",
        );

        let c = &self.chiller;
        check(c.rated_cop > 0.0, "chiller.rated_cop", "must be > 0");
        check(
            c.temp_rise_coefficient > 0.0,
            "chiller.temp_rise_coefficient",
            "must be > 0",
        );
        check(
            c.min_part_load_ratio > 0.0 && c.min_part_load_ratio <= c.max_part_load_ratio,
            "chiller.min_part_load_ratio",
            "must be > 0 and <= chiller.max_part_load_ratio",
        );
        check(
            c.nominal_capacity_w.is_none_or(|w| w > 0.0),
            "chiller.nominal_capacity_w",
            "must be > 0 when set",
        );

        let ct = &self.cooling_tower;
        check(
            ct.cycles_of_concentration > 1.0,
            "cooling_tower.cycles_of_concentration",
            "must be > 1",
        );
        check(
            (0.0..=1.0).contains(&ct.drift_rate),
            "cooling_tower.drift_rate",
            "must be in [0.0, 1.0]",
        );
        check(
            ct.flow_rate_l_per_min >= 0.0,
            "cooling_tower.flow_rate_l_per_min",
            "must be >= 0",
        );
        check(
            ct.sizing.min_setpoint_c <= ct.sizing.max_setpoint_c,
            "cooling_tower.sizing.min_setpoint_c",
            "must be <= cooling_tower.sizing.max_setpoint_c",
        );
        check(
            ct.reference_airflow_m3s.is_none_or(|v| v > 0.0),
            "cooling_tower.reference_airflow_m3s",
            "must be > 0 when set",
        );

        errors
    }

    /// Simulation timing for this scenario.
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` or `days` is zero.
    pub fn sim_config(&self) -> SimConfig {
        SimConfig::new(self.simulation.steps_per_day, self.simulation.days)
    }

    /// Validates the scenario and assembles a ready-to-run engine.
    ///
    /// The cooling tower is sized once here unless
    /// `cooling_tower.reference_airflow_m3s` overrides it.
    ///
    /// # Errors
    ///
    /// Returns every validation error if the scenario is invalid.
    pub fn build_engine(&self) -> Result<Engine, Vec<ConfigError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }

        let sim = self.sim_config();
        let air = self.site.air;
        let datacenter =
            DatacenterModel::from_layout(&self.racks, &self.units, self.thermal.clone(), air);
        let hvac = HvacModel::new(self.hvac.clone(), self.chiller.clone(), air);

        let tower_sizing = match self.cooling_tower.reference_airflow_m3s {
            Some(reference_airflow_m3s) => TowerSizing {
                reference_airflow_m3s,
                rated_load_w: datacenter.total_full_load_w(),
            },
            None => CoolingTowerSizer::size(&datacenter, &hvac, &self.cooling_tower.sizing),
        };

        let water = WaterModel::new(
            self.cooling_tower.evaporation_coefficient_per_c,
            sim.interval_minutes(),
        );

        let engine = Engine::new(
            sim,
            datacenter,
            hvac,
            tower_sizing,
            CoolingTowerState::from_config(&self.cooling_tower),
            water,
            self.site.cooling_type,
            self.site.setpoint,
        )
        .with_facility_factors(self.site.cooling_power_factor, self.site.facility_overhead);
        Ok(match self.site.capacity_mw {
            Some(mw) => engine.with_capacity_mw(mw),
            None => engine,
        })
    }

    /// Synthetic inputs for the whole horizon: daily workload profile on
    /// every rack under diurnal outdoor temperature.
    pub fn step_inputs(&self) -> Vec<StepInput> {
        let (mean, swing) = (self.site.ambient_mean_c, self.site.ambient_swing_c);
        DailyWorkload::step_inputs(&self.sim_config(), self.racks.num_racks, |hour| {
            diurnal_ambient_c(hour, mean, swing)
        })
    }
}
