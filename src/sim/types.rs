//! Core simulation types: timing, shared physical constants, step data and diagnostics.

use std::fmt;

use serde::Deserialize;

use crate::cooling::hvac::HvacBreakdown;
use crate::cooling::tower::WaterUse;

/// Centralized simulation timing.
///
/// # Examples
///
/// ```
/// use datacenter_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(96, 1);
/// assert_eq!(cfg.dt_hours, 0.25);
/// assert_eq!(cfg.interval_minutes(), 15.0);
/// assert_eq!(cfg.total_steps(), 96);
/// ```
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of simulation steps per day.
    pub steps_per_day: usize,
    /// Number of days to simulate.
    pub days: usize,
    /// Duration of one timestep in hours, derived as `24.0 / steps_per_day`.
    pub dt_hours: f64,
}

impl SimConfig {
    /// Creates a new simulation configuration.
    ///
    /// # Panics
    ///
    /// Panics if `steps_per_day` or `days` is zero.
    pub fn new(steps_per_day: usize, days: usize) -> Self {
        assert!(steps_per_day > 0, "steps_per_day must be > 0");
        assert!(days > 0, "days must be > 0");
        Self {
            steps_per_day,
            days,
            dt_hours: 24.0 / steps_per_day as f64,
        }
    }

    /// Total number of simulation steps across all days.
    pub fn total_steps(&self) -> usize {
        self.steps_per_day * self.days
    }

    /// Length of one timestep in minutes.
    pub fn interval_minutes(&self) -> f64 {
        self.dt_hours * 60.0
    }
}

/// Physical properties of air shared by the thermal and HVAC models.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AirProperties {
    /// Specific heat capacity (J/(kg·K)).
    pub specific_heat_j_per_kg_k: f64,
    /// Density (kg/m³).
    pub density_kg_per_m3: f64,
}

impl Default for AirProperties {
    fn default() -> Self {
        Self {
            specific_heat_j_per_kg_k: 1006.0,
            density_kg_per_m3: 1.225,
        }
    }
}

impl AirProperties {
    /// Heat capacity flow of an airstream (W/K).
    pub fn heat_capacity_flow_w_per_k(&self, airflow_m3s: f64) -> f64 {
        self.specific_heat_j_per_kg_k * self.density_kg_per_m3 * airflow_m3s
    }
}

/// Heat rejection arrangement of the facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoolingType {
    /// CRAC units with an air-cooled chiller; no tower, no water use.
    Air,
    /// Water-cooled chiller rejecting heat through an evaporative tower.
    Water,
}

impl fmt::Display for CoolingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Air => write!(f, "air"),
            Self::Water => write!(f, "water"),
        }
    }
}

/// Non-fatal condition raised while evaluating a timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Diagnostic {
    /// Rack outlet above the plausibility limit; value left unchanged.
    OutletOverTemperature { rack: usize, outlet_temp_c: f64 },
    /// Outlet-inlet rise below the floor; outlet raised to the floor.
    OutletDeltaClamped { rack: usize, raw_delta_c: f64 },
    /// Outlet-inlet rise in the advisory band; value left unchanged.
    LowOutletDelta { rack: usize, delta_c: f64 },
    /// Required load exceeded the chiller's maximum part-load ratio.
    ChillerAtMaxPartLoad { requested_ratio: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutletOverTemperature {
                rack,
                outlet_temp_c,
            } => write!(f, "rack {rack}: outlet {outlet_temp_c:.2} °C above limit"),
            Self::OutletDeltaClamped { rack, raw_delta_c } => {
                write!(f, "rack {rack}: outlet rise {raw_delta_c:.2} °C raised to floor")
            }
            Self::LowOutletDelta { rack, delta_c } => {
                write!(f, "rack {rack}: low outlet rise {delta_c:.2} °C")
            }
            Self::ChillerAtMaxPartLoad { requested_ratio } => {
                write!(f, "chiller saturated, requested part-load ratio {requested_ratio:.3}")
            }
        }
    }
}

/// External drivers for one timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInput {
    /// Timestep index.
    pub timestep: usize,
    /// Utilization per rack, fraction in `[0, 1]`.
    pub utilization: Vec<f64>,
    /// Outdoor dry-bulb temperature (°C).
    pub ambient_temp_c: f64,
    /// Outdoor wet-bulb temperature (°C); the tower default applies if `None`.
    pub wet_bulb_temp_c: Option<f64>,
    /// CRAC supply setpoint (°C); the setpoint policy applies if `None`.
    pub crac_setpoint_c: Option<f64>,
}

impl StepInput {
    /// Creates an input with the same utilization on every rack.
    pub fn uniform(
        timestep: usize,
        num_racks: usize,
        utilization: f64,
        ambient_temp_c: f64,
    ) -> Self {
        Self {
            timestep,
            utilization: vec![utilization; num_racks],
            ambient_temp_c,
            wet_bulb_temp_c: None,
            crac_setpoint_c: None,
        }
    }

    /// Fixes the CRAC setpoint for this step.
    pub fn with_setpoint(mut self, crac_setpoint_c: f64) -> Self {
        self.crac_setpoint_c = Some(crac_setpoint_c);
        self
    }

    /// Sets the outdoor wet-bulb temperature for this step.
    pub fn with_wet_bulb(mut self, wet_bulb_temp_c: f64) -> Self {
        self.wet_bulb_temp_c = Some(wet_bulb_temp_c);
        self
    }
}

/// Complete record of one facility timestep.
///
/// Facility-level powers and water use include the capacity scaling
/// factor. Rack-level values, `it_load_w` and `hvac` are unscaled.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Timestep index.
    pub timestep: usize,
    /// Simulation time in hours.
    pub time_hr: f64,
    /// Outdoor dry-bulb temperature (°C).
    pub ambient_temp_c: f64,
    /// CRAC supply setpoint in effect (°C).
    pub crac_setpoint_c: f64,
    /// Mean rack utilization after clamping to `[0, 1]`.
    pub mean_utilization: f64,
    /// Compute power per rack (W).
    pub rack_cpu_power_w: Vec<f64>,
    /// Fan power per rack (W).
    pub rack_fan_power_w: Vec<f64>,
    /// Outlet temperature per rack (°C).
    pub rack_outlet_temp_c: Vec<f64>,
    /// Average CRAC return temperature (°C).
    pub avg_return_temp_c: f64,
    /// Aggregate IT load of the modeled racks (W).
    pub it_load_w: f64,
    /// HVAC component breakdown before scaling (W).
    pub hvac: HvacBreakdown,
    /// IT power (W).
    pub it_power_w: f64,
    /// Cooling power counted for the facility's cooling type (W).
    pub cooling_power_w: f64,
    /// Miscellaneous facility load on top of IT and cooling (W).
    pub overhead_power_w: f64,
    /// IT, cooling and overhead power (W).
    pub total_power_w: f64,
    /// Power usage effectiveness for this step.
    pub pue: f64,
    /// Cooling-tower water consumed during this step (L).
    pub water: WaterUse,
    /// Non-fatal conditions raised during this step.
    pub diagnostics: Vec<Diagnostic>,
}

impl StepResult {
    /// Hottest rack outlet (°C), or `NaN` for a facility without racks.
    pub fn max_outlet_temp_c(&self) -> f64 {
        self.rack_outlet_temp_c
            .iter()
            .copied()
            .fold(f64::NAN, f64::max)
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} ({:>6.2}h) | amb={:>5.1} °C  set={:>4.1} °C  ret={:>5.1} °C | \
             it={:>9.1} kW  cool={:>8.1} kW  pue={:.3} | water={:.1} L  diag={}",
            self.timestep,
            self.time_hr,
            self.ambient_temp_c,
            self.crac_setpoint_c,
            self.avg_return_temp_c,
            self.it_power_w / 1000.0,
            self.cooling_power_w / 1000.0,
            self.pue,
            self.water.total_l(),
            self.diagnostics.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_config_quarter_hour() {
        let cfg = SimConfig::new(96, 1);
        assert_eq!(cfg.steps_per_day, 96);
        assert_eq!(cfg.dt_hours, 0.25);
        assert_eq!(cfg.interval_minutes(), 15.0);
    }

    #[test]
    fn sim_config_multi_day() {
        let cfg = SimConfig::new(24, 3);
        assert_eq!(cfg.total_steps(), 72);
        assert_eq!(cfg.dt_hours, 1.0);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_steps_panics() {
        SimConfig::new(0, 1);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_days_panics() {
        SimConfig::new(96, 0);
    }

    #[test]
    fn heat_capacity_flow() {
        let air = AirProperties::default();
        assert!((air.heat_capacity_flow_w_per_k(1.0) - 1232.35).abs() < 1e-9);
    }

    #[test]
    fn step_input_builders() {
        let input = StepInput::uniform(3, 4, 0.5, 30.0)
            .with_setpoint(20.0)
            .with_wet_bulb(21.0);
        assert_eq!(input.utilization, vec![0.5; 4]);
        assert_eq!(input.crac_setpoint_c, Some(20.0));
        assert_eq!(input.wet_bulb_temp_c, Some(21.0));
    }

    #[test]
    fn diagnostics_display_does_not_panic() {
        let all = [
            Diagnostic::OutletOverTemperature {
                rack: 0,
                outlet_temp_c: 61.0,
            },
            Diagnostic::OutletDeltaClamped {
                rack: 1,
                raw_delta_c: 0.4,
            },
            Diagnostic::LowOutletDelta {
                rack: 2,
                delta_c: 1.5,
            },
            Diagnostic::ChillerAtMaxPartLoad {
                requested_ratio: 1.3,
            },
        ];
        for d in all {
            assert!(!format!("{d}").is_empty());
        }
    }
}
