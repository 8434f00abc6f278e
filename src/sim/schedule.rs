//! Setpoint policy and synthetic workload profiles for building step inputs.

use std::f64::consts::PI;

use serde::Deserialize;

use super::types::{SimConfig, StepInput};

/// CRAC setpoint that tracks outdoor temperature within fixed bounds.
///
/// `setpoint = clamp(base + gain·(ambient − reference), min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetpointPolicy {
    pub base_setpoint_c: f64,
    pub reference_ambient_c: f64,
    pub gain: f64,
    pub min_setpoint_c: f64,
    pub max_setpoint_c: f64,
}

impl Default for SetpointPolicy {
    fn default() -> Self {
        Self {
            base_setpoint_c: 18.0,
            reference_ambient_c: 20.0,
            gain: 0.2,
            min_setpoint_c: 16.0,
            max_setpoint_c: 22.0,
        }
    }
}

impl SetpointPolicy {
    /// Fixed setpoint regardless of ambient.
    pub fn fixed(setpoint_c: f64) -> Self {
        Self {
            base_setpoint_c: setpoint_c,
            reference_ambient_c: 0.0,
            gain: 0.0,
            min_setpoint_c: setpoint_c,
            max_setpoint_c: setpoint_c,
        }
    }

    pub fn setpoint_c(&self, ambient_temp_c: f64) -> f64 {
        (self.base_setpoint_c + self.gain * (ambient_temp_c - self.reference_ambient_c))
            .clamp(self.min_setpoint_c, self.max_setpoint_c)
    }
}

/// Business-hours utilization profile repeating every 24 hours.
#[derive(Debug, Default, Clone, Copy)]
pub struct DailyWorkload;

impl DailyWorkload {
    /// Utilization at hour-of-day `hour` (wraps past 24).
    ///
    /// Daytime (08:00-20:00) peaks at 0.9 around 14:00; the night floor
    /// peaks at 0.5 around 02:00.
    pub fn utilization(hour: f64) -> f64 {
        let h = hour.rem_euclid(24.0);
        if (8.0..20.0).contains(&h) {
            0.7 + 0.2 * (PI * (h - 8.0) / 12.0).sin()
        } else {
            let since = (h - 20.0).rem_euclid(24.0);
            0.4 + 0.1 * (PI * since / 12.0).sin()
        }
    }

    /// Builds one input per simulated step with every rack at the profile's
    /// utilization.
    ///
    /// # Arguments
    ///
    /// * `sim` - Simulation timing
    /// * `num_racks` - Racks in the facility
    /// * `ambient_temp_c` - Outdoor temperature as a function of simulation hour
    pub fn step_inputs(
        sim: &SimConfig,
        num_racks: usize,
        ambient_temp_c: impl Fn(f64) -> f64,
    ) -> Vec<StepInput> {
        (0..sim.total_steps())
            .map(|t| {
                let hour = t as f64 * sim.dt_hours;
                StepInput::uniform(t, num_racks, Self::utilization(hour), ambient_temp_c(hour))
            })
            .collect()
    }
}

/// Sinusoidal outdoor temperature: coolest at 05:00, warmest at 17:00.
pub fn diurnal_ambient_c(hour: f64, mean_c: f64, swing_c: f64) -> f64 {
    mean_c - swing_c * (PI * (hour - 5.0) / 12.0).cos()
}
