//! Rack assembly by bounded bin-fill and batched rack evaluation.

use log::debug;

use super::types::{UnitCalibration, UnitSpec, clamp_utilization};
use super::unit::{UnitCurves, UnitPowerModel};

/// Lower plausibility bound of a rack supply-approach temperature (°C).
pub const SUPPLY_APPROACH_MIN_C: f64 = 3.8;
/// Upper plausibility bound of a rack supply-approach temperature (°C).
pub const SUPPLY_APPROACH_MAX_C: f64 = 5.3;

/// Bounds a supply-approach temperature into the calibrated range.
pub fn clamp_supply_approach_temp(approach_c: f64) -> f64 {
    approach_c.clamp(SUPPLY_APPROACH_MIN_C, SUPPLY_APPROACH_MAX_C)
}

/// Result of filling a rack from an ordered list of unit specs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packing<'a> {
    /// Accepted units: the longest prefix that fits under the cap.
    pub accepted: &'a [UnitSpec],
    /// Summed full-load power of the accepted units (W).
    pub current_load_w: f64,
}

/// Fills a rack in order until the next unit would push the summed
/// full-load power above `cap_w`.
///
/// Filling stops at the first unit that does not fit; later, smaller
/// units are never considered.
pub fn pack_units(specs: &[UnitSpec], cap_w: f64) -> Packing<'_> {
    let mut current_load_w = 0.0;
    let mut count = 0;
    for spec in specs {
        let next = current_load_w + spec.full_load_power_w;
        if next > cap_w {
            break;
        }
        current_load_w = next;
        count += 1;
    }
    Packing {
        accepted: &specs[..count],
        current_load_w,
    }
}

/// Stable index of a unit inside its rack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// Rack-level output for one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RackOutput {
    /// Summed compute power (W).
    pub cpu_power_w: f64,
    /// Summed fan power (W).
    pub fan_power_w: f64,
    /// Summed fan airflow (m³/s).
    pub airflow_m3s: f64,
}

impl RackOutput {
    pub fn total_power_w(&self) -> f64 {
        self.cpu_power_w + self.fan_power_w
    }
}

/// A rack of compute units under a power cap.
///
/// Nameplate values are laid out as parallel arrays once at construction so
/// that evaluation is a single pass over contiguous memory. A unit's
/// [`UnitId`] is its index into these arrays.
#[derive(Debug, Clone)]
pub struct Rack {
    curves: UnitCurves,
    full_load_power_w: Vec<f64>,
    idle_power_w: Vec<f64>,
    max_power_w: f64,
    current_load_w: f64,
}

impl Rack {
    /// Builds a rack from unit specs in order, stopping at the first unit
    /// that would exceed `max_power_w`.
    ///
    /// # Panics
    ///
    /// Panics if `max_power_w` is negative or not finite.
    pub fn build(specs: &[UnitSpec], max_power_w: f64, calibration: &UnitCalibration) -> Self {
        assert!(
            max_power_w.is_finite() && max_power_w >= 0.0,
            "max_power_w must be finite and >= 0"
        );

        let packing = pack_units(specs, max_power_w);
        let curves = UnitCurves::from_calibration(calibration);

        debug!(
            "rack packed {}/{} units, {:.0} W of {:.0} W cap",
            packing.accepted.len(),
            specs.len(),
            packing.current_load_w,
            max_power_w
        );

        Self {
            curves,
            full_load_power_w: packing.accepted.iter().map(|s| s.full_load_power_w).collect(),
            idle_power_w: packing.accepted.iter().map(|s| s.idle_power_w).collect(),
            max_power_w,
            current_load_w: packing.current_load_w,
        }
    }

    /// Number of units in the rack.
    pub fn len(&self) -> usize {
        self.full_load_power_w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.full_load_power_w.is_empty()
    }

    /// Summed full-load power of the installed units (W).
    pub fn current_load_w(&self) -> f64 {
        self.current_load_w
    }

    /// Power cap the rack was filled against (W).
    pub fn max_power_w(&self) -> f64 {
        self.max_power_w
    }

    /// Model of the unit with the given id, sharing the rack's curves.
    pub fn unit(&self, id: UnitId) -> Option<UnitPowerModel> {
        let full_load_power_w = *self.full_load_power_w.get(id.0)?;
        let idle_power_w = self.idle_power_w[id.0];
        let spec = UnitSpec {
            full_load_power_w,
            idle_power_w,
        };
        Some(UnitPowerModel::with_curves(spec, self.curves))
    }

    /// Iterates over unit models with their stable ids.
    pub fn units(&self) -> impl Iterator<Item = (UnitId, UnitPowerModel)> {
        (0..self.len()).filter_map(|i| self.unit(UnitId(i)).map(|u| (UnitId(i), u)))
    }

    /// Evaluates every unit of the rack at one inlet temperature and
    /// utilization in a single batched pass.
    pub fn evaluate(&self, inlet_temp_c: f64, utilization: f64) -> RackOutput {
        let utilization = clamp_utilization(utilization);
        let ratio = self.curves.power.ratio(utilization, inlet_temp_c);

        self.full_load_power_w
            .iter()
            .zip(&self.idle_power_w)
            .fold(RackOutput::default(), |mut acc, (&full, &idle)| {
                let power = UnitCurves::power_w(full, idle, ratio);
                let fan_ratio = self.curves.fan_ratio(power / full, inlet_temp_c);
                acc.cpu_power_w += power;
                acc.fan_power_w += self.curves.fan_power_w(fan_ratio);
                acc.airflow_m3s += self.curves.fan_airflow_m3s(fan_ratio);
                acc
            })
    }
}
