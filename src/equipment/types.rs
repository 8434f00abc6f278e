//! Unit specifications and the shared calibration table for unit power curves.

use log::debug;
use serde::Deserialize;

/// Nameplate power of one compute unit.
///
/// # Fields
/// * `full_load_power_w` - Power draw at full utilization and reference inlet temperature (W)
/// * `idle_power_w` - Power floor the unit never drops below (W)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitSpec {
    pub full_load_power_w: f64,
    pub idle_power_w: f64,
}

impl UnitSpec {
    /// Creates a new unit spec.
    ///
    /// # Panics
    ///
    /// Panics if `full_load_power_w` is not positive or `idle_power_w` is
    /// outside `[0, full_load_power_w]`.
    pub fn new(full_load_power_w: f64, idle_power_w: f64) -> Self {
        assert!(full_load_power_w > 0.0, "full_load_power_w must be > 0");
        assert!(
            (0.0..=full_load_power_w).contains(&idle_power_w),
            "idle_power_w must be in [0, full_load_power_w]"
        );
        Self {
            full_load_power_w,
            idle_power_w,
        }
    }
}

impl Default for UnitSpec {
    fn default() -> Self {
        Self {
            full_load_power_w: 500.0,
            idle_power_w: 100.0,
        }
    }
}

/// Ratio calibration points at the two ends of the inlet-temperature range.
///
/// Each pair holds the ratio at the lower and upper utilization bound.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatioBounds {
    /// Ratios at `(min, max)` utilization, low end of the inlet range.
    pub lower: [f64; 2],
    /// Ratios at `(min, max)` utilization, high end of the inlet range.
    pub upper: [f64; 2],
}

impl RatioBounds {
    /// Largest additional shift the ratio may take from inlet temperature.
    pub fn shift_max(&self) -> f64 {
        self.upper[1] - self.lower[1]
    }
}

/// Calibration table shared by every unit in the facility.
///
/// Curves are fitted once from this table when a unit or rack is built
/// and never refitted afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitCalibration {
    /// Utilization fractions at which the ratio bounds were measured.
    pub utilization_bounds: [f64; 2],
    /// Power ratio (power / full-load power) calibration.
    pub power_ratio_bounds: RatioBounds,
    /// Fan airflow ratio calibration.
    pub fan_airflow_ratio_bounds: RatioBounds,
    /// Inlet temperature range of the calibration study (°C). The low end
    /// is the reference temperature of the fitted curves.
    pub inlet_temp_range: [f64; 2],
    /// Fan power at the reference airflow ratio (W).
    pub fan_reference_power_w: f64,
    /// Airflow ratio at which `fan_reference_power_w` was measured.
    pub fan_reference_ratio: f64,
    /// Fan airflow at an airflow ratio of 1.0 (m³/s).
    pub full_load_fan_airflow_m3s: f64,
}

impl Default for UnitCalibration {
    fn default() -> Self {
        Self {
            utilization_bounds: [0.0, 1.0],
            power_ratio_bounds: RatioBounds {
                lower: [0.0, 1.0],
                upper: [0.05, 1.05],
            },
            fan_airflow_ratio_bounds: RatioBounds {
                lower: [0.25, 0.80],
                upper: [0.27, 0.82],
            },
            inlet_temp_range: [18.0, 27.0],
            fan_reference_power_w: 20.0,
            fan_reference_ratio: 1.0,
            full_load_fan_airflow_m3s: 0.05,
        }
    }
}

impl UnitCalibration {
    /// Reference inlet temperature of the fitted curves (°C).
    pub fn reference_inlet_temp_c(&self) -> f64 {
        self.inlet_temp_range[0]
    }

    /// Power ratio of the fitted curve at zero utilization. Units whose idle
    /// ratio is below this do not draw exactly idle power when unloaded.
    pub fn zero_utilization_power_ratio(&self) -> f64 {
        let [u_lo, u_hi] = self.utilization_bounds;
        let [r_lo, r_hi] = self.power_ratio_bounds.lower;
        r_lo - (r_hi - r_lo) / (u_hi - u_lo) * u_lo
    }
}

/// Fan affinity (cube) law: power scales with the cube of the airflow ratio.
pub fn fan_affinity_power(reference_power_w: f64, ratio: f64, reference_ratio: f64) -> f64 {
    reference_power_w * (ratio / reference_ratio).powi(3)
}

/// Bounds a requested utilization into `[0, 1]`.
pub fn clamp_utilization(utilization: f64) -> f64 {
    let clamped = utilization.clamp(0.0, 1.0);
    if clamped != utilization {
        debug!("utilization {utilization} clamped to {clamped}");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_spec_new() {
        let spec = UnitSpec::new(500.0, 100.0);
        assert_eq!(spec.full_load_power_w, 500.0);
        assert_eq!(spec.idle_power_w, 100.0);
    }

    #[test]
    #[should_panic]
    fn unit_spec_rejects_idle_above_full() {
        UnitSpec::new(100.0, 200.0);
    }

    #[test]
    #[should_panic]
    fn unit_spec_rejects_zero_full_load() {
        UnitSpec::new(0.0, 0.0);
    }

    #[test]
    fn shift_max_is_full_load_difference() {
        let cal = UnitCalibration::default();
        assert!((cal.power_ratio_bounds.shift_max() - 0.05).abs() < 1e-12);
        assert!((cal.fan_airflow_ratio_bounds.shift_max() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn zero_utilization_ratio_extrapolates_lower_bound() {
        assert_eq!(UnitCalibration::default().zero_utilization_power_ratio(), 0.0);
        let cal = UnitCalibration {
            utilization_bounds: [0.2, 1.0],
            power_ratio_bounds: RatioBounds {
                lower: [0.3, 1.0],
                upper: [0.35, 1.05],
            },
            ..UnitCalibration::default()
        };
        assert!((cal.zero_utilization_power_ratio() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn fan_affinity_is_cubic() {
        assert_eq!(fan_affinity_power(20.0, 1.0, 1.0), 20.0);
        assert!((fan_affinity_power(20.0, 0.5, 1.0) - 2.5).abs() < 1e-12);
        assert!((fan_affinity_power(8.0, 1.0, 0.5) - 64.0).abs() < 1e-12);
    }

    #[test]
    fn utilization_clamps_to_unit_interval() {
        assert_eq!(clamp_utilization(-0.2), 0.0);
        assert_eq!(clamp_utilization(1.7), 1.0);
        assert_eq!(clamp_utilization(0.4), 0.4);
    }
}
