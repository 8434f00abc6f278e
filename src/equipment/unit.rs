use super::types::{UnitCalibration, UnitSpec, clamp_utilization, fan_affinity_power};

/// Ratio curve that is linear in utilization and shifted additively by
/// inlet temperature.
///
/// `ratio(u, t) = slope * u + intercept + shift_max * w(u) * (t - t_ref) / 100`
///
/// `w(u)` is 1 for a uniform shift. A ramped curve scales the shift from 0 at
/// the lower utilization bound to 1 at the upper one, so the ratio at the
/// lower bound does not depend on inlet temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRatioCurve {
    pub slope: f64,
    /// Ratio at zero utilization and the reference temperature.
    pub intercept: f64,
    pub shift_max: f64,
    pub reference_temp_c: f64,
    /// Utilization span over which the temperature shift ramps in.
    pub shift_ramp: Option<[f64; 2]>,
}

impl LinearRatioCurve {
    /// Fits the line through `(u_lo, r_lo)` and `(u_hi, r_hi)` taken from
    /// the low-temperature end of the bounds. The calibration points are
    /// reproduced exactly at `reference_temp_c`.
    fn fit(
        lower: [f64; 2],
        shift_max: f64,
        utilization_bounds: [f64; 2],
        reference_temp_c: f64,
        shift_ramp: Option<[f64; 2]>,
    ) -> Self {
        let [u_lo, u_hi] = utilization_bounds;
        let slope = (lower[1] - lower[0]) / (u_hi - u_lo);
        Self {
            slope,
            intercept: lower[0] - slope * u_lo,
            shift_max,
            reference_temp_c,
            shift_ramp,
        }
    }

    fn shift_weight(&self, utilization: f64) -> f64 {
        match self.shift_ramp {
            Some([lo, hi]) => ((utilization - lo) / (hi - lo)).clamp(0.0, 1.0),
            None => 1.0,
        }
    }

    /// Evaluates the curve at a utilization fraction and inlet temperature.
    pub fn ratio(&self, utilization: f64, inlet_temp_c: f64) -> f64 {
        let shift = self.shift_max * (inlet_temp_c - self.reference_temp_c) / 100.0;
        self.slope * utilization + self.intercept + self.shift_weight(utilization) * shift
    }
}

/// Power and fan curves fitted from a [`UnitCalibration`].
///
/// The calibration table is shared facility-wide, so one set of curves
/// serves every unit; only the nameplate [`UnitSpec`] differs per unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCurves {
    pub power: LinearRatioCurve,
    pub fan: LinearRatioCurve,
    pub fan_reference_power_w: f64,
    pub fan_reference_ratio: f64,
    pub full_load_fan_airflow_m3s: f64,
}

impl UnitCurves {
    /// Fits both curves from the calibration table.
    ///
    /// The power curve's temperature shift ramps in over the utilization
    /// bounds. With a lower bound of zero, a unit at zero utilization draws
    /// exactly its idle power at any inlet temperature as long as
    /// `power_ratio_bounds.lower[0]` does not exceed its idle ratio.
    /// The fan curve shifts uniformly.
    ///
    /// # Panics
    ///
    /// Panics if the utilization bounds coincide or the fan reference
    /// ratio is not positive.
    pub fn from_calibration(calibration: &UnitCalibration) -> Self {
        let [u_lo, u_hi] = calibration.utilization_bounds;
        assert!(u_hi > u_lo, "utilization_bounds must be increasing");
        assert!(
            calibration.fan_reference_ratio > 0.0,
            "fan_reference_ratio must be > 0"
        );

        let reference_temp_c = calibration.reference_inlet_temp_c();
        let power_bounds = &calibration.power_ratio_bounds;
        let fan_bounds = &calibration.fan_airflow_ratio_bounds;

        Self {
            power: LinearRatioCurve::fit(
                power_bounds.lower,
                power_bounds.shift_max(),
                calibration.utilization_bounds,
                reference_temp_c,
                Some(calibration.utilization_bounds),
            ),
            fan: LinearRatioCurve::fit(
                fan_bounds.lower,
                fan_bounds.shift_max(),
                calibration.utilization_bounds,
                reference_temp_c,
                None,
            ),
            fan_reference_power_w: calibration.fan_reference_power_w,
            fan_reference_ratio: calibration.fan_reference_ratio,
            full_load_fan_airflow_m3s: calibration.full_load_fan_airflow_m3s,
        }
    }

    /// Power draw of a unit with the given nameplate at a shared power
    /// ratio. Idle power is a hard floor.
    #[inline]
    pub fn power_w(full_load_power_w: f64, idle_power_w: f64, power_ratio: f64) -> f64 {
        idle_power_w.max(full_load_power_w * power_ratio)
    }

    /// Fan airflow ratio, driven by the realized power ratio rather than
    /// the requested utilization. Never negative.
    #[inline]
    pub fn fan_ratio(&self, realized_power_ratio: f64, inlet_temp_c: f64) -> f64 {
        self.fan.ratio(realized_power_ratio, inlet_temp_c).max(0.0)
    }

    #[inline]
    pub fn fan_power_w(&self, fan_ratio: f64) -> f64 {
        fan_affinity_power(self.fan_reference_power_w, fan_ratio, self.fan_reference_ratio)
    }

    #[inline]
    pub fn fan_airflow_m3s(&self, fan_ratio: f64) -> f64 {
        fan_ratio * self.full_load_fan_airflow_m3s
    }
}

/// Instantaneous electrical and airflow output of one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitOutput {
    /// Compute power draw (W).
    pub power_w: f64,
    /// Fan power draw (W).
    pub fan_power_w: f64,
    /// Fan airflow ratio relative to full-load airflow.
    pub fan_velocity_ratio: f64,
    /// Fan airflow (m³/s).
    pub fan_airflow_m3s: f64,
}

/// Temperature-dependent power model of a single compute unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPowerModel {
    spec: UnitSpec,
    curves: UnitCurves,
}

impl UnitPowerModel {
    /// Creates a unit model, fitting its curves from the calibration table.
    pub fn new(spec: UnitSpec, calibration: &UnitCalibration) -> Self {
        Self::with_curves(spec, UnitCurves::from_calibration(calibration))
    }

    /// Creates a unit model from already-fitted curves.
    pub fn with_curves(spec: UnitSpec, curves: UnitCurves) -> Self {
        Self { spec, curves }
    }

    pub fn spec(&self) -> &UnitSpec {
        &self.spec
    }

    pub fn curves(&self) -> &UnitCurves {
        &self.curves
    }

    /// Evaluates the unit at an inlet temperature (°C) and utilization.
    ///
    /// Utilization outside `[0, 1]` is clamped before evaluation.
    pub fn evaluate(&self, inlet_temp_c: f64, utilization: f64) -> UnitOutput {
        let utilization = clamp_utilization(utilization);
        let ratio = self.curves.power.ratio(utilization, inlet_temp_c);
        let power_w =
            UnitCurves::power_w(self.spec.full_load_power_w, self.spec.idle_power_w, ratio);

        let fan_velocity_ratio = self
            .curves
            .fan_ratio(power_w / self.spec.full_load_power_w, inlet_temp_c);

        UnitOutput {
            power_w,
            fan_power_w: self.curves.fan_power_w(fan_velocity_ratio),
            fan_velocity_ratio,
            fan_airflow_m3s: self.curves.fan_airflow_m3s(fan_velocity_ratio),
        }
    }
}
