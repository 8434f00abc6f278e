//! Electric chiller power from the three-curve (capacity, power, part-load)
//! empirical method.

use log::debug;
use serde::Deserialize;

/// Evaluates `c[0] + c[1]·x + c[2]·x²`.
pub fn quadratic(coefficients: &[f64; 3], x: f64) -> f64 {
    coefficients[0] + coefficients[1] * x + coefficients[2] * x * x
}

/// Chiller calibration. Static once built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChillerConfig {
    /// Rated cooling capacity (W). When unset the facility's total IT load
    /// is used as nominal capacity.
    pub nominal_capacity_w: Option<f64>,
    /// Design condenser entering temperature (°C).
    pub design_condenser_temp_c: f64,
    /// Design chilled-water leaving temperature (°C).
    pub design_evaporator_outlet_temp_c: f64,
    /// Chilled-water leaving temperature in operation (°C).
    pub evaporator_outlet_temp_c: f64,
    /// Normalizes the condenser temperature deviation (°C).
    pub temp_rise_coefficient: f64,
    pub rated_cop: f64,
    pub min_part_load_ratio: f64,
    pub max_part_load_ratio: f64,
    /// Available capacity ratio vs. temperature delta.
    pub capacity_ratio_coefficients: [f64; 3],
    /// Full-load power ratio vs. available capacity ratio.
    pub power_ratio_coefficients: [f64; 3],
    /// Full-load factor vs. part-load ratio.
    pub full_load_factor_coefficients: [f64; 3],
}

impl Default for ChillerConfig {
    fn default() -> Self {
        Self {
            nominal_capacity_w: None,
            design_condenser_temp_c: 35.0,
            design_evaporator_outlet_temp_c: 6.67,
            evaporator_outlet_temp_c: 6.67,
            temp_rise_coefficient: 2.778,
            rated_cop: 4.694,
            min_part_load_ratio: 0.05,
            max_part_load_ratio: 1.0,
            capacity_ratio_coefficients: [0.9949, -0.045954, -0.0013543],
            power_ratio_coefficients: [2.333, -1.975, 0.6121],
            full_load_factor_coefficients: [0.03303, 0.6852, 0.2818],
        }
    }
}

/// Operating point of the chiller for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChillerOperation {
    /// Electrical draw (W), never negative.
    pub power_w: f64,
    /// Available capacity at this ambient (W).
    pub available_capacity_w: f64,
    /// Part-load ratio after clamping.
    pub part_load_ratio: f64,
    /// Requested ratio exceeded `max_part_load_ratio`; the chiller runs at
    /// its maximum sustainable ratio.
    pub at_max_part_load: bool,
    /// Ratio of load to available capacity before clamping.
    pub requested_ratio: f64,
}

/// Chiller evaluator.
#[derive(Debug, Clone, Default)]
pub struct ChillerModel {
    config: ChillerConfig,
}

impl ChillerModel {
    /// # Panics
    ///
    /// Panics if `rated_cop` is not positive or the part-load bounds are not
    /// `0 < min <= max`.
    pub fn new(config: ChillerConfig) -> Self {
        assert!(config.rated_cop > 0.0, "rated_cop must be > 0");
        assert!(
            config.min_part_load_ratio > 0.0
                && config.min_part_load_ratio <= config.max_part_load_ratio,
            "part-load bounds must satisfy 0 < min <= max"
        );
        Self { config }
    }

    pub fn config(&self) -> &ChillerConfig {
        &self.config
    }

    /// Normalized temperature delta the curves are evaluated over.
    fn temperature_delta(&self, ambient_temp_c: f64) -> f64 {
        let c = &self.config;
        (ambient_temp_c - c.design_condenser_temp_c) / c.temp_rise_coefficient
            - (c.evaporator_outlet_temp_c - c.design_evaporator_outlet_temp_c)
    }

    /// Evaluates the chiller for a required cooling load.
    ///
    /// # Arguments
    ///
    /// * `nominal_capacity_w` - Rated capacity (W)
    /// * `required_load_w` - Heat to remove (W)
    /// * `ambient_temp_c` - Outdoor dry-bulb temperature (°C)
    ///
    /// # Returns
    ///
    /// The operating point. When the available capacity is not positive the
    /// chiller draws nothing.
    pub fn operate(
        &self,
        nominal_capacity_w: f64,
        required_load_w: f64,
        ambient_temp_c: f64,
    ) -> ChillerOperation {
        let c = &self.config;
        let delta = self.temperature_delta(ambient_temp_c);
        let capacity_ratio = quadratic(&c.capacity_ratio_coefficients, delta);
        let available_capacity_w = nominal_capacity_w * capacity_ratio;

        if available_capacity_w.is_nan() || available_capacity_w <= 0.0 {
            return ChillerOperation {
                available_capacity_w,
                ..ChillerOperation::default()
            };
        }

        let requested_ratio = required_load_w.max(0.0) / available_capacity_w;
        let part_load_ratio = requested_ratio.clamp(c.min_part_load_ratio, c.max_part_load_ratio);
        let at_max_part_load = requested_ratio > c.max_part_load_ratio;
        if at_max_part_load {
            debug!(
                "chiller load {:.0} W exceeds {:.0}% of available {:.0} W",
                required_load_w,
                c.max_part_load_ratio * 100.0,
                available_capacity_w
            );
        }

        let full_power_ratio = quadratic(&c.power_ratio_coefficients, capacity_ratio);
        let full_load_factor = quadratic(&c.full_load_factor_coefficients, part_load_ratio);
        // Compressor cycling below the minimum part-load ratio.
        let operating_ratio = if requested_ratio < c.min_part_load_ratio {
            requested_ratio / c.min_part_load_ratio
        } else {
            1.0
        };

        let power_w = (nominal_capacity_w / c.rated_cop
            * full_power_ratio
            * full_load_factor
            * operating_ratio)
            .max(0.0);

        ChillerOperation {
            power_w,
            available_capacity_w,
            part_load_ratio,
            at_max_part_load,
            requested_ratio,
        }
    }

    /// Electrical draw for a required load (W).
    pub fn power_w(
        &self,
        nominal_capacity_w: f64,
        required_load_w: f64,
        ambient_temp_c: f64,
    ) -> f64 {
        self.operate(nominal_capacity_w, required_load_w, ambient_temp_c)
            .power_w
    }
}
