//! Datacenter thermal model: drives every rack and derives outlet temperatures.

use log::warn;
use serde::Deserialize;

use crate::equipment::{Rack, UnitCalibration, UnitSpec, clamp_supply_approach_temp};
use crate::sim::types::{AirProperties, Diagnostic};

/// Coefficients and guard limits of the rack outlet-temperature correlation.
///
/// The outlet rise over inlet is
/// `power_coefficient * P_kw^power_exponent + airflow_coefficient * ln(1 + P / (cp * rho * V))`,
/// with `P` the rack's compute plus fan power and `V` its total fan airflow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThermalConfig {
    pub power_coefficient: f64,
    pub power_exponent: f64,
    pub airflow_coefficient: f64,
    /// Smallest admissible outlet rise; lower values are raised to it (°C).
    pub min_outlet_delta_c: f64,
    /// Rises below this (and at or above the minimum) are reported (°C).
    pub low_outlet_delta_c: f64,
    /// Outlets above this are reported (°C).
    pub max_outlet_temp_c: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            power_coefficient: 0.8,
            power_exponent: 0.9,
            airflow_coefficient: 1.5,
            min_outlet_delta_c: 1.0,
            low_outlet_delta_c: 2.0,
            max_outlet_temp_c: 60.0,
        }
    }
}

/// Uniform rack layout: every rack is filled from the same unit list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RackLayout {
    /// Number of racks.
    pub num_racks: usize,
    /// Units offered to each rack before the power cap is applied.
    pub units_per_rack: usize,
    /// Nameplate of every offered unit.
    pub unit: UnitSpec,
    /// Power cap per rack (W).
    pub max_power_per_rack_w: f64,
    /// Supply-approach temperature per rack (°C).
    pub supply_approach_temps_c: Vec<f64>,
    /// Return-approach temperature per rack (°C).
    pub return_approach_temps_c: Vec<f64>,
}

impl Default for RackLayout {
    fn default() -> Self {
        let num_racks = 10;
        Self {
            num_racks,
            units_per_rack: 30,
            unit: UnitSpec::default(),
            max_power_per_rack_w: 12_000.0,
            supply_approach_temps_c: vec![4.5; num_racks],
            return_approach_temps_c: vec![-1.5; num_racks],
        }
    }
}

/// Outlet rise predicted by the correlation before guards are applied (°C).
pub fn raw_outlet_delta_c(
    power_w: f64,
    airflow_m3s: f64,
    thermal: &ThermalConfig,
    air: &AirProperties,
) -> f64 {
    let power_w = power_w.max(0.0);
    let power_term = thermal.power_coefficient * (power_w / 1000.0).powf(thermal.power_exponent);

    let heat_capacity_flow = air.heat_capacity_flow_w_per_k(airflow_m3s);
    let dilution_term = if heat_capacity_flow > 0.0 {
        thermal.airflow_coefficient * (power_w / heat_capacity_flow).ln_1p()
    } else {
        0.0
    };

    power_term + dilution_term
}

/// Applies the outlet plausibility guards and records what fired.
fn guard_outlet_temp(
    rack: usize,
    inlet_temp_c: f64,
    raw_outlet_c: f64,
    thermal: &ThermalConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> f64 {
    let raw_delta_c = raw_outlet_c - inlet_temp_c;
    let outlet_c = if raw_delta_c < thermal.min_outlet_delta_c {
        warn!(
            "rack {rack}: outlet rise {raw_delta_c:.3} °C below {:.1} °C, clamped",
            thermal.min_outlet_delta_c
        );
        diagnostics.push(Diagnostic::OutletDeltaClamped { rack, raw_delta_c });
        inlet_temp_c + thermal.min_outlet_delta_c
    } else {
        if raw_delta_c < thermal.low_outlet_delta_c {
            warn!("rack {rack}: low outlet rise {raw_delta_c:.3} °C");
            diagnostics.push(Diagnostic::LowOutletDelta {
                rack,
                delta_c: raw_delta_c,
            });
        }
        raw_outlet_c
    };

    if outlet_c > thermal.max_outlet_temp_c {
        warn!("rack {rack}: outlet {outlet_c:.2} °C, check configuration");
        diagnostics.push(Diagnostic::OutletOverTemperature {
            rack,
            outlet_temp_c: outlet_c,
        });
    }
    outlet_c
}

/// Per-rack thermal and electrical state for one timestep.
#[derive(Debug, Clone, Default)]
pub struct ThermalOutput {
    pub rack_inlet_temp_c: Vec<f64>,
    pub rack_cpu_power_w: Vec<f64>,
    pub rack_fan_power_w: Vec<f64>,
    pub rack_airflow_m3s: Vec<f64>,
    pub rack_outlet_temp_c: Vec<f64>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ThermalOutput {
    /// Aggregate IT load: compute plus fan power across all racks (W).
    pub fn total_it_load_w(&self) -> f64 {
        self.rack_cpu_power_w.iter().sum::<f64>() + self.rack_fan_power_w.iter().sum::<f64>()
    }

    /// Total fan airflow across all racks (m³/s).
    pub fn total_airflow_m3s(&self) -> f64 {
        self.rack_airflow_m3s.iter().sum()
    }
}

/// All racks of the facility with their approach temperatures.
#[derive(Debug, Clone)]
pub struct DatacenterModel {
    racks: Vec<Rack>,
    supply_approach_temps_c: Vec<f64>,
    return_approach_temps_c: Vec<f64>,
    total_full_load_w: f64,
    thermal: ThermalConfig,
    air: AirProperties,
}

impl DatacenterModel {
    /// Creates a datacenter from built racks.
    ///
    /// # Panics
    ///
    /// Panics if the approach temperature lists do not have one entry per rack.
    pub fn new(
        racks: Vec<Rack>,
        supply_approach_temps_c: Vec<f64>,
        return_approach_temps_c: Vec<f64>,
        thermal: ThermalConfig,
        air: AirProperties,
    ) -> Self {
        assert_eq!(
            racks.len(),
            supply_approach_temps_c.len(),
            "one supply-approach temperature per rack"
        );
        assert_eq!(
            racks.len(),
            return_approach_temps_c.len(),
            "one return-approach temperature per rack"
        );

        let total_full_load_w = racks.iter().map(Rack::current_load_w).sum();
        Self {
            racks,
            supply_approach_temps_c,
            return_approach_temps_c,
            total_full_load_w,
            thermal,
            air,
        }
    }

    /// Builds every rack of a uniform layout.
    pub fn from_layout(
        layout: &RackLayout,
        calibration: &UnitCalibration,
        thermal: ThermalConfig,
        air: AirProperties,
    ) -> Self {
        let offered = vec![layout.unit; layout.units_per_rack];
        let racks = (0..layout.num_racks)
            .map(|_| Rack::build(&offered, layout.max_power_per_rack_w, calibration))
            .collect();
        Self::new(
            racks,
            layout.supply_approach_temps_c.clone(),
            layout.return_approach_temps_c.clone(),
            thermal,
            air,
        )
    }

    pub fn racks(&self) -> &[Rack] {
        &self.racks
    }

    pub fn num_racks(&self) -> usize {
        self.racks.len()
    }

    /// Summed full-load power of every installed unit (W).
    pub fn total_full_load_w(&self) -> f64 {
        self.total_full_load_w
    }

    pub fn air(&self) -> &AirProperties {
        &self.air
    }

    /// Inlet temperature of a rack for a CRAC setpoint (°C).
    pub fn rack_inlet_temp_c(&self, rack: usize, crac_setpoint_c: f64) -> f64 {
        crac_setpoint_c + clamp_supply_approach_temp(self.supply_approach_temps_c[rack])
    }

    /// Evaluates all racks for one timestep.
    ///
    /// # Panics
    ///
    /// Panics if `utilization` does not hold one value per rack.
    pub fn step(&self, utilization: &[f64], crac_setpoint_c: f64) -> ThermalOutput {
        assert_eq!(
            utilization.len(),
            self.racks.len(),
            "one utilization value per rack"
        );

        let n = self.racks.len();
        let mut out = ThermalOutput {
            rack_inlet_temp_c: Vec::with_capacity(n),
            rack_cpu_power_w: Vec::with_capacity(n),
            rack_fan_power_w: Vec::with_capacity(n),
            rack_airflow_m3s: Vec::with_capacity(n),
            rack_outlet_temp_c: Vec::with_capacity(n),
            diagnostics: Vec::new(),
        };

        for (i, (rack, &u)) in self.racks.iter().zip(utilization).enumerate() {
            let inlet_c = self.rack_inlet_temp_c(i, crac_setpoint_c);
            let rack_out = rack.evaluate(inlet_c, u);

            let raw_outlet_c = inlet_c
                + raw_outlet_delta_c(
                    rack_out.total_power_w(),
                    rack_out.airflow_m3s,
                    &self.thermal,
                    &self.air,
                );
            let outlet_c =
                guard_outlet_temp(i, inlet_c, raw_outlet_c, &self.thermal, &mut out.diagnostics);

            out.rack_inlet_temp_c.push(inlet_c);
            out.rack_cpu_power_w.push(rack_out.cpu_power_w);
            out.rack_fan_power_w.push(rack_out.fan_power_w);
            out.rack_airflow_m3s.push(rack_out.airflow_m3s);
            out.rack_outlet_temp_c.push(outlet_c);
        }
        out
    }

    /// Average CRAC return temperature: mean of rack outlet plus return
    /// approach (°C). Returns `NaN` for a facility without racks.
    pub fn avg_return_temp_c(&self, rack_outlet_temp_c: &[f64]) -> f64 {
        let sum: f64 = rack_outlet_temp_c
            .iter()
            .zip(&self.return_approach_temps_c)
            .map(|(outlet, approach)| outlet + approach)
            .sum();
        sum / self.return_approach_temps_c.len() as f64
    }
}
