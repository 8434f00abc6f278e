//! Simulation engine that composes the thermal, HVAC and water models into
//! one facility timestep.

use crate::cooling::{CoolingTowerState, HvacModel, TowerSizing, WaterModel, WaterUse};
use crate::datacenter::DatacenterModel;

use super::schedule::SetpointPolicy;
use super::types::{CoolingType, Diagnostic, SimConfig, StepInput, StepResult};

/// Simulation engine owning every facility model.
///
/// All models are immutable once built; `step` is a pure function of its
/// input, so steps may be evaluated in any order.
#[derive(Debug, Clone)]
pub struct Engine {
    config: SimConfig,
    datacenter: DatacenterModel,
    hvac: HvacModel,
    tower_sizing: TowerSizing,
    tower: CoolingTowerState,
    water: WaterModel,
    cooling_type: CoolingType,
    setpoint_policy: SetpointPolicy,
    scaling_factor: f64,
    cooling_power_factor: f64,
    facility_overhead: f64,
}

impl Engine {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Simulation timing
    /// * `datacenter` - Racks and thermal model
    /// * `hvac` - HVAC composition including the chiller
    /// * `tower_sizing` - Tower reference airflow, usually from `CoolingTowerSizer`
    /// * `tower` - Cooling-tower water state template
    /// * `water` - Water-use estimator
    /// * `cooling_type` - Which cooling components are counted
    /// * `setpoint_policy` - Setpoint used when a step carries none
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        config: SimConfig,
        datacenter: DatacenterModel,
        hvac: HvacModel,
        tower_sizing: TowerSizing,
        tower: CoolingTowerState,
        water: WaterModel,
        cooling_type: CoolingType,
        setpoint_policy: SetpointPolicy,
    ) -> Self {
        Self {
            config,
            datacenter,
            hvac,
            tower_sizing,
            tower,
            water,
            cooling_type,
            setpoint_policy,
            scaling_factor: 1.0,
            cooling_power_factor: 1.0,
            facility_overhead: 1.0,
        }
    }

    /// Scales facility power and water to a target IT capacity.
    ///
    /// The factor is `capacity_mw · 1e6 / total_full_load`; a facility with
    /// no installed load keeps a factor of 1.
    pub fn with_capacity_mw(mut self, capacity_mw: f64) -> Self {
        let full_load_w = self.datacenter.total_full_load_w();
        self.scaling_factor = if full_load_w > 0.0 {
            capacity_mw * 1.0e6 / full_load_w
        } else {
            1.0
        };
        self
    }

    /// Sets the facility-level multipliers.
    ///
    /// Counted cooling power is multiplied by `cooling_power_factor`;
    /// IT plus cooling power is multiplied by `facility_overhead` to cover
    /// lighting, distribution losses and other miscellaneous loads. Both
    /// default to 1.
    ///
    /// # Panics
    ///
    /// Panics if either factor is negative, or if `facility_overhead` is below 1.
    pub fn with_facility_factors(
        mut self,
        cooling_power_factor: f64,
        facility_overhead: f64,
    ) -> Self {
        assert!(
            cooling_power_factor >= 0.0,
            "cooling_power_factor must be >= 0"
        );
        assert!(facility_overhead >= 1.0, "facility_overhead must be >= 1");
        self.cooling_power_factor = cooling_power_factor;
        self.facility_overhead = facility_overhead;
        self
    }

    /// Executes one facility timestep.
    ///
    /// # Arguments
    ///
    /// * `input` - Per-rack utilization and outdoor conditions
    ///
    /// # Returns
    ///
    /// A `StepResult` with rack temperatures, the HVAC breakdown, facility
    /// power, PUE, water use and every diagnostic raised.
    ///
    /// # Panics
    ///
    /// Panics if `input.utilization` does not hold one value per rack.
    pub fn step(&self, input: &StepInput) -> StepResult {
        let ambient_temp_c = input.ambient_temp_c;
        let crac_setpoint_c = input
            .crac_setpoint_c
            .unwrap_or_else(|| self.setpoint_policy.setpoint_c(ambient_temp_c));

        let mean_utilization = if input.utilization.is_empty() {
            0.0
        } else {
            input
                .utilization
                .iter()
                .map(|u| u.clamp(0.0, 1.0))
                .sum::<f64>()
                / input.utilization.len() as f64
        };

        // 1. Racks: power, fans and outlet temperatures
        let thermal = self.datacenter.step(&input.utilization, crac_setpoint_c);
        let avg_return_temp_c = self
            .datacenter
            .avg_return_temp_c(&thermal.rack_outlet_temp_c);
        let it_load_w = thermal.total_it_load_w();

        // 2. HVAC
        let hvac = self.hvac.power(
            crac_setpoint_c,
            avg_return_temp_c,
            ambient_temp_c,
            it_load_w,
            &self.tower_sizing,
        );

        let mut diagnostics = thermal.diagnostics;
        if hvac.chiller.at_max_part_load {
            diagnostics.push(Diagnostic::ChillerAtMaxPartLoad {
                requested_ratio: hvac.chiller.requested_ratio,
            });
        }

        // 3. Cooling type decides which components count and whether water is used
        let (cooling_w, water) = match self.cooling_type {
            CoolingType::Air => (hvac.air_cooled_power_w(), WaterUse::default()),
            CoolingType::Water => {
                let wet_bulb_temp_c = input.wet_bulb_temp_c.unwrap_or(self.tower.wet_bulb_temp_c);
                let state =
                    self.tower
                        .with_temperatures(avg_return_temp_c, crac_setpoint_c, wet_bulb_temp_c);
                (hvac.total_power_w(), self.water.water_use(&state))
            }
        };

        // 4. Facility totals
        let it_power_w = it_load_w * self.scaling_factor;
        let cooling_power_w = cooling_w * self.cooling_power_factor * self.scaling_factor;
        let total_power_w = (it_power_w + cooling_power_w) * self.facility_overhead;
        let overhead_power_w = total_power_w - it_power_w - cooling_power_w;
        let pue = if it_power_w > 0.0 {
            total_power_w / it_power_w
        } else {
            1.0
        };

        StepResult {
            timestep: input.timestep,
            time_hr: input.timestep as f64 * self.config.dt_hours,
            ambient_temp_c,
            crac_setpoint_c,
            mean_utilization,
            rack_cpu_power_w: thermal.rack_cpu_power_w,
            rack_fan_power_w: thermal.rack_fan_power_w,
            rack_outlet_temp_c: thermal.rack_outlet_temp_c,
            avg_return_temp_c,
            it_load_w,
            hvac,
            it_power_w,
            cooling_power_w,
            overhead_power_w,
            total_power_w,
            pue,
            water: water.scaled(self.scaling_factor),
            diagnostics,
        }
    }

    /// Executes every input in order and returns the step records.
    pub fn run(&self, inputs: &[StepInput]) -> Vec<StepResult> {
        inputs.iter().map(|input| self.step(input)).collect()
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn datacenter(&self) -> &DatacenterModel {
        &self.datacenter
    }

    pub fn hvac(&self) -> &HvacModel {
        &self.hvac
    }

    pub fn tower_sizing(&self) -> &TowerSizing {
        &self.tower_sizing
    }

    pub fn cooling_type(&self) -> CoolingType {
        self.cooling_type
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    pub fn facility_overhead(&self) -> f64 {
        self.facility_overhead
    }
}
