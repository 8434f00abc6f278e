//! Post-hoc KPI computation from simulation results.

use std::fmt;

use crate::carbon::{CarbonIntensity, run_emissions_kg};

use super::types::StepResult;

/// Number of equal-width utilization bins used by [`WorkloadEfficiency`].
pub const WORKLOAD_BINS: usize = 10;

/// Emissions totals for a run priced against a carbon-intensity source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarbonSummary {
    /// Facility emissions (kg CO2).
    pub total_kg: f64,
    /// Emissions over facility energy (g CO2/kWh).
    pub avg_intensity_g_per_kwh: f64,
}

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<StepResult>` to ensure consistency between
/// step data and reported metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// IT energy (kWh).
    pub it_energy_kwh: f64,
    /// Cooling energy (kWh).
    pub cooling_energy_kwh: f64,
    /// Miscellaneous facility overhead energy (kWh).
    pub overhead_energy_kwh: f64,
    /// Facility energy: IT, cooling and overhead (kWh).
    pub facility_energy_kwh: f64,
    /// Facility energy over IT energy.
    pub energy_weighted_pue: f64,
    /// Cooling energy over IT energy.
    pub cooling_to_it_ratio: f64,
    /// Peak facility power (kW).
    pub peak_facility_kw: f64,
    /// Lowest facility power (kW).
    pub min_facility_kw: f64,
    /// Mean facility power (kW).
    pub avg_facility_kw: f64,
    /// Total cooling-tower water (L).
    pub total_water_l: f64,
    /// Mean water use per step (L).
    pub avg_water_l: f64,
    /// Largest water use in one step (L).
    pub peak_water_l: f64,
    /// Hottest rack outlet seen in the run (°C).
    pub max_outlet_temp_c: f64,
    /// Number of diagnostics raised across all steps.
    pub diagnostic_count: usize,
    /// Emissions, present once priced with [`KpiReport::with_carbon`].
    pub carbon: Option<CarbonSummary>,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    /// * `dt_hours` - Timestep duration in hours
    ///
    /// # Returns
    ///
    /// A `KpiReport` with every field but `carbon` populated.
    pub fn from_results(results: &[StepResult], dt_hours: f64) -> Self {
        if results.is_empty() {
            return Self {
                it_energy_kwh: 0.0,
                cooling_energy_kwh: 0.0,
                overhead_energy_kwh: 0.0,
                facility_energy_kwh: 0.0,
                energy_weighted_pue: 1.0,
                cooling_to_it_ratio: 0.0,
                peak_facility_kw: 0.0,
                min_facility_kw: 0.0,
                avg_facility_kw: 0.0,
                total_water_l: 0.0,
                avg_water_l: 0.0,
                peak_water_l: 0.0,
                max_outlet_temp_c: f64::NAN,
                diagnostic_count: 0,
                carbon: None,
            };
        }

        let mut it_kwh = 0.0;
        let mut cooling_kwh = 0.0;
        let mut facility_kwh = 0.0;
        let mut peak_kw = 0.0_f64;
        let mut min_kw = f64::INFINITY;
        let mut sum_kw = 0.0;
        let mut water_l = 0.0;
        let mut peak_water_l = 0.0_f64;
        let mut max_outlet = f64::NAN;
        let mut diagnostics = 0_usize;

        for r in results {
            let facility_kw = r.total_power_w / 1000.0;
            it_kwh += r.it_power_w / 1000.0 * dt_hours;
            cooling_kwh += r.cooling_power_w / 1000.0 * dt_hours;
            facility_kwh += facility_kw * dt_hours;
            peak_kw = peak_kw.max(facility_kw);
            min_kw = min_kw.min(facility_kw);
            sum_kw += facility_kw;
            water_l += r.water.total_l();
            peak_water_l = peak_water_l.max(r.water.total_l());
            max_outlet = max_outlet.max(r.max_outlet_temp_c());
            diagnostics += r.diagnostics.len();
        }

        let n = results.len() as f64;
        let (pue, cooling_ratio) = if it_kwh > 0.0 {
            (facility_kwh / it_kwh, cooling_kwh / it_kwh)
        } else {
            (1.0, 0.0)
        };

        Self {
            it_energy_kwh: it_kwh,
            cooling_energy_kwh: cooling_kwh,
            overhead_energy_kwh: facility_kwh - it_kwh - cooling_kwh,
            facility_energy_kwh: facility_kwh,
            energy_weighted_pue: pue,
            cooling_to_it_ratio: cooling_ratio,
            peak_facility_kw: peak_kw,
            min_facility_kw: min_kw,
            avg_facility_kw: sum_kw / n,
            total_water_l: water_l,
            avg_water_l: water_l / n,
            peak_water_l,
            max_outlet_temp_c: max_outlet,
            diagnostic_count: diagnostics,
            carbon: None,
        }
    }

    /// Prices the run's facility energy against a carbon-intensity source.
    pub fn with_carbon(
        mut self,
        results: &[StepResult],
        dt_hours: f64,
        source: &impl CarbonIntensity,
        location: &str,
    ) -> Self {
        let total_kg = run_emissions_kg(results, dt_hours, source, location);
        let avg_intensity_g_per_kwh = if self.facility_energy_kwh > 0.0 {
            total_kg * 1000.0 / self.facility_energy_kwh
        } else {
            0.0
        };
        self.carbon = Some(CarbonSummary {
            total_kg,
            avg_intensity_g_per_kwh,
        });
        self
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "IT energy:             {:.2} kWh", self.it_energy_kwh)?;
        writeln!(f, "Cooling energy:        {:.2} kWh", self.cooling_energy_kwh)?;
        writeln!(f, "Overhead energy:       {:.2} kWh", self.overhead_energy_kwh)?;
        writeln!(f, "Facility energy:       {:.2} kWh", self.facility_energy_kwh)?;
        writeln!(f, "PUE (energy-weighted): {:.3}", self.energy_weighted_pue)?;
        writeln!(f, "Cooling/IT ratio:      {:.3}", self.cooling_to_it_ratio)?;
        writeln!(f, "Peak facility power:   {:.2} kW", self.peak_facility_kw)?;
        writeln!(f, "Min facility power:    {:.2} kW", self.min_facility_kw)?;
        writeln!(f, "Avg facility power:    {:.2} kW", self.avg_facility_kw)?;
        writeln!(f, "Water use:             {:.1} L", self.total_water_l)?;
        writeln!(
            f,
            "Water per step:        {:.2} L avg, {:.2} L peak",
            self.avg_water_l, self.peak_water_l
        )?;
        writeln!(f, "Max outlet temp:       {:.2} °C", self.max_outlet_temp_c)?;
        if let Some(carbon) = &self.carbon {
            writeln!(f, "Emissions:             {:.1} kg CO2", carbon.total_kg)?;
            writeln!(
                f,
                "Carbon intensity:      {:.1} g/kWh",
                carbon.avg_intensity_g_per_kwh
            )?;
        }
        write!(f, "Diagnostics:           {}", self.diagnostic_count)
    }
}

/// Step averages for one utilization bin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkloadBin {
    /// Lower utilization edge (inclusive).
    pub lower: f64,
    /// Upper utilization edge (exclusive, except for the last bin).
    pub upper: f64,
    pub mean_utilization: f64,
    pub mean_it_kw: f64,
    pub mean_cooling_kw: f64,
    pub mean_facility_kw: f64,
    /// Mean facility power over mean IT power, 0 without IT power.
    pub pue: f64,
    pub samples: usize,
}

impl WorkloadBin {
    /// Facility power per unit of utilization (kW), infinite at zero utilization.
    pub fn facility_kw_per_utilization(&self) -> f64 {
        if self.mean_utilization > 0.0 {
            self.mean_facility_kw / self.mean_utilization
        } else {
            f64::INFINITY
        }
    }
}

/// Facility power and PUE grouped by mean rack utilization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkloadEfficiency {
    /// Bins that received at least one step, lowest utilization first.
    pub bins: Vec<WorkloadBin>,
}

impl WorkloadEfficiency {
    /// Groups steps into [`WORKLOAD_BINS`] equal bins over `[0, 1]`.
    /// A utilization of exactly 1 falls in the top bin.
    pub fn from_results(results: &[StepResult]) -> Self {
        #[derive(Default, Clone, Copy)]
        struct Acc {
            utilization: f64,
            it_kw: f64,
            cooling_kw: f64,
            facility_kw: f64,
            samples: usize,
        }

        let mut acc = [Acc::default(); WORKLOAD_BINS];
        for r in results {
            let u = r.mean_utilization.clamp(0.0, 1.0);
            let index = ((u * WORKLOAD_BINS as f64).floor() as usize).min(WORKLOAD_BINS - 1);
            let a = &mut acc[index];
            a.utilization += u;
            a.it_kw += r.it_power_w / 1000.0;
            a.cooling_kw += r.cooling_power_w / 1000.0;
            a.facility_kw += r.total_power_w / 1000.0;
            a.samples += 1;
        }

        let width = 1.0 / WORKLOAD_BINS as f64;
        let bins = acc
            .iter()
            .enumerate()
            .filter(|(_, a)| a.samples > 0)
            .map(|(i, a)| {
                let n = a.samples as f64;
                let mean_it_kw = a.it_kw / n;
                let mean_facility_kw = a.facility_kw / n;
                WorkloadBin {
                    lower: i as f64 * width,
                    upper: (i + 1) as f64 * width,
                    mean_utilization: a.utilization / n,
                    mean_it_kw,
                    mean_cooling_kw: a.cooling_kw / n,
                    mean_facility_kw,
                    pue: if mean_it_kw > 0.0 {
                        mean_facility_kw / mean_it_kw
                    } else {
                        0.0
                    },
                    samples: a.samples,
                }
            })
            .collect();

        Self { bins }
    }

    /// Bin with the least facility power per unit of utilization. Bins with
    /// zero mean utilization never qualify.
    pub fn most_efficient(&self) -> Option<&WorkloadBin> {
        self.bins
            .iter()
            .filter(|b| b.mean_utilization > 0.0)
            .min_by(|a, b| {
                a.facility_kw_per_utilization()
                    .total_cmp(&b.facility_kw_per_utilization())
            })
    }
}

impl fmt::Display for WorkloadEfficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Workload Efficiency ---")?;
        for b in &self.bins {
            writeln!(
                f,
                "{:.1}-{:.1}: util={:.3}  facility={:>9.1} kW  pue={:.3}  steps={}",
                b.lower, b.upper, b.mean_utilization, b.mean_facility_kw, b.pue, b.samples
            )?;
        }
        match self.most_efficient() {
            Some(b) => write!(
                f,
                "Most efficient at util {:.3}: {:.1} kW per unit utilization, pue {:.3}",
                b.mean_utilization,
                b.facility_kw_per_utilization(),
                b.pue
            ),
            None => write!(f, "Most efficient: n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon::HourlyProfile;
    use crate::cooling::{HvacBreakdown, WaterUse};
    use crate::sim::types::Diagnostic;

    fn make_result(it_w: f64, cooling_w: f64, water_l: f64) -> StepResult {
        StepResult {
            timestep: 0,
            time_hr: 0.0,
            ambient_temp_c: 25.0,
            crac_setpoint_c: 20.0,
            mean_utilization: 0.5,
            rack_cpu_power_w: vec![it_w * 0.45, it_w * 0.45],
            rack_fan_power_w: vec![it_w * 0.05, it_w * 0.05],
            rack_outlet_temp_c: vec![30.0, 32.0],
            avg_return_temp_c: 29.5,
            it_load_w: it_w,
            hvac: HvacBreakdown::default(),
            it_power_w: it_w,
            cooling_power_w: cooling_w,
            overhead_power_w: 0.0,
            total_power_w: it_w + cooling_w,
            pue: (it_w + cooling_w) / it_w,
            water: WaterUse {
                evaporation_l: water_l,
                ..WaterUse::default()
            },
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn energy_totals() {
        // 4 steps of 0.25 h at 100 kW IT and 40 kW cooling
        let results = vec![make_result(100_000.0, 40_000.0, 2.0); 4];
        let kpi = KpiReport::from_results(&results, 0.25);
        assert!((kpi.it_energy_kwh - 100.0).abs() < 1e-9);
        assert!((kpi.cooling_energy_kwh - 40.0).abs() < 1e-9);
        assert!((kpi.facility_energy_kwh - 140.0).abs() < 1e-9);
        assert!((kpi.energy_weighted_pue - 1.4).abs() < 1e-12);
        assert_eq!(kpi.total_water_l, 8.0);
    }

    #[test]
    fn pue_is_energy_weighted() {
        let results = vec![
            make_result(100_000.0, 100_000.0, 0.0),
            make_result(300_000.0, 0.0, 0.0),
        ];
        let kpi = KpiReport::from_results(&results, 1.0);
        // (200 + 300) / 400, not the mean of 2.0 and 1.0
        assert!((kpi.energy_weighted_pue - 1.25).abs() < 1e-12);
    }

    #[test]
    fn peak_and_max_outlet() {
        let mut results = vec![
            make_result(100_000.0, 10_000.0, 0.0),
            make_result(150_000.0, 20_000.0, 0.0),
        ];
        results[0].rack_outlet_temp_c = vec![45.0];
        let kpi = KpiReport::from_results(&results, 1.0);
        assert_eq!(kpi.peak_facility_kw, 170.0);
        assert_eq!(kpi.max_outlet_temp_c, 45.0);
    }

    #[test]
    fn diagnostic_counting() {
        let mut results = vec![make_result(1.0, 0.0, 0.0); 3];
        results[1].diagnostics.push(Diagnostic::LowOutletDelta {
            rack: 0,
            delta_c: 1.5,
        });
        results[2].diagnostics.push(Diagnostic::ChillerAtMaxPartLoad {
            requested_ratio: 1.2,
        });
        let kpi = KpiReport::from_results(&results, 1.0);
        assert_eq!(kpi.diagnostic_count, 2);
    }

    #[test]
    fn empty_results() {
        let kpi = KpiReport::from_results(&[], 0.25);
        assert_eq!(kpi.facility_energy_kwh, 0.0);
        assert_eq!(kpi.energy_weighted_pue, 1.0);
        assert_eq!(kpi.diagnostic_count, 0);
        assert!(kpi.carbon.is_none());
        assert!(WorkloadEfficiency::from_results(&[]).bins.is_empty());
    }

    #[test]
    fn overhead_counts_toward_facility_energy() {
        let mut r = make_result(100_000.0, 20_000.0, 0.0);
        r.overhead_power_w = 12_000.0;
        r.total_power_w = 132_000.0;
        let kpi = KpiReport::from_results(&[r], 1.0);
        assert!((kpi.overhead_energy_kwh - 12.0).abs() < 1e-9);
        assert!((kpi.facility_energy_kwh - 132.0).abs() < 1e-9);
        assert!((kpi.energy_weighted_pue - 1.32).abs() < 1e-12);
        assert!((kpi.cooling_to_it_ratio - 0.2).abs() < 1e-12);
    }

    #[test]
    fn power_and_water_spread() {
        let results = vec![
            make_result(100_000.0, 10_000.0, 1.0),
            make_result(200_000.0, 30_000.0, 5.0),
            make_result(150_000.0, 20_000.0, 3.0),
        ];
        let kpi = KpiReport::from_results(&results, 0.25);
        assert_eq!(kpi.min_facility_kw, 110.0);
        assert_eq!(kpi.peak_facility_kw, 230.0);
        assert!((kpi.avg_facility_kw - 170.0).abs() < 1e-9);
        assert!((kpi.avg_water_l - 3.0).abs() < 1e-12);
        assert_eq!(kpi.peak_water_l, 5.0);
    }

    #[test]
    fn carbon_priced_per_step() {
        let mut hourly = [400.0; 24];
        hourly[1] = 100.0;
        let profile = HourlyProfile::new("ERCOT", hourly);
        let mut results = vec![make_result(100_000.0, 0.0, 0.0); 2];
        results[1].time_hr = 1.0;

        let kpi = KpiReport::from_results(&results, 1.0).with_carbon(
            &results, 1.0, &profile, "ERCOT",
        );
        let carbon = kpi.carbon.unwrap_or(CarbonSummary {
            total_kg: f64::NAN,
            avg_intensity_g_per_kwh: f64::NAN,
        });
        // 100 kWh at 400 g plus 100 kWh at 100 g
        assert!((carbon.total_kg - 50.0).abs() < 1e-9);
        assert!((carbon.avg_intensity_g_per_kwh - 250.0).abs() < 1e-9);
        assert!(format!("{kpi}").contains("Emissions:"));
    }

    #[test]
    fn workload_bins_group_by_mean_utilization() {
        let mut results = Vec::new();
        for (u, it_w, cooling_w) in [
            (0.05, 40_000.0, 20_000.0),
            (0.42, 100_000.0, 30_000.0),
            (0.48, 110_000.0, 30_000.0),
            (1.0, 200_000.0, 40_000.0),
        ] {
            let mut r = make_result(it_w, cooling_w, 0.0);
            r.mean_utilization = u;
            results.push(r);
        }

        let eff = WorkloadEfficiency::from_results(&results);
        assert_eq!(eff.bins.len(), 3);
        let mid = &eff.bins[1];
        assert_eq!(mid.samples, 2);
        assert!((mid.lower - 0.4).abs() < 1e-12);
        assert!((mid.mean_utilization - 0.45).abs() < 1e-12);
        assert!((mid.mean_facility_kw - 135.0).abs() < 1e-9);
        assert!((mid.pue - 135.0 / 105.0).abs() < 1e-12);

        // Full utilization lands in the top bin.
        let top = &eff.bins[2];
        assert!((top.lower - 0.9).abs() < 1e-12);
        assert_eq!(top.samples, 1);

        // 240 kW per unit at full load beats 300 kW at 0.45 and 1200 kW at 0.05.
        let best = eff.most_efficient().map(|b| b.mean_utilization);
        assert_eq!(best, Some(1.0));
    }

    #[test]
    fn idle_bin_never_most_efficient() {
        let mut r = make_result(10_000.0, 1_000.0, 0.0);
        r.mean_utilization = 0.0;
        let eff = WorkloadEfficiency::from_results(&[r]);
        assert_eq!(eff.bins.len(), 1);
        assert!(eff.most_efficient().is_none());
    }
}
