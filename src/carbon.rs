//! Grid carbon-intensity interface and emissions conversion.
//!
//! The simulation core never calls into this module; callers use it to turn
//! facility energy into emissions. Times are simulation hours.

use crate::sim::types::StepResult;

/// Source of grid carbon intensity (g CO2/kWh).
pub trait CarbonIntensity {
    /// Intensity at `time_hr` for `location`.
    fn intensity(&self, time_hr: f64, location: &str) -> f64;

    /// Intensity expected `days_ahead` days and `hours_ahead` hours after
    /// `time_hr`.
    fn forecast(&self, time_hr: f64, days_ahead: u32, hours_ahead: u32) -> f64;

    /// Cleanest run of `duration_hours` consecutive hours inside the
    /// `window_hours` starting at `start_hr`.
    ///
    /// Returns `(best_start_hr, average_intensity)`. If the run does not fit
    /// in the window the start and the intensity at the start are returned.
    fn best_window(&self, start_hr: f64, window_hours: u32, duration_hours: u32) -> (f64, f64) {
        if duration_hours == 0 || duration_hours > window_hours {
            return (start_hr, self.forecast(start_hr, 0, 0));
        }

        let hourly: Vec<f64> = (0..window_hours)
            .map(|h| self.forecast(start_hr, 0, h))
            .collect();

        let mut best = (start_hr, f64::INFINITY);
        for (offset, run) in hourly.windows(duration_hours as usize).enumerate() {
            let avg = run.iter().sum::<f64>() / run.len() as f64;
            if avg < best.1 {
                best = (start_hr + offset as f64, avg);
            }
        }
        best
    }
}

/// Hour-of-day intensity profile for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyProfile {
    location: String,
    hourly_g_per_kwh: [f64; 24],
    mean_g_per_kwh: f64,
}

impl HourlyProfile {
    pub fn new(location: impl Into<String>, hourly_g_per_kwh: [f64; 24]) -> Self {
        let mean_g_per_kwh = hourly_g_per_kwh.iter().sum::<f64>() / 24.0;
        Self {
            location: location.into(),
            hourly_g_per_kwh,
            mean_g_per_kwh,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn mean_g_per_kwh(&self) -> f64 {
        self.mean_g_per_kwh
    }

    fn at_hour(&self, time_hr: f64) -> f64 {
        let hour = time_hr.rem_euclid(24.0).floor() as usize;
        self.hourly_g_per_kwh[hour.min(23)]
    }
}

impl CarbonIntensity for HourlyProfile {
    /// Other locations fall back to this profile's daily mean.
    fn intensity(&self, time_hr: f64, location: &str) -> f64 {
        if location.eq_ignore_ascii_case(&self.location) {
            self.at_hour(time_hr)
        } else {
            self.mean_g_per_kwh
        }
    }

    fn forecast(&self, time_hr: f64, days_ahead: u32, hours_ahead: u32) -> f64 {
        self.at_hour(time_hr + f64::from(days_ahead) * 24.0 + f64::from(hours_ahead))
    }
}

/// Emissions of `energy_kwh` at `g_per_kwh` (kg CO2).
pub fn emissions_kg(energy_kwh: f64, g_per_kwh: f64) -> f64 {
    energy_kwh * g_per_kwh / 1000.0
}

/// Facility emissions over a run, each step priced at the intensity at its
/// start (kg CO2).
pub fn run_emissions_kg(
    results: &[StepResult],
    dt_hours: f64,
    source: &impl CarbonIntensity,
    location: &str,
) -> f64 {
    results
        .iter()
        .map(|r| {
            let energy_kwh = r.total_power_w / 1000.0 * dt_hours;
            emissions_kg(energy_kwh, source.intensity(r.time_hr, location))
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> HourlyProfile {
        // Clean midday, dirty evening.
        let mut hourly = [400.0; 24];
        hourly[10..15].fill(150.0);
        hourly[18..22].fill(550.0);
        HourlyProfile::new("ERCOT", hourly)
    }

    #[test]
    fn intensity_by_hour_of_day() {
        let p = profile();
        assert_eq!(p.intensity(12.5, "ERCOT"), 150.0);
        assert_eq!(p.intensity(24.0 + 12.0, "ercot"), 150.0);
        assert_eq!(p.intensity(48.0, "ERCOT"), 400.0);
        assert_eq!(p.intensity(19.0, "ERCOT"), 550.0);
    }

    #[test]
    fn unknown_location_uses_mean() {
        let p = profile();
        assert!((p.intensity(12.0, "CAISO") - p.mean_g_per_kwh()).abs() < 1e-12);
    }

    #[test]
    fn forecast_wraps_days() {
        let p = profile();
        assert_eq!(p.forecast(8.0, 1, 3), 150.0);
        assert_eq!(p.forecast(8.0, 0, 11), 550.0);
    }

    #[test]
    fn best_window_finds_midday() {
        let p = profile();
        let (start, avg) = p.best_window(0.0, 24, 4);
        assert_eq!(start, 10.0);
        assert_eq!(avg, 150.0);
    }

    #[test]
    fn best_window_too_long_returns_start() {
        let p = profile();
        assert_eq!(p.best_window(5.0, 3, 4), (5.0, 400.0));
    }

    #[test]
    fn emissions_conversion() {
        assert_eq!(emissions_kg(1000.0, 400.0), 400.0);
    }
}
