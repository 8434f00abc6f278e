//! CSV telemetry export for facility step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Schema v2 column header for CSV telemetry export.
const HEADER: &str = "timestep,time_hr,ambient_c,setpoint_c,avg_return_c,max_outlet_c,\
                      it_kw,cooling_kw,overhead_kw,total_kw,pue,crac_fan_kw,tower_fan_kw,\
                      crac_load_kw,chiller_kw,cw_pump_kw,ct_pump_kw,water_l,diagnostics";

/// Number of columns in the schema v2 layout.
pub const COLUMN_COUNT: usize = 19;

/// Exports simulation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step using the schema v2
/// column layout. Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(results, io::BufWriter::new(file))
}

/// Writes simulation results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        let kw = |w: f64| format!("{:.4}", w / 1000.0);
        wtr.write_record(&[
            r.timestep.to_string(),
            format!("{:.2}", r.time_hr),
            format!("{:.2}", r.ambient_temp_c),
            format!("{:.2}", r.crac_setpoint_c),
            format!("{:.3}", r.avg_return_temp_c),
            format!("{:.3}", r.max_outlet_temp_c()),
            kw(r.it_power_w),
            kw(r.cooling_power_w),
            kw(r.overhead_power_w),
            kw(r.total_power_w),
            format!("{:.4}", r.pue),
            kw(r.hvac.crac_fan_power_w),
            kw(r.hvac.tower_fan_power_w),
            kw(r.hvac.crac_cooling_load_w),
            kw(r.hvac.chiller_power_w),
            kw(r.hvac.chilled_water_pump_power_w),
            kw(r.hvac.condenser_water_pump_power_w),
            format!("{:.3}", r.water.total_l()),
            r.diagnostics.len().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooling::{HvacBreakdown, WaterUse};

    fn make_step(t: usize) -> StepResult {
        StepResult {
            timestep: t,
            time_hr: t as f64 * 0.25,
            ambient_temp_c: 30.0,
            crac_setpoint_c: 20.0,
            mean_utilization: 0.6,
            rack_cpu_power_w: vec![45_000.0, 45_000.0],
            rack_fan_power_w: vec![5_000.0, 5_000.0],
            rack_outlet_temp_c: vec![31.0, 33.5],
            avg_return_temp_c: 30.75,
            it_load_w: 100_000.0,
            hvac: HvacBreakdown {
                crac_fan_power_w: 32.4,
                tower_fan_power_w: 120.0,
                crac_cooling_load_w: 80_000.0,
                chiller_power_w: 15_000.0,
                chilled_water_pump_power_w: 379.3,
                condenser_water_pump_power_w: 379.3,
                ..HvacBreakdown::default()
            },
            it_power_w: 100_000.0,
            cooling_power_w: 15_911.0,
            overhead_power_w: 11_591.1,
            total_power_w: 127_502.1,
            pue: 1.275021,
            water: WaterUse {
                evaporation_l: 10.0,
                blowdown_l: 2.0,
                drift_l: 0.2,
            },
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn header_matches_schema_v2() {
        let mut buf = Vec::new();
        write_csv(&[make_step(0)], &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let first_line = output.as_deref().unwrap_or("").lines().next().unwrap_or("");
        assert_eq!(
            first_line,
            "timestep,time_hr,ambient_c,setpoint_c,avg_return_c,max_outlet_c,\
             it_kw,cooling_kw,overhead_kw,total_kw,pue,crac_fan_kw,tower_fan_kw,\
             crac_load_kw,chiller_kw,cw_pump_kw,ct_pump_kw,water_l,diagnostics"
        );
    }

    #[test]
    fn row_count_matches_step_count() {
        let results: Vec<StepResult> = (0..96).map(make_step).collect();
        let mut buf = Vec::new();
        write_csv(&results, &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let lines: Vec<&str> = output.as_deref().unwrap_or("").lines().collect();
        assert_eq!(lines.len(), 97);
    }

    #[test]
    fn deterministic_output() {
        let results: Vec<StepResult> = (0..5).map(make_step).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_csv(&results, &mut buf1).ok();
        write_csv(&results, &mut buf2).ok();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn rows_parse_back() {
        let results: Vec<StepResult> = (0..3).map(make_step).collect();
        let mut buf = Vec::new();
        write_csv(&results, &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().map(csv::StringRecord::len), Some(COLUMN_COUNT));

        let mut row_count = 0;
        for record in rdr.records() {
            let rec = record.ok();
            assert!(rec.is_some(), "every row should parse");
            let Some(rec) = rec else { continue };
            for i in 1..COLUMN_COUNT - 1 {
                let val: Result<f64, _> = rec[i].parse();
                assert!(val.is_ok(), "column {i} should parse as f64");
            }
            assert_eq!(&rec[6], "100.0000");
            assert_eq!(&rec[8], "11.5911");
            assert_eq!(&rec[17], "12.200");
            row_count += 1;
        }
        assert_eq!(row_count, 3);
    }
}
