use std::process::Command;

use datacenter_sim::config::ScenarioConfig;

#[derive(Debug)]
struct Kpis {
    facility_energy_kwh: f64,
    pue: f64,
    water_l: f64,
}

#[test]
fn scenario_files_run_via_cli_and_produce_distinct_dynamics() {
    let baseline = run_and_parse_kpis(&["--scenario", "scenarios/baseline.toml"]);
    let water = run_and_parse_kpis(&["--scenario", "scenarios/water_cooled.toml"]);
    let hot = run_and_parse_kpis(&["--scenario", "scenarios/hot_climate.toml"]);

    assert_eq!(baseline.water_l, 0.0, "air cooling uses no water");
    assert!(water.water_l > 0.0, "water cooling should use water");
    assert!(hot.water_l > 0.0, "water cooling should use water");

    assert!(
        water.facility_energy_kwh > 10.0 * baseline.facility_energy_kwh,
        "expected 5 MW over two days to dwarf the unscaled baseline: baseline={:.1}, water={:.1}",
        baseline.facility_energy_kwh,
        water.facility_energy_kwh
    );

    assert!(
        hot.pue > baseline.pue,
        "expected hot climate PUE above baseline: baseline={:.3}, hot={:.3}",
        baseline.pue,
        hot.pue
    );
}

#[test]
fn every_preset_runs_via_cli() {
    for name in ScenarioConfig::PRESETS {
        let kpis = run_and_parse_kpis(&["--preset", name, "--quiet"]);
        assert!(kpis.pue >= 1.0, "preset {name}: pue {:.3}", kpis.pue);
        assert!(kpis.facility_energy_kwh > 0.0);
    }
}

#[test]
fn unknown_preset_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_datacenter-sim"))
        .args(["--preset", "immersion"])
        .output()
        .expect("datacenter-sim process should run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown preset"), "stderr: {stderr}");
}

fn run_and_parse_kpis(args: &[&str]) -> Kpis {
    let output = Command::new(env!("CARGO_BIN_EXE_datacenter-sim"))
        .args(args)
        .output()
        .expect("datacenter-sim process should run");

    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={} ",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    Kpis {
        facility_energy_kwh: parse_metric(&stdout, "Facility energy:", "kWh"),
        pue: parse_metric(&stdout, "PUE (energy-weighted):", ""),
        water_l: parse_metric(&stdout, "Water use:", "L"),
    }
}

fn parse_metric(stdout: &str, label: &str, unit: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing KPI line `{label}` in output: {stdout}"));

    let raw = line
        .strip_prefix(label)
        .map(str::trim)
        .unwrap_or_else(|| panic!("invalid KPI format for line `{line}`"));

    let numeric = raw.strip_suffix(unit).unwrap_or(raw).trim();
    numeric
        .parse::<f64>()
        .unwrap_or_else(|_| panic!("failed parsing `{numeric}` from KPI line `{line}`"))
}
