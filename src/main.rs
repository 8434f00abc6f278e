//! Datacenter simulator entry point: CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use datacenter_sim::config::ScenarioConfig;
use datacenter_sim::io::export::export_csv;
use datacenter_sim::sim::kpi::{KpiReport, WorkloadEfficiency};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    telemetry_out: Option<String>,
    quiet: bool,
}

fn print_help() {
    eprintln!("datacenter-sim: datacenter IT-load, thermal and HVAC simulator");
    eprintln!();
    eprintln!("Usage: datacenter-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --telemetry-out <path>   Export step results to CSV");
    eprintln!("  --quiet                  Print only the KPI report");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Set RUST_LOG=warn to see thermal and chiller diagnostics.");
}

fn required_value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        telemetry_out: None,
        quiet: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(required_value(&args, i, "--scenario", "a path argument"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(required_value(&args, i, "--preset", "a name argument"));
            }
            "--telemetry-out" => {
                i += 1;
                cli.telemetry_out =
                    Some(required_value(&args, i, "--telemetry-out", "a path argument"));
            }
            "--quiet" | "-q" => cli.quiet = true,
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    env_logger::init();
    let cli = parse_args();

    // --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let engine = scenario.build_engine().unwrap_or_else(|errors| {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    });

    let results = engine.run(&scenario.step_inputs());
    let kpi = KpiReport::from_results(&results, engine.config().dt_hours);

    if !cli.quiet {
        for r in &results {
            println!("{r}");
        }
        println!();
    }
    println!(
        "Cooling: {} | racks: {} | tower reference airflow: {:.3} m³/s",
        engine.cooling_type(),
        engine.datacenter().num_racks(),
        engine.tower_sizing().reference_airflow_m3s
    );
    println!("{kpi}");
    if !cli.quiet {
        println!();
        println!("{}", WorkloadEfficiency::from_results(&results));
    }

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }
}
