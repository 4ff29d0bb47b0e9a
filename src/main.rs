//! Headless driver: applies requested counts and settings, runs the
//! aggregator and prints periodic reports.

use std::path::Path;
use std::process;
use std::sync::Arc;

use houseload_sim::cli::{self, CliOptions};
use houseload_sim::config::ScenarioConfig;
use houseload_sim::sim::aggregator::Aggregator;
use houseload_sim::sim::engine::Simulation;
use houseload_sim::sim::types::Snapshot;
use houseload_sim::telemetry::init_tracing;
use tracing::info;

fn load_scenario(cli: &CliOptions) -> Result<ScenarioConfig, String> {
    if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(Path::new(path)).map_err(|e| e.to_string())
    } else {
        let name = cli.preset.as_deref().unwrap_or("default");
        ScenarioConfig::from_preset(name).map_err(|e| e.to_string())
    }
}

/// Applies the `--set` and `--setting` requests, stopping at the first failure.
fn apply_requests(sim: &Simulation, cli: &CliOptions) -> Result<(), String> {
    for req in &cli.settings {
        sim.set_appliance_setting(req.house, &req.appliance, &req.option, &req.value)
            .map_err(|e| format!("--setting house {}: {e}", req.house + 1))?;
    }
    for req in &cli.counts {
        sim.set_appliance_count(req.house, &req.appliance, req.count)
            .map_err(|e| format!("--set house {}: {e}", req.house + 1))?;
    }
    Ok(())
}

fn report(snapshot: &Snapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("error: failed to serialize snapshot: {e}"),
        }
    } else {
        println!("{snapshot}\n");
    }
}

#[tokio::main]
async fn main() {
    let cli = match cli::parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };
    init_tracing(cli.json);

    let scenario = match load_scenario(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let sim = match scenario.build() {
        Ok(sim) => Arc::new(sim),
        Err(errors) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
    };

    if let Err(e) = apply_requests(&sim, &cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }

    let handle = Aggregator::new(sim.clone(), scenario.simulation.tick_interval()).spawn();
    let deadline = tokio::time::sleep(cli.duration);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(deadline, interrupt);
    let mut reports = tokio::time::interval(cli.report_every);
    // the first tick fires immediately, before the aggregator has run
    reports.tick().await;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut interrupt => {
                info!("interrupted");
                break;
            }
            _ = reports.tick() => report(&sim.snapshot(), cli.json),
        }
    }

    handle.stop().await;
    report(&sim.tick(), cli.json);
}
