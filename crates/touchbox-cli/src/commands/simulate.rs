use std::path::{Path, PathBuf};

use clap::Args;
use touchbox_core::{BoutSettings, Scenario};

use super::load_config;

#[derive(Args)]
pub struct SimulateArgs {
    /// Scenario file (JSON)
    scenario: PathBuf,
    /// Include per-second clock ticks in the output
    #[arg(long)]
    ticks: bool,
    /// Print the whole report as one JSON document instead of event lines
    #[arg(long)]
    report: bool,
}

pub fn run(args: SimulateArgs, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let settings = BoutSettings::from_config(&config)?;
    let scenario = Scenario::load(&args.scenario)?;
    tracing::info!(
        steps = scenario.steps.len(),
        end_ms = scenario.end_ms(),
        "replaying scenario"
    );

    let mut report = scenario.run(settings);
    if !args.ticks {
        report.events.retain(|e| !e.is_tick());
    }

    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for event in &report.events {
        println!("{}", serde_json::to_string(event)?);
    }
    println!("{}", serde_json::to_string(&report.snapshot)?);
    Ok(())
}
