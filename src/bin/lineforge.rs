//! Command-line entry point: load a CSV input, run one of the three
//! scheduling policies, and print the resulting metrics.
//!
//! A `Parser` with one subcommand per policy, `anyhow::Context` at every
//! fallible boundary, `tracing` for progress/warnings rather than ad hoc
//! `eprintln!`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lineforge::config::Config;
use lineforge::loader;
use lineforge::optimizer::{CsvFixed, JustInTime, MinLateness, Optimizer, OptimizerOutcome, PolicyOutcome};
use lineforge::scheduler::SchedulingInput;

#[derive(Parser)]
#[command(name = "lineforge")]
#[command(author, version, about = "Deterministic production scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run once at the CSV-loaded team capacities.
    CsvFixed(RunArgs),
    /// Search for the smallest workforce that keeps every product within
    /// tolerance of a target lateness.
    Jit(RunArgs),
    /// Search for the minimum achievable maximum lateness, then shrink
    /// workforce while holding it.
    MinLateness(RunArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Path to the section-delimited CSV input file.
    #[arg(value_name = "CSV")]
    file: PathBuf,

    /// Optional TOML config overriding optimizer bounds and the late-part
    /// delay; every field not named in the file keeps its built-in default.
    #[arg(short, long, value_name = "TOML")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::CsvFixed(args) => run(args, |_| Box::new(CsvFixed)),
        Commands::Jit(args) => run(args, |config| Box::new(JustInTime(config.jit_params()))),
        Commands::MinLateness(args) => run(args, |config| Box::new(MinLateness(config.min_lateness_params()))),
    }
}

fn run(args: RunArgs, make_optimizer: impl FnOnce(&Config) -> Box<dyn Optimizer>) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => Config::default(),
    };

    let (core, load_warnings) = loader::load_core_input(&args.file)
        .with_context(|| format!("failed to load '{}'", args.file.display()))?;
    for warning in &load_warnings {
        tracing::warn!("{warning}");
    }

    let (mut scheduling_input, build_warnings) =
        SchedulingInput::build(core).context("failed to build the dependency graph")?;
    for warning in &build_warnings {
        tracing::warn!("{warning}");
    }
    scheduling_input.late_part_delay = config.late_part_delay();

    let optimizer = make_optimizer(&config);
    let outcome = optimizer
        .run(&scheduling_input)
        .context("optimizer found no feasible configuration within its bounds")?;

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &OptimizerOutcome) {
    println!("Makespan: {} working day(s)", outcome.makespan_working_days);
    println!();

    match &outcome.policy {
        PolicyOutcome::CsvFixed => println!("Policy: csv-fixed"),
        PolicyOutcome::JustInTime {
            target_lateness,
            max_deviation,
            total_workforce,
        } => println!(
            "Policy: just-in-time (target lateness {target_lateness}d, max deviation {max_deviation}d, total workforce {total_workforce})"
        ),
        PolicyOutcome::MinLateness {
            achieved_max_lateness,
            total_workforce,
        } => println!(
            "Policy: min-lateness (achieved max lateness {achieved_max_lateness}d, total workforce {total_workforce})"
        ),
    }
    println!();

    println!("{:<12} {:>12} {:>14} {:>10} {:>8}", "Product", "Delivery", "Projected", "Lateness", "On-time");
    let mut products: Vec<&str> = outcome.metrics.keys().map(String::as_str).collect();
    products.sort_unstable();
    for product_id in products {
        let m = &outcome.metrics[product_id];
        let projected = m
            .projected_completion
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:>12} {:>14} {:>10} {:>8}",
            m.product_id,
            m.delivery_date.format("%Y-%m-%d"),
            projected,
            m.lateness_days,
            if m.on_time { "yes" } else { "no" },
        );
    }
    println!();

    println!("Team capacities:");
    let mut mechanic: Vec<(&String, &u32)> = outcome.mechanic.iter().collect();
    mechanic.sort_unstable_by_key(|(name, _)| name.as_str());
    for (team, capacity) in mechanic {
        println!("  {team}: {capacity}");
    }
    let mut quality: Vec<(&String, &u32)> = outcome.quality.iter().collect();
    quality.sort_unstable_by_key(|(name, _)| name.as_str());
    for (team, capacity) in quality {
        println!("  {team}: {capacity}");
    }
}
