//! pebblesat CLI
//!
//! Decides whether a computation DAG can be pebbled within a number of rule
//! applications and a number of registers, and prints the schedule found.
//!
//! # Usage
//!
//! ## Built-in graph
//! ```bash
//! cargo run --bin pebblesat -- 26 6 --graph fft4
//! ```
//!
//! ## Dependency table file
//! ```bash
//! cargo run --bin pebblesat -- 6 3 --table sample3.txt --json
//! ```
//!
//! ## Budget sweep
//! ```bash
//! cargo run --bin pebblesat -- 20 6 --graph fft4 --explore 30
//! ```

use clap::Parser;
use env_logger::Env;
use log::info;
use pebblesat::catalog;
use pebblesat::dag::Dag;
use pebblesat::parse::{self, NamedTable};
use pebblesat::pipeline::{PebblePipeline, PipelineConfig};
use pebblesat::report;
use pebblesat::schedule_explorer::{ExplorationConfig, ScheduleExplorer};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[clap(name = "pebblesat")]
#[clap(about = "Red/blue pebble game feasibility via SAT")]
#[clap(version = "0.1")]
struct Args {
    /// Maximum number of rule applications (time steps)
    #[clap(value_name = "BUDGET")]
    budget: u32,

    /// Number of registers
    #[clap(value_name = "REGISTERS")]
    registers: u32,

    /// Built-in graph to pebble
    #[clap(long = "graph", short = 'g', default_value = catalog::DEFAULT_GRAPH)]
    graph: String,

    /// Read the dependency table from a file instead (text or .json)
    #[clap(long = "table", short = 't', value_name = "FILE")]
    table: Option<PathBuf>,

    /// Give up after this many seconds and report UNKNOWN
    #[clap(long = "timeout-secs", value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Probe every budget from BUDGET to MAX_BUDGET and report the smallest feasible one
    #[clap(long = "explore", value_name = "MAX_BUDGET")]
    explore: Option<u32>,

    /// Print the result as JSON
    #[clap(long = "json")]
    json: bool,

    /// Print encoding statistics; repeat for more log output
    #[clap(long = "verbose", short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let NamedTable { name, table } = match &args.table {
        Some(path) => parse::load_table(path)?,
        None => catalog::lookup(&args.graph)?,
    };
    let dag = Dag::from_table(&table)?;
    info!(
        "graph {}: {} nodes, {} edges, {} inputs, {} outputs",
        name,
        dag.len(),
        dag.edge_count(),
        dag.inputs().len(),
        dag.outputs().len()
    );

    let timeout = args.timeout_secs.map(Duration::from_secs);
    let pipeline = PebblePipeline::new();

    if let Some(max_budget) = args.explore {
        if max_budget < args.budget {
            return Err(format!(
                "--explore {} is below the budget {}",
                max_budget, args.budget
            )
            .into());
        }
        let config = ExplorationConfig {
            budgets: args.budget..=max_budget,
            capacities: vec![args.registers],
            timeout,
        };
        let probes = ScheduleExplorer::new(&pipeline, config).explore(&dag);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&probes)?);
        } else {
            println!("Graph {}", name);
            print!("{}", report::render_probes(&probes));
        }
        return Ok(());
    }

    let config = PipelineConfig {
        budget: args.budget,
        capacity: args.registers,
        timeout,
    };
    let result = pipeline.run(&dag, &config)?;

    if args.json {
        println!("{}", report::to_json(&name, &result)?);
    } else {
        print!("{}", report::render(&name, &result, args.verbose > 0));
    }

    Ok(())
}
