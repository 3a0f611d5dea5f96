//! Agora Simulator CLI
//!
//! Run environment-core scenarios with reproducible seeds.

use agora_sim::scenarios::ScenarioId;
use agora_sim::{ScenarioResult, ScenarioRunner, SimConfig, SimReport};
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "agora-sim")]
#[command(about = "Agora environment core simulator")]
struct Args {
    /// Random seed for reproducibility (0 = use current time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of simulated participants
    #[arg(short, long, default_value = "8")]
    participants: usize,

    /// Scenario to run (range_partition, random_walk, auth_churn, fail_open, concurrent_join, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of ticks per scenario
    #[arg(short, long, default_value = "50")]
    ticks: u64,

    /// Communication range given to participants
    #[arg(long, default_value = "30.0")]
    comm_range: f64,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Write the report of a single scenario run to this JSON file
    #[arg(long)]
    export: Option<String>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder().with_max_level(level);

    // RUST_LOG overrides the flag when set
    let result = match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish()),
        Err(_) => tracing::subscriber::set_global_default(builder.finish()),
    };
    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if !args.json {
        info!("Agora Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: range_partition, random_walk, auth_churn, fail_open, concurrent_join, all");
                std::process::exit(1);
            }
        }
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export only supports a single scenario and seed");
        std::process::exit(1);
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::with_config(SimConfig {
            seed,
            num_participants: args.participants,
            comm_range: args.comm_range,
            ticks: args.ticks,
            ..Default::default()
        });

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    if let Some(export_path) = &args.export {
        if let Some(result) = all_results.first() {
            match SimReport::from(result).write_to_file(export_path) {
                Ok(()) => info!("Exported report to {}", export_path),
                Err(e) => {
                    error!("Failed to export report: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let reports: Vec<SimReport> = all_results.iter().map(SimReport::from).collect();
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": reports,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize summary: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
