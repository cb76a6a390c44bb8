// Headless population runner
//
// Usage:
//   cargo run --bin headless -- [options]
//
// Options:
//   --generations <n>      Number of generations to run (default: 10)
//   --config <path>        Path to Population.toml (default: Population.toml)
//   --seed <n>             Override the master seed
//   --policy <kind>        Override the policy (random_turn | straight)
//   --log <path>           Write outcomes to a JSONL file
//   --summarize <path>     Print the table for an existing outcome log and exit

use log::error;
use std::env;
use std::process;
use std::sync::Arc;

use snake_population::config::Config;
use snake_population::decision::SteeringHub;
use snake_population::outcome_log::{read_log, OutcomeLogger};
use snake_population::population::{PopulationController, RetiredGeneration};
use snake_population::trainer::{PolicyKind, PolicyTrainer};
use snake_population::types::GenerationSummary;

fn print_usage() {
    eprintln!("Snake Population Headless Runner");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  headless [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --generations <N>       Number of generations to run (default: 10)");
    eprintln!("  --config <path>         Path to Population.toml (default: Population.toml)");
    eprintln!("  --seed <N>              Override the master seed");
    eprintln!("  --policy <kind>         random_turn or straight");
    eprintln!("  --log <path>            Write generation outcomes as JSONL");
    eprintln!("  --summarize <path>      Print the table for an existing log and exit");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  # Fifty reproducible generations");
    eprintln!("  headless --generations 50 --seed 7");
    eprintln!();
    eprintln!("  # Re-read a run written with --log");
    eprintln!("  headless --summarize snake_outcomes.jsonl");
}

struct Args {
    generations: u64,
    config_path: String,
    seed: Option<u64>,
    policy: Option<PolicyKind>,
    log_path: Option<String>,
    summarize_path: Option<String>,
}

fn parse_policy(s: &str) -> Result<PolicyKind, String> {
    match s.to_lowercase().as_str() {
        "random_turn" | "random" => Ok(PolicyKind::RandomTurn),
        "straight" => Ok(PolicyKind::Straight),
        "manual" => Err("Manual policy needs the server binary".to_string()),
        other => Err(format!("Invalid policy '{}'", other)),
    }
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        generations: 10,
        config_path: "Population.toml".to_string(),
        seed: None,
        policy: None,
        log_path: None,
        summarize_path: None,
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .ok_or_else(|| format!("{} requires a value", name))
        };
        match arg.as_str() {
            "--generations" => {
                let v = value("--generations")?;
                args.generations = v
                    .parse()
                    .map_err(|e| format!("Invalid generation count '{}': {}", v, e))?;
            }
            "--config" => args.config_path = value("--config")?,
            "--seed" => {
                let v = value("--seed")?;
                args.seed = Some(
                    v.parse()
                        .map_err(|e| format!("Invalid seed '{}': {}", v, e))?,
                );
            }
            "--policy" => args.policy = Some(parse_policy(&value("--policy")?)?),
            "--log" => args.log_path = Some(value("--log")?),
            "--summarize" => args.summarize_path = Some(value("--summarize")?),
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => return Err(format!("Unknown argument '{}'", other)),
        }
    }

    Ok(args)
}

fn print_header() {
    println!(
        "{:>5} {:>7} {:>6} {:>9} {:>11}",
        "gen", "ticks", "best", "mean len", "mean alive"
    );
}

fn print_row(summary: &GenerationSummary) {
    println!(
        "{:>5} {:>7} {:>6} {:>9.2} {:>11.1}",
        summary.generation,
        summary.ticks,
        summary.best_length,
        summary.mean_length,
        summary.mean_alive_ticks
    );
}

/// Prints the per-generation table of an existing outcome log
fn summarize(path: &str) -> Result<(), String> {
    let entries = read_log(path)?;
    if entries.is_empty() {
        return Err(format!("No generations in {}", path));
    }

    print_header();
    for entry in &entries {
        print_row(&entry.summary);
    }

    let best = entries
        .iter()
        .map(|e| e.summary.best_length)
        .max()
        .unwrap_or(0);
    println!();
    println!("{} generations, best length {}", entries.len(), best);
    Ok(())
}

#[tokio::main]
async fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "warn");
    }
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Some(path) = &args.summarize_path {
        if let Err(e) = summarize(path) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        return;
    }

    let mut config = Config::from_file(&args.config_path).unwrap_or_else(|e| {
        eprintln!("Warning: {} ({}), using hardcoded defaults", e, args.config_path);
        Config::default_hardcoded()
    });
    if args.seed.is_some() {
        config.population.seed = args.seed;
    }
    if let Some(policy) = args.policy {
        config.population.policy = policy;
    }
    if config.population.policy == PolicyKind::Manual {
        eprintln!("Error: the manual policy needs the server binary");
        process::exit(1);
    }
    if config.population.max_ticks_per_generation.is_none() {
        eprintln!("Warning: no max_ticks_per_generation set; a looping policy never retires");
    }

    let logger = match &args.log_path {
        Some(path) => OutcomeLogger::new(true, path).await,
        None => OutcomeLogger::disabled(),
    };

    let trainer_seed = config.population.seed.map(|s| s.wrapping_add(1)).unwrap_or_else(rand::random);
    let trainer = PolicyTrainer::for_kind(
        config.population.policy,
        Arc::new(SteeringHub::new()),
        trainer_seed,
    );
    let mut controller = match PopulationController::new(&config, Box::new(trainer)) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    print_header();

    let mut retired = 0;
    while retired < args.generations {
        match controller.tick_all() {
            Ok(report) => {
                if let Some(RetiredGeneration { summary, outcomes }) = report.retired {
                    print_row(&summary);
                    logger.log_generation_now(summary, outcomes).await;
                    retired += 1;
                }
            }
            Err(e) => error!("Tick failed: {}", e),
        }
    }
}
