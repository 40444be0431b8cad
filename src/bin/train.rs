//! Hold'em strategy training binary.
//!
//! Usage:
//!   cargo run --release --bin train -- [OPTIONS]
//!
//! Options:
//!   -i, --iterations <N>        Training iterations (default: 100000)
//!   -t, --threads <N>           Worker threads (default: 1)
//!   -s, --seed <N>              Random seed (default: 1)
//!   -o, --output <FILE>         Strategy file to write (default: strategy.json)
//!   --abstraction <FILE>        Abstraction configuration JSON file
//!   --terminal <STREET>         Truncate hands at preflop/flop/turn/river
//!   --stack <BB>                Override every scenario stack depth
//!   --checkpoint <FILE>         Also write a resumable checkpoint here
//!   --checkpoint-interval <N>   Store flush interval (default: 5000)
//!   --resume <FILE>             Resume regrets from a checkpoint
//!   -f, --fast                  Fast smoke-test configuration
//!   -h, --help                  Show this help

use std::env;
use std::process;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use gto_engine::abstraction::AbstractionConfig;
use gto_engine::cards::Street;
use gto_engine::cfr::{Trainer, TrainerConfig};
use gto_engine::error::Result;
use gto_engine::game::{GameConfig, HoldemGame};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut iterations: u64 = 100_000;
    let mut threads: usize = 0;
    let mut seed: Option<u64> = None;
    let mut output = "strategy.json".to_string();
    let mut abstraction_file: Option<String> = None;
    let mut terminal: Option<Street> = None;
    let mut stack_bb: Option<f64> = None;
    let mut checkpoint_file: Option<String> = None;
    let mut checkpoint_interval: u64 = 5_000;
    let mut resume_file: Option<String> = None;
    let mut fast_mode = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" | "-i" => {
                i += 1;
                if i < args.len() {
                    iterations = args[i].parse().unwrap_or(iterations);
                }
            }
            "--threads" | "-t" => {
                i += 1;
                if i < args.len() {
                    threads = args[i].parse().unwrap_or(0);
                }
            }
            "--seed" | "-s" => {
                i += 1;
                if i < args.len() {
                    seed = args[i].parse().ok();
                }
            }
            "--output" | "-o" => {
                i += 1;
                if i < args.len() {
                    output = args[i].clone();
                }
            }
            "--abstraction" => {
                i += 1;
                if i < args.len() {
                    abstraction_file = Some(args[i].clone());
                }
            }
            "--terminal" => {
                i += 1;
                if i < args.len() {
                    terminal = parse_street(&args[i]);
                    if terminal.is_none() {
                        eprintln!("Unknown street: {}", args[i]);
                        print_help();
                        return Ok(());
                    }
                }
            }
            "--stack" => {
                i += 1;
                if i < args.len() {
                    stack_bb = args[i].parse().ok();
                }
            }
            "--checkpoint" => {
                i += 1;
                if i < args.len() {
                    checkpoint_file = Some(args[i].clone());
                }
            }
            "--checkpoint-interval" => {
                i += 1;
                if i < args.len() {
                    checkpoint_interval = args[i].parse().unwrap_or(checkpoint_interval);
                }
            }
            "--resume" => {
                i += 1;
                if i < args.len() {
                    resume_file = Some(args[i].clone());
                }
            }
            "--fast" | "-f" => {
                fast_mode = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                return Ok(());
            }
        }
        i += 1;
    }

    println!("=================================================");
    println!("  GTO Engine Trainer");
    println!("=================================================");
    println!();

    let mut game_config = if fast_mode {
        println!("Using fast smoke-test configuration");
        GameConfig::fast()
    } else {
        GameConfig::default()
    };
    if let Some(street) = terminal {
        game_config = game_config.with_terminal_street(street);
    }
    if let Some(stack) = stack_bb {
        for scenario in &mut game_config.scenarios {
            scenario.stack_bb = stack;
        }
    }

    let abstraction = match &abstraction_file {
        Some(path) => {
            println!("Loading abstraction from: {}", path);
            AbstractionConfig::from_json_file(path)?
        }
        None if fast_mode => AbstractionConfig::fast(),
        None => AbstractionConfig::default(),
    };

    let mut trainer_config = TrainerConfig::default();
    if let Some(s) = seed {
        trainer_config = trainer_config.with_seed(s);
    }
    if threads > 0 {
        trainer_config = trainer_config.with_workers(threads);
    }

    println!("Iterations: {}", iterations);
    println!("Threads: {}", trainer_config.num_workers);
    println!("Seed: {}", trainer_config.seed);
    println!(
        "Terminal street: {}",
        match game_config.terminal_street {
            Some(street) => format!("{:?}", street),
            None => "River (full hands)".to_string(),
        }
    );
    println!("Scenarios: {}", game_config.scenarios.len());
    println!("Checkpoint interval: {}", checkpoint_interval);
    println!("Output: {}", output);
    println!();

    let game = HoldemGame::new(game_config, abstraction)?;
    let mut trainer = Trainer::new(game, trainer_config)?;

    if let Some(path) = &resume_file {
        println!("Resuming from checkpoint: {}", path);
        trainer.resume_from(path)?;
        println!("Resumed at iteration {}", trainer.iteration());
        println!();
    }

    println!("Starting training...");
    let start_iteration = trainer.iteration();
    let start_time = Instant::now();

    let bar = ProgressBar::new(iterations);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );

    let run = trainer.train_with_callback(iterations, checkpoint_interval, |stats| {
        bar.set_position(stats.iterations - start_iteration);
        bar.set_message(format!(
            "{} info sets, {:.0} it/s",
            stats.info_sets, stats.iterations_per_second
        ));
    })?;
    bar.finish_and_clear();

    let elapsed = start_time.elapsed().as_secs_f64();
    println!();
    println!("Training {:?} after {:.2}s", run.phase, elapsed);
    println!("Total iterations: {}", run.iterations);
    println!("Information sets: {}", run.info_sets);
    if run.skipped_traversals > 0 {
        println!("Skipped traversals: {}", run.skipped_traversals);
    }
    println!(
        "Average speed: {:.0} iterations/second",
        (run.iterations - start_iteration) as f64 / elapsed.max(f64::EPSILON)
    );
    println!();

    if let Some(path) = &checkpoint_file {
        println!("Writing checkpoint to {}...", path);
        trainer.save_checkpoint(path)?;
    }

    println!("Writing strategies to {}...", output);
    trainer.store().save(&output)?;
    println!("Saved {} strategies", trainer.store().len());

    println!();
    println!("=== Sample Strategies ===");
    for (key, entry) in trainer.store().iter().take(5) {
        println!("{}", key);
        for (i, action) in entry.actions.iter().enumerate() {
            let prob = entry.strategy.prob(i);
            if prob > 0.001 {
                println!("  {}: {:.1}%", action, prob * 100.0);
            }
        }
    }

    println!();
    println!("Done!");
    Ok(())
}

fn parse_street(s: &str) -> Option<Street> {
    match s.to_ascii_lowercase().as_str() {
        "preflop" => Some(Street::Preflop),
        "flop" => Some(Street::Flop),
        "turn" => Some(Street::Turn),
        "river" => Some(Street::River),
        _ => None,
    }
}

fn print_help() {
    println!("GTO Engine Trainer");
    println!();
    println!("Usage: train [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --iterations <N>        Training iterations (default: 100000)");
    println!("  -t, --threads <N>           Worker threads (default: 1)");
    println!("  -s, --seed <N>              Random seed (default: 1)");
    println!("  -o, --output <FILE>         Strategy file to write (default: strategy.json)");
    println!("  --abstraction <FILE>        Abstraction configuration JSON file");
    println!("  --terminal <STREET>         Truncate hands at preflop/flop/turn/river");
    println!("  --stack <BB>                Override every scenario stack depth");
    println!("  --checkpoint <FILE>         Also write a resumable checkpoint here");
    println!("  --checkpoint-interval <N>   Store flush interval (default: 5000)");
    println!("  --resume <FILE>             Resume regrets from a checkpoint");
    println!("  -f, --fast                  Fast smoke-test configuration");
    println!("  -h, --help                  Show this help");
    println!();
    println!("Examples:");
    println!("  # Quick smoke run, flop-terminal hands");
    println!("  train --fast --iterations 5000");
    println!();
    println!("  # Full run across 8 workers with periodic checkpoints");
    println!("  train -i 2000000 -t 8 --checkpoint run.ckpt --checkpoint-interval 50000");
    println!();
    println!("  # Resume an interrupted run");
    println!("  train --resume run.ckpt -i 1000000 -o strategy.json");
}
