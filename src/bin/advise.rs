//! Live decision binary: describe a spot, get an action.
//!
//! Usage:
//!   cargo run --release --bin advise -- --hand AhKh [OPTIONS]
//!
//! Options:
//!   --hand <CARDS>          Hero hole cards, like AhKh (required)
//!   --board <CARDS>         Community cards, like Qh7h2c (default: none)
//!   --pot <CHIPS>           Current pot (default: 1.5)
//!   --call <CHIPS>          Amount to call (default: 0)
//!   --stack <CHIPS>         Hero stack behind (default: 100)
//!   --villain-stack <CHIPS> Largest opponent stack (default: 100)
//!   --seat <N>              Hero seat, 0 = button (default: 0)
//!   --table <N>             Players dealt in (default: 6)
//!   --opponents <N>         Opponents still in the pot (default: 1)
//!   --raises <N>            Raises so far this street (default: 1 if facing)
//!   --strategy <FILE>       Strategy file to serve from (default: none)
//!   --argmax                Always take the most probable action
//!   --seed <N>              RNG seed for sampled actions
//!   --live-iterations <N>   Budget for the live-solve fallback
//!   --aggression <F>        Opponent aggression factor (neutral: 1.5)
//!   --fold-to <F>           Opponent fold-to-pressure (neutral: 0.5)
//!   -f, --fast              Fast configuration (coarse buckets, small solves)
//!   -h, --help              Show this help

use std::env;
use std::process;

use gto_engine::decision::{
    ActionPolicy, DecisionConfig, DecisionService, LiveState, OpponentProfile, Provenance,
};
use gto_engine::error::Result;
use gto_engine::strategy::StrategyStore;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut hand: Option<String> = None;
    let mut board = String::new();
    let mut pot: f64 = 1.5;
    let mut to_call: f64 = 0.0;
    let mut stack: f64 = 100.0;
    let mut villain_stack: f64 = 100.0;
    let mut seat: usize = 0;
    let mut table: usize = 6;
    let mut opponents: usize = 1;
    let mut raises: Option<u8> = None;
    let mut strategy_file: Option<String> = None;
    let mut argmax = false;
    let mut seed: Option<u64> = None;
    let mut live_iterations: Option<u64> = None;
    let mut aggression: Option<f64> = None;
    let mut fold_to: Option<f64> = None;
    let mut fast_mode = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--hand" => {
                i += 1;
                if i < args.len() {
                    hand = Some(args[i].clone());
                }
            }
            "--board" => {
                i += 1;
                if i < args.len() {
                    board = args[i].clone();
                }
            }
            "--pot" => {
                i += 1;
                if i < args.len() {
                    pot = args[i].parse().unwrap_or(pot);
                }
            }
            "--call" => {
                i += 1;
                if i < args.len() {
                    to_call = args[i].parse().unwrap_or(to_call);
                }
            }
            "--stack" => {
                i += 1;
                if i < args.len() {
                    stack = args[i].parse().unwrap_or(stack);
                }
            }
            "--villain-stack" => {
                i += 1;
                if i < args.len() {
                    villain_stack = args[i].parse().unwrap_or(villain_stack);
                }
            }
            "--seat" => {
                i += 1;
                if i < args.len() {
                    seat = args[i].parse().unwrap_or(seat);
                }
            }
            "--table" => {
                i += 1;
                if i < args.len() {
                    table = args[i].parse().unwrap_or(table);
                }
            }
            "--opponents" => {
                i += 1;
                if i < args.len() {
                    opponents = args[i].parse().unwrap_or(opponents);
                }
            }
            "--raises" => {
                i += 1;
                if i < args.len() {
                    raises = args[i].parse().ok();
                }
            }
            "--strategy" => {
                i += 1;
                if i < args.len() {
                    strategy_file = Some(args[i].clone());
                }
            }
            "--argmax" => {
                argmax = true;
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    seed = args[i].parse().ok();
                }
            }
            "--live-iterations" => {
                i += 1;
                if i < args.len() {
                    live_iterations = args[i].parse().ok();
                }
            }
            "--aggression" => {
                i += 1;
                if i < args.len() {
                    aggression = args[i].parse().ok();
                }
            }
            "--fold-to" => {
                i += 1;
                if i < args.len() {
                    fold_to = args[i].parse().ok();
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

    let hand = match hand {
        Some(h) => h,
        None => {
            eprintln!("--hand is required");
            print_help();
            return Ok(());
        }
    };

    let spot = LiveState {
        hero_hand: hand.parse()?,
        board: board.parse()?,
        pot,
        to_call,
        stacks: vec![stack, villain_stack],
        hero_seat: seat,
        table_size: table,
        num_opponents: opponents,
        checks: 0,
        calls: 0,
        raises: raises.unwrap_or(if to_call > 0.0 { 1 } else { 0 }),
    };
    spot.validate()?;

    let mut config = if fast_mode {
        DecisionConfig::fast()
    } else {
        DecisionConfig::default()
    };
    if argmax {
        config = config.with_policy(ActionPolicy::Argmax);
    }
    if let Some(s) = seed {
        config = config.with_seed(s);
    }
    if let Some(n) = live_iterations {
        config = config.with_live_solve_iterations(n);
    }

    let store = match &strategy_file {
        Some(path) => {
            println!("Loading strategies from: {}", path);
            StrategyStore::load(path)?
        }
        None => {
            println!("No strategy file; the spot will be solved live");
            StrategyStore::new()
        }
    };

    let mut service = DecisionService::new(store, config)?;
    if aggression.is_some() || fold_to.is_some() {
        service.set_profile(Some(OpponentProfile {
            aggression_factor: aggression.unwrap_or(1.5),
            fold_to_pressure: fold_to.unwrap_or(0.5),
        }))?;
    }

    println!();
    println!(
        "Hand: {} ({})   Board: {} ({:?})",
        spot.hero_hand,
        spot.hero_hand.class_string(),
        spot.board,
        spot.street()?
    );
    println!(
        "Pot: {:.2}   To call: {:.2}   Pot odds: {:.1}%   Effective stack: {:.1}",
        spot.pot,
        spot.to_call,
        spot.pot_odds() * 100.0,
        spot.effective_stack()
    );
    println!();

    let decision = service.decide(&spot)?;

    println!("Action: {}", decision.action);
    println!("Confidence: {:.2}", decision.confidence);
    println!(
        "Provenance: {}",
        match decision.provenance {
            Provenance::Exact => "exact strategy hit".to_string(),
            Provenance::Approximate { distance } => {
                format!("nearest neighbour at distance {:.2}", distance)
            }
            Provenance::LiveSolve { iterations } => {
                format!("live solve, {} iterations", iterations)
            }
        }
    );
    println!();
    println!("Mixed strategy:");
    for (i, action) in decision.actions.iter().enumerate() {
        println!("  {:<8} {:>5.1}%", action.to_string(), decision.strategy.prob(i) * 100.0);
    }

    Ok(())
}

fn print_help() {
    println!("GTO Engine Advisor");
    println!();
    println!("Usage: advise --hand <CARDS> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --hand <CARDS>          Hero hole cards, like AhKh (required)");
    println!("  --board <CARDS>         Community cards, like Qh7h2c (default: none)");
    println!("  --pot <CHIPS>           Current pot (default: 1.5)");
    println!("  --call <CHIPS>          Amount to call (default: 0)");
    println!("  --stack <CHIPS>         Hero stack behind (default: 100)");
    println!("  --villain-stack <CHIPS> Largest opponent stack (default: 100)");
    println!("  --seat <N>              Hero seat, 0 = button (default: 0)");
    println!("  --table <N>             Players dealt in (default: 6)");
    println!("  --opponents <N>         Opponents still in the pot (default: 1)");
    println!("  --raises <N>            Raises so far this street (default: 1 if facing)");
    println!("  --strategy <FILE>       Strategy file to serve from (default: none)");
    println!("  --argmax                Always take the most probable action");
    println!("  --seed <N>              RNG seed for sampled actions");
    println!("  --live-iterations <N>   Budget for the live-solve fallback");
    println!("  --aggression <F>        Opponent aggression factor (neutral: 1.5)");
    println!("  --fold-to <F>           Opponent fold-to-pressure (neutral: 0.5)");
    println!("  -f, --fast              Fast configuration (coarse buckets, small solves)");
    println!("  -h, --help              Show this help");
    println!();
    println!("Examples:");
    println!("  # Facing a flop bet with the nut flush draw");
    println!("  advise --hand AhKh --board Qh7h2c --pot 12 --call 4 --strategy strategy.json");
    println!();
    println!("  # Preflop open decision from the button, no strategy file");
    println!("  advise --hand Td9d --pot 1.5 --fast --argmax");
}
