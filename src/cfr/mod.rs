//! Counterfactual Regret Minimization over abstracted games.
//!
//! This module is generic: anything implementing the [`Game`] trait can be
//! trained. The crate's hold'em model lives in [`crate::game`]; the trainer
//! does not know it is playing poker.
//!
//! # Overview
//!
//! CFR converges toward equilibrium by repeating three steps:
//! 1. Traverse the game, computing each action's counterfactual value at
//!    every decision point of the traversing player.
//! 2. Accumulate regret, the gap between an action's value and the current
//!    strategy's value, and pick the next strategy by regret matching.
//! 3. Average the strategies played across iterations; the average, not the
//!    last iterate, is the convergent object.
//!
//! Accumulation here is plain add-only CFR. There is no regret flooring,
//! iteration weighting, or discounting; a run's accumulators only grow.
//!
//! # Usage
//!
//! ```no_run
//! use gto_engine::abstraction::AbstractionConfig;
//! use gto_engine::cfr::{Trainer, TrainerConfig};
//! use gto_engine::game::{GameConfig, HoldemGame};
//!
//! # fn main() -> gto_engine::Result<()> {
//! let game = HoldemGame::new(GameConfig::default(), AbstractionConfig::default())?;
//! let mut trainer = Trainer::new(game, TrainerConfig::default().with_workers(4))?;
//! let run = trainer.train(100_000, 10_000)?;
//! println!(
//!     "{} info sets after {} iterations",
//!     run.info_sets, run.iterations
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Zinkevich, M., et al. "Regret Minimization in Games with Incomplete
//!   Information" (2007)
//! - Lanctot, M., et al. "Monte Carlo Sampling for Regret Minimization in
//!   Extensive Games" (2009)

pub mod config;
pub mod game;
pub mod storage;
pub mod trainer;

// Re-export main types for convenient access
pub use config::{ExploitabilityPoint, TrainerConfig, TrainerStats, TraversalMode};
pub use game::{Game, GameAction, InfoKey};
pub use storage::{InfoNode, RegretStore, StoreExport, StoreRecord};
pub use trainer::{
    RunPhase, Trainer, TrainerCheckpoint, TrainingRun, CHECKPOINT_VERSION,
};
