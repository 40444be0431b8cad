//! # GTO Engine
//!
//! A hold'em strategy engine: Monte Carlo equity estimation, state
//! abstraction, CFR self-play training, and a live decision service, all in
//! one crate.
//!
//! ## Features
//!
//! - **Monte Carlo Equity**: win/tie/loss estimation against ranges or
//!   random hands, with exact seven-card evaluation underneath
//! - **State Abstraction**: maps concrete hands onto compact information-set
//!   keys (strength bucket, board texture, position, SPR, history shape)
//! - **External-Sampling MCCFR**: regret-matched self-play over an
//!   abstracted heads-up betting tree, parallel across rayon workers
//! - **Strategy Store**: versioned JSON persistence, shard merging, and
//!   nearest-key lookup for states training never visited
//! - **Decision Service**: exact -> approximate -> bounded-live-solve
//!   resolution with provenance and confidence on every answer
//!
//! ## Quick Start
//!
//! ```no_run
//! use gto_engine::abstraction::AbstractionConfig;
//! use gto_engine::cfr::{Trainer, TrainerConfig};
//! use gto_engine::decision::{DecisionConfig, DecisionService, LiveState};
//! use gto_engine::error::Result;
//! use gto_engine::game::{GameConfig, HoldemGame};
//!
//! fn main() -> Result<()> {
//!     // Train a small strategy.
//!     let game = HoldemGame::new(GameConfig::fast(), AbstractionConfig::fast())?;
//!     let mut trainer = Trainer::new(game, TrainerConfig::fast())?;
//!     trainer.train(10_000, 1_000)?;
//!
//!     // Serve decisions from it.
//!     let mut service = DecisionService::new(trainer.into_store(), DecisionConfig::fast())?;
//!     let spot = LiveState {
//!         hero_hand: "AhKh".parse()?,
//!         board: "Qh7h2c".parse()?,
//!         pot: 12.0,
//!         to_call: 4.0,
//!         stacks: vec![40.0, 50.0],
//!         hero_seat: 0,
//!         table_size: 6,
//!         num_opponents: 1,
//!         checks: 0,
//!         calls: 0,
//!         raises: 1,
//!     };
//!     println!("{}", service.decide(&spot)?.action);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐   ┌────────────────┐
//! │  equity  │──▶│ abstraction │──▶│ cfr trainer  │──▶│ strategy store │
//! │ (MC sim) │   │ (state→key) │   │ (self-play)  │   │ (persistence)  │
//! └──────────┘   └─────────────┘   └──────────────┘   └────────────────┘
//!                                          ▲                   │
//!                                   bounded live solve         ▼
//!                                          │           ┌────────────────┐
//!                            live hand ───▶└───────────│ decision svc   │──▶ action
//!                                                      └────────────────┘
//! ```

#![warn(missing_docs)]

/// Hand-to-key state abstraction.
pub mod abstraction;

/// Cards, boards, streets, and exact hand evaluation.
pub mod cards;

/// Generic CFR training: game trait, regret storage, trainer.
pub mod cfr;

/// Live decision service over a trained strategy store.
pub mod decision;

/// Monte Carlo equity estimation.
pub mod equity;

/// Engine-wide error taxonomy.
pub mod error;

/// Abstracted heads-up hold'em game model.
pub mod game;

/// Strategy distributions and the persisted strategy store.
pub mod strategy;

// Re-export the types most callers touch at the crate root.
pub use abstraction::{AbstractionConfig, AbstractionEngine, AbstractionKey};
pub use cards::{Board, Card, HoleCards, Street};
pub use cfr::{Game, Trainer, TrainerConfig};
pub use decision::{Decision, DecisionConfig, DecisionService, LiveState};
pub use equity::{EquityConfig, EquityEstimate, EquityEstimator};
pub use error::{EngineError, Result};
pub use game::{GameConfig, HoldemGame};
pub use strategy::{Strategy, StrategyStore};
