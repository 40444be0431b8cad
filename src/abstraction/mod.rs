//! Hand abstraction: collapsing concrete game states into a bounded key
//! space so the solver trains over information sets instead of raw states.
//!
//! [`key`] defines the composite [`AbstractionKey`] plus its component
//! enums and the weighted distance used for approximate lookups. [`engine`]
//! holds the [`AbstractionEngine`] that computes keys from concrete state,
//! including the cached Monte Carlo strength bucketing.

pub mod engine;
pub mod key;

pub use engine::{AbstractionConfig, AbstractionEngine, StateView};
pub use key::{
    AbstractionKey, BoardTexture, DistanceWeights, HistoryAbbrev, PositionBucket, SprTier,
    HISTORY_CAP,
};
