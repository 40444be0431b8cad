//! State-to-key abstraction engine.
//!
//! The engine maps a concrete decision point onto an [`AbstractionKey`]. The
//! only expensive feature is the hand-strength bucket, which runs a seeded
//! Monte Carlo equity estimate; results are cached per (hand, board) pair so
//! repeat visits during training are a map lookup.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::RwLock;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::abstraction::key::{
    AbstractionKey, BoardTexture, HistoryAbbrev, PositionBucket, SprTier,
};
use crate::cards::{Board, HoleCards, Street};
use crate::equity::{EquityConfig, EquityEstimator};
use crate::error::{EngineError, Result};

/// Base seed mixed into every card-derived bucketing seed. A compile-time
/// constant so independently constructed engines bucket identically, which
/// keeps trained stores compatible with live lookups.
const BUCKET_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Tunables for the abstraction: bucket thresholds per street, equity sample
/// count, and stack-depth tier bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractionConfig {
    /// Ascending equity cutoffs for preflop buckets; bucket count is one more
    /// than the cutoff count.
    pub preflop_thresholds: Vec<f64>,
    /// Flop cutoffs.
    pub flop_thresholds: Vec<f64>,
    /// Turn cutoffs.
    pub turn_thresholds: Vec<f64>,
    /// River cutoffs.
    pub river_thresholds: Vec<f64>,
    /// Monte Carlo samples per strength-bucket estimate.
    pub equity_samples: usize,
    /// Ascending stack-to-pot bounds separating the six [`SprTier`]s.
    pub spr_bounds: [f64; 5],
}

impl Default for AbstractionConfig {
    fn default() -> Self {
        Self {
            preflop_thresholds: vec![0.35, 0.45, 0.55, 0.65, 0.80],
            flop_thresholds: vec![0.20, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85],
            turn_thresholds: vec![0.20, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85],
            river_thresholds: vec![0.20, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85],
            equity_samples: 200,
            spr_bounds: [1.0, 3.0, 6.0, 12.0, 25.0],
        }
    }
}

impl AbstractionConfig {
    /// Low-sample preset for tests and smoke runs.
    pub fn fast() -> Self {
        Self {
            equity_samples: 60,
            ..Self::default()
        }
    }

    /// Set the Monte Carlo sample count per bucket estimate.
    pub fn with_equity_samples(mut self, samples: usize) -> Self {
        self.equity_samples = samples;
        self
    }

    /// Set the stack-to-pot tier bounds.
    pub fn with_spr_bounds(mut self, bounds: [f64; 5]) -> Self {
        self.spr_bounds = bounds;
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: AbstractionConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// The threshold list governing `street`.
    pub fn thresholds_for(&self, street: Street) -> &[f64] {
        match street {
            Street::Preflop => &self.preflop_thresholds,
            Street::Flop => &self.flop_thresholds,
            Street::Turn => &self.turn_thresholds,
            Street::River => &self.river_thresholds,
        }
    }

    /// Number of strength buckets on `street`.
    pub fn bucket_count(&self, street: Street) -> usize {
        self.thresholds_for(street).len() + 1
    }

    /// Check threshold monotonicity, sample counts, and tier bounds.
    pub fn validate(&self) -> Result<()> {
        for street in Street::ALL {
            let thresholds = self.thresholds_for(street);
            if thresholds.is_empty() {
                return Err(EngineError::configuration(format!(
                    "{:?} has no bucket thresholds",
                    street
                )));
            }
            let mut prev = 0.0;
            for &t in thresholds {
                if !t.is_finite() || t <= 0.0 || t >= 1.0 {
                    return Err(EngineError::configuration(format!(
                        "{:?} threshold {} outside (0, 1)",
                        street, t
                    )));
                }
                if t <= prev {
                    return Err(EngineError::configuration(format!(
                        "{:?} thresholds must be strictly ascending",
                        street
                    )));
                }
                prev = t;
            }
        }
        if self.equity_samples == 0 {
            return Err(EngineError::configuration(
                "equity_samples must be at least 1",
            ));
        }
        let mut prev = 0.0;
        for &bound in &self.spr_bounds {
            if !bound.is_finite() || bound <= prev {
                return Err(EngineError::configuration(
                    "spr_bounds must be positive and strictly ascending",
                ));
            }
            prev = bound;
        }
        Ok(())
    }
}

/// The concrete facts of a decision point, as seen by the acting player.
///
/// Callers map seats to a [`PositionBucket`] before building a view; the
/// engine never sees raw seat numbers.
#[derive(Debug, Clone)]
pub struct StateView<'a> {
    /// Acting player's hole cards.
    pub hand: HoleCards,
    /// Community cards dealt so far.
    pub board: &'a Board,
    /// Current betting street. Must agree with the board.
    pub street: Street,
    /// Acting player's position bucket.
    pub position: PositionBucket,
    /// Effective remaining stack behind.
    pub effective_stack: f64,
    /// Current pot.
    pub pot: f64,
    /// Checks made this street.
    pub checks: u8,
    /// Calls made this street.
    pub calls: u8,
    /// Bets and raises made this street.
    pub raises: u8,
    /// Whether the actor faces an outstanding bet.
    pub facing_bet: bool,
}

/// Deterministic state-to-key mapper with an internal equity cache.
pub struct AbstractionEngine {
    config: AbstractionConfig,
    estimator: EquityEstimator,
    equity_cache: RwLock<FxHashMap<(u64, u64), f64>>,
}

impl AbstractionEngine {
    /// Build an engine, validating the configuration.
    pub fn new(config: AbstractionConfig) -> Result<Self> {
        config.validate()?;
        let estimator = EquityEstimator::new(
            EquityConfig::default().with_samples(config.equity_samples),
        )?;
        Ok(AbstractionEngine {
            config,
            estimator,
            equity_cache: RwLock::new(FxHashMap::default()),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &AbstractionConfig {
        &self.config
    }

    /// Map a decision point onto its information-set key.
    pub fn key_for(&self, view: &StateView<'_>) -> Result<AbstractionKey> {
        if !view.pot.is_finite() || view.pot <= 0.0 {
            return Err(EngineError::unabstractable(format!(
                "pot {} must be positive",
                view.pot
            )));
        }
        if !view.effective_stack.is_finite() || view.effective_stack < 0.0 {
            return Err(EngineError::unabstractable(format!(
                "effective stack {} must be non-negative",
                view.effective_stack
            )));
        }
        let board_street = view.board.street()?;
        if board_street != view.street {
            return Err(EngineError::unabstractable(format!(
                "street {:?} disagrees with a {}-card board",
                view.street,
                view.board.len()
            )));
        }

        let strength = self.strength_bucket(view.hand, view.board, view.street)?;
        Ok(AbstractionKey {
            street: view.street,
            strength,
            texture: BoardTexture::classify(view.board.cards()),
            position: view.position,
            spr: SprTier::from_ratio(view.effective_stack / view.pot, &self.config.spr_bounds),
            history: HistoryAbbrev::new(view.checks, view.calls, view.raises, view.facing_bet),
        })
    }

    /// Ordinal strength bucket of a hand on this board. Monotone in the
    /// underlying equity for a fixed street.
    pub fn strength_bucket(
        &self,
        hand: HoleCards,
        board: &Board,
        street: Street,
    ) -> Result<u8> {
        let equity = self.cached_equity(hand, board)?;
        let thresholds = self.config.thresholds_for(street);
        Ok(thresholds.iter().filter(|&&t| equity >= t).count() as u8)
    }

    /// Cached entries, for diagnostics.
    pub fn cache_len(&self) -> usize {
        match self.equity_cache.read() {
            Ok(cache) => cache.len(),
            Err(_) => 0,
        }
    }

    fn cached_equity(&self, hand: HoleCards, board: &Board) -> Result<f64> {
        let cache_key = (hand.mask(), board.mask());
        if let Ok(cache) = self.equity_cache.read() {
            if let Some(&equity) = cache.get(&cache_key) {
                return Ok(equity);
            }
        }

        // Seed from the cards so repeated runs bucket identically.
        let mut rng = StdRng::seed_from_u64(card_seed(hand.mask(), board.mask()));
        let estimate = self.estimator.estimate_with(hand, board, 1, &mut rng)?;
        let equity = estimate.equity;

        if let Ok(mut cache) = self.equity_cache.write() {
            cache.insert(cache_key, equity);
        }
        Ok(equity)
    }
}

/// SplitMix64 finalizer over the card masks.
pub(crate) fn card_seed(hand_mask: u64, board_mask: u64) -> u64 {
    let mut z = hand_mask ^ board_mask.rotate_left(17) ^ BUCKET_SEED;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AbstractionEngine {
        AbstractionEngine::new(AbstractionConfig::fast()).unwrap()
    }

    fn view<'a>(hand: HoleCards, board: &'a Board, street: Street) -> StateView<'a> {
        StateView {
            hand,
            board,
            street,
            position: PositionBucket::Late,
            effective_stack: 95.0,
            pot: 10.0,
            checks: 0,
            calls: 0,
            raises: 1,
            facing_bet: true,
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let eng = engine();
        let hand: HoleCards = "AhKh".parse().unwrap();
        let board: Board = "7h 8h 2c".parse().unwrap();
        let v = view(hand, &board, Street::Flop);

        let first = eng.key_for(&v).unwrap();
        let second = eng.key_for(&v).unwrap();
        assert_eq!(first, second);
        assert_eq!(eng.cache_len(), 1);

        // A fresh engine with the same config produces the same key.
        let other = engine();
        assert_eq!(other.key_for(&v).unwrap(), first);
    }

    #[test]
    fn test_strength_orders_premium_over_trash() {
        let eng = engine();
        let empty = Board::default();
        let aces = eng
            .strength_bucket("AsAd".parse().unwrap(), &empty, Street::Preflop)
            .unwrap();
        let trash = eng
            .strength_bucket("7c2d".parse().unwrap(), &empty, Street::Preflop)
            .unwrap();
        assert!(
            aces > trash,
            "aces bucket {} should exceed 72o bucket {}",
            aces,
            trash
        );
    }

    #[test]
    fn test_bucket_monotone_in_equity() {
        let config = AbstractionConfig::default();
        let thresholds = config.thresholds_for(Street::Flop);
        let bucket = |equity: f64| thresholds.iter().filter(|&&t| equity >= t).count();
        let mut last = 0;
        for step in 0..=20 {
            let b = bucket(step as f64 / 20.0);
            assert!(b >= last);
            last = b;
        }
        assert_eq!(bucket(1.0), config.bucket_count(Street::Flop) - 1);
    }

    #[test]
    fn test_key_reflects_board_texture_and_history() {
        let eng = engine();
        let hand: HoleCards = "AsKd".parse().unwrap();
        let board: Board = "9h 8h 7h".parse().unwrap();
        let v = view(hand, &board, Street::Flop);
        let key = eng.key_for(&v).unwrap();
        assert_eq!(key.texture, BoardTexture::Monotone);
        assert_eq!(key.street, Street::Flop);
        assert!(key.history.facing_bet);
        assert_eq!(key.history.raises, 1);
    }

    #[test]
    fn test_rejects_inconsistent_views() {
        let eng = engine();
        let hand: HoleCards = "AsKd".parse().unwrap();
        let board: Board = "9h 8h 7h".parse().unwrap();

        let mut bad_street = view(hand, &board, Street::Turn);
        bad_street.pot = 10.0;
        assert!(matches!(
            eng.key_for(&bad_street),
            Err(EngineError::UnabstractableState(_))
        ));

        let mut bad_pot = view(hand, &board, Street::Flop);
        bad_pot.pot = 0.0;
        assert!(matches!(
            eng.key_for(&bad_pot),
            Err(EngineError::UnabstractableState(_))
        ));

        let mut bad_stack = view(hand, &board, Street::Flop);
        bad_stack.effective_stack = -1.0;
        assert!(matches!(
            eng.key_for(&bad_stack),
            Err(EngineError::UnabstractableState(_))
        ));

        // Hole card duplicated on the board.
        let dup: HoleCards = "9h2c".parse().unwrap();
        let v = view(dup, &board, Street::Flop);
        assert!(matches!(
            eng.key_for(&v),
            Err(EngineError::InvalidHand(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(AbstractionConfig::default().validate().is_ok());

        let mut unordered = AbstractionConfig::default();
        unordered.flop_thresholds = vec![0.5, 0.3];
        assert!(unordered.validate().is_err());

        let mut out_of_range = AbstractionConfig::default();
        out_of_range.preflop_thresholds = vec![0.2, 1.2];
        assert!(out_of_range.validate().is_err());

        let mut zero_samples = AbstractionConfig::default();
        zero_samples.equity_samples = 0;
        assert!(zero_samples.validate().is_err());

        let mut bad_bounds = AbstractionConfig::default();
        bad_bounds.spr_bounds = [3.0, 1.0, 6.0, 12.0, 25.0];
        assert!(bad_bounds.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = AbstractionConfig::default().with_equity_samples(120);
        let path = std::env::temp_dir().join("gto_engine_abstraction_config.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();

        let loaded = AbstractionConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.equity_samples, 120);
        assert_eq!(loaded.flop_thresholds, config.flop_thresholds);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_spr_tier_enters_key() {
        let eng = engine();
        let hand: HoleCards = "QsQd".parse().unwrap();
        let board: Board = "2h 7d Jc".parse().unwrap();

        let mut shallow = view(hand, &board, Street::Flop);
        shallow.effective_stack = 5.0;
        shallow.pot = 10.0;
        let mut deep = shallow.clone();
        deep.effective_stack = 200.0;

        let k_shallow = eng.key_for(&shallow).unwrap();
        let k_deep = eng.key_for(&deep).unwrap();
        assert_eq!(k_shallow.spr, SprTier::VeryLow);
        assert_eq!(k_deep.spr, SprTier::VeryDeep);
        assert_ne!(k_shallow, k_deep);
    }
}
