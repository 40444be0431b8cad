//! Monte Carlo equity estimation.
//!
//! Samples random completions of the unseen deck (opponent hole cards plus
//! any undealt board cards) and scores the hero's final hand against every
//! opponent. Accuracy scales with the sample count: the standard error of the
//! win probability shrinks as `O(1/sqrt(n))`, so several hundred samples put
//! it below one percentage point.
//!
//! Estimation is deterministic for a given configuration: per-call RNG
//! streams derive from the configured base seed, and batch scenarios offset
//! that seed by their index so batching never changes a scenario's
//! statistical result.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::cards::eval::evaluate;
use crate::cards::{Board, Card, Deck, HoleCards};
use crate::error::{EngineError, Result};

/// Default Monte Carlo sample count per scenario.
pub const DEFAULT_SAMPLES: usize = 500;

const DEFAULT_SEED: u64 = 104_729;

/// Tunable knobs for the estimator.
#[derive(Debug, Clone)]
pub struct EquityConfig {
    /// Samples drawn per scenario. More samples, tighter error.
    pub num_samples: usize,
    /// Base seed for derived RNG streams.
    pub seed: u64,
    /// Batch size at and above which scenarios run on rayon workers.
    /// Below it the per-call overhead of fanning out dominates.
    pub parallel_threshold: usize,
}

impl Default for EquityConfig {
    fn default() -> Self {
        Self {
            num_samples: DEFAULT_SAMPLES,
            seed: DEFAULT_SEED,
            parallel_threshold: 4,
        }
    }
}

impl EquityConfig {
    /// Set the per-scenario sample count.
    pub fn with_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the parallel batch threshold.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.num_samples == 0 {
            return Err(EngineError::configuration(
                "num_samples must be at least 1",
            ));
        }
        if self.parallel_threshold == 0 {
            return Err(EngineError::configuration(
                "parallel_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Win/tie/loss frequencies from one estimation run.
///
/// `win`, `tie`, and `loss` always lie in `[0, 1]` and sum to 1 within
/// floating tolerance. `equity` is the expected pot share, counting k-way
/// ties as `1/k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityEstimate {
    /// Fraction of samples hero beat every opponent.
    pub win: f64,
    /// Fraction of samples hero tied the best opponent.
    pub tie: f64,
    /// Fraction of samples hero lost.
    pub loss: f64,
    /// Expected pot share (win plus split tie mass).
    pub equity: f64,
    /// Samples drawn.
    pub samples: usize,
}

impl EquityEstimate {
    fn from_counts(wins: usize, ties: usize, share: f64, samples: usize) -> Self {
        let n = samples as f64;
        let win = (wins as f64 / n).clamp(0.0, 1.0);
        let tie = (ties as f64 / n).clamp(0.0, 1.0);
        let loss = (1.0 - win - tie).clamp(0.0, 1.0);
        EquityEstimate {
            win,
            tie,
            loss,
            equity: (share / n).clamp(0.0, 1.0),
            samples,
        }
    }

    /// Standard error of the win probability at this sample count.
    pub fn standard_error(&self) -> f64 {
        (self.win * (1.0 - self.win) / self.samples as f64).sqrt()
    }

    /// Verify the numeric invariants hold.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("win", self.win), ("tie", self.tie), ("loss", self.loss)] {
            if !(0.0..=1.0).contains(&v) || !v.is_finite() {
                return Err(EngineError::configuration(format!(
                    "{} probability {} outside [0, 1]",
                    name, v
                )));
            }
        }
        let total = self.win + self.tie + self.loss;
        if (total - 1.0).abs() > 1e-6 {
            return Err(EngineError::configuration(format!(
                "probabilities sum to {}, expected 1",
                total
            )));
        }
        Ok(())
    }
}

/// One scenario of a batched estimation call.
#[derive(Debug, Clone)]
pub struct EquityScenario {
    /// Hero's hole cards.
    pub hand: HoleCards,
    /// Known community cards.
    pub board: Board,
    /// Number of opponents holding random hands.
    pub num_opponents: usize,
}

/// Monte Carlo equity estimator with an injectable random source.
#[derive(Debug, Clone)]
pub struct EquityEstimator {
    config: EquityConfig,
}

impl EquityEstimator {
    /// Build an estimator, validating its configuration.
    pub fn new(config: EquityConfig) -> Result<Self> {
        config.validate()?;
        Ok(EquityEstimator { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &EquityConfig {
        &self.config
    }

    /// Estimate hero equity against `num_opponents` random hands.
    ///
    /// Deterministic for a fixed configuration; use [`estimate_with`] to
    /// supply the random source directly.
    ///
    /// [`estimate_with`]: EquityEstimator::estimate_with
    pub fn estimate(
        &self,
        hand: HoleCards,
        board: &Board,
        num_opponents: usize,
    ) -> Result<EquityEstimate> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.estimate_with(hand, board, num_opponents, &mut rng)
    }

    /// Estimate hero equity drawing randomness from `rng`.
    pub fn estimate_with<R: Rng + ?Sized>(
        &self,
        hand: HoleCards,
        board: &Board,
        num_opponents: usize,
        rng: &mut R,
    ) -> Result<EquityEstimate> {
        let dead = self.check_scenario(hand, board, num_opponents)?;
        Ok(self.sample_vs_random(hand, board, num_opponents, dead, self.config.num_samples, rng))
    }

    /// Estimate hero equity against one specific opponent hand by sampling
    /// board runouts only. Used for truncated game terminals where the
    /// opponent's cards are already fixed.
    pub fn estimate_vs_hand<R: Rng + ?Sized>(
        &self,
        hero: HoleCards,
        villain: HoleCards,
        board: &Board,
        rng: &mut R,
    ) -> Result<EquityEstimate> {
        let dead = self.check_scenario(hero, board, 1)?;
        for card in villain.cards() {
            if dead & card.mask() != 0 {
                return Err(EngineError::invalid_hand(format!(
                    "opponent card {} duplicates a known card",
                    card
                )));
            }
        }
        let dead = dead | villain.cards()[0].mask() | villain.cards()[1].mask();

        let to_deal = 5 - board.len();
        if to_deal == 0 {
            // Complete board: the comparison is exact, no sampling needed.
            let (wins, ties, share) = score_showdown(hero, &[villain], board.cards(), &[]);
            return Ok(EquityEstimate::from_counts(wins, ties, share, 1));
        }

        let base = Deck::excluding_mask(dead);
        let mut wins = 0;
        let mut ties = 0;
        let mut share = 0.0;
        let mut runout = Vec::with_capacity(to_deal);
        for _ in 0..self.config.num_samples {
            let mut deck = base.clone();
            runout.clear();
            for _ in 0..to_deal {
                // deck has at least 48 - 2 = enough cards for a runout
                if let Some(card) = deck.draw(rng) {
                    runout.push(card);
                }
            }
            let (w, t, s) = score_showdown(hero, &[villain], board.cards(), &runout);
            wins += w;
            ties += t;
            share += s;
        }
        Ok(EquityEstimate::from_counts(
            wins,
            ties,
            share,
            self.config.num_samples,
        ))
    }

    /// Estimate many independent scenarios in one call.
    ///
    /// Scenario `i` draws from a stream seeded with `base_seed + i`, so the
    /// batch result for a scenario matches the same scenario estimated alone
    /// up to ordinary sampling variation. Batches at or above
    /// `parallel_threshold` fan out across rayon workers.
    pub fn estimate_batch(&self, scenarios: &[EquityScenario]) -> Result<Vec<EquityEstimate>> {
        for (i, sc) in scenarios.iter().enumerate() {
            self.check_scenario(sc.hand, &sc.board, sc.num_opponents)
                .map_err(|e| match e {
                    EngineError::Configuration(msg) => EngineError::configuration(format!(
                        "batch scenario {}: {}",
                        i, msg
                    )),
                    EngineError::InvalidHand(msg) => {
                        EngineError::invalid_hand(format!("batch scenario {}: {}", i, msg))
                    }
                    other => other,
                })?;
        }

        let run_one = |(i, sc): (usize, &EquityScenario)| -> Result<EquityEstimate> {
            let dead = self.check_scenario(sc.hand, &sc.board, sc.num_opponents)?;
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
            Ok(self.sample_vs_random(
                sc.hand,
                &sc.board,
                sc.num_opponents,
                dead,
                self.config.num_samples,
                &mut rng,
            ))
        };

        if scenarios.len() >= self.config.parallel_threshold {
            scenarios.par_iter().enumerate().map(run_one).collect()
        } else {
            scenarios.iter().enumerate().map(run_one).collect()
        }
    }

    /// Validate a scenario and return its dead-card mask.
    fn check_scenario(&self, hand: HoleCards, board: &Board, num_opponents: usize) -> Result<u64> {
        if num_opponents == 0 {
            return Err(EngineError::configuration(
                "equity needs at least one opponent",
            ));
        }
        if num_opponents > 8 {
            return Err(EngineError::configuration(format!(
                "{} opponents exceeds the 8-handed table maximum",
                num_opponents
            )));
        }
        board.street()?;
        for card in hand.cards() {
            if board.contains(card) {
                return Err(EngineError::invalid_hand(format!(
                    "hero card {} is also on the board",
                    card
                )));
            }
        }
        Ok(board.mask() | hand.cards()[0].mask() | hand.cards()[1].mask())
    }

    fn sample_vs_random<R: Rng + ?Sized>(
        &self,
        hand: HoleCards,
        board: &Board,
        num_opponents: usize,
        dead: u64,
        samples: usize,
        rng: &mut R,
    ) -> EquityEstimate {
        let base = Deck::excluding_mask(dead);
        let to_deal = 5 - board.len();

        let mut wins = 0;
        let mut ties = 0;
        let mut share = 0.0;
        let mut runout = Vec::with_capacity(to_deal);
        let mut opponents = Vec::with_capacity(num_opponents);

        for _ in 0..samples {
            let mut deck = base.clone();
            runout.clear();
            opponents.clear();
            for _ in 0..to_deal {
                if let Some(card) = deck.draw(rng) {
                    runout.push(card);
                }
            }
            for _ in 0..num_opponents {
                // 47 live cards cover 8 opponents plus the runout
                let (a, b) = match (deck.draw(rng), deck.draw(rng)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => break,
                };
                if let Ok(hc) = HoleCards::new(a, b) {
                    opponents.push(hc);
                }
            }
            let (w, t, s) = score_showdown(hand, &opponents, board.cards(), &runout);
            wins += w;
            ties += t;
            share += s;
        }

        EquityEstimate::from_counts(wins, ties, share, samples)
    }
}

/// Score one dealt-out sample: (win, tie, pot share) for the hero.
fn score_showdown(
    hero: HoleCards,
    opponents: &[HoleCards],
    board: &[Card],
    runout: &[Card],
) -> (usize, usize, f64) {
    let mut cards = Vec::with_capacity(7);
    cards.extend_from_slice(&hero.cards());
    cards.extend_from_slice(board);
    cards.extend_from_slice(runout);
    let hero_rank = match evaluate(&cards) {
        Ok(r) => r,
        Err(_) => return (0, 0, 0.0),
    };

    let mut best_opp = None;
    let mut best_count = 0usize;
    for opp in opponents {
        cards.clear();
        cards.extend_from_slice(&opp.cards());
        cards.extend_from_slice(board);
        cards.extend_from_slice(runout);
        if let Ok(rank) = evaluate(&cards) {
            match best_opp {
                None => {
                    best_opp = Some(rank);
                    best_count = 1;
                }
                Some(best) if rank > best => {
                    best_opp = Some(rank);
                    best_count = 1;
                }
                Some(best) if rank == best => best_count += 1,
                _ => {}
            }
        }
    }

    match best_opp {
        None => (1, 0, 1.0),
        Some(best) if hero_rank > best => (1, 0, 1.0),
        Some(best) if hero_rank == best => (0, 1, 1.0 / (best_count + 1) as f64),
        _ => (0, 0, 0.0),
    }
}
