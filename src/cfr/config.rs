//! Trainer configuration and statistics.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// How the traversal expands nodes that are not the traverser's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalMode {
    /// Expand every action at every decision node. Exact counterfactual
    /// values; only tractable for small trees.
    Full,
    /// External sampling: expand all traverser actions, sample one action at
    /// opponent nodes (unless the fan-out is small enough to expand).
    ExternalSampling,
}

/// Configuration for the CFR trainer.
///
/// Defaults give reproducible external-sampling runs on one worker. Use the
/// builders to widen:
///
/// ```
/// use gto_engine::cfr::TrainerConfig;
///
/// let config = TrainerConfig::default().with_workers(4).with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Random seed. Fixed by default so runs reproduce.
    pub seed: u64,

    /// Parallel workers. `1` trains sequentially on the calling thread.
    pub num_workers: usize,

    /// Iterations per worker batch. Workers accumulate into private stores
    /// for one batch, then merge, so larger batches mean less lock traffic
    /// and staler strategies within the batch.
    pub batch_size: u64,

    /// Node expansion mode.
    pub mode: TraversalMode,

    /// In sampling mode, opponent nodes with at most this many actions are
    /// fully expanded anyway. Zero means always sample.
    pub max_expand_actions: usize,

    /// Probability of sampling a uniform-random opponent action instead of
    /// one from the current strategy. Small values help coverage early;
    /// zero is unbiased external sampling.
    pub exploration: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            num_workers: 1,
            batch_size: 64,
            mode: TraversalMode::ExternalSampling,
            max_expand_actions: 2,
            exploration: 0.05,
        }
    }
}

impl TrainerConfig {
    /// Small-batch preset for tests and smoke runs.
    pub fn fast() -> Self {
        Self {
            batch_size: 16,
            ..Self::default()
        }
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of parallel workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers;
        self
    }

    /// Set the per-worker batch size.
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the traversal mode.
    pub fn with_mode(mut self, mode: TraversalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the exploration probability, clamped to `[0, 1]`.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration.clamp(0.0, 1.0);
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(EngineError::configuration("num_workers must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(EngineError::configuration("batch_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(EngineError::configuration(format!(
                "exploration {} outside [0, 1]",
                self.exploration
            )));
        }
        Ok(())
    }
}

/// Statistics from a training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainerStats {
    /// Iterations completed over the trainer's lifetime.
    pub iterations: u64,

    /// Unique information sets discovered.
    pub info_sets: usize,

    /// Per-player traversals skipped due to transient abstraction errors.
    pub skipped_traversals: u64,

    /// Checkpoints flushed to the strategy store.
    pub checkpoints: u64,

    /// Wall-clock training time in seconds.
    pub elapsed_seconds: f64,

    /// Iterations per second over the elapsed time.
    pub iterations_per_second: f64,

    /// Exploitability measurements, when the game supports them.
    pub exploitability_history: Vec<ExploitabilityPoint>,
}

/// One exploitability measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploitabilityPoint {
    /// Iteration the measurement was taken at.
    pub iteration: u64,
    /// Average best-response gain over the current average strategy.
    pub exploitability: f64,
}

impl TrainerStats {
    /// Recompute the iteration rate from the elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }

    /// Record an exploitability measurement.
    pub fn record_exploitability(&mut self, iteration: u64, exploitability: f64) {
        self.exploitability_history.push(ExploitabilityPoint {
            iteration,
            exploitability,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(TrainerConfig::default().validate().is_ok());
        assert!(TrainerConfig::fast().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_ranges() {
        let zero_workers = TrainerConfig {
            num_workers: 0,
            ..TrainerConfig::default()
        };
        assert!(zero_workers.validate().is_err());

        let zero_batch = TrainerConfig {
            batch_size: 0,
            ..TrainerConfig::default()
        };
        assert!(zero_batch.validate().is_err());

        let wild_exploration = TrainerConfig {
            exploration: 1.5,
            ..TrainerConfig::default()
        };
        assert!(wild_exploration.validate().is_err());
    }

    #[test]
    fn test_builder_clamps_exploration() {
        let config = TrainerConfig::default().with_exploration(2.0);
        assert_eq!(config.exploration, 1.0);
    }

    #[test]
    fn test_stats_rate() {
        let mut stats = TrainerStats {
            iterations: 500,
            elapsed_seconds: 2.0,
            ..TrainerStats::default()
        };
        stats.update_rate();
        assert_eq!(stats.iterations_per_second, 250.0);
    }
}
