//! Strategy distributions and their persistent store.
//!
//! A [`Strategy`] is a checked probability vector over an action list. The
//! [`store`] module holds the queryable map from information-set keys to
//! average strategies that training produces and the decision service reads.

pub mod store;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

pub use store::{StrategyEntry, StrategyFile, StrategyRecord, StrategyStore, STRATEGY_FILE_VERSION};

/// A probability distribution over an ordered action list.
///
/// Entries are non-negative and sum to 1 within `1e-6`. Construction checks
/// both; the degenerate all-zero case normalizes to uniform, which is the
/// regret-matching fallback when no action has positive regret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    probs: Vec<f64>,
}

impl Strategy {
    /// Wrap an already-normalized probability vector, validating it.
    pub fn new(probs: Vec<f64>) -> Result<Self> {
        let strategy = Strategy { probs };
        strategy.validate()?;
        Ok(strategy)
    }

    /// The uniform distribution over `n` actions.
    pub fn uniform(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(EngineError::configuration(
                "cannot build a strategy over zero actions",
            ));
        }
        Ok(Strategy {
            probs: vec![1.0 / n as f64; n],
        })
    }

    /// Normalize non-negative weights into a distribution. Negative entries
    /// are clipped to zero first, which makes this exactly regret matching
    /// when fed a regret vector. Zero total mass falls back to uniform.
    pub fn from_weights(weights: &[f64]) -> Result<Self> {
        if weights.is_empty() {
            return Err(EngineError::configuration(
                "cannot build a strategy over zero actions",
            ));
        }
        let clipped: Vec<f64> = weights.iter().map(|&w| w.max(0.0)).collect();
        let total: f64 = clipped.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Strategy::uniform(weights.len());
        }
        Ok(Strategy {
            probs: clipped.into_iter().map(|w| w / total).collect(),
        })
    }

    /// The probabilities, in action order.
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// Probability of action `index`.
    pub fn prob(&self, index: usize) -> f64 {
        self.probs[index]
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    /// True when the distribution covers no actions. Never holds for a
    /// validated strategy.
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Index of the most probable action; the first one on ties.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.probs.iter().enumerate() {
            if p > self.probs[best] {
                best = i;
            }
        }
        best
    }

    /// Sample an action index proportionally to its probability.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let draw: f64 = rng.gen();
        let mut cumulative = 0.0;
        for (i, &p) in self.probs.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                return i;
            }
        }
        self.probs.len() - 1
    }

    /// Multiply each probability by a non-negative factor and renormalize.
    /// Returns the original distribution unchanged when the reweighted mass
    /// vanishes, so an advisory tilt can never produce an invalid strategy.
    pub fn reweighted(&self, factors: &[f64]) -> Result<Self> {
        if factors.len() != self.probs.len() {
            return Err(EngineError::configuration(format!(
                "{} reweight factors for {} actions",
                factors.len(),
                self.probs.len()
            )));
        }
        let weights: Vec<f64> = self
            .probs
            .iter()
            .zip(factors)
            .map(|(&p, &f)| p * f.max(0.0))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Ok(self.clone());
        }
        Ok(Strategy {
            probs: weights.into_iter().map(|w| w / total).collect(),
        })
    }

    /// Verify non-negativity and unit total mass.
    pub fn validate(&self) -> Result<()> {
        if self.probs.is_empty() {
            return Err(EngineError::configuration(
                "strategy covers zero actions",
            ));
        }
        for &p in &self.probs {
            if !p.is_finite() || p < 0.0 {
                return Err(EngineError::configuration(format!(
                    "strategy probability {} is negative or non-finite",
                    p
                )));
            }
        }
        let total: f64 = self.probs.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(EngineError::configuration(format!(
                "strategy probabilities sum to {}, expected 1",
                total
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_uniform() {
        let s = Strategy::uniform(4).unwrap();
        assert_eq!(s.probs(), &[0.25, 0.25, 0.25, 0.25]);
        assert!(Strategy::uniform(0).is_err());
    }

    #[test]
    fn test_from_weights_is_regret_matching() {
        // Negative regrets are clipped before normalizing.
        let s = Strategy::from_weights(&[3.0, -5.0, 1.0]).unwrap();
        assert!((s.prob(0) - 0.75).abs() < 1e-12);
        assert_eq!(s.prob(1), 0.0);
        assert!((s.prob(2) - 0.25).abs() < 1e-12);

        // No positive regret anywhere: uniform fallback.
        let fallback = Strategy::from_weights(&[-1.0, -2.0, 0.0]).unwrap();
        assert_eq!(fallback.probs(), Strategy::uniform(3).unwrap().probs());
    }

    #[test]
    fn test_new_rejects_invalid() {
        assert!(Strategy::new(vec![0.5, 0.5]).is_ok());
        assert!(Strategy::new(vec![0.5, 0.6]).is_err());
        assert!(Strategy::new(vec![-0.1, 1.1]).is_err());
        assert!(Strategy::new(vec![]).is_err());
        assert!(Strategy::new(vec![f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        let s = Strategy::new(vec![0.4, 0.4, 0.2]).unwrap();
        assert_eq!(s.argmax(), 0);
        let t = Strategy::new(vec![0.1, 0.2, 0.7]).unwrap();
        assert_eq!(t.argmax(), 2);
    }

    #[test]
    fn test_sample_tracks_distribution() {
        let s = Strategy::new(vec![0.1, 0.7, 0.2]).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut counts = [0usize; 3];
        for _ in 0..5000 {
            counts[s.sample(&mut rng)] += 1;
        }
        assert!(counts[1] > counts[0]);
        assert!(counts[1] > counts[2]);
        let middle = counts[1] as f64 / 5000.0;
        assert!((middle - 0.7).abs() < 0.05);
    }

    #[test]
    fn test_reweighted_normalizes() {
        let s = Strategy::new(vec![0.5, 0.5]).unwrap();
        let tilted = s.reweighted(&[2.0, 1.0]).unwrap();
        assert!((tilted.prob(0) - 2.0 / 3.0).abs() < 1e-12);
        tilted.validate().unwrap();

        // Degenerate factors leave the strategy unchanged.
        let unchanged = s.reweighted(&[0.0, 0.0]).unwrap();
        assert_eq!(unchanged.probs(), s.probs());

        assert!(s.reweighted(&[1.0]).is_err());
    }
}
