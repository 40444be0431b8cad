//! Discretized betting actions and sizing tables.
//!
//! Tree actions carry sizing indices, not chip amounts. The same index always
//! means the same pot fraction at a given street, so information-set keys
//! stay aligned with action lists no matter what the actual stacks are. Chip
//! amounts are resolved when an action is applied to a state or surfaced to
//! a caller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::Street;
use crate::error::{EngineError, Result};

/// A discretized player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbstractAction {
    /// Surrender the pot.
    Fold,
    /// Pass with no bet outstanding.
    Check,
    /// Match the outstanding bet.
    Call,
    /// Open the betting for the street; index into the street's sizing table.
    Bet(u8),
    /// Raise over an outstanding bet; index into the raise sizing table.
    Raise(u8),
    /// Commit the entire remaining stack.
    AllIn,
}

impl AbstractAction {
    /// True for actions that put new chips in beyond a call.
    pub fn is_aggressive(self) -> bool {
        matches!(
            self,
            AbstractAction::Bet(_) | AbstractAction::Raise(_) | AbstractAction::AllIn
        )
    }
}

impl fmt::Display for AbstractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractAction::Fold => write!(f, "fold"),
            AbstractAction::Check => write!(f, "check"),
            AbstractAction::Call => write!(f, "call"),
            AbstractAction::Bet(i) => write!(f, "bet{}", i),
            AbstractAction::Raise(i) => write!(f, "raise{}", i),
            AbstractAction::AllIn => write!(f, "allin"),
        }
    }
}

/// Bet and raise sizing tables, in pot fractions postflop and blind-relative
/// terms preflop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetSizing {
    /// Preflop open size in big blinds.
    pub preflop_open_bb: f64,

    /// Preflop re-raise multiple of the outstanding amount.
    pub preflop_raise_factor: f64,

    /// Flop bet sizes as pot fractions.
    pub flop: Vec<f64>,

    /// Turn bet sizes as pot fractions.
    pub turn: Vec<f64>,

    /// River bet sizes as pot fractions.
    pub river: Vec<f64>,

    /// Raise sizes as fractions of the pot after calling.
    pub raise: Vec<f64>,

    /// Aggressive actions allowed per street before betting locks to
    /// call-or-fold. The preflop big blind does not count.
    pub max_raises_per_street: u8,

    /// At or below this stack-to-pot ratio the only aggressive option is the
    /// shove, keeping shallow-stack action sets small and key-stable.
    pub shove_below_spr: f64,
}

impl Default for BetSizing {
    fn default() -> Self {
        Self {
            preflop_open_bb: 2.5,
            preflop_raise_factor: 3.0,
            flop: vec![0.5, 1.0],
            turn: vec![0.75],
            river: vec![0.75],
            raise: vec![1.0],
            max_raises_per_street: 2,
            shove_below_spr: 3.0,
        }
    }
}

impl BetSizing {
    /// Bet sizing table for a postflop street; empty preflop, where opens
    /// are blind-relative instead.
    pub fn bets_for(&self, street: Street) -> &[f64] {
        match street {
            Street::Preflop => &[],
            Street::Flop => &self.flop,
            Street::Turn => &self.turn,
            Street::River => &self.river,
        }
    }

    /// Check all sizes are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.preflop_open_bb.is_finite() || self.preflop_open_bb <= 1.0 {
            return Err(EngineError::configuration(format!(
                "preflop open {} bb must exceed one big blind",
                self.preflop_open_bb
            )));
        }
        if !self.preflop_raise_factor.is_finite() || self.preflop_raise_factor <= 1.0 {
            return Err(EngineError::configuration(format!(
                "preflop raise factor {} must exceed 1",
                self.preflop_raise_factor
            )));
        }
        for (name, table) in [
            ("flop", &self.flop),
            ("turn", &self.turn),
            ("river", &self.river),
            ("raise", &self.raise),
        ] {
            if table.is_empty() {
                return Err(EngineError::configuration(format!(
                    "{} sizing table is empty",
                    name
                )));
            }
            for &frac in table {
                if !frac.is_finite() || frac <= 0.0 {
                    return Err(EngineError::configuration(format!(
                        "{} sizing fraction {} must be positive",
                        name, frac
                    )));
                }
            }
        }
        if self.max_raises_per_street == 0 {
            return Err(EngineError::configuration(
                "max_raises_per_street must be at least 1",
            ));
        }
        if !self.shove_below_spr.is_finite() || self.shove_below_spr < 0.0 {
            return Err(EngineError::configuration(format!(
                "shove_below_spr {} must be non-negative",
                self.shove_below_spr
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggression_classes() {
        assert!(AbstractAction::Bet(0).is_aggressive());
        assert!(AbstractAction::Raise(1).is_aggressive());
        assert!(AbstractAction::AllIn.is_aggressive());
        assert!(!AbstractAction::Fold.is_aggressive());
        assert!(!AbstractAction::Check.is_aggressive());
        assert!(!AbstractAction::Call.is_aggressive());
    }

    #[test]
    fn test_display_codes() {
        assert_eq!(AbstractAction::Bet(1).to_string(), "bet1");
        assert_eq!(AbstractAction::AllIn.to_string(), "allin");
        assert_eq!(AbstractAction::Fold.to_string(), "fold");
    }

    #[test]
    fn test_default_sizing_validates() {
        let sizing = BetSizing::default();
        sizing.validate().unwrap();
        assert_eq!(sizing.bets_for(Street::Preflop), &[] as &[f64]);
        assert_eq!(sizing.bets_for(Street::Flop).len(), 2);
    }

    #[test]
    fn test_sizing_rejects_bad_tables() {
        let mut empty_table = BetSizing::default();
        empty_table.turn = vec![];
        assert!(empty_table.validate().is_err());

        let mut negative = BetSizing::default();
        negative.flop = vec![0.5, -1.0];
        assert!(negative.validate().is_err());

        let mut tiny_open = BetSizing::default();
        tiny_open.preflop_open_bb = 0.8;
        assert!(tiny_open.validate().is_err());
    }
}
