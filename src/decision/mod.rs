//! Live-hand decision service.
//!
//! Resolution runs through three stages in order: an exact Strategy Store
//! hit, the nearest stored neighbour within a key-distance bound, then a
//! bounded CFR solve rooted at the live hand. Every answer carries a
//! [`Provenance`] tag and a confidence so callers can judge how much weight
//! to put on it. The store is read-only here; nothing the service does
//! feeds back into training state.
//!
//! An optional [`OpponentProfile`] tilts the returned distribution before an
//! action is chosen. The tilt is advisory: it rescales probabilities within
//! bounded factors and renormalizes, it never adds or removes actions.

use std::fmt;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::abstraction::{
    AbstractionConfig, AbstractionEngine, AbstractionKey, DistanceWeights, PositionBucket,
    StateView,
};
use crate::cards::{Board, HoleCards, Street};
use crate::cfr::{Game, Trainer, TrainerConfig};
use crate::error::{EngineError, Result};
use crate::game::{AbstractAction, GameConfig, HoldemGame, LiveRootSpec, Seat};
use crate::strategy::{Strategy, StrategyStore};

/// Confidence reported for an exact store hit.
const EXACT_CONFIDENCE: f64 = 0.95;
/// Confidence reported for a bounded live solve.
const LIVE_SOLVE_CONFIDENCE: f64 = 0.6;
/// How much confidence decays as an approximate hit approaches the distance
/// bound.
const APPROX_CONFIDENCE_SPAN: f64 = 0.3;

/// A hand in progress, described from the hero's chair.
///
/// `stacks` is hero-first; the remaining entries are the live opponents in
/// any order. Card fields are re-validated on use, the rest is trusted from
/// upstream table state.
#[derive(Debug, Clone)]
pub struct LiveState {
    /// Hero's hole cards.
    pub hero_hand: HoleCards,
    /// Community cards dealt so far.
    pub board: Board,
    /// Current pot, including chips committed this street.
    pub pot: f64,
    /// Amount the hero must add to continue.
    pub to_call: f64,
    /// Remaining stacks, hero first.
    pub stacks: Vec<f64>,
    /// Hero's seat, 0 = button counting clockwise.
    pub hero_seat: usize,
    /// Players dealt into the hand.
    pub table_size: usize,
    /// Opponents still contesting the pot.
    pub num_opponents: usize,
    /// Checks made this street.
    pub checks: u8,
    /// Calls made this street.
    pub calls: u8,
    /// Bets and raises made this street.
    pub raises: u8,
}

impl LiveState {
    /// Check the state is coherent enough to act on.
    pub fn validate(&self) -> Result<()> {
        if self.board.mask() & self.hero_hand.mask() != 0 {
            return Err(EngineError::invalid_hand(format!(
                "hero hand {} overlaps the board {}",
                self.hero_hand, self.board
            )));
        }
        self.board.street()?;
        if self.stacks.len() < 2 {
            return Err(EngineError::configuration(
                "live state needs the hero stack and at least one opponent stack",
            ));
        }
        for (i, stack) in self.stacks.iter().enumerate() {
            if !stack.is_finite() || *stack < 0.0 {
                return Err(EngineError::configuration(format!(
                    "stack {} is {}, must be finite and non-negative",
                    i, stack
                )));
            }
        }
        if !self.pot.is_finite() || self.pot <= 0.0 {
            return Err(EngineError::configuration(format!(
                "live pot {} must be positive",
                self.pot
            )));
        }
        if !self.to_call.is_finite() || self.to_call < 0.0 {
            return Err(EngineError::configuration(format!(
                "amount to call {} must be non-negative",
                self.to_call
            )));
        }
        if self.to_call > self.pot {
            return Err(EngineError::configuration(
                "amount to call exceeds the pot it is part of",
            ));
        }
        if self.num_opponents == 0 || self.num_opponents > self.stacks.len() - 1 {
            return Err(EngineError::configuration(format!(
                "{} active opponents with {} stacks listed",
                self.num_opponents,
                self.stacks.len()
            )));
        }
        PositionBucket::from_seat(self.hero_seat, self.table_size)?;
        Ok(())
    }

    /// Street implied by the board.
    pub fn street(&self) -> Result<Street> {
        self.board.street()
    }

    /// Hero's remaining stack.
    pub fn hero_stack(&self) -> f64 {
        self.stacks.first().copied().unwrap_or(0.0)
    }

    /// Hero's stack capped by the largest opponent stack; chips beyond that
    /// can never be won or lost.
    pub fn effective_stack(&self) -> f64 {
        let cover = self
            .stacks
            .iter()
            .skip(1)
            .fold(0.0f64, |best, &stack| best.max(stack));
        self.hero_stack().min(cover)
    }

    /// Price of continuing: call amount as a fraction of the pot after the
    /// call. Zero when there is nothing to call.
    pub fn pot_odds(&self) -> f64 {
        if self.to_call <= 0.0 {
            return 0.0;
        }
        self.to_call / (self.pot + self.to_call)
    }

    /// True when a bet is outstanding against the hero.
    pub fn facing_bet(&self) -> bool {
        self.to_call > 0.0
    }
}

/// The concrete reply sent back to the table. Bet and raise amounts are the
/// chips the hero adds on top of what is already committed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Surrender the pot.
    Fold,
    /// Pass with no bet outstanding.
    Check,
    /// Match the outstanding bet.
    Call,
    /// Open the betting for this many chips.
    Bet(f64),
    /// Raise, adding this many chips.
    Raise(f64),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Fold => write!(f, "fold"),
            Action::Check => write!(f, "check"),
            Action::Call => write!(f, "call"),
            Action::Bet(amount) => write!(f, "bet {:.2}", amount),
            Action::Raise(amount) => write!(f, "raise {:.2}", amount),
        }
    }
}

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Provenance {
    /// The live state keyed straight onto a trained entry.
    Exact,
    /// Nearest trained neighbour within the distance bound.
    Approximate {
        /// Key distance to the entry used.
        distance: f64,
    },
    /// No usable entry; a bounded solve ran from the live state.
    LiveSolve {
        /// Iterations the solve was given.
        iterations: u64,
    },
}

/// A resolved decision: the chosen action plus the full distribution it was
/// chosen from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// The action to take.
    pub action: Action,
    /// Rough trust in the answer, 0 to 1.
    pub confidence: f64,
    /// Which resolution stage produced it.
    pub provenance: Provenance,
    /// The abstract actions considered, aligned with `strategy`.
    pub actions: Vec<AbstractAction>,
    /// Probability over `actions` after any advisory tilt.
    pub strategy: Strategy,
}

/// How to pick an action from the mixed strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionPolicy {
    /// Draw proportionally to the probabilities. Unexploitable play.
    Sample,
    /// Always take the most probable action. Deterministic but readable.
    Argmax,
}

/// Tendencies of the current opposition, used only to tilt the returned
/// distribution. Neutral values leave it untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpponentProfile {
    /// Bets-and-raises to calls ratio; 1.5 is a balanced player.
    pub aggression_factor: f64,
    /// How often they fold when bet into; 0.5 is balanced.
    pub fold_to_pressure: f64,
}

impl OpponentProfile {
    /// A balanced opponent. Tilting with this profile is a no-op.
    pub fn neutral() -> Self {
        Self {
            aggression_factor: 1.5,
            fold_to_pressure: 0.5,
        }
    }

    /// Check both reads are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.aggression_factor.is_finite() || self.aggression_factor <= 0.0 {
            return Err(EngineError::configuration(format!(
                "aggression factor {} must be positive",
                self.aggression_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.fold_to_pressure) {
            return Err(EngineError::configuration(format!(
                "fold-to-pressure {} must be within 0..=1",
                self.fold_to_pressure
            )));
        }
        Ok(())
    }
}

impl Default for OpponentProfile {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Decision service configuration.
///
/// The abstraction and game sections must match the configuration the
/// Strategy Store was trained under, or live keys will land between the
/// trained ones and everything degrades to approximate hits.
#[derive(Debug, Clone)]
pub struct DecisionConfig {
    /// How the final action is picked from the distribution.
    pub policy: ActionPolicy,
    /// Largest key distance an approximate hit may have.
    pub max_key_distance: f64,
    /// Iteration budget for the live-solve fallback.
    pub live_solve_iterations: u64,
    /// Advisory tilt strength, 0 (off) to 1.
    pub advisory_strength: f64,
    /// Seed for action sampling and live-solve RNG streams.
    pub seed: u64,
    /// Per-field weights for approximate key distance.
    pub weights: DistanceWeights,
    /// Abstraction the store was trained under.
    pub abstraction: AbstractionConfig,
    /// Game model for the live-solve fallback.
    pub game: GameConfig,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            policy: ActionPolicy::Sample,
            max_key_distance: 4.0,
            live_solve_iterations: 500,
            advisory_strength: 0.25,
            seed: 1,
            weights: DistanceWeights::default(),
            abstraction: AbstractionConfig::default(),
            game: GameConfig::default(),
        }
    }
}

impl DecisionConfig {
    /// Cheap settings for tests: coarse abstraction, flop-terminal game
    /// model, small solve budget.
    pub fn fast() -> Self {
        Self {
            live_solve_iterations: 150,
            abstraction: AbstractionConfig::fast(),
            game: GameConfig::fast(),
            ..Self::default()
        }
    }

    /// Set the action selection policy.
    pub fn with_policy(mut self, policy: ActionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the approximate-hit distance bound.
    pub fn with_max_key_distance(mut self, distance: f64) -> Self {
        self.max_key_distance = distance;
        self
    }

    /// Set the live-solve iteration budget.
    pub fn with_live_solve_iterations(mut self, iterations: u64) -> Self {
        self.live_solve_iterations = iterations;
        self
    }

    /// Set the advisory tilt strength.
    pub fn with_advisory_strength(mut self, strength: f64) -> Self {
        self.advisory_strength = strength;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every knob is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.max_key_distance.is_finite() || self.max_key_distance < 0.0 {
            return Err(EngineError::configuration(format!(
                "max key distance {} must be finite and non-negative",
                self.max_key_distance
            )));
        }
        if self.live_solve_iterations == 0 {
            return Err(EngineError::configuration(
                "live solve needs at least one iteration",
            ));
        }
        if !(0.0..=1.0).contains(&self.advisory_strength) {
            return Err(EngineError::configuration(format!(
                "advisory strength {} must be within 0..=1",
                self.advisory_strength
            )));
        }
        self.weights.validate()?;
        self.abstraction.validate()?;
        self.game.validate()?;
        Ok(())
    }
}

/// Serves decisions from a trained [`StrategyStore`], falling back to a
/// bounded solve when the store has nothing usable.
pub struct DecisionService {
    config: DecisionConfig,
    engine: AbstractionEngine,
    store: StrategyStore<AbstractionKey, AbstractAction>,
    profile: Option<OpponentProfile>,
    rng: StdRng,
}

impl DecisionService {
    /// Build a service over a trained store.
    pub fn new(
        store: StrategyStore<AbstractionKey, AbstractAction>,
        config: DecisionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let engine = AbstractionEngine::new(config.abstraction.clone())?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(DecisionService {
            config,
            engine,
            store,
            profile: None,
            rng,
        })
    }

    /// The store being served from.
    pub fn store(&self) -> &StrategyStore<AbstractionKey, AbstractAction> {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Install or clear the opponent read used for advisory tilting.
    pub fn set_profile(&mut self, profile: Option<OpponentProfile>) -> Result<()> {
        if let Some(ref p) = profile {
            p.validate()?;
        }
        self.profile = profile;
        Ok(())
    }

    /// Key a live state the same way training keyed its decision points.
    pub fn abstract_key(&self, live: &LiveState) -> Result<AbstractionKey> {
        live.validate()?;
        let position = PositionBucket::from_seat(live.hero_seat, live.table_size)?;
        let view = StateView {
            hand: live.hero_hand,
            board: &live.board,
            street: live.street()?,
            position,
            effective_stack: live.effective_stack(),
            pot: live.pot,
            checks: live.checks,
            calls: live.calls,
            raises: live.raises,
            facing_bet: live.facing_bet(),
        };
        self.engine.key_for(&view)
    }

    /// Resolve a decision for the hero.
    ///
    /// Fails with [`EngineError::NoLegalAction`] when the hero has no chips
    /// behind, with `InvalidHand`/`UnabstractableState` on malformed input,
    /// and with `Configuration` when the live-solve fallback cannot model
    /// the spot. Otherwise it always answers.
    pub fn decide(&mut self, live: &LiveState) -> Result<Decision> {
        live.validate()?;
        if live.hero_stack() <= 0.0 {
            return Err(EngineError::no_legal_action("hero has no chips behind"));
        }
        let street = live.street()?;
        let key = self.abstract_key(live)?;

        let resolved = self
            .resolve_exact(&key, live, street)
            .or_else(|| self.resolve_approximate(&key, live, street));
        let (actions, strategy, provenance) = match resolved {
            Some(hit) => hit,
            None => self.live_solve(live, street)?,
        };

        let strategy = self.apply_profile(&actions, strategy)?;
        let index = match self.config.policy {
            ActionPolicy::Sample => strategy.sample(&mut self.rng),
            ActionPolicy::Argmax => strategy.argmax(),
        };
        let action = self.concrete_action(actions[index], live, street);
        let confidence = self.confidence(provenance);
        debug!(
            "{} on {}: {} ({:?}, confidence {:.2})",
            live.hero_hand.class_string(),
            live.board,
            action,
            provenance,
            confidence
        );
        Ok(Decision {
            action,
            confidence,
            provenance,
            actions,
            strategy,
        })
    }

    fn resolve_exact(
        &self,
        key: &AbstractionKey,
        live: &LiveState,
        street: Street,
    ) -> Option<(Vec<AbstractAction>, Strategy, Provenance)> {
        let entry = self.store.get_exact(key)?;
        let (actions, strategy) =
            restrict_to_live(&entry.actions, &entry.strategy, live.facing_bet(), street)?;
        debug!("exact hit for {}", key);
        Some((actions, strategy, Provenance::Exact))
    }

    fn resolve_approximate(
        &self,
        key: &AbstractionKey,
        live: &LiveState,
        street: Street,
    ) -> Option<(Vec<AbstractAction>, Strategy, Provenance)> {
        let (entry, distance) =
            self.store
                .get_approximate(key, self.config.max_key_distance, &self.config.weights)?;
        let (actions, strategy) =
            restrict_to_live(&entry.actions, &entry.strategy, live.facing_bet(), street)?;
        debug!("approximate hit for {} at distance {:.2}", key, distance);
        Some((actions, strategy, Provenance::Approximate { distance }))
    }

    /// Solve the spot from scratch: root the game model at the live state,
    /// run a bounded number of iterations, and read the hero's root
    /// strategy back out.
    fn live_solve(
        &mut self,
        live: &LiveState,
        street: Street,
    ) -> Result<(Vec<AbstractAction>, Strategy, Provenance)> {
        let iterations = self.config.live_solve_iterations;
        info!(
            "store miss for {} on {:?}; solving {} iterations",
            live.hero_hand.class_string(),
            street,
            iterations
        );

        let spec = self.live_root_spec(live)?;
        let mut game_config = self.config.game.clone();
        // Truncate at the current street so the budget is spent on the
        // decision actually faced; later streets collapse into equity.
        game_config.terminal_street = Some(street);
        let game = HoldemGame::rooted(game_config, self.config.abstraction.clone(), &spec)?;

        let seed = self.config.seed
            ^ live.hero_hand.mask().wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ live.board.mask().rotate_left(17);
        let trainer_config = TrainerConfig::default().with_seed(seed);
        let mut trainer = Trainer::new(game, trainer_config)?;
        trainer.train(iterations, iterations)?;

        let game = trainer.game();
        let mut state = game.root();
        let mut guard = 0;
        while game.is_chance(&state) {
            state = game.sample_chance(&state, &mut self.rng);
            guard += 1;
            if guard > 8 {
                return Err(EngineError::configuration(
                    "live solve root never reached a decision point",
                ));
            }
        }
        let actions = game.legal_actions(&state);
        if actions.is_empty() {
            return Err(EngineError::no_legal_action(
                "live solve reached a decision with no actions",
            ));
        }
        let key = game.info_key(&state)?;
        let strategy = match trainer.regrets().average_strategy(&key) {
            Some(Ok(s)) if s.len() == actions.len() => s,
            _ => Strategy::uniform(actions.len())?,
        };
        Ok((actions, strategy, Provenance::LiveSolve { iterations }))
    }

    /// Collapse the (possibly multiway) live table into the heads-up model:
    /// the hero against the one opponent whose stack covers the field.
    fn live_root_spec(&self, live: &LiveState) -> Result<LiveRootSpec> {
        let hero_bucket = PositionBucket::from_seat(live.hero_seat, live.table_size)?;
        let hero_seat = if hero_bucket == PositionBucket::Late {
            Seat::InPosition
        } else {
            Seat::OutOfPosition
        };
        let villain_bucket = match hero_seat {
            Seat::InPosition => PositionBucket::Blinds,
            Seat::OutOfPosition => PositionBucket::Late,
        };
        let villain_stack = live
            .stacks
            .iter()
            .skip(1)
            .fold(0.0f64, |best, &stack| best.max(stack));

        let mut stacks = [0.0; 2];
        let mut positions = [hero_bucket; 2];
        stacks[hero_seat.index()] = live.hero_stack();
        stacks[hero_seat.other().index()] = villain_stack;
        positions[hero_seat.other().index()] = villain_bucket;

        Ok(LiveRootSpec {
            hero_seat,
            hero_hand: live.hero_hand,
            board: live.board.clone(),
            pot: live.pot,
            to_call: live.to_call,
            stacks,
            positions,
            checks: live.checks,
            calls: live.calls,
            raises: live.raises,
        })
    }

    fn apply_profile(&self, actions: &[AbstractAction], strategy: Strategy) -> Result<Strategy> {
        let profile = match self.profile {
            Some(p) if self.config.advisory_strength > 0.0 => p,
            _ => return Ok(strategy),
        };
        let strength = self.config.advisory_strength;
        let factors: Vec<f64> = actions
            .iter()
            .map(|&action| advisory_factor(action, &profile, strength))
            .collect();
        strategy.reweighted(&factors)
    }

    fn confidence(&self, provenance: Provenance) -> f64 {
        match provenance {
            Provenance::Exact => EXACT_CONFIDENCE,
            Provenance::Approximate { distance } => {
                let reach = if self.config.max_key_distance > 0.0 {
                    (distance / self.config.max_key_distance).min(1.0)
                } else {
                    1.0
                };
                EXACT_CONFIDENCE - APPROX_CONFIDENCE_SPAN * reach
            }
            Provenance::LiveSolve { .. } => LIVE_SOLVE_CONFIDENCE,
        }
    }

    /// Turn a tree action into table chips. Bets are pot fractions, raises
    /// add the call plus a fraction of the resulting pot, the preflop ladder
    /// works in blind multiples, and everything is capped by the hero's
    /// stack.
    fn concrete_action(&self, action: AbstractAction, live: &LiveState, street: Street) -> Action {
        let sizing = &self.config.game.sizing;
        let stack = live.hero_stack();
        match action {
            AbstractAction::Fold => Action::Fold,
            AbstractAction::Check => Action::Check,
            AbstractAction::Call => Action::Call,
            AbstractAction::AllIn => {
                if live.facing_bet() {
                    Action::Raise(stack)
                } else {
                    Action::Bet(stack)
                }
            }
            AbstractAction::Bet(index) => {
                let table = sizing.bets_for(street);
                let fraction = table
                    .get(index as usize)
                    .or_else(|| table.last())
                    .copied()
                    .unwrap_or(1.0);
                Action::Bet((live.pot * fraction).min(stack))
            }
            AbstractAction::Raise(index) => {
                let amount = if street == Street::Preflop {
                    if live.raises == 0 {
                        sizing.preflop_open_bb * self.config.game.big_blind
                    } else {
                        live.to_call * sizing.preflop_raise_factor
                    }
                } else {
                    let fraction = sizing
                        .raise
                        .get(index as usize)
                        .or_else(|| sizing.raise.last())
                        .copied()
                        .unwrap_or(1.0);
                    live.to_call + (live.pot + live.to_call) * fraction
                };
                Action::Raise(amount.min(stack))
            }
        }
    }
}

/// Drop stored actions that are illegal at the live decision (a stored
/// check when a bet is outstanding, say) and renormalize over the rest.
/// `None` when nothing survives, which sends the caller to the next
/// resolution stage.
fn restrict_to_live(
    actions: &[AbstractAction],
    strategy: &Strategy,
    facing: bool,
    street: Street,
) -> Option<(Vec<AbstractAction>, Strategy)> {
    if actions.len() != strategy.len() {
        return None;
    }
    let mut kept = Vec::with_capacity(actions.len());
    let mut weights = Vec::with_capacity(actions.len());
    for (i, &action) in actions.iter().enumerate() {
        if live_legal(action, facing, street) {
            kept.push(action);
            weights.push(strategy.prob(i));
        }
    }
    if kept.is_empty() {
        return None;
    }
    let strategy = Strategy::from_weights(&weights).ok()?;
    Some((kept, strategy))
}

/// Mirror of the game tree's legality rule. Preflop aggression is a raise
/// over the blind even when nothing has been bet this street.
fn live_legal(action: AbstractAction, facing: bool, street: Street) -> bool {
    match action {
        AbstractAction::Fold | AbstractAction::Call => facing,
        AbstractAction::Check => !facing,
        AbstractAction::Bet(_) => !facing,
        AbstractAction::Raise(_) => facing || street == Street::Preflop,
        AbstractAction::AllIn => true,
    }
}

/// Bounded multiplier for one action under an opponent read. Over-folders
/// make aggression more attractive; an aggressive opponent makes calling
/// down more attractive.
fn advisory_factor(action: AbstractAction, profile: &OpponentProfile, strength: f64) -> f64 {
    let factor = if action.is_aggressive() {
        1.0 + strength * (profile.fold_to_pressure - 0.5) * 2.0
    } else if action == AbstractAction::Call {
        1.0 + strength * ((profile.aggression_factor - 1.5) / 3.0)
    } else {
        1.0
    };
    factor.max(0.1)
}
