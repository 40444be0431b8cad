//! Game trait the CFR trainer runs against.
//!
//! Any extensive-form game implementing [`Game`] can be trained. The trainer
//! never inspects concrete state; it sees terminals, chance nodes, decision
//! points, and typed information-set keys.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use rand::Rng;

use crate::error::Result;

/// Key identifying an information set. Blanket-implemented for any type with
/// the required bounds; game implementations never write this impl by hand.
pub trait InfoKey: Clone + Eq + Hash + Display + Send + Sync {}

impl<T: Clone + Eq + Hash + Display + Send + Sync> InfoKey for T {}

/// An action a player can take. Blanket-implemented like [`InfoKey`].
pub trait GameAction: Clone + PartialEq + Debug + Send + Sync {}

impl<T: Clone + PartialEq + Debug + Send + Sync> GameAction for T {}

/// An extensive-form game with chance nodes and imperfect information.
///
/// States flow root-to-terminal: chance nodes resolve through
/// [`sample_chance`], decision points expose [`legal_actions`] for
/// [`current_player`], and terminals pay out through [`payoff`].
///
/// [`sample_chance`]: Game::sample_chance
/// [`legal_actions`]: Game::legal_actions
/// [`current_player`]: Game::current_player
/// [`payoff`]: Game::payoff
pub trait Game: Send + Sync {
    /// Complete game state, including private information.
    type State: Clone + Send;

    /// Player action type.
    type Action: GameAction;

    /// Information-set key type.
    type Key: InfoKey;

    /// The state every traversal starts from.
    fn root(&self) -> Self::State;

    /// Number of players.
    fn num_players(&self) -> usize;

    /// True when the hand is over and payoffs are defined.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Utility of a terminal state for `player`. Zero-sum across players.
    fn payoff(&self, state: &Self::State, player: usize) -> Result<f64>;

    /// True when the next event is random (a deal), not a decision.
    fn is_chance(&self, state: &Self::State) -> bool;

    /// Resolve one chance event, drawing randomness from `rng`.
    fn sample_chance<R: Rng + ?Sized>(&self, state: &Self::State, rng: &mut R) -> Self::State;

    /// All chance outcomes with their probabilities, when the game is small
    /// enough to enumerate them. Exact best-response evaluation requires
    /// this; sampled training never calls it.
    fn chance_outcomes(&self, _state: &Self::State) -> Option<Vec<(Self::State, f64)>> {
        None
    }

    /// Index of the player to act, or `None` at terminals and chance nodes.
    fn current_player(&self, state: &Self::State) -> Option<usize>;

    /// Actions open to the current player. Empty only at terminals and
    /// chance nodes; an empty list at a decision point is a game defect the
    /// trainer aborts on.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Apply an action, returning the successor state.
    fn next_state(&self, state: &Self::State, action: &Self::Action) -> Self::State;

    /// Information-set key for the player to act.
    fn info_key(&self, state: &Self::State) -> Result<Self::Key>;
}
