//! The two-seat no-limit hold'em tree the trainer runs on.
//!
//! Training roots are scenarios: position pairs and stack depths chosen at a
//! root chance node, with all cards dealt fresh each traversal. Live roots
//! pin the hero's actual cards, board, pot, and outstanding bet, and deal
//! only the unknown opponent cards, so the same tree answers mid-hand
//! questions. Hands can end early at a configured terminal street, where
//! payoffs come from equity against the opponent's sampled hand instead of a
//! full runout.

pub mod actions;
pub mod state;

use std::sync::RwLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::abstraction::engine::card_seed;
use crate::abstraction::{
    AbstractionConfig, AbstractionEngine, AbstractionKey, PositionBucket, StateView,
};
use crate::cards::eval::evaluate;
use crate::cards::{Board, Card, Deck, HoleCards, Street};
use crate::cfr::Game;
use crate::equity::{EquityConfig, EquityEstimator};
use crate::error::{EngineError, Result};

pub use actions::{AbstractAction, BetSizing};
pub use state::{HandState, Seat};

/// One training root: who sits where and how deep the stacks are, in big
/// blinds. Cards are never part of a scenario; they are dealt per traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Position bucket of the out-of-position seat.
    pub oop: PositionBucket,
    /// Position bucket of the in-position seat.
    pub ip: PositionBucket,
    /// Starting stacks for both seats.
    pub stack_bb: f64,
}

/// Tree shape and chip mechanics for [`HoldemGame`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Small blind, posted by the out-of-position seat.
    pub small_blind: f64,
    /// Big blind, posted by the in-position seat.
    pub big_blind: f64,
    /// Bet and raise sizing tables.
    pub sizing: BetSizing,
    /// Last street with betting. `None` plays to the river; an earlier
    /// street truncates the tree and scores closed hands by equity.
    pub terminal_street: Option<Street>,
    /// Training scenarios rotated through at the root chance node.
    pub scenarios: Vec<Scenario>,
    /// Monte Carlo samples per truncated-terminal equity estimate.
    pub equity_samples: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            small_blind: 0.5,
            big_blind: 1.0,
            sizing: BetSizing::default(),
            terminal_street: None,
            scenarios: vec![
                Scenario {
                    oop: PositionBucket::Blinds,
                    ip: PositionBucket::Late,
                    stack_bb: 100.0,
                },
                Scenario {
                    oop: PositionBucket::Early,
                    ip: PositionBucket::Late,
                    stack_bb: 100.0,
                },
                Scenario {
                    oop: PositionBucket::Middle,
                    ip: PositionBucket::Late,
                    stack_bb: 60.0,
                },
                Scenario {
                    oop: PositionBucket::Blinds,
                    ip: PositionBucket::Middle,
                    stack_bb: 40.0,
                },
            ],
            equity_samples: 160,
        }
    }
}

impl GameConfig {
    /// Flop-terminal preset with few equity samples, for tests and smoke
    /// runs.
    pub fn fast() -> Self {
        Self {
            terminal_street: Some(Street::Flop),
            equity_samples: 40,
            ..Self::default()
        }
    }

    /// Set the terminal street.
    pub fn with_terminal_street(mut self, street: Street) -> Self {
        self.terminal_street = Some(street);
        self
    }

    /// Set the training scenarios.
    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    /// The last street with betting.
    pub fn final_street(&self) -> Street {
        self.terminal_street.unwrap_or(Street::River)
    }

    /// Check blinds, sizing, and scenarios.
    pub fn validate(&self) -> Result<()> {
        if !self.small_blind.is_finite() || self.small_blind <= 0.0 {
            return Err(EngineError::configuration(format!(
                "small blind {} must be positive",
                self.small_blind
            )));
        }
        if !self.big_blind.is_finite() || self.big_blind < self.small_blind {
            return Err(EngineError::configuration(format!(
                "big blind {} must be at least the small blind",
                self.big_blind
            )));
        }
        self.sizing.validate()?;
        if self.scenarios.is_empty() {
            return Err(EngineError::configuration(
                "at least one training scenario is required",
            ));
        }
        for (i, scenario) in self.scenarios.iter().enumerate() {
            if !scenario.stack_bb.is_finite() || scenario.stack_bb <= self.big_blind {
                return Err(EngineError::configuration(format!(
                    "scenario {} stack {} must exceed the big blind",
                    i, scenario.stack_bb
                )));
            }
        }
        if self.equity_samples == 0 {
            return Err(EngineError::configuration(
                "equity_samples must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A mid-hand decision point to root a live solve at. Everything the hero
/// can see; the opponent's cards stay unknown and are sampled per traversal.
#[derive(Debug, Clone)]
pub struct LiveRootSpec {
    /// Which seat the hero occupies.
    pub hero_seat: Seat,
    /// Hero's hole cards.
    pub hero_hand: HoleCards,
    /// Community cards dealt so far.
    pub board: Board,
    /// Current pot, including all prior-street chips.
    pub pot: f64,
    /// Amount the hero must add to continue.
    pub to_call: f64,
    /// Remaining stacks, indexed by seat.
    pub stacks: [f64; 2],
    /// Position buckets, indexed by seat.
    pub positions: [PositionBucket; 2],
    /// Checks so far this street.
    pub checks: u8,
    /// Calls so far this street.
    pub calls: u8,
    /// Bets and raises so far this street.
    pub raises: u8,
}

impl LiveRootSpec {
    fn validate(&self) -> Result<()> {
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
        for &stack in &self.stacks {
            if !stack.is_finite() || stack < 0.0 {
                return Err(EngineError::configuration(format!(
                    "live stack {} must be non-negative",
                    stack
                )));
            }
        }
        for card in self.hero_hand.cards() {
            if self.board.contains(card) {
                return Err(EngineError::invalid_hand(format!(
                    "hero card {} is already on the board",
                    card
                )));
            }
        }
        Ok(())
    }

    fn root_state(&self) -> Result<HandState> {
        self.validate()?;
        let street = self.board.street()?;
        let hero = self.hero_seat.index();
        let villain = self.hero_seat.other().index();

        let mut invested_street = [0.0, 0.0];
        invested_street[villain] = self.to_call;
        let prior = (self.pot - self.to_call) / 2.0;
        let mut invested_total = invested_street;
        invested_total[0] += prior;
        invested_total[1] += prior;

        let mut hands = [None, None];
        hands[hero] = Some(self.hero_hand);

        Ok(HandState {
            hands,
            board: self.board.clone(),
            street,
            pot: self.pot,
            stacks: self.stacks,
            invested_street,
            invested_total,
            to_call: self.to_call,
            to_act: Some(self.hero_seat),
            positions: self.positions,
            checks_this_street: self.checks,
            calls_this_street: self.calls,
            raises_this_street: self.raises,
            actions_this_street: self
                .checks
                .saturating_add(self.calls)
                .saturating_add(self.raises),
            folded: None,
            all_in: [self.stacks[0] <= 0.0, self.stacks[1] <= 0.0],
            showdown: false,
        })
    }
}

/// Two-seat abstracted no-limit hold'em.
pub struct HoldemGame {
    config: GameConfig,
    abstraction: AbstractionEngine,
    equity: EquityEstimator,
    live_root: Option<HandState>,
    // Truncated-showdown shares for the out-of-position seat, keyed by
    // (oop hand, ip hand, board) masks.
    share_cache: RwLock<FxHashMap<(u64, u64, u64), f64>>,
}

impl HoldemGame {
    /// Scenario-rooted game for training.
    pub fn new(config: GameConfig, abstraction: AbstractionConfig) -> Result<Self> {
        config.validate()?;
        let equity =
            EquityEstimator::new(EquityConfig::default().with_samples(config.equity_samples))?;
        Ok(HoldemGame {
            abstraction: AbstractionEngine::new(abstraction)?,
            equity,
            config,
            live_root: None,
            share_cache: RwLock::new(FxHashMap::default()),
        })
    }

    /// Game rooted at a live decision point. Scenario rotation is disabled;
    /// every traversal starts from `spec` with a freshly sampled opponent
    /// hand.
    pub fn rooted(
        config: GameConfig,
        abstraction: AbstractionConfig,
        spec: &LiveRootSpec,
    ) -> Result<Self> {
        let mut game = Self::new(config, abstraction)?;
        game.live_root = Some(spec.root_state()?);
        Ok(game)
    }

    /// The active configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    fn known_mask(state: &HandState) -> u64 {
        let mut mask = state.board.mask();
        for hand in state.hands.iter().flatten() {
            mask |= hand.mask();
        }
        mask
    }

    fn draw_hand<R: Rng + ?Sized>(deck: &mut Deck, rng: &mut R) -> HoleCards {
        let a = deck.draw(rng).expect("deck exhausted while dealing");
        let b = deck.draw(rng).expect("deck exhausted while dealing");
        HoleCards::new(a, b).expect("deck draws are distinct")
    }

    /// Pot share of the out-of-position seat at a betting-closed terminal.
    fn showdown_share(&self, state: &HandState) -> Result<f64> {
        let (oop, ip) = match (state.hands[0], state.hands[1]) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(EngineError::configuration(
                    "showdown reached with undealt hole cards",
                ))
            }
        };

        if state.board.len() == 5 {
            let mut seven: Vec<Card> = Vec::with_capacity(7);
            seven.extend_from_slice(state.board.cards());
            seven.extend_from_slice(&oop.cards());
            let rank_oop = evaluate(&seven)?;
            seven.truncate(5);
            seven.extend_from_slice(&ip.cards());
            let rank_ip = evaluate(&seven)?;
            return Ok(match rank_oop.cmp(&rank_ip) {
                std::cmp::Ordering::Greater => 1.0,
                std::cmp::Ordering::Equal => 0.5,
                std::cmp::Ordering::Less => 0.0,
            });
        }

        // Truncated terminal: score by equity over runouts, cached and
        // card-seeded so identical matchups always score identically.
        let key = (oop.mask(), ip.mask(), state.board.mask());
        if let Some(&share) = self.share_cache.read().unwrap().get(&key) {
            return Ok(share);
        }
        let seed = card_seed(oop.mask() ^ ip.mask().rotate_left(23), state.board.mask());
        let mut rng = StdRng::seed_from_u64(seed);
        let estimate = self
            .equity
            .estimate_vs_hand(oop, ip, &state.board, &mut rng)?;
        self.share_cache.write().unwrap().insert(key, estimate.equity);
        Ok(estimate.equity)
    }
}

impl Game for HoldemGame {
    type State = HandState;
    type Action = AbstractAction;
    type Key = AbstractionKey;

    fn root(&self) -> HandState {
        match &self.live_root {
            Some(root) => root.clone(),
            None => HandState::pre_deal(),
        }
    }

    fn num_players(&self) -> usize {
        2
    }

    fn is_terminal(&self, state: &HandState) -> bool {
        state.is_terminal()
    }

    fn payoff(&self, state: &HandState, player: usize) -> Result<f64> {
        if !state.is_terminal() {
            return Err(EngineError::configuration(
                "payoff requested for a non-terminal state",
            ));
        }
        if player >= 2 {
            return Err(EngineError::configuration(format!(
                "player {} out of range for a two-seat game",
                player
            )));
        }
        match state.folded {
            Some(folder) => {
                if folder.index() == player {
                    Ok(-state.invested_total[player])
                } else {
                    Ok(state.pot - state.invested_total[player])
                }
            }
            None => {
                let oop_share = self.showdown_share(state)?;
                let share = if player == 0 { oop_share } else { 1.0 - oop_share };
                // Showdown contests only what both seats matched; a covering
                // bet's uncalled excess goes back to its owner.
                let matched = state.invested_total[0].min(state.invested_total[1]);
                Ok(share * (2.0 * matched) - matched)
            }
        }
    }

    fn is_chance(&self, state: &HandState) -> bool {
        !state.is_terminal()
            && (state.awaiting_scenario() || state.awaiting_hands() || state.awaiting_board())
    }

    fn sample_chance<R: Rng + ?Sized>(&self, state: &HandState, rng: &mut R) -> HandState {
        let final_street = self.config.final_street();

        if state.awaiting_scenario() {
            let pick = rng.gen_range(0..self.config.scenarios.len());
            let scenario = &self.config.scenarios[pick];
            let mut deck = Deck::full();
            let oop = Self::draw_hand(&mut deck, rng);
            let ip = Self::draw_hand(&mut deck, rng);
            return HandState::new_hand(
                [scenario.stack_bb, scenario.stack_bb],
                self.config.small_blind,
                self.config.big_blind,
                [scenario.oop, scenario.ip],
            )
            .with_hands(oop, ip);
        }

        let mut next = state.clone();
        if next.awaiting_hands() {
            let mut deck = Deck::excluding_mask(Self::known_mask(&next));
            for i in 0..2 {
                if next.hands[i].is_none() {
                    next.hands[i] = Some(Self::draw_hand(&mut deck, rng));
                }
            }
            return next;
        }

        if next.awaiting_board() {
            let mut deck = Deck::excluding_mask(Self::known_mask(&next));
            let need = next.street.board_cards() - next.board.len();
            for _ in 0..need {
                let card = deck.draw(rng).expect("deck exhausted while dealing");
                next.board
                    .push(card)
                    .expect("freshly drawn card cannot duplicate the board");
            }
            // All-in runouts have no actor; push on to the next deal or to
            // the showdown.
            next.advance_runout(final_street);
        }
        next
    }

    fn current_player(&self, state: &HandState) -> Option<usize> {
        if state.is_terminal() || self.is_chance(state) {
            return None;
        }
        state.to_act.map(Seat::index)
    }

    fn legal_actions(&self, state: &HandState) -> Vec<AbstractAction> {
        let seat = match state.to_act {
            Some(seat) if !state.is_terminal() && !self.is_chance(state) => seat,
            _ => return Vec::new(),
        };
        let idx = seat.index();
        let opp = seat.other().index();
        let stack = state.stacks[idx];
        let facing = state.to_call > 0.0;
        let sizing = &self.config.sizing;

        let mut out = Vec::with_capacity(4);
        if facing {
            out.push(AbstractAction::Fold);
            out.push(AbstractAction::Call);
        } else {
            out.push(AbstractAction::Check);
        }

        let can_raise = state.raises_this_street < sizing.max_raises_per_street
            && !state.all_in[opp]
            && stack > state.to_call;
        if can_raise {
            if state.spr() <= sizing.shove_below_spr {
                out.push(AbstractAction::AllIn);
            } else if state.street == Street::Preflop {
                out.push(AbstractAction::Raise(0));
            } else if facing {
                for i in 0..sizing.raise.len() {
                    out.push(AbstractAction::Raise(i as u8));
                }
            } else {
                for i in 0..sizing.bets_for(state.street).len() {
                    out.push(AbstractAction::Bet(i as u8));
                }
            }
        }
        out
    }

    fn next_state(&self, state: &HandState, action: &AbstractAction) -> HandState {
        state.apply(
            *action,
            &self.config.sizing,
            self.config.big_blind,
            self.config.final_street(),
        )
    }

    fn info_key(&self, state: &HandState) -> Result<AbstractionKey> {
        let seat = state
            .to_act
            .ok_or_else(|| EngineError::unabstractable("no player to act"))?;
        let hand = state.hands[seat.index()]
            .ok_or_else(|| EngineError::unabstractable("acting player has no hole cards"))?;
        let view = StateView {
            hand,
            board: &state.board,
            street: state.street,
            position: state.positions[seat.index()],
            effective_stack: state.effective_stack(),
            pot: state.pot,
            checks: state.checks_this_street,
            calls: state.calls_this_street,
            raises: state.raises_this_street,
            facing_bet: state.to_call > 0.0,
        };
        self.abstraction.key_for(&view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstraction::BoardTexture;

    fn game() -> HoldemGame {
        HoldemGame::new(GameConfig::fast(), AbstractionConfig::fast()).unwrap()
    }

    fn play_out(game: &HoldemGame, rng: &mut StdRng) -> (HandState, f64, f64) {
        let mut state = game.root();
        let mut guard = 0;
        while !game.is_terminal(&state) {
            guard += 1;
            assert!(guard < 200, "playout failed to terminate");
            if game.is_chance(&state) {
                state = game.sample_chance(&state, rng);
                continue;
            }
            let actions = game.legal_actions(&state);
            assert!(!actions.is_empty(), "decision point with no actions");
            let pick = rng.gen_range(0..actions.len());
            state = game.next_state(&state, &actions[pick]);
        }
        let p0 = game.payoff(&state, 0).unwrap();
        let p1 = game.payoff(&state, 1).unwrap();
        (state, p0, p1)
    }

    #[test]
    fn test_scenario_deal_opens_action() {
        let g = game();
        let root = g.root();
        assert!(g.is_chance(&root));

        let mut rng = StdRng::seed_from_u64(3);
        let dealt = g.sample_chance(&root, &mut rng);
        assert!(!g.is_chance(&dealt));
        assert_eq!(g.current_player(&dealt), Some(0));
        assert!(dealt.pot > 0.0);
        assert!(dealt.hands[0].is_some() && dealt.hands[1].is_some());

        let actions = g.legal_actions(&dealt);
        assert!(actions.contains(&AbstractAction::Fold));
        assert!(actions.contains(&AbstractAction::Call));
    }

    #[test]
    fn test_playouts_are_zero_sum() {
        let g = game();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..40 {
            let (state, p0, p1) = play_out(&g, &mut rng);
            assert!(
                (p0 + p1).abs() < 1e-6,
                "payoffs {} + {} not zero-sum at {}",
                p0,
                p1,
                state
            );
        }
    }

    #[test]
    fn test_payoff_bounds() {
        let g = game();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..40 {
            let (state, p0, _) = play_out(&g, &mut rng);
            // A player can never lose more than they put in, nor win more
            // than the rest of the pot.
            assert!(p0 >= -state.invested_total[0] - 1e-9);
            assert!(p0 <= state.pot - state.invested_total[0] + 1e-9);
        }
    }

    #[test]
    fn test_fold_payoffs_exact() {
        let g = game();
        let mut rng = StdRng::seed_from_u64(5);
        let dealt = g.sample_chance(&g.root(), &mut rng);
        let folded = g.next_state(&dealt, &AbstractAction::Fold);
        assert!(g.is_terminal(&folded));
        // The small blind folds its half blind to the big blind.
        assert_eq!(g.payoff(&folded, 0).unwrap(), -0.5);
        assert_eq!(g.payoff(&folded, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_payoff_requires_terminal() {
        let g = game();
        let mut rng = StdRng::seed_from_u64(5);
        let dealt = g.sample_chance(&g.root(), &mut rng);
        assert!(g.payoff(&dealt, 0).is_err());
    }

    #[test]
    fn test_complete_board_showdown_is_exact() {
        let g = HoldemGame::new(GameConfig::default(), AbstractionConfig::fast()).unwrap();
        let mut state = HandState::new_hand(
            [100.0, 100.0],
            0.5,
            1.0,
            [PositionBucket::Blinds, PositionBucket::Late],
        )
        .with_hands("AsAd".parse().unwrap(), "KsKd".parse().unwrap());
        // Limp and check so both seats have matched the pot.
        state = g.next_state(&state, &AbstractAction::Call);
        state = g.next_state(&state, &AbstractAction::Check);
        state.board = "2h 7c 9d Jc 3s".parse().unwrap();
        state.street = Street::River;
        state.showdown = true;
        state.to_act = None;

        // Aces win the whole pot.
        let p0 = g.payoff(&state, 0).unwrap();
        assert!((p0 - (state.pot - state.invested_total[0])).abs() < 1e-9);
        assert!(g.payoff(&state, 1).unwrap() < 0.0);
    }

    #[test]
    fn test_truncated_showdown_uses_equity() {
        let g = game();
        let mut state = HandState::new_hand(
            [10.0, 10.0],
            0.5,
            1.0,
            [PositionBucket::Blinds, PositionBucket::Late],
        )
        .with_hands("AsAd".parse().unwrap(), "7h2c".parse().unwrap());
        state = g.next_state(&state, &AbstractAction::Call);
        state = g.next_state(&state, &AbstractAction::Check);
        state.board = "Kc 8d 4s".parse().unwrap();
        state.showdown = true;
        state.to_act = None;

        // Aces are a heavy favorite; their payoff approaches the pot.
        let p0 = g.payoff(&state, 0).unwrap();
        assert!(p0 > 0.0);
        let repeat = g.payoff(&state, 0).unwrap();
        assert_eq!(p0, repeat);
    }

    #[test]
    fn test_showdown_refunds_uncalled_excess() {
        let g = HoldemGame::new(GameConfig::default(), AbstractionConfig::fast()).unwrap();
        let mut state = HandState::new_hand(
            [40.0, 50.0],
            0.5,
            1.0,
            [PositionBucket::Blinds, PositionBucket::Late],
        )
        .with_hands("AsAd".parse().unwrap(), "KsKd".parse().unwrap());

        // Limp, the covering stack shoves its 50, the 40 stack calls all in.
        state = g.next_state(&state, &AbstractAction::Call);
        state = g.next_state(&state, &AbstractAction::AllIn);
        state = g.next_state(&state, &AbstractAction::Call);
        assert_eq!(state.invested_total, [40.0, 50.0]);
        assert_eq!(state.pot, 90.0);

        state.board = "2h 7c 9d Jc 3s".parse().unwrap();
        state.street = Street::River;
        state.showdown = true;

        // Only the called 40 is at risk each way; the winner cannot collect
        // the 10 chips the loser never matched.
        assert!((g.payoff(&state, 0).unwrap() - 40.0).abs() < 1e-9);
        assert!((g.payoff(&state, 1).unwrap() + 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_shallow_stacks_offer_shove_only() {
        let g = game();
        let state = HandState::new_hand(
            [4.0, 4.0],
            0.5,
            1.0,
            [PositionBucket::Blinds, PositionBucket::Late],
        )
        .with_hands("AsKd".parse().unwrap(), "QhQd".parse().unwrap());

        let actions = g.legal_actions(&state);
        assert!(actions.contains(&AbstractAction::AllIn));
        assert!(!actions.iter().any(|a| matches!(a, AbstractAction::Raise(_))));
    }

    #[test]
    fn test_raise_cap_locks_to_call_or_fold() {
        let g = game();
        let mut state = HandState::new_hand(
            [200.0, 200.0],
            0.5,
            1.0,
            [PositionBucket::Blinds, PositionBucket::Late],
        )
        .with_hands("AsKd".parse().unwrap(), "QhQd".parse().unwrap());
        state = g.next_state(&state, &AbstractAction::Raise(0));
        state = g.next_state(&state, &AbstractAction::Raise(0));

        let actions = g.legal_actions(&state);
        assert_eq!(
            actions,
            vec![AbstractAction::Fold, AbstractAction::Call],
            "after the raise cap only fold and call remain"
        );
    }

    #[test]
    fn test_info_key_ignores_opponent_cards() {
        let g = game();
        let mut rng = StdRng::seed_from_u64(23);
        let mut dealt = g.sample_chance(&g.root(), &mut rng);
        let key_a = g.info_key(&dealt).unwrap();

        // Swapping the opponent's hidden cards must not move the key.
        let replacement: HoleCards = if dealt.hands[1] != Some("9c9h".parse().unwrap())
            && !dealt.hands[0].map(|h| h.contains("9c".parse().unwrap())).unwrap_or(false)
            && !dealt.hands[0].map(|h| h.contains("9h".parse().unwrap())).unwrap_or(false)
        {
            "9c9h".parse().unwrap()
        } else {
            "8d8s".parse().unwrap()
        };
        dealt.hands[1] = Some(replacement);
        assert_eq!(g.info_key(&dealt).unwrap(), key_a);
        assert_eq!(key_a.street, Street::Preflop);
        assert_eq!(key_a.texture, BoardTexture::Preflop);
    }

    #[test]
    fn test_live_rooted_game_samples_villain() {
        let spec = LiveRootSpec {
            hero_seat: Seat::InPosition,
            hero_hand: "AhQh".parse().unwrap(),
            board: "Qs 7h 2d".parse().unwrap(),
            pot: 12.0,
            to_call: 4.0,
            stacks: [88.0, 88.0],
            positions: [PositionBucket::Blinds, PositionBucket::Late],
            checks: 0,
            calls: 0,
            raises: 1,
        };
        let g = HoldemGame::rooted(GameConfig::fast(), AbstractionConfig::fast(), &spec).unwrap();

        let root = g.root();
        assert!(g.is_chance(&root), "villain cards missing at a live root");

        let mut rng = StdRng::seed_from_u64(41);
        let dealt = g.sample_chance(&root, &mut rng);
        assert!(dealt.hands[0].is_some());
        assert_eq!(g.current_player(&dealt), Some(1));

        let actions = g.legal_actions(&dealt);
        assert!(actions.contains(&AbstractAction::Fold));
        assert!(actions.contains(&AbstractAction::Call));

        // The hero key is fixed by the hero's own cards and context.
        let key_one = g.info_key(&dealt).unwrap();
        let dealt_again = g.sample_chance(&root, &mut StdRng::seed_from_u64(99));
        assert_eq!(g.info_key(&dealt_again).unwrap(), key_one);
        assert_eq!(key_one.street, Street::Flop);
        assert!(key_one.history.facing_bet);
    }

    #[test]
    fn test_live_root_rejects_garbage() {
        let base = LiveRootSpec {
            hero_seat: Seat::OutOfPosition,
            hero_hand: "AhQh".parse().unwrap(),
            board: "Qs 7h 2d".parse().unwrap(),
            pot: 12.0,
            to_call: 0.0,
            stacks: [88.0, 88.0],
            positions: [PositionBucket::Blinds, PositionBucket::Late],
            checks: 0,
            calls: 0,
            raises: 0,
        };

        let mut no_pot = base.clone();
        no_pot.pot = 0.0;
        assert!(HoldemGame::rooted(GameConfig::fast(), AbstractionConfig::fast(), &no_pot).is_err());

        let mut dup = base.clone();
        dup.hero_hand = "Qs2c".parse().unwrap();
        assert!(matches!(
            HoldemGame::rooted(GameConfig::fast(), AbstractionConfig::fast(), &dup),
            Err(EngineError::InvalidHand(_))
        ));
    }

    #[test]
    fn test_config_validation() {
        assert!(GameConfig::default().validate().is_ok());

        let mut no_scenarios = GameConfig::default();
        no_scenarios.scenarios.clear();
        assert!(no_scenarios.validate().is_err());

        let mut shallow = GameConfig::default();
        shallow.scenarios[0].stack_bb = 0.5;
        assert!(shallow.validate().is_err());

        let mut bad_blinds = GameConfig::default();
        bad_blinds.small_blind = 2.0;
        assert!(bad_blinds.validate().is_err());
    }

    #[test]
    fn test_all_in_runs_out_the_board() {
        let g = HoldemGame::new(
            GameConfig {
                terminal_street: None,
                ..GameConfig::fast()
            },
            AbstractionConfig::fast(),
        )
        .unwrap();
        let dealt = HandState::new_hand(
            [4.0, 4.0],
            0.5,
            1.0,
            [PositionBucket::Blinds, PositionBucket::Late],
        )
        .with_hands("AsKd".parse().unwrap(), "QhQd".parse().unwrap());

        assert!(g.legal_actions(&dealt).contains(&AbstractAction::AllIn));
        let mut state = g.next_state(&dealt, &AbstractAction::AllIn);
        state = g.next_state(&state, &AbstractAction::Call);
        assert!(state.both_all_in());

        // With no actors left, chance deals flop, turn, and river in turn.
        let mut rng = StdRng::seed_from_u64(29);
        let mut guard = 0;
        while g.is_chance(&state) {
            state = g.sample_chance(&state, &mut rng);
            guard += 1;
            assert!(guard < 10);
        }
        assert!(g.is_terminal(&state));
        assert_eq!(state.board.len(), 5);
        let p0 = g.payoff(&state, 0).unwrap();
        let p1 = g.payoff(&state, 1).unwrap();
        assert!((p0 + p1).abs() < 1e-9);
    }
}
