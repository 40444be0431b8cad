//! Hand state for the two-seat training tree.
//!
//! The state tracks chips, cards, and per-street action counts. Card dealing
//! is not done here: a state whose cards lag its street is a chance node, and
//! the game resolves it by drawing from a deck excluding all known cards.
//! That keeps live-rooted solves (opponent cards unknown) and scenario
//! training (everything dealt fresh) on one code path.

use std::fmt;

use crate::abstraction::PositionBucket;
use crate::cards::{Board, HoleCards, Street};
use crate::game::actions::{AbstractAction, BetSizing};

/// Seat in the two-seat tree. Out of position acts first on every street and
/// posts the small blind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    /// First to act, posts the small blind.
    OutOfPosition = 0,
    /// Last to act, posts the big blind.
    InPosition = 1,
}

impl Seat {
    /// The opposing seat.
    pub fn other(self) -> Seat {
        match self {
            Seat::OutOfPosition => Seat::InPosition,
            Seat::InPosition => Seat::OutOfPosition,
        }
    }

    /// Array index, 0 or 1.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Seat from an array index.
    pub fn from_index(index: usize) -> Seat {
        if index == 0 {
            Seat::OutOfPosition
        } else {
            Seat::InPosition
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::OutOfPosition => write!(f, "OOP"),
            Seat::InPosition => write!(f, "IP"),
        }
    }
}

/// Complete state of one hand in the two-seat tree.
#[derive(Debug, Clone)]
pub struct HandState {
    /// Hole cards per seat; `None` until dealt.
    pub hands: [Option<HoleCards>; 2],
    /// Community cards dealt so far.
    pub board: Board,
    /// Current betting street.
    pub street: Street,
    /// Chips in the middle.
    pub pot: f64,
    /// Remaining stacks per seat.
    pub stacks: [f64; 2],
    /// Chips invested this street per seat.
    pub invested_street: [f64; 2],
    /// Chips invested over the whole hand per seat.
    pub invested_total: [f64; 2],
    /// Amount the actor must add to continue; zero when checking is open.
    pub to_call: f64,
    /// Seat to act, `None` at terminals and between-deal chance points.
    pub to_act: Option<Seat>,
    /// Table-position bucket per seat, fixed for the hand.
    pub positions: [PositionBucket; 2],
    /// Checks this street.
    pub checks_this_street: u8,
    /// Calls this street.
    pub calls_this_street: u8,
    /// Bets and raises this street. The posted big blind does not count.
    pub raises_this_street: u8,
    /// Actions of any kind this street.
    pub actions_this_street: u8,
    /// Seat that folded, if any.
    pub folded: Option<Seat>,
    /// All-in flags per seat.
    pub all_in: [bool; 2],
    /// Betting is finished and the hand goes to evaluation.
    pub showdown: bool,
}

impl HandState {
    /// Root marker before any scenario is chosen. Everything here is
    /// placeholder; the first chance event replaces it with a fresh hand.
    pub fn pre_deal() -> Self {
        HandState {
            hands: [None, None],
            board: Board::default(),
            street: Street::Preflop,
            pot: 0.0,
            stacks: [0.0, 0.0],
            invested_street: [0.0, 0.0],
            invested_total: [0.0, 0.0],
            to_call: 0.0,
            to_act: None,
            positions: [PositionBucket::Blinds, PositionBucket::Late],
            checks_this_street: 0,
            calls_this_street: 0,
            raises_this_street: 0,
            actions_this_street: 0,
            folded: None,
            all_in: [false, false],
            showdown: false,
        }
    }

    /// Fresh hand with blinds posted and no cards dealt yet.
    pub fn new_hand(
        stacks: [f64; 2],
        small_blind: f64,
        big_blind: f64,
        positions: [PositionBucket; 2],
    ) -> Self {
        let sb = small_blind.min(stacks[0]);
        let bb = big_blind.min(stacks[1]);
        HandState {
            hands: [None, None],
            board: Board::default(),
            street: Street::Preflop,
            pot: sb + bb,
            stacks: [stacks[0] - sb, stacks[1] - bb],
            invested_street: [sb, bb],
            invested_total: [sb, bb],
            to_call: (bb - sb).max(0.0),
            to_act: None,
            positions,
            checks_this_street: 0,
            calls_this_street: 0,
            raises_this_street: 0,
            actions_this_street: 0,
            folded: None,
            all_in: [stacks[0] <= small_blind, stacks[1] <= big_blind],
            showdown: false,
        }
    }

    /// Attach dealt hole cards and open the action.
    pub fn with_hands(mut self, oop: HoleCards, ip: HoleCards) -> Self {
        self.hands = [Some(oop), Some(ip)];
        self.to_act = Some(Seat::OutOfPosition);
        self
    }

    /// True once the hand is decided, by fold or by reaching evaluation.
    pub fn is_terminal(&self) -> bool {
        self.folded.is_some() || self.showdown
    }

    /// True before any scenario has been applied.
    pub fn awaiting_scenario(&self) -> bool {
        self.pot == 0.0
    }

    /// True while a seat's hole cards are missing.
    pub fn awaiting_hands(&self) -> bool {
        self.hands.iter().any(|h| h.is_none())
    }

    /// True while the board lags the current street.
    pub fn awaiting_board(&self) -> bool {
        self.board.len() < self.street.board_cards()
    }

    /// Smaller of the two stacks.
    pub fn effective_stack(&self) -> f64 {
        self.stacks[0].min(self.stacks[1])
    }

    /// Stack-to-pot ratio on the effective stack.
    pub fn spr(&self) -> f64 {
        if self.pot > 0.0 {
            self.effective_stack() / self.pot
        } else {
            0.0
        }
    }

    /// True when both seats are all in.
    pub fn both_all_in(&self) -> bool {
        self.all_in[0] && self.all_in[1]
    }

    /// True when either seat is all in.
    pub fn any_all_in(&self) -> bool {
        self.all_in[0] || self.all_in[1]
    }

    /// Apply an action, returning the successor state. Legality is the
    /// caller's contract; amounts are clamped to the acting stack.
    pub fn apply(
        &self,
        action: AbstractAction,
        sizing: &BetSizing,
        big_blind: f64,
        final_street: Street,
    ) -> HandState {
        let mut next = self.clone();
        next.apply_mut(action, sizing, big_blind, final_street);
        next
    }

    fn apply_mut(
        &mut self,
        action: AbstractAction,
        sizing: &BetSizing,
        big_blind: f64,
        final_street: Street,
    ) {
        let seat = match self.to_act {
            Some(seat) => seat,
            None => return,
        };
        let idx = seat.index();
        let opp = seat.other().index();
        self.actions_this_street += 1;

        match action {
            AbstractAction::Fold => {
                self.folded = Some(seat);
                self.to_act = None;
            }
            AbstractAction::Check => {
                self.checks_this_street = self.checks_this_street.saturating_add(1);
                if self.check_closes_street(seat) {
                    self.close_street(final_street);
                } else {
                    self.to_act = Some(seat.other());
                }
            }
            AbstractAction::Call => {
                let amount = self.to_call.min(self.stacks[idx]);
                self.commit(idx, amount);
                self.calls_this_street = self.calls_this_street.saturating_add(1);
                self.to_call = 0.0;

                let closes = if self.any_all_in() {
                    true
                } else if self.street == Street::Preflop {
                    // A small-blind limp leaves the big blind an option.
                    seat == Seat::InPosition || self.raises_this_street > 0
                } else {
                    true
                };
                if closes {
                    self.close_street(final_street);
                } else {
                    self.to_act = Some(Seat::InPosition);
                }
            }
            AbstractAction::Bet(i) => {
                let table = sizing.bets_for(self.street);
                let fraction = table[usize::from(i).min(table.len().saturating_sub(1))];
                let amount = (self.pot * fraction).min(self.stacks[idx]);
                self.commit(idx, amount);
                self.raises_this_street = self.raises_this_street.saturating_add(1);
                self.to_call = self.invested_street[idx] - self.invested_street[opp];
                self.to_act = Some(seat.other());
            }
            AbstractAction::Raise(i) => {
                let additional = if self.street == Street::Preflop {
                    let target = if self.raises_this_street == 0 {
                        sizing.preflop_open_bb * big_blind
                    } else {
                        sizing.preflop_raise_factor * self.invested_street[opp]
                    };
                    (target - self.invested_street[idx]).max(self.to_call)
                } else {
                    let table = &sizing.raise;
                    let fraction = table[usize::from(i).min(table.len() - 1)];
                    self.to_call + (self.pot + self.to_call) * fraction
                };
                let amount = additional.min(self.stacks[idx]);
                self.commit(idx, amount);
                self.raises_this_street = self.raises_this_street.saturating_add(1);
                self.to_call = (self.invested_street[idx] - self.invested_street[opp]).max(0.0);
                if self.to_call > 0.0 && !self.all_in[opp] {
                    self.to_act = Some(seat.other());
                } else {
                    self.close_street(final_street);
                }
            }
            AbstractAction::AllIn => {
                let amount = self.stacks[idx];
                self.commit(idx, amount);
                self.raises_this_street = self.raises_this_street.saturating_add(1);
                self.to_call = (self.invested_street[idx] - self.invested_street[opp]).max(0.0);
                if self.to_call > 0.0 && !self.all_in[opp] {
                    self.to_act = Some(seat.other());
                } else {
                    self.close_street(final_street);
                }
            }
        }
    }

    fn commit(&mut self, idx: usize, amount: f64) {
        self.stacks[idx] -= amount;
        self.pot += amount;
        self.invested_street[idx] += amount;
        self.invested_total[idx] += amount;
        if self.stacks[idx] <= 0.0 {
            self.stacks[idx] = 0.0;
            self.all_in[idx] = true;
        }
    }

    fn check_closes_street(&self, checker: Seat) -> bool {
        match self.street {
            // The big blind's check closes the street once the small blind
            // has acted.
            Street::Preflop => checker == Seat::InPosition && self.actions_this_street >= 2,
            _ => self.actions_this_street >= 2,
        }
    }

    /// Close the betting on this street: either the hand goes to evaluation
    /// or the next street opens. With a player all in the remaining streets
    /// are pure runout, so nobody acts again.
    fn close_street(&mut self, final_street: Street) {
        if self.street == final_street || self.street.next().is_none() {
            self.showdown = true;
            self.to_act = None;
            return;
        }
        self.street = self.street.next().unwrap_or(Street::River);
        self.to_call = 0.0;
        self.invested_street = [0.0, 0.0];
        self.checks_this_street = 0;
        self.calls_this_street = 0;
        self.raises_this_street = 0;
        self.actions_this_street = 0;
        self.to_act = if self.any_all_in() {
            None
        } else {
            Some(Seat::OutOfPosition)
        };
    }

    /// Advance a runout: called after a deal when nobody is left to act.
    /// Pushes the state to the next street or to evaluation.
    pub fn advance_runout(&mut self, final_street: Street) {
        if self.to_act.is_none() && !self.is_terminal() && !self.awaiting_board() {
            self.close_street(final_street);
        }
    }
}

impl fmt::Display for HandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pot={:.1} stacks=[{:.1},{:.1}] board={}",
            self.street, self.pot, self.stacks[0], self.stacks[1], self.board
        )
    }
}
