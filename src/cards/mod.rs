//! Card primitives shared by every layer of the engine.
//!
//! Provides [`Card`], a player's [`HoleCards`], the community [`Board`], the
//! betting [`Street`], and a [`Deck`] suitable for Monte Carlo draws. Parsing
//! is strict: malformed or duplicate cards are rejected with
//! [`EngineError::InvalidHand`] rather than silently accepted.

pub mod eval;

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

const RANK_CHARS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];
const SUIT_CHARS: [char; 4] = ['c', 'd', 'h', 's'];

/// Rank index of an ace (ranks run 0 = deuce .. 12 = ace).
pub const ACE: u8 = 12;

/// A single playing card, stored as an index 0-51 (`rank * 4 + suit`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Card(u8);

impl Card {
    /// Build a card from rank (0-12) and suit (0-3).
    #[inline]
    pub const fn new(rank: u8, suit: u8) -> Self {
        Card(rank * 4 + suit)
    }

    /// Build a card from its 0-51 index.
    #[inline]
    pub const fn from_id(id: u8) -> Self {
        Card(id)
    }

    /// The 0-51 index.
    #[inline]
    pub const fn id(self) -> u8 {
        self.0
    }

    /// Rank 0-12 (deuce through ace).
    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 >> 2
    }

    /// Suit 0-3 (clubs, diamonds, hearts, spades).
    #[inline]
    pub const fn suit(self) -> u8 {
        self.0 & 3
    }

    /// Bit for this card in a 52-bit dead-card mask.
    #[inline]
    pub const fn mask(self) -> u64 {
        1u64 << self.0
    }
}

impl FromStr for Card {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        let (r, u) = match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(u), None) => (r, u),
            _ => {
                return Err(EngineError::invalid_hand(format!(
                    "card '{}' must be two characters like 'As'",
                    s
                )))
            }
        };
        let rank = RANK_CHARS
            .iter()
            .position(|&c| c == r.to_ascii_uppercase())
            .ok_or_else(|| EngineError::invalid_hand(format!("unknown rank '{}' in '{}'", r, s)))?;
        let suit = SUIT_CHARS
            .iter()
            .position(|&c| c == u.to_ascii_lowercase())
            .ok_or_else(|| EngineError::invalid_hand(format!("unknown suit '{}' in '{}'", u, s)))?;
        Ok(Card::new(rank as u8, suit as u8))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_CHARS[self.rank() as usize],
            SUIT_CHARS[self.suit() as usize]
        )
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A player's two private cards, canonically ordered (higher card first).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoleCards {
    cards: [Card; 2],
}

impl HoleCards {
    /// Build hole cards; the two cards must differ.
    pub fn new(a: Card, b: Card) -> Result<Self> {
        if a == b {
            return Err(EngineError::invalid_hand(format!("duplicate card {}", a)));
        }
        let cards = if (a.rank(), a.suit()) >= (b.rank(), b.suit()) {
            [a, b]
        } else {
            [b, a]
        };
        Ok(HoleCards { cards })
    }

    /// Both cards, higher first.
    #[inline]
    pub fn cards(&self) -> [Card; 2] {
        self.cards
    }

    /// The higher-ranked card.
    #[inline]
    pub fn high(&self) -> Card {
        self.cards[0]
    }

    /// The lower-ranked card.
    #[inline]
    pub fn low(&self) -> Card {
        self.cards[1]
    }

    /// True if both cards share a suit.
    pub fn is_suited(&self) -> bool {
        self.cards[0].suit() == self.cards[1].suit()
    }

    /// True for a pocket pair.
    pub fn is_pair(&self) -> bool {
        self.cards[0].rank() == self.cards[1].rank()
    }

    /// True if `card` is one of the two hole cards.
    pub fn contains(&self, card: Card) -> bool {
        self.cards[0] == card || self.cards[1] == card
    }

    /// Combined 52-bit mask of both cards.
    pub fn mask(&self) -> u64 {
        self.cards[0].mask() | self.cards[1].mask()
    }

    /// Canonical 169-class notation: "AA", "AKs", "T9o".
    pub fn class_string(&self) -> String {
        let hi = RANK_CHARS[self.cards[0].rank() as usize];
        let lo = RANK_CHARS[self.cards[1].rank() as usize];
        if self.is_pair() {
            format!("{}{}", hi, lo)
        } else if self.is_suited() {
            format!("{}{}s", hi, lo)
        } else {
            format!("{}{}o", hi, lo)
        }
    }
}

impl FromStr for HoleCards {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.len() != 4 {
            return Err(EngineError::invalid_hand(format!(
                "hole cards '{}' must be two cards like 'AhKs'",
                s
            )));
        }
        let a: Card = compact[0..2].parse()?;
        let b: Card = compact[2..4].parse()?;
        HoleCards::new(a, b)
    }
}

impl fmt::Display for HoleCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.cards[0], self.cards[1])
    }
}

impl fmt::Debug for HoleCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Betting street. Exactly the four key-visible streets; hand completion is a
/// state property, not a street.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Street {
    /// No community cards yet.
    Preflop,
    /// Three community cards.
    Flop,
    /// Four community cards.
    Turn,
    /// All five community cards.
    River,
}

impl Street {
    /// All streets in order.
    pub const ALL: [Street; 4] = [Street::Preflop, Street::Flop, Street::Turn, Street::River];

    /// Ordinal 0-3.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The following street, if any.
    pub fn next(self) -> Option<Street> {
        match self {
            Street::Preflop => Some(Street::Flop),
            Street::Flop => Some(Street::Turn),
            Street::Turn => Some(Street::River),
            Street::River => None,
        }
    }

    /// Board cards dealt by the start of this street.
    pub fn board_cards(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }

    /// One-letter tag used in key displays.
    pub fn symbol(self) -> char {
        match self {
            Street::Preflop => 'P',
            Street::Flop => 'F',
            Street::Turn => 'T',
            Street::River => 'R',
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Street::Preflop => write!(f, "preflop"),
            Street::Flop => write!(f, "flop"),
            Street::Turn => write!(f, "turn"),
            Street::River => write!(f, "river"),
        }
    }
}

/// Community cards, 0 to 5 of them, duplicate-checked on construction.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cards: Vec<Card>,
}

impl Board {
    /// An empty (preflop) board.
    pub fn new() -> Self {
        Board {
            cards: Vec::with_capacity(5),
        }
    }

    /// Build from cards, rejecting duplicates and impossible sizes.
    pub fn from_cards(cards: Vec<Card>) -> Result<Self> {
        if cards.len() > 5 {
            return Err(EngineError::invalid_hand(format!(
                "board has {} cards, maximum is 5",
                cards.len()
            )));
        }
        let mut seen = 0u64;
        for &card in &cards {
            if seen & card.mask() != 0 {
                return Err(EngineError::invalid_hand(format!(
                    "duplicate board card {}",
                    card
                )));
            }
            seen |= card.mask();
        }
        Ok(Board { cards })
    }

    /// Number of cards dealt.
    #[inline]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True before the flop.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The dealt cards.
    #[inline]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// True if `card` is on the board.
    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    /// Append a card, rejecting duplicates and a sixth card.
    pub fn push(&mut self, card: Card) -> Result<()> {
        if self.cards.len() >= 5 {
            return Err(EngineError::invalid_hand("board already has 5 cards"));
        }
        if self.contains(card) {
            return Err(EngineError::invalid_hand(format!(
                "duplicate board card {}",
                card
            )));
        }
        self.cards.push(card);
        Ok(())
    }

    /// The street implied by the number of dealt cards.
    pub fn street(&self) -> Result<Street> {
        match self.cards.len() {
            0 => Ok(Street::Preflop),
            3 => Ok(Street::Flop),
            4 => Ok(Street::Turn),
            5 => Ok(Street::River),
            n => Err(EngineError::invalid_hand(format!(
                "board of {} cards matches no street",
                n
            ))),
        }
    }

    /// Dead-card mask for this board.
    pub fn mask(&self) -> u64 {
        self.cards.iter().fold(0u64, |m, c| m | c.mask())
    }
}

impl FromStr for Board {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Ok(Board::new());
        }
        if compact.len() % 2 != 0 {
            return Err(EngineError::invalid_hand(format!(
                "board '{}' is not a sequence of two-character cards",
                s
            )));
        }
        let mut cards = Vec::with_capacity(compact.len() / 2);
        for i in (0..compact.len()).step_by(2) {
            cards.push(compact[i..i + 2].parse()?);
        }
        Board::from_cards(cards)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cards.is_empty() {
            return write!(f, "-");
        }
        for card in &self.cards {
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self)
    }
}

/// The live portion of a 52-card deck.
///
/// Cards are drawn by uniform random swap-removal, so a fresh clone of the
/// deck per Monte Carlo sample needs no up-front shuffle.
#[derive(Clone)]
pub struct Deck {
    cards: [Card; 52],
    live: usize,
}

impl Deck {
    /// A full 52-card deck.
    pub fn full() -> Self {
        let mut cards = [Card::from_id(0); 52];
        for (i, slot) in cards.iter_mut().enumerate() {
            *slot = Card::from_id(i as u8);
        }
        Deck { cards, live: 52 }
    }

    /// A deck with every card in `dead` removed.
    pub fn excluding(dead: &[Card]) -> Self {
        let mut mask = 0u64;
        for &card in dead {
            mask |= card.mask();
        }
        Self::excluding_mask(mask)
    }

    /// A deck excluding every card set in a 52-bit mask.
    pub fn excluding_mask(mask: u64) -> Self {
        let mut cards = [Card::from_id(0); 52];
        let mut live = 0;
        for id in 0..52u8 {
            let card = Card::from_id(id);
            if mask & card.mask() == 0 {
                cards[live] = card;
                live += 1;
            }
        }
        Deck { cards, live }
    }

    /// Number of cards still in the deck.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.live
    }

    /// Draw one uniformly random card, or `None` if the deck is empty.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Card> {
        if self.live == 0 {
            return None;
        }
        let pick = rng.gen_range(0..self.live);
        self.live -= 1;
        self.cards.swap(pick, self.live);
        Some(self.cards[self.live])
    }

    /// Draw `n` random cards; errors if the deck runs out.
    pub fn draw_n<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Result<Vec<Card>> {
        if n > self.live {
            return Err(EngineError::invalid_hand(format!(
                "cannot draw {} cards from a deck of {}",
                n, self.live
            )));
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            // remaining() checked above
            if let Some(card) = self.draw(rng) {
                out.push(card);
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deck({} live)", self.live)
    }
}
