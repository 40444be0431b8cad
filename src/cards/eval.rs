//! Five- to seven-card hand evaluation.
//!
//! Hands are ranked into a packed [`HandRank`] that orders any two hands with
//! a single integer comparison: the category occupies the high bits and up to
//! five tiebreak ranks fill one nibble each below it.

use std::fmt;

use super::Card;
use crate::error::{EngineError, Result};

/// Hand category, weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandCategory {
    /// No made hand.
    HighCard = 0,
    /// One pair.
    Pair = 1,
    /// Two pair.
    TwoPair = 2,
    /// Three of a kind.
    Trips = 3,
    /// Five consecutive ranks.
    Straight = 4,
    /// Five cards of one suit.
    Flush = 5,
    /// Trips plus a pair.
    FullHouse = 6,
    /// Four of a kind.
    Quads = 7,
    /// Straight and flush together.
    StraightFlush = 8,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandCategory::HighCard => "high card",
            HandCategory::Pair => "pair",
            HandCategory::TwoPair => "two pair",
            HandCategory::Trips => "three of a kind",
            HandCategory::Straight => "straight",
            HandCategory::Flush => "flush",
            HandCategory::FullHouse => "full house",
            HandCategory::Quads => "four of a kind",
            HandCategory::StraightFlush => "straight flush",
        };
        write!(f, "{}", name)
    }
}

/// Packed hand strength: `category << 20 | tiebreaks`, one nibble per rank.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandRank(u32);

impl HandRank {
    fn pack(category: HandCategory, tiebreaks: &[u8]) -> Self {
        debug_assert!(tiebreaks.len() <= 5);
        let mut value = (category as u32) << 20;
        for (i, &rank) in tiebreaks.iter().enumerate() {
            value |= (rank as u32) << (16 - 4 * i);
        }
        HandRank(value)
    }

    /// The hand category encoded in this rank.
    pub fn category(self) -> HandCategory {
        match self.0 >> 20 {
            0 => HandCategory::HighCard,
            1 => HandCategory::Pair,
            2 => HandCategory::TwoPair,
            3 => HandCategory::Trips,
            4 => HandCategory::Straight,
            5 => HandCategory::Flush,
            6 => HandCategory::FullHouse,
            7 => HandCategory::Quads,
            _ => HandCategory::StraightFlush,
        }
    }
}

impl fmt::Debug for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandRank({}, {:#07x})", self.category(), self.0)
    }
}

/// Rank the best five-card hand among `cards` (5, 6, or 7 of them).
pub fn evaluate(cards: &[Card]) -> Result<HandRank> {
    match cards.len() {
        5 => Ok(rank_five(cards)),
        6 => {
            let mut best = None;
            let mut scratch = [cards[0]; 5];
            for skip in 0..6 {
                fill_excluding(&mut scratch, cards, skip, skip);
                let rank = rank_five(&scratch);
                best = Some(best.map_or(rank, |b: HandRank| b.max(rank)));
            }
            Ok(best.unwrap_or_else(|| rank_five(cards)))
        }
        7 => {
            let mut best = None;
            let mut scratch = [cards[0]; 5];
            for skip_a in 0..7 {
                for skip_b in (skip_a + 1)..7 {
                    fill_excluding(&mut scratch, cards, skip_a, skip_b);
                    let rank = rank_five(&scratch);
                    best = Some(best.map_or(rank, |b: HandRank| b.max(rank)));
                }
            }
            Ok(best.unwrap_or_else(|| rank_five(cards)))
        }
        n => Err(EngineError::invalid_hand(format!(
            "cannot evaluate {} cards; need 5, 6, or 7",
            n
        ))),
    }
}

fn fill_excluding(out: &mut [Card; 5], cards: &[Card], skip_a: usize, skip_b: usize) {
    let mut w = 0;
    for (i, &card) in cards.iter().enumerate() {
        if i != skip_a && i != skip_b {
            out[w] = card;
            w += 1;
        }
    }
}

/// Highest rank of any straight within the rank bitset, aces playing both
/// high and low.
fn straight_high(rank_bits: u16) -> Option<u8> {
    for high in (4..=12u8).rev() {
        let window = 0b11111u16 << (high - 4);
        if rank_bits & window == window {
            return Some(high);
        }
    }
    // Wheel: A-2-3-4-5 with the five playing high.
    let wheel = (1u16 << 12) | 0b1111;
    if rank_bits & wheel == wheel {
        return Some(3);
    }
    None
}

fn rank_five(cards: &[Card]) -> HandRank {
    let mut rank_counts = [0u8; 13];
    let mut suit_counts = [0u8; 4];
    let mut rank_bits = 0u16;
    for &card in &cards[..5] {
        rank_counts[card.rank() as usize] += 1;
        suit_counts[card.suit() as usize] += 1;
        rank_bits |= 1 << card.rank();
    }

    let is_flush = suit_counts.iter().any(|&c| c == 5);
    let straight = straight_high(rank_bits);

    if let (true, Some(high)) = (is_flush, straight) {
        return HandRank::pack(HandCategory::StraightFlush, &[high]);
    }

    // Group ranks by multiplicity, highest rank first within each group.
    let mut quads = None;
    let mut trips = None;
    let mut pairs: Vec<u8> = Vec::with_capacity(2);
    let mut singles: Vec<u8> = Vec::with_capacity(5);
    for rank in (0..13u8).rev() {
        match rank_counts[rank as usize] {
            4 => quads = Some(rank),
            3 => trips = Some(rank),
            2 => pairs.push(rank),
            1 => singles.push(rank),
            _ => {}
        }
    }

    if let Some(q) = quads {
        return HandRank::pack(HandCategory::Quads, &[q, singles[0]]);
    }
    if let (Some(t), true) = (trips, !pairs.is_empty()) {
        return HandRank::pack(HandCategory::FullHouse, &[t, pairs[0]]);
    }
    if is_flush {
        return HandRank::pack(HandCategory::Flush, &singles);
    }
    if let Some(high) = straight {
        return HandRank::pack(HandCategory::Straight, &[high]);
    }
    if let Some(t) = trips {
        return HandRank::pack(HandCategory::Trips, &[t, singles[0], singles[1]]);
    }
    if pairs.len() == 2 {
        return HandRank::pack(HandCategory::TwoPair, &[pairs[0], pairs[1], singles[0]]);
    }
    if pairs.len() == 1 {
        return HandRank::pack(
            HandCategory::Pair,
            &[pairs[0], singles[0], singles[1], singles[2]],
        );
    }
    HandRank::pack(HandCategory::HighCard, &singles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(s: &str) -> Vec<Card> {
        s.split_whitespace()
            .map(|c| c.parse().unwrap())
            .collect()
    }

    fn rank_of(s: &str) -> HandRank {
        evaluate(&cards(s)).unwrap()
    }

    #[test]
    fn test_categories() {
        assert_eq!(rank_of("As Ks Qs Js Ts").category(), HandCategory::StraightFlush);
        assert_eq!(rank_of("Ah Ad As Ac Ks").category(), HandCategory::Quads);
        assert_eq!(rank_of("Ah Ad As Kc Ks").category(), HandCategory::FullHouse);
        assert_eq!(rank_of("Ah 9h 7h 5h 2h").category(), HandCategory::Flush);
        assert_eq!(rank_of("9h 8d 7s 6c 5s").category(), HandCategory::Straight);
        assert_eq!(rank_of("Ah Ad As Kc Qs").category(), HandCategory::Trips);
        assert_eq!(rank_of("Ah Ad Ks Kc Qs").category(), HandCategory::TwoPair);
        assert_eq!(rank_of("Ah Ad Ks Qc Js").category(), HandCategory::Pair);
        assert_eq!(rank_of("Ah Kd Qs Jc 9s").category(), HandCategory::HighCard);
    }

    #[test]
    fn test_wheel_is_lowest_straight() {
        let wheel = rank_of("Ah 2d 3s 4c 5s");
        assert_eq!(wheel.category(), HandCategory::Straight);
        let six_high = rank_of("2h 3d 4s 5c 6s");
        assert!(six_high > wheel, "six-high straight beats the wheel");
        let broadway = rank_of("Ah Kd Qs Jc Ts");
        assert!(broadway > six_high);
    }

    #[test]
    fn test_kicker_ordering() {
        let ak = rank_of("Ah Ad Ks Qc Js");
        let aq = rank_of("Ah Ad Qs Jc 9s");
        assert!(ak > aq, "pair of aces with K kicker beats Q kicker");

        let aces_up = rank_of("Ah Ad Ks Kc Qs");
        let kings_up = rank_of("Kh Kd Qs Qc As");
        assert!(aces_up > kings_up);
    }

    #[test]
    fn test_equal_hands_tie() {
        let a = rank_of("Ah Kd Qs Jc 9s");
        let b = rank_of("Ad Kh Qc Jd 9c");
        assert_eq!(a, b, "suit-only differences do not break ties");
    }

    #[test]
    fn test_seven_card_picks_best_five() {
        // Board gives a flush; hero's pair is irrelevant.
        let rank = rank_of("2h 2d 9s Ts Js Qs Ks");
        assert_eq!(rank.category(), HandCategory::Flush);

        // Quads hiding in seven cards.
        let rank = rank_of("7h 7d 7s 7c Ah Kd 2c");
        assert_eq!(rank.category(), HandCategory::Quads);

        // Six cards: straight using five of them.
        let rank = rank_of("4h 5d 6s 7c 8h Ah");
        assert_eq!(rank.category(), HandCategory::Straight);
    }

    #[test]
    fn test_full_house_over_flush() {
        let boat = rank_of("2h 2d 2s Kc Ks");
        let flush = rank_of("Ah Qh 9h 7h 3h");
        assert!(boat > flush);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(evaluate(&cards("Ah Kd")).is_err());
        assert!(evaluate(&cards("Ah Kd Qs Jc 9s 8s 7s 6s")).is_err());
    }
}
