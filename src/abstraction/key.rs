//! Information-set key types.
//!
//! An [`AbstractionKey`] is the immutable composite the regret and strategy
//! stores are keyed by: street, hand-strength bucket, board texture, position
//! bucket, stack-depth tier, and an abbreviated betting history. Two concrete
//! states that abstract to the same key are treated as one information set.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Street};
use crate::error::{EngineError, Result};

/// Saturation cap for per-street action counts in [`HistoryAbbrev`].
pub const HISTORY_CAP: u8 = 3;

/// Board coordination classes, coarsest strategically meaningful split.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum BoardTexture {
    /// No board yet.
    Preflop,
    /// Paired board that is also three-plus to a suit.
    PairedWet,
    /// Paired board.
    Paired,
    /// Three or more cards of one suit.
    Monotone,
    /// Three ranks within a five-card straight window.
    Connected,
    /// Exactly two cards of some suit.
    TwoTone,
    /// None of the above.
    Dry,
}

impl BoardTexture {
    /// Classify a board. Deterministic priority order: paired-and-suited
    /// beats paired beats monotone beats connected beats two-tone.
    pub fn classify(board: &[Card]) -> Self {
        if board.is_empty() {
            return BoardTexture::Preflop;
        }

        let mut rank_counts = [0u8; 13];
        let mut suit_counts = [0u8; 4];
        for card in board {
            rank_counts[card.rank() as usize] += 1;
            suit_counts[card.suit() as usize] += 1;
        }

        let paired = rank_counts.iter().any(|&c| c >= 2);
        let max_suited = *suit_counts.iter().max().unwrap_or(&0);
        let monotone = max_suited >= 3;

        if paired && monotone {
            return BoardTexture::PairedWet;
        }
        if paired {
            return BoardTexture::Paired;
        }
        if monotone {
            return BoardTexture::Monotone;
        }
        if Self::is_connected(&rank_counts) {
            return BoardTexture::Connected;
        }
        if max_suited == 2 {
            return BoardTexture::TwoTone;
        }
        BoardTexture::Dry
    }

    /// Three distinct ranks inside a span of five — a straight is live.
    /// The ace plays at both ends of the ladder.
    fn is_connected(rank_counts: &[u8; 13]) -> bool {
        let mut ranks: Vec<i8> = (0..13i8).filter(|&r| rank_counts[r as usize] > 0).collect();
        if rank_counts[12] > 0 {
            ranks.insert(0, -1);
        }
        ranks.windows(3).any(|w| w[2] - w[0] <= 4)
    }

    /// Short tag used in key displays.
    pub fn code(self) -> &'static str {
        match self {
            BoardTexture::Preflop => "pre",
            BoardTexture::PairedWet => "pw",
            BoardTexture::Paired => "pr",
            BoardTexture::Monotone => "mono",
            BoardTexture::Connected => "conn",
            BoardTexture::TwoTone => "tt",
            BoardTexture::Dry => "dry",
        }
    }
}

/// Seat location collapsed into four strategic groups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PositionBucket {
    /// First seats to act postflop-open positions.
    Early,
    /// Middle positions.
    Middle,
    /// Cutoff and button.
    Late,
    /// Small and big blind.
    Blinds,
}

impl PositionBucket {
    /// Map a seat (0 = button, counting clockwise so 1 = small blind,
    /// 2 = big blind) at a table of `table_size` players into its bucket.
    pub fn from_seat(seat: usize, table_size: usize) -> Result<Self> {
        if !(2..=9).contains(&table_size) {
            return Err(EngineError::unabstractable(format!(
                "table size {} outside 2-9",
                table_size
            )));
        }
        if seat >= table_size {
            return Err(EngineError::unabstractable(format!(
                "seat {} at a {}-handed table",
                seat, table_size
            )));
        }
        if seat == 0 {
            return Ok(PositionBucket::Late);
        }
        if seat <= 2 {
            return Ok(PositionBucket::Blinds);
        }
        // Seats 3.. run from under the gun toward the cutoff.
        let frac = (seat - 2) as f64 / (table_size - 2) as f64;
        if frac >= 0.75 {
            Ok(PositionBucket::Late)
        } else if frac >= 0.4 {
            Ok(PositionBucket::Middle)
        } else {
            Ok(PositionBucket::Early)
        }
    }

    /// Short tag used in key displays.
    pub fn code(self) -> &'static str {
        match self {
            PositionBucket::Early => "E",
            PositionBucket::Middle => "M",
            PositionBucket::Late => "L",
            PositionBucket::Blinds => "B",
        }
    }
}

/// Stack-to-pot-ratio tier, bucketing strategic commitment level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SprTier {
    /// SPR at or below the first bound; pot-committed.
    VeryLow,
    /// Shallow.
    Low,
    /// Middling.
    Medium,
    /// Comfortable postflop depth.
    Deep,
    /// Deep-stacked.
    VeryDeep,
    /// Beyond the last bound.
    Massive,
}

impl SprTier {
    /// Bucket a ratio using ascending tier bounds.
    pub fn from_ratio(spr: f64, bounds: &[f64; 5]) -> Self {
        const TIERS: [SprTier; 5] = [
            SprTier::VeryLow,
            SprTier::Low,
            SprTier::Medium,
            SprTier::Deep,
            SprTier::VeryDeep,
        ];
        for (i, &bound) in bounds.iter().enumerate() {
            if spr <= bound {
                return TIERS[i];
            }
        }
        SprTier::Massive
    }

    /// Ordinal 0-5, used by the distance metric.
    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Per-street betting history collapsed into saturating action counts plus a
/// facing-a-bet flag. Amounts are deliberately dropped; cardinality stays
/// bounded no matter how many raises occurred.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HistoryAbbrev {
    /// Checks this street, capped at [`HISTORY_CAP`].
    pub checks: u8,
    /// Calls this street, capped.
    pub calls: u8,
    /// Bets and raises this street, capped.
    pub raises: u8,
    /// Whether the actor currently faces an outstanding bet.
    pub facing_bet: bool,
}

impl HistoryAbbrev {
    /// Build an abbreviation, saturating each count at the cap.
    pub fn new(checks: u8, calls: u8, raises: u8, facing_bet: bool) -> Self {
        HistoryAbbrev {
            checks: checks.min(HISTORY_CAP),
            calls: calls.min(HISTORY_CAP),
            raises: raises.min(HISTORY_CAP),
            facing_bet,
        }
    }

    /// A street with no actions yet.
    pub fn empty() -> Self {
        HistoryAbbrev::new(0, 0, 0, false)
    }
}

impl fmt::Display for HistoryAbbrev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x{}c{}r{}{}",
            self.checks,
            self.calls,
            self.raises,
            if self.facing_bet { "f" } else { "-" }
        )
    }
}

/// Primary key for the regret and strategy stores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AbstractionKey {
    /// Betting street.
    pub street: Street,
    /// Ordinal hand-strength bucket (per-street cardinality).
    pub strength: u8,
    /// Board coordination class.
    pub texture: BoardTexture,
    /// Actor's position bucket.
    pub position: PositionBucket,
    /// Stack-depth tier.
    pub spr: SprTier,
    /// Abbreviated betting history this street.
    pub history: HistoryAbbrev,
}

impl AbstractionKey {
    /// Weighted mismatch distance to another key. Zero iff the keys are
    /// equal, assuming strictly positive weights.
    pub fn distance(&self, other: &AbstractionKey, weights: &DistanceWeights) -> f64 {
        let street_gap = (self.street.index() as i32 - other.street.index() as i32).abs();
        let strength_gap = (self.strength as i32 - other.strength as i32).abs();
        let spr_gap = (self.spr.index() as i32 - other.spr.index() as i32).abs();
        let mismatch = |differs: bool| if differs { 1.0 } else { 0.0 };

        weights.street * street_gap as f64
            + weights.strength * strength_gap as f64
            + weights.texture * mismatch(self.texture != other.texture)
            + weights.position * mismatch(self.position != other.position)
            + weights.spr * spr_gap as f64
            + weights.history * mismatch(self.history != other.history)
    }
}

impl fmt::Display for AbstractionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|h{}|{}|{}|s{}|{}",
            self.street.symbol(),
            self.strength,
            self.texture.code(),
            self.position.code(),
            self.spr.index(),
            self.history
        )
    }
}

/// Weights for the approximate-lookup distance metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistanceWeights {
    /// Per step of street difference. Heavy by default: cross-street matches
    /// require explicit opt-in via a large max distance.
    pub street: f64,
    /// Per step of strength-bucket difference.
    pub strength: f64,
    /// Texture mismatch.
    pub texture: f64,
    /// Position-bucket mismatch.
    pub position: f64,
    /// Per step of SPR-tier difference.
    pub spr: f64,
    /// History-abbreviation mismatch.
    pub history: f64,
}

impl Default for DistanceWeights {
    fn default() -> Self {
        Self {
            street: 8.0,
            strength: 1.0,
            texture: 2.0,
            position: 1.5,
            spr: 1.0,
            history: 2.5,
        }
    }
}

impl DistanceWeights {
    /// Check all weights are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("street", self.street),
            ("strength", self.strength),
            ("texture", self.texture),
            ("position", self.position),
            ("spr", self.spr),
            ("history", self.history),
        ];
        for (name, w) in all {
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::configuration(format!(
                    "distance weight '{}' is {}; must be finite and non-negative",
                    name, w
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Board;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    fn key(street: Street, strength: u8) -> AbstractionKey {
        AbstractionKey {
            street,
            strength,
            texture: BoardTexture::Dry,
            position: PositionBucket::Late,
            spr: SprTier::Medium,
            history: HistoryAbbrev::empty(),
        }
    }

    #[test]
    fn test_texture_classes() {
        assert_eq!(BoardTexture::classify(&[]), BoardTexture::Preflop);
        assert_eq!(
            BoardTexture::classify(board("Kh Kd 2s").cards()),
            BoardTexture::Paired
        );
        assert_eq!(
            BoardTexture::classify(board("Kh Qh 2h").cards()),
            BoardTexture::Monotone
        );
        assert_eq!(
            BoardTexture::classify(board("Kh Kd 2h Qh 3h").cards()),
            BoardTexture::PairedWet
        );
        assert_eq!(
            BoardTexture::classify(board("9h 8d 7s").cards()),
            BoardTexture::Connected
        );
        assert_eq!(
            BoardTexture::classify(board("Ah Kh 2d").cards()),
            BoardTexture::TwoTone
        );
        assert_eq!(
            BoardTexture::classify(board("Ah Kd 7c").cards()),
            BoardTexture::Dry
        );
    }

    #[test]
    fn test_texture_priority() {
        // Paired beats connected and two-tone.
        assert_eq!(
            BoardTexture::classify(board("9h 9d 8h").cards()),
            BoardTexture::Paired
        );
        // Monotone beats connected.
        assert_eq!(
            BoardTexture::classify(board("9h 8h 7h").cards()),
            BoardTexture::Monotone
        );
    }

    #[test]
    fn test_wheel_boards_are_connected() {
        // The ace plays low: these boards all have a live straight.
        assert_eq!(
            BoardTexture::classify(board("As 2d 3c").cards()),
            BoardTexture::Connected
        );
        assert_eq!(
            BoardTexture::classify(board("Ah 4c 5d").cards()),
            BoardTexture::Connected
        );
        assert_eq!(
            BoardTexture::classify(board("As 2d 3c 4h 5s").cards()),
            BoardTexture::Connected
        );
        // An ace with no wheel companions stays dry.
        assert_eq!(
            BoardTexture::classify(board("Ah 7d 2c").cards()),
            BoardTexture::Dry
        );
    }

    #[test]
    fn test_position_buckets_six_max() {
        // Seats from the button: 0 = BTN, 1 = SB, 2 = BB, 3 = UTG, 4 = MP, 5 = CO.
        assert_eq!(PositionBucket::from_seat(0, 6).unwrap(), PositionBucket::Late);
        assert_eq!(PositionBucket::from_seat(1, 6).unwrap(), PositionBucket::Blinds);
        assert_eq!(PositionBucket::from_seat(2, 6).unwrap(), PositionBucket::Blinds);
        assert_eq!(PositionBucket::from_seat(3, 6).unwrap(), PositionBucket::Early);
        assert_eq!(PositionBucket::from_seat(4, 6).unwrap(), PositionBucket::Middle);
        assert_eq!(PositionBucket::from_seat(5, 6).unwrap(), PositionBucket::Late);
    }

    #[test]
    fn test_position_buckets_heads_up_and_errors() {
        assert_eq!(PositionBucket::from_seat(0, 2).unwrap(), PositionBucket::Late);
        assert_eq!(PositionBucket::from_seat(1, 2).unwrap(), PositionBucket::Blinds);
        assert!(PositionBucket::from_seat(6, 6).is_err());
        assert!(PositionBucket::from_seat(0, 1).is_err());
    }

    #[test]
    fn test_spr_tiers() {
        let bounds = [1.0, 3.0, 6.0, 12.0, 25.0];
        assert_eq!(SprTier::from_ratio(0.5, &bounds), SprTier::VeryLow);
        assert_eq!(SprTier::from_ratio(1.0, &bounds), SprTier::VeryLow);
        assert_eq!(SprTier::from_ratio(2.0, &bounds), SprTier::Low);
        assert_eq!(SprTier::from_ratio(5.0, &bounds), SprTier::Medium);
        assert_eq!(SprTier::from_ratio(10.0, &bounds), SprTier::Deep);
        assert_eq!(SprTier::from_ratio(20.0, &bounds), SprTier::VeryDeep);
        assert_eq!(SprTier::from_ratio(100.0, &bounds), SprTier::Massive);
    }

    #[test]
    fn test_history_saturates() {
        let h = HistoryAbbrev::new(9, 1, 7, true);
        assert_eq!(h.checks, HISTORY_CAP);
        assert_eq!(h.calls, 1);
        assert_eq!(h.raises, HISTORY_CAP);
        assert_eq!(h.to_string(), "x3c1r3f");
        assert_eq!(HistoryAbbrev::empty().to_string(), "x0c0r0-");
    }

    #[test]
    fn test_distance_zero_iff_equal() {
        let w = DistanceWeights::default();
        let a = key(Street::Flop, 3);
        assert_eq!(a.distance(&a, &w), 0.0);

        let mut b = a;
        b.strength = 4;
        assert!(a.distance(&b, &w) > 0.0);
        assert_eq!(a.distance(&b, &w), b.distance(&a, &w));
    }

    #[test]
    fn test_distance_scales_with_gap() {
        let w = DistanceWeights::default();
        let a = key(Street::Flop, 2);
        let near = key(Street::Flop, 3);
        let far = key(Street::Flop, 7);
        assert!(a.distance(&near, &w) < a.distance(&far, &w));

        let cross_street = key(Street::Turn, 2);
        assert!(a.distance(&cross_street, &w) >= w.street);
    }

    #[test]
    fn test_key_display_is_stable() {
        let k = AbstractionKey {
            street: Street::Flop,
            strength: 5,
            texture: BoardTexture::TwoTone,
            position: PositionBucket::Blinds,
            spr: SprTier::Deep,
            history: HistoryAbbrev::new(1, 0, 1, true),
        };
        assert_eq!(k.to_string(), "F|h5|tt|B|s3|x1c0r1f");
    }

    #[test]
    fn test_key_serde_roundtrip() {
        let k = key(Street::River, 7);
        let json = serde_json::to_string(&k).unwrap();
        let back: AbstractionKey = serde_json::from_str(&json).unwrap();
        assert_eq!(k, back);
    }

    #[test]
    fn test_weights_validation() {
        assert!(DistanceWeights::default().validate().is_ok());
        let bad = DistanceWeights {
            street: -1.0,
            ..DistanceWeights::default()
        };
        assert!(bad.validate().is_err());
    }
}
