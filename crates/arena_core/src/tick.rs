//! Round/tick addressing.
//!
//! A round is ten ticks. Round 0 only has tick 0, the setup moment before
//! any command has been executed. All arithmetic here is total: stepping
//! back from tick zero stays at tick zero.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of ticks in a round.
pub const TICKS_PER_ROUND: u8 = 10;

/// A moment in the game, ordered by round then tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick {
    /// Round number, 0 for setup.
    pub round: u32,
    /// Tick within the round, 1..=10 (0 only in round 0).
    pub tick: u8,
}

/// The setup moment before round 1.
pub const TICK_ZERO: Tick = Tick { round: 0, tick: 0 };

impl Tick {
    /// Create a tick. Round 0 is always tick 0; other ticks are clamped to 1..=10.
    #[must_use]
    pub fn new(round: u32, tick: u8) -> Self {
        if round == 0 {
            TICK_ZERO
        } else {
            Self {
                round,
                tick: tick.clamp(1, TICKS_PER_ROUND),
            }
        }
    }

    /// First tick of `round`.
    #[must_use]
    pub fn round_start(round: u32) -> Self {
        Self::new(round, 1)
    }

    /// Last tick of `round`.
    #[must_use]
    pub fn round_end(round: u32) -> Self {
        Self::new(round, TICKS_PER_ROUND)
    }

    /// Absolute tick count since setup.
    #[must_use]
    pub fn abs(self) -> u32 {
        if self.round == 0 {
            0
        } else {
            (self.round - 1) * u32::from(TICKS_PER_ROUND) + u32::from(self.tick)
        }
    }

    /// Tick with the given absolute count.
    #[must_use]
    pub fn from_abs(abs: u32) -> Self {
        if abs == 0 {
            return TICK_ZERO;
        }
        let per = u32::from(TICKS_PER_ROUND);
        Self {
            round: (abs - 1) / per + 1,
            tick: ((abs - 1) % per + 1) as u8,
        }
    }

    /// The following tick.
    #[must_use]
    pub fn next(self) -> Self {
        Self::from_abs(self.abs() + 1)
    }

    /// The preceding tick, or tick zero.
    #[must_use]
    pub fn prev(self) -> Self {
        Self::from_abs(self.abs().saturating_sub(1))
    }

    /// Whether this is the setup tick.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == TICK_ZERO
    }

    /// All ticks of `round` in order.
    pub fn ticks_for_round(round: u32) -> impl Iterator<Item = Self> {
        let ticks = if round == 0 { 0..=0 } else { 1..=TICKS_PER_ROUND };
        ticks.map(move |t| Self::new(round, t))
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.round, self.tick)
    }
}
