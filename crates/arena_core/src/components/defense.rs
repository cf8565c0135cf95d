//! Shields.
//!
//! Shields absorb hits per compass quadrant. The quadrant is picked from the
//! bearing of the hit's origin as seen from the defender:
//!
//! | Quadrant | Bearing         |
//! |----------|-----------------|
//! | N        | `[315, 45)`     |
//! | E        | `[45, 135)`     |
//! | S        | `[135, 225)`    |
//! | W        | `[225, 315)`    |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::events::DamageType;
use crate::math::normalize_heading;

/// Compass quadrant of a shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// Front.
    N,
    /// Starboard.
    E,
    /// Rear.
    S,
    /// Port.
    W,
}

impl Quadrant {
    /// All quadrants in compass order.
    pub const ALL: [Self; 4] = [Self::N, Self::E, Self::S, Self::W];

    /// Quadrant covering `bearing` (any value, normalized here).
    #[must_use]
    pub fn from_bearing(bearing: f64) -> Self {
        let b = normalize_heading(bearing);
        if !(45.0..315.0).contains(&b) {
            Self::N
        } else if b < 135.0 {
            Self::E
        } else if b < 225.0 {
            Self::S
        } else {
            Self::W
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::N => "N",
            Self::E => "E",
            Self::S => "S",
            Self::W => "W",
        };
        f.write_str(s)
    }
}

impl FromStr for Quadrant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "N" => Ok(Self::N),
            "E" => Ok(Self::E),
            "S" => Ok(Self::S),
            "W" => Ok(Self::W),
            _ => Err(()),
        }
    }
}

/// One value per quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuadrantValues {
    /// North.
    pub n: i32,
    /// East.
    pub e: i32,
    /// South.
    pub s: i32,
    /// West.
    pub w: i32,
}

impl QuadrantValues {
    /// Same value in every quadrant.
    #[must_use]
    pub const fn uniform(value: i32) -> Self {
        Self {
            n: value,
            e: value,
            s: value,
            w: value,
        }
    }

    /// Value of `q`.
    #[must_use]
    pub fn get(&self, q: Quadrant) -> i32 {
        match q {
            Quadrant::N => self.n,
            Quadrant::E => self.e,
            Quadrant::S => self.s,
            Quadrant::W => self.w,
        }
    }

    /// Mutable value of `q`.
    pub fn get_mut(&mut self, q: Quadrant) -> &mut i32 {
        match q {
            Quadrant::N => &mut self.n,
            Quadrant::E => &mut self.e,
            Quadrant::S => &mut self.s,
            Quadrant::W => &mut self.w,
        }
    }
}

/// Result of shields taking a hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Absorption {
    /// Damage left for hull or battery.
    pub breakthrough: i32,
    /// Points earned against the shield (0 if the hit cannot score).
    pub score: i32,
    /// Messages for the attacker's owner.
    pub attacker_notes: Vec<String>,
    /// Messages for the defender.
    pub defender_notes: Vec<String>,
}

/// Quadrant shields.
///
/// Invariant: `0 <= strengths[q] <= 2 * max_strengths[q]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shields {
    /// Current strength per quadrant.
    pub strengths: QuadrantValues,
    /// Nominal strength per quadrant.
    pub max_strengths: QuadrantValues,
}

impl Shields {
    /// Fully charged shields.
    #[must_use]
    pub fn new(max_strengths: QuadrantValues) -> Self {
        Self {
            strengths: max_strengths,
            max_strengths,
        }
    }

    /// Highest strength a boost may reach in `q`.
    #[must_use]
    pub fn boost_limit(&self, q: Quadrant) -> i32 {
        2 * self.max_strengths.get(q)
    }

    /// Absorb `amount` damage of `damage_type` on quadrant `q`.
    ///
    /// `source_name`/`target_name` only feed the messages.
    pub fn absorb(
        &mut self,
        q: Quadrant,
        damage_type: DamageType,
        amount: i32,
        can_score: bool,
        break_bonus: i32,
        source_name: &str,
        target_name: &str,
    ) -> Absorption {
        let mut out = Absorption::default();
        if amount <= 0 {
            return out;
        }
        let old = self.strengths.get(q);
        if old <= 0 {
            out.breakthrough = amount;
            return out;
        }

        let damage = match damage_type {
            DamageType::Nanocyte => {
                out.attacker_notes.push(format!(
                    "Nanocytes splashed harmlessly against {target_name}'s shield."
                ));
                return out;
            }
            // Two points of shield per point of EMP, as far as the shield reaches.
            DamageType::Emp => {
                if old >= 2 * amount {
                    2 * amount
                } else {
                    amount + old / 2
                }
            }
            DamageType::Laser | DamageType::Explosion => amount,
        };

        let new = old - damage;
        if new >= 0 {
            *self.strengths.get_mut(q) = new;
            if can_score {
                out.score = (old - new) / 2;
            }
            out.attacker_notes.push(format!(
                "{source_name} hit {target_name}'s shield: ({} points).",
                out.score
            ));
            out.defender_notes.push(format!(
                "Shield {q} hit for {damage}. Remaining strength: {new}"
            ));
        } else {
            *self.strengths.get_mut(q) = 0;
            out.breakthrough = -new;
            if can_score {
                out.score = old / 2 + break_bonus;
            }
            out.attacker_notes.push(format!(
                "{source_name} broke {target_name}'s shield: ({} points).",
                out.score
            ));
            out.defender_notes.push(format!(
                "Hit on shield {q} broke the shield: {} passed through.",
                out.breakthrough
            ));
        }
        out
    }

    /// Move up to `amount` energy from `battery` into quadrant `q`.
    pub fn boost(&mut self, q: Quadrant, amount: i32, battery: &mut i32) -> Vec<String> {
        let mut notes = Vec::new();
        let amount = amount.clamp(0, (*battery).max(0));
        *battery -= amount;
        notes.push(format!("Used {amount} energy: battery at {battery}"));

        let limit = self.boost_limit(q);
        let strength = self.strengths.get_mut(q);
        *strength += amount;
        if *strength > limit {
            *strength = limit;
            notes.push(format!("Shield {q} can't boost beyond twice the strength."));
        }
        notes.push(format!("Boosted shield quadrant {q} to {strength}"));
        notes
    }

    /// Let boosted quadrants fall back to their nominal strength.
    pub fn dissipate_boost(&mut self) -> Vec<String> {
        let mut notes = Vec::new();
        for q in Quadrant::ALL {
            let max = self.max_strengths.get(q);
            let strength = self.strengths.get_mut(q);
            if *strength > max {
                *strength = max;
                notes.push(format!("Shield {q} boost dissipated: now at {max}."));
            }
        }
        notes
    }

    /// Restore every quadrant to nominal strength.
    pub fn recharge(&mut self) {
        self.strengths = self.max_strengths;
    }
}
