//! Facts recorded in entity histories.
//!
//! Events are what players read in their round reports. They are never
//! consumed by the engine itself, apart from summing hit scores.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::math::{Fixed, Point};

/// Kind of damage carried by a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Direct laser fire. Resolved like an explosion.
    Laser,
    /// Kinetic blast.
    Explosion,
    /// Cannot cross an active shield, doubled against hull.
    Nanocyte,
    /// Doubled against shields, drains battery instead of hull.
    Emp,
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Laser => "Laser",
            Self::Explosion => "Explosion",
            Self::Nanocyte => "Nanocyte",
            Self::Emp => "EMP",
        };
        f.write_str(name)
    }
}

/// One object detecting another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Name of the detected object.
    pub name: String,
    /// Position of the detected object.
    pub pos: Point,
    /// Distance from the observer.
    pub distance: f64,
    /// Bearing relative to the observer's heading.
    pub direction: f64,
    /// Absolute compass heading from the observer.
    pub heading: f64,
    /// Detected object's own heading.
    #[serde(with = "crate::math::fixed_serde")]
    pub target_heading: Fixed,
    /// Detected object's speed.
    pub speed: i32,
}

/// Damage delivered to one target.
///
/// `score` accumulates while damage is resolved and is credited to the
/// ship that owns the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Where the hit came from; decides the shield quadrant.
    pub pos: Point,
    /// Kind of damage.
    pub damage_type: DamageType,
    /// Entity that delivered the hit (laser ship, missile, mine).
    pub source: EntityId,
    /// Name of the source.
    pub source_name: String,
    /// Ship credited with the hit.
    pub owner: EntityId,
    /// Entity being hit.
    pub target: EntityId,
    /// Name of the target.
    pub target_name: String,
    /// Raw damage before defenses.
    pub amount: i32,
    /// Points earned by the owner.
    pub score: i32,
    /// False for same-faction hits.
    pub can_score: bool,
}

impl fmt::Display for HitEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hit {} with {} for {}",
            self.source_name, self.target_name, self.damage_type, self.amount
        )
    }
}

/// A warhead going off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionEvent {
    /// Centre of the blast.
    pub pos: Point,
    /// Kind of damage.
    pub damage_type: DamageType,
    /// Name of the exploding object.
    pub source_name: String,
    /// Blast radius.
    pub radius: f64,
}

/// Anything that can appear in a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Detection of another object.
    Scan(ScanEvent),
    /// Damage dealt or received.
    Hit(HitEvent),
    /// Visible explosion.
    Explosion(ExplosionEvent),
    /// Plain message for the owning player.
    Internal(String),
}

impl Event {
    /// Message event.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// The hit carried by this event, if any.
    #[must_use]
    pub fn as_hit(&self) -> Option<&HitEvent> {
        match self {
            Self::Hit(hit) => Some(hit),
            _ => None,
        }
    }

    /// The scan carried by this event, if any.
    #[must_use]
    pub fn as_scan(&self) -> Option<&ScanEvent> {
        match self {
            Self::Scan(scan) => Some(scan),
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(s) => write!(
                f,
                "Scanned {} at {}, distance {}, direction {}, heading {}",
                s.name, s.pos, s.distance, s.direction, s.heading
            ),
            Self::Hit(h) => h.fmt(f),
            Self::Explosion(e) => write!(f, "{} exploded at {}", e.source_name, e.pos),
            Self::Internal(m) => f.write_str(m),
        }
    }
}
