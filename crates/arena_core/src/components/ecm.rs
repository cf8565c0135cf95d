//! Electronic countermeasures.

use serde::{Deserialize, Serialize};

use crate::math::round1;

/// Cloaking device.
///
/// While active, every observer's effective scan range against the cloaked
/// object shrinks by `strength` (0.2 means 20% shorter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cloak {
    /// Fraction of scan range removed.
    pub strength: f64,
    /// Whether the cloak is running.
    pub active: bool,
    /// Battery drawn per tick while active.
    pub energy_per_tick: i32,
}

impl Cloak {
    /// Switch on or off. Switching on charges the first tick immediately.
    pub fn set_active(&mut self, name: &str, on: bool, battery: &mut i32) -> Vec<String> {
        let was_active = self.active;
        self.active = on;
        let mut notes = vec![format!(
            "Cloak {name} {}.",
            if on { "activated" } else { "deactivated" }
        )];
        if on && !was_active {
            notes.extend(self.drain(name, battery));
        }
        notes
    }

    /// Per-tick upkeep. Shuts down when the battery cannot pay.
    pub fn drain(&mut self, name: &str, battery: &mut i32) -> Vec<String> {
        if !self.active {
            return Vec::new();
        }
        if *battery < self.energy_per_tick {
            self.active = false;
            vec![format!("Not enough energy for Cloak {name}: shutting down.")]
        } else {
            *battery -= self.energy_per_tick;
            vec![format!("Cloak {name} used {} energy.", self.energy_per_tick)]
        }
    }

    /// Scan range an observer has left against the cloaked object.
    #[must_use]
    pub fn modify_scan_range(&self, range: f64) -> f64 {
        if self.active {
            round1(range * (1.0 - self.strength))
        } else {
            range
        }
    }
}
