//! Weapons: lasers, launchers, gravscans and warheads.
//!
//! These types only hold weapon state and the arithmetic of firing. Looking
//! up targets and spawning payloads needs the whole arena and lives in
//! [`crate::round`].

use serde::{Deserialize, Serialize};

use crate::events::DamageType;
use crate::math::Arc;

/// Direct-fire beam weapon.
///
/// Firing is gated by heat and energy; damage falls off by one point per
/// unit of distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    /// Damage at point-blank range.
    pub strength: i32,
    /// Angles (relative to the ship's heading) the laser may fire at.
    pub firing_arc: Option<Arc>,
    /// Current heat.
    pub temperature: i32,
    /// Highest temperature at which the laser still fires.
    pub max_temperature: i32,
    /// Heat added per shot.
    pub heat_per_shot: i32,
    /// Heat removed per tick.
    pub cooling_per_tick: i32,
    /// Battery drawn per shot.
    pub energy_per_shot: i32,
}

impl Laser {
    /// Damage delivered at `distance`, never negative.
    #[must_use]
    pub fn damage_at(&self, distance: f64) -> i32 {
        let damage = (f64::from(self.strength) - distance).round();
        if damage > 0.0 {
            damage as i32
        } else {
            0
        }
    }

    /// Whether the laser is cool enough to fire.
    #[must_use]
    pub fn temperature_ok(&self) -> bool {
        self.temperature <= self.max_temperature
    }

    /// Whether `battery` covers one shot.
    #[must_use]
    pub fn energy_ok(&self, battery: i32) -> bool {
        battery >= self.energy_per_shot
    }

    /// Whether a target at relative `direction` is inside the firing arc.
    #[must_use]
    pub fn in_firing_arc(&self, direction: f64) -> bool {
        self.firing_arc.map_or(true, |arc| arc.contains(direction))
    }

    /// Charge heat and energy for a shot attempt. Battery never goes below 0.
    pub fn discharge(&mut self, battery: &mut i32) {
        self.temperature += self.heat_per_shot;
        *battery = (*battery - self.energy_per_shot).max(0);
    }

    /// Per-tick cooling.
    pub fn cool(&mut self) {
        self.temperature = (self.temperature - self.cooling_per_tick).max(0);
    }
}

/// Launches missiles or mines from a magazine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Launcher {
    /// Catalog name of the payload.
    pub payload: String,
    /// Magazine size restored on replenish.
    pub initial_load: u32,
    /// Rounds left.
    pub ammo: u32,
    /// Payloads fired so far, used to name them.
    pub fired: u32,
    /// Angles (relative to the ship's heading) the launcher may fire at.
    pub firing_arc: Option<Arc>,
}

impl Launcher {
    /// A launcher with a full magazine.
    #[must_use]
    pub fn new(payload: impl Into<String>, initial_load: u32, firing_arc: Option<Arc>) -> Self {
        Self {
            payload: payload.into(),
            initial_load,
            ammo: initial_load,
            fired: 0,
            firing_arc,
        }
    }

    /// Take one round from the magazine, returning the payload's sequence number.
    pub fn take_round(&mut self) -> Option<u32> {
        if self.ammo == 0 {
            return None;
        }
        self.ammo -= 1;
        self.fired += 1;
        Some(self.fired)
    }

    /// Refill the magazine.
    pub fn reload(&mut self) {
        self.ammo = self.initial_load;
    }
}

/// Directional active scanner.
///
/// A narrow cone reaches far, a wide cone stays close; range falls
/// linearly from `max_range` at 30 degrees to `min_range` at 360.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gravscan {
    /// Battery drawn per pulse.
    pub energy_per_pulse: i32,
    /// Range of the narrowest cone.
    pub max_range: f64,
    /// Range of the full circle.
    pub min_range: f64,
}

/// Narrowest gravscan cone in degrees.
pub const MIN_SCAN_CONE: i32 = 30;
/// Widest gravscan cone in degrees.
pub const MAX_SCAN_CONE: i32 = 360;

impl Gravscan {
    /// Reach of a pulse with the given cone width.
    #[must_use]
    pub fn scan_distance(&self, cone: i32) -> f64 {
        let cone = cone.clamp(MIN_SCAN_CONE, MAX_SCAN_CONE);
        let slope = (self.max_range - self.min_range) / f64::from(MAX_SCAN_CONE - MIN_SCAN_CONE);
        (self.max_range - slope * f64::from(cone - MIN_SCAN_CONE)).trunc()
    }

    /// Arc covered by a pulse centred on relative `direction`.
    #[must_use]
    pub fn arc(&self, direction: i32, cone: i32) -> Arc {
        Arc::centred(f64::from(direction), f64::from(cone.clamp(MIN_SCAN_CONE, MAX_SCAN_CONE)))
    }
}

/// How warhead damage changes with distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Falloff {
    /// One point less per unit of distance.
    Linear,
    /// Full damage anywhere in range.
    Flat,
}

/// Explosive charge of a missile or mine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warhead {
    /// Kind of damage.
    pub damage_type: DamageType,
    /// Damage at the centre.
    pub damage: i32,
    /// Trigger and blast radius.
    pub range: f64,
    /// Distance falloff.
    pub falloff: Falloff,
}

impl Warhead {
    /// Damage dealt to something at `distance`.
    #[must_use]
    pub fn damage_at(&self, distance: f64) -> i32 {
        match self.falloff {
            Falloff::Flat => self.damage,
            Falloff::Linear => {
                let damage = (f64::from(self.damage) - distance.max(0.0)).round();
                if damage > 0.0 {
                    damage as i32
                } else {
                    0
                }
            }
        }
    }

    /// Whether something at `distance` is inside the blast.
    #[must_use]
    pub fn in_range(&self, distance: f64) -> bool {
        distance <= self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laser() -> Laser {
        Laser {
            strength: 180,
            firing_arc: Some(Arc::new(270.0, 90.0)),
            temperature: 0,
            max_temperature: 100,
            heat_per_shot: 20,
            cooling_per_tick: 5,
            energy_per_shot: 5,
        }
    }

    #[test]
    fn test_laser_linear_falloff() {
        let l = laser();
        assert_eq!(l.damage_at(30.4), 150);
        assert_eq!(l.damage_at(200.0), 0);
    }

    #[test]
    fn test_laser_heat_cycle() {
        let mut l = laser();
        let mut battery = 12;
        for _ in 0..6 {
            l.discharge(&mut battery);
        }
        assert_eq!(l.temperature, 120);
        assert!(!l.temperature_ok());
        assert_eq!(battery, 0);

        for _ in 0..4 {
            l.cool();
        }
        assert!(l.temperature_ok());
        for _ in 0..30 {
            l.cool();
        }
        assert_eq!(l.temperature, 0);
    }

    #[test]
    fn test_laser_arc() {
        let l = laser();
        assert!(l.in_firing_arc(-45.0));
        assert!(!l.in_firing_arc(180.0));
    }

    #[test]
    fn test_launcher_magazine() {
        let mut launcher = Launcher::new("Rocket", 2, None);
        assert_eq!(launcher.take_round(), Some(1));
        assert_eq!(launcher.take_round(), Some(2));
        assert_eq!(launcher.take_round(), None);
        launcher.reload();
        assert_eq!(launcher.ammo, 2);
        // names keep counting after a reload
        assert_eq!(launcher.take_round(), Some(3));
    }

    #[test]
    fn test_gravscan_range_tradeoff() {
        let g = Gravscan {
            energy_per_pulse: 10,
            max_range: 3000.0,
            min_range: 300.0,
        };
        assert_eq!(g.scan_distance(30), 3000.0);
        assert_eq!(g.scan_distance(360), 300.0);
        assert_eq!(g.scan_distance(90), 2509.0);
        assert_eq!(g.scan_distance(10), 3000.0);
    }

    #[test]
    fn test_warhead_falloff() {
        let linear = Warhead {
            damage_type: DamageType::Explosion,
            damage: 75,
            range: 6.0,
            falloff: Falloff::Linear,
        };
        assert_eq!(linear.damage_at(3.0), 72);
        assert!(linear.in_range(6.0));
        assert!(!linear.in_range(6.1));

        let flat = Warhead {
            falloff: Falloff::Flat,
            ..linear
        };
        assert_eq!(flat.damage_at(5.5), 75);
    }
}
