//! Attachable hull components.
//!
//! Ships and projectiles are assembled from components: shields for defense,
//! weapons, and ECM. Every component is attached to exactly one entity and
//! refers back to it by [`EntityId`], never by reference, so spawning and
//! destroying entities mid-tick cannot leave a dangling container.
//!
//! Hooks with nothing to do for a given kind are no-ops.

pub mod defense;
pub mod ecm;
pub mod weapons;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use defense::{Absorption, Quadrant, QuadrantValues, Shields};
pub use ecm::Cloak;
pub use weapons::{Falloff, Gravscan, Launcher, Laser, Warhead, MAX_SCAN_CONE, MIN_SCAN_CONE};

use crate::entity::EntityId;
use crate::error::{GameError, Result};
use crate::parameters::Parameter;

/// Behavior-specific part of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Quadrant shields.
    Shields(Shields),
    /// Beam weapon.
    Laser(Laser),
    /// Missile or mine launcher.
    Launcher(Launcher),
    /// Directional scanner.
    Gravscan(Gravscan),
    /// Cloaking device.
    Cloak(Cloak),
    /// Projectile charge.
    Warhead(Warhead),
}

/// A named part of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Name, unique within its entity.
    pub name: String,
    container: Option<EntityId>,
    /// Behavior and state.
    pub kind: ComponentKind,
}

impl Component {
    /// Create a detached component.
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            container: None,
            kind,
        }
    }

    /// Attach to an entity.
    pub fn attach(&mut self, container: EntityId) {
        self.container = Some(container);
    }

    /// Entity this component belongs to.
    pub fn container(&self) -> Result<EntityId> {
        self.container.ok_or_else(|| {
            GameError::invariant(format!("component {} has no container", self.name))
        })
    }

    /// Whether this component is a weapon that can be fired by command.
    #[must_use]
    pub fn is_weapon(&self) -> bool {
        matches!(
            self.kind,
            ComponentKind::Laser(_) | ComponentKind::Launcher(_) | ComponentKind::Gravscan(_)
        )
    }

    /// Start-of-tick hook.
    pub fn tick(&mut self) {
        if let ComponentKind::Laser(laser) = &mut self.kind {
            laser.cool();
        }
    }

    /// Energy upkeep for the tick. Returns messages for the owner.
    pub fn use_energy(&mut self, battery: &mut i32) -> Vec<String> {
        match &mut self.kind {
            ComponentKind::Cloak(cloak) => cloak.drain(&self.name, battery),
            _ => Vec::new(),
        }
    }

    /// Hook before the first tick of a round.
    pub fn round_reset(&mut self) {
        if let ComponentKind::Laser(laser) = &mut self.kind {
            laser.temperature = 0;
        }
    }

    /// Hook after the last tick of a round.
    pub fn post_round_reset(&mut self) -> Vec<String> {
        match &mut self.kind {
            ComponentKind::Shields(shields) => shields.dissipate_boost(),
            _ => Vec::new(),
        }
    }

    /// Restore to factory state (replenish).
    pub fn reset(&mut self) {
        match &mut self.kind {
            ComponentKind::Laser(laser) => laser.temperature = 0,
            ComponentKind::Launcher(launcher) => launcher.reload(),
            _ => {}
        }
    }

    /// Inputs a `Fire` command must supply after the weapon name.
    #[must_use]
    pub fn expected_parameters(&self) -> Vec<Parameter> {
        match &self.kind {
            ComponentKind::Laser(_) => vec![Parameter::ObjectByName],
            ComponentKind::Launcher(launcher) => vec![Parameter::Direction {
                arc: launcher.firing_arc,
            }],
            ComponentKind::Gravscan(_) => vec![
                Parameter::Direction { arc: None },
                Parameter::NumberInRange {
                    label: "Scan cone",
                    min: MIN_SCAN_CONE,
                    max: MAX_SCAN_CONE,
                },
            ],
            _ => Vec::new(),
        }
    }

    /// Inputs an `Activation` command must supply, `None` if not switchable.
    #[must_use]
    pub fn activation_parameters(&self) -> Option<Vec<Parameter>> {
        match self.kind {
            ComponentKind::Cloak(_) => Some(vec![Parameter::OnOff]),
            _ => None,
        }
    }

    /// Observer's scan range after this component's countermeasures.
    #[must_use]
    pub fn modify_scan_range(&self, range: f64) -> f64 {
        match &self.kind {
            ComponentKind::Cloak(cloak) => cloak.modify_scan_range(range),
            _ => range,
        }
    }

    /// Shields, if this is a shield component.
    #[must_use]
    pub fn as_shields(&self) -> Option<&Shields> {
        match &self.kind {
            ComponentKind::Shields(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable shields, if this is a shield component.
    pub fn as_shields_mut(&mut self) -> Option<&mut Shields> {
        match &mut self.kind {
            ComponentKind::Shields(s) => Some(s),
            _ => None,
        }
    }

    /// Warhead, if this is one.
    #[must_use]
    pub fn as_warhead(&self) -> Option<&Warhead> {
        match &self.kind {
            ComponentKind::Warhead(w) => Some(w),
            _ => None,
        }
    }

    /// Report lines shown to players.
    #[must_use]
    pub fn status(&self) -> BTreeMap<String, String> {
        let mut status = BTreeMap::new();
        let arc_text = |arc: &Option<crate::math::Arc>| {
            arc.map_or_else(|| "360".to_string(), |a| a.to_string())
        };
        match &self.kind {
            ComponentKind::Shields(s) => {
                for q in Quadrant::ALL {
                    status.insert(
                        q.to_string(),
                        format!("{}/{}", s.strengths.get(q), s.max_strengths.get(q)),
                    );
                }
            }
            ComponentKind::Laser(l) => {
                status.insert("Strength".into(), l.strength.to_string());
                status.insert(
                    "Temperature".into(),
                    format!("{}/{}", l.temperature, l.max_temperature),
                );
                status.insert("Firing Arc".into(), arc_text(&l.firing_arc));
            }
            ComponentKind::Launcher(l) => {
                status.insert("Ammo".into(), format!("{} {}", l.ammo, l.payload));
                status.insert("Firing Arc".into(), arc_text(&l.firing_arc));
            }
            ComponentKind::Gravscan(g) => {
                status.insert("Energy".into(), g.energy_per_pulse.to_string());
            }
            ComponentKind::Cloak(c) => {
                status.insert("Active".into(), if c.active { "Yes" } else { "No" }.into());
            }
            ComponentKind::Warhead(w) => {
                status.insert("Strength".into(), w.damage.to_string());
                status.insert("Payload".into(), w.damage_type.to_string());
            }
        }
        status
    }
}
