//! Ship and payload classes.
//!
//! The catalog is plain data deserialized from RON. A built-in catalog is
//! embedded in the crate; [`Catalog::from_ron_str`] accepts custom ones.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     rules: (shield_break_bonus: 25),
//!     ships: [
//!         (
//!             name: "H2527",
//!             class_name: Some("Athens"),
//!             max_speed: 45, max_turn: 40, max_delta_v: 20,
//!             max_hull: 100, start_battery: 90, generators: 8,
//!             scan_range: 35.0,
//!             defense: [Shields(name: "Shields", strengths: (n: 100, e: 100, s: 100, w: 100))],
//!             weapons: [Laser(name: "L1", strength: 180)],
//!         ),
//!     ],
//!     payloads: [],
//! )
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::components::{
    Cloak, Component, ComponentKind, Falloff, Gravscan, Launcher, Laser, QuadrantValues, Shields,
    Warhead,
};
use crate::entity::ReplenishStats;
use crate::error::{GameError, Result};
use crate::events::DamageType;
use crate::math::Arc;

/// The catalog that ships with the engine.
pub const BUILTIN_CATALOG: &str = include_str!("../../assets/catalog.ron");

/// Game-wide scoring and scaling constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    /// Points for knocking a shield quadrant down.
    #[serde(default = "default_shield_break_bonus")]
    pub shield_break_bonus: i32,
    /// Points for the hit that destroys a ship.
    #[serde(default = "default_killing_blow_bonus")]
    pub killing_blow_bonus: i32,
    /// Multiplier applied to ship and gravscan scan ranges.
    #[serde(default = "default_scan_multiplier")]
    pub scan_multiplier: f64,
}

const fn default_shield_break_bonus() -> i32 {
    25
}

const fn default_killing_blow_bonus() -> i32 {
    100
}

const fn default_scan_multiplier() -> f64 {
    6.0
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            shield_break_bonus: default_shield_break_bonus(),
            killing_blow_bonus: default_killing_blow_bonus(),
            scan_multiplier: default_scan_multiplier(),
        }
    }
}

impl Rules {
    /// Scale a nominal scan range.
    #[must_use]
    pub fn max_scan(&self, value: f64) -> f64 {
        (value * self.scan_multiplier).trunc()
    }
}

const fn default_max_temperature() -> i32 {
    100
}
const fn default_heat_per_shot() -> i32 {
    20
}
const fn default_cooling_per_tick() -> i32 {
    5
}
const fn default_energy_per_shot() -> i32 {
    5
}
const fn default_energy_per_pulse() -> i32 {
    10
}
const fn default_gravscan_max_range() -> f64 {
    500.0
}
const fn default_gravscan_min_range() -> f64 {
    50.0
}
const fn default_cloak_energy() -> i32 {
    10
}

/// Definition of one component in a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentSpec {
    /// Quadrant shields at the given nominal strengths.
    Shields {
        /// Component name.
        name: String,
        /// Nominal strength per quadrant.
        strengths: QuadrantValues,
    },
    /// Beam weapon.
    Laser {
        /// Component name.
        name: String,
        /// Point-blank damage.
        strength: i32,
        /// Optional `(start, end)` firing arc.
        #[serde(default)]
        firing_arc: Option<(f64, f64)>,
        /// Highest temperature at which it fires.
        #[serde(default = "default_max_temperature")]
        max_temperature: i32,
        /// Heat per shot.
        #[serde(default = "default_heat_per_shot")]
        heat_per_shot: i32,
        /// Cooling per tick.
        #[serde(default = "default_cooling_per_tick")]
        cooling_per_tick: i32,
        /// Energy per shot.
        #[serde(default = "default_energy_per_shot")]
        energy_per_shot: i32,
    },
    /// Missile or mine launcher.
    Launcher {
        /// Component name.
        name: String,
        /// Payload class name.
        payload: String,
        /// Magazine size.
        initial_load: u32,
        /// Optional `(start, end)` firing arc.
        #[serde(default)]
        firing_arc: Option<(f64, f64)>,
    },
    /// Directional scanner.
    Gravscan {
        /// Component name.
        name: String,
        /// Energy per pulse.
        #[serde(default = "default_energy_per_pulse")]
        energy_per_pulse: i32,
        /// Nominal range of the narrowest cone (scaled by the scan multiplier).
        #[serde(default = "default_gravscan_max_range")]
        max_range: f64,
        /// Nominal range of the full circle (scaled by the scan multiplier).
        #[serde(default = "default_gravscan_min_range")]
        min_range: f64,
    },
    /// Cloaking device.
    Cloak {
        /// Component name.
        name: String,
        /// Fraction of scan range removed.
        strength: f64,
        /// Energy per active tick.
        #[serde(default = "default_cloak_energy")]
        energy_per_tick: i32,
    },
    /// Projectile charge.
    Warhead {
        /// Component name.
        name: String,
        /// Kind of damage.
        damage_type: DamageType,
        /// Damage at the centre.
        damage: i32,
        /// Trigger and blast radius.
        range: f64,
        /// Distance falloff.
        falloff: Falloff,
    },
}

impl ComponentSpec {
    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Shields { name, .. }
            | Self::Laser { name, .. }
            | Self::Launcher { name, .. }
            | Self::Gravscan { name, .. }
            | Self::Cloak { name, .. }
            | Self::Warhead { name, .. } => name,
        }
    }

    /// Build a fresh, detached component.
    #[must_use]
    pub fn build(&self, rules: &Rules) -> Component {
        let arc = |a: &Option<(f64, f64)>| a.map(|(start, end)| Arc::new(start, end));
        let kind = match self {
            Self::Shields { strengths, .. } => ComponentKind::Shields(Shields::new(*strengths)),
            Self::Laser {
                strength,
                firing_arc,
                max_temperature,
                heat_per_shot,
                cooling_per_tick,
                energy_per_shot,
                ..
            } => ComponentKind::Laser(Laser {
                strength: *strength,
                firing_arc: arc(firing_arc),
                temperature: 0,
                max_temperature: *max_temperature,
                heat_per_shot: *heat_per_shot,
                cooling_per_tick: *cooling_per_tick,
                energy_per_shot: *energy_per_shot,
            }),
            Self::Launcher {
                payload,
                initial_load,
                firing_arc,
                ..
            } => ComponentKind::Launcher(Launcher::new(payload.clone(), *initial_load, arc(firing_arc))),
            Self::Gravscan {
                energy_per_pulse,
                max_range,
                min_range,
                ..
            } => ComponentKind::Gravscan(Gravscan {
                energy_per_pulse: *energy_per_pulse,
                max_range: rules.max_scan(*max_range),
                min_range: rules.max_scan(*min_range),
            }),
            Self::Cloak {
                strength,
                energy_per_tick,
                ..
            } => ComponentKind::Cloak(Cloak {
                strength: *strength,
                active: false,
                energy_per_tick: *energy_per_tick,
            }),
            Self::Warhead {
                damage_type,
                damage,
                range,
                falloff,
                ..
            } => ComponentKind::Warhead(Warhead {
                damage_type: *damage_type,
                damage: *damage,
                range: *range,
                falloff: *falloff,
            }),
        };
        Component::new(self.name(), kind)
    }
}

const fn default_max_battery() -> i32 {
    500
}

/// A player ship (or starbase) class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipClass {
    /// Type designation used in rosters, e.g. `H2545`.
    pub name: String,
    /// Descriptive class name, e.g. `Cairo`.
    #[serde(default)]
    pub class_name: Option<String>,
    /// Top speed.
    pub max_speed: i32,
    /// Largest turn per tick while moving.
    pub max_turn: i32,
    /// Largest speed change per tick.
    pub max_delta_v: i32,
    /// Hull points when new.
    pub max_hull: i32,
    /// Battery charge when new.
    pub start_battery: i32,
    /// Battery capacity.
    #[serde(default = "default_max_battery")]
    pub max_battery: i32,
    /// Energy generated per tick.
    pub generators: i32,
    /// Nominal scan range (scaled by the scan multiplier).
    pub scan_range: f64,
    /// Present on starbases.
    #[serde(default)]
    pub replenish: Option<ReplenishStats>,
    /// Shields, outermost first.
    #[serde(default)]
    pub defense: Vec<ComponentSpec>,
    /// Weapons.
    #[serde(default)]
    pub weapons: Vec<ComponentSpec>,
    /// Countermeasures.
    #[serde(default)]
    pub ecm: Vec<ComponentSpec>,
}

impl ShipClass {
    /// Type and class name, e.g. `H2545 Cairo`.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.class_name {
            Some(class_name) => format!("{} {}", self.name, class_name),
            None => self.name.clone(),
        }
    }

    /// Whether ships of this class can replenish others.
    #[must_use]
    pub fn is_starbase(&self) -> bool {
        self.replenish.is_some()
    }

    fn all_components(&self) -> impl Iterator<Item = &ComponentSpec> {
        self.defense.iter().chain(&self.weapons).chain(&self.ecm)
    }
}

const fn default_payload_hull() -> i32 {
    1
}
const fn default_missile_turn() -> f64 {
    45.0
}
const fn default_energy_per_move() -> i32 {
    5
}
const fn default_slow_down_rate() -> i32 {
    5
}
const fn default_mine_energy() -> i32 {
    1
}

/// How a payload moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Self-propelled projectile, launched at its top speed.
    Missile {
        /// Launch and cruise speed.
        max_speed: i32,
        /// Largest course correction per tick.
        #[serde(default = "default_missile_turn")]
        max_turn: f64,
        /// Whether it locks on to targets.
        #[serde(default)]
        guided: bool,
        /// Half-width of the target acquisition cone.
        #[serde(default)]
        scan_cone: f64,
        /// Battery drawn per tick.
        #[serde(default = "default_energy_per_move")]
        energy_per_move: i32,
    },
    /// Drifting charge that slows to a stop.
    Mine {
        /// Speed lost per tick.
        #[serde(default = "default_slow_down_rate")]
        slow_down_rate: i32,
        /// Battery drawn per tick.
        #[serde(default = "default_mine_energy")]
        energy_per_tick: i32,
    },
}

/// A missile or mine class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadClass {
    /// Class name, used by launchers.
    pub name: String,
    /// Movement behavior.
    pub kind: PayloadKind,
    /// Hull points.
    #[serde(default = "default_payload_hull")]
    pub max_hull: i32,
    /// Battery charge at launch.
    pub start_battery: i32,
    /// Battery capacity.
    pub max_battery: i32,
    /// Scan range, unscaled. Defaults to the first warhead's range.
    #[serde(default)]
    pub scan_range: Option<f64>,
    /// Charges; all of them check for detonation every tick.
    pub warheads: Vec<ComponentSpec>,
}

impl PayloadClass {
    /// Range at which this payload detects things.
    #[must_use]
    pub fn max_scan_distance(&self) -> f64 {
        self.scan_range.unwrap_or_else(|| {
            self.warheads
                .iter()
                .find_map(|w| match w {
                    ComponentSpec::Warhead { range, .. } => Some(*range),
                    _ => None,
                })
                .unwrap_or(0.0)
        })
    }
}

/// Every ship and payload class known to a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Scoring and scaling constants.
    #[serde(default)]
    pub rules: Rules,
    /// Ship classes.
    pub ships: Vec<ShipClass>,
    /// Payload classes.
    #[serde(default)]
    pub payloads: Vec<PayloadClass>,
}

impl Catalog {
    /// The catalog embedded in the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str(BUILTIN_CATALOG, "built-in catalog")
    }

    /// Parse and validate a catalog. `source_name` is used in error messages.
    pub fn from_ron_str(source: &str, source_name: &str) -> Result<Self> {
        let catalog: Self = ron::from_str(source).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        catalog.validate()?;
        tracing::debug!(
            source = source_name,
            ships = catalog.ships.len(),
            payloads = catalog.payloads.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Ship class by type designation.
    pub fn ship_class(&self, name: &str) -> Result<&ShipClass> {
        self.ships
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| GameError::UnknownShipClass(name.to_string()))
    }

    /// Payload class by name.
    pub fn payload(&self, name: &str) -> Result<&PayloadClass> {
        self.payloads
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| GameError::UnknownPayloadClass(name.to_string()))
    }

    /// Check references and uniqueness, collecting every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        let mut names = BTreeSet::new();
        for ship in &self.ships {
            if !names.insert(ship.name.as_str()) {
                problems.push(format!("duplicate ship class {}", ship.name));
            }
        }
        let mut payload_names = BTreeSet::new();
        for payload in &self.payloads {
            if !payload_names.insert(payload.name.as_str()) {
                problems.push(format!("duplicate payload class {}", payload.name));
            }
        }

        for ship in &self.ships {
            let mut component_names = BTreeSet::new();
            for spec in ship.all_components() {
                if !component_names.insert(spec.name()) {
                    problems.push(format!("{}: duplicate component {}", ship.name, spec.name()));
                }
                match spec {
                    ComponentSpec::Launcher { payload, .. } if !payload_names.contains(payload.as_str()) => {
                        problems.push(format!(
                            "{}: launcher {} uses unknown payload {}",
                            ship.name,
                            spec.name(),
                            payload
                        ));
                    }
                    ComponentSpec::Warhead { .. } => {
                        problems.push(format!("{}: warhead {} on a ship", ship.name, spec.name()));
                    }
                    _ => {}
                }
            }
            if ship.defense.iter().any(|d| !matches!(d, ComponentSpec::Shields { .. })) {
                problems.push(format!("{}: only shields belong in defense", ship.name));
            }
        }

        for payload in &self.payloads {
            if payload.warheads.is_empty() {
                problems.push(format!("{}: payload without warhead", payload.name));
            }
            if payload
                .warheads
                .iter()
                .any(|w| !matches!(w, ComponentSpec::Warhead { .. }))
            {
                problems.push(format!("{}: payloads may only carry warheads", payload.name));
            }
        }

        if self.rules.scan_multiplier <= 0.0 {
            problems.push("scan multiplier must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidCatalog(problems))
        }
    }
}
