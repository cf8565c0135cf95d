//! Objects in space.
//!
//! Every ship, starbase, missile and mine is an [`Entity`]: a hull with a
//! battery and three component collections. What differs between them lives
//! in [`EntityKind`]. Entities refer to each other only by [`EntityId`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::command::CommandSet;
use crate::components::{Component, ComponentKind, Shields, Warhead};
use crate::data::{ComponentSpec, PayloadClass, PayloadKind, Rules, ShipClass};
use crate::events::{Event, ScanEvent};
use crate::factions::FactionId;
use crate::history::{History, Snapshot};
use crate::math::{round1, Point, Vector};
use crate::tick::Tick;

/// Unique identifier of an entity within a game.
pub type EntityId = u64;

/// Default visibility of everything in space.
pub const DEFAULT_VISIBILITY: u8 = 100;

/// Anything that takes orders from a command file.
pub trait Commandable {
    /// Commands for one tick of the current round.
    fn command_set(&self, tick: u8) -> Option<&CommandSet>;

    /// Install the parsed commands for the round.
    fn set_commands(&mut self, sets: BTreeMap<u8, CommandSet>);

    /// Forget the current round's commands.
    fn clear_commands(&mut self);

    /// Whether commands are installed for the current round.
    fn has_commands(&self) -> bool;
}

/// Anything that can restore other ships.
pub trait Replenisher {
    /// Whether a ship at `distance` moving at `speed` may replenish here.
    fn can_replenish(&self, distance: f64, speed: i32) -> bool;
}

/// State shared by player ships and starbases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipState {
    /// Controlling player.
    pub player: String,
    /// Energy generated per tick.
    pub generators: i32,
    /// Top speed.
    pub max_speed: i32,
    /// Largest turn per tick while moving.
    pub max_turn: i32,
    /// Largest speed change per tick.
    pub max_delta_v: i32,
    /// Points earned so far.
    pub score: i32,
    /// Commands of the current round, by tick.
    pub commands: Option<BTreeMap<u8, CommandSet>>,
    /// Starbase in reach this tick, if any.
    pub replenish_from: Option<EntityId>,
}

impl Commandable for ShipState {
    fn command_set(&self, tick: u8) -> Option<&CommandSet> {
        self.commands.as_ref().and_then(|sets| sets.get(&tick))
    }

    fn set_commands(&mut self, sets: BTreeMap<u8, CommandSet>) {
        self.commands = Some(sets);
    }

    fn clear_commands(&mut self) {
        self.commands = None;
    }

    fn has_commands(&self) -> bool {
        self.commands.is_some()
    }
}

/// Replenish limits of a starbase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplenishStats {
    /// Largest distance at which a ship can dock.
    pub max_replenish_distance: f64,
    /// Largest speed at which a ship can dock.
    pub max_replenish_speed: i32,
}

impl Replenisher for ReplenishStats {
    fn can_replenish(&self, distance: f64, speed: i32) -> bool {
        distance <= self.max_replenish_distance && speed.abs() <= self.max_replenish_speed
    }
}

/// Missile flight state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissileState {
    /// Whether it homes in on targets.
    pub guided: bool,
    /// Half-width of the acquisition cone.
    pub scan_cone: f64,
    /// Largest course correction per tick.
    pub max_turn: f64,
    /// Cruise speed.
    pub max_speed: i32,
    /// Battery drawn per tick.
    pub energy_per_move: i32,
    /// Current target.
    pub target: Option<EntityId>,
    /// Name of the current target, for reports.
    pub target_name: Option<String>,
}

/// Mine drift state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MineState {
    /// Speed lost per tick.
    pub slow_down_rate: i32,
    /// Battery drawn per tick.
    pub energy_per_tick: i32,
}

/// What kind of object an entity is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Player ship.
    Ship(ShipState),
    /// Immobile player-controlled base.
    Starbase(ShipState, ReplenishStats),
    /// Launched missile.
    Missile(MissileState),
    /// Dropped mine.
    Mine(MineState),
}

/// A ship, starbase, missile or mine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id, assigned by [`EntityStorage::insert`].
    pub id: EntityId,
    /// Unique name.
    pub name: String,
    /// Ship or payload class.
    pub class: String,
    /// Position, heading and speed.
    pub vector: Vector,
    /// Ship credited with this entity's hits; ships own themselves.
    pub owner: EntityId,
    /// Faction of the owner.
    pub faction: FactionId,
    /// 0 (invisible) to 100. Reported to players; scanning uses ECM instead.
    pub visibility: u8,
    /// Hull points.
    pub hull: i32,
    /// Battery charge.
    pub battery: i32,
    /// Hull when new.
    pub max_hull: i32,
    /// Battery capacity.
    pub max_battery: i32,
    /// Passive detection range.
    pub max_scan_distance: f64,
    /// Shields.
    pub defense: Vec<Component>,
    /// Weapons by name. Projectiles keep their warheads here.
    pub weapons: BTreeMap<String, Component>,
    /// Countermeasures by name.
    pub ecm: BTreeMap<String, Component>,
    /// Kind-specific state.
    pub kind: EntityKind,
    /// What happened to this entity, tick by tick.
    pub history: History,
}

fn build_components(specs: &[ComponentSpec], rules: &Rules) -> BTreeMap<String, Component> {
    specs
        .iter()
        .map(|spec| (spec.name().to_string(), spec.build(rules)))
        .collect()
}

impl Entity {
    /// A new ship of `class`, at rest with heading 0.
    #[must_use]
    pub fn new_ship(
        name: impl Into<String>,
        class: &ShipClass,
        rules: &Rules,
        faction: FactionId,
        player: impl Into<String>,
        pos: Point,
        tick: Tick,
    ) -> Self {
        let state = ShipState {
            player: player.into(),
            generators: class.generators,
            max_speed: class.max_speed,
            max_turn: class.max_turn,
            max_delta_v: class.max_delta_v,
            score: 0,
            commands: None,
            replenish_from: None,
        };
        let kind = match class.replenish {
            Some(stats) => EntityKind::Starbase(state, stats),
            None => EntityKind::Ship(state),
        };
        let mut entity = Self {
            id: 0,
            name: name.into(),
            class: class.name.clone(),
            vector: Vector::new(pos, 0.0, 0),
            owner: 0,
            faction,
            visibility: DEFAULT_VISIBILITY,
            hull: class.max_hull,
            battery: class.start_battery.min(class.max_battery),
            max_hull: class.max_hull,
            max_battery: class.max_battery,
            max_scan_distance: rules.max_scan(class.scan_range),
            defense: class.defense.iter().map(|spec| spec.build(rules)).collect(),
            weapons: build_components(&class.weapons, rules),
            ecm: build_components(&class.ecm, rules),
            kind,
            history: History::new(tick, Snapshot::default()),
        };
        entity.refresh_snapshot();
        entity
    }

    /// A freshly launched missile or mine.
    #[must_use]
    pub fn new_payload(
        name: impl Into<String>,
        class: &PayloadClass,
        rules: &Rules,
        owner: EntityId,
        faction: FactionId,
        vector: Vector,
        tick: Tick,
    ) -> Self {
        let (kind, speed) = match class.kind {
            PayloadKind::Missile {
                max_speed,
                max_turn,
                guided,
                scan_cone,
                energy_per_move,
            } => (
                EntityKind::Missile(MissileState {
                    guided,
                    scan_cone,
                    max_turn,
                    max_speed,
                    energy_per_move,
                    target: None,
                    target_name: None,
                }),
                max_speed,
            ),
            PayloadKind::Mine {
                slow_down_rate,
                energy_per_tick,
            } => (
                EntityKind::Mine(MineState {
                    slow_down_rate,
                    energy_per_tick,
                }),
                (vector.speed - slow_down_rate).max(0),
            ),
        };
        let mut entity = Self {
            id: 0,
            name: name.into(),
            class: class.name.clone(),
            vector: vector.with_speed(speed),
            owner,
            faction,
            visibility: DEFAULT_VISIBILITY,
            hull: class.max_hull,
            battery: class.start_battery,
            max_hull: class.max_hull,
            max_battery: class.max_battery,
            max_scan_distance: class.max_scan_distance(),
            defense: Vec::new(),
            weapons: build_components(&class.warheads, rules),
            ecm: BTreeMap::new(),
            kind,
            history: History::new(tick, Snapshot::default()),
        };
        entity.refresh_snapshot();
        entity
    }

    /// Hull gone, or (for projectiles) battery empty.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        match self.kind {
            EntityKind::Ship(_) | EntityKind::Starbase(..) => self.hull <= 0,
            EntityKind::Missile(_) | EntityKind::Mine(_) => self.hull <= 0 || self.battery <= 0,
        }
    }

    /// Whether this is a player ship or starbase.
    #[must_use]
    pub fn is_commandable(&self) -> bool {
        self.ship_state().is_some()
    }

    /// Whether this is a starbase.
    #[must_use]
    pub fn is_starbase(&self) -> bool {
        matches!(self.kind, EntityKind::Starbase(..))
    }

    /// Whether this is a missile or mine.
    #[must_use]
    pub fn is_projectile(&self) -> bool {
        matches!(self.kind, EntityKind::Missile(_) | EntityKind::Mine(_))
    }

    /// Ship state of ships and starbases.
    #[must_use]
    pub fn ship_state(&self) -> Option<&ShipState> {
        match &self.kind {
            EntityKind::Ship(state) | EntityKind::Starbase(state, _) => Some(state),
            _ => None,
        }
    }

    /// Mutable ship state of ships and starbases.
    pub fn ship_state_mut(&mut self) -> Option<&mut ShipState> {
        match &mut self.kind {
            EntityKind::Ship(state) | EntityKind::Starbase(state, _) => Some(state),
            _ => None,
        }
    }

    /// Command interface, if this entity takes orders.
    #[must_use]
    pub fn commandable(&self) -> Option<&dyn Commandable> {
        self.ship_state().map(|s| s as &dyn Commandable)
    }

    /// Mutable command interface, if this entity takes orders.
    pub fn commandable_mut(&mut self) -> Option<&mut dyn Commandable> {
        self.ship_state_mut().map(|s| s as &mut dyn Commandable)
    }

    /// Replenish interface, if this is a starbase.
    #[must_use]
    pub fn replenisher(&self) -> Option<&dyn Replenisher> {
        match &self.kind {
            EntityKind::Starbase(_, stats) => Some(stats as &dyn Replenisher),
            _ => None,
        }
    }

    /// Score of a ship, 0 for anything else.
    #[must_use]
    pub fn score(&self) -> i32 {
        self.ship_state().map_or(0, |s| s.score)
    }

    /// Every component, shields first.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.defense
            .iter()
            .chain(self.weapons.values())
            .chain(self.ecm.values())
    }

    /// Every component, mutably.
    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.defense
            .iter_mut()
            .chain(self.weapons.values_mut())
            .chain(self.ecm.values_mut())
    }

    /// Component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components().find(|c| c.name == name)
    }

    /// Outermost shields.
    pub fn shields_mut(&mut self) -> Option<&mut Shields> {
        self.defense.iter_mut().find_map(Component::as_shields_mut)
    }

    /// Outermost shields.
    #[must_use]
    pub fn shields(&self) -> Option<&Shields> {
        self.defense.iter().find_map(Component::as_shields)
    }

    /// Warheads carried by a missile or mine.
    pub fn warheads(&self) -> impl Iterator<Item = (&str, &Warhead)> {
        self.weapons
            .values()
            .filter_map(|c| c.as_warhead().map(|w| (c.name.as_str(), w)))
    }

    /// Point every component at this entity.
    pub fn attach_components(&mut self) {
        let id = self.id;
        for component in self.components_mut() {
            component.attach(id);
        }
    }

    /// Append an event to the current tick.
    pub fn record(&mut self, event: Event) {
        self.history.add_event(event);
    }

    /// Append a message to the current tick.
    pub fn note(&mut self, message: impl Into<String>) {
        self.record(Event::internal(message));
    }

    /// Current state for reports.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let target = match &self.kind {
            EntityKind::Missile(m) => m.target_name.clone(),
            _ => None,
        };
        Snapshot {
            name: self.name.clone(),
            pos: self.vector.pos,
            heading: self.vector.heading,
            speed: self.vector.speed,
            hull: self.hull,
            battery: self.battery,
            visibility: self.visibility,
            score: self.score(),
            components: self
                .components()
                .map(|c| (c.name.clone(), c.status()))
                .collect(),
            target,
        }
    }

    /// Overwrite the current tick's snapshot with the present state.
    pub fn refresh_snapshot(&mut self) {
        let snapshot = self.snapshot();
        self.history.update(snapshot);
    }

    /// Close the current tick and open `tick`.
    pub fn open_tick(&mut self, tick: Tick) {
        let snapshot = self.snapshot();
        self.history.set_tick(tick, snapshot);
    }

    /// Per-component start-of-tick work.
    pub fn tick_components(&mut self) {
        for component in self.components_mut() {
            component.tick();
        }
    }

    /// Ships charge their battery from their generators.
    pub fn generate(&mut self) {
        if let Some(generators) = self.ship_state().map(|s| s.generators) {
            if self.battery < self.max_battery {
                self.battery = (self.battery + generators).min(self.max_battery);
            }
        }
    }

    /// Component upkeep, then slow down if the battery cannot pay for the
    /// current speed.
    pub fn use_energy(&mut self) {
        let mut notes = Vec::new();
        for component in self
            .defense
            .iter_mut()
            .chain(self.weapons.values_mut())
            .chain(self.ecm.values_mut())
        {
            notes.extend(component.use_energy(&mut self.battery));
        }
        if self.is_commandable() {
            let speed = self.vector.speed;
            if self.battery < movement_cost(speed) {
                let limited = self.battery * 10 * speed.signum();
                self.vector = self.vector.with_speed(limited);
                notes.push(format!("Not enough energy for speed {speed}, slowed to {limited}."));
            }
        }
        for note in notes {
            self.note(note);
        }
    }

    /// Change speed, within this ship's limits.
    pub fn accelerate(&mut self, delta_v: i32) {
        let Some((max_delta_v, max_speed)) = self.ship_state().map(|s| (s.max_delta_v, s.max_speed))
        else {
            return;
        };
        if self.is_starbase() {
            self.note("Starbases can not accelerate.");
            return;
        }
        let mut notes = Vec::new();
        let mut delta_v = delta_v;
        if delta_v.unsigned_abs() > max_delta_v.unsigned_abs() {
            delta_v = max_delta_v * delta_v.signum();
            notes.push(format!("Acceleration limited to {delta_v}."));
        }
        let old = self.vector.speed;
        let wanted = old + delta_v;
        let speed = wanted.clamp(-max_speed, max_speed);
        if speed != wanted {
            notes.push(format!("Speed limited to {speed}."));
        }
        self.vector = self.vector.with_speed(speed);
        notes.push(format!("Speed changed from {old} to {speed}."));
        for note in notes {
            self.note(note);
        }
    }

    /// Turn by `angle` degrees. A moving ship turns at most `max_turn`.
    pub fn turn(&mut self, angle: f64) {
        let Some(max_turn) = self.ship_state().map(|s| f64::from(s.max_turn)) else {
            return;
        };
        if self.is_starbase() {
            self.note("Starbases can not turn.");
            return;
        }
        let mut angle = angle;
        if self.vector.speed != 0 && angle.abs() > max_turn {
            angle = max_turn.copysign(angle);
            self.note(format!("Turn limited to {angle}."));
        }
        self.vector = self.vector.turned(angle);
        let heading = self.vector.heading_f64();
        self.note(format!("Turned {angle}, heading now {}.", round1(heading)));
    }

    /// Advance one tick. Starbases stay put.
    pub fn move_forward(&mut self) {
        if !self.is_starbase() {
            self.vector = self.vector.moved();
        }
    }

    /// Pay for the distance just travelled.
    pub fn drain_movement_energy(&mut self) {
        if self.is_commandable() {
            let cost = movement_cost(self.vector.speed);
            if cost > 0 {
                self.battery = (self.battery - cost).max(0);
                self.note(format!("Used {cost} energy for movement."));
            }
        }
    }

    /// Scan range an observer has left against this entity.
    #[must_use]
    pub fn modify_scan_range(&self, range: f64) -> f64 {
        round1(self.ecm.values().fold(range, |r, c| c.modify_scan_range(r)))
    }

    /// Whether this entity detects `target` with its passive sensors.
    #[must_use]
    pub fn can_scan(&self, target: &Self) -> bool {
        target.id != self.id
            && self.vector.pos.distance_to(target.vector.pos)
                < target.modify_scan_range(self.max_scan_distance)
    }

    /// What this entity sees of `target`.
    #[must_use]
    pub fn scan_event(&self, target: &Self) -> ScanEvent {
        let pos = target.vector.pos;
        ScanEvent {
            name: target.name.clone(),
            pos,
            distance: self.vector.pos.distance_to(pos),
            direction: self.vector.direction_to(pos),
            heading: self.vector.pos.heading_to(pos),
            target_heading: target.vector.heading,
            speed: target.vector.speed,
        }
    }

    /// Start a round: restart the history at `tick`, drop old commands and
    /// vent per-round component state.
    pub fn round_reset(&mut self, tick: Tick) {
        let snapshot = self.snapshot();
        self.history.reset(tick, snapshot);
        if let Some(commandable) = self.commandable_mut() {
            commandable.clear_commands();
        }
        if let Some(ship) = self.ship_state_mut() {
            ship.replenish_from = None;
        }
        for component in self.components_mut() {
            component.round_reset();
        }
    }

    /// End a round: let per-round effects wear off.
    pub fn post_round_reset(&mut self) {
        let notes: Vec<String> = self
            .components_mut()
            .flat_map(Component::post_round_reset)
            .collect();
        for note in notes {
            self.note(note);
        }
    }

    /// Restore hull, battery and every weapon.
    pub fn replenish(&mut self) {
        self.hull = self.max_hull;
        self.battery = self.max_battery;
        for weapon in self.weapons.values_mut() {
            weapon.reset();
        }
    }

    /// Every component points back at this entity.
    #[must_use]
    pub fn components_attached(&self) -> bool {
        self.components()
            .all(|c| c.container().map_or(false, |id| id == self.id))
    }

    /// Switchable component by name.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components_mut().find(|c| c.name == name)
    }

    /// Turn a cloak (or other switchable component) on or off.
    pub fn set_active(&mut self, name: &str, on: bool) {
        let mut battery = self.battery;
        let notes = match self.component_mut(name) {
            Some(Component {
                kind: ComponentKind::Cloak(cloak),
                ..
            }) => cloak.set_active(name, on, &mut battery),
            Some(_) => vec![format!("{name} can not be switched.")],
            None => vec![format!("No component named {name}.")],
        };
        self.battery = battery;
        for note in notes {
            self.note(note);
        }
    }
}

/// Battery drawn per tick to keep moving at `speed`.
#[must_use]
pub fn movement_cost(speed: i32) -> i32 {
    speed.abs() / 10
}

/// Live entities, keyed by id in creation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its id.
    ///
    /// Ships become their own owner and every component is attached.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        entity.id = id;
        if entity.is_commandable() {
            entity.owner = id;
        }
        entity.attach_components();
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by id.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids in creation order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Iterate in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }

    /// Iterate mutably in creation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&EntityId, &mut Entity)> {
        self.entities.iter_mut()
    }

    /// Entities in creation order.
    pub fn values(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Id of the entity called `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .values()
            .find(|e| e.name == name)
            .map(|e| e.id)
    }

    /// Names of every entity.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        self.entities.values().map(|e| e.name.clone()).collect()
    }
}
