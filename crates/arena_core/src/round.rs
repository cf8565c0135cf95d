//! The round engine.
//!
//! A round is ten ticks. Every tick runs the same phases in a fixed order
//! over all live entities, in id order:
//!
//! 1. **Open** - histories flush the previous tick and open this one;
//!    components tick (laser cooling).
//! 2. **Energy** - generators charge, components and speed draw.
//! 3. **Pre-move commands** - acceleration, turning, activations.
//! 4. **Move** - replenish eligibility, then every entity moves.
//! 5. **Post-move commands** - weapons fire (payloads spawn here), then
//!    replenish and shield boosts.
//! 6. **Scan** - passive scans; guided missiles pick targets, missiles
//!    check their warheads and steer.
//! 7. **Post-move hook** - movement energy, mine warheads, fizzling;
//!    snapshots are updated.
//! 8. **Sweep** - destroyed entities leave the live map.
//!
//! Each phase takes a fresh list of ids, so payloads launched in phase 5
//! take part in phases 6 to 8 of the same tick.

use std::collections::BTreeMap;

use crate::combat::resolve_hit;
use crate::command::{parse_commands, Action, Command};
use crate::components::ComponentKind;
use crate::data::Catalog;
use crate::entity::{Entity, EntityId, EntityKind, EntityStorage};
use crate::error::{GameError, Result};
use crate::events::{Event, ExplosionEvent, HitEvent};
use crate::math::Vector;
use crate::parameters::ParamValue;
use crate::tick::Tick;

/// Runs rounds over a set of live entities.
pub struct RoundEngine<'a> {
    catalog: &'a Catalog,
    live: &'a mut EntityStorage,
    graveyard: &'a mut BTreeMap<EntityId, Entity>,
    destroyed: BTreeMap<EntityId, Entity>,
    tick: Tick,
}

impl<'a> RoundEngine<'a> {
    /// Engine over `live`. Scores may still be credited to ships in `graveyard`.
    pub fn new(
        catalog: &'a Catalog,
        live: &'a mut EntityStorage,
        graveyard: &'a mut BTreeMap<EntityId, Entity>,
        tick: Tick,
    ) -> Self {
        Self {
            catalog,
            live,
            graveyard,
            destroyed: BTreeMap::new(),
            tick,
        }
    }

    /// Play all ten ticks of `round` and return the entities destroyed in it.
    ///
    /// `command_files` maps ship names to command file text; every
    /// commandable entity must have one.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingCommands`] before anything changes if a
    /// command file is missing, or [`GameError::Invariant`] on broken state.
    pub fn play(
        mut self,
        round: u32,
        command_files: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<EntityId, Entity>> {
        let missing = missing_commands(self.live, command_files);
        if !missing.is_empty() {
            return Err(GameError::MissingCommands {
                round,
                names: missing,
            });
        }

        tracing::info!(round, entities = self.live.len(), "Starting round");
        self.round_reset(round, command_files);
        for tick in Tick::ticks_for_round(round) {
            self.run_tick(tick)?;
        }
        self.post_round_reset();
        tracing::info!(round, destroyed = self.destroyed.len(), "Finished round");
        Ok(self.destroyed)
    }

    /// Prepare every entity for `round` and install its commands.
    pub fn round_reset(&mut self, round: u32, command_files: &BTreeMap<String, String>) {
        let start = Tick::round_start(round).prev();
        self.tick = start;
        for (_, entity) in self.live.iter_mut() {
            entity.round_reset(start);
        }

        let names = self.live.names();
        for id in self.live.sorted_ids() {
            let Some(entity) = self.live.get(id) else {
                continue;
            };
            if !entity.is_commandable() {
                continue;
            }
            let Some(text) = command_files.get(&entity.name) else {
                continue;
            };
            let parsed = parse_commands(text, entity, &names);
            let notes: Vec<String> = parsed
                .feedback()
                .into_iter()
                .filter(|line| !line.messages.is_empty())
                .map(|line| {
                    format!(
                        "Line {} \"{}\": {}",
                        line.line,
                        line.text,
                        line.messages.join(" ")
                    )
                })
                .collect();
            if let Some(entity) = self.live.get_mut(id) {
                for note in notes {
                    entity.note(note);
                }
                if let Some(commandable) = entity.commandable_mut() {
                    commandable.set_commands(parsed.sets);
                }
            }
        }
    }

    /// Run one tick through every phase.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Invariant`] on broken state.
    pub fn run_tick(&mut self, tick: Tick) -> Result<()> {
        self.tick = tick;

        // 1. Open
        for id in self.live.sorted_ids() {
            if let Some(entity) = self.live.get_mut(id) {
                entity.open_tick(tick);
                entity.tick_components();
            }
        }

        // 2. Energy
        for id in self.live.sorted_ids() {
            if let Some(entity) = self.live.get_mut(id) {
                entity.generate();
                entity.use_energy();
            }
        }

        // 3. Pre-move commands
        for id in self.live.sorted_ids() {
            self.run_pre_move_commands(id);
        }

        // 4. Move
        for id in self.live.sorted_ids() {
            self.check_replenish_eligibility(id);
        }
        for id in self.live.sorted_ids() {
            if let Some(entity) = self.live.get_mut(id) {
                entity.move_forward();
            }
        }

        // 5. Post-move commands
        for id in self.live.sorted_ids() {
            self.run_post_move_commands(id)?;
        }

        // 6. Scan and decide
        self.scan_all();
        for id in self.live.sorted_ids() {
            self.decide(id)?;
        }

        // 7. Post-move hook
        for id in self.live.sorted_ids() {
            self.post_move(id)?;
        }
        for (_, entity) in self.live.iter_mut() {
            entity.refresh_snapshot();
        }

        // 8. Sweep
        self.sweep();

        #[cfg(feature = "debug-validation")]
        self.validate()?;

        #[cfg(debug_assertions)]
        {
            let state_hash = crate::game::hash_state(&*self.live);
            tracing::debug!(%tick, state_hash, "Tick state hash");
        }

        Ok(())
    }

    /// Let per-round effects wear off and record the final state.
    pub fn post_round_reset(&mut self) {
        for (_, entity) in self.live.iter_mut() {
            entity.post_round_reset();
            entity.refresh_snapshot();
        }
    }

    /// Every entity records what it passively detects; guided missiles
    /// pick their targets.
    pub fn scan_all(&mut self) {
        let ids = self.live.sorted_ids();
        let mut scans: Vec<(EntityId, Event)> = Vec::new();
        let mut targets: Vec<(EntityId, Option<(EntityId, String)>)> = Vec::new();

        for &id in &ids {
            let Some(observer) = self.live.get(id) else {
                continue;
            };
            for target in self.live.values() {
                if observer.can_scan(target) {
                    scans.push((id, Event::Scan(observer.scan_event(target))));
                }
            }
            if let EntityKind::Missile(missile) = &observer.kind {
                if missile.guided {
                    targets.push((id, self.acquire_target(observer, missile.scan_cone)));
                }
            }
        }

        for (id, event) in scans {
            if let Some(entity) = self.live.get_mut(id) {
                entity.record(event);
            }
        }
        for (id, target) in targets {
            if let Some(Entity {
                kind: EntityKind::Missile(missile),
                ..
            }) = self.live.get_mut(id)
            {
                missile.target_name = target.as_ref().map(|(_, name)| name.clone());
                missile.target = target.map(|(target_id, _)| target_id);
            }
        }
    }

    /// Nearest enemy-faction entity the missile can scan inside its cone.
    fn acquire_target(&self, missile: &Entity, scan_cone: f64) -> Option<(EntityId, String)> {
        let mut best: Option<(f64, &Entity)> = None;
        for candidate in self.live.values() {
            if candidate.id == missile.id
                || candidate.faction == missile.faction
                || !missile.can_scan(candidate)
                || missile.vector.direction_to(candidate.vector.pos).abs() > scan_cone
            {
                continue;
            }
            let distance = missile.vector.pos.distance_to(candidate.vector.pos);
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, candidate));
            }
        }
        best.map(|(_, e)| (e.id, e.name.clone()))
    }

    fn command_set(&self, id: EntityId) -> Option<crate::command::CommandSet> {
        let entity = self.live.get(id)?;
        entity
            .commandable()?
            .command_set(self.tick.tick)
            .cloned()
    }

    fn run_pre_move_commands(&mut self, id: EntityId) {
        let Some(set) = self.command_set(id) else {
            return;
        };
        let Some(entity) = self.live.get_mut(id) else {
            return;
        };
        for cmd in &set.movement {
            note_executing(entity, cmd);
        }
        if let Some(delta_v) = set.acceleration {
            entity.accelerate(delta_v);
        }
        if let Some(turning) = set.turning {
            let angle = turning.resolve(entity.vector.heading_f64());
            entity.turn(angle);
        }
        for cmd in &set.pre_move {
            note_executing(entity, cmd);
            if let Some(Action::Activation { component, on }) = &cmd.action {
                entity.set_active(component, *on);
            }
        }
    }

    /// Remember the first starbase close enough to replenish from.
    fn check_replenish_eligibility(&mut self, id: EntityId) {
        let Some(ship) = self.live.get(id) else {
            return;
        };
        if !matches!(ship.kind, EntityKind::Ship(_)) {
            return;
        }
        let base = self.live.values().find(|base| {
            base.id != id
                && !base.is_destroyed()
                && base.replenisher().map_or(false, |r| {
                    r.can_replenish(
                        ship.vector.pos.distance_to(base.vector.pos),
                        ship.vector.speed,
                    )
                })
        });
        let base_id = base.map(|b| b.id);
        if let Some(state) = self.live.get_mut(id).and_then(Entity::ship_state_mut) {
            state.replenish_from = base_id;
        }
    }

    fn run_post_move_commands(&mut self, id: EntityId) -> Result<()> {
        let Some(set) = self.command_set(id) else {
            return Ok(());
        };
        for cmd in set.weapons.values() {
            if let Some(entity) = self.live.get_mut(id) {
                note_executing(entity, cmd);
            }
            if let Some(Action::Fire { weapon, params }) = &cmd.action {
                self.fire(id, weapon, params)?;
            }
        }
        for cmd in &set.post_move {
            if let Some(entity) = self.live.get_mut(id) {
                note_executing(entity, cmd);
            }
            match &cmd.action {
                Some(Action::Replenish) => self.replenish(id),
                Some(Action::Boost { quadrant, amount }) => {
                    let Some(entity) = self.live.get_mut(id) else {
                        continue;
                    };
                    let mut battery = entity.battery;
                    let notes = entity
                        .shields_mut()
                        .ok_or_else(|| {
                            GameError::invariant(format!("boost on {id} without shields"))
                        })?
                        .boost(*quadrant, *amount, &mut battery);
                    entity.battery = battery;
                    for note in notes {
                        entity.note(note);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn replenish(&mut self, id: EntityId) {
        let base_id = self
            .live
            .get(id)
            .and_then(Entity::ship_state)
            .and_then(|s| s.replenish_from);
        let base_name = base_id
            .and_then(|b| self.live.get(b))
            .map(|b| b.name.clone());
        let Some(entity) = self.live.get_mut(id) else {
            return;
        };
        let (Some(base_id), Some(base_name)) = (base_id, base_name) else {
            entity.note("Failed to replenish.");
            return;
        };
        entity.replenish();
        entity.note(format!("Replenished at {base_name}."));
        let ship_name = entity.name.clone();
        if let Some(base) = self.live.get_mut(base_id) {
            base.note(format!("Replenished {ship_name}."));
        }
    }

    fn fire(&mut self, id: EntityId, weapon: &str, params: &[ParamValue]) -> Result<()> {
        let kind = self
            .live
            .get(id)
            .and_then(|e| e.weapons.get(weapon))
            .map(|c| c.kind.clone())
            .ok_or_else(|| GameError::invariant(format!("fire order for unknown weapon {weapon}")))?;
        match (kind, params) {
            (ComponentKind::Laser(_), [ParamValue::Object(target)]) => self.fire_laser(id, weapon, target),
            (ComponentKind::Launcher(_), [ParamValue::Direction(direction)]) => {
                self.launch(id, weapon, *direction)
            }
            (ComponentKind::Gravscan(_), [ParamValue::Direction(direction), ParamValue::Number(cone)]) => {
                self.gravscan(id, weapon, *direction, *cone);
                Ok(())
            }
            (_, params) => Err(GameError::invariant(format!(
                "weapon {weapon} can not fire with {} parameters",
                params.len()
            ))),
        }
    }

    fn fire_laser(&mut self, id: EntityId, weapon: &str, target_name: &str) -> Result<()> {
        let target_id = self
            .live
            .find_by_name(target_name)
            .filter(|t| self.live.get(*t).map_or(false, |t| !t.is_destroyed()));
        let (Some(attacker), Some(target)) = (self.live.get(id), target_id.and_then(|t| self.live.get(t))) else {
            if let Some(attacker) = self.live.get_mut(id) {
                attacker.note(format!("{weapon}: target {target_name} not found."));
            }
            return Ok(());
        };
        let Some(ComponentKind::Laser(laser)) = attacker.weapons.get(weapon).map(|c| &c.kind) else {
            return Err(GameError::invariant(format!("{weapon} is not a laser")));
        };

        let direction = attacker.vector.direction_to(target.vector.pos);
        let distance = attacker.vector.pos.distance_to(target.vector.pos);
        let damage = laser.damage_at(distance);
        let mut notes = Vec::new();
        if !laser.in_firing_arc(direction) {
            notes.push(format!("{weapon}: {target_name} is outside the firing arc."));
        } else if damage == 0 && attacker.can_scan(target) {
            notes.push(format!("{weapon}: {target_name} is out of range."));
        }
        if !notes.is_empty() {
            if let Some(attacker) = self.live.get_mut(id) {
                notes.into_iter().for_each(|n| attacker.note(n));
            }
            return Ok(());
        }

        let mut ready = true;
        if !laser.temperature_ok() {
            notes.push(format!("{weapon} is too hot to fire."));
            ready = false;
        }
        if !laser.energy_ok(attacker.battery) {
            notes.push(format!("Not enough energy to fire {weapon}."));
            ready = false;
        }
        if !attacker.can_scan(target) {
            notes.push(format!("{weapon}: can not see {target_name}."));
            ready = false;
        }
        let hit = ready.then(|| HitEvent {
            pos: attacker.vector.pos,
            damage_type: crate::events::DamageType::Laser,
            source: id,
            source_name: attacker.name.clone(),
            owner: attacker.owner,
            target: target.id,
            target_name: target.name.clone(),
            amount: damage,
            score: 0,
            can_score: attacker.faction.can_score_against(&target.faction),
        });

        if let Some(attacker) = self.live.get_mut(id) {
            let mut battery = attacker.battery;
            if let Some(ComponentKind::Laser(laser)) = attacker.weapons.get_mut(weapon).map(|c| &mut c.kind) {
                laser.discharge(&mut battery);
            }
            attacker.battery = battery;
            notes.into_iter().for_each(|n| attacker.note(n));
        }
        if let Some(hit) = hit {
            self.apply_hit(hit, &[])?;
        }
        Ok(())
    }

    fn launch(&mut self, id: EntityId, weapon: &str, direction: i32) -> Result<()> {
        let tick = self.tick;
        let catalog = self.catalog;
        let attacker = self
            .live
            .get_mut(id)
            .ok_or_else(|| GameError::EntityNotFound(id.to_string()))?;
        let Some(ComponentKind::Launcher(launcher)) = attacker.weapons.get_mut(weapon).map(|c| &mut c.kind)
        else {
            return Err(GameError::invariant(format!("{weapon} is not a launcher")));
        };
        if !launcher.firing_arc.map_or(true, |arc| arc.contains(f64::from(direction))) {
            attacker.note(format!("{weapon}: direction {direction} is outside the firing arc."));
            return Ok(());
        }
        let payload = launcher.payload.clone();
        let Some(serial) = launcher.take_round() else {
            attacker.note(format!("{weapon} is out of ammunition."));
            return Ok(());
        };
        let class = catalog.payload(&payload)?;
        let name = format!("{}-{payload}-{weapon}-{serial}", attacker.name);
        let vector = Vector::new(
            attacker.vector.pos,
            attacker.vector.heading_f64() + f64::from(direction),
            attacker.vector.speed,
        );
        let projectile = Entity::new_payload(
            name.clone(),
            class,
            &catalog.rules,
            attacker.owner,
            attacker.faction.clone(),
            vector,
            tick,
        );
        attacker.note(format!("Launched {name} from {weapon}."));
        let new_id = self.live.insert(projectile);
        tracing::debug!(%tick, entity = %name, id = new_id, "Launched payload");
        Ok(())
    }

    fn gravscan(&mut self, id: EntityId, weapon: &str, direction: i32, cone: i32) {
        let Some(scanner) = self.live.get(id) else {
            return;
        };
        let Some(ComponentKind::Gravscan(gravscan)) = scanner.weapons.get(weapon).map(|c| &c.kind) else {
            return;
        };
        if scanner.battery < gravscan.energy_per_pulse {
            let energy = gravscan.energy_per_pulse;
            if let Some(scanner) = self.live.get_mut(id) {
                scanner.note(format!("Not enough energy for {weapon}: needs {energy}."));
            }
            return;
        }
        let energy = gravscan.energy_per_pulse;
        let reach = gravscan.scan_distance(cone);
        let arc = gravscan.arc(direction, cone);
        let pings: Vec<Event> = self
            .live
            .values()
            .filter(|target| target.id != id)
            .filter(|target| {
                arc.contains(scanner.vector.direction_to(target.vector.pos))
                    && scanner.vector.pos.distance_to(target.vector.pos)
                        <= target.modify_scan_range(reach)
            })
            .map(|target| Event::Scan(scanner.scan_event(target)))
            .collect();

        if let Some(scanner) = self.live.get_mut(id) {
            scanner.battery -= energy;
            scanner.note(format!(
                "{weapon} pulse {arc} to {reach}: {} contacts.",
                pings.len()
            ));
            for ping in pings {
                scanner.record(ping);
            }
        }
    }

    /// Missiles check their warheads and steer towards their target.
    fn decide(&mut self, id: EntityId) -> Result<()> {
        if !matches!(self.live.get(id).map(|e| &e.kind), Some(EntityKind::Missile(_))) {
            return Ok(());
        }
        self.check_warheads(id)?;
        let Some(missile) = self.live.get(id) else {
            return Ok(());
        };
        let EntityKind::Missile(state) = &missile.kind else {
            return Ok(());
        };
        if missile.is_destroyed() || !state.guided {
            return Ok(());
        }
        let Some(target) = state.target.and_then(|t| self.live.get(t)) else {
            return Ok(());
        };

        let predicted = target
            .vector
            .pos
            .translate(target.vector.heading_f64(), f64::from(target.vector.speed));
        let distance = missile.vector.pos.distance_to(predicted);
        let mut speed = missile.vector.speed;
        if distance < f64::from(speed) {
            speed = ((distance - 1.0).round() as i32).max(0);
        }
        let turn = missile
            .vector
            .direction_to(predicted)
            .clamp(-state.max_turn, state.max_turn);
        let vector = missile.vector.turned(turn).with_speed(speed);
        if let Some(missile) = self.live.get_mut(id) {
            missile.vector = vector;
        }
        Ok(())
    }

    fn post_move(&mut self, id: EntityId) -> Result<()> {
        let Some(kind) = self.live.get(id).map(|e| e.kind.clone()) else {
            return Ok(());
        };
        match kind {
            EntityKind::Ship(_) | EntityKind::Starbase(..) => {
                if let Some(entity) = self.live.get_mut(id) {
                    entity.drain_movement_energy();
                }
            }
            EntityKind::Missile(missile) => {
                if let Some(entity) = self.live.get_mut(id) {
                    entity.battery -= missile.energy_per_move;
                }
                self.check_fizzle(id);
            }
            EntityKind::Mine(mine) => {
                self.check_warheads(id)?;
                if let Some(entity) = self.live.get_mut(id) {
                    if !entity.is_destroyed() {
                        let speed = (entity.vector.speed - mine.slow_down_rate).max(0);
                        entity.vector = entity.vector.with_speed(speed);
                    }
                    entity.battery -= mine.energy_per_tick;
                }
                self.check_fizzle(id);
            }
        }
        Ok(())
    }

    /// Tell the owner when a projectile ran out of power.
    fn check_fizzle(&mut self, id: EntityId) {
        let Some(entity) = self.live.get(id) else {
            return;
        };
        if entity.hull > 0 && entity.battery <= 0 {
            let (owner, message) = (entity.owner, format!("{} fizzled out.", entity.name));
            if let Some(owner) = self.entity_mut(owner) {
                owner.note(message);
            }
        }
    }

    /// Detonate if anything with a different owner is in range of a warhead.
    fn check_warheads(&mut self, id: EntityId) -> Result<()> {
        let Some(container) = self.live.get(id) else {
            return Ok(());
        };
        if container.is_destroyed() {
            return Ok(());
        }
        let pos = container.vector.pos;
        let warheads: Vec<(String, crate::components::Warhead)> = container
            .warheads()
            .map(|(name, w)| (name.to_string(), w.clone()))
            .collect();
        let triggered = warheads.iter().any(|(_, w)| {
            self.live.values().any(|other| {
                other.id != id
                    && other.owner != container.owner
                    && !other.is_destroyed()
                    && w.in_range(pos.distance_to(other.vector.pos))
            })
        });
        if !triggered {
            return Ok(());
        }

        let (source_name, owner, faction) = (
            container.name.clone(),
            container.owner,
            container.faction.clone(),
        );
        tracing::debug!(tick = %self.tick, entity = %source_name, "Warhead detonated");
        if let Some(container) = self.live.get_mut(id) {
            container.hull = 0;
        }

        for (_, warhead) in warheads {
            let explosion = Event::Explosion(ExplosionEvent {
                pos,
                damage_type: warhead.damage_type,
                source_name: source_name.clone(),
                radius: warhead.range,
            });
            let observers: Vec<EntityId> = self
                .live
                .values()
                .filter(|o| o.vector.pos.distance_to(pos) <= o.max_scan_distance)
                .map(|o| o.id)
                .collect();
            for &observer in &observers {
                if let Some(o) = self.live.get_mut(observer) {
                    o.record(explosion.clone());
                }
            }

            let hits: Vec<HitEvent> = self
                .live
                .values()
                .filter(|target| target.id != id)
                .filter_map(|target| {
                    let distance = pos.distance_to(target.vector.pos);
                    if !warhead.in_range(distance) {
                        return None;
                    }
                    Some(HitEvent {
                        pos,
                        damage_type: warhead.damage_type,
                        source: id,
                        source_name: source_name.clone(),
                        owner,
                        target: target.id,
                        target_name: target.name.clone(),
                        amount: warhead.damage_at(distance),
                        score: 0,
                        can_score: faction.can_score_against(&target.faction),
                    })
                })
                .filter(|hit| hit.amount > 0)
                .collect();
            for hit in hits {
                self.apply_hit(hit, &observers)?;
            }
        }
        Ok(())
    }

    /// Resolve a hit, tell everyone involved and credit the owner.
    fn apply_hit(&mut self, mut hit: HitEvent, observers: &[EntityId]) -> Result<()> {
        let catalog = self.catalog;
        let Some(target) = self.live.get_mut(hit.target) else {
            return Ok(());
        };
        let outcome = resolve_hit(target, &mut hit, &catalog.rules)?;
        tracing::debug!(
            tick = %self.tick,
            source = %hit.source_name,
            target = %hit.target_name,
            amount = hit.amount,
            score = hit.score,
            "Hit"
        );

        let mut recipients = vec![hit.owner, hit.target];
        for &observer in observers {
            if !recipients.contains(&observer) {
                recipients.push(observer);
            }
        }
        let event = Event::Hit(hit.clone());
        for recipient in recipients {
            if let Some(entity) = self.live.get_mut(recipient) {
                entity.record(event.clone());
            } else if let Some(entity) = self.destroyed.get_mut(&recipient) {
                entity.record(event.clone());
            }
        }
        if let Some(target) = self.live.get_mut(hit.target) {
            for note in outcome.defender_notes {
                target.note(note);
            }
        }

        if let Some(owner) = self.entity_mut(hit.owner) {
            for note in outcome.attacker_notes {
                owner.note(note);
            }
            if let Some(state) = owner.ship_state_mut() {
                state.score += hit.score;
            }
        }
        Ok(())
    }

    /// Entity by id, live or dead.
    fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if self.live.contains(id) {
            return self.live.get_mut(id);
        }
        if self.destroyed.contains_key(&id) {
            return self.destroyed.get_mut(&id);
        }
        self.graveyard.get_mut(&id)
    }

    /// Move destroyed entities out of the live map.
    fn sweep(&mut self) {
        for id in self.live.sorted_ids() {
            if self.live.get(id).map_or(false, Entity::is_destroyed) {
                if let Some(entity) = self.live.remove(id) {
                    tracing::info!(tick = %self.tick, entity = %entity.name, "Destroyed");
                    self.destroyed.insert(id, entity);
                }
            }
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) -> Result<()> {
        for entity in self.live.values() {
            if !entity.components_attached() {
                return Err(GameError::invariant(format!(
                    "{} has a component attached elsewhere",
                    entity.name
                )));
            }
            if let Some(shields) = entity.shields() {
                for q in crate::components::Quadrant::ALL {
                    let strength = shields.strengths.get(q);
                    if strength < 0 || strength > shields.boost_limit(q) {
                        return Err(GameError::invariant(format!(
                            "{} shield {q} at {strength}",
                            entity.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn note_executing(entity: &mut Entity, cmd: &Command) {
    entity.note(format!("Executing command \"{}\"", cmd.text));
}

/// Names of commandable entities without a command file, in id order.
#[must_use]
pub fn missing_commands(live: &EntityStorage, command_files: &BTreeMap<String, String>) -> Vec<String> {
    live.values()
        .filter(|e| e.is_commandable() && !command_files.contains_key(&e.name))
        .map(|e| e.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Quadrant, QuadrantValues};
    use crate::events::Event;
    use crate::factions::FactionId;
    use crate::math::Point;
    use crate::tick::TICK_ZERO;

    fn ship(catalog: &Catalog, name: &str, class: &str, faction: &str, pos: Point) -> Entity {
        Entity::new_ship(
            name,
            catalog.ship_class(class).unwrap(),
            &catalog.rules,
            FactionId::new(faction),
            "player",
            pos,
            TICK_ZERO,
        )
    }

    fn mine(catalog: &Catalog, owner: EntityId, faction: &str, pos: Point) -> Entity {
        Entity::new_payload(
            format!("mine-{owner}-{pos}"),
            catalog.payload("SplinterMine").unwrap(),
            &catalog.rules,
            owner,
            FactionId::new(faction),
            Vector::new(pos, 0.0, 0),
            TICK_ZERO,
        )
    }

    fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(name, text)| ((*name).to_string(), (*text).to_string()))
            .collect()
    }

    /// Reset for round 1 and play its first `ticks` ticks.
    fn play_ticks(
        catalog: &Catalog,
        live: &mut EntityStorage,
        command_files: &BTreeMap<String, String>,
        ticks: u8,
    ) -> BTreeMap<EntityId, Entity> {
        let mut graveyard = BTreeMap::new();
        let mut engine = RoundEngine::new(catalog, live, &mut graveyard, TICK_ZERO);
        engine.round_reset(1, command_files);
        for tick in 1..=ticks {
            engine.run_tick(Tick::new(1, tick)).unwrap();
        }
        engine.destroyed
    }

    fn notes(entity: &Entity) -> Vec<String> {
        entity
            .history
            .iter()
            .flat_map(|(_, entry)| entry.events.iter())
            .filter_map(|event| match event {
                Event::Internal(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_mine_hits_north_shield() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Athens", "H2527", "Red", Point::ORIGIN));
        let b = live.insert(ship(&catalog, "Babylon", "H2552", "Blue", Point::from_ints(0, 200)));
        live.insert(mine(&catalog, b, "Blue", Point::from_ints(0, 3)));

        let destroyed = play_ticks(&catalog, &mut live, &BTreeMap::new(), 1);

        let athens = live.get(a).unwrap();
        assert_eq!(athens.shields().unwrap().strengths.get(Quadrant::N), 28);
        assert_eq!(athens.hull, 100);
        assert_eq!(live.get(b).unwrap().score(), 36);
        // the mine went off and was swept
        assert_eq!(destroyed.len(), 1);
        assert!(athens
            .history
            .current_events()
            .iter()
            .any(|e| matches!(e, Event::Explosion(_))));
    }

    #[test]
    fn test_simultaneous_lethal_hits_award_one_killing_blow() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let mut target = ship(&catalog, "Athens", "H2527", "Red", Point::ORIGIN);
        target.hull = 50;
        target.shields_mut().unwrap().strengths = QuadrantValues::uniform(0);
        let a = live.insert(target);
        let b = live.insert(ship(&catalog, "Babylon", "H2552", "Blue", Point::from_ints(0, 200)));
        let c = live.insert(ship(&catalog, "Cairo", "H2545", "Green", Point::from_ints(0, -200)));
        live.insert(mine(&catalog, b, "Blue", Point::from_ints(0, 3)));
        live.insert(mine(&catalog, c, "Green", Point::from_ints(0, -4)));

        let destroyed = play_ticks(&catalog, &mut live, &BTreeMap::new(), 1);

        assert!(destroyed.contains_key(&a));
        assert!(!live.contains(a));
        let kill_bonus = catalog.rules.killing_blow_bonus;
        assert_eq!(live.get(b).unwrap().score(), 50 + kill_bonus);
        assert_eq!(live.get(c).unwrap().score(), 0);
    }

    #[test]
    fn test_laser_breaks_shield() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Athens", "H2527", "Red", Point::ORIGIN));
        let b = live.insert(ship(&catalog, "Babylon", "H2552", "Blue", Point::from_ints(0, 30)));

        play_ticks(
            &catalog,
            &mut live,
            &files(&[("Athens", "1: F L1 Babylon"), ("Babylon", "")]),
            1,
        );

        let babylon = live.get(b).unwrap();
        assert_eq!(babylon.shields().unwrap().strengths.get(Quadrant::S), 0);
        assert_eq!(babylon.hull, 100);
        // half the shield, the break bonus and the hull damage
        assert_eq!(live.get(a).unwrap().score(), 70 + 25 + 10);
        let athens = live.get(a).unwrap();
        assert!(matches!(
            athens.weapons.get("L1").map(|c| &c.kind),
            Some(ComponentKind::Laser(l)) if l.temperature == 20
        ));
        assert!(notes(athens).iter().any(|n| n == "Executing command \"1: F L1 Babylon\""));
    }

    #[test]
    fn test_laser_out_of_range_costs_nothing() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Athens", "H2527", "Red", Point::ORIGIN));
        live.insert(ship(&catalog, "Babylon", "H2552", "Blue", Point::from_ints(0, 190)));

        play_ticks(
            &catalog,
            &mut live,
            &files(&[("Athens", "1: F L1 Babylon"), ("Babylon", "")]),
            1,
        );

        let athens = live.get(a).unwrap();
        assert!(matches!(
            athens.weapons.get("L1").map(|c| &c.kind),
            Some(ComponentKind::Laser(l)) if l.temperature == 0
        ));
        assert!(notes(athens).iter().any(|n| n.contains("out of range")));
    }

    #[test]
    fn test_laser_gives_no_range_for_unseen_target() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Athens", "H2527", "Red", Point::ORIGIN));
        live.insert(ship(&catalog, "Babylon", "H2552", "Blue", Point::from_ints(0, 400)));

        play_ticks(
            &catalog,
            &mut live,
            &files(&[("Athens", "1: F L1 Babylon"), ("Babylon", "")]),
            1,
        );

        let notes = notes(live.get(a).unwrap());
        assert!(!notes.iter().any(|n| n.contains("out of range")));
        assert!(notes.iter().any(|n| n == "L1: can not see Babylon."));
    }

    #[test]
    fn test_launch_spawns_named_payload() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Cairo", "H2545", "Red", Point::ORIGIN));

        play_ticks(&catalog, &mut live, &files(&[("Cairo", "1: F R1 90")]), 2);

        let id = live.find_by_name("Cairo-Rocket-R1-1").unwrap();
        let rocket = live.get(id).unwrap();
        assert_eq!(rocket.owner, a);
        assert_eq!(rocket.vector.heading_f64(), 90.0);
        assert_eq!(rocket.vector.speed, 60);
        // launched after moving in tick 1, flew in tick 2
        assert_eq!(rocket.vector.pos.distance_to(Point::from_ints(60, 0)), 0.0);
        assert_eq!(rocket.battery, 75 - 2 * 5);
        assert!(matches!(
            live.get(a).unwrap().weapons.get("R1").map(|c| &c.kind),
            Some(ComponentKind::Launcher(l)) if l.ammo == 9
        ));
    }

    #[test]
    fn test_guided_missile_acquires_enemy() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        live.insert(ship(&catalog, "Cairo", "H2545", "Red", Point::ORIGIN));
        live.insert(ship(&catalog, "Babylon", "H2552", "Blue", Point::from_ints(20, 200)));

        play_ticks(
            &catalog,
            &mut live,
            &files(&[("Cairo", "1: F S1 0"), ("Babylon", "")]),
            2,
        );

        let id = live.find_by_name("Cairo-Splinter-S1-1").unwrap();
        let missile = live.get(id).unwrap();
        assert!(matches!(
            &missile.kind,
            EntityKind::Missile(m) if m.target_name.as_deref() == Some("Babylon")
        ));
        // steering towards the target
        assert!(missile.vector.heading_f64() > 0.0);
    }

    #[test]
    fn test_mine_fizzles_and_tells_owner() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Cairo", "H2545", "Red", Point::ORIGIN));
        let mut dud = mine(&catalog, a, "Red", Point::from_ints(500, 500));
        dud.battery = 1;
        let dud_name = dud.name.clone();
        let dud = live.insert(dud);

        let destroyed = play_ticks(&catalog, &mut live, &files(&[("Cairo", "")]), 1);

        assert!(destroyed.contains_key(&dud));
        let expected = format!("{dud_name} fizzled out.");
        assert!(notes(live.get(a).unwrap()).contains(&expected));
    }

    #[test]
    fn test_replenish_at_starbase() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        live.insert(ship(&catalog, "Base", "SB2531", "Red", Point::ORIGIN));
        let mut damaged = ship(&catalog, "Cairo", "H2545", "Red", Point::from_ints(0, 5));
        damaged.hull = 10;
        let a = live.insert(damaged);

        play_ticks(
            &catalog,
            &mut live,
            &files(&[("Base", ""), ("Cairo", "1: Replenish")]),
            1,
        );

        let cairo = live.get(a).unwrap();
        assert_eq!(cairo.hull, cairo.max_hull);
        assert_eq!(cairo.battery, cairo.max_battery);
        assert!(notes(cairo).iter().any(|n| n == "Replenished at Base."));
    }

    #[test]
    fn test_replenish_fails_far_from_base() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        live.insert(ship(&catalog, "Base", "SB2531", "Red", Point::ORIGIN));
        let mut damaged = ship(&catalog, "Cairo", "H2545", "Red", Point::from_ints(0, 50));
        damaged.hull = 10;
        let a = live.insert(damaged);

        play_ticks(
            &catalog,
            &mut live,
            &files(&[("Base", ""), ("Cairo", "1: Replenish")]),
            1,
        );

        let cairo = live.get(a).unwrap();
        assert_eq!(cairo.hull, 10);
        assert!(notes(cairo).iter().any(|n| n == "Failed to replenish."));
    }

    #[test]
    fn test_boost_then_dissipate() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Cairo", "H2545", "Red", Point::ORIGIN));
        let command_files = files(&[("Cairo", "1: Boost N 50")]);

        let mut graveyard = BTreeMap::new();
        let mut engine = RoundEngine::new(&catalog, &mut live, &mut graveyard, TICK_ZERO);
        engine.round_reset(1, &command_files);
        engine.run_tick(Tick::new(1, 1)).unwrap();
        let north = |live: &EntityStorage| {
            live.get(a).unwrap().shields().unwrap().strengths.get(Quadrant::N)
        };
        assert_eq!(north(&*engine.live), 200);
        engine.post_round_reset();
        assert_eq!(north(&*engine.live), 150);
    }

    #[test]
    fn test_gravscan_reaches_beyond_passive_scan() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Cairo", "H2545", "Red", Point::ORIGIN));
        live.insert(ship(&catalog, "Babylon", "H2552", "Blue", Point::from_ints(0, 1000)));
        let command_files = files(&[("Cairo", "1: F G 0 30"), ("Babylon", "")]);

        play_ticks(&catalog, &mut live, &command_files, 1);

        let cairo = live.get(a).unwrap();
        assert!(cairo
            .history
            .current_events()
            .iter()
            .any(|e| e.as_scan().map_or(false, |s| s.name == "Babylon")));
    }

    #[test]
    fn test_invalid_command_is_not_executed() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        let a = live.insert(ship(&catalog, "Cairo", "H2545", "Red", Point::ORIGIN));

        play_ticks(&catalog, &mut live, &files(&[("Cairo", "1: A99\n2: X 5")]), 2);

        let cairo = live.get(a).unwrap();
        assert_eq!(cairo.vector.speed, 0);
        let notes = notes(cairo);
        assert!(notes.iter().any(|n| n.contains("99 is outside max acceleration.")));
        assert!(notes.iter().any(|n| n.contains("Unknown command.")));
        assert!(!notes.iter().any(|n| n.starts_with("Executing")));
    }

    #[test]
    fn test_missing_commands_stop_the_round() {
        let catalog = Catalog::builtin().unwrap();
        let mut live = EntityStorage::new();
        live.insert(ship(&catalog, "Cairo", "H2545", "Red", Point::ORIGIN));
        live.insert(ship(&catalog, "Base", "SB2531", "Red", Point::from_ints(0, 50)));
        let before = live.clone();

        let mut graveyard = BTreeMap::new();
        let engine = RoundEngine::new(&catalog, &mut live, &mut graveyard, TICK_ZERO);
        let err = engine.play(1, &files(&[("Cairo", "")])).unwrap_err();
        assert!(matches!(
            err,
            GameError::MissingCommands { round: 1, ref names } if names == &["Base".to_string()]
        ));
        assert_eq!(live, before);
    }
}
