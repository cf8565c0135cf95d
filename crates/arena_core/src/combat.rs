//! Damage resolution.
//!
//! A hit first meets the target's shields on the quadrant facing the source.
//! Whatever breaks through goes to the hull, or to the battery for EMP.
//! Points accumulate on the [`HitEvent`] itself and are credited to the
//! source's owner by the round engine.

use crate::components::Quadrant;
use crate::data::Rules;
use crate::entity::Entity;
use crate::error::{GameError, Result};
use crate::events::{DamageType, HitEvent};

/// Messages produced by one hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitOutcome {
    /// For the owner of the source.
    pub attacker_notes: Vec<String>,
    /// For the target.
    pub defender_notes: Vec<String>,
}

/// Apply `hit` to `target`, adding earned points to `hit.score`.
///
/// A ship that is already destroyed still takes damage (and scores), but
/// only the hit that destroys it earns the killing blow bonus.
///
/// # Errors
///
/// Returns [`GameError::Invariant`] if a defense component is not a shield.
pub fn resolve_hit(target: &mut Entity, hit: &mut HitEvent, rules: &Rules) -> Result<HitOutcome> {
    let mut outcome = HitOutcome::default();
    if hit.amount <= 0 {
        return Ok(outcome);
    }

    // Missiles and mines have no defenses.
    if target.is_projectile() {
        target.hull = 0;
        outcome
            .attacker_notes
            .push(format!("{} destroyed {}.", hit.source_name, target.name));
        return Ok(outcome);
    }

    let already_destroyed = target.is_destroyed();
    let quadrant = Quadrant::from_bearing(target.vector.pos.heading_to(hit.pos));

    let mut amount = hit.amount;
    for component in &mut target.defense {
        let name = component.name.clone();
        let Some(shields) = component.as_shields_mut() else {
            return Err(GameError::invariant(format!(
                "defense component {name} of {} is not a shield",
                target.name
            )));
        };
        let absorption = shields.absorb(
            quadrant,
            hit.damage_type,
            amount,
            hit.can_score,
            rules.shield_break_bonus,
            &hit.source_name,
            &target.name,
        );
        hit.score += absorption.score;
        outcome.attacker_notes.extend(absorption.attacker_notes);
        outcome.defender_notes.extend(absorption.defender_notes);
        amount = absorption.breakthrough;
        if amount <= 0 {
            break;
        }
    }

    if amount > 0 {
        let (part, dealt, points) = match hit.damage_type {
            DamageType::Nanocyte => {
                let dealt = 2 * amount;
                let points = dealt.min(target.hull.max(0));
                target.hull = (target.hull - dealt).max(0);
                outcome.defender_notes.push(format!(
                    "Nanocytes burned your hull for {dealt} to {}.",
                    target.hull
                ));
                ("hull", dealt, points)
            }
            DamageType::Emp => {
                let drained = amount.min(target.battery.max(0));
                target.battery -= drained;
                outcome.defender_notes.push(format!(
                    "EMP blast drained your battery by {drained}: {} left.",
                    target.battery
                ));
                ("battery", amount, drained / 2)
            }
            DamageType::Laser | DamageType::Explosion => {
                let points = amount.min(target.hull.max(0));
                target.hull = (target.hull - amount).max(0);
                outcome
                    .defender_notes
                    .push(format!("Hull decreased by {amount} to {}.", target.hull));
                ("hull", amount, points)
            }
        };
        let points = if hit.can_score { points } else { 0 };
        hit.score += points;
        outcome.attacker_notes.push(format!(
            "{} hit {}'s {part} for {dealt}: ({points} points).",
            hit.source_name, target.name
        ));
    }

    if !already_destroyed && target.is_destroyed() {
        let bonus = if hit.can_score {
            rules.killing_blow_bonus
        } else {
            0
        };
        hit.score += bonus;
        outcome.attacker_notes.push(format!(
            "{} landed the killing blow on {}: ({bonus} points).",
            hit.source_name, target.name
        ));
        outcome.defender_notes.push(format!(
            "You were destroyed. Killing blow by {}.",
            hit.source_name
        ));
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Component, ComponentKind, QuadrantValues, Shields};
    use crate::data::Catalog;
    use crate::factions::FactionId;
    use crate::math::Point;
    use crate::tick::TICK_ZERO;

    /// Ship at the origin with uniform shields of `strength`.
    fn target(strength: i32) -> Entity {
        let catalog = Catalog::builtin().unwrap();
        let mut ship = Entity::new_ship(
            "Bremen",
            catalog.ship_class("H2527").unwrap(),
            &catalog.rules,
            FactionId::new("Blue"),
            "bob",
            Point::ORIGIN,
            TICK_ZERO,
        );
        ship.id = 2;
        ship.defense = vec![Component::new(
            "Shields",
            ComponentKind::Shields(Shields::new(QuadrantValues::uniform(strength))),
        )];
        ship
    }

    /// Hit arriving from due north.
    fn hit(damage_type: DamageType, amount: i32, can_score: bool) -> HitEvent {
        HitEvent {
            pos: Point::from_ints(0, 10),
            damage_type,
            source: 1,
            source_name: "Ajax".into(),
            owner: 1,
            target: 2,
            target_name: "Bremen".into(),
            amount,
            score: 0,
            can_score,
        }
    }

    fn north(ship: &Entity) -> i32 {
        ship.shields().map_or(-1, |s| s.strengths.get(Quadrant::N))
    }

    #[test]
    fn test_explosion_breaks_shield() {
        let mut ship = target(100);
        let mut h = hit(DamageType::Explosion, 150, true);
        resolve_hit(&mut ship, &mut h, &Rules::default()).unwrap();
        assert_eq!(north(&ship), 0);
        assert_eq!(ship.hull, 50);
        // 50 for the shield, 25 break bonus, 50 on the hull
        assert_eq!(h.score, 125);
    }

    #[test]
    fn test_nanocytes_stopped_by_active_shield() {
        let mut ship = target(100);
        let mut h = hit(DamageType::Nanocyte, 500, true);
        resolve_hit(&mut ship, &mut h, &Rules::default()).unwrap();
        assert_eq!(north(&ship), 100);
        assert_eq!(ship.hull, 100);
        assert_eq!(h.score, 0);
    }

    #[test]
    fn test_nanocytes_double_on_bare_hull() {
        let mut ship = target(0);
        let mut h = hit(DamageType::Nanocyte, 30, true);
        resolve_hit(&mut ship, &mut h, &Rules::default()).unwrap();
        assert_eq!(ship.hull, 40);
        assert_eq!(h.score, 60);
    }

    #[test]
    fn test_emp_doubled_against_shield() {
        let mut ship = target(120);
        let battery = ship.battery;
        let mut h = hit(DamageType::Emp, 60, true);
        resolve_hit(&mut ship, &mut h, &Rules::default()).unwrap();
        assert_eq!(north(&ship), 0);
        assert_eq!(ship.battery, battery);
        assert_eq!(h.score, 60);
    }

    #[test]
    fn test_emp_drains_battery() {
        let mut ship = target(0);
        ship.battery = 40;
        let mut h = hit(DamageType::Emp, 100, true);
        resolve_hit(&mut ship, &mut h, &Rules::default()).unwrap();
        assert_eq!(ship.battery, 0);
        assert_eq!(ship.hull, 100);
        assert_eq!(h.score, 20);
    }

    #[test]
    fn test_friendly_fire_never_scores() {
        let mut ship = target(50);
        let mut h = hit(DamageType::Explosion, 500, false);
        let outcome = resolve_hit(&mut ship, &mut h, &Rules::default()).unwrap();
        assert!(ship.is_destroyed());
        assert_eq!(h.score, 0);
        assert!(outcome.defender_notes.iter().any(|n| n.contains("destroyed")));
    }

    #[test]
    fn test_killing_blow_awarded_once() {
        let rules = Rules::default();
        let mut ship = target(0);
        let mut first = hit(DamageType::Laser, 150, true);
        let mut second = hit(DamageType::Laser, 150, true);
        resolve_hit(&mut ship, &mut first, &rules).unwrap();
        resolve_hit(&mut ship, &mut second, &rules).unwrap();
        assert_eq!(first.score, 100 + rules.killing_blow_bonus);
        // nothing left to score on the second hit
        assert_eq!(second.score, 0);
    }

    #[test]
    fn test_projectile_dies_from_any_damage() {
        let catalog = Catalog::builtin().unwrap();
        let mut mine = Entity::new_payload(
            "Ajax-SplinterMine-M1-1",
            catalog.payload("SplinterMine").unwrap(),
            &catalog.rules,
            1,
            FactionId::new("Red"),
            crate::math::Vector::default(),
            TICK_ZERO,
        );
        let mut h = hit(DamageType::Laser, 1, true);
        resolve_hit(&mut mine, &mut h, &Rules::default()).unwrap();
        assert!(mine.is_destroyed());
    }

    #[test]
    fn test_non_shield_defense_is_invariant_error() {
        let mut ship = target(100);
        ship.defense = vec![Component::new(
            "Odd",
            ComponentKind::Cloak(crate::components::Cloak {
                strength: 0.1,
                active: false,
                energy_per_tick: 1,
            }),
        )];
        let mut h = hit(DamageType::Laser, 10, true);
        let err = resolve_hit(&mut ship, &mut h, &Rules::default()).unwrap_err();
        assert!(matches!(err, GameError::Invariant(_)));
    }
}
