//! A game: the live arena plus everything needed between rounds.
//!
//! [`Game`] owns the entity map and a graveyard of destroyed player ships.
//! It sets up round 0 from a roster and plays one round at a time through
//! the [`RoundEngine`]. The whole game is serializable so a round can be
//! stored and replayed bit for bit.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::data::{Catalog, RosterEntry};
use crate::entity::{Entity, EntityId, EntityStorage};
use crate::error::{GameError, Result};
use crate::round::{missing_commands, RoundEngine};
use crate::tick::{Tick, TICK_ZERO};

/// Hash of any serializable state, stable across runs and platforms.
///
/// Encodes with bincode and feeds the bytes to a fixed-key hasher. Returns 0
/// if the value cannot be encoded.
#[must_use]
pub fn hash_state<T: Serialize + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    match bincode::serialize(value) {
        Ok(bytes) => bytes.hash(&mut hasher),
        Err(_) => return 0,
    }
    hasher.finish()
}

/// Summary of one played round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round that was played.
    pub round: u32,
    /// Entities removed during the round, by id.
    pub destroyed: BTreeMap<EntityId, Entity>,
    /// Points earned this round, by ship name.
    pub score_deltas: BTreeMap<String, i32>,
    /// Hash of the game after the round.
    pub state_hash: u64,
}

impl RoundReport {
    /// Names of destroyed entities in id order.
    #[must_use]
    pub fn destroyed_names(&self) -> Vec<&str> {
        self.destroyed.values().map(|e| e.name.as_str()).collect()
    }
}

/// Full state of a game between rounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Game {
    round: u32,
    entities: EntityStorage,
    graveyard: BTreeMap<EntityId, Entity>,
}

impl Game {
    /// Create a game at round 0 with the ships of `roster`.
    ///
    /// Ships are created in roster order and every ship records an initial
    /// scan, so round 0 history shows what each captain can see.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateName`] or [`GameError::UnknownShipClass`].
    pub fn setup(catalog: &Catalog, roster: &[RosterEntry]) -> Result<Self> {
        let mut entities = EntityStorage::new();
        let mut names = BTreeSet::new();
        for entry in roster {
            if !names.insert(entry.name.clone()) {
                return Err(GameError::DuplicateName(entry.name.clone()));
            }
            let class = catalog.ship_class(&entry.class)?;
            let ship = Entity::new_ship(
                entry.name.clone(),
                class,
                &catalog.rules,
                entry.faction.clone(),
                entry.player.clone(),
                entry.pos,
                TICK_ZERO,
            );
            let id = entities.insert(ship);
            tracing::debug!(entity = %entry.name, id, class = %entry.class, "Created ship");
        }

        let mut game = Self {
            round: 0,
            entities,
            graveyard: BTreeMap::new(),
        };
        RoundEngine::new(catalog, &mut game.entities, &mut game.graveyard, TICK_ZERO).scan_all();
        tracing::info!(ships = game.entities.len(), "Game set up");
        Ok(game)
    }

    /// Last round played, 0 right after setup.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Round that [`Game::play_round`] will play next.
    #[must_use]
    pub fn next_round(&self) -> u32 {
        self.round + 1
    }

    /// Live entities.
    #[must_use]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Destroyed player ships, by id.
    #[must_use]
    pub fn graveyard(&self) -> &BTreeMap<EntityId, Entity> {
        &self.graveyard
    }

    /// Live entity or dead ship by name.
    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities
            .values()
            .chain(self.graveyard.values())
            .find(|e| e.name == name)
    }

    /// Names of live entities that take a command file.
    #[must_use]
    pub fn commandable_names(&self) -> Vec<String> {
        self.entities
            .values()
            .filter(|e| e.is_commandable())
            .map(|e| e.name.clone())
            .collect()
    }

    /// Current score of every ship, live or dead.
    #[must_use]
    pub fn scores(&self) -> BTreeMap<String, i32> {
        self.entities
            .values()
            .chain(self.graveyard.values())
            .filter(|e| e.is_commandable())
            .map(|e| (e.name.clone(), e.score()))
            .collect()
    }

    /// Commandable entities without a file in `command_files`.
    #[must_use]
    pub fn missing_commands(&self, command_files: &BTreeMap<String, String>) -> Vec<String> {
        missing_commands(&self.entities, command_files)
    }

    /// Play the next round.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MissingCommands`] without changing anything if a
    /// commandable entity has no command file. Invariant violations abort
    /// the round and leave the game in an unspecified state.
    pub fn play_round(
        &mut self,
        catalog: &Catalog,
        command_files: &BTreeMap<String, String>,
    ) -> Result<RoundReport> {
        let round = self.next_round();
        let scores_before = self.scores();

        let engine = RoundEngine::new(
            catalog,
            &mut self.entities,
            &mut self.graveyard,
            Tick::round_start(round).prev(),
        );
        let destroyed = engine.play(round, command_files)?;
        self.round = round;

        for (id, entity) in &destroyed {
            if entity.is_commandable() {
                self.graveyard.insert(*id, entity.clone());
            }
        }

        let score_deltas = self
            .scores()
            .into_iter()
            .map(|(name, score)| {
                let before = scores_before.get(&name).copied().unwrap_or(0);
                (name, score - before)
            })
            .collect();

        let state_hash = self.state_hash();
        tracing::info!(round, state_hash, "Round complete");
        Ok(RoundReport {
            round,
            destroyed,
            score_deltas,
            state_hash,
        })
    }

    /// Hash of the whole game state.
    ///
    /// Two games with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        hash_state(self)
    }

    /// Serialize the game for storage or replay.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if encoding fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize game: {e}")))
    }

    /// Restore a game from [`Game::serialize`] output.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if decoding fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize game: {e}")))
    }
}
