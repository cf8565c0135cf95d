//! Round records for replaying and auditing rounds.
//!
//! A record stores the serialized game before a round, every command file
//! submitted for it and the hash of the game afterwards. Playing the record
//! again must reproduce the hash exactly.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::Catalog;
use crate::error::{GameError, Result};
use crate::game::{Game, RoundReport};

/// Record file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Inputs and outcome of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Record format version.
    pub version: u32,
    /// Round that was played.
    pub round: u32,
    /// Serialized game before the round.
    pub initial_state: Vec<u8>,
    /// Command files by ship name.
    pub command_files: BTreeMap<String, String>,
    /// Hash of the game after the round.
    pub final_hash: u64,
}

impl RoundRecord {
    /// Play the next round of `game` and record it.
    ///
    /// # Errors
    ///
    /// Returns any error from serializing the game or playing the round.
    pub fn capture(
        game: &mut Game,
        catalog: &Catalog,
        command_files: &BTreeMap<String, String>,
    ) -> Result<(Self, RoundReport)> {
        let initial_state = Game::serialize(game)?;
        let report = game.play_round(catalog, command_files)?;
        let record = Self {
            version: REPLAY_VERSION,
            round: report.round,
            initial_state,
            command_files: command_files.clone(),
            final_hash: report.state_hash,
        };
        Ok((record, report))
    }

    /// Game as it was before the round.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if the stored state is corrupt.
    pub fn restore_initial_state(&self) -> Result<Game> {
        Game::deserialize(&self.initial_state)
    }

    /// Replay the round and check that it ends in the recorded state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::RoundMismatch`] if the stored game is not at the
    /// round before [`RoundRecord::round`], or [`GameError::ReplayDiverged`]
    /// if the replayed hash differs.
    pub fn verify(&self, catalog: &Catalog) -> Result<Game> {
        let mut game = self.restore_initial_state()?;
        if game.next_round() != self.round {
            return Err(GameError::RoundMismatch {
                expected: self.round,
                actual: game.next_round(),
            });
        }
        let report = game.play_round(catalog, &self.command_files)?;
        if report.state_hash != self.final_hash {
            tracing::warn!(
                round = self.round,
                recorded = self.final_hash,
                replayed = report.state_hash,
                "Replay diverged"
            );
            return Err(GameError::ReplayDiverged {
                round: self.round,
                recorded: self.final_hash,
                replayed: report.state_hash,
            });
        }
        Ok(game)
    }

    /// Save the record to a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if encoding or writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize record: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to write record file: {e}")))?;
        Ok(())
    }

    /// Load a record from a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Serialization`] if reading or decoding fails, or
    /// if the file was written by another format version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::Serialization(format!("Failed to read record file: {e}")))?;
        let record: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize record: {e}")))?;

        if record.version != REPLAY_VERSION {
            return Err(GameError::Serialization(format!(
                "Record version mismatch: expected {REPLAY_VERSION}, got {}",
                record.version
            )));
        }

        Ok(record)
    }
}
