//! Error types for the round engine.
//!
//! Player mistakes in command files are not errors: they become invalid
//! commands with feedback (see [`crate::command`]). Everything here either
//! blocks a round from running or signals broken setup data.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the round engine.
#[derive(Debug, Error)]
pub enum GameError {
    /// One or more commandable entities have no command file for the round.
    #[error("Missing command files for round {round}: {}", .names.join(", "))]
    MissingCommands {
        /// Round that cannot be processed.
        round: u32,
        /// Names of the entities blocking the round.
        names: Vec<String>,
    },

    /// Ship class not present in the catalog.
    #[error("Unknown ship class: {0}")]
    UnknownShipClass(String),

    /// Payload class not present in the catalog.
    #[error("Unknown payload class: {0}")]
    UnknownPayloadClass(String),

    /// Two entities (or two catalog entries) share a name.
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Entity lookup failed.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Catalog or roster parsing error.
    #[error("Failed to parse {source_name}: {message}")]
    DataParseError {
        /// What was being parsed (file name or "built-in catalog").
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Catalog contents are inconsistent.
    #[error("Invalid catalog: {}", .0.join("; "))]
    InvalidCatalog(Vec<String>),

    /// Serialization or deserialization of game state failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Broken internal invariant. Indicates bad setup data or a bug.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// The round being played or verified is not the expected one.
    #[error("Round mismatch: expected round {expected}, got {actual}")]
    RoundMismatch {
        /// Round the caller expected.
        expected: u32,
        /// Round the state is actually at.
        actual: u32,
    },

    /// A replayed round ended in a different state than recorded.
    #[error("Replay diverged in round {round}: recorded hash {recorded}, replayed hash {replayed}")]
    ReplayDiverged {
        /// Round that was replayed.
        round: u32,
        /// Hash stored in the record.
        recorded: u64,
        /// Hash produced by the replay.
        replayed: u64,
    },
}

impl GameError {
    /// Shorthand for an [`GameError::Invariant`] error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_commands_lists_names() {
        let err = GameError::MissingCommands {
            round: 3,
            names: vec!["Alpha".into(), "Bravo".into()],
        };
        assert_eq!(
            err.to_string(),
            "Missing command files for round 3: Alpha, Bravo"
        );
    }

    #[test]
    fn test_invalid_catalog_joins_problems() {
        let err = GameError::InvalidCatalog(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid catalog: a; b");
    }
}
