//! # Arena Development Tools
//!
//! Command-line tools for players and game masters:
//! - Command file validation before submission
//! - A local round runner for trying out scenarios

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use arena_core::data::Catalog;
use arena_core::error::GameError;

pub mod play;
pub mod validate;

/// Errors raised by the tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The engine refused the input.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Output could not be encoded.
    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for the tools.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Read a whole text file.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The catalog at `path`, or the built-in one.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => {
            let text = read_text(path)?;
            let catalog = Catalog::from_ron_str(&text, &path.display().to_string())?;
            tracing::info!(path = %path.display(), "Loaded custom catalog");
            Ok(catalog)
        }
        None => Ok(Catalog::builtin()?),
    }
}
