//! Faction identifiers.
//!
//! Factions are declared by the roster, so they are plain names rather than a
//! fixed enum. Hits between members of the same faction never score.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a faction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FactionId(String);

impl FactionId {
    /// Create a faction id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The faction name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a hit from `self` on `other` may award points.
    #[must_use]
    pub fn can_score_against(&self, other: &Self) -> bool {
        self != other
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FactionId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_faction_cannot_score() {
        let red = FactionId::from("Red");
        assert!(!red.can_score_against(&FactionId::from("Red")));
        assert!(red.can_score_against(&FactionId::from("Blue")));
    }
}
