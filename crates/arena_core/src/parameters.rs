//! Validators for command parameters.
//!
//! A component describes the inputs a command must supply with a list of
//! [`Parameter`]s. Validation never fails hard: it produces either a typed
//! [`ParamValue`] or a feedback message for the player.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::components::Quadrant;
use crate::entity::Entity;
use crate::math::Arc;

/// Everything a validator may consult.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Entity issuing the command.
    pub actor: &'a Entity,
    /// Names of every object currently in space.
    pub known_names: &'a BTreeSet<String>,
}

/// Expected input of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// Whole number within `min..=max`.
    NumberInRange {
        /// Label used in feedback.
        label: &'static str,
        /// Smallest accepted value.
        min: i32,
        /// Largest accepted value.
        max: i32,
    },
    /// Relative direction in degrees, optionally limited to a firing arc.
    Direction {
        /// Allowed arc, `None` for all around.
        arc: Option<Arc>,
    },
    /// Switch token: on/off, yes/no, true/false, 1/0.
    OnOff,
    /// Name of another object in space.
    ObjectByName,
    /// Shield quadrant letter.
    Quadrant,
}

/// Validated value of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Plain number.
    Number(i32),
    /// Relative direction in degrees.
    Direction(i32),
    /// Switch state.
    Flag(bool),
    /// Object name.
    Object(String),
    /// Shield quadrant.
    Quadrant(Quadrant),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) | Self::Direction(n) => write!(f, "{n}"),
            Self::Flag(on) => f.write_str(if *on { "on" } else { "off" }),
            Self::Object(name) => f.write_str(name),
            Self::Quadrant(q) => write!(f, "{q}"),
        }
    }
}

/// Whether `token` is an optionally negative whole number.
#[must_use]
pub fn is_valid_number(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Whether `token` is a whole number without sign.
#[must_use]
pub fn is_unsigned_number(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a number token, reporting feedback on failure.
pub fn parse_number(token: &str) -> Result<i32, String> {
    if !is_valid_number(token) {
        return Err(format!("{token} is not a valid number."));
    }
    token
        .parse::<i32>()
        .map_err(|_| format!("{token} is out of range."))
}

/// Parse an on/off token.
#[must_use]
pub fn parse_on_off(token: &str) -> Option<bool> {
    match token.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

impl Parameter {
    /// Validate one token.
    pub fn validate(&self, token: &str, ctx: &ValidationContext<'_>) -> Result<ParamValue, String> {
        match self {
            Self::NumberInRange { label, min, max } => {
                let value = parse_number(token)?;
                if value < *min || value > *max {
                    return Err(format!(
                        "{label} {value} is outside the range {min} to {max}."
                    ));
                }
                Ok(ParamValue::Number(value))
            }
            Self::Direction { arc } => {
                let value = parse_number(token)?;
                if let Some(arc) = arc {
                    if !arc.contains(f64::from(value)) {
                        return Err(format!("Direction {value} is outside firing arc {arc}."));
                    }
                }
                Ok(ParamValue::Direction(value))
            }
            Self::OnOff => parse_on_off(token)
                .map(ParamValue::Flag)
                .ok_or_else(|| format!("{token} is not one of on/off, yes/no, true/false, 1/0.")),
            Self::ObjectByName => {
                if token == ctx.actor.name {
                    Err("Can not target yourself.".to_string())
                } else if ctx.known_names.contains(token) {
                    Ok(ParamValue::Object(token.to_string()))
                } else {
                    Err(format!("Unknown object {token}."))
                }
            }
            Self::Quadrant => Quadrant::from_str(token)
                .map(ParamValue::Quadrant)
                .map_err(|()| format!("{token} is not a shield quadrant (N, E, S, W).")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_tokens() {
        assert!(is_valid_number("42"));
        assert!(is_valid_number("-7"));
        assert!(!is_valid_number("-"));
        assert!(!is_valid_number("4x"));
        assert!(is_unsigned_number("30"));
        assert!(!is_unsigned_number("-30"));
    }

    #[test]
    fn test_parse_number_feedback() {
        assert_eq!(parse_number("12"), Ok(12));
        assert_eq!(
            parse_number("abc"),
            Err("abc is not a valid number.".to_string())
        );
    }

    #[test]
    fn test_on_off_tokens() {
        for on in ["on", "YES", "true", "1"] {
            assert_eq!(parse_on_off(on), Some(true));
        }
        for off in ["off", "No", "FALSE", "0"] {
            assert_eq!(parse_on_off(off), Some(false));
        }
        assert_eq!(parse_on_off("maybe"), None);
    }
}
