//! Player command files.
//!
//! A command file holds one order per line, `<tick>:<NAME><param> <param>...`:
//!
//! ```text
//! # close in and fire
//! 1: A20
//! 1: L30
//! 3: Fire L1 Bremen
//! 4: Boost N 40
//! ```
//!
//! [`parse_commands`] validates every line against the acting entity and
//! groups the results per tick into [`CommandSet`]s. Player mistakes never
//! fail the parse: they come back as invalid commands with feedback.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::Quadrant;
use crate::entity::Entity;
use crate::math::normalize_heading;
use crate::parameters::{
    is_unsigned_number, is_valid_number, parse_number, ParamValue, Parameter, ValidationContext,
};
use crate::tick::TICKS_PER_ROUND;

const STRUCTURE_FEEDBACK: &str =
    "Missing basic '<tick number>:<command><parameter> <parameter>' structure";

/// Command named on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// `L`, `R` or `H`.
    Turn,
    /// `A`.
    Accelerate,
    /// `F` or `Fire`.
    Fire,
    /// `Replenish`.
    Replenish,
    /// `Boost`.
    Boost,
    /// `Activation` or `Activate`.
    Activation,
    /// Anything else. Never valid.
    Unknown,
}

impl CommandKind {
    /// Kind for a command name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "L" | "R" | "H" => Self::Turn,
            "A" => Self::Accelerate,
            "F" | "FIRE" => Self::Fire,
            "REPLENISH" => Self::Replenish,
            "BOOST" => Self::Boost,
            "ACTIVATION" | "ACTIVATE" => Self::Activation,
            _ => Self::Unknown,
        }
    }
}

/// Validated intent of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Change speed.
    Accelerate(i32),
    /// Turn by degrees, positive is clockwise.
    Turn(f64),
    /// Turn to an absolute heading.
    Heading(f64),
    /// Fire a weapon.
    Fire {
        /// Weapon name.
        weapon: String,
        /// Weapon inputs in declaration order.
        params: Vec<ParamValue>,
    },
    /// Dock at a starbase in reach.
    Replenish,
    /// Move battery energy into a shield quadrant.
    Boost {
        /// Quadrant to boost.
        quadrant: Quadrant,
        /// Energy to move.
        amount: i32,
    },
    /// Switch a component on or off.
    Activation {
        /// Component name.
        component: String,
        /// New state.
        on: bool,
    },
}

/// One parsed line of a command file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Line number, starting at 1.
    pub line: usize,
    /// Tick within the round.
    pub tick: u8,
    /// Line as written.
    pub text: String,
    /// Command name.
    pub kind: CommandKind,
    /// What to do, `None` when the command is invalid.
    pub action: Option<Action>,
    /// Messages for the player.
    pub feedback: Vec<String>,
}

impl Command {
    /// Whether the command will be executed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.action.is_some()
    }
}

/// Merged turn orders of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Turning {
    /// Absolute heading ordered with `H`, if any.
    pub absolute: Option<f64>,
    /// Sum of `L`/`R` turns.
    pub delta: f64,
}

impl Turning {
    /// Turn to perform from `heading`.
    ///
    /// An absolute heading becomes the shortest signed turn towards it.
    #[must_use]
    pub fn resolve(&self, heading: f64) -> f64 {
        let to_heading = self
            .absolute
            .map_or(0.0, |h| crate::math::normalize_bearing(h - heading));
        to_heading + self.delta
    }
}

/// All commands of one entity for one tick, in execution groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandSet {
    /// Sum of all `A` commands.
    pub acceleration: Option<i32>,
    /// Merged turn commands.
    pub turning: Option<Turning>,
    /// Accelerate and turn commands that were merged above.
    pub movement: Vec<Command>,
    /// Fire commands by weapon name.
    pub weapons: BTreeMap<String, Command>,
    /// Commands run before moving (activations).
    pub pre_move: Vec<Command>,
    /// Commands run after moving (replenish, boost).
    pub post_move: Vec<Command>,
    /// Fire commands overridden by a later line for the same weapon.
    pub replaced: Vec<Command>,
    /// Invalid commands. Never executed.
    pub errors: Vec<Command>,
}

impl CommandSet {
    /// File a command in its group.
    pub fn add(&mut self, mut cmd: Command) {
        match &cmd.action {
            None => self.errors.push(cmd),
            Some(Action::Accelerate(delta_v)) => {
                self.acceleration = Some(self.acceleration.unwrap_or(0) + delta_v);
                self.movement.push(cmd);
            }
            Some(Action::Turn(angle)) => {
                self.turning.get_or_insert_with(Turning::default).delta += angle;
                self.movement.push(cmd);
            }
            Some(Action::Heading(heading)) => {
                self.turning.get_or_insert_with(Turning::default).absolute = Some(*heading);
                self.movement.push(cmd);
            }
            Some(Action::Fire { weapon, .. }) => {
                let weapon = weapon.clone();
                if let Some(mut earlier) = self.weapons.remove(&weapon) {
                    earlier
                        .feedback
                        .push(format!("Replaced by fire command on line {}.", cmd.line));
                    cmd.feedback
                        .push(format!("Replaces earlier fire command on line {}.", earlier.line));
                    self.replaced.push(earlier);
                }
                self.weapons.insert(weapon, cmd);
            }
            Some(Action::Activation { .. }) => self.pre_move.push(cmd),
            Some(Action::Replenish | Action::Boost { .. }) => self.post_move.push(cmd),
        }
    }

    /// Every command in the set.
    pub fn all(&self) -> impl Iterator<Item = &Command> {
        self.movement
            .iter()
            .chain(self.weapons.values())
            .chain(&self.pre_move)
            .chain(&self.post_move)
            .chain(&self.replaced)
            .chain(&self.errors)
    }
}

/// A line without command structure, or for a tick outside the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedLine {
    /// Line number, starting at 1.
    pub line: usize,
    /// Line as written.
    pub text: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Feedback for one line, for pre-submission checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFeedback {
    /// Line number, starting at 1.
    pub line: usize,
    /// Line as written.
    pub text: String,
    /// Whether the line will be executed.
    pub is_valid: bool,
    /// Messages for the player.
    pub messages: Vec<String>,
}

/// Result of parsing a whole command file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedCommands {
    /// Commands per tick.
    pub sets: BTreeMap<u8, CommandSet>,
    /// Lines that could not be read as a command.
    pub rejected: Vec<RejectedLine>,
}

impl ParsedCommands {
    /// Per-line feedback in file order.
    #[must_use]
    pub fn feedback(&self) -> Vec<LineFeedback> {
        let mut lines: Vec<LineFeedback> = self
            .sets
            .values()
            .flat_map(CommandSet::all)
            .map(|cmd| LineFeedback {
                line: cmd.line,
                text: cmd.text.clone(),
                is_valid: cmd.is_valid(),
                messages: cmd.feedback.clone(),
            })
            .chain(self.rejected.iter().map(|r| LineFeedback {
                line: r.line,
                text: r.text.clone(),
                is_valid: false,
                messages: vec![r.reason.clone()],
            }))
            .collect();
        lines.sort_by_key(|l| l.line);
        lines
    }

    /// Whether every line is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rejected.is_empty()
            && self
                .sets
                .values()
                .all(|set| set.errors.is_empty())
    }
}

/// `<tick>:<NAME><params>` split into its parts.
struct CommandLine<'a> {
    tick: &'a str,
    name: &'a str,
    params: Vec<&'a str>,
}

impl<'a> CommandLine<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let (tick, rest) = text.split_once(':')?;
        if tick.is_empty() || !tick.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let rest = rest.trim_start();
        let name_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if name_len == 0 {
            return None;
        }
        let (name, params) = rest.split_at(name_len);
        let well_formed = params
            .chars()
            .all(|c| c.is_whitespace() || c.is_alphanumeric() || c == '_' || c == '-');
        if !well_formed {
            return None;
        }
        Some(Self {
            tick,
            name,
            params: params.split_whitespace().collect(),
        })
    }
}

/// Parse and validate a command file for `actor`.
///
/// `known_names` are the names of every object in space, used to resolve
/// targets.
#[must_use]
pub fn parse_commands(text: &str, actor: &Entity, known_names: &BTreeSet<String>) -> ParsedCommands {
    let ctx = ValidationContext { actor, known_names };
    let mut parsed = ParsedCommands::default();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let reject = |reason: String| RejectedLine {
            line,
            text: text.to_string(),
            reason,
        };
        let Some(command_line) = CommandLine::parse(text) else {
            parsed.rejected.push(reject(STRUCTURE_FEEDBACK.to_string()));
            continue;
        };
        let tick = match command_line.tick.parse::<u8>() {
            Ok(t) if (1..=TICKS_PER_ROUND).contains(&t) => t,
            _ => {
                parsed.rejected.push(reject(format!(
                    "Tick {} is outside the round (1 to {TICKS_PER_ROUND}).",
                    command_line.tick
                )));
                continue;
            }
        };

        let kind = CommandKind::from_name(command_line.name);
        let mut feedback = Vec::new();
        let action = validate(kind, &command_line, &ctx, &mut feedback);
        if action.is_none() {
            tracing::debug!(entity = %actor.name, line, text, ?feedback, "Invalid command");
        }
        parsed.sets.entry(tick).or_default().add(Command {
            line,
            tick,
            text: text.to_string(),
            kind,
            action,
            feedback,
        });
    }
    parsed
}

fn expect_count(params: &[&str], expected: usize, feedback: &mut Vec<String>) -> bool {
    if params.len() == expected {
        return true;
    }
    let noun = if expected == 1 { "parameter" } else { "parameters" };
    feedback.push(format!("Expected {expected} {noun}, got {}", params.len()));
    false
}

/// Validate each token against its parameter, collecting all feedback.
fn validate_params(
    expected: &[Parameter],
    tokens: &[&str],
    ctx: &ValidationContext<'_>,
    feedback: &mut Vec<String>,
) -> Option<Vec<ParamValue>> {
    if tokens.len() != expected.len() {
        feedback.push(format!(
            "Expected {} parameters, got {}",
            expected.len(),
            tokens.len()
        ));
        return None;
    }
    let mut values = Vec::with_capacity(tokens.len());
    let mut ok = true;
    for (param, token) in expected.iter().zip(tokens) {
        match param.validate(token, ctx) {
            Ok(value) => values.push(value),
            Err(message) => {
                feedback.push(message);
                ok = false;
            }
        }
    }
    ok.then_some(values)
}

fn validate_turn(name: &str, token: &str, max_turn: i32, feedback: &mut Vec<String>) -> Option<Action> {
    if !is_unsigned_number(token) {
        if is_valid_number(token) {
            feedback.push(format!("{token} must not be negative: use L or R for the direction."));
        } else {
            feedback.push(format!("{token} is not a valid number."));
        }
        return None;
    }
    let value = match parse_number(token) {
        Ok(v) => v,
        Err(message) => {
            feedback.push(message);
            return None;
        }
    };
    let angle = f64::from(value);
    match name.to_ascii_uppercase().as_str() {
        "H" => Some(Action::Heading(normalize_heading(angle))),
        upper => {
            if value > max_turn {
                feedback.push(format!("{token} is outside max turn, but possible at speed 0."));
            }
            Some(Action::Turn(if upper == "L" { -angle } else { angle }))
        }
    }
}

fn validate(
    kind: CommandKind,
    line: &CommandLine<'_>,
    ctx: &ValidationContext<'_>,
    feedback: &mut Vec<String>,
) -> Option<Action> {
    let actor = ctx.actor;
    let params = line.params.as_slice();
    match kind {
        CommandKind::Unknown => {
            feedback.push("Unknown command.".to_string());
            None
        }
        CommandKind::Accelerate => {
            if !expect_count(params, 1, feedback) {
                return None;
            }
            let max_delta_v = actor.ship_state().map_or(0, |s| s.max_delta_v);
            match parse_number(params[0]) {
                Ok(v) if v.unsigned_abs() <= max_delta_v.unsigned_abs() => Some(Action::Accelerate(v)),
                Ok(_) => {
                    feedback.push(format!("{} is outside max acceleration.", params[0]));
                    None
                }
                Err(message) => {
                    feedback.push(message);
                    None
                }
            }
        }
        CommandKind::Turn => {
            if !expect_count(params, 1, feedback) {
                return None;
            }
            let max_turn = actor.ship_state().map_or(0, |s| s.max_turn);
            validate_turn(line.name, params[0], max_turn, feedback)
        }
        CommandKind::Fire => {
            let Some((selector, inputs)) = params.split_first() else {
                feedback.push("Expected parameters (component) (component parameters...)".to_string());
                return None;
            };
            let Some(weapon) = actor.weapons.get(*selector).filter(|c| c.is_weapon()) else {
                feedback.push(format!("{selector} is not a weapon of {}.", actor.name));
                return None;
            };
            let values = validate_params(&weapon.expected_parameters(), inputs, ctx, feedback)?;
            Some(Action::Fire {
                weapon: weapon.name.clone(),
                params: values,
            })
        }
        CommandKind::Activation => {
            let Some((selector, inputs)) = params.split_first() else {
                feedback.push("Expected parameters (component) (component parameters...)".to_string());
                return None;
            };
            let Some(component) = actor.component(selector) else {
                feedback.push(format!("{selector} is not a component of {}.", actor.name));
                return None;
            };
            let Some(expected) = component.activation_parameters() else {
                feedback.push(format!("{selector} can not be switched on or off."));
                return None;
            };
            let values = validate_params(&expected, inputs, ctx, feedback)?;
            match values.as_slice() {
                [ParamValue::Flag(on)] => Some(Action::Activation {
                    component: component.name.clone(),
                    on: *on,
                }),
                _ => {
                    feedback.push(format!("{selector} expects on or off."));
                    None
                }
            }
        }
        CommandKind::Boost => {
            let Some(shields) = actor.shields() else {
                feedback.push("Can not find a Shield component.".to_string());
                return None;
            };
            if !expect_count(params, 2, feedback) {
                return None;
            }
            let quadrant = match Parameter::Quadrant.validate(params[0], ctx) {
                Ok(ParamValue::Quadrant(q)) => q,
                Ok(_) => return None,
                Err(message) => {
                    feedback.push(message);
                    return None;
                }
            };
            let amount = Parameter::NumberInRange {
                label: "Boost",
                min: 0,
                max: shields.boost_limit(quadrant),
            };
            match amount.validate(params[1], ctx) {
                Ok(ParamValue::Number(amount)) => Some(Action::Boost { quadrant, amount }),
                Ok(_) => None,
                Err(message) => {
                    feedback.push(message);
                    None
                }
            }
        }
        CommandKind::Replenish => {
            if params.is_empty() {
                Some(Action::Replenish)
            } else {
                feedback.push("Replenish command takes no arguments.".to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Catalog;
    use crate::factions::FactionId;
    use crate::math::Point;
    use crate::tick::TICK_ZERO;
    use proptest::prelude::*;

    fn actor(class: &str) -> Entity {
        let catalog = Catalog::builtin().unwrap();
        Entity::new_ship(
            "Ajax",
            catalog.ship_class(class).unwrap(),
            &catalog.rules,
            FactionId::new("Red"),
            "alice",
            Point::ORIGIN,
            TICK_ZERO,
        )
    }

    fn names() -> BTreeSet<String> {
        ["Ajax", "Bremen"].into_iter().map(String::from).collect()
    }

    fn parse(text: &str) -> ParsedCommands {
        parse_commands(text, &actor("H2545"), &names())
    }

    #[test]
    fn test_accelerations_merge() {
        let twice = parse("1: A10\n1: A10\n");
        let once = parse("1: A20\n");
        assert_eq!(twice.sets[&1].acceleration, Some(20));
        assert_eq!(twice.sets[&1].acceleration, once.sets[&1].acceleration);
        assert_eq!(twice.sets[&1].movement.len(), 2);
    }

    #[test]
    fn test_extreme_acceleration_is_rejected() {
        let parsed = parse("1: A-2147483648\n");
        assert!(!parsed.is_valid());
        let feedback = parsed.feedback();
        assert!(!feedback[0].is_valid);
        assert!(feedback[0].messages.iter().any(|m| m == "-2147483648 is outside max acceleration."));
    }

    #[test]
    fn test_turns_merge_with_heading() {
        let parsed = parse("2: H90\n2: L10\n2: R25\n");
        let turning = parsed.sets[&2].turning.unwrap();
        assert_eq!(turning.absolute, Some(90.0));
        assert_eq!(turning.delta, 15.0);
        // from heading 350 the shortest way to 90 is +100
        assert_eq!(turning.resolve(350.0), 115.0);
    }

    #[test]
    fn test_invalid_commands_are_filed_as_errors() {
        let parsed = parse("1: Fire X9 Bremen\n1: A99\n1: Warp 9\n");
        let set = &parsed.sets[&1];
        assert_eq!(set.errors.len(), 3);
        assert!(set.acceleration.is_none());
        assert!(set.weapons.is_empty());
        assert_eq!(set.errors[1].feedback, vec!["99 is outside max acceleration."]);
        assert_eq!(set.errors[2].kind, CommandKind::Unknown);
        assert_eq!(set.errors[2].feedback, vec!["Unknown command."]);
        assert!(!parsed.is_valid());
    }

    #[test]
    fn test_fire_validates_parameters() {
        let parsed = parse("3: Fire L1 Bremen\n3: F R1 45\n3: Fire L1 Ajax\n3: F S1 180\n");
        let set = &parsed.sets[&3];
        assert_eq!(
            set.weapons["L1"].action,
            Some(Action::Fire {
                weapon: "L1".into(),
                params: vec![ParamValue::Object("Bremen".into())],
            })
        );
        assert!(set.weapons.contains_key("R1"));
        assert_eq!(set.errors.len(), 2);
        assert_eq!(set.errors[0].feedback, vec!["Can not target yourself."]);
        assert!(set.errors[1].feedback[0].contains("outside firing arc"));
    }

    #[test]
    fn test_fire_parameter_count() {
        let parsed = parse("3: Fire G 0\n3: Fire\n");
        let set = &parsed.sets[&3];
        assert_eq!(set.errors[0].feedback, vec!["Expected 2 parameters, got 1"]);
        assert_eq!(
            set.errors[1].feedback,
            vec!["Expected parameters (component) (component parameters...)"]
        );
    }

    #[test]
    fn test_second_fire_replaces_first() {
        let parsed = parse("4: Fire R1 0\n4: Fire R1 90\n");
        let set = &parsed.sets[&4];
        assert_eq!(set.weapons["R1"].line, 2);
        assert_eq!(set.replaced.len(), 1);
        assert!(set.weapons["R1"].feedback[0].contains("line 1"));
    }

    #[test]
    fn test_turn_warning_keeps_command_valid() {
        let parsed = parse("1: L90\n1: R-5\n");
        let set = &parsed.sets[&1];
        assert_eq!(set.turning.map(|t| t.delta), Some(-90.0));
        assert!(set.movement[0].feedback[0].contains("possible at speed 0"));
        assert_eq!(set.errors.len(), 1);
    }

    #[test]
    fn test_boost_and_replenish() {
        let parsed = parse("5: Boost N 300\n5: Boost N 301\n5: Boost Q 10\n5: Replenish\n5: Replenish now\n");
        let set = &parsed.sets[&5];
        assert_eq!(set.post_move.len(), 2);
        assert_eq!(
            set.post_move[0].action,
            Some(Action::Boost {
                quadrant: Quadrant::N,
                amount: 300
            })
        );
        assert_eq!(set.errors.len(), 3);
        assert_eq!(set.errors[2].feedback, vec!["Replenish command takes no arguments."]);
    }

    #[test]
    fn test_activation() {
        let parsed = parse_commands(
            "1: Activate C1 on\n1: Activation Shields off\n1: Activate C1 maybe\n",
            &actor("H2552"),
            &names(),
        );
        let set = &parsed.sets[&1];
        assert_eq!(
            set.pre_move[0].action,
            Some(Action::Activation {
                component: "C1".into(),
                on: true
            })
        );
        assert_eq!(set.errors[0].feedback, vec!["Shields can not be switched on or off."]);
        assert_eq!(set.errors.len(), 2);
    }

    #[test]
    fn test_rejected_lines_and_comments() {
        let parsed = parse("# plan\n\n0: A10\n11: A10\nA10\n1: A10.5\n");
        assert!(parsed.sets.is_empty());
        let lines: Vec<usize> = parsed.rejected.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);
        assert_eq!(parsed.rejected[2].reason, STRUCTURE_FEEDBACK);
    }

    #[test]
    fn test_feedback_in_file_order() {
        let parsed = parse("2: A5\nnonsense\n1: Warp\n");
        let feedback = parsed.feedback();
        let lines: Vec<usize> = feedback.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(feedback[0].is_valid);
        assert!(!feedback[1].is_valid);
    }

    proptest! {
        #[test]
        fn prop_acceleration_merge_is_sum(values in proptest::collection::vec(-25i32..=25, 1..5)) {
            let text: String = values.iter().map(|v| format!("1: A{v}\n")).collect();
            let parsed = parse(&text);
            prop_assert_eq!(parsed.sets[&1].acceleration, Some(values.iter().sum::<i32>()));
        }
    }
}
