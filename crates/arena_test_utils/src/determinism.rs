//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the round engine produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! A round must be exactly reproducible from the game before it and the
//! command files submitted for it. Sources of non-determinism include:
//!
//! - **Floating-point drift**: positions and headings are stored in fixed
//!   point via [`arena_core::math::Fixed`]; trigonometry results are
//!   quantized back before they are stored.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The engine only uses ordered maps and iterates in entity id order.
//!
//! - **Entity creation order**: payloads launched during a tick get ids in
//!   the order their launchers fire, which follows id order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual phases (damage, movement, scans)
//! 2. **Property tests**: Random command files must still replay exactly
//! 3. **Integration tests**: Full multi-round scenarios are reproducible
//! 4. **Parallel tests**: Running N games in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arena_core::game::Game;

use crate::fixtures::Scenario;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of rounds played.
    pub rounds: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Round engine is non-deterministic!\n\
                 Runs: {}\n\
                 Rounds: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.rounds,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a game multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the game
/// * `rounds` - Number of rounds to play per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to play one round
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use arena_test_utils::determinism::verify_determinism;
/// use arena_test_utils::fixtures::laser_duel;
///
/// let result = verify_determinism(
///     5, // Run 5 times
///     2, // 2 rounds each
///     laser_duel,
///     |s| { s.play_next(); },
///     |s| s.game.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    rounds: u32,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..rounds {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        rounds,
    }
}

/// Play a scenario twice and compare the final game hashes.
pub fn verify_scenario_determinism<F>(setup_fn: F, rounds: u32) -> bool
where
    F: Fn() -> Scenario,
{
    let result = verify_determinism(
        2,
        rounds,
        &setup_fn,
        |scenario| {
            scenario.play_next();
        },
        |scenario| scenario.game.state_hash(),
    );
    result.is_deterministic
}

/// Play N copies of a scenario on separate threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a scenario thread panics.
pub fn run_parallel_scenarios<F>(setup_fn: F, num_games: usize, rounds: u32) -> DeterminismResult
where
    F: Fn() -> Scenario + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_games)
            .map(|_| {
                s.spawn(|| {
                    let mut scenario = setup_fn();
                    scenario.play(rounds);
                    scenario.game.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("scenario thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        rounds,
    }
}

/// Compare two runs round by round, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(round)` for the first round after which
/// they differ (0 means they differed right after setup).
pub fn find_first_divergence<F>(setup_fn: F, rounds: u32) -> Option<u32>
where
    F: Fn() -> Scenario,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.game.state_hash() != second.game.state_hash() {
        return Some(0);
    }

    for round in 1..=rounds {
        first.play_next();
        second.play_next();

        let (a, b) = (first.game.state_hash(), second.game.state_hash());
        if a != b {
            tracing::warn!(round, first = a, second = b, "Scenario runs diverged");
            return Some(round);
        }
    }

    None
}

/// Verify that a save/restore round trip preserves the game exactly, and
/// that the restored game plays on identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, rounds: u32) -> bool
where
    F: Fn() -> Scenario,
{
    let mut scenario = setup_fn();
    scenario.play(rounds);

    let bytes = match scenario.game.serialize() {
        Ok(b) => b,
        Err(_) => return false,
    };
    let restored = match Game::deserialize(&bytes) {
        Ok(g) => g,
        Err(_) => return false,
    };
    if restored.state_hash() != scenario.game.state_hash() {
        return false;
    }

    let mut copy = Scenario {
        game: restored,
        ..scenario.clone()
    };
    let original = scenario.play_next();
    let replayed = copy.play_next();
    original.state_hash == replayed.state_hash
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for command files.
///
/// These generate command lines that are mostly valid for the built-in
/// ship classes, with some noise mixed in.
pub mod strategies {
    use proptest::prelude::*;

    /// A tick inside the round.
    pub fn arb_tick() -> impl Strategy<Value = u8> {
        1u8..=10
    }

    /// A compass heading in whole degrees.
    pub fn arb_heading() -> impl Strategy<Value = i32> {
        0i32..360
    }

    /// An acceleration line, sometimes beyond the ship's limit.
    pub fn arb_accelerate_line() -> impl Strategy<Value = String> {
        (arb_tick(), -30i32..=30).prop_map(|(t, dv)| format!("{t}: A{dv}"))
    }

    /// A turn line (`L`, `R` or `H`).
    pub fn arb_turn_line() -> impl Strategy<Value = String> {
        (arb_tick(), prop_oneof![Just("L"), Just("R"), Just("H")], 0i32..360)
            .prop_map(|(t, name, deg)| format!("{t}: {name}{deg}"))
    }

    /// A fire line for a weapon every built-in warship carries.
    pub fn arb_fire_line(target: &'static str) -> impl Strategy<Value = String> {
        (
            arb_tick(),
            prop_oneof![
                Just("F G 0 30".to_string()),
                Just("F R1 0".to_string()),
                Just(format!("F L1 {target}")),
            ],
        )
            .prop_map(|(t, order)| format!("{t}: {order}"))
    }

    /// A line that is not a command at all.
    pub fn arb_noise_line() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("hello".to_string()),
            Just("11: A5".to_string()),
            Just("3: Warp 9".to_string()),
            Just("# comment".to_string()),
        ]
    }

    /// Any line.
    pub fn arb_command_line(target: &'static str) -> impl Strategy<Value = String> {
        prop_oneof![
            4 => arb_accelerate_line(),
            4 => arb_turn_line(),
            2 => arb_fire_line(target),
            1 => arb_noise_line(),
        ]
    }

    /// A command file of up to `max_lines` lines.
    pub fn arb_command_file(target: &'static str, max_lines: usize) -> impl Strategy<Value = String> {
        proptest::collection::vec(arb_command_line(target), 0..max_lines)
            .prop_map(|lines| lines.join("\n"))
    }

    /// A heading and its matching `H` line.
    pub fn arb_heading_line() -> impl Strategy<Value = (i32, String)> {
        (arb_tick(), arb_heading()).prop_map(|(t, h)| (h, format!("{t}: H{h}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{command_files, idle_duel, laser_duel, melee};
    use proptest::prelude::*;

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 10, || 0u64, |x| *x += 1, |x| *x);
        assert!(result.is_deterministic);
        assert_eq!(result.unique_hashes(), vec![10]);
    }

    #[test]
    fn test_idle_duel_determinism() {
        assert!(verify_scenario_determinism(idle_duel, 3));
    }

    #[test]
    fn test_laser_duel_determinism() {
        assert!(verify_scenario_determinism(laser_duel, 2));
    }

    #[test]
    fn test_melee_determinism() {
        verify_determinism(3, 2, melee, |s| { s.play_next(); }, |s| s.game.state_hash())
            .assert_deterministic();
    }

    #[test]
    fn test_find_divergence_on_deterministic_game() {
        assert_eq!(find_first_divergence(melee, 2), None);
    }

    #[test]
    fn test_serialization_preserves_melee() {
        assert!(verify_serialization_determinism(melee, 1));
    }

    #[test]
    fn test_parallel_melee() {
        run_parallel_scenarios(melee, 4, 2).assert_deterministic();
    }

    #[test]
    fn test_different_commands_diverge() {
        let hashes: Vec<u64> = ["1: A10", "1: A-10"]
            .iter()
            .map(|order| {
                let mut scenario = idle_duel();
                scenario.rounds = vec![command_files(&[("Ajax", *order)])];
                scenario.play_next();
                scenario.game.state_hash()
            })
            .collect();
        assert_ne!(hashes[0], hashes[1]);
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&"arena"), compute_hash(&"arena"));
        assert_ne!(compute_hash(&1u32), compute_hash(&2u32));
    }

    // =========================================================================
    // Property-based tests using proptest
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Any command files replay to the same state.
        #[test]
        fn prop_random_command_files_are_replayable(
            ajax in strategies::arb_command_file("Bremen", 12),
            bremen in strategies::arb_command_file("Ajax", 12),
        ) {
            let setup = || {
                let mut scenario = idle_duel();
                scenario.rounds = vec![command_files(&[("Ajax", ajax.as_str()), ("Bremen", bremen.as_str())])];
                scenario
            };
            let result = verify_determinism(2, 1, setup, |s| { s.play_next(); }, |s| s.game.state_hash());
            prop_assert!(result.is_deterministic);
        }

        /// An `H` line on a ship at rest always ends on that heading.
        #[test]
        fn prop_heading_command_is_exact((heading, line) in strategies::arb_heading_line()) {
            let mut scenario = idle_duel();
            scenario.rounds = vec![command_files(&[("Ajax", line.as_str())])];
            scenario.play_next();
            let ajax = scenario.game.entity_by_name("Ajax").unwrap();
            let actual = ajax.vector.heading_f64();
            let diff = (actual - f64::from(heading)).abs();
            prop_assert!(diff < 1e-6 || (360.0 - diff) < 1e-6, "heading {actual} != {heading}");
        }
    }
}
