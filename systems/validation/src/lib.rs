#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Solution validator that replays a recorded solution against its level.
//!
//! A validation builds the level's base grid, applies the solution's
//! placements under the level's tool limits, detonates bombs, traces one
//! pulse and compares what was delivered with what the solution promises.
//! Neither the level nor the solution is modified.

use std::{collections::BTreeMap, fmt};

use laser_grid_core::{
    position_keys, CellCoord, CoordParseError, Detonation, InvalidPlacement, Level, LevelError,
    Solution,
};
use laser_grid_system_bombs::detonate;
use laser_grid_system_completion::{evaluate, CompletionReport};
use laser_grid_system_propagation::{propagate_with, PropagationOutcome, PropagationRules};
use laser_grid_world::{self as world, Grid};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Bomb detonations followed by the beam trace of a single pulse.
#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
    /// Bombs that went off before the beams were traced.
    pub detonations: Vec<Detonation>,
    /// Beam trace over the post-blast grid.
    pub outcome: PropagationOutcome,
}

/// Resolves bombs and then traces beams over the cleared grid.
#[must_use]
pub fn pulse(grid: &Grid, rules: PropagationRules) -> Pulse {
    let blast = detonate(grid);
    let outcome = propagate_with(&blast.grid, rules);
    Pulse {
        detonations: blast.detonations,
        outcome,
    }
}

/// One way in which a replay disagreed with its solution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mismatch", rename_all = "snake_case")]
pub enum Mismatch {
    /// A target received a different energy than recorded.
    Target {
        /// Cell of the target.
        position: CellCoord,
        /// Energy the solution recorded.
        expected: u32,
        /// Energy the replay delivered.
        actual: u32,
    },
    /// The cycle guard verdict differed from the recorded one.
    Loop {
        /// Verdict the solution recorded.
        expected: bool,
        /// Verdict of the replay.
        actual: bool,
    },
    /// The summed target energy fell short of the recorded minimum.
    TotalEnergy {
        /// Minimum the solution recorded.
        minimum: u32,
        /// Total the replay delivered.
        actual: u64,
    },
    /// No bomb detonated at a recorded explosion cell.
    MissingExplosion {
        /// Cell where a detonation was expected.
        position: CellCoord,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target {
                position,
                expected,
                actual,
            } => write!(f, "target {position} expected {expected} but got {actual}"),
            Self::Loop { expected, actual } => {
                write!(f, "loop expected {expected} but got {actual}")
            }
            Self::TotalEnergy { minimum, actual } => {
                write!(f, "total energy {actual} below the minimum {minimum}")
            }
            Self::MissingExplosion { position } => write!(f, "no explosion at {position}"),
        }
    }
}

/// Errors that stop a solution from validating.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A placement of the solution was rejected.
    #[error(transparent)]
    InvalidPlacement(#[from] InvalidPlacement),
    /// The level itself could not be turned into a grid.
    #[error("malformed level: {0}")]
    MalformedLevel(#[from] LevelError),
    /// An expected target key of the solution could not be parsed.
    #[error("malformed solution: {0}")]
    MalformedSolution(#[from] CoordParseError),
    /// The replay disagreed with the solution.
    #[error("solution mismatch: {}", describe(.mismatches))]
    SolutionMismatch {
        /// Every disagreement found.
        mismatches: Vec<Mismatch>,
    },
}

fn describe(mismatches: &[Mismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Report of a single solution replay.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationResult {
    /// The replay matched every expectation of the solution.
    pub passed: bool,
    /// Energy delivered to every target of the level.
    #[serde(serialize_with = "position_keys::serialize")]
    pub actual: BTreeMap<CellCoord, u32>,
    /// Energy the solution recorded per target.
    #[serde(serialize_with = "position_keys::serialize")]
    pub expected: BTreeMap<CellCoord, u32>,
    /// Every disagreement, targets first in row-major order.
    pub mismatches: Vec<Mismatch>,
    /// Verdict on the level's own goals.
    pub completion: CompletionReport,
    /// Whether the cycle guard tripped during the replay.
    pub loop_detected: bool,
    /// Bombs that went off during the replay.
    pub detonations: Vec<Detonation>,
}

/// Replays `solution` on `level` with the default rules.
///
/// Disagreements are reported in the result rather than as an error; use
/// [`verify`] to turn them into [`ValidationError::SolutionMismatch`].
pub fn validate(level: &Level, solution: &Solution) -> Result<ValidationResult, ValidationError> {
    validate_with(level, solution, PropagationRules::default())
}

/// Replays `solution` on `level` with explicit rules.
pub fn validate_with(
    level: &Level,
    solution: &Solution,
    rules: PropagationRules,
) -> Result<ValidationResult, ValidationError> {
    let expected = solution.expected_energies()?;
    let base = Grid::from_level(level)?;
    let placements = world::placements_from_records(&solution.placements)?;
    let grid = world::apply_limited(&base, &placements, &level.tool_limits)?;

    let Pulse {
        detonations,
        outcome,
    } = pulse(&grid, rules);
    let mismatches = compare(solution, &expected, &detonations, &outcome);
    let completion = evaluate(&outcome.residual, level.goals(), &outcome);

    let passed = mismatches.is_empty();
    if passed {
        log::info!("solution for '{}' passed", level.name);
    } else {
        for mismatch in &mismatches {
            log::warn!("solution for '{}': {mismatch}", level.name);
        }
    }

    Ok(ValidationResult {
        passed,
        actual: outcome.target_energy,
        expected,
        mismatches,
        completion,
        loop_detected: outcome.loop_detected,
        detonations,
    })
}

/// Replays `solution` and fails unless it matches every expectation.
pub fn verify(level: &Level, solution: &Solution) -> Result<ValidationResult, ValidationError> {
    let result = validate(level, solution)?;
    if result.passed {
        Ok(result)
    } else {
        Err(ValidationError::SolutionMismatch {
            mismatches: result.mismatches,
        })
    }
}

/// Validates independent level/solution pairs in parallel.
///
/// Results come back in input order.
#[must_use]
pub fn validate_batch(
    cases: &[(Level, Solution)],
) -> Vec<Result<ValidationResult, ValidationError>> {
    cases
        .par_iter()
        .map(|(level, solution)| validate(level, solution))
        .collect()
}

fn compare(
    solution: &Solution,
    expected: &BTreeMap<CellCoord, u32>,
    detonations: &[Detonation],
    outcome: &PropagationOutcome,
) -> Vec<Mismatch> {
    let mut mismatches: Vec<Mismatch> = expected
        .iter()
        .filter_map(|(position, expected)| {
            let actual = outcome.energy_at(*position);
            (actual != *expected).then_some(Mismatch::Target {
                position: *position,
                expected: *expected,
                actual,
            })
        })
        .collect();

    if let Some(expected) = solution.expected_loop {
        if expected != outcome.loop_detected {
            mismatches.push(Mismatch::Loop {
                expected,
                actual: outcome.loop_detected,
            });
        }
    }

    if let Some(minimum) = solution.expected_total_energy {
        let actual = outcome.total_energy();
        if actual < u64::from(minimum) {
            mismatches.push(Mismatch::TotalEnergy { minimum, actual });
        }
    }

    mismatches.extend(
        solution
            .expected_explosions
            .iter()
            .filter(|position| !detonations.iter().any(|blast| blast.bomb == **position))
            .map(|position| Mismatch::MissingExplosion {
                position: *position,
            }),
    );

    mismatches
}
