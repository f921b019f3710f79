#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that decides whether a pulse solved a level.

use std::collections::BTreeMap;

use laser_grid_core::{CellCoord, LevelGoals};
use laser_grid_system_propagation::PropagationOutcome;
use laser_grid_world::{query, Grid};
use serde::Serialize;

/// Returns `true` when every target of `grid` received at least its
/// required energy. Targets missing from `target_energy` count as zero, and
/// a grid without targets is trivially complete.
#[must_use]
pub fn is_complete(grid: &Grid, target_energy: &BTreeMap<CellCoord, u32>) -> bool {
    query::targets(grid).all(|(cell, target)| {
        target_energy.get(&cell).copied().unwrap_or(0) >= target.required_energy
    })
}

/// Verdict on each goal of a level for one pulse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    /// Every target reached its required energy.
    pub targets_met: bool,
    /// The summed target energy reached the level's energy goal, if any.
    pub energy_goal_met: bool,
    /// The pulse tripped the cycle guard, when the level asks for a loop.
    pub loop_met: bool,
    /// All of the above held.
    pub complete: bool,
}

/// Checks every goal of a level against the outcome of a pulse.
#[must_use]
pub fn evaluate(grid: &Grid, goals: LevelGoals, outcome: &PropagationOutcome) -> CompletionReport {
    let targets_met = is_complete(grid, &outcome.target_energy);
    let energy_goal_met = goals
        .energy_goal
        .map_or(true, |goal| outcome.total_energy() >= u64::from(goal));
    let loop_met = !goals.loop_required || outcome.loop_detected;

    let report = CompletionReport {
        targets_met,
        energy_goal_met,
        loop_met,
        complete: targets_met && energy_goal_met && loop_met,
    };
    log::debug!("completion report: {report:?}");
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    use laser_grid_core::{Placement, Target};

    fn grid_with_target(required_energy: u32) -> Grid {
        let grid = Grid::new(3, 3).expect("grid");
        laser_grid_world::apply(
            &grid,
            &[Placement::Add {
                position: CellCoord::new(1, 1),
                element: laser_grid_core::Element::Target(Target {
                    required_energy,
                    label: String::new(),
                }),
            }],
        )
        .expect("target")
    }

    #[test]
    fn grids_without_targets_are_complete() {
        let grid = Grid::new(2, 2).expect("grid");
        assert!(is_complete(&grid, &BTreeMap::new()));
    }

    #[test]
    fn missing_entries_count_as_zero() {
        let grid = grid_with_target(1);
        assert!(!is_complete(&grid, &BTreeMap::new()));
    }

    #[test]
    fn surplus_energy_still_counts() {
        let grid = grid_with_target(3);
        let energy = BTreeMap::from([(CellCoord::new(1, 1), 30)]);
        assert!(is_complete(&grid, &energy));

        let short = BTreeMap::from([(CellCoord::new(1, 1), 2)]);
        assert!(!is_complete(&grid, &short));
    }
}
