#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves bomb blasts before beams are traced.

use laser_grid_core::{CellCoord, Detonation};
use laser_grid_world::{edit, query, Grid};

/// Grid left behind by a round of detonations.
#[derive(Clone, Debug, PartialEq)]
pub struct BlastOutcome {
    /// Grid with the bombs and the obstacles they cleared removed.
    pub grid: Grid,
    /// One record per bomb, in row-major order of the bombs.
    pub detonations: Vec<Detonation>,
}

/// Detonates every bomb on the grid at once.
///
/// Each bomb destroys every destructible obstacle within its power, measured
/// in Chebyshev distance, regardless of remaining durability. Blast areas are
/// computed against the grid as it was before any bomb went off, so the
/// result does not depend on the order of the bombs. Indestructible
/// obstacles are untouched. Every bomb is consumed.
#[must_use]
pub fn detonate(grid: &Grid) -> BlastOutcome {
    let bombs: Vec<_> = query::bombs(grid).collect();
    if bombs.is_empty() {
        return BlastOutcome {
            grid: grid.clone(),
            detonations: Vec::new(),
        };
    }

    let destructible: Vec<CellCoord> = query::obstacles(grid)
        .filter(|(_, obstacle)| obstacle.destructible)
        .map(|(cell, _)| cell)
        .collect();

    let detonations: Vec<Detonation> = bombs
        .into_iter()
        .map(|(cell, bomb)| Detonation {
            bomb: cell,
            power: bomb.power,
            cleared: destructible
                .iter()
                .copied()
                .filter(|obstacle| cell.chebyshev_distance(*obstacle) <= bomb.power)
                .collect(),
        })
        .collect();

    let mut next = grid.clone();
    for detonation in &detonations {
        log::debug!(
            "bomb at {} (power {}) cleared {} obstacle(s)",
            detonation.bomb,
            detonation.power,
            detonation.cleared.len()
        );
        let _ = edit::remove_occupant(&mut next, detonation.bomb);
        for obstacle in &detonation.cleared {
            let _ = edit::remove_occupant(&mut next, *obstacle);
        }
    }

    BlastOutcome {
        grid: next,
        detonations,
    }
}
