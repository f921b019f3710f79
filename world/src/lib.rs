#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid state for the laser grid engine.
//!
//! A [`Grid`] is an immutable snapshot: every edit goes through [`apply`],
//! which returns a new grid and leaves its input untouched. Layers are shared
//! between snapshots behind reference counts and copied only when an edit
//! actually touches them, so keeping old snapshots around for undo is cheap.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use laser_grid_core::{
    CellCoord, Element, ElementKind, InvalidPlacement, Level, LevelError, Occupant, Placement,
    PlacementError, PlacementRecord, Target,
};

/// Snapshot of every element on the board.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Arc<Vec<Option<Occupant>>>,
    targets: Arc<BTreeMap<CellCoord, Target>>,
    emitters: Arc<Vec<CellCoord>>,
}

impl Grid {
    /// Creates an empty grid with the provided dimensions.
    pub fn new(columns: u32, rows: u32) -> Result<Self, LevelError> {
        if columns == 0 || rows == 0 {
            return Err(LevelError::EmptyGrid {
                width: columns,
                height: rows,
            });
        }

        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).map_err(|_| {
            LevelError::EmptyGrid {
                width: columns,
                height: rows,
            }
        })?;
        Ok(Self {
            columns,
            rows,
            cells: Arc::new(vec![None; capacity]),
            targets: Arc::new(BTreeMap::new()),
            emitters: Arc::new(Vec::new()),
        })
    }

    /// Builds the grid described by a level document.
    pub fn from_level(level: &Level) -> Result<Self, LevelError> {
        let empty = Self::new(level.width, level.height)?;
        apply(&empty, &level.placements())
            .map_err(|rejected| LevelError::InvalidElement(rejected.reason))
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the cell lies within the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<&Occupant> {
        self.index(cell)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    pub(crate) fn slot_mut(&mut self, cell: CellCoord) -> Option<&mut Option<Occupant>> {
        let index = self.index(cell)?;
        Arc::make_mut(&mut self.cells).get_mut(index)
    }

    fn place(&mut self, position: CellCoord, element: Element) -> Result<(), PlacementError> {
        match element {
            Element::Target(target) => {
                if self.targets.contains_key(&position) {
                    return Err(PlacementError::Occupied {
                        position,
                        occupant: ElementKind::Target,
                    });
                }
                let _ = Arc::make_mut(&mut self.targets).insert(position, target);
            }
            Element::Occupant(occupant) => {
                if let Some(existing) = self.occupant(position) {
                    return Err(PlacementError::Occupied {
                        position,
                        occupant: existing.kind(),
                    });
                }
                if matches!(occupant, Occupant::Emitter(_)) {
                    Arc::make_mut(&mut self.emitters).push(position);
                }
                if let Some(slot) = self.slot_mut(position) {
                    *slot = Some(occupant);
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, position: CellCoord, kind: ElementKind) -> Result<(), PlacementError> {
        if kind == ElementKind::Target {
            if self.targets.contains_key(&position) {
                let _ = Arc::make_mut(&mut self.targets).remove(&position);
            }
            return Ok(());
        }

        match self.occupant(position).map(Occupant::kind) {
            None => Ok(()),
            Some(found) if found != kind => Err(PlacementError::KindMismatch {
                position,
                expected: kind,
                found,
            }),
            Some(_) => {
                let _ = edit::remove_occupant(self, position);
                Ok(())
            }
        }
    }
}

/// Applies the placements in order, producing a new grid.
///
/// The first illegal placement aborts the whole batch; `grid` itself is
/// never modified, so callers keep a consistent snapshot either way.
pub fn apply(grid: &Grid, placements: &[Placement]) -> Result<Grid, InvalidPlacement> {
    let mut next = grid.clone();
    for (index, placement) in placements.iter().enumerate() {
        apply_one(&mut next, placement).map_err(|reason| {
            log::debug!("rejected placement #{index}: {reason}");
            InvalidPlacement { index, reason }
        })?;
    }
    Ok(next)
}

/// Applies the placements while enforcing per-kind limits on `add` operations.
///
/// `limits` is keyed by element kind name, as in level documents. Kinds
/// without an entry are unlimited.
pub fn apply_limited(
    grid: &Grid,
    placements: &[Placement],
    limits: &BTreeMap<String, u32>,
) -> Result<Grid, InvalidPlacement> {
    let mut used: HashMap<ElementKind, u32> = HashMap::new();
    for (index, placement) in placements.iter().enumerate() {
        let Placement::Add { element, .. } = placement else {
            continue;
        };
        let kind = element.kind();
        let Some(&limit) = limits.get(kind.as_str()) else {
            continue;
        };
        let count = used.entry(kind).or_insert(0);
        *count += 1;
        if *count > limit {
            return Err(InvalidPlacement {
                index,
                reason: PlacementError::ToolLimitExceeded { kind, limit },
            });
        }
    }
    apply(grid, placements)
}

/// Converts loosely-typed records into typed placements.
pub fn placements_from_records(
    records: &[PlacementRecord],
) -> Result<Vec<Placement>, InvalidPlacement> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .to_placement()
                .map_err(|reason| InvalidPlacement { index, reason })
        })
        .collect()
}

/// Converts and applies loosely-typed records in one step.
pub fn apply_records(grid: &Grid, records: &[PlacementRecord]) -> Result<Grid, InvalidPlacement> {
    apply(grid, &placements_from_records(records)?)
}

fn apply_one(grid: &mut Grid, placement: &Placement) -> Result<(), PlacementError> {
    let position = placement.position();
    if !grid.contains(position) {
        return Err(PlacementError::OutOfBounds {
            column: i64::from(position.column()),
            row: i64::from(position.row()),
        });
    }

    match placement {
        Placement::Add { element, .. } => {
            element.check()?;
            grid.place(position, element.clone())
        }
        Placement::Remove { kind, .. } => grid.clear(position, *kind),
    }
}

/// In-place edits used by systems on their private working copies.
///
/// These skip placement legality and only ever remove or wear down elements
/// that are already on the grid.
pub mod edit {
    use std::sync::Arc;

    use laser_grid_core::{CellCoord, Occupant};

    use super::Grid;

    /// Outcome of wearing down an obstacle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ObstacleDamage {
        /// Durability left after the damage.
        pub remaining: u32,
        /// Whether the obstacle left the grid.
        pub destroyed: bool,
    }

    /// Removes whatever occupies the exclusive layer of `cell`.
    pub fn remove_occupant(grid: &mut Grid, cell: CellCoord) -> Option<Occupant> {
        if grid.occupant(cell).is_none() {
            return None;
        }
        let removed = grid.slot_mut(cell)?.take();
        if matches!(removed, Some(Occupant::Emitter(_))) {
            Arc::make_mut(&mut grid.emitters).retain(|emitter| *emitter != cell);
        }
        removed
    }

    /// Reduces the durability of the obstacle at `cell` by `hits`, removing it
    /// once nothing is left. Returns `None` when `cell` holds no obstacle.
    pub fn damage_obstacle(grid: &mut Grid, cell: CellCoord, hits: u32) -> Option<ObstacleDamage> {
        let Some(Occupant::Obstacle(obstacle)) = grid.occupant(cell) else {
            return None;
        };
        let remaining = obstacle.durability.saturating_sub(hits);
        let slot = grid.slot_mut(cell)?;
        if remaining == 0 {
            *slot = None;
        } else if let Some(Occupant::Obstacle(obstacle)) = slot {
            obstacle.durability = remaining;
        }
        Some(ObstacleDamage {
            remaining,
            destroyed: remaining == 0,
        })
    }
}

/// Query functions that provide read-only access to a grid.
pub mod query {
    use laser_grid_core::{Bomb, CellCoord, Emitter, Obstacle, Occupant, Target};

    use super::Grid;

    /// Physical occupant of the exclusive layer at `cell`, if any.
    #[must_use]
    pub fn occupant(grid: &Grid, cell: CellCoord) -> Option<&Occupant> {
        grid.occupant(cell)
    }

    /// Target at `cell`, if any.
    #[must_use]
    pub fn target(grid: &Grid, cell: CellCoord) -> Option<&Target> {
        grid.targets.get(&cell)
    }

    /// All targets in row-major order.
    pub fn targets(grid: &Grid) -> impl Iterator<Item = (CellCoord, &Target)> {
        grid.targets.iter().map(|(cell, target)| (*cell, target))
    }

    /// All emitters in declaration order.
    pub fn emitters(grid: &Grid) -> impl Iterator<Item = (CellCoord, Emitter)> + '_ {
        grid.emitters
            .iter()
            .filter_map(|cell| match grid.occupant(*cell) {
                Some(Occupant::Emitter(emitter)) => Some((*cell, *emitter)),
                _ => None,
            })
    }

    /// All obstacles in row-major order.
    pub fn obstacles(grid: &Grid) -> impl Iterator<Item = (CellCoord, Obstacle)> + '_ {
        occupants(grid).filter_map(|(cell, occupant)| match occupant {
            Occupant::Obstacle(obstacle) => Some((cell, *obstacle)),
            _ => None,
        })
    }

    /// All bombs in row-major order.
    pub fn bombs(grid: &Grid) -> impl Iterator<Item = (CellCoord, Bomb)> + '_ {
        occupants(grid).filter_map(|(cell, occupant)| match occupant {
            Occupant::Bomb(bomb) => Some((cell, *bomb)),
            _ => None,
        })
    }

    /// Every occupied cell of the exclusive layer in row-major order.
    pub fn occupants(grid: &Grid) -> impl Iterator<Item = (CellCoord, &Occupant)> {
        let columns = grid.columns;
        grid.cells.iter().enumerate().filter_map(move |(index, slot)| {
            let occupant = slot.as_ref()?;
            let index = u32::try_from(index).ok()?;
            Some((CellCoord::new(index % columns, index / columns), occupant))
        })
    }

    /// Provides the dimensions of the grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(grid: &Grid) -> (u32, u32) {
        (grid.columns, grid.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laser_grid_core::{Direction, Emitter, Mirror, MirrorOrientation, Obstacle};

    fn mirror_at(column: u32, row: u32) -> Placement {
        Placement::Add {
            position: CellCoord::new(column, row),
            element: Occupant::Mirror(Mirror {
                orientation: MirrorOrientation::Slash,
            })
            .into(),
        }
    }

    #[test]
    fn empty_dimensions_are_rejected() {
        assert_eq!(
            Grid::new(0, 4),
            Err(LevelError::EmptyGrid {
                width: 0,
                height: 4
            })
        );
    }

    #[test]
    fn edits_copy_only_the_touched_layer() {
        let grid = Grid::new(4, 4).expect("grid");
        let edited = apply(&grid, &[mirror_at(1, 1)]).expect("placement");

        assert!(!Arc::ptr_eq(&grid.cells, &edited.cells));
        assert!(Arc::ptr_eq(&grid.targets, &edited.targets));
        assert!(query::occupant(&grid, CellCoord::new(1, 1)).is_none());
    }

    #[test]
    fn occupants_are_enumerated_row_major() {
        let grid = Grid::new(3, 3).expect("grid");
        let grid = apply(&grid, &[mirror_at(2, 0), mirror_at(0, 2), mirror_at(1, 0)])
            .expect("placements");

        let cells: Vec<CellCoord> = query::occupants(&grid).map(|(cell, _)| cell).collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(1, 0),
                CellCoord::new(2, 0),
                CellCoord::new(0, 2)
            ]
        );
    }

    #[test]
    fn removing_an_emitter_drops_it_from_firing_order() {
        let emitter = |column| Placement::Add {
            position: CellCoord::new(column, 0),
            element: Occupant::Emitter(Emitter {
                direction: Direction::South,
                energy: 3,
                brightness: 1.0,
            })
            .into(),
        };
        let grid = Grid::new(4, 4).expect("grid");
        let grid = apply(&grid, &[emitter(2), emitter(0), emitter(3)]).expect("placements");
        let grid = apply(
            &grid,
            &[Placement::Remove {
                position: CellCoord::new(0, 0),
                kind: ElementKind::Emitter,
            }],
        )
        .expect("removal");

        let order: Vec<u32> = query::emitters(&grid)
            .map(|(cell, _)| cell.column())
            .collect();
        assert_eq!(order, vec![2, 3]);
    }

    #[test]
    fn damage_removes_spent_obstacles() {
        let grid = Grid::new(2, 1).expect("grid");
        let mut grid = apply(
            &grid,
            &[Placement::Add {
                position: CellCoord::new(1, 0),
                element: Occupant::Obstacle(Obstacle {
                    durability: 2,
                    destructible: true,
                })
                .into(),
            }],
        )
        .expect("placement");
        let cell = CellCoord::new(1, 0);

        assert_eq!(
            edit::damage_obstacle(&mut grid, cell, 1),
            Some(edit::ObstacleDamage {
                remaining: 1,
                destroyed: false
            })
        );
        assert_eq!(
            edit::damage_obstacle(&mut grid, cell, 1),
            Some(edit::ObstacleDamage {
                remaining: 0,
                destroyed: true
            })
        );
        assert!(query::occupant(&grid, cell).is_none());
        assert_eq!(edit::damage_obstacle(&mut grid, cell, 1), None);
    }
}
