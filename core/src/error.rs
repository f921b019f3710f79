//! Error contracts raised while building or editing grids.

use thiserror::Error;

use crate::{CellCoord, ElementKind};

/// Reasons a single placement cannot be applied to a grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The addressed cell lies outside the grid.
    #[error("cell ({column}, {row}) lies outside the grid")]
    OutOfBounds {
        /// Requested column, possibly negative in loosely-typed documents.
        column: i64,
        /// Requested row, possibly negative in loosely-typed documents.
        row: i64,
    },
    /// The exclusive layer (or target layer) of the cell is already taken.
    #[error("cell {position} already holds a {occupant}")]
    Occupied {
        /// Cell the placement addressed.
        position: CellCoord,
        /// Kind of element found at the cell.
        occupant: ElementKind,
    },
    /// Type-specific parameters violate their constraints.
    #[error("invalid {kind} parameters: {reason}")]
    InvalidParameter {
        /// Kind of element being placed.
        kind: ElementKind,
        /// Human readable description of the violated constraint.
        reason: String,
    },
    /// The document names an element type the engine does not know.
    #[error("unknown element type '{0}'")]
    UnknownKind(String),
    /// The document names an operation other than `add` or `remove`.
    #[error("unknown placement operation '{0}'")]
    UnknownOperation(String),
    /// A removal addressed a cell holding a different kind of element.
    #[error("cell {position} holds a {found}, not a {expected}")]
    KindMismatch {
        /// Cell the removal addressed.
        position: CellCoord,
        /// Kind named by the removal.
        expected: ElementKind,
        /// Kind actually present.
        found: ElementKind,
    },
    /// More elements of one kind were added than the level allows.
    #[error("no more than {limit} {kind} placements are allowed")]
    ToolLimitExceeded {
        /// Kind whose limit was exceeded.
        kind: ElementKind,
        /// Configured limit.
        limit: u32,
    },
}

/// A rejected placement, located within the list it came from.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("placement #{index} rejected: {reason}")]
pub struct InvalidPlacement {
    /// Zero-based index of the offending placement.
    pub index: usize,
    /// Why the placement was rejected.
    #[source]
    pub reason: PlacementError,
}

/// Reasons a level description cannot be turned into a grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// One of the dimensions is zero.
    #[error("level dimensions {width}x{height} must both be positive")]
    EmptyGrid {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// An element declaration is illegal or overlaps another one.
    #[error("level declares an invalid element: {0}")]
    InvalidElement(#[source] PlacementError),
}

/// A position key that is not of the form `x,y`, `(x, y)` or `[x, y]`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid position key")]
pub struct CoordParseError(pub(crate) String);
