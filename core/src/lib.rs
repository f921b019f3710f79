#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the laser grid engine.
//!
//! This crate defines the vocabulary that connects the level documents, the
//! authoritative grid, and the pure systems. Documents describe levels and
//! solutions in a loosely-typed form, the world crate turns them into an
//! immutable grid snapshot via its `apply` entry point, and the systems
//! (bomb resolution, beam propagation, completion, validation) consume those
//! snapshots and answer with [`BeamSegment`] and [`BeamEvent`] values that
//! renderers read without feeding anything back.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod document;
mod error;

pub use document::{Level, LevelGoals, Placed, PlacementRecord, Solution};
pub use error::{CoordParseError, InvalidPlacement, LevelError, PlacementError};

/// Energy a freshly declared emitter carries when the document omits it.
pub const DEFAULT_EMITTER_ENERGY: u32 = 10;

/// Lowest brightness a beam may fade to.
pub const MIN_BRIGHTNESS: f32 = 0.1;

/// Location of a single grid cell expressed as column and row coordinates.
///
/// The origin sits in the top-left corner; columns grow to the right and rows
/// grow downwards. Coordinates order row-major. Serialized as a two element
/// `[x, y]` array.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct CellCoord {
    row: u32,
    column: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the Chebyshev distance between two cell coordinates.
    ///
    /// This is the metric used for bomb blasts, so a blast of power one
    /// covers the full 3x3 square around the bomb.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column()
            .abs_diff(other.column())
            .max(self.row().abs_diff(other.row()))
    }

    /// Cell adjacent in the provided direction, or `None` when the step would
    /// leave the non-negative quadrant.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<CellCoord> {
        let (dx, dy) = direction.offset();
        let column = self.column.checked_add_signed(dx)?;
        let row = self.row.checked_add_signed(dy)?;
        Some(Self::new(column, row))
    }

    /// Canonical string key used by solution documents, e.g. `(4, 1)`.
    #[must_use]
    pub fn position_key(self) -> String {
        self.to_string()
    }
}

impl From<[u32; 2]> for CellCoord {
    fn from([column, row]: [u32; 2]) -> Self {
        Self::new(column, row)
    }
}

impl From<CellCoord> for [u32; 2] {
    fn from(cell: CellCoord) -> Self {
        [cell.column, cell.row]
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

impl FromStr for CellCoord {
    type Err = CoordParseError;

    /// Parses `x,y`, `(x, y)` or `[x, y]`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordParseError(value.to_owned());
        let inner = value
            .trim()
            .trim_start_matches(['(', '['])
            .trim_end_matches([')', ']']);
        let (column, row) = inner.split_once(',').ok_or_else(invalid)?;
        let column = column.trim().parse::<u32>().map_err(|_| invalid())?;
        let row = row.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(column, row))
    }
}

/// Cardinal directions a beam may travel in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Direction {
    /// Travel toward decreasing row indices.
    #[serde(rename = "NORTH", alias = "north", alias = "North")]
    North,
    /// Travel toward increasing column indices.
    #[serde(rename = "EAST", alias = "east", alias = "East")]
    East,
    /// Travel toward increasing row indices.
    #[serde(rename = "SOUTH", alias = "south", alias = "South")]
    South,
    /// Travel toward decreasing column indices.
    #[serde(rename = "WEST", alias = "west", alias = "West")]
    West,
}

impl Direction {
    /// All four directions in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Column and row delta of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Direction after a quarter turn counter-clockwise.
    #[must_use]
    pub const fn turn_left(self) -> Self {
        match self {
            Self::North => Self::West,
            Self::West => Self::South,
            Self::South => Self::East,
            Self::East => Self::North,
        }
    }

    /// Direction after a quarter turn clockwise.
    #[must_use]
    pub const fn turn_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }

    /// Upper-case name used by level documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "NORTH",
            Self::East => "EAST",
            Self::South => "SOUTH",
            Self::West => "WEST",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = PlacementError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|direction| direction.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| PlacementError::InvalidParameter {
                kind: ElementKind::Emitter,
                reason: format!("unknown direction '{value}'"),
            })
    }
}

/// Relative change of heading applied by splitting elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Turn {
    /// Keep the incoming heading.
    Straight,
    /// Quarter turn counter-clockwise.
    Left,
    /// Quarter turn clockwise.
    Right,
    /// Send the beam back the way it came.
    Back,
}

impl Turn {
    /// Heading that results from applying the turn to `direction`.
    #[must_use]
    pub const fn apply(self, direction: Direction) -> Direction {
        match self {
            Self::Straight => direction,
            Self::Left => direction.turn_left(),
            Self::Right => direction.turn_right(),
            Self::Back => direction.reverse(),
        }
    }
}

/// Diagonal a mirror is mounted along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorOrientation {
    /// Mounted from bottom-left to top-right (`/`).
    #[serde(rename = "/")]
    Slash,
    /// Mounted from top-left to bottom-right (`\`).
    #[serde(rename = "\\")]
    Backslash,
}

impl MirrorOrientation {
    /// Outgoing heading for a beam arriving with `incoming`.
    #[must_use]
    pub const fn reflect(self, incoming: Direction) -> Direction {
        match (self, incoming) {
            (Self::Slash, Direction::North) => Direction::East,
            (Self::Slash, Direction::East) => Direction::North,
            (Self::Slash, Direction::South) => Direction::West,
            (Self::Slash, Direction::West) => Direction::South,
            (Self::Backslash, Direction::North) => Direction::West,
            (Self::Backslash, Direction::West) => Direction::North,
            (Self::Backslash, Direction::South) => Direction::East,
            (Self::Backslash, Direction::East) => Direction::South,
        }
    }
}

impl FromStr for MirrorOrientation {
    type Err = PlacementError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "/" => Ok(Self::Slash),
            "\\" => Ok(Self::Backslash),
            other => Err(PlacementError::InvalidParameter {
                kind: ElementKind::Mirror,
                reason: format!("unknown mirror orientation '{other}'"),
            }),
        }
    }
}

/// Fixed branch layouts a splitter can be built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitterPattern {
    /// Left and right of the incoming heading.
    Dual,
    /// Forward, left and right.
    Triple,
    /// Forward, back, left and right.
    Cross,
}

impl SplitterPattern {
    /// Turns that produce the outgoing branches, in enqueue order.
    #[must_use]
    pub const fn turns(self) -> &'static [Turn] {
        match self {
            Self::Dual => &[Turn::Left, Turn::Right],
            Self::Triple => &[Turn::Straight, Turn::Left, Turn::Right],
            Self::Cross => &[Turn::Straight, Turn::Back, Turn::Left, Turn::Right],
        }
    }
}

impl FromStr for SplitterPattern {
    type Err = PlacementError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dual" => Ok(Self::Dual),
            "triple" => Ok(Self::Triple),
            "cross" => Ok(Self::Cross),
            other => Err(PlacementError::InvalidParameter {
                kind: ElementKind::Splitter,
                reason: format!("unknown splitter pattern '{other}'"),
            }),
        }
    }
}

/// Light source re-fired at the start of every pulse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    /// Heading of the emitted beam.
    pub direction: Direction,
    /// Energy the beam leaves the emitter with.
    #[serde(default = "default_emitter_energy")]
    pub energy: u32,
    /// Display multiplier carried into the emitted segments.
    #[serde(default = "default_brightness")]
    pub brightness: f32,
}

/// Two-sided diagonal mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    /// Diagonal the mirror is mounted along.
    #[serde(default = "default_orientation")]
    pub orientation: MirrorOrientation,
}

/// Refracting element that fans a beam out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prism {
    /// Number of extra headings beyond straight-through; any positive value
    /// adds both the left and the right branch.
    #[serde(default = "default_spread")]
    pub spread: u32,
}

impl Prism {
    /// Turns that produce the outgoing branches, in enqueue order.
    #[must_use]
    pub const fn turns(self) -> &'static [Turn] {
        if self.spread == 0 {
            &[Turn::Straight]
        } else {
            &[Turn::Straight, Turn::Left, Turn::Right]
        }
    }
}

/// Splitter with a fixed branch layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splitter {
    /// Branch layout relative to the incoming heading.
    #[serde(default = "default_pattern")]
    pub pattern: SplitterPattern,
}

/// Element that rescales the energy of a traversing beam.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Amplifier {
    /// Factor applied to the incoming energy.
    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
    /// Bonus added after scaling.
    #[serde(default)]
    pub additive: u32,
    /// Upper bound applied last, if any.
    #[serde(default)]
    pub cap: Option<u32>,
}

impl Amplifier {
    /// Energy leaving the amplifier for a beam arriving with `energy`.
    ///
    /// Computes `round(energy * multiplier) + additive`, saturating at
    /// `u32::MAX`, and then clamps to the cap.
    #[must_use]
    pub fn amplify(&self, energy: u32) -> u32 {
        let scaled = (f64::from(energy) * f64::from(self.multiplier)).round() as u32;
        let boosted = scaled.saturating_add(self.additive);
        self.cap.map_or(boosted, |cap| boosted.min(cap))
    }
}

/// Field that drains energy from traversing beams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyField {
    /// Energy subtracted from every beam crossing the field.
    #[serde(default = "default_drain")]
    pub drain: u32,
}

/// Solid block that stops beams until its durability is spent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Remaining hits before the obstacle is removed. Always positive while
    /// the obstacle is on the grid.
    #[serde(default = "default_durability")]
    pub durability: u32,
    /// Whether beams and bombs can wear the obstacle down.
    #[serde(default = "default_destructible")]
    pub destructible: bool,
}

/// One-shot explosive resolved before beams are traced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bomb {
    /// Blast radius measured in Chebyshev distance.
    #[serde(default = "default_power")]
    pub power: u32,
}

/// Collection point that must receive enough energy to clear the level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Energy that must be delivered within one pulse.
    #[serde(default = "default_required_energy")]
    pub required_energy: u32,
    /// Display-only caption.
    #[serde(default)]
    pub label: String,
}

/// Physical occupant of the exclusive grid layer. At most one per cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Occupant {
    /// Beam source.
    Emitter(Emitter),
    /// Diagonal reflector.
    Mirror(Mirror),
    /// Refracting fan-out element.
    Prism(Prism),
    /// Fixed-pattern splitter.
    Splitter(Splitter),
    /// Energy multiplier.
    Amplifier(Amplifier),
    /// Energy drain.
    EnergyField(EnergyField),
    /// Beam blocker.
    Obstacle(Obstacle),
    /// Explosive.
    Bomb(Bomb),
}

impl Occupant {
    /// Kind tag of the occupant.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        match self {
            Self::Emitter(_) => ElementKind::Emitter,
            Self::Mirror(_) => ElementKind::Mirror,
            Self::Prism(_) => ElementKind::Prism,
            Self::Splitter(_) => ElementKind::Splitter,
            Self::Amplifier(_) => ElementKind::Amplifier,
            Self::EnergyField(_) => ElementKind::EnergyField,
            Self::Obstacle(_) => ElementKind::Obstacle,
            Self::Bomb(_) => ElementKind::Bomb,
        }
    }
}

/// Anything that can be placed on the grid.
#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    /// Element living in the exclusive layer.
    Occupant(Occupant),
    /// Element living in the independent target layer.
    Target(Target),
}

impl Element {
    /// Kind tag of the element.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Occupant(occupant) => occupant.kind(),
            Self::Target(_) => ElementKind::Target,
        }
    }

    /// Checks the type-specific parameter constraints.
    pub fn check(&self) -> Result<(), PlacementError> {
        let invalid = |kind, reason: &str| {
            Err(PlacementError::InvalidParameter {
                kind,
                reason: reason.to_owned(),
            })
        };
        match self {
            Self::Occupant(Occupant::Amplifier(amplifier))
                if !amplifier.multiplier.is_finite() || amplifier.multiplier < 0.0 =>
            {
                invalid(
                    ElementKind::Amplifier,
                    "multiplier must be a finite non-negative number",
                )
            }
            Self::Occupant(Occupant::Obstacle(obstacle)) if obstacle.durability == 0 => {
                invalid(ElementKind::Obstacle, "durability must be positive")
            }
            Self::Occupant(Occupant::Emitter(emitter))
                if !emitter.brightness.is_finite() || emitter.brightness < 0.0 =>
            {
                invalid(
                    ElementKind::Emitter,
                    "brightness must be a finite non-negative number",
                )
            }
            _ => Ok(()),
        }
    }
}

impl From<Occupant> for Element {
    fn from(occupant: Occupant) -> Self {
        Self::Occupant(occupant)
    }
}

/// Kind tag shared by placements, errors and tool limits.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// See [`Emitter`].
    Emitter,
    /// See [`Mirror`].
    Mirror,
    /// See [`Prism`].
    Prism,
    /// See [`Splitter`].
    Splitter,
    /// See [`Amplifier`].
    Amplifier,
    /// See [`EnergyField`].
    EnergyField,
    /// See [`Obstacle`].
    Obstacle,
    /// See [`Bomb`].
    Bomb,
    /// See [`Target`].
    Target,
}

impl ElementKind {
    /// Name used by documents and tool limit tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Emitter => "emitter",
            Self::Mirror => "mirror",
            Self::Prism => "prism",
            Self::Splitter => "splitter",
            Self::Amplifier => "amplifier",
            Self::EnergyField => "energy_field",
            Self::Obstacle => "obstacle",
            Self::Bomb => "bomb",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed edit applied to a grid snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum Placement {
    /// Puts an element on an empty slot of its layer.
    Add {
        /// Cell receiving the element.
        position: CellCoord,
        /// Element to place.
        element: Element,
    },
    /// Clears the layer of the tagged kind. A no-op on an empty slot.
    Remove {
        /// Cell to clear.
        position: CellCoord,
        /// Kind expected at the cell.
        kind: ElementKind,
    },
}

impl Placement {
    /// Cell the placement addresses.
    #[must_use]
    pub fn position(&self) -> CellCoord {
        match self {
            Self::Add { position, .. } | Self::Remove { position, .. } => *position,
        }
    }

    /// Kind of element the placement addresses.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Add { element, .. } => element.kind(),
            Self::Remove { kind, .. } => *kind,
        }
    }
}

/// Straight run of a beam between two interaction points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BeamSegment {
    /// Index of the emitter the beam descends from, in declaration order.
    pub emitter: usize,
    /// First cell of the run.
    pub start: CellCoord,
    /// Last cell of the run.
    pub end: CellCoord,
    /// Heading along the run.
    pub direction: Direction,
    /// Energy carried along the run.
    pub energy: u32,
    /// Display-only brightness of the run.
    pub brightness: f32,
}

/// Interactions reported while tracing a pulse, in trace order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BeamEvent {
    /// An emitter fired a beam.
    Emitted {
        /// Index of the emitter in declaration order.
        emitter: usize,
        /// Cell of the emitter.
        position: CellCoord,
        /// Heading of the emitted beam.
        direction: Direction,
        /// Energy of the emitted beam.
        energy: u32,
    },
    /// A mirror turned a beam.
    Reflected {
        /// Cell of the mirror.
        position: CellCoord,
        /// Heading on arrival.
        incoming: Direction,
        /// Heading on departure.
        outgoing: Direction,
    },
    /// A prism or splitter fanned a beam out.
    Split {
        /// Cell of the splitting element.
        position: CellCoord,
        /// Whether a prism or a splitter did the split.
        kind: ElementKind,
        /// Headings of the branches in enqueue order.
        outputs: Vec<Direction>,
        /// Energy handed to each branch.
        energy: u32,
    },
    /// An amplifier rescaled a beam.
    Amplified {
        /// Cell of the amplifier.
        position: CellCoord,
        /// Energy on arrival.
        before: u32,
        /// Energy on departure.
        after: u32,
    },
    /// An energy field drained a beam that survived the crossing.
    Drained {
        /// Cell of the field.
        position: CellCoord,
        /// Energy removed.
        drain: u32,
        /// Energy left in the beam.
        remaining: u32,
    },
    /// A beam ran out of energy.
    Extinguished {
        /// Cell where the beam died.
        position: CellCoord,
    },
    /// A beam crossed a target.
    TargetHit {
        /// Cell of the target.
        position: CellCoord,
        /// Energy delivered by this crossing.
        energy: u32,
        /// Energy accumulated at the target so far in the pulse.
        delivered: u32,
    },
    /// A beam wore down a destructible obstacle.
    ObstacleHit {
        /// Cell of the obstacle.
        position: CellCoord,
        /// Durability left after the hit.
        durability: u32,
    },
    /// An obstacle ran out of durability and left the grid.
    ObstacleDestroyed {
        /// Cell the obstacle occupied.
        position: CellCoord,
    },
    /// A beam stopped at an obstacle it could not damage.
    Blocked {
        /// Cell of the obstacle.
        position: CellCoord,
    },
    /// The cycle guard stopped a beam re-entering a visited state.
    CycleDetected {
        /// Cell that would have been re-entered.
        position: CellCoord,
        /// Heading that would have been repeated.
        direction: Direction,
    },
    /// A beam walked off the grid.
    LeftGrid {
        /// Last in-bounds cell.
        position: CellCoord,
        /// Heading on exit.
        direction: Direction,
    },
}

/// Record of a single bomb going off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Detonation {
    /// Cell the bomb occupied.
    pub bomb: CellCoord,
    /// Blast radius of the bomb.
    pub power: u32,
    /// Obstacles within the blast, in row-major order.
    pub cleared: Vec<CellCoord>,
}

fn default_emitter_energy() -> u32 {
    DEFAULT_EMITTER_ENERGY
}

fn default_brightness() -> f32 {
    1.0
}

fn default_orientation() -> MirrorOrientation {
    MirrorOrientation::Slash
}

fn default_spread() -> u32 {
    1
}

fn default_pattern() -> SplitterPattern {
    SplitterPattern::Dual
}

fn default_multiplier() -> f32 {
    2.0
}

fn default_drain() -> u32 {
    1
}

fn default_durability() -> u32 {
    1
}

fn default_destructible() -> bool {
    true
}

fn default_power() -> u32 {
    1
}

fn default_required_energy() -> u32 {
    1
}

/// Serde adapter that writes cell-keyed maps with canonical position keys.
///
/// Use with `#[serde(serialize_with = "laser_grid_core::position_keys::serialize")]`
/// on `BTreeMap<CellCoord, _>` fields that end up in JSON.
pub mod position_keys {
    use std::collections::BTreeMap;

    use serde::{Serialize, Serializer};

    use super::CellCoord;

    /// Serializes `map` with `"(x, y)"` keys in row-major order.
    pub fn serialize<S, V>(map: &BTreeMap<CellCoord, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_map(map.iter().map(|(cell, value)| (cell.position_key(), value)))
    }
}
