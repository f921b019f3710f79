//! Level and solution documents as stored on disk.
//!
//! Levels are strongly typed because the loader validates them before the
//! engine sees them. Placement records stay loosely typed so that player
//! edits and recorded solutions can be rejected with a precise
//! [`PlacementError`] rather than a deserialisation failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Amplifier, Bomb, CellCoord, CoordParseError, Direction, Element, ElementKind, Emitter,
    EnergyField, Mirror, MirrorOrientation, Obstacle, Occupant, Placement, PlacementError,
    Prism, Splitter, SplitterPattern, Target, DEFAULT_EMITTER_ENERGY,
};

/// An element declaration anchored at a cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placed<T> {
    /// Cell the element occupies.
    pub position: CellCoord,
    /// Element parameters.
    #[serde(flatten)]
    pub element: T,
}

impl<T> Placed<T> {
    /// Anchors `element` at `position`.
    #[must_use]
    pub const fn new(position: CellCoord, element: T) -> Self {
        Self { position, element }
    }
}

/// Validated description of a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Display name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Display-only difficulty label.
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Emitters in declaration order, which is also firing order.
    #[serde(default)]
    pub emitters: Vec<Placed<Emitter>>,
    /// Mirrors.
    #[serde(default)]
    pub mirrors: Vec<Placed<Mirror>>,
    /// Prisms.
    #[serde(default)]
    pub prisms: Vec<Placed<Prism>>,
    /// Splitters.
    #[serde(default)]
    pub splitters: Vec<Placed<Splitter>>,
    /// Amplifiers.
    #[serde(default)]
    pub amplifiers: Vec<Placed<Amplifier>>,
    /// Energy fields.
    #[serde(default)]
    pub energy_fields: Vec<Placed<EnergyField>>,
    /// Obstacles.
    #[serde(default)]
    pub obstacles: Vec<Placed<Obstacle>>,
    /// Bombs.
    #[serde(default)]
    pub bombs: Vec<Placed<Bomb>>,
    /// Targets.
    #[serde(default)]
    pub targets: Vec<Placed<Target>>,
    /// Maximum number of `add` placements per element kind name.
    #[serde(default)]
    pub tool_limits: BTreeMap<String, u32>,
    /// Whether clearing the level requires a beam loop.
    #[serde(default)]
    pub loop_required: bool,
    /// Minimum total energy across all targets, if any.
    #[serde(default)]
    pub energy_goal: Option<u32>,
}

impl Level {
    /// Creates an empty level of the provided dimensions.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            difficulty: default_difficulty(),
            width,
            height,
            emitters: Vec::new(),
            mirrors: Vec::new(),
            prisms: Vec::new(),
            splitters: Vec::new(),
            amplifiers: Vec::new(),
            energy_fields: Vec::new(),
            obstacles: Vec::new(),
            bombs: Vec::new(),
            targets: Vec::new(),
            tool_limits: BTreeMap::new(),
            loop_required: false,
            energy_goal: None,
        }
    }

    /// Completion goals beyond the per-target requirements.
    #[must_use]
    pub fn goals(&self) -> LevelGoals {
        LevelGoals {
            loop_required: self.loop_required,
            energy_goal: self.energy_goal,
        }
    }

    /// Limit on `add` placements for `kind`, if the level sets one.
    #[must_use]
    pub fn tool_limit(&self, kind: ElementKind) -> Option<u32> {
        self.tool_limits.get(kind.as_str()).copied()
    }

    /// Every declared element as an `add` placement.
    ///
    /// Emitters come first so that their relative order is preserved.
    #[must_use]
    pub fn placements(&self) -> Vec<Placement> {
        fn adds<'a, T: Clone>(
            placed: &'a [Placed<T>],
            wrap: impl Fn(T) -> Element + 'a,
        ) -> impl Iterator<Item = Placement> + 'a {
            placed.iter().map(move |entry| Placement::Add {
                position: entry.position,
                element: wrap(entry.element.clone()),
            })
        }

        let mut placements = Vec::new();
        placements.extend(adds(&self.emitters, |e| Occupant::Emitter(e).into()));
        placements.extend(adds(&self.mirrors, |e| Occupant::Mirror(e).into()));
        placements.extend(adds(&self.prisms, |e| Occupant::Prism(e).into()));
        placements.extend(adds(&self.splitters, |e| Occupant::Splitter(e).into()));
        placements.extend(adds(&self.amplifiers, |e| Occupant::Amplifier(e).into()));
        placements.extend(adds(&self.energy_fields, |e| {
            Occupant::EnergyField(e).into()
        }));
        placements.extend(adds(&self.obstacles, |e| Occupant::Obstacle(e).into()));
        placements.extend(adds(&self.bombs, |e| Occupant::Bomb(e).into()));
        placements.extend(adds(&self.targets, Element::Target));
        placements
    }
}

/// Level-wide goals evaluated after a pulse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LevelGoals {
    /// The pulse must trip the cycle guard.
    pub loop_required: bool,
    /// Minimum total energy delivered across all targets.
    pub energy_goal: Option<u32>,
}

/// Loosely-typed placement as recorded by players and solution files.
///
/// Only the parameters relevant to `kind` are read; defaults apply to the
/// ones that are missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    /// `add` (the default) or `remove`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Element type tag, e.g. `mirror` or `splitter_cross`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Cell as `[x, y]`.
    pub position: [i64; 2],
    /// Mirror orientation, `/` or `\`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    /// Prism spread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<i64>,
    /// Splitter pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Amplifier multiplier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    /// Amplifier additive bonus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additive: Option<i64>,
    /// Amplifier cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<i64>,
    /// Energy field drain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drain: Option<i64>,
    /// Obstacle durability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durability: Option<i64>,
    /// Obstacle destructibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructible: Option<bool>,
    /// Bomb power.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<i64>,
    /// Target requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_energy: Option<i64>,
    /// Target label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Emitter heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Emitter energy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<i64>,
    /// Emitter brightness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
}

impl PlacementRecord {
    /// Record adding an element of type `kind` with default parameters.
    #[must_use]
    pub fn add(kind: &str, column: i64, row: i64) -> Self {
        Self {
            kind: kind.to_owned(),
            position: [column, row],
            ..Self::default()
        }
    }

    /// Record removing an element of type `kind`.
    #[must_use]
    pub fn remove(kind: &str, column: i64, row: i64) -> Self {
        Self {
            operation: Some("remove".to_owned()),
            ..Self::add(kind, column, row)
        }
    }

    /// Converts the record into a typed placement, checking every parameter.
    pub fn to_placement(&self) -> Result<Placement, PlacementError> {
        let [column, row] = self.position;
        let position = match (u32::try_from(column), u32::try_from(row)) {
            (Ok(column), Ok(row)) => CellCoord::new(column, row),
            _ => return Err(PlacementError::OutOfBounds { column, row }),
        };

        let operation = self
            .operation
            .as_deref()
            .unwrap_or("add")
            .trim()
            .to_ascii_lowercase();
        let tag = self.kind.trim().to_ascii_lowercase();

        match operation.as_str() {
            "add" => {
                let element = self.element(&tag)?;
                element.check()?;
                Ok(Placement::Add { position, element })
            }
            "remove" => Ok(Placement::Remove {
                position,
                kind: kind_for_tag(&tag)?,
            }),
            _ => Err(PlacementError::UnknownOperation(operation)),
        }
    }

    fn element(&self, tag: &str) -> Result<Element, PlacementError> {
        let kind = kind_for_tag(tag)?;
        let element = match kind {
            ElementKind::Emitter => {
                let direction = self
                    .direction
                    .as_deref()
                    .ok_or_else(|| PlacementError::InvalidParameter {
                        kind,
                        reason: "emitters need a direction".to_owned(),
                    })?
                    .parse::<Direction>()?;
                Occupant::Emitter(Emitter {
                    direction,
                    energy: unsigned(kind, "energy", self.energy, DEFAULT_EMITTER_ENERGY)?,
                    brightness: self.brightness.unwrap_or(1.0) as f32,
                })
                .into()
            }
            ElementKind::Mirror => Occupant::Mirror(Mirror {
                orientation: self
                    .orientation
                    .as_deref()
                    .map_or(Ok(MirrorOrientation::Slash), str::parse)?,
            })
            .into(),
            ElementKind::Prism => Occupant::Prism(Prism {
                spread: unsigned(kind, "spread", self.spread, 1)?,
            })
            .into(),
            ElementKind::Splitter => {
                let pattern = match tag {
                    "splitter_triple" => SplitterPattern::Triple,
                    "splitter_cross" => SplitterPattern::Cross,
                    _ => self
                        .pattern
                        .as_deref()
                        .map_or(Ok(SplitterPattern::Dual), str::parse)?,
                };
                Occupant::Splitter(Splitter { pattern }).into()
            }
            ElementKind::Amplifier => Occupant::Amplifier(Amplifier {
                multiplier: self.multiplier.unwrap_or(2.0) as f32,
                additive: unsigned(kind, "additive", self.additive, 0)?,
                cap: self
                    .cap
                    .map(|cap| unsigned(kind, "cap", Some(cap), 0))
                    .transpose()?,
            })
            .into(),
            ElementKind::EnergyField => Occupant::EnergyField(EnergyField {
                drain: unsigned(kind, "drain", self.drain, 1)?,
            })
            .into(),
            ElementKind::Obstacle => Occupant::Obstacle(Obstacle {
                durability: unsigned(kind, "durability", self.durability, 1)?,
                destructible: self.destructible.unwrap_or(true),
            })
            .into(),
            ElementKind::Bomb => Occupant::Bomb(Bomb {
                power: unsigned(kind, "power", self.power, 1)?,
            })
            .into(),
            ElementKind::Target => Element::Target(Target {
                required_energy: unsigned(kind, "required_energy", self.required_energy, 1)?,
                label: self.label.clone().unwrap_or_default(),
            }),
        };
        Ok(element)
    }
}

/// Recorded solution for a level together with the outcome it must produce.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Placements applied on top of the level, in order.
    #[serde(default)]
    pub placements: Vec<PlacementRecord>,
    /// Exact energy each listed target must receive, keyed by position key.
    #[serde(default)]
    pub expected_targets: BTreeMap<String, u32>,
    /// Whether the pulse must (or must not) trip the cycle guard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_loop: Option<bool>,
    /// Minimum total energy across all targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_total_energy: Option<u32>,
    /// Cells where a bomb must have detonated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expected_explosions: Vec<CellCoord>,
}

impl Solution {
    /// Parses the expected target keys into cells.
    pub fn expected_energies(&self) -> Result<BTreeMap<CellCoord, u32>, CoordParseError> {
        self.expected_targets
            .iter()
            .map(|(key, energy)| Ok((key.parse::<CellCoord>()?, *energy)))
            .collect()
    }
}

fn kind_for_tag(tag: &str) -> Result<ElementKind, PlacementError> {
    let kind = match tag {
        "emitter" => ElementKind::Emitter,
        "mirror" => ElementKind::Mirror,
        "prism" => ElementKind::Prism,
        "splitter" | "splitter_triple" | "splitter_cross" => ElementKind::Splitter,
        "amplifier" => ElementKind::Amplifier,
        "energy_field" => ElementKind::EnergyField,
        "obstacle" => ElementKind::Obstacle,
        "bomb" => ElementKind::Bomb,
        "target" => ElementKind::Target,
        other => return Err(PlacementError::UnknownKind(other.to_owned())),
    };
    Ok(kind)
}

fn unsigned(
    kind: ElementKind,
    name: &str,
    value: Option<i64>,
    default: u32,
) -> Result<u32, PlacementError> {
    match value {
        None => Ok(default),
        Some(value) => u32::try_from(value).map_err(|_| PlacementError::InvalidParameter {
            kind,
            reason: format!("{name} must be a non-negative integer, got {value}"),
        }),
    }
}

fn default_name() -> String {
    "Untitled".to_owned()
}

fn default_difficulty() -> String {
    "Unknown".to_owned()
}
