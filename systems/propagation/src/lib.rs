#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Beam propagation engine that traces one pulse through a grid snapshot.
//!
//! Emitters fire one after another in declaration order. Each emitter drains
//! its own first-in first-out queue of beam heads, so segment order is
//! emitter order first and breadth-first branch order second. Obstacle
//! damage is shared by every head of the pulse: an obstacle destroyed by an
//! earlier head is gone for the heads processed after it.
//!
//! Energy delivered to targets accumulates across every crossing of the
//! pulse. The cycle guard remembers every `(cell, heading)` pair entered by
//! the beams of one emitter and stops any head that would enter one again,
//! which bounds the work of a pulse even for amplifier loops.

use std::collections::{BTreeMap, HashSet, VecDeque};

use laser_grid_core::{
    BeamEvent, BeamSegment, CellCoord, Direction, ElementKind, Emitter, Obstacle, Occupant,
    Turn, MIN_BRIGHTNESS,
};
use laser_grid_world::{edit, query, Grid};

const MIRROR_FADE: f32 = 0.92;
const PRISM_FADE: f32 = 0.85;
const SPLITTER_FADE: f32 = 0.88;

/// Rules that tune how beams interact with the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropagationRules {
    /// Whether beam hits wear down destructible obstacles.
    pub beam_damage: bool,
}

impl Default for PropagationRules {
    fn default() -> Self {
        Self { beam_damage: true }
    }
}

/// Everything observed while tracing one pulse.
#[derive(Clone, Debug, PartialEq)]
pub struct PropagationOutcome {
    /// Straight runs of every beam, in trace order.
    pub segments: Vec<BeamSegment>,
    /// Interactions, in trace order.
    pub events: Vec<BeamEvent>,
    /// Energy delivered to every target of the grid, zero for missed ones.
    pub target_energy: BTreeMap<CellCoord, u32>,
    /// Whether the cycle guard stopped at least one head.
    pub loop_detected: bool,
    /// Input grid with this pulse's obstacle damage applied.
    pub residual: Grid,
}

impl PropagationOutcome {
    /// Energy delivered to the target at `cell`, zero when there is none.
    #[must_use]
    pub fn energy_at(&self, cell: CellCoord) -> u32 {
        self.target_energy.get(&cell).copied().unwrap_or(0)
    }

    /// Sum of the energy delivered to all targets.
    #[must_use]
    pub fn total_energy(&self) -> u64 {
        self.target_energy.values().copied().map(u64::from).sum()
    }
}

/// Traces one pulse with the default rules.
#[must_use]
pub fn propagate(grid: &Grid) -> PropagationOutcome {
    propagate_with(grid, PropagationRules::default())
}

/// Traces one pulse with explicit rules.
///
/// The input grid is never modified; obstacle damage is reported through
/// [`PropagationOutcome::residual`] so callers decide whether it persists
/// into the next pulse.
#[must_use]
pub fn propagate_with(grid: &Grid, rules: PropagationRules) -> PropagationOutcome {
    let mut tracer = Tracer::new(grid, rules);
    let emitters: Vec<(CellCoord, Emitter)> = query::emitters(grid).collect();
    for (index, (cell, emitter)) in emitters.into_iter().enumerate() {
        tracer.fire(index, cell, emitter);
    }

    let outcome = tracer.finish();
    log::debug!(
        "pulse traced: {} segment(s), {} event(s), total energy {}, loop {}",
        outcome.segments.len(),
        outcome.events.len(),
        outcome.total_energy(),
        outcome.loop_detected
    );
    outcome
}

#[derive(Clone, Copy, Debug)]
struct Head {
    origin: CellCoord,
    position: CellCoord,
    direction: Direction,
    energy: u32,
    brightness: f32,
}

struct Tracer {
    working: Grid,
    rules: PropagationRules,
    segments: Vec<BeamSegment>,
    events: Vec<BeamEvent>,
    target_energy: BTreeMap<CellCoord, u32>,
    loop_detected: bool,
}

impl Tracer {
    fn new(grid: &Grid, rules: PropagationRules) -> Self {
        Self {
            working: grid.clone(),
            rules,
            segments: Vec::new(),
            events: Vec::new(),
            target_energy: query::targets(grid).map(|(cell, _)| (cell, 0)).collect(),
            loop_detected: false,
        }
    }

    fn fire(&mut self, emitter: usize, cell: CellCoord, source: Emitter) {
        self.events.push(BeamEvent::Emitted {
            emitter,
            position: cell,
            direction: source.direction,
            energy: source.energy,
        });
        if source.energy == 0 {
            self.events.push(BeamEvent::Extinguished { position: cell });
            return;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(Head {
            origin: cell,
            position: cell,
            direction: source.direction,
            energy: source.energy,
            brightness: source.brightness.max(MIN_BRIGHTNESS),
        });
        while let Some(head) = queue.pop_front() {
            self.run(emitter, head, &mut visited, &mut queue);
        }
    }

    fn run(
        &mut self,
        emitter: usize,
        mut head: Head,
        visited: &mut HashSet<(CellCoord, Direction)>,
        queue: &mut VecDeque<Head>,
    ) {
        loop {
            let Some(next) = head
                .position
                .neighbor(head.direction)
                .filter(|cell| self.working.contains(*cell))
            else {
                self.close(emitter, &head);
                self.events.push(BeamEvent::LeftGrid {
                    position: head.position,
                    direction: head.direction,
                });
                return;
            };

            let occupant = query::occupant(&self.working, next).copied();
            if let Some(Occupant::Obstacle(obstacle)) = occupant {
                self.close(emitter, &head);
                self.strike(next, obstacle);
                return;
            }

            if !visited.insert((next, head.direction)) {
                self.close(emitter, &head);
                self.loop_detected = true;
                log::trace!("cycle guard stopped a beam entering {next} {}", head.direction);
                self.events.push(BeamEvent::CycleDetected {
                    position: next,
                    direction: head.direction,
                });
                return;
            }
            head.position = next;

            if let Some(Occupant::EnergyField(field)) = occupant {
                self.close(emitter, &head);
                if head.energy <= field.drain {
                    self.events.push(BeamEvent::Extinguished { position: next });
                    return;
                }
                head.energy -= field.drain;
                head.origin = next;
                self.events.push(BeamEvent::Drained {
                    position: next,
                    drain: field.drain,
                    remaining: head.energy,
                });
            }

            self.credit(next, head.energy);

            match occupant {
                Some(Occupant::Mirror(mirror)) => {
                    self.close(emitter, &head);
                    let outgoing = mirror.orientation.reflect(head.direction);
                    self.events.push(BeamEvent::Reflected {
                        position: next,
                        incoming: head.direction,
                        outgoing,
                    });
                    head.origin = next;
                    head.direction = outgoing;
                    head.brightness = fade(head.brightness, MIRROR_FADE);
                }
                Some(Occupant::Prism(prism)) => {
                    self.split(emitter, &head, ElementKind::Prism, prism.turns(), PRISM_FADE, queue);
                    return;
                }
                Some(Occupant::Splitter(splitter)) => {
                    self.split(
                        emitter,
                        &head,
                        ElementKind::Splitter,
                        splitter.pattern.turns(),
                        SPLITTER_FADE,
                        queue,
                    );
                    return;
                }
                Some(Occupant::Amplifier(amplifier)) => {
                    self.close(emitter, &head);
                    let after = amplifier.amplify(head.energy);
                    self.events.push(BeamEvent::Amplified {
                        position: next,
                        before: head.energy,
                        after,
                    });
                    if after == 0 {
                        self.events.push(BeamEvent::Extinguished { position: next });
                        return;
                    }
                    head.origin = next;
                    head.energy = after;
                    head.brightness = fade(head.brightness, amplifier.multiplier);
                }
                // Fields were handled above and obstacles never get entered.
                Some(
                    Occupant::EnergyField(_)
                    | Occupant::Obstacle(_)
                    | Occupant::Emitter(_)
                    | Occupant::Bomb(_),
                )
                | None => {}
            }
        }
    }

    fn close(&mut self, emitter: usize, head: &Head) {
        if head.origin == head.position {
            return;
        }
        self.segments.push(BeamSegment {
            emitter,
            start: head.origin,
            end: head.position,
            direction: head.direction,
            energy: head.energy,
            brightness: head.brightness,
        });
    }

    fn split(
        &mut self,
        emitter: usize,
        head: &Head,
        kind: ElementKind,
        turns: &[Turn],
        brightness_factor: f32,
        queue: &mut VecDeque<Head>,
    ) {
        self.close(emitter, head);
        let brightness = fade(head.brightness, brightness_factor);
        let outputs: Vec<Direction> = turns.iter().map(|turn| turn.apply(head.direction)).collect();
        for direction in &outputs {
            queue.push_back(Head {
                origin: head.position,
                position: head.position,
                direction: *direction,
                energy: head.energy,
                brightness,
            });
        }
        log::trace!("{kind} at {} produced {} branch(es)", head.position, outputs.len());
        self.events.push(BeamEvent::Split {
            position: head.position,
            kind,
            outputs,
            energy: head.energy,
        });
    }

    fn strike(&mut self, cell: CellCoord, obstacle: Obstacle) {
        if !(obstacle.destructible && self.rules.beam_damage) {
            self.events.push(BeamEvent::Blocked { position: cell });
            return;
        }
        let Some(damage) = edit::damage_obstacle(&mut self.working, cell, 1) else {
            return;
        };
        self.events.push(BeamEvent::ObstacleHit {
            position: cell,
            durability: damage.remaining,
        });
        if damage.destroyed {
            log::trace!("obstacle at {cell} destroyed by a beam");
            self.events
                .push(BeamEvent::ObstacleDestroyed { position: cell });
        }
    }

    fn credit(&mut self, cell: CellCoord, energy: u32) {
        let Some(delivered) = self.target_energy.get_mut(&cell) else {
            return;
        };
        *delivered = delivered.saturating_add(energy);
        self.events.push(BeamEvent::TargetHit {
            position: cell,
            energy,
            delivered: *delivered,
        });
    }

    fn finish(self) -> PropagationOutcome {
        PropagationOutcome {
            segments: self.segments,
            events: self.events,
            target_energy: self.target_energy,
            loop_detected: self.loop_detected,
            residual: self.working,
        }
    }
}

fn fade(brightness: f32, factor: f32) -> f32 {
    (brightness * factor).max(MIN_BRIGHTNESS)
}
