use laser_grid_core::{
    Amplifier, BeamEvent, CellCoord, Direction, Element, ElementKind, Emitter, EnergyField,
    Mirror, MirrorOrientation, Obstacle, Occupant, Placement, Prism, Splitter, SplitterPattern,
    Target,
};
use laser_grid_system_propagation::{propagate, propagate_with, PropagationRules};
use laser_grid_world::{self as world, query, Grid};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn at(column: u32, row: u32) -> CellCoord {
    CellCoord::new(column, row)
}

fn add(column: u32, row: u32, element: impl Into<Element>) -> Placement {
    Placement::Add {
        position: at(column, row),
        element: element.into(),
    }
}

fn build(columns: u32, rows: u32, placements: &[Placement]) -> Grid {
    let empty = Grid::new(columns, rows).expect("grid");
    world::apply(&empty, placements).expect("placements")
}

fn emitter(direction: Direction, energy: u32) -> Occupant {
    Occupant::Emitter(Emitter {
        direction,
        energy,
        brightness: 1.0,
    })
}

fn mirror(orientation: MirrorOrientation) -> Occupant {
    Occupant::Mirror(Mirror { orientation })
}

fn field(drain: u32) -> Occupant {
    Occupant::EnergyField(EnergyField { drain })
}

fn obstacle(durability: u32) -> Occupant {
    Occupant::Obstacle(Obstacle {
        durability,
        destructible: true,
    })
}

fn doubler() -> Occupant {
    Occupant::Amplifier(Amplifier {
        multiplier: 2.0,
        additive: 0,
        cap: None,
    })
}

fn target() -> Element {
    Element::Target(Target {
        required_energy: 1,
        label: String::new(),
    })
}

#[test]
fn straight_beam_delivers_its_full_energy() {
    let grid = build(
        6,
        1,
        &[add(0, 0, emitter(Direction::East, 7)), add(4, 0, target())],
    );

    let outcome = propagate(&grid);

    assert_eq!(outcome.energy_at(at(4, 0)), 7);
    assert_eq!(outcome.segments.len(), 1);
    let segment = &outcome.segments[0];
    assert_eq!((segment.start, segment.end), (at(0, 0), at(5, 0)));
    assert_eq!(segment.direction, Direction::East);
    assert!(matches!(
        outcome.events.last(),
        Some(BeamEvent::LeftGrid {
            direction: Direction::East,
            ..
        })
    ));
}

#[test]
fn two_mirrors_route_the_beam_into_the_target() {
    let grid = build(
        6,
        6,
        &[
            add(0, 3, emitter(Direction::East, 10)),
            add(3, 3, mirror(MirrorOrientation::Slash)),
            add(3, 1, mirror(MirrorOrientation::Slash)),
            add(4, 1, target()),
        ],
    );

    let outcome = propagate(&grid);

    assert_eq!(outcome.energy_at(at(4, 1)), 10);
    let runs: Vec<(CellCoord, CellCoord, Direction)> = outcome
        .segments
        .iter()
        .map(|segment| (segment.start, segment.end, segment.direction))
        .collect();
    assert_eq!(
        runs,
        vec![
            (at(0, 3), at(3, 3), Direction::East),
            (at(3, 3), at(3, 1), Direction::North),
            (at(3, 1), at(5, 1), Direction::East),
        ]
    );
    assert!((outcome.segments[2].brightness - 0.92 * 0.92).abs() < 1e-6);
}

#[test]
fn energy_field_drains_before_the_target() {
    let grid = build(
        6,
        1,
        &[
            add(0, 0, emitter(Direction::East, 10)),
            add(2, 0, field(1)),
            add(4, 0, target()),
        ],
    );

    let outcome = propagate(&grid);

    assert_eq!(outcome.energy_at(at(4, 0)), 9);
    assert!(outcome.events.contains(&BeamEvent::Drained {
        position: at(2, 0),
        drain: 1,
        remaining: 9,
    }));
}

#[test]
fn each_field_lowers_delivered_energy_until_the_beam_dies() {
    for fields in 0..=4u32 {
        let mut placements = vec![add(0, 0, emitter(Direction::East, 10)), add(6, 0, target())];
        placements.extend((1..=fields).map(|column| add(column, 0, field(3))));
        let grid = build(8, 1, &placements);

        let outcome = propagate(&grid);

        assert_eq!(
            outcome.energy_at(at(6, 0)),
            10u32.saturating_sub(3 * fields),
            "{fields} field(s) of drain 3"
        );
    }
}

#[test]
fn draining_to_exactly_zero_extinguishes_the_beam() {
    let grid = build(
        6,
        1,
        &[
            add(0, 0, emitter(Direction::East, 6)),
            add(1, 0, field(3)),
            add(2, 0, field(3)),
            add(3, 0, target()),
        ],
    );

    let outcome = propagate(&grid);

    assert_eq!(outcome.energy_at(at(3, 0)), 0);
    assert!(outcome
        .events
        .contains(&BeamEvent::Extinguished { position: at(2, 0) }));
    assert_eq!(
        outcome.segments.last().map(|segment| segment.end),
        Some(at(2, 0))
    );
}

#[test]
fn prism_fans_full_energy_into_three_branches() {
    let grid = build(
        5,
        5,
        &[
            add(0, 2, emitter(Direction::East, 10)),
            add(2, 2, Occupant::Prism(Prism { spread: 1 })),
            add(4, 2, target()),
            add(2, 0, target()),
            add(2, 4, target()),
        ],
    );

    let outcome = propagate(&grid);

    for cell in [at(4, 2), at(2, 0), at(2, 4)] {
        assert_eq!(outcome.energy_at(cell), 10, "branch through {cell}");
    }
    assert!(outcome.events.contains(&BeamEvent::Split {
        position: at(2, 2),
        kind: ElementKind::Prism,
        outputs: vec![Direction::East, Direction::North, Direction::South],
        energy: 10,
    }));
}

#[test]
fn every_branch_inherits_the_energy_of_the_incoming_beam() {
    let grid = build(
        7,
        7,
        &[
            add(0, 3, emitter(Direction::East, 8)),
            add(
                3,
                3,
                Occupant::Splitter(Splitter {
                    pattern: SplitterPattern::Cross,
                }),
            ),
        ],
    );

    let outcome = propagate(&grid);

    let branches: Vec<u32> = outcome
        .segments
        .iter()
        .filter(|segment| segment.start == at(3, 3))
        .map(|segment| segment.energy)
        .collect();
    assert_eq!(branches.len(), 4);
    assert_eq!(branches.iter().sum::<u32>(), 4 * 8);
    assert!(outcome
        .segments
        .iter()
        .filter(|segment| segment.start == at(3, 3))
        .all(|segment| (segment.brightness - 0.88).abs() < 1e-6));
}

#[test]
fn amplifier_loops_terminate_and_are_flagged() {
    let grid = build(
        6,
        6,
        &[
            add(2, 1, emitter(Direction::East, 3)),
            add(4, 1, mirror(MirrorOrientation::Backslash)),
            add(4, 2, doubler()),
            add(4, 4, mirror(MirrorOrientation::Slash)),
            add(3, 4, target()),
            add(1, 4, mirror(MirrorOrientation::Backslash)),
            add(1, 1, mirror(MirrorOrientation::Slash)),
        ],
    );

    let outcome = propagate(&grid);

    assert!(outcome.loop_detected);
    assert_eq!(
        outcome.energy_at(at(3, 4)),
        6,
        "the target is credited once per lap before the guard stops the beam"
    );
    assert!(outcome.events.contains(&BeamEvent::CycleDetected {
        position: at(3, 1),
        direction: Direction::East,
    }));
}

#[test]
fn crossing_a_path_on_a_new_heading_is_not_a_cycle() {
    let grid = build(
        5,
        5,
        &[
            add(0, 2, emitter(Direction::East, 10)),
            add(3, 2, mirror(MirrorOrientation::Slash)),
            add(3, 0, mirror(MirrorOrientation::Backslash)),
            add(1, 0, mirror(MirrorOrientation::Slash)),
            add(1, 4, target()),
        ],
    );

    let outcome = propagate(&grid);

    assert!(!outcome.loop_detected);
    assert_eq!(outcome.energy_at(at(1, 4)), 10);
}

#[test]
fn amplifier_that_rounds_to_zero_extinguishes_the_beam() {
    let grid = build(
        5,
        1,
        &[
            add(0, 0, emitter(Direction::East, 1)),
            add(
                1,
                0,
                Occupant::Amplifier(Amplifier {
                    multiplier: 0.2,
                    additive: 0,
                    cap: None,
                }),
            ),
            add(3, 0, target()),
        ],
    );

    let outcome = propagate(&grid);

    assert_eq!(outcome.energy_at(at(3, 0)), 0);
    assert!(outcome
        .events
        .contains(&BeamEvent::Extinguished { position: at(1, 0) }));
}

#[test]
fn obstacle_of_durability_k_blocks_exactly_k_pulses() {
    let mut grid = build(
        5,
        1,
        &[
            add(0, 0, emitter(Direction::East, 4)),
            add(2, 0, obstacle(3)),
            add(4, 0, target()),
        ],
    );

    for pulse in 1..=3u32 {
        let outcome = propagate(&grid);
        assert_eq!(outcome.energy_at(at(4, 0)), 0, "pulse {pulse} is blocked");
        assert!(outcome.events.contains(&BeamEvent::ObstacleHit {
            position: at(2, 0),
            durability: 3 - pulse,
        }));
        grid = outcome.residual;
    }

    assert!(query::occupant(&grid, at(2, 0)).is_none());
    assert_eq!(propagate(&grid).energy_at(at(4, 0)), 4);
}

#[test]
fn disabling_beam_damage_leaves_obstacles_intact() {
    let grid = build(
        4,
        1,
        &[add(0, 0, emitter(Direction::East, 4)), add(2, 0, obstacle(1))],
    );

    let outcome = propagate_with(&grid, PropagationRules { beam_damage: false });

    assert_eq!(outcome.residual, grid);
    assert!(outcome
        .events
        .contains(&BeamEvent::Blocked { position: at(2, 0) }));
}

#[test]
fn earlier_emitters_clear_obstacles_for_later_ones() {
    let first = add(0, 1, emitter(Direction::East, 5));
    let second = add(2, 3, emitter(Direction::North, 5));
    let rest = [add(2, 1, obstacle(1)), add(2, 0, target())];

    let ordered = build(5, 4, &[vec![first.clone(), second.clone()], rest.to_vec()].concat());
    let reversed = build(5, 4, &[vec![second, first], rest.to_vec()].concat());

    assert_eq!(propagate(&ordered).energy_at(at(2, 0)), 5);
    assert_eq!(
        propagate(&reversed).energy_at(at(2, 0)),
        0,
        "the north-bound beam arrives first and spends itself on the obstacle"
    );
}

#[test]
fn partial_damage_does_not_depend_on_emitter_order() {
    let first = add(0, 1, emitter(Direction::East, 5));
    let second = add(2, 3, emitter(Direction::North, 5));
    let wall = add(2, 1, obstacle(5));

    let ordered = build(5, 4, &[first.clone(), second.clone(), wall.clone()]);
    let reversed = build(5, 4, &[second, first, wall]);

    let durability = |grid: &Grid| {
        query::obstacles(&propagate(grid).residual)
            .map(|(_, obstacle)| obstacle.durability)
            .collect::<Vec<_>>()
    };
    assert_eq!(durability(&ordered), vec![3]);
    assert_eq!(durability(&ordered), durability(&reversed));
}

#[test]
fn silent_emitters_produce_no_segments() {
    let grid = build(
        4,
        1,
        &[add(0, 0, emitter(Direction::East, 0)), add(2, 0, target())],
    );

    let outcome = propagate(&grid);

    assert!(outcome.segments.is_empty());
    assert_eq!(outcome.target_energy.get(&at(2, 0)), Some(&0));
}

#[test]
fn emitter_on_the_edge_facing_out_leaves_immediately() {
    let grid = build(3, 3, &[add(0, 1, emitter(Direction::West, 5))]);

    let outcome = propagate(&grid);

    assert!(outcome.segments.is_empty());
    assert!(outcome.events.contains(&BeamEvent::LeftGrid {
        position: at(0, 1),
        direction: Direction::West,
    }));
}

fn random_grid(rng: &mut ChaCha8Rng, size: u32) -> Grid {
    let mut grid = Grid::new(size, size).expect("grid");
    for _ in 0..(size * size / 2) {
        let cell = (rng.gen_range(0..size), rng.gen_range(0..size));
        let element: Element = match rng.gen_range(0..8) {
            0 => mirror(MirrorOrientation::Slash).into(),
            1 => mirror(MirrorOrientation::Backslash).into(),
            2 => Occupant::Prism(Prism {
                spread: rng.gen_range(0..3),
            })
            .into(),
            3 => Occupant::Splitter(Splitter {
                pattern: [
                    SplitterPattern::Dual,
                    SplitterPattern::Triple,
                    SplitterPattern::Cross,
                ][rng.gen_range(0..3)],
            })
            .into(),
            4 => doubler().into(),
            5 => field(rng.gen_range(1..3)).into(),
            6 => obstacle(rng.gen_range(1..3)).into(),
            _ => target(),
        };
        if let Ok(next) = world::apply(&grid, &[add(cell.0, cell.1, element)]) {
            grid = next;
        }
    }
    for _ in 0..3 {
        let direction = Direction::ALL[rng.gen_range(0..4)];
        let cell = (rng.gen_range(0..size), rng.gen_range(0..size));
        if let Ok(next) = world::apply(&grid, &[add(cell.0, cell.1, emitter(direction, 20))]) {
            grid = next;
        }
    }
    grid
}

#[test]
fn random_grids_replay_identically_and_stay_bounded() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x1a5e_7a11);
    for round in 0..50 {
        let grid = random_grid(&mut rng, 8);
        let emitters = query::emitters(&grid).count();

        let first = propagate(&grid);
        let second = propagate(&grid);

        assert_eq!(first, second, "round {round} replays identically");
        assert!(
            first.segments.len() <= emitters * 8 * 8 * 4,
            "round {round} produced {} segments",
            first.segments.len()
        );
    }
}
