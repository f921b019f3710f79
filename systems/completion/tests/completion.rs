use laser_grid_core::{
    CellCoord, Direction, Emitter, LevelGoals, Mirror, MirrorOrientation, Occupant, Placement,
    Target,
};
use laser_grid_system_completion::{evaluate, is_complete};
use laser_grid_system_propagation::propagate;
use laser_grid_world::{self as world, Grid};

fn intro_grid(with_second_mirror: bool) -> Grid {
    let mut placements = vec![
        Placement::Add {
            position: CellCoord::new(0, 3),
            element: Occupant::Emitter(Emitter {
                direction: Direction::East,
                energy: 10,
                brightness: 1.0,
            })
            .into(),
        },
        Placement::Add {
            position: CellCoord::new(3, 3),
            element: Occupant::Mirror(Mirror {
                orientation: MirrorOrientation::Slash,
            })
            .into(),
        },
        Placement::Add {
            position: CellCoord::new(4, 1),
            element: laser_grid_core::Element::Target(Target {
                required_energy: 1,
                label: "goal".to_owned(),
            }),
        },
    ];
    if with_second_mirror {
        placements.push(Placement::Add {
            position: CellCoord::new(3, 1),
            element: Occupant::Mirror(Mirror {
                orientation: MirrorOrientation::Slash,
            })
            .into(),
        });
    }
    let empty = Grid::new(6, 6).expect("grid");
    world::apply(&empty, &placements).expect("placements")
}

#[test]
fn placing_the_second_mirror_completes_the_level() {
    let unsolved = intro_grid(false);
    assert!(!is_complete(&unsolved, &propagate(&unsolved).target_energy));

    let solved = intro_grid(true);
    let outcome = propagate(&solved);
    assert_eq!(outcome.energy_at(CellCoord::new(4, 1)), 10);
    assert!(is_complete(&solved, &outcome.target_energy));
}

#[test]
fn level_goals_are_reported_separately() {
    let grid = intro_grid(true);
    let outcome = propagate(&grid);

    let plain = evaluate(&grid, LevelGoals::default(), &outcome);
    assert!(plain.complete);

    let demanding = evaluate(
        &grid,
        LevelGoals {
            loop_required: true,
            energy_goal: Some(11),
        },
        &outcome,
    );
    assert!(demanding.targets_met);
    assert!(!demanding.energy_goal_met, "ten energy misses a goal of eleven");
    assert!(!demanding.loop_met, "no beam looped");
    assert!(!demanding.complete);

    let reachable = evaluate(
        &grid,
        LevelGoals {
            loop_required: false,
            energy_goal: Some(10),
        },
        &outcome,
    );
    assert!(reachable.complete);
}
