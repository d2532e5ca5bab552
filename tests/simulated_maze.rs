// End-to-end exploration runs against the simulator

use maze_nest_runtime::config::ControllerConfig;
use maze_nest_runtime::error::Error;
use maze_nest_runtime::explore::{ExplorationController, GridPosition, Orientation, Phase, Side};
use maze_nest_runtime::hardware::{MazeSimulator, SimMaze};

fn config() -> ControllerConfig {
    ControllerConfig {
        max_cycles: Some(100_000),
        ..Default::default()
    }
}

fn simulator(maze: SimMaze) -> MazeSimulator {
    MazeSimulator::new(maze, GridPosition::new(1, 0), Orientation::North)
}

#[test]
fn test_reference_maze_explored_and_nest_entered() {
    let maze = SimMaze::reference();
    let mut hw = simulator(maze.clone());
    let mut controller = ExplorationController::new(config());

    let mut phases = vec![controller.phase()];
    controller
        .run(&mut hw, |c| {
            if phases.last() != Some(&c.phase()) {
                phases.push(c.phase());
            }
        })
        .unwrap();

    assert_eq!(
        phases,
        vec![
            Phase::Exploring,
            Phase::SeekingNest,
            Phase::EnteringNest,
            Phase::Done
        ]
    );
    assert_eq!(hw.collisions(), 0);

    let context = controller.context();
    assert_eq!(context.map.visited_count(), 16);
    assert_eq!(context.nest, Some(maze.nest()));
    // Ends up in the nest with its belief matching reality
    assert_eq!(hw.cell(), maze.nest());
    assert_eq!(context.pose.position(), maze.nest());
}

#[test]
fn test_recorded_map_matches_maze() {
    let maze = SimMaze::reference();
    let mut hw = simulator(maze.clone());
    let mut controller = ExplorationController::new(config());
    controller.run(&mut hw, |_| {}).unwrap();

    for (position, cell) in controller.context().map.iter() {
        assert!(cell.is_visited(), "{} never visited", position);
        for heading in Orientation::ALL {
            let expected = if maze.is_open(position, heading) {
                Side::Open
            } else {
                Side::Wall
            };
            assert_eq!(
                cell.side(heading),
                expected,
                "{} side {:?}",
                position,
                heading
            );
        }
    }
}

#[test]
fn test_boxed_in_robot_runs_out_of_cycles() {
    let maze = SimMaze::closed(GridPosition::new(3, 3));
    let mut hw = simulator(maze);
    let mut controller = ExplorationController::new(ControllerConfig {
        max_cycles: Some(2_000),
        ..Default::default()
    });

    let result = controller.run(&mut hw, |_| {});

    assert!(matches!(result, Err(Error::CycleBudgetExhausted(2_000))));
    assert_eq!(controller.context().map.visited_count(), 1);
    assert_eq!(controller.context().nest, None);
    assert!(hw.motors().is_stopped());
}
