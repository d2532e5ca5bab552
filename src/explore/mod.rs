// Maze exploration core
//
// Provides:
// - Grid pose and map of the 4x4 maze
// - Sensor snapshots taken through the `Hardware` trait
// - Wall following, line crossing and the deferred left-turn timer
// - The exploration state machine that ties them together

pub mod controller;
pub mod follower;
pub mod line;
pub mod maze;
pub mod pose;
pub mod sensors;
pub mod timer;
pub mod victory;

pub use controller::{ExplorationContext, ExplorationController, Phase};
pub use maze::{Cell, MazeMap, Side};
pub use pose::{GridPosition, Orientation, Pose, GRID_SIZE};
pub use sensors::{Proximity, SensorSnapshot};
