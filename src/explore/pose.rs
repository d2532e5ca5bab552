// Dead-reckoned pose: cardinal heading plus grid cell
//
// The pose only moves on confirmed line crossings (`advance`) and on
// completed quarter turns. Both axes wrap modulo the grid size.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cells along each side of the maze
pub const GRID_SIZE: u8 = 4;

/// Cardinal heading, numbered clockwise from North
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Heading for any index, wrapping modulo 4
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// Heading after `quarter_turns` clockwise quarter turns
    pub fn rotated(self, quarter_turns: usize) -> Self {
        Self::from_index(self.index() + quarter_turns)
    }

    pub fn clockwise(self) -> Self {
        self.rotated(1)
    }

    pub fn counter_clockwise(self) -> Self {
        self.rotated(3)
    }

    pub fn opposite(self) -> Self {
        self.rotated(2)
    }

    /// Single-letter label used in logs
    pub fn letter(self) -> char {
        match self {
            Orientation::North => 'N',
            Orientation::East => 'E',
            Orientation::South => 'S',
            Orientation::West => 'W',
        }
    }
}

/// A cell of the maze grid; both coordinates are always in `[0, GRID_SIZE)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u8,
    pub y: u8,
}

impl GridPosition {
    /// Create a position, wrapping out-of-range coordinates onto the grid
    pub fn new(x: u8, y: u8) -> Self {
        Self {
            x: x % GRID_SIZE,
            y: y % GRID_SIZE,
        }
    }

    /// One cell towards `heading`, wrapping at the grid edges.
    /// North increments y, East increments x.
    pub fn stepped(self, heading: Orientation) -> Self {
        let last = GRID_SIZE - 1;
        match heading {
            Orientation::North => Self::new(self.x, self.y + 1),
            Orientation::East => Self::new(self.x + 1, self.y),
            Orientation::South => Self::new(self.x, if self.y == 0 { last } else { self.y - 1 }),
            Orientation::West => Self::new(if self.x == 0 { last } else { self.x - 1 }, self.y),
        }
    }

    /// The adjacent cell towards `heading`, or `None` at the grid edge
    pub fn neighbor(self, heading: Orientation) -> Option<Self> {
        let last = GRID_SIZE - 1;
        let inside = match heading {
            Orientation::North => self.y < last,
            Orientation::East => self.x < last,
            Orientation::South => self.y > 0,
            Orientation::West => self.x > 0,
        };
        inside.then(|| self.stepped(heading))
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Heading and believed cell of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pose {
    position: GridPosition,
    orientation: Orientation,
}

impl Pose {
    pub fn new(position: GridPosition, orientation: Orientation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Move one cell along the current heading
    pub fn advance(&mut self) {
        self.position = self.position.stepped(self.orientation);
    }

    /// Record a completed quarter turn to the right
    pub fn turn_right(&mut self) {
        self.orientation = self.orientation.clockwise();
    }

    /// Record a completed quarter turn to the left
    pub fn turn_left(&mut self) {
        self.orientation = self.orientation.counter_clockwise();
    }
}
