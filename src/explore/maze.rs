// Occupancy model of the 4x4 maze
//
// Each cell is written exactly once, the first time the robot believes it
// is standing in it. Readings are taken relative to the robot and rotated
// into absolute headings before they are stored.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pose::{GridPosition, Orientation, GRID_SIZE};
use super::sensors::Proximity;

const CELL_COUNT: u8 = GRID_SIZE * GRID_SIZE;

/// What lies on one side of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Not observed yet
    #[default]
    Unknown,
    Open,
    Wall,
}

impl Side {
    fn from_open(open: bool) -> Self {
        if open { Side::Open } else { Side::Wall }
    }
}

/// Openings around the robot, relative to its heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeOpenings {
    pub front: bool,
    pub right: bool,
    pub rear: bool,
    pub left: bool,
}

impl RelativeOpenings {
    /// A side is open when nothing reads closer than the wall threshold
    pub fn from_proximity(proximity: &Proximity, wall_above: u16) -> Self {
        Self {
            front: proximity.front <= wall_above,
            right: proximity.right <= wall_above,
            rear: proximity.rear <= wall_above,
            left: proximity.left <= wall_above,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    visited: bool,
    /// Indexed by absolute heading
    sides: [Side; 4],
}

impl Cell {
    pub fn is_visited(&self) -> bool {
        self.visited
    }

    pub fn side(&self, heading: Orientation) -> Side {
        self.sides[heading.index()]
    }

    pub fn sides(&self) -> [Side; 4] {
        self.sides
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MazeMap {
    /// cells[x][y]
    cells: [[Cell; GRID_SIZE as usize]; GRID_SIZE as usize],
    visited: u8,
}

impl MazeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, position: GridPosition) -> &Cell {
        &self.cells[position.x as usize][position.y as usize]
    }

    pub fn visited_count(&self) -> u8 {
        self.visited
    }

    /// Every cell has been visited
    pub fn is_complete(&self) -> bool {
        self.visited == CELL_COUNT
    }

    /// Mark `position` visited and store its sides, unless it was visited
    /// before. Returns whether anything was written.
    pub fn record_if_unvisited(
        &mut self,
        position: GridPosition,
        orientation: Orientation,
        openings: RelativeOpenings,
    ) -> bool {
        let cell = &mut self.cells[position.x as usize][position.y as usize];
        if cell.visited {
            return false;
        }
        cell.visited = true;
        cell.sides[orientation.index()] = Side::from_open(openings.front);
        cell.sides[orientation.rotated(1).index()] = Side::from_open(openings.right);
        cell.sides[orientation.rotated(2).index()] = Side::from_open(openings.rear);
        cell.sides[orientation.rotated(3).index()] = Side::from_open(openings.left);
        self.visited += 1;
        true
    }

    /// All cells with their positions, row by row from y = 0
    pub fn iter(&self) -> impl Iterator<Item = (GridPosition, &Cell)> + '_ {
        (0..GRID_SIZE).flat_map(move |y| {
            (0..GRID_SIZE).map(move |x| (GridPosition::new(x, y), self.cell(GridPosition::new(x, y))))
        })
    }
}

fn horizontal(side: Side) -> &'static str {
    match side {
        Side::Wall => "---",
        Side::Open => "   ",
        Side::Unknown => " ? ",
    }
}

fn vertical(side: Side) -> char {
    match side {
        Side::Wall => '|',
        Side::Open => ' ',
        Side::Unknown => '?',
    }
}

/// ASCII rendering, north at the top. Interior boundaries are drawn from
/// the cell north or west of them; unvisited cells show a dot.
impl fmt::Display for MazeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..GRID_SIZE).rev() {
            for x in 0..GRID_SIZE {
                let cell = self.cell(GridPosition::new(x, y));
                write!(f, "+{}", horizontal(cell.side(Orientation::North)))?;
            }
            writeln!(f, "+")?;
            for x in 0..GRID_SIZE {
                let cell = self.cell(GridPosition::new(x, y));
                let body = if cell.is_visited() { "   " } else { " . " };
                write!(f, "{}{}", vertical(cell.side(Orientation::West)), body)?;
            }
            let last = self.cell(GridPosition::new(GRID_SIZE - 1, y));
            writeln!(f, "{}", vertical(last.side(Orientation::East)))?;
        }
        for x in 0..GRID_SIZE {
            let cell = self.cell(GridPosition::new(x, 0));
            write!(f, "+{}", horizontal(cell.side(Orientation::South)))?;
        }
        write!(f, "+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OPEN: RelativeOpenings = RelativeOpenings {
        front: true,
        right: true,
        rear: true,
        left: true,
    };

    #[test]
    fn test_first_visit_rotates_readings() {
        let mut map = MazeMap::new();
        let start = GridPosition::new(1, 0);
        let openings = RelativeOpenings {
            front: true,
            right: true,
            rear: false,
            left: true,
        };

        assert!(map.record_if_unvisited(start, Orientation::East, openings));
        let cell = map.cell(start);
        assert!(cell.is_visited());
        assert_eq!(cell.side(Orientation::East), Side::Open); // front
        assert_eq!(cell.side(Orientation::South), Side::Open); // right
        assert_eq!(cell.side(Orientation::West), Side::Wall); // rear
        assert_eq!(cell.side(Orientation::North), Side::Open); // left
        assert_eq!(map.visited_count(), 1);
    }

    #[test]
    fn test_rotation_for_every_heading() {
        for heading in Orientation::ALL {
            let mut map = MazeMap::new();
            let pos = GridPosition::new(2, 3);
            let only_left_open = RelativeOpenings {
                front: false,
                right: false,
                rear: false,
                left: true,
            };
            map.record_if_unvisited(pos, heading, only_left_open);
            let sides = map.cell(pos).sides();
            let open: Vec<usize> = (0..4).filter(|&i| sides[i] == Side::Open).collect();
            assert_eq!(open, vec![heading.counter_clockwise().index()]);
        }
    }

    #[test]
    fn test_second_visit_is_ignored() {
        let mut map = MazeMap::new();
        let pos = GridPosition::new(3, 3);
        map.record_if_unvisited(pos, Orientation::North, ALL_OPEN);
        let before = *map.cell(pos);

        let closed = RelativeOpenings {
            front: false,
            right: false,
            rear: false,
            left: false,
        };
        assert!(!map.record_if_unvisited(pos, Orientation::South, closed));
        assert_eq!(*map.cell(pos), before);
        assert_eq!(map.visited_count(), 1);
    }

    #[test]
    fn test_count_matches_visited_cells() {
        let mut map = MazeMap::new();
        for round in 0..3 {
            for x in 0..GRID_SIZE {
                for y in 0..GRID_SIZE {
                    map.record_if_unvisited(GridPosition::new(x, y), Orientation::West, ALL_OPEN);
                }
            }
            assert_eq!(map.visited_count(), 16, "round {}", round);
        }
        let visited = map.iter().filter(|(_, cell)| cell.is_visited()).count();
        assert_eq!(visited, 16);
        assert!(map.is_complete());
    }

    #[test]
    fn test_unvisited_sides_unknown() {
        let map = MazeMap::new();
        assert_eq!(map.cell(GridPosition::new(0, 0)).sides(), [Side::Unknown; 4]);
        assert!(!map.is_complete());
    }

    #[test]
    fn test_openings_from_proximity() {
        let proximity = Proximity {
            front: 201,
            rear: 200,
            left: 0,
            right: 4095,
            ..Default::default()
        };
        let openings = RelativeOpenings::from_proximity(&proximity, 200);
        assert!(!openings.front);
        assert!(openings.rear);
        assert!(openings.left);
        assert!(!openings.right);
    }

    #[test]
    fn test_render_marks_unvisited() {
        let mut map = MazeMap::new();
        map.record_if_unvisited(
            GridPosition::new(0, 3),
            Orientation::North,
            RelativeOpenings {
                front: false,
                right: true,
                rear: true,
                left: false,
            },
        );
        let rendered = map.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "+---+ ? + ? + ? +");
        assert_eq!(lines[1], "|   ? . ? . ? . ?");
    }
}
