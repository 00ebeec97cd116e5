use serde::{Deserialize, Serialize};

use crate::error::RulesError;

pub const BOARD_SIZE: usize = 9;
pub const WALL_GRID_SIZE: usize = BOARD_SIZE - 1;
pub const WALLS_PER_PAWN: u8 = 10;
pub const NUM_PLAYERS: usize = 2;

/// A cell on the 9×9 board, or a wall cell on the 8×8 wall grid. Which grid a position refers to is
/// determined by the context it is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Neighbouring cell in `direction`, or `None` when it would leave the board.
    pub fn step(self, direction: Direction) -> Option<Position> {
        let (d_row, d_col) = direction.delta();
        let row = self.row as i8 + d_row;
        let col = self.col as i8 + d_col;
        let range = 0..BOARD_SIZE as i8;
        (range.contains(&row) && range.contains(&col)).then(|| Position::new(row as u8, col as u8))
    }

    pub(crate) fn is_on_board(self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    pub(crate) fn is_wall_cell(self) -> bool {
        (self.row as usize) < WALL_GRID_SIZE && (self.col as usize) < WALL_GRID_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed enumeration order; move generation and tie-breaking rely on it.
    pub const ALL: [Direction; 4] =
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn from_delta(d_row: i8, d_col: i8) -> Result<Self, RulesError> {
        match (d_row, d_col) {
            (-1, 0) => Ok(Direction::Up),
            (1, 0) => Ok(Direction::Down),
            (0, -1) => Ok(Direction::Left),
            (0, 1) => Ok(Direction::Right),
            _ => Err(RulesError::InvalidDirection { d_row, d_col }),
        }
    }

    /// The two directions perpendicular to the line of travel.
    pub const fn laterals(self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pawn {
    pub index: u8,
    /// True when this pawn is driven by the human side of the table.
    pub is_human_side: bool,
    pub position: Position,
    pub goal_row: u8,
    pub walls_left: u8,
}

impl Pawn {
    pub fn new(index: u8, is_human_side: bool) -> Self {
        let (position, goal_row) = if index == 0 {
            (Position::new(8, 4), 0)
        } else {
            (Position::new(0, 4), 8)
        };
        Self {
            index,
            is_human_side,
            position,
            goal_row,
            walls_left: WALLS_PER_PAWN,
        }
    }

    pub fn has_reached_goal(&self) -> bool {
        self.position.row == self.goal_row
    }
}

/// Two 8×8 boolean grids, one per wall orientation. Holds placed walls on the board, and doubles as
/// a cell mask for legal or candidate wall placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WallGrid {
    pub horizontal: [[bool; WALL_GRID_SIZE]; WALL_GRID_SIZE],
    pub vertical: [[bool; WALL_GRID_SIZE]; WALL_GRID_SIZE],
}

impl WallGrid {
    pub fn filled(value: bool) -> Self {
        Self {
            horizontal: [[value; WALL_GRID_SIZE]; WALL_GRID_SIZE],
            vertical: [[value; WALL_GRID_SIZE]; WALL_GRID_SIZE],
        }
    }

    fn grid(&self, orientation: Orientation) -> &[[bool; WALL_GRID_SIZE]; WALL_GRID_SIZE] {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }

    fn grid_mut(
        &mut self,
        orientation: Orientation,
    ) -> &mut [[bool; WALL_GRID_SIZE]; WALL_GRID_SIZE] {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        }
    }

    pub fn get(&self, orientation: Orientation, cell: Position) -> bool {
        self.at(orientation, cell.row as i16, cell.col as i16)
    }

    pub fn set(&mut self, orientation: Orientation, cell: Position, value: bool) {
        self.set_at(orientation, cell.row as i16, cell.col as i16, value);
    }

    /// Signed lookup; anything off the grid reads as `false`.
    pub(crate) fn at(&self, orientation: Orientation, row: i16, col: i16) -> bool {
        match (usize::try_from(row), usize::try_from(col)) {
            (Ok(r), Ok(c)) if r < WALL_GRID_SIZE && c < WALL_GRID_SIZE => {
                self.grid(orientation)[r][c]
            }
            _ => false,
        }
    }

    /// Signed store; writes off the grid are dropped.
    pub(crate) fn set_at(&mut self, orientation: Orientation, row: i16, col: i16, value: bool) {
        if let (Ok(r), Ok(c)) = (usize::try_from(row), usize::try_from(col)) {
            if r < WALL_GRID_SIZE && c < WALL_GRID_SIZE {
                self.grid_mut(orientation)[r][c] = value;
            }
        }
    }

    /// Every set cell, horizontal grid first, each grid in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Orientation, Position)> + '_ {
        [Orientation::Horizontal, Orientation::Vertical]
            .into_iter()
            .flat_map(move |orientation| {
                (0..WALL_GRID_SIZE).flat_map(move |row| {
                    (0..WALL_GRID_SIZE).filter_map(move |col| {
                        self.grid(orientation)[row][col]
                            .then_some((orientation, Position::new(row as u8, col as u8)))
                    })
                })
            })
    }

    pub fn count(&self) -> usize {
        self.cells().count()
    }

    pub fn intersect(&mut self, other: &WallGrid) {
        for orientation in [Orientation::Horizontal, Orientation::Vertical] {
            let other_grid = other.grid(orientation);
            for (row, cells) in self.grid_mut(orientation).iter_mut().enumerate() {
                for (col, cell) in cells.iter_mut().enumerate() {
                    *cell &= other_grid[row][col];
                }
            }
        }
    }

    /// Clears `cell` and every cell of either orientation that a wall placed there would collide
    /// with: the crossing wall and the two half-overlapping parallel neighbours.
    pub(crate) fn clear_conflicts(&mut self, orientation: Orientation, cell: Position) {
        let (row, col) = (cell.row as i16, cell.col as i16);
        self.set_at(Orientation::Horizontal, row, col, false);
        self.set_at(Orientation::Vertical, row, col, false);
        match orientation {
            Orientation::Horizontal => {
                self.set_at(Orientation::Horizontal, row, col - 1, false);
                self.set_at(Orientation::Horizontal, row, col + 1, false);
            }
            Orientation::Vertical => {
                self.set_at(Orientation::Vertical, row - 1, col, false);
                self.set_at(Orientation::Vertical, row + 1, col, false);
            }
        }
    }
}

/// One passage of the movement graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edge {
    /// Between `(row, col)` and `(row + 1, col)`.
    UpDown { row: usize, col: usize },
    /// Between `(row, col)` and `(row, col + 1)`.
    LeftRight { row: usize, col: usize },
}

/// Edge set of the movement graph. Only ever derived from a [`WallGrid`]; there is no API to open
/// or close a single edge from outside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenWays {
    up_down: [[bool; BOARD_SIZE]; WALL_GRID_SIZE],
    left_right: [[bool; WALL_GRID_SIZE]; BOARD_SIZE],
}

impl OpenWays {
    pub fn new() -> Self {
        Self {
            up_down: [[true; BOARD_SIZE]; WALL_GRID_SIZE],
            left_right: [[true; WALL_GRID_SIZE]; BOARD_SIZE],
        }
    }

    pub fn from_walls(walls: &WallGrid) -> Self {
        let mut ways = Self::new();
        for (orientation, cell) in walls.cells() {
            ways.close_wall(orientation, cell);
        }
        ways
    }

    /// Whether a pawn on `from` may step one cell in `direction`. Leaving the board is never open.
    pub fn is_open(&self, from: Position, direction: Direction) -> bool {
        let (row, col) = (from.row as usize, from.col as usize);
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return false;
        }
        match direction {
            Direction::Up => row > 0 && self.up_down[row - 1][col],
            Direction::Down => row < WALL_GRID_SIZE && self.up_down[row][col],
            Direction::Left => col > 0 && self.left_right[row][col - 1],
            Direction::Right => col < WALL_GRID_SIZE && self.left_right[row][col],
        }
    }

    /// The two passages a wall at `cell` cuts.
    pub(crate) fn wall_edges(orientation: Orientation, cell: Position) -> [Edge; 2] {
        let (row, col) = (cell.row as usize, cell.col as usize);
        match orientation {
            Orientation::Horizontal => {
                [Edge::UpDown { row, col }, Edge::UpDown { row, col: col + 1 }]
            }
            Orientation::Vertical => [
                Edge::LeftRight { row, col },
                Edge::LeftRight { row: row + 1, col },
            ],
        }
    }

    fn edge(&self, edge: Edge) -> bool {
        match edge {
            Edge::UpDown { row, col } => self.up_down[row][col],
            Edge::LeftRight { row, col } => self.left_right[row][col],
        }
    }

    fn set_edge(&mut self, edge: Edge, open: bool) {
        match edge {
            Edge::UpDown { row, col } => self.up_down[row][col] = open,
            Edge::LeftRight { row, col } => self.left_right[row][col] = open,
        }
    }

    pub(crate) fn close_wall(&mut self, orientation: Orientation, cell: Position) {
        for edge in Self::wall_edges(orientation, cell) {
            self.set_edge(edge, false);
        }
    }

    /// Runs `probe` against the graph as it would look with a wall at `cell`, then puts both edges
    /// back exactly as they were.
    pub(crate) fn with_wall<R>(
        &mut self,
        orientation: Orientation,
        cell: Position,
        probe: impl FnOnce(&OpenWays) -> R,
    ) -> R {
        let edges = Self::wall_edges(orientation, cell);
        let saved = edges.map(|edge| self.edge(edge));
        for edge in edges {
            self.set_edge(edge, false);
        }
        let result = probe(self);
        for (edge, open) in edges.into_iter().zip(saved) {
            self.set_edge(edge, open);
        }
        result
    }
}

impl Default for OpenWays {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub pawns: [Pawn; NUM_PLAYERS],
    pub walls: WallGrid,
}

impl Board {
    pub fn new(human_first: bool) -> Self {
        Self {
            pawns: [Pawn::new(0, human_first), Pawn::new(1, !human_first)],
            walls: WallGrid::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_wall_cuts_two_vertical_passages() {
        let mut walls = WallGrid::default();
        walls.set(Orientation::Horizontal, Position::new(3, 4), true);
        let ways = OpenWays::from_walls(&walls);

        assert!(!ways.is_open(Position::new(3, 4), Direction::Down));
        assert!(!ways.is_open(Position::new(3, 5), Direction::Down));
        assert!(!ways.is_open(Position::new(4, 4), Direction::Up));
        assert!(ways.is_open(Position::new(3, 3), Direction::Down));
        assert!(ways.is_open(Position::new(3, 6), Direction::Down));
        assert!(ways.is_open(Position::new(3, 4), Direction::Right));
    }

    #[test]
    fn vertical_wall_cuts_two_horizontal_passages() {
        let mut walls = WallGrid::default();
        walls.set(Orientation::Vertical, Position::new(0, 0), true);
        let ways = OpenWays::from_walls(&walls);

        assert!(!ways.is_open(Position::new(0, 0), Direction::Right));
        assert!(!ways.is_open(Position::new(1, 1), Direction::Left));
        assert!(ways.is_open(Position::new(2, 0), Direction::Right));
    }

    #[test]
    fn board_border_is_never_open() {
        let ways = OpenWays::new();
        assert!(!ways.is_open(Position::new(0, 4), Direction::Up));
        assert!(!ways.is_open(Position::new(8, 4), Direction::Down));
        assert!(!ways.is_open(Position::new(4, 0), Direction::Left));
        assert!(!ways.is_open(Position::new(4, 8), Direction::Right));
    }

    #[test]
    fn probing_a_wall_restores_the_graph() {
        let mut ways = OpenWays::new();
        let blocked = ways.with_wall(Orientation::Horizontal, Position::new(7, 3), |probe| {
            !probe.is_open(Position::new(8, 4), Direction::Up)
        });
        assert!(blocked);
        assert_eq!(ways, OpenWays::new());
    }

    #[test]
    fn conflicts_cover_crossing_and_half_overlaps() {
        let mut available = WallGrid::filled(true);
        available.clear_conflicts(Orientation::Vertical, Position::new(4, 4));

        assert!(!available.get(Orientation::Vertical, Position::new(4, 4)));
        assert!(!available.get(Orientation::Vertical, Position::new(3, 4)));
        assert!(!available.get(Orientation::Vertical, Position::new(5, 4)));
        assert!(!available.get(Orientation::Horizontal, Position::new(4, 4)));
        assert!(available.get(Orientation::Horizontal, Position::new(4, 3)));
        assert!(available.get(Orientation::Vertical, Position::new(2, 4)));
        assert_eq!(available.count(), 128 - 4);
    }

    #[test]
    fn delta_outside_unit_vectors_is_rejected() {
        assert_eq!(Direction::from_delta(0, 1), Ok(Direction::Right));
        assert_eq!(
            Direction::from_delta(1, 1),
            Err(RulesError::InvalidDirection { d_row: 1, d_col: 1 })
        );
    }
}
