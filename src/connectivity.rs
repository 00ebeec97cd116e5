//! Reachability over the movement graph.
//!
//! Every wall placement is guarded by [`wall_keeps_paths`]: a cheap geometric precheck decides
//! whether the wall could close off a region at all, and only then are both pawns traced to their
//! goal rows on a temporarily modified graph.

use petgraph::visit::{Bfs, Dfs, GraphBase, IntoNeighbors, VisitMap, Visitable};
use smallvec::SmallVec;

use crate::board::{
    Board, Direction, OpenWays, Orientation, Position, BOARD_SIZE, WALL_GRID_SIZE,
};

pub const UNREACHABLE: u8 = u8::MAX;

/// Visit marks for the 81 cells.
#[derive(Debug, Clone)]
pub struct VisitedCells([[bool; BOARD_SIZE]; BOARD_SIZE]);

impl VisitMap<Position> for VisitedCells {
    fn visit(&mut self, cell: Position) -> bool {
        let slot = &mut self.0[cell.row as usize][cell.col as usize];
        !std::mem::replace(slot, true)
    }

    fn is_visited(&self, cell: &Position) -> bool {
        self.0[cell.row as usize][cell.col as usize]
    }
}

// The open ways are walked directly as a petgraph graph: cells are nodes, open passages are
// edges. Probing a wall toggles the grid in place, so nothing is ever rebuilt.
impl GraphBase for OpenWays {
    type EdgeId = (Position, Direction);
    type NodeId = Position;
}

impl Visitable for OpenWays {
    type Map = VisitedCells;

    fn visit_map(&self) -> VisitedCells {
        VisitedCells([[false; BOARD_SIZE]; BOARD_SIZE])
    }

    fn reset_map(&self, map: &mut VisitedCells) {
        map.0 = [[false; BOARD_SIZE]; BOARD_SIZE];
    }
}

impl<'a> IntoNeighbors for &'a OpenWays {
    type Neighbors = smallvec::IntoIter<[Position; 4]>;

    fn neighbors(self, cell: Position) -> Self::Neighbors {
        let cells: SmallVec<[Position; 4]> = Direction::ALL
            .into_iter()
            .filter(|&direction| self.is_open(cell, direction))
            .filter_map(|direction| cell.step(direction))
            .collect();
        cells.into_iter()
    }
}

/// Depth-first search from `start` that stops at the first cell on `goal_row`. False for a start
/// or goal row off the board.
pub fn is_connected_to_goal_row(ways: &OpenWays, start: Position, goal_row: u8) -> bool {
    if !start.is_on_board() || usize::from(goal_row) >= BOARD_SIZE {
        return false;
    }
    let mut dfs = Dfs::new(ways, start);
    while let Some(cell) = dfs.next(ways) {
        if cell.row == goal_row {
            return true;
        }
    }
    false
}

/// Breadth-first distance field: the number of steps from every cell to the nearest cell of
/// `goal_row`, ignoring pawns. Cells cut off from the row hold [`UNREACHABLE`], as does every cell
/// when `goal_row` is off the board.
pub fn goal_distances(ways: &OpenWays, goal_row: u8) -> [[u8; BOARD_SIZE]; BOARD_SIZE] {
    let mut distances = [[UNREACHABLE; BOARD_SIZE]; BOARD_SIZE];
    if usize::from(goal_row) >= BOARD_SIZE {
        return distances;
    }

    // seed the queue with the whole goal row
    let mut bfs = Bfs::new(ways, Position::new(goal_row, 0));
    for col in 1..BOARD_SIZE as u8 {
        let cell = Position::new(goal_row, col);
        bfs.discovered.visit(cell);
        bfs.stack.push_back(cell);
    }

    // cells come out in order of distance, so the nearest settled neighbour is the parent
    while let Some(cell) = bfs.next(ways) {
        let distance = if cell.row == goal_row {
            0
        } else {
            ways.neighbors(cell)
                .map(|next| distances[next.row as usize][next.col as usize])
                .min()
                .map_or(UNREACHABLE, |parent| parent.saturating_add(1))
        };
        distances[cell.row as usize][cell.col as usize] = distance;
    }
    distances
}

/// Two-point test. A wall can only seal off a region when at least two of its three anchor points
/// (both ends and the midpoint) already touch the border or another wall; with fewer there is
/// always a way around it.
pub fn needs_path_check(board: &Board, orientation: Orientation, cell: Position) -> bool {
    let walls = &board.walls;
    let (r, c) = (cell.row as i16, cell.col as i16);
    let last = WALL_GRID_SIZE as i16 - 1;
    let h = |row: i16, col: i16| walls.at(Orientation::Horizontal, row, col);
    let v = |row: i16, col: i16| walls.at(Orientation::Vertical, row, col);

    let anchors = match orientation {
        Orientation::Horizontal => {
            let left = c == 0 || h(r, c - 2) || v(r - 1, c - 1) || v(r, c - 1) || v(r + 1, c - 1);
            let right =
                c == last || h(r, c + 2) || v(r - 1, c + 1) || v(r, c + 1) || v(r + 1, c + 1);
            let middle = v(r - 1, c) || v(r + 1, c);
            [left, middle, right]
        }
        Orientation::Vertical => {
            let top = r == 0 || v(r - 2, c) || h(r - 1, c - 1) || h(r - 1, c) || h(r - 1, c + 1);
            let bottom =
                r == last || v(r + 2, c) || h(r + 1, c - 1) || h(r + 1, c) || h(r + 1, c + 1);
            let middle = h(r, c - 1) || h(r, c + 1);
            [top, middle, bottom]
        }
    };
    anchors.into_iter().filter(|&anchored| anchored).count() >= 2
}

/// Whether both pawns still reach their goal rows once a wall sits at `cell`. The graph is probed
/// in place and left exactly as it was found.
pub fn wall_keeps_paths(
    ways: &mut OpenWays,
    board: &Board,
    orientation: Orientation,
    cell: Position,
) -> bool {
    if !needs_path_check(board, orientation, cell) {
        return true;
    }
    ways.with_wall(orientation, cell, |probe| {
        board
            .pawns
            .iter()
            .all(|pawn| is_connected_to_goal_row(probe, pawn.position, pawn.goal_row))
    })
}
