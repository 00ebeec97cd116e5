//! Narrows the 128 wall cells down to the ones worth searching: walls hugging either pawn, walls
//! extending or touching walls already on the board, and, once the opening is over, walls sealing
//! the two side columns. Only the search uses this; people always get the full legal set.

use crate::board::{Board, Orientation, Position, WallGrid, WALL_GRID_SIZE};

/// Half-moves after which the outermost horizontal wall columns become candidates.
pub const SIDE_COLUMNS_FROM_TURN: u32 = 6;

/// Marks the wall cells around a pawn.
///
/// The inner ring is the eight placements touching the pawn's cell: the four corners of the cell in
/// both orientations, which are exactly the walls that can cut one of its four exits. The outer
/// ring extends each of those one more step along the wall's own axis, covering the walls that
/// close the neighbouring cells' exits in the same line.
pub fn mark_near_pawn(mask: &mut WallGrid, position: Position) {
    let (row, col) = (position.row as i16, position.col as i16);
    for r in [row - 1, row] {
        for c in [col - 1, col] {
            mask.set_at(Orientation::Horizontal, r, c, true);
            mask.set_at(Orientation::Vertical, r, c, true);
        }
        mask.set_at(Orientation::Horizontal, r, col - 2, true);
        mask.set_at(Orientation::Horizontal, r, col + 1, true);
    }
    for c in [col - 1, col] {
        mask.set_at(Orientation::Vertical, row - 2, c, true);
        mask.set_at(Orientation::Vertical, row + 1, c, true);
    }
}

/// Marks the ring around a freshly placed wall. Callers keep the result across the whole game; it
/// only ever grows.
pub fn mark_near_wall(mask: &mut WallGrid, orientation: Orientation, cell: Position) {
    let (row, col) = (cell.row as i16, cell.col as i16);
    let (parallel, crossing) = match orientation {
        Orientation::Horizontal => (Orientation::Horizontal, Orientation::Vertical),
        Orientation::Vertical => (Orientation::Vertical, Orientation::Horizontal),
    };
    for d_row in -1..=1 {
        for d_col in -1..=1 {
            mask.set_at(crossing, row + d_row, col + d_col, true);
        }
    }
    for offset in -1..=1 {
        match orientation {
            Orientation::Horizontal => {
                mask.set_at(parallel, row - 1, col + offset, true);
                mask.set_at(parallel, row + 1, col + offset, true);
            }
            Orientation::Vertical => {
                mask.set_at(parallel, row + offset, col - 1, true);
                mask.set_at(parallel, row + offset, col + 1, true);
            }
        }
    }
    match orientation {
        Orientation::Horizontal => {
            mask.set_at(parallel, row, col - 2, true);
            mask.set_at(parallel, row, col + 2, true);
        }
        Orientation::Vertical => {
            mask.set_at(parallel, row - 2, col, true);
            mask.set_at(parallel, row + 2, col, true);
        }
    }
}

/// Candidate bitmap before any legality filtering.
pub fn candidate_walls(board: &Board, near_walls: &WallGrid, turn: u32) -> WallGrid {
    let mut mask = *near_walls;
    for pawn in &board.pawns {
        mark_near_pawn(&mut mask, pawn.position);
    }
    if turn >= SIDE_COLUMNS_FROM_TURN {
        for row in mask.horizontal.iter_mut() {
            row[0] = true;
            row[WALL_GRID_SIZE - 1] = true;
        }
    }
    mask
}
