use thiserror::Error;

use crate::board::Position;

/// Why a wall cell was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WallRejection {
    #[error("wall cell is outside the 8x8 wall grid")]
    OutOfBounds,
    #[error("wall overlaps or crosses an existing wall")]
    Overlap,
    #[error("must preserve a path to the goal for both pawns")]
    BlocksPath,
}

/// Failures of [`GameState::apply_move`](crate::GameState::apply_move). The state is untouched
/// whenever one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("a move needs exactly one of pawnTarget, horizontalWall or verticalWall (got {populated})")]
    InvalidMoveFormat { populated: usize },
    #[error("illegal wall placement: {0}")]
    IllegalWallPlacement(#[from] WallRejection),
    #[error("no walls remaining")]
    NoWallsRemaining,
    #[error("pawn cannot move to ({}, {})", .target.row, .target.col)]
    IllegalPawnMove { target: Position },
    #[error("game already over")]
    GameOver,
}

/// Programming errors inside the rules layer, and positions that fail to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("({d_row}, {d_col}) is not a unit direction")]
    InvalidDirection { d_row: i8, d_col: i8 },
    #[error("pawn index {0} does not exist")]
    UnknownPawn(u8),
    #[error("invalid snapshot: {reason}")]
    InvalidSnapshot { reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("invalid search configuration: {reason}")]
    InvalidConfig { reason: String },
    #[error("game already over")]
    GameOver,
    #[error("no candidate moves at the root")]
    NoCandidates,
    #[error("search cancelled")]
    Cancelled,
}
