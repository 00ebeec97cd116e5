#![deny(clippy::unwrap_used)]
//! WebAssembly bindings for a Quoridor rules engine and a Monte Carlo Tree Search opponent.
//!
//! The crate exposes three building blocks:
//!
//! * [`GameState`] – the 9×9 board with two pawns and up to twenty walls. Every wall placement is
//!   checked against the rule that both pawns must keep a path to their goal rows; legal pawn
//!   destinations (jumps included) and legal wall cells are computed lazily and memoised per turn.
//! * [`SearchSession`] / [`SearchController`] – a UCT tree search driven by shortest-path-biased
//!   rollouts, with the wall branching factor cut down by a locality heuristic. Searches report
//!   progress and ranked candidates through a [`MessageSink`] and can be cancelled from it.
//! * [`QuoridorGame`] / [`QuoridorAi`] – thin wasm-bindgen wrappers for the UI thread and for the
//!   Web Worker hosting the search.

mod bindings;
mod board;
mod connectivity;
mod error;
mod game;
mod mcts;
mod protocol;
mod pruning;
mod rollout;

pub use bindings::{QuoridorAi, QuoridorGame};
pub use board::{
    Board, Direction, OpenWays, Orientation, Pawn, Position, WallGrid, BOARD_SIZE, WALLS_PER_PAWN,
    WALL_GRID_SIZE,
};
pub use connectivity::{goal_distances, is_connected_to_goal_row, UNREACHABLE};
pub use error::{MoveError, RulesError, SearchError, WallRejection};
pub use game::{GameState, Move, MoveSlots, Snapshot};
pub use mcts::{MctsConfig, SearchController, SearchSession};
pub use protocol::{Candidate, CandidateReport, MessageSink, SearchMessage, SearchRequest};
pub use rollout::RolloutPolicy;

use wasm_bindgen::prelude::*;

/// Install a panic hook sending Rust panics to the browser console. The hook is only compiled in
/// when the `console_error_panic_hook` feature is enabled (default).
#[wasm_bindgen(js_name = initPanicHook)]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Route `log` output to the browser console at `level` ("error" .. "trace", default "info").
/// Calling it more than once keeps the first logger.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    let level = parse_level(level.as_deref());
    #[cfg(target_arch = "wasm32")]
    {
        if let Err(err) = console_log::init_with_level(level) {
            log::debug!("console logger already installed: {err}");
        }
    }
    #[cfg(not(target_arch = "wasm32"))]
    log::set_max_level(level.to_level_filter());
}

fn parse_level(name: Option<&str>) -> log::Level {
    name.and_then(|name| name.parse().ok()).unwrap_or(log::Level::Info)
}

/// Side length of the board in cells (9).
#[wasm_bindgen(js_name = boardSize)]
pub fn board_size() -> usize {
    BOARD_SIZE
}

/// Walls each pawn starts with (10).
#[wasm_bindgen(js_name = wallsPerPawn)]
pub fn walls_per_pawn() -> u8 {
    WALLS_PER_PAWN
}
