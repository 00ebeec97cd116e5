use std::ops::ControlFlow;

use log::warn;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::board::Position;
use crate::game::{GameState, MoveSlots};
use crate::mcts::SearchController;
use crate::protocol::{MessageSink, SearchMessage, SearchRequest};

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

/// wasm-bindgen wrapper around the canonical game state held by the UI.
#[wasm_bindgen]
pub struct QuoridorGame {
    state: GameState,
}

#[wasm_bindgen]
impl QuoridorGame {
    #[wasm_bindgen(constructor)]
    pub fn new(human_first: bool) -> QuoridorGame {
        QuoridorGame {
            state: GameState::new(human_first),
        }
    }

    /// Rebuild a game from a value produced by [`QuoridorGame::snapshot`], e.g. for undo/redo.
    #[wasm_bindgen(js_name = fromSnapshot)]
    pub fn from_snapshot(snapshot: JsValue) -> Result<QuoridorGame, JsValue> {
        let state: GameState = serde_wasm_bindgen::from_value(snapshot)?;
        Ok(QuoridorGame { state })
    }

    /// Deep copy of the position as a plain object `{ pawns, walls, turn, winner }`.
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.state.snapshot())
    }

    /// Apply `{ pawnTarget } | { horizontalWall } | { verticalWall }` for the pawn of turn. Throws a
    /// readable message on failure; the game is unchanged in that case.
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, mv: JsValue, validate: bool) -> Result<(), JsValue> {
        let slots: MoveSlots = serde_wasm_bindgen::from_value(mv)?;
        self.state.apply_move_slots(slots, validate).map_err(to_js_error)
    }

    /// Array of `{ row, col }` cells the pawn of turn may move to.
    #[wasm_bindgen(js_name = legalPawnDestinations)]
    pub fn legal_pawn_destinations(&mut self) -> Result<JsValue, JsValue> {
        to_js(self.state.legal_pawn_destinations())
    }

    /// `{ horizontal: bool[8][8], vertical: bool[8][8] }` of legal wall cells.
    #[wasm_bindgen(js_name = legalWallCells)]
    pub fn legal_wall_cells(&mut self) -> Result<JsValue, JsValue> {
        to_js(self.state.legal_wall_cells())
    }

    #[wasm_bindgen(js_name = isOpenWay)]
    pub fn is_open_way(&self, row: u8, col: u8, d_row: i8, d_col: i8) -> Result<bool, JsValue> {
        self.state
            .is_open_way(Position::new(row, col), d_row, d_col)
            .map_err(to_js_error)
    }

    pub fn turn(&self) -> u32 {
        self.state.turn()
    }

    pub fn winner(&self) -> Option<u8> {
        self.state.winner()
    }

    #[wasm_bindgen(js_name = pawnIndexOfTurn)]
    pub fn pawn_index_of_turn(&self) -> u8 {
        self.state.pawn_index_of_turn()
    }

    #[wasm_bindgen(js_name = wallsLeft)]
    pub fn walls_left(&self, pawn: u8) -> Result<u8, JsValue> {
        self.state.pawn(pawn).map(|pawn| pawn.walls_left).map_err(to_js_error)
    }
}

impl QuoridorGame {
    pub fn state(&self) -> &GameState {
        &self.state
    }
}

/// Forwards search messages to a JavaScript callback, typically one that calls `postMessage`
/// from inside a Web Worker. A throwing callback cancels the search.
struct JsCallbackSink<'a> {
    callback: &'a js_sys::Function,
}

impl MessageSink for JsCallbackSink<'_> {
    fn post(&mut self, message: SearchMessage) -> ControlFlow<()> {
        let delivered =
            to_js(&message).and_then(|value| self.callback.call1(&JsValue::NULL, &value));
        match delivered {
            Ok(_) => ControlFlow::Continue(()),
            Err(err) => {
                warn!("search message could not be delivered: {err:?}");
                ControlFlow::Break(())
            }
        }
    }
}

/// Search context entry point. Lives for as long as the hosting worker and keeps at most one
/// search tree between requests.
#[wasm_bindgen]
pub struct QuoridorAi {
    controller: SearchController,
}

#[wasm_bindgen]
impl QuoridorAi {
    #[wasm_bindgen(constructor)]
    pub fn new() -> QuoridorAi {
        QuoridorAi {
            controller: SearchController::new(),
        }
    }

    /// Run a search for `request` (`{ state, simulationBudget, uctConstant, introspection,
    /// progressInterval }`). Progress numbers, candidate reports and the final move are passed to
    /// `on_message` as they are produced; the final move is also returned.
    pub fn search(
        &mut self,
        request: JsValue,
        on_message: js_sys::Function,
    ) -> Result<JsValue, JsValue> {
        let request: SearchRequest = serde_wasm_bindgen::from_value(request)?;
        let mut sink = JsCallbackSink {
            callback: &on_message,
        };
        let best = self.controller.search(request, &mut sink).map_err(to_js_error)?;
        to_js(&best)
    }

    /// Throw away the current search tree.
    pub fn reset(&mut self) {
        self.controller.cancel();
    }
}

impl Default for QuoridorAi {
    fn default() -> Self {
        Self::new()
    }
}
