use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::board::{
    Board, Direction, OpenWays, Orientation, Pawn, Position, WallGrid, NUM_PLAYERS, WALLS_PER_PAWN,
};
use crate::connectivity::{self, wall_keeps_paths};
use crate::error::{MoveError, RulesError, WallRejection};
use crate::pruning;

/// At most four steps, or three when one direction splits into two diagonal jumps.
pub type Destinations = SmallVec<[Position; 6]>;

/// A single turn: move the pawn of turn, or spend one of its walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Move {
    PawnTarget(Position),
    HorizontalWall(Position),
    VerticalWall(Position),
}

impl Move {
    pub fn wall(orientation: Orientation, cell: Position) -> Self {
        match orientation {
            Orientation::Horizontal => Move::HorizontalWall(cell),
            Orientation::Vertical => Move::VerticalWall(cell),
        }
    }
}

/// Loosely shaped move as a UI layer hands it over: three optional slots of which exactly one must
/// be filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveSlots {
    #[serde(default)]
    pub pawn_target: Option<Position>,
    #[serde(default)]
    pub horizontal_wall: Option<Position>,
    #[serde(default)]
    pub vertical_wall: Option<Position>,
}

impl TryFrom<MoveSlots> for Move {
    type Error = MoveError;

    fn try_from(slots: MoveSlots) -> Result<Self, Self::Error> {
        match (slots.pawn_target, slots.horizontal_wall, slots.vertical_wall) {
            (Some(target), None, None) => Ok(Move::PawnTarget(target)),
            (None, Some(cell), None) => Ok(Move::HorizontalWall(cell)),
            (None, None, Some(cell)) => Ok(Move::VerticalWall(cell)),
            (pawn, horizontal, vertical) => Err(MoveError::InvalidMoveFormat {
                populated: [pawn.is_some(), horizontal.is_some(), vertical.is_some()]
                    .into_iter()
                    .filter(|&filled| filled)
                    .count(),
            }),
        }
    }
}

/// Derived per-turn data. Thrown away every time the turn advances.
#[derive(Debug, Clone, Default)]
struct LegalityCache {
    pawn_destinations: Option<Destinations>,
    wall_cells: Option<WallGrid>,
    candidates: Option<WallGrid>,
}

/// Plain value form of a [`GameState`]: everything that cannot be rebuilt from something else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub pawns: [Pawn; NUM_PLAYERS],
    pub walls: WallGrid,
    pub turn: u32,
    pub winner: Option<u8>,
}

/// Complete game position plus the lazily computed legality caches.
///
/// The movement graph, the structural wall availability and the pruning ring are all derived from
/// the placed walls and are rebuilt on deserialization, so a snapshot can never carry a graph that
/// disagrees with its walls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Snapshot", into = "Snapshot")]
pub struct GameState {
    board: Board,
    open_ways: OpenWays,
    /// Cells where a wall would not collide with one already placed.
    available_walls: WallGrid,
    /// Accumulated pruning ring around every placed wall.
    near_walls: WallGrid,
    turn: u32,
    winner: Option<u8>,
    cache: LegalityCache,
}

impl GameState {
    pub fn new(human_first: bool) -> Self {
        Self::from_parts(Board::new(human_first), 0, None)
    }

    fn from_parts(board: Board, turn: u32, winner: Option<u8>) -> Self {
        let mut available_walls = WallGrid::filled(true);
        let mut near_walls = WallGrid::default();
        for (orientation, cell) in board.walls.cells() {
            available_walls.clear_conflicts(orientation, cell);
            pruning::mark_near_wall(&mut near_walls, orientation, cell);
        }
        Self {
            open_ways: OpenWays::from_walls(&board.walls),
            board,
            available_walls,
            near_walls,
            turn,
            winner,
            cache: LegalityCache::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn open_ways(&self) -> &OpenWays {
        &self.open_ways
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn winner(&self) -> Option<u8> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn pawn(&self, index: u8) -> Result<&Pawn, RulesError> {
        self.board.pawns.get(index as usize).ok_or(RulesError::UnknownPawn(index))
    }

    pub fn pawn_index_of_turn(&self) -> u8 {
        (self.turn % 2) as u8
    }

    pub fn pawn_of_turn(&self) -> &Pawn {
        &self.board.pawns[usize::from(self.pawn_index_of_turn())]
    }

    pub fn pawn_of_not_turn(&self) -> &Pawn {
        &self.board.pawns[usize::from(1 - self.pawn_index_of_turn())]
    }

    /// Whether a pawn on `from` could step by `(d_row, d_col)` if nothing stood in the way.
    pub fn is_open_way(&self, from: Position, d_row: i8, d_col: i8) -> Result<bool, RulesError> {
        let direction = Direction::from_delta(d_row, d_col)?;
        Ok(self.open_ways.is_open(from, direction))
    }

    /// Steps from `pawn`'s cell to its goal row along open ways, ignoring the other pawn.
    pub fn distance_to_goal(&self, pawn: u8) -> Result<u8, RulesError> {
        let pawn = self.pawn(pawn)?;
        let distances = connectivity::goal_distances(&self.open_ways, pawn.goal_row);
        Ok(distances[pawn.position.row as usize][pawn.position.col as usize])
    }

    /// Applies `mv` for the pawn of turn.
    ///
    /// With `validate` the pawn target must be a legal destination and a wall must leave both pawns
    /// a path to their goal rows. Bounds, wall overlap and the remaining wall count are checked
    /// either way. On error nothing changes.
    pub fn apply_move(&mut self, mv: Move, validate: bool) -> Result<(), MoveError> {
        if self.is_over() {
            return Err(MoveError::GameOver);
        }
        match mv {
            Move::PawnTarget(target) => self.move_pawn(target, validate),
            Move::HorizontalWall(cell) => self.place_wall(Orientation::Horizontal, cell, validate),
            Move::VerticalWall(cell) => self.place_wall(Orientation::Vertical, cell, validate),
        }
    }

    /// [`apply_move`](Self::apply_move) for a move that has not been shape-checked yet.
    pub fn apply_move_slots(&mut self, slots: MoveSlots, validate: bool) -> Result<(), MoveError> {
        let mv = Move::try_from(slots)?;
        self.apply_move(mv, validate)
    }

    fn move_pawn(&mut self, target: Position, validate: bool) -> Result<(), MoveError> {
        let legal = if validate {
            self.legal_pawn_destinations().contains(&target)
        } else {
            target.is_on_board() && target != self.pawn_of_not_turn().position
        };
        if !legal {
            return Err(MoveError::IllegalPawnMove { target });
        }

        let index = self.pawn_index_of_turn();
        let pawn = &mut self.board.pawns[usize::from(index)];
        pawn.position = target;
        if pawn.has_reached_goal() {
            self.winner = Some(index);
        }
        self.advance_turn();
        Ok(())
    }

    fn place_wall(
        &mut self,
        orientation: Orientation,
        cell: Position,
        validate: bool,
    ) -> Result<(), MoveError> {
        if self.pawn_of_turn().walls_left == 0 {
            return Err(MoveError::NoWallsRemaining);
        }
        self.check_wall_structure(orientation, cell)?;
        if validate && !self.keeps_paths(orientation, cell) {
            return Err(WallRejection::BlocksPath.into());
        }

        let index = usize::from(self.pawn_index_of_turn());
        self.board.walls.set(orientation, cell, true);
        self.open_ways.close_wall(orientation, cell);
        self.available_walls.clear_conflicts(orientation, cell);
        pruning::mark_near_wall(&mut self.near_walls, orientation, cell);
        self.board.pawns[index].walls_left -= 1;
        self.advance_turn();
        Ok(())
    }

    fn check_wall_structure(
        &self,
        orientation: Orientation,
        cell: Position,
    ) -> Result<(), WallRejection> {
        if !cell.is_wall_cell() {
            return Err(WallRejection::OutOfBounds);
        }
        if !self.available_walls.get(orientation, cell) {
            return Err(WallRejection::Overlap);
        }
        Ok(())
    }

    fn keeps_paths(&mut self, orientation: Orientation, cell: Position) -> bool {
        if let Some(cells) = &self.cache.wall_cells {
            return cells.get(orientation, cell);
        }
        wall_keeps_paths(&mut self.open_ways, &self.board, orientation, cell)
    }

    fn advance_turn(&mut self) {
        self.turn += 1;
        self.cache = LegalityCache::default();
    }

    /// Cells the pawn of turn may move to, jumps included. Empty once the game is over.
    pub fn legal_pawn_destinations(&mut self) -> &[Position] {
        if self.cache.pawn_destinations.is_none() {
            let destinations = self.compute_pawn_destinations();
            self.cache.pawn_destinations = Some(destinations);
        }
        self.cache.pawn_destinations.as_deref().unwrap_or_default()
    }

    fn compute_pawn_destinations(&self) -> Destinations {
        let mut destinations = Destinations::new();
        if self.is_over() {
            return destinations;
        }
        let from = self.pawn_of_turn().position;
        let opponent = self.pawn_of_not_turn().position;
        let ways = &self.open_ways;

        for direction in Direction::ALL {
            if !ways.is_open(from, direction) {
                continue;
            }
            let Some(next) = from.step(direction) else {
                continue;
            };
            if next != opponent {
                destinations.push(next);
                continue;
            }
            if ways.is_open(next, direction) {
                destinations.extend(next.step(direction));
                continue;
            }
            for lateral in direction.laterals() {
                if ways.is_open(next, lateral) {
                    destinations.extend(next.step(lateral));
                }
            }
        }
        destinations
    }

    /// Every wall cell the pawn of turn may use right now. All false when it has no walls left or
    /// the game is over.
    pub fn legal_wall_cells(&mut self) -> &WallGrid {
        if self.cache.wall_cells.is_none() {
            let cells = self.filter_keeping_paths(self.available_walls);
            self.cache.wall_cells = Some(cells);
        }
        self.cache.wall_cells.get_or_insert_with(WallGrid::default)
    }

    /// Pruned candidate bitmap for the search: the heuristic's cells that do not collide with
    /// placed walls. Path preservation is not checked here.
    pub fn wall_candidates(&mut self) -> &WallGrid {
        if self.cache.candidates.is_none() {
            let mut candidates =
                pruning::candidate_walls(&self.board, &self.near_walls, self.turn);
            candidates.intersect(&self.available_walls);
            self.cache.candidates = Some(candidates);
        }
        self.cache.candidates.get_or_insert_with(WallGrid::default)
    }

    /// Pruned candidates that are also fully legal.
    pub fn probable_legal_walls(&mut self) -> WallGrid {
        let candidates = *self.wall_candidates();
        match &self.cache.wall_cells {
            Some(legal) => {
                let mut cells = candidates;
                cells.intersect(legal);
                cells
            }
            None => self.filter_keeping_paths(candidates),
        }
    }

    fn filter_keeping_paths(&mut self, mut cells: WallGrid) -> WallGrid {
        if self.is_over() || self.pawn_of_turn().walls_left == 0 {
            return WallGrid::default();
        }
        let candidates: SmallVec<[(Orientation, Position); 128]> = cells.cells().collect();
        for (orientation, cell) in candidates {
            if !wall_keeps_paths(&mut self.open_ways, &self.board, orientation, cell) {
                cells.set(orientation, cell, false);
            }
        }
        cells
    }

    /// Moves the search considers from this position, in a fixed order: pawn destinations, then
    /// pruned horizontal walls, then pruned vertical walls.
    pub fn search_moves(&mut self) -> Vec<Move> {
        let mut moves: Vec<Move> = self
            .legal_pawn_destinations()
            .iter()
            .copied()
            .map(Move::PawnTarget)
            .collect();
        let walls = self.probable_legal_walls();
        moves.extend(walls.cells().map(|(orientation, cell)| Move::wall(orientation, cell)));
        moves
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pawns: self.board.pawns,
            walls: self.board.walls,
            turn: self.turn,
            winner: self.winner,
        }
    }

    #[cfg(test)]
    pub(crate) fn place_pawn_for_test(&mut self, index: u8, position: Position) {
        self.board.pawns[usize::from(index)].position = position;
        self.cache = LegalityCache::default();
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Equal when the positions are the same; caches are ignored.
impl PartialEq for GameState {
    fn eq(&self, other: &Self) -> bool {
        self.board == other.board && self.turn == other.turn && self.winner == other.winner
    }
}

impl Eq for GameState {}

impl Snapshot {
    /// Rejects anything no sequence of moves could have produced: pawns off the board or stacked,
    /// goal rows or wall counts that do not match their pawn, colliding walls, an unknown winner.
    fn check(&self) -> Result<(), RulesError> {
        let invalid = |reason| Err(RulesError::InvalidSnapshot { reason });
        for (index, pawn) in self.pawns.iter().enumerate() {
            let expected = Pawn::new(index as u8, pawn.is_human_side);
            if pawn.index != expected.index {
                return invalid("pawn index does not match its slot");
            }
            if pawn.goal_row != expected.goal_row {
                return invalid("pawn goal row does not match its index");
            }
            if !pawn.position.is_on_board() {
                return invalid("pawn is off the board");
            }
            if pawn.walls_left > WALLS_PER_PAWN {
                return invalid("pawn holds more walls than it started with");
            }
        }
        if self.pawns[0].position == self.pawns[1].position {
            return invalid("both pawns stand on the same cell");
        }
        if self.winner.is_some_and(|winner| usize::from(winner) >= NUM_PLAYERS) {
            return invalid("winner is not a pawn index");
        }

        let mut available = WallGrid::filled(true);
        for (orientation, cell) in self.walls.cells() {
            if !available.get(orientation, cell) {
                return invalid("walls overlap or cross");
            }
            available.clear_conflicts(orientation, cell);
        }
        let walls_left: usize = self.pawns.iter().map(|pawn| usize::from(pawn.walls_left)).sum();
        if self.walls.count() + walls_left != NUM_PLAYERS * usize::from(WALLS_PER_PAWN) {
            return invalid("placed and remaining walls do not add up");
        }
        Ok(())
    }
}

impl TryFrom<Snapshot> for GameState {
    type Error = RulesError;

    fn try_from(snapshot: Snapshot) -> Result<Self, Self::Error> {
        snapshot.check()?;
        let board = Board {
            pawns: snapshot.pawns,
            walls: snapshot.walls,
        };
        Ok(Self::from_parts(board, snapshot.turn, snapshot.winner))
    }
}

impl From<GameState> for Snapshot {
    fn from(state: GameState) -> Self {
        state.snapshot()
    }
}
