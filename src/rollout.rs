use log::debug;
use rand::rngs::SmallRng;
use rand::Rng;
use smallvec::SmallVec;

use crate::board::{Orientation, Position};
use crate::connectivity::{self, UNREACHABLE};
use crate::game::{GameState, Move};

/// Wall attempts per rollout step before falling back to a pawn step.
const WALL_ATTEMPTS: usize = 3;

/// Playout policy used from every freshly expanded search node.
///
/// Each half-move the mover either walks one step along a shortest path (probability
/// `pawn_probability`, or always once it is out of walls) or drops a random wall from the pruned
/// candidate set. Walls go through validated [`GameState::apply_move`], so a candidate that would
/// seal a pawn in is simply skipped.
#[derive(Debug, Clone, Copy)]
pub struct RolloutPolicy {
    pub pawn_probability: f64,
    pub max_plies: u32,
}

impl RolloutPolicy {
    /// Plays `state` out and returns the index of the winning pawn.
    pub fn play(&self, mut state: GameState, rng: &mut SmallRng) -> u8 {
        for _ in 0..self.max_plies {
            if let Some(winner) = state.winner() {
                return winner;
            }
            let wants_wall =
                state.pawn_of_turn().walls_left > 0 && !rng.gen_bool(self.pawn_probability);
            if wants_wall && try_random_wall(&mut state, rng) {
                continue;
            }
            let Some(target) = shortest_path_step(&mut state) else {
                // no step and no wall worked; nothing left to simulate
                break;
            };
            if state.apply_move(Move::PawnTarget(target), true).is_err() {
                break;
            }
        }
        if let Some(winner) = state.winner() {
            return winner;
        }
        debug!("rollout truncated at turn {}; scoring by distance to goal", state.turn());
        closer_to_goal(&state)
    }
}

/// The legal destination with the smallest distance to the mover's goal row; ties go to the first
/// destination in direction order.
pub fn shortest_path_step(state: &mut GameState) -> Option<Position> {
    let goal_row = state.pawn_of_turn().goal_row;
    let distances = connectivity::goal_distances(state.open_ways(), goal_row);
    state
        .legal_pawn_destinations()
        .iter()
        .copied()
        .min_by_key(|target| distances[target.row as usize][target.col as usize])
}

fn try_random_wall(state: &mut GameState, rng: &mut SmallRng) -> bool {
    let candidates: SmallVec<[(Orientation, Position); 64]> =
        state.wall_candidates().cells().collect();
    if candidates.is_empty() {
        return false;
    }
    for _ in 0..WALL_ATTEMPTS {
        let (orientation, cell) = candidates[rng.gen_range(0..candidates.len())];
        if state.apply_move(Move::wall(orientation, cell), true).is_ok() {
            return true;
        }
    }
    false
}

/// Winner by adjudication: the pawn nearer its goal row, or the pawn of turn on a tie.
fn closer_to_goal(state: &GameState) -> u8 {
    let mover = state.pawn_index_of_turn();
    let other = 1 - mover;
    let distance = |pawn: u8| state.distance_to_goal(pawn).unwrap_or(UNREACHABLE);
    if distance(other) < distance(mover) {
        other
    } else {
        mover
    }
}
