use quoridor_wasm::{
    goal_distances, is_connected_to_goal_row, GameState, Move, OpenWays, Orientation, Position,
    WALLS_PER_PAWN,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_legal_move(state: &mut GameState, rng: &mut SmallRng) -> Move {
    let walls: Vec<(Orientation, Position)> = if state.pawn_of_turn().walls_left > 0 {
        state.legal_wall_cells().cells().collect()
    } else {
        Vec::new()
    };
    if !walls.is_empty() && rng.gen_bool(0.4) {
        let (orientation, cell) = walls[rng.gen_range(0..walls.len())];
        return Move::wall(orientation, cell);
    }
    let destinations = state.legal_pawn_destinations();
    assert!(!destinations.is_empty(), "pawn of turn has no legal step");
    Move::PawnTarget(destinations[rng.gen_range(0..destinations.len())])
}

fn assert_invariants(state: &GameState) {
    let board = state.board();
    for pawn in &board.pawns {
        assert!(
            is_connected_to_goal_row(state.open_ways(), pawn.position, pawn.goal_row),
            "pawn {} lost its path at turn {}",
            pawn.index,
            state.turn()
        );
    }

    let walls_left: usize = board.pawns.iter().map(|pawn| pawn.walls_left as usize).sum();
    assert_eq!(board.walls.count() + walls_left, 2 * WALLS_PER_PAWN as usize);

    assert_eq!(*state.open_ways(), OpenWays::from_walls(&board.walls));
    assert_ne!(board.pawns[0].position, board.pawns[1].position);
}

#[test]
fn random_games_keep_rules_invariants() {
    for seed in 0..12 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut state = GameState::new(seed % 2 == 0);

        while !state.is_over() && state.turn() < 300 {
            let mv = random_legal_move(&mut state, &mut rng);
            let mut twin = state.clone();

            state
                .apply_move(mv, true)
                .unwrap_or_else(|err| panic!("seed {seed}: legal move {mv:?} rejected: {err}"));
            twin.apply_move(mv, true).unwrap();

            assert_eq!(state, twin);
            assert_eq!(state.legal_pawn_destinations(), twin.legal_pawn_destinations());
            assert_eq!(state.legal_wall_cells(), twin.legal_wall_cells());
            assert_invariants(&state);
        }
    }
}

#[test]
fn snapshots_survive_every_position_of_a_game() {
    let mut rng = SmallRng::seed_from_u64(99);
    let mut state = GameState::default();

    for _ in 0..60 {
        if state.is_over() {
            break;
        }
        let mv = random_legal_move(&mut state, &mut rng);
        state.apply_move(mv, true).unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let mut restored: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.open_ways(), state.open_ways());
        assert_eq!(restored.legal_wall_cells(), state.legal_wall_cells());
    }
}

#[test]
fn finished_game_refuses_further_moves() {
    let mut state = GameState::default();
    while !state.is_over() {
        let goal_row = state.pawn_of_turn().goal_row;
        let distances = goal_distances(state.open_ways(), goal_row);
        let target = state
            .legal_pawn_destinations()
            .iter()
            .copied()
            .min_by_key(|cell| distances[cell.row as usize][cell.col as usize])
            .unwrap();
        state.apply_move(Move::PawnTarget(target), true).unwrap();
        assert!(state.turn() < 40);
    }

    let winner = state.winner().unwrap();
    assert!(state.pawn(winner).unwrap().has_reached_goal());
    let frozen = state.clone();
    assert!(state
        .apply_move(Move::wall(Orientation::Horizontal, Position::new(3, 3)), false)
        .is_err());
    assert_eq!(state, frozen);
}
