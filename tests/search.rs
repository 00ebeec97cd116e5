use quoridor_wasm::{
    goal_distances, GameState, Move, Orientation, Position, SearchController, SearchError,
    SearchMessage, SearchRequest,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

/// Greedy pawn walker that drops a random legal wall now and then.
fn weak_move(state: &mut GameState, rng: &mut SmallRng) -> Move {
    if state.pawn_of_turn().walls_left > 0 && rng.gen_bool(0.3) {
        let walls: Vec<(Orientation, Position)> = state.legal_wall_cells().cells().collect();
        if !walls.is_empty() {
            let (orientation, cell) = walls[rng.gen_range(0..walls.len())];
            return Move::wall(orientation, cell);
        }
    }
    let distances = goal_distances(state.open_ways(), state.pawn_of_turn().goal_row);
    let target = state
        .legal_pawn_destinations()
        .iter()
        .copied()
        .min_by_key(|cell| distances[cell.row as usize][cell.col as usize])
        .expect("pawn of turn always has a step");
    Move::PawnTarget(target)
}

/// Plays one game with the searcher as pawn `searcher`; returns whether it won.
fn play_match(budget: u32, searcher: u8, seed: u64) -> bool {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut controller = SearchController::new();
    let mut state = GameState::default();

    while !state.is_over() && state.turn() < 400 {
        let mv = if state.pawn_index_of_turn() == searcher {
            let mut request = SearchRequest::new(state.clone(), budget, 0.2);
            request.background = false;
            request.seed = Some(seed.wrapping_add(u64::from(state.turn())));
            controller.search(request, &mut Vec::new()).unwrap()
        } else {
            weak_move(&mut state, &mut rng)
        };
        state.apply_move(mv, true).unwrap();
    }
    state.winner() == Some(searcher)
}

#[test]
fn request_from_json_runs_to_a_legal_move() {
    let state = serde_json::to_value(GameState::default()).unwrap();
    let request: SearchRequest = serde_json::from_value(json!({
        "state": state,
        "simulationBudget": 150,
        "uctConstant": 0.2,
        "introspection": true,
        "progressInterval": 50,
        "seed": 11
    }))
    .unwrap();

    let mut messages = Vec::new();
    let best = SearchController::new().search(request, &mut messages).unwrap();

    let mut game = GameState::default();
    game.apply_move(best, true).unwrap();
    assert_eq!(messages.first(), Some(&SearchMessage::Progress(50.0 / 150.0)));
    assert_eq!(messages.last(), Some(&SearchMessage::Final(best)));

    let wire = serde_json::to_value(&messages).unwrap();
    let last = wire.as_array().and_then(|all| all.last()).unwrap();
    let object = last.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(["pawnTarget", "horizontalWall", "verticalWall"]
        .iter()
        .any(|key| object.contains_key(*key)));
}

#[test]
fn searched_moves_are_legal_along_a_game() {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut controller = SearchController::new();
    let mut state = GameState::default();

    for ply in 0..12u64 {
        if state.is_over() {
            break;
        }
        let mv = if ply % 2 == 0 {
            let mut request = SearchRequest::new(state.clone(), 120, 0.2);
            request.background = false;
            request.seed = Some(ply);
            controller.search(request, &mut Vec::new()).unwrap()
        } else {
            weak_move(&mut state, &mut rng)
        };
        state
            .apply_move(mv, true)
            .unwrap_or_else(|err| panic!("ply {ply}: {mv:?} rejected: {err}"));
    }
}

#[test]
fn searching_a_finished_game_fails() {
    let mut state = GameState::default();
    let path = [
        (7, 4),
        (1, 4),
        (6, 4),
        (2, 4),
        (5, 4),
        (3, 4),
        (4, 4),
        (3, 3),
        (3, 4),
        (4, 3),
        (2, 4),
        (5, 3),
        (1, 4),
        (6, 3),
        (0, 4),
    ];
    for (row, col) in path {
        state
            .apply_move(Move::PawnTarget(Position::new(row, col)), true)
            .unwrap();
    }
    assert_eq!(state.winner(), Some(0));

    let request = SearchRequest::new(state, 100, 0.2);
    assert_eq!(
        SearchController::new().search(request, &mut Vec::new()),
        Err(SearchError::GameOver)
    );
}

#[test]
#[ignore = "plays full games; run with --ignored --release"]
fn larger_budget_does_not_play_worse() {
    const MATCHES: u64 = 10;
    let wins = |budget| {
        (0..MATCHES)
            .filter(|&seed| play_match(budget, (seed % 2) as u8, seed))
            .count()
    };
    let small = wins(100);
    let large = wins(2_000);
    assert!(large + 2 >= small, "budget 2000 won {large}, budget 100 won {small}");
}
