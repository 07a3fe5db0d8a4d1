//! Integration tests for the MCTS solver.
//!
//! All searches use seeded generators and iteration budgets so results do
//! not depend on machine speed.

use tictac_rust::board::{Board, Mark, game_state};
use tictac_rust::constants::{COLS, MAX_BRANCHING};
use tictac_rust::mcts::{Mcts, MctsConfig};
use tictac_rust::minimax::Minimax;
use tictac_rust::solver::{Engine, PlayerMapping, Solver};

fn seeded_mcts(mark: Mark, iterations: u64, seed: u64) -> Mcts {
    let mapping = PlayerMapping::default();
    Mcts::with_rng(
        mapping.player(mark),
        mapping,
        MctsConfig::with_iterations(iterations),
        fastrand::Rng::with_seed(seed),
    )
    .unwrap()
}

fn minimax_move(board: Board, mark: Mark) -> usize {
    let mapping = PlayerMapping::default();
    Minimax::new(mapping.player(mark), mapping).run(board).unwrap()
}

/// Run MCTS with many seeds and return how often it matched minimax.
fn agreement(board: Board, mark: Mark, trials: u64, iterations: u64) -> u64 {
    let expected = minimax_move(board, mark);
    (0..trials)
        .filter(|&seed| seeded_mcts(mark, iterations, seed).run(board).unwrap() == expected)
        .count() as u64
}

#[test]
fn test_finds_forced_win_for_x() {
    // x completes the top row at cell 2
    let board: Board = "xx./oo./...".parse().unwrap();
    assert_eq!(minimax_move(board, Mark::X), 2);
    let hits = agreement(board, Mark::X, 20, 2000);
    assert!(hits >= 19, "mcts agreed with minimax in only {hits}/20 trials");
}

#[test]
fn test_finds_forced_win_for_o() {
    // o completes the top row before x can use its double threat
    let board: Board = "oo./xx./x..".parse().unwrap();
    assert_eq!(minimax_move(board, Mark::O), 2);
    let hits = agreement(board, Mark::O, 20, 2000);
    assert!(hits >= 19, "mcts agreed with minimax in only {hits}/20 trials");
}

#[test]
fn test_pool_reset_between_runs() {
    let mut mcts = seeded_mcts(Mark::O, 500, 42);

    let first: Board = "x../.../...".parse().unwrap();
    mcts.run(first).unwrap();
    let after_first = mcts.expanded_nodes_count();
    assert!(after_first > 1 + MAX_BRANCHING);

    // A second search on a different board must start from an empty pool.
    let second: Board = "x.o/.x./...".parse().unwrap();
    let free = second.free_cells().count();
    let mut single = seeded_mcts(Mark::O, 1, 42);
    single.run(second).unwrap();
    assert_eq!(single.expanded_nodes_count(), 1 + free);

    mcts.run(second).unwrap();
    assert!(mcts.expanded_nodes_count() <= 1 + 500 * MAX_BRANCHING);
    let root = mcts.root().unwrap();
    assert_eq!(root.state, second);
    assert_eq!(root.visits, 500);
}

#[test]
fn test_single_iteration_after_large_search() {
    let board: Board = "x.o/.x./...".parse().unwrap();
    let free = board.free_cells().count();

    let mapping = PlayerMapping::default();
    let config = MctsConfig {
        max_iterations: Some(1),
        ..MctsConfig::with_iterations(1000)
    };
    let mut mcts = Mcts::with_rng(
        mapping.player(Mark::O),
        mapping,
        config,
        fastrand::Rng::with_seed(1),
    )
    .unwrap();

    mcts.run(Board::new()).unwrap();
    assert_eq!(mcts.expanded_nodes_count(), 1 + 9);
    mcts.run(board).unwrap();
    assert_eq!(mcts.expanded_nodes_count(), 1 + free);
}

#[test]
fn test_same_seed_same_search() {
    let board: Board = "x../.o./..x".parse().unwrap();
    let mut a = seeded_mcts(Mark::O, 400, 123);
    let mut b = seeded_mcts(Mark::O, 400, 123);
    assert_eq!(a.run(board).unwrap(), b.run(board).unwrap());
    assert_eq!(a.expanded_nodes_count(), b.expanded_nodes_count());
}

#[test]
fn test_always_picks_a_free_cell() {
    let mut rng = fastrand::Rng::with_seed(2024);
    for game in 0..30 {
        let mut board = Board::new();
        while !game_state(board).is_terminal() {
            let mover = board.side_to_move();
            let cell = seeded_mcts(mover, 50, game).run(board).unwrap();
            assert!(board.is_free(cell), "occupied cell {cell} on {board:?}");

            // Alternate between the engine's move and a random one.
            let index = if rng.bool() {
                cell
            } else {
                let free: Vec<usize> = board.free_cells().collect();
                free[rng.usize(..free.len())]
            };
            board.assign(index / COLS, index % COLS, mover).unwrap();
        }
    }
}

#[test]
fn test_engine_dispatch() {
    let mut engine = Engine::Mcts(seeded_mcts(Mark::X, 100, 8));
    assert_eq!(engine.name(), "mcts");
    let cell = engine.run(Board::new()).unwrap();
    assert!(cell < 9);

    let mut out = Vec::new();
    engine.print(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("mcts: expanded nodes: "));
    assert!(text.contains("iterations: 100"));
}
