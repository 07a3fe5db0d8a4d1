//! Tictac-Rust: tic-tac-toe search engines.
//!
//! This crate computes the best move for an AI player on a 3x3 board using
//! either exhaustive minimax (optionally with alpha-beta pruning) or Monte
//! Carlo Tree Search with UCT selection.
//!
//! ## Modules
//!
//! - [`constants`] - Board geometry and search parameters
//! - [`board`] - Bit-packed board and game-state classification
//! - [`solver`] - Common solver interface and player identity
//! - [`minimax`] - Minimax and alpha-beta search
//! - [`game_tree`] - Eagerly built, arena-backed minimax tree
//! - [`pool`] - Fixed-capacity node arena
//! - [`mcts`] - Monte Carlo Tree Search
//! - [`console`] - Interactive game and engine matches
//!
//! ## Example
//!
//! ```
//! use tictac_rust::board::{Board, Mark};
//! use tictac_rust::minimax::AlphaBeta;
//! use tictac_rust::solver::{Player, PlayerMapping, Solver};
//!
//! // x threatens the main diagonal; o (player 1) has to block
//! let board: Board = "xo./.x./...".parse().unwrap();
//! let mut solver = AlphaBeta::new(Player::SECOND, PlayerMapping::default());
//! let cell = solver.run(board).unwrap();
//! assert_eq!((cell / 3, cell % 3), (2, 2));
//! ```

pub mod board;
pub mod console;
pub mod constants;
pub mod game_tree;
pub mod mcts;
pub mod minimax;
pub mod pool;
pub mod solver;
