//! Constants for board geometry, search depth, and MCTS parameters.
//!
//! The board is fixed at 3x3. Cells are numbered row-major from 0 to 8,
//! so a move index `i` maps to `(i / COLS, i % COLS)`.

// =============================================================================
// Board Geometry
// =============================================================================

/// Number of rows on the board.
pub const ROWS: usize = 3;

/// Number of columns on the board.
pub const COLS: usize = 3;

/// Number of cells on the board.
pub const SIZE: usize = ROWS * COLS;

/// Bit mask with one bit set for every cell of a single bit-plane.
pub const FULL_BOARD: u32 = 0b1_1111_1111;

/// The eight winning lines, in scan order: rows, columns, main diagonal,
/// anti-diagonal.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Most children any position can have.
pub const MAX_BRANCHING: usize = SIZE;

// =============================================================================
// Minimax Parameters
// =============================================================================

/// Plies searched below each candidate move at the root.
pub const MINIMAX_DEPTH: i32 = 8;

/// Base score of a decided game; the residual depth is added on top.
pub const WIN_SCORE: i32 = 20;

// =============================================================================
// MCTS (Monte Carlo Tree Search) Parameters
// =============================================================================

/// Default wall-clock budget per search, in milliseconds.
pub const MCTS_TIME_LIMIT_MS: u64 = 1_000;

/// Default node pool capacity.
pub const POOL_CAPACITY: usize = 1 << 20;

/// Default tree-size budget. Leaves room for one full expansion.
pub const MAX_TREE_SIZE: usize = POOL_CAPACITY - MAX_BRANCHING;

/// UCT exploration constant (sqrt 2).
pub const EXPLORATION: f32 = std::f32::consts::SQRT_2;

/// Rollout reward for a win by the searching player.
pub const REWARD_WIN: f32 = 1.0;

/// Rollout reward for a draw.
pub const REWARD_DRAW: f32 = 0.3;

/// Rollout reward for a loss.
pub const REWARD_LOSS: f32 = 0.0;
