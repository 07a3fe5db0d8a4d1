//! Depth-bounded minimax search, with and without alpha-beta pruning.
//!
//! Both strategies explore the game tree by placing a mark on the board,
//! recursing, and taking the mark back again; no per-branch copies are made.
//! Leaves are scored by [`heuristic`]:
//!
//! - a win for the searching player scores `WIN_SCORE + depth`
//! - a win for the opponent scores `-(WIN_SCORE + depth)`
//! - a draw, or an undecided board at the depth cutoff, scores `depth`
//!
//! `depth` is the remaining search depth, so faster wins score higher.
//!
//! At the root every free cell is tried in row-major order and the first cell
//! with the strictly highest value wins. [`AlphaBeta`] returns the same move
//! and value as [`Minimax`] on every board; it only visits fewer nodes.

use std::time::Instant;

use tracing::debug;

use crate::board::{Board, GameState, Mark, game_state};
use crate::constants::{MINIMAX_DEPTH, WIN_SCORE};
use crate::solver::{Player, PlayerMapping, SearchStats, Solver, SolverError, ensure_playable};

/// Score `board` from the point of view of `me` with `depth` plies left.
pub fn heuristic(board: Board, depth: i32, me: Mark) -> i32 {
    match game_state(board) {
        GameState::Win(mark) if mark == me => WIN_SCORE + depth,
        GameState::Win(_) => -(WIN_SCORE + depth),
        GameState::Draw | GameState::Ongoing => depth,
    }
}

/// State shared by both minimax flavours.
#[derive(Debug, Clone)]
struct Searcher {
    mark: Mark,
    opponent: Mark,
    depth: i32,
    stats: SearchStats,
}

impl Searcher {
    fn new(player: Player, mapping: PlayerMapping) -> Self {
        let mark = mapping.mark(player);
        Self {
            mark,
            opponent: mark.opponent(),
            depth: MINIMAX_DEPTH,
            stats: SearchStats::default(),
        }
    }

    #[inline]
    fn is_leaf(&self, board: Board, depth: i32) -> bool {
        depth == 0 || game_state(board).is_terminal()
    }

    #[inline]
    fn mover(&self, maximizing: bool) -> Mark {
        if maximizing { self.mark } else { self.opponent }
    }

    fn minimax(&mut self, board: &mut Board, depth: i32, maximizing: bool) -> i32 {
        if self.is_leaf(*board, depth) {
            return heuristic(*board, depth, self.mark);
        }

        let mark = self.mover(maximizing);
        let mut best = if maximizing { i32::MIN } else { i32::MAX };
        for index in board.free_cells() {
            self.stats.expanded_nodes += 1;
            board.place(index, mark);
            let value = self.minimax(board, depth - 1, !maximizing);
            board.unplace(index);
            best = if maximizing { best.max(value) } else { best.min(value) };
        }
        best
    }

    fn alpha_beta(
        &mut self,
        board: &mut Board,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        maximizing: bool,
    ) -> i32 {
        if self.is_leaf(*board, depth) {
            return heuristic(*board, depth, self.mark);
        }

        let mark = self.mover(maximizing);
        if maximizing {
            let mut best = i32::MIN;
            for index in board.free_cells() {
                self.stats.expanded_nodes += 1;
                board.place(index, mark);
                best = best.max(self.alpha_beta(board, depth - 1, alpha, beta, false));
                board.unplace(index);
                alpha = alpha.max(best);
                if alpha >= beta {
                    break;
                }
            }
            best
        } else {
            let mut best = i32::MAX;
            for index in board.free_cells() {
                self.stats.expanded_nodes += 1;
                board.place(index, mark);
                best = best.min(self.alpha_beta(board, depth - 1, alpha, beta, true));
                board.unplace(index);
                beta = beta.min(best);
                if alpha >= beta {
                    break;
                }
            }
            best
        }
    }

    /// Try every free cell for the searching player and keep the first one
    /// with the strictly highest value.
    fn search(&mut self, mut board: Board, pruning: bool) -> Result<usize, SolverError> {
        ensure_playable(board)?;
        let start = Instant::now();
        self.stats = SearchStats::default();

        let mut best: Option<(usize, i32)> = None;
        for index in board.free_cells() {
            self.stats.expanded_nodes += 1;
            board.place(index, self.mark);
            let value = if pruning {
                // A candidate that cannot beat the current best may stop early;
                // whatever it reports is then no better than `alpha`.
                let alpha = best.map_or(i32::MIN, |(_, v)| v);
                self.alpha_beta(&mut board, self.depth, alpha, i32::MAX, false)
            } else {
                self.minimax(&mut board, self.depth, false)
            };
            board.unplace(index);

            if best.is_none_or(|(_, v)| value > v) {
                best = Some((index, value));
            }
        }

        let (index, value) = best.ok_or(SolverError::NoMove)?;
        self.stats.best_value = Some(value);
        self.stats.elapsed = start.elapsed();
        debug!(
            cell = index,
            value,
            expanded = self.stats.expanded_nodes,
            pruning,
            "minimax search finished"
        );
        Ok(index)
    }
}

/// Exhaustive minimax without pruning.
#[derive(Debug, Clone)]
pub struct Minimax {
    searcher: Searcher,
}

impl Minimax {
    pub fn new(player: Player, mapping: PlayerMapping) -> Self {
        Self {
            searcher: Searcher::new(player, mapping),
        }
    }

    /// Search `depth` plies below each candidate move instead of the default.
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.searcher.depth = depth;
        self
    }

    /// The mark this solver plays.
    pub fn mark(&self) -> Mark {
        self.searcher.mark
    }
}

impl Solver for Minimax {
    fn name(&self) -> &'static str {
        "minimax"
    }

    fn run(&mut self, board: Board) -> Result<usize, SolverError> {
        self.searcher.search(board, false)
    }

    fn stats(&self) -> SearchStats {
        self.searcher.stats
    }
}

/// Minimax with alpha-beta pruning.
#[derive(Debug, Clone)]
pub struct AlphaBeta {
    searcher: Searcher,
}

impl AlphaBeta {
    pub fn new(player: Player, mapping: PlayerMapping) -> Self {
        Self {
            searcher: Searcher::new(player, mapping),
        }
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.searcher.depth = depth;
        self
    }

    pub fn mark(&self) -> Mark {
        self.searcher.mark
    }
}

impl Solver for AlphaBeta {
    fn name(&self) -> &'static str {
        "alpha-beta"
    }

    fn run(&mut self, board: Board) -> Result<usize, SolverError> {
        self.searcher.search(board, true)
    }

    fn stats(&self) -> SearchStats {
        self.searcher.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_o() -> (Player, PlayerMapping) {
        (Player::SECOND, PlayerMapping::default())
    }

    #[test]
    fn test_heuristic() {
        let won: Board = "xxx/oo./...".parse().unwrap();
        assert_eq!(heuristic(won, 3, Mark::X), 23);
        assert_eq!(heuristic(won, 3, Mark::O), -23);

        let open: Board = "x../.o./...".parse().unwrap();
        assert_eq!(heuristic(open, 0, Mark::X), 0);
        assert_eq!(heuristic(open, 4, Mark::O), 4);
    }

    #[test]
    fn test_takes_immediate_win() {
        // x to move can complete the top row
        let board: Board = "xx./oo./...".parse().unwrap();
        let mut solver = Minimax::new(Player::FIRST, PlayerMapping::default());
        assert_eq!(solver.run(board), Ok(2));
        assert_eq!(solver.stats().best_value, Some(WIN_SCORE + MINIMAX_DEPTH));
    }

    #[test]
    fn test_blocks_threat() {
        // o must block the x diagonal at cell 8
        let board: Board = "xo./.x./...".parse().unwrap();
        let (player, mapping) = as_o();
        assert_eq!(Minimax::new(player, mapping).run(board), Ok(8));
        assert_eq!(AlphaBeta::new(player, mapping).run(board), Ok(8));
    }

    #[test]
    fn test_rejects_finished_board() {
        let board: Board = "xox/xoo/oxx".parse().unwrap();
        let mut solver = AlphaBeta::new(Player::FIRST, PlayerMapping::default());
        assert_eq!(solver.run(board), Err(SolverError::GameOver));
    }

    #[test]
    fn test_run_does_not_touch_callers_board() {
        let board: Board = "x../.o./...".parse().unwrap();
        let copy = board;
        let mut solver = Minimax::new(Player::FIRST, PlayerMapping::default());
        solver.run(board).unwrap();
        assert_eq!(board, copy);
    }

    #[test]
    fn test_pruning_expands_fewer_nodes() {
        let board = Board::new();
        let mut plain = Minimax::new(Player::FIRST, PlayerMapping::default());
        let mut pruned = AlphaBeta::new(Player::FIRST, PlayerMapping::default());
        assert_eq!(plain.run(board), pruned.run(board));
        assert_eq!(plain.stats().best_value, pruned.stats().best_value);
        assert!(pruned.stats().expanded_nodes < plain.stats().expanded_nodes);
    }

    #[test]
    fn test_shallow_depth_still_legal() {
        let board: Board = "x../.o./..x".parse().unwrap();
        let mut solver = Minimax::new(Player::SECOND, PlayerMapping::default()).with_depth(1);
        let cell = solver.run(board).unwrap();
        assert!(board.is_free(cell));
    }
}
