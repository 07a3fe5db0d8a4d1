//! The common interface of all search strategies.
//!
//! Every strategy answers one question: given a board where it is the AI's
//! turn, which cell should it take? Strategies are told which player they act
//! for through a [`Player`] id and a [`PlayerMapping`] from ids to marks, so
//! the same engine code works whether the AI plays X or O.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::board::{Board, Mark, game_state};
use crate::mcts::Mcts;
use crate::minimax::{AlphaBeta, Minimax};
use crate::pool::PoolError;

/// Errors returned by [`Solver::run`] and solver construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("the game is already over")]
    GameOver,

    #[error("player id {0} is not 0 or 1")]
    InvalidPlayer(u8),

    #[error("player mapping must give the two players distinct marks (both got '{0}')")]
    InvalidMapping(Mark),

    #[error("search finished without a move")]
    NoMove,

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Identity of a player: 0 moves first, 1 moves second.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Player(u8);

impl Player {
    pub const FIRST: Player = Player(0);
    pub const SECOND: Player = Player(1);

    pub fn new(id: u8) -> Result<Self, SolverError> {
        if id > 1 {
            return Err(SolverError::InvalidPlayer(id));
        }
        Ok(Player(id))
    }

    #[inline]
    pub fn id(self) -> u8 {
        self.0
    }

    /// The player moving after this one.
    #[inline]
    pub fn next(self) -> Player {
        Player((self.0 + 1) & 1)
    }
}

/// Maps player ids to the marks they put on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlayerMapping {
    marks: [Mark; 2],
}

impl Default for PlayerMapping {
    /// Player 0 plays X.
    fn default() -> Self {
        Self {
            marks: [Mark::X, Mark::O],
        }
    }
}

impl PlayerMapping {
    /// Build a mapping from a pure function of the player id. The function
    /// is evaluated once for each of the two ids.
    pub fn new(mapping: impl Fn(u8) -> Mark) -> Result<Self, SolverError> {
        let marks = [mapping(0), mapping(1)];
        if marks[0] == marks[1] {
            return Err(SolverError::InvalidMapping(marks[0]));
        }
        Ok(Self { marks })
    }

    #[inline]
    pub fn mark(&self, player: Player) -> Mark {
        self.marks[player.0 as usize]
    }

    /// The player that puts `mark` on the board.
    pub fn player(&self, mark: Mark) -> Player {
        if self.marks[0] == mark {
            Player::FIRST
        } else {
            Player::SECOND
        }
    }
}

/// Statistics of the most recent search.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStats {
    /// Nodes expanded (minimax family) or allocated (MCTS).
    pub expanded_nodes: usize,
    /// Outer loop iterations (MCTS only).
    pub iterations: u64,
    /// Wall-clock time of the whole search.
    pub elapsed: Duration,
    /// Heuristic value of the chosen move (minimax family only).
    pub best_value: Option<i32>,
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expanded nodes: {}", self.expanded_nodes)?;
        if self.iterations > 0 {
            write!(f, ", iterations: {}", self.iterations)?;
        }
        if let Some(value) = self.best_value {
            write!(f, ", chosen heuristic: {value}")?;
        }
        write!(f, ", elapsed: {:.3?}", self.elapsed)
    }
}

/// A move-choosing strategy.
pub trait Solver {
    /// Short human-readable name of the strategy.
    fn name(&self) -> &'static str;

    /// Choose a cell for the AI on a board that is not yet decided.
    ///
    /// Returns a row-major index in `0..9`; the caller maps it to
    /// `(index / 3, index % 3)` and applies it to its own board. The board
    /// passed in is a copy and is never modified on the caller's side.
    fn run(&mut self, board: Board) -> Result<usize, SolverError>;

    /// Statistics of the most recent [`Solver::run`].
    fn stats(&self) -> SearchStats;

    /// Write search diagnostics to `out`. The format is not stable.
    fn print(&self, out: &mut dyn io::Write) -> io::Result<()> {
        writeln!(out, "{}: {}", self.name(), self.stats())
    }
}

/// Reject boards on which no move can be made.
pub(crate) fn ensure_playable(board: Board) -> Result<(), SolverError> {
    if game_state(board).is_terminal() {
        return Err(SolverError::GameOver);
    }
    Ok(())
}

/// The closed set of available strategies.
pub enum Engine {
    Minimax(Minimax),
    AlphaBeta(AlphaBeta),
    Mcts(Mcts),
}

impl Engine {
    fn solver(&self) -> &dyn Solver {
        match self {
            Engine::Minimax(s) => s,
            Engine::AlphaBeta(s) => s,
            Engine::Mcts(s) => s,
        }
    }

    fn solver_mut(&mut self) -> &mut dyn Solver {
        match self {
            Engine::Minimax(s) => s,
            Engine::AlphaBeta(s) => s,
            Engine::Mcts(s) => s,
        }
    }
}

impl Solver for Engine {
    fn name(&self) -> &'static str {
        self.solver().name()
    }

    fn run(&mut self, board: Board) -> Result<usize, SolverError> {
        self.solver_mut().run(board)
    }

    fn stats(&self) -> SearchStats {
        self.solver().stats()
    }

    fn print(&self, out: &mut dyn io::Write) -> io::Result<()> {
        self.solver().print(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_player() {
        assert_eq!(Player::FIRST.next(), Player::SECOND);
        assert_eq!(Player::SECOND.next(), Player::FIRST);
    }

    #[test]
    fn test_invalid_player() {
        assert_eq!(Player::new(2), Err(SolverError::InvalidPlayer(2)));
        assert_eq!(Player::new(1), Ok(Player::SECOND));
    }

    #[test]
    fn test_mapping() {
        let mapping = PlayerMapping::new(|id| if id == 0 { Mark::O } else { Mark::X }).unwrap();
        assert_eq!(mapping.mark(Player::FIRST), Mark::O);
        assert_eq!(mapping.mark(Player::SECOND), Mark::X);
        assert_eq!(mapping.player(Mark::X), Player::SECOND);
    }

    #[test]
    fn test_mapping_rejects_same_mark() {
        assert_eq!(
            PlayerMapping::new(|_| Mark::X),
            Err(SolverError::InvalidMapping(Mark::X))
        );
    }

    #[test]
    fn test_ensure_playable() {
        assert!(ensure_playable(Board::new()).is_ok());
        let won: Board = "xxx/oo./...".parse().unwrap();
        assert_eq!(ensure_playable(won), Err(SolverError::GameOver));
        let drawn: Board = "xox/xoo/oxx".parse().unwrap();
        assert_eq!(ensure_playable(drawn), Err(SolverError::GameOver));
    }

    #[test]
    fn test_stats_display() {
        let stats = SearchStats {
            expanded_nodes: 12,
            best_value: Some(3),
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("expanded nodes: 12"));
        assert!(text.contains("chosen heuristic: 3"));
    }
}
