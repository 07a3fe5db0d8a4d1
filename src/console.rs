//! Console front end: an interactive game against an engine and
//! engine-versus-engine matches.
//!
//! The console owns the authoritative board. Engines only ever see copies
//! and answer with a cell index, which the console applies itself.
//!
//! ## Example
//!
//! ```
//! use tictac_rust::board::{GameState, Mark};
//! use tictac_rust::console::{EngineKind, EngineOptions, build_engine, play_match};
//!
//! let options = EngineOptions::default();
//! let mut x = build_engine(EngineKind::AlphaBeta, Mark::X, &options).unwrap();
//! let mut o = build_engine(EngineKind::AlphaBeta, Mark::O, &options).unwrap();
//! assert_eq!(play_match(&mut x, &mut o).unwrap(), GameState::Draw);
//! ```

use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::board::{Board, GameState, Mark, game_state};
use crate::constants::COLS;
use crate::mcts::{Mcts, MctsConfig};
use crate::minimax::{AlphaBeta, Minimax};
use crate::solver::{Engine, PlayerMapping, Solver};

/// Which strategy to build.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineKind {
    Minimax,
    AlphaBeta,
    Mcts,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimax" => Ok(EngineKind::Minimax),
            "alpha-beta" | "alphabeta" => Ok(EngineKind::AlphaBeta),
            "mcts" => Ok(EngineKind::Mcts),
            other => Err(format!(
                "unknown engine '{other}' (expected minimax, alpha-beta or mcts)"
            )),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::Minimax => "minimax",
            EngineKind::AlphaBeta => "alpha-beta",
            EngineKind::Mcts => "mcts",
        };
        write!(f, "{name}")
    }
}

/// Settings shared by every engine the console builds.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// MCTS budgets
    pub mcts: MctsConfig,
    /// Seed for the MCTS random generator (`None` = entropy)
    pub seed: Option<u64>,
}

/// Build an engine that plays `mark`. X always moves first.
pub fn build_engine(kind: EngineKind, mark: Mark, options: &EngineOptions) -> Result<Engine> {
    let mapping = PlayerMapping::default();
    let player = mapping.player(mark);
    let engine = match kind {
        EngineKind::Minimax => Engine::Minimax(Minimax::new(player, mapping)),
        EngineKind::AlphaBeta => Engine::AlphaBeta(AlphaBeta::new(player, mapping)),
        EngineKind::Mcts => {
            let rng = options
                .seed
                .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
            let mcts = Mcts::with_rng(player, mapping, options.mcts.clone(), rng)
                .context("invalid MCTS configuration")?;
            Engine::Mcts(mcts)
        }
    };
    Ok(engine)
}

/// Parse a human move given as `row col` (a comma also works as separator).
pub fn parse_move(line: &str) -> Result<(usize, usize)> {
    let parts: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 2 {
        bail!("expected two numbers: row col");
    }
    let row = parts[0]
        .parse::<usize>()
        .with_context(|| format!("invalid row '{}'", parts[0]))?;
    let col = parts[1]
        .parse::<usize>()
        .with_context(|| format!("invalid column '{}'", parts[1]))?;
    Ok((row, col))
}

fn describe(state: GameState, ai: Mark) -> &'static str {
    match state {
        GameState::Win(mark) if mark == ai => "You lose!",
        GameState::Win(_) => "You win!",
        GameState::Draw => "Draw!",
        GameState::Ongoing => "Game in progress",
    }
}

/// Play one game between a human on `input` and `engine` playing `ai`.
///
/// Invalid human moves are reported on `out` and asked for again. Returns
/// the final state of the game.
pub fn play<R: BufRead, W: Write>(
    engine: &mut Engine,
    ai: Mark,
    mut input: R,
    mut out: W,
) -> Result<GameState> {
    let mut board = Board::new();
    writeln!(out, "{board}")?;

    loop {
        let state = game_state(board);
        if state.is_terminal() {
            writeln!(out, "{}", describe(state, ai))?;
            return Ok(state);
        }

        if board.side_to_move() == ai {
            let index = engine.run(board).context("engine failed to move")?;
            board.assign(index / COLS, index % COLS, ai)?;
            writeln!(out, "{} plays {} {}", engine.name(), index / COLS, index % COLS)?;
            engine.print(&mut out)?;
        } else {
            write!(out, "your move (row col): ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                bail!("input closed before the game ended");
            }
            let placed = parse_move(&line)
                .and_then(|(row, col)| Ok(board.assign(row, col, ai.opponent())?));
            if let Err(e) = placed {
                writeln!(out, "{e:#}")?;
                continue;
            }
        }
        writeln!(out, "{board}")?;
    }
}

/// Play `x` against `o` from an empty board and return the final state.
pub fn play_match(x: &mut Engine, o: &mut Engine) -> Result<GameState> {
    let mut board = Board::new();
    loop {
        let state = game_state(board);
        if state.is_terminal() {
            return Ok(state);
        }
        let mover = board.side_to_move();
        let engine = if mover == Mark::X { &mut *x } else { &mut *o };
        let index = engine.run(board)?;
        board.assign(index / COLS, index % COLS, mover)?;
        debug!(engine = engine.name(), %mover, index, "match move");
    }
}

/// Results of a series of matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub x_wins: u32,
    pub o_wins: u32,
    pub draws: u32,
}

impl Tally {
    pub fn record(&mut self, state: GameState) {
        match state {
            GameState::Win(Mark::X) => self.x_wins += 1,
            GameState::Win(Mark::O) => self.o_wins += 1,
            GameState::Draw => self.draws += 1,
            GameState::Ongoing => {}
        }
    }

    pub fn games(&self) -> u32 {
        self.x_wins + self.o_wins + self.draws
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x wins: {}, o wins: {}, draws: {} ({} games)",
            self.x_wins,
            self.o_wins,
            self.draws,
            self.games()
        )
    }
}

/// Play `games` matches between two engine kinds.
///
/// With a seed, game `i` uses seed `seed + i` so repeated runs give the same
/// tally.
pub fn self_play(x: EngineKind, o: EngineKind, games: u32, options: &EngineOptions) -> Result<Tally> {
    let mut tally = Tally::default();
    for game in 0..games {
        let options = EngineOptions {
            seed: options.seed.map(|s| s.wrapping_add(game as u64)),
            ..options.clone()
        };
        let mut x_engine = build_engine(x, Mark::X, &options)?;
        let mut o_engine = build_engine(o, Mark::O, &options.clone_with_offset(1))?;
        let result = play_match(&mut x_engine, &mut o_engine)?;
        info!(game, ?result, "self-play game finished");
        tally.record(result);
    }
    Ok(tally)
}

impl EngineOptions {
    /// Same options, with the seed shifted so two engines in one match do
    /// not share a random stream.
    fn clone_with_offset(&self, offset: u64) -> Self {
        Self {
            seed: self.seed.map(|s| s.wrapping_add(offset.wrapping_mul(0x9E37_79B9))),
            ..self.clone()
        }
    }
}
