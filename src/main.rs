//! Tictac-Rust: tic-tac-toe against minimax or MCTS engines.
//!
//! ## Usage
//!
//! - `tictac-rust` - Play against the alpha-beta engine
//! - `tictac-rust play --engine mcts --ai-first` - Choose the engine and who starts
//! - `tictac-rust selfplay --x mcts --o minimax --games 20` - Engine matches
//! - `tictac-rust analyze --board "x.../.o./..."` - Solve a position

use std::io;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tictac_rust::board::{Board, Mark, game_state};
use tictac_rust::console::{EngineKind, EngineOptions, build_engine, play, self_play};
use tictac_rust::constants::{COLS, MCTS_TIME_LIMIT_MS, POOL_CAPACITY};
use tictac_rust::game_tree::GameTree;
use tictac_rust::mcts::MctsConfig;

/// Tictac-Rust: tic-tac-toe search engines
#[derive(Parser)]
#[command(name = "tictac-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play an interactive game on the console
    Play {
        /// Engine to play against: minimax, alpha-beta or mcts
        #[arg(long, default_value = "alpha-beta")]
        engine: EngineKind,
        /// Let the engine move first (it then plays x)
        #[arg(long)]
        ai_first: bool,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Pit two engines against each other
    Selfplay {
        /// Engine playing x
        #[arg(long, default_value = "mcts")]
        x: EngineKind,
        /// Engine playing o
        #[arg(long, default_value = "alpha-beta")]
        o: EngineKind,
        /// Number of games
        #[arg(long, default_value_t = 10)]
        games: u32,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Build the full minimax tree for a position and report its value
    Analyze {
        /// Nine cells of x, o and '.', row-major; '/' separates rows
        #[arg(long, default_value = ".../.../...")]
        board: String,
    },
}

/// MCTS budgets.
#[derive(Args)]
struct SearchArgs {
    /// Time budget per MCTS move, in milliseconds
    #[arg(long, default_value_t = MCTS_TIME_LIMIT_MS)]
    time_limit_ms: u64,
    /// Iteration budget per MCTS move
    #[arg(long)]
    iterations: Option<u64>,
    /// Seed for reproducible MCTS games
    #[arg(long)]
    seed: Option<u64>,
}

impl SearchArgs {
    fn options(&self) -> EngineOptions {
        EngineOptions {
            mcts: MctsConfig {
                time_limit: Duration::from_millis(self.time_limit_ms),
                max_iterations: self.iterations,
                ..Default::default()
            },
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tictac_rust=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Play {
            engine,
            ai_first,
            search,
        }) => {
            let ai = if ai_first { Mark::X } else { Mark::O };
            let mut solver = build_engine(engine, ai, &search.options())?;
            info!(%engine, %ai, "starting game");
            let stdin = io::stdin();
            play(&mut solver, ai, stdin.lock(), io::stdout())?;
        }
        Some(Commands::Selfplay {
            x,
            o,
            games,
            search,
        }) => {
            let tally = self_play(x, o, games, &search.options())?;
            println!("{x} (x) vs {o} (o): {tally}");
        }
        Some(Commands::Analyze { board }) => analyze(&board)?,
        None => {
            let mut solver = build_engine(EngineKind::AlphaBeta, Mark::O, &EngineOptions::default())?;
            let stdin = io::stdin();
            play(&mut solver, Mark::O, stdin.lock(), io::stdout())?;
        }
    }

    Ok(())
}

fn analyze(text: &str) -> Result<()> {
    let board: Board = text.parse().context("could not parse --board")?;
    let state = game_state(board);
    if state.is_terminal() {
        bail!("position is already decided: {state:?}");
    }

    let mover = board.side_to_move();
    let mut tree = GameTree::new(POOL_CAPACITY);
    let value = tree.build(board, mover)?;

    println!("{board}");
    println!("to move: {mover}");
    println!("tree size: {} nodes", tree.len());
    println!("value: {value}");
    if let Some(cell) = tree.best_move() {
        println!("best move: {} {}", cell / COLS, cell % COLS);
    }
    Ok(())
}
