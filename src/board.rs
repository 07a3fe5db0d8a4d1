//! Bit-packed 3x3 board and game-state classification.
//!
//! A [`Board`] is a plain `Copy` value holding two 9-bit planes in one `u32`:
//! bits `0..9` mark cells taken by X, bits `9..18` mark cells taken by O.
//! A cell is never present in both planes; the mutation API only ever sets
//! one plane per call, so the invariant holds for every board it produces.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::{COLS, FULL_BOARD, LINES, ROWS, SIZE};

/// The mark a player puts on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The other mark.
    #[inline]
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Mark::X => 'x',
            Mark::O => 'o',
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Content of a single cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    X,
    O,
    Free,
}

impl From<Mark> for Cell {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Cell::X,
            Mark::O => Cell::O,
        }
    }
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::X => 'x',
            Cell::O => 'o',
            Cell::Free => '.',
        }
    }
}

/// Errors reported by the board mutation and parsing API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("cell ({row}, {col}) is outside the 3x3 board")]
    OutOfRange { row: usize, col: usize },

    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },

    #[error("invalid board description: {0}")]
    Parse(String),
}

/// Outcome classification of a board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GameState {
    /// Some player completed a line.
    Win(Mark),
    /// Every cell is taken and nobody completed a line.
    Draw,
    /// At least one free cell and no completed line.
    Ongoing,
}

impl GameState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != GameState::Ongoing
    }
}

const fn line_masks() -> [u32; 8] {
    let mut masks = [0u32; 8];
    let mut i = 0;
    while i < LINES.len() {
        masks[i] = (1 << LINES[i][0]) | (1 << LINES[i][1]) | (1 << LINES[i][2]);
        i += 1;
    }
    masks
}

/// Single-plane bit masks of the winning lines, in scan order.
const LINE_MASKS: [u32; 8] = line_masks();

#[inline]
fn plane_bit(index: usize, mark: Mark) -> u32 {
    match mark {
        Mark::X => 1 << index,
        Mark::O => 1 << (index + SIZE),
    }
}

/// A 3x3 tic-tac-toe board.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Board {
    bits: u32,
}

impl Board {
    /// An empty board.
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Raw encoding. Not a stable format.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.bits
    }

    #[inline]
    fn x_plane(self) -> u32 {
        self.bits & FULL_BOARD
    }

    #[inline]
    fn o_plane(self) -> u32 {
        (self.bits >> SIZE) & FULL_BOARD
    }

    #[inline]
    fn occupied(self) -> u32 {
        self.x_plane() | self.o_plane()
    }

    /// Content of the cell at `(row, col)`.
    ///
    /// Panics if the coordinates are outside the board.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> Cell {
        assert!(row < ROWS && col < COLS, "cell ({row}, {col}) out of range");
        self.at_index(row * COLS + col)
    }

    /// Content of the cell with row-major index `index`.
    #[inline]
    pub fn at_index(&self, index: usize) -> Cell {
        debug_assert!(index < SIZE);
        if self.bits & (1 << index) != 0 {
            Cell::X
        } else if self.bits & (1 << (index + SIZE)) != 0 {
            Cell::O
        } else {
            Cell::Free
        }
    }

    #[inline]
    pub fn is_free(&self, index: usize) -> bool {
        (self.occupied() >> index) & 1 == 0
    }

    /// Put `mark` on the free cell `(row, col)`.
    pub fn assign(&mut self, row: usize, col: usize, mark: Mark) -> Result<(), BoardError> {
        if row >= ROWS || col >= COLS {
            return Err(BoardError::OutOfRange { row, col });
        }
        let index = row * COLS + col;
        if !self.is_free(index) {
            return Err(BoardError::Occupied { row, col });
        }
        self.place(index, mark);
        Ok(())
    }

    /// Remove whatever mark sits on `(row, col)`. Clearing a free cell is a
    /// no-op, and so are coordinates outside the board.
    pub fn clear(&mut self, row: usize, col: usize) {
        if row < ROWS && col < COLS {
            self.unplace(row * COLS + col);
        }
    }

    /// Unchecked placement for the search loops, which only ever enumerate
    /// free cells.
    #[inline]
    pub(crate) fn place(&mut self, index: usize, mark: Mark) {
        debug_assert!(index < SIZE && self.is_free(index), "cell {index} is not free");
        self.bits |= plane_bit(index, mark);
    }

    #[inline]
    pub(crate) fn unplace(&mut self, index: usize) {
        self.bits &= !(plane_bit(index, Mark::X) | plane_bit(index, Mark::O));
    }

    /// Copy of this board with `mark` placed on `index`.
    #[inline]
    pub(crate) fn with(mut self, index: usize, mark: Mark) -> Board {
        self.place(index, mark);
        self
    }

    /// True when all nine cells are occupied, regardless of any completed line.
    #[inline]
    pub fn finished(&self) -> bool {
        self.occupied() == FULL_BOARD
    }

    /// Indices of the free cells, in row-major order.
    pub fn free_cells(self) -> impl Iterator<Item = usize> {
        let occupied = self.occupied();
        (0..SIZE).filter(move |&i| (occupied >> i) & 1 == 0)
    }

    /// Number of cells holding `mark`.
    pub fn count(self, mark: Mark) -> u32 {
        match mark {
            Mark::X => self.x_plane().count_ones(),
            Mark::O => self.o_plane().count_ones(),
        }
    }

    /// The mark whose turn it is, assuming X moved first.
    pub fn side_to_move(self) -> Mark {
        if self.count(Mark::X) > self.count(Mark::O) {
            Mark::O
        } else {
            Mark::X
        }
    }

    /// The single cell that differs between `self` and `other`, if exactly one does.
    pub fn changed_cell(self, other: Board) -> Option<usize> {
        let diff = self.bits ^ other.bits;
        let cells = (diff | (diff >> SIZE)) & FULL_BOARD;
        (cells.count_ones() == 1).then(|| cells.trailing_zeros() as usize)
    }
}

/// Classify `board` as won, drawn, or still in play.
///
/// Lines are scanned rows first, then columns, then the two diagonals; the
/// first completed line decides the winner.
pub fn game_state(board: Board) -> GameState {
    let x = board.x_plane();
    let o = board.o_plane();
    for mask in LINE_MASKS {
        if x & mask == mask {
            return GameState::Win(Mark::X);
        }
        if o & mask == mask {
            return GameState::Win(Mark::O);
        }
    }
    if board.finished() {
        GameState::Draw
    } else {
        GameState::Ongoing
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..ROWS {
            for col in 0..COLS {
                if col > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{}", self.at(row, col).symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: String = (0..SIZE).map(|i| self.at_index(i).symbol()).collect();
        write!(f, "Board({cells})")
    }
}

impl FromStr for Board {
    type Err = BoardError;

    /// Parse nine cell symbols (`x`, `o`, `.`) in row-major order.
    /// Whitespace and `/` row separators are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbols: Vec<char> = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '/')
            .collect();
        if symbols.len() != SIZE {
            return Err(BoardError::Parse(format!(
                "expected {SIZE} cells, found {}",
                symbols.len()
            )));
        }

        let mut board = Board::new();
        for (index, c) in symbols.into_iter().enumerate() {
            match c.to_ascii_lowercase() {
                'x' => board.place(index, Mark::X),
                'o' => board.place(index, Mark::O),
                '.' | '-' | '_' => {}
                other => {
                    return Err(BoardError::Parse(format!("unexpected symbol '{other}'")));
                }
            }
        }
        Ok(board)
    }
}
