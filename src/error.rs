//! Error types for puzzle loading, state validation and move replay.
//!
//! Search failures (`Exhausted`, `LimitReached`, `Cancelled`) are not errors;
//! they are reported through `solver::SolveOutcome`.
use crate::engine::{Direction, MAX_DIMENSION, MAX_PIECES};
use thiserror::Error;

/// A puzzle definition could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Puzzle definition contains no board rows")]
    Empty,
    #[error("Row {row} has {found} cells (expected {expected})")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Board of {width}x{height} exceeds the maximum of {max} in either dimension", max = MAX_DIMENSION)]
    TooLarge { width: usize, height: usize },
    #[error("Unrecognized character '{symbol}' in row {row} col {col}")]
    UnknownSymbol { symbol: char, row: usize, col: usize },
    #[error("Piece '{symbol}' at row {row} col {col} does not form its declared shape")]
    MalformedPiece { symbol: char, row: usize, col: usize },
    #[error("Cells marked '{symbol}' do not form a single solid rectangle")]
    NotRectangular { symbol: char },
    #[error("Puzzle has more than {max} pieces", max = MAX_PIECES)]
    TooManyPieces,
    #[error("Invalid declaration line '{line}'")]
    InvalidDeclaration { line: String },
    #[error("Invalid layout: {0}")]
    Layout(#[from] ConfigError),
}

/// A puzzle is syntactically valid but cannot be searched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Board dimensions {width}x{height} must be between 1 and {max}", max = MAX_DIMENSION)]
    InvalidDimensions { width: usize, height: usize },
    #[error("Board has {count} pieces (at most {max} allowed)", max = MAX_PIECES)]
    TooManyPieces { count: usize },
    #[error("No goal piece ('1') declared")]
    NoGoalPiece,
    #[error("More than one goal piece declared")]
    MultipleGoalPieces,
    #[error("Target ({row}, {col}) does not fit the goal piece on a {width}x{height} board")]
    TargetOutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },
    #[error("Expected positions for {expected} pieces, found {found}")]
    PieceCountMismatch { expected: usize, found: usize },
    #[error("Piece {piece} at ({row}, {col}) lies outside the board")]
    OutOfBounds { piece: usize, row: usize, col: usize },
    #[error("Pieces {first} and {second} overlap at ({row}, {col})")]
    Overlap {
        first: usize,
        second: usize,
        row: usize,
        col: usize,
    },
}

/// A move supplied from outside the move generator is not legal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("No piece with index {0}")]
    NoSuchPiece(usize),
    #[error("Move of zero steps")]
    ZeroSteps,
    #[error("Piece {piece} cannot move {direction} by {steps}: blocked or off the board")]
    Blocked {
        piece: usize,
        direction: Direction,
        steps: u8,
    },
}

/// Umbrella error for loading puzzles and for the binaries.
#[derive(Debug, Error)]
pub enum KlotskiError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
