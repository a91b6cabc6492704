//! Core puzzle engine for Klotski-style sliding-block puzzles.
//!
//! This module defines the puzzle's fundamental components:
//! - `Pos`, `Direction`, `Shape`, `Glyph` and `Piece`: the vocabulary of the board.
//! - `Board`: the fixed grid plus the read-only piece definitions. It validates states,
//!   generates legal moves, applies them and encodes states as text.
//! - `BoardState`: the position of every piece at one instant. States are never mutated
//!   once built, so they can be shared freely as hash keys and search nodes.
//! - `Goal` and `Puzzle`: the goal predicate and a validated (board, initial state, goal) triple.
use crate::error::{ConfigError, MoveError};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;
use std::ops::Range;

/// Largest supported board width or height.
pub const MAX_DIMENSION: usize = 255;

/// Largest supported number of pieces on one board.
pub const MAX_PIECES: usize = 254;

// Marks a free cell in an occupancy grid; piece indices stay below it.
const EMPTY_CELL: u8 = u8::MAX;

/// A cell coordinate on the board. The anchor of a piece is its top-left cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    row: u8,
    col: u8,
}

impl Pos {
    /// Creates a position from a (row, column) pair.
    ///
    /// Both coordinates must be below `MAX_DIMENSION + 1`.
    pub fn new(row: usize, col: usize) -> Self {
        debug_assert!(row <= MAX_DIMENSION && col <= MAX_DIMENSION);
        Pos {
            row: row as u8,
            col: col as u8,
        }
    }

    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn col(&self) -> usize {
        self.col as usize
    }

    /// Manhattan distance between two positions.
    pub fn manhattan(&self, other: Pos) -> u32 {
        (self.row().abs_diff(other.row()) + self.col().abs_diff(other.col())) as u32
    }

    // Signed neighbour `steps` cells away; may leave the board.
    fn offset(&self, direction: Direction, steps: u8) -> (isize, isize) {
        let (dr, dc) = direction.delta();
        (
            self.row as isize + dr * steps as isize,
            self.col as isize + dc * steps as isize,
        )
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// One of the four orthogonal sliding directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions in move-generation order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Returns the (row, column) delta of a one-cell slide.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        })
    }
}

/// Rectangular footprint of a piece, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Shape {
    pub height: u8,
    pub width: u8,
}

impl Shape {
    pub const fn new(height: u8, width: u8) -> Self {
        Shape { height, width }
    }
}

/// How a piece is written in the text encoding.
///
/// Pieces with the same glyph and shape are interchangeable: the text encoding cannot
/// tell them apart, so board states do not either.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Glyph {
    /// The distinguished piece, written `1` in every cell it covers.
    Goal,
    /// A 1x1 piece, written `2`.
    Single,
    /// A 1x2 piece, written `<>`.
    Horizontal,
    /// A 2x1 piece, written `^` above `v`.
    Vertical,
    /// A rectangle of any size, written with its letter in every cell.
    Letter(char),
}

impl Glyph {
    /// Returns the symbol drawn at offset (`dr`, `dc`) inside the piece.
    ///
    /// # Examples
    /// ```
    /// use klotski_solver::engine::Glyph;
    /// assert_eq!(Glyph::Horizontal.symbol_at(0, 0), '<');
    /// assert_eq!(Glyph::Horizontal.symbol_at(0, 1), '>');
    /// assert_eq!(Glyph::Vertical.symbol_at(1, 0), 'v');
    /// assert_eq!(Glyph::Letter('A').symbol_at(1, 2), 'A');
    /// ```
    pub fn symbol_at(&self, dr: usize, dc: usize) -> char {
        match self {
            Glyph::Goal => '1',
            Glyph::Single => '2',
            Glyph::Horizontal if dc == 0 => '<',
            Glyph::Horizontal => '>',
            Glyph::Vertical if dr == 0 => '^',
            Glyph::Vertical => 'v',
            Glyph::Letter(c) => *c,
        }
    }
}

/// A rigid rectangular piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Piece {
    glyph: Glyph,
    shape: Shape,
}

impl Piece {
    /// Creates a piece. The fixed glyphs (`Single`, `Horizontal`, `Vertical`) always get
    /// their canonical shape; `shape` only matters for `Goal` and `Letter` pieces.
    pub fn new(glyph: Glyph, shape: Shape) -> Self {
        let shape = match glyph {
            Glyph::Single => Shape::new(1, 1),
            Glyph::Horizontal => Shape::new(1, 2),
            Glyph::Vertical => Shape::new(2, 1),
            Glyph::Goal | Glyph::Letter(_) => shape,
        };
        Piece { glyph, shape }
    }

    pub fn single() -> Self {
        Piece::new(Glyph::Single, Shape::new(1, 1))
    }

    pub fn horizontal() -> Self {
        Piece::new(Glyph::Horizontal, Shape::new(1, 2))
    }

    pub fn vertical() -> Self {
        Piece::new(Glyph::Vertical, Shape::new(2, 1))
    }

    /// The classic 2x2 goal block.
    pub fn goal() -> Self {
        Piece::new(Glyph::Goal, Shape::new(2, 2))
    }

    pub fn glyph(&self) -> Glyph {
        self.glyph
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn height(&self) -> usize {
        self.shape.height as usize
    }

    pub fn width(&self) -> usize {
        self.shape.width as usize
    }

    pub fn is_goal(&self) -> bool {
        self.glyph == Glyph::Goal
    }

    /// Iterates over the (row, column) cells the piece covers when anchored at `anchor`.
    pub fn cells(&self, anchor: Pos) -> impl Iterator<Item = (usize, usize)> {
        let (row, col) = (anchor.row(), anchor.col());
        let (height, width) = (self.height(), self.width());
        (row..row + height).flat_map(move |r| (col..col + width).map(move |c| (r, c)))
    }
}

/// How far a single move may slide a piece.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Every move slides one piece by exactly one cell.
    #[default]
    Unit,
    /// A move slides one piece any number of cells in a straight line.
    Slide,
}

/// A transition: slide piece `piece` by `steps` cells towards `direction`.
///
/// `piece` is the index of the piece in the state the move is applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub piece: usize,
    pub direction: Direction,
    pub steps: u8,
}

impl Move {
    /// A one-cell move.
    pub fn unit(piece: usize, direction: Direction) -> Self {
        Move {
            piece,
            direction,
            steps: 1,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "piece {} {} {}", self.piece, self.direction, self.steps)
    }
}

/// Positions of every piece, indexed like `Board::pieces`.
///
/// Within a class of interchangeable pieces the positions are kept in ascending
/// (row, column) order, so two states are equal exactly when they draw the same picture.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardState {
    positions: Box<[Pos]>,
}

impl BoardState {
    pub fn positions(&self) -> &[Pos] {
        &self.positions
    }

    /// Returns the anchor of piece `piece`.
    ///
    /// # Panics
    /// Panics if `piece` is not a valid piece index.
    pub fn position(&self, piece: usize) -> Pos {
        self.positions[piece]
    }
}

/// The fixed grid and the pieces that live on it.
///
/// A `Board` is created once per puzzle and is read-only afterwards. Pieces are stored
/// grouped by class (same glyph and shape), and `BoardState`s built for this board keep
/// each class sorted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    pieces: Vec<Piece>,
    classes: Vec<Range<usize>>,
    class_of: Vec<usize>,
}

impl Board {
    /// Builds a board and its first state from a list of placed pieces.
    ///
    /// The pieces are reordered into classes, so the index of a piece in the returned
    /// board is not necessarily its index in `placements`.
    ///
    /// # Arguments
    /// * `width`, `height`: Board dimensions, each between 1 and `MAX_DIMENSION`.
    /// * `placements`: Every piece together with its anchor position.
    ///
    /// # Returns
    /// The `Board` and the canonical `BoardState`, or a `ConfigError` if the dimensions are
    /// invalid, there are too many pieces or goal pieces, or the pieces overlap or leave the
    /// board.
    ///
    /// # Examples
    /// ```
    /// use klotski_solver::engine::{Board, Piece, Pos};
    /// let (board, state) = Board::with_state(
    ///     3,
    ///     2,
    ///     vec![(Piece::single(), Pos::new(1, 2)), (Piece::goal(), Pos::new(0, 0))],
    /// )
    /// .unwrap();
    /// assert_eq!(board.piece_count(), 2);
    /// assert_eq!(board.encode(&state), "11.\n112");
    /// ```
    pub fn with_state(
        width: usize,
        height: usize,
        mut placements: Vec<(Piece, Pos)>,
    ) -> Result<(Board, BoardState), ConfigError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(ConfigError::InvalidDimensions { width, height });
        }
        if placements.len() > MAX_PIECES {
            return Err(ConfigError::TooManyPieces {
                count: placements.len(),
            });
        }
        if placements.iter().filter(|(piece, _)| piece.is_goal()).count() > 1 {
            return Err(ConfigError::MultipleGoalPieces);
        }

        placements.sort_unstable_by_key(|(piece, pos)| (piece.glyph, piece.shape, *pos));

        let mut classes: Vec<Range<usize>> = Vec::new();
        let mut class_of = Vec::with_capacity(placements.len());
        for (ix, (piece, _)) in placements.iter().enumerate() {
            let same_class = ix > 0 && placements[ix - 1].0 == *piece;
            match classes.last_mut() {
                Some(range) if same_class => range.end = ix + 1,
                _ => classes.push(ix..ix + 1),
            }
            class_of.push(classes.len() - 1);
        }

        let (pieces, positions): (Vec<Piece>, Vec<Pos>) = placements.into_iter().unzip();
        let board = Board {
            width,
            height,
            pieces,
            classes,
            class_of,
        };
        let state = BoardState {
            positions: positions.into_boxed_slice(),
        };
        board.validate(&state)?;
        Ok((board, state))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, piece: usize) -> &Piece {
        &self.pieces[piece]
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Index of the goal piece, if the board has one.
    pub fn goal_piece(&self) -> Option<usize> {
        self.pieces.iter().position(Piece::is_goal)
    }

    /// Builds a state for this board from explicit anchors, indexed like `pieces()`.
    ///
    /// Positions of interchangeable pieces are re-sorted into canonical order.
    pub fn state_from_positions(&self, positions: Vec<Pos>) -> Result<BoardState, ConfigError> {
        if positions.len() != self.pieces.len() {
            return Err(ConfigError::PieceCountMismatch {
                expected: self.pieces.len(),
                found: positions.len(),
            });
        }
        let mut positions = positions.into_boxed_slice();
        for class in &self.classes {
            positions[class.clone()].sort_unstable();
        }
        let state = BoardState { positions };
        self.validate(&state)?;
        Ok(state)
    }

    /// Checks the board-state invariants: one position per piece, every piece inside the
    /// board and no two pieces sharing a cell.
    pub fn validate(&self, state: &BoardState) -> Result<(), ConfigError> {
        if state.positions.len() != self.pieces.len() {
            return Err(ConfigError::PieceCountMismatch {
                expected: self.pieces.len(),
                found: state.positions.len(),
            });
        }

        let mut owner = vec![EMPTY_CELL; self.width * self.height];
        for (ix, (piece, &pos)) in self.pieces.iter().zip(state.positions.iter()).enumerate() {
            if pos.row() + piece.height() > self.height || pos.col() + piece.width() > self.width
            {
                return Err(ConfigError::OutOfBounds {
                    piece: ix,
                    row: pos.row(),
                    col: pos.col(),
                });
            }
            for (r, c) in piece.cells(pos) {
                let cell = &mut owner[r * self.width + c];
                if *cell != EMPTY_CELL {
                    return Err(ConfigError::Overlap {
                        first: *cell as usize,
                        second: ix,
                        row: r,
                        col: c,
                    });
                }
                *cell = ix as u8;
            }
        }
        Ok(())
    }

    // Row-major grid holding the index of the piece covering each cell.
    fn occupancy(&self, state: &BoardState) -> Vec<u8> {
        let mut grid = vec![EMPTY_CELL; self.width * self.height];
        for (ix, (piece, &pos)) in self.pieces.iter().zip(state.positions.iter()).enumerate() {
            for (r, c) in piece.cells(pos) {
                grid[r * self.width + c] = ix as u8;
            }
        }
        grid
    }

    // Whether piece `ix` could sit with its anchor at (row, col) given the occupancy grid.
    fn fits(&self, occupancy: &[u8], ix: usize, (row, col): (isize, isize)) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        let piece = &self.pieces[ix];
        let (row, col) = (row as usize, col as usize);
        if row + piece.height() > self.height || col + piece.width() > self.width {
            return false;
        }
        piece.cells(Pos::new(row, col)).all(|(r, c)| {
            let owner = occupancy[r * self.width + c];
            owner == EMPTY_CELL || owner as usize == ix
        })
    }

    /// Enumerates every legal move from `state`.
    ///
    /// A move is legal when every cell of the moved piece, shifted along the direction,
    /// stays on the board and is not covered by another piece. Under `Granularity::Slide`
    /// each reachable distance along a direction is a separate move. Moves are ordered by
    /// piece index, then by `Direction::ALL`, then by distance.
    ///
    /// # Examples
    /// ```
    /// use klotski_solver::engine::{Direction, Granularity, Move};
    /// use klotski_solver::utils::decode_state;
    ///
    /// let (board, state) = decode_state("2.\n..").unwrap();
    /// let moves = board.legal_moves(&state, Granularity::Unit);
    /// assert_eq!(moves, vec![Move::unit(0, Direction::Down), Move::unit(0, Direction::Right)]);
    /// ```
    pub fn legal_moves(&self, state: &BoardState, granularity: Granularity) -> Vec<Move> {
        let occupancy = self.occupancy(state);
        let mut moves = Vec::new();

        for (ix, &pos) in state.positions.iter().enumerate() {
            for direction in Direction::ALL {
                let mut steps = 1u8;
                while self.fits(&occupancy, ix, pos.offset(direction, steps)) {
                    moves.push(Move {
                        piece: ix,
                        direction,
                        steps,
                    });
                    if granularity == Granularity::Unit || steps == u8::MAX {
                        break;
                    }
                    steps += 1;
                }
            }
        }
        moves
    }

    /// Applies a move generated for `state`, returning the successor state.
    ///
    /// `state` is left untouched. The move must be legal for `state`; an illegal move is a
    /// bug in the caller and is treated as fatal. Use `try_apply` for moves that come from
    /// outside the move generator.
    ///
    /// # Panics
    /// Panics if the move pushes the piece past the top or left edge, or (in debug builds)
    /// if the resulting state breaks a board invariant.
    pub fn apply(&self, state: &BoardState, mv: Move) -> BoardState {
        let (row, col) = state.positions[mv.piece].offset(mv.direction, mv.steps);
        if row < 0 || col < 0 {
            unreachable!("{mv} moves a piece off the board");
        }

        let mut positions = state.positions.clone();
        positions[mv.piece] = Pos::new(row as usize, col as usize);
        positions[self.classes[self.class_of[mv.piece]].clone()].sort_unstable();

        let next = BoardState { positions };
        debug_assert!(
            self.validate(&next).is_ok(),
            "{mv} produced an invalid state"
        );
        next
    }

    /// Applies a move after checking that it is legal for `state`.
    ///
    /// Every intermediate cell of a multi-step slide has to be free as well.
    pub fn try_apply(&self, state: &BoardState, mv: Move) -> Result<BoardState, MoveError> {
        if mv.piece >= self.pieces.len() {
            return Err(MoveError::NoSuchPiece(mv.piece));
        }
        if mv.steps == 0 {
            return Err(MoveError::ZeroSteps);
        }
        let occupancy = self.occupancy(state);
        let anchor = state.positions[mv.piece];
        let clear = (1..=mv.steps).all(|k| self.fits(&occupancy, mv.piece, anchor.offset(mv.direction, k)));
        if !clear {
            return Err(MoveError::Blocked {
                piece: mv.piece,
                direction: mv.direction,
                steps: mv.steps,
            });
        }
        Ok(self.apply(state, mv))
    }

    /// Encodes `state` as text: one line per row, one symbol per cell, `.` for empty cells,
    /// rows separated by `\n` without a trailing newline.
    pub fn encode(&self, state: &BoardState) -> String {
        let mut grid = vec!['.'; self.width * self.height];
        for (piece, &pos) in self.pieces.iter().zip(state.positions.iter()) {
            for (r, c) in piece.cells(pos) {
                grid[r * self.width + c] = piece.glyph.symbol_at(r - pos.row(), c - pos.col());
            }
        }
        grid.chunks(self.width)
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Lists the empty cells of `state` in row-major order.
    pub fn empty_cells(&self, state: &BoardState) -> Vec<Pos> {
        self.occupancy(state)
            .iter()
            .enumerate()
            .filter(|(_, owner)| **owner == EMPTY_CELL)
            .map(|(ix, _)| Pos::new(ix / self.width, ix % self.width))
            .collect()
    }

    /// Performs a reproducible random walk of `steps` unit moves from `state`.
    ///
    /// The walk avoids stepping straight back to the state it just left whenever another
    /// move exists. The same seed always produces the same walk, which makes the result
    /// usable as a test or benchmark position.
    ///
    /// # Arguments
    /// * `state`: The starting state. It is not modified.
    /// * `steps`: Number of moves to make.
    /// * `seed`: Seed for the `SmallRng` driving the walk.
    ///
    /// # Returns
    /// The state reached after the walk, or `state` itself if no piece can move.
    pub fn scramble(&self, state: &BoardState, steps: usize, seed: u64) -> BoardState {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut current = state.clone();
        let mut previous: Option<BoardState> = None;

        for _ in 0..steps {
            let successors: Vec<BoardState> = self
                .legal_moves(&current, Granularity::Unit)
                .into_iter()
                .map(|mv| self.apply(&current, mv))
                .collect();
            let fresh: Vec<&BoardState> = successors
                .iter()
                .filter(|next| previous.as_ref() != Some(*next))
                .collect();

            let next = match fresh.choose(&mut rng) {
                Some(next) => (*next).clone(),
                None => match successors.choose(&mut rng) {
                    Some(next) => next.clone(),
                    None => break,
                },
            };
            previous = Some(std::mem::replace(&mut current, next));
        }
        current
    }
}

/// The goal predicate: the goal piece's anchor sits on `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Goal {
    piece: usize,
    target: Pos,
}

impl Goal {
    /// Creates the goal for `board` with an explicit target anchor.
    ///
    /// Fails if the board has no goal piece or the goal piece would not fit at `target`.
    pub fn new(board: &Board, target: Pos) -> Result<Goal, ConfigError> {
        let piece = board.goal_piece().ok_or(ConfigError::NoGoalPiece)?;
        let footprint = board.piece(piece);
        if target.row() + footprint.height() > board.height()
            || target.col() + footprint.width() > board.width()
        {
            return Err(ConfigError::TargetOutOfBounds {
                row: target.row(),
                col: target.col(),
                width: board.width(),
                height: board.height(),
            });
        }
        Ok(Goal { piece, target })
    }

    /// The traditional Klotski exit: goal piece resting on the bottom edge, horizontally
    /// centred (rounded left). On the classic 4x5 board this is row 3, column 1.
    pub fn bottom_center(board: &Board) -> Result<Goal, ConfigError> {
        let piece = board.goal_piece().ok_or(ConfigError::NoGoalPiece)?;
        let footprint = board.piece(piece);
        let row = board.height() - footprint.height();
        let col = (board.width() - footprint.width()) / 2;
        Goal::new(board, Pos::new(row, col))
    }

    pub fn piece(&self) -> usize {
        self.piece
    }

    pub fn target(&self) -> Pos {
        self.target
    }

    pub fn is_satisfied(&self, state: &BoardState) -> bool {
        state.position(self.piece) == self.target
    }
}

/// A validated puzzle: board, initial state and goal belong together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Puzzle {
    board: Board,
    initial: BoardState,
    goal: Goal,
}

impl Puzzle {
    /// Bundles the parts of a puzzle after checking `initial` against `board`.
    pub fn new(board: Board, initial: BoardState, goal: Goal) -> Result<Puzzle, ConfigError> {
        board.validate(&initial)?;
        if board.goal_piece() != Some(goal.piece()) {
            return Err(ConfigError::NoGoalPiece);
        }
        Ok(Puzzle {
            board,
            initial,
            goal,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn initial(&self) -> &BoardState {
        &self.initial
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }
}

impl fmt::Display for Puzzle {
    /// Writes the initial state followed by the target declaration.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.board.encode(&self.initial))?;
        write!(
            f,
            "target {} {}",
            self.goal.target().row(),
            self.goal.target().col()
        )
    }
}
