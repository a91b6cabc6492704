use crate::engine::{Board, BoardState, Goal, Glyph, Move, Piece, Pos, Puzzle, Shape};
use crate::engine::{MAX_DIMENSION, MAX_PIECES};
use crate::error::{KlotskiError, MoveError, ParseError};
use crate::solver::Solution;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Parses a text grid into a `Board` and its `BoardState`.
///
/// Each non-blank line is one row of the board, one symbol per cell. Leading and trailing
/// whitespace on a line is ignored. Valid symbols are:
/// - '.': empty cell
/// - '1': goal piece; all `1` cells must form one solid rectangle
/// - '2': 1x1 piece
/// - '<' followed by '>': 1x2 horizontal piece
/// - '^' above 'v': 2x1 vertical piece
/// - any other ASCII letter: one piece per letter, whose cells must form a solid rectangle
///
/// # Arguments
/// * `text`: The grid, rows separated by newlines.
///
/// # Returns
/// * `Ok((Board, BoardState))` if parsing is successful.
/// * `Err(ParseError)` if:
///     - There are no rows, or the board is wider or taller than `MAX_DIMENSION`.
///     - Rows have different lengths.
///     - A symbol is not recognized (spaces inside a row included).
///     - A `<`, `>`, `^` or `v` is missing its other half.
///     - The cells of the goal piece or of a letter do not form a solid rectangle.
///     - There are more than `MAX_PIECES` pieces.
///
/// # Examples
/// ```
/// use klotski_solver::utils::decode_state;
///
/// let (board, state) = decode_state("^11^\nv11v\n^<>^\nv22v\n2..2").unwrap();
/// assert_eq!((board.width(), board.height()), (4, 5));
/// assert_eq!(board.piece_count(), 10);
/// assert_eq!(board.encode(&state), "^11^\nv11v\n^<>^\nv22v\n2..2");
///
/// assert!(decode_state("2#").is_err());
/// assert!(decode_state("<.").is_err());
/// assert!(decode_state("22\n2").is_err());
/// ```
pub fn decode_state(text: &str) -> Result<(Board, BoardState), ParseError> {
    let rows: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    decode_rows(&rows)
}

fn decode_rows(rows: &[&str]) -> Result<(Board, BoardState), ParseError> {
    let grid: Vec<Vec<char>> = rows.iter().map(|row| row.chars().collect()).collect();
    let height = grid.len();
    let width = grid.first().map(Vec::len).ok_or(ParseError::Empty)?;
    if width == 0 {
        return Err(ParseError::Empty);
    }
    for (r, row) in grid.iter().enumerate() {
        if row.len() != width {
            return Err(ParseError::RaggedRow {
                row: r,
                expected: width,
                found: row.len(),
            });
        }
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(ParseError::TooLarge { width, height });
    }

    let mut placements = Vec::new();
    // Cells already claimed as the second half of a domino.
    let mut consumed = vec![false; width * height];
    // Cells of rectangle pieces ('1' and letters), gathered before their shape is known.
    let mut rectangles: BTreeMap<char, Vec<(usize, usize)>> = BTreeMap::new();

    for r in 0..height {
        for c in 0..width {
            if consumed[r * width + c] {
                continue;
            }
            let symbol = grid[r][c];
            let malformed = ParseError::MalformedPiece { symbol, row: r, col: c };
            match symbol {
                '.' => {}
                '2' => placements.push((Piece::single(), Pos::new(r, c))),
                '<' => {
                    if c + 1 < width && grid[r][c + 1] == '>' {
                        consumed[r * width + c + 1] = true;
                        placements.push((Piece::horizontal(), Pos::new(r, c)));
                    } else {
                        return Err(malformed);
                    }
                }
                '^' => {
                    if r + 1 < height && grid[r + 1][c] == 'v' {
                        consumed[(r + 1) * width + c] = true;
                        placements.push((Piece::vertical(), Pos::new(r, c)));
                    } else {
                        return Err(malformed);
                    }
                }
                '>' | 'v' => return Err(malformed),
                '1' => rectangles.entry(symbol).or_default().push((r, c)),
                s if s.is_ascii_alphabetic() => rectangles.entry(s).or_default().push((r, c)),
                _ => {
                    return Err(ParseError::UnknownSymbol {
                        symbol,
                        row: r,
                        col: c,
                    })
                }
            }
        }
    }

    for (symbol, cells) in rectangles {
        let (top, left) = cells[0];
        let bottom = cells.iter().map(|&(r, _)| r).max().unwrap_or(top);
        let min_col = cells.iter().map(|&(_, c)| c).min().unwrap_or(left);
        let max_col = cells.iter().map(|&(_, c)| c).max().unwrap_or(left);
        let (rect_height, rect_width) = (bottom - top + 1, max_col - min_col + 1);
        // Cells are distinct, so a full count inside the bounding box means a solid rectangle.
        if rect_height * rect_width != cells.len() {
            return Err(ParseError::NotRectangular { symbol });
        }
        let glyph = if symbol == '1' {
            Glyph::Goal
        } else {
            Glyph::Letter(symbol)
        };
        let shape = Shape::new(rect_height as u8, rect_width as u8);
        placements.push((Piece::new(glyph, shape), Pos::new(top, min_col)));
    }

    if placements.len() > MAX_PIECES {
        return Err(ParseError::TooManyPieces);
    }
    Ok(Board::with_state(width, height, placements)?)
}

// Parses `target <row> <col>`.
fn parse_declaration(line: &str) -> Result<Pos, ParseError> {
    let invalid = || ParseError::InvalidDeclaration {
        line: line.to_string(),
    };
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["target", row, col] => {
            let row: usize = row.parse().map_err(|_| invalid())?;
            let col: usize = col.parse().map_err(|_| invalid())?;
            if row > MAX_DIMENSION || col > MAX_DIMENSION {
                return Err(invalid());
            }
            Ok(Pos::new(row, col))
        }
        _ => Err(invalid()),
    }
}

/// Loads a full puzzle definition: the grid, then optionally a `target <row> <col>` line.
///
/// Lines containing inner whitespace are declarations; lines starting with `#` are
/// comments. Without a target declaration the goal is `Goal::bottom_center`.
///
/// # Returns
/// * `Err(KlotskiError::Parse)` for malformed text.
/// * `Err(KlotskiError::Config)` if there is no goal piece or the target does not fit.
///
/// # Examples
/// ```
/// use klotski_solver::engine::Pos;
/// use klotski_solver::utils::load_puzzle;
///
/// let puzzle = load_puzzle("# corner exit\n11.\n11.\n...\ntarget 1 1\n").unwrap();
/// assert_eq!(puzzle.goal().target(), Pos::new(1, 1));
///
/// let classic = load_puzzle("^11^\nv11v\n^<>^\nv22v\n2..2").unwrap();
/// assert_eq!(classic.goal().target(), Pos::new(3, 1));
/// ```
pub fn load_puzzle(text: &str) -> Result<Puzzle, KlotskiError> {
    let mut rows = Vec::new();
    let mut target = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.contains(char::is_whitespace) {
            target = Some(parse_declaration(line)?);
        } else {
            rows.push(line);
        }
    }

    let (board, initial) = decode_rows(&rows)?;
    let goal = match target {
        Some(pos) => Goal::new(&board, pos)?,
        None => Goal::bottom_center(&board)?,
    };
    Ok(Puzzle::new(board, initial, goal)?)
}

/// Reads and loads a puzzle definition file.
pub fn read_puzzle_file(path: &Path) -> Result<Puzzle, KlotskiError> {
    let content = fs::read_to_string(path)?;
    load_puzzle(&content)
}

/// Formats a solution as board encodings, one block per state, each followed by a blank
/// line. This is the format written by `write_solution_file`.
pub fn format_solution(board: &Board, solution: &Solution) -> String {
    let mut output = String::new();
    for state in solution.states() {
        output.push_str(&board.encode(state));
        output.push_str("\n\n");
    }
    output
}

/// Formats the moves of a solution, one per line: step number, the piece's symbol and
/// anchor before the move, direction and distance.
///
/// # Examples
/// ```
/// use klotski_solver::solver::{solve, SolveOptions};
/// use klotski_solver::utils::{format_moves, load_puzzle};
///
/// let puzzle = load_puzzle("11.\n11.\ntarget 0 1").unwrap();
/// let solution = solve(&puzzle, SolveOptions::default()).into_solution().unwrap();
/// assert_eq!(format_moves(puzzle.board(), &solution), "1: 1@0,0 right 1\n");
/// ```
pub fn format_moves(board: &Board, solution: &Solution) -> String {
    let mut output = String::new();
    for (i, (mv, before)) in solution.moves().iter().zip(solution.states()).enumerate() {
        let symbol = board.piece(mv.piece).glyph().symbol_at(0, 0);
        output.push_str(&format!(
            "{}: {}@{} {} {}\n",
            i + 1,
            symbol,
            before.position(mv.piece),
            mv.direction,
            mv.steps
        ));
    }
    output
}

/// Writes `format_solution` output to `path`.
pub fn write_solution_file(
    path: &Path,
    board: &Board,
    solution: &Solution,
) -> Result<(), KlotskiError> {
    fs::write(path, format_solution(board, solution))?;
    Ok(())
}

/// Replays `moves` from `initial`, checking each one.
///
/// # Returns
/// Every state along the way, `initial` included, or the first `MoveError`.
pub fn replay(
    board: &Board,
    initial: &BoardState,
    moves: &[Move],
) -> Result<Vec<BoardState>, MoveError> {
    let mut states = Vec::with_capacity(moves.len() + 1);
    states.push(initial.clone());
    for &mv in moves {
        let next = board.try_apply(&states[states.len() - 1], mv)?;
        states.push(next);
    }
    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Direction;
    use crate::error::ConfigError;
    use crate::solver::{solve, SolveOptions};

    const CLASSIC: &str = "^11^\nv11v\n^<>^\nv22v\n2..2";

    #[test]
    fn test_decode_state_classic_pieces() {
        let (board, state) = decode_state(CLASSIC).unwrap();
        let goal = board.goal_piece().unwrap();
        assert_eq!(board.piece(goal).shape(), Shape::new(2, 2));
        assert_eq!(state.position(goal), Pos::new(0, 1));
        let verticals = board
            .pieces()
            .iter()
            .filter(|p| p.glyph() == Glyph::Vertical)
            .count();
        assert_eq!(verticals, 4);
    }

    #[test]
    fn test_decode_state_letters() {
        let (board, state) = decode_state("AAB\nAAB\n.C.").unwrap();
        assert_eq!(board.piece_count(), 3);
        let a = board
            .pieces()
            .iter()
            .position(|p| p.glyph() == Glyph::Letter('A'))
            .unwrap();
        assert_eq!(board.piece(a).shape(), Shape::new(2, 2));
        assert_eq!(state.position(a), Pos::new(0, 0));
        assert_eq!(board.encode(&state), "AAB\nAAB\n.C.");
    }

    #[test]
    fn test_round_trip_normalizes_whitespace() {
        let texts = [
            CLASSIC,
            "  ^11^\n  v11v  \n\n^<>^\nv22v\n2..2\n\n",
            "AAB\nAAB\n.C.",
            "11.\n11.\n...",
            "2.<>\n^...\nv.22",
        ];
        for text in texts {
            let (board, state) = decode_state(text).unwrap();
            let normalized: Vec<&str> = text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            assert_eq!(board.encode(&state), normalized.join("\n"), "round trip of {text:?}");
        }
    }

    #[test]
    fn test_decode_state_errors() {
        assert_eq!(decode_state("").unwrap_err(), ParseError::Empty);
        assert_eq!(decode_state("\n  \n").unwrap_err(), ParseError::Empty);
        assert_eq!(
            decode_state("22\n2").unwrap_err(),
            ParseError::RaggedRow { row: 1, expected: 2, found: 1 }
        );
        assert_eq!(
            decode_state("2#2").unwrap_err(),
            ParseError::UnknownSymbol { symbol: '#', row: 0, col: 1 }
        );
        assert_eq!(
            decode_state("2 2").unwrap_err(),
            ParseError::UnknownSymbol { symbol: ' ', row: 0, col: 1 }
        );
        assert_eq!(
            decode_state("<2").unwrap_err(),
            ParseError::MalformedPiece { symbol: '<', row: 0, col: 0 }
        );
        assert_eq!(
            decode_state("2>").unwrap_err(),
            ParseError::MalformedPiece { symbol: '>', row: 0, col: 1 }
        );
        assert_eq!(
            decode_state("^\n.").unwrap_err(),
            ParseError::MalformedPiece { symbol: '^', row: 0, col: 0 }
        );
        assert_eq!(
            decode_state("^").unwrap_err(),
            ParseError::MalformedPiece { symbol: '^', row: 0, col: 0 }
        );
        assert_eq!(
            decode_state("11\n1.").unwrap_err(),
            ParseError::NotRectangular { symbol: '1' }
        );
        assert_eq!(
            decode_state("A.A").unwrap_err(),
            ParseError::NotRectangular { symbol: 'A' }
        );
    }

    #[test]
    fn test_decode_state_too_large() {
        let row = ".".repeat(MAX_DIMENSION + 1);
        assert!(matches!(
            decode_state(&row),
            Err(ParseError::TooLarge { width, height: 1 }) if width == MAX_DIMENSION + 1
        ));
    }

    #[test]
    fn test_decode_state_too_many_pieces() {
        let row = "2".repeat(MAX_DIMENSION);
        assert_eq!(decode_state(&row).unwrap_err(), ParseError::TooManyPieces);
    }

    #[test]
    fn test_load_puzzle_default_and_explicit_target() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        assert_eq!(puzzle.goal().target(), Pos::new(3, 1));
        assert_eq!(puzzle.goal().piece(), puzzle.board().goal_piece().unwrap());

        let text = format!("# classic, other exit\n{CLASSIC}\ntarget 0 2\n");
        let puzzle = load_puzzle(&text).unwrap();
        assert_eq!(puzzle.goal().target(), Pos::new(0, 2));
    }

    #[test]
    fn test_load_puzzle_display_round_trip() {
        let puzzle = load_puzzle("11.\n11.\n...\ntarget 1 1").unwrap();
        let reloaded = load_puzzle(&puzzle.to_string()).unwrap();
        assert_eq!(reloaded, puzzle);
    }

    #[test]
    fn test_load_puzzle_errors() {
        assert!(matches!(
            load_puzzle("2.\n.."),
            Err(KlotskiError::Config(ConfigError::NoGoalPiece))
        ));
        assert!(matches!(
            load_puzzle("11.\n11.\ntarget 1 0"),
            Err(KlotskiError::Config(ConfigError::TargetOutOfBounds { .. }))
        ));
        for bad in ["target 1", "target a 1", "goal 1 1", "target 1 1 1", "target 999 0"] {
            let text = format!("11\n11\n{bad}");
            assert!(
                matches!(load_puzzle(&text), Err(KlotskiError::Parse(ParseError::InvalidDeclaration { .. }))),
                "'{bad}' should be rejected"
            );
        }
    }

    #[test]
    fn test_format_solution_blocks() {
        let puzzle = load_puzzle("11.\n11.\ntarget 0 1").unwrap();
        let solution = solve(&puzzle, SolveOptions::default()).into_solution().unwrap();
        assert_eq!(format_solution(puzzle.board(), &solution), "11.\n11.\n\n.11\n.11\n\n");
    }

    #[test]
    fn test_replay_checks_moves() {
        let (board, state) = decode_state("2..").unwrap();
        let states = replay(
            &board,
            &state,
            &[Move::unit(0, Direction::Right), Move::unit(0, Direction::Right)],
        )
        .unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(board.encode(&states[2]), "..2");

        let err = replay(&board, &state, &[Move::unit(0, Direction::Left)]).unwrap_err();
        assert!(matches!(err, MoveError::Blocked { piece: 0, .. }));
    }

    #[test]
    fn test_replay_matches_solver_path() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let solution = solve(&puzzle, SolveOptions::default()).into_solution().unwrap();
        let states = replay(puzzle.board(), puzzle.initial(), solution.moves()).unwrap();
        assert_eq!(states.as_slice(), solution.states());
    }
}
