//! # Klotski Solver Library
//!
//! This library models Klotski-style sliding-block puzzles and searches for move sequences
//! that bring the goal piece to its target position.
//!
//! It is used by two binaries:
//! - `klotski_solver`: Loads a puzzle file, solves it with A* or DFS, writes the solution
//!   and plays it back on the terminal.
//! - `strategy_evaluator`: Scrambles a puzzle into many start positions and compares search
//!   strategies and heuristics by path length and nodes expanded.
//!
//! ## Modules
//! - `engine`: Board geometry and pieces (`Board`, `Piece`), canonical states (`BoardState`),
//!   move generation and application, goals and puzzles.
//! - `solver`: The `Solver` with its A* and DFS strategies, search options and outcomes.
//! - `heuristics`: Lower-bound estimators used to order the A* frontier.
//! - `utils`: The text format for puzzles, solution output and move replay.
//! - `error`: Error types shared by the modules above.

pub mod engine;
pub mod error;
pub mod heuristics;
pub mod solver;
pub mod utils;

// Items from sub-modules should be accessed via their full path, e.g.
// `klotski_solver::solver::solve()`.
