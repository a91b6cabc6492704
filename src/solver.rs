//! Search engine for sliding-block puzzles.
//!
//! One engine drives both strategies. A* pops nodes from a priority queue ordered by
//! `cost + heuristic` (first in, first out among equal priorities); depth-first search pops
//! from a plain stack. Both share the visited set, the node arena and path reconstruction.
use crate::engine::{Board, BoardState, Goal, Granularity, Move, Puzzle};
use crate::error::ConfigError;
use crate::heuristics::Heuristic;
use log::{debug, info, trace, warn};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::ops::ControlFlow;

// How often (in expansions) a progress line is traced.
const PROGRESS_LOG_INTERVAL: usize = 10_000;

/// Which search algorithm to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Informed best-first search. Returns a shortest path when the heuristic is admissible.
    #[default]
    AStar,
    /// Exhaustive depth-first search. Returns some path, usually a long one.
    Dfs,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::AStar => "a-star",
            Strategy::Dfs => "dfs",
        })
    }
}

/// Knobs for one solve call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolveOptions {
    pub strategy: Strategy,
    pub granularity: Granularity,
    /// Heuristic for A*. `None` picks `Heuristic::default_for(granularity)`. DFS ignores it.
    pub heuristic: Option<Heuristic>,
    /// Stop with `SolveOutcome::LimitReached` after this many node expansions.
    pub max_expansions: Option<usize>,
}

impl SolveOptions {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = Some(heuristic);
        self
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = Some(max_expansions);
        self
    }

    /// The heuristic the engine will actually use.
    pub fn effective_heuristic(&self) -> Heuristic {
        match self.strategy {
            Strategy::Dfs => Heuristic::Zero,
            Strategy::AStar => self
                .heuristic
                .unwrap_or_else(|| Heuristic::default_for(self.granularity)),
        }
    }
}

/// Counters collected during one solve call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes taken off the frontier and expanded (each a distinct state).
    pub expanded: usize,
    /// Nodes created, the initial one included.
    pub generated: usize,
    /// Successors and frontier entries dropped because their state was already expanded.
    pub duplicates: usize,
    /// Largest frontier size observed.
    pub peak_frontier: usize,
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expanded {}, generated {}, duplicates {}, peak frontier {}",
            self.expanded, self.generated, self.duplicates, self.peak_frontier
        )
    }
}

/// Snapshot handed to the observer before each expansion.
#[derive(Debug)]
pub struct Progress<'a> {
    /// Expansions so far, this one included.
    pub expanded: usize,
    pub frontier_len: usize,
    /// Path length from the start to `state`.
    pub cost: u32,
    pub state: &'a BoardState,
}

/// A path from the start state to a goal state.
///
/// `states()` holds `len() + 1` states, start and goal included; `moves()[i]` turns
/// `states()[i]` into `states()[i + 1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    states: Vec<BoardState>,
    moves: Vec<Move>,
    stats: SearchStats,
}

impl Solution {
    /// Number of moves in the solution.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// `true` when the start state already satisfied the goal.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn states(&self) -> &[BoardState] {
        &self.states
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    pub fn initial_state(&self) -> &BoardState {
        &self.states[0]
    }

    pub fn final_state(&self) -> &BoardState {
        &self.states[self.states.len() - 1]
    }

    /// The state shown at playback position `index` (0 is the start), if it exists.
    pub fn render_step(&self, index: usize) -> Option<&BoardState> {
        self.states.get(index)
    }

    /// Iterates over each move together with the state it produces.
    pub fn steps(&self) -> impl Iterator<Item = (Move, &BoardState)> {
        self.moves.iter().copied().zip(self.states.iter().skip(1))
    }
}

/// Result of a solve call. Only `Solved` carries a path; every variant carries the stats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved(Solution),
    /// Every reachable state was expanded without meeting the goal: the puzzle has no
    /// solution under the configured move granularity.
    Exhausted(SearchStats),
    /// `max_expansions` ran out before the search finished.
    LimitReached(SearchStats),
    /// The observer asked the search to stop.
    Cancelled(SearchStats),
}

impl SolveOutcome {
    pub fn stats(&self) -> &SearchStats {
        match self {
            SolveOutcome::Solved(solution) => solution.stats(),
            SolveOutcome::Exhausted(stats)
            | SolveOutcome::LimitReached(stats)
            | SolveOutcome::Cancelled(stats) => stats,
        }
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }
}

// Ordering of discovered-but-unexpanded nodes. Nodes are arena indices.
trait Frontier {
    fn push(&mut self, node: usize, priority: u32);
    fn pop(&mut self) -> Option<usize>;
    fn len(&self) -> usize;
}

// Min-heap on priority; the sequence number makes equal priorities pop in insertion order.
#[derive(Default)]
struct PriorityFrontier {
    heap: BinaryHeap<Reverse<(u32, u64, usize)>>,
    next_seq: u64,
}

impl Frontier for PriorityFrontier {
    fn push(&mut self, node: usize, priority: u32) {
        self.heap.push(Reverse((priority, self.next_seq, node)));
        self.next_seq += 1;
    }

    fn pop(&mut self) -> Option<usize> {
        self.heap.pop().map(|Reverse((_, _, node))| node)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

#[derive(Default)]
struct StackFrontier {
    stack: Vec<usize>,
}

impl Frontier for StackFrontier {
    fn push(&mut self, node: usize, _priority: u32) {
        self.stack.push(node);
    }

    fn pop(&mut self) -> Option<usize> {
        self.stack.pop()
    }

    fn len(&self) -> usize {
        self.stack.len()
    }
}

struct SearchNode {
    state: BoardState,
    parent: Option<usize>,
    via: Option<Move>,
    cost: u32,
}

/// A solver bound to one puzzle. Each solve call owns its own frontier, visited set and
/// node arena, so calls are independent of each other.
///
/// # Examples
/// ```
/// use klotski_solver::solver::{SolveOptions, Solver};
/// use klotski_solver::utils::load_puzzle;
///
/// let puzzle = load_puzzle("11.\n11.\ntarget 0 1").unwrap();
/// let outcome = Solver::new(&puzzle, SolveOptions::default()).solve();
/// let solution = outcome.solution().unwrap();
/// assert_eq!(solution.len(), 1);
/// assert!(puzzle.goal().is_satisfied(solution.final_state()));
/// ```
pub struct Solver<'a> {
    board: &'a Board,
    goal: &'a Goal,
    initial: &'a BoardState,
    options: SolveOptions,
}

impl<'a> Solver<'a> {
    pub fn new(puzzle: &'a Puzzle, options: SolveOptions) -> Self {
        Solver {
            board: puzzle.board(),
            goal: puzzle.goal(),
            initial: puzzle.initial(),
            options,
        }
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    /// Solves from the puzzle's initial state.
    pub fn solve(&self) -> SolveOutcome {
        self.search(self.initial, |_| ControlFlow::Continue(()))
    }

    /// Solves from another start state of the same board.
    ///
    /// The state is validated first; a state that breaks the board invariants is a
    /// configuration error, reported before any search happens.
    pub fn solve_from(&self, start: &BoardState) -> Result<SolveOutcome, ConfigError> {
        self.solve_with_observer(start, |_| ControlFlow::Continue(()))
    }

    /// Solves from `start`, calling `observer` before every node expansion.
    ///
    /// Returning `ControlFlow::Break(())` from the observer stops the search with
    /// `SolveOutcome::Cancelled`. This is the hook for wall-clock limits and for
    /// cancellation from a user interface; the engine itself keeps no clock.
    pub fn solve_with_observer<F>(
        &self,
        start: &BoardState,
        observer: F,
    ) -> Result<SolveOutcome, ConfigError>
    where
        F: FnMut(&Progress<'_>) -> ControlFlow<()>,
    {
        self.board.validate(start)?;
        Ok(self.search(start, observer))
    }

    fn search<F>(&self, start: &BoardState, observer: F) -> SolveOutcome
    where
        F: FnMut(&Progress<'_>) -> ControlFlow<()>,
    {
        let heuristic = self.options.effective_heuristic();
        debug!(
            "Solving with {} ({:?} moves, {} heuristic, limit {:?})",
            self.options.strategy, self.options.granularity, heuristic, self.options.max_expansions
        );
        if self.options.strategy == Strategy::AStar
            && !heuristic.is_admissible_for(self.options.granularity)
        {
            warn!(
                "{} heuristic can overestimate with {:?} moves; A* may return a longer path than necessary",
                heuristic, self.options.granularity
            );
        }

        let outcome = match self.options.strategy {
            Strategy::AStar => self.run(start, heuristic, PriorityFrontier::default(), observer),
            Strategy::Dfs => self.run(start, heuristic, StackFrontier::default(), observer),
        };
        debug!("Search finished: {}", outcome.stats());
        outcome
    }

    fn run<Fr, F>(
        &self,
        start: &BoardState,
        heuristic: Heuristic,
        mut frontier: Fr,
        mut observer: F,
    ) -> SolveOutcome
    where
        Fr: Frontier,
        F: FnMut(&Progress<'_>) -> ControlFlow<()>,
    {
        let mut stats = SearchStats::default();
        let mut nodes = vec![SearchNode {
            state: start.clone(),
            parent: None,
            via: None,
            cost: 0,
        }];
        let mut visited: HashSet<BoardState> = HashSet::new();

        frontier.push(0, heuristic.estimate(self.goal, start));
        stats.generated = 1;
        stats.peak_frontier = 1;

        while let Some(id) = frontier.pop() {
            let node = &nodes[id];

            if self.goal.is_satisfied(&node.state) {
                info!("Solved in {} moves after {} expansions", node.cost, stats.expanded);
                return SolveOutcome::Solved(reconstruct_path(&nodes, id, stats));
            }

            // A state may sit in the frontier several times; only the first pop expands it.
            if visited.contains(&node.state) {
                stats.duplicates += 1;
                continue;
            }

            if let Some(limit) = self.options.max_expansions {
                if stats.expanded >= limit {
                    debug!("Expansion limit of {} reached", limit);
                    return SolveOutcome::LimitReached(stats);
                }
            }

            visited.insert(node.state.clone());
            stats.expanded += 1;

            let progress = Progress {
                expanded: stats.expanded,
                frontier_len: frontier.len(),
                cost: node.cost,
                state: &node.state,
            };
            if observer(&progress).is_break() {
                debug!("Search cancelled after {} expansions", stats.expanded);
                return SolveOutcome::Cancelled(stats);
            }
            if stats.expanded % PROGRESS_LOG_INTERVAL == 0 {
                trace!(
                    "{} expanded, frontier {}, depth {}",
                    stats.expanded,
                    frontier.len(),
                    node.cost
                );
            }

            let cost = node.cost + 1;
            let successors: Vec<(Move, BoardState)> = self
                .board
                .legal_moves(&node.state, self.options.granularity)
                .into_iter()
                .map(|mv| (mv, self.board.apply(&node.state, mv)))
                .collect();

            for (mv, next) in successors {
                if visited.contains(&next) {
                    stats.duplicates += 1;
                    continue;
                }
                let priority = cost + heuristic.estimate(self.goal, &next);
                nodes.push(SearchNode {
                    state: next,
                    parent: Some(id),
                    via: Some(mv),
                    cost,
                });
                frontier.push(nodes.len() - 1, priority);
                stats.generated += 1;
            }
            stats.peak_frontier = stats.peak_frontier.max(frontier.len());
        }

        debug!("Frontier empty after {} expansions", stats.expanded);
        SolveOutcome::Exhausted(stats)
    }
}

// Walks parent links from `goal_id` back to the start and returns the path in forward order.
fn reconstruct_path(nodes: &[SearchNode], goal_id: usize, stats: SearchStats) -> Solution {
    let mut states = Vec::new();
    let mut moves = Vec::new();
    let mut cursor = Some(goal_id);

    while let Some(id) = cursor {
        let node = &nodes[id];
        states.push(node.state.clone());
        if let Some(mv) = node.via {
            moves.push(mv);
        }
        cursor = node.parent;
    }

    states.reverse();
    moves.reverse();
    Solution {
        states,
        moves,
        stats,
    }
}

/// Solves `puzzle` from its initial state with the given options.
///
/// # Arguments
/// * `puzzle`: A validated puzzle (board, initial state, goal).
/// * `options`: Strategy, move granularity, heuristic and expansion budget.
///
/// # Returns
/// `SolveOutcome::Solved` with the path, `Exhausted` if the goal is unreachable,
/// `LimitReached` if the expansion budget ran out first.
pub fn solve(puzzle: &Puzzle, options: SolveOptions) -> SolveOutcome {
    Solver::new(puzzle, options).solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{decode_state, load_puzzle};

    const CLASSIC: &str = "^11^\nv11v\n^<>^\nv22v\n2..2";

    // Every consecutive pair of states must be linked by a legal move.
    fn assert_path_is_legal(puzzle: &Puzzle, solution: &Solution) {
        let board = puzzle.board();
        assert_eq!(solution.states().len(), solution.len() + 1);
        assert_eq!(solution.initial_state(), puzzle.initial());
        for (i, mv) in solution.moves().iter().enumerate() {
            let next = board
                .try_apply(&solution.states()[i], *mv)
                .unwrap_or_else(|e| panic!("step {i}: {e}"));
            assert_eq!(&next, &solution.states()[i + 1], "step {i} does not match {mv}");
        }
        assert!(puzzle.goal().is_satisfied(solution.final_state()));
    }

    #[test]
    fn test_solve_already_at_goal() {
        let puzzle = load_puzzle("11\n11").unwrap();
        for strategy in [Strategy::AStar, Strategy::Dfs] {
            let outcome = solve(&puzzle, SolveOptions::default().with_strategy(strategy));
            let solution = outcome.solution().expect("trivial board must be solved");
            assert!(solution.is_empty());
            assert_eq!(solution.states(), &[puzzle.initial().clone()]);
            assert_eq!(solution.stats().expanded, 0);
        }
    }

    #[test]
    fn test_solve_already_at_goal_ignores_zero_budget() {
        let puzzle = load_puzzle("11\n11").unwrap();
        let outcome = solve(&puzzle, SolveOptions::default().with_max_expansions(0));
        assert!(matches!(outcome, SolveOutcome::Solved(_)));
    }

    #[test]
    fn test_solve_packed_board_is_exhausted() {
        let puzzle = load_puzzle("^11^\nv11v\n<><>\ntarget 1 1").unwrap();
        for strategy in [Strategy::AStar, Strategy::Dfs] {
            let outcome = solve(&puzzle, SolveOptions::default().with_strategy(strategy));
            assert_eq!(outcome, SolveOutcome::Exhausted(SearchStats {
                expanded: 1,
                generated: 1,
                duplicates: 0,
                peak_frontier: 1,
            }));
        }
    }

    #[test]
    fn test_solve_walled_in_goal_is_exhausted() {
        // The horizontal piece always stays below the goal, so the goal can never reach
        // row 2. Reachable states: goal at row 0 with the bar at row 2 or 3, goal at row 1.
        let puzzle = load_puzzle("11\n11\n<>\n..\ntarget 2 0").unwrap();
        for strategy in [Strategy::AStar, Strategy::Dfs] {
            for granularity in [Granularity::Unit, Granularity::Slide] {
                let options = SolveOptions::default()
                    .with_strategy(strategy)
                    .with_granularity(granularity);
                match solve(&puzzle, options) {
                    SolveOutcome::Exhausted(stats) => assert_eq!(stats.expanded, 3),
                    other => panic!("expected Exhausted, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_solve_small_board_a_star_is_optimal() {
        let puzzle = load_puzzle("11.\n11.\n...\ntarget 1 1").unwrap();
        let outcome = solve(&puzzle, SolveOptions::default());
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.len(), 2);
        assert_path_is_legal(&puzzle, solution);
    }

    #[test]
    fn test_solve_classic_a_star() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let outcome = solve(&puzzle, SolveOptions::default());
        let solution = outcome.solution().expect("classic Klotski is solvable");
        assert!(
            solution.len() <= 116,
            "A* found {} moves, best known is 116",
            solution.len()
        );
        assert_path_is_legal(&puzzle, solution);
    }

    #[test]
    fn test_solve_classic_is_deterministic() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let first = solve(&puzzle, SolveOptions::default());
        let second = solve(&puzzle, SolveOptions::default());
        assert_eq!(first, second, "two A* runs must return the same path and stats");
    }

    #[test]
    fn test_solve_classic_dfs_returns_legal_path() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let outcome = solve(&puzzle, SolveOptions::default().with_strategy(Strategy::Dfs));
        let solution = outcome.solution().expect("DFS must find some path");
        assert_path_is_legal(&puzzle, solution);
    }

    #[test]
    fn test_solve_classic_slides_no_longer_than_unit_moves() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let unit = solve(&puzzle, SolveOptions::default()).into_solution().unwrap();
        let slide = solve(
            &puzzle,
            SolveOptions::default().with_granularity(Granularity::Slide),
        )
        .into_solution()
        .unwrap();
        assert!(
            slide.len() <= unit.len(),
            "every unit path is also a slide path, so slides cannot need more moves"
        );
        assert_path_is_legal(&puzzle, &slide);
    }

    #[test]
    fn test_no_state_expanded_twice() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        for strategy in [Strategy::AStar, Strategy::Dfs] {
            let mut seen = HashSet::new();
            let solver = Solver::new(&puzzle, SolveOptions::default().with_strategy(strategy));
            let outcome = solver
                .solve_with_observer(puzzle.initial(), |progress| {
                    assert!(
                        seen.insert(progress.state.clone()),
                        "state expanded twice at expansion {}",
                        progress.expanded
                    );
                    ControlFlow::Continue(())
                })
                .unwrap();
            assert_eq!(seen.len(), outcome.stats().expanded);
        }
    }

    #[test]
    fn test_expansion_limit_reached() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let outcome = solve(&puzzle, SolveOptions::default().with_max_expansions(10));
        match outcome {
            SolveOutcome::LimitReached(stats) => assert_eq!(stats.expanded, 10),
            other => panic!("expected LimitReached, got {other:?}"),
        }
    }

    #[test]
    fn test_observer_can_cancel() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let solver = Solver::new(&puzzle, SolveOptions::default());
        let outcome = solver
            .solve_with_observer(puzzle.initial(), |progress| {
                if progress.expanded >= 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert!(matches!(outcome, SolveOutcome::Cancelled(stats) if stats.expanded == 5));
    }

    #[test]
    fn test_solve_from_rejects_foreign_state() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let (_, foreign) = decode_state("11\n11").unwrap();
        let solver = Solver::new(&puzzle, SolveOptions::default());
        assert!(matches!(
            solver.solve_from(&foreign),
            Err(ConfigError::PieceCountMismatch { expected: 10, found: 1 })
        ));
    }

    #[test]
    fn test_solve_from_scrambled_state() {
        let puzzle = load_puzzle(CLASSIC).unwrap();
        let start = puzzle.board().scramble(puzzle.initial(), 30, 3);
        let solver = Solver::new(&puzzle, SolveOptions::default());
        let solution = solver.solve_from(&start).unwrap().into_solution().unwrap();
        assert_eq!(solution.initial_state(), &start);
        assert!(puzzle.goal().is_satisfied(solution.final_state()));
    }

    #[test]
    fn test_solution_playback() {
        let puzzle = load_puzzle("11.\n11.\n...\ntarget 1 1").unwrap();
        let solution = solve(&puzzle, SolveOptions::default()).into_solution().unwrap();
        assert_eq!(solution.render_step(0), Some(puzzle.initial()));
        assert_eq!(solution.render_step(solution.len()), Some(solution.final_state()));
        assert_eq!(solution.render_step(solution.len() + 1), None);
        let replayed: Vec<&BoardState> = solution.steps().map(|(_, state)| state).collect();
        assert_eq!(replayed.len(), solution.len());
        assert_eq!(replayed[replayed.len() - 1], solution.final_state());
    }

    #[test]
    fn test_effective_heuristic() {
        let options = SolveOptions::default();
        assert_eq!(options.effective_heuristic(), Heuristic::Manhattan);
        let slide = options.with_granularity(Granularity::Slide);
        assert_eq!(slide.effective_heuristic(), Heuristic::AxisAlignment);
        let dfs = options
            .with_strategy(Strategy::Dfs)
            .with_heuristic(Heuristic::Manhattan);
        assert_eq!(dfs.effective_heuristic(), Heuristic::Zero);
    }

    #[test]
    fn test_priority_frontier_is_fifo_on_ties() {
        let mut frontier = PriorityFrontier::default();
        frontier.push(7, 3);
        frontier.push(1, 2);
        frontier.push(4, 3);
        frontier.push(2, 2);
        let order: Vec<usize> = std::iter::from_fn(|| frontier.pop()).collect();
        assert_eq!(order, vec![1, 2, 7, 4]);
    }
}
