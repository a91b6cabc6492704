use crate::engine::{BoardState, Goal, Granularity};

/// Lower-bound estimators for the number of moves left before the goal is reached.
///
/// Only the goal piece is looked at. Every move slides exactly one piece, so a move either
/// leaves the goal piece where it is or moves it along a single axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Heuristic {
    /// Always 0. A* degrades to uniform-cost search.
    Zero,
    /// Manhattan distance from the goal piece's anchor to the target.
    ///
    /// A unit move changes the distance by at most one, so this never overestimates (and
    /// is consistent) under `Granularity::Unit`. It can overestimate under
    /// `Granularity::Slide`, where one move may cover several cells.
    Manhattan,
    /// Number of axes (row, column) on which the goal piece is off target: 0, 1 or 2.
    ///
    /// A slide changes one axis at most, so this is admissible for both granularities.
    AxisAlignment,
}

impl Heuristic {
    /// The strongest admissible heuristic for the given move granularity.
    pub fn default_for(granularity: Granularity) -> Self {
        match granularity {
            Granularity::Unit => Heuristic::Manhattan,
            Granularity::Slide => Heuristic::AxisAlignment,
        }
    }

    /// Returns `true` if the heuristic never overestimates under `granularity`.
    pub fn is_admissible_for(&self, granularity: Granularity) -> bool {
        !matches!(
            (self, granularity),
            (Heuristic::Manhattan, Granularity::Slide)
        )
    }

    /// Estimates the number of moves still needed to satisfy `goal` from `state`.
    ///
    /// # Examples
    /// ```
    /// use klotski_solver::engine::Goal;
    /// use klotski_solver::heuristics::Heuristic;
    /// use klotski_solver::utils::decode_state;
    ///
    /// let (board, state) = decode_state("11.\n11.\n...").unwrap();
    /// let goal = Goal::bottom_center(&board).unwrap(); // target (1, 0)
    /// assert_eq!(Heuristic::Manhattan.estimate(&goal, &state), 1);
    /// assert_eq!(Heuristic::AxisAlignment.estimate(&goal, &state), 1);
    /// assert_eq!(Heuristic::Zero.estimate(&goal, &state), 0);
    /// ```
    pub fn estimate(&self, goal: &Goal, state: &BoardState) -> u32 {
        let current = state.position(goal.piece());
        let target = goal.target();
        match self {
            Heuristic::Zero => 0,
            Heuristic::Manhattan => current.manhattan(target),
            Heuristic::AxisAlignment => {
                u32::from(current.row() != target.row()) + u32::from(current.col() != target.col())
            }
        }
    }
}

impl std::fmt::Display for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Heuristic::Zero => "zero",
            Heuristic::Manhattan => "manhattan",
            Heuristic::AxisAlignment => "axis-alignment",
        })
    }
}
