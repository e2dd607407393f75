//! Space-time states and per-agent paths.

use serde::{Deserialize, Serialize};

use crate::grid::Cell;

/// A `(cell, t)` tuple; the natural state space when time matters.
/// `t = 0` denotes the agent's initial state. Equality and hashing are
/// structural over both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceTimeState {
    pub cell: Cell,
    pub t: usize,
}

impl SpaceTimeState {
    pub fn new(cell: Cell, t: usize) -> Self {
        SpaceTimeState { cell, t }
    }
}

/// An ordered sequence of space-time states for one agent.
///
/// Invariants (checked by [`Path::new`] only in debug assertions, since
/// every path the planners hand out is built incrementally from an
/// already-valid predecessor):
/// - `steps[0].cell == agent.start`, `steps[0].t == 0`.
/// - consecutive steps are one time tick apart and either equal or
///   4-adjacent in cell.
/// - the final step's cell is the agent's goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    steps: Vec<Cell>,
}

impl Path {
    /// `steps[k]` is this agent's position at time `k`.
    pub fn new(steps: Vec<Cell>) -> Self {
        debug_assert!(!steps.is_empty(), "a path always has at least the start step");
        Path { steps }
    }

    pub fn steps(&self) -> &[Cell] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `|path| - 1`: the agent's individual cost (sum-of-costs term).
    pub fn cost(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn start(&self) -> Cell {
        self.steps[0]
    }

    pub fn goal(&self) -> Cell {
        *self.steps.last().expect("path is never empty")
    }

    /// The agent's position at time `t`, extending past the path's tail
    /// by holding the goal cell forever (goal holding).
    pub fn at(&self, t: usize) -> Cell {
        match self.steps.get(t) {
            Some(&cell) => cell,
            None => self.goal(),
        }
    }

    /// Iterates `(cell, t)` for `t` in `0..=last_t`, i.e. the explicit
    /// tail, without the implicit goal-holding extension.
    pub fn iter_states(&self) -> impl Iterator<Item = SpaceTimeState> + '_ {
        self.steps
            .iter()
            .enumerate()
            .map(|(t, &cell)| SpaceTimeState::new(cell, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_holding_extends_past_tail() {
        let path = Path::new(vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(path.at(0), (0, 0));
        assert_eq!(path.at(2), (0, 2));
        assert_eq!(path.at(5), (0, 2));
    }

    #[test]
    fn cost_is_steps_minus_one() {
        let path = Path::new(vec![(1, 1)]);
        assert_eq!(path.cost(), 0);
        let path = Path::new(vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(path.cost(), 2);
    }
}
