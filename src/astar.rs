//! Single-agent space-time A*: shortest path in `(cell, t)` space,
//! parameterised by two forbidden sets (constraints, reservations).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::{debug, trace};

use crate::agent::Agent;
use crate::grid::{manhattan, Cell, Grid};
use crate::state::Path;
use crate::stat::Stats;

/// A forbidden `(cell, t)` pair: either a CBS constraint or a reservation
/// table entry. The two have identical semantics at this level; the
/// distinction matters only to the callers that compose them (cf.
/// `spec.md` §9 — constraints and reservations are intentionally kept as
/// distinct types at the API level, but the low-level search only needs a
/// `(Cell, usize)` membership test).
pub type Forbidden = HashSet<(Cell, usize)>;

/// The open-list entry. `Ord` is inverted so `BinaryHeap` (a max-heap)
/// pops the lowest `(f, insertion order)` pair first: the closed-set +
/// stale-pop pattern, with the insertion counter as the sole tiebreak so
/// ordering is total and deterministic.
#[derive(Clone, Eq, PartialEq)]
struct LowLevelNode {
    cell: Cell,
    t: usize,
    g: usize,
    f: usize,
    seq: usize,
}

impl Ord for LowLevelNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for LowLevelNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The outcome of a space-time A* search: the reconstructed path plus the
/// sequence of `(cell, t)` states in first-discovery order, for UI
/// animation (`spec.md` §4.1's exploration trace).
pub struct SearchResult {
    pub path: Option<Path>,
    pub exploration_trace: Vec<(Cell, usize)>,
}

/// Runs space-time A* for one agent.
///
/// `constraints` and `reservations` are both forbidden `(cell, t)` sets;
/// a successor eliminated by either is never pushed onto the open list.
/// Succeeds on the first pop of a state whose cell is the agent's goal;
/// fails once the open list empties or every remaining state would
/// require `t > horizon`.
pub fn search(
    grid: &Grid,
    agent: &Agent,
    constraints: &Forbidden,
    reservations: &Forbidden,
    horizon: usize,
    stats: &mut Stats,
) -> SearchResult {
    let mut open = BinaryHeap::new();
    let mut closed: HashSet<(Cell, usize)> = HashSet::new();
    let mut parent: HashMap<(Cell, usize), (Cell, usize)> = HashMap::new();
    let mut g_cost: HashMap<(Cell, usize), usize> = HashMap::new();
    let mut seq = 0usize;

    let mut exploration_trace = vec![(agent.start, 0)];
    g_cost.insert((agent.start, 0), 0);
    open.push(LowLevelNode {
        cell: agent.start,
        t: 0,
        g: 0,
        f: manhattan(agent.start, agent.goal),
        seq,
    });

    while let Some(current) = open.pop() {
        let key = (current.cell, current.t);
        if closed.contains(&key) {
            // Stale entry from a rediscovered-with-better-g push; the
            // fresher entry already expanded this state.
            continue;
        }
        closed.insert(key);
        stats.low_level_expand_nodes += 1;

        if current.cell == agent.goal {
            let path = reconstruct(&parent, key);
            debug!(agent = agent.id, cost = path.cost(), "space-time A* success");
            return SearchResult {
                path: Some(path),
                exploration_trace,
            };
        }

        if current.t >= horizon {
            continue;
        }

        let next_t = current.t + 1;
        for next_cell in grid.neighbors(current.cell).chain(std::iter::once(current.cell)) {
            let next_key = (next_cell, next_t);
            if closed.contains(&next_key)
                || constraints.contains(&next_key)
                || reservations.contains(&next_key)
            {
                continue;
            }

            let tentative_g = current.g + 1;
            if tentative_g < *g_cost.get(&next_key).unwrap_or(&usize::MAX) {
                g_cost.insert(next_key, tentative_g);
                parent.insert(next_key, key);
                seq += 1;
                trace!(?next_key, f = tentative_g, "space-time A* push");
                open.push(LowLevelNode {
                    cell: next_cell,
                    t: next_t,
                    g: tentative_g,
                    f: tentative_g + manhattan(next_cell, agent.goal),
                    seq,
                });
                exploration_trace.push((next_cell, next_t));
            }
        }
    }

    debug!(agent = agent.id, "space-time A* exhausted: no path");
    SearchResult {
        path: None,
        exploration_trace,
    }
}

fn reconstruct(parent: &HashMap<(Cell, usize), (Cell, usize)>, mut current: (Cell, usize)) -> Path {
    let mut steps = vec![current.0];
    while let Some(&prev) = parent.get(&current) {
        steps.push(prev.0);
        current = prev;
    }
    steps.reverse();
    Path::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(start: Cell, goal: Cell) -> Agent {
        Agent::new(0, start, goal)
    }

    #[test]
    fn empty_grid_matches_manhattan_distance() {
        let grid = Grid::empty(5);
        let a = agent((0, 0), (3, 4));
        let mut stats = Stats::default();
        let result = search(&grid, &a, &Forbidden::new(), &Forbidden::new(), 50, &mut stats);
        let path = result.path.unwrap();
        assert_eq!(path.cost(), manhattan((0, 0), (3, 4)));
    }

    #[test]
    fn agent_already_at_goal_returns_singleton_path() {
        let grid = Grid::empty(5);
        let a = agent((1, 1), (1, 1));
        let mut stats = Stats::default();
        let result = search(&grid, &a, &Forbidden::new(), &Forbidden::new(), 50, &mut stats);
        let path = result.path.unwrap();
        assert_eq!(path.steps(), &[(1, 1)]);
        assert_eq!(path.cost(), 0);
    }

    #[test]
    fn walled_detour_forces_longer_path() {
        // 5x5, blocks at (0,1),(0,2),(0,3); start (0,0), goal (0,4).
        let mut blocked = vec![vec![false; 5]; 5];
        blocked[0][1] = true;
        blocked[0][2] = true;
        blocked[0][3] = true;
        let grid = Grid::new(blocked);
        let a = agent((0, 0), (0, 4));
        let mut stats = Stats::default();
        let result = search(&grid, &a, &Forbidden::new(), &Forbidden::new(), 50, &mut stats);
        let path = result.path.unwrap();
        assert!(path.cost() > 4);
        assert_eq!(path.cost(), 8);
    }

    #[test]
    fn goal_enclosed_by_obstacles_fails() {
        let mut blocked = vec![vec![false; 5]; 5];
        for &(r, c) in &[(1, 2), (2, 1), (2, 3), (3, 2)] {
            blocked[r][c] = true;
        }
        let grid = Grid::new(blocked);
        let a = agent((0, 0), (2, 2));
        let mut stats = Stats::default();
        let result = search(&grid, &a, &Forbidden::new(), &Forbidden::new(), 50, &mut stats);
        assert!(result.path.is_none());
    }

    #[test]
    fn constraint_forces_a_detour() {
        let grid = Grid::empty(5);
        let a = agent((0, 0), (0, 2));
        let mut constraints = Forbidden::new();
        constraints.insert(((0, 1), 1));
        let mut stats = Stats::default();
        let result = search(&grid, &a, &constraints, &Forbidden::new(), 50, &mut stats);
        let path = result.path.unwrap();
        assert!(!path.iter_states().any(|s| s.cell == (0, 1) && s.t == 1));
    }

    #[test]
    fn horizon_too_small_fails_even_though_path_exists() {
        let grid = Grid::empty(5);
        let a = agent((0, 0), (0, 4));
        let mut stats = Stats::default();
        let result = search(&grid, &a, &Forbidden::new(), &Forbidden::new(), 2, &mut stats);
        assert!(result.path.is_none());
    }

    #[test]
    fn exploration_trace_is_discovery_ordered() {
        let grid = Grid::empty(3);
        let a = agent((0, 0), (2, 2));
        let mut stats = Stats::default();
        let result = search(&grid, &a, &Forbidden::new(), &Forbidden::new(), 20, &mut stats);
        assert_eq!(result.exploration_trace[0], ((0, 0), 0));
    }
}
