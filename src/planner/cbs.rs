//! Conflict-Based Search: best-first search in constraint space. Each
//! high-level node owns a constraint set and a bundle of low-level
//! paths; each expansion picks the first unresolved conflict and
//! branches on its two symmetric constraint extensions, replanning
//! exactly one agent per child.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Instant;

use tracing::debug;

use crate::agent::Agent;
use crate::astar::{self, Forbidden};
use crate::conflict::{detect_conflicts, Conflict};
use crate::envelope::{Envelope, Metrics};
use crate::grid::{Cell, Grid};
use crate::state::Path;
use crate::stat::Stats;

use super::Solver;

/// A single CBS constraint, snapshotted as a persistent singly-linked
/// list rather than a deep-cloned set: nodes are popped out of order and
/// any ancestor may be revisited via the open list, so structural
/// sharing avoids re-copying the whole constraint history per child.
struct ConstraintNode {
    agent: usize,
    cell: Cell,
    t: usize,
    parent: Option<Rc<ConstraintNode>>,
}

/// Walks the constraint chain and collects every `(cell, t)` forbidden
/// to `agent`. Constraints are additive and monotone along a branch, so
/// this is the full constraint set in force at this node.
fn constraints_for_agent(tail: &Option<Rc<ConstraintNode>>, agent: usize) -> Forbidden {
    let mut out = Forbidden::new();
    let mut cur = tail.clone();
    while let Some(node) = cur {
        if node.agent == agent {
            out.insert((node.cell, node.t));
        }
        cur = node.parent.clone();
    }
    out
}

struct CbsNode {
    constraints: Option<Rc<ConstraintNode>>,
    paths: Rc<Vec<Path>>,
    cost: usize,
    conflicts: Vec<Conflict>,
    seq: usize,
}

impl PartialEq for CbsNode {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}
impl Eq for CbsNode {}

impl PartialOrd for CbsNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Keyed by `(cost, insertion order)`: cheapest sum-of-costs first, the
/// insertion counter as the sole tiebreak so ordering is total.
impl Ord for CbsNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost.cmp(&other.cost).then_with(|| self.seq.cmp(&other.seq))
    }
}

pub struct Cbs {
    pub agents: Vec<Agent>,
    pub grid: Grid,
    pub horizon: usize,
    pub max_iterations: usize,
}

/// The two `(agent, cell, t)` constraint extensions branched on for one
/// conflict, per `spec.md` §4.5.
fn branch_targets(conflict: &Conflict) -> [(usize, Cell, usize); 2] {
    match *conflict {
        Conflict::Vertex { agents: (i, j), t, cell } => [(i, cell, t), (j, cell, t)],
        Conflict::Edge { agents: (i, j), t, edge: (u, v) } => [(i, v, t), (j, u, t)],
    }
}

impl Solver for Cbs {
    fn solve(self) -> Envelope {
        let start = Instant::now();
        let mut stats = Stats::default();
        let mut traces = vec![Vec::new(); self.agents.len()];

        let mut root_paths = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let result = astar::search(&self.grid, agent, &Forbidden::new(), &Forbidden::new(), self.horizon, &mut stats);
            traces[agent.id] = result.exploration_trace;
            match result.path {
                Some(path) => root_paths.push(path),
                None => {
                    return Envelope::failure(
                        traces,
                        Metrics {
                            success: false,
                            time_taken_ms: start.elapsed().as_millis(),
                            explored_size: stats.low_level_expand_nodes,
                            cbs_iterations: Some(0),
                            ..Default::default()
                        },
                    );
                }
            }
        }

        let mut seq = 0usize;
        let root_conflicts = detect_conflicts(&root_paths);
        let root_cost = root_paths.iter().map(|p| p.cost()).sum();
        let mut open = BTreeSet::new();
        open.insert(CbsNode {
            constraints: None,
            paths: Rc::new(root_paths),
            cost: root_cost,
            conflicts: root_conflicts,
            seq,
        });

        let mut iterations = 0usize;
        while let Some(node) = open.pop_first() {
            iterations += 1;
            stats.high_level_expand_nodes += 1;

            if node.conflicts.is_empty() {
                let paths = Rc::try_unwrap(node.paths).unwrap_or_else(|rc| (*rc).clone());
                let sum_of_costs = paths.iter().map(|p| p.cost()).sum();
                let makespan = paths.iter().map(|p| p.cost()).max().unwrap_or(0);
                debug!(iterations, sum_of_costs, "cbs found a collision-free solution");
                return Envelope {
                    paths: Some(paths),
                    exploration_trace: traces,
                    metrics: Metrics {
                        success: true,
                        time_taken_ms: start.elapsed().as_millis(),
                        sum_of_costs,
                        makespan,
                        num_conflicts: 0,
                        explored_size: stats.low_level_expand_nodes,
                        cbs_iterations: Some(iterations),
                        ..Default::default()
                    },
                    conflicts: Vec::new(),
                };
            }

            if iterations >= self.max_iterations {
                break;
            }

            let conflict = node.conflicts[0];
            debug!(?conflict, cost = node.cost, "cbs branching on first conflict");

            for (agent_id, cell, t) in branch_targets(&conflict) {
                let child_constraints = Rc::new(ConstraintNode {
                    agent: agent_id,
                    cell,
                    t,
                    parent: node.constraints.clone(),
                });
                let forbidden = constraints_for_agent(&Some(child_constraints.clone()), agent_id);
                let agent = &self.agents[agent_id];

                let result = astar::search(&self.grid, agent, &forbidden, &Forbidden::new(), self.horizon, &mut stats);
                traces[agent_id] = result.exploration_trace;

                let Some(new_path) = result.path else {
                    continue;
                };

                let mut new_paths = (*node.paths).clone();
                new_paths[agent_id] = new_path;
                let new_cost = new_paths.iter().map(|p| p.cost()).sum();
                let new_conflicts = detect_conflicts(&new_paths);

                seq += 1;
                open.insert(CbsNode {
                    constraints: Some(child_constraints),
                    paths: Rc::new(new_paths),
                    cost: new_cost,
                    conflicts: new_conflicts,
                    seq,
                });
            }
        }

        Envelope::failure(
            traces,
            Metrics {
                success: false,
                time_taken_ms: start.elapsed().as_millis(),
                explored_size: stats.low_level_expand_nodes,
                cbs_iterations: Some(iterations),
                ..Default::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_agents_are_conflict_free_and_optimal() {
        let grid = Grid::empty(5);
        let agents = vec![Agent::new(0, (0, 0), (2, 2)), Agent::new(1, (0, 2), (2, 0))];
        let env = Cbs { agents, grid, horizon: 50, max_iterations: 1000 }.solve();
        assert!(env.metrics.success);
        assert_eq!(env.metrics.num_conflicts, 0);
        assert_eq!(env.metrics.sum_of_costs, 8);
    }

    #[test]
    fn head_on_corridor_swap_is_resolved_with_a_detour() {
        // A 1x3 corridor with a single pocket under its middle cell, so
        // one agent can duck aside while the other passes.
        let grid = Grid::new(vec![
            vec![false, false, false],
            vec![true, false, true],
        ]);
        let agents = vec![Agent::new(0, (0, 0), (0, 2)), Agent::new(1, (0, 2), (0, 0))];
        let env = Cbs { agents, grid, horizon: 20, max_iterations: 1000 }.solve();
        assert!(env.metrics.success);
        assert_eq!(env.metrics.num_conflicts, 0);
    }

    #[test]
    fn optimal_two_agent_swap_on_3x3_matches_independent_when_no_conflict() {
        let grid = Grid::empty(3);
        let agents = vec![Agent::new(0, (0, 0), (0, 2)), Agent::new(1, (2, 0), (2, 2))];
        let env = Cbs { agents, grid, horizon: 20, max_iterations: 1000 }.solve();
        assert!(env.metrics.success);
        assert_eq!(env.metrics.sum_of_costs, 4);
    }

    #[test]
    fn agent_already_at_goal_has_zero_cost() {
        let grid = Grid::empty(3);
        let agents = vec![Agent::new(0, (1, 1), (1, 1))];
        let env = Cbs { agents, grid, horizon: 10, max_iterations: 1000 }.solve();
        assert!(env.metrics.success);
        assert_eq!(env.metrics.sum_of_costs, 0);
    }

    #[test]
    fn unreachable_goal_fails_without_exhausting_iterations() {
        let mut blocked = vec![vec![false; 5]; 5];
        for &(r, c) in &[(1, 2), (2, 1), (2, 3), (3, 2)] {
            blocked[r][c] = true;
        }
        let grid = Grid::new(blocked);
        let agents = vec![Agent::new(0, (0, 0), (2, 2))];
        let env = Cbs { agents, grid, horizon: 50, max_iterations: 1000 }.solve();
        assert!(!env.metrics.success);
        assert!(env.paths.is_none());
    }
}
