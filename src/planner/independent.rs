//! The independent baseline: plan every agent alone, report whatever
//! conflicts result. This planner exists to demonstrate baseline
//! collisions; it must not silently "fix" them.

use std::time::Instant;

use tracing::info;

use crate::agent::Agent;
use crate::astar::{self, Forbidden};
use crate::conflict::detect_conflicts;
use crate::envelope::{Envelope, Metrics};
use crate::grid::Grid;
use crate::stat::Stats;

use super::Solver;

pub struct Independent {
    pub agents: Vec<Agent>,
    pub grid: Grid,
    pub horizon: usize,
}

impl Solver for Independent {
    fn solve(self) -> Envelope {
        let start = Instant::now();
        let mut stats = Stats::default();
        let mut paths = Vec::with_capacity(self.agents.len());
        let mut traces = Vec::with_capacity(self.agents.len());
        let empty = Forbidden::new();

        for agent in &self.agents {
            let result = astar::search(&self.grid, agent, &empty, &empty, self.horizon, &mut stats);
            traces.push(result.exploration_trace);
            match result.path {
                Some(path) => paths.push(path),
                None => {
                    return Envelope::failure(
                        traces,
                        Metrics {
                            success: false,
                            time_taken_ms: start.elapsed().as_millis(),
                            explored_size: stats.low_level_expand_nodes,
                            ..Default::default()
                        },
                    );
                }
            }
        }

        let conflicts = detect_conflicts(&paths);
        let sum_of_costs = paths.iter().map(|p| p.cost()).sum();
        let makespan = paths.iter().map(|p| p.cost()).max().unwrap_or(0);
        info!(
            agents = self.agents.len(),
            conflicts = conflicts.len(),
            "independent planning complete"
        );

        Envelope {
            paths: Some(paths),
            exploration_trace: traces,
            metrics: Metrics {
                success: true,
                time_taken_ms: start.elapsed().as_millis(),
                sum_of_costs,
                makespan,
                num_conflicts: conflicts.len(),
                explored_size: stats.low_level_expand_nodes,
                ..Default::default()
            },
            conflicts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_agents_succeed_and_may_conflict() {
        let grid = Grid::empty(5);
        let agents = vec![
            Agent::new(0, (0, 0), (2, 2)),
            Agent::new(1, (0, 2), (2, 0)),
        ];
        let env = Independent {
            agents,
            grid,
            horizon: 50,
        }
        .solve();
        assert!(env.metrics.success);
        assert_eq!(env.paths.unwrap().len(), 2);
    }

    #[test]
    fn enclosed_goal_fails() {
        let mut blocked = vec![vec![false; 5]; 5];
        for &(r, c) in &[(1, 2), (2, 1), (2, 3), (3, 2)] {
            blocked[r][c] = true;
        }
        let grid = Grid::new(blocked);
        let agents = vec![Agent::new(0, (0, 0), (2, 2))];
        let env = Independent {
            agents,
            grid,
            horizon: 50,
        }
        .solve();
        assert!(!env.metrics.success);
        assert!(env.paths.is_none());
    }

    #[test]
    fn head_on_corridor_swap_reports_conflict() {
        let grid = Grid::new(vec![vec![false, false, false]]);
        let agents = vec![
            Agent::new(0, (0, 0), (0, 2)),
            Agent::new(1, (0, 2), (0, 0)),
        ];
        let env = Independent {
            agents,
            grid,
            horizon: 10,
        }
        .solve();
        assert!(env.metrics.success);
        assert!(env.metrics.num_conflicts > 0);
    }
}
