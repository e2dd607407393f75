//! Conflict detection: a pure function over a bundle of paths producing
//! an ordered list of vertex and edge conflicts.

use serde::{Deserialize, Serialize};

use crate::grid::Cell;
use crate::state::Path;

/// Two agents at the same cell at the same time, or swapping adjacent
/// cells across one time step. The detector reports no other conflict
/// classes; following/trailing is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Conflict {
    Vertex {
        agents: (usize, usize),
        t: usize,
        cell: Cell,
    },
    Edge {
        agents: (usize, usize),
        t: usize,
        edge: (Cell, Cell),
    },
}

impl Conflict {
    pub fn agents(&self) -> (usize, usize) {
        match *self {
            Conflict::Vertex { agents, .. } => agents,
            Conflict::Edge { agents, .. } => agents,
        }
    }

    pub fn time(&self) -> usize {
        match *self {
            Conflict::Vertex { t, .. } => t,
            Conflict::Edge { t, .. } => t,
        }
    }
}

/// Detects every vertex and edge conflict across `paths`, indexed by
/// agent id `0..paths.len()`. Conflicts are emitted in increasing `t`,
/// with vertex conflicts at a given `t` before edge conflicts at that
/// `t` — the ordering CBS branches on.
///
/// Each path implicitly extends past its tail by holding its goal cell
/// (`Path::at`), so a finished agent can still be in conflict with an
/// agent still moving through its held goal.
pub fn detect_conflicts(paths: &[Path]) -> Vec<Conflict> {
    if paths.len() < 2 {
        return Vec::new();
    }

    let max_t = paths.iter().map(|p| p.len() - 1).max().unwrap_or(0);
    let mut conflicts = Vec::new();

    for t in 0..=max_t {
        let mut seen: std::collections::HashMap<Cell, usize> = std::collections::HashMap::new();
        for (i, path) in paths.iter().enumerate() {
            let cell = path.at(t);
            if let Some(&first) = seen.get(&cell) {
                conflicts.push(Conflict::Vertex {
                    agents: (first, i),
                    t,
                    cell,
                });
            } else {
                seen.insert(cell, i);
            }
        }

        if t == 0 {
            continue;
        }
        for i in 0..paths.len() {
            for j in (i + 1)..paths.len() {
                let (prev_i, cur_i) = (paths[i].at(t - 1), paths[i].at(t));
                let (prev_j, cur_j) = (paths[j].at(t - 1), paths[j].at(t));
                if prev_i == cur_j && prev_j == cur_i {
                    conflicts.push(Conflict::Edge {
                        agents: (i, j),
                        t,
                        edge: (prev_i, prev_j),
                    });
                }
            }
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_conflicts_for_disjoint_paths() {
        let a = Path::new(vec![(0, 0), (0, 1), (0, 2)]);
        let b = Path::new(vec![(2, 0), (2, 1), (2, 2)]);
        assert!(detect_conflicts(&[a, b]).is_empty());
    }

    #[test]
    fn vertex_conflict_detected_with_first_seen_ordering() {
        let a = Path::new(vec![(0, 0), (0, 1)]);
        let b = Path::new(vec![(0, 2), (0, 1)]);
        let conflicts = detect_conflicts(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        match conflicts[0] {
            Conflict::Vertex { agents, t, cell } => {
                assert_eq!(agents, (0, 1));
                assert_eq!(t, 1);
                assert_eq!(cell, (0, 1));
            }
            _ => panic!("expected vertex conflict"),
        }
    }

    #[test]
    fn edge_conflict_detected_on_swap() {
        let a = Path::new(vec![(0, 0), (0, 1)]);
        let b = Path::new(vec![(0, 1), (0, 0)]);
        let conflicts = detect_conflicts(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(conflicts[0], Conflict::Edge { agents: (0, 1), t: 1, .. }));
    }

    #[test]
    fn goal_holding_creates_vertex_conflict_after_path_end() {
        // Agent 0 finishes at (0,0) at t=1; agent 1 passes through (0,0) at t=3.
        let a = Path::new(vec![(0, 1), (0, 0)]);
        let b = Path::new(vec![(0, 2), (0, 1), (0, 0), (0, 0)]);
        let conflicts = detect_conflicts(&[a, b]);
        assert!(conflicts
            .iter()
            .any(|c| matches!(c, Conflict::Vertex { t: 2, cell: (0, 0), .. })));
    }

    #[test]
    fn vertex_conflicts_precede_edge_conflicts_at_same_time() {
        // Construct a case with both a vertex conflict at t and an edge
        // conflict at the same t, across three agents, and check ordering.
        let a = Path::new(vec![(0, 0), (0, 1)]);
        let b = Path::new(vec![(0, 1), (0, 0)]);
        let c = Path::new(vec![(1, 1), (0, 1)]);
        let conflicts = detect_conflicts(&[a, b, c]);
        let first_edge = conflicts.iter().position(|c| matches!(c, Conflict::Edge { .. }));
        let first_vertex = conflicts.iter().position(|c| matches!(c, Conflict::Vertex { .. }));
        if let (Some(v), Some(e)) = (first_vertex, first_edge) {
            assert!(v < e);
        }
    }
}
