//! The uniform result shape every planner returns.

use serde::{Deserialize, Serialize};

use crate::conflict::Conflict;
use crate::grid::Cell;
use crate::state::Path;

/// Planner-specific counters and diagnostics. Consumers must treat a
/// missing/`None` field as "not applicable to this planner" rather than
/// as an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub success: bool,
    pub time_taken_ms: u128,
    pub sum_of_costs: usize,
    pub makespan: usize,
    pub num_conflicts: usize,
    pub explored_size: usize,

    /// Set by `cbs`: number of high-level expansions performed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cbs_iterations: Option<usize>,
    /// Set by `cooperative`: which priority policy produced this result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_policy: Option<String>,
    /// Set by `mip`: `true` once the backend reports an optimal solution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal: Option<bool>,
    /// Set by `mip` on failure: the backend's non-optimal/unavailable
    /// status string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_status: Option<String>,
}

/// The uniform record returned by every planner: `independent`,
/// `cooperative`, `cbs`, and `mip` all produce this same shape, with
/// planner-specific keys folded into `metrics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// `None` unless every agent has a valid path — no partial successes.
    pub paths: Option<Vec<Path>>,
    /// One discovery-ordered `(cell, t)` trace per agent, from the
    /// low-level A* calls this planner made (possibly empty for `mip`,
    /// which does not "explore" in the A* sense).
    pub exploration_trace: Vec<Vec<(Cell, usize)>>,
    pub metrics: Metrics,
    pub conflicts: Vec<Conflict>,
}

impl Envelope {
    /// A failure envelope: no paths, the given trace (possibly partial),
    /// and metrics carrying only `success = false` plus whatever the
    /// caller has already measured (elapsed time, explored size).
    pub fn failure(exploration_trace: Vec<Vec<(Cell, usize)>>, metrics: Metrics) -> Self {
        Envelope {
            paths: None,
            exploration_trace,
            metrics,
            conflicts: Vec::new(),
        }
    }
}
