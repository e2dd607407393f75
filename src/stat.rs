//! Per-run expansion counters and an optional CSV run-summary line.

use std::fs::OpenOptions;
use std::io::Write;

use tracing::error;

use crate::config::Config;

/// Low/high-level node-expansion counters accumulated over one planning
/// call. Planners thread a single `Stats` through their low-level A*
/// calls so the envelope's `explored_size` reflects total search effort.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub low_level_expand_nodes: usize,
    pub high_level_expand_nodes: usize,
}

impl Stats {
    /// Appends one CSV line describing this run to `config.output_path`,
    /// if set. Failures are logged, not propagated: a missing stats file
    /// must never fail an otherwise-successful planning run.
    pub fn append_csv(&self, config: &Config, algorithm: &str, cost: usize, time_ms: usize) {
        let Some(path) = &config.output_path else {
            return;
        };

        let mut file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to open stats file '{}': {}", path, e);
                return;
            }
        };

        let line = format!(
            "{},{},{},{},{},{},{}\n",
            config.map_path,
            config.scen_path.as_deref().unwrap_or(config.yaml_path.as_deref().unwrap_or("")),
            config.num_agents,
            algorithm,
            cost,
            time_ms,
            self.high_level_expand_nodes + self.low_level_expand_nodes,
        );

        if let Err(e) = file.write_all(line.as_bytes()) {
            error!("Failed to write to stats file '{}': {}", path, e);
        }
    }
}
