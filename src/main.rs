use std::time::Instant;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use mapf_core::config::{Algorithm, Cli, Config};
use mapf_core::envelope::Envelope;
use mapf_core::grid::Grid;
use mapf_core::planner::{Cbs, Cooperative, Independent, Mip, Solver};
use mapf_core::scenario::Scenario;
use mapf_core::stat::Stats;
use mapf_core::Agent;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::new(&cli)?;
    config.validate()?;

    let grid = Grid::from_moving_ai_file(&config.map_path)?;
    let agents = load_agents(&config)?;

    info!(
        algorithm = ?config.algorithm,
        num_agents = agents.len(),
        "starting planning run"
    );

    let run_start = Instant::now();
    let envelope = match config.algorithm {
        Algorithm::Independent => Independent { agents, grid, horizon: config.t_max }.solve(),
        Algorithm::Cooperative => Cooperative {
            agents,
            grid,
            horizon: config.t_max,
            policy: config.priority_policy,
        }
        .solve(),
        Algorithm::Cbs => Cbs {
            agents,
            grid,
            horizon: config.t_max,
            max_iterations: config.max_iterations,
        }
        .solve(),
        Algorithm::Mip => Mip { agents, grid, horizon: config.t_max }.solve(),
    };

    let stats = Stats {
        low_level_expand_nodes: envelope.metrics.explored_size,
        high_level_expand_nodes: envelope.metrics.cbs_iterations.unwrap_or(0),
    };
    stats.append_csv(
        &config,
        &cli.algorithm,
        envelope.metrics.sum_of_costs,
        run_start.elapsed().as_millis() as usize,
    );

    write_envelope(&config, &envelope)?;
    Ok(())
}

/// Loads agents either from a MovingAI `.scen` file (bucketed, optionally
/// deterministic) or from a plain YAML agent list, per `Config`.
fn load_agents(config: &Config) -> anyhow::Result<Vec<Agent>> {
    if let Some(yaml_path) = &config.yaml_path {
        return Ok(Scenario::load_agents_from_yaml(yaml_path)?);
    }

    let scen_path = config
        .scen_path
        .as_ref()
        .expect("Config::validate guarantees one of scen_path/yaml_path is set");
    let scenario = Scenario::load_from_scen(scen_path)?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let agents = if config.deterministic_scen {
        scenario
            .generate_agents_by_buckets(config.num_agents, config.agent_buckets.clone(), &mut rng)
            .map_err(|e| anyhow::anyhow!(e))?
    } else {
        scenario
            .generate_agents_randomly(config.num_agents, &mut rng)
            .map_err(|e| anyhow::anyhow!(e))?
    };
    Ok(agents)
}

/// Writes the result envelope as JSON, either to `config.solution_path`
/// or to stdout when none was given.
fn write_envelope(config: &Config, envelope: &Envelope) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(envelope)?;
    match &config.solution_path {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
