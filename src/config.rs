use anyhow::anyhow;
use clap::Parser;

use crate::planner::PriorityPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "mapf-cli",
    about = "Cooperative and optimal multi-agent path finding over 4-connected grids",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a MovingAI .map file")]
    pub map_path: String,

    #[arg(long, help = "Path to a MovingAI .scen file (mutually exclusive with --yaml-path)")]
    pub scen_path: Option<String>,

    #[arg(long, help = "Path to a YAML agent list (mutually exclusive with --scen-path)")]
    pub yaml_path: Option<String>,

    #[arg(long, help = "Number of agents to draw from the scenario", default_value_t = 10)]
    pub num_agents: usize,

    #[arg(
        long,
        help = "Deterministic bucket indices to draw agents from (.scen only)",
        use_value_delimiter = true
    )]
    pub agent_buckets: Vec<usize>,

    #[arg(
        long,
        help = "Draw agents deterministically bucket-by-bucket instead of uniformly at random",
        default_value_t = false
    )]
    pub deterministic_scen: bool,

    #[arg(long, help = "Seed for the scenario RNG and the random priority policy", default_value_t = 0)]
    pub seed: u64,

    #[arg(
        long,
        help = "Algorithm: independent, cooperative, cbs, or mip",
        default_value = "cbs"
    )]
    pub algorithm: String,

    #[arg(
        long,
        help = "Priority policy for cooperative: distance_first, id_order, or random",
        default_value = "distance_first"
    )]
    pub priority_policy: String,

    #[arg(long, help = "Time horizon T_max for every low-level search", default_value_t = 512)]
    pub t_max: usize,

    #[arg(long, help = "Maximum CBS high-level expansions before giving up", default_value_t = 50_000)]
    pub max_iterations: usize,

    #[arg(long, help = "Path to write the result envelope as JSON")]
    pub solution_path: Option<String>,

    #[arg(long, help = "Path to append a CSV run-summary line")]
    pub output_path: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Algorithm {
    Independent,
    Cooperative,
    Cbs,
    Mip,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub map_path: String,
    pub scen_path: Option<String>,
    pub yaml_path: Option<String>,
    pub num_agents: usize,
    pub agent_buckets: Vec<usize>,
    pub deterministic_scen: bool,
    pub seed: u64,
    pub algorithm: Algorithm,
    pub priority_policy: PriorityPolicy,
    pub t_max: usize,
    pub max_iterations: usize,
    pub solution_path: Option<String>,
    pub output_path: Option<String>,
}

impl Config {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let algorithm = match cli.algorithm.as_str() {
            "independent" => Algorithm::Independent,
            "cooperative" => Algorithm::Cooperative,
            "cbs" => Algorithm::Cbs,
            "mip" => Algorithm::Mip,
            other => return Err(anyhow!("unknown algorithm '{other}'; expected one of independent, cooperative, cbs, mip")),
        };

        let priority_policy = match cli.priority_policy.as_str() {
            "distance_first" => PriorityPolicy::DistanceFirst,
            "id_order" => PriorityPolicy::IdOrder,
            "random" => PriorityPolicy::Random { seed: cli.seed },
            other => return Err(anyhow!("unknown priority policy '{other}'; expected one of distance_first, id_order, random")),
        };

        Ok(Config {
            map_path: cli.map_path.clone(),
            scen_path: cli.scen_path.clone(),
            yaml_path: cli.yaml_path.clone(),
            num_agents: cli.num_agents,
            agent_buckets: cli.agent_buckets.clone(),
            deterministic_scen: cli.deterministic_scen,
            seed: cli.seed,
            algorithm,
            priority_policy,
            t_max: cli.t_max,
            max_iterations: cli.max_iterations,
            solution_path: cli.solution_path.clone(),
            output_path: cli.output_path.clone(),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scen_path.is_some() && self.yaml_path.is_some() {
            return Err(anyhow!("--scen-path and --yaml-path are mutually exclusive"));
        }
        if self.scen_path.is_none() && self.yaml_path.is_none() {
            return Err(anyhow!("one of --scen-path or --yaml-path is required"));
        }
        if self.deterministic_scen && self.agent_buckets.len() != self.num_agents {
            return Err(anyhow!(
                "--deterministic-scen requires --agent-buckets to list exactly --num-agents indices, got {} for {}",
                self.agent_buckets.len(),
                self.num_agents,
            ));
        }
        if self.t_max == 0 {
            return Err(anyhow!("--t-max must be at least 1"));
        }

        // Mirror the teacher's per-solver flag validation: priority_policy
        // only means anything to the cooperative planner, so only the
        // default value is accepted for the other three algorithms.
        match self.algorithm {
            Algorithm::Cooperative => {}
            _ if matches!(self.priority_policy, PriorityPolicy::DistanceFirst) => {}
            _ => {
                return Err(anyhow!(
                    "--priority-policy '{}' only applies to --algorithm cooperative, got algorithm '{:?}'",
                    self.priority_policy,
                    self.algorithm,
                ));
            }
        }

        Ok(())
    }
}
