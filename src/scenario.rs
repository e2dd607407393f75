//! Scenario loading: MovingAI `.scen` bucketed start/goal routes and a
//! plain YAML agent list, either of which can seed a planning run.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use anyhow::Result;
use rand::prelude::*;
use serde::Deserialize;
use tracing::info;

use crate::agent::Agent;

/// One start/goal pair from a `.scen` file, grouped into a difficulty
/// bucket by the format's own bucket index.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Route {
    pub start_row: usize,
    pub start_col: usize,
    pub goal_row: usize,
    pub goal_col: usize,
}

type Bucket = Vec<Route>;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub map: String,
    pub map_width: usize,
    pub map_height: usize,
    pub buckets: HashMap<usize, Bucket>,
}

impl Scenario {
    /// Parses a MovingAI `.scen` file: a `version` header line followed
    /// by one route per line, tagged with a difficulty bucket index.
    pub fn load_from_scen(path: &str) -> io::Result<Scenario> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let _version = lines.next().ok_or_else(eof)??;

        let mut scenario = Scenario {
            map: String::new(),
            map_width: 0,
            map_height: 0,
            buckets: HashMap::new(),
        };

        for line in lines {
            let line = line?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            let bucket_index: usize = parts[0]
                .parse()
                .map_err(|_| bad_data("malformed bucket index"))?;

            let route = Route {
                start_row: parts[5].parse().map_err(|_| bad_data("malformed start row"))?,
                start_col: parts[4].parse().map_err(|_| bad_data("malformed start col"))?,
                goal_row: parts[7].parse().map_err(|_| bad_data("malformed goal row"))?,
                goal_col: parts[6].parse().map_err(|_| bad_data("malformed goal col"))?,
            };

            if scenario.map.is_empty() {
                scenario.map = parts[1].to_string();
                scenario.map_width = parts[2].parse().unwrap_or(0);
                scenario.map_height = parts[3].parse().unwrap_or(0);
            }

            scenario.buckets.entry(bucket_index).or_default().push(route);
        }

        Ok(scenario)
    }

    /// Picks one route per requested bucket, without reuse within a
    /// bucket, and turns each into an `Agent` indexed by its position in
    /// `agent_buckets`.
    pub fn generate_agents_by_buckets<R: Rng + ?Sized>(
        &self,
        num_agents: usize,
        agent_buckets: Vec<usize>,
        rng: &mut R,
    ) -> Result<Vec<Agent>, String> {
        if agent_buckets.len() != num_agents {
            return Err("number of agents does not match the length of agent_buckets".to_string());
        }

        let mut agents = Vec::with_capacity(num_agents);
        let mut used_routes: HashMap<usize, HashSet<usize>> = HashMap::new();

        for (agent_id, &bucket_index) in agent_buckets.iter().enumerate() {
            let bucket = self
                .buckets
                .get(&bucket_index)
                .ok_or_else(|| format!("bucket {bucket_index} not found"))?;

            let available_routes: Vec<usize> = (0..bucket.len())
                .filter(|idx| {
                    used_routes
                        .get(&bucket_index)
                        .is_none_or(|used| !used.contains(idx))
                })
                .collect();

            let route_index = available_routes
                .choose(rng)
                .ok_or_else(|| format!("no available routes left in bucket {bucket_index}"))?;

            let route = &bucket[*route_index];
            agents.push(Agent::new(
                agent_id,
                (route.start_row, route.start_col),
                (route.goal_row, route.goal_col),
            ));

            used_routes.entry(bucket_index).or_default().insert(*route_index);
        }

        info!(num_agents, "generated agents from scenario buckets");
        Ok(agents)
    }

    /// Picks `num_agents` routes uniformly at random across all buckets,
    /// without reuse.
    pub fn generate_agents_randomly<R: Rng + ?Sized>(
        &self,
        num_agents: usize,
        rng: &mut R,
    ) -> Result<Vec<Agent>, String> {
        let mut available_routes: Vec<Route> = self
            .buckets
            .values()
            .flat_map(|bucket| bucket.iter().cloned())
            .collect();
        available_routes.sort();
        available_routes.shuffle(rng);

        if available_routes.len() < num_agents {
            return Err("not enough unique routes available to match the number of agents".to_string());
        }

        let agents: Vec<Agent> = available_routes
            .into_iter()
            .take(num_agents)
            .enumerate()
            .map(|(agent_id, route)| {
                Agent::new(agent_id, (route.start_row, route.start_col), (route.goal_row, route.goal_col))
            })
            .collect();

        info!(num_agents, "generated agents randomly from scenario");
        Ok(agents)
    }

    pub fn load_agents_from_yaml(path: &str) -> Result<Vec<Agent>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let agents = serde_yaml::from_reader(reader)?;
        Ok(agents)
    }

    pub fn write_agents_to_yaml(path: &str, agents: &[Agent]) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = io::BufWriter::new(file);
        let yaml_data = serde_yaml::to_string(agents)?;
        writer.write_all(yaml_data.as_bytes())?;
        Ok(())
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "truncated scenario file")
}

fn bad_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}
