//! Library surface consumed by an external request handler (`spec.md`
//! §6): four planning entry points, each a thin struct that owns its
//! inputs and produces one [`Envelope`] via [`Solver::solve`].

pub mod agent;
pub mod astar;
pub mod config;
pub mod conflict;
pub mod envelope;
pub mod grid;
pub mod planner;
pub mod scenario;
pub mod stat;
pub mod state;

pub use agent::Agent;
pub use conflict::Conflict;
pub use envelope::{Envelope, Metrics};
pub use grid::{Cell, Grid};
pub use planner::{Cbs, Cooperative, Independent, Mip, PriorityPolicy, Solver};
pub use state::{Path, SpaceTimeState};
