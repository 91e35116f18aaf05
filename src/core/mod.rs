//! Core episode machinery: agents, configuration, errors and the step loop.

pub mod agent;
pub mod config;
pub mod error;
pub mod runner;

pub use agent::{Agent, PersonalBest};
pub use config::{ObstacleSpec, RunConfig, SearchConfig, TargetSpec};
pub use error::{SimError, SimResult};
pub use runner::{EpisodeOutcome, EpisodeRecord, EpisodeRunner};
