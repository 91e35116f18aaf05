//! Search Strategies
//!
//! Every strategy drives the whole agent roster one step at a time against a
//! shared [`Environment`]. Agents are updated in index order, so agent `i`
//! sees agents `0..i` at their new positions and the rest where they were.

pub mod dpso;
pub mod e2rpso;
pub mod exhaustive;
pub mod fitness;
pub mod motion;
pub mod random_walk;
pub mod rdpso;

#[cfg(feature = "python")]
pub mod py_api;


use crate::core::config::RunConfig;
use crate::core::error::SimError;
use crate::worldmodel::{DetectionRule, Environment, Target};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use dpso::{Dpso, DpsoParams};
pub use e2rpso::{E2rpso, E2rpsoParams};
pub use exhaustive::{Exhaustive, ExhaustiveParams};
pub use fitness::{BestTracker, FitnessKind, GlobalBest};
pub use random_walk::RandomWalk;
pub use rdpso::{Rdpso, RdpsoParams};

/// Extra reach granted by the coverage-style strategies' detection rule
pub const COVERAGE_DETECTION_PADDING: f64 = 3.0;

/// A search strategy: per-step motion for every agent, plus its own state.
pub trait SearchStrategy: Send {
    fn name(&self) -> &'static str;

    /// Rule the episode uses to decide when an agent has found a target
    fn detection_rule(&self) -> DetectionRule;

    /// Called once before the first step.
    fn initialize(&mut self, env: &mut Environment, run: &RunConfig, rng: &mut StdRng);

    /// Moves every agent once. `step` counts from zero.
    fn step(&mut self, env: &mut Environment, step: usize, rng: &mut StdRng);

    /// Called after `removed` has left the active target set.
    fn on_target_removed(&mut self, _env: &mut Environment, _removed: &Target) {}
}

/// Registry of the available strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "E2RPSO")]
    E2rpso,
    #[serde(rename = "RDPSO")]
    Rdpso,
    #[serde(rename = "dPSO")]
    Dpso,
    #[serde(rename = "Exhaustive", alias = "Stochastic_search")]
    Exhaustive,
    #[serde(rename = "Random", alias = "Random_search")]
    RandomWalk,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::E2rpso,
        StrategyKind::Rdpso,
        StrategyKind::Dpso,
        StrategyKind::Exhaustive,
        StrategyKind::RandomWalk,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::E2rpso => "E2RPSO",
            StrategyKind::Rdpso => "RDPSO",
            StrategyKind::Dpso => "dPSO",
            StrategyKind::Exhaustive => "Exhaustive",
            StrategyKind::RandomWalk => "Random",
        }
    }

    /// A fresh strategy with default parameters.
    pub fn build(&self) -> Box<dyn SearchStrategy> {
        match self {
            StrategyKind::E2rpso => Box::new(E2rpso::default()),
            StrategyKind::Rdpso => Box::new(Rdpso::default()),
            StrategyKind::Dpso => Box::new(Dpso::default()),
            StrategyKind::Exhaustive => Box::new(Exhaustive::default()),
            StrategyKind::RandomWalk => Box::new(RandomWalk::default()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "e2rpso" => Ok(StrategyKind::E2rpso),
            "rdpso" => Ok(StrategyKind::Rdpso),
            "dpso" => Ok(StrategyKind::Dpso),
            "exhaustive" | "stochastic_search" => Ok(StrategyKind::Exhaustive),
            "random" | "random_search" | "random_walk" => Ok(StrategyKind::RandomWalk),
            _ => Err(SimError::UnknownStrategy(s.to_string())),
        }
    }
}
