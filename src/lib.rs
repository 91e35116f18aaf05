//! Swarm Search Core v0.3.0 - Multi-Agent Target Search Simulator
//!
//! A square arena with rectangular obstacles, a safe zone and hidden targets
//! is searched by a small team of agents. Five strategies share one step loop:
//! three particle-swarm variants (E2RPSO, RDPSO, dPSO), an exhaustive
//! zig-zag coverage sweep and a random walk.
//!
//! ```no_run
//! use swarm_search_core::{run_episode, RunConfig, SearchConfig, StrategyKind};
//!
//! let config = SearchConfig::default().with_seed(7);
//! let record = run_episode(StrategyKind::E2rpso, &config, RunConfig::default())?;
//! println!("{}", record.to_json_line()?);
//! # Ok::<(), swarm_search_core::SimError>(())
//! ```

pub mod core;
pub mod swarm;
pub mod utils;
pub mod worldmodel;

#[cfg(feature = "python")]
use pyo3::prelude::*;

// Re-export key types
pub use crate::core::agent::{Agent, PersonalBest};
pub use crate::core::config::{ObstacleSpec, RunConfig, SearchConfig, TargetSpec};
pub use crate::core::error::{SimError, SimResult};
pub use crate::core::runner::{run_episode, EpisodeOutcome, EpisodeRecord, EpisodeRunner};
pub use crate::swarm::{SearchStrategy, StrategyKind};
pub use crate::utils::benchmark::{ExperimentBatch, SweepGrid};
pub use crate::worldmodel::{
    DetectionRule, Environment, GridSnapshot, Obstacle, SnapshotObserver, SnapshotRecorder,
    Target,
};

/// Initialize tracing for the library.
#[cfg_attr(feature = "python", pyfunction)]
#[cfg_attr(feature = "python", pyo3(signature = (level=None)))]
pub fn setup_logging(level: Option<String>) {
    let filter = level.unwrap_or_else(|| "info".to_string());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Python module initialization
#[cfg(feature = "python")]
#[pymodule]
fn swarm_search_core(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(setup_logging, m)?)?;
    m.add_function(wrap_pyfunction!(swarm::py_api::run_episode, m)?)?;
    m.add_function(wrap_pyfunction!(swarm::py_api::strategy_names, m)?)?;
    Ok(())
}
