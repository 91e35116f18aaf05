use super::StrategyKind;
use crate::core::config::{RunConfig, SearchConfig};
use crate::core::error::SimError;
use crate::core::runner;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

impl From<SimError> for PyErr {
    fn from(err: SimError) -> PyErr {
        match err {
            SimError::PlacementExhausted { .. } => PyRuntimeError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Run one episode and return its record as a JSON string.
///
/// `config_json` is a `SearchConfig` document; missing fields take their defaults.
#[pyfunction]
#[pyo3(signature = (strategy, config_json="{}", max_steps=1000, step_size=2.0))]
pub fn run_episode(
    py: Python<'_>,
    strategy: &str,
    config_json: &str,
    max_steps: usize,
    step_size: f64,
) -> PyResult<String> {
    let kind: StrategyKind = strategy.parse()?;
    let config = SearchConfig::from_json(config_json)?;
    let run = RunConfig {
        max_steps,
        step_size,
        ..RunConfig::default()
    };
    let record = py.allow_threads(|| runner::run_episode(kind, &config, run))?;
    Ok(record.to_json_line()?)
}

/// Names accepted by `run_episode`.
#[pyfunction]
pub fn strategy_names() -> Vec<&'static str> {
    StrategyKind::ALL.iter().map(|k| k.name()).collect()
}
