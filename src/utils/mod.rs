//! Experiment helpers built on top of the episode runner.

pub mod benchmark;

pub use benchmark::{to_jsonl, ExperimentBatch, ExperimentJob, SweepGrid};
