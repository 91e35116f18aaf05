use super::motion::attempt_heading;
use super::{SearchStrategy, COVERAGE_DETECTION_PADDING};
use crate::core::config::RunConfig;
use crate::worldmodel::{DetectionRule, Environment};
use rand::rngs::StdRng;
use rand::Rng;
use std::f64::consts::TAU;

/// Uniform random heading, one fixed-length attempt per agent per step.
///
/// A blocked move is simply skipped for that step.
#[derive(Clone, Debug)]
pub struct RandomWalk {
    step_size: f64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        RandomWalk {
            step_size: RunConfig::default().step_size,
        }
    }
}

impl SearchStrategy for RandomWalk {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn detection_rule(&self) -> DetectionRule {
        DetectionRule::Padded {
            padding: COVERAGE_DETECTION_PADDING,
        }
    }

    fn initialize(&mut self, _env: &mut Environment, run: &RunConfig, _rng: &mut StdRng) {
        self.step_size = run.step_size;
    }

    fn step(&mut self, env: &mut Environment, _step: usize, rng: &mut StdRng) {
        for idx in 0..env.agents().len() {
            let heading = rng.gen_range(0.0..TAU);
            attempt_heading(env, idx, heading, self.step_size);
        }
    }
}
