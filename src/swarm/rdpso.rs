//! Role-rotation PSO.
//!
//! Every few steps the worst third of the swarm by personal best is marked as
//! fugitives. A fugitive ignores the cognitive and social pulls and drifts on
//! randomly scaled inertia until the next rotation.

use super::fitness::{BestTracker, FitnessKind};
use super::motion::{limit_max_velocity, move_or_avoid, unit_towards};
use super::SearchStrategy;
use crate::core::config::RunConfig;
use crate::worldmodel::{DetectionRule, Environment, Target};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw PSO velocities are scaled by this before clamping
pub(crate) const VELOCITY_GAIN: f64 = 100.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RdpsoParams {
    pub c1: f64,
    pub c2: f64,
    pub w_upper: f64,
    pub w_lower: f64,
    /// Steps between fugitive re-ranking
    pub rotate_every: usize,
    /// One agent in this many becomes a fugitive, rounded down
    pub fugitive_divisor: usize,
}

impl Default for RdpsoParams {
    fn default() -> Self {
        RdpsoParams {
            c1: 0.4,
            c2: 0.9,
            w_upper: 0.9,
            w_lower: 0.4,
            rotate_every: 20,
            fugitive_divisor: 3,
        }
    }
}

/// Inertia weight annealed linearly from `upper` at step 0 towards `lower`.
pub(crate) fn annealed_inertia(upper: f64, lower: f64, step: usize, max_steps: usize) -> f64 {
    if max_steps == 0 {
        return upper;
    }
    upper - (step as f64 / max_steps as f64) * (upper - lower)
}

/// Velocities drawn as at the start of an RDPSO or dPSO run.
pub(crate) fn seed_velocities(env: &mut Environment, step_size: f64, rng: &mut StdRng) {
    for agent in env.agents_mut() {
        let vx = rng.gen_range(0.0..=step_size);
        let vy = rng.gen_range(-step_size..=step_size);
        agent.set_velocity(vx, vy);
    }
}

pub struct Rdpso {
    params: RdpsoParams,
    tracker: BestTracker,
    fugitives: Vec<bool>,
    v_limit: f64,
    max_steps: usize,
}

impl Rdpso {
    pub fn new(params: RdpsoParams) -> Self {
        let run = RunConfig::default();
        Rdpso {
            params,
            tracker: BestTracker::new(FitnessKind::QuarticRoot),
            fugitives: Vec::new(),
            v_limit: run.step_size,
            max_steps: run.max_steps,
        }
    }

    pub fn tracker(&self) -> &BestTracker {
        &self.tracker
    }

    pub fn fugitives(&self) -> &[bool] {
        &self.fugitives
    }

    /// Marks the agents with the largest personal-best fitness as fugitives.
    fn rotate_roles(&mut self, env: &Environment) {
        let n = env.agents().len();
        let count = n / self.params.fugitive_divisor.max(1);

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            env.agent(b)
                .best
                .fitness
                .total_cmp(&env.agent(a).best.fitness)
        });

        self.fugitives = vec![false; n];
        for &idx in order.iter().take(count) {
            self.fugitives[idx] = true;
        }
        debug!("[RDPSO] fugitives now {:?}", &order[..count]);
    }
}

impl Default for Rdpso {
    fn default() -> Self {
        Self::new(RdpsoParams::default())
    }
}

impl SearchStrategy for Rdpso {
    fn name(&self) -> &'static str {
        "RDPSO"
    }

    fn detection_rule(&self) -> DetectionRule {
        DetectionRule::RadiusSum
    }

    fn initialize(&mut self, env: &mut Environment, run: &RunConfig, rng: &mut StdRng) {
        self.v_limit = run.step_size;
        self.max_steps = run.max_steps;
        self.fugitives = vec![false; env.agents().len()];
        seed_velocities(env, run.step_size, rng);
        self.tracker.seed(env);
    }

    fn step(&mut self, env: &mut Environment, step: usize, rng: &mut StdRng) {
        let p = &self.params;
        let w = annealed_inertia(p.w_upper, p.w_lower, step, self.max_steps);

        if step > 0 && p.rotate_every > 0 && step % p.rotate_every == 0 {
            self.rotate_roles(env);
        }

        let (c1, c2) = (self.params.c1, self.params.c2);
        for idx in 0..env.agents().len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();

            let agent = env.agent(idx);
            let here = agent.position();
            let (xp, yp) = unit_towards(here, agent.best.position);
            let (xg, yg) = unit_towards(here, self.tracker.global.position);

            let (vx, vy) = if self.fugitives.get(idx).copied().unwrap_or(false) {
                let kx = 1.0 + rng.gen_range(-1.0..=1.0);
                let ky = 1.0 + rng.gen_range(-1.0..=1.0);
                (kx * w * agent.vx, ky * w * agent.vy)
            } else {
                (
                    w * agent.vx + r1 * c1 * xp + r2 * c2 * xg,
                    w * agent.vy + r1 * c1 * yp + r2 * c2 * yg,
                )
            };

            let (vx, vy) =
                limit_max_velocity(vx * VELOCITY_GAIN, vy * VELOCITY_GAIN, self.v_limit);
            move_or_avoid(env, idx, vx, vy, self.v_limit);
            self.tracker.update(env, idx, step);
        }
    }

    fn on_target_removed(&mut self, env: &mut Environment, _removed: &Target) {
        self.tracker.rescore(env);
    }
}
