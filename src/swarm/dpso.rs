//! Distributed PSO with per-agent particle clouds.
//!
//! Each agent carries a small swarm of particles sampled around it. After the
//! agent's own move the particles run a local PSO update, tethered to their
//! agent by a dispersion radius, and the best particle position becomes a
//! candidate personal best for the agent.

use super::fitness::{BestTracker, FitnessKind, GlobalBest};
use super::motion::{avoid_from, limit_max_velocity, move_or_avoid, unit_towards};
use super::rdpso::{annealed_inertia, seed_velocities, VELOCITY_GAIN};
use super::SearchStrategy;
use crate::core::config::RunConfig;
use crate::worldmodel::geometric::{circle_intersects_circle, Point};
use crate::worldmodel::{DetectionRule, Environment, Target};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DpsoParams {
    pub c1: f64,
    pub c2: f64,
    /// Tether strength pulling stray particles back to their agent
    pub c3: f64,
    pub w_upper: f64,
    pub w_lower: f64,
    pub particles_per_agent: usize,
    /// Standard deviation of the initial particle cloud
    pub sigma: f64,
    /// Particles farther than this from their agent are pulled back
    pub max_dispersion: f64,
    /// Particle velocity limit as a multiple of the agent's
    pub particle_speed_factor: f64,
    /// Sampling draws per requested particle
    pub sample_attempts_per_particle: usize,
}

impl Default for DpsoParams {
    fn default() -> Self {
        DpsoParams {
            c1: 0.4,
            c2: 0.9,
            c3: 1.0,
            w_upper: 0.9,
            w_lower: 0.4,
            particles_per_agent: 10,
            sigma: 3.0,
            max_dispersion: 8.0,
            particle_speed_factor: 2.0,
            sample_attempts_per_particle: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub best: GlobalBest,
}

impl Particle {
    fn new(x: f64, y: f64) -> Self {
        Particle {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            best: GlobalBest::unset(Point::new(x, y)),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One agent's particle cloud and its swarm-local best
#[derive(Clone, Debug)]
pub struct SubSwarm {
    pub particles: Vec<Particle>,
    pub best: GlobalBest,
}

impl SubSwarm {
    /// Samples particles from a Gaussian around `center`, rejecting draws that
    /// hit an obstacle or land within `radius` of an earlier particle.
    fn sample(
        env: &Environment,
        center: Point,
        radius: f64,
        params: &DpsoParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut particles: Vec<Particle> = Vec::with_capacity(params.particles_per_agent);
        let budget = params.particles_per_agent * params.sample_attempts_per_particle;

        if let (Ok(nx), Ok(ny)) = (
            Normal::new(center.x, params.sigma),
            Normal::new(center.y, params.sigma),
        ) {
            for _ in 0..budget {
                if particles.len() >= params.particles_per_agent {
                    break;
                }
                let x = nx.sample(rng);
                let y = ny.sample(rng);
                let crowded = particles
                    .iter()
                    .any(|p| circle_intersects_circle(x, y, radius, p.x, p.y, 0.0));
                if !crowded && !env.collides_with_obstacles(x, y, radius) {
                    particles.push(Particle::new(x, y));
                }
            }
        }

        SubSwarm {
            particles,
            best: GlobalBest::unset(center),
        }
    }

    fn crowded(&self, skip: usize, x: f64, y: f64, radius: f64) -> bool {
        self.particles
            .iter()
            .enumerate()
            .any(|(k, p)| k != skip && circle_intersects_circle(x, y, radius, p.x, p.y, 0.0))
    }

    /// Re-scores every stored best against the current targets.
    fn rescore(&mut self, tracker: &BestTracker, env: &Environment) {
        self.best.reset();
        for p in &mut self.particles {
            let f = tracker.fitness_at(env, p.best.position);
            p.best.fitness = f;
            self.best.offer(f, p.best.position);
        }
    }
}

pub struct Dpso {
    params: DpsoParams,
    tracker: BestTracker,
    swarms: Vec<SubSwarm>,
    v_limit: f64,
    max_steps: usize,
}

impl Dpso {
    pub fn new(params: DpsoParams) -> Self {
        let run = RunConfig::default();
        Dpso {
            params,
            tracker: BestTracker::new(FitnessKind::QuarticRoot),
            swarms: Vec::new(),
            v_limit: run.step_size,
            max_steps: run.max_steps,
        }
    }

    pub fn tracker(&self) -> &BestTracker {
        &self.tracker
    }

    pub fn swarms(&self) -> &[SubSwarm] {
        &self.swarms
    }

    /// Local PSO update of agent `owner`'s particles; returns the swarm-local best.
    fn update_particles(
        &mut self,
        env: &Environment,
        owner: usize,
        w: f64,
        rng: &mut StdRng,
    ) -> Point {
        let p = &self.params;
        let limit = self.v_limit * p.particle_speed_factor;
        let agent = env.agent(owner);
        let (ax, ay, radius) = (agent.x, agent.y, agent.radius);
        let swarm = &mut self.swarms[owner];

        for k in 0..swarm.particles.len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();
            let r3: f64 = rng.gen();

            let particle = &swarm.particles[k];
            let here = particle.position();
            let (xp, yp) = unit_towards(here, particle.best.position);
            let (xg, yg) = unit_towards(here, swarm.best.position);

            let mut vx = w * particle.vx + p.c1 * r1 * xp + p.c2 * r2 * xg;
            let mut vy = w * particle.vy + p.c1 * r1 * yp + p.c2 * r2 * yg;

            let dis = (ax - here.x).hypot(ay - here.y);
            if dis > p.max_dispersion {
                let pull = p.c3 * r3 * (1.0 + dis - p.max_dispersion);
                vx += pull * (ax - here.x) / dis;
                vy += pull * (ay - here.y) / dis;
            }

            let (vx, vy) = limit_max_velocity(vx * VELOCITY_GAIN, vy * VELOCITY_GAIN, limit);

            let (nx, ny) = (here.x + vx, here.y + vy);
            let free = !env.collides_with_obstacles(nx, ny, radius)
                && !env.collides_with_agents(Some(owner), nx, ny, radius)
                && !swarm.crowded(k, nx, ny, radius);
            let (x, y, vx, vy) = if free {
                (nx, ny, vx, vy)
            } else {
                let out = avoid_from(env, Some(owner), here.x, here.y, radius, vx, vy, limit);
                (out.x, out.y, out.vx, out.vy)
            };

            let at = Point::new(x, y);
            let f = self.tracker.fitness_at(env, at);
            let particle = &mut swarm.particles[k];
            particle.x = x;
            particle.y = y;
            particle.vx = vx;
            particle.vy = vy;
            particle.best.offer(f, at);
            if f <= swarm.best.fitness {
                swarm.best.fitness = f;
                swarm.best.position = particle.best.position;
            }
        }

        swarm.best.position
    }
}

impl Default for Dpso {
    fn default() -> Self {
        Self::new(DpsoParams::default())
    }
}

impl SearchStrategy for Dpso {
    fn name(&self) -> &'static str {
        "dPSO"
    }

    fn detection_rule(&self) -> DetectionRule {
        DetectionRule::RadiusSum
    }

    fn initialize(&mut self, env: &mut Environment, run: &RunConfig, rng: &mut StdRng) {
        self.v_limit = run.step_size;
        self.max_steps = run.max_steps;
        seed_velocities(env, run.step_size, rng);
        self.tracker.seed(env);

        let env: &Environment = env;
        let mut swarms = Vec::with_capacity(env.agents().len());
        for agent in env.agents() {
            let swarm = SubSwarm::sample(env, agent.position(), agent.radius, &self.params, rng);
            if swarm.particles.len() < self.params.particles_per_agent {
                warn!(
                    "[dPSO] agent {} sampled only {}/{} particles",
                    agent.id,
                    swarm.particles.len(),
                    self.params.particles_per_agent
                );
            }
            swarms.push(swarm);
        }
        self.swarms = swarms;
        debug!("[dPSO] {} particle clouds ready", self.swarms.len());
    }

    fn step(&mut self, env: &mut Environment, step: usize, rng: &mut StdRng) {
        let w = annealed_inertia(self.params.w_upper, self.params.w_lower, step, self.max_steps);
        let (c1, c2) = (self.params.c1, self.params.c2);

        for idx in 0..env.agents().len() {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();

            let agent = env.agent(idx);
            let here = agent.position();
            let (xp, yp) = unit_towards(here, agent.best.position);
            let (xg, yg) = unit_towards(here, self.tracker.global.position);
            let vx = w * agent.vx + r1 * c1 * xp + r2 * c2 * xg;
            let vy = w * agent.vy + r1 * c1 * yp + r2 * c2 * yg;

            let (vx, vy) = limit_max_velocity(vx * VELOCITY_GAIN, vy * VELOCITY_GAIN, self.v_limit);
            move_or_avoid(env, idx, vx, vy, self.v_limit);

            // The cloud's consensus competes for the agent's personal best
            let consensus = self.update_particles(env, idx, w, rng);
            let f = self.tracker.fitness_at(env, consensus);
            let best = &mut env.agent_mut(idx).best;
            if f <= best.fitness {
                best.fitness = f;
                best.position = consensus;
            }
            self.tracker.global.offer(f, best.position);

            self.tracker.update(env, idx, step);
        }
    }

    fn on_target_removed(&mut self, env: &mut Environment, _removed: &Target) {
        self.tracker.rescore(env);
        for swarm in &mut self.swarms {
            swarm.rescore(&self.tracker, env);
        }
    }
}
