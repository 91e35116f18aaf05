//! Fitness landscape and best-so-far bookkeeping for the swarm strategies.
//!
//! Fitness is the sum of a per-target distance score over the *active*
//! targets; lower is better. Removing a target changes the landscape, so the
//! stored bests are re-scored rather than carried over.

use crate::worldmodel::geometric::Point;
use crate::worldmodel::{Environment, Target};
use serde::{Deserialize, Serialize};

/// Per-target score applied to the distance between a position and a target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessKind {
    /// Plain Euclidean distance
    Euclidean,
    /// Fourth root of the distance, which flattens far targets
    QuarticRoot,
}

impl FitnessKind {
    #[inline]
    pub fn score(&self, distance: f64) -> f64 {
        match self {
            FitnessKind::Euclidean => distance,
            FitnessKind::QuarticRoot => distance.sqrt().sqrt(),
        }
    }

    /// Summed score at `at` over `targets`; zero when none are active.
    pub fn evaluate(&self, at: Point, targets: &[Target]) -> f64 {
        targets
            .iter()
            .map(|t| self.score(at.distance(&t.position())))
            .sum()
    }
}

/// Best fitness seen across the whole population, with its position
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalBest {
    pub fitness: f64,
    pub position: Point,
}

impl GlobalBest {
    pub fn unset(position: Point) -> Self {
        GlobalBest {
            fitness: f64::INFINITY,
            position,
        }
    }

    /// Accepts `fitness` when it is no worse than the current best.
    pub fn offer(&mut self, fitness: f64, at: Point) -> bool {
        if fitness <= self.fitness {
            self.fitness = fitness;
            self.position = at;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.fitness = f64::INFINITY;
    }
}

impl Default for GlobalBest {
    fn default() -> Self {
        GlobalBest::unset(Point::new(0.0, 0.0))
    }
}

/// Personal and global bests for one swarm, scored with one fitness kind.
#[derive(Clone, Debug)]
pub struct BestTracker {
    pub kind: FitnessKind,
    pub global: GlobalBest,
}

impl BestTracker {
    pub fn new(kind: FitnessKind) -> Self {
        BestTracker {
            kind,
            global: GlobalBest::default(),
        }
    }

    pub fn fitness_at(&self, env: &Environment, at: Point) -> f64 {
        self.kind.evaluate(at, env.targets())
    }

    /// Scores every agent where it stands and seeds both bests from that.
    pub fn seed(&mut self, env: &mut Environment) {
        self.global.reset();
        for idx in 0..env.agents().len() {
            let here = env.agent(idx).position();
            let f = self.fitness_at(env, here);
            let agent = env.agent_mut(idx);
            if f < agent.best.fitness {
                agent.best.seed(f, here);
            }
            self.global.offer(agent.best.fitness, agent.best.position);
        }
    }

    /// Scores agent `idx` at its current position, updating both bests.
    ///
    /// `iteration` feeds the personal-best running average.
    pub fn update(&mut self, env: &mut Environment, idx: usize, iteration: usize) -> f64 {
        let here = env.agent(idx).position();
        let f = self.fitness_at(env, here);
        let best = &mut env.agent_mut(idx).best;
        best.offer(f, here, iteration);
        if f <= self.global.fitness {
            self.global.fitness = f;
            self.global.position = best.position;
        }
        f
    }

    /// Re-scores each stored personal best against the current targets and
    /// rebuilds the global best from the results.
    pub fn rescore(&mut self, env: &mut Environment) {
        self.global.reset();
        for idx in 0..env.agents().len() {
            let at = env.agent(idx).best.position;
            let f = self.fitness_at(env, at);
            env.agent_mut(idx).best.seed(f, at);
            self.global.offer(f, at);
        }
    }
}
