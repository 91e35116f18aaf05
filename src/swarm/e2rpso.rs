//! Exploration-enhanced robotic PSO.
//!
//! The arena is cut into square cells, each holding an exploration credit.
//! Agents spend credit on the cell they stand in every step, and every
//! `update_every` steps each agent picks the cell that is both far away and
//! little explored, spending credit there too. The credit left in an agent's
//! own cell decides how hard it is pushed towards that far cell.

use super::fitness::{BestTracker, FitnessKind};
use super::motion::{limit_max_velocity, move_or_avoid, unit_towards};
use super::rdpso::VELOCITY_GAIN;
use super::SearchStrategy;
use crate::core::config::RunConfig;
use crate::worldmodel::geometric::Point;
use crate::worldmodel::{DetectionRule, Environment, Target};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct E2rpsoParams {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    /// Credit spent per visit
    pub k: f64,
    /// Steps between far-cell re-selection
    pub update_every: usize,
    pub cell_size: f64,
    pub initial_credit: f64,
    /// Below this, an agent's cell counts as nearly exhausted
    pub low_credit: f64,
    /// Clamp on the adaptive inertia weight
    pub inertia_bounds: (f64, f64),
}

impl Default for E2rpsoParams {
    fn default() -> Self {
        let c2 = 0.9;
        E2rpsoParams {
            c1: 0.4,
            c2,
            c3: 1.5 * c2,
            k: 1.0,
            update_every: 50,
            cell_size: 10.0,
            initial_credit: 100.0,
            low_credit: 25.0,
            inertia_bounds: (0.4, 1.4),
        }
    }
}

impl E2rpsoParams {
    /// (c1, c2, c3) for an agent whose current cell holds `credit`.
    pub fn coefficients(&self, credit: f64) -> (f64, f64, f64) {
        if credit <= 0.0 {
            (0.0, 0.0, 2.0 * self.c3)
        } else if credit < self.low_credit {
            (0.0, 0.0, self.c3)
        } else {
            (self.c1, self.c2, 0.0)
        }
    }

    /// Adaptive inertia: agents improving on their last best and a population
    /// near its global best keep more of their momentum.
    pub fn inertia(&self, previous: f64, personal: f64, global: f64, average: f64) -> f64 {
        let (lo, hi) = self.inertia_bounds;
        let w = 0.9 - 0.5 * (1.0 - balance(previous, personal)) + balance(global, average);
        w.clamp(lo, hi)
    }
}

/// Per-cell exploration credit over the arena.
#[derive(Clone, Debug)]
pub struct ExplorationCredits {
    cols: usize,
    rows: usize,
    cell_size: f64,
    width: f64,
    height: f64,
    credit: Vec<f64>,
}

impl ExplorationCredits {
    /// Cells are `cell_size` square; a partial last row or column still gets a cell.
    pub fn new(width: usize, height: usize, cell_size: f64, initial: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let cols = ((width as f64 / cell_size).ceil() as usize).max(1);
        let rows = ((height as f64 / cell_size).ceil() as usize).max(1);
        ExplorationCredits {
            cols,
            rows,
            cell_size,
            width: width as f64,
            height: height as f64,
            credit: vec![initial; cols * rows],
        }
    }

    pub fn len(&self) -> usize {
        self.credit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credit.is_empty()
    }

    pub fn credit(&self, cell: usize) -> f64 {
        self.credit.get(cell).copied().unwrap_or(0.0)
    }

    pub fn spend(&mut self, cell: usize, amount: f64) {
        if let Some(c) = self.credit.get_mut(cell) {
            *c -= amount;
        }
    }

    /// Cell containing (x, y), clamped onto the grid.
    pub fn cell_of(&self, x: f64, y: f64) -> usize {
        let col = ((x / self.cell_size).floor().max(0.0) as usize).min(self.cols - 1);
        let row = ((y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1);
        row * self.cols + col
    }

    /// Centre of `cell`, kept inside the arena for partial cells.
    pub fn center(&self, cell: usize) -> Point {
        let col = (cell % self.cols) as f64;
        let row = (cell / self.cols) as f64;
        let half = self.cell_size / 2.0;
        Point::new(
            (col * self.cell_size + half).min(self.width),
            (row * self.cell_size + half).min(self.height),
        )
    }

    /// Cell maximising `credit × distance` (in cells) from `from`; first wins ties.
    pub fn farthest_emptiest(&self, from: usize) -> usize {
        let (fc, fr) = ((from % self.cols) as f64, (from / self.cols) as f64);
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (cell, credit) in self.credit.iter().enumerate() {
            let dc = (cell % self.cols) as f64 - fc;
            let dr = (cell / self.cols) as f64 - fr;
            let score = credit * dc.hypot(dr);
            if score > best_score {
                best_score = score;
                best = cell;
            }
        }
        best
    }
}

/// `min(a, b) / max(a, b)`, taken as 1 when either side is unusable.
fn balance(a: f64, b: f64) -> f64 {
    let (lo, hi) = (a.min(b), a.max(b));
    if !lo.is_finite() || !hi.is_finite() || hi <= 0.0 {
        1.0
    } else {
        lo / hi
    }
}

pub struct E2rpso {
    params: E2rpsoParams,
    tracker: BestTracker,
    credits: Option<ExplorationCredits>,
    far_cells: Vec<usize>,
    v_limit: f64,
}

impl E2rpso {
    pub fn new(params: E2rpsoParams) -> Self {
        E2rpso {
            params,
            tracker: BestTracker::new(FitnessKind::Euclidean),
            credits: None,
            far_cells: Vec::new(),
            v_limit: RunConfig::default().step_size,
        }
    }

    pub fn tracker(&self) -> &BestTracker {
        &self.tracker
    }

    pub fn credits(&self) -> Option<&ExplorationCredits> {
        self.credits.as_ref()
    }
}

impl Default for E2rpso {
    fn default() -> Self {
        Self::new(E2rpsoParams::default())
    }
}

impl SearchStrategy for E2rpso {
    fn name(&self) -> &'static str {
        "E2RPSO"
    }

    fn detection_rule(&self) -> DetectionRule {
        DetectionRule::RadiusSum
    }

    fn initialize(&mut self, env: &mut Environment, run: &RunConfig, _rng: &mut StdRng) {
        self.v_limit = run.step_size;
        let credits = ExplorationCredits::new(
            env.width(),
            env.height(),
            self.params.cell_size,
            self.params.initial_credit,
        );
        debug!(
            "[E2RPSO] {}x{} exploration cells",
            credits.cols, credits.rows
        );
        self.credits = Some(credits);
        self.far_cells = vec![0; env.agents().len()];
        self.tracker.seed(env);
    }

    fn step(&mut self, env: &mut Environment, step: usize, rng: &mut StdRng) {
        let Some(credits) = self.credits.as_mut() else {
            return;
        };
        let n = env.agents().len();
        if n == 0 {
            return;
        }
        let average = env.agents().iter().map(|a| a.best.fitness).sum::<f64>() / n as f64;
        let p = &self.params;

        for idx in 0..n {
            let r1: f64 = rng.gen();
            let r2: f64 = rng.gen();
            let r3: f64 = rng.gen();

            let agent = env.agent(idx);
            let here = agent.position();

            let cell = credits.cell_of(here.x, here.y);
            credits.spend(cell, p.k);
            if p.update_every > 0 && step % p.update_every == 0 {
                let far = credits.farthest_emptiest(cell);
                credits.spend(far, p.k);
                self.far_cells[idx] = far;
            }
            let (c1, c2, c3) = p.coefficients(credits.credit(cell));

            let w = p.inertia(
                agent.best.previous,
                agent.best.fitness,
                self.tracker.global.fitness,
                average,
            );

            let (xp, yp) = unit_towards(here, agent.best.position);
            let (xg, yg) = unit_towards(here, self.tracker.global.position);
            let (xe, ye) = unit_towards(here, credits.center(self.far_cells[idx]));

            let vx = w * agent.vx + r1 * c1 * xp + r2 * c2 * xg + r3 * c3 * xe;
            let vy = w * agent.vy + r1 * c1 * yp + r2 * c2 * yg + r3 * c3 * ye;

            let (vx, vy) = limit_max_velocity(vx * VELOCITY_GAIN, vy * VELOCITY_GAIN, self.v_limit);
            move_or_avoid(env, idx, vx, vy, self.v_limit);
            self.tracker.update(env, idx, step);
        }
    }

    fn on_target_removed(&mut self, env: &mut Environment, _removed: &Target) {
        self.tracker.rescore(env);
    }
}
