//! Exhaustive coverage: each agent sweeps its own rectangle of the arena in a
//! zig-zag of waypoints, then falls back to a random walk.

use super::motion::{attempt_heading, attempt_move};
use super::{SearchStrategy, COVERAGE_DETECTION_PADDING};
use crate::core::config::RunConfig;
use crate::worldmodel::geometric::Point;
use crate::worldmodel::{DetectionRule, Environment};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::debug;

/// Heading offsets in degrees tried before giving up on a direct approach
const APPROACH_OFFSETS: [f64; 13] = [
    0.0, 15.0, -15.0, 30.0, -30.0, 45.0, -45.0, 60.0, -60.0, 75.0, -75.0, 90.0, -90.0,
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustiveParams {
    /// Waypoint spacing as a multiple of the detection radius
    pub spacing_factor: f64,
    /// Consecutive non-improving steps before a detour
    pub stuck_window: usize,
    /// Detour lengths in steps, one picked at random
    pub detour_lengths: Vec<usize>,
    /// Random headings tried once every approach offset is blocked
    pub random_retries: usize,
}

impl Default for ExhaustiveParams {
    fn default() -> Self {
        ExhaustiveParams {
            spacing_factor: 0.9,
            stuck_window: 3,
            detour_lengths: vec![5, 10],
            random_retries: 5,
        }
    }
}

/// An axis-aligned slice of the arena assigned to one agent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Region {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Splits the arena into `n` equal regions, `rows × cols` with `rows` the
/// middle divisor of `n`.
pub fn partition(width: f64, height: f64, n: usize) -> Vec<Region> {
    if n == 0 {
        return Vec::new();
    }
    let divisors: Vec<usize> = (1..=n).filter(|d| n % d == 0).collect();
    let rows = divisors[divisors.len() / 2];
    let cols = n / rows;
    let (rw, rh) = (width / cols as f64, height / rows as f64);

    (0..rows)
        .flat_map(|i| {
            (0..cols).map(move |j| Region {
                x_min: j as f64 * rw,
                x_max: (j + 1) as f64 * rw,
                y_min: i as f64 * rh,
                y_max: (i + 1) as f64 * rh,
            })
        })
        .collect()
}

/// Upper bound on the waypoints laid over one region
pub const MAX_WAYPOINTS_PER_REGION: usize = 100_000;

/// Boustrophedon waypoints over `region`, `spacing` apart, rows alternating direction.
///
/// Spacing is widened when it would lay more than
/// [`MAX_WAYPOINTS_PER_REGION`] points.
pub fn zigzag(region: &Region, spacing: f64) -> Vec<Point> {
    if !(spacing > 0.0) || !spacing.is_finite() {
        return Vec::new();
    }
    let width = (region.x_max - region.x_min).trunc().max(2.0);
    let height = (region.y_max - region.y_min).trunc().max(2.0);
    let cells = (width / spacing) * (height / spacing);
    let spacing = if cells > MAX_WAYPOINTS_PER_REGION as f64 {
        spacing * (cells / MAX_WAYPOINTS_PER_REGION as f64).sqrt()
    } else {
        spacing
    };
    let nx = (width / spacing).floor() as usize;
    let ny = (height / spacing).floor() as usize;

    let mut points = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        let y = region.y_min + (row as f64 + 0.5) * spacing;
        let columns: Box<dyn Iterator<Item = usize>> = if row % 2 == 0 {
            Box::new(0..nx)
        } else {
            Box::new((0..nx).rev())
        };
        for col in columns {
            points.push(Point::new(region.x_min + (col as f64 + 0.5) * spacing, y));
        }
    }
    points
}

fn random_step(env: &mut Environment, idx: usize, length: f64, rng: &mut StdRng) {
    let heading = rng.gen_range(0.0..TAU);
    attempt_heading(env, idx, heading, length);
}

/// Progress of one agent along its sweep
#[derive(Clone, Debug)]
pub struct SweepPlan {
    pub waypoints: Vec<Point>,
    pub cursor: usize,
    stuck: usize,
    detour_left: usize,
    detour_dy: f64,
    previous_distance: f64,
}

impl SweepPlan {
    fn new(waypoints: Vec<Point>) -> Self {
        SweepPlan {
            waypoints,
            cursor: 0,
            stuck: 0,
            detour_left: 0,
            detour_dy: 0.0,
            previous_distance: f64::INFINITY,
        }
    }

    pub fn finished(&self) -> bool {
        self.cursor >= self.waypoints.len()
    }

    pub fn in_detour(&self) -> bool {
        self.detour_left > 0
    }
}

pub struct Exhaustive {
    params: ExhaustiveParams,
    plans: Vec<SweepPlan>,
    step_size: f64,
}

impl Exhaustive {
    pub fn new(params: ExhaustiveParams) -> Self {
        Exhaustive {
            params,
            plans: Vec::new(),
            step_size: RunConfig::default().step_size,
        }
    }

    pub fn plans(&self) -> &[SweepPlan] {
        &self.plans
    }

    fn advance(&mut self, env: &mut Environment, idx: usize, rng: &mut StdRng) {
        let step = self.step_size;
        let radius = env.agent(idx).radius;
        let plan = &mut self.plans[idx];

        while let Some(wp) = plan.waypoints.get(plan.cursor) {
            if !env.collides_with_obstacles(wp.x, wp.y, radius) {
                break;
            }
            plan.cursor += 1;
        }
        let Some(&wp) = plan.waypoints.get(plan.cursor) else {
            random_step(env, idx, step, rng);
            return;
        };

        let here = env.agent(idx).position();
        let (dx, dy) = (wp.x - here.x, wp.y - here.y);
        let distance = dx.hypot(dy);

        if distance < step {
            attempt_move(env, idx, dx, dy);
            plan.cursor += 1;
            plan.stuck = 0;
            plan.previous_distance = f64::INFINITY;
            return;
        }

        if plan.detour_left > 0 {
            plan.detour_left -= 1;
            attempt_move(env, idx, 0.0, plan.detour_dy);
            return;
        }

        let heading = dy.atan2(dx);
        let moved = APPROACH_OFFSETS
            .iter()
            .any(|offset| attempt_heading(env, idx, heading + offset.to_radians(), step));
        if !moved {
            for _ in 0..self.params.random_retries {
                if attempt_heading(env, idx, rng.gen_range(0.0..TAU), step) {
                    break;
                }
            }
        }

        if distance >= plan.previous_distance - 0.5 * step {
            plan.stuck += 1;
        } else {
            plan.stuck = 0;
        }
        plan.previous_distance = distance;

        if plan.stuck >= self.params.stuck_window {
            plan.detour_left = self.params.detour_lengths.choose(rng).copied().unwrap_or(0);
            plan.detour_dy = if rng.gen_bool(0.5) { step } else { -step };
            plan.stuck = 0;
            debug!(
                "[Exhaustive] agent {} stuck near ({:.1}, {:.1}), detouring {} steps",
                idx, here.x, here.y, plan.detour_left
            );
        }
    }
}

impl Default for Exhaustive {
    fn default() -> Self {
        Self::new(ExhaustiveParams::default())
    }
}

impl SearchStrategy for Exhaustive {
    fn name(&self) -> &'static str {
        "Exhaustive"
    }

    fn detection_rule(&self) -> DetectionRule {
        DetectionRule::Padded {
            padding: COVERAGE_DETECTION_PADDING,
        }
    }

    fn initialize(&mut self, env: &mut Environment, run: &RunConfig, _rng: &mut StdRng) {
        self.step_size = run.step_size;
        let n = env.agents().len();
        let regions = partition(env.width() as f64, env.height() as f64, n);
        self.plans = regions
            .iter()
            .zip(env.agents())
            .map(|(region, agent)| {
                SweepPlan::new(zigzag(region, agent.radius * self.params.spacing_factor))
            })
            .collect();
        debug!(
            "[Exhaustive] {} regions, {} waypoints in total",
            self.plans.len(),
            self.plans.iter().map(|p| p.waypoints.len()).sum::<usize>()
        );
    }

    fn step(&mut self, env: &mut Environment, _step: usize, rng: &mut StdRng) {
        for idx in 0..env.agents().len() {
            if idx < self.plans.len() {
                self.advance(env, idx, rng);
            } else {
                random_step(env, idx, self.step_size, rng);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worldmodel::Obstacle;
    use rand::SeedableRng;

    #[test]
    fn partition_uses_middle_divisor() {
        let regions = partition(100.0, 100.0, 6);
        // divisors of 6: [1, 2, 3, 6] -> rows 3, cols 2
        assert_eq!(regions.len(), 6);
        assert_eq!(regions[1], Region { x_min: 50.0, x_max: 100.0, y_min: 0.0, y_max: 100.0 / 3.0 });

        let single = partition(40.0, 40.0, 1);
        assert_eq!(single, vec![Region { x_min: 0.0, x_max: 40.0, y_min: 0.0, y_max: 40.0 }]);

        // prime counts become a single column
        assert_eq!(partition(70.0, 70.0, 7)[6].y_min, 60.0);
        assert!(partition(10.0, 10.0, 0).is_empty());
    }

    #[test]
    fn zigzag_alternates_rows() {
        let region = Region { x_min: 0.0, x_max: 10.0, y_min: 0.0, y_max: 6.0 };
        let pts = zigzag(&region, 2.0);
        // 5 columns x 3 rows
        assert_eq!(pts.len(), 15);
        assert_eq!(pts[0], Point::new(1.0, 1.0));
        assert_eq!(pts[4], Point::new(9.0, 1.0));
        assert_eq!(pts[5], Point::new(9.0, 3.0));
        assert_eq!(pts[9], Point::new(1.0, 3.0));
        assert_eq!(pts[10], Point::new(1.0, 5.0));
    }

    #[test]
    fn zigzag_caps_fine_spacing() {
        let region = Region { x_min: 0.0, x_max: 1000.0, y_min: 0.0, y_max: 1000.0 };
        let pts = zigzag(&region, 0.009);
        assert!(!pts.is_empty());
        assert!(pts.len() <= MAX_WAYPOINTS_PER_REGION);
        assert!(pts
            .iter()
            .all(|p| p.x > 0.0 && p.x < 1000.0 && p.y > 0.0 && p.y < 1000.0));

        assert!(zigzag(&region, f64::NAN).is_empty());
        assert!(zigzag(&region, f64::INFINITY).is_empty());
    }

    #[test]
    fn blocked_waypoints_are_skipped() {
        let mut env = Environment::new(30);
        env.add_obstacle(Obstacle::new(10.0, 20.0, 8.0, 8.0));
        env.add_agent(25.0, 25.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut sweep = Exhaustive::default();
        sweep.initialize(&mut env, &RunConfig::default(), &mut rng);
        sweep.step(&mut env, 0, &mut rng);

        let plan = &sweep.plans()[0];
        let wp = plan.waypoints[plan.cursor];
        assert!(!env.collides_with_obstacles(wp.x, wp.y, 1.0));
        assert!(plan.cursor > 0);
    }

    #[test]
    fn sweep_reaches_successive_waypoints() {
        let mut env = Environment::new(30);
        env.add_agent(20.0, 20.0, 1.0, 2.0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut sweep = Exhaustive::default();
        sweep.initialize(&mut env, &RunConfig::default(), &mut rng);

        for step in 0..200 {
            sweep.step(&mut env, step, &mut rng);
        }
        assert!(sweep.plans()[0].cursor > 10);
    }

    #[test]
    fn extra_agents_walk_randomly() {
        let mut env = Environment::new(40);
        env.add_agent(20.0, 20.0, 1.0, 2.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut sweep = Exhaustive::default();
        sweep.initialize(&mut env, &RunConfig::default(), &mut rng);
        env.add_agent(30.0, 30.0, 1.0, 2.0);

        sweep.step(&mut env, 0, &mut rng);
        assert_eq!(sweep.plans().len(), 1);
        let moved = env.agent(1).trajectory();
        if moved.len() == 2 {
            assert!((moved[0].distance(&moved[1]) - 2.0).abs() < 1e-9);
        }
    }
}
