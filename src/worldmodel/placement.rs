//! Random placement of obstacles and targets.
//!
//! Every draw is rejection-sampled against what is already in the arena and
//! every loop is capped; running out of attempts is an error, never a hang.

use super::geometric::Shape;
use super::{EntitySet, Environment, Obstacle, Target};
use crate::core::error::{SimError, SimResult};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

/// Draws per adjacent obstacle before the cluster stops growing from a parent
const ADJACENT_ATTEMPTS: usize = 10;

/// Chance that a placed obstacle sprouts a neighbour
const GROWTH_PROBABILITY: f64 = 0.5;

const OBSTACLE_CLEARANCE: [EntitySet; 3] =
    [EntitySet::Obstacles, EntitySet::Agents, EntitySet::SafeZone];

const TARGET_CLEARANCE: [EntitySet; 4] = [
    EntitySet::Obstacles,
    EntitySet::Agents,
    EntitySet::Targets,
    EntitySet::SafeZone,
];

/// Places `count` primary obstacles, each the seed of a small cluster.
///
/// Primary half-extents are whole numbers drawn from `half_size_range`; grown
/// neighbours keep fractional extents. Returns the total number of obstacles
/// placed, clusters included.
pub fn place_obstacles_randomly(
    env: &mut Environment,
    count: usize,
    half_size_range: (f64, f64),
    max_attempts: usize,
    max_cluster_size: usize,
    rng: &mut StdRng,
) -> SimResult<usize> {
    let (lo, hi) = half_size_range;
    let width = env.width() as f64;
    let height = env.height() as f64;
    let before = env.obstacles().len();

    for placed in 0..count {
        let mut attempts = 0;
        let primary = loop {
            if attempts >= max_attempts {
                return Err(SimError::PlacementExhausted {
                    what: "obstacles",
                    placed,
                    requested: count,
                    attempts,
                });
            }
            attempts += 1;

            let half_w = rng.gen_range(lo..=hi).floor().max(lo);
            let half_h = rng.gen_range(lo..=hi).floor().max(lo);
            let x = rng.gen_range(half_w..=width - half_w);
            let y = rng.gen_range(half_h..=height - half_h);
            let candidate = Obstacle::new(x, y, half_w, half_h);

            if !env.is_overlapping(&candidate.shape(), &OBSTACLE_CLEARANCE) {
                break candidate;
            }
        };

        if attempts > max_attempts / 2 {
            warn!(
                "⚠️ [Placement] obstacle {} needed {}/{} draws, arena is crowded",
                placed, attempts, max_attempts
            );
        }
        env.add_obstacle(primary);
        let grown = grow_cluster(env, primary, half_size_range, max_cluster_size, rng);
        debug!(
            "[Placement] obstacle {} at ({:.1}, {:.1}) after {} draws, cluster of {}",
            placed,
            primary.x,
            primary.y,
            attempts,
            grown + 1
        );
    }

    let total = env.obstacles().len() - before;
    info!(
        "🧱 [Placement] {} primary obstacles, {} in total",
        count, total
    );
    Ok(total)
}

/// Grows neighbours off `primary` with a bounded worklist.
///
/// Each neighbour shares an edge line with its parent on one axis and is
/// offset randomly along the other. Returns how many neighbours were added.
fn grow_cluster(
    env: &mut Environment,
    primary: Obstacle,
    half_size_range: (f64, f64),
    max_cluster_size: usize,
    rng: &mut StdRng,
) -> usize {
    let (lo, hi) = half_size_range;
    let mut frontier = vec![primary];
    let mut cluster = 1;

    while let Some(parent) = frontier.pop() {
        if cluster >= max_cluster_size {
            break;
        }
        if !rng.gen_bool(GROWTH_PROBABILITY) {
            continue;
        }

        for _ in 0..ADJACENT_ATTEMPTS {
            let half_w = rng.gen_range(lo..=hi);
            let half_h = rng.gen_range(lo..=hi);
            let span_x = parent.half_width + half_w;
            let span_y = parent.half_height + half_h;

            let (mut dx, mut dy) = if rng.gen_bool(0.5) {
                (span_x, rng.gen_range(-span_y..=span_y))
            } else {
                (rng.gen_range(-span_x..=span_x), span_y)
            };
            if rng.gen_bool(0.5) {
                dx = -dx;
            }
            if rng.gen_bool(0.5) {
                dy = -dy;
            }

            let candidate = Obstacle::new(parent.x + dx, parent.y + dy, half_w, half_h);
            if fits_inside(env, &candidate)
                && !env.is_overlapping(&candidate.shape(), &OBSTACLE_CLEARANCE)
            {
                env.add_obstacle(candidate);
                frontier.push(candidate);
                cluster += 1;
                break;
            }
        }
    }

    cluster - 1
}

fn fits_inside(env: &Environment, o: &Obstacle) -> bool {
    o.x - o.half_width >= 0.0
        && o.y - o.half_height >= 0.0
        && o.x + o.half_width <= env.width() as f64
        && o.y + o.half_height <= env.height() as f64
}

/// Places `count` targets clear of obstacles, agents, other targets and the safe zone.
pub fn place_targets_randomly(
    env: &mut Environment,
    count: usize,
    half_size: f64,
    max_attempts: usize,
    rng: &mut StdRng,
) -> SimResult<()> {
    let width = env.width() as f64;
    let height = env.height() as f64;

    for placed in 0..count {
        let mut attempts = 0;
        let target = loop {
            if attempts >= max_attempts {
                return Err(SimError::PlacementExhausted {
                    what: "targets",
                    placed,
                    requested: count,
                    attempts,
                });
            }
            attempts += 1;

            let x = rng.gen_range(half_size..=width - half_size);
            let y = rng.gen_range(half_size..=height - half_size);
            let shape = Shape::Circle { x, y, r: half_size };
            if !env.is_overlapping(&shape, &TARGET_CLEARANCE) {
                break Target::new(x, y, half_size);
            }
        };
        if attempts > max_attempts / 2 {
            warn!(
                "⚠️ [Placement] target {} needed {}/{} draws, arena is crowded",
                placed, attempts, max_attempts
            );
        }
        env.add_target(target);
    }

    info!("🎯 [Placement] {} targets placed", count);
    Ok(())
}
