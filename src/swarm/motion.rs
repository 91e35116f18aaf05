//! Motion Controller
//!
//! Collision-checked moves and the deterministic avoidance fallback used by
//! the swarm strategies. Nothing here fails with an error: a rejected move is
//! `false`, an exhausted avoidance search is the unchanged position.

use crate::worldmodel::geometric::Point;
use crate::worldmodel::Environment;
use tracing::warn;

/// Fractions of the velocity limit tried by the avoidance search, largest first
pub const AVOID_SCALES: [f64; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Heading offsets in degrees, alternating sides and widening
pub const AVOID_ANGLES: [f64; 36] = [
    10.0, -10.0, 20.0, -20.0, 30.0, -30.0, 40.0, -40.0, 50.0, -50.0, 60.0, -60.0, 70.0, -70.0,
    80.0, -80.0, 90.0, -90.0, 100.0, -100.0, 110.0, -110.0, 120.0, -120.0, 130.0, -130.0, 140.0,
    -140.0, 150.0, -150.0, 160.0, -160.0, 170.0, -170.0, 180.0, -180.0,
];

/// Outcome of the avoidance search: where to stand and the velocity that got there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Avoidance {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Avoidance {
    pub fn stuck(x: f64, y: f64) -> Self {
        Avoidance {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn is_stuck(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

/// Clear of the arena walls, every obstacle and every agent other than `exclude`.
pub fn is_free(env: &Environment, exclude: Option<usize>, x: f64, y: f64, radius: f64) -> bool {
    !(env.collides_with_obstacles(x, y, radius) || env.collides_with_agents(exclude, x, y, radius))
}

/// Moves agent `idx` by (dx, dy) if the destination is free.
///
/// Leaves the agent untouched on rejection.
pub fn attempt_move(env: &mut Environment, idx: usize, dx: f64, dy: f64) -> bool {
    let agent = env.agent(idx);
    let (nx, ny) = (agent.x + dx, agent.y + dy);
    if !is_free(env, Some(idx), nx, ny, agent.radius) {
        return false;
    }
    env.agent_mut(idx).set_position(nx, ny);
    true
}

/// Moves agent `idx` one `length` step along `heading` (radians) if free.
pub fn attempt_heading(env: &mut Environment, idx: usize, heading: f64, length: f64) -> bool {
    attempt_move(env, idx, length * heading.cos(), length * heading.sin())
}

/// Searches for a free displacement around the current heading of agent `idx`.
///
/// Does not move the agent; the caller applies the result.
pub fn avoid_obstacle(env: &Environment, idx: usize, vx: f64, vy: f64, limit: f64) -> Avoidance {
    let agent = env.agent(idx);
    avoid_from(env, Some(idx), agent.x, agent.y, agent.radius, vx, vy, limit)
}

/// Avoidance search from an arbitrary origin, for movers that are not agents.
#[allow(clippy::too_many_arguments)]
pub fn avoid_from(
    env: &Environment,
    exclude: Option<usize>,
    x: f64,
    y: f64,
    radius: f64,
    vx: f64,
    vy: f64,
    limit: f64,
) -> Avoidance {
    let heading = vy.atan2(vx);
    for scale in AVOID_SCALES {
        let magnitude = limit * scale;
        for offset in AVOID_ANGLES {
            let theta = heading + offset.to_radians();
            let ndx = theta.cos() * magnitude;
            let ndy = theta.sin() * magnitude;
            if is_free(env, exclude, x + ndx, y + ndy, radius) {
                return Avoidance {
                    x: x + ndx,
                    y: y + ndy,
                    vx: ndx,
                    vy: ndy,
                };
            }
        }
    }
    Avoidance::stuck(x, y)
}

/// Swarm-style move: take (vx, vy) if free, otherwise the avoidance result.
///
/// The agent's position and velocity are both written; a stuck agent records
/// a zero-length step and zero velocity.
pub fn move_or_avoid(env: &mut Environment, idx: usize, vx: f64, vy: f64, limit: f64) {
    let (vx, vy) = if attempt_move(env, idx, vx, vy) {
        (vx, vy)
    } else {
        let out = avoid_obstacle(env, idx, vx, vy, limit);
        if out.is_stuck() {
            warn!("[Motion] agent {} boxed in at ({:.1}, {:.1})", idx, out.x, out.y);
        }
        env.agent_mut(idx).set_position(out.x, out.y);
        (out.vx, out.vy)
    };
    env.agent_mut(idx).set_velocity(vx, vy);
}

/// Rescales (vx, vy) to length `limit` when either axis exceeds half of it.
///
/// Heading is preserved.
pub fn limit_max_velocity(vx: f64, vy: f64, limit: f64) -> (f64, f64) {
    if vx.abs() > limit / 2.0 || vy.abs() > limit / 2.0 {
        let k = vx.hypot(vy);
        (vx * limit / k, vy * limit / k)
    } else {
        (vx, vy)
    }
}

/// Unit vector from `from` to `to`; the zero vector when they coincide.
pub fn unit_towards(from: Point, to: Point) -> (f64, f64) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = dx.hypot(dy);
    if len > 0.0 {
        (dx / len, dy / len)
    } else {
        (0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worldmodel::Obstacle;

    fn blocked_arena() -> Environment {
        let mut env = Environment::new(20);
        env.add_obstacle(Obstacle::new(10.0, 10.0, 3.0, 3.0));
        env.add_agent(5.0, 10.0, 1.0, 1.0);
        env
    }

    #[test]
    fn move_into_obstacle_is_rejected_without_mutation() {
        let mut env = blocked_arena();
        let before = env.agent(0).clone();
        assert!(!attempt_move(&mut env, 0, 5.0, 0.0));
        let after = env.agent(0);
        assert_eq!((after.x, after.y), (before.x, before.y));
        assert_eq!(after.trajectory().len(), before.trajectory().len());
        assert_eq!((after.last_x, after.last_y), (before.last_x, before.last_y));
    }

    #[test]
    fn free_move_is_applied() {
        let mut env = blocked_arena();
        assert!(attempt_move(&mut env, 0, 0.0, -3.0));
        assert_eq!(env.agent(0).position(), Point::new(5.0, 7.0));
        assert_eq!(env.agent(0).trajectory().len(), 2);
    }

    #[test]
    fn move_into_other_agent_is_rejected() {
        let mut env = blocked_arena();
        env.add_agent(5.0, 4.0, 1.0, 1.0);
        assert!(!attempt_move(&mut env, 0, 0.0, -5.0));
        assert_eq!(env.agent(0).position(), Point::new(5.0, 10.0));
    }

    #[test]
    fn avoidance_turns_away_from_obstacle() {
        let env = blocked_arena();
        // Heading straight at the obstacle face
        let out = avoid_obstacle(&env, 0, 2.0, 0.0, 2.0);
        assert!(!out.is_stuck());
        assert!(is_free(&env, Some(0), out.x, out.y, 1.0));
        assert!((out.vx.hypot(out.vy) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn avoidance_prefers_small_turns() {
        let mut env = Environment::new(40);
        env.add_agent(20.0, 30.0, 1.0, 1.0);
        let out = avoid_obstacle(&env, 0, 1.0, 0.0, 2.0);
        let expected = 10f64.to_radians();
        assert!((out.vy.atan2(out.vx) - expected).abs() < 1e-9);
    }

    #[test]
    fn boxed_in_agent_is_stuck() {
        let mut env = Environment::new(4);
        env.add_agent(2.0, 2.0, 1.0, 1.9);
        let out = avoid_obstacle(&env, 0, 1.0, 1.0, 2.0);
        assert!(out.is_stuck());
        assert_eq!((out.x, out.y), (2.0, 2.0));
    }

    #[test]
    fn stuck_swarm_move_zeroes_velocity() {
        let mut env = Environment::new(4);
        env.add_agent(2.0, 2.0, 1.0, 1.9);
        env.agent_mut(0).set_velocity(3.0, 3.0);
        move_or_avoid(&mut env, 0, 1.0, 1.0, 2.0);
        let agent = env.agent(0);
        assert_eq!((agent.vx, agent.vy), (0.0, 0.0));
        assert_eq!(agent.trajectory().len(), 2);
        assert_eq!(agent.distance_travelled(), 0.0);
    }

    #[test]
    fn velocity_clamp_keeps_heading() {
        let (vx, vy) = limit_max_velocity(300.0, -400.0, 2.0);
        assert!((vx.hypot(vy) - 2.0).abs() < 1e-12);
        assert!((vx / vy - 300.0 / -400.0).abs() < 1e-12);

        assert_eq!(limit_max_velocity(0.5, -0.9, 2.0), (0.5, -0.9));
    }

    #[test]
    fn unit_vector_handles_coincident_points() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(unit_towards(p, p), (0.0, 0.0));
        let (ux, uy) = unit_towards(Point::new(0.0, 0.0), p);
        assert!((ux - 0.6).abs() < 1e-12 && (uy - 0.8).abs() < 1e-12);
    }
}
