use crate::worldmodel::geometric::{Point, Shape};
use serde::{Deserialize, Serialize};

/// Personal-best bookkeeping used by the swarm strategies.
///
/// `previous` and `average` feed the adaptive inertia weight of the
/// exploration-biased variant. All three start at positive infinity, so the
/// first real fitness always counts as an improvement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalBest {
    pub fitness: f64,
    pub position: Point,
    pub previous: f64,
    pub average: f64,
}

impl PersonalBest {
    pub fn unset(position: Point) -> Self {
        PersonalBest {
            fitness: f64::INFINITY,
            position,
            previous: f64::INFINITY,
            average: f64::INFINITY,
        }
    }

    /// Records `fitness` at `at` when it is no worse than the current best.
    ///
    /// `iteration` weights the running average of accepted bests.
    pub fn offer(&mut self, fitness: f64, at: Point, iteration: usize) -> bool {
        if fitness > self.fitness {
            return false;
        }
        self.previous = if self.fitness.is_finite() { self.fitness } else { fitness };
        self.fitness = fitness;
        self.average = if self.average.is_finite() {
            let t = iteration as f64;
            (self.average * t + fitness) / (t + 1.0)
        } else {
            fitness
        };
        self.position = at;
        true
    }

    /// Seeds all three slots with one value, as at episode start.
    pub fn seed(&mut self, fitness: f64, at: Point) {
        self.fitness = fitness;
        self.previous = fitness;
        self.average = fitness;
        self.position = at;
    }
}

/// A mobile search agent.
///
/// `radius` is the detection radius, also used as clearance against obstacles;
/// `half_size` is the agent's own box as seen by other movers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Position before the most recent `set_position`, cleared by the occupancy sync
    pub last_x: f64,
    pub last_y: f64,
    pub half_size: f64,
    pub radius: f64,
    pub best: PersonalBest,
    pub targets_found: usize,
    trajectory: Vec<Point>,
}

impl Agent {
    pub fn new(id: usize, x: f64, y: f64, half_size: f64, radius: f64) -> Self {
        Agent {
            id,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            last_x: x,
            last_y: y,
            half_size,
            radius,
            best: PersonalBest::unset(Point::new(x, y)),
            targets_found: 0,
            trajectory: vec![Point::new(x, y)],
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Moves the agent without any collision check and records the step.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.last_x = self.x;
        self.last_y = self.y;
        self.x = x;
        self.y = y;
        self.trajectory.push(Point::new(x, y));
    }

    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        self.vx = vx;
        self.vy = vy;
    }

    pub fn trajectory(&self) -> &[Point] {
        &self.trajectory
    }

    /// Footprint seen by other movers.
    pub fn body(&self) -> Shape {
        Shape::Rect {
            x: self.x,
            y: self.y,
            half_w: self.half_size,
            half_h: self.half_size,
        }
    }

    pub fn distance_travelled(&self) -> f64 {
        self.trajectory
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_position_appends_and_shadows() {
        let mut agent = Agent::new(0, 1.0, 1.0, 1.0, 3.0);
        agent.set_position(4.0, 5.0);
        assert_eq!((agent.last_x, agent.last_y), (1.0, 1.0));
        assert_eq!(agent.trajectory().len(), 2);
        assert!((agent.distance_travelled() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn stationary_agent_travels_nothing() {
        let agent = Agent::new(0, 3.0, 3.0, 1.0, 3.0);
        assert_eq!(agent.distance_travelled(), 0.0);
    }

    #[test]
    fn first_offer_always_improves() {
        let mut best = PersonalBest::unset(Point::new(0.0, 0.0));
        assert!(best.offer(1e9, Point::new(1.0, 1.0), 0));
        assert_eq!(best.fitness, 1e9);
        assert_eq!(best.previous, 1e9);
        assert_eq!(best.average, 1e9);
    }

    #[test]
    fn offer_tracks_previous_and_average() {
        let mut best = PersonalBest::unset(Point::new(0.0, 0.0));
        best.seed(10.0, Point::new(0.0, 0.0));
        assert!(!best.offer(11.0, Point::new(2.0, 2.0), 1));
        assert!(best.offer(6.0, Point::new(2.0, 2.0), 1));
        assert_eq!(best.previous, 10.0);
        assert_eq!(best.fitness, 6.0);
        assert!((best.average - 8.0).abs() < 1e-12);
        assert_eq!(best.position, Point::new(2.0, 2.0));
    }
}
