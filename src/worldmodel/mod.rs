//! Arena Model
//!
//! Owns everything spatial for one episode:
//! - arena bounds and the reserved safe zone
//! - obstacles, active targets and the agent roster
//! - the discretised occupancy map used for reporting
//!
//! Collision checks run against the continuous geometry in `geometric`;
//! the occupancy map never feeds back into motion.

pub mod geometric;
pub mod grid;
pub mod placement;
pub mod snapshot;

use crate::core::agent::Agent;
use crate::core::config::{ObstacleSpec, SearchConfig, TargetSpec};
use crate::core::error::SimResult;
use geometric::{circle_intersects_rect, Shape};
use grid::{CellLabel, OccupancyMap};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

pub use geometric::Point;
pub use snapshot::{GridSnapshot, SnapshotObserver, SnapshotRecorder};

/// Centre and half-size of the safe zone, which sits at mid-height.
pub const SAFE_ZONE_X: f64 = 5.0;
pub const SAFE_ZONE_HALF_SIZE: f64 = 5.0;

/// Initial agent speed range on each axis
const INITIAL_SPEED: f64 = 5.0;

/// An axis-aligned rectangular obstacle, immutable once placed
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub half_width: f64,
    pub half_height: f64,
}

impl Obstacle {
    pub fn new(x: f64, y: f64, half_width: f64, half_height: f64) -> Self {
        Obstacle {
            x,
            y,
            half_width,
            half_height,
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::Rect {
            x: self.x,
            y: self.y,
            half_w: self.half_width,
            half_h: self.half_height,
        }
    }
}

/// A point-like target; `half_size` doubles as its detection radius
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub x: f64,
    pub y: f64,
    pub half_size: f64,
}

impl Target {
    pub fn new(x: f64, y: f64, half_size: f64) -> Self {
        Target { x, y, half_size }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn shape(&self) -> Shape {
        Shape::Circle {
            x: self.x,
            y: self.y,
            r: self.half_size,
        }
    }
}

/// Entity collections a placement can be checked against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntitySet {
    Obstacles,
    Agents,
    Targets,
    SafeZone,
}

/// When an agent counts as having found a target
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DetectionRule {
    /// `distance < agent.radius + target.half_size`
    RadiusSum,
    /// `distance < agent.radius + target.half_size + padding`
    Padded { padding: f64 },
}

impl DetectionRule {
    pub fn detects(&self, agent: &Agent, target: &Target) -> bool {
        let reach = match *self {
            DetectionRule::RadiusSum => agent.radius + target.half_size,
            DetectionRule::Padded { padding } => agent.radius + target.half_size + padding,
        };
        agent.position().distance(&target.position()) < reach
    }
}

/// First agent/target pair that satisfied a detection rule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Detection {
    pub agent: usize,
    pub target: usize,
}

/// The arena for one episode
#[derive(Clone, Debug)]
pub struct Environment {
    width: usize,
    height: usize,
    obstacles: Vec<Obstacle>,
    targets: Vec<Target>,
    agents: Vec<Agent>,
    safe_zone: Obstacle,
    occupancy: OccupancyMap,
}

impl Environment {
    /// Empty square arena with only the safe zone reserved.
    pub fn new(side: usize) -> Self {
        let safe_zone = Obstacle::new(
            SAFE_ZONE_X,
            (side / 2) as f64,
            SAFE_ZONE_HALF_SIZE,
            SAFE_ZONE_HALF_SIZE,
        );
        let mut occupancy = OccupancyMap::new(side, side);
        occupancy.place_region(
            safe_zone.x,
            safe_zone.y,
            safe_zone.half_width,
            safe_zone.half_height,
            CellLabel::SafeZone,
        );

        Environment {
            width: side,
            height: side,
            obstacles: Vec::new(),
            targets: Vec::new(),
            agents: Vec::new(),
            safe_zone,
            occupancy,
        }
    }

    /// Builds the arena: safe zone, agents, then obstacles, then targets.
    pub fn generate(config: &SearchConfig, rng: &mut StdRng) -> SimResult<Self> {
        config.validate()?;
        let mut env = Environment::new(config.side);

        for p in config.start_positions() {
            let id = env.add_agent(p.x, p.y, config.agent_half_size, config.agent_radius);
            env.agents[id].set_velocity(
                rng.gen_range(-INITIAL_SPEED..=INITIAL_SPEED),
                rng.gen_range(-INITIAL_SPEED..=INITIAL_SPEED),
            );
        }

        match &config.obstacles {
            ObstacleSpec::Random {
                count,
                half_size_range,
            } => {
                placement::place_obstacles_randomly(
                    &mut env,
                    *count,
                    *half_size_range,
                    config.max_placement_attempts,
                    config.max_cluster_size,
                    rng,
                )?;
            }
            ObstacleSpec::Explicit(list) => {
                for obstacle in list {
                    env.add_obstacle(*obstacle);
                }
            }
        }

        match &config.targets {
            TargetSpec::Random { count, half_size } => {
                placement::place_targets_randomly(
                    &mut env,
                    *count,
                    *half_size,
                    config.max_placement_attempts,
                    rng,
                )?;
            }
            TargetSpec::Explicit(list) => {
                for target in list {
                    env.add_target(*target);
                }
            }
        }

        info!(
            "🌐 [Environment] {}x{} arena: {} obstacles, {} targets, {} agents",
            env.width,
            env.height,
            env.obstacles.len(),
            env.targets.len(),
            env.agents.len()
        );
        Ok(env)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn agent(&self, idx: usize) -> &Agent {
        &self.agents[idx]
    }

    pub fn agent_mut(&mut self, idx: usize) -> &mut Agent {
        &mut self.agents[idx]
    }

    pub fn safe_zone(&self) -> &Obstacle {
        &self.safe_zone
    }

    pub fn occupancy(&self) -> &OccupancyMap {
        &self.occupancy
    }

    pub fn add_agent(&mut self, x: f64, y: f64, half_size: f64, radius: f64) -> usize {
        let id = self.agents.len();
        self.agents.push(Agent::new(id, x, y, half_size, radius));
        self.occupancy
            .place_region(x, y, half_size, half_size, CellLabel::Agent);
        id
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.occupancy.place_region(
            obstacle.x,
            obstacle.y,
            obstacle.half_width,
            obstacle.half_height,
            CellLabel::Obstacle,
        );
        self.obstacles.push(obstacle);
    }

    pub fn add_target(&mut self, target: Target) {
        self.occupancy.place_region(
            target.x,
            target.y,
            target.half_size,
            target.half_size,
            CellLabel::Target,
        );
        self.targets.push(target);
    }

    pub fn place_region(&mut self, x: f64, y: f64, half_w: f64, half_h: f64, label: CellLabel) {
        self.occupancy.place_region(x, y, half_w, half_h, label);
    }

    /// True if `shape` box-overlaps anything in the chosen sets.
    pub fn is_overlapping(&self, shape: &Shape, sets: &[EntitySet]) -> bool {
        sets.iter().any(|set| match set {
            EntitySet::Obstacles => self.obstacles.iter().any(|o| shape.overlaps(&o.shape())),
            EntitySet::Agents => self.agents.iter().any(|a| shape.overlaps(&a.body())),
            EntitySet::Targets => self.targets.iter().any(|t| shape.overlaps(&t.shape())),
            EntitySet::SafeZone => shape.overlaps(&self.safe_zone.shape()),
        })
    }

    /// Circle of radius `r` at (x, y) would leave the arena.
    pub fn out_of_bounds(&self, x: f64, y: f64, r: f64) -> bool {
        x - r < 0.0 || x + r > self.width as f64 || y - r < 0.0 || y + r > self.height as f64
    }

    /// Bounds plus circle-vs-rectangle against every obstacle.
    pub fn collides_with_obstacles(&self, x: f64, y: f64, r: f64) -> bool {
        self.out_of_bounds(x, y, r)
            || self
                .obstacles
                .iter()
                .any(|o| circle_intersects_rect(x, y, r, o.x, o.y, o.half_width, o.half_height))
    }

    /// Bounds plus circle-vs-box against every agent except `exclude`.
    ///
    /// Reads current positions, so agents already moved this step are seen
    /// at their new place and the rest at their old one.
    pub fn collides_with_agents(&self, exclude: Option<usize>, x: f64, y: f64, r: f64) -> bool {
        self.out_of_bounds(x, y, r)
            || self
                .agents
                .iter()
                .filter(|a| Some(a.id) != exclude)
                .any(|a| circle_intersects_rect(x, y, r, a.x, a.y, a.half_size, a.half_size))
    }

    /// Removes an active target and clears its cells.
    pub fn remove_target(&mut self, index: usize) -> Target {
        let target = self.targets.remove(index);
        self.occupancy
            .clear_region(target.x, target.y, target.half_size, target.half_size);
        target
    }

    /// Refreshes agent cells after every agent has moved for the step.
    ///
    /// Only cells still labelled `Agent` are cleared from the stale boxes.
    /// The safe zone, obstacles and targets under a stale box are re-marked
    /// before any agent is, since an agent mark may have covered them.
    pub fn sync_agent_positions(&mut self) {
        let stale: Vec<Shape> = self
            .agents
            .iter()
            .map(|a| Shape::Rect {
                x: a.last_x,
                y: a.last_y,
                half_w: a.half_size,
                half_h: a.half_size,
            })
            .collect();

        for agent in &self.agents {
            self.occupancy.replace_in_region(
                agent.last_x,
                agent.last_y,
                agent.half_size,
                agent.half_size,
                CellLabel::Agent,
                CellLabel::Empty,
            );
        }

        let under = |shape: Shape| stale.iter().any(|s| s.overlaps(&shape));
        let zone = self.safe_zone;
        if under(zone.shape()) {
            self.occupancy.place_region(
                zone.x,
                zone.y,
                zone.half_width,
                zone.half_height,
                CellLabel::SafeZone,
            );
        }
        for o in self.obstacles.iter().filter(|o| under(o.shape())) {
            self.occupancy
                .place_region(o.x, o.y, o.half_width, o.half_height, CellLabel::Obstacle);
        }
        for t in self.targets.iter().filter(|t| under(t.shape())) {
            self.occupancy
                .place_region(t.x, t.y, t.half_size, t.half_size, CellLabel::Target);
        }

        for agent in &self.agents {
            self.occupancy.place_region(
                agent.x,
                agent.y,
                agent.half_size,
                agent.half_size,
                CellLabel::Agent,
            );
        }
    }

    pub fn total_distance_covered(&self) -> f64 {
        self.agents.iter().map(|a| a.distance_travelled()).sum()
    }

    /// First agent/target pair, agent-major, that satisfies `rule`.
    pub fn detect_target(&self, rule: DetectionRule) -> Option<Detection> {
        self.agents.iter().enumerate().find_map(|(ai, agent)| {
            self.targets
                .iter()
                .position(|t| rule.detects(agent, t))
                .map(|ti| Detection {
                    agent: ai,
                    target: ti,
                })
        })
    }

    /// Credits the finder and removes the target from the active set.
    pub fn claim_target(&mut self, detection: Detection) -> Target {
        self.agents[detection.agent].targets_found += 1;
        self.remove_target(detection.target)
    }

    pub fn snapshot(&self, episode: &str, step: usize) -> GridSnapshot {
        GridSnapshot::capture(self, episode, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn open_arena() -> Environment {
        let mut env = Environment::new(20);
        env.add_obstacle(Obstacle::new(10.0, 10.0, 3.0, 3.0));
        env.add_agent(2.0, 10.0, 1.0, 1.0);
        env
    }

    #[test]
    fn safe_zone_is_marked() {
        let env = Environment::new(20);
        assert_eq!(env.safe_zone().y, 10.0);
        assert_eq!(env.occupancy().get(0, 5), Some(CellLabel::SafeZone));
        assert_eq!(env.occupancy().get(9, 14), Some(CellLabel::SafeZone));
        assert_eq!(env.occupancy().get(10, 10), Some(CellLabel::Empty));
    }

    #[test]
    fn bounds_count_as_collision() {
        let env = open_arena();
        assert!(env.collides_with_obstacles(0.5, 5.0, 1.0));
        assert!(env.collides_with_obstacles(19.5, 5.0, 1.0));
        assert!(!env.collides_with_obstacles(2.0, 2.0, 1.0));
        assert!(env.collides_with_obstacles(10.0, 10.0, 1.0));
    }

    #[test]
    fn agents_do_not_collide_with_themselves() {
        let mut env = open_arena();
        env.add_agent(2.0, 14.0, 1.0, 1.0);
        assert!(!env.collides_with_agents(Some(0), 2.0, 10.0, 1.0));
        assert!(env.collides_with_agents(Some(0), 2.0, 12.5, 1.0));
        assert!(env.collides_with_agents(None, 2.0, 10.0, 1.0));
    }

    #[test]
    fn overlap_sets_are_selective() {
        let env = open_arena();
        let block = Shape::Rect { x: 11.0, y: 11.0, half_w: 1.0, half_h: 1.0 };
        assert!(env.is_overlapping(&block, &[EntitySet::Obstacles]));
        assert!(!env.is_overlapping(&block, &[EntitySet::Agents, EntitySet::Targets]));

        let in_safe = Shape::Circle { x: 4.0, y: 8.0, r: 1.0 };
        assert!(env.is_overlapping(&in_safe, &[EntitySet::SafeZone]));
    }

    #[test]
    fn detection_is_agent_major_and_first_wins() {
        let mut env = Environment::new(30);
        env.add_agent(20.0, 20.0, 1.0, 2.0);
        env.add_agent(5.0, 25.0, 1.0, 2.0);
        env.add_target(Target::new(5.0, 27.0, 1.0));
        env.add_target(Target::new(21.0, 21.0, 1.0));
        env.add_target(Target::new(20.0, 22.0, 1.0));

        let hit = env.detect_target(DetectionRule::RadiusSum).unwrap();
        assert_eq!(hit, Detection { agent: 0, target: 1 });

        let claimed = env.claim_target(hit);
        assert_eq!(claimed.position(), Point::new(21.0, 21.0));
        assert_eq!(env.agent(0).targets_found, 1);
        assert_eq!(env.targets().len(), 2);
    }

    #[test]
    fn padded_rule_reaches_further() {
        let mut env = Environment::new(30);
        env.add_agent(10.0, 20.0, 1.0, 1.0);
        env.add_target(Target::new(14.0, 20.0, 1.0));
        assert!(env.detect_target(DetectionRule::RadiusSum).is_none());
        assert!(env
            .detect_target(DetectionRule::Padded { padding: 3.0 })
            .is_some());
    }

    #[test]
    fn removing_target_clears_cells() {
        let mut env = Environment::new(20);
        env.add_target(Target::new(15.0, 15.0, 1.0));
        assert_eq!(env.occupancy().count(CellLabel::Target), 4);
        env.remove_target(0);
        assert_eq!(env.occupancy().count(CellLabel::Target), 0);
        assert!(env.targets().is_empty());
    }

    #[test]
    fn sync_moves_agent_cells_and_is_idempotent() {
        let mut env = Environment::new(20);
        env.add_agent(14.0, 14.0, 1.0, 1.0);
        env.agent_mut(0).set_position(16.0, 16.0);
        env.sync_agent_positions();
        assert_eq!(env.occupancy().get(13, 13), Some(CellLabel::Empty));
        assert_eq!(env.occupancy().get(15, 15), Some(CellLabel::Agent));

        let before = env.occupancy().clone();
        env.sync_agent_positions();
        assert_eq!(&before, env.occupancy());
    }

    #[test]
    fn sync_restores_cells_an_agent_covered() {
        let mut env = Environment::new(30);
        env.add_obstacle(Obstacle::new(22.0, 20.0, 1.0, 1.0));
        env.add_target(Target::new(19.0, 21.0, 1.0));
        let zone_cells = env.occupancy().count(CellLabel::SafeZone);

        // A body wider than the obstacle clearance covers both in the map
        env.add_agent(20.0, 20.0, 2.0, 1.0);
        assert!(env.occupancy().count(CellLabel::Obstacle) < 4);
        assert_eq!(env.occupancy().count(CellLabel::Target), 0);

        env.agent_mut(0).set_position(25.0, 5.0);
        env.sync_agent_positions();
        assert_eq!(env.occupancy().count(CellLabel::Obstacle), 4);
        assert_eq!(env.occupancy().count(CellLabel::Target), 4);
        assert_eq!(env.occupancy().count(CellLabel::Agent), 16);
        assert_eq!(env.occupancy().count(CellLabel::SafeZone), zone_cells);
        assert_eq!(env.occupancy().get(20, 20), Some(CellLabel::Empty));
    }

    #[test]
    fn distance_sums_all_trajectories() {
        let mut env = Environment::new(20);
        env.add_agent(2.0, 2.0, 1.0, 1.0);
        env.add_agent(10.0, 10.0, 1.0, 1.0);
        env.add_agent(15.0, 15.0, 1.0, 1.0);
        env.agent_mut(0).set_position(5.0, 6.0);
        env.agent_mut(1).set_position(10.0, 12.0);
        env.agent_mut(1).set_position(10.0, 13.0);
        assert!((env.total_distance_covered() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn generate_is_reproducible_with_seed() {
        let cfg = SearchConfig::default().with_seed(683);
        let a = Environment::generate(&cfg, &mut StdRng::seed_from_u64(683)).unwrap();
        let b = Environment::generate(&cfg, &mut StdRng::seed_from_u64(683)).unwrap();
        assert_eq!(a.obstacles(), b.obstacles());
        assert_eq!(a.targets(), b.targets());
        assert_eq!(a.occupancy(), b.occupancy());
    }
}
