use crate::core::error::{SimError, SimResult};
use crate::worldmodel::geometric::{Point, Shape};
use crate::worldmodel::{Obstacle, Target};
use serde::{Deserialize, Serialize};

/// How obstacles enter the arena
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleSpec {
    /// Random primary obstacles, each possibly growing an adjacent cluster.
    /// Half-extents are drawn uniformly from `half_size_range`.
    Random {
        count: usize,
        half_size_range: (f64, f64),
    },
    Explicit(Vec<Obstacle>),
}

impl ObstacleSpec {
    pub fn requested(&self) -> usize {
        match self {
            ObstacleSpec::Random { count, .. } => *count,
            ObstacleSpec::Explicit(list) => list.len(),
        }
    }
}

/// How targets enter the arena
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpec {
    Random { count: usize, half_size: f64 },
    Explicit(Vec<Target>),
}

impl TargetSpec {
    pub fn requested(&self) -> usize {
        match self {
            TargetSpec::Random { count, .. } => *count,
            TargetSpec::Explicit(list) => list.len(),
        }
    }
}

/// Construction parameters for one episode's arena and agents
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Width and height of the square arena
    pub side: usize,
    pub obstacles: ObstacleSpec,
    pub targets: TargetSpec,
    pub agent_count: usize,
    pub agent_half_size: f64,
    /// Detection radius, also the clearance kept from obstacles
    pub agent_radius: f64,
    /// Explicit start positions; the default three-row formation otherwise
    pub agent_positions: Option<Vec<Point>>,
    pub seed: Option<u64>,
    /// Cap on random draws per placed item
    pub max_placement_attempts: usize,
    /// Cap on obstacles grown from one primary obstacle, the primary included
    pub max_cluster_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            side: 100,
            obstacles: ObstacleSpec::Random {
                count: 5,
                half_size_range: (1.0, 5.0),
            },
            targets: TargetSpec::Random {
                count: 5,
                half_size: 1.0,
            },
            agent_count: 3,
            agent_half_size: 1.0,
            agent_radius: 3.0,
            agent_positions: None,
            seed: None,
            max_placement_attempts: 10_000,
            max_cluster_size: 8,
        }
    }
}

impl SearchConfig {
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects parameters the placement routines and strategies cannot honour.
    pub fn validate(&self) -> SimResult<()> {
        if self.side == 0 {
            return Err(SimError::invalid("arena side must be positive"));
        }
        let side = self.side as f64;

        if !(self.agent_radius > 0.0) || !self.agent_radius.is_finite() {
            return Err(SimError::invalid("agent radius must be positive and finite"));
        }
        if !(self.agent_half_size > 0.0) || !self.agent_half_size.is_finite() {
            return Err(SimError::invalid("agent half-size must be positive and finite"));
        }
        if self.max_placement_attempts == 0 {
            return Err(SimError::invalid("max_placement_attempts must be positive"));
        }
        if self.max_cluster_size == 0 {
            return Err(SimError::invalid("max_cluster_size must be at least 1"));
        }

        if let ObstacleSpec::Random { half_size_range: (lo, hi), .. } = self.obstacles {
            if !lo.is_finite() || !hi.is_finite() || !(lo > 0.0) || hi < lo {
                return Err(SimError::invalid(format!(
                    "obstacle half-size range [{}, {}] is empty or non-positive",
                    lo, hi
                )));
            }
            if 2.0 * hi >= side {
                return Err(SimError::invalid(format!(
                    "obstacle half-size {} does not fit in arena side {}",
                    hi, self.side
                )));
            }
        }

        if let TargetSpec::Random { half_size, .. } = self.targets {
            if !half_size.is_finite() || !(half_size > 0.0) || 2.0 * half_size >= side {
                return Err(SimError::invalid(format!(
                    "target half-size {} is non-positive or does not fit",
                    half_size
                )));
            }
        }

        if let Some(positions) = &self.agent_positions {
            if positions.len() != self.agent_count {
                return Err(SimError::invalid(format!(
                    "{} agent positions given for {} agents",
                    positions.len(),
                    self.agent_count
                )));
            }
        }
        if let ObstacleSpec::Explicit(list) = &self.obstacles {
            for (i, o) in list.iter().enumerate() {
                if !inside(o.x, o.y, o.half_width, o.half_height, side) {
                    return Err(SimError::invalid(format!(
                        "obstacle {} at ({:.1}, {:.1}) leaves the arena",
                        i, o.x, o.y
                    )));
                }
            }
        }
        if let TargetSpec::Explicit(list) = &self.targets {
            for (i, t) in list.iter().enumerate() {
                if !inside(t.x, t.y, t.half_size, t.half_size, side) {
                    return Err(SimError::invalid(format!(
                        "target {} at ({:.1}, {:.1}) leaves the arena",
                        i, t.x, t.y
                    )));
                }
            }
        }

        let r = self.agent_radius;
        for (i, p) in self.start_positions().iter().enumerate() {
            if !inside(p.x, p.y, r, r, side) {
                return Err(SimError::invalid(format!(
                    "agent {} at ({:.1}, {:.1}) is within its radius {} of a wall",
                    i, p.x, p.y, r
                )));
            }
            if let ObstacleSpec::Explicit(list) = &self.obstacles {
                let body = Shape::Rect {
                    x: p.x,
                    y: p.y,
                    half_w: self.agent_half_size,
                    half_h: self.agent_half_size,
                };
                if let Some(j) = list.iter().position(|o| body.overlaps(&o.shape())) {
                    return Err(SimError::invalid(format!(
                        "agent {} starts on obstacle {}",
                        i, j
                    )));
                }
            }
        }

        Ok(())
    }

    /// Start positions: explicit, or rows of three stepping right from the left wall.
    pub fn start_positions(&self) -> Vec<Point> {
        if let Some(positions) = &self.agent_positions {
            return positions.clone();
        }
        let mid = self.side as f64 / 2.0;
        let spacing = self.agent_half_size * 3.0;
        (0..self.agent_count)
            .map(|i| {
                let x = self.agent_radius + (i / 3) as f64 * spacing;
                let y = mid + ((i % 3) as f64 - 1.0) * spacing;
                Point::new(x, y)
            })
            .collect()
    }
}

/// Box of half-extents (hw, hh) at (x, y) lies within [0, side]² on both axes.
fn inside(x: f64, y: f64, hw: f64, hh: f64, side: f64) -> bool {
    x - hw >= 0.0 && y - hh >= 0.0 && x + hw <= side && y + hh <= side
}

/// Step-loop parameters shared by every strategy
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_steps: usize,
    /// Velocity limit for the swarm strategies, move length for the others
    pub step_size: f64,
    /// Snapshot cadence for an attached observer; 0 disables periodic snapshots
    pub snapshot_every: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            max_steps: 1000,
            step_size: 2.0,
            snapshot_every: 10,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.step_size > 0.0) {
            return Err(SimError::invalid("step size must be positive"));
        }
        Ok(())
    }
}
