use super::{Environment, Obstacle, Target};
use crate::worldmodel::geometric::Point;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A frozen copy of the arena at one step, for replay and plotting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub episode: String,
    pub step: usize,
    pub width: usize,
    pub height: usize,
    /// Occupancy labels, row-major
    pub cells: Vec<Vec<u8>>,
    pub agents: Vec<Point>,
    /// Full path of each agent so far, by agent id
    pub trajectories: Vec<Vec<Point>>,
    pub obstacles: Vec<Obstacle>,
    pub targets: Vec<Target>,
}

impl GridSnapshot {
    pub fn capture(env: &Environment, episode: &str, step: usize) -> Self {
        GridSnapshot {
            episode: episode.to_string(),
            step,
            width: env.width(),
            height: env.height(),
            cells: env.occupancy().to_rows(),
            agents: env.agents().iter().map(|a| a.position()).collect(),
            trajectories: env.agents().iter().map(|a| a.trajectory().to_vec()).collect(),
            obstacles: env.obstacles().to_vec(),
            targets: env.targets().to_vec(),
        }
    }
}

/// Receives snapshots while an episode runs
pub trait SnapshotObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: GridSnapshot);
}

/// Thread-safe snapshot buffer.
///
/// Clones share storage, so one recorder can be handed to several episodes
/// running in parallel and read back afterwards.
#[derive(Clone, Debug, Default)]
pub struct SnapshotRecorder {
    inner: Arc<RwLock<Vec<GridSnapshot>>>,
}

impl SnapshotRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn last(&self) -> Option<GridSnapshot> {
        self.inner.read().last().cloned()
    }

    pub fn snapshots(&self) -> Vec<GridSnapshot> {
        self.inner.read().clone()
    }

    /// Snapshots of one episode, in the order they arrived
    pub fn for_episode(&self, episode: &str) -> Vec<GridSnapshot> {
        self.inner
            .read()
            .iter()
            .filter(|s| s.episode == episode)
            .cloned()
            .collect()
    }

    pub fn to_json(&self) -> String {
        let data = self.inner.read();
        serde_json::to_string(&*data).unwrap_or_else(|_| "[]".to_string())
    }
}

impl SnapshotObserver for SnapshotRecorder {
    fn on_snapshot(&self, snapshot: GridSnapshot) {
        self.inner.write().push(snapshot);
    }
}
