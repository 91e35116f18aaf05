use crate::core::config::{RunConfig, SearchConfig};
use crate::core::error::SimResult;
use crate::swarm::{SearchStrategy, StrategyKind};
use crate::worldmodel::{Environment, SnapshotObserver};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Final tuple of one episode
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    /// Steps actually executed
    pub steps: usize,
    pub targets_found: usize,
    pub total_targets: usize,
    /// Sum of per-agent path lengths
    pub total_distance: f64,
}

impl EpisodeOutcome {
    pub fn completed(&self) -> bool {
        self.targets_found == self.total_targets
    }
}

/// One row of the results table: configuration summary plus outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub strategy: String,
    pub side: usize,
    pub seed: Option<u64>,
    /// Obstacles actually placed, clusters included
    pub obstacles: usize,
    pub agents: usize,
    pub targets: usize,
    #[serde(flatten)]
    pub outcome: EpisodeOutcome,
}

impl EpisodeRecord {
    pub fn to_json_line(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Drives one strategy over one arena until every target is found or the
/// step budget runs out.
pub struct EpisodeRunner {
    name: String,
    strategy: Box<dyn SearchStrategy>,
    env: Environment,
    run: RunConfig,
    rng: StdRng,
    seed: Option<u64>,
    observer: Option<Arc<dyn SnapshotObserver>>,
}

impl EpisodeRunner {
    /// Generates the arena from `config` and pairs it with a default-parameter strategy.
    pub fn new(kind: StrategyKind, config: &SearchConfig, run: RunConfig) -> SimResult<Self> {
        Self::with_strategy(kind.build(), config, run)
    }

    pub fn with_strategy(
        strategy: Box<dyn SearchStrategy>,
        config: &SearchConfig,
        run: RunConfig,
    ) -> SimResult<Self> {
        run.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let env = Environment::generate(config, &mut rng)?;
        let name = match config.seed {
            Some(seed) => format!("{}-{}-{}", strategy.name(), config.side, seed),
            None => format!("{}-{}", strategy.name(), config.side),
        };
        Ok(EpisodeRunner {
            name,
            strategy,
            env,
            run,
            rng,
            seed: config.seed,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn SnapshotObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    fn emit(&self, step: usize) {
        if let Some(observer) = &self.observer {
            observer.on_snapshot(self.env.snapshot(&self.name, step));
        }
    }

    /// Runs the step loop to termination.
    ///
    /// At most one target is claimed per step, by the first agent in roster
    /// order that detects one.
    pub fn run(&mut self) -> EpisodeOutcome {
        let total_targets = self.env.targets().len();
        let rule = self.strategy.detection_rule();
        self.strategy.initialize(&mut self.env, &self.run, &mut self.rng);

        info!(
            "🚀 [Episode] {} started: {} agents, {} targets, {} obstacles",
            self.name,
            self.env.agents().len(),
            total_targets,
            self.env.obstacles().len()
        );

        let mut steps = 0;
        let mut found = 0;
        while found < total_targets && steps < self.run.max_steps {
            self.strategy.step(&mut self.env, steps, &mut self.rng);
            self.env.sync_agent_positions();

            if let Some(detection) = self.env.detect_target(rule) {
                let target = self.env.claim_target(detection);
                self.strategy.on_target_removed(&mut self.env, &target);
                found += 1;
                debug!(
                    "[Episode] {} step {}: agent {} found target at ({:.1}, {:.1}), {}/{}",
                    self.name, steps, detection.agent, target.x, target.y, found, total_targets
                );
            }

            if self.run.snapshot_every > 0 && steps % self.run.snapshot_every == 0 {
                self.emit(steps);
            }
            steps += 1;
        }
        self.emit(steps);

        let outcome = EpisodeOutcome {
            steps,
            targets_found: found,
            total_targets,
            total_distance: self.env.total_distance_covered(),
        };
        info!(
            "🏁 [Episode] {} finished after {} steps: {}/{} targets, distance {:.1}",
            self.name, outcome.steps, outcome.targets_found, outcome.total_targets, outcome.total_distance
        );
        outcome
    }

    /// Runs the episode and folds the result into a table row.
    pub fn run_to_record(mut self) -> EpisodeRecord {
        let outcome = self.run();
        EpisodeRecord {
            strategy: self.strategy.name().to_string(),
            side: self.env.width(),
            seed: self.seed,
            obstacles: self.env.obstacles().len(),
            agents: self.env.agents().len(),
            targets: outcome.total_targets,
            outcome,
        }
    }
}

/// Builds, runs and summarises one episode.
pub fn run_episode(kind: StrategyKind, config: &SearchConfig, run: RunConfig) -> SimResult<EpisodeRecord> {
    Ok(EpisodeRunner::new(kind, config, run)?.run_to_record())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{ObstacleSpec, TargetSpec};
    use crate::core::error::SimError;
    use crate::worldmodel::geometric::Point;
    use crate::worldmodel::{SnapshotRecorder, Target};

    fn corridor() -> SearchConfig {
        SearchConfig {
            side: 40,
            obstacles: ObstacleSpec::Explicit(vec![]),
            targets: TargetSpec::Explicit(vec![Target::new(20.0, 20.0, 1.0)]),
            agent_count: 1,
            agent_radius: 3.0,
            agent_positions: Some(vec![Point::new(16.0, 20.0)]),
            seed: Some(3),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn target_in_reach_is_found_on_first_step() {
        let record = run_episode(StrategyKind::RandomWalk, &corridor(), RunConfig::default()).unwrap();
        // Already within 3 + 1 + 3 of the target, wherever the first move goes
        assert_eq!(record.outcome.steps, 1);
        assert_eq!(record.outcome.targets_found, 1);
        assert!(record.outcome.completed());
        assert_eq!(record.strategy, "Random");
        assert_eq!(record.seed, Some(3));
    }

    #[test]
    fn budget_caps_the_loop() {
        let config = SearchConfig {
            targets: TargetSpec::Explicit(vec![Target::new(38.0, 38.0, 0.5)]),
            agent_positions: Some(vec![Point::new(4.0, 4.0)]),
            ..corridor()
        };
        let run = RunConfig {
            max_steps: 3,
            ..RunConfig::default()
        };
        let outcome = EpisodeRunner::new(StrategyKind::RandomWalk, &config, run).unwrap().run();
        assert_eq!(outcome.steps, 3);
        assert_eq!(outcome.targets_found, 0);
        assert!(outcome.total_distance <= 6.0 + 1e-9);
    }

    #[test]
    fn observer_gets_periodic_and_final_snapshots() {
        let recorder = SnapshotRecorder::new();
        let config = SearchConfig {
            targets: TargetSpec::Explicit(vec![]),
            ..corridor()
        };
        let run = RunConfig {
            max_steps: 25,
            snapshot_every: 10,
            ..RunConfig::default()
        };
        let outcome = EpisodeRunner::new(StrategyKind::Rdpso, &config, run)
            .unwrap()
            .with_observer(Arc::new(recorder.clone()))
            .with_name("quiet-arena")
            .run();

        // No targets: terminates before the first step
        assert_eq!(outcome.steps, 0);
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.for_episode("quiet-arena").len(), 1);
    }

    #[test]
    fn snapshots_follow_cadence() {
        let recorder = SnapshotRecorder::new();
        let config = SearchConfig {
            targets: TargetSpec::Explicit(vec![Target::new(38.0, 38.0, 0.5)]),
            agent_positions: Some(vec![Point::new(4.0, 4.0)]),
            ..corridor()
        };
        let run = RunConfig {
            max_steps: 25,
            snapshot_every: 10,
            ..RunConfig::default()
        };
        EpisodeRunner::new(StrategyKind::RandomWalk, &config, run)
            .unwrap()
            .with_observer(Arc::new(recorder.clone()))
            .run();

        let steps: Vec<usize> = recorder.snapshots().iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![0, 10, 20, 25]);
    }

    #[test]
    fn invalid_run_config_is_rejected() {
        let run = RunConfig {
            step_size: 0.0,
            ..RunConfig::default()
        };
        let err = EpisodeRunner::new(StrategyKind::Dpso, &corridor(), run).err();
        assert!(matches!(err, Some(SimError::InvalidConfig(_))));
    }

    #[test]
    fn record_serialises_flat() {
        let record = run_episode(StrategyKind::RandomWalk, &corridor(), RunConfig::default()).unwrap();
        let line = record.to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["strategy"], "Random");
        assert_eq!(value["targets_found"], 1);
        assert_eq!(value["side"], 40);
        assert_eq!(value["obstacles"], 0);
    }
}
