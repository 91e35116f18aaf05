use crate::core::config::{ObstacleSpec, RunConfig, SearchConfig, TargetSpec};
use crate::core::error::{SimError, SimResult};
use crate::core::runner::{run_episode, EpisodeRecord};
use crate::swarm::StrategyKind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One episode to run: strategy, arena and loop parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperimentJob {
    pub strategy: StrategyKind,
    pub config: SearchConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Axes of a parameter sweep. Every combination becomes one job.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub sides: Vec<usize>,
    pub seeds: Vec<u64>,
    pub obstacle_counts: Vec<usize>,
    pub agent_counts: Vec<usize>,
    pub target_counts: Vec<usize>,
    pub strategies: Vec<StrategyKind>,
    /// Everything the axes do not override
    pub base: SearchConfig,
    pub run: RunConfig,
}

impl Default for SweepGrid {
    fn default() -> Self {
        SweepGrid {
            sides: vec![100],
            seeds: (0..10).collect(),
            obstacle_counts: vec![5, 10, 15],
            agent_counts: vec![3, 6, 9],
            target_counts: vec![1, 5, 10],
            strategies: StrategyKind::ALL.to_vec(),
            base: SearchConfig::default(),
            run: RunConfig::default(),
        }
    }
}

/// Independent episodes run in parallel.
///
/// Each job builds its own arena, agents and generator; nothing is shared
/// between episodes.
#[derive(Clone, Debug, Default)]
pub struct ExperimentBatch {
    jobs: Vec<ExperimentJob>,
}

impl ExperimentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, strategy: StrategyKind, config: SearchConfig, run: RunConfig) {
        self.jobs.push(ExperimentJob {
            strategy,
            config,
            run,
        });
    }

    pub fn jobs(&self) -> &[ExperimentJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Cartesian product of the grid's axes, strategies varying fastest.
    pub fn sweep(grid: &SweepGrid) -> Self {
        let (obstacle_range, target_half) = random_shapes(&grid.base);
        let mut batch = ExperimentBatch::new();

        for &side in &grid.sides {
            for &seed in &grid.seeds {
                for &obstacles in &grid.obstacle_counts {
                    for &agents in &grid.agent_counts {
                        for &targets in &grid.target_counts {
                            let config = SearchConfig {
                                side,
                                seed: Some(seed),
                                obstacles: ObstacleSpec::Random {
                                    count: obstacles,
                                    half_size_range: obstacle_range,
                                },
                                targets: TargetSpec::Random {
                                    count: targets,
                                    half_size: target_half,
                                },
                                agent_count: agents,
                                agent_positions: None,
                                ..grid.base.clone()
                            };
                            for &strategy in &grid.strategies {
                                batch.push(strategy, config.clone(), grid.run.clone());
                            }
                        }
                    }
                }
            }
        }
        batch
    }

    /// Reads jobs from JSONL, one job per line. Blank lines are skipped.
    pub fn from_jsonl(jsonl: &str) -> SimResult<Self> {
        let jobs = jsonl
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(SimError::from))
            .collect::<SimResult<Vec<ExperimentJob>>>()?;
        Ok(ExperimentBatch { jobs })
    }

    /// Runs every job; results come back in job order.
    pub fn run(&self) -> Vec<SimResult<EpisodeRecord>> {
        info!("📊 [Batch] running {} episodes", self.jobs.len());

        let results: Vec<SimResult<EpisodeRecord>> = self
            .jobs
            .par_iter()
            .map(|job| run_episode(job.strategy, &job.config, job.run.clone()))
            .collect();

        let completed = results
            .iter()
            .filter(|r| matches!(r, Ok(record) if record.outcome.completed()))
            .count();
        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            warn!("⚠️ [Batch] {} episodes could not be set up", failed);
        }
        info!(
            "📈 [Batch] complete: {}/{} episodes found every target",
            completed,
            results.len()
        );
        results
    }
}

/// Serialises the successful records as JSONL, skipping failed jobs.
pub fn to_jsonl(results: &[SimResult<EpisodeRecord>]) -> SimResult<String> {
    let mut out = String::new();
    for record in results.iter().flatten() {
        out.push_str(&record.to_json_line()?);
        out.push('\n');
    }
    Ok(out)
}

/// Shape parameters for the swept random obstacles and targets, taken from
/// the base config when it is random and from the defaults otherwise.
fn random_shapes(base: &SearchConfig) -> ((f64, f64), f64) {
    let obstacle_range = match &base.obstacles {
        ObstacleSpec::Random { half_size_range, .. } => *half_size_range,
        ObstacleSpec::Explicit(_) => (1.0, 5.0),
    };
    let target_half = match &base.targets {
        TargetSpec::Random { half_size, .. } => *half_size,
        TargetSpec::Explicit(_) => 1.0,
    };
    (obstacle_range, target_half)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> SweepGrid {
        SweepGrid {
            sides: vec![40],
            seeds: vec![1, 2],
            obstacle_counts: vec![0, 2],
            agent_counts: vec![2],
            target_counts: vec![1],
            strategies: vec![StrategyKind::RandomWalk, StrategyKind::Rdpso],
            base: SearchConfig::default(),
            run: RunConfig {
                max_steps: 50,
                ..RunConfig::default()
            },
        }
    }

    #[test]
    fn sweep_builds_full_product() {
        let batch = ExperimentBatch::sweep(&small_grid());
        assert_eq!(batch.len(), 2 * 2 * 2);
        assert_eq!(batch.jobs()[0].strategy, StrategyKind::RandomWalk);
        assert_eq!(batch.jobs()[1].strategy, StrategyKind::Rdpso);
        assert_eq!(batch.jobs()[0].config.seed, Some(1));
        assert_eq!(batch.jobs()[2].config.obstacles.requested(), 2);
        assert!(batch.jobs().iter().all(|j| j.config.agent_count == 2));
    }

    #[test]
    fn results_keep_job_order() {
        let batch = ExperimentBatch::sweep(&small_grid());
        let results = batch.run();
        assert_eq!(results.len(), batch.len());
        for (job, result) in batch.jobs().iter().zip(&results) {
            let record = result.as_ref().unwrap();
            assert_eq!(record.strategy, job.strategy.name());
            assert_eq!(record.seed, job.config.seed);
            assert!(record.outcome.steps <= 50);
        }
    }

    #[test]
    fn seeded_jobs_are_reproducible() {
        let mut batch = ExperimentBatch::new();
        let config = SearchConfig::default().with_seed(11);
        let run = RunConfig {
            max_steps: 80,
            ..RunConfig::default()
        };
        batch.push(StrategyKind::E2rpso, config.clone(), run.clone());
        batch.push(StrategyKind::E2rpso, config, run);

        let results = batch.run();
        let a = results[0].as_ref().unwrap();
        let b = results[1].as_ref().unwrap();
        assert_eq!(a.outcome, b.outcome);
    }

    #[test]
    fn bad_job_fails_alone() {
        let mut batch = ExperimentBatch::new();
        batch.push(
            StrategyKind::RandomWalk,
            SearchConfig {
                side: 0,
                ..SearchConfig::default()
            },
            RunConfig::default(),
        );
        batch.push(
            StrategyKind::RandomWalk,
            SearchConfig {
                side: 40,
                seed: Some(5),
                ..SearchConfig::default()
            },
            RunConfig {
                max_steps: 10,
                ..RunConfig::default()
            },
        );

        let results = batch.run();
        assert!(matches!(results[0], Err(SimError::InvalidConfig(_))));
        assert!(results[1].is_ok());
        assert_eq!(to_jsonl(&results).unwrap().lines().count(), 1);
    }

    #[test]
    fn jobs_parse_from_jsonl() {
        let jsonl = r#"
{"strategy": "dPSO", "config": {"side": 50, "seed": 3}}
{"strategy": "Stochastic_search", "config": {"side": 60}, "run": {"max_steps": 20}}
"#;
        let batch = ExperimentBatch::from_jsonl(jsonl).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.jobs()[0].strategy, StrategyKind::Dpso);
        assert_eq!(batch.jobs()[0].run.max_steps, 1000);
        assert_eq!(batch.jobs()[1].strategy, StrategyKind::Exhaustive);
        assert_eq!(batch.jobs()[1].run.max_steps, 20);

        assert!(ExperimentBatch::from_jsonl("{not json}").is_err());
    }
}
