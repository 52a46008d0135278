use anyhow::{Context, Result};
use drillkit_game::{
    DriveReport, GameDefinition, GameLibrary, Phase, ScoringResult, Variant,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::logic::policy::PlayStrategy;
use crate::logic::scenarios::TestScenario;

const LOG_TARGET: &str = "drillkit_tester::runs";

/// Intent budget for a single play-through.
pub const MAX_DRIVE_STEPS: usize = 512;

/// Outcome of one automated play-through.
#[derive(Debug, Clone)]
pub struct PlaythroughSummary {
    pub game_id: String,
    pub variant: &'static str,
    pub timed: bool,
    pub strategy: PlayStrategy,
    pub seed: u64,
    pub report: DriveReport,
    pub phase: Phase,
    pub result: Option<ScoringResult>,
    /// A second run with the same seed produced the same result.
    pub replay_matches: bool,
}

/// Flat per-run row for CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaythroughRecord {
    pub game_id: String,
    pub strategy: String,
    pub seed: u64,
    pub phase: Phase,
    pub score: Option<u32>,
    pub percent: Option<u32>,
    pub tier: Option<usize>,
    pub steps: usize,
    pub rejected: usize,
}

impl From<&PlaythroughSummary> for PlaythroughRecord {
    fn from(summary: &PlaythroughSummary) -> Self {
        Self {
            game_id: summary.game_id.clone(),
            strategy: summary.strategy.label().to_string(),
            seed: summary.seed,
            phase: summary.phase,
            score: summary.result.as_ref().map(|r| r.raw_score),
            percent: summary.result.as_ref().and_then(|r| r.percent),
            tier: summary.result.as_ref().and_then(|r| r.tier),
            steps: summary.report.steps,
            rejected: summary.report.rejected,
        }
    }
}

/// Headless deterministic runner over the game library.
#[derive(Clone)]
pub struct GameTester {
    library: Arc<GameLibrary>,
    verbose: bool,
}

impl GameTester {
    pub const fn new(library: Arc<GameLibrary>, verbose: bool) -> Self {
        Self { library, verbose }
    }

    /// Load the embedded game library.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded definitions fail to validate.
    pub fn try_new(verbose: bool) -> Result<Self> {
        let library = GameLibrary::load_from_static().context("loading built-in games")?;
        Ok(Self::new(Arc::new(library), verbose))
    }

    #[must_use]
    pub fn library(&self) -> &GameLibrary {
        &self.library
    }

    fn game(&self, id: &str) -> Result<&GameDefinition> {
        self.library
            .get(id)
            .with_context(|| format!("unknown game '{id}'"))
    }

    fn drive_once(
        game: &GameDefinition,
        strategy: PlayStrategy,
        seed: u64,
    ) -> Result<(DriveReport, Phase, Option<ScoringResult>)> {
        let mut session = game
            .build_session(seed)
            .with_context(|| format!("opening {}", game.id))?;
        let mut policy = strategy.create_policy(game, seed);
        let report = session.drive(&mut policy, MAX_DRIVE_STEPS);
        Ok((report, session.phase(), session.result().cloned()))
    }

    /// Play `game_id` once under `strategy`, then replay it to check the
    /// run is reproducible.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or invalid game.
    pub fn play(&self, game_id: &str, strategy: PlayStrategy, seed: u64) -> Result<PlaythroughSummary> {
        let game = self.game(game_id)?;
        let (report, phase, result) = Self::drive_once(game, strategy, seed)?;
        let (_, replay_phase, replay_result) = Self::drive_once(game, strategy, seed)?;

        if self.verbose {
            let score = result
                .as_ref()
                .map_or_else(|| "-".to_string(), |r| r.raw_score.to_string());
            log::debug!(
                target: LOG_TARGET,
                "{game_id} {strategy} seed {seed} -> {phase} score {score} ({} steps, {} rejected)",
                report.steps,
                report.rejected
            );
        }

        Ok(PlaythroughSummary {
            game_id: game.id.clone(),
            variant: game.variant.label(),
            timed: matches!(game.variant, Variant::Timed { .. }),
            strategy,
            seed,
            report,
            phase,
            replay_matches: replay_phase == phase && replay_result == result,
            result,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    tester: GameTester,
}

impl LogicTester {
    pub const fn new(tester: GameTester) -> Self {
        Self { tester }
    }

    /// Run a scenario once per seed, `iterations` times each. Every
    /// play-through is also returned for CSV export.
    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> (Vec<ScenarioResult>, Vec<PlaythroughRecord>) {
        let mut results = Vec::new();
        let mut records = Vec::new();

        for &seed in seeds {
            if self.tester.verbose {
                log::debug!(target: LOG_TARGET, "scenario {} (seed {seed})", scenario.name);
            }
            results.push(self.run_single_scenario(scenario, seed, iterations, &mut records));
        }

        (results, records)
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
        records: &mut Vec<PlaythroughRecord>,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let outcome = self
                .tester
                .play(&scenario.game_id, scenario.strategy, iteration_seed)
                .and_then(|summary| {
                    records.push(PlaythroughRecord::from(&summary));
                    scenario.evaluate(&summary)
                });

            match outcome {
                Ok(()) => {
                    successes += 1;
                    performance_data.push(start_time.elapsed());
                }
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if self.tester.verbose {
                        log::debug!(target: LOG_TARGET, "{} failed: {message}", scenario.name);
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scenarios::scenario_for;

    fn tester() -> GameTester {
        GameTester::try_new(false).unwrap()
    }

    #[test]
    fn perfect_play_completes_and_replays() {
        let summary = tester().play("hazard_sort", PlayStrategy::Perfect, 9).unwrap();
        assert_eq!(summary.phase, Phase::Completed);
        assert!(summary.replay_matches);
        assert_eq!(summary.result.unwrap().raw_score, 120);
    }

    #[test]
    fn unknown_games_are_errors() {
        let err = tester().play("tetris", PlayStrategy::Idle, 1).unwrap_err();
        assert!(err.to_string().contains("tetris"));
    }

    #[test]
    fn scenario_results_count_iterations() {
        let logic = LogicTester::new(tester());
        let scenario = scenario_for("pack_your_bag", PlayStrategy::Perfect);
        let (results, records) = logic.run_scenario(&scenario, &[1, 2], 3);
        assert_eq!(results.len(), 2);
        assert_eq!(records.len(), 6);
        assert!(results.iter().all(|r| r.passed && r.successful_iterations == 3));
    }

    #[test]
    fn verbose_runs_match_quiet_runs() {
        let scenario = scenario_for("hazard_sort", PlayStrategy::Careless);
        let quiet = LogicTester::new(tester()).run_scenario(&scenario, &[5], 2).1;
        let verbose = LogicTester::new(GameTester::try_new(true).unwrap())
            .run_scenario(&scenario, &[5], 2)
            .1;
        let scores = |records: &[PlaythroughRecord]| -> Vec<Option<u32>> {
            records.iter().map(|record| record.score).collect()
        };
        assert_eq!(scores(&quiet), scores(&verbose));
    }

    #[test]
    fn durations_serialize_as_millis() {
        let result = ScenarioResult {
            scenario_name: "x".into(),
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"][0], 12);
    }
}
