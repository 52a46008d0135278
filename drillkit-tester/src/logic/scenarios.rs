use anyhow::{Result, ensure};
use std::sync::Arc;

use crate::logic::policy::PlayStrategy;
use crate::logic::tester::PlaythroughSummary;
use drillkit_game::{GameLibrary, Phase};

/// Assertion hook run after a play-through completes.
type ExpectationFn = Arc<dyn Fn(&PlaythroughSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct Expectation(ExpectationFn);

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation").finish()
    }
}

impl<F> From<F> for Expectation
where
    F: Fn(&PlaythroughSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// One game played under one strategy.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub game_id: String,
    pub strategy: PlayStrategy,
    pub expectations: Vec<Expectation>,
}

impl TestScenario {
    #[must_use]
    pub fn new(game_id: impl Into<String>, strategy: PlayStrategy) -> Self {
        let game_id = game_id.into();
        Self {
            name: format!("{game_id}/{strategy}"),
            game_id,
            strategy,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<Expectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    /// # Errors
    ///
    /// Returns the first failed expectation.
    pub fn evaluate(&self, summary: &PlaythroughSummary) -> Result<()> {
        for expectation in &self.expectations {
            (expectation.0)(summary)?;
        }
        Ok(())
    }
}

/// The standard checks for a strategy, plus the ones every run must pass.
#[must_use]
pub fn scenario_for(game_id: &str, strategy: PlayStrategy) -> TestScenario {
    let scenario = TestScenario::new(game_id, strategy)
        .with_expectation(replay_expectation)
        .with_expectation(bounded_score_expectation);
    match strategy {
        PlayStrategy::Perfect => scenario.with_expectation(perfect_expectation),
        PlayStrategy::Random => scenario.with_expectation(random_expectation),
        PlayStrategy::Careless => scenario.with_expectation(not_top_tier_expectation),
        PlayStrategy::Idle => scenario
            .with_expectation(not_top_tier_expectation)
            .with_expectation(idle_expectation),
    }
}

/// Every requested game crossed with every requested strategy.
#[must_use]
pub fn build_scenarios(
    library: &GameLibrary,
    games: &[String],
    strategies: &[PlayStrategy],
) -> Vec<TestScenario> {
    let ids: Vec<String> = if games.iter().any(|g| g == "all") {
        library.ids().map(str::to_string).collect()
    } else {
        games.to_vec()
    };
    ids.iter()
        .flat_map(|id| strategies.iter().map(move |strategy| scenario_for(id, *strategy)))
        .collect()
}

fn replay_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(
        summary.replay_matches,
        "replaying seed {} produced a different result",
        summary.seed
    );
    Ok(())
}

fn bounded_score_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(
        summary.result.is_some() == (summary.phase == Phase::Completed),
        "result present in phase {}",
        summary.phase
    );
    if let Some(result) = &summary.result {
        if let Some(max) = result.max_score {
            ensure!(
                result.raw_score <= max,
                "score {} exceeds maximum {max}",
                result.raw_score
            );
        }
        if let Some(percent) = result.percent {
            ensure!(percent <= 100, "percent {percent} above 100");
        }
    }
    Ok(())
}

fn perfect_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(
        summary.report.rejected == 0,
        "{} intents rejected",
        summary.report.rejected
    );
    let Some(result) = &summary.result else {
        anyhow::bail!("perfect play left the session {}", summary.phase);
    };
    ensure!(
        result.tier == Some(0),
        "perfect play scored {} ({})",
        result.raw_score,
        result.message
    );
    Ok(())
}

fn random_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(
        !summary.report.exhausted,
        "random play hit the step limit after {} steps",
        summary.report.steps
    );
    ensure!(summary.report.rejected <= summary.report.steps, "rejections exceed steps");
    Ok(())
}

fn not_top_tier_expectation(summary: &PlaythroughSummary) -> Result<()> {
    if let Some(result) = &summary.result {
        ensure!(
            result.tier != Some(0),
            "{} play reached the top tier with {}",
            summary.strategy,
            result.raw_score
        );
    }
    Ok(())
}

fn idle_expectation(summary: &PlaythroughSummary) -> Result<()> {
    ensure!(
        (summary.phase == Phase::Completed) == summary.timed,
        "idle {} game ended {}",
        summary.variant,
        summary.phase
    );
    Ok(())
}
