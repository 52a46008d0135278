//! Sequential-question variant: a fixed list of rounds answered in order.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::SessionError;

/// A player's answer, or a round's expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// A single option.
    Choice(String),
    /// Options in order.
    Sequence(Vec<String>),
    /// Options in any order.
    Set(Vec<String>),
}

impl Response {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Choice(_) => "choice",
            Self::Sequence(_) => "sequence",
            Self::Set(_) => "set",
        }
    }

    /// Number of positions the response is scored over.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Choice(_) => 1,
            Self::Sequence(steps) | Self::Set(steps) => steps.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: String,
    pub prompt: String,
    /// Options offered to the player; empty when the expected answer's
    /// own entries are shuffled for presentation.
    #[serde(default)]
    pub options: Vec<String>,
    pub expected: Response,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Points awarded per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundRule {
    /// `correct` for an exact answer, `-incorrect` otherwise.
    AllOrNothing { correct: i64, incorrect: i64 },
    /// `points` for every position that matches the expected sequence.
    PerPosition { points: i64 },
}

/// When the running total is floored at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampGranularity {
    /// After every round, so early losses cannot be carried forward.
    PerRound,
    /// Once, when the session is scored.
    #[default]
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSet {
    pub rounds: Vec<Round>,
    pub rule: RoundRule,
    #[serde(default)]
    pub clamp: ClampGranularity,
}

impl RoundSet {
    /// Highest total a perfect run reaches.
    #[must_use]
    pub fn max_total(&self) -> i64 {
        self.rounds
            .iter()
            .map(|round| match self.rule {
                RoundRule::AllOrNothing { correct, .. } => correct,
                RoundRule::PerPosition { points } => {
                    points.saturating_mul(crate::numbers::usize_to_i64(round.expected.len()))
                }
            })
            .sum()
    }
}

/// Outcome of one answered round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round_id: String,
    pub response: Response,
    pub correct: bool,
    pub points: i64,
    pub running_total: i64,
}

/// Answer history and running total for a [`RoundSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundProgress {
    outcomes: Vec<RoundOutcome>,
    total: i64,
}

impl RoundProgress {
    /// Index of the round waiting for an answer.
    #[must_use]
    pub fn current(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_finished(&self, set: &RoundSet) -> bool {
        self.outcomes.len() >= set.rounds.len()
    }

    #[must_use]
    pub const fn total(&self) -> i64 {
        self.total
    }

    #[must_use]
    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.correct).count()
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
        self.total = 0;
    }

    /// Score the current round and advance.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveRound`] once every round is answered
    /// and [`SessionError::ResponseKindMismatch`] when the response is not
    /// the kind the round expects.
    pub fn answer(
        &mut self,
        set: &RoundSet,
        response: Response,
    ) -> Result<&RoundOutcome, SessionError> {
        let round = set
            .rounds
            .get(self.current())
            .ok_or(SessionError::NoActiveRound)?;
        if round.expected.kind() != response.kind() {
            return Err(SessionError::ResponseKindMismatch(round.id.clone()));
        }

        let correct = matches(&round.expected, &response);
        let points = match set.rule {
            RoundRule::AllOrNothing {
                correct: reward,
                incorrect,
            } => {
                if correct {
                    reward
                } else {
                    -incorrect
                }
            }
            RoundRule::PerPosition { points } => {
                points.saturating_mul(crate::numbers::usize_to_i64(matching_positions(
                    &round.expected,
                    &response,
                )))
            }
        };

        let mut total = self.total.saturating_add(points);
        if set.clamp == ClampGranularity::PerRound {
            total = total.max(0);
        }
        self.total = total;
        self.outcomes.push(RoundOutcome {
            round_id: round.id.clone(),
            response,
            correct,
            points,
            running_total: total,
        });
        Ok(&self.outcomes[self.outcomes.len() - 1])
    }
}

fn matches(expected: &Response, given: &Response) -> bool {
    match (expected, given) {
        (Response::Choice(want), Response::Choice(got)) => want == got,
        (Response::Sequence(want), Response::Sequence(got)) => want == got,
        (Response::Set(want), Response::Set(got)) => {
            want.len() == got.len()
                && want.iter().collect::<BTreeSet<_>>() == got.iter().collect::<BTreeSet<_>>()
        }
        _ => false,
    }
}

fn matching_positions(expected: &Response, given: &Response) -> usize {
    match (expected, given) {
        (Response::Sequence(want), Response::Sequence(got)) => want
            .iter()
            .zip(got)
            .filter(|(want, got)| want == got)
            .count(),
        (Response::Set(want), Response::Set(got)) => {
            let given: BTreeSet<_> = got.iter().collect();
            want.iter().filter(|entry| given.contains(entry)).count()
        }
        _ => usize::from(matches(expected, given)),
    }
}
