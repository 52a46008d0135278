//! Scoring output and the message tiers that label it.
use serde::{Deserialize, Serialize};

/// Verdict for a single scored subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// In the right place.
    Correct,
    /// Close but not exact (one tier away, or a near proximity band).
    Partial,
    /// Placed somewhere wrong.
    Incorrect,
    /// Left unplaced although it had a destination.
    Missed,
    /// A distractor correctly left out.
    Absent,
}

impl Outcome {
    /// Whether the outcome counts towards the `correct` tally.
    #[must_use]
    pub const fn is_correct(self) -> bool {
        matches!(self, Self::Correct | Self::Absent)
    }
}

/// One line of the per-item breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Item id, pair id or round id this line is about.
    pub subject: String,
    pub label: String,
    pub outcome: Outcome,
    pub points: i64,
    /// Explanation shown for anything that was not correct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Points added or removed by a modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub source: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub raw_score: u32,
    #[serde(default)]
    pub max_score: Option<u32>,
    /// `raw_score` as a floored percentage of `max_score`, when known.
    #[serde(default)]
    pub percent: Option<u32>,
    pub correct: usize,
    pub total: usize,
    pub breakdown: Vec<Verdict>,
    pub contributions: Vec<Contribution>,
    pub message: String,
    /// Index of the matched tier, `None` for the fallback message.
    #[serde(default)]
    pub tier: Option<usize>,
}

impl ScoringResult {
    /// Verdicts that were not correct, in breakdown order.
    pub fn mistakes(&self) -> impl Iterator<Item = &Verdict> {
        self.breakdown
            .iter()
            .filter(|verdict| !verdict.outcome.is_correct())
    }
}

/// Which value message tiers compare against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierBasis {
    #[default]
    Raw,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub min: u32,
    pub message: String,
}

/// Score-dependent feedback. Tiers are listed from highest to lowest
/// threshold; the first one the value reaches wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTiers {
    #[serde(default)]
    pub basis: TierBasis,
    #[serde(default)]
    pub tiers: Vec<Tier>,
    #[serde(default)]
    pub fallback: String,
}

impl MessageTiers {
    /// Pick the message for a score.
    #[must_use]
    pub fn select(&self, raw: u32, percent: Option<u32>) -> (Option<usize>, &str) {
        let value = match self.basis {
            TierBasis::Raw => raw,
            TierBasis::Percent => percent.unwrap_or(0),
        };
        self.tiers
            .iter()
            .position(|tier| value >= tier.min)
            .map_or((None, self.fallback.as_str()), |index| {
                (Some(index), self.tiers[index].message.as_str())
            })
    }

    #[must_use]
    pub fn is_descending(&self) -> bool {
        self.tiers.windows(2).all(|pair| pair[0].min >= pair[1].min)
    }
}
