//! Pure scoring: final placement plus play statistics in, result out.
//!
//! A rule is a list of additive terms evaluated against the placement and
//! ground truth, followed by modifiers driven by time and attempts. The sum
//! is floored at zero and then capped by the optional ceiling.
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Item, ItemId};
use crate::constants::{LOG_TARGET_SCORING, PERCENT_SCALE};
use crate::numbers::{
    floor_percent, i64_to_f64, non_negative_score, round_f64_to_i64, usize_to_f64, usize_to_i64,
};
use crate::placement::{Location, Placement};
use crate::result::{Contribution, MessageTiers, Outcome, ScoringResult, Verdict};
use crate::rounds::{RoundProgress, RoundSet};
use crate::zones::ZoneSet;

/// Counters the session hands to scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayStats {
    pub elapsed_secs: u32,
    /// Seconds left on the countdown; `None` for untimed games.
    pub remaining_secs: Option<u32>,
    pub attempts: u32,
    pub mistakes: u32,
}

/// Threshold band used by time and attempt modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub limit: u32,
    pub points: i64,
}

/// Distance band for proximity scoring; applies when `distance < within`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceBand {
    pub within: f64,
    pub points: i64,
}

/// Which counter an attempt modifier reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptCount {
    #[default]
    All,
    Mistakes,
}

/// What makes a pair group count for [`ScoreTerm::PairBonus`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairAlignment {
    /// The members are linked to each other.
    #[default]
    Linked,
    /// Both members sit in zones, and not the same one.
    Placed,
}

impl PairAlignment {
    fn holds(self, placement: &Placement, a: &ItemId, b: &ItemId) -> bool {
        match self {
            Self::Linked => placement.partner(a) == Some(b),
            Self::Placed => matches!(
                (placement.location(a), placement.location(b)),
                (Some(Location::Zone(left)), Some(Location::Zone(right))) if left != right
            ),
        }
    }
}

impl AttemptCount {
    const fn read(self, stats: &PlayStats) -> u32 {
        match self {
            Self::All => stats.attempts,
            Self::Mistakes => stats.mistakes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreTerm {
    /// Right zone earns `reward`, any other zone costs `penalty`.
    Binary {
        reward: i64,
        penalty: i64,
        #[serde(default)]
        unplaced_penalty: i64,
    },
    /// Zones are ordered tiers; one tier off earns `partial`.
    PriorityTiers { full: i64, partial: i64, penalty: i64 },
    /// `bonus` for every pair group whose members line up.
    PairBonus {
        bonus: i64,
        #[serde(default)]
        alignment: PairAlignment,
    },
    Flat { points: i64 },
    /// Distance from the placed point to the item's target.
    Proximity { bands: Vec<DistanceBand> },
    /// Share of correctly placed items scaled to `scale`.
    Accuracy { scale: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Modifier {
    /// First band whose limit the remaining time exceeds.
    RemainingBands { bands: Vec<Band> },
    RemainingPerSecond { points: i64 },
    /// Subtract `elapsed / divisor`, at most `cap`.
    ElapsedPenalty { divisor: u32, cap: i64 },
    /// First band whose limit the elapsed time is under.
    ElapsedBands { bands: Vec<Band> },
    /// Subtract `points` per attempt, at most `cap`.
    PenaltyPerAttempt {
        points: i64,
        cap: i64,
        #[serde(default)]
        counts: AttemptCount,
    },
    /// First band whose limit the attempt count does not exceed.
    AccuracyBands {
        bands: Vec<Band>,
        #[serde(default)]
        counts: AttemptCount,
    },
    /// `points` for every unused mistake.
    Allowance { allowance: u32, points: i64 },
}

impl Modifier {
    const fn label(&self) -> &'static str {
        match self {
            Self::RemainingBands { .. } => "remaining_bands",
            Self::RemainingPerSecond { .. } => "remaining_per_second",
            Self::ElapsedPenalty { .. } => "elapsed_penalty",
            Self::ElapsedBands { .. } => "elapsed_bands",
            Self::PenaltyPerAttempt { .. } => "penalty_per_attempt",
            Self::AccuracyBands { .. } => "accuracy_bands",
            Self::Allowance { .. } => "allowance",
        }
    }

    fn points(&self, stats: &PlayStats) -> i64 {
        match self {
            Self::RemainingBands { bands } => {
                let remaining = stats.remaining_secs.unwrap_or(0);
                first_band(bands, |limit| remaining > limit)
            }
            Self::RemainingPerSecond { points } => {
                i64::from(stats.remaining_secs.unwrap_or(0)).saturating_mul(*points)
            }
            Self::ElapsedPenalty { divisor, cap } => {
                if *divisor == 0 {
                    return 0;
                }
                -i64::from(stats.elapsed_secs / divisor).min(*cap)
            }
            Self::ElapsedBands { bands } => first_band(bands, |limit| stats.elapsed_secs < limit),
            Self::PenaltyPerAttempt { points, cap, counts } => {
                -i64::from(counts.read(stats))
                    .saturating_mul(*points)
                    .min(*cap)
            }
            Self::AccuracyBands { bands, counts } => {
                let count = counts.read(stats);
                first_band(bands, |limit| count <= limit)
            }
            Self::Allowance { allowance, points } => {
                i64::from(allowance.saturating_sub(stats.mistakes)).saturating_mul(*points)
            }
        }
    }
}

fn first_band(bands: &[Band], reached: impl Fn(u32) -> bool) -> i64 {
    bands
        .iter()
        .find(|band| reached(band.limit))
        .map_or(0, |band| band.points)
}

/// Declarative scoring configuration for one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    #[serde(default)]
    pub terms: Vec<ScoreTerm>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /// Upper bound applied after the zero floor.
    #[serde(default)]
    pub ceiling: Option<u32>,
    /// Reference maximum for percentages. Derived from the terms when
    /// absent and no modifier can move the score.
    #[serde(default)]
    pub max_score: Option<u32>,
    #[serde(default)]
    pub messages: MessageTiers,
}

impl ScoringRule {
    /// Best achievable score for a catalog, when it can be known up front.
    #[must_use]
    pub fn max_score(&self, catalog: &Catalog) -> Option<u32> {
        if self.max_score.is_some() {
            return self.max_score;
        }
        if !self.modifiers.is_empty() {
            return None;
        }
        let destined = usize_to_i64(catalog.iter().filter(|item| item.zone.is_some()).count());
        let targeted = usize_to_i64(catalog.iter().filter(|item| item.target.is_some()).count());
        let total = self
            .terms
            .iter()
            .map(|term| match term {
                ScoreTerm::Binary { reward, .. } => reward.saturating_mul(destined),
                ScoreTerm::PriorityTiers { full, .. } => full.saturating_mul(destined),
                ScoreTerm::PairBonus { bonus, .. } => {
                    bonus.saturating_mul(usize_to_i64(catalog.pair_count()))
                }
                ScoreTerm::Flat { points } => *points,
                ScoreTerm::Proximity { bands } => bands
                    .iter()
                    .map(|band| band.points)
                    .max()
                    .unwrap_or(0)
                    .saturating_mul(targeted),
                ScoreTerm::Accuracy { scale } => *scale,
            })
            .fold(0_i64, i64::saturating_add);
        Some(self.cap(total))
    }

    fn cap(&self, total: i64) -> u32 {
        let floored = non_negative_score(total);
        self.ceiling.map_or(floored, |ceiling| floored.min(ceiling))
    }
}

/// Score a final placement.
#[must_use]
pub fn evaluate(
    rule: &ScoringRule,
    catalog: &Catalog,
    zones: &ZoneSet,
    placement: &Placement,
    stats: &PlayStats,
) -> ScoringResult {
    let mut breakdown = Vec::new();
    let mut contributions = Vec::new();

    for term in &rule.terms {
        match term {
            ScoreTerm::Binary {
                reward,
                penalty,
                unplaced_penalty,
            } => {
                for item in catalog.iter() {
                    let (outcome, points) = match zone_outcome(item, placement) {
                        Outcome::Correct => (Outcome::Correct, *reward),
                        Outcome::Missed => (Outcome::Missed, -unplaced_penalty),
                        Outcome::Absent => (Outcome::Absent, 0),
                        other => (other, -penalty),
                    };
                    breakdown.push(item_verdict(item, outcome, points));
                }
            }
            ScoreTerm::PriorityTiers {
                full,
                partial,
                penalty,
            } => {
                for item in catalog.iter() {
                    let (outcome, points) = priority_outcome(item, zones, placement, *full, *partial, *penalty);
                    breakdown.push(item_verdict(item, outcome, points));
                }
            }
            ScoreTerm::PairBonus { bonus, alignment } => {
                for (pair, [a, b]) in catalog.pair_groups() {
                    let aligned = alignment.holds(placement, a, b);
                    let label = [a, b]
                        .iter()
                        .filter_map(|id| catalog.get(id))
                        .map(|item| item.label.as_str())
                        .collect::<Vec<_>>()
                        .join(" / ");
                    let (outcome, points) = if aligned {
                        (Outcome::Correct, *bonus)
                    } else {
                        (Outcome::Missed, 0)
                    };
                    breakdown.push(Verdict {
                        subject: pair.to_string(),
                        label,
                        outcome,
                        points,
                        note: None,
                    });
                }
            }
            ScoreTerm::Flat { points } => contributions.push(Contribution {
                source: "flat".to_string(),
                points: *points,
            }),
            ScoreTerm::Proximity { bands } => {
                for item in catalog.iter() {
                    let Some(target) = item.target else {
                        continue;
                    };
                    let (outcome, points) = match placement.point(&item.id) {
                        None => (Outcome::Missed, 0),
                        Some(point) => {
                            let distance = point.distance(target);
                            match bands.iter().position(|band| distance < band.within) {
                                Some(0) => (Outcome::Correct, bands[0].points),
                                Some(index) => (Outcome::Partial, bands[index].points),
                                None => (Outcome::Incorrect, 0),
                            }
                        }
                    };
                    breakdown.push(item_verdict(item, outcome, points));
                }
            }
            ScoreTerm::Accuracy { scale } => {
                let mut correct = 0_usize;
                for item in catalog.iter() {
                    let outcome = zone_outcome(item, placement);
                    if outcome.is_correct() {
                        correct += 1;
                    }
                    breakdown.push(item_verdict(item, outcome, 0));
                }
                let points = if catalog.is_empty() {
                    0
                } else {
                    round_f64_to_i64(
                        usize_to_f64(correct) * i64_to_f64(*scale) / usize_to_f64(catalog.len()),
                    )
                };
                contributions.push(Contribution {
                    source: "accuracy".to_string(),
                    points,
                });
            }
        }
    }

    let base = breakdown
        .iter()
        .map(|verdict| verdict.points)
        .chain(contributions.iter().map(|contribution| contribution.points))
        .fold(0_i64, i64::saturating_add);
    conclude(rule, rule.max_score(catalog), breakdown, contributions, base, stats)
}

/// Score a round-based session. Placement terms do not apply; the running
/// total of the rounds is the base the modifiers adjust.
#[must_use]
pub fn evaluate_rounds(
    rule: &ScoringRule,
    set: &RoundSet,
    progress: &RoundProgress,
    stats: &PlayStats,
) -> ScoringResult {
    let mut breakdown: Vec<Verdict> = progress
        .outcomes()
        .iter()
        .zip(&set.rounds)
        .map(|(outcome, round)| Verdict {
            subject: outcome.round_id.clone(),
            label: round.prompt.clone(),
            outcome: if outcome.correct {
                Outcome::Correct
            } else if outcome.points > 0 {
                Outcome::Partial
            } else {
                Outcome::Incorrect
            },
            points: outcome.points,
            note: if outcome.correct {
                None
            } else {
                round.explanation.clone()
            },
        })
        .collect();
    breakdown.extend(set.rounds.iter().skip(progress.outcomes().len()).map(|round| Verdict {
        subject: round.id.clone(),
        label: round.prompt.clone(),
        outcome: Outcome::Missed,
        points: 0,
        note: round.explanation.clone(),
    }));

    let max_score = rule.max_score.or_else(|| {
        rule.modifiers
            .is_empty()
            .then(|| rule.cap(set.max_total()))
    });
    conclude(rule, max_score, breakdown, Vec::new(), progress.total(), stats)
}

/// Apply modifiers, floor, ceiling and message tiers.
fn conclude(
    rule: &ScoringRule,
    max_score: Option<u32>,
    breakdown: Vec<Verdict>,
    mut contributions: Vec<Contribution>,
    base: i64,
    stats: &PlayStats,
) -> ScoringResult {
    let mut total = base;
    for modifier in &rule.modifiers {
        let points = modifier.points(stats);
        total = total.saturating_add(points);
        contributions.push(Contribution {
            source: modifier.label().to_string(),
            points,
        });
    }

    let raw_score = rule.cap(total);
    let percent = max_score.map(|max| {
        floor_percent(i64::from(raw_score), i64::from(max)).min(non_negative_score(PERCENT_SCALE))
    });
    let (tier, message) = rule.messages.select(raw_score, percent);
    let correct = breakdown
        .iter()
        .filter(|verdict| verdict.outcome.is_correct())
        .count();

    log::debug!(
        target: LOG_TARGET_SCORING,
        "scored {raw_score} (base {base}, total {total}) with {correct}/{} correct",
        breakdown.len()
    );

    ScoringResult {
        raw_score,
        max_score,
        percent,
        correct,
        total: breakdown.len(),
        message: message.to_string(),
        tier,
        breakdown,
        contributions,
    }
}

/// Ground-truth comparison ignoring points.
fn zone_outcome(item: &Item, placement: &Placement) -> Outcome {
    let location = placement.location(&item.id).unwrap_or(&Location::Unsorted);
    match (&item.zone, location) {
        (Some(expected), Location::Zone(actual)) if expected == actual => Outcome::Correct,
        (Some(_), Location::Unsorted) => Outcome::Missed,
        (None, Location::Unsorted) => Outcome::Absent,
        _ => Outcome::Incorrect,
    }
}

fn priority_outcome(
    item: &Item,
    zones: &ZoneSet,
    placement: &Placement,
    full: i64,
    partial: i64,
    penalty: i64,
) -> (Outcome, i64) {
    let location = placement.location(&item.id).unwrap_or(&Location::Unsorted);
    match (&item.zone, location) {
        (Some(_), Location::Unsorted) => (Outcome::Missed, 0),
        (None, Location::Unsorted) => (Outcome::Absent, 0),
        (None, Location::Zone(_)) => (Outcome::Incorrect, -penalty),
        (Some(expected), Location::Zone(actual)) => {
            let distance = zones
                .rank(expected)
                .zip(zones.rank(actual))
                .map(|(want, got)| want.abs_diff(got));
            match distance {
                Some(0) => (Outcome::Correct, full),
                Some(1) => (Outcome::Partial, partial),
                _ => (Outcome::Incorrect, -penalty),
            }
        }
    }
}

fn item_verdict(item: &Item, outcome: Outcome, points: i64) -> Verdict {
    Verdict {
        subject: item.id.to_string(),
        label: item.label.clone(),
        outcome,
        points,
        note: if outcome.is_correct() {
            None
        } else {
            item.explanation.clone()
        },
    }
}
