//! Game session: the lifecycle that ties catalog, zones, placement, timer
//! and scoring together.
//!
//! A session moves `Setup -> InProgress -> Completed`; `reset` returns it to
//! the Setup placement from any phase. All player input arrives through the
//! typed operations below or, modality-independent, through [`Intent`]s.

mod event;
mod intent;
mod snapshot;

pub use event::{FinalizeTrigger, SessionEvent, SessionObserver};
pub use intent::{DriveReport, Intent, IntentSource};
pub use snapshot::{PlacementSnapshot, PoolItems, PoolView, RoundView};

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{Catalog, Item, ItemId, Point};
use crate::constants::{LOG_TARGET_SESSION, UNSORTED_ZONE_LABEL};
use crate::definition::GameDefinition;
use crate::error::{CatalogError, DefinitionError, SessionError};
use crate::placement::{LinkPolicy, Location, Placement};
use crate::result::ScoringResult;
use crate::rounds::{Response, RoundProgress, RoundSet};
use crate::scoring::{self, PlayStats, ScoringRule};
use crate::timer::{Clock, TickOutcome};
use crate::zones::{Zone, ZoneId, ZoneSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    InProgress,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "in setup"),
            Self::InProgress => write!(f, "in progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// How a session reaches completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    /// The player submits. With `require_all_placed` the unsorted pool must
    /// be empty first; otherwise at least `min_placed` items must be placed.
    Manual {
        #[serde(default = "default_true")]
        require_all_placed: bool,
        #[serde(default)]
        min_placed: usize,
    },
    /// A countdown forces completion at zero; the player may submit earlier.
    Timed { seconds: u32 },
    /// Rounds answered in order; completes after the last answer.
    Sequential(RoundSet),
}

impl Default for Variant {
    fn default() -> Self {
        Self::Manual {
            require_all_placed: true,
            min_placed: 0,
        }
    }
}

impl Variant {
    #[must_use]
    pub const fn countdown(&self) -> Option<u32> {
        match self {
            Self::Timed { seconds } => Some(*seconds),
            _ => None,
        }
    }

    #[must_use]
    pub const fn rounds(&self) -> Option<&RoundSet> {
        match self {
            Self::Sequential(set) => Some(set),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Manual { .. } => "manual",
            Self::Timed { .. } => "timed",
            Self::Sequential(_) => "sequential",
        }
    }
}

/// Behaviour switches shared by every variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRules {
    /// Finalize as soon as every item is placed, or every pair is linked
    /// when the game has no zones.
    #[serde(default)]
    pub auto_complete: bool,
    /// Finalize once this many mistakes have been recorded.
    #[serde(default)]
    pub max_mistakes: Option<u32>,
    #[serde(default)]
    pub links: LinkPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub id: String,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub rules: SessionRules,
    #[serde(default)]
    pub scoring: ScoringRule,
}

/// One isolated play-through. Owns everything it touches.
pub struct GameSession {
    config: SessionConfig,
    catalog: Catalog,
    zones: ZoneSet,
    order: Vec<ItemId>,
    round_options: Vec<Vec<String>>,
    placement: Placement,
    clock: Clock,
    phase: Phase,
    attempts: u32,
    mistakes: u32,
    rounds: RoundProgress,
    result: Option<ScoringResult>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.config.id)
            .field("phase", &self.phase)
            .field("placement", &self.placement)
            .field("clock", &self.clock)
            .field("attempts", &self.attempts)
            .field("mistakes", &self.mistakes)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl GameSession {
    /// Validate a catalog and zone set and open a session in Setup.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when zones or items violate their
    /// invariants.
    pub fn load_catalog(
        items: Vec<Item>,
        zones: Vec<Zone>,
        config: SessionConfig,
        seed: u64,
    ) -> Result<Self, CatalogError> {
        let zones = ZoneSet::new(zones)?;
        let catalog = Catalog::new(items, &zones)?;
        Ok(Self::from_parts(catalog, zones, config, seed))
    }

    /// Validate a game definition and open a session for it.
    ///
    /// # Errors
    ///
    /// Returns whatever [`GameDefinition::validate`] reports.
    pub fn from_definition(definition: &GameDefinition, seed: u64) -> Result<Self, DefinitionError> {
        let (catalog, zones) = definition.validate()?;
        Ok(Self::from_parts(catalog, zones, definition.session_config(), seed))
    }

    /// Open a session over an already validated catalog. `seed` fixes the
    /// presentation order, which survives resets.
    #[must_use]
    pub fn from_parts(catalog: Catalog, zones: ZoneSet, config: SessionConfig, seed: u64) -> Self {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut order: Vec<ItemId> = catalog.ids().cloned().collect();
        order.shuffle(&mut rng);

        let round_options = config.variant.rounds().map_or_else(Vec::new, |set| {
            set.rounds
                .iter()
                .map(|round| {
                    let mut options = if round.options.is_empty() {
                        match &round.expected {
                            Response::Choice(choice) => vec![choice.clone()],
                            Response::Sequence(steps) | Response::Set(steps) => steps.clone(),
                        }
                    } else {
                        round.options.clone()
                    };
                    options.shuffle(&mut rng);
                    options
                })
                .collect()
        });

        let placement = Placement::new(&catalog);
        let clock = Clock::new(config.variant.countdown());
        log::debug!(
            target: LOG_TARGET_SESSION,
            "loaded {} ({} items, {} zones, {} variant)",
            config.id,
            catalog.len(),
            zones.len(),
            config.variant.label()
        );
        Self {
            config,
            catalog,
            zones,
            order,
            round_options,
            placement,
            clock,
            phase: Phase::Setup,
            attempts: 0,
            mistakes: 0,
            rounds: RoundProgress::default(),
            result: None,
            observers: Vec::new(),
        }
    }

    /// Register an observer for every subsequent transition.
    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    #[must_use]
    pub const fn placement(&self) -> &Placement {
        &self.placement
    }

    #[must_use]
    pub const fn rounds(&self) -> &RoundProgress {
        &self.rounds
    }

    /// Item ids in the seeded presentation order.
    #[must_use]
    pub fn presentation_order(&self) -> &[ItemId] {
        &self.order
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn mistakes(&self) -> u32 {
        self.mistakes
    }

    /// Counters scoring would see right now.
    #[must_use]
    pub const fn stats(&self) -> PlayStats {
        PlayStats {
            elapsed_secs: self.clock.elapsed(),
            remaining_secs: self.clock.remaining(),
            attempts: self.attempts,
            mistakes: self.mistakes,
        }
    }

    /// The result, present only once the session is Completed.
    #[must_use]
    pub const fn result(&self) -> Option<&ScoringResult> {
        self.result.as_ref()
    }

    /// Begin play explicitly.
    ///
    /// # Errors
    ///
    /// Only a session in Setup can start.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Setup {
            return self.rejected("start", Err(self.transition_error("start")));
        }
        self.begin();
        Ok(())
    }

    /// Move an item to the unsorted pool or a zone.
    ///
    /// # Errors
    ///
    /// Rejects moves after completion, in round-based games, and whatever
    /// [`Placement::apply_move`] rejects. A rejected move changes nothing.
    pub fn move_item(&mut self, item: &ItemId, to: &Location) -> Result<(), SessionError> {
        self.ensure_placement("move")?;
        let result = self.placement.apply_move(&self.zones, item, to);
        let moved = self.rejected("move", result)?;
        self.begin_if_setup();
        if let Some(from) = moved {
            log::debug!(target: LOG_TARGET_SESSION, "{item}: {from} -> {to}");
            self.emit(&SessionEvent::Moved {
                item: item.clone(),
                from,
                to: to.clone(),
            });
        }
        self.check_auto_complete();
        Ok(())
    }

    /// Drop an item at a coordinate inside a spatial zone.
    ///
    /// # Errors
    ///
    /// Rejects placements after completion, in round-based games, and
    /// whatever [`Placement::apply_place_at`] rejects.
    pub fn place_at(&mut self, item: &ItemId, zone: &ZoneId, point: Point) -> Result<(), SessionError> {
        self.ensure_placement("place")?;
        let result = self.placement.apply_place_at(&self.zones, item, zone, point);
        let from = self.rejected("place", result)?;
        self.begin_if_setup();
        let to = Location::Zone(zone.clone());
        log::debug!(
            target: LOG_TARGET_SESSION,
            "{item}: {from} -> {to} at ({:.1}, {:.1})",
            point.x,
            point.y
        );
        self.emit(&SessionEvent::Moved {
            item: item.clone(),
            from,
            to,
        });
        self.check_auto_complete();
        Ok(())
    }

    /// Link two items. Every attempt on known items counts; a mismatched
    /// pair under [`LinkPolicy::Confirmed`] also counts as a mistake.
    ///
    /// # Errors
    ///
    /// Rejects links after completion, in round-based games, and whatever
    /// [`Placement::apply_link`] rejects.
    pub fn link(&mut self, a: &ItemId, b: &ItemId) -> Result<(), SessionError> {
        self.ensure_placement("link")?;
        if let Some(unknown) = [a, b].into_iter().find(|id| !self.catalog.contains(id)) {
            return self.rejected("link", Err(SessionError::InvalidItemReference(unknown.clone())));
        }
        self.attempts = self.attempts.saturating_add(1);
        self.begin_if_setup();

        match self
            .placement
            .apply_link(&self.catalog, a, b, self.config.rules.links)
        {
            Ok(detached) => {
                for (left, right) in detached {
                    self.emit(&SessionEvent::Unlinked { a: left, b: right });
                }
                log::debug!(target: LOG_TARGET_SESSION, "linked {a} <-> {b}");
                self.emit(&SessionEvent::Linked {
                    a: a.clone(),
                    b: b.clone(),
                });
                self.check_auto_complete();
                Ok(())
            }
            Err(err) => {
                if matches!(err, SessionError::PairMismatch { .. }) {
                    self.count_mistake();
                }
                self.rejected("link", Err(err))
            }
        }
    }

    /// Remove an item's link.
    ///
    /// # Errors
    ///
    /// Confirmed links are permanent; otherwise rejects unknown or unlinked
    /// items.
    pub fn unlink(&mut self, item: &ItemId) -> Result<(), SessionError> {
        self.ensure_placement("unlink")?;
        if self.config.rules.links == LinkPolicy::Confirmed {
            return self.rejected("unlink", Err(SessionError::WrongVariant("unlink")));
        }
        let result = self.placement.unlink(item);
        let partner = self.rejected("unlink", result)?;
        self.emit(&SessionEvent::Unlinked {
            a: item.clone(),
            b: partner,
        });
        Ok(())
    }

    /// Answer the current round. Returns whether the answer was correct.
    /// A wrong answer counts as a mistake.
    ///
    /// # Errors
    ///
    /// Rejects answers after completion, outside round-based games, and
    /// responses of the wrong kind.
    pub fn answer(&mut self, response: Response) -> Result<bool, SessionError> {
        self.ensure_open("answer")?;
        let Variant::Sequential(set) = &self.config.variant else {
            return self.rejected("answer", Err(SessionError::WrongVariant("answer")));
        };
        let result = self.rounds.answer(set, response).cloned();
        let finished = self.rounds.is_finished(set);
        let outcome = self.rejected("answer", result)?;

        self.attempts = self.attempts.saturating_add(1);
        self.begin_if_setup();
        log::debug!(
            target: LOG_TARGET_SESSION,
            "round {} answered ({}), total {}",
            outcome.round_id,
            if outcome.correct { "correct" } else { "wrong" },
            outcome.running_total
        );
        self.emit(&SessionEvent::Answered {
            round: outcome.round_id,
            correct: outcome.correct,
            running_total: outcome.running_total,
        });
        if !outcome.correct {
            self.count_mistake();
        }
        if finished && self.phase == Phase::InProgress {
            self.finalize_with(FinalizeTrigger::RoundsExhausted);
        }
        Ok(outcome.correct)
    }

    /// Record a mistake reported by the front-end, such as touching a
    /// hazard while dragging. Returns the new mistake count.
    ///
    /// # Errors
    ///
    /// Rejected once the session is Completed.
    pub fn record_mistake(&mut self) -> Result<u32, SessionError> {
        self.ensure_open("record a mistake")?;
        self.begin_if_setup();
        self.count_mistake();
        Ok(self.mistakes)
    }

    /// Advance the clock one second. Idle unless the session is running.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::InProgress {
            return TickOutcome::Idle;
        }
        let outcome = self.clock.tick();
        if outcome == TickOutcome::Idle {
            return outcome;
        }
        self.emit(&SessionEvent::Ticked {
            elapsed: self.clock.elapsed(),
            remaining: self.clock.remaining(),
        });
        if outcome == TickOutcome::Expired {
            log::debug!(target: LOG_TARGET_SESSION, "{}: countdown expired", self.config.id);
            self.finalize_with(FinalizeTrigger::TimerExpired);
        }
        outcome
    }

    /// Whether a manual `finalize` would be accepted now.
    #[must_use]
    pub fn can_finalize(&self) -> bool {
        self.phase == Phase::InProgress && self.finalize_blocker().is_none()
    }

    /// Score the placement and complete the session.
    ///
    /// # Errors
    ///
    /// Only an in-progress session whose variant precondition holds can be
    /// finalized.
    pub fn finalize(&mut self) -> Result<&ScoringResult, SessionError> {
        if self.phase != Phase::InProgress {
            return self.rejected("finalize", Err(self.transition_error("finalize")));
        }
        if let Some(reason) = self.finalize_blocker() {
            return self.rejected("finalize", Err(SessionError::FinalizeBlocked(reason)));
        }
        Ok(self.finalize_with(FinalizeTrigger::Manual))
    }

    /// Return to the Setup placement from any phase. Idempotent.
    pub fn reset(&mut self) {
        self.placement = Placement::new(&self.catalog);
        self.clock.reset();
        self.phase = Phase::Setup;
        self.attempts = 0;
        self.mistakes = 0;
        self.rounds.clear();
        self.result = None;
        log::debug!(target: LOG_TARGET_SESSION, "{}: reset", self.config.id);
        self.emit(&SessionEvent::Reset);
    }

    /// Read-only view for renderers and intent sources.
    #[must_use]
    pub fn snapshot(&self) -> PlacementSnapshot {
        let mut pools = Vec::with_capacity(self.zones.len() + 1);
        pools.push(self.pool_view(Location::Unsorted, UNSORTED_ZONE_LABEL, None, false));
        for zone in self.zones.iter() {
            pools.push(self.pool_view(
                Location::Zone(zone.id.clone()),
                &zone.label,
                zone.capacity,
                zone.spatial,
            ));
        }

        let round = match (&self.config.variant, self.phase) {
            (Variant::Sequential(set), Phase::Setup | Phase::InProgress) => {
                let index = self.rounds.current();
                set.rounds.get(index).map(|round| RoundView {
                    index,
                    count: set.rounds.len(),
                    id: round.id.clone(),
                    prompt: round.prompt.clone(),
                    options: self.round_options.get(index).cloned().unwrap_or_default(),
                })
            }
            _ => None,
        };

        PlacementSnapshot {
            phase: self.phase,
            pools,
            points: self
                .placement
                .points()
                .map(|(id, point)| (id.clone(), *point))
                .collect(),
            links: self
                .placement
                .links()
                .map(|(a, b)| (a.clone(), b.clone()))
                .collect(),
            elapsed_secs: self.clock.elapsed(),
            remaining_secs: self.clock.remaining(),
            attempts: self.attempts,
            mistakes: self.mistakes,
            round,
            digest: self.placement.fingerprint(),
        }
    }

    /// Apply one intent and report the phase afterwards.
    ///
    /// # Errors
    ///
    /// Forwards the rejection of the underlying operation.
    pub fn apply(&mut self, intent: Intent) -> Result<Phase, SessionError> {
        match intent {
            Intent::Start => self.start()?,
            Intent::Move { item, to } => self.move_item(&item, &to)?,
            Intent::PlaceAt { item, zone, point } => self.place_at(&item, &zone, point)?,
            Intent::Link { a, b } => self.link(&a, &b)?,
            Intent::Unlink { item } => self.unlink(&item)?,
            Intent::Answer { response } => {
                self.answer(response)?;
            }
            Intent::Mistake => {
                self.record_mistake()?;
            }
            Intent::Tick => {
                self.tick();
            }
            Intent::Finalize => {
                self.finalize()?;
            }
            Intent::Reset => self.reset(),
        }
        Ok(self.phase)
    }

    /// Pull intents from a source until it runs dry, the session completes
    /// or `max_steps` intents have been applied. Rejected intents are
    /// counted and skipped.
    pub fn drive(&mut self, source: &mut impl IntentSource, max_steps: usize) -> DriveReport {
        let mut report = DriveReport::default();
        while self.phase != Phase::Completed {
            if report.steps >= max_steps {
                report.exhausted = true;
                break;
            }
            let snapshot = self.snapshot();
            let Some(intent) = source.next_intent(&snapshot) else {
                break;
            };
            report.steps += 1;
            if self.apply(intent).is_err() {
                report.rejected += 1;
            }
        }
        report
    }

    fn pool_view(
        &self,
        location: Location,
        label: &str,
        capacity: Option<usize>,
        spatial: bool,
    ) -> PoolView {
        let items = self
            .order
            .iter()
            .filter(|id| self.placement.location(id) == Some(&location))
            .cloned()
            .collect();
        PoolView {
            location,
            label: label.to_string(),
            capacity,
            spatial,
            items,
        }
    }

    fn begin(&mut self) {
        self.phase = Phase::InProgress;
        self.clock.start();
        log::debug!(target: LOG_TARGET_SESSION, "{}: started", self.config.id);
        self.emit(&SessionEvent::Started);
    }

    fn begin_if_setup(&mut self) {
        if self.phase == Phase::Setup {
            self.begin();
        }
    }

    fn count_mistake(&mut self) {
        self.mistakes = self.mistakes.saturating_add(1);
        self.emit(&SessionEvent::MistakeRecorded {
            mistakes: self.mistakes,
        });
        if let Some(limit) = self.config.rules.max_mistakes
            && self.phase == Phase::InProgress
            && self.mistakes >= limit
        {
            log::debug!(target: LOG_TARGET_SESSION, "{}: mistake allowance used up", self.config.id);
            self.finalize_with(FinalizeTrigger::MistakesExhausted);
        }
    }

    /// Link-only games resolve when every paired item is linked; games with
    /// zones when the unsorted pool is empty.
    fn all_resolved(&self) -> bool {
        if self.zones.is_empty() {
            !self.catalog.is_empty() && self.placement.link_count() == self.catalog.pair_count()
        } else {
            self.placement.unsorted_count() == 0
        }
    }

    fn check_auto_complete(&mut self) {
        if self.config.rules.auto_complete && self.phase == Phase::InProgress && self.all_resolved() {
            self.finalize_with(FinalizeTrigger::AllPlaced);
        }
    }

    fn finalize_blocker(&self) -> Option<&'static str> {
        match &self.config.variant {
            Variant::Manual {
                require_all_placed: true,
                ..
            } => (!self.all_resolved()).then_some(if self.zones.is_empty() {
                "pairs remain unlinked"
            } else {
                "items remain unsorted"
            }),
            Variant::Manual { min_placed, .. } => {
                (self.placement.placed_count() < *min_placed).then_some("not enough items placed")
            }
            Variant::Timed { .. } => None,
            Variant::Sequential(_) => Some("rounds remain unanswered"),
        }
    }

    fn finalize_with(&mut self, trigger: FinalizeTrigger) -> &ScoringResult {
        self.clock.stop();
        let stats = self.stats();
        let result = match &self.config.variant {
            Variant::Sequential(set) => {
                scoring::evaluate_rounds(&self.config.scoring, set, &self.rounds, &stats)
            }
            _ => scoring::evaluate(
                &self.config.scoring,
                &self.catalog,
                &self.zones,
                &self.placement,
                &stats,
            ),
        };
        self.phase = Phase::Completed;
        log::debug!(
            target: LOG_TARGET_SESSION,
            "{}: finalized by {trigger:?} with {}",
            self.config.id,
            result.raw_score
        );
        self.emit(&SessionEvent::Finalized {
            score: result.raw_score,
            trigger,
        });
        self.result.insert(result)
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), SessionError> {
        if self.phase == Phase::Completed {
            return self.rejected(action, Err(self.transition_error(action)));
        }
        Ok(())
    }

    fn ensure_placement(&self, action: &'static str) -> Result<(), SessionError> {
        self.ensure_open(action)?;
        if matches!(self.config.variant, Variant::Sequential(_)) {
            return self.rejected(action, Err(SessionError::WrongVariant(action)));
        }
        Ok(())
    }

    const fn transition_error(&self, action: &'static str) -> SessionError {
        SessionError::InvalidStateTransition {
            phase: self.phase,
            action,
        }
    }

    fn rejected<T>(&self, action: &str, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(err) = &result {
            log::warn!(target: LOG_TARGET_SESSION, "{}: {action} rejected: {err}", self.config.id);
        }
        result
    }

    fn emit(&mut self, event: &SessionEvent) {
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }
}
