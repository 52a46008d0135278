//! Input-modality independent player intents.
//!
//! Drag-and-drop, click-to-select and keyboard front-ends all reduce to the
//! same `Intent` values, so a session only has one entry point to defend.

use serde::{Deserialize, Serialize};

use crate::catalog::{ItemId, Point};
use crate::placement::Location;
use crate::rounds::Response;
use crate::session::PlacementSnapshot;
use crate::zones::ZoneId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Start,
    Move {
        item: ItemId,
        to: Location,
    },
    PlaceAt {
        item: ItemId,
        zone: ZoneId,
        point: Point,
    },
    Link {
        a: ItemId,
        b: ItemId,
    },
    Unlink {
        item: ItemId,
    },
    Answer {
        response: Response,
    },
    Mistake,
    Tick,
    Finalize,
    Reset,
}

impl Intent {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Move { .. } => "move",
            Self::PlaceAt { .. } => "place_at",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
            Self::Answer { .. } => "answer",
            Self::Mistake => "mistake",
            Self::Tick => "tick",
            Self::Finalize => "finalize",
            Self::Reset => "reset",
        }
    }
}

/// Anything that produces intents from what it can see: a UI adapter, a
/// replay log, or an automated player.
pub trait IntentSource {
    /// Next intent, or `None` when the source has nothing more to do.
    fn next_intent(&mut self, snapshot: &PlacementSnapshot) -> Option<Intent>;
}

impl IntentSource for std::vec::IntoIter<Intent> {
    fn next_intent(&mut self, _snapshot: &PlacementSnapshot) -> Option<Intent> {
        self.next()
    }
}

impl<S: IntentSource + ?Sized> IntentSource for Box<S> {
    fn next_intent(&mut self, snapshot: &PlacementSnapshot) -> Option<Intent> {
        (**self).next_intent(snapshot)
    }
}

/// Summary of a [`crate::GameSession::drive`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveReport {
    /// Intents applied, accepted or not.
    pub steps: usize,
    pub rejected: usize,
    /// The step limit stopped the run before the source ran dry or the
    /// session completed.
    pub exhausted: bool,
}
