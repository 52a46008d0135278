//! Transition events broadcast to session observers.

use serde::{Deserialize, Serialize};

use crate::catalog::ItemId;
use crate::placement::Location;

/// What ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeTrigger {
    /// The player submitted.
    Manual,
    TimerExpired,
    /// Every item was placed, or every pair linked, with auto-complete on.
    AllPlaced,
    RoundsExhausted,
    MistakesExhausted,
}

/// One observable transition. Rejected operations emit nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Started,
    Moved {
        item: ItemId,
        from: Location,
        to: Location,
    },
    Linked {
        a: ItemId,
        b: ItemId,
    },
    Unlinked {
        a: ItemId,
        b: ItemId,
    },
    Answered {
        round: String,
        correct: bool,
        running_total: i64,
    },
    MistakeRecorded {
        mistakes: u32,
    },
    Ticked {
        elapsed: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remaining: Option<u32>,
    },
    Finalized {
        score: u32,
        trigger: FinalizeTrigger,
    },
    Reset,
}

/// Receives every event a session emits, in order.
pub trait SessionObserver {
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionEvent),
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event);
    }
}
