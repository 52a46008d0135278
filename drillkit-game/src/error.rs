//! Error types for catalog validation, definitions and session operations.
//!
//! Every session error is a local rejection: the operation that produced it
//! left the placement untouched, and the caller decides what to show.

use thiserror::Error;

use crate::catalog::{ItemId, PairId};
use crate::placement::Location;
use crate::session::Phase;
use crate::zones::ZoneId;

/// Errors raised when a catalog or zone set violates its invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("item id {0} is declared more than once")]
    DuplicateItem(ItemId),
    #[error("zone id {0} is declared more than once")]
    DuplicateZone(ZoneId),
    #[error("zone id {0} is reserved for the unsorted pool")]
    ReservedZone(ZoneId),
    #[error("zone {0} declares a capacity of zero")]
    ZeroCapacity(ZoneId),
    #[error("item {item} expects zone {zone}, which is not declared")]
    UnknownZone { item: ItemId, zone: ZoneId },
    #[error("pair group {pair} has {count} members (expected exactly 2)")]
    PairCardinality { pair: PairId, count: usize },
}

/// Errors raised while loading or validating a game definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to parse game definitions: {0}")]
    Json(#[from] serde_json::Error),
    #[error("game {game}: {source}")]
    Catalog {
        game: String,
        #[source]
        source: CatalogError,
    },
    #[error("game {0} has no items to sort")]
    EmptyCatalog(String),
    #[error("game {0} has no rounds")]
    EmptyRounds(String),
    #[error("game {game}: item {item} has no target point for proximity scoring")]
    MissingTarget { game: String, item: ItemId },
    #[error("game {0} scores proximity but declares no spatial zone")]
    NoSpatialZone(String),
    #[error("game {0}: message tiers must be listed from highest to lowest")]
    TiersOutOfOrder(String),
    #[error("game {0}: percentage tiers need a max_score")]
    PercentWithoutMax(String),
    #[error("game {0}: countdown must start above zero")]
    ZeroCountdown(String),
    #[error("game id {0} is declared more than once")]
    DuplicateGame(String),
    #[error("unknown game: {0}")]
    UnknownGame(String),
}

/// Rejections surfaced by [`crate::GameSession`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("item {0} is not in the catalog")]
    InvalidItemReference(ItemId),
    #[error("zone {0} is not in the zone set")]
    UnknownZone(ZoneId),
    #[error("zone {zone} is full ({capacity} items)")]
    ZoneCapacityExceeded { zone: ZoneId, capacity: usize },
    #[error("cannot {action} while the session is {phase}")]
    InvalidStateTransition { phase: Phase, action: &'static str },
    #[error("zone {0} does not accept coordinates")]
    NotSpatial(ZoneId),
    #[error("zone {0} needs a coordinate; use place_at")]
    MissingCoordinate(ZoneId),
    #[error("items {a} and {b} cannot be linked from {location}")]
    InvalidLink {
        a: ItemId,
        b: ItemId,
        location: Location,
    },
    #[error("items {a} and {b} do not belong together")]
    PairMismatch { a: ItemId, b: ItemId },
    #[error("item {0} is already linked")]
    AlreadyLinked(ItemId),
    #[error("item {0} is not linked")]
    NotLinked(ItemId),
    #[error("answer does not match the expected response kind for round {0}")]
    ResponseKindMismatch(String),
    #[error("cannot finalize yet: {0}")]
    FinalizeBlocked(&'static str),
    #[error("no round is waiting for an answer")]
    NoActiveRound,
    #[error("{0} is not available for this game variant")]
    WrongVariant(&'static str),
}
