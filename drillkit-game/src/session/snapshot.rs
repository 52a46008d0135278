//! Read-only views of a session for renderers and intent sources.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::catalog::{ItemId, Point};
use crate::placement::Location;
use crate::session::Phase;

/// Items listed under one pool, in presentation order.
pub type PoolItems = SmallVec<[ItemId; 8]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolView {
    pub location: Location,
    pub label: String,
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default)]
    pub spatial: bool,
    pub items: PoolItems,
}

impl PoolView {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.items.len() >= capacity)
    }
}

/// The round waiting for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub index: usize,
    pub count: usize,
    pub id: String,
    pub prompt: String,
    /// Options in presentation order.
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSnapshot {
    pub phase: Phase,
    /// Unsorted pool first, then zones in declaration order.
    pub pools: Vec<PoolView>,
    pub points: Vec<(ItemId, Point)>,
    /// Each link once, smaller id first.
    pub links: Vec<(ItemId, ItemId)>,
    pub elapsed_secs: u32,
    #[serde(default)]
    pub remaining_secs: Option<u32>,
    pub attempts: u32,
    pub mistakes: u32,
    #[serde(default)]
    pub round: Option<RoundView>,
    pub(crate) digest: u64,
}

impl PlacementSnapshot {
    /// Digest of the placement this snapshot was taken from.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.digest
    }

    #[must_use]
    pub fn pool(&self, location: &Location) -> Option<&PoolView> {
        self.pools.iter().find(|pool| &pool.location == location)
    }

    /// Items still waiting in the unsorted pool.
    #[must_use]
    pub fn unsorted(&self) -> &[ItemId] {
        self.pools
            .iter()
            .find(|pool| pool.location.is_unsorted())
            .map(|pool| pool.items.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn location_of(&self, item: &ItemId) -> Option<&Location> {
        self.pools
            .iter()
            .find(|pool| pool.items.contains(item))
            .map(|pool| &pool.location)
    }

    #[must_use]
    pub fn is_linked(&self, item: &ItemId) -> bool {
        self.links.iter().any(|(a, b)| a == item || b == item)
    }
}
