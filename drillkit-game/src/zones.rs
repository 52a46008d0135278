//! Target buckets items can be dropped into.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::constants::UNSORTED_ZONE_ID;
use crate::error::CatalogError;

/// Identifier of a declared zone. The unsorted pool has no `ZoneId`; it is
/// represented by [`crate::Location::Unsorted`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A named drop target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub label: String,
    /// Maximum number of items the zone accepts; unbounded when absent.
    #[serde(default)]
    pub capacity: Option<usize>,
    /// Spatial zones record a coordinate for every item dropped in them.
    #[serde(default)]
    pub spatial: bool,
}

impl Zone {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: ZoneId::new(id),
            label: label.into(),
            capacity: None,
            spatial: false,
        }
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn spatial(mut self) -> Self {
        self.spatial = true;
        self
    }
}

/// Ordered, validated set of zones. Declaration order is the zone's rank,
/// which priority-tier scoring uses as its distance metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSet {
    zones: Vec<Zone>,
    index: HashMap<ZoneId, usize>,
}

impl ZoneSet {
    /// Validate and index a list of zones.
    ///
    /// # Errors
    ///
    /// Returns an error when an id repeats, uses the reserved unsorted id,
    /// or a zone declares a capacity of zero.
    pub fn new(zones: Vec<Zone>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(zones.len());
        for (rank, zone) in zones.iter().enumerate() {
            if zone.id.as_str() == UNSORTED_ZONE_ID {
                return Err(CatalogError::ReservedZone(zone.id.clone()));
            }
            if zone.capacity == Some(0) {
                return Err(CatalogError::ZeroCapacity(zone.id.clone()));
            }
            if index.insert(zone.id.clone(), rank).is_some() {
                return Err(CatalogError::DuplicateZone(zone.id.clone()));
            }
        }
        Ok(Self { zones, index })
    }

    #[must_use]
    pub fn get(&self, id: &ZoneId) -> Option<&Zone> {
        self.index.get(id).map(|&rank| &self.zones[rank])
    }

    #[must_use]
    pub fn contains(&self, id: &ZoneId) -> bool {
        self.index.contains_key(id)
    }

    /// Declaration index of a zone.
    #[must_use]
    pub fn rank(&self, id: &ZoneId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    #[must_use]
    pub fn has_spatial(&self) -> bool {
        self.zones.iter().any(|zone| zone.spatial)
    }
}
