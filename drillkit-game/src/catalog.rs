//! Item catalog: the classifiable entities and their ground truth.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::CatalogError;
use crate::zones::{ZoneId, ZoneSet};

/// Stable identifier of a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Pair-group identifier shared by the two members of a matching pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(String);

impl PairId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A coordinate on a spatial zone's canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A classifiable entity. The ground-truth fields are only read by scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub label: String,
    /// Correct zone. `None` marks a distractor that belongs outside every
    /// zone, i.e. left in the unsorted pool.
    #[serde(default)]
    pub zone: Option<ZoneId>,
    #[serde(default)]
    pub pair: Option<PairId>,
    #[serde(default)]
    pub target: Option<Point>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Shown after scoring when the item was misplaced.
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Item {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(id),
            label: label.into(),
            zone: None,
            pair: None,
            target: None,
            icon: None,
            explanation: None,
        }
    }

    #[must_use]
    pub fn in_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(ZoneId::new(zone));
        self
    }

    #[must_use]
    pub fn paired(mut self, pair: impl Into<String>) -> Self {
        self.pair = Some(PairId::new(pair));
        self
    }

    #[must_use]
    pub fn targeting(mut self, target: Point) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn explained(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

/// Read-only, validated collection of items.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
    pairs: BTreeMap<PairId, [ItemId; 2]>,
}

impl Catalog {
    /// Validate items against the zone set and index them.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate ids, references to undeclared zones, or
    /// pair groups that do not have exactly two members.
    pub fn new(items: Vec<Item>, zones: &ZoneSet) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(items.len());
        let mut members: BTreeMap<PairId, Vec<ItemId>> = BTreeMap::new();

        for (position, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateItem(item.id.clone()));
            }
            if let Some(zone) = &item.zone
                && !zones.contains(zone)
            {
                return Err(CatalogError::UnknownZone {
                    item: item.id.clone(),
                    zone: zone.clone(),
                });
            }
            if let Some(pair) = &item.pair {
                members.entry(pair.clone()).or_default().push(item.id.clone());
            }
        }

        let mut pairs = BTreeMap::new();
        for (pair, ids) in members {
            match <[ItemId; 2]>::try_from(ids) {
                Ok(group) => {
                    pairs.insert(pair, group);
                }
                Err(ids) => {
                    return Err(CatalogError::PairCardinality {
                        pair,
                        count: ids.len(),
                    });
                }
            }
        }

        Ok(Self {
            items,
            index,
            pairs,
        })
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter().map(|item| &item.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pair groups in id order.
    pub fn pair_groups(&self) -> impl Iterator<Item = (&PairId, &[ItemId; 2])> {
        self.pairs.iter()
    }

    #[must_use]
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Whether two items carry the same pair id.
    #[must_use]
    pub fn is_pair(&self, a: &ItemId, b: &ItemId) -> bool {
        match (
            self.get(a).and_then(|item| item.pair.as_ref()),
            self.get(b).and_then(|item| item.pair.as_ref()),
        ) {
            (Some(left), Some(right)) => a != b && left == right,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::Zone;

    fn zones() -> ZoneSet {
        ZoneSet::new(vec![Zone::new("left", "Left"), Zone::new("right", "Right")]).unwrap()
    }

    #[test]
    fn indexes_items_and_pairs() {
        let catalog = Catalog::new(
            vec![
                Item::new("d1", "Flood").in_zone("left").paired("rain"),
                Item::new("c1", "Heavy Rain").in_zone("right").paired("rain"),
                Item::new("x", "Distractor"),
            ],
            &zones(),
        )
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.pair_count(), 1);
        assert!(catalog.is_pair(&ItemId::from("d1"), &ItemId::from("c1")));
        assert!(!catalog.is_pair(&ItemId::from("d1"), &ItemId::from("x")));
        assert!(!catalog.is_pair(&ItemId::from("d1"), &ItemId::from("d1")));
    }

    #[test]
    fn rejects_unknown_zone_references() {
        let err = Catalog::new(vec![Item::new("1", "Water").in_zone("bag")], &zones()).unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownZone {
                item: ItemId::from("1"),
                zone: ZoneId::from("bag"),
            }
        );
    }

    #[test]
    fn rejects_duplicates_and_lonely_pairs() {
        let duplicate = Catalog::new(vec![Item::new("1", "A"), Item::new("1", "B")], &zones());
        assert!(matches!(duplicate, Err(CatalogError::DuplicateItem(_))));

        let lonely = Catalog::new(vec![Item::new("1", "A").paired("p")], &zones());
        assert!(matches!(
            lonely,
            Err(CatalogError::PairCardinality { count: 1, .. })
        ));

        let crowded = Catalog::new(
            vec![
                Item::new("1", "A").paired("p"),
                Item::new("2", "B").paired("p"),
                Item::new("3", "C").paired("p"),
            ],
            &zones(),
        );
        assert!(matches!(
            crowded,
            Err(CatalogError::PairCardinality { count: 3, .. })
        ));
    }

    #[test]
    fn point_distance_is_euclidean() {
        let placed = Point::new(310.0, 55.0);
        let target = Point::new(300.0, 50.0);
        assert!((placed.distance(target) - 11.180_339_887).abs() < 1e-6);
    }
}
