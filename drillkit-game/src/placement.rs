//! Placement state: where every item currently sits.
//!
//! The map is total over the catalog from construction onwards. Every
//! mutation validates first and commits only when all checks pass, so a
//! rejected operation leaves the placement byte-for-byte unchanged.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use twox_hash::XxHash64;

use crate::catalog::{Catalog, ItemId, Point};
use crate::constants::UNSORTED_ZONE_ID;
use crate::error::SessionError;
use crate::zones::{ZoneId, ZoneSet};

/// Where an item sits: the unsorted pool or a declared zone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Unsorted,
    Zone(ZoneId),
}

impl Location {
    #[must_use]
    pub fn zone(id: impl Into<String>) -> Self {
        Self::Zone(ZoneId::new(id))
    }

    #[must_use]
    pub const fn zone_id(&self) -> Option<&ZoneId> {
        match self {
            Self::Unsorted => None,
            Self::Zone(id) => Some(id),
        }
    }

    #[must_use]
    pub const fn is_unsorted(&self) -> bool {
        matches!(self, Self::Unsorted)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsorted => f.write_str(UNSORTED_ZONE_ID),
            Self::Zone(id) => write!(f, "{id}"),
        }
    }
}

/// How links between items are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// Any two items in different locations may be linked; a new link
    /// replaces whatever either item was linked to.
    #[default]
    Free,
    /// Only true pairs are accepted and a link is permanent. A mismatched
    /// attempt is rejected and counted as a mistake.
    Confirmed,
}

/// Links detached while committing a new link.
pub type DetachedLinks = Vec<(ItemId, ItemId)>;

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    locations: BTreeMap<ItemId, Location>,
    points: BTreeMap<ItemId, Point>,
    links: BTreeMap<ItemId, ItemId>,
}

impl Placement {
    /// Every catalog item in the unsorted pool.
    #[must_use]
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            locations: catalog
                .ids()
                .map(|id| (id.clone(), Location::Unsorted))
                .collect(),
            points: BTreeMap::new(),
            links: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn location(&self, item: &ItemId) -> Option<&Location> {
        self.locations.get(item)
    }

    #[must_use]
    pub fn point(&self, item: &ItemId) -> Option<Point> {
        self.points.get(item).copied()
    }

    #[must_use]
    pub fn partner(&self, item: &ItemId) -> Option<&ItemId> {
        self.links.get(item)
    }

    pub fn locations(&self) -> impl Iterator<Item = (&ItemId, &Location)> {
        self.locations.iter()
    }

    pub fn points(&self) -> impl Iterator<Item = (&ItemId, &Point)> {
        self.points.iter()
    }

    /// Each link once, with the smaller id first.
    pub fn links(&self) -> impl Iterator<Item = (&ItemId, &ItemId)> {
        self.links.iter().filter(|(a, b)| a < b)
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len() / 2
    }

    #[must_use]
    pub fn occupancy(&self, zone: &ZoneId) -> usize {
        self.locations
            .values()
            .filter(|location| location.zone_id() == Some(zone))
            .count()
    }

    #[must_use]
    pub fn unsorted_count(&self) -> usize {
        self.locations
            .values()
            .filter(|location| location.is_unsorted())
            .count()
    }

    #[must_use]
    pub fn placed_count(&self) -> usize {
        self.locations.len() - self.unsorted_count()
    }

    /// Move an item to a location.
    ///
    /// Returns the previous location when the item actually moved and
    /// `None` for a move into the location it already occupies. Moving
    /// detaches the item's coordinate and link.
    ///
    /// # Errors
    ///
    /// Rejects unknown items and zones, spatial zones (which need
    /// [`Self::apply_place_at`]) and full zones.
    pub fn apply_move(
        &mut self,
        zones: &ZoneSet,
        item: &ItemId,
        to: &Location,
    ) -> Result<Option<Location>, SessionError> {
        let from = self.current(item)?.clone();
        if let Location::Zone(zone_id) = to {
            let zone = zones
                .get(zone_id)
                .ok_or_else(|| SessionError::UnknownZone(zone_id.clone()))?;
            if &from == to {
                return Ok(None);
            }
            if zone.spatial {
                return Err(SessionError::MissingCoordinate(zone_id.clone()));
            }
            self.ensure_capacity(zones, zone_id)?;
        } else if from == *to {
            return Ok(None);
        }

        self.detach(item);
        self.locations.insert(item.clone(), to.clone());
        Ok(Some(from))
    }

    /// Drop an item at a coordinate inside a spatial zone. Repositioning
    /// within the same zone keeps the item's link.
    ///
    /// # Errors
    ///
    /// Rejects unknown items and zones, non-spatial zones and full zones.
    pub fn apply_place_at(
        &mut self,
        zones: &ZoneSet,
        item: &ItemId,
        zone_id: &ZoneId,
        point: Point,
    ) -> Result<Location, SessionError> {
        let from = self.current(item)?.clone();
        let zone = zones
            .get(zone_id)
            .ok_or_else(|| SessionError::UnknownZone(zone_id.clone()))?;
        if !zone.spatial {
            return Err(SessionError::NotSpatial(zone_id.clone()));
        }
        let to = Location::Zone(zone_id.clone());
        if from != to {
            self.ensure_capacity(zones, zone_id)?;
            self.detach(item);
            self.locations.insert(item.clone(), to);
        }
        self.points.insert(item.clone(), point);
        Ok(from)
    }

    /// Link two items.
    ///
    /// Returns the links that were detached to make room (only under
    /// [`LinkPolicy::Free`]).
    ///
    /// # Errors
    ///
    /// Rejects unknown items, self-links, links inside one zone, links
    /// involving an already linked item under [`LinkPolicy::Confirmed`]
    /// and, under the same policy, items from different pair groups.
    pub fn apply_link(
        &mut self,
        catalog: &Catalog,
        a: &ItemId,
        b: &ItemId,
        policy: LinkPolicy,
    ) -> Result<DetachedLinks, SessionError> {
        let from_a = self.current(a)?.clone();
        let from_b = self.current(b)?;
        let same_zone = !from_a.is_unsorted() && from_a == *from_b;
        if a == b || same_zone {
            return Err(SessionError::InvalidLink {
                a: a.clone(),
                b: b.clone(),
                location: from_a,
            });
        }
        if self.links.get(a) == Some(b) {
            return match policy {
                LinkPolicy::Free => Ok(Vec::new()),
                LinkPolicy::Confirmed => Err(SessionError::AlreadyLinked(a.clone())),
            };
        }

        let mut detached = Vec::new();
        match policy {
            LinkPolicy::Confirmed => {
                if let Some(linked) = [a, b].into_iter().find(|id| self.links.contains_key(*id)) {
                    return Err(SessionError::AlreadyLinked(linked.clone()));
                }
                if !catalog.is_pair(a, b) {
                    return Err(SessionError::PairMismatch {
                        a: a.clone(),
                        b: b.clone(),
                    });
                }
            }
            LinkPolicy::Free => {
                for id in [a, b] {
                    if let Some(partner) = self.break_link(id) {
                        detached.push((id.clone(), partner));
                    }
                }
            }
        }

        self.links.insert(a.clone(), b.clone());
        self.links.insert(b.clone(), a.clone());
        Ok(detached)
    }

    /// Remove the link an item is part of, returning its former partner.
    ///
    /// # Errors
    ///
    /// Rejects unknown items and items without a link.
    pub fn unlink(&mut self, item: &ItemId) -> Result<ItemId, SessionError> {
        self.current(item)?;
        self.break_link(item)
            .ok_or_else(|| SessionError::NotLinked(item.clone()))
    }

    /// Stable 64-bit digest of locations, coordinates and links.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = XxHash64::with_seed(0);
        for (item, location) in &self.locations {
            hasher.write(item.as_str().as_bytes());
            hasher.write_u8(0);
            hasher.write(location.to_string().as_bytes());
            hasher.write_u8(0);
            if let Some(point) = self.points.get(item) {
                hasher.write_u64(point.x.to_bits());
                hasher.write_u64(point.y.to_bits());
            }
            if let Some(partner) = self.links.get(item) {
                hasher.write(partner.as_str().as_bytes());
            }
            hasher.write_u8(0xff);
        }
        hasher.finish()
    }

    fn current(&self, item: &ItemId) -> Result<&Location, SessionError> {
        self.locations
            .get(item)
            .ok_or_else(|| SessionError::InvalidItemReference(item.clone()))
    }

    fn ensure_capacity(&self, zones: &ZoneSet, zone_id: &ZoneId) -> Result<(), SessionError> {
        let capacity = zones.get(zone_id).and_then(|zone| zone.capacity);
        match capacity {
            Some(capacity) if self.occupancy(zone_id) >= capacity => {
                Err(SessionError::ZoneCapacityExceeded {
                    zone: zone_id.clone(),
                    capacity,
                })
            }
            _ => Ok(()),
        }
    }

    fn detach(&mut self, item: &ItemId) {
        self.points.remove(item);
        self.break_link(item);
    }

    fn break_link(&mut self, item: &ItemId) -> Option<ItemId> {
        let partner = self.links.remove(item)?;
        self.links.remove(&partner);
        Some(partner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Item;
    use crate::zones::Zone;

    fn fixture() -> (Catalog, ZoneSet) {
        let zones = ZoneSet::new(vec![
            Zone::new("bag", "Bag").with_capacity(2),
            Zone::new("shelf", "Shelf"),
            Zone::new("map", "Map").spatial(),
        ])
        .unwrap();
        let catalog = Catalog::new(
            vec![
                Item::new("water", "Water").in_zone("bag").paired("p1"),
                Item::new("torch", "Torch").in_zone("bag").paired("p2"),
                Item::new("kit", "Kit").in_zone("bag").paired("p1"),
                Item::new("toy", "Toy").paired("p2"),
            ],
            &zones,
        )
        .unwrap();
        (catalog, zones)
    }

    fn id(raw: &str) -> ItemId {
        ItemId::from(raw)
    }

    #[test]
    fn starts_total_and_unsorted() {
        let (catalog, _) = fixture();
        let placement = Placement::new(&catalog);
        assert_eq!(placement.unsorted_count(), 4);
        assert_eq!(placement.placed_count(), 0);
        assert!(placement.locations().all(|(_, loc)| loc.is_unsorted()));
    }

    #[test]
    fn capacity_rejection_leaves_state_untouched() {
        let (catalog, zones) = fixture();
        let mut placement = Placement::new(&catalog);
        let bag = Location::zone("bag");
        placement.apply_move(&zones, &id("water"), &bag).unwrap();
        placement.apply_move(&zones, &id("torch"), &bag).unwrap();
        let before = placement.fingerprint();

        let err = placement.apply_move(&zones, &id("kit"), &bag).unwrap_err();
        assert_eq!(
            err,
            SessionError::ZoneCapacityExceeded {
                zone: ZoneId::from("bag"),
                capacity: 2,
            }
        );
        assert_eq!(placement.fingerprint(), before);
        assert_eq!(placement.location(&id("kit")), Some(&Location::Unsorted));
    }

    #[test]
    fn moving_into_the_current_zone_is_a_no_op_even_when_full() {
        let (catalog, zones) = fixture();
        let mut placement = Placement::new(&catalog);
        let bag = Location::zone("bag");
        placement.apply_move(&zones, &id("water"), &bag).unwrap();
        placement.apply_move(&zones, &id("torch"), &bag).unwrap();
        assert_eq!(placement.apply_move(&zones, &id("water"), &bag), Ok(None));
        assert_eq!(
            placement.apply_move(&zones, &id("toy"), &Location::Unsorted),
            Ok(None)
        );
    }

    #[test]
    fn rejects_unknown_references() {
        let (catalog, zones) = fixture();
        let mut placement = Placement::new(&catalog);
        assert_eq!(
            placement.apply_move(&zones, &id("ghost"), &Location::zone("bag")),
            Err(SessionError::InvalidItemReference(id("ghost")))
        );
        assert_eq!(
            placement.apply_move(&zones, &id("water"), &Location::zone("attic")),
            Err(SessionError::UnknownZone(ZoneId::from("attic")))
        );
    }

    #[test]
    fn spatial_zones_require_coordinates() {
        let (catalog, zones) = fixture();
        let mut placement = Placement::new(&catalog);
        assert_eq!(
            placement.apply_move(&zones, &id("water"), &Location::zone("map")),
            Err(SessionError::MissingCoordinate(ZoneId::from("map")))
        );
        assert_eq!(
            placement.apply_place_at(&zones, &id("water"), &ZoneId::from("shelf"), Point::new(1.0, 1.0)),
            Err(SessionError::NotSpatial(ZoneId::from("shelf")))
        );

        let from = placement
            .apply_place_at(&zones, &id("water"), &ZoneId::from("map"), Point::new(10.0, 20.0))
            .unwrap();
        assert_eq!(from, Location::Unsorted);
        assert_eq!(placement.point(&id("water")), Some(Point::new(10.0, 20.0)));

        placement
            .apply_move(&zones, &id("water"), &Location::Unsorted)
            .unwrap();
        assert_eq!(placement.point(&id("water")), None);
    }

    #[test]
    fn links_are_symmetric_and_detach_on_move() {
        let (catalog, zones) = fixture();
        let mut placement = Placement::new(&catalog);
        placement
            .apply_move(&zones, &id("water"), &Location::zone("bag"))
            .unwrap();
        placement
            .apply_move(&zones, &id("kit"), &Location::zone("shelf"))
            .unwrap();
        placement
            .apply_link(&catalog, &id("water"), &id("kit"), LinkPolicy::Free)
            .unwrap();
        assert_eq!(placement.partner(&id("water")), Some(&id("kit")));
        assert_eq!(placement.partner(&id("kit")), Some(&id("water")));
        assert_eq!(placement.link_count(), 1);

        placement
            .apply_move(&zones, &id("kit"), &Location::Unsorted)
            .unwrap();
        assert_eq!(placement.partner(&id("water")), None);
        assert_eq!(placement.link_count(), 0);
    }

    #[test]
    fn links_inside_one_zone_or_to_self_are_invalid() {
        let (catalog, zones) = fixture();
        let mut placement = Placement::new(&catalog);
        let bag = Location::zone("bag");
        placement.apply_move(&zones, &id("water"), &bag).unwrap();
        placement.apply_move(&zones, &id("kit"), &bag).unwrap();
        assert!(matches!(
            placement.apply_link(&catalog, &id("water"), &id("kit"), LinkPolicy::Free),
            Err(SessionError::InvalidLink { .. })
        ));
        assert!(matches!(
            placement.apply_link(&catalog, &id("toy"), &id("toy"), LinkPolicy::Free),
            Err(SessionError::InvalidLink { .. })
        ));
        // Both unsorted is allowed: matchers keep every card in the pool.
        assert!(
            placement
                .apply_link(&catalog, &id("torch"), &id("toy"), LinkPolicy::Free)
                .is_ok()
        );
    }

    #[test]
    fn free_links_replace_and_confirmed_links_stick() {
        let (catalog, _) = fixture();
        let mut placement = Placement::new(&catalog);
        placement
            .apply_link(&catalog, &id("water"), &id("toy"), LinkPolicy::Free)
            .unwrap();
        let detached = placement
            .apply_link(&catalog, &id("water"), &id("kit"), LinkPolicy::Free)
            .unwrap();
        assert_eq!(detached, vec![(id("water"), id("toy"))]);
        assert_eq!(placement.partner(&id("toy")), None);

        let mut confirmed = Placement::new(&catalog);
        assert_eq!(
            confirmed.apply_link(&catalog, &id("water"), &id("toy"), LinkPolicy::Confirmed),
            Err(SessionError::PairMismatch {
                a: id("water"),
                b: id("toy"),
            })
        );
        assert_eq!(confirmed.link_count(), 0);
        confirmed
            .apply_link(&catalog, &id("water"), &id("kit"), LinkPolicy::Confirmed)
            .unwrap();
        assert_eq!(
            confirmed.apply_link(&catalog, &id("kit"), &id("torch"), LinkPolicy::Confirmed),
            Err(SessionError::AlreadyLinked(id("kit")))
        );
    }

    #[test]
    fn unlink_reports_partner() {
        let (catalog, _) = fixture();
        let mut placement = Placement::new(&catalog);
        assert_eq!(
            placement.unlink(&id("water")),
            Err(SessionError::NotLinked(id("water")))
        );
        placement
            .apply_link(&catalog, &id("water"), &id("kit"), LinkPolicy::Free)
            .unwrap();
        assert_eq!(placement.unlink(&id("kit")), Ok(id("water")));
        assert_eq!(placement.link_count(), 0);
    }

    #[test]
    fn fingerprint_tracks_changes() {
        let (catalog, zones) = fixture();
        let mut placement = Placement::new(&catalog);
        let initial = placement.fingerprint();
        assert_eq!(Placement::new(&catalog).fingerprint(), initial);
        placement
            .apply_move(&zones, &id("water"), &Location::zone("shelf"))
            .unwrap();
        assert_ne!(placement.fingerprint(), initial);
        placement
            .apply_move(&zones, &id("water"), &Location::Unsorted)
            .unwrap();
        assert_eq!(placement.fingerprint(), initial);
    }
}
