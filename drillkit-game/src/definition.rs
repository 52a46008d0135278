//! Declarative game definitions: one JSON entry per mini-game.
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Item};
use crate::error::{CatalogError, DefinitionError};
use crate::result::TierBasis;
use crate::scoring::{ScoreTerm, ScoringRule};
use crate::session::{GameSession, SessionConfig, SessionRules, Variant};
use crate::zones::{Zone, ZoneSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub rules: SessionRules,
    pub scoring: ScoringRule,
}

impl GameDefinition {
    /// Check the definition and build its validated catalog and zone set.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found: catalog invariants, an
    /// empty game, proximity scoring without targets or a spatial zone,
    /// unordered message tiers, percentage tiers without a known maximum,
    /// or a zero-second countdown.
    pub fn validate(&self) -> Result<(Catalog, ZoneSet), DefinitionError> {
        let wrap = |source: CatalogError| DefinitionError::Catalog {
            game: self.id.clone(),
            source,
        };
        let zones = ZoneSet::new(self.zones.clone()).map_err(wrap)?;
        let catalog = Catalog::new(self.items.clone(), &zones).map_err(wrap)?;

        match &self.variant {
            Variant::Sequential(set) if set.rounds.is_empty() => {
                return Err(DefinitionError::EmptyRounds(self.id.clone()));
            }
            Variant::Sequential(_) => {}
            Variant::Timed { seconds: 0 } => {
                return Err(DefinitionError::ZeroCountdown(self.id.clone()));
            }
            Variant::Manual { .. } | Variant::Timed { .. } => {
                if catalog.is_empty() {
                    return Err(DefinitionError::EmptyCatalog(self.id.clone()));
                }
            }
        }

        let scores_proximity = self
            .scoring
            .terms
            .iter()
            .any(|term| matches!(term, ScoreTerm::Proximity { .. }));
        if scores_proximity {
            if !zones.has_spatial() {
                return Err(DefinitionError::NoSpatialZone(self.id.clone()));
            }
            if let Some(item) = catalog.iter().find(|item| item.target.is_none()) {
                return Err(DefinitionError::MissingTarget {
                    game: self.id.clone(),
                    item: item.id.clone(),
                });
            }
        }

        if !self.scoring.messages.is_descending() {
            return Err(DefinitionError::TiersOutOfOrder(self.id.clone()));
        }
        if self.scoring.messages.basis == TierBasis::Percent && !self.has_known_max(&catalog) {
            return Err(DefinitionError::PercentWithoutMax(self.id.clone()));
        }

        Ok((catalog, zones))
    }

    fn has_known_max(&self, catalog: &Catalog) -> bool {
        match &self.variant {
            Variant::Sequential(_) => {
                self.scoring.max_score.is_some() || self.scoring.modifiers.is_empty()
            }
            _ => self.scoring.max_score(catalog).is_some(),
        }
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            id: self.id.clone(),
            variant: self.variant.clone(),
            rules: self.rules,
            scoring: self.scoring.clone(),
        }
    }

    /// Validate and open a fresh session.
    ///
    /// # Errors
    ///
    /// Returns any error [`Self::validate`] reports.
    pub fn build_session(&self, seed: u64) -> Result<GameSession, DefinitionError> {
        GameSession::from_definition(self, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Point;
    use crate::scoring::DistanceBand;

    fn parse(json: &str) -> GameDefinition {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let game = parse(
            r#"{
                "id": "mini",
                "title": "Mini",
                "items": [{ "id": "a", "label": "A", "zone": "z" }],
                "zones": [{ "id": "z", "label": "Zone" }],
                "scoring": { "terms": [{ "kind": "binary", "reward": 10, "penalty": 5 }] }
            }"#,
        );
        assert_eq!(
            game.variant,
            Variant::Manual {
                require_all_placed: true,
                min_placed: 0,
            }
        );
        assert_eq!(game.rules, SessionRules::default());
        let session = game.build_session(1).unwrap();
        assert_eq!(session.catalog().len(), 1);
    }

    #[test]
    fn catalog_errors_name_the_game() {
        let game = parse(
            r#"{
                "id": "broken",
                "title": "Broken",
                "items": [{ "id": "a", "label": "A", "zone": "missing" }],
                "scoring": {}
            }"#,
        );
        let err = game.validate().unwrap_err();
        assert!(matches!(err, DefinitionError::Catalog { ref game, .. } if game == "broken"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn proximity_needs_targets_and_a_spatial_zone() {
        let mut game = GameDefinition {
            id: "zones".into(),
            title: "Zones".into(),
            description: String::new(),
            items: vec![
                Item::new("tent", "Tent").targeting(Point::new(1.0, 1.0)),
                Item::new("post", "Post"),
            ],
            zones: vec![Zone::new("map", "Map")],
            variant: Variant::default(),
            rules: SessionRules::default(),
            scoring: ScoringRule {
                terms: vec![ScoreTerm::Proximity {
                    bands: vec![DistanceBand {
                        within: 50.0,
                        points: 20,
                    }],
                }],
                ..ScoringRule::default()
            },
        };
        assert!(matches!(
            game.validate(),
            Err(DefinitionError::NoSpatialZone(_))
        ));
        game.zones = vec![Zone::new("map", "Map").spatial()];
        assert!(matches!(
            game.validate(),
            Err(DefinitionError::MissingTarget { .. })
        ));
        game.items[1].target = Some(Point::new(2.0, 2.0));
        assert!(game.validate().is_ok());
    }

    #[test]
    fn rejects_empty_games_and_zero_countdowns() {
        let empty = parse(r#"{ "id": "e", "title": "E", "scoring": {} }"#);
        assert!(matches!(
            empty.validate(),
            Err(DefinitionError::EmptyCatalog(_))
        ));

        let timed = parse(
            r#"{
                "id": "t",
                "title": "T",
                "items": [{ "id": "a", "label": "A" }],
                "variant": { "kind": "timed", "seconds": 0 },
                "scoring": {}
            }"#,
        );
        assert!(matches!(
            timed.validate(),
            Err(DefinitionError::ZeroCountdown(_))
        ));

        let rounds = parse(
            r#"{
                "id": "r",
                "title": "R",
                "variant": { "kind": "sequential", "rounds": [], "rule": { "kind": "per_position", "points": 5 } },
                "scoring": {}
            }"#,
        );
        assert!(matches!(
            rounds.validate(),
            Err(DefinitionError::EmptyRounds(_))
        ));
    }

    #[test]
    fn message_tiers_must_descend_and_percent_needs_a_max() {
        let unordered = parse(
            r#"{
                "id": "u",
                "title": "U",
                "items": [{ "id": "a", "label": "A" }],
                "scoring": { "messages": { "tiers": [
                    { "min": 10, "message": "low" },
                    { "min": 50, "message": "high" }
                ] } }
            }"#,
        );
        assert!(matches!(
            unordered.validate(),
            Err(DefinitionError::TiersOutOfOrder(_))
        ));

        let percent = parse(
            r#"{
                "id": "p",
                "title": "P",
                "items": [{ "id": "a", "label": "A" }],
                "scoring": {
                    "terms": [{ "kind": "flat", "points": 10 }],
                    "modifiers": [{ "kind": "elapsed_penalty", "divisor": 2, "cap": 5 }],
                    "messages": { "basis": "percent", "tiers": [{ "min": 50, "message": "ok" }] }
                }
            }"#,
        );
        assert!(matches!(
            percent.validate(),
            Err(DefinitionError::PercentWithoutMax(_))
        ));
    }
}
