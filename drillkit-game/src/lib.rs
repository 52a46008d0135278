//! Drillkit Game Engine
//!
//! Platform-agnostic drag-and-sort classification engine for preparedness
//! mini-games: item pools, drop zones, links, rounds, timers and scoring.
//! Every game is a data table; this crate has no UI dependencies.

pub mod catalog;
pub mod constants;
pub mod definition;
pub mod error;
pub mod library;
pub mod numbers;
pub mod placement;
pub mod result;
pub mod rounds;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod zones;

// Re-export commonly used types
pub use catalog::{Catalog, Item, ItemId, PairId, Point};
pub use definition::GameDefinition;
pub use error::{CatalogError, DefinitionError, SessionError};
pub use library::GameLibrary;
pub use placement::{LinkPolicy, Location, Placement};
pub use result::{
    Contribution, MessageTiers, Outcome, ScoringResult, Tier, TierBasis, Verdict,
};
pub use rounds::{ClampGranularity, Response, Round, RoundOutcome, RoundProgress, RoundRule, RoundSet};
pub use scoring::{
    AttemptCount, Band, DistanceBand, Modifier, PairAlignment, PlayStats, ScoreTerm, ScoringRule,
    evaluate, evaluate_rounds,
};
pub use session::{
    DriveReport, FinalizeTrigger, GameSession, Intent, IntentSource, Phase, PlacementSnapshot,
    PoolView, RoundView, SessionConfig, SessionEvent, SessionObserver, SessionRules, Variant,
};
pub use timer::{Clock, Countdown, Stopwatch, TickOutcome};
pub use zones::{Zone, ZoneId, ZoneSet};

/// Trait for abstracting where game definitions come from.
/// Front-ends and tools provide their own; [`StaticLoader`] serves the
/// embedded library.
pub trait DefinitionLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load every available game definition
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions cannot be loaded or validated.
    fn load_library(&self) -> Result<GameLibrary, Self::Error>;
}

/// Loader for the game table compiled into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLoader;

impl DefinitionLoader for StaticLoader {
    type Error = DefinitionError;

    fn load_library(&self) -> Result<GameLibrary, Self::Error> {
        GameLibrary::load_from_static()
    }
}

/// Main game engine for opening sessions
pub struct GameEngine<L>
where
    L: DefinitionLoader,
{
    loader: L,
}

impl<L> GameEngine<L>
where
    L: DefinitionLoader,
{
    /// Create a new game engine with the provided definition loader
    pub const fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Ids of every game the loader provides.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions cannot be loaded.
    pub fn list_games(&self) -> Result<Vec<String>, L::Error> {
        let library = self.loader.load_library()?;
        Ok(library.ids().map(str::to_string).collect())
    }

    /// Open a fresh session for a game.
    ///
    /// # Errors
    ///
    /// Returns an error if the definitions cannot be loaded, the id is
    /// unknown, or the game fails validation.
    pub fn create_session(&self, game_id: &str, seed: u64) -> Result<GameSession, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let library = self.loader.load_library().map_err(Into::into)?;
        let session = library.build_session(game_id, seed)?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DefinitionLoader for FixtureLoader {
        type Error = Infallible;

        fn load_library(&self) -> Result<GameLibrary, Self::Error> {
            let game: GameDefinition = serde_json::from_str(
                r#"{
                    "id": "fixture",
                    "title": "Fixture",
                    "items": [{ "id": "a", "label": "A", "zone": "z" }],
                    "zones": [{ "id": "z", "label": "Zone" }],
                    "scoring": { "terms": [{ "kind": "binary", "reward": 1, "penalty": 0 }] }
                }"#,
            )
            .unwrap();
            Ok(GameLibrary { games: vec![game] })
        }
    }

    #[test]
    fn engine_opens_sessions_from_any_loader() {
        let engine = GameEngine::new(FixtureLoader);
        assert_eq!(engine.list_games().unwrap(), vec!["fixture".to_string()]);
        let session = engine.create_session("fixture", 9).unwrap();
        assert_eq!(session.phase(), Phase::Setup);
        assert!(engine.create_session("other", 9).is_err());
    }

    #[test]
    fn static_loader_serves_the_builtin_library() {
        let engine = GameEngine::new(StaticLoader);
        let games = engine.list_games().unwrap();
        assert!(games.contains(&"hazard_sort".to_string()));
        let session = engine.create_session("hazard_sort", 1).unwrap();
        assert_eq!(session.catalog().len(), 12);
    }
}
