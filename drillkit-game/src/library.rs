//! Built-in library of preparedness mini-games.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::definition::GameDefinition;
use crate::error::DefinitionError;
use crate::session::GameSession;

const DEFAULT_GAMES_DATA: &str = include_str!("../assets/data/games.json");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameLibrary {
    #[serde(default)]
    pub games: Vec<GameDefinition>,
}

impl GameLibrary {
    /// Parse and validate the embedded game table.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON is malformed or any game fails
    /// validation.
    pub fn load_from_static() -> Result<Self, DefinitionError> {
        Self::from_json(DEFAULT_GAMES_DATA)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed, a game id repeats, or
    /// any game fails validation.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        let library: Self = serde_json::from_str(json)?;
        library.validate()?;
        Ok(library)
    }

    /// # Errors
    ///
    /// Returns the first duplicate id or invalid game.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut seen = HashSet::with_capacity(self.games.len());
        for game in &self.games {
            if !seen.insert(game.id.as_str()) {
                return Err(DefinitionError::DuplicateGame(game.id.clone()));
            }
            game.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GameDefinition> {
        self.games.iter().find(|game| game.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.games.iter().map(|game| game.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameDefinition> {
        self.games.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.games.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Open a session for a game by id.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::UnknownGame`] for an unknown id, or the
    /// game's validation error.
    pub fn build_session(&self, id: &str, seed: u64) -> Result<GameSession, DefinitionError> {
        self.get(id)
            .ok_or_else(|| DefinitionError::UnknownGame(id.to_string()))?
            .build_session(seed)
    }
}
