//! Questline Game Engine
//!
//! Platform-agnostic progression logic for a themed quiz adventure: ordered
//! themes of questions or minigames, checkpoint rollbacks on wrong answers,
//! unlockable rewards and a single persisted save slot. No UI, no timers.

pub mod answer;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod loader;
pub mod minigame;
pub mod navigation;
pub mod persistence;
pub mod session;
pub mod state;
pub mod stores;

use std::sync::Arc;

// Re-export commonly used types
pub use answer::{Answer, is_single_word};
pub use catalog::{Catalog, CatalogError, MapPosition, Question, QuestionKind, Theme, ThemeKind};
pub use checkpoint::{Rollback, rollback_for};
pub use config::{ChoiceConfig, ConfigError, GameConfig, HeartGridConfig, RevealTimings};
pub use engine::{Effect, EngineError, Event, Feedback, Phase, Step, step};
pub use loader::{BUNDLED_CATALOG, JsonLoader, LoaderError};
pub use minigame::{BinaryChoice, GridTap, HeartGrid, Minigame, MinigameKind, Refusal};
pub use navigation::{NavigationHistory, Screen};
pub use persistence::{DEFAULT_SAVE_KEY, PersistenceError, SaveRecord, SaveSlot, SaveSummary};
pub use session::{Outcome, QuestSession, SaveStatus, ThemeStatus};
pub use state::{CompletedTheme, Position, ProgressionState, StateError};
pub use stores::{FileStore, FileStoreError, MemoryStore};

/// Trait for abstracting content loading
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the theme catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or fails validation.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Whether a configuration document named `config_name` is available
    fn has_config(&self, config_name: &str) -> bool;

    /// Load a named configuration document
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for the string key-value store that holds the save slot
/// Platform-specific implementations should provide this
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot remove the key.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

/// Main game engine: boots content once and hands out sessions
pub struct GameEngine<L, S>
where
    L: CatalogLoader,
    S: KeyValueStore,
{
    loader: L,
    storage: S,
    config: GameConfig,
    catalog: Option<Arc<Catalog>>,
}

impl<L, S> GameEngine<L, S>
where
    L: CatalogLoader,
    S: KeyValueStore,
{
    /// Create an engine; nothing is loaded until [`GameEngine::boot`].
    pub fn new(loader: L, storage: S) -> Self {
        Self {
            loader,
            storage,
            config: GameConfig::default(),
            catalog: None,
        }
    }

    /// Load the catalog and the optional `game` config.
    ///
    /// A missing or invalid config falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub fn boot(&mut self) -> Result<Arc<Catalog>, L::Error> {
        let catalog = Arc::new(self.loader.load_catalog()?);
        self.config = if self.loader.has_config("game") {
            match self.loader.load_config::<GameConfig>("game") {
                Ok(cfg) => match cfg.validate() {
                    Ok(()) => cfg,
                    Err(err) => {
                        log::warn!("ignoring game config: {err}");
                        GameConfig::default()
                    }
                },
                Err(err) => {
                    log::warn!("unreadable game config ({err}); using defaults");
                    GameConfig::default()
                }
            }
        } else {
            log::debug!("no game config; using defaults");
            GameConfig::default()
        };
        log::info!("catalog loaded with {} themes", catalog.theme_count());
        self.catalog = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.catalog.is_some()
    }

    #[must_use]
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_deref()
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Start a session on the start screen.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` before a successful boot.
    pub fn session(&self) -> Result<QuestSession<S>, EngineError>
    where
        S: Clone,
    {
        let catalog = self.catalog.clone().ok_or(EngineError::NotReady)?;
        Ok(QuestSession::new(
            catalog,
            self.storage.clone(),
            self.config.clone(),
        ))
    }
}
