//! Save slot persistence
//!
//! Progress is mirrored as one JSON record under a fixed key. The in-memory
//! state stays authoritative: save failures are reported, and anything that
//! cannot be read back counts as "no save".
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::KeyValueStore;
use crate::catalog::Catalog;
use crate::state::{CompletedTheme, ProgressionState};

/// Key the progress record lives under unless configured otherwise.
pub const DEFAULT_SAVE_KEY: &str = "istanbulMacerasi_save";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no saved game")]
    NotFound,
    #[error("storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}

/// Stored shape of a save.
///
/// Every field is optional on read so older or hand-edited records still
/// load; indices are signed so negative values can be clamped instead of
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    #[serde(default)]
    pub current_theme_index: Option<i64>,
    #[serde(default)]
    pub current_question_index: Option<i64>,
    #[serde(default)]
    pub completed_themes: Option<Vec<CompletedTheme>>,
    #[serde(default)]
    pub last_save_time: Option<String>,
    #[serde(default)]
    pub finale_shown: bool,
}

impl SaveRecord {
    #[must_use]
    pub fn capture(state: &ProgressionState, at: DateTime<Utc>) -> Self {
        Self {
            current_theme_index: Some(i64::try_from(state.theme_index).unwrap_or(i64::MAX)),
            current_question_index: Some(i64::try_from(state.question_index).unwrap_or(i64::MAX)),
            completed_themes: Some(state.completed_themes().to_vec()),
            last_save_time: Some(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            finale_shown: state.finale_shown,
        }
    }

    /// Parsed save timestamp; an unreadable one is ignored.
    #[must_use]
    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_save_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    #[must_use]
    pub fn into_state(self) -> ProgressionState {
        let last_saved = self.last_saved();
        ProgressionState::restore(
            index_from(self.current_theme_index),
            index_from(self.current_question_index),
            self.completed_themes.unwrap_or_default(),
            last_saved,
            self.finale_shown,
        )
    }
}

fn index_from(raw: Option<i64>) -> usize {
    match raw {
        Some(value) if value > 0 => usize::try_from(value).unwrap_or(usize::MAX),
        _ => 0,
    }
}

/// What the start screen shows about an existing save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub theme_index: usize,
    pub theme_name: Option<String>,
    pub completed_count: usize,
    pub last_saved: Option<DateTime<Utc>>,
}

/// Persistence adapter binding a store to the progress key.
#[derive(Debug, Clone)]
pub struct SaveSlot<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> SaveSlot<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, DEFAULT_SAVE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Write `state` stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or the store rejects it.
    pub fn save(&self, state: &ProgressionState) -> Result<DateTime<Utc>, PersistenceError> {
        self.save_at(state, Utc::now())
    }

    /// Write `state` stamped with `at`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or the store rejects it.
    pub fn save_at(
        &self,
        state: &ProgressionState,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, PersistenceError> {
        let payload = serde_json::to_string(&SaveRecord::capture(state, at))?;
        self.store
            .set(&self.key, &payload)
            .map_err(PersistenceError::store)?;
        log::debug!(
            "saved progress theme={} question={} completed={}",
            state.theme_index,
            state.question_index,
            state.completed_themes().len()
        );
        Ok(at)
    }

    /// Read the saved record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing usable is stored (absent or malformed),
    /// or a store error when the backend itself fails.
    pub fn record(&self) -> Result<SaveRecord, PersistenceError> {
        let raw = self
            .store
            .get(&self.key)
            .map_err(PersistenceError::store)?
            .ok_or(PersistenceError::NotFound)?;
        serde_json::from_str(&raw).map_err(|err| {
            log::warn!("discarding malformed save under '{}': {err}", self.key);
            PersistenceError::NotFound
        })
    }

    /// Restore progress. Indices are not yet checked against a catalog.
    ///
    /// # Errors
    ///
    /// See [`SaveSlot::record`].
    pub fn load(&self) -> Result<ProgressionState, PersistenceError> {
        self.record().map(SaveRecord::into_state)
    }

    /// True if any value sits under the key, parseable or not.
    pub fn exists(&self) -> bool {
        matches!(self.store.get(&self.key), Ok(Some(_)))
    }

    /// # Errors
    ///
    /// Returns an error if the store cannot remove the record.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store
            .remove(&self.key)
            .map_err(PersistenceError::store)
    }

    /// Summary of the stored save, resolved against `catalog`.
    pub fn summary(&self, catalog: &Catalog) -> Option<SaveSummary> {
        let record = self.record().ok()?;
        let last_saved = record.last_saved();
        let state = record.into_state();
        Some(SaveSummary {
            theme_index: state.theme_index,
            theme_name: catalog
                .themes
                .get(state.theme_index)
                .map(|t| t.name.clone()),
            completed_count: state.completed_themes().len(),
            last_saved,
        })
    }
}
