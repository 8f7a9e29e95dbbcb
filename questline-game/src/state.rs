//! Player progression: position, completed themes and their invariants
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Catalog, Theme};

/// A theme the player has finished, with the reward it unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTheme {
    pub name: String,
    #[serde(default)]
    pub reward_image: String,
}

impl CompletedTheme {
    #[must_use]
    pub fn of(theme: &Theme) -> Self {
        Self {
            name: theme.name.clone(),
            reward_image: theme.reward_image.clone(),
        }
    }
}

/// Violations of the progression invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("theme index {index} beyond catalog of {count}")]
    ThemeIndex { index: usize, count: usize },
    #[error("question index {index} outside theme '{theme}' ({len} questions)")]
    QuestionIndex {
        theme: String,
        index: usize,
        len: usize,
    },
    #[error("theme '{name}' recorded as completed twice")]
    DuplicateCompletion { name: String },
}

/// Where the player currently stands, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub theme_index: usize,
    pub question_index: usize,
    pub theme_name: Option<String>,
    pub question_count: usize,
    pub finished: bool,
}

/// The player's mutable progress through the catalog.
///
/// Only the engine mutates this; the completed list is append/update only
/// and unique by theme name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressionState {
    pub theme_index: usize,
    pub question_index: usize,
    completed: Vec<CompletedTheme>,
    pub last_saved: Option<DateTime<Utc>>,
    pub finale_shown: bool,
}

impl ProgressionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state from persisted parts, dropping duplicate completions.
    #[must_use]
    pub fn restore(
        theme_index: usize,
        question_index: usize,
        completed: impl IntoIterator<Item = CompletedTheme>,
        last_saved: Option<DateTime<Utc>>,
        finale_shown: bool,
    ) -> Self {
        let mut state = Self {
            theme_index,
            question_index,
            completed: Vec::new(),
            last_saved,
            finale_shown,
        };
        for entry in completed {
            state.insert_completed(entry);
        }
        state
    }

    #[must_use]
    pub fn completed_themes(&self) -> &[CompletedTheme] {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, name: &str) -> bool {
        self.completed.iter().any(|c| c.name == name)
    }

    /// Record `theme` as completed. Returns false if it already was.
    pub fn record_completion(&mut self, theme: &Theme) -> bool {
        self.insert_completed(CompletedTheme::of(theme))
    }

    fn insert_completed(&mut self, entry: CompletedTheme) -> bool {
        if self.is_completed(&entry.name) {
            return false;
        }
        self.completed.push(entry);
        true
    }

    #[must_use]
    pub fn is_finished(&self, catalog: &Catalog) -> bool {
        self.theme_index >= catalog.theme_count()
    }

    #[must_use]
    pub fn position(&self, catalog: &Catalog) -> Position {
        let theme = catalog.themes.get(self.theme_index);
        Position {
            theme_index: self.theme_index,
            question_index: self.question_index,
            theme_name: theme.map(|t| t.name.clone()),
            question_count: theme.map_or(0, |t| t.questions.len()),
            finished: theme.is_none(),
        }
    }

    /// Pull out-of-range indices back inside the catalog.
    ///
    /// A theme index past the end means every theme is done; a question
    /// index past its theme restarts that theme. Returns true if anything
    /// changed.
    pub fn clamp_to(&mut self, catalog: &Catalog) -> bool {
        let before = (self.theme_index, self.question_index);
        let count = catalog.theme_count();
        if self.theme_index > count {
            log::warn!(
                "saved theme index {} beyond catalog of {count}; treating as finished",
                self.theme_index
            );
            self.theme_index = count;
        }
        let limit = catalog
            .themes
            .get(self.theme_index)
            .map_or(0, |t| t.questions.len());
        if self.question_index >= limit.max(1) {
            log::warn!(
                "saved question index {} outside theme {}; restarting theme",
                self.question_index,
                self.theme_index
            );
            self.question_index = 0;
        }
        before != (self.theme_index, self.question_index)
    }

    /// Verify the progression invariants against `catalog`.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check(&self, catalog: &Catalog) -> Result<(), StateError> {
        let count = catalog.theme_count();
        if self.theme_index > count {
            return Err(StateError::ThemeIndex {
                index: self.theme_index,
                count,
            });
        }
        if let Some(theme) = catalog.themes.get(self.theme_index) {
            let len = theme.questions.len();
            if self.question_index >= len.max(1) {
                return Err(StateError::QuestionIndex {
                    theme: theme.name.clone(),
                    index: self.question_index,
                    len,
                });
            }
        }
        for (idx, entry) in self.completed.iter().enumerate() {
            if self.completed[..idx].iter().any(|c| c.name == entry.name) {
                return Err(StateError::DuplicateCompletion {
                    name: entry.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Question, ThemeKind};

    fn catalog() -> Catalog {
        let questions = (0..5)
            .map(|i| Question::multiple_choice(format!("q{i}"), &["a", "b"], 0))
            .collect();
        Catalog::from_themes(vec![
            Theme::standard("Galata", questions, 3, "galata.png"),
            Theme::minigame("Hearts", ThemeKind::HeartGame, "hearts.png"),
        ])
        .unwrap()
    }

    #[test]
    fn record_completion_is_idempotent() {
        let catalog = catalog();
        let mut state = ProgressionState::new();
        assert!(state.record_completion(&catalog.themes[0]));
        assert!(!state.record_completion(&catalog.themes[0]));
        assert_eq!(state.completed_themes().len(), 1);
        assert!(state.is_completed("Galata"));
        assert!(!state.is_completed("Hearts"));
    }

    #[test]
    fn restore_drops_duplicate_entries() {
        let entry = CompletedTheme {
            name: "Galata".into(),
            reward_image: "galata.png".into(),
        };
        let state = ProgressionState::restore(1, 0, vec![entry.clone(), entry], None, false);
        assert_eq!(state.completed_themes().len(), 1);
        assert!(state.check(&catalog()).is_ok());
    }

    #[test]
    fn clamp_pulls_indices_into_range() {
        let catalog = catalog();
        let mut past_end = ProgressionState::restore(9, 3, Vec::new(), None, false);
        assert!(past_end.clamp_to(&catalog));
        assert_eq!((past_end.theme_index, past_end.question_index), (2, 0));
        assert!(past_end.is_finished(&catalog));

        let mut bad_question = ProgressionState::restore(0, 7, Vec::new(), None, false);
        assert!(bad_question.clamp_to(&catalog));
        assert_eq!(bad_question.question_index, 0);

        let mut minigame = ProgressionState::restore(1, 2, Vec::new(), None, false);
        minigame.clamp_to(&catalog);
        assert_eq!(minigame.question_index, 0);

        let mut fine = ProgressionState::restore(0, 4, Vec::new(), None, false);
        assert!(!fine.clamp_to(&catalog));
    }

    #[test]
    fn check_flags_out_of_range_question() {
        let catalog = catalog();
        let state = ProgressionState::restore(0, 5, Vec::new(), None, false);
        assert_eq!(
            state.check(&catalog),
            Err(StateError::QuestionIndex {
                theme: "Galata".into(),
                index: 5,
                len: 5
            })
        );
    }

    #[test]
    fn position_reports_finished_past_last_theme() {
        let catalog = catalog();
        let state = ProgressionState::restore(2, 0, Vec::new(), None, false);
        let position = state.position(&catalog);
        assert!(position.finished);
        assert_eq!(position.theme_name, None);

        let start = ProgressionState::new().position(&catalog);
        assert_eq!(start.theme_name.as_deref(), Some("Galata"));
        assert_eq!(start.question_count, 5);
    }
}
