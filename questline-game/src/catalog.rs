//! Theme catalog document, validation and lookups
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::minigame::MinigameKind;

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    MultipleChoice,
    OpenEnded,
}

/// A single quiz question within a theme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question", alias = "prompt")]
    pub prompt: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Index of the correct option for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<usize>,
}

impl Question {
    #[must_use]
    pub fn multiple_choice(prompt: impl Into<String>, options: &[&str], answer: usize) -> Self {
        Self {
            prompt: prompt.into(),
            kind: QuestionKind::MultipleChoice,
            options: options.iter().map(|o| (*o).to_string()).collect(),
            answer: Some(answer),
        }
    }

    #[must_use]
    pub fn open_ended(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            kind: QuestionKind::OpenEnded,
            options: Vec::new(),
            answer: None,
        }
    }
}

/// What a theme asks of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemeKind {
    #[default]
    Standard,
    HeartGame,
    #[serde(rename = "birthday_game", alias = "choice_game")]
    ChoiceGame,
}

impl ThemeKind {
    /// The minigame played instead of questions, if any.
    #[must_use]
    pub const fn minigame(self) -> Option<MinigameKind> {
        match self {
            Self::Standard => None,
            Self::HeartGame => Some(MinigameKind::HeartGrid),
            Self::ChoiceGame => Some(MinigameKind::BinaryChoice),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPosition {
    pub x: f32,
    pub y: f32,
}

/// A named unit of content unlocked in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ThemeKind,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// 1-based question the player falls back to after a late mistake.
    #[serde(default = "default_checkpoint")]
    pub checkpoint_question: usize,
    #[serde(default)]
    pub reward_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_position: Option<MapPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_finale: Option<bool>,
}

fn default_checkpoint() -> usize {
    1
}

impl Theme {
    #[must_use]
    pub fn standard(
        name: impl Into<String>,
        questions: Vec<Question>,
        checkpoint_question: usize,
        reward_image: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ThemeKind::Standard,
            questions,
            checkpoint_question,
            reward_image: reward_image.into(),
            background: None,
            map_position: None,
            is_finale: None,
        }
    }

    #[must_use]
    pub fn minigame(name: impl Into<String>, kind: ThemeKind, reward_image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            questions: Vec::new(),
            checkpoint_question: default_checkpoint(),
            reward_image: reward_image.into(),
            background: None,
            map_position: None,
            is_finale: None,
        }
    }

    #[must_use]
    pub const fn is_minigame(&self) -> bool {
        self.kind.minigame().is_some()
    }
}

/// Errors raised while loading or addressing the content catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("catalog has no themes")]
    Empty,
    #[error("theme name '{name}' appears more than once")]
    DuplicateTheme { name: String },
    #[error("theme '{theme}' has no questions")]
    NoQuestions { theme: String },
    #[error("theme '{theme}' checkpoint {checkpoint} outside 1..={questions}")]
    CheckpointOutOfRange {
        theme: String,
        checkpoint: usize,
        questions: usize,
    },
    #[error("theme '{theme}' question {question} answer {answer:?} does not match {options} options")]
    BadAnswer {
        theme: String,
        question: usize,
        answer: Option<usize>,
        options: usize,
    },
    #[error("theme index {index} out of range (catalog has {count})")]
    OutOfRange { index: usize, count: usize },
}

/// Immutable content for a whole game, loaded once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub themes: Vec<Theme>,
    #[serde(default)]
    pub maps: Vec<String>,
    #[serde(default)]
    pub player_icon: String,
    #[serde(default, rename = "kavusmaImage")]
    pub reunion_image: String,
    #[serde(default, rename = "kavustukkImage")]
    pub reunion_reveal_image: String,
    #[serde(default)]
    pub map_image: String,
}

impl Catalog {
    /// Build a catalog from themes alone and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the themes violate catalog invariants.
    pub fn from_themes(themes: Vec<Theme>) -> Result<Self, CatalogError> {
        let catalog = Self {
            themes,
            maps: Vec::new(),
            player_icon: String::new(),
            reunion_image: String::new(),
            reunion_reveal_image: String::new(),
            map_image: String::new(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or violates catalog invariants.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check the structural rules every engine operation relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.themes.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for theme in &self.themes {
            if !seen.insert(theme.name.as_str()) {
                return Err(CatalogError::DuplicateTheme {
                    name: theme.name.clone(),
                });
            }
            if theme.is_minigame() {
                continue;
            }
            if theme.questions.is_empty() {
                return Err(CatalogError::NoQuestions {
                    theme: theme.name.clone(),
                });
            }
            if theme.checkpoint_question == 0 || theme.checkpoint_question > theme.questions.len() {
                return Err(CatalogError::CheckpointOutOfRange {
                    theme: theme.name.clone(),
                    checkpoint: theme.checkpoint_question,
                    questions: theme.questions.len(),
                });
            }
            for (idx, question) in theme.questions.iter().enumerate() {
                if question.kind != QuestionKind::MultipleChoice {
                    continue;
                }
                let valid = question.answer.is_some_and(|a| a < question.options.len());
                if !valid {
                    return Err(CatalogError::BadAnswer {
                        theme: theme.name.clone(),
                        question: idx,
                        answer: question.answer,
                        options: question.options.len(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn theme_count(&self) -> usize {
        self.themes.len()
    }

    /// # Errors
    ///
    /// Returns `OutOfRange` when `index` does not address a theme.
    pub fn theme_at(&self, index: usize) -> Result<&Theme, CatalogError> {
        self.themes.get(index).ok_or(CatalogError::OutOfRange {
            index,
            count: self.themes.len(),
        })
    }

    #[must_use]
    pub fn questions_of<'a>(&self, theme: &'a Theme) -> &'a [Question] {
        &theme.questions
    }

    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.themes.iter().position(|t| t.name == name)
    }

    /// Map art for the map screen while `index` is the next theme.
    #[must_use]
    pub fn map_for(&self, index: usize) -> &str {
        let last = self.themes.len().saturating_sub(1);
        let chosen = if index >= last {
            self.maps.last()
        } else {
            self.maps.get(index)
        };
        chosen.map_or(self.map_image.as_str(), String::as_str)
    }

    /// Whether completing the theme at `index` triggers the finale.
    ///
    /// Explicit `isFinale` flags win; without any, the last theme is the finale.
    #[must_use]
    pub fn is_finale(&self, index: usize) -> bool {
        if self.themes.iter().any(|t| t.is_finale.is_some()) {
            return self
                .themes
                .get(index)
                .and_then(|t| t.is_finale)
                .unwrap_or(false);
        }
        index + 1 == self.themes.len()
    }
}
