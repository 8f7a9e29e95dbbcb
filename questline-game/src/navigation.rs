//! Screens and the back-navigation stack
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screens the UI collaborator can be asked to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Loading,
    Start,
    Map,
    Theme,
    Reward,
    Final,
    FinaleIntro,
    Finale,
    HeartGame,
    ChoiceGame,
}

impl Screen {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Start => "start",
            Self::Map => "map",
            Self::Theme => "theme",
            Self::Reward => "reward",
            Self::Final => "final",
            Self::FinaleIntro => "finale_intro",
            Self::Finale => "finale",
            Self::HeartGame => "heart_game",
            Self::ChoiceGame => "choice_game",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Back-stack of previously shown screens. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationHistory {
    current: Option<Screen>,
    stack: Vec<Screen>,
}

impl NavigationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current(&self) -> Option<Screen> {
        self.current
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Make `screen` current, remembering the previous one if it differs.
    pub fn show(&mut self, screen: Screen) {
        if let Some(previous) = self.current
            && previous != screen
        {
            self.stack.push(previous);
        }
        self.current = Some(screen);
    }

    /// Return to the previous screen, or `None` when there is nothing to pop.
    pub fn go_back(&mut self) -> Option<Screen> {
        let previous = self.stack.pop()?;
        self.current = Some(previous);
        Some(previous)
    }

    /// Forget everything and sit on `screen`.
    pub fn reset_to(&mut self, screen: Screen) {
        self.stack.clear();
        self.current = Some(screen);
    }
}
