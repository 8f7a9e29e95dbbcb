//! Checkpoint rollback policy
//!
//! A mistake before or on the checkpoint question costs the whole theme; a
//! mistake after it only costs the progress made past the checkpoint.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a wrong answer sends the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "to", content = "index")]
pub enum Rollback {
    /// Back to the first question of the theme.
    ThemeStart,
    /// Back to the checkpoint question (0-based index).
    Checkpoint(usize),
}

impl Rollback {
    /// 0-based question index the player resumes at.
    #[must_use]
    pub const fn target(self) -> usize {
        match self {
            Self::ThemeStart => 0,
            Self::Checkpoint(index) => index,
        }
    }
}

impl fmt::Display for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThemeStart => write!(f, "theme start"),
            Self::Checkpoint(index) => write!(f, "checkpoint (question {})", index + 1),
        }
    }
}

/// Resolve the rollback for a wrong answer.
///
/// `checkpoint` is the theme's 1-based checkpoint question and `answered` is
/// the 0-based index of the question that was just missed. Missing the
/// checkpoint question itself restarts the theme.
#[must_use]
pub const fn rollback_for(checkpoint: usize, answered: usize) -> Rollback {
    let checkpoint_index = checkpoint.saturating_sub(1);
    if answered <= checkpoint_index {
        Rollback::ThemeStart
    } else {
        Rollback::Checkpoint(checkpoint_index)
    }
}
