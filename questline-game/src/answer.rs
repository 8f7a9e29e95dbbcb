//! Answer evaluation
use serde::{Deserialize, Serialize};

use crate::catalog::{Question, QuestionKind};

/// What the player submitted for the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    /// Index of the chosen option.
    Choice(usize),
    /// Free text typed for an open-ended question.
    Text(String),
}

impl From<usize> for Answer {
    fn from(index: usize) -> Self {
        Self::Choice(index)
    }
}

impl From<&str> for Answer {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// True when `text` holds exactly one whitespace-delimited word.
///
/// This is the whole acceptance rule for open-ended questions: any single
/// word passes, regardless of content.
#[must_use]
pub fn is_single_word(text: &str) -> bool {
    let mut words = text.split_whitespace();
    words.next().is_some() && words.next().is_none()
}

impl Question {
    /// Whether `answer` is accepted for this question.
    ///
    /// An answer of the wrong shape (text for a multiple-choice question or
    /// an index for an open-ended one) is simply wrong.
    #[must_use]
    pub fn accepts(&self, answer: &Answer) -> bool {
        match (self.kind, answer) {
            (QuestionKind::MultipleChoice, Answer::Choice(index)) => self.answer == Some(*index),
            (QuestionKind::OpenEnded, Answer::Text(text)) => is_single_word(text),
            _ => false,
        }
    }
}
