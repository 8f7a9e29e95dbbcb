use std::fmt;

use questline_game::{Answer, Minigame, Question, QuestionKind};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// How a simulated player approaches questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerStyle {
    /// Always answers correctly.
    Perfect,
    /// Misses roughly one answer in three.
    Stumbling,
}

impl PlayerStyle {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect",
            Self::Stumbling => "Stumbling",
        }
    }

    const fn mistake_rate(self) -> f64 {
        match self {
            Self::Perfect => 0.0,
            Self::Stumbling => 0.3,
        }
    }
}

impl fmt::Display for PlayerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seeded stand-in for a person tapping through the game.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    style: PlayerStyle,
    rng: ChaCha20Rng,
}

impl SimulatedPlayer {
    #[must_use]
    pub fn new(style: PlayerStyle, seed: u64) -> Self {
        Self {
            style,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub const fn style(&self) -> PlayerStyle {
        self.style
    }

    /// Draw a seed for something the player starts, like a minigame.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    /// Pick an answer, fumbling according to the player's style.
    pub fn answer(&mut self, question: &Question) -> Answer {
        let fumble = self.rng.gen_bool(self.style.mistake_rate());
        if fumble {
            Self::wrong_answer(question)
        } else {
            Self::right_answer(question)
        }
    }

    #[must_use]
    pub fn right_answer(question: &Question) -> Answer {
        match question.kind {
            QuestionKind::MultipleChoice => Answer::Choice(question.answer.unwrap_or_default()),
            QuestionKind::OpenEnded => Answer::from("İstanbul"),
        }
    }

    #[must_use]
    pub fn wrong_answer(question: &Question) -> Answer {
        match question.kind {
            QuestionKind::MultipleChoice => {
                let correct = question.answer.unwrap_or_default();
                Answer::Choice((correct + 1) % question.options.len().max(2))
            }
            QuestionKind::OpenEnded => Answer::from("two words"),
        }
    }

    /// Play a minigame until it is won. Returns the number of interactions.
    pub fn play_minigame(&mut self, minigame: &mut Minigame) -> u32 {
        let mut moves = 0;
        match minigame {
            Minigame::HeartGrid(grid) => {
                while !grid.is_cleared() {
                    grid.tap();
                    moves += 1;
                }
            }
            Minigame::BinaryChoice(choice) => {
                let stubborn = self.rng.gen_range(0..=choice.refusal_limit() + 2);
                for _ in 0..stubborn {
                    if choice.refuse().is_none() {
                        break;
                    }
                    moves += 1;
                }
                choice.accept();
                moves += 1;
            }
        }
        moves
    }
}
