//! Progression state machine
//!
//! [`step`] is a pure transition: it never touches storage, clocks or the UI.
//! It returns the next state together with the effects the caller must run.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answer::Answer;
use crate::catalog::{Catalog, CatalogError};
use crate::checkpoint::{Rollback, rollback_for};
use crate::minigame::MinigameKind;
use crate::navigation::Screen;
use crate::state::{CompletedTheme, ProgressionState};

/// Where the player is in the game flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum Phase {
    /// On the start screen; no game running yet.
    #[default]
    Menu,
    AtQuestion {
        theme: usize,
        question: usize,
    },
    AtMinigame {
        theme: usize,
        kind: MinigameKind,
    },
    /// Reward reveal for a theme that was just finished.
    ThemeComplete {
        theme: usize,
    },
    /// One-time celebration after the finale theme.
    Finale {
        theme: usize,
    },
    AllComplete,
}

impl Phase {
    /// The phase implied by the player's position alone.
    #[must_use]
    pub fn at(catalog: &Catalog, state: &ProgressionState) -> Self {
        match catalog.themes.get(state.theme_index) {
            None => Self::AllComplete,
            Some(theme) => match theme.kind.minigame() {
                Some(kind) => Self::AtMinigame {
                    theme: state.theme_index,
                    kind,
                },
                None => Self::AtQuestion {
                    theme: state.theme_index,
                    question: state.question_index,
                },
            },
        }
    }

    /// Screen that renders this phase when the player enters it.
    #[must_use]
    pub const fn screen(self) -> Screen {
        match self {
            Self::Menu => Screen::Start,
            Self::AtQuestion { .. } => Screen::Theme,
            Self::AtMinigame {
                kind: MinigameKind::HeartGrid,
                ..
            } => Screen::HeartGame,
            Self::AtMinigame {
                kind: MinigameKind::BinaryChoice,
                ..
            } => Screen::ChoiceGame,
            Self::ThemeComplete { .. } => Screen::Reward,
            Self::Finale { .. } => Screen::FinaleIntro,
            Self::AllComplete => Screen::Final,
        }
    }
}

/// Abstract inputs from the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NewGame,
    /// Resume from a previously saved state.
    Resume(ProgressionState),
    Restart,
    StartTheme,
    SubmitAnswer(Answer),
    SelectTheme(usize),
    ReplayTheme(String),
    CompleteMinigame,
    MainMenu,
}

/// Side effects the caller executes after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Save,
    ClearSave,
}

/// How an answer was judged and where it leaves the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub correct: bool,
    /// 0-based index of the question that was answered.
    pub answered: usize,
    pub rollback: Option<Rollback>,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("catalog not loaded yet")]
    NotReady,
    #[error("no game in progress")]
    NotStarted,
    #[error("no question is waiting for an answer (phase {0:?})")]
    NoActiveQuestion(Phase),
    #[error("no minigame is running (phase {0:?})")]
    NoActiveMinigame(Phase),
    #[error("every theme is already complete")]
    GameFinished,
    #[error("unknown theme '{0}'")]
    UnknownTheme(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Outcome of a single transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: ProgressionState,
    pub phase: Phase,
    pub screen: Screen,
    pub feedback: Option<Feedback>,
    /// Reward unlocked by a completion in this step.
    pub unlocked: Option<CompletedTheme>,
    pub effects: Vec<Effect>,
}

impl Step {
    fn new(state: ProgressionState, phase: Phase, screen: Screen) -> Self {
        Self {
            state,
            phase,
            screen,
            feedback: None,
            unlocked: None,
            effects: Vec::new(),
        }
    }

    fn with_effect(mut self, effect: Effect) -> Self {
        if !self.effects.contains(&effect) {
            self.effects.push(effect);
        }
        self
    }
}

/// Apply `event` to `state` in `phase`.
///
/// # Errors
///
/// Returns an error when the event is not valid in the current phase or
/// references a theme the catalog does not have. `state` is left as is.
pub fn step(
    catalog: &Catalog,
    state: &ProgressionState,
    phase: Phase,
    event: Event,
) -> Result<Step, EngineError> {
    match event {
        Event::NewGame => {
            let fresh = ProgressionState::new();
            let phase = Phase::at(catalog, &fresh);
            Ok(Step::new(fresh, phase, Screen::Map).with_effect(Effect::ClearSave))
        }
        Event::Resume(mut loaded) => {
            loaded.clamp_to(catalog);
            Ok(map_step(catalog, loaded))
        }
        Event::Restart => {
            Ok(Step::new(ProgressionState::new(), Phase::Menu, Screen::Start)
                .with_effect(Effect::ClearSave))
        }
        Event::MainMenu => Ok(Step::new(ProgressionState::new(), Phase::Menu, Screen::Start)),
        Event::StartTheme => start_theme(catalog, state, phase),
        Event::SubmitAnswer(answer) => submit_answer(catalog, state, phase, &answer),
        Event::SelectTheme(index) => select_theme(catalog, state, phase, index),
        Event::ReplayTheme(name) => {
            let index = catalog
                .position_of(&name)
                .ok_or(EngineError::UnknownTheme(name))?;
            select_theme(catalog, state, phase, index)
        }
        Event::CompleteMinigame => match phase {
            Phase::AtMinigame { theme, .. } => complete_theme(catalog, state.clone(), theme),
            other => Err(EngineError::NoActiveMinigame(other)),
        },
    }
}

/// Map screen for the player's position, or the final screen when done.
fn map_step(catalog: &Catalog, state: ProgressionState) -> Step {
    let phase = Phase::at(catalog, &state);
    let screen = if phase == Phase::AllComplete {
        Screen::Final
    } else {
        Screen::Map
    };
    Step::new(state, phase, screen)
}

fn start_theme(
    catalog: &Catalog,
    state: &ProgressionState,
    phase: Phase,
) -> Result<Step, EngineError> {
    if phase == Phase::Menu {
        return Err(EngineError::NotStarted);
    }
    let phase = Phase::at(catalog, state);
    if phase == Phase::AllComplete {
        return Err(EngineError::GameFinished);
    }
    Ok(Step::new(state.clone(), phase, phase.screen()).with_effect(Effect::Save))
}

fn select_theme(
    catalog: &Catalog,
    state: &ProgressionState,
    phase: Phase,
    index: usize,
) -> Result<Step, EngineError> {
    if phase == Phase::Menu {
        return Err(EngineError::NotStarted);
    }
    catalog.theme_at(index)?;
    let mut next = state.clone();
    next.theme_index = index;
    next.question_index = 0;
    log::debug!("theme {index} selected");
    Ok(map_step(catalog, next).with_effect(Effect::Save))
}

fn submit_answer(
    catalog: &Catalog,
    state: &ProgressionState,
    phase: Phase,
    answer: &Answer,
) -> Result<Step, EngineError> {
    let Phase::AtQuestion { .. } = phase else {
        return Err(EngineError::NoActiveQuestion(phase));
    };
    let theme = catalog.theme_at(state.theme_index)?;
    let answered = state.question_index;
    let question = theme
        .questions
        .get(answered)
        .ok_or(EngineError::NoActiveQuestion(phase))?;

    let mut next = state.clone();
    let correct = question.accepts(answer);
    let mut feedback = Feedback {
        correct,
        answered,
        rollback: None,
    };

    let step = if correct {
        next.question_index += 1;
        if next.question_index >= theme.questions.len() {
            complete_theme(catalog, next, state.theme_index)?
        } else {
            let phase = Phase::at(catalog, &next);
            Step::new(next, phase, Screen::Theme)
        }
    } else {
        let rollback = rollback_for(theme.checkpoint_question, answered);
        log::debug!(
            "wrong answer on '{}' question {}; back to {rollback}",
            theme.name,
            answered + 1
        );
        next.question_index = rollback.target();
        feedback.rollback = Some(rollback);
        let phase = Phase::at(catalog, &next);
        Step::new(next, phase, Screen::Theme)
    };

    let mut step = step.with_effect(Effect::Save);
    step.feedback = Some(feedback);
    Ok(step)
}

fn complete_theme(
    catalog: &Catalog,
    mut state: ProgressionState,
    theme_index: usize,
) -> Result<Step, EngineError> {
    let theme = catalog.theme_at(theme_index)?;
    if !state.record_completion(theme) {
        log::debug!("'{}' was already completed; not recording again", theme.name);
    }
    state.theme_index = theme_index + 1;
    state.question_index = 0;
    log::info!(
        "theme '{}' complete ({}/{})",
        theme.name,
        theme_index + 1,
        catalog.theme_count()
    );

    let phase = if catalog.is_finale(theme_index) && !state.finale_shown {
        state.finale_shown = true;
        Phase::Finale { theme: theme_index }
    } else if state.theme_index >= catalog.theme_count() {
        Phase::AllComplete
    } else {
        Phase::ThemeComplete { theme: theme_index }
    };

    let mut step = Step::new(state, phase, phase.screen()).with_effect(Effect::Save);
    step.unlocked = Some(CompletedTheme::of(theme));
    Ok(step)
}
