//! Player session: owns progression state and runs engine effects
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::KeyValueStore;
use crate::answer::Answer;
use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::engine::{Effect, EngineError, Event, Feedback, Phase, Step, step};
use crate::minigame::Minigame;
use crate::navigation::{NavigationHistory, Screen};
use crate::persistence::{SaveSlot, SaveSummary};
use crate::state::{CompletedTheme, Position, ProgressionState};

/// What happened to the save during a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SaveStatus {
    Untouched,
    Saved { at: DateTime<Utc> },
    Cleared,
    Failed { reason: String },
}

/// Directive handed back to the UI after every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub phase: Phase,
    pub screen: Screen,
    pub feedback: Option<Feedback>,
    pub unlocked: Option<CompletedTheme>,
    /// How long the UI should wait before revealing the next screen.
    pub reveal_after: Option<Duration>,
    pub save: SaveStatus,
}

/// Lock state of a theme card on the theme menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeStatus {
    Completed,
    Current,
    Locked,
    Available,
}

/// A single player's running game.
#[derive(Debug)]
pub struct QuestSession<S> {
    catalog: Arc<Catalog>,
    config: GameConfig,
    slot: SaveSlot<S>,
    state: ProgressionState,
    phase: Phase,
    history: NavigationHistory,
}

impl<S: KeyValueStore> QuestSession<S> {
    pub fn new(catalog: Arc<Catalog>, store: S, config: GameConfig) -> Self {
        let slot = SaveSlot::with_key(store, config.save_key.clone());
        let mut history = NavigationHistory::new();
        history.show(Screen::Start);
        Self {
            catalog,
            config,
            slot,
            state: ProgressionState::new(),
            phase: Phase::Menu,
            history,
        }
    }

    /// Run `event` through the engine and execute its effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is invalid in the current phase; the
    /// session is unchanged in that case.
    pub fn dispatch(&mut self, event: Event) -> Result<Outcome, EngineError> {
        let resets_history = matches!(event, Event::Restart | Event::MainMenu);
        let Step {
            mut state,
            phase,
            screen,
            feedback,
            unlocked,
            effects,
        } = step(&self.catalog, &self.state, self.phase, event)?;

        let mut save = SaveStatus::Untouched;
        for effect in effects {
            save = self.run_effect(effect, &mut state);
        }

        log::debug!("{:?} -> {:?} on {screen}", self.phase, phase);
        self.state = state;
        self.phase = phase;
        if resets_history {
            self.history.reset_to(screen);
        } else {
            self.history.show(screen);
        }

        let reveal_after = match (feedback, phase) {
            (Some(_), _) => Some(self.config.timings.answer_feedback()),
            (None, Phase::ThemeComplete { .. }) => Some(self.config.timings.reward_unlock()),
            _ => None,
        };

        Ok(Outcome {
            phase,
            screen,
            feedback,
            unlocked,
            reveal_after,
            save,
        })
    }

    fn run_effect(&self, effect: Effect, state: &mut ProgressionState) -> SaveStatus {
        match effect {
            Effect::Save => match self.slot.save(state) {
                Ok(at) => {
                    state.last_saved = Some(at);
                    SaveStatus::Saved { at }
                }
                Err(err) => {
                    log::warn!("could not save progress, continuing unsaved: {err}");
                    SaveStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            },
            Effect::ClearSave => match self.slot.clear() {
                Ok(()) => SaveStatus::Cleared,
                Err(err) => {
                    log::warn!("could not clear saved progress: {err}");
                    SaveStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            },
        }
    }

    /// Wipe the save and start from the first theme.
    ///
    /// # Errors
    ///
    /// See [`QuestSession::dispatch`].
    pub fn new_game(&mut self) -> Result<Outcome, EngineError> {
        self.dispatch(Event::NewGame)
    }

    /// Resume the saved game, or start a new one when there is no usable save.
    ///
    /// # Errors
    ///
    /// See [`QuestSession::dispatch`].
    pub fn continue_game(&mut self) -> Result<Outcome, EngineError> {
        match self.slot.load() {
            Ok(loaded) => {
                log::info!(
                    "resuming at theme {} question {}",
                    loaded.theme_index,
                    loaded.question_index
                );
                self.dispatch(Event::Resume(loaded))
            }
            Err(err) => {
                log::info!("no usable save ({err}); starting a new game");
                self.new_game()
            }
        }
    }

    /// Wipe the save and go back to the start screen.
    ///
    /// # Errors
    ///
    /// See [`QuestSession::dispatch`].
    pub fn restart(&mut self) -> Result<Outcome, EngineError> {
        self.dispatch(Event::Restart)
    }

    /// # Errors
    ///
    /// Fails before a game is started or once every theme is done.
    pub fn start_theme(&mut self) -> Result<Outcome, EngineError> {
        self.dispatch(Event::StartTheme)
    }

    /// # Errors
    ///
    /// Fails unless a question is waiting for an answer.
    pub fn submit_answer(&mut self, answer: impl Into<Answer>) -> Result<Outcome, EngineError> {
        self.dispatch(Event::SubmitAnswer(answer.into()))
    }

    /// Jump to a theme. Lock policy is the caller's concern.
    ///
    /// # Errors
    ///
    /// Fails when `index` is not a theme.
    pub fn select_theme(&mut self, index: usize) -> Result<Outcome, EngineError> {
        self.dispatch(Event::SelectTheme(index))
    }

    /// # Errors
    ///
    /// Fails when no theme is called `name`.
    pub fn replay_theme(&mut self, name: &str) -> Result<Outcome, EngineError> {
        self.dispatch(Event::ReplayTheme(name.to_string()))
    }

    /// # Errors
    ///
    /// Fails unless the current theme is a minigame.
    pub fn complete_minigame(&mut self) -> Result<Outcome, EngineError> {
        self.dispatch(Event::CompleteMinigame)
    }

    /// Back to the start screen with fresh in-memory progress. The save is kept.
    pub fn main_menu(&mut self) -> Outcome {
        match self.dispatch(Event::MainMenu) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("main menu transition failed: {err}");
                self.state = ProgressionState::new();
                self.phase = Phase::Menu;
                self.history.reset_to(Screen::Start);
                Outcome {
                    phase: Phase::Menu,
                    screen: Screen::Start,
                    feedback: None,
                    unlocked: None,
                    reveal_after: None,
                    save: SaveStatus::Untouched,
                }
            }
        }
    }

    /// Pop the previous screen; with nothing to pop, return to the main menu.
    pub fn go_back(&mut self) -> Screen {
        match self.history.go_back() {
            Some(screen) => screen,
            None => self.main_menu().screen,
        }
    }

    /// Show a screen that carries no progression change (map, finale reveal).
    pub fn show(&mut self, screen: Screen) {
        self.history.show(screen);
    }

    /// Build the minigame for the current theme.
    ///
    /// # Errors
    ///
    /// Fails unless the current theme is a minigame.
    pub fn open_minigame(&self, seed: u64) -> Result<Minigame, EngineError> {
        match self.phase {
            Phase::AtMinigame { kind, .. } => Ok(Minigame::new(kind, &self.config, seed)),
            other => Err(EngineError::NoActiveMinigame(other)),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> &ProgressionState {
        &self.state
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.history.current().unwrap_or_default()
    }

    #[must_use]
    pub const fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub const fn slot(&self) -> &SaveSlot<S> {
        &self.slot
    }

    #[must_use]
    pub fn current_position(&self) -> Position {
        self.state.position(&self.catalog)
    }

    #[must_use]
    pub fn is_theme_completed(&self, name: &str) -> bool {
        self.state.is_completed(name)
    }

    #[must_use]
    pub const fn is_theme_locked(&self, index: usize) -> bool {
        index > self.state.theme_index
    }

    #[must_use]
    pub fn theme_status(&self, index: usize) -> ThemeStatus {
        let completed = self
            .catalog
            .themes
            .get(index)
            .is_some_and(|t| self.state.is_completed(&t.name));
        if completed {
            ThemeStatus::Completed
        } else if index == self.state.theme_index {
            ThemeStatus::Current
        } else if self.is_theme_locked(index) {
            ThemeStatus::Locked
        } else {
            ThemeStatus::Available
        }
    }

    pub fn has_save(&self) -> bool {
        self.slot.exists()
    }

    pub fn save_summary(&self) -> Option<SaveSummary> {
        self.slot.summary(&self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Question, Theme, ThemeKind};
    use crate::persistence::DEFAULT_SAVE_KEY;
    use crate::stores::MemoryStore;
    use std::convert::Infallible;
    use std::fmt;

    fn catalog() -> Arc<Catalog> {
        let five = (0..5)
            .map(|i| Question::multiple_choice(format!("q{i}"), &["a", "b", "c"], 1))
            .collect();
        Arc::new(
            Catalog::from_themes(vec![
                Theme::standard("Galata", five, 3, "galata.png"),
                Theme::minigame("Hearts", ThemeKind::HeartGame, "hearts.png"),
                Theme::minigame("Cake", ThemeKind::ChoiceGame, "cake.png"),
            ])
            .unwrap(),
        )
    }

    fn session(store: MemoryStore) -> QuestSession<MemoryStore> {
        QuestSession::new(catalog(), store, GameConfig::default())
    }

    #[test]
    fn checkpoint_scenario_end_to_end() {
        let mut game = session(MemoryStore::default());
        game.new_game().unwrap();
        game.start_theme().unwrap();

        for _ in 0..3 {
            assert!(game.submit_answer(Answer::Choice(1)).unwrap().feedback.unwrap().correct);
        }
        let miss = game.submit_answer(Answer::Choice(0)).unwrap();
        assert_eq!(miss.feedback.unwrap().rollback.map(|r| r.target()), Some(2));
        assert_eq!(game.current_position().question_index, 2);
        assert_eq!(miss.reveal_after, Some(Duration::from_millis(1_500)));

        game.submit_answer(Answer::Choice(1)).unwrap();
        game.submit_answer(Answer::Choice(1)).unwrap();
        let done = game.submit_answer(Answer::Choice(1)).unwrap();
        assert_eq!(done.phase, Phase::ThemeComplete { theme: 0 });
        assert_eq!(done.screen, Screen::Reward);
        assert_eq!(game.state().completed_themes().len(), 1);
        assert_eq!(game.state().theme_index, 1);
        assert!(matches!(done.save, SaveStatus::Saved { .. }));
        assert!(game.state().last_saved.is_some());
    }

    #[test]
    fn continue_resumes_saved_position() {
        let store = MemoryStore::default();
        let mut first = session(store.clone());
        first.new_game().unwrap();
        first.start_theme().unwrap();
        first.submit_answer(Answer::Choice(1)).unwrap();
        first.submit_answer(Answer::Choice(1)).unwrap();

        let mut second = session(store);
        let outcome = second.continue_game().unwrap();
        assert_eq!(outcome.screen, Screen::Map);
        assert_eq!(second.current_position().question_index, 2);
        assert_eq!(
            second.phase(),
            Phase::AtQuestion {
                theme: 0,
                question: 2
            }
        );
    }

    #[test]
    fn corrupt_save_continues_as_new_game() {
        let store = MemoryStore::default();
        store.set(DEFAULT_SAVE_KEY, "]]garbage").unwrap();
        let mut corrupt = session(store.clone());
        let resumed = corrupt.continue_game().unwrap();

        let mut fresh = session(MemoryStore::default());
        let started = fresh.new_game().unwrap();

        assert_eq!(resumed.phase, started.phase);
        assert_eq!(resumed.screen, started.screen);
        assert_eq!(corrupt.state(), fresh.state());
        assert!(store.get(DEFAULT_SAVE_KEY).unwrap().is_none());
    }

    #[test]
    fn minigames_complete_into_finale_once() {
        let mut game = session(MemoryStore::default());
        game.new_game().unwrap();
        game.select_theme(1).unwrap();
        game.start_theme().unwrap();

        let mut grid = match game.open_minigame(11).unwrap() {
            Minigame::HeartGrid(grid) => grid,
            Minigame::BinaryChoice(_) => panic!("expected heart grid"),
        };
        while !grid.tap().cleared {}
        let reward = game.complete_minigame().unwrap();
        assert_eq!(reward.phase, Phase::ThemeComplete { theme: 1 });
        assert_eq!(reward.reveal_after, Some(Duration::from_millis(300)));

        game.start_theme().unwrap();
        let finale = game.complete_minigame().unwrap();
        assert_eq!(finale.phase, Phase::Finale { theme: 2 });
        assert_eq!(finale.screen, Screen::FinaleIntro);

        assert!(matches!(
            game.complete_minigame(),
            Err(EngineError::NoActiveMinigame(Phase::Finale { .. }))
        ));
        assert!(matches!(game.open_minigame(1), Err(EngineError::NoActiveMinigame(_))));
    }

    #[test]
    fn replay_never_duplicates_completion() {
        let mut game = session(MemoryStore::default());
        game.new_game().unwrap();
        game.select_theme(1).unwrap();
        game.complete_minigame().unwrap();
        for _ in 0..3 {
            game.replay_theme("Hearts").unwrap();
            assert_eq!(game.theme_status(1), ThemeStatus::Completed);
            game.complete_minigame().unwrap();
        }
        let names: Vec<&str> = game
            .state()
            .completed_themes()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Hearts"]);
    }

    #[test]
    fn theme_status_and_locks_follow_position() {
        let mut game = session(MemoryStore::default());
        game.new_game().unwrap();
        assert_eq!(game.theme_status(0), ThemeStatus::Current);
        assert_eq!(game.theme_status(1), ThemeStatus::Locked);
        assert!(game.is_theme_locked(2));

        game.select_theme(2).unwrap();
        assert_eq!(game.theme_status(0), ThemeStatus::Available);
        assert_eq!(game.theme_status(2), ThemeStatus::Current);
        assert!(!game.is_theme_locked(1));
    }

    #[test]
    fn navigation_back_and_main_menu() {
        let store = MemoryStore::default();
        let mut game = session(store.clone());
        game.new_game().unwrap();
        game.start_theme().unwrap();
        assert_eq!(game.screen(), Screen::Theme);
        assert_eq!(game.go_back(), Screen::Map);
        assert_eq!(game.go_back(), Screen::Start);

        let back_to_menu = game.go_back();
        assert_eq!(back_to_menu, Screen::Start);
        assert_eq!(game.phase(), Phase::Menu);
        assert_eq!(game.history().depth(), 0);
        assert!(game.has_save());
        assert!(game.save_summary().is_some());
    }

    #[test]
    fn restart_clears_save_from_any_screen() {
        let mut game = session(MemoryStore::default());
        game.new_game().unwrap();
        game.start_theme().unwrap();
        game.submit_answer(Answer::Choice(1)).unwrap();
        assert!(game.has_save());

        let outcome = game.restart().unwrap();
        assert_eq!(outcome.save, SaveStatus::Cleared);
        assert_eq!(outcome.screen, Screen::Start);
        assert!(!game.has_save());
        assert!(matches!(game.submit_answer(Answer::Choice(1)), Err(EngineError::NoActiveQuestion(Phase::Menu))));
    }

    #[derive(Debug)]
    struct Unavailable;

    impl fmt::Display for Unavailable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("store unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        type Error = Unavailable;

        fn get(&self, _key: &str) -> Result<Option<String>, Self::Error> {
            Err(Unavailable)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), Self::Error> {
            Err(Unavailable)
        }

        fn remove(&self, _key: &str) -> Result<(), Self::Error> {
            Err(Unavailable)
        }
    }

    #[test]
    fn play_continues_when_store_fails() {
        let mut game = QuestSession::new(catalog(), BrokenStore, GameConfig::default());
        let started = game.continue_game().unwrap();
        assert!(matches!(started.save, SaveStatus::Failed { .. }));
        game.start_theme().unwrap();
        let answer = game.submit_answer(Answer::Choice(1)).unwrap();
        assert!(matches!(answer.save, SaveStatus::Failed { .. }));
        assert_eq!(game.current_position().question_index, 1);
        assert_eq!(game.state().last_saved, None);
        assert!(!game.has_save());
    }

    #[test]
    fn memory_store_error_type_is_infallible() {
        fn assert_infallible<S: KeyValueStore<Error = Infallible>>(_: &S) {}
        assert_infallible(&MemoryStore::default());
    }
}
