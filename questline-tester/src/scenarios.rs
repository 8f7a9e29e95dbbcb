//! Named playthroughs the tester can run against a catalog
use anyhow::{Context, Result, bail, ensure};
use questline_game::{
    KeyValueStore, Outcome, Phase, ProgressionState, QuestSession, Rollback, SaveStatus, Screen,
    ThemeKind,
};
use std::collections::HashSet;

use crate::logic::{PlayerStyle, RunSummary, ScenarioCtx, SimulatedPlayer};

const MAX_ANSWERS_PER_THEME: u32 = 500;

#[derive(Debug, Clone, Copy)]
pub struct TestScenario {
    pub name: &'static str,
    pub description: &'static str,
    pub run: fn(&ScenarioCtx) -> Result<RunSummary>,
}

const SCENARIOS: &[TestScenario] = &[
    TestScenario {
        name: "smoke",
        description: "Perfect player finishes every theme and sees the finale once",
        run: smoke,
    },
    TestScenario {
        name: "checkpoint",
        description: "Wrong answers roll back to the checkpoint or the theme start",
        run: checkpoint,
    },
    TestScenario {
        name: "stumble",
        description: "Error-prone player still finishes; invariants hold after every answer",
        run: stumble,
    },
    TestScenario {
        name: "replay",
        description: "Replaying a completed theme never duplicates its reward",
        run: replay,
    },
    TestScenario {
        name: "resume",
        description: "A fresh session continues exactly where the save left off",
        run: resume,
    },
    TestScenario {
        name: "corrupt-save",
        description: "An unreadable save behaves like a new game",
        run: corrupt_save,
    },
    TestScenario {
        name: "minigames",
        description: "Every minigame theme can be won and completes its theme",
        run: minigames,
    },
];

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.name, s.description)).collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    SCENARIOS.iter().find(|s| s.name == name).copied()
}

/// Expand `all` and drop duplicates, keeping the order given.
pub fn expand_scenarios(requested: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for name in requested {
        let batch: Vec<String> = if name == "all" {
            SCENARIOS.iter().map(|s| s.name.to_string()).collect()
        } else {
            vec![name.clone()]
        };
        for entry in batch {
            if seen.insert(entry.clone()) {
                names.push(entry);
            }
        }
    }
    names
}

fn smoke(ctx: &ScenarioCtx) -> Result<RunSummary> {
    let mut session = ctx.session()?;
    let mut player = ctx.player(PlayerStyle::Perfect);
    let run = play_campaign(&mut session, &mut player)?;

    ensure!(run.mistakes == 0, "perfect player made {} mistakes", run.mistakes);
    ensure!(run.finale_reached, "finale was never shown");
    let resumed = session.continue_game()?;
    ensure!(
        resumed.screen == Screen::Final,
        "finished save resumed on {} instead of the final screen",
        resumed.screen
    );
    Ok(run)
}

fn stumble(ctx: &ScenarioCtx) -> Result<RunSummary> {
    let mut session = ctx.session()?;
    let mut player = ctx.player(PlayerStyle::Stumbling);
    let run = play_campaign(&mut session, &mut player)?;
    if ctx.verbose {
        log::info!(
            "{} player: {} answers, {} mistakes, {} rollbacks",
            player.style(),
            run.answers,
            run.mistakes,
            run.rollbacks
        );
    }
    Ok(run)
}

fn checkpoint(ctx: &ScenarioCtx) -> Result<RunSummary> {
    let catalog = ctx.catalog()?;
    let Some(index) = catalog.themes.iter().position(|t| {
        t.kind == ThemeKind::Standard
            && t.checkpoint_question >= 2
            && t.questions.len() > t.checkpoint_question
    }) else {
        bail!("catalog has no theme with a question past a checkpoint of 2 or more");
    };
    let theme = catalog.themes[index].clone();
    let fallback = theme.checkpoint_question - 1;

    let mut session = ctx.session()?;
    let mut run = RunSummary::default();
    session.new_game()?;
    session.select_theme(index)?;
    session.start_theme()?;

    for question in &theme.questions[..theme.checkpoint_question] {
        submit(&mut session, SimulatedPlayer::right_answer(question), &mut run)?;
    }
    let late = submit(
        &mut session,
        SimulatedPlayer::wrong_answer(&theme.questions[theme.checkpoint_question]),
        &mut run,
    )?;
    let rollback = late.feedback.and_then(|f| f.rollback);
    ensure!(
        rollback == Some(Rollback::Checkpoint(fallback)),
        "late mistake on '{}' gave {rollback:?}",
        theme.name
    );
    ensure!(
        session.current_position().question_index == fallback,
        "expected question {fallback} after late mistake"
    );

    let early = submit(
        &mut session,
        SimulatedPlayer::wrong_answer(&theme.questions[fallback]),
        &mut run,
    )?;
    let rollback = early.feedback.and_then(|f| f.rollback);
    ensure!(
        rollback == Some(Rollback::ThemeStart),
        "mistake on checkpoint question gave {rollback:?}"
    );
    ensure!(session.current_position().question_index == 0);
    ensure!(
        session.state().theme_index == index,
        "mistake changed the theme"
    );
    Ok(run)
}

fn replay(ctx: &ScenarioCtx) -> Result<RunSummary> {
    let catalog = ctx.catalog()?;
    ensure!(catalog.theme_count() >= 2, "replay needs at least two themes");
    let first = catalog.themes[0].name.clone();

    let mut session = ctx.session()?;
    let mut player = ctx.player(PlayerStyle::Perfect);
    let mut run = RunSummary::default();
    session.new_game()?;
    play_current_theme(&mut session, &mut player, &mut run)?;
    play_current_theme(&mut session, &mut player, &mut run)?;
    let before = session.state().completed_themes().to_vec();

    session.replay_theme(&first)?;
    ensure!(session.state().theme_index == 0, "replay did not jump back");
    play_current_theme(&mut session, &mut player, &mut run)?;

    ensure!(
        session.state().completed_themes() == before.as_slice(),
        "completed themes changed on replay: {:?}",
        session.state().completed_themes()
    );
    ensure!(session.state().theme_index == 1);
    Ok(run)
}

fn resume(ctx: &ScenarioCtx) -> Result<RunSummary> {
    let theme_count = ctx.catalog()?.theme_count();
    let mut player = ctx.player(PlayerStyle::Perfect);
    let mut run = RunSummary::default();
    let stop_after = usize::try_from(ctx.seed).unwrap_or_default() % theme_count;

    let snapshot = {
        let mut session = ctx.session()?;
        session.new_game()?;
        for _ in 0..stop_after {
            play_current_theme(&mut session, &mut player, &mut run)?;
        }
        let start = session.start_theme()?;
        if matches!(start.phase, Phase::AtQuestion { .. }) {
            let position = session.current_position();
            let question = current_question(&session, position.theme_index, 0)?;
            submit(&mut session, SimulatedPlayer::right_answer(&question), &mut run)?;
        }
        session.state().clone()
    };

    let mut session = ctx.session()?;
    ensure!(session.has_save(), "no save after playing");
    let summary = session.save_summary().context("save has no summary")?;
    ensure!(summary.theme_index == snapshot.theme_index);

    session.continue_game()?;
    let restored = session.state();
    ensure!(
        restored.theme_index == snapshot.theme_index
            && restored.question_index == snapshot.question_index
            && restored.completed_themes() == snapshot.completed_themes(),
        "resumed at {:?}, saved at {:?}",
        restored.position(session.catalog()),
        snapshot.position(session.catalog())
    );
    ensure!(session.phase() == Phase::at(session.catalog(), restored));
    Ok(run)
}

fn corrupt_save(ctx: &ScenarioCtx) -> Result<RunSummary> {
    let key = ctx.save_key().to_string();
    ctx.store()
        .set(&key, "{\"currentThemeIndex\": [")
        .context("writing corrupt save")?;

    let mut session = ctx.session()?;
    ensure!(session.has_save(), "corrupt save should still count as present");
    ensure!(session.save_summary().is_none(), "corrupt save produced a summary");

    let outcome = session.continue_game()?;
    ensure!(
        session.state() == &ProgressionState::new(),
        "corrupt save did not start fresh"
    );
    ensure!(
        outcome.save == SaveStatus::Cleared,
        "expected the corrupt save to be cleared, got {:?}",
        outcome.save
    );
    ensure!(!session.has_save());
    Ok(RunSummary::default())
}

fn minigames(ctx: &ScenarioCtx) -> Result<RunSummary> {
    let catalog = ctx.catalog()?;
    let indices: Vec<usize> = catalog
        .themes
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_minigame())
        .map(|(i, _)| i)
        .collect();
    ensure!(!indices.is_empty(), "catalog has no minigame themes");
    let names: Vec<String> = indices
        .iter()
        .map(|&i| catalog.themes[i].name.clone())
        .collect();

    let mut session = ctx.session()?;
    let mut player = ctx.player(PlayerStyle::Perfect);
    let mut run = RunSummary::default();
    session.new_game()?;
    for (&index, name) in indices.iter().zip(&names) {
        session.select_theme(index)?;
        let outcome = play_current_theme(&mut session, &mut player, &mut run)?;
        ensure!(outcome.unlocked.is_some(), "no reward for '{name}'");
        ensure!(session.is_theme_completed(name), "'{name}' not recorded");
    }
    Ok(run)
}

/// Play from a new game until every theme is complete.
fn play_campaign<S: KeyValueStore>(
    session: &mut QuestSession<S>,
    player: &mut SimulatedPlayer,
) -> Result<RunSummary> {
    let mut run = RunSummary::default();
    session.new_game()?;
    while !session.state().is_finished(session.catalog()) {
        play_current_theme(session, player, &mut run)?;
    }
    let expected = session.catalog().theme_count();
    ensure!(
        run.themes_completed == expected,
        "completed {} of {expected} themes",
        run.themes_completed
    );
    Ok(run)
}

/// Start the current theme and play it to completion.
fn play_current_theme<S: KeyValueStore>(
    session: &mut QuestSession<S>,
    player: &mut SimulatedPlayer,
    run: &mut RunSummary,
) -> Result<Outcome> {
    let start = session.start_theme()?;
    match start.phase {
        Phase::AtMinigame { .. } => {
            let mut minigame = session.open_minigame(player.next_seed())?;
            run.minigame_moves += player.play_minigame(&mut minigame);
            ensure!(minigame.is_won(), "{:?} was not won", minigame.kind());
            let outcome = session.complete_minigame()?;
            note_completion(session, &outcome, run)?;
            Ok(outcome)
        }
        Phase::AtQuestion { theme, .. } => {
            for _ in 0..MAX_ANSWERS_PER_THEME {
                let index = session.current_position().question_index;
                let question = current_question(session, theme, index)?;
                let outcome = submit(session, player.answer(&question), run)?;
                if !matches!(outcome.phase, Phase::AtQuestion { .. }) {
                    note_completion(session, &outcome, run)?;
                    return Ok(outcome);
                }
            }
            bail!("theme {theme} not finished after {MAX_ANSWERS_PER_THEME} answers")
        }
        other => bail!("start_theme landed in {other:?}"),
    }
}

fn current_question<S: KeyValueStore>(
    session: &QuestSession<S>,
    theme: usize,
    question: usize,
) -> Result<questline_game::Question> {
    session
        .catalog()
        .themes
        .get(theme)
        .and_then(|t| t.questions.get(question))
        .cloned()
        .with_context(|| format!("no question {question} in theme {theme}"))
}

/// Submit an answer and check the progression invariants afterwards.
fn submit<S: KeyValueStore>(
    session: &mut QuestSession<S>,
    answer: questline_game::Answer,
    run: &mut RunSummary,
) -> Result<Outcome> {
    let outcome = session.submit_answer(answer)?;
    run.answers += 1;
    let feedback = outcome.feedback.context("answer produced no feedback")?;
    if !feedback.correct {
        run.mistakes += 1;
        let rollback = feedback.rollback.context("wrong answer without rollback")?;
        ensure!(
            rollback.target() <= feedback.answered,
            "rollback {rollback} moved forward from question {}",
            feedback.answered
        );
        run.rollbacks += 1;
    }
    if let SaveStatus::Failed { reason } = &outcome.save {
        log::warn!("save failed during play: {reason}");
    }
    session
        .state()
        .check(session.catalog())
        .context("progression invariant broken after an answer")?;
    Ok(outcome)
}

fn note_completion<S: KeyValueStore>(
    session: &QuestSession<S>,
    outcome: &Outcome,
    run: &mut RunSummary,
) -> Result<()> {
    session
        .state()
        .check(session.catalog())
        .context("progression invariant broken after a completion")?;
    run.themes_completed = session.state().completed_themes().len();
    if matches!(outcome.phase, Phase::Finale { .. }) {
        run.finale_reached = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicTester;
    use questline_game::JsonLoader;

    fn run(name: &str, seed: u64) -> Result<RunSummary> {
        let tester = LogicTester::new(JsonLoader::bundled(), None, false);
        let ctx = tester.context(name, seed)?;
        (get_scenario(name).unwrap().run)(&ctx)
    }

    #[test]
    fn every_scenario_passes_on_bundled_catalog() {
        for (name, _) in list_scenarios() {
            for seed in [1, 2, 3] {
                if let Err(err) = run(name, seed) {
                    panic!("{name} seed {seed}: {err:#}");
                }
            }
        }
    }

    #[test]
    fn stumbling_player_makes_mistakes() {
        let summary = run("stumble", 1337).unwrap();
        assert!(summary.mistakes > 0);
        assert_eq!(summary.mistakes, summary.rollbacks);
        assert!(summary.finale_reached);
    }

    #[test]
    fn completed_theme_passes_library_state_check() {
        let tester = LogicTester::new(JsonLoader::bundled(), None, false);
        let ctx = tester.context("smoke", 5).unwrap();
        let mut session = ctx.session().unwrap();
        let mut player = ctx.player(PlayerStyle::Stumbling);
        let mut run = RunSummary::default();
        session.new_game().unwrap();

        let outcome = play_current_theme(&mut session, &mut player, &mut run).unwrap();
        assert_eq!(outcome.phase, Phase::ThemeComplete { theme: 0 });
        assert_eq!(run.themes_completed, 1);
        assert!(session.state().check(session.catalog()).is_ok());
    }

    #[test]
    fn all_expands_without_duplicates() {
        let names = expand_scenarios(&["resume".to_string(), "all".to_string()]);
        assert_eq!(names[0], "resume");
        assert_eq!(names.len(), SCENARIOS.len());
        assert!(get_scenario("nope").is_none());
    }
}
