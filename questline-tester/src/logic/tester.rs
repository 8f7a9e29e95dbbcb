use anyhow::{Context, Result};
use colored::Colorize;
use questline_game::{
    Catalog, FileStore, FileStoreError, GameEngine, JsonLoader, KeyValueStore, MemoryStore,
    QuestSession,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::player::{PlayerStyle, SimulatedPlayer};
use crate::scenarios::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub totals: RunSummary,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Counters collected while a scenario drives a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub answers: u32,
    pub mistakes: u32,
    pub rollbacks: u32,
    pub minigame_moves: u32,
    pub themes_completed: usize,
    pub finale_reached: bool,
}

impl RunSummary {
    fn absorb(&mut self, other: &Self) {
        self.answers += other.answers;
        self.mistakes += other.mistakes;
        self.rollbacks += other.rollbacks;
        self.minigame_moves += other.minigame_moves;
        self.themes_completed += other.themes_completed;
        self.finale_reached |= other.finale_reached;
    }
}

/// Save backend for a scenario run: in memory, or files under `--save-dir`.
#[derive(Debug, Clone)]
pub enum HarnessStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl KeyValueStore for HarnessStore {
    type Error = FileStoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        match self {
            Self::Memory(store) => store.get(key).map_err(|never| match never {}),
            Self::File(store) => store.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        match self {
            Self::Memory(store) => store.set(key, value).map_err(|never| match never {}),
            Self::File(store) => store.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        match self {
            Self::Memory(store) => store.remove(key).map_err(|never| match never {}),
            Self::File(store) => store.remove(key),
        }
    }
}

/// Everything one scenario iteration gets to work with.
pub struct ScenarioCtx {
    pub engine: GameEngine<JsonLoader, HarnessStore>,
    pub seed: u64,
    pub verbose: bool,
}

impl ScenarioCtx {
    /// # Errors
    ///
    /// Returns an error if the engine was not booted.
    pub fn session(&self) -> Result<QuestSession<HarnessStore>> {
        Ok(self.engine.session()?)
    }

    #[must_use]
    pub fn player(&self, style: PlayerStyle) -> SimulatedPlayer {
        SimulatedPlayer::new(style, self.seed)
    }

    #[must_use]
    pub fn store(&self) -> &HarnessStore {
        self.engine.storage()
    }

    #[must_use]
    pub fn save_key(&self) -> &str {
        &self.engine.config().save_key
    }

    /// # Errors
    ///
    /// Returns an error if the engine was not booted.
    pub fn catalog(&self) -> Result<&Catalog> {
        self.engine.catalog().context("catalog not loaded")
    }
}

pub struct LogicTester {
    loader: JsonLoader,
    save_dir: Option<PathBuf>,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(loader: JsonLoader, save_dir: Option<PathBuf>, verbose: bool) -> Self {
        Self {
            loader,
            save_dir,
            verbose,
        }
    }

    /// Boot an engine over a clean store for one iteration.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog does not load or the store cannot be cleared.
    pub fn context(&self, scenario: &str, seed: u64) -> Result<ScenarioCtx> {
        let store = match &self.save_dir {
            Some(dir) => HarnessStore::File(FileStore::new(dir.join(format!("{scenario}-{seed}")))),
            None => HarnessStore::Memory(MemoryStore::default()),
        };
        let mut engine = GameEngine::new(self.loader.clone(), store);
        engine.boot().context("loading catalog")?;
        let key = engine.config().save_key.clone();
        engine
            .storage()
            .remove(&key)
            .with_context(|| format!("clearing save '{key}'"))?;
        Ok(ScenarioCtx {
            engine,
            seed,
            verbose: self.verbose,
        })
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (seed: {})",
                    scenario.name.bright_white(),
                    seed
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut totals = RunSummary::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let outcome = self
                .context(scenario.name, iteration_seed)
                .and_then(|ctx| (scenario.run)(&ctx));

            match outcome {
                Ok(summary) => {
                    successes += 1;
                    totals.absorb(&summary);
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) answers:{} mistakes:{} themes:{}",
                            i + 1,
                            iterations,
                            summary.answers,
                            summary.mistakes,
                            summary.themes_completed
                        );
                    }
                }
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            message.clone().red()
                        );
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            totals,
            average_duration,
            performance_data,
        }
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::get_scenario;

    #[test]
    fn smoke_passes_on_bundled_catalog() {
        let tester = LogicTester::new(JsonLoader::bundled(), None, false);
        let scenario = get_scenario("smoke").unwrap();
        let results = tester.run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.successful_iterations, 2);
            assert!(result.totals.finale_reached);
        }
    }

    #[test]
    fn broken_catalog_fails_every_iteration() {
        let tester = LogicTester::new(JsonLoader::new(r#"{ "themes": [] }"#), None, false);
        let scenario = get_scenario("smoke").unwrap();
        let result = &tester.run_scenario(&scenario, &[7], 3)[0];
        assert!(!result.passed);
        assert_eq!(result.failures.len(), 3);
        assert!(result.failures[0].contains("loading catalog"));
    }

    #[test]
    fn result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "smoke".into(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            totals: RunSummary::default(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["average_duration"], 12);
        assert_eq!(value["performance_data"][0], 12);
        assert_eq!(value["totals"]["finale_reached"], false);
    }
}
