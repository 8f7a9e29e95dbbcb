//! Tunable game parameters
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::persistence::DEFAULT_SAVE_KEY;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: f32,
        value: f32,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("save key must not be empty")]
    EmptySaveKey,
}

/// Heart grid: clear every item by tapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartGridConfig {
    #[serde(default = "HeartGridConfig::default_total")]
    pub total: u32,
    #[serde(default = "HeartGridConfig::default_per_tap")]
    pub per_tap: u32,
}

impl HeartGridConfig {
    const fn default_total() -> u32 {
        80
    }

    const fn default_per_tap() -> u32 {
        10
    }
}

impl Default for HeartGridConfig {
    fn default() -> Self {
        Self {
            total: Self::default_total(),
            per_tap: Self::default_per_tap(),
        }
    }
}

/// Binary choice: every refusal makes "no" smaller and "yes" bigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceConfig {
    #[serde(default = "ChoiceConfig::default_shrink_step")]
    pub shrink_step: f32,
    #[serde(default = "ChoiceConfig::default_min_no_scale")]
    pub min_no_scale: f32,
    #[serde(default = "ChoiceConfig::default_grow_step")]
    pub grow_step: f32,
    #[serde(default = "ChoiceConfig::default_max_yes_scale")]
    pub max_yes_scale: f32,
}

impl ChoiceConfig {
    const fn default_shrink_step() -> f32 {
        0.1
    }

    const fn default_min_no_scale() -> f32 {
        0.3
    }

    const fn default_grow_step() -> f32 {
        0.2
    }

    const fn default_max_yes_scale() -> f32 {
        2.5
    }
}

impl Default for ChoiceConfig {
    fn default() -> Self {
        Self {
            shrink_step: Self::default_shrink_step(),
            min_no_scale: Self::default_min_no_scale(),
            grow_step: Self::default_grow_step(),
            max_yes_scale: Self::default_max_yes_scale(),
        }
    }
}

/// Delays the UI waits before revealing what comes next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealTimings {
    #[serde(default = "RevealTimings::default_answer_feedback_ms")]
    pub answer_feedback_ms: u64,
    #[serde(default = "RevealTimings::default_heart_grid_complete_ms")]
    pub heart_grid_complete_ms: u64,
    #[serde(default = "RevealTimings::default_choice_complete_ms")]
    pub choice_complete_ms: u64,
    #[serde(default = "RevealTimings::default_reward_unlock_ms")]
    pub reward_unlock_ms: u64,
}

impl RevealTimings {
    const fn default_answer_feedback_ms() -> u64 {
        1_500
    }

    const fn default_heart_grid_complete_ms() -> u64 {
        1_000
    }

    const fn default_choice_complete_ms() -> u64 {
        3_000
    }

    const fn default_reward_unlock_ms() -> u64 {
        300
    }

    #[must_use]
    pub const fn answer_feedback(&self) -> Duration {
        Duration::from_millis(self.answer_feedback_ms)
    }

    #[must_use]
    pub const fn heart_grid_complete(&self) -> Duration {
        Duration::from_millis(self.heart_grid_complete_ms)
    }

    #[must_use]
    pub const fn choice_complete(&self) -> Duration {
        Duration::from_millis(self.choice_complete_ms)
    }

    #[must_use]
    pub const fn reward_unlock(&self) -> Duration {
        Duration::from_millis(self.reward_unlock_ms)
    }
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            answer_feedback_ms: Self::default_answer_feedback_ms(),
            heart_grid_complete_ms: Self::default_heart_grid_complete_ms(),
            choice_complete_ms: Self::default_choice_complete_ms(),
            reward_unlock_ms: Self::default_reward_unlock_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_save_key")]
    pub save_key: String,
    #[serde(default)]
    pub heart_grid: HeartGridConfig,
    #[serde(default)]
    pub choice: ChoiceConfig,
    #[serde(default)]
    pub timings: RevealTimings,
}

impl GameConfig {
    fn default_save_key() -> String {
        DEFAULT_SAVE_KEY.to_string()
    }

    /// Parse and validate a config document; absent fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// Returns the first out-of-range value.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.save_key.trim().is_empty() {
            return Err(ConfigError::EmptySaveKey);
        }
        ensure_min("heart_grid.total", 1.0, self.heart_grid.total as f32)?;
        ensure_min("heart_grid.per_tap", 1.0, self.heart_grid.per_tap as f32)?;
        ensure_range("choice.shrink_step", 0.01, 1.0, self.choice.shrink_step)?;
        ensure_range("choice.min_no_scale", 0.0, 1.0, self.choice.min_no_scale)?;
        ensure_range("choice.grow_step", 0.0, 5.0, self.choice.grow_step)?;
        ensure_min("choice.max_yes_scale", 1.0, self.choice.max_yes_scale)?;
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_key: Self::default_save_key(),
            heart_grid: HeartGridConfig::default(),
            choice: ChoiceConfig::default(),
            timings: RevealTimings::default(),
        }
    }
}

fn ensure_min(field: &'static str, min: f32, value: f32) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::MinViolation { field, min, value });
    }
    Ok(())
}

fn ensure_range(field: &'static str, min: f32, max: f32, value: f32) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let cfg = GameConfig::from_json("{}").unwrap();
        assert_eq!(cfg, GameConfig::default());
        assert_eq!(cfg.save_key, "istanbulMacerasi_save");
        assert_eq!(cfg.heart_grid.total, 80);
        assert_eq!(cfg.timings.answer_feedback(), Duration::from_millis(1_500));
    }

    #[test]
    fn partial_document_overrides_fields() {
        let cfg = GameConfig::from_json(
            r#"{ "save_key": "slot-b", "heart_grid": { "per_tap": 20 }, "timings": { "answer_feedback_ms": 0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.save_key, "slot-b");
        assert_eq!(cfg.heart_grid.total, 80);
        assert_eq!(cfg.heart_grid.per_tap, 20);
        assert_eq!(cfg.timings.answer_feedback(), Duration::ZERO);
        assert_eq!(cfg.timings.choice_complete_ms, 3_000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = GameConfig::from_json(r#"{ "heart_grid": { "per_tap": 0 } }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MinViolation {
                field: "heart_grid.per_tap",
                ..
            }
        ));
        assert!(matches!(
            GameConfig::from_json(r#"{ "save_key": " " }"#),
            Err(ConfigError::EmptySaveKey)
        ));
        assert!(matches!(
            GameConfig::from_json(r#"{ "choice": { "min_no_scale": 1.5 } }"#),
            Err(ConfigError::RangeViolation { .. })
        ));
    }
}
