//! Question-less theme variants
//!
//! Both minigames only decide *when* a theme is won; the session completes
//! the theme through the same path as a finished question run.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{ChoiceConfig, GameConfig, HeartGridConfig, RevealTimings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinigameKind {
    HeartGrid,
    BinaryChoice,
}

/// Result of one tap on the heart grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTap {
    pub removed: Vec<u32>,
    pub remaining: usize,
    pub cleared: bool,
}

/// A grid of items hiding a photo; each tap clears a random handful.
#[derive(Debug, Clone)]
pub struct HeartGrid {
    remaining: Vec<u32>,
    per_tap: usize,
    rng: ChaCha20Rng,
}

impl HeartGrid {
    #[must_use]
    pub fn new(cfg: &HeartGridConfig, seed: u64) -> Self {
        Self {
            remaining: (0..cfg.total).collect(),
            per_tap: usize::try_from(cfg.per_tap).unwrap_or(usize::MAX).max(1),
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Clear up to `per_tap` random items. Tapping a cleared grid does nothing.
    pub fn tap(&mut self) -> GridTap {
        let count = self.per_tap.min(self.remaining.len());
        let mut removed = Vec::with_capacity(count);
        for _ in 0..count {
            let pick = self.rng.gen_range(0..self.remaining.len());
            removed.push(self.remaining.swap_remove(pick));
        }
        GridTap {
            removed,
            remaining: self.remaining.len(),
            cleared: self.remaining.is_empty(),
        }
    }

    /// Taps needed to clear a fresh grid.
    #[must_use]
    pub const fn taps_to_clear(cfg: &HeartGridConfig) -> u32 {
        if cfg.per_tap == 0 {
            return cfg.total;
        }
        cfg.total.div_ceil(cfg.per_tap)
    }
}

/// Result of pressing "no".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Refusal {
    pub refusals: u32,
    pub no_scale: f32,
    pub yes_scale: f32,
    /// Normalized (0..1) spot the "no" button jumps to.
    pub no_position: (f32, f32),
    pub no_withdrawn: bool,
}

/// A yes/no prompt where "no" keeps dodging until it gives up.
#[derive(Debug, Clone)]
pub struct BinaryChoice {
    cfg: ChoiceConfig,
    refusals: u32,
    accepted: bool,
    rng: ChaCha20Rng,
}

impl BinaryChoice {
    #[must_use]
    pub fn new(cfg: &ChoiceConfig, seed: u64) -> Self {
        Self {
            cfg: cfg.clone(),
            refusals: 0,
            accepted: false,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub const fn refusals(&self) -> u32 {
        self.refusals
    }

    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Refusals after which "no" is withdrawn.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn refusal_limit(&self) -> u32 {
        let span = (1.0 - self.cfg.min_no_scale).max(0.0);
        (span / self.cfg.shrink_step).round() as u32
    }

    #[must_use]
    pub fn no_withdrawn(&self) -> bool {
        self.refusals >= self.refusal_limit()
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn no_scale(&self) -> f32 {
        (1.0 - self.cfg.shrink_step * self.refusals as f32).max(self.cfg.min_no_scale)
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn yes_scale(&self) -> f32 {
        (1.0 + self.cfg.grow_step * self.refusals as f32).min(self.cfg.max_yes_scale)
    }

    /// Press "no". Returns `None` once "no" is gone or "yes" was chosen.
    pub fn refuse(&mut self) -> Option<Refusal> {
        if self.accepted || self.no_withdrawn() {
            return None;
        }
        self.refusals += 1;
        let no_position = (self.rng.r#gen::<f32>(), self.rng.r#gen::<f32>());
        Some(Refusal {
            refusals: self.refusals,
            no_scale: self.no_scale(),
            yes_scale: self.yes_scale(),
            no_position,
            no_withdrawn: self.no_withdrawn(),
        })
    }

    /// Press "yes". Returns true the first time only.
    pub fn accept(&mut self) -> bool {
        !std::mem::replace(&mut self.accepted, true)
    }
}

/// Live minigame for the current theme.
#[derive(Debug, Clone)]
pub enum Minigame {
    HeartGrid(HeartGrid),
    BinaryChoice(BinaryChoice),
}

impl Minigame {
    #[must_use]
    pub fn new(kind: MinigameKind, cfg: &GameConfig, seed: u64) -> Self {
        match kind {
            MinigameKind::HeartGrid => Self::HeartGrid(HeartGrid::new(&cfg.heart_grid, seed)),
            MinigameKind::BinaryChoice => Self::BinaryChoice(BinaryChoice::new(&cfg.choice, seed)),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MinigameKind {
        match self {
            Self::HeartGrid(_) => MinigameKind::HeartGrid,
            Self::BinaryChoice(_) => MinigameKind::BinaryChoice,
        }
    }

    #[must_use]
    pub fn is_won(&self) -> bool {
        match self {
            Self::HeartGrid(grid) => grid.is_cleared(),
            Self::BinaryChoice(choice) => choice.is_accepted(),
        }
    }

    /// Pause before the theme is completed after a win.
    #[must_use]
    pub const fn completion_delay(&self, timings: &RevealTimings) -> Duration {
        match self {
            Self::HeartGrid(_) => timings.heart_grid_complete(),
            Self::BinaryChoice(_) => timings.choice_complete(),
        }
    }
}
