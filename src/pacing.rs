use std::collections::VecDeque;

use anyhow::{ensure, Result};
use rand::{Rng, RngCore};
use serde::Serialize;

/// Base typing rate the delay constants derive from.
pub const BASE_WPM: f64 = 65.0;
/// Nominal per-character delay at 1.0x speed, assuming 5 chars per word.
pub const BASE_CHAR_DELAY_MS: u64 = (60 * 1000) / (BASE_WPM as u64 * 5);
/// Nominal pause around word boundaries and typo corrections.
pub const WORD_PAUSE_MS: u64 = BASE_CHAR_DELAY_MS * 5 / 2;

#[derive(Debug, Clone)]
pub struct PacerConfig {
    pub base_char_delay_ms: u64,
    pub word_pause_ms: u64,
    pub min_speed_multiplier: f64,
    pub max_speed_multiplier: f64,
    /// Gain of the proportional controller.
    pub adjustment_sensitivity: f64,
    pub history_capacity: usize,
    pub min_samples_for_estimation: usize,
    /// Deviation of the progress ratio from 1.0 beyond which status output
    /// reports that a speed adjustment is in effect.
    pub progress_threshold: f64,
    pub min_thinking_pause_ms: u64,
    pub max_thinking_pause_ms: u64,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            base_char_delay_ms: BASE_CHAR_DELAY_MS,
            word_pause_ms: WORD_PAUSE_MS,
            min_speed_multiplier: 0.5,
            max_speed_multiplier: 2.0,
            adjustment_sensitivity: 0.5,
            history_capacity: 20,
            min_samples_for_estimation: 5,
            progress_threshold: 0.1,
            min_thinking_pause_ms: 800,
            max_thinking_pause_ms: 2000,
        }
    }
}

impl PacerConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_speed_multiplier > 0.0,
            "min_speed_multiplier must be > 0"
        );
        ensure!(
            self.min_speed_multiplier <= self.max_speed_multiplier,
            "min_speed_multiplier must be <= max_speed_multiplier"
        );
        ensure!(self.history_capacity >= 2, "history_capacity must be >= 2");
        ensure!(
            self.min_samples_for_estimation >= 2,
            "min_samples_for_estimation must be >= 2"
        );
        ensure!(
            self.min_samples_for_estimation <= self.history_capacity,
            "min_samples_for_estimation must fit in the history window"
        );
        ensure!(
            self.min_thinking_pause_ms <= self.max_thinking_pause_ms,
            "min_thinking_pause_ms must be <= max_thinking_pause_ms"
        );
        ensure!(
            self.adjustment_sensitivity.is_finite() && self.adjustment_sensitivity >= 0.0,
            "adjustment_sensitivity must be finite and >= 0"
        );
        Ok(())
    }
}

/// Point-in-time pacing report for status output.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PacingMetrics {
    pub target_wpm: f64,
    pub progress_ratio: f64,
    pub estimated_remaining_minutes: f64,
    pub needs_speed_adjustment: bool,
}

/// One recorded progress observation.
#[derive(Debug, Clone, Copy)]
struct ProgressSample {
    at_ms: u64,
    progress: f64,
}

/// Closed-loop pacing state for one section.
///
/// Tracks a bounded window of progress samples, derives a progress rate,
/// and produces the speed multiplier that scales every nominal delay. The
/// controller is proportional-only: it compares the time-based completion
/// fraction (elapsed / target) against the newest character-based fraction
/// and nudges the multiplier toward parity, hard-clamped to the configured
/// range.
#[derive(Debug, Clone)]
pub struct Pacer {
    config: PacerConfig,
    start_ms: u64,
    target_duration_ms: f64,
    speed_multiplier: f64,
    progress_ratio: f64,
    estimated_remaining_minutes: f64,
    history: VecDeque<ProgressSample>,
}

impl Pacer {
    pub fn new(config: PacerConfig) -> Self {
        let capacity = config.history_capacity;
        Self {
            config,
            start_ms: 0,
            target_duration_ms: 0.0,
            speed_multiplier: 1.0,
            progress_ratio: 0.0,
            estimated_remaining_minutes: 0.0,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Start a fresh time budget: the window restarts at `now_ms` and the
    /// previous section's samples are discarded.
    pub fn reset_section(&mut self, now_ms: u64, target_minutes: f64) {
        self.start_ms = now_ms;
        self.target_duration_ms = target_minutes * 60_000.0;
        self.speed_multiplier = 1.0;
        self.progress_ratio = 0.0;
        self.history.clear();
    }

    /// Record a progress observation and re-run the controller.
    ///
    /// `characters_typed` may move backwards (typo corrections emit
    /// backspaces); `characters_total <= 0` makes this a no-op.
    pub fn update_progress(&mut self, characters_typed: f64, characters_total: f64, now_ms: u64) {
        if characters_total <= 0.0 {
            return;
        }

        let progress = characters_typed / characters_total;
        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(ProgressSample {
            at_ms: now_ms,
            progress,
        });

        let elapsed_ms = now_ms.saturating_sub(self.start_ms) as f64;
        self.progress_ratio = if self.target_duration_ms > 0.0 {
            elapsed_ms / self.target_duration_ms
        } else {
            0.0
        };

        let rate = self.progress_rate_per_minute();
        if rate > 0.0 {
            self.estimated_remaining_minutes = (1.0 - progress) / rate;
        }
        // rate <= 0: not enough data yet, hold the last estimate.

        self.recalculate_speed();
    }

    /// Current speed multiplier, re-evaluated against the latest sample.
    pub fn speed_multiplier(&mut self) -> f64 {
        self.recalculate_speed();
        self.speed_multiplier
    }

    /// The multiplier from the most recent controller evaluation, without
    /// re-running the controller.
    pub fn last_speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn progress_ratio(&self) -> f64 {
        self.progress_ratio
    }

    pub fn estimated_remaining_minutes(&self) -> f64 {
        self.estimated_remaining_minutes
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    pub fn metrics(&self) -> PacingMetrics {
        PacingMetrics {
            target_wpm: BASE_WPM * self.speed_multiplier,
            progress_ratio: self.progress_ratio,
            estimated_remaining_minutes: self.estimated_remaining_minutes,
            needs_speed_adjustment: (1.0 - self.progress_ratio).abs()
                > self.config.progress_threshold,
        }
    }

    /// Per-character delay at the current speed.
    pub fn char_delay_ms(&self) -> u64 {
        scale_delay(self.config.base_char_delay_ms, self.speed_multiplier)
    }

    /// Word-boundary / correction pause at the current speed.
    pub fn word_delay_ms(&self) -> u64 {
        scale_delay(self.config.word_pause_ms, self.speed_multiplier)
    }

    /// A thinking pause drawn from the configured range, at the current speed.
    pub fn thinking_delay_ms(&self, rng: &mut dyn RngCore) -> u64 {
        let base =
            rng.gen_range(self.config.min_thinking_pause_ms..=self.config.max_thinking_pause_ms);
        scale_delay(base, self.speed_multiplier)
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    fn recalculate_speed(&mut self) {
        let current_progress = self.history.back().map(|s| s.progress).unwrap_or(0.0);
        let adjustment =
            (self.progress_ratio - current_progress) * self.config.adjustment_sensitivity;
        self.speed_multiplier = (1.0 + adjustment).clamp(
            self.config.min_speed_multiplier,
            self.config.max_speed_multiplier,
        );
    }

    /// Progress fraction gained per minute across the sample window, or
    /// zero when fewer than the minimum sample count is available.
    fn progress_rate_per_minute(&self) -> f64 {
        if self.history.len() < self.config.min_samples_for_estimation {
            return 0.0;
        }

        let (Some(first), Some(last)) = (self.history.front(), self.history.back()) else {
            return 0.0;
        };

        let span_minutes = last.at_ms.saturating_sub(first.at_ms) as f64 / 60_000.0;
        if span_minutes <= 0.0 {
            return 0.0;
        }

        (last.progress - first.progress) / span_minutes
    }
}

fn scale_delay(base_ms: u64, speed_multiplier: f64) -> u64 {
    (base_ms as f64 / speed_multiplier) as u64
}
