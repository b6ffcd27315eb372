use anyhow::{ensure, Result};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};

use crate::keyboard::{qwerty_adjacent_char, random_lowercase, SpecialKey};
use crate::pacing::Pacer;
use crate::sched::Scheduler;
use crate::transport::{KeystrokeTransport, PauseSignal};

/// How a mistyped character is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypoStyle {
    /// A uniformly random lowercase letter.
    RandomLetter,
    /// A key adjacent to the intended one on a US-QWERTY layout,
    /// case preserved. Falls back to a random letter for characters
    /// without mapped neighbors.
    Adjacent,
}

#[derive(Debug, Clone)]
pub struct TypistConfig {
    pub typo_chance: f64,
    pub double_space_chance: f64,
    pub uncorrected_typo_chance: f64,
    /// Minimum word length for a typo to be left uncorrected.
    pub uncorrected_typo_min_len: usize,
    pub thinking_pause_chance: f64,
    pub typo_style: TypoStyle,
    pub fatigue_factor: f64,
    pub max_fatigue: f64,
    pub recovery_chance: f64,
    pub recovery_rate: f64,
    /// Per-character delay jitter as a fraction of the nominal delay.
    /// Zero disables jitter.
    pub delay_jitter: f64,
}

impl Default for TypistConfig {
    fn default() -> Self {
        Self {
            typo_chance: 0.15,
            double_space_chance: 0.02,
            uncorrected_typo_chance: 0.066,
            uncorrected_typo_min_len: 6,
            thinking_pause_chance: 0.15,
            typo_style: TypoStyle::Adjacent,
            fatigue_factor: 0.05,
            max_fatigue: 0.3,
            recovery_chance: 0.10,
            recovery_rate: 0.05,
            delay_jitter: 0.2,
        }
    }
}

impl TypistConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("typo_chance", self.typo_chance),
            ("double_space_chance", self.double_space_chance),
            ("uncorrected_typo_chance", self.uncorrected_typo_chance),
            ("thinking_pause_chance", self.thinking_pause_chance),
            ("recovery_chance", self.recovery_chance),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "{name} must be between 0.0 and 1.0"
            );
        }
        ensure!(self.max_fatigue >= 0.0, "max_fatigue must be >= 0");
        ensure!(self.fatigue_factor >= 0.0, "fatigue_factor must be >= 0");
        ensure!(self.recovery_rate >= 0.0, "recovery_rate must be >= 0");
        ensure!(
            self.delay_jitter >= 0.0 && self.delay_jitter.is_finite(),
            "delay_jitter must be finite and >= 0"
        );
        Ok(())
    }
}

/// How a typing call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOutcome {
    Completed,
    /// The pause signal (or a transport disconnect) halted synthesis.
    /// Characters already emitted stay emitted; there is no rollback.
    Interrupted,
}

/// Collaborators threaded through one typing call.
pub struct TypingContext<'a> {
    pub pacer: &'a mut Pacer,
    pub transport: &'a mut dyn KeystrokeTransport,
    pub signal: &'a dyn PauseSignal,
    pub sched: &'a mut dyn Scheduler,
    pub rng: &'a mut dyn RngCore,
}

impl TypingContext<'_> {
    fn halted(&self) -> bool {
        self.signal.is_paused() || !self.transport.is_connected()
    }

    /// Interruptible wait. Returns `true` when the wait was cut short.
    fn wait(&mut self, ms: u64) -> bool {
        let signal = &*self.signal;
        let transport = &*self.transport;
        self.sched
            .pause_for(ms, &mut || signal.is_paused() || !transport.is_connected())
    }
}

/// Synthesizes human-like keystroke behavior for one unit of text.
///
/// Fatigue carries across clips by design: it only resets when the process
/// restarts, so a long multi-clip run slows down toward the fatigue cap.
#[derive(Debug, Clone)]
pub struct Typist {
    config: TypistConfig,
    fatigue: f64,
    typed_chars: f64,
    total_chars: f64,
}

impl Typist {
    pub fn new(config: TypistConfig) -> Self {
        Self {
            config,
            fatigue: 0.0,
            typed_chars: 0.0,
            total_chars: 0.0,
        }
    }

    pub fn fatigue(&self) -> f64 {
        self.fatigue
    }

    /// Characters-typed fraction of the current (or last) text.
    pub fn current_progress(&self) -> f64 {
        if self.total_chars <= 0.0 {
            return 0.0;
        }
        self.typed_chars / self.total_chars
    }

    /// Type `text` word by word through the transport.
    ///
    /// Words are delimited by spaces and newlines. Every character
    /// emission reports progress to the pacer and every emission and pause
    /// first checks the pause signal, so an interruption leaves at most
    /// one character of skew.
    pub fn type_text(&mut self, text: &str, ctx: &mut TypingContext) -> Result<TypeOutcome> {
        self.typed_chars = 0.0;
        self.total_chars = text.chars().count() as f64;

        let mut word = String::new();

        for c in text.chars() {
            if ctx.halted() {
                return Ok(TypeOutcome::Interrupted);
            }

            if c == ' ' || c == '\n' {
                if !word.is_empty() {
                    if self.type_word(&word, ctx)? == TypeOutcome::Interrupted {
                        return Ok(TypeOutcome::Interrupted);
                    }
                    word.clear();

                    if ctx.rng.gen_bool(self.config.double_space_chance) {
                        self.emit_char(' ', ctx)?;
                    }
                }

                if ctx.halted() {
                    return Ok(TypeOutcome::Interrupted);
                }
                self.emit_char(c, ctx)?;

                if self.think(ctx) {
                    return Ok(TypeOutcome::Interrupted);
                }
            } else {
                word.push(c);
            }
        }

        if !word.is_empty() {
            if ctx.halted() {
                return Ok(TypeOutcome::Interrupted);
            }
            if self.type_word(&word, ctx)? == TypeOutcome::Interrupted {
                return Ok(TypeOutcome::Interrupted);
            }
        }

        Ok(TypeOutcome::Completed)
    }

    /// Type one word, possibly with a typo.
    fn type_word(&mut self, word: &str, ctx: &mut TypingContext) -> Result<TypeOutcome> {
        let chars: Vec<char> = word.chars().collect();

        if !chars.is_empty() && ctx.rng.gen_bool(self.config.typo_chance) {
            return self.type_word_with_typo(&chars, ctx);
        }

        for &c in &chars {
            if ctx.halted() {
                return Ok(TypeOutcome::Interrupted);
            }
            self.emit_char(c, ctx)?;
            if self.char_pause(ctx) {
                return Ok(TypeOutcome::Interrupted);
            }
        }

        Ok(TypeOutcome::Completed)
    }

    fn type_word_with_typo(
        &mut self,
        chars: &[char],
        ctx: &mut TypingContext,
    ) -> Result<TypeOutcome> {
        let typo_pos = ctx.rng.gen_range(0..chars.len());

        for &c in &chars[..typo_pos] {
            if ctx.halted() {
                return Ok(TypeOutcome::Interrupted);
            }
            self.emit_char(c, ctx)?;
            if self.char_pause(ctx) {
                return Ok(TypeOutcome::Interrupted);
            }
        }

        if ctx.halted() {
            return Ok(TypeOutcome::Interrupted);
        }

        let intended = chars[typo_pos];
        let wrong = self.wrong_char(intended, ctx);
        self.emit_char(wrong, ctx)?;

        let leave_uncorrected = chars.len() >= self.config.uncorrected_typo_min_len
            && ctx.rng.gen_bool(self.config.uncorrected_typo_chance);

        if !leave_uncorrected {
            // Notice the mistake, back out, retype.
            if ctx.wait(ctx.pacer.word_delay_ms()) {
                return Ok(TypeOutcome::Interrupted);
            }
            self.emit_key(SpecialKey::Backspace, ctx)?;
            if ctx.wait(ctx.pacer.word_delay_ms()) {
                return Ok(TypeOutcome::Interrupted);
            }
            self.emit_char(intended, ctx)?;
        }

        for &c in &chars[typo_pos + 1..] {
            if ctx.halted() {
                return Ok(TypeOutcome::Interrupted);
            }
            self.emit_char(c, ctx)?;
            if self.char_pause(ctx) {
                return Ok(TypeOutcome::Interrupted);
            }
        }

        Ok(TypeOutcome::Completed)
    }

    fn wrong_char(&self, intended: char, ctx: &mut TypingContext) -> char {
        match self.config.typo_style {
            TypoStyle::RandomLetter => random_lowercase(ctx.rng),
            TypoStyle::Adjacent => qwerty_adjacent_char(intended, ctx.rng)
                .unwrap_or_else(|| random_lowercase(ctx.rng)),
        }
    }

    fn emit_char(&mut self, c: char, ctx: &mut TypingContext) -> Result<()> {
        ctx.transport.send_char(c)?;
        self.typed_chars += 1.0;
        self.report_progress(ctx);
        Ok(())
    }

    fn emit_key(&mut self, key: SpecialKey, ctx: &mut TypingContext) -> Result<()> {
        ctx.transport.send_key(key)?;
        if key == SpecialKey::Backspace {
            self.typed_chars -= 1.0;
        }
        self.report_progress(ctx);
        Ok(())
    }

    fn report_progress(&self, ctx: &mut TypingContext) {
        let now = ctx.sched.now_ms();
        ctx.pacer
            .update_progress(self.typed_chars, self.total_chars, now);
    }

    /// Fatigue-adjusted, jittered inter-character delay.
    /// Returns `true` when the wait was interrupted.
    fn char_pause(&mut self, ctx: &mut TypingContext) -> bool {
        if ctx.halted() {
            return true;
        }

        self.apply_fatigue(ctx);

        let nominal = ctx.pacer.char_delay_ms() as f64 * (1.0 + self.fatigue);
        let jittered = if self.config.delay_jitter > 0.0 {
            let stddev = (nominal * self.config.delay_jitter).max(1.0);
            match Normal::new(nominal, stddev) {
                Ok(dist) => dist.sample(ctx.rng),
                Err(_) => nominal,
            }
        } else {
            nominal
        };

        let floor = ctx.pacer.config().base_char_delay_ms / 2;
        let delay = (jittered.max(0.0) as u64).max(floor);
        ctx.wait(delay)
    }

    fn apply_fatigue(&mut self, ctx: &mut TypingContext) {
        self.fatigue = (self.fatigue + self.config.fatigue_factor).min(self.config.max_fatigue);
        if ctx.rng.gen_bool(self.config.recovery_chance) {
            self.fatigue = (self.fatigue - self.config.recovery_rate).max(0.0);
        }
    }

    /// Occasional thinking pause after a word separator.
    /// Returns `true` when the pause was interrupted.
    fn think(&mut self, ctx: &mut TypingContext) -> bool {
        if ctx.halted() {
            return true;
        }
        if ctx.rng.gen_bool(self.config.thinking_pause_chance) {
            let delay = ctx.pacer.thinking_delay_ms(ctx.rng);
            return ctx.wait(delay);
        }
        false
    }
}
