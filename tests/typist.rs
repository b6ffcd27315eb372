use anyhow::Result;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tempotype::keyboard::SpecialKey;
use tempotype::pacing::{Pacer, PacerConfig};
use tempotype::sched::ManualClock;
use tempotype::sim::Transcript;
use tempotype::transport::{KeystrokeTransport, PauseSignal, SharedPauseFlag};
use tempotype::typist::{TypeOutcome, Typist, TypistConfig, TypingContext, TypoStyle};

fn pacer() -> Pacer {
    let mut pacer = Pacer::new(PacerConfig::default());
    pacer.reset_section(0, 10.0);
    pacer
}

/// A config with every random behavior switched off.
fn silent_config() -> TypistConfig {
    TypistConfig {
        typo_chance: 0.0,
        double_space_chance: 0.0,
        uncorrected_typo_chance: 0.0,
        thinking_pause_chance: 0.0,
        recovery_chance: 0.0,
        delay_jitter: 0.0,
        ..Default::default()
    }
}

fn type_into(
    text: &str,
    config: TypistConfig,
    transcript: &mut Transcript,
    seed: u64,
) -> (Typist, TypeOutcome) {
    let mut typist = Typist::new(config);
    let mut pacer = pacer();
    let signal = SharedPauseFlag::new(false);
    let mut clock = ManualClock::new();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut ctx = TypingContext {
        pacer: &mut pacer,
        transport: transcript,
        signal: &signal,
        sched: &mut clock,
        rng: &mut rng,
    };
    let outcome = typist.type_text(text, &mut ctx).unwrap();
    (typist, outcome)
}

#[test]
fn clean_typing_reproduces_the_text_exactly() {
    let text = "the quick brown fox jumps over the lazy dog\n";
    let mut transcript = Transcript::new();
    let (_, outcome) = type_into(text, silent_config(), &mut transcript, 7);

    assert_eq!(outcome, TypeOutcome::Completed);
    assert_eq!(transcript.final_text(), text);
    assert_eq!(transcript.char_count(), text.chars().count());
    assert_eq!(transcript.backspace_count(), 0);
}

#[test]
fn corrected_typos_leave_no_trace_in_the_final_text() {
    let text = "the quick brown fox jumps over the lazy dog\n";
    let config = TypistConfig {
        typo_chance: 1.0,
        ..silent_config()
    };

    for seed in [1, 42, 999] {
        let mut transcript = Transcript::new();
        let (_, outcome) = type_into(text, config.clone(), &mut transcript, seed);

        assert_eq!(outcome, TypeOutcome::Completed);
        assert_eq!(transcript.final_text(), text, "seed {seed}");
        // One backspaced correction per word.
        assert_eq!(transcript.backspace_count(), 9, "seed {seed}");
    }
}

#[test]
fn uncorrected_typo_leaves_exactly_one_wrong_character() {
    let text = "abcdefgh\n";
    let config = TypistConfig {
        typo_chance: 1.0,
        uncorrected_typo_chance: 1.0,
        uncorrected_typo_min_len: 1,
        typo_style: TypoStyle::Adjacent,
        ..silent_config()
    };

    let mut transcript = Transcript::new();
    let (_, outcome) = type_into(text, config, &mut transcript, 3);
    let typed = transcript.final_text();

    assert_eq!(outcome, TypeOutcome::Completed);
    assert_eq!(transcript.backspace_count(), 0);
    assert_eq!(typed.chars().count(), text.chars().count());

    let mismatches = typed
        .chars()
        .zip(text.chars())
        .filter(|(a, b)| a != b)
        .count();
    assert_eq!(mismatches, 1);
}

#[test]
fn short_words_never_keep_their_typos() {
    // Words below the minimum length always get corrected even when the
    // uncorrected chance is maxed out.
    let text = "cat dog fig\n";
    let config = TypistConfig {
        typo_chance: 1.0,
        uncorrected_typo_chance: 1.0,
        uncorrected_typo_min_len: 6,
        ..silent_config()
    };

    let mut transcript = Transcript::new();
    let (_, outcome) = type_into(text, config, &mut transcript, 11);

    assert_eq!(outcome, TypeOutcome::Completed);
    assert_eq!(transcript.final_text(), text);
    assert_eq!(transcript.backspace_count(), 3);
}

#[test]
fn double_space_inserts_an_extra_space_after_a_word() {
    let config = TypistConfig {
        double_space_chance: 1.0,
        ..silent_config()
    };

    let mut transcript = Transcript::new();
    let (_, outcome) = type_into("a b\n", config, &mut transcript, 5);

    assert_eq!(outcome, TypeOutcome::Completed);
    assert_eq!(transcript.final_text(), "a  b \n");
}

#[test]
fn fatigue_accumulates_to_the_cap_and_no_further() {
    let config = TypistConfig {
        fatigue_factor: 0.05,
        max_fatigue: 0.3,
        ..silent_config()
    };

    let mut transcript = Transcript::new();
    let (typist, outcome) = type_into(
        "a long enough line to saturate fatigue completely\n",
        config,
        &mut transcript,
        2,
    );

    assert_eq!(outcome, TypeOutcome::Completed);
    assert_eq!(typist.fatigue(), 0.3);
}

#[test]
fn typing_feeds_progress_samples_to_the_pacer() {
    let mut typist = Typist::new(silent_config());
    let mut pacer = pacer();
    let signal = SharedPauseFlag::new(false);
    let mut clock = ManualClock::new();
    let mut rng = StdRng::seed_from_u64(1);
    let mut transcript = Transcript::new();

    let mut ctx = TypingContext {
        pacer: &mut pacer,
        transport: &mut transcript,
        signal: &signal,
        sched: &mut clock,
        rng: &mut rng,
    };
    let outcome = typist.type_text("steady progress here\n", &mut ctx).unwrap();

    assert_eq!(outcome, TypeOutcome::Completed);
    assert!(pacer.sample_count() > 0);
    assert!(pacer.sample_count() <= PacerConfig::default().history_capacity);
    assert_eq!(typist.current_progress(), 1.0);
}

/// Transport wrapper that flips the pause flag after a fixed number of
/// character emissions, the way a button press lands mid-word.
struct PauseAfter {
    inner: Transcript,
    flag: SharedPauseFlag,
    remaining: usize,
}

impl KeystrokeTransport for PauseAfter {
    fn send_char(&mut self, c: char) -> Result<()> {
        self.inner.send_char(c)?;
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.flag.toggle();
            }
        }
        Ok(())
    }

    fn send_key(&mut self, key: SpecialKey) -> Result<()> {
        self.inner.send_key(key)
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
}

#[test]
fn a_pause_mid_word_stops_emission_within_one_character() {
    use tempotype::transport::PauseSignal;

    let flag = SharedPauseFlag::new(false);
    let mut transport = PauseAfter {
        inner: Transcript::new(),
        flag: flag.clone(),
        remaining: 3,
    };

    let mut typist = Typist::new(silent_config());
    let mut pacer = pacer();
    let mut clock = ManualClock::new();
    let mut rng = StdRng::seed_from_u64(9);

    let mut ctx = TypingContext {
        pacer: &mut pacer,
        transport: &mut transport,
        signal: &flag,
        sched: &mut clock,
        rng: &mut rng,
    };
    let outcome = typist.type_text("hello world\n", &mut ctx).unwrap();

    assert_eq!(outcome, TypeOutcome::Interrupted);
    assert!(flag.is_paused());
    assert_eq!(transport.inner.final_text(), "hel");
    assert_eq!(transport.inner.char_count(), 3);

    // While the pause holds, a retry emits nothing at all.
    let mut ctx = TypingContext {
        pacer: &mut pacer,
        transport: &mut transport,
        signal: &flag,
        sched: &mut clock,
        rng: &mut rng,
    };
    let outcome = typist.type_text("hello world\n", &mut ctx).unwrap();
    assert_eq!(outcome, TypeOutcome::Interrupted);
    assert_eq!(transport.inner.char_count(), 3);
}

#[test]
fn a_disconnected_transport_interrupts_typing() {
    let mut transcript = Transcript::new();
    transcript.set_connected(false);
    let (_, outcome) = type_into("unreachable\n", silent_config(), &mut transcript, 1);

    assert_eq!(outcome, TypeOutcome::Interrupted);
    assert_eq!(transcript.char_count(), 0);
}

#[test]
fn chance_fields_outside_the_unit_interval_are_rejected() {
    let config = TypistConfig {
        typo_chance: 1.5,
        ..Default::default()
    };
    assert!(config.validate().is_err());
    assert!(TypistConfig::default().validate().is_ok());
}
