use rand::rngs::StdRng;
use rand::SeedableRng;

use tempotype::keyboard::SpecialKey;
use tempotype::pacing::PacerConfig;
use tempotype::sched::ManualClock;
use tempotype::script::ClipScript;
use tempotype::session::{Command, Session, SessionConfig, SessionContext, SessionState};
use tempotype::sim::{Emission, Transcript};
use tempotype::transport::{PauseSignal, SharedPauseFlag};
use tempotype::typist::TypistConfig;

const TWO_CLIPS: &str = "\
Clip #1 <00:00.000-00:30.000>
hi there

Clip #2 <00:30.000-01:00.000>
ok
";

/// Typist with every random behavior switched off, for determinism.
fn silent_typist() -> TypistConfig {
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

fn session_for(source: &str) -> Session {
    let script = ClipScript::parse(source).unwrap();
    Session::new(
        script,
        SessionConfig::default(),
        PacerConfig::default(),
        silent_typist(),
        1.0,
    )
    .unwrap()
}

struct Harness {
    transcript: Transcript,
    flag: SharedPauseFlag,
    clock: ManualClock,
    rng: StdRng,
}

impl Harness {
    fn new(paused: bool) -> Self {
        Self {
            transcript: Transcript::new(),
            flag: SharedPauseFlag::new(paused),
            clock: ManualClock::new(),
            rng: StdRng::seed_from_u64(42),
        }
    }

    fn step(&mut self, session: &mut Session) -> SessionState {
        let mut ctx = SessionContext {
            transport: &mut self.transcript,
            signal: &self.flag,
            sched: &mut self.clock,
            rng: &mut self.rng,
        };
        session.step(&mut ctx).unwrap()
    }

    fn command(&mut self, session: &mut Session, command: Command) {
        let mut ctx = SessionContext {
            transport: &mut self.transcript,
            signal: &self.flag,
            sched: &mut self.clock,
            rng: &mut self.rng,
        };
        session.handle_command(command, &mut ctx);
    }

    fn tab_count(&self) -> usize {
        self.transcript
            .emissions()
            .iter()
            .filter(|e| matches!(e, Emission::Key(SpecialKey::Tab)))
            .count()
    }
}

#[test]
fn a_full_run_walks_every_clip_with_a_continue_between_sections() {
    let mut session = session_for(TWO_CLIPS);
    let mut h = Harness::new(false);

    // Clip 1 types to completion and the session waits for a continue.
    assert_eq!(h.step(&mut session), SessionState::SectionComplete);
    assert_eq!(session.current_clip(), 2);
    assert!(session.is_section_complete());
    assert_eq!(h.tab_count(), SessionConfig::default().first_clip_tab_count as usize);

    // Without a toggle the session idles in the same state.
    assert_eq!(h.step(&mut session), SessionState::SectionComplete);
    assert_eq!(session.current_clip(), 2);

    // Flipping the pause flag is the continue gesture; the session clears
    // it again so typing resumes unpaused.
    h.flag.toggle();
    assert_eq!(h.step(&mut session), SessionState::Running);
    assert!(!h.flag.is_paused());
    assert!(!session.is_section_complete());

    // Clip 2 is the last one, so its completion ends the run.
    assert_eq!(h.step(&mut session), SessionState::AllComplete);
    assert_eq!(session.current_clip(), 3);
    assert_eq!(
        h.tab_count(),
        (SessionConfig::default().first_clip_tab_count
            + SessionConfig::default().next_clip_tab_count) as usize
    );
    assert_eq!(h.transcript.final_text(), "hi there\nok\n");

    // AllComplete is terminal.
    assert_eq!(h.step(&mut session), SessionState::AllComplete);
}

#[test]
fn a_paused_session_emits_nothing() {
    let mut session = session_for(TWO_CLIPS);
    let mut h = Harness::new(true);

    assert_eq!(h.step(&mut session), SessionState::Paused);
    assert_eq!(h.step(&mut session), SessionState::Paused);
    assert!(h.transcript.emissions().is_empty());
    assert_eq!(session.current_clip(), 1);
}

#[test]
fn disconnect_clears_the_section_flag_but_keeps_the_clip_index() {
    let mut session = session_for(TWO_CLIPS);
    let mut h = Harness::new(false);

    assert_eq!(h.step(&mut session), SessionState::SectionComplete);
    assert_eq!(session.current_clip(), 2);

    h.transcript.set_connected(false);
    assert_eq!(h.step(&mut session), SessionState::AwaitingConnection);
    assert!(!session.is_section_complete());
    assert_eq!(session.current_clip(), 2);

    // On reconnect the pending clip types without a continue gesture.
    h.transcript.set_connected(true);
    assert_eq!(h.step(&mut session), SessionState::AllComplete);
    assert_eq!(session.current_clip(), 3);
    assert!(h.transcript.final_text().ends_with("ok\n"));
}

#[test]
fn an_empty_script_completes_immediately() {
    let mut session = session_for("");
    let mut h = Harness::new(false);

    assert_eq!(h.step(&mut session), SessionState::AllComplete);
    assert!(h.transcript.emissions().is_empty());
}

#[test]
fn difficulty_commands_rescale_the_estimate() {
    let mut session = session_for(TWO_CLIPS);
    let mut h = Harness::new(false);

    let base_target = session.estimate().target;
    assert!(base_target > 0.0);

    h.command(&mut session, Command::SetDifficulty(2.0));
    assert_eq!(session.estimate().target, base_target * 2.0);

    // Out-of-range values clamp instead of erroring.
    h.command(&mut session, Command::SetDifficulty(100.0));
    assert_eq!(session.estimate().target, base_target * 7.0);
}

#[test]
fn section_reset_requires_the_session_to_be_paused() {
    let mut session = session_for(TWO_CLIPS);
    let mut h = Harness::new(false);

    assert_eq!(h.step(&mut session), SessionState::SectionComplete);

    // Ignored while running.
    h.command(&mut session, Command::ResetSection);
    assert!(session.is_section_complete());

    h.flag.toggle();
    h.command(&mut session, Command::ResetSection);
    assert!(!session.is_section_complete());
}

#[test]
fn control_lines_parse_into_commands() {
    assert_eq!(Command::parse("d 2.5"), Some(Command::SetDifficulty(2.5)));
    assert_eq!(Command::parse("  d 1.0  "), Some(Command::SetDifficulty(1.0)));
    assert_eq!(Command::parse("s"), Some(Command::Status));
    assert_eq!(Command::parse("r"), Some(Command::ResetSection));
    assert_eq!(Command::parse("d"), None);
    assert_eq!(Command::parse("d x"), None);
    assert_eq!(Command::parse("quit"), None);
    assert_eq!(Command::parse(""), None);
}

#[test]
fn status_reports_track_clip_position_and_state() {
    let mut session = session_for(TWO_CLIPS);
    let mut h = Harness::new(false);

    let report = session.status_report(true, false);
    assert_eq!(report.current_clip, 1);
    assert_eq!(report.total_clips, 2);
    assert_eq!(report.state, SessionState::Running);

    h.step(&mut session);
    let report = session.status_report(true, false);
    assert_eq!(report.current_clip, 2);
    assert_eq!(report.state, SessionState::SectionComplete);
    assert_eq!(report.progress_percent, 100.0);
}
