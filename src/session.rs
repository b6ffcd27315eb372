use anyhow::Result;
use log::{info, warn};
use rand::{Rng, RngCore};
use serde::Serialize;

use crate::aht::{AhtEstimator, Estimate};
use crate::keyboard::SpecialKey;
use crate::pacing::{Pacer, PacerConfig};
use crate::script::ClipScript;
use crate::sched::Scheduler;
use crate::transport::{KeystrokeTransport, PauseSignal};
use crate::typist::{TypeOutcome, Typist, TypistConfig, TypingContext};

/// Runtime command from the control surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetDifficulty(f64),
    Status,
    ResetSection,
}

impl Command {
    /// Parse one control line: `d <mult>`, `s`, or `r`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("d ") {
            return rest.trim().parse::<f64>().ok().map(Command::SetDifficulty);
        }
        match line {
            "s" => Some(Command::Status),
            "r" => Some(Command::ResetSection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingConnection,
    Paused,
    Running,
    SectionComplete,
    AllComplete,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Tab presses to reach the first clip's input field.
    pub first_clip_tab_count: u32,
    /// Tab presses between consecutive clips.
    pub next_clip_tab_count: u32,
    pub min_tab_delay_ms: u64,
    pub max_tab_delay_ms: u64,
    /// Settle delay after navigation before typing starts.
    pub clip_settle_delay_ms: u64,
    pub status_interval_ms: u64,
    /// Poll interval while idle or waiting for the transport.
    pub idle_poll_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            first_clip_tab_count: 16,
            next_clip_tab_count: 5,
            min_tab_delay_ms: 140,
            max_tab_delay_ms: 400,
            clip_settle_delay_ms: 1000,
            status_interval_ms: 10_000,
            idle_poll_ms: 200,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.min_tab_delay_ms <= self.max_tab_delay_ms,
            "min_tab_delay_ms must be <= max_tab_delay_ms"
        );
        Ok(())
    }
}

/// Snapshot of session state for status output.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub current_clip: usize,
    pub total_clips: usize,
    pub progress_percent: f64,
    pub difficulty: f64,
    pub speed_multiplier: f64,
    pub estimated_remaining_minutes: f64,
    pub state: SessionState,
}

/// Collaborators threaded through one session step.
pub struct SessionContext<'a> {
    pub transport: &'a mut dyn KeystrokeTransport,
    pub signal: &'a dyn PauseSignal,
    pub sched: &'a mut dyn Scheduler,
    pub rng: &'a mut dyn RngCore,
}

/// Sequences clip-by-clip processing: pause/resume, section-complete
/// gating, and difficulty reconfiguration.
///
/// All mutable run state (clip index, section flag, pacing, fatigue) lives
/// here and is only touched from the loop that owns the session, so an
/// async pause source never races the synthesis state.
pub struct Session {
    config: SessionConfig,
    script: ClipScript,
    estimator: AhtEstimator,
    pacer: Pacer,
    typist: Typist,
    current_clip: usize,
    section_complete: bool,
    /// Pause-flag state captured when the section completed; a later flip
    /// of the flag is the "continue" gesture.
    paused_at_section_end: bool,
    connection_announced: bool,
    all_complete_announced: bool,
    last_status_ms: u64,
}

impl Session {
    pub fn new(
        script: ClipScript,
        config: SessionConfig,
        pacer_config: PacerConfig,
        typist_config: TypistConfig,
        difficulty: f64,
    ) -> Result<Self> {
        config.validate()?;
        pacer_config.validate()?;
        typist_config.validate()?;

        let mut estimator = AhtEstimator::new(script.total_duration_minutes());
        estimator.set_difficulty(difficulty);

        if script.is_empty() {
            warn!("clip script contains no clips; nothing to type");
        }

        Ok(Self {
            config,
            script,
            pacer: Pacer::new(pacer_config),
            typist: Typist::new(typist_config),
            estimator,
            current_clip: 1,
            section_complete: false,
            paused_at_section_end: false,
            connection_announced: false,
            all_complete_announced: false,
            last_status_ms: 0,
        })
    }

    pub fn estimate(&self) -> Estimate {
        self.estimator.estimate()
    }

    pub fn current_clip(&self) -> usize {
        self.current_clip
    }

    pub fn is_section_complete(&self) -> bool {
        self.section_complete
    }

    pub fn state(&self, connected: bool, paused: bool) -> SessionState {
        if self.current_clip > self.script.len() {
            SessionState::AllComplete
        } else if !connected {
            SessionState::AwaitingConnection
        } else if self.section_complete {
            SessionState::SectionComplete
        } else if paused {
            SessionState::Paused
        } else {
            SessionState::Running
        }
    }

    pub fn status_report(&self, connected: bool, paused: bool) -> StatusReport {
        let metrics = self.pacer.metrics();
        StatusReport {
            current_clip: self.current_clip.min(self.script.len() + 1),
            total_clips: self.script.len(),
            progress_percent: self.typist.current_progress() * 100.0,
            difficulty: self.estimator.difficulty(),
            speed_multiplier: self.pacer.last_speed_multiplier(),
            estimated_remaining_minutes: metrics.estimated_remaining_minutes,
            state: self.state(connected, paused),
        }
    }

    pub fn handle_command(&mut self, command: Command, ctx: &mut SessionContext) {
        match command {
            Command::SetDifficulty(multiplier) => {
                self.estimator.set_difficulty(multiplier);
                let target = self.estimator.estimate().target;
                self.pacer.reset_section(ctx.sched.now_ms(), target);
                info!(
                    "difficulty set to {:.2}x (target {:.1} min)",
                    self.estimator.difficulty(),
                    target
                );
            }
            Command::Status => self.log_status(ctx),
            Command::ResetSection => {
                if ctx.signal.is_paused() {
                    self.section_complete = false;
                    info!("section reset; clip {} will restart", self.current_clip);
                } else {
                    warn!("pause typing first to reset the section");
                }
            }
        }
    }

    /// Run one iteration of the control loop.
    pub fn step(&mut self, ctx: &mut SessionContext) -> Result<SessionState> {
        if !ctx.transport.is_connected() {
            // A disconnect clears the section flag but keeps the clip
            // index, so a reconnect restarts the interrupted clip.
            self.connection_announced = false;
            self.section_complete = false;
            info!("waiting for transport connection...");
            let transport = &*ctx.transport;
            ctx.sched
                .pause_for(self.config.idle_poll_ms, &mut || transport.is_connected());
            return Ok(SessionState::AwaitingConnection);
        }

        if !self.connection_announced {
            info!("transport connected");
            self.connection_announced = true;
        }

        if self.current_clip > self.script.len() {
            if !self.all_complete_announced {
                info!("all clips completed");
                self.log_status(ctx);
                self.all_complete_announced = true;
            }
            return Ok(SessionState::AllComplete);
        }

        self.maybe_log_status(ctx);

        if self.section_complete {
            let paused = ctx.signal.is_paused();
            if paused != self.paused_at_section_end {
                // The pause toggle acts as "continue" after a section.
                self.section_complete = false;
                if ctx.signal.is_paused() {
                    ctx.signal.toggle();
                }
                info!("starting clip {}", self.current_clip);
            } else {
                let signal = &*ctx.signal;
                let baseline = self.paused_at_section_end;
                ctx.sched.pause_for(self.config.idle_poll_ms, &mut || {
                    signal.is_paused() != baseline
                });
            }
            return Ok(self.state(true, ctx.signal.is_paused()));
        }

        if ctx.signal.is_paused() {
            let signal = &*ctx.signal;
            ctx.sched
                .pause_for(self.config.idle_poll_ms, &mut || !signal.is_paused());
            return Ok(SessionState::Paused);
        }

        let outcome = self.process_clip(ctx)?;

        if outcome == TypeOutcome::Completed
            && !ctx.signal.is_paused()
            && ctx.transport.is_connected()
        {
            info!("completed clip {}/{}", self.current_clip, self.script.len());
            self.section_complete = true;
            self.paused_at_section_end = ctx.signal.is_paused();
            self.current_clip += 1;
            self.log_status(ctx);
        }

        Ok(self.state(ctx.transport.is_connected(), ctx.signal.is_paused()))
    }

    /// Navigate to the current clip's field and type its text.
    fn process_clip(&mut self, ctx: &mut SessionContext) -> Result<TypeOutcome> {
        let Some(clip) = self.script.clip(self.current_clip).cloned() else {
            return Ok(TypeOutcome::Completed);
        };

        info!(
            "processing clip {}/{} ({:.1}s of source)",
            clip.index,
            self.script.len(),
            clip.span.duration_seconds()
        );

        if self.navigate_to_clip(ctx)? == TypeOutcome::Interrupted {
            return Ok(TypeOutcome::Interrupted);
        }

        if clip.text.is_empty() {
            warn!("no content found for clip {}", clip.index);
            return Ok(TypeOutcome::Completed);
        }

        let target = self.estimator.estimate().target;
        self.pacer.reset_section(ctx.sched.now_ms(), target);

        let mut typing_ctx = TypingContext {
            pacer: &mut self.pacer,
            transport: &mut *ctx.transport,
            signal: ctx.signal,
            sched: &mut *ctx.sched,
            rng: &mut *ctx.rng,
        };
        self.typist.type_text(&clip.text, &mut typing_ctx)
    }

    fn navigate_to_clip(&mut self, ctx: &mut SessionContext) -> Result<TypeOutcome> {
        let tabs = if self.current_clip == 1 {
            self.config.first_clip_tab_count
        } else {
            self.config.next_clip_tab_count
        };

        for _ in 0..tabs {
            if ctx.signal.is_paused() || !ctx.transport.is_connected() {
                return Ok(TypeOutcome::Interrupted);
            }
            ctx.transport.send_key(SpecialKey::Tab)?;

            let delay = ctx
                .rng
                .gen_range(self.config.min_tab_delay_ms..=self.config.max_tab_delay_ms);
            if wait_interruptible(ctx, delay) {
                return Ok(TypeOutcome::Interrupted);
            }
        }

        if wait_interruptible(ctx, self.config.clip_settle_delay_ms) {
            return Ok(TypeOutcome::Interrupted);
        }
        Ok(TypeOutcome::Completed)
    }

    fn maybe_log_status(&mut self, ctx: &mut SessionContext) {
        let now = ctx.sched.now_ms();
        if now.saturating_sub(self.last_status_ms) >= self.config.status_interval_ms {
            self.log_status(ctx);
            self.last_status_ms = now;
        }
    }

    fn log_status(&self, ctx: &mut SessionContext) {
        let report = self.status_report(ctx.transport.is_connected(), ctx.signal.is_paused());
        let hours = (report.estimated_remaining_minutes / 60.0) as u64;
        let minutes = (report.estimated_remaining_minutes as u64) % 60;
        info!(
            "status: clip {}/{}, progress {:.1}%, difficulty {:.2}x, speed {:.2}x, est. remaining {}h {}m, state {:?}",
            report.current_clip,
            report.total_clips,
            report.progress_percent,
            report.difficulty,
            report.speed_multiplier,
            hours,
            minutes,
            report.state
        );
    }
}

fn wait_interruptible(ctx: &mut SessionContext, ms: u64) -> bool {
    let signal = &*ctx.signal;
    let transport = &*ctx.transport;
    ctx.sched
        .pause_for(ms, &mut || signal.is_paused() || !transport.is_connected())
}
