use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::keyboard::SpecialKey;

/// The mechanism that actually delivers keystrokes to a receiving device.
///
/// The session treats a disconnected transport as an external pause, so a
/// transport may drop its connection at any time without breaking the run.
pub trait KeystrokeTransport {
    fn send_char(&mut self, c: char) -> Result<()>;
    fn send_key(&mut self, key: SpecialKey) -> Result<()>;
    fn is_connected(&self) -> bool;
}

/// Externally debounced pause/resume signal.
///
/// The session only reads this; toggling is driven by whatever owns the
/// signal (Ctrl+C handler, test harness, a physical button upstream).
pub trait PauseSignal {
    fn is_paused(&self) -> bool;
    fn toggle(&self);
}

/// Pause flag shared between the session loop and an async signal source.
#[derive(Debug, Clone)]
pub struct SharedPauseFlag {
    paused: Arc<AtomicBool>,
}

impl SharedPauseFlag {
    pub fn new(paused: bool) -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(paused)),
        }
    }

    /// Route Ctrl+C to pause/resume toggling for the lifetime of the process.
    pub fn install_ctrlc_toggle(&self) -> Result<()> {
        let paused = self.paused.clone();
        ctrlc::set_handler(move || {
            paused.fetch_xor(true, Ordering::SeqCst);
        })
        .context("failed to install Ctrl+C handler")
    }
}

impl PauseSignal for SharedPauseFlag {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn toggle(&self) {
        self.paused.fetch_xor(true, Ordering::SeqCst);
    }
}

/// Console transport: renders the keystroke stream on stderr.
///
/// Useful for dry runs and demos; backspaces erase the previous character
/// the way a terminal would, tabs advance the cursor.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

impl KeystrokeTransport for ConsoleTransport {
    fn send_char(&mut self, c: char) -> Result<()> {
        let mut err = io::stderr().lock();
        write!(err, "{c}").context("failed to write to stderr")?;
        err.flush().context("failed to flush stderr")?;
        Ok(())
    }

    fn send_key(&mut self, key: SpecialKey) -> Result<()> {
        let mut err = io::stderr().lock();
        match key {
            SpecialKey::Backspace => {
                write!(err, "\u{8} \u{8}").context("failed to write to stderr")?
            }
            SpecialKey::Tab => write!(err, "\t").context("failed to write to stderr")?,
        }
        err.flush().context("failed to flush stderr")?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}
