use anyhow::Result;

use crate::keyboard::SpecialKey;
use crate::transport::KeystrokeTransport;

/// One recorded transport emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Char(char),
    Key(SpecialKey),
}

/// In-memory transport that records every emission.
///
/// Intended for tests and debugging: [`Transcript::final_text`] replays
/// the emission stream into the text a receiving editor would display,
/// with backspaces removing the previous character. Tab emissions are
/// navigation, not text, and do not appear in the replay.
#[derive(Debug, Clone)]
pub struct Transcript {
    emissions: Vec<Emission>,
    connected: bool,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            emissions: Vec::new(),
            connected: true,
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> &[Emission] {
        &self.emissions
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn char_count(&self) -> usize {
        self.emissions
            .iter()
            .filter(|e| matches!(e, Emission::Char(_)))
            .count()
    }

    pub fn backspace_count(&self) -> usize {
        self.emissions
            .iter()
            .filter(|e| matches!(e, Emission::Key(SpecialKey::Backspace)))
            .count()
    }

    /// The visible text after applying every emission in order.
    pub fn final_text(&self) -> String {
        let mut buf: Vec<char> = Vec::new();
        for emission in &self.emissions {
            match emission {
                Emission::Char(c) => buf.push(*c),
                Emission::Key(SpecialKey::Backspace) => {
                    buf.pop();
                }
                Emission::Key(SpecialKey::Tab) => {}
            }
        }
        buf.into_iter().collect()
    }
}

impl KeystrokeTransport for Transcript {
    fn send_char(&mut self, c: char) -> Result<()> {
        self.emissions.push(Emission::Char(c));
        Ok(())
    }

    fn send_key(&mut self, key: SpecialKey) -> Result<()> {
        self.emissions.push(Emission::Key(key));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
