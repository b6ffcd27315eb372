use anyhow::{anyhow, Result};
use serde::Serialize;

/// Start/end offsets of one clip within the source recording, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipSpan {
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl ClipSpan {
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// One demarcated unit of source text, processed as an atomic pacing section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    pub index: usize,
    pub span: ClipSpan,
    pub text: String,
}

/// A parsed clip script: the whole text source, split at `Clip #N` headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipScript {
    clips: Vec<Clip>,
}

impl ClipScript {
    /// Parse a clip script.
    ///
    /// The format is a sequence of header lines
    /// `Clip #N <MM:SS.mmm-MM:SS.mmm>` each followed by body lines. Body
    /// lines are trimmed and non-empty lines are newline-joined into the
    /// clip text. Text before the first header is ignored. A source with
    /// no headers parses to an empty script (no work to do), but a header
    /// with a malformed timestamp pair is an error.
    pub fn parse(source: &str) -> Result<Self> {
        let mut clips: Vec<Clip> = Vec::new();
        let mut current: Option<Clip> = None;

        for (line_no, raw_line) in source.lines().enumerate() {
            let line = raw_line.trim();

            if line.starts_with("Clip #") {
                if let Some(clip) = current.take() {
                    clips.push(clip);
                }
                let span = parse_header_span(line).map_err(|err| {
                    anyhow!("line {}: bad clip header {line:?}: {err}", line_no + 1)
                })?;
                current = Some(Clip {
                    index: clips.len() + 1,
                    span,
                    text: String::new(),
                });
            } else if let Some(clip) = current.as_mut() {
                if !line.is_empty() {
                    clip.text.push_str(line);
                    clip.text.push('\n');
                }
            }
        }

        if let Some(clip) = current.take() {
            clips.push(clip);
        }

        Ok(Self { clips })
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index.checked_sub(1)?)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Total task duration: first clip start to last clip end, in seconds.
    /// Zero when the script is empty.
    pub fn total_duration_seconds(&self) -> f64 {
        match (self.clips.first(), self.clips.last()) {
            (Some(first), Some(last)) => last.span.end_seconds - first.span.start_seconds,
            _ => 0.0,
        }
    }

    pub fn total_duration_minutes(&self) -> f64 {
        self.total_duration_seconds() / 60.0
    }
}

/// Extract the `<start-end>` timestamp pair from a clip header line.
fn parse_header_span(line: &str) -> Result<ClipSpan> {
    let open = line
        .find('<')
        .ok_or_else(|| anyhow!("missing '<' timestamp delimiter"))?;
    let close = line
        .rfind('>')
        .filter(|&close| close > open)
        .ok_or_else(|| anyhow!("missing '>' timestamp delimiter"))?;

    let pair = &line[open + 1..close];
    let (start_str, end_str) = pair
        .split_once('-')
        .ok_or_else(|| anyhow!("missing '-' between start and end timestamps"))?;

    let start_seconds = parse_timestamp(start_str.trim())?;
    let end_seconds = parse_timestamp(end_str.trim())?;

    Ok(ClipSpan {
        start_seconds,
        end_seconds,
    })
}

/// Parse a `MM:SS.mmm` timestamp into seconds.
///
/// The format is strict: exactly nine ASCII characters, `:` at index 2,
/// `.` at index 5, digits everywhere else, seconds < 60, millis < 1000.
/// Anything else is rejected rather than coerced.
pub fn parse_timestamp(s: &str) -> Result<f64> {
    let bytes = s.as_bytes();
    if bytes.len() != 9 {
        return Err(anyhow!("timestamp {s:?} is not in MM:SS.mmm format"));
    }
    if bytes[2] != b':' || bytes[5] != b'.' {
        return Err(anyhow!("timestamp {s:?} is not in MM:SS.mmm format"));
    }
    for (i, b) in bytes.iter().enumerate() {
        if i != 2 && i != 5 && !b.is_ascii_digit() {
            return Err(anyhow!("timestamp {s:?} contains a non-digit"));
        }
    }

    let minutes: u32 = s[0..2].parse()?;
    let seconds: u32 = s[3..5].parse()?;
    let millis: u32 = s[6..9].parse()?;

    if seconds >= 60 {
        return Err(anyhow!("timestamp {s:?}: seconds out of range"));
    }
    if millis >= 1000 {
        return Err(anyhow!("timestamp {s:?}: milliseconds out of range"));
    }

    Ok(f64::from(minutes) * 60.0 + f64::from(seconds) + f64::from(millis) / 1000.0)
}

/// Format seconds back into `MM:SS.mmm` (for status output).
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let mins = total_ms / 60_000;
    let secs = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!("{mins:02}:{secs:02}.{ms:03}")
}
