use std::time::{Duration, Instant};

/// Granularity at which waits re-check their cancellation signal.
pub const CANCEL_CHECK_INTERVAL_MS: u64 = 50;

/// Clock and interruptible-wait abstraction.
///
/// Production code backs this with real sleeps; tests use [`ManualClock`]
/// to fast-forward instantly. All pacing delays go through `pause_for` so
/// a pause signal is observed within one check interval rather than only
/// at emission boundaries.
pub trait Scheduler {
    /// Milliseconds since an arbitrary fixed origin. Monotonic.
    fn now_ms(&self) -> u64;

    /// Wait for `ms`, polling `cancel` between sub-intervals.
    ///
    /// Returns `true` if the wait was cancelled before it fully elapsed.
    fn pause_for(&mut self, ms: u64, cancel: &mut dyn FnMut() -> bool) -> bool;
}

/// Real-time scheduler backed by `Instant` and `thread::sleep`.
#[derive(Debug)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for WallClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn pause_for(&mut self, ms: u64, cancel: &mut dyn FnMut() -> bool) -> bool {
        let mut remaining = ms;
        while remaining > 0 {
            if cancel() {
                return true;
            }
            let step = remaining.min(CANCEL_CHECK_INTERVAL_MS);
            std::thread::sleep(Duration::from_millis(step));
            remaining -= step;
        }
        cancel()
    }
}

/// Test scheduler: advances a counter instead of sleeping, with the same
/// sub-interval cancellation semantics as [`WallClock`].
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now_ms: u64) -> Self {
        Self { now_ms }
    }

    /// Jump the clock forward without modeling a wait.
    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}

impl Scheduler for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn pause_for(&mut self, ms: u64, cancel: &mut dyn FnMut() -> bool) -> bool {
        let mut remaining = ms;
        while remaining > 0 {
            if cancel() {
                return true;
            }
            let step = remaining.min(CANCEL_CHECK_INTERVAL_MS);
            self.now_ms += step;
            remaining -= step;
        }
        cancel()
    }
}
