use serde::Serialize;

/// One calibration anchor in the duration-to-AHT table.
///
/// All fields are minutes. The table is sorted ascending by `duration`
/// and every bound column is non-decreasing across anchors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AhtPoint {
    pub duration: f64,
    pub lower_bound: f64,
    pub target: f64,
    pub upper_bound: f64,
}

const fn p(duration: f64, lower_bound: f64, target: f64, upper_bound: f64) -> AhtPoint {
    AhtPoint {
        duration,
        lower_bound,
        target,
        upper_bound,
    }
}

/// Calibration data for expected handle time, one anchor per minute of
/// source material from 5 to 45 minutes.
pub const AHT_POINTS: [AhtPoint; 41] = [
    p(5.0, 30.0, 47.5, 65.0),
    p(6.0, 36.0, 57.0, 78.0),
    p(7.0, 42.0, 66.5, 91.0),
    p(8.0, 48.0, 76.0, 104.0),
    p(9.0, 54.0, 85.5, 117.0),
    p(10.0, 60.0, 95.0, 130.0),
    p(11.0, 66.0, 104.5, 143.0),
    p(12.0, 72.0, 114.0, 156.0),
    p(13.0, 78.0, 123.5, 169.0),
    p(14.0, 84.0, 133.0, 182.0),
    p(15.0, 90.0, 142.5, 195.0),
    p(16.0, 96.0, 152.0, 208.0),
    p(17.0, 102.0, 161.5, 221.0),
    p(18.0, 108.0, 171.0, 234.0),
    p(19.0, 114.0, 180.5, 247.0),
    p(20.0, 120.0, 190.0, 260.0),
    p(21.0, 126.0, 199.5, 273.0),
    p(22.0, 132.0, 209.0, 286.0),
    p(23.0, 138.0, 218.5, 299.0),
    p(24.0, 144.0, 228.0, 312.0),
    p(25.0, 150.0, 237.5, 325.0),
    p(26.0, 156.0, 247.0, 338.0),
    p(27.0, 162.0, 256.5, 351.0),
    p(28.0, 168.0, 266.0, 364.0),
    p(29.0, 174.0, 275.5, 377.0),
    p(30.0, 180.0, 285.0, 390.0),
    p(31.0, 186.0, 294.5, 403.0),
    p(32.0, 192.0, 304.0, 416.0),
    p(33.0, 198.0, 313.5, 429.0),
    p(34.0, 204.0, 323.0, 442.0),
    p(35.0, 210.0, 332.5, 455.0),
    p(36.0, 216.0, 342.0, 468.0),
    p(37.0, 222.0, 351.5, 481.0),
    p(38.0, 228.0, 361.0, 494.0),
    p(39.0, 234.0, 370.5, 507.0),
    p(40.0, 240.0, 380.0, 520.0),
    p(41.0, 246.0, 389.5, 533.0),
    p(42.0, 252.0, 399.0, 546.0),
    p(43.0, 258.0, 408.5, 559.0),
    p(44.0, 264.0, 418.0, 572.0),
    p(45.0, 270.0, 427.5, 585.0),
];

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 7.0;

/// Expected handle time envelope, in minutes, already scaled by difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Estimate {
    pub lower_bound: f64,
    pub target: f64,
    pub upper_bound: f64,
}

/// Piecewise-linear estimator mapping task size (minutes of source
/// material) to an expected handle-time envelope.
#[derive(Debug, Clone)]
pub struct AhtEstimator {
    total_duration_minutes: f64,
    difficulty: f64,
}

impl Default for AhtEstimator {
    fn default() -> Self {
        Self {
            total_duration_minutes: 0.0,
            difficulty: MIN_DIFFICULTY,
        }
    }
}

impl AhtEstimator {
    pub fn new(total_duration_minutes: f64) -> Self {
        Self {
            total_duration_minutes,
            difficulty: MIN_DIFFICULTY,
        }
    }

    pub fn configure(&mut self, total_duration_minutes: f64) {
        self.total_duration_minutes = total_duration_minutes;
    }

    /// Set the difficulty multiplier, clamped to [`MIN_DIFFICULTY`, `MAX_DIFFICULTY`].
    pub fn set_difficulty(&mut self, multiplier: f64) {
        self.difficulty = multiplier.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    /// Compute the handle-time envelope for the configured task size.
    ///
    /// A non-positive task size means "no estimate available" and yields
    /// all-zero bounds rather than an error.
    pub fn estimate(&self) -> Estimate {
        if self.total_duration_minutes <= 0.0 {
            return Estimate::default();
        }

        let d = self.total_duration_minutes;
        Estimate {
            lower_bound: interpolate(d, |pt| pt.lower_bound) * self.difficulty,
            target: interpolate(d, |pt| pt.target) * self.difficulty,
            upper_bound: interpolate(d, |pt| pt.upper_bound) * self.difficulty,
        }
    }
}

/// Interpolate one bound column at `duration`.
///
/// Durations outside the table continue the boundary segment linearly:
/// the segment index saturates, the interpolation fraction does not.
fn interpolate(duration: f64, column: impl Fn(&AhtPoint) -> f64) -> f64 {
    let mut i = 0usize;
    while i < AHT_POINTS.len() - 1 && AHT_POINTS[i + 1].duration <= duration {
        i += 1;
    }
    if i >= AHT_POINTS.len() - 1 {
        i = AHT_POINTS.len() - 2;
    }

    let p1 = &AHT_POINTS[i];
    let p2 = &AHT_POINTS[i + 1];

    let v1 = column(p1);
    let v2 = column(p2);

    let t = (duration - p1.duration) / (p2.duration - p1.duration);
    v1 + t * (v2 - v1)
}
