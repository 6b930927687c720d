// Velocity and acceleration estimation from raw position samples.
//
// Successive position deltas are divided by the supplied tick period and
// smoothed over a short moving-average window; acceleration is the delta
// of the smoothed velocity. Nothing here integrates open-loop, so jitter
// in the sampling period cannot accumulate into drift.

use std::time::Duration;

/// Smoothing window length, in samples
const WINDOW: usize = 4;

/// Per-joint velocity/acceleration estimator.
///
/// Feed it absolute poses only: taring a joint changes its reference
/// offset, not its absolute track, so derivatives are tare-invariant.
#[derive(Debug, Clone, Default)]
pub struct DerivativeFilter {
    last_position: Option<f64>,
    window: [f64; WINDOW],
    filled: usize,
    next: usize,
    velocity: f64,
    acceleration: f64,
}

impl DerivativeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one position sample taken `dt` after the previous one
    pub fn sample(&mut self, raw_position: f64, dt: Duration) {
        let dt = dt.as_secs_f64();
        if dt <= 0.0 {
            return;
        }
        let Some(last) = self.last_position.replace(raw_position) else {
            // First sample only seeds the position history
            return;
        };

        self.window[self.next] = (raw_position - last) / dt;
        self.next = (self.next + 1) % WINDOW;
        self.filled = (self.filled + 1).min(WINDOW);

        let smoothed = self.window[..self.filled].iter().sum::<f64>() / self.filled as f64;
        self.acceleration = (smoothed - self.velocity) / dt;
        self.velocity = smoothed;
    }

    /// Smoothed velocity, units of position per second
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Rate of change of the smoothed velocity
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }
}
