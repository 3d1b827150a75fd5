//! Release velocity estimation.
//!
//! Samples live in a fixed ring buffer; only the most recent run of samples
//! inside the horizon, without a pause longer than `ASSUME_STOPPED_MS`,
//! contributes to the estimate.

/// Ring buffer size for velocity tracking samples.
const HISTORY_SIZE: usize = 20;

/// Only use samples within the last 100ms for velocity calculation.
const HORIZON_MS: u64 = 100;

/// If no movement for this duration, assume the pointer has stopped.
pub const ASSUME_STOPPED_MS: u64 = 40;

#[derive(Debug, Clone, Copy)]
struct Sample {
    time_ms: u64,
    x: f32,
    y: f32,
}

/// 2D velocity tracker for a single pointer
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    samples: [Option<Sample>; HISTORY_SIZE],
    index: usize,
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self {
            samples: [None; HISTORY_SIZE],
            index: 0,
        }
    }

    /// Adds an absolute position at the given time (milliseconds).
    pub fn add_point(&mut self, time_ms: u64, x: f32, y: f32) {
        self.index = (self.index + 1) % HISTORY_SIZE;
        self.samples[self.index] = Some(Sample { time_ms, x, y });
    }

    /// Velocity in px/s as `(vx, vy)`.
    ///
    /// Returns zero when fewer than two usable samples exist.
    pub fn velocity(&self) -> (f32, f32) {
        let newest = match self.samples[self.index] {
            Some(sample) => sample,
            None => return (0.0, 0.0),
        };

        let mut oldest = newest;
        let mut previous = newest;
        let mut current_index = self.index;
        let mut sample_count = 0;

        while let Some(sample) = self.samples[current_index] {
            let age = newest.time_ms.saturating_sub(sample.time_ms);
            let gap = previous.time_ms.saturating_sub(sample.time_ms);
            if age > HORIZON_MS || gap > ASSUME_STOPPED_MS {
                break;
            }

            oldest = sample;
            previous = sample;
            sample_count += 1;
            if sample_count >= HISTORY_SIZE {
                break;
            }

            current_index = if current_index == 0 {
                HISTORY_SIZE - 1
            } else {
                current_index - 1
            };
        }

        let elapsed = newest.time_ms.saturating_sub(oldest.time_ms);
        if sample_count < 2 || elapsed == 0 {
            return (0.0, 0.0);
        }

        let seconds = elapsed as f32 / 1000.0;
        ((newest.x - oldest.x) / seconds, (newest.y - oldest.y) / seconds)
    }

    /// Velocity with each component capped to `max_velocity`.
    pub fn velocity_with_max(&self, max_velocity: f32) -> (f32, f32) {
        if !max_velocity.is_finite() || max_velocity <= 0.0 {
            return (0.0, 0.0);
        }
        let (vx, vy) = self.velocity();
        (
            cap(vx, max_velocity),
            cap(vy, max_velocity),
        )
    }

    /// Clears all tracked data.
    pub fn reset(&mut self) {
        self.samples = [None; HISTORY_SIZE];
        self.index = 0;
    }
}

#[inline]
fn cap(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-max, max)
    }
}
