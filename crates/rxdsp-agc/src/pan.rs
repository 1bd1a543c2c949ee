//! Panning & delay stage for the auxiliary output pair
//!
//! Produces a second, independently balanced copy of the gain-corrected
//! signal: the channel opposite the pan direction is attenuated and delayed
//! proportionally to the pan amount, shifting the perceived stereo image.
//! At full pan the far channel sits [`PAN_MAX_ATTEN_DB`] down and
//! [`PAN_MAX_DELAY_SECS`] late. Mute forces the auxiliary pair to zero; the
//! primary pair never passes through this stage.

use crate::types::{db_to_mag, Frame, Sample, PAN_MAX_ATTEN_DB, PAN_MAX_DELAY_SECS};

/// Single-channel ring-buffer delay line.
///
/// Sized exactly to the configured delay; a zero delay is a passthrough with
/// no buffer at all.
struct DelayLine {
    buffer: Vec<Sample>,
    write_pos: usize,
}

impl DelayLine {
    fn new() -> Self {
        Self { buffer: Vec::new(), write_pos: 0 }
    }

    /// Resize to a new delay length, clearing history.
    ///
    /// Allocates; only called from the parameter path, never per sample.
    fn set_delay(&mut self, samples: usize) {
        if samples != self.buffer.len() {
            self.buffer.clear();
            self.buffer.resize(samples, 0.0);
            self.write_pos = 0;
        }
    }

    fn delay(&self) -> usize {
        self.buffer.len()
    }

    /// Push one sample in, take the sample from `delay` samples ago out.
    #[inline]
    fn process(&mut self, input: Sample) -> Sample {
        if self.buffer.is_empty() {
            return input;
        }
        let out = self.buffer[self.write_pos];
        self.buffer[self.write_pos] = input;
        self.write_pos += 1;
        if self.write_pos >= self.buffer.len() {
            self.write_pos = 0;
        }
        out
    }
}

/// Static per-channel gain + delay producing the auxiliary output pair.
pub struct PanStage {
    gain_left: Sample,
    gain_right: Sample,
    delay_left: DelayLine,
    delay_right: DelayLine,
    mute: bool,
}

impl PanStage {
    pub fn new() -> Self {
        Self {
            gain_left: 1.0,
            gain_right: 1.0,
            delay_left: DelayLine::new(),
            delay_right: DelayLine::new(),
            mute: false,
        }
    }

    /// Recompute per-channel gain and delay from a pan position.
    ///
    /// `panning` in −100..100: negative attenuates/delays the right channel
    /// proportional to the magnitude, positive mirrors on the left, zero is
    /// a no-op. Resizes the affected delay line (clearing its history).
    pub fn set_panning(&mut self, panning: i32, sample_rate: f64) {
        let amount = panning.unsigned_abs().min(100) as f32 / 100.0;
        let far_gain = db_to_mag(-amount * PAN_MAX_ATTEN_DB);
        let far_delay = (amount as f64 * PAN_MAX_DELAY_SECS * sample_rate) as usize;

        let (left, right) = if panning < 0 {
            ((1.0, 0), (far_gain, far_delay))
        } else if panning > 0 {
            ((far_gain, far_delay), (1.0, 0))
        } else {
            ((1.0, 0), (1.0, 0))
        };
        self.gain_left = left.0;
        self.delay_left.set_delay(left.1);
        self.gain_right = right.0;
        self.delay_right.set_delay(right.1);

        log::debug!(
            "pan {:+}: left gain {:.4} delay {}, right gain {:.4} delay {}",
            panning,
            self.gain_left,
            self.delay_left.delay(),
            self.gain_right,
            self.delay_right.delay()
        );
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    /// Produce one auxiliary frame from a gain-corrected primary frame.
    ///
    /// The delay lines keep running while muted so unmuting resumes without
    /// a stale-history transient.
    #[inline]
    pub fn process(&mut self, frame: Frame) -> Frame {
        let left = self.delay_left.process(frame.left) * self.gain_left;
        let right = self.delay_right.process(frame.right) * self.gain_right;
        if self.mute {
            Frame::silence()
        } else {
            Frame::new(left, right)
        }
    }
}

impl Default for PanStage {
    fn default() -> Self {
        Self::new()
    }
}
