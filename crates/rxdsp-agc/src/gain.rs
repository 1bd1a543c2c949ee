//! Gain controller — drives the applied gain toward a windowed target
//!
//! Consumes the sliding-window peak once per sample and moves `current_gain`
//! toward `target_gain` at a bounded multiplicative rate:
//!
//! - **Attack** (gain above target): fast, never delayed. Sized so a
//!   full-range correction completes within the attack window.
//! - **Decay** (gain below target): slow, and suppressed while the hang
//!   counter is running so short pauses after a peak do not pump the noise
//!   floor back up.
//! - **Silence** (window peak at or below the floor): the target snaps to
//!   the max-gain ceiling and hang is cleared; no division by a zero peak
//!   ever happens.
//!
//! The step multipliers are precomputed as `10^(±range_db / n / 20)` so the
//! time to fully correct is invariant to sample rate.

use crate::types::{mag_to_db, Sample, MIN_GAIN};

/// Derived coefficients the parameter manager publishes for the controller.
///
/// All values are recomputed outside the sample loop; the controller only
/// reads them.
#[derive(Debug, Clone, Copy)]
pub struct GainTuning {
    /// Desired post-AGC peak magnitude (linear)
    pub target_mag: Sample,
    /// Gain ceiling (linear)
    pub max_gain_mag: Sample,
    /// Peaks at or below this magnitude count as silence (linear)
    pub floor_mag: Sample,
    /// Per-sample attack multiplier, < 1
    pub attack_step: Sample,
    /// Per-sample decay multiplier, > 1
    pub decay_step: Sample,
    /// Hold time before decay resumes, samples
    pub hang_samples: usize,
    /// Lookahead window length, samples (hang is armed for window + hang)
    pub window_samples: usize,
}

/// Per-sample gain state machine.
pub struct GainController {
    pub tuning: GainTuning,
    current: Sample,
    target: Sample,
    hang_counter: usize,
}

impl GainController {
    pub fn new(tuning: GainTuning) -> Self {
        let mut ctl = Self {
            tuning,
            current: 1.0,
            target: 1.0,
            hang_counter: 0,
        };
        ctl.reset_target();
        ctl
    }

    /// Currently applied linear gain.
    #[inline]
    pub fn current_gain(&self) -> Sample {
        self.current
    }

    /// Currently applied gain in dB.
    #[inline]
    pub fn current_gain_db(&self) -> Sample {
        mag_to_db(self.current)
    }

    #[cfg(test)]
    pub(crate) fn target_gain(&self) -> Sample {
        self.target
    }

    /// Park the target at the max-gain ceiling (the value the silence branch
    /// assigns) and clear hang. Used at construction and after the window is
    /// re-seeded, so the first peak is treated as an interruption and arms
    /// hang.
    pub fn reset_target(&mut self) {
        self.target = self.tuning.max_gain_mag;
        self.hang_counter = 0;
    }

    /// Pin a fixed gain (manual / AGC-off mode).
    pub fn set_fixed(&mut self, gain: Sample) {
        self.current = gain.max(MIN_GAIN);
        self.target = self.current;
        self.hang_counter = 0;
    }

    /// Advance the state machine one sample and return the gain to apply.
    ///
    /// `window_max` is the sliding-window peak magnitude (>= 0).
    #[inline]
    pub fn update(&mut self, window_max: Sample) -> Sample {
        let t = &self.tuning;

        if window_max > t.floor_mag {
            let candidate = t.target_mag / window_max;
            if candidate < self.target {
                // A louder peak needs more attenuation. If the gain had not
                // yet caught up to the previous target, re-arm hang; adopt
                // the new target either way — attack is never delayed.
                if self.current != self.target {
                    self.hang_counter = t.window_samples + t.hang_samples;
                }
                self.target = candidate;
            } else if self.hang_counter == 0 {
                self.target = candidate;
            }
        } else {
            // Near silence: head for the ceiling, hang no longer applies.
            self.target = t.max_gain_mag;
            self.hang_counter = 0;
        }

        if self.current > self.target {
            self.current = (self.current * t.attack_step).max(self.target);
        } else if self.hang_counter == 0 && self.current < self.target {
            self.current = (self.current * t.decay_step).min(self.target);
        }

        if self.hang_counter > 0 {
            self.hang_counter -= 1;
        }
        if self.current < MIN_GAIN {
            self.current = MIN_GAIN;
        }
        self.current
    }
}
