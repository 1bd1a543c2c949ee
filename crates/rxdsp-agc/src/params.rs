//! AGC configuration snapshot
//!
//! `AgcConfig` is a plain-old-data snapshot of every externally tunable
//! parameter. The control thread edits its own copy through the validated
//! setters and publishes whole snapshots to the audio thread; the engine
//! diffs consecutive snapshots in [`crate::agc::Agc::apply`] to decide what
//! to recompute.
//!
//! Each parameter has two setter flavors:
//! - `set_*`: silently ignores out-of-range values. This is the UI-facing
//!   surface — continuous controls (sliders, encoders) must never throw.
//! - `try_set_*`: returns [`ParamError::OutOfRange`] on rejection so
//!   programmatic callers and tests can tell "accepted" from "ignored".

use crate::error::ParamError;
use crate::types::MAX_SAMPLE_RATE;

/// Accepted range for target level, dB
pub const TARGET_LEVEL_RANGE: (i32, i32) = (-160, 0);
/// Accepted range for manual gain, dB
pub const MANUAL_GAIN_RANGE: (f32, f32) = (-160.0, 160.0);
/// Accepted range for max gain, dB
pub const MAX_GAIN_RANGE: (i32, i32) = (0, 160);
/// Accepted range for attack and decay times, ms
pub const ATTACK_DECAY_RANGE: (u32, u32) = (20, 5000);
/// Accepted range for hang time, ms
pub const HANG_RANGE: (u32, u32) = (0, 5000);
/// Accepted range for panning
pub const PANNING_RANGE: (i32, i32) = (-100, 100);

/// Snapshot of all tunable AGC parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgcConfig {
    /// Windowed AGC vs. fixed manual gain
    pub agc_on: bool,
    /// Sample rate in Hz; rescales all time-based derived values
    pub sample_rate: f64,
    /// Desired post-AGC peak level, dB
    pub target_level: i32,
    /// Fixed gain when AGC is off, dB
    pub manual_gain: f32,
    /// Ceiling on AGC-applied gain, dB
    pub max_gain: i32,
    /// Response time to a loudness increase, ms
    pub attack_ms: u32,
    /// Relax time after a loudness decrease, ms
    pub decay_ms: u32,
    /// Hold time before decay resumes, ms
    pub hang_ms: u32,
    /// Stereo image shift on the auxiliary output, −100..100
    pub panning: i32,
    /// Silence the auxiliary output (primary unaffected)
    pub mute: bool,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            agc_on: true,
            sample_rate: crate::types::DEFAULT_SAMPLE_RATE,
            target_level: 0,
            manual_gain: 0.0,
            max_gain: 100,
            attack_ms: 20,
            decay_ms: 500,
            hang_ms: 0,
            panning: 0,
            mute: false,
        }
    }
}

macro_rules! range_setter {
    ($try_name:ident, $name:ident, $field:ident, $ty:ty, $min:expr, $max:expr, $label:literal) => {
        /// Validated setter; rejects out-of-range values with an error.
        pub fn $try_name(&mut self, value: $ty) -> Result<(), ParamError> {
            // Negated form so a NaN float also lands in the rejection arm
            if !(value >= $min && value <= $max) {
                return Err(ParamError::OutOfRange {
                    name: $label,
                    value: value as f64,
                    min: $min as f64,
                    max: $max as f64,
                });
            }
            self.$field = value;
            Ok(())
        }

        /// UI-facing setter; silently ignores out-of-range values.
        pub fn $name(&mut self, value: $ty) {
            let _ = self.$try_name(value);
        }
    };
}

impl AgcConfig {
    range_setter!(try_set_target_level, set_target_level, target_level, i32,
        TARGET_LEVEL_RANGE.0, TARGET_LEVEL_RANGE.1, "target_level");
    range_setter!(try_set_manual_gain, set_manual_gain, manual_gain, f32,
        MANUAL_GAIN_RANGE.0, MANUAL_GAIN_RANGE.1, "manual_gain");
    range_setter!(try_set_max_gain, set_max_gain, max_gain, i32,
        MAX_GAIN_RANGE.0, MAX_GAIN_RANGE.1, "max_gain");
    range_setter!(try_set_attack, set_attack, attack_ms, u32,
        ATTACK_DECAY_RANGE.0, ATTACK_DECAY_RANGE.1, "attack");
    range_setter!(try_set_decay, set_decay, decay_ms, u32,
        ATTACK_DECAY_RANGE.0, ATTACK_DECAY_RANGE.1, "decay");
    range_setter!(try_set_hang, set_hang, hang_ms, u32,
        HANG_RANGE.0, HANG_RANGE.1, "hang");
    range_setter!(try_set_panning, set_panning, panning, i32,
        PANNING_RANGE.0, PANNING_RANGE.1, "panning");

    /// Validated sample rate setter; the rate must be positive and within
    /// what the engine is dimensioned for.
    pub fn try_set_sample_rate(&mut self, rate: f64) -> Result<(), ParamError> {
        if !(rate > 0.0 && rate <= MAX_SAMPLE_RATE) {
            return Err(ParamError::OutOfRange {
                name: "sample_rate",
                value: rate,
                min: 0.0,
                max: MAX_SAMPLE_RATE,
            });
        }
        self.sample_rate = rate;
        Ok(())
    }

    /// UI-facing sample rate setter; silently ignores invalid rates.
    pub fn set_sample_rate(&mut self, rate: f64) {
        let _ = self.try_set_sample_rate(rate);
    }

    /// Enable or disable the windowed AGC (disabled = fixed manual gain).
    pub fn set_agc_on(&mut self, on: bool) {
        self.agc_on = on;
    }

    /// Mute the auxiliary output pair.
    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let mut cfg = AgcConfig::default();
        let copy = cfg;
        assert!(cfg.try_set_target_level(copy.target_level).is_ok());
        assert!(cfg.try_set_manual_gain(copy.manual_gain).is_ok());
        assert!(cfg.try_set_max_gain(copy.max_gain).is_ok());
        assert!(cfg.try_set_attack(copy.attack_ms).is_ok());
        assert!(cfg.try_set_decay(copy.decay_ms).is_ok());
        assert!(cfg.try_set_hang(copy.hang_ms).is_ok());
        assert!(cfg.try_set_panning(copy.panning).is_ok());
        assert!(cfg.try_set_sample_rate(copy.sample_rate).is_ok());
        assert_eq!(cfg, copy);
    }

    #[test]
    fn test_out_of_range_is_rejected_and_ignored() {
        let mut cfg = AgcConfig::default();

        // Below the 20 ms attack floor: try_* reports, set_* is a no-op
        let err = cfg.try_set_attack(10).unwrap_err();
        assert!(matches!(err, ParamError::OutOfRange { name: "attack", .. }));
        assert_eq!(cfg.attack_ms, 20);

        cfg.set_attack(10);
        assert_eq!(cfg.attack_ms, 20, "silent setter must not apply 10 ms");

        cfg.set_attack(100);
        assert_eq!(cfg.attack_ms, 100);
    }

    #[test]
    fn test_sample_rate_must_be_positive() {
        let mut cfg = AgcConfig::default();
        assert!(cfg.try_set_sample_rate(0.0).is_err());
        assert!(cfg.try_set_sample_rate(-48000.0).is_err());
        assert!(cfg.try_set_sample_rate(f64::NAN).is_err());
        assert_eq!(cfg.sample_rate, crate::types::DEFAULT_SAMPLE_RATE);
        assert!(cfg.try_set_sample_rate(96_000.0).is_ok());
    }

    #[test]
    fn test_panning_bounds() {
        let mut cfg = AgcConfig::default();
        assert!(cfg.try_set_panning(-100).is_ok());
        assert!(cfg.try_set_panning(100).is_ok());
        assert!(cfg.try_set_panning(101).is_err());
        assert!(cfg.try_set_panning(-101).is_err());
        assert_eq!(cfg.panning, 100);
    }
}
