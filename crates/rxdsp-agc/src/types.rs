//! Common types for the AGC engine
//!
//! The engine processes a continuous stream of stereo sample pairs. `Frame`
//! is laid out `#[repr(C)]` so a `&[Frame]` can be reinterpreted as an
//! interleaved `&[f32]` (and back) without copying, for hosts that hand
//! audio around as flat channel-interleaved buffers.

/// Audio sample type (32-bit float throughout the processing chain)
pub type Sample = f32;

/// Default sample rate (48 kHz audio chain); the actual rate is configured
/// at runtime.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

/// Highest sample rate the engine is dimensioned for. Pan delay lines are
/// bounded by this rate times [`PAN_MAX_DELAY_SECS`].
pub const MAX_SAMPLE_RATE: f64 = 192_000.0;

/// Hard floor on the applied gain, linear (−160 dB). Gain must never reach
/// zero: a zero gain cannot be recovered by multiplicative decay steps.
pub const MIN_GAIN: f32 = 1e-8;

/// Attenuation of the far auxiliary channel at full pan, in dB.
pub const PAN_MAX_ATTEN_DB: f32 = 30.0;

/// Delay of the far auxiliary channel at full pan, in seconds.
pub const PAN_MAX_DELAY_SECS: f64 = 0.01;

/// Convert decibels to a linear amplitude factor.
#[inline]
pub fn db_to_mag(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear amplitude factor to decibels.
#[inline]
pub fn mag_to_db(mag: f32) -> f32 {
    20.0 * mag.log10()
}

/// A single stereo frame (channel A / channel B sample pair)
///
/// `#[repr(C)]` guarantees the `[left, right]` layout needed for the
/// zero-copy interleaved views below.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Frame {
    pub left: Sample,
    pub right: Sample,
}

impl Frame {
    /// Create a new frame
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent frame
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono frame (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Peak magnitude of the frame: `max(|left|, |right|)`
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }

    /// Scale both channels by a factor
    #[inline]
    pub fn scale(&self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::Mul<Sample> for Frame {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        self.scale(factor)
    }
}

/// Reinterpret an interleaved `[L, R, L, R, ...]` slice as frames (zero-copy).
///
/// Panics if the slice length is odd.
#[inline]
pub fn frames_from_interleaved(interleaved: &[Sample]) -> &[Frame] {
    bytemuck::cast_slice(interleaved)
}

/// Reinterpret a mutable interleaved slice as frames (zero-copy).
#[inline]
pub fn frames_from_interleaved_mut(interleaved: &mut [Sample]) -> &mut [Frame] {
    bytemuck::cast_slice_mut(interleaved)
}

/// View a frame slice as interleaved `[L, R, L, R, ...]` samples (zero-copy).
#[inline]
pub fn frames_as_interleaved(frames: &[Frame]) -> &[Sample] {
    bytemuck::cast_slice(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_peak() {
        assert_eq!(Frame::new(0.5, -0.8).peak(), 0.8);
        assert_eq!(Frame::new(-0.9, 0.1).peak(), 0.9);
        assert_eq!(Frame::silence().peak(), 0.0);
    }

    #[test]
    fn test_db_roundtrip() {
        for db in [-60.0_f32, -12.0, 0.0, 40.0] {
            let back = mag_to_db(db_to_mag(db));
            assert!((back - db).abs() < 1e-3, "db {} came back as {}", db, back);
        }
    }

    #[test]
    fn test_interleaved_views() {
        let interleaved = [1.0, 2.0, 3.0, 4.0];
        let frames = frames_from_interleaved(&interleaved);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Frame::new(1.0, 2.0));
        assert_eq!(frames[1], Frame::new(3.0, 4.0));
        assert_eq!(frames_as_interleaved(frames), &interleaved);
    }
}
