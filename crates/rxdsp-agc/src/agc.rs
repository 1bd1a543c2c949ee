//! AGC engine — lookahead delay, peak window, gain, panning in one pass
//!
//! Normalizes a dual-channel float stream so its peak tracks the configured
//! target level. Each input frame is written into a lookahead ring while the
//! frame from one attack-window ago is read out; the gain applied to that
//! delayed frame has therefore already seen every peak in the window between
//! them, so a transient is attenuated *before* it reaches the output.
//!
//! Per input frame the engine produces two output frames:
//! - **primary**: the delayed input scaled by the controller gain;
//! - **auxiliary**: the primary frame after the static panning/delay stage
//!   (zeroed while muted).
//!
//! The per-sample path never allocates, blocks, or logs. Allocation happens
//! only in [`Agc::new`] and inside [`Agc::apply`] when a geometry-affecting
//! parameter changed, which the caller keeps outside the hot loop.

use crate::error::{AgcError, AgcResult};
use crate::gain::{GainController, GainTuning};
use crate::pan::PanStage;
use crate::params::AgcConfig;
use crate::peak::PeakWindow;
use crate::types::{db_to_mag, Frame, Sample};

/// The AGC engine. Single-threaded; see [`crate::node`] for the
/// control/audio thread pair.
pub struct Agc {
    config: AgcConfig,
    window: PeakWindow,
    gain: GainController,
    pan: PanStage,
    /// Lookahead ring; capacity is the window's leaf row, the write cursor
    /// wraps at `buf_samples`
    sample_buf: Vec<Frame>,
    buf_pos: usize,
    /// Lookahead length in samples (= attack time at the current rate)
    buf_samples: usize,
    /// Re-seed the magnitude window from the lookahead ring at the start of
    /// the next `process` call
    needs_refill: bool,
    /// Whether the surrounding pipeline is streaming. While stopped there is
    /// no live history, so geometry changes reset instead of refilling.
    running: bool,
}

impl Agc {
    /// Build an engine for the given configuration.
    ///
    /// The only failure mode is buffer allocation ([`AgcError::Alloc`]);
    /// nothing fails during streaming.
    pub fn new(config: AgcConfig) -> AgcResult<Self> {
        let buf_samples = window_length(&config);
        let (window, sample_buf) = alloc_buffers(buf_samples)?;

        let mut gain = GainController::new(tuning_for(&config, buf_samples));
        if !config.agc_on {
            gain.set_fixed(db_to_mag(config.manual_gain));
        }

        let mut pan = PanStage::new();
        pan.set_panning(config.panning, config.sample_rate);
        pan.set_mute(config.mute);

        Ok(Self {
            config,
            window,
            gain,
            pan,
            sample_buf,
            buf_pos: 0,
            buf_samples,
            needs_refill: false,
            running: true,
        })
    }

    /// Last applied configuration snapshot.
    pub fn config(&self) -> &AgcConfig {
        &self.config
    }

    /// Currently applied gain in dB (manual gain when AGC is off).
    pub fn current_gain_db(&self) -> Sample {
        self.gain.current_gain_db()
    }

    /// Lookahead the host must prime before the first output frame is
    /// correct, in samples.
    pub fn lookahead_samples(&self) -> usize {
        self.buf_samples
    }

    /// Tell the engine whether the pipeline is streaming. While stopped,
    /// geometry changes reset the buffers to silence instead of scheduling a
    /// refill from (nonexistent) live history.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Apply a configuration snapshot, recomputing only what changed.
    ///
    /// Idempotent: applying the current configuration is a no-op. Window
    /// reallocation failure is logged and the previous geometry kept — the
    /// streaming path must never unwind.
    pub fn apply(&mut self, new: &AgcConfig) {
        let old = self.config;
        if *new == old {
            return;
        }

        let sample_rate_changed = new.sample_rate != old.sample_rate;
        let agc_on_changed = new.agc_on != old.agc_on;
        let target_changed = new.target_level != old.target_level;
        let manual_changed = new.manual_gain != old.manual_gain;
        let max_gain_changed = new.max_gain != old.max_gain;
        let attack_changed = new.attack_ms != old.attack_ms;
        let decay_changed = new.decay_ms != old.decay_ms;
        let hang_changed = new.hang_ms != old.hang_ms;
        let panning_changed = new.panning != old.panning;
        let mute_changed = new.mute != old.mute;
        self.config = *new;

        if sample_rate_changed || attack_changed {
            let buf_samples = window_length(new);
            if buf_samples != self.buf_samples {
                self.resize_window(buf_samples);
            }
            self.gain.tuning.window_samples = self.buf_samples;
        }

        let max_gain = effective_max_gain(new);
        if target_changed {
            self.gain.tuning.target_mag = db_to_mag(new.target_level as f32);
        }
        if max_gain_changed {
            self.gain.tuning.max_gain_mag = db_to_mag(max_gain as f32);
        }
        if target_changed || max_gain_changed {
            self.gain.tuning.floor_mag = db_to_mag((new.target_level - max_gain) as f32);
        }
        if max_gain_changed || attack_changed || sample_rate_changed {
            self.gain.tuning.attack_step = attack_step(max_gain, self.buf_samples);
        }
        if max_gain_changed || decay_changed || sample_rate_changed {
            self.gain.tuning.decay_step = decay_step(max_gain, new.sample_rate, new.decay_ms);
        }
        if hang_changed || sample_rate_changed {
            self.gain.tuning.hang_samples = duration_samples(new.sample_rate, new.hang_ms);
        }

        if panning_changed || sample_rate_changed {
            self.pan.set_panning(new.panning, new.sample_rate);
        }
        if mute_changed {
            self.pan.set_mute(new.mute);
        }

        if (manual_changed || agc_on_changed) && !new.agc_on {
            self.gain.set_fixed(db_to_mag(new.manual_gain));
        }
        if agc_on_changed && new.agc_on {
            // Coming back from manual gain: the magnitude window is stale,
            // re-seed it from whatever the lookahead ring holds.
            self.gain.reset_target();
            if self.running {
                self.needs_refill = true;
            }
        }

        log::debug!(
            "agc apply: rate {} buf_samples {} attack_step {:.6} decay_step {:.6} \
             hang {} floor {:.2e} refill {}",
            self.config.sample_rate,
            self.buf_samples,
            self.gain.tuning.attack_step,
            self.gain.tuning.decay_step,
            self.gain.tuning.hang_samples,
            self.gain.tuning.floor_mag,
            self.needs_refill,
        );
    }

    /// Process one block: two input channels in, four output channels out.
    ///
    /// All three slices must have the same length. Output is correct once
    /// `lookahead_samples()` (plus the pan delay, for the auxiliary pair)
    /// input frames have been consumed; the host primes the pipeline.
    pub fn process(&mut self, input: &[Frame], primary: &mut [Frame], aux: &mut [Frame]) {
        debug_assert_eq!(input.len(), primary.len());
        debug_assert_eq!(input.len(), aux.len());

        if self.needs_refill {
            self.refill();
        }

        if self.config.agc_on {
            for ((frame, out), aux_out) in
                input.iter().zip(primary.iter_mut()).zip(aux.iter_mut())
            {
                let delayed = self.sample_buf[self.buf_pos];
                self.sample_buf[self.buf_pos] = *frame;
                self.window.insert(self.buf_pos, frame.peak());
                self.buf_pos += 1;
                if self.buf_pos >= self.buf_samples {
                    self.buf_pos = 0;
                }

                let g = self.gain.update(self.window.max());
                let corrected = delayed * g;
                *out = corrected;
                *aux_out = self.pan.process(corrected);
            }
        } else {
            // Manual gain: fixed multiplier on the live input, no lookahead
            // delay. The ring keeps recording so re-enabling the AGC can
            // re-seed from recent history.
            let g = self.gain.current_gain();
            for ((frame, out), aux_out) in
                input.iter().zip(primary.iter_mut()).zip(aux.iter_mut())
            {
                self.sample_buf[self.buf_pos] = *frame;
                self.buf_pos += 1;
                if self.buf_pos >= self.buf_samples {
                    self.buf_pos = 0;
                }

                let corrected = *frame * g;
                *out = corrected;
                *aux_out = self.pan.process(corrected);
            }
        }
    }

    /// Re-seed the magnitude window from the lookahead ring.
    ///
    /// Leaf `i` mirrors `sample_buf[i]`, so ordering is irrelevant for the
    /// maximum; one O(capacity) rebuild replaces `buf_samples` tree walks.
    fn refill(&mut self) {
        self.window
            .rebuild(self.sample_buf[..self.buf_samples].iter().map(Frame::peak));
        self.needs_refill = false;
    }

    /// Swap in a new window geometry, carrying over the most recent frames.
    ///
    /// Allocates (caller is the parameter path, not the sample loop). On
    /// allocation failure the old geometry stays in service.
    fn resize_window(&mut self, buf_samples: usize) {
        let (window, mut sample_buf) = match alloc_buffers(buf_samples) {
            Ok(bufs) => bufs,
            Err(e) => {
                log::error!("agc window resize failed, keeping {} samples: {}",
                    self.buf_samples, e);
                return;
            }
        };

        if self.running {
            // Keep the newest min(old, new) frames in chronological order so
            // the refill does not see an artificially empty window.
            let keep = self.buf_samples.min(buf_samples);
            let skip = self.buf_samples - keep;
            for (i, slot) in sample_buf[..keep].iter_mut().enumerate() {
                let old_pos = (self.buf_pos + skip + i) % self.buf_samples;
                *slot = self.sample_buf[old_pos];
            }
            self.buf_pos = keep % buf_samples;
            self.needs_refill = true;
        } else {
            self.buf_pos = 0;
            self.needs_refill = false;
            self.gain.reset_target();
        }

        self.window = window;
        self.sample_buf = sample_buf;
        self.buf_samples = buf_samples;
    }

    #[cfg(test)]
    pub(crate) fn window_max(&self) -> Sample {
        self.window.max()
    }

    #[cfg(test)]
    pub(crate) fn lookahead_ptr(&self) -> *const Frame {
        self.sample_buf.as_ptr()
    }
}

/// Lookahead / window length for a configuration: one attack time worth of
/// samples, at least 1.
fn window_length(cfg: &AgcConfig) -> usize {
    ((cfg.sample_rate * cfg.attack_ms as f64 / 1000.0) as usize).max(1)
}

/// Max gain with the <= 0 dB floor applied (0 dB would freeze both steps).
fn effective_max_gain(cfg: &AgcConfig) -> i32 {
    cfg.max_gain.max(1)
}

/// Per-sample attack multiplier: a correction of `max(max_gain, 20)` dB
/// completes in exactly one window.
fn attack_step(max_gain_db: i32, buf_samples: usize) -> Sample {
    db_to_mag(-(max_gain_db.max(20) as f32) / buf_samples as f32)
}

/// Per-sample decay multiplier: a full `max_gain` recovery takes one decay
/// time regardless of sample rate.
fn decay_step(max_gain_db: i32, sample_rate: f64, decay_ms: u32) -> Sample {
    let decay_samples = (sample_rate * decay_ms as f64 / 1000.0).max(1.0) as f32;
    db_to_mag(max_gain_db as f32 / decay_samples)
}

fn duration_samples(sample_rate: f64, ms: u32) -> usize {
    (sample_rate * ms as f64 / 1000.0) as usize
}

fn tuning_for(cfg: &AgcConfig, buf_samples: usize) -> GainTuning {
    let max_gain = effective_max_gain(cfg);
    GainTuning {
        target_mag: db_to_mag(cfg.target_level as f32),
        max_gain_mag: db_to_mag(max_gain as f32),
        floor_mag: db_to_mag((cfg.target_level - max_gain) as f32),
        attack_step: attack_step(max_gain, buf_samples),
        decay_step: decay_step(max_gain, cfg.sample_rate, cfg.decay_ms),
        hang_samples: duration_samples(cfg.sample_rate, cfg.hang_ms),
        window_samples: buf_samples,
    }
}

/// Allocate the magnitude window and the matching lookahead ring.
fn alloc_buffers(buf_samples: usize) -> AgcResult<(PeakWindow, Vec<Frame>)> {
    let window = PeakWindow::new(buf_samples)?;
    let capacity = window.capacity();
    let mut sample_buf = Vec::new();
    sample_buf
        .try_reserve_exact(capacity)
        .map_err(|source| AgcError::Alloc { requested: capacity, source })?;
    sample_buf.resize(capacity, Frame::silence());
    Ok((window, sample_buf))
}
