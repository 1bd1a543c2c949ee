//! Control/audio thread pair around the AGC engine
//!
//! The engine itself is single-threaded; this module splits it into two
//! halves connected by a lock-free SPSC queue of configuration snapshots:
//!
//! - [`AgcHandle`] lives on the control thread. Its setters validate against
//!   a shadow copy of the configuration and publish whole immutable
//!   snapshots; pushing is wait-free and never blocks the audio thread.
//! - [`AgcProcessor`] lives on the audio thread. At each block boundary it
//!   drains the queue, applies only the newest snapshot, runs the engine,
//!   and publishes the applied gain through a shared atomic.
//!
//! A mutex held across the whole processing call would make every setter a
//! potential audio dropout; snapshot publication costs one queue slot per
//! change and the swap happens at a deterministic point in the stream.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::agc::Agc;
use crate::error::{AgcResult, ParamError};
use crate::params::AgcConfig;
use crate::types::Frame;

/// Forward a validated-setter pair from the handle to the shadow config.
macro_rules! handle_setter {
    ($try_name:ident, $name:ident, $ty:ty) => {
        /// Validated setter; reports rejection and a full queue.
        pub fn $try_name(&mut self, value: $ty) -> Result<(), ParamError> {
            let mut next = self.shadow;
            next.$try_name(value)?;
            self.publish(next)
        }

        /// UI-facing setter; out-of-range and queue-full are silently dropped.
        pub fn $name(&mut self, value: $ty) {
            let _ = self.$try_name(value);
        }
    };
}

/// Control-thread half: validated setters + gain readout.
pub struct AgcHandle {
    shadow: AgcConfig,
    tx: rtrb::Producer<AgcConfig>,
    gain_db_bits: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
}

/// Audio-thread half: block processing.
pub struct AgcProcessor {
    agc: Agc,
    rx: rtrb::Consumer<AgcConfig>,
    gain_db_bits: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
}

/// Build a connected handle/processor pair.
///
/// `queue_slots` bounds how many snapshots can be in flight between two
/// audio blocks; a few dozen is plenty for UI-rate changes.
pub fn agc_node(queue_slots: usize, config: AgcConfig) -> AgcResult<(AgcHandle, AgcProcessor)> {
    let agc = Agc::new(config)?;
    let (tx, rx) = rtrb::RingBuffer::new(queue_slots);
    let gain_db_bits = Arc::new(AtomicU32::new(agc.current_gain_db().to_bits()));
    let running = Arc::new(AtomicBool::new(true));

    let handle = AgcHandle {
        shadow: config,
        tx,
        gain_db_bits: Arc::clone(&gain_db_bits),
        running: Arc::clone(&running),
    };
    let processor = AgcProcessor { agc, rx, gain_db_bits, running };
    Ok((handle, processor))
}

impl AgcHandle {
    handle_setter!(try_set_sample_rate, set_sample_rate, f64);
    handle_setter!(try_set_target_level, set_target_level, i32);
    handle_setter!(try_set_manual_gain, set_manual_gain, f32);
    handle_setter!(try_set_max_gain, set_max_gain, i32);
    handle_setter!(try_set_attack, set_attack, u32);
    handle_setter!(try_set_decay, set_decay, u32);
    handle_setter!(try_set_hang, set_hang, u32);
    handle_setter!(try_set_panning, set_panning, i32);

    /// Switch between windowed AGC and fixed manual gain.
    pub fn set_agc_on(&mut self, on: bool) {
        let mut next = self.shadow;
        next.set_agc_on(on);
        let _ = self.publish(next);
    }

    /// Mute or unmute the auxiliary output pair.
    pub fn set_mute(&mut self, mute: bool) {
        let mut next = self.shadow;
        next.set_mute(mute);
        let _ = self.publish(next);
    }

    /// The configuration as last accepted by this handle.
    pub fn config(&self) -> &AgcConfig {
        &self.shadow
    }

    /// Gain currently applied by the audio thread, in dB. Updated once per
    /// processed block.
    pub fn current_gain_db(&self) -> f32 {
        f32::from_bits(self.gain_db_bits.load(Ordering::Relaxed))
    }

    /// Tell the engine whether the pipeline is streaming; while stopped,
    /// geometry changes reset instead of re-seeding from live history.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    fn publish(&mut self, next: AgcConfig) -> Result<(), ParamError> {
        if next == self.shadow {
            // Setting a parameter to its current value is a no-op.
            return Ok(());
        }
        match self.tx.push(next) {
            Ok(()) => {
                self.shadow = next;
                Ok(())
            }
            Err(_) => {
                log::warn!("agc parameter queue full, update dropped");
                Err(ParamError::Busy)
            }
        }
    }
}

impl AgcProcessor {
    /// Process one block (see [`Agc::process`] for the stream contract).
    ///
    /// Applies the newest pending configuration snapshot first, so a
    /// handle-side change is in effect by the next block at the latest.
    pub fn process(&mut self, input: &[Frame], primary: &mut [Frame], aux: &mut [Frame]) {
        self.agc.set_running(self.running.load(Ordering::Relaxed));

        let mut newest = None;
        while let Ok(cfg) = self.rx.pop() {
            newest = Some(cfg);
        }
        if let Some(cfg) = newest {
            self.agc.apply(&cfg);
        }

        self.agc.process(input, primary, aux);
        self.gain_db_bits
            .store(self.agc.current_gain_db().to_bits(), Ordering::Relaxed);
    }

    /// The wrapped engine (read-only).
    pub fn engine(&self) -> &Agc {
        &self.agc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> (AgcHandle, AgcProcessor) {
        let mut cfg = AgcConfig::default();
        cfg.set_sample_rate(48_000.0);
        cfg.set_attack(100);
        cfg.set_target_level(-12);
        cfg.set_max_gain(40);
        agc_node(16, cfg).unwrap()
    }

    fn run_block(proc_: &mut AgcProcessor, frames: usize, level: f32) -> (Vec<Frame>, Vec<Frame>) {
        let input = vec![Frame::mono(level); frames];
        let mut primary = vec![Frame::silence(); frames];
        let mut aux = vec![Frame::silence(); frames];
        proc_.process(&input, &mut primary, &mut aux);
        (primary, aux)
    }

    #[test]
    fn test_snapshot_applies_by_next_block() {
        let (mut handle, mut proc_) = node();
        run_block(&mut proc_, 512, 0.5);
        assert!(!proc_.engine().config().mute);

        handle.set_mute(true);
        handle.set_panning(-30);
        let (_, aux) = run_block(&mut proc_, 512, 0.5);

        let applied = proc_.engine().config();
        assert!(applied.mute);
        assert_eq!(applied.panning, -30);
        assert!(aux.iter().all(|f| *f == Frame::silence()));
    }

    #[test]
    fn test_only_newest_snapshot_wins() {
        let (mut handle, mut proc_) = node();
        handle.set_decay(1000);
        handle.set_decay(2000);
        handle.set_decay(300);
        run_block(&mut proc_, 64, 0.0);
        assert_eq!(proc_.engine().config().decay_ms, 300);
    }

    #[test]
    fn test_rejected_setter_publishes_nothing() {
        let (mut handle, mut proc_) = node();
        let before = *handle.config();

        assert!(matches!(
            handle.try_set_attack(10),
            Err(ParamError::OutOfRange { name: "attack", .. })
        ));
        handle.set_attack(7000); // silent variant, also out of range

        run_block(&mut proc_, 64, 0.0);
        assert_eq!(*handle.config(), before);
        assert_eq!(*proc_.engine().config(), before);
    }

    #[test]
    fn test_redundant_set_pushes_nothing() {
        let (mut handle, _proc) = node();
        let attack = handle.config().attack_ms;
        // Fill would error with Busy; same-value sets must not occupy slots
        for _ in 0..1000 {
            assert!(handle.try_set_attack(attack).is_ok());
        }
    }

    #[test]
    fn test_full_queue_reports_busy() {
        let (mut handle, _proc) = node();
        let mut hit_busy = false;
        for decay in 20..200 {
            match handle.try_set_decay(decay) {
                Ok(()) => {}
                Err(ParamError::Busy) => {
                    hit_busy = true;
                    break;
                }
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert!(hit_busy, "queue of 16 slots never filled");
    }

    #[test]
    fn test_gain_readout_reaches_the_handle() {
        let (handle, mut proc_) = node();
        // Constant 0 dB input for ~0.5 s drives the gain to the −12 dB target
        for _ in 0..47 {
            run_block(&mut proc_, 512, 1.0);
        }
        assert!(
            (handle.current_gain_db() - (-12.0)).abs() < 0.1,
            "handle reads {} dB",
            handle.current_gain_db()
        );
    }
}
