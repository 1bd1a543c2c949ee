//! Windowed lookahead AGC for the receiver audio chain
//!
//! Normalizes a continuous dual-channel f32 stream so its peak tracks a
//! configured target level, without pumping, clipping, or noise-floor
//! amplification. Built from four stages:
//!
//! - [`peak`]: sliding-window maximum over recent magnitudes (binary
//!   max-tree, amortized O(1) per sample)
//! - [`gain`]: attack/decay/hang gain controller driven by the window peak
//! - [`pan`]: static per-channel gain/delay stage for the auxiliary output
//! - [`agc`]: the engine wiring them behind a lookahead delay line
//!
//! [`node`] splits the engine into a control-thread handle and an
//! audio-thread processor connected by a lock-free snapshot queue:
//!
//! ```
//! use rxdsp_agc::{agc_node, AgcConfig, Frame};
//!
//! let mut cfg = AgcConfig::default();
//! cfg.set_target_level(-12);
//! cfg.set_attack(100);
//! let (mut handle, mut processor) = agc_node(16, cfg).unwrap();
//!
//! // control thread
//! handle.set_decay(1000);
//!
//! // audio thread, once per block
//! let input = vec![Frame::mono(0.5); 256];
//! let mut primary = vec![Frame::silence(); 256];
//! let mut aux = vec![Frame::silence(); 256];
//! processor.process(&input, &mut primary, &mut aux);
//! ```

pub mod agc;
pub mod error;
pub mod gain;
pub mod node;
pub mod pan;
pub mod params;
pub mod peak;
pub mod types;

pub use agc::Agc;
pub use error::{AgcError, AgcResult, ParamError};
pub use node::{agc_node, AgcHandle, AgcProcessor};
pub use params::AgcConfig;
pub use types::Frame;
