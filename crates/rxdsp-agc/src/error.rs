//! Error types for the AGC engine

use thiserror::Error;

/// Fatal construction-time errors
///
/// The streaming path itself never produces errors: configuration is
/// validated or silently rejected at the setter boundary and numeric edge
/// cases are handled inline. The only fatal case is failing to allocate the
/// magnitude window / lookahead buffers when the engine is built.
#[derive(Error, Debug)]
pub enum AgcError {
    /// Window or delay buffer allocation failed at construction
    #[error("failed to allocate AGC buffers ({requested} samples): {source}")]
    Alloc {
        requested: usize,
        source: std::collections::TryReserveError,
    },
}

/// Rejection reasons surfaced by the `try_*` setter variants
///
/// The UI-facing `set_*` setters swallow these (continuous controls must
/// never throw); programmatic callers use `try_*` to distinguish "accepted"
/// from "silently rejected".
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ParamError {
    /// The value lies outside the accepted range for the parameter
    #[error("{name} = {value} outside accepted range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The control→audio snapshot queue is full; retry after the audio
    /// thread has drained a block
    #[error("parameter queue full, update dropped")]
    Busy,
}

/// Result type for AGC construction
pub type AgcResult<T> = Result<T, AgcError>;
