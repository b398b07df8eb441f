//! Error types for nfclink-core
//!
//! Resolution errors (`NotFound`, `ResolutionDeferred`, `InvalidArgument`)
//! are returned to whatever init logic asked for a line. Transport errors
//! are returned to the immediate caller of a write, or logged by the
//! interrupt dispatcher for reads.

use thiserror::Error;

use crate::mode::Mode;

/// Errors reported by an I2C bus backend
#[derive(Debug, Error)]
pub enum BusError {
    /// The target did not acknowledge (EREMOTEIO), usually because the
    /// controller was in standby
    #[error("remote I/O error (target did not respond)")]
    RemoteIo,

    /// The bus transaction timed out
    #[error("bus transaction timed out")]
    Timeout,

    /// Any other I/O failure from the bus controller
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    // Resolution errors
    /// The line provider named by a reference is not registered yet.
    /// The caller should retry later.
    #[error("GPIO provider '{provider}' not registered yet, deferring")]
    ResolutionDeferred {
        /// Label that no provider matched
        provider: String,
    },
    /// No such node identity, property, line or function
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed reference, unnamed target or bad parameter
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Transport errors
    /// The bus reported an error
    #[error("transport error: {0}")]
    Transport(#[source] BusError),
    /// The bus moved fewer bytes than requested on a write
    #[error("transport mismatch: sent {actual} of {expected} bytes")]
    TransportMismatch {
        /// Bytes requested
        expected: usize,
        /// Bytes actually sent
        actual: usize,
    },
    /// Header or payload read returned the wrong number of bytes
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame {
        /// Bytes the layout called for
        expected: usize,
        /// Bytes the bus returned
        actual: usize,
    },
    /// Frame buffer could not be allocated
    #[error("cannot allocate a {requested} byte frame")]
    OutOfMemory {
        /// Payload size that was refused
        requested: usize,
    },

    // Power control errors
    /// Power sequencing could not reach the requested mode
    #[error("cannot switch from {from} to {to} mode")]
    ModeTransitionFailed {
        /// Mode before the attempt (still current)
        from: Mode,
        /// Requested mode
        to: Mode,
    },
    /// A GPIO line could not be requested or driven
    #[error("GPIO error: {0}")]
    Gpio(String),

    // Platform errors
    /// The interrupt source failed
    #[error("interrupt source error: {0}")]
    Irq(String),
    /// Board description is unusable
    #[error("board configuration error: {0}")]
    Config(String),
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Error::Transport(e)
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
