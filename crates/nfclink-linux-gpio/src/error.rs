//! Error types for Linux GPIO operations

use thiserror::Error;

/// Linux GPIO specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to list GPIO chips
    #[error("Failed to enumerate GPIO chips: {0}")]
    EnumerateFailed(#[source] gpiocdev::Error),

    /// Failed to open GPIO chip
    #[error("Failed to open GPIO chip '{path}': {source}")]
    ChipOpenFailed {
        path: String,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to request GPIO lines
    #[error("Failed to request GPIO line {offset}: {source}")]
    LineRequestFailed {
        offset: u32,
        #[source]
        source: gpiocdev::Error,
    },

    /// Failed to set GPIO line value
    #[error("Failed to set GPIO line value: {0}")]
    SetValueFailed(#[source] gpiocdev::Error),

    /// Failed waiting for or reading an edge event
    #[error("Failed to read GPIO edge event: {0}")]
    EdgeEventFailed(#[source] gpiocdev::Error),

    /// No chip carries the requested label
    #[error("No GPIO chip labelled '{0}'")]
    ChipNotFound(String),
}

impl From<LinuxGpioError> for nfclink_core::Error {
    fn from(e: LinuxGpioError) -> Self {
        match e {
            LinuxGpioError::ChipNotFound(label) => {
                nfclink_core::Error::NotFound(format!("GPIO chip '{}'", label))
            }
            LinuxGpioError::EdgeEventFailed(_) => nfclink_core::Error::Irq(e.to_string()),
            other => nfclink_core::Error::Gpio(other.to_string()),
        }
    }
}

/// Result type for Linux GPIO operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
