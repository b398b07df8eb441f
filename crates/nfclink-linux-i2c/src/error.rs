//! Error types for Linux I2C operations

use thiserror::Error;

/// Linux I2C specific errors
#[derive(Debug, Error)]
pub enum LinuxI2cError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to bind the slave address
    #[error("Failed to set slave address {addr:#04x}: {source}")]
    SetAddressFailed {
        addr: u16,
        #[source]
        source: std::io::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Device not specified
    #[error("No device specified. Use dev=/dev/i2c-N or bus=N")]
    NoDevice,
}

impl From<LinuxI2cError> for nfclink_core::Error {
    fn from(e: LinuxI2cError) -> Self {
        match e {
            LinuxI2cError::InvalidParameter(msg) => nfclink_core::Error::InvalidArgument(msg),
            LinuxI2cError::NoDevice => nfclink_core::Error::Config(e.to_string()),
            other => nfclink_core::Error::Transport(nfclink_core::BusError::Io(
                std::io::Error::other(other),
            )),
        }
    }
}

/// Result type for Linux I2C operations
pub type Result<T> = std::result::Result<T, LinuxI2cError>;
