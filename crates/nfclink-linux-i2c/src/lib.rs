//! nfclink-linux-i2c - Linux i2c-dev bus backend
//!
//! This crate lets the link layer reach a controller through the Linux
//! `/dev/i2c-N` character devices.
//!
//! # Example
//!
//! ```no_run
//! use nfclink_linux_i2c::{LinuxI2c, LinuxI2cConfig};
//! use nfclink_core::bus::I2cBus;
//!
//! let mut bus = LinuxI2c::open(&LinuxI2cConfig::new("/dev/i2c-1").with_addr(0x27))?;
//!
//! // CORE_RESET_CMD, keep configuration
//! bus.master_send(&[0x20, 0x00, 0x01, 0x00])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Options
//!
//! - `dev=/dev/i2c-1` or `bus=1` - Required: adapter
//! - `addr=0x27` - Optional: slave address (default: 0x27)
//! - `force=1` - Optional: bind even if a kernel driver owns the address
//!
//! # System Requirements
//!
//! - Linux kernel with i2c-dev support enabled (`CONFIG_I2C_CHARDEV`)
//! - Read/write access to `/dev/i2c-N`
//! - The kernel's own s3fwrn5 driver unbound from the device

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_options, LinuxI2c, LinuxI2cConfig, DEFAULT_ADDR};
pub use error::{LinuxI2cError, Result};

/// Open a Linux I2C adapter and return a boxed bus
///
/// # Arguments
///
/// * `options` - Slice of (key, value) pairs from option string parsing
pub fn open_linux_i2c(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn nfclink_core::bus::I2cBus>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let bus = LinuxI2c::open(&config)?;
    Ok(Box::new(bus))
}
