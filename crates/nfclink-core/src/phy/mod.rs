//! Physical link layer
//!
//! The phy sits between the NCI core (the "upper layer") and the bus:
//!
//! ```text
//!   upper layer  --PhyOps-->  I2cPhy  --I2cBus-->  controller
//!        ^                      |
//!        +----FrameSink---------+   (from the interrupt thread)
//! ```
//!
//! All mode changes, bus transactions and interrupt decisions of one device
//! are serialized by a single mutex inside [`I2cPhy`].

pub mod i2c;
pub mod power;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::mode::Mode;

pub use i2c::{irq_thread_fn, I2cPhy};
pub use power::PowerLines;

/// Settle time after driving the power lines
pub const DEFAULT_EN_WAIT_MS: u32 = 20;
/// Delay before retrying a write the controller did not acknowledge
pub const DEFAULT_STANDBY_RETRY_MS: u32 = 110;
/// Default bound on a received payload
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 4096;

/// Operations the upper layer calls on a phy
pub trait PhyOps: Send + Sync {
    /// Drive the wake line
    fn set_wake(&self, wake: bool) -> Result<()>;

    /// Move the controller to `mode`
    fn set_mode(&self, mode: Mode) -> Result<()>;

    /// Current mode (informational, does not take the device lock)
    fn get_mode(&self) -> Mode;

    /// Transmit one frame
    fn write(&self, frame: &[u8]) -> Result<()>;
}

/// Receiver for frames read by the phy
///
/// Called from the interrupt thread while the device lock is held. An
/// implementation must not call back into the phy's locking operations
/// (`set_mode`, `set_wake`, `write`); `get_mode` is safe.
pub trait FrameSink: Send + Sync {
    /// Take ownership of a complete frame received in `mode`
    fn recv_frame(&self, frame: Frame, mode: Mode) -> Result<()>;
}

/// Phy tuning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhyConfig {
    /// Settle time after driving the power lines, in milliseconds
    pub en_wait_ms: u32,
    /// Delay before the single write retry, in milliseconds (110..=120)
    pub standby_retry_ms: u32,
    /// Largest payload accepted from a header's length field
    pub max_payload_len: usize,
    /// Keep interrupts suppressed after a write
    ///
    /// When set, the interrupt raised by the bus controller after a write is
    /// treated as an echo and ignored until the next mode change or write
    /// clears it. When clear, a write re-arms reception immediately.
    ///
    /// Defaults to `true`. Construction, `set_mode` and `write` all leave
    /// the flag set under that default, so no frame is ever received. Set
    /// it to `false` for any controller that answers commands.
    pub suppress_write_echo: bool,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            en_wait_ms: DEFAULT_EN_WAIT_MS,
            standby_retry_ms: DEFAULT_STANDBY_RETRY_MS,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            suppress_write_echo: true,
        }
    }
}

impl PhyConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the power line settle time
    pub fn with_en_wait_ms(mut self, ms: u32) -> Self {
        self.en_wait_ms = ms;
        self
    }

    /// Set the standby retry delay
    pub fn with_standby_retry_ms(mut self, ms: u32) -> Self {
        self.standby_retry_ms = ms;
        self
    }

    /// Set the payload bound
    pub fn with_max_payload_len(mut self, len: usize) -> Self {
        self.max_payload_len = len;
        self
    }

    /// Choose whether writes leave interrupts suppressed
    pub fn with_suppress_write_echo(mut self, suppress: bool) -> Self {
        self.suppress_write_echo = suppress;
        self
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if !(110..=120).contains(&self.standby_retry_ms) {
            return Err(Error::Config(format!(
                "standby_retry_ms must be within 110..=120, got {}",
                self.standby_retry_ms
            )));
        }
        if self.max_payload_len == 0 {
            return Err(Error::Config("max_payload_len must be non-zero".into()));
        }
        Ok(())
    }
}
