//! Bus and timing abstractions
//!
//! The link layer only needs two blocking primitives from the I2C controller
//! driver: send N bytes and receive N bytes. Both report how many bytes were
//! actually moved so the caller can detect short transfers.

use std::time::Duration;

use crate::error::BusError;

/// Blocking I2C client bound to a single target address
pub trait I2cBus: Send {
    /// Send `data` in one write transaction
    ///
    /// Returns the number of bytes the controller transmitted.
    fn master_send(&mut self, data: &[u8]) -> Result<usize, BusError>;

    /// Receive up to `buf.len()` bytes in one read transaction
    ///
    /// Returns the number of bytes placed in `buf`.
    fn master_recv(&mut self, buf: &mut [u8]) -> Result<usize, BusError>;
}

impl<B: I2cBus + ?Sized> I2cBus for Box<B> {
    fn master_send(&mut self, data: &[u8]) -> Result<usize, BusError> {
        (**self).master_send(data)
    }

    fn master_recv(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        (**self).master_recv(buf)
    }
}

/// Source of blocking delays
///
/// Power sequencing and the standby retry sleep through this trait so tests
/// can record delays instead of waiting.
pub trait Delay: Send + Sync {
    /// Block the calling thread for `ms` milliseconds
    fn delay_ms(&self, ms: u32);
}

/// Delay backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}
