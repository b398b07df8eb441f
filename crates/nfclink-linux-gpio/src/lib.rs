//! nfclink-linux-gpio - Linux GPIO character device backend
//!
//! This crate provides the controller's `en` and `wake` output lines and
//! its interrupt line through the Linux GPIO character device interface
//! (gpiocdev).
//!
//! Chips are registered under their kernel label. A board's software nodes
//! name those labels, so the link layer's resolver finds them:
//!
//! ```no_run
//! use nfclink_core::gpio::ChipRegistry;
//! use nfclink_linux_gpio::{find_chip, register_chips, CdevIrq};
//! use nfclink_core::board::Edge;
//!
//! let mut chips = ChipRegistry::new();
//! register_chips(&mut chips)?;
//!
//! let irq_chip = find_chip("pinctrl-bcm2711")?;
//! let irq = CdevIrq::open(&irq_chip, 21, Edge::Rising, "s3fwrn5_irq")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel 4.8+ with GPIO character device support (kernel 5.5+ for v2 API)
//! - Access to `/dev/gpiochipN` devices (may require root or udev rules)

pub mod device;
pub mod error;

// Re-exports
pub use device::{enumerate_chips, find_chip, register_chips, CdevChip, CdevIrq, CdevLine};
pub use error::{LinuxGpioError, Result};
