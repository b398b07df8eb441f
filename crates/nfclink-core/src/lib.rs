//! nfclink-core - I2C link layer for Samsung S3FWRN5 NFC controllers
//!
//! This crate moves frames between an NCI core and the controller over I2C.
//! It owns the controller's power and mode lines, reads frames when the
//! controller raises its interrupt, and hands them to the upper layer.
//!
//! Hardware access goes through small traits so the same phy runs on Linux
//! character devices, on the emulated controller, or on test doubles:
//!
//! - [`bus::I2cBus`] - byte transfers to the controller
//! - [`gpio::GpioChip`] / [`gpio::OutputLine`] - line providers and outputs
//! - [`irq::IrqSource`] - interrupt edges
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nfclink_core::{irq::IrqThread, phy::{I2cPhy, PhyOps}, Mode};
//!
//! let phy = Arc::new(I2cPhy::from_fwnode(bus, &board.consumer_node(), &chips, board.phy)?);
//! phy.attach(upper)?;
//! let irq = IrqThread::spawn("s3fwrn5-irq", source, phy.clone())?;
//!
//! phy.set_mode(Mode::Nci)?;
//! phy.write(&[0x20, 0x00, 0x01, 0x00])?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod board;
pub mod bus;
pub mod error;
pub mod frame;
pub mod gpio;
pub mod irq;
pub mod mode;
pub mod phy;

pub use error::{BusError, Error, Result};
pub use frame::Frame;
pub use mode::Mode;
