//! Backend selection and device assembly
//!
//! A board file names a bus backend. This module opens it, registers the
//! GPIO chips the board's nodes refer to, and hands back a phy with its
//! interrupt source, ready for the commands to use.

use std::sync::Arc;

use nfclink_core::board::{Board, BusConfig};
use nfclink_core::bus::I2cBus;
use nfclink_core::gpio::ChipRegistry;
use nfclink_core::irq::IrqSource;
use nfclink_core::phy::I2cPhy;
use thiserror::Error;

/// Phy type every backend produces
pub type Phy = I2cPhy<Box<dyn I2cBus>>;

/// Consumer label of the interrupt line
#[cfg(all(feature = "linux-i2c", feature = "linux-gpio"))]
const IRQ_CONSUMER: &str = "s3fwrn5_irq";

/// Information about a backend
pub struct BackendInfo {
    /// Bus `type` in board files
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Errors assembling a device
#[derive(Debug, Error)]
pub enum BackendError {
    /// The board asks for a backend this build does not include
    #[error("bus type '{0}' is not available in this build (available: {1})")]
    Unavailable(&'static str, String),

    /// The board has no interrupt line and the backend does not provide one
    #[error("board has no [irq] section")]
    NoIrq,

    /// Backend options could not be parsed
    #[error("invalid {backend} options: {message}")]
    InvalidOptions {
        /// Backend name
        backend: &'static str,
        /// Parser message
        message: String,
    },
}

/// Get information about all backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "In-memory emulated S3FWRN5 (options = \"nacks=N,label=...,en=N,wake=N\")",
    });

    #[cfg(all(feature = "linux-i2c", feature = "linux-gpio"))]
    backends.push(BackendInfo {
        name: "linux",
        description: "Linux i2c-dev bus with GPIO character device lines (dev, addr)",
    });

    backends
}

/// Generate a short list of backend names for help and errors
pub fn backend_names_short() -> String {
    let backends = available_backends();
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Parse an option string into key-value pairs
///
/// Format: "option1=value1,option2=value2"
pub fn parse_option_string(s: &str) -> Vec<(&str, &str)> {
    s.split(',')
        .map(str::trim)
        .filter_map(|opt| opt.split_once('='))
        .collect()
}

/// An assembled controller
pub struct Device {
    /// The link layer
    pub phy: Arc<Phy>,
    /// Interrupt line, if the board has one
    pub irq: Option<Box<dyn IrqSource>>,
}

/// Register the GPIO chips a board's lines can live on
pub fn open_chips(board: &Board) -> Result<ChipRegistry, Box<dyn std::error::Error>> {
    let mut chips = ChipRegistry::new();
    match &board.bus {
        #[cfg(feature = "dummy")]
        BusConfig::Dummy { options } => {
            let nfc = open_dummy(options)?;
            chips.register(nfc.gpio_chip());
        }

        #[cfg(all(feature = "linux-i2c", feature = "linux-gpio"))]
        BusConfig::Linux { .. } => {
            nfclink_linux_gpio::register_chips(&mut chips)?;
        }

        #[allow(unreachable_patterns)]
        other => return Err(unavailable(other).into()),
    }
    log::debug!("{} GPIO chips registered", chips.len());
    Ok(chips)
}

/// Open the bus, lines and interrupt a board describes
pub fn open_device(board: &Board) -> Result<Device, Box<dyn std::error::Error>> {
    let node = board.consumer_node();

    match &board.bus {
        #[cfg(feature = "dummy")]
        BusConfig::Dummy { options } => {
            let nfc = open_dummy(options)?;
            let mut chips = ChipRegistry::new();
            chips.register(nfc.gpio_chip());

            log::info!("Opening emulated controller...");
            let bus: Box<dyn I2cBus> = Box::new(nfc.bus());
            let phy = I2cPhy::from_fwnode(bus, &node, &chips, board.phy.clone())?;
            Ok(Device {
                phy: Arc::new(phy),
                irq: Some(Box::new(nfc.irq())),
            })
        }

        #[cfg(all(feature = "linux-i2c", feature = "linux-gpio"))]
        BusConfig::Linux { dev, addr } => {
            use nfclink_linux_gpio::{find_chip, register_chips, CdevIrq};

            let mut chips = ChipRegistry::new();
            register_chips(&mut chips)?;

            log::info!("Opening {} at {:#04x}...", dev, addr);
            let addr = format!("{:#x}", addr);
            let bus = nfclink_linux_i2c::open_linux_i2c(&[
                ("dev", dev.as_str()),
                ("addr", addr.as_str()),
            ])
            .map_err(|e| {
                format!(
                    "Failed to open I2C adapter: {}\n\
                     Make sure the device exists, you have read/write permissions\n\
                     and the kernel s3fwrn5 driver is not bound to the device.",
                    e
                )
            })?;
            let phy = I2cPhy::from_fwnode(bus, &node, &chips, board.phy.clone())?;

            let irq: Option<Box<dyn IrqSource>> = match &board.irq {
                Some(cfg) => {
                    let chip = find_chip(&cfg.chip)?;
                    log::debug!(
                        "IRQ on {} line {} ({} edge)",
                        chip.path().display(),
                        cfg.line,
                        cfg.edge
                    );
                    Some(Box::new(CdevIrq::open(&chip, cfg.line, cfg.edge, IRQ_CONSUMER)?))
                }
                None => {
                    log::warn!("Board has no [irq] section, frames cannot be received");
                    None
                }
            };

            Ok(Device {
                phy: Arc::new(phy),
                irq,
            })
        }

        #[allow(unreachable_patterns)]
        other => Err(unavailable(other).into()),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(options: &str) -> Result<nfclink_dummy::DummyNfc, BackendError> {
    let config = nfclink_dummy::parse_options(&parse_option_string(options))
        .map_err(|message| BackendError::InvalidOptions {
            backend: "dummy",
            message,
        })?;
    Ok(nfclink_dummy::DummyNfc::new(config))
}

#[allow(dead_code)]
fn unavailable(bus: &BusConfig) -> BackendError {
    let name = match bus {
        BusConfig::Linux { .. } => "linux",
        BusConfig::Dummy { .. } => "dummy",
    };
    BackendError::Unavailable(name, backend_names_short())
}

impl Device {
    /// Take the interrupt source, failing if the board has none
    pub fn take_irq(&mut self) -> Result<Box<dyn IrqSource>, BackendError> {
        self.irq.take().ok_or(BackendError::NoIrq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option_string() {
        assert_eq!(
            parse_option_string("nacks=1, label=gpio-x"),
            vec![("nacks", "1"), ("label", "gpio-x")]
        );
        assert!(parse_option_string("").is_empty());
        assert!(parse_option_string("junk").is_empty());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_device() {
        let board = Board::from_toml_str(
            r#"
consumer = "s3fwrn5"
[phy]
suppress_write_echo = false
[bus]
type = "dummy"
[[nodes]]
name = "dummy-gpio"
[[nodes]]
name = "s3fwrn5"
[[nodes.properties]]
name = "en-gpios"
references = [{ node = "dummy-gpio", args = [0, 0] }]
[[nodes.properties]]
name = "wake-gpios"
references = [{ node = "dummy-gpio", args = [1, 0] }]
"#,
        )
        .unwrap();

        let mut device = open_device(&board).unwrap();
        assert!(device.take_irq().is_ok());
        assert!(matches!(device.take_irq(), Err(BackendError::NoIrq)));
        assert_eq!(open_chips(&board).unwrap().len(), 1);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_options_rejected() {
        assert!(matches!(
            open_dummy("en=1,wake=1"),
            Err(BackendError::InvalidOptions { .. })
        ));
    }
}
