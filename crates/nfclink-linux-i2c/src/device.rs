//! Linux I2C device implementation
//!
//! This module provides the `LinuxI2c` struct that implements the `I2cBus`
//! trait using Linux's i2c-dev interface. Every `master_send` is one write
//! transaction and every `master_recv` one read transaction on the bound
//! slave address.

use crate::error::{LinuxI2cError, Result};

use nfclink_core::bus::I2cBus;
use nfclink_core::BusError;

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;

/// Default slave address of the S3FWRN5
pub const DEFAULT_ADDR: u16 = 0x27;

/// Linux i2c-dev ioctl constants
mod ioctl {
    use nix::ioctl_write_int_bad;

    // Request numbers are plain constants, not _IOC encoded
    const I2C_SLAVE: u16 = 0x0703;
    const I2C_SLAVE_FORCE: u16 = 0x0706;

    ioctl_write_int_bad!(i2c_slave, I2C_SLAVE);
    ioctl_write_int_bad!(i2c_slave_force, I2C_SLAVE_FORCE);
}

/// Configuration for opening a Linux I2C device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxI2cConfig {
    /// Device path (e.g., "/dev/i2c-1")
    pub device: String,
    /// 7-bit slave address
    pub addr: u16,
    /// Bind the address even if a kernel driver already claimed it
    pub force: bool,
}

impl Default for LinuxI2cConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            addr: DEFAULT_ADDR,
            force: false,
        }
    }
}

impl LinuxI2cConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the slave address
    pub fn with_addr(mut self, addr: u16) -> Self {
        self.addr = addr;
        self
    }

    /// Bind the address even when it is busy
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// I2C client using the i2c-dev interface
pub struct LinuxI2c {
    /// File handle for the adapter
    file: File,
    /// Bound slave address
    addr: u16,
}

impl LinuxI2c {
    /// Open an adapter and bind the configured slave address
    pub fn open(config: &LinuxI2cConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxI2cError::NoDevice);
        }
        if config.addr > 0x7f {
            return Err(LinuxI2cError::InvalidParameter(format!(
                "address {:#x} is not a 7-bit address",
                config.addr
            )));
        }

        log::debug!("linux_i2c: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxI2cError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();
        let addr = config.addr;
        let ret = unsafe {
            if config.force {
                ioctl::i2c_slave_force(fd, addr as libc::c_int)
            } else {
                ioctl::i2c_slave(fd, addr as libc::c_int)
            }
        };
        ret.map_err(|e| LinuxI2cError::SetAddressFailed {
            addr,
            source: io::Error::from_raw_os_error(e as i32),
        })?;

        log::info!("linux_i2c: Opened {} (addr={:#04x})", config.device, addr);

        Ok(Self { file, addr })
    }
}

impl I2cBus for LinuxI2c {
    fn master_send(&mut self, data: &[u8]) -> std::result::Result<usize, BusError> {
        let n = self.file.write(data).map_err(bus_error)?;
        log::trace!("linux_i2c: {:#04x} tx {:02x?}", self.addr, &data[..n]);
        Ok(n)
    }

    fn master_recv(&mut self, buf: &mut [u8]) -> std::result::Result<usize, BusError> {
        let n = self.file.read(buf).map_err(bus_error)?;
        log::trace!("linux_i2c: {:#04x} rx {:02x?}", self.addr, &buf[..n]);
        Ok(n)
    }
}

/// Map an adapter error onto the bus error kinds the phy acts on
fn bus_error(e: io::Error) -> BusError {
    match e.raw_os_error() {
        Some(libc::EREMOTEIO) => BusError::RemoteIo,
        Some(libc::ETIMEDOUT) => BusError::Timeout,
        _ => BusError::Io(e),
    }
}

/// Parse bus options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxI2cConfig, String> {
    let mut config = LinuxI2cConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "bus" => {
                let bus: u32 = value
                    .parse()
                    .map_err(|_| format!("Invalid bus value: {}", value))?;
                config.device = format!("/dev/i2c-{}", bus);
            }
            "addr" => {
                let addr =
                    parse_addr(value).ok_or_else(|| format!("Invalid addr value: {}", value))?;
                if addr > 0x7f {
                    return Err(format!("Invalid I2C address: {:#x} (must be 0-0x7f)", addr));
                }
                config.addr = addr;
            }
            "force" => {
                config.force = matches!(*value, "1" | "yes" | "true");
            }
            _ => {
                log::warn!("linux_i2c: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err("No device specified. Use dev=/dev/i2c-N or bus=N".to_string());
    }

    Ok(config)
}

fn parse_addr(s: &str) -> Option<u16> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("dev", "/dev/i2c-3"), ("addr", "0x28")]).unwrap();
        assert_eq!(config.device, "/dev/i2c-3");
        assert_eq!(config.addr, 0x28);
        assert!(!config.force);

        let config = parse_options(&[("bus", "1"), ("force", "yes")]).unwrap();
        assert_eq!(config.device, "/dev/i2c-1");
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert!(config.force);
    }

    #[test]
    fn test_parse_options_errors() {
        assert!(parse_options(&[]).is_err());
        assert!(parse_options(&[("bus", "one")]).is_err());
        assert!(parse_options(&[("bus", "1"), ("addr", "0x80")]).is_err());
        assert!(parse_options(&[("bus", "1"), ("addr", "zz")]).is_err());
    }

    #[test]
    fn test_bus_error_mapping() {
        assert!(matches!(
            bus_error(io::Error::from_raw_os_error(libc::EREMOTEIO)),
            BusError::RemoteIo
        ));
        assert!(matches!(
            bus_error(io::Error::from_raw_os_error(libc::ETIMEDOUT)),
            BusError::Timeout
        ));
        assert!(matches!(
            bus_error(io::Error::from_raw_os_error(libc::ENXIO)),
            BusError::Io(_)
        ));
    }

    #[test]
    fn test_open_requires_device() {
        assert!(matches!(
            LinuxI2c::open(&LinuxI2cConfig::default()),
            Err(LinuxI2cError::NoDevice)
        ));
        assert!(matches!(
            LinuxI2c::open(&LinuxI2cConfig::new("/dev/null").with_addr(0x100)),
            Err(LinuxI2cError::InvalidParameter(_))
        ));
    }
}
