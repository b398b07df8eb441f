//! Controller operating modes

use core::fmt;
use core::str::FromStr;

/// Operating phase of the NFC controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Unpowered, held in reset
    #[default]
    Cold,
    /// Bootloader / firmware update mode
    Firmware,
    /// Normal NCI operation
    Nci,
}

impl Mode {
    pub(crate) const fn as_u8(self) -> u8 {
        match self {
            Mode::Cold => 0,
            Mode::Firmware => 1,
            Mode::Nci => 2,
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Mode {
        match raw {
            1 => Mode::Firmware,
            2 => Mode::Nci,
            _ => Mode::Cold,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Cold => write!(f, "cold"),
            Mode::Firmware => write!(f, "firmware"),
            Mode::Nci => write!(f, "nci"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cold" | "off" => Ok(Mode::Cold),
            "fw" | "firmware" => Ok(Mode::Firmware),
            "nci" => Ok(Mode::Nci),
            _ => Err(format!("unknown mode '{}' (expected cold, fw or nci)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_roundtrip() {
        for mode in [Mode::Cold, Mode::Firmware, Mode::Nci] {
            assert_eq!(Mode::from_u8(mode.as_u8()), mode);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("FW".parse::<Mode>().unwrap(), Mode::Firmware);
        assert_eq!("nci".parse::<Mode>().unwrap(), Mode::Nci);
        assert!("warm".parse::<Mode>().is_err());
    }
}
