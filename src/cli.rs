//! CLI argument parsing

use clap::{Parser, Subcommand};
use nfclink_core::Mode;
use std::path::PathBuf;

/// Parse hex bytes written as `20 00 01 00`, `20:00:01:00` or `20000100`
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(&digits);

    if digits.is_empty() {
        return Err("No bytes given".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{}'", s));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("Invalid hex byte at offset {} in '{}'", i / 2, s))
        })
        .collect()
}

#[derive(Parser)]
#[command(name = "nfclink")]
#[command(author, version, about = "S3FWRN5 NFC controller link tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Board selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct BoardArgs {
    /// Board description file (TOML format)
    #[arg(short, long)]
    pub board: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how the controller's lines resolve
    Lines {
        #[command(flatten)]
        board: BoardArgs,

        /// Resolve only this function (default: en, wake and their legacy names)
        #[arg(short, long)]
        function: Option<String>,
    },

    /// Bring the controller to a mode
    ///
    /// Lines are released when the command exits.
    Mode {
        #[command(flatten)]
        board: BoardArgs,

        /// Target mode (cold, fw, nci)
        mode: Mode,
    },

    /// Send one frame and print the frames received in reply
    Send {
        #[command(flatten)]
        board: BoardArgs,

        /// Frame bytes in hex, header included (e.g. "20 00 01 00")
        // Fully qualified so clap takes it as one value
        #[arg(value_parser = parse_hex_bytes)]
        frame: ::std::vec::Vec<u8>,

        /// Mode to send in
        #[arg(short, long, default_value = "nci")]
        mode: Mode,

        /// How long to wait for replies, in milliseconds
        #[arg(short, long, default_value = "500")]
        wait_ms: u64,
    },

    /// Print frames raised by the controller
    Listen {
        #[command(flatten)]
        board: BoardArgs,

        /// Mode to listen in
        #[arg(short, long, default_value = "nci")]
        mode: Mode,

        /// How long to listen, in milliseconds
        #[arg(short, long, default_value = "5000")]
        wait_ms: u64,
    },

    /// Check a board file and print what it describes
    Board {
        #[command(flatten)]
        board: BoardArgs,
    },

    /// List bus backends built into this binary
    ListBackends,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("20 00 01 00").unwrap(), vec![0x20, 0, 1, 0]);
        assert_eq!(parse_hex_bytes("20:00:01:00").unwrap(), vec![0x20, 0, 1, 0]);
        assert_eq!(parse_hex_bytes("0x200100").unwrap(), vec![0x20, 1, 0]);
        assert_eq!(parse_hex_bytes("aB").unwrap(), vec![0xab]);
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("201").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "nfclink", "-v", "send", "-b", "board.toml", "20 00 01 00", "--mode", "fw",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Send {
                frame,
                mode,
                wait_ms,
                ..
            } => {
                assert_eq!(frame, vec![0x20, 0, 1, 0]);
                assert_eq!(mode, Mode::Firmware);
                assert_eq!(wait_ms, 500);
            }
            _ => panic!("expected send"),
        }
    }
}
