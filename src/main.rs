//! nfclink - S3FWRN5 NFC controller link tool
//!
//! Drives a Samsung S3FWRN5 controller over its I2C link layer from user
//! space: power sequencing through the `en` and `wake` lines, bootloader and
//! NCI framing, and interrupt-driven frame reception.
//!
//! # Architecture
//!
//! Every command starts from a board file that describes the wiring. The
//! selected backend opens the bus and GPIO chips, and the link layer from
//! `nfclink-core` is assembled on top:
//! - **linux** - i2c-dev adapter plus GPIO character devices
//! - **dummy** - an in-memory emulated controller for testing

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use nfclink_core::board::Board;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Lines { board, function } => {
            let board = Board::from_toml_file(&board.board)?;
            commands::lines::run(&board, function.as_deref())
        }
        Commands::Mode { board, mode } => {
            let board = Board::from_toml_file(&board.board)?;
            let device = backends::open_device(&board)?;
            commands::mode::run(&device, mode)
        }
        Commands::Send {
            board,
            frame,
            mode,
            wait_ms,
        } => {
            let board = Board::from_toml_file(&board.board)?;
            let device = backends::open_device(&board)?;
            commands::send::run(device, mode, &frame, wait_ms)
        }
        Commands::Listen {
            board,
            mode,
            wait_ms,
        } => {
            let board = Board::from_toml_file(&board.board)?;
            let device = backends::open_device(&board)?;
            commands::listen::run(device, mode, wait_ms)
        }
        Commands::Board { board } => {
            let path = board.board;
            let board = Board::from_toml_file(&path)?;
            commands::board::run(&path, &board);
            Ok(())
        }
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
    }
}
