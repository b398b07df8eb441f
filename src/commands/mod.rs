//! CLI command implementations
//!
//! Commands that talk to the controller take an assembled
//! [`Device`](crate::backends::Device). `lines` and `board` only need the
//! board file and never drive a line.

pub mod board;
pub mod lines;
pub mod listen;
pub mod mode;
pub mod send;

mod printer;

use crate::backends::available_backends;

/// List all bus backends built into this binary
pub fn list_backends() {
    println!("Available backends:");
    println!();
    for backend in available_backends() {
        println!("  {:<8} - {}", backend.name, backend.description);
    }
}
