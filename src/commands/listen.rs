//! Print frames the controller raises on its own

use std::time::Duration;

use nfclink_core::Mode;

use super::printer::with_printer;
use crate::backends::Device;

/// Bring the controller to `mode` and print frames for `wait_ms`
pub fn run(device: Device, mode: Mode, wait_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Listening in {} mode for {} ms...", mode, wait_ms);
    let frames = with_printer(device, mode, Duration::from_millis(wait_ms), |_| Ok(()))?;
    println!("{} frame(s) received", frames);
    Ok(())
}
