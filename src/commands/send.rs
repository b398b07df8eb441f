//! Send one frame and print the replies

use std::time::Duration;

use nfclink_core::Mode;

use super::printer::{hex, with_printer};
use crate::backends::Device;

/// Bring the controller to `mode`, send `frame`, print replies for `wait_ms`
pub fn run(
    device: Device,
    mode: Mode,
    frame: &[u8],
    wait_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if mode == Mode::Cold {
        return Err("cannot send in cold mode".into());
    }
    if device.phy.config().suppress_write_echo {
        log::warn!(
            "suppress_write_echo is set: the reply interrupt will be treated as a write echo"
        );
    }

    let frames = with_printer(device, mode, Duration::from_millis(wait_ms), |device| {
        println!("-> {}", hex(frame));
        device.phy.write(frame)?;
        Ok(())
    })?;

    if frames == 0 {
        log::warn!("No reply within {} ms", wait_ms);
    }
    Ok(())
}
