//! Mode change command

use nfclink_core::Mode;

use crate::backends::Device;

/// Bring the controller to `mode`
pub fn run(device: &Device, mode: Mode) -> Result<(), Box<dyn std::error::Error>> {
    let current = device.phy.get_mode();
    if current == mode {
        log::info!("Controller already in {} mode", mode);
        return Ok(());
    }

    device.phy.set_mode(mode)?;
    println!("Controller moved from {} to {} mode", current, mode);
    Ok(())
}
