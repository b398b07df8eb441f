//! Frame printing shared by `send` and `listen`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nfclink_core::frame::{Header, HeaderLayout};
use nfclink_core::irq::IrqThread;
use nfclink_core::phy::FrameSink;
use nfclink_core::{Frame, Mode};

use crate::backends::Device;

/// Name of the interrupt dispatch thread
const IRQ_THREAD_NAME: &str = "s3fwrn5-irq";

/// Upper layer that prints every frame it receives
#[derive(Default)]
pub struct Printer {
    frames: AtomicUsize,
}

impl Printer {
    /// Number of frames printed so far
    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::Relaxed)
    }
}

impl FrameSink for Printer {
    fn recv_frame(&self, frame: Frame, mode: Mode) -> nfclink_core::Result<()> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        println!("<- {}", describe(frame.as_bytes(), mode));
        Ok(())
    }
}

/// Render a frame as its decoded header followed by hex bytes
pub fn describe(bytes: &[u8], mode: Mode) -> String {
    let header = HeaderLayout::for_mode(mode)
        .filter(|layout| bytes.len() >= layout.size())
        .and_then(|layout| layout.decode(&bytes[..layout.size()]).ok());

    let summary = match header {
        Some(Header::Nci(h)) => format!(
            "[nci mt={} gid={:#x} oid={:#x} plen={}{}]",
            h.message_type(),
            h.group_id(),
            h.opcode_id(),
            h.plen,
            if h.segmented() { " seg" } else { "" }
        ),
        Some(Header::Firmware(h)) => format!(
            "[fw type={} code={:#x} len={}]",
            h.msg_type,
            h.code,
            h.len.get()
        ),
        None => format!("[{} raw]", mode),
    };
    format!("{} {}", summary, hex(bytes))
}

/// Space separated lowercase hex
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `body` with frames printed, then power the controller down
///
/// The controller is brought to `mode` first. After `body` returns the
/// interrupt thread keeps printing for `wait`.
pub fn with_printer<F>(
    mut device: Device,
    mode: Mode,
    wait: Duration,
    body: F,
) -> Result<usize, Box<dyn std::error::Error>>
where
    F: FnOnce(&Device) -> Result<(), Box<dyn std::error::Error>>,
{
    let printer = Arc::new(Printer::default());
    device.phy.attach(printer.clone())?;

    let irq = device.take_irq()?;
    let thread = IrqThread::spawn(IRQ_THREAD_NAME, irq, device.phy.clone())?;

    let result = device
        .phy
        .set_mode(mode)
        .map_err(Into::into)
        .and_then(|()| body(&device));

    if result.is_ok() {
        std::thread::sleep(wait);
    }

    match thread.stop() {
        Ok(stats) => log::debug!(
            "irq: {} handled, {} unhandled",
            stats.handled,
            stats.unhandled
        ),
        Err(e) => log::warn!("Interrupt thread failed: {}", e),
    }

    if let Err(e) = device.phy.set_mode(Mode::Cold) {
        log::warn!("Failed to power down controller: {}", e);
    }

    result.map(|()| printer.frames())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "dummy")]
    use nfclink_core::board::Board;

    #[test]
    fn test_describe_nci() {
        let text = describe(&[0x40, 0x00, 0x03, 0x00, 0x10, 0x00], Mode::Nci);
        assert_eq!(text, "[nci mt=2 gid=0x0 oid=0x0 plen=3] 40 00 03 00 10 00");
    }

    #[test]
    fn test_describe_fw() {
        let text = describe(&[0x01, 0x00, 0x02, 0x00, 0xaa, 0xbb], Mode::Firmware);
        assert_eq!(text, "[fw type=1 code=0x0 len=2] 01 00 02 00 aa bb");
    }

    #[test]
    fn test_describe_short() {
        assert_eq!(describe(&[0x40, 0x00], Mode::Nci), "[nci raw] 40 00");
        assert_eq!(describe(&[0x01], Mode::Cold), "[cold raw] 01");
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_core_reset_on_dummy_board() {
        let board = Board::from_toml_str(include_str!("../../boards/dummy.toml")).unwrap();
        let device = crate::backends::open_device(&board).unwrap();
        let phy = device.phy.clone();

        let frames = with_printer(device, Mode::Nci, Duration::from_millis(300), |device| {
            device.phy.write(&[0x20, 0x00, 0x01, 0x00])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(frames, 1);
        assert_eq!(phy.get_mode(), Mode::Cold);
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_same_mode_request_skips_body() {
        let board = Board::from_toml_str(include_str!("../../boards/dummy.toml")).unwrap();
        let device = crate::backends::open_device(&board).unwrap();
        let phy = device.phy.clone();
        let ran = std::sync::atomic::AtomicBool::new(false);

        // The phy starts out Cold, so asking for Cold again is refused
        let result = with_printer(device, Mode::Cold, Duration::ZERO, |_| {
            ran.store(true, Ordering::Relaxed);
            Ok(())
        });

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<nfclink_core::Error>(),
            Some(nfclink_core::Error::ModeTransitionFailed { .. })
        ));
        assert!(!ran.load(Ordering::Relaxed));
        assert_eq!(phy.get_mode(), Mode::Cold);
    }
}
