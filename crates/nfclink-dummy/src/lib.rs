//! nfclink-dummy - Emulated S3FWRN5 controller for testing
//!
//! This crate emulates the controller side of the link in memory: its I2C
//! target, the GPIO chip carrying its `en` and `wake` lines, and its
//! interrupt line. It's useful for testing and development without real
//! hardware.
//!
//! The emulated controller follows its power lines the way the real one
//! does: raising `en` holds it in reset, and releasing `en` boots it into
//! the bootloader if `wake` is high or into NCI mode otherwise. It answers
//! a small set of NCI and bootloader commands and raises an interrupt edge
//! for every frame it queues.
//!
//! ```
//! use nfclink_dummy::{DummyConfig, DummyNfc};
//! use nfclink_core::gpio::ChipRegistry;
//!
//! let nfc = DummyNfc::new(DummyConfig::default());
//! let mut chips = ChipRegistry::new();
//! chips.register(nfc.gpio_chip());
//! let node = nfc.consumer_node("s3fwrn5");
//! let bus = nfc.bus();
//! let irq = nfc.irq();
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use nfclink_core::bus::I2cBus;
use nfclink_core::error::Result;
use nfclink_core::frame::{Header, HeaderLayout};
use nfclink_core::gpio::{
    FwNode, GpioChip, LineFlags, NodeReference, OutputLine, Property, SoftwareNode,
};
use nfclink_core::irq::IrqSource;
use nfclink_core::{BusError, Error, Mode};

/// NCI constants used by the emulation
pub mod nci {
    /// Message type: data packet
    pub const MT_DATA: u8 = 0;
    /// Message type: command
    pub const MT_CMD: u8 = 1;
    /// Message type: response
    pub const MT_RSP: u8 = 2;
    /// Message type: notification
    pub const MT_NTF: u8 = 3;

    /// Core group
    pub const GID_CORE: u8 = 0x0;
    /// CORE_RESET opcode
    pub const OID_CORE_RESET: u8 = 0x00;
    /// CORE_INIT opcode
    pub const OID_CORE_INIT: u8 = 0x01;
    /// CORE_GENERIC_ERROR opcode (notification)
    pub const OID_CORE_GENERIC_ERROR: u8 = 0x07;

    /// Success
    pub const STATUS_OK: u8 = 0x00;
    /// Malformed command
    pub const STATUS_SYNTAX_ERROR: u8 = 0x05;
    /// Unknown group
    pub const STATUS_UNKNOWN_GID: u8 = 0x07;
    /// Unknown opcode
    pub const STATUS_UNKNOWN_OID: u8 = 0x08;

    /// NCI version 1.0
    pub const VERSION_1_0: u8 = 0x10;

    /// First header byte for message type `mt` in group `gid`
    pub const fn hdr0(mt: u8, gid: u8) -> u8 {
        (mt << 5) | (gid & 0x0F)
    }
}

/// Bootloader constants used by the emulation
pub mod fw {
    /// Message type: command
    pub const MSG_CMD: u8 = 0x00;
    /// Message type: response
    pub const MSG_RSP: u8 = 0x01;

    /// Reset the controller
    pub const CMD_RESET: u8 = 0x00;
    /// Read boot information
    pub const CMD_GET_BOOTINFO: u8 = 0x01;

    /// Success
    pub const RET_SUCCESS: u8 = 0x00;
    /// Unknown command
    pub const RET_UNKNOWN_CMD: u8 = 0x05;
}

/// Configuration for the emulated controller
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Label of the emulated GPIO chip
    pub chip_label: String,
    /// Number of lines on the emulated GPIO chip
    pub num_lines: u32,
    /// Offset of the `en` line
    pub en_line: u32,
    /// Offset of the `wake` line
    pub wake_line: u32,
    /// Writes to refuse after every boot, as a controller still in standby
    pub standby_nacks: u32,
    /// Hardware version reported by the bootloader
    pub hw_version: [u8; 4],
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            chip_label: "dummy-gpio".to_string(),
            num_lines: 8,
            en_line: 0,
            wake_line: 1,
            standby_nacks: 0,
            hw_version: [0x05, 0x00, 0x03, 0x00],
        }
    }
}

/// Parse emulator options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        let number = || {
            value
                .parse::<u32>()
                .map_err(|_| format!("Invalid {} value: {}", key, value))
        };
        match *key {
            "label" => config.chip_label = value.to_string(),
            "lines" => config.num_lines = number()?,
            "en" => config.en_line = number()?,
            "wake" => config.wake_line = number()?,
            "nacks" => config.standby_nacks = number()?,
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    if config.en_line == config.wake_line {
        return Err("en and wake must be different lines".to_string());
    }
    if config.en_line >= config.num_lines || config.wake_line >= config.num_lines {
        return Err(format!("en/wake lines must be below {}", config.num_lines));
    }
    Ok(config)
}

/// Controller state behind the bus, lines and interrupt
struct ChipState {
    en: bool,
    wake: bool,
    mode: Mode,
    rx: VecDeque<u8>,
    pending_irqs: usize,
    nacks_left: u32,
    received: Vec<Vec<u8>>,
    refused: usize,
}

struct Shared {
    config: DummyConfig,
    state: Mutex<ChipState>,
    irq: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ChipState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one frame and raise an interrupt edge for it
    fn queue(&self, state: &mut ChipState, frame: &[u8]) {
        log::trace!("dummy: queue {:02x?}", frame);
        state.rx.extend(frame.iter().copied());
        state.pending_irqs += 1;
        self.irq.notify_all();
    }

    fn drive(&self, offset: u32, level: bool) {
        let mut state = self.lock();
        if offset == self.config.wake_line {
            state.wake = level;
            return;
        }
        if offset != self.config.en_line {
            return;
        }

        let was = state.en;
        state.en = level;
        if level {
            if state.mode != Mode::Cold {
                log::debug!("dummy: held in reset");
            }
            state.mode = Mode::Cold;
            state.rx.clear();
            state.pending_irqs = 0;
        } else if was {
            state.mode = if state.wake { Mode::Firmware } else { Mode::Nci };
            state.nacks_left = self.config.standby_nacks;
            log::debug!("dummy: booted in {} mode", state.mode);
        }
    }

    fn handle_write(&self, state: &mut ChipState, data: &[u8]) {
        match state.mode {
            Mode::Nci => self.handle_nci(state, data),
            Mode::Firmware => self.handle_fw(state, data),
            Mode::Cold => {}
        }
    }

    fn handle_nci(&self, state: &mut ChipState, data: &[u8]) {
        let Some(Header::Nci(hdr)) = decode(HeaderLayout::Nci, data) else {
            log::warn!("dummy: runt NCI packet {:02x?}", data);
            return;
        };
        let (gid, oid) = (hdr.group_id(), hdr.opcode_id());

        match hdr.message_type() {
            nci::MT_CMD => {
                let rsp0 = nci::hdr0(nci::MT_RSP, gid);
                if data.len() != 3 + hdr.plen as usize {
                    self.queue(state, &[rsp0, oid, 1, nci::STATUS_SYNTAX_ERROR]);
                    return;
                }
                match (gid, oid) {
                    (nci::GID_CORE, nci::OID_CORE_RESET) => {
                        // status, version, configuration kept
                        self.queue(
                            state,
                            &[rsp0, oid, 3, nci::STATUS_OK, nci::VERSION_1_0, 0x00],
                        );
                    }
                    (nci::GID_CORE, nci::OID_CORE_INIT) => {
                        let mut rsp = vec![rsp0, oid, 0];
                        rsp.push(nci::STATUS_OK);
                        rsp.extend_from_slice(&[0x00; 4]); // features
                        rsp.extend_from_slice(&[0x01, 0x01]); // one interface: frame RF
                        rsp.push(0x01); // logical connections
                        rsp.extend_from_slice(&[0x00, 0x01]); // routing table size
                        rsp.push(0xFF); // max control payload
                        rsp.extend_from_slice(&[0x00, 0x00]); // large parameters
                        rsp.push(0x15); // manufacturer: Samsung
                        rsp.extend_from_slice(&self.config.hw_version);
                        rsp[2] = (rsp.len() - 3) as u8;
                        self.queue(state, &rsp);
                    }
                    (nci::GID_CORE, _) => {
                        self.queue(state, &[rsp0, oid, 1, nci::STATUS_UNKNOWN_OID]);
                    }
                    _ => {
                        self.queue(state, &[rsp0, oid, 1, nci::STATUS_UNKNOWN_GID]);
                    }
                }
            }
            // Loopback
            nci::MT_DATA => self.queue(state, data),
            mt => {
                log::warn!("dummy: unexpected NCI message type {} from host", mt);
                let ntf0 = nci::hdr0(nci::MT_NTF, nci::GID_CORE);
                self.queue(
                    state,
                    &[ntf0, nci::OID_CORE_GENERIC_ERROR, 1, nci::STATUS_SYNTAX_ERROR],
                );
            }
        }
    }

    fn handle_fw(&self, state: &mut ChipState, data: &[u8]) {
        let Some(Header::Firmware(hdr)) = decode(HeaderLayout::Firmware, data) else {
            log::warn!("dummy: runt bootloader packet {:02x?}", data);
            return;
        };
        if hdr.msg_type != fw::MSG_CMD {
            log::warn!("dummy: bootloader ignores message type {}", hdr.msg_type);
            return;
        }

        match hdr.code {
            fw::CMD_GET_BOOTINFO => {
                let mut payload = Vec::with_capacity(12);
                payload.extend_from_slice(&self.config.hw_version);
                payload.extend_from_slice(&4096u16.to_le_bytes()); // sector size
                payload.extend_from_slice(&256u16.to_le_bytes()); // page size
                payload.extend_from_slice(&256u16.to_le_bytes()); // frame max size
                payload.extend_from_slice(&1024u16.to_le_bytes()); // hw buffer size
                self.queue(state, &fw_frame(fw::RET_SUCCESS, &payload));
            }
            fw::CMD_RESET => self.queue(state, &fw_frame(fw::RET_SUCCESS, &[])),
            code => {
                log::debug!("dummy: unknown bootloader command {:#04x}", code);
                self.queue(state, &fw_frame(fw::RET_UNKNOWN_CMD, &[]));
            }
        }
    }
}

fn decode(layout: HeaderLayout, data: &[u8]) -> Option<Header> {
    data.get(..layout.size())
        .and_then(|hdr| layout.decode(hdr).ok())
}

fn fw_frame(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![fw::MSG_RSP, code];
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Emulated controller
///
/// Cloning gives another handle to the same controller.
#[derive(Clone)]
pub struct DummyNfc {
    shared: Arc<Shared>,
}

impl DummyNfc {
    /// Create a controller, unpowered, with both lines low
    pub fn new(config: DummyConfig) -> Self {
        let state = ChipState {
            en: false,
            wake: false,
            mode: Mode::Cold,
            rx: VecDeque::new(),
            pending_irqs: 0,
            nacks_left: 0,
            received: Vec::new(),
            refused: 0,
        };
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                irq: Condvar::new(),
            }),
        }
    }

    /// Create a controller with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.shared.config
    }

    /// The controller's I2C target
    pub fn bus(&self) -> DummyBus {
        DummyBus {
            shared: self.shared.clone(),
        }
    }

    /// The GPIO chip carrying `en` and `wake`
    pub fn gpio_chip(&self) -> Arc<DummyGpioChip> {
        Arc::new(DummyGpioChip {
            shared: self.shared.clone(),
        })
    }

    /// The controller's interrupt line
    pub fn irq(&self) -> DummyIrq {
        DummyIrq {
            shared: self.shared.clone(),
        }
    }

    /// A software node wiring `en` and `wake` to this controller's lines
    pub fn consumer_node(&self, name: &str) -> FwNode {
        let config = &self.shared.config;
        let chip = Arc::new(SoftwareNode::new(config.chip_label.as_str()));
        let line = |offset: u32| vec![NodeReference::new(chip.clone(), vec![offset as u64, 0])];
        SoftwareNode::new(name)
            .with_property(Property::references("en-gpios", line(config.en_line)))
            .with_property(Property::references("wake-gpios", line(config.wake_line)))
            .into()
    }

    /// Mode the controller booted into
    pub fn mode(&self) -> Mode {
        self.shared.lock().mode
    }

    /// Current levels of `en` and `wake`
    pub fn lines(&self) -> (bool, bool) {
        let state = self.shared.lock();
        (state.en, state.wake)
    }

    /// Every frame the controller accepted, oldest first
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.shared.lock().received.clone()
    }

    /// Writes the controller did not acknowledge
    pub fn refused_writes(&self) -> usize {
        self.shared.lock().refused
    }

    /// Queue an unsolicited frame and raise its interrupt
    pub fn inject(&self, frame: &[u8]) {
        let mut state = self.shared.lock();
        self.shared.queue(&mut state, frame);
    }

    /// Bytes waiting to be read
    pub fn pending_bytes(&self) -> usize {
        self.shared.lock().rx.len()
    }
}

/// I2C target side of the emulated controller
pub struct DummyBus {
    shared: Arc<Shared>,
}

impl I2cBus for DummyBus {
    fn master_send(&mut self, data: &[u8]) -> std::result::Result<usize, BusError> {
        let mut state = self.shared.lock();
        if state.mode == Mode::Cold {
            // Nobody acknowledges the address
            state.refused += 1;
            return Err(BusError::RemoteIo);
        }
        if state.nacks_left > 0 {
            state.nacks_left -= 1;
            state.refused += 1;
            log::debug!("dummy: standby, refusing write");
            return Err(BusError::RemoteIo);
        }

        state.received.push(data.to_vec());
        self.shared.handle_write(&mut state, data);
        Ok(data.len())
    }

    fn master_recv(&mut self, buf: &mut [u8]) -> std::result::Result<usize, BusError> {
        let mut state = self.shared.lock();
        if state.mode == Mode::Cold {
            return Err(BusError::RemoteIo);
        }
        let n = buf.len().min(state.rx.len());
        for (dst, src) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

/// GPIO chip carrying the emulated controller's lines
pub struct DummyGpioChip {
    shared: Arc<Shared>,
}

impl GpioChip for DummyGpioChip {
    fn label(&self) -> &str {
        &self.shared.config.chip_label
    }

    fn num_lines(&self) -> u32 {
        self.shared.config.num_lines
    }

    fn request_output(
        &self,
        offset: u32,
        flags: LineFlags,
        consumer: &str,
        initial: bool,
    ) -> Result<Box<dyn OutputLine>> {
        if offset >= self.num_lines() {
            return Err(Error::InvalidArgument(format!(
                "line {} out of range on {}",
                offset,
                self.label()
            )));
        }
        let mut line = DummyLine {
            shared: self.shared.clone(),
            offset,
            active_low: flags.contains(LineFlags::ACTIVE_LOW),
            consumer: consumer.to_string(),
        };
        line.set_value(initial)?;
        Ok(Box::new(line))
    }
}

/// A requested line on [`DummyGpioChip`]
pub struct DummyLine {
    shared: Arc<Shared>,
    offset: u32,
    active_low: bool,
    consumer: String,
}

impl OutputLine for DummyLine {
    fn set_value(&mut self, active: bool) -> Result<()> {
        self.shared.drive(self.offset, active != self.active_low);
        Ok(())
    }

    fn set_consumer_name(&mut self, name: &str) -> Result<()> {
        self.consumer = name.to_string();
        Ok(())
    }

    fn consumer_name(&self) -> &str {
        &self.consumer
    }
}

/// Interrupt line of the emulated controller
pub struct DummyIrq {
    shared: Arc<Shared>,
}

impl IrqSource for DummyIrq {
    fn wait(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while state.pending_irqs == 0 {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            state = self
                .shared
                .irq
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        state.pending_irqs -= 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfclink_core::bus::Delay;
    use nfclink_core::frame::Frame;
    use nfclink_core::gpio::ChipRegistry;
    use nfclink_core::irq::IrqThread;
    use nfclink_core::phy::{FrameSink, I2cPhy, PhyConfig, PowerLines};

    struct NoDelay;

    impl Delay for NoDelay {
        fn delay_ms(&self, _ms: u32) {}
    }

    #[derive(Default)]
    struct Collector(Mutex<Vec<(Vec<u8>, Mode)>>);

    impl FrameSink for Collector {
        fn recv_frame(&self, frame: Frame, mode: Mode) -> Result<()> {
            self.0.lock().unwrap().push((frame.into_vec(), mode));
            Ok(())
        }
    }

    impl Collector {
        fn wait_for(&self, n: usize) -> Vec<(Vec<u8>, Mode)> {
            let deadline = Instant::now() + Duration::from_secs(5);
            loop {
                let frames = self.0.lock().unwrap().clone();
                if frames.len() >= n || Instant::now() > deadline {
                    return frames;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }

    fn phy_for(nfc: &DummyNfc, config: PhyConfig) -> Arc<I2cPhy<DummyBus>> {
        let mut chips = ChipRegistry::new();
        chips.register(nfc.gpio_chip());
        let lines = PowerLines::acquire(&nfc.consumer_node("nfc"), &chips).unwrap();
        Arc::new(I2cPhy::with_delay(nfc.bus(), lines, config, Arc::new(NoDelay)).unwrap())
    }

    #[test]
    fn test_boot_follows_lines() {
        let nfc = DummyNfc::new_default();
        let chip = nfc.gpio_chip();
        let mut en = chip.request_output(0, LineFlags::empty(), "en", false).unwrap();
        let mut wake = chip.request_output(1, LineFlags::empty(), "wake", false).unwrap();
        assert_eq!(nfc.mode(), Mode::Cold);

        en.set_value(true).unwrap();
        wake.set_value(true).unwrap();
        en.set_value(false).unwrap();
        assert_eq!(nfc.mode(), Mode::Firmware);

        en.set_value(true).unwrap();
        wake.set_value(false).unwrap();
        en.set_value(false).unwrap();
        assert_eq!(nfc.mode(), Mode::Nci);
        assert_eq!(nfc.lines(), (false, false));
    }

    #[test]
    fn test_active_low_line_inverted() {
        let nfc = DummyNfc::new_default();
        let chip = nfc.gpio_chip();
        let _en = chip
            .request_output(0, LineFlags::ACTIVE_LOW, "en", false)
            .unwrap();
        assert_eq!(nfc.lines(), (true, false));
    }

    #[test]
    fn test_core_reset_over_bus() {
        let nfc = DummyNfc::new_default();
        let phy = phy_for(&nfc, PhyConfig::new().with_suppress_write_echo(false));
        phy.set_mode(Mode::Nci).unwrap();
        assert_eq!(nfc.mode(), Mode::Nci);

        let mut bus = nfc.bus();
        bus.master_send(&[0x20, 0x00, 0x01, 0x00]).unwrap();
        let mut buf = [0u8; 16];
        let n = bus.master_recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x40, 0x00, 0x03, 0x00, 0x10, 0x00]);
    }

    #[test]
    fn test_unknown_commands() {
        let nfc = DummyNfc::new_default();
        let phy = phy_for(&nfc, PhyConfig::default());
        phy.set_mode(Mode::Nci).unwrap();

        let mut bus = nfc.bus();
        let mut buf = [0u8; 16];
        bus.master_send(&[0x20, 0x3f, 0x00]).unwrap();
        let n = bus.master_recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x40, 0x3f, 0x01, nci::STATUS_UNKNOWN_OID]);

        bus.master_send(&[0x2f, 0x01, 0x00]).unwrap();
        let n = bus.master_recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x4f, 0x01, 0x01, nci::STATUS_UNKNOWN_GID]);

        // plen disagrees with the packet
        bus.master_send(&[0x20, 0x00, 0x02, 0x00]).unwrap();
        let n = bus.master_recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0x40, 0x00, 0x01, nci::STATUS_SYNTAX_ERROR]);
    }

    #[test]
    fn test_reset_refuses_writes_and_drops_queue() {
        let nfc = DummyNfc::new_default();
        let phy = phy_for(&nfc, PhyConfig::default());
        let mut bus = nfc.bus();
        assert!(matches!(
            bus.master_send(&[0x20, 0x00, 0x00]),
            Err(BusError::RemoteIo)
        ));

        phy.set_mode(Mode::Nci).unwrap();
        nfc.inject(&[0x60, 0x07, 0x01, 0x03]);
        assert_eq!(nfc.pending_bytes(), 4);
        phy.set_mode(Mode::Cold).unwrap();
        assert_eq!(nfc.pending_bytes(), 0);
        assert_eq!(nfc.lines(), (true, false));
    }

    #[test]
    fn test_end_to_end_nci() {
        let nfc = DummyNfc::new_default();
        let phy = phy_for(&nfc, PhyConfig::new().with_suppress_write_echo(false));
        let sink = Arc::new(Collector::default());
        phy.attach(sink.clone()).unwrap();
        let irq = IrqThread::spawn("dummy-irq", nfc.irq(), phy.clone()).unwrap();

        phy.set_mode(Mode::Nci).unwrap();
        phy.write(&[0x20, 0x00, 0x01, 0x00]).unwrap();
        phy.write(&[0x20, 0x01, 0x00]).unwrap();

        let frames = sink.wait_for(2);
        irq.stop().unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, vec![0x40, 0x00, 0x03, 0x00, 0x10, 0x00]);
        assert_eq!(frames[0].1, Mode::Nci);
        assert_eq!(&frames[1].0[..4], &[0x40, 0x01, 0x12, 0x00]);
        assert_eq!(frames[1].0.len(), 3 + 0x12);
        assert_eq!(nfc.received().len(), 2);
    }

    #[test]
    fn test_end_to_end_bootloader() {
        let nfc = DummyNfc::new_default();
        let phy = phy_for(&nfc, PhyConfig::new().with_suppress_write_echo(false));
        let sink = Arc::new(Collector::default());
        phy.attach(sink.clone()).unwrap();
        let irq = IrqThread::spawn("dummy-irq", nfc.irq(), phy.clone()).unwrap();

        phy.set_mode(Mode::Firmware).unwrap();
        assert_eq!(nfc.mode(), Mode::Firmware);
        phy.write(&[fw::MSG_CMD, fw::CMD_GET_BOOTINFO, 0x00, 0x00]).unwrap();

        let frames = sink.wait_for(1);
        irq.stop().unwrap();

        let (frame, mode) = &frames[0];
        assert_eq!(*mode, Mode::Firmware);
        assert_eq!(&frame[..4], &[fw::MSG_RSP, fw::RET_SUCCESS, 12, 0]);
        assert_eq!(&frame[4..8], &DummyConfig::default().hw_version);
    }

    #[test]
    fn test_standby_nack_is_retried() {
        let nfc = DummyNfc::new(DummyConfig {
            standby_nacks: 1,
            ..Default::default()
        });
        let phy = phy_for(&nfc, PhyConfig::default());
        phy.set_mode(Mode::Nci).unwrap();
        phy.write(&[0x20, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(nfc.received().len(), 1);
        assert_eq!(nfc.refused_writes(), 1);
    }

    #[test]
    fn test_write_after_power_down_refused() {
        let nfc = DummyNfc::new_default();
        let phy = phy_for(&nfc, PhyConfig::default());
        phy.set_mode(Mode::Nci).unwrap();
        phy.set_mode(Mode::Cold).unwrap();
        assert_eq!(nfc.mode(), Mode::Cold);

        let err = phy.write(&[0x20, 0x00, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Transport(BusError::RemoteIo)));
        // First attempt plus the single standby retry
        assert_eq!(nfc.refused_writes(), 2);
        assert!(nfc.received().is_empty());
    }

    #[test]
    fn test_suppressed_echo_leaves_response_queued() {
        let nfc = DummyNfc::new_default();
        let phy = phy_for(&nfc, PhyConfig::default());
        let sink = Arc::new(Collector::default());
        phy.attach(sink.clone()).unwrap();

        phy.set_mode(Mode::Nci).unwrap();
        phy.write(&[0x20, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(phy.handle_irq(), nfclink_core::irq::IrqReturn::Handled);
        assert!(sink.0.lock().unwrap().is_empty());
        assert_eq!(nfc.pending_bytes(), 6);
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[
            ("label", "gpio-x"),
            ("en", "3"),
            ("wake", "4"),
            ("nacks", "2"),
        ])
        .unwrap();
        assert_eq!(config.chip_label, "gpio-x");
        assert_eq!(config.en_line, 3);
        assert_eq!(config.wake_line, 4);
        assert_eq!(config.standby_nacks, 2);

        assert!(parse_options(&[("en", "1")]).is_err());
        assert!(parse_options(&[("wake", "9")]).is_err());
        assert!(parse_options(&[("nacks", "many")]).is_err());
    }
}
