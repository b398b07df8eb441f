//! I2C phy: framing, write retry and interrupt dispatch
//!
//! One [`I2cPhy`] exists per controller. Its mutex guards the current mode,
//! the power lines, the interrupt suppress flag and the bus itself, so
//! writes, mode changes and interrupt-driven reads never interleave.
//!
//! The interrupt handler ([`I2cPhy::handle_irq`]) is meant to be called by
//! an [`IrqThread`](crate::irq::IrqThread): at most once concurrently per
//! device, on an unspecified thread. It blocks on the device mutex and on
//! the bus, nothing else.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use super::{FrameSink, PhyConfig, PhyOps, PowerLines};
use crate::bus::{Delay, I2cBus, StdDelay};
use crate::error::{BusError, Error, Result};
use crate::frame::{Frame, HeaderLayout, MAX_HDR_SIZE};
use crate::gpio::{ChipRegistry, FwNode};
use crate::irq::{IrqHandler, IrqReturn};
use crate::mode::Mode;

/// State guarded by the device mutex
struct PhyState<B> {
    mode: Mode,
    lines: PowerLines,
    irq_skip: bool,
    bus: B,
}

/// Link layer for a controller attached over I2C
pub struct I2cPhy<B: I2cBus> {
    state: Mutex<PhyState<B>>,
    /// Copy of `state.mode`, written only with the mutex held
    mode: AtomicU8,
    upper: OnceLock<Arc<dyn FrameSink>>,
    config: PhyConfig,
    delay: Arc<dyn Delay>,
    warned_no_upper: AtomicBool,
}

impl<B: I2cBus> I2cPhy<B> {
    /// Create a phy in Cold mode using real sleeps
    pub fn new(bus: B, lines: PowerLines, config: PhyConfig) -> Result<Self> {
        Self::with_delay(bus, lines, config, Arc::new(StdDelay))
    }

    /// Create a phy in Cold mode with a custom delay source
    ///
    /// Interrupts start out suppressed until the first mode change or write.
    pub fn with_delay(
        bus: B,
        lines: PowerLines,
        config: PhyConfig,
        delay: Arc<dyn Delay>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(PhyState {
                mode: Mode::Cold,
                lines,
                irq_skip: true,
                bus,
            }),
            mode: AtomicU8::new(Mode::Cold.as_u8()),
            upper: OnceLock::new(),
            config,
            delay,
            warned_no_upper: AtomicBool::new(false),
        })
    }

    /// Create a phy, resolving the power lines from `fwnode`
    pub fn from_fwnode(
        bus: B,
        fwnode: &FwNode,
        chips: &ChipRegistry,
        config: PhyConfig,
    ) -> Result<Self> {
        let lines = PowerLines::acquire(fwnode, chips)?;
        Self::new(bus, lines, config)
    }

    /// Register the upper layer that receives frames
    ///
    /// Can only be done once. Interrupts arriving before this are not
    /// handled.
    pub fn attach(&self, upper: Arc<dyn FrameSink>) -> Result<()> {
        self.upper
            .set(upper)
            .map_err(|_| Error::InvalidArgument("upper layer already attached".into()))
    }

    /// Phy configuration
    pub fn config(&self) -> &PhyConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, PhyState<B>> {
        // State is written field by field with no intermediate invariants,
        // so a panic elsewhere does not leave it torn
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current mode, without taking the device lock
    pub fn get_mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Acquire))
    }

    /// True if the next interrupt will be treated as an echo
    pub fn irq_suppressed(&self) -> bool {
        self.lock().irq_skip
    }

    /// Move the controller to `mode`
    ///
    /// On success interrupts are suppressed, since toggling the power lines
    /// can itself raise one. On failure neither the mode nor the suppress
    /// flag change.
    pub fn set_mode(&self, mode: Mode) -> Result<()> {
        let mut state = self.lock();
        let from = state.mode;

        state
            .lines
            .power_ctrl(from, mode, self.config.en_wait_ms, self.delay.as_ref())?;

        state.mode = mode;
        self.mode.store(mode.as_u8(), Ordering::Release);
        state.irq_skip = true;

        log::info!("s3fwrn5: mode {} -> {}", from, mode);
        Ok(())
    }

    /// Drive the wake line
    pub fn set_wake(&self, wake: bool) -> Result<()> {
        let mut state = self.lock();
        state.lines.set_wake(wake)?;
        if wake {
            self.delay.delay_ms(self.config.en_wait_ms);
        }
        log::debug!("s3fwrn5: wake={}", wake as u8);
        Ok(())
    }

    /// Transmit one frame
    ///
    /// A write the controller does not acknowledge (it was in standby) is
    /// retried once after `standby_retry_ms`, with the device lock held.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let mut state = self.lock();

        // The bus controller's completion interrupt is an echo of this write
        state.irq_skip = self.config.suppress_write_echo;

        let mut ret = state.bus.master_send(data);
        if matches!(ret, Err(BusError::RemoteIo)) {
            log::debug!(
                "s3fwrn5: write not acknowledged, retrying in {} ms",
                self.config.standby_retry_ms
            );
            self.delay.delay_ms(self.config.standby_retry_ms);
            ret = state.bus.master_send(data);
        }

        drop(state);

        let sent = ret?;
        if sent != data.len() {
            return Err(Error::TransportMismatch {
                expected: data.len(),
                actual: sent,
            });
        }
        log::trace!("s3fwrn5: tx {:02x?}", data);
        Ok(())
    }

    /// Read one frame and hand it to `upper`
    ///
    /// Requires the device lock. No partial frame is ever delivered.
    fn receive(&self, state: &mut PhyState<B>, upper: &dyn FrameSink) -> Result<()> {
        let layout = HeaderLayout::for_mode(state.mode).ok_or_else(|| {
            Error::InvalidArgument(format!("no framing in {} mode", state.mode))
        })?;
        let hdr_size = layout.size();

        let mut hdr = [0u8; MAX_HDR_SIZE];
        let got = state.bus.master_recv(&mut hdr[..hdr_size])?;
        if got < hdr_size {
            return Err(Error::MalformedFrame {
                expected: hdr_size,
                actual: got,
            });
        }

        let header = layout.decode(&hdr[..hdr_size])?;
        let data_len = header.payload_len();
        if data_len > self.config.max_payload_len {
            return Err(Error::OutOfMemory {
                requested: data_len,
            });
        }

        let mut frame = Frame::try_with_capacity(hdr_size + data_len)?;
        frame.put(&hdr[..hdr_size]);

        if data_len > 0 {
            let got = state.bus.master_recv(frame.put_zeroed(data_len))?;
            if got != data_len {
                return Err(Error::MalformedFrame {
                    expected: data_len,
                    actual: got,
                });
            }
        }

        log::trace!("s3fwrn5: rx {:02x?}", frame.as_bytes());
        upper.recv_frame(frame, state.mode)
    }

    /// Service one interrupt
    ///
    /// Returns [`IrqReturn::None`] only if no upper layer is attached. Read
    /// failures are logged and the interrupt still counts as handled.
    pub fn handle_irq(&self) -> IrqReturn {
        let Some(upper) = self.upper.get() else {
            if !self.warned_no_upper.swap(true, Ordering::Relaxed) {
                log::error!("s3fwrn5: interrupt with no upper layer attached");
            }
            return IrqReturn::None;
        };

        let mut state = self.lock();

        if state.irq_skip {
            log::trace!("s3fwrn5: ignoring echo interrupt");
            return IrqReturn::Handled;
        }

        match state.mode {
            Mode::Nci | Mode::Firmware => {
                if let Err(e) = self.receive(&mut state, &**upper) {
                    log::warn!("s3fwrn5: dropped frame: {}", e);
                }
            }
            Mode::Cold => {}
        }

        IrqReturn::Handled
    }
}

impl<B: I2cBus> IrqHandler for I2cPhy<B> {
    fn handle_irq(&self) -> IrqReturn {
        I2cPhy::handle_irq(self)
    }
}

impl<B: I2cBus> PhyOps for I2cPhy<B> {
    fn set_wake(&self, wake: bool) -> Result<()> {
        I2cPhy::set_wake(self, wake)
    }

    fn set_mode(&self, mode: Mode) -> Result<()> {
        I2cPhy::set_mode(self, mode)
    }

    fn get_mode(&self) -> Mode {
        I2cPhy::get_mode(self)
    }

    fn write(&self, frame: &[u8]) -> Result<()> {
        I2cPhy::write(self, frame)
    }
}

/// Interrupt entry point for a possibly missing device
///
/// Reports [`IrqReturn::None`] without touching anything if `phy` is absent.
pub fn irq_thread_fn<B: I2cBus>(phy: Option<&I2cPhy<B>>) -> IrqReturn {
    match phy {
        Some(phy) => phy.handle_irq(),
        None => {
            log::error!("s3fwrn5: interrupt for a device that does not exist");
            IrqReturn::None
        }
    }
}
