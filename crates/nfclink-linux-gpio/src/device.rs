//! GPIO character device backend
//!
//! Every `/dev/gpiochipN` becomes a [`CdevChip`] registered under its kernel
//! label, so software node references naming that label resolve to it.
//! Output lines are requested one at a time and held until dropped.
//!
//! The controller's interrupt line is watched through an edge detecting
//! request wrapped in [`CdevIrq`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LinuxGpioError, Result};

use gpiocdev::chip::Chip;
use gpiocdev::line::{Bias, Drive, EdgeDetection, Offset, Value};
use gpiocdev::request::{Config, Request};

use nfclink_core::board::Edge;
use nfclink_core::error::Result as CoreResult;
use nfclink_core::gpio::{ChipRegistry, GpioChip, LineFlags, OutputLine};
use nfclink_core::irq::IrqSource;

fn level(active: bool) -> Value {
    if active {
        Value::Active
    } else {
        Value::Inactive
    }
}

/// Output drive for the lookup flags, `None` for push-pull
fn drive_for(flags: LineFlags) -> Option<Drive> {
    if flags.is_open_drain() {
        Some(Drive::OpenDrain)
    } else if flags.is_open_source() {
        Some(Drive::OpenSource)
    } else {
        None
    }
}

/// Bias for the lookup flags, `None` to leave it as is
fn bias_for(flags: LineFlags) -> Option<Bias> {
    if flags.contains(LineFlags::PULL_UP) {
        Some(Bias::PullUp)
    } else if flags.contains(LineFlags::PULL_DOWN) {
        Some(Bias::PullDown)
    } else if flags.contains(LineFlags::PULL_DISABLE) {
        Some(Bias::Disabled)
    } else {
        None
    }
}

fn edge_detection(edge: Edge) -> EdgeDetection {
    match edge {
        Edge::Rising => EdgeDetection::RisingEdge,
        Edge::Falling => EdgeDetection::FallingEdge,
    }
}

/// A GPIO chip behind a character device
#[derive(Debug, Clone)]
pub struct CdevChip {
    path: PathBuf,
    label: String,
    num_lines: u32,
}

impl CdevChip {
    /// Open a chip to read its label and size
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let info = Chip::from_path(path)
            .and_then(|chip| chip.info())
            .map_err(|e| LinuxGpioError::ChipOpenFailed {
                path: path.display().to_string(),
                source: e,
            })?;

        log::debug!(
            "linux_gpio: {} is '{}' ({} lines)",
            path.display(),
            info.label,
            info.num_lines
        );

        Ok(Self {
            path: path.to_path_buf(),
            label: info.label,
            num_lines: info.num_lines,
        })
    }

    /// Device path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GpioChip for CdevChip {
    fn label(&self) -> &str {
        &self.label
    }

    fn num_lines(&self) -> u32 {
        self.num_lines
    }

    fn request_output(
        &self,
        offset: u32,
        flags: LineFlags,
        consumer: &str,
        initial: bool,
    ) -> CoreResult<Box<dyn OutputLine>> {
        let mut config = Config::default();
        config.with_line(offset).as_output(level(initial));
        if flags.contains(LineFlags::ACTIVE_LOW) {
            config.as_active_low();
        }
        if let Some(drive) = drive_for(flags) {
            config.with_drive(drive);
        }
        if let Some(bias) = bias_for(flags) {
            config.with_bias(bias);
        }

        let request = Request::from_config(config)
            .on_chip(&self.path)
            .with_consumer(consumer)
            .request()
            .map_err(|e| LinuxGpioError::LineRequestFailed { offset, source: e })?;

        log::debug!(
            "linux_gpio: {}:{} requested as output by '{}'",
            self.label,
            offset,
            consumer
        );

        Ok(Box::new(CdevLine {
            request,
            offset,
            consumer: consumer.to_string(),
        }))
    }
}

/// A requested output line
pub struct CdevLine {
    request: Request,
    offset: Offset,
    consumer: String,
}

impl OutputLine for CdevLine {
    fn set_value(&mut self, active: bool) -> CoreResult<()> {
        self.request
            .set_value(self.offset, level(active))
            .map_err(LinuxGpioError::SetValueFailed)?;
        Ok(())
    }

    fn set_consumer_name(&mut self, name: &str) -> CoreResult<()> {
        if name != self.consumer {
            // The kernel keeps the label given at request time
            log::debug!(
                "linux_gpio: line {} relabelled '{}' -> '{}' locally",
                self.offset,
                self.consumer,
                name
            );
            self.consumer = name.to_string();
        }
        Ok(())
    }

    fn consumer_name(&self) -> &str {
        &self.consumer
    }
}

/// Interrupt source watching one line for edges
pub struct CdevIrq {
    request: Request,
}

impl CdevIrq {
    /// Request `offset` on `chip` as an edge detecting input
    pub fn open(chip: &CdevChip, offset: Offset, edge: Edge, consumer: &str) -> Result<Self> {
        let mut config = Config::default();
        config
            .with_line(offset)
            .as_input()
            .with_edge_detection(edge_detection(edge));

        let request = Request::from_config(config)
            .on_chip(&chip.path)
            .with_consumer(consumer)
            .request()
            .map_err(|e| LinuxGpioError::LineRequestFailed { offset, source: e })?;

        log::info!(
            "linux_gpio: watching {}:{} for {} edges",
            chip.label,
            offset,
            edge
        );
        Ok(Self { request })
    }
}

impl IrqSource for CdevIrq {
    fn wait(&mut self, timeout: Duration) -> CoreResult<bool> {
        let pending = self
            .request
            .wait_edge_event(timeout)
            .map_err(LinuxGpioError::EdgeEventFailed)?;
        if !pending {
            return Ok(false);
        }
        let event = self
            .request
            .read_edge_event()
            .map_err(LinuxGpioError::EdgeEventFailed)?;
        log::trace!("linux_gpio: edge {:?} on line {}", event.kind, event.offset);
        Ok(true)
    }
}

/// Open every GPIO chip on the system
pub fn enumerate_chips() -> Result<Vec<CdevChip>> {
    let paths = gpiocdev::chip::chips().map_err(LinuxGpioError::EnumerateFailed)?;
    let mut chips = Vec::with_capacity(paths.len());
    for path in paths {
        match CdevChip::open(&path) {
            Ok(chip) => chips.push(chip),
            // A chip we can't open can't serve our lines either
            Err(e) => log::warn!("linux_gpio: skipping {}: {}", path.display(), e),
        }
    }
    Ok(chips)
}

/// Register every GPIO chip on the system
pub fn register_chips(registry: &mut ChipRegistry) -> Result<()> {
    for chip in enumerate_chips()? {
        registry.register(Arc::new(chip));
    }
    Ok(())
}

/// Find a chip by label
pub fn find_chip(label: &str) -> Result<CdevChip> {
    enumerate_chips()?
        .into_iter()
        .find(|chip| chip.label == label)
        .ok_or_else(|| LinuxGpioError::ChipNotFound(label.to_string()))
}
