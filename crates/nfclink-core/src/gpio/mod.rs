//! GPIO line lookup and control
//!
//! This module defines the seams between the link layer and a GPIO
//! subsystem:
//!
//! - [`GpioChip`] - a registered line provider, identified by its label
//! - [`OutputLine`] - a requested output line the power controller drives
//! - [`ChipRegistry`] - the set of currently registered providers
//!
//! Lines are described by [software nodes](swnode) and resolved by the
//! functions in [`resolver`].

pub mod resolver;
pub mod swnode;

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{Error, Result};

pub use resolver::{count_lines, find_line, get_output, MAX_LINE_PROBE};
pub use swnode::{FwNode, NodeReference, Property, PropertyValue, SoftwareNode};

bitflags! {
    /// Native GPIO lookup flags carried as the second reference argument
    ///
    /// Values follow the `dt-bindings/gpio/gpio.h` encoding. Unknown bits
    /// are retained so the value round-trips exactly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LineFlags: u64 {
        /// Line is asserted when driven low
        const ACTIVE_LOW    = 1 << 0;
        /// Line is single-ended (open drain or open source)
        const SINGLE_ENDED  = 1 << 1;
        /// Single-ended line drives low only
        const LINE_OPEN_DRAIN = 1 << 2;
        /// State may be lost across suspend
        const TRANSITORY    = 1 << 3;
        /// Enable the internal pull-up
        const PULL_UP       = 1 << 4;
        /// Enable the internal pull-down
        const PULL_DOWN     = 1 << 5;
        /// Disable any internal bias
        const PULL_DISABLE  = 1 << 6;

        /// Open drain output
        const OPEN_DRAIN = Self::SINGLE_ENDED.bits() | Self::LINE_OPEN_DRAIN.bits();
        /// Open source output
        const OPEN_SOURCE = Self::SINGLE_ENDED.bits();
    }
}

impl LineFlags {
    /// True if the output should be driven open drain
    pub fn is_open_drain(self) -> bool {
        self.contains(LineFlags::OPEN_DRAIN)
    }

    /// True if the output should be driven open source
    pub fn is_open_source(self) -> bool {
        self.contains(LineFlags::SINGLE_ENDED) && !self.contains(LineFlags::LINE_OPEN_DRAIN)
    }
}

/// A registered provider of GPIO lines
pub trait GpioChip: Send + Sync {
    /// Label the provider registered under
    fn label(&self) -> &str;

    /// Number of lines the provider owns
    fn num_lines(&self) -> u32;

    /// Request line `offset` as an output
    ///
    /// `initial` is the logical level (after applying `ACTIVE_LOW`).
    fn request_output(
        &self,
        offset: u32,
        flags: LineFlags,
        consumer: &str,
        initial: bool,
    ) -> Result<Box<dyn OutputLine>>;
}

/// A requested output line
pub trait OutputLine: Send {
    /// Drive the line to a logical level
    fn set_value(&mut self, active: bool) -> Result<()>;

    /// Change the consumer label shown for this line
    fn set_consumer_name(&mut self, name: &str) -> Result<()>;

    /// Current consumer label
    fn consumer_name(&self) -> &str;
}

/// Descriptor for a single line on a provider
#[derive(Clone)]
pub struct GpioDesc {
    chip: Arc<dyn GpioChip>,
    offset: u32,
}

impl GpioDesc {
    /// Descriptor for line `offset` on `chip`
    ///
    /// Fails with [`Error::InvalidArgument`] if the provider has no such line.
    pub fn new(chip: Arc<dyn GpioChip>, offset: u32) -> Result<Self> {
        if offset >= chip.num_lines() {
            return Err(Error::InvalidArgument(format!(
                "line {} out of range for '{}' ({} lines)",
                offset,
                chip.label(),
                chip.num_lines()
            )));
        }
        Ok(Self { chip, offset })
    }

    /// Provider owning this line
    pub fn chip(&self) -> &Arc<dyn GpioChip> {
        &self.chip
    }

    /// Hardware offset on the provider
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Request the line as an output at logical level `initial`
    pub fn request_output(
        &self,
        flags: LineFlags,
        consumer: &str,
        initial: bool,
    ) -> Result<Box<dyn OutputLine>> {
        self.chip
            .request_output(self.offset, flags, consumer, initial)
    }
}

impl fmt::Debug for GpioDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioDesc")
            .field("chip", &self.chip.label())
            .field("offset", &self.offset)
            .finish()
    }
}

/// The set of currently registered line providers
#[derive(Default, Clone)]
pub struct ChipRegistry {
    chips: Vec<Arc<dyn GpioChip>>,
}

impl ChipRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider
    pub fn register(&mut self, chip: Arc<dyn GpioChip>) {
        log::debug!(
            "gpio: registered provider '{}' ({} lines)",
            chip.label(),
            chip.num_lines()
        );
        self.chips.push(chip);
    }

    /// First provider matching `pred`, in registration order
    pub fn find<F>(&self, mut pred: F) -> Option<Arc<dyn GpioChip>>
    where
        F: FnMut(&dyn GpioChip) -> bool,
    {
        self.chips.iter().find(|&c| pred(&**c)).cloned()
    }

    /// First provider whose label equals `label` exactly
    pub fn find_by_label(&self, label: &str) -> Option<Arc<dyn GpioChip>> {
        self.find(|chip| chip.label() == label)
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// True if no provider is registered
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Iterate over registered providers
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn GpioChip>> {
        self.chips.iter()
    }
}
