//! Power and mode sequencing
//!
//! The controller has two control inputs:
//!
//! - `en` - held high to keep the controller in reset
//! - `wake` - sampled when `en` is released; high selects the bootloader
//!
//! | Mode       | en | wake |
//! |------------|----|------|
//! | `Cold`     | 1  | 0    |
//! | `Firmware` | 0  | 1    |
//! | `Nci`      | 0  | 0    |
//!
//! Every transition passes through reset: `en` goes high and `wake` low,
//! `wake` is raised for the bootloader, then for a powered target `en` is
//! released between two settle delays.

use crate::bus::Delay;
use crate::error::{Error, Result};
use crate::gpio::{get_output, ChipRegistry, FwNode, OutputLine};
use crate::mode::Mode;

/// Consumer label given to the enable line
pub const EN_CONSUMER: &str = "s3fwrn5_en";
/// Consumer label given to the wake line
pub const WAKE_CONSUMER: &str = "s3fwrn5_fw_wake";

/// The enable and wake outputs of one controller
pub struct PowerLines {
    en: Box<dyn OutputLine>,
    wake: Box<dyn OutputLine>,
    en_level: bool,
    wake_level: bool,
}

impl PowerLines {
    /// Wrap two already requested outputs, both currently low
    pub fn new(en: Box<dyn OutputLine>, wake: Box<dyn OutputLine>) -> Self {
        Self {
            en,
            wake,
            en_level: false,
            wake_level: false,
        }
    }

    /// Request `en` and `wake` for `fwnode` as low outputs
    ///
    /// Falls back to the deprecated `s3fwrn5,en` and `s3fwrn5,fw` functions
    /// when the current names are not described.
    pub fn acquire(fwnode: &FwNode, chips: &ChipRegistry) -> Result<Self> {
        let en = get_with_fallback(fwnode, chips, "en", "s3fwrn5,en", EN_CONSUMER)?;
        let wake = get_with_fallback(fwnode, chips, "wake", "s3fwrn5,fw", WAKE_CONSUMER)?;
        Ok(Self::new(en, wake))
    }

    /// Last level written to the enable line
    pub fn en_level(&self) -> bool {
        self.en_level
    }

    /// Last level written to the wake line
    pub fn wake_level(&self) -> bool {
        self.wake_level
    }

    fn drive_en(&mut self, level: bool) -> Result<()> {
        self.en.set_value(level)?;
        self.en_level = level;
        Ok(())
    }

    fn drive_wake(&mut self, level: bool) -> Result<()> {
        self.wake.set_value(level)?;
        self.wake_level = level;
        Ok(())
    }

    /// Drive the wake line
    pub(crate) fn set_wake(&mut self, level: bool) -> Result<()> {
        self.drive_wake(level)
    }

    /// Sequence the lines from `from` to `to`
    ///
    /// On failure the lines are put back to the levels they had before the
    /// call and [`Error::ModeTransitionFailed`] is returned.
    pub(crate) fn power_ctrl(
        &mut self,
        from: Mode,
        to: Mode,
        en_wait_ms: u32,
        delay: &dyn Delay,
    ) -> Result<()> {
        if from == to {
            log::debug!("power: already in {} mode", to);
            return Err(Error::ModeTransitionFailed { from, to });
        }

        let saved = (self.en_level, self.wake_level);
        if let Err(e) = self.sequence(to, en_wait_ms, delay) {
            log::warn!("power: {} -> {} failed: {}", from, to, e);
            self.restore(saved);
            return Err(Error::ModeTransitionFailed { from, to });
        }

        log::debug!(
            "power: {} -> {} (en={}, wake={})",
            from,
            to,
            self.en_level as u8,
            self.wake_level as u8
        );
        Ok(())
    }

    fn sequence(&mut self, to: Mode, en_wait_ms: u32, delay: &dyn Delay) -> Result<()> {
        self.drive_en(true)?;
        self.drive_wake(false)?;
        if to == Mode::Firmware {
            self.drive_wake(true)?;
        }
        if to != Mode::Cold {
            delay.delay_ms(en_wait_ms);
            self.drive_en(false)?;
            delay.delay_ms(en_wait_ms);
        }
        Ok(())
    }

    fn restore(&mut self, (en, wake): (bool, bool)) {
        if let Err(e) = self.drive_wake(wake) {
            log::error!("power: cannot restore wake line: {}", e);
        }
        if let Err(e) = self.drive_en(en) {
            log::error!("power: cannot restore enable line: {}", e);
        }
    }
}

fn get_with_fallback(
    fwnode: &FwNode,
    chips: &ChipRegistry,
    con_id: &str,
    legacy_con_id: &str,
    label: &str,
) -> Result<Box<dyn OutputLine>> {
    let mut line = match get_output(fwnode, Some(con_id), chips, label, false) {
        Err(Error::NotFound(_)) => {
            log::debug!("power: no '{}' line, trying '{}'", con_id, legacy_con_id);
            get_output(fwnode, Some(legacy_con_id), chips, label, false)?
        }
        other => other?,
    };
    line.set_consumer_name(label)?;
    Ok(line)
}
