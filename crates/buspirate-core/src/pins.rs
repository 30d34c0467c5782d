//! Peripheral pin masks
//!
//! Direction (bit set = input/hi-Z) and level (bit set = drive high) masks,
//! applied with the `0x40|mask` and `0x80|mask` binary commands. In the I2C
//! sub-mode direction changes go out as the peripheral config command, which
//! only carries the low nibble of the mask.

use tracing::{debug, warn};

use crate::error::BusPirateError;
use crate::mode::{DeviceMode, ModeController};
use crate::protocol::commands::{BitbangCommand, I2cCommand};

/// Last acknowledged pin masks
///
/// The starting values are the assumed power-on state; nothing confirms
/// them until the first successful apply.
#[derive(Debug, Clone, Default)]
pub struct PinController {
    direction_mask: u8,
    level_mask: u8,
}

impl PinController {
    /// Masks at their power-on values
    pub fn new() -> Self {
        Self::default()
    }

    /// Direction mask, bit set = input
    pub fn direction_mask(&self) -> u8 {
        self.direction_mask
    }

    /// Level mask, bit set = high
    pub fn level_mask(&self) -> u8 {
        self.level_mask
    }

    /// Raise (`high = true`) or lower the pins in `mask`
    ///
    /// On any failure the stored level mask is put back as it was.
    pub fn set_pins_high_low(
        &mut self,
        modes: &mut ModeController,
        mask: u8,
        high: bool,
        expected: &[u8],
    ) -> Result<(), BusPirateError> {
        let previous = self.level_mask;
        self.level_mask = apply(previous, mask, high);
        debug!("set_pins_high_low: {:#04x} -> {:#04x}", previous, self.level_mask);

        let cmd = BitbangCommand::SetPinsHighLow(self.level_mask);
        if let Err(e) = send(modes, cmd, expected) {
            warn!("Unable to set level mask {:#04x}: {}", self.level_mask, e);
            self.level_mask = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Switch the pins in `mask` to input (`input = true`) or output
    ///
    /// On any failure the stored direction mask is put back as it was.
    pub fn set_pins_in_out(
        &mut self,
        modes: &mut ModeController,
        mask: u8,
        input: bool,
        expected: &[u8],
    ) -> Result<(), BusPirateError> {
        let previous = self.direction_mask;
        self.direction_mask = apply(previous, mask, input);
        debug!("set_pins_in_out: {:#04x} -> {:#04x}", previous, self.direction_mask);

        let cmd = BitbangCommand::SetPinsInOut(self.direction_mask);
        if let Err(e) = send(modes, cmd, expected) {
            warn!("Unable to set direction mask {:#04x}: {}", self.direction_mask, e);
            self.direction_mask = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Drive the pins in `mask` high
    pub fn set_high(
        &mut self,
        modes: &mut ModeController,
        mask: u8,
        expected: &[u8],
    ) -> Result<(), BusPirateError> {
        self.set_pins_high_low(modes, mask, true, expected)
    }

    /// Drive the pins in `mask` low
    pub fn set_low(
        &mut self,
        modes: &mut ModeController,
        mask: u8,
        expected: &[u8],
    ) -> Result<(), BusPirateError> {
        self.set_pins_high_low(modes, mask, false, expected)
    }

    /// Switch the pins in `mask` to input
    pub fn set_in(
        &mut self,
        modes: &mut ModeController,
        mask: u8,
        expected: &[u8],
    ) -> Result<(), BusPirateError> {
        self.set_pins_in_out(modes, mask, true, expected)
    }

    /// Switch the pins in `mask` to output
    pub fn set_out(
        &mut self,
        modes: &mut ModeController,
        mask: u8,
        expected: &[u8],
    ) -> Result<(), BusPirateError> {
        self.set_pins_in_out(modes, mask, false, expected)
    }
}

fn apply(current: u8, mask: u8, set: bool) -> u8 {
    if set {
        current | mask
    } else {
        current & !mask
    }
}

fn send(
    modes: &mut ModeController,
    cmd: BitbangCommand,
    expected: &[u8],
) -> Result<(), BusPirateError> {
    // Pin commands exist in every binary mode, so only a non-binary state needs fixing.
    if !modes.mode().is_binary() {
        modes.enter_binary_mode()?;
    }
    let opcode = encode(modes.mode(), cmd);
    modes
        .exchange_mut()
        .write_find(&[opcode], expected)
        .map(|_| ())
        .map_err(|e| e.for_command(opcode))
}

fn encode(mode: DeviceMode, cmd: BitbangCommand) -> u8 {
    match (mode, cmd) {
        (DeviceMode::BinaryI2c, BitbangCommand::SetPinsInOut(mask)) => {
            I2cCommand::PeripheralConfig(mask).opcode()
        }
        _ => cmd.opcode(),
    }
}
