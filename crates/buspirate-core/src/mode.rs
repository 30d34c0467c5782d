//! Mode negotiation
//!
//! Brings the adapter from whatever state it is in (console menu, half-typed
//! command, binary mode left over from an earlier session) into a known
//! binary protocol state. Replies are matched heuristically against the
//! start of whatever arrived within the read timeout.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{BusPirateError, ErrorKind};
use crate::protocol::commands::{
    BitbangCommand, ACK_REPLY, BINARY_BANNER, CONSOLE_ENTER, CONSOLE_PROMPT, CONSOLE_RESET,
    I2C_BANNER,
};
use crate::protocol::TimedExchange;

/// Carriage returns sent before giving up on the console prompt
pub const RESET_ATTEMPTS: usize = 10;

/// Zero bytes sent before giving up on binary mode
pub const BINARY_MODE_ATTEMPTS: usize = 24;

/// Operating mode of the adapter as last confirmed by a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceMode {
    /// Nothing confirmed yet
    Unknown,
    /// Interactive text console (`HiZ>` prompt)
    ConsoleText,
    /// Binary bitbang mode (`BBIO1`)
    BinaryBitbang,
    /// Binary I2C sub-mode (`I2C1`)
    BinaryI2c,
}

impl DeviceMode {
    /// True for either binary protocol mode
    pub fn is_binary(&self) -> bool {
        matches!(self, DeviceMode::BinaryBitbang | DeviceMode::BinaryI2c)
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceMode::Unknown => "unknown",
            DeviceMode::ConsoleText => "console",
            DeviceMode::BinaryBitbang => "binary bitbang",
            DeviceMode::BinaryI2c => "binary I2C",
        };
        f.write_str(name)
    }
}

/// Owns the exchange and the authoritative device mode
pub struct ModeController {
    exchange: TimedExchange,
    mode: DeviceMode,
}

impl ModeController {
    /// Wrap `exchange`; the mode starts out unknown
    pub fn new(exchange: TimedExchange) -> Self {
        Self {
            exchange,
            mode: DeviceMode::Unknown,
        }
    }

    /// Last confirmed mode
    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// Underlying exchange
    pub fn exchange(&self) -> &TimedExchange {
        &self.exchange
    }

    /// Mutable access to the underlying exchange
    pub fn exchange_mut(&mut self) -> &mut TimedExchange {
        &mut self.exchange
    }

    /// Give back the exchange
    pub fn into_exchange(self) -> TimedExchange {
        self.exchange
    }

    fn confirm(&mut self, mode: DeviceMode) {
        if self.mode != mode {
            info!("Mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Return the adapter to its console prompt
    ///
    /// From a binary mode a hardware reset is tried first; a reply mismatch
    /// there is logged and the console reset runs anyway.
    pub fn reset(&mut self) -> Result<(), BusPirateError> {
        if self.mode.is_binary() {
            debug!("Reset from {}, trying hardware reset", self.mode);
            match self.hardware_reset() {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Transport => return Err(e),
                Err(e) => warn!("Hardware reset failed, falling back to console reset: {}", e),
            }
        }

        self.console_reset()
    }

    fn console_reset(&mut self) -> Result<(), BusPirateError> {
        let mut last = Vec::new();

        for attempt in 1..=RESET_ATTEMPTS {
            let (bytes, found) = self
                .exchange
                .write_read_check(&[CONSOLE_ENTER], CONSOLE_PROMPT)?;
            if found {
                debug!("Reset: prompt found on attempt {}", attempt);
                self.confirm(DeviceMode::ConsoleText);
                return Ok(());
            }
            debug!(
                "Reset attempt {}: looking for prompt, got {:?}",
                attempt,
                String::from_utf8_lossy(&bytes)
            );
            last = bytes;
        }

        // Only after the whole budget: a banner here means binary mode is already up.
        if last.starts_with(BINARY_BANNER) {
            info!("Reset: device answered with binary banner, treating as reset");
            self.confirm(DeviceMode::ConsoleText);
            return Ok(());
        }

        let (bytes, found) = self
            .exchange
            .write_read_check(&[CONSOLE_RESET, CONSOLE_ENTER], CONSOLE_PROMPT)?;
        if found {
            self.confirm(DeviceMode::ConsoleText);
            return Ok(());
        }

        warn!(
            "Reset failed after {} attempts and '#', last response {:?}",
            RESET_ATTEMPTS,
            String::from_utf8_lossy(&bytes)
        );
        Err(BusPirateError::ResetFailed { last: bytes })
    }

    /// Reboot the adapter firmware from binary mode
    ///
    /// Enters binary mode first when needed. The read timeout is raised to
    /// the reset preset for the reset exchange only. The console is flushed
    /// twice afterwards even when the reset reply is missing; the result is
    /// that of the second flush.
    pub fn hardware_reset(&mut self) -> Result<(), BusPirateError> {
        if !self.mode.is_binary() {
            self.enter_binary_mode()?;
        }

        info!("Hardware reset");
        let reset_timeout = self.exchange.timeouts().reset();
        self.exchange.set_read_timeout(reset_timeout);
        let opcode = BitbangCommand::HardwareReset.opcode();
        let result = self.exchange.write_find(&[opcode], ACK_REPLY);
        self.exchange.restore_read_timeout();

        match result.map_err(|e| e.for_command(opcode)) {
            Ok(_) => self.confirm(DeviceMode::ConsoleText),
            Err(e) if e.kind() == ErrorKind::Transport => return Err(e),
            Err(e) => warn!("Hardware reset not acknowledged, flushing anyway: {}", e),
        }

        // Twice, to eat the banner the firmware prints after rebooting.
        if let Err(e) = self.console_reset() {
            if e.kind() == ErrorKind::Transport {
                return Err(e);
            }
            debug!("Hardware reset: first banner flush failed: {}", e);
        }
        self.console_reset()
    }

    /// Enter binary bitbang mode; a no-op from any binary mode
    pub fn enter_binary_mode(&mut self) -> Result<(), BusPirateError> {
        if self.mode.is_binary() {
            debug!("Already in {} mode", self.mode);
            return Ok(());
        }

        self.reset()?;

        for attempt in 1..=BINARY_MODE_ATTEMPTS {
            let (_, found) = self
                .exchange
                .write_read_check(&BitbangCommand::EnterBinary.to_bytes(), BINARY_BANNER)?;
            if found {
                debug!("Binary banner on attempt {}", attempt);
                self.confirm(DeviceMode::BinaryBitbang);
                return Ok(());
            }
        }

        warn!("No binary banner after {} attempts", BINARY_MODE_ATTEMPTS);
        Err(BusPirateError::BinaryModeFailed {
            attempts: BINARY_MODE_ATTEMPTS,
        })
    }

    /// Enter the binary I2C sub-mode, going through bitbang mode if needed
    pub fn enter_i2c_mode(&mut self) -> Result<(), BusPirateError> {
        match self.mode {
            DeviceMode::BinaryI2c => return Ok(()),
            DeviceMode::BinaryBitbang => {}
            _ => self.enter_binary_mode()?,
        }

        self.exchange
            .write_find(&BitbangCommand::SelectI2c.to_bytes(), I2C_BANNER)?;
        self.confirm(DeviceMode::BinaryI2c);
        Ok(())
    }

    /// Make sure bitbang-only commands can be sent
    fn require_bitbang(&mut self) -> Result<(), BusPirateError> {
        match self.mode {
            DeviceMode::BinaryBitbang => Ok(()),
            DeviceMode::BinaryI2c => Err(BusPirateError::WrongMode {
                required: DeviceMode::BinaryBitbang,
                current: self.mode,
            }),
            DeviceMode::Unknown | DeviceMode::ConsoleText => self.enter_binary_mode(),
        }
    }

    /// Ask the adapter which mode it is in
    pub fn get_mode(&mut self) -> Result<String, BusPirateError> {
        self.require_bitbang()?;
        let bytes = self
            .exchange
            .write_find(&BitbangCommand::GetMode.to_bytes(), b"")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Run the short self-test and return its raw output
    pub fn short_self_test(&mut self) -> Result<Vec<u8>, BusPirateError> {
        self.self_test(BitbangCommand::ShortSelfTest)
    }

    /// Run the long self-test and return its raw output
    pub fn long_self_test(&mut self) -> Result<Vec<u8>, BusPirateError> {
        self.self_test(BitbangCommand::LongSelfTest)
    }

    fn self_test(&mut self, cmd: BitbangCommand) -> Result<Vec<u8>, BusPirateError> {
        self.require_bitbang()?;
        let bytes = self.exchange.write_find(&cmd.to_bytes(), b"")?;
        info!("{:?} output: {:?}", cmd, String::from_utf8_lossy(&bytes));
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_modes() {
        assert!(!DeviceMode::Unknown.is_binary());
        assert!(!DeviceMode::ConsoleText.is_binary());
        assert!(DeviceMode::BinaryBitbang.is_binary());
        assert!(DeviceMode::BinaryI2c.is_binary());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(DeviceMode::BinaryI2c.to_string(), "binary I2C");
        assert_eq!(DeviceMode::ConsoleText.to_string(), "console");
    }
}
