//! I2C master sub-protocol
//!
//! Command codec for the adapter's binary I2C mode and the 128-address bus
//! scan. Every operation makes sure the device is in I2C mode first,
//! entering it once if needed.

use tracing::{debug, info, trace};

use crate::error::BusPirateError;
use crate::mode::{DeviceMode, ModeController};
use crate::pins::PinController;
use crate::protocol::commands::{
    bus_address, peripheral, I2cCommand, I2cSpeed, ACK_REPLY, MAX_BULK_PAYLOAD,
};

/// Response byte meaning the addressed device acknowledged
const BUS_ACK: u8 = 0x00;

/// An I2C session borrowing the adapter's controllers
pub struct I2c<'a> {
    modes: &'a mut ModeController,
    pins: &'a mut PinController,
}

impl<'a> I2c<'a> {
    /// Enter I2C mode and start a session
    pub fn new(
        modes: &'a mut ModeController,
        pins: &'a mut PinController,
    ) -> Result<Self, BusPirateError> {
        modes.enter_i2c_mode()?;
        Ok(Self { modes, pins })
    }

    fn ensure_mode(&mut self) -> Result<(), BusPirateError> {
        if self.modes.mode() != DeviceMode::BinaryI2c {
            debug!("I2C command from {} mode, re-entering I2C", self.modes.mode());
            self.modes.enter_i2c_mode()?;
        }
        Ok(())
    }

    /// Send a single-byte command that answers with the 0x01 ack
    fn simple(&mut self, cmd: I2cCommand) -> Result<(), BusPirateError> {
        debug_assert!(cmd.expects_ack());
        self.ensure_mode()?;
        let opcode = cmd.opcode();
        self.modes
            .exchange_mut()
            .write_find(&[opcode], ACK_REPLY)
            .map(|_| ())
            .map_err(|e| e.for_command(opcode))
    }

    /// Bus start condition
    pub fn start(&mut self) -> Result<(), BusPirateError> {
        self.simple(I2cCommand::Start)
    }

    /// Bus stop condition; `addr` is only used for logging
    pub fn stop(&mut self, addr: u8) -> Result<(), BusPirateError> {
        trace!("stop {:#04x}", addr);
        self.simple(I2cCommand::Stop)
    }

    /// Acknowledge the last byte read
    pub fn ack(&mut self) -> Result<(), BusPirateError> {
        self.simple(I2cCommand::Ack)
    }

    /// Decline the last byte read
    pub fn nack(&mut self) -> Result<(), BusPirateError> {
        self.simple(I2cCommand::Nack)
    }

    /// Clock in one byte from the bus
    pub fn read_byte(&mut self) -> Result<u8, BusPirateError> {
        self.ensure_mode()?;
        let opcode = I2cCommand::ReadByte.opcode();
        let bytes = self.modes.exchange_mut().write_read(&[opcode])?;
        bytes.first().copied().ok_or(BusPirateError::BadReply {
            command: opcode,
            received: bytes,
        })
    }

    /// Bulk-send 1..=16 bytes
    ///
    /// Returns the response with the command's own echo byte removed; what
    /// remains is one ack/nack status byte per payload byte.
    pub fn send_bytes(&mut self, payload: &[u8]) -> Result<Vec<u8>, BusPirateError> {
        if payload.is_empty() || payload.len() > MAX_BULK_PAYLOAD {
            return Err(BusPirateError::PayloadSize { len: payload.len() });
        }
        self.ensure_mode()?;

        let mut cmd = Vec::with_capacity(payload.len() + 1);
        cmd.push(I2cCommand::BulkSend(payload.len()).opcode());
        cmd.extend_from_slice(payload);

        let mut bytes = self.modes.exchange_mut().write_read(&cmd)?;
        if !bytes.is_empty() {
            bytes.remove(0);
        }
        Ok(bytes)
    }

    /// Bulk-send the 8-bit bus address `addr` followed by `payload`
    pub fn send_bytes_to(&mut self, addr: u8, payload: &[u8]) -> Result<Vec<u8>, BusPirateError> {
        let mut data = Vec::with_capacity(payload.len() + 1);
        data.push(addr);
        data.extend_from_slice(payload);
        self.send_bytes(&data)
    }

    fn peripheral(&mut self, bit: u8, on: bool) -> Result<(), BusPirateError> {
        self.ensure_mode()?;
        if on {
            self.pins.set_in(&mut *self.modes, bit, ACK_REPLY)
        } else {
            self.pins.set_out(&mut *self.modes, bit, ACK_REPLY)
        }
    }

    /// Switch the adapter's supply outputs
    pub fn power(&mut self, on: bool) -> Result<(), BusPirateError> {
        self.peripheral(peripheral::POWER, on)
    }

    /// Switch the on-board pull-up resistors
    pub fn pullups(&mut self, on: bool) -> Result<(), BusPirateError> {
        self.peripheral(peripheral::PULLUPS, on)
    }

    /// Switch the auxiliary output
    pub fn aux(&mut self, on: bool) -> Result<(), BusPirateError> {
        self.peripheral(peripheral::AUX, on)
    }

    /// Switch the chip-select line
    pub fn chip_select(&mut self, on: bool) -> Result<(), BusPirateError> {
        self.peripheral(peripheral::CHIP_SELECT, on)
    }

    /// Select the bus clock
    pub fn set_speed(&mut self, speed: I2cSpeed) -> Result<(), BusPirateError> {
        debug!("I2C speed {} kHz", speed.khz());
        self.simple(I2cCommand::SetSpeed(speed))
    }

    /// Probe every 7-bit address, write variant then read variant
    ///
    /// Returns the 8-bit bus addresses that acknowledged, in probe order.
    /// A failed probe leaves that variant out and the scan carries on.
    pub fn scan(&mut self) -> Vec<u8> {
        let mut found = Vec::new();

        for address in 0..=0x7Fu8 {
            for read in [false, true] {
                let variant = bus_address(address, read);
                let probed = self.probe(variant);
                // Release the bus whatever the probe said.
                let released = self.stop(variant);
                match (probed, released) {
                    (Ok(true), Ok(())) => {
                        info!("Found device at {:#04x}", variant);
                        found.push(variant);
                    }
                    (Ok(false), Ok(())) => {}
                    (Err(e), _) | (_, Err(e)) => debug!("scan {:#04x}: {}", variant, e),
                }
            }
        }

        found
    }

    fn probe(&mut self, variant: u8) -> Result<bool, BusPirateError> {
        self.start()?;
        let status = self.send_bytes_to(variant, &[])?;
        Ok(status.first() == Some(&BUS_ACK))
    }
}
