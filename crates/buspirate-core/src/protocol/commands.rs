//! Protocol commands
//!
//! Opcode tables for the binary bitbang mode and the binary I2C sub-mode,
//! plus the reply literals the handshakes look for.

use serde::{Deserialize, Serialize};

/// Console prompt printed by the adapter in its text mode
pub const CONSOLE_PROMPT: &[u8] = b"\r\nHiZ>";

/// Banner returned once binary bitbang mode is active
pub const BINARY_BANNER: &[u8] = b"BBIO1";

/// Banner returned once the I2C sub-mode is active
pub const I2C_BANNER: &[u8] = b"I2C1";

/// Single-byte acknowledgement used by most binary commands
pub const ACK_REPLY: &[u8] = &[0x01];

/// Carriage return sent to wake the console
pub const CONSOLE_ENTER: u8 = 0x0D;

/// Console command that reboots the adapter's firmware
pub const CONSOLE_RESET: u8 = b'#';

/// Largest payload a single bulk-send command can carry
pub const MAX_BULK_PAYLOAD: usize = 16;

/// Commands understood in binary bitbang mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitbangCommand {
    /// Enter (or stay in) binary mode; repeated until `BBIO1` appears
    EnterBinary,

    /// Query the current mode name
    GetMode,

    /// Switch into the I2C sub-mode
    SelectI2c,

    /// Reset the adapter firmware
    HardwareReset,

    /// Short self-test
    ShortSelfTest,

    /// Long self-test
    LongSelfTest,

    /// Set the pin direction mask (low 6 bits)
    SetPinsInOut(u8),

    /// Set the pin level mask (low 7 bits)
    SetPinsHighLow(u8),
}

impl BitbangCommand {
    /// Wire opcode for this command
    pub fn opcode(&self) -> u8 {
        match self {
            BitbangCommand::EnterBinary => 0x00,
            BitbangCommand::GetMode => 0x01,
            BitbangCommand::SelectI2c => 0x02,
            BitbangCommand::HardwareReset => 0x0F,
            BitbangCommand::ShortSelfTest => 0x10,
            BitbangCommand::LongSelfTest => 0x11,
            // Upper bits carry the opcode, so the mask can't spill into them.
            BitbangCommand::SetPinsInOut(mask) => 0x40 | (mask & 0x3F),
            BitbangCommand::SetPinsHighLow(mask) => 0x80 | (mask & 0x7F),
        }
    }

    /// Encoded single-byte command
    pub fn to_bytes(&self) -> [u8; 1] {
        [self.opcode()]
    }
}

/// I2C bus speed presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum I2cSpeed {
    /// ~5 kHz
    Khz5,
    /// ~50 kHz
    Khz50,
    /// ~100 kHz
    Khz100,
    /// ~400 kHz
    Khz400,
}

impl I2cSpeed {
    /// Speed-select code placed in the low bits of the opcode
    pub fn code(&self) -> u8 {
        match self {
            I2cSpeed::Khz5 => 0x00,
            I2cSpeed::Khz50 => 0x01,
            I2cSpeed::Khz100 => 0x02,
            I2cSpeed::Khz400 => 0x03,
        }
    }

    /// Nominal clock in kHz
    pub fn khz(&self) -> u32 {
        match self {
            I2cSpeed::Khz5 => 5,
            I2cSpeed::Khz50 => 50,
            I2cSpeed::Khz100 => 100,
            I2cSpeed::Khz400 => 400,
        }
    }
}

/// Commands understood in the binary I2C sub-mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum I2cCommand {
    /// Start condition
    Start,
    /// Stop condition
    Stop,
    /// Clock in one byte
    ReadByte,
    /// Ack the byte just read
    Ack,
    /// Nack the byte just read
    Nack,
    /// Bulk send header for `n` bytes, `n` in 1..=16
    BulkSend(usize),
    /// Peripheral config (power, pull-ups, aux, cs) in the low nibble
    PeripheralConfig(u8),
    /// Bus clock select
    SetSpeed(I2cSpeed),
}

impl I2cCommand {
    /// Wire opcode for this command
    ///
    /// `BulkSend` must already be validated by the caller; lengths outside
    /// 1..=16 are clamped into the nibble.
    pub fn opcode(&self) -> u8 {
        match self {
            I2cCommand::Start => 0x02,
            I2cCommand::Stop => 0x03,
            I2cCommand::ReadByte => 0x04,
            I2cCommand::Ack => 0x06,
            I2cCommand::Nack => 0x07,
            I2cCommand::BulkSend(n) => 0x10 | ((n.saturating_sub(1) as u8) & 0x0F),
            I2cCommand::PeripheralConfig(bits) => 0x40 | (bits & 0x0F),
            I2cCommand::SetSpeed(speed) => 0x60 | speed.code(),
        }
    }

    /// Check if the adapter answers this command with the 0x01 ack
    pub fn expects_ack(&self) -> bool {
        !matches!(self, I2cCommand::ReadByte | I2cCommand::BulkSend(_))
    }
}

/// Peripheral line bits shared by the pin masks and the I2C config command
pub mod peripheral {
    /// Supply outputs
    pub const POWER: u8 = 0x08;
    /// On-board pull-ups
    pub const PULLUPS: u8 = 0x04;
    /// Auxiliary pin
    pub const AUX: u8 = 0x02;
    /// Chip-select pin
    pub const CHIP_SELECT: u8 = 0x01;
}

/// Combine a 7-bit address with the direction bit
pub fn bus_address(address: u8, read: bool) -> u8 {
    ((address & 0x7F) << 1) | u8::from(read)
}
