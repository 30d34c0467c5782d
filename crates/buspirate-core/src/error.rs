//! Library errors

use thiserror::Error;

use crate::mode::DeviceMode;
use crate::protocol::{ExchangeError, TransportError};

/// Coarse classification of a [`BusPirateError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection itself failed
    Transport,
    /// The expected reply never showed up
    ProtocolMismatch,
    /// The device is in a mode that can't run the command
    Precondition,
    /// Bad arguments, rejected before any I/O
    Validation,
}

/// Errors that can occur while driving the adapter
#[derive(Error, Debug)]
pub enum BusPirateError {
    /// The link failed underneath the command
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Reply did not start with the expected bytes
    #[error("Unable to find {:?} in response {:?}", String::from_utf8_lossy(.expected), String::from_utf8_lossy(.received))]
    PatternNotFound {
        /// Prefix that was looked for
        expected: Vec<u8>,
        /// Bytes that actually arrived
        received: Vec<u8>,
    },

    /// A single-byte command got the wrong reply
    #[error("Command {command:#04x} did not respond correctly (got {received:02x?})")]
    BadReply {
        /// Opcode that was sent
        command: u8,
        /// Bytes that actually arrived
        received: Vec<u8>,
    },

    /// No console prompt after every reset attempt
    #[error("Reset failed, console prompt not found (last response {:?})", String::from_utf8_lossy(.last))]
    ResetFailed {
        /// Response to the final attempt
        last: Vec<u8>,
    },

    /// No binary banner within the attempt budget
    #[error("Unable to enter binary mode after {attempts} attempts")]
    BinaryModeFailed {
        /// Zero bytes sent
        attempts: usize,
    },

    /// Command not available in the current mode
    #[error("Command needs {required} mode, device is in {current}")]
    WrongMode {
        /// Mode the command runs in
        required: DeviceMode,
        /// Mode the device is in
        current: DeviceMode,
    },

    /// Bulk send length out of range
    #[error("Bulk payload of {len} bytes is outside 1..=16")]
    PayloadSize {
        /// Rejected length
        len: usize,
    },

    /// Config could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ExchangeError> for BusPirateError {
    fn from(e: ExchangeError) -> Self {
        BusPirateError::Transport(e.source)
    }
}

impl BusPirateError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BusPirateError::Transport(_) => ErrorKind::Transport,
            BusPirateError::PatternNotFound { .. }
            | BusPirateError::BadReply { .. }
            | BusPirateError::ResetFailed { .. }
            | BusPirateError::BinaryModeFailed { .. } => ErrorKind::ProtocolMismatch,
            BusPirateError::WrongMode { .. } => ErrorKind::Precondition,
            BusPirateError::PayloadSize { .. } | BusPirateError::Config(_) => {
                ErrorKind::Validation
            }
        }
    }

    /// Attribute a reply mismatch to the single-byte `command` that caused it
    pub(crate) fn for_command(self, command: u8) -> Self {
        match self {
            BusPirateError::PatternNotFound { received, .. } => {
                BusPirateError::BadReply { command, received }
            }
            other => other,
        }
    }

    /// Bytes the device actually sent, when the error carries them
    pub fn received(&self) -> Option<&[u8]> {
        match self {
            BusPirateError::PatternNotFound { received, .. }
            | BusPirateError::BadReply { received, .. } => Some(received),
            BusPirateError::ResetFailed { last } => Some(last),
            _ => None,
        }
    }
}
