//! Serial Protocol Communication
//!
//! Transport and exchange layers for the adapter's byte-oriented protocol:
//! the serial link with its background reader, and the timed
//! write-then-collect exchange the handshakes are built on.

pub mod commands;
mod error;
mod exchange;
mod link;
pub mod serial;
mod stream;

pub use commands::{BitbangCommand, I2cCommand, I2cSpeed};
pub use error::TransportError;
pub use exchange::{response_matches, ExchangeError, TimedExchange};
pub use link::{Drained, SerialLink};
pub use serial::{default_device_path, list_ports, PortInfo};
pub use stream::{CommunicationChannel, SerialChannel};

/// Fixed adapter baud rate
pub const BAUD_RATE: u32 = 115200;

/// Read timeout for normal exchanges in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Read timeout for the hardware-reset exchange in milliseconds
pub const RESET_TIMEOUT_MS: u64 = 500;

/// How long one reader-thread read waits before re-checking for shutdown
pub const POLL_INTERVAL_MS: u64 = 10;

/// Reader-thread read buffer size
pub const READ_BUF_SIZE: usize = 1024;

/// Default capacity of the received-byte queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
