//! # Bus Pirate Core Library
//!
//! Host-side driver for a serial-attached Bus Pirate debug adapter.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A serial link with a background reader and a timed exchange primitive
//! - Mode negotiation (console reset, binary bitbang, binary I2C)
//! - Peripheral pin control with rollback on rejected commands
//! - The binary I2C master codec and a 128-address bus scan
//!
//! ## Example
//!
//! ```rust,ignore
//! use buspirate_core::{BusPirate, BusPirateConfig};
//!
//! let mut bp = BusPirate::open(&BusPirateConfig::with_device("/dev/ttyUSB0"))?;
//! let mut i2c = bp.i2c()?;
//! i2c.power(true)?;
//! i2c.pullups(true)?;
//! for addr in i2c.scan() {
//!     println!("found {:#04x}", addr);
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod i2c;
pub mod mode;
pub mod pins;
pub mod protocol;

pub use config::{BusPirateConfig, TimeoutConfig};
pub use device::BusPirate;
pub use error::{BusPirateError, ErrorKind};
pub use i2c::I2c;
pub use mode::{DeviceMode, ModeController};
pub use pins::PinController;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{BusPirateConfig, TimeoutConfig};
    pub use crate::device::BusPirate;
    pub use crate::error::{BusPirateError, ErrorKind};
    pub use crate::mode::DeviceMode;
    pub use crate::protocol::{I2cSpeed, TransportError};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
