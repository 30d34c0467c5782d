//! Adapter handle
//!
//! Ties one link, its mode controller and its pin masks together.

use tracing::info;

use crate::config::BusPirateConfig;
use crate::error::BusPirateError;
use crate::i2c::I2c;
use crate::mode::{DeviceMode, ModeController};
use crate::pins::PinController;
use crate::protocol::{CommunicationChannel, SerialLink, TimedExchange};

/// A connected adapter
pub struct BusPirate {
    modes: ModeController,
    pins: PinController,
}

impl BusPirate {
    /// Open the serial device named in `config`
    pub fn open(config: &BusPirateConfig) -> Result<Self, BusPirateError> {
        let link = SerialLink::open(&config.device, config.queue_capacity)?;
        Ok(Self::with_link(link, config))
    }

    /// Drive an adapter reached through an already-open channel
    pub fn from_channel(
        label: impl Into<String>,
        channel: Box<dyn CommunicationChannel>,
        config: &BusPirateConfig,
    ) -> Result<Self, BusPirateError> {
        let link = SerialLink::from_channel(label, channel, config.queue_capacity)?;
        Ok(Self::with_link(link, config))
    }

    fn with_link(link: SerialLink, config: &BusPirateConfig) -> Self {
        info!("Adapter on {}", link.path());
        let exchange = TimedExchange::new(link, config.timeouts);
        Self {
            modes: ModeController::new(exchange),
            pins: PinController::new(),
        }
    }

    /// Last confirmed mode
    pub fn mode(&self) -> DeviceMode {
        self.modes.mode()
    }

    /// Mode controller driving this adapter
    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    /// Mutable access to the mode controller
    pub fn modes_mut(&mut self) -> &mut ModeController {
        &mut self.modes
    }

    /// Last acknowledged pin masks
    pub fn pins(&self) -> &PinController {
        &self.pins
    }

    /// See [`ModeController::reset`]
    pub fn reset(&mut self) -> Result<(), BusPirateError> {
        self.modes.reset()
    }

    /// See [`ModeController::hardware_reset`]
    pub fn hardware_reset(&mut self) -> Result<(), BusPirateError> {
        self.modes.hardware_reset()
    }

    /// See [`ModeController::enter_binary_mode`]
    pub fn enter_binary_mode(&mut self) -> Result<(), BusPirateError> {
        self.modes.enter_binary_mode()
    }

    /// Mode name reported by the adapter
    pub fn get_mode(&mut self) -> Result<String, BusPirateError> {
        self.modes.get_mode()
    }

    /// Raw output of the short self-test
    pub fn short_self_test(&mut self) -> Result<Vec<u8>, BusPirateError> {
        self.modes.short_self_test()
    }

    /// Raw output of the long self-test
    pub fn long_self_test(&mut self) -> Result<Vec<u8>, BusPirateError> {
        self.modes.long_self_test()
    }

    /// Raise the pins in `mask`, expecting `expected` back
    pub fn set_high(&mut self, mask: u8, expected: &[u8]) -> Result<(), BusPirateError> {
        self.pins.set_high(&mut self.modes, mask, expected)
    }

    /// Drive the pins in `mask` low
    pub fn set_low(&mut self, mask: u8, expected: &[u8]) -> Result<(), BusPirateError> {
        self.pins.set_low(&mut self.modes, mask, expected)
    }

    /// Switch the pins in `mask` to input
    pub fn set_in(&mut self, mask: u8, expected: &[u8]) -> Result<(), BusPirateError> {
        self.pins.set_in(&mut self.modes, mask, expected)
    }

    /// Switch the pins in `mask` to output
    pub fn set_out(&mut self, mask: u8, expected: &[u8]) -> Result<(), BusPirateError> {
        self.pins.set_out(&mut self.modes, mask, expected)
    }

    /// Enter I2C mode and return a session over this adapter
    pub fn i2c(&mut self) -> Result<I2c<'_>, BusPirateError> {
        I2c::new(&mut self.modes, &mut self.pins)
    }

    /// Stop the reader thread and release the port
    pub fn close(self) {
        self.modes.into_exchange().into_link().close();
    }
}
