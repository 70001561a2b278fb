//! I2C Bus Abstractions
//!
//! Blocking addressed transport for the receiver. Wraps any
//! `embedded_hal::i2c::I2c` implementation; on the board that is the embassy
//! blocking I2C peripheral, on the host a mock or a simulated device.

use embedded_hal::i2c::I2c;

use crate::config::SI468X_I2C_ADDR;
use crate::error::{Error, Result};

/// I2C device address wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// `Si468x` receiver address
    pub const SI468X: Self = Self(SI468X_I2C_ADDR);

    /// Create from 7-bit address
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// Get the 7-bit address
    #[must_use]
    pub const fn addr(self) -> u8 {
        self.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for I2cAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{:#x}", self.0);
    }
}

/// Bus wrapper bound to one device address
///
/// Transfers block until complete and never report partial transfers; any
/// failure surfaces as [`Error::Transport`].
pub struct I2cBus<I2C> {
    i2c: I2C,
    addr: I2cAddress,
}

impl<I2C: I2c> I2cBus<I2C> {
    /// Create a new bus wrapper for the device at `addr`
    #[must_use]
    pub const fn new(i2c: I2C, addr: I2cAddress) -> Self {
        Self { i2c, addr }
    }

    /// Device address
    #[must_use]
    pub const fn address(&self) -> I2cAddress {
        self.addr
    }

    /// Write bytes to the device
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.i2c
            .write(self.addr.addr(), data)
            .map_err(|e| Error::transport(&e))
    }

    /// Read bytes from the device
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.i2c
            .read(self.addr.addr(), buffer)
            .map_err(|e| Error::transport(&e))
    }

    /// Release the underlying peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}
