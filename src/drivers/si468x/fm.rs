//! FM image commands

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::command::{opcode, Command};
use super::status::Interrupt;
use super::Si468x;
use crate::error::{Error, Result};
use crate::types::{FmFrequency, ImageMode, SeekDirection};

/// `FM_RSQ_STATUS` reply length
const RSQ_REPLY_LEN: usize = 22;

/// `FM_SEEK_START` flag: stop on the first valid station
const SEEK_FORCE_WB: u8 = 0x10;

impl<I2C: I2c, D: DelayNs> Si468x<'_, I2C, D> {
    /// Tune to `frequency` and wait for seek/tune complete
    pub fn fm_tune(&mut self, frequency: FmFrequency) -> Result<()> {
        self.require_mode(ImageMode::Fm)?;
        info!("si468x: tune FM {} kHz", frequency.as_khz());
        let f = frequency.as_10khz().to_le_bytes();
        let command = Command::new(opcode::FM_TUNE_FREQ, &[0, f[0], f[1], 0, 0, 0])?;
        self.run_until(&command, Interrupt::Stc)
    }

    /// Seek to the next station in `direction`, optionally wrapping at the
    /// band edge, and return where the receiver stopped
    pub fn fm_seek(&mut self, direction: SeekDirection, wrap: bool) -> Result<FmFrequency> {
        self.require_mode(ImageMode::Fm)?;
        let up = u8::from(direction == SeekDirection::Up);
        let flags = (up << 1) | u8::from(wrap);
        let command = Command::new(opcode::FM_SEEK_START, &[SEEK_FORCE_WB, flags, 0, 0, 0])?;
        self.run_until(&command, Interrupt::Stc)?;

        let mut reply = [0u8; RSQ_REPLY_LEN];
        self.query(opcode::FM_RSQ_STATUS, &[0], &mut reply)?;
        let units = u16::from_le_bytes([reply[6], reply[7]]);
        let found = FmFrequency::from_10khz(units).ok_or(Error::Malformed)?;
        info!("si468x: seek stopped at {} kHz", found.as_khz());
        Ok(found)
    }
}
