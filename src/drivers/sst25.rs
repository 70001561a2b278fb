//! `SST25VF016B` Serial Flash Driver
//!
//! 2 MiB SPI NOR flash holding the persisted service directory. Implements
//! the `embedded-storage` NOR traits so the directory store runs unchanged
//! on the chip and on [`crate::storage::ram::RamFlash`].
//!
//! Programming uses auto-address-increment word writes with software
//! end-of-write detection (status register polling); a trailing or leading
//! odd byte goes through single byte program. Every busy wait runs under a
//! [`WaitPolicy`] and an optional [`CancelToken`].

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};
use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashError, NorFlashErrorKind,
    ReadNorFlash,
};

use crate::config::{FLASH_CAPACITY, FLASH_SECTOR_SIZE};
use crate::error::Error;
use crate::hal::signal::CancelToken;
use crate::hal::wait::WaitPolicy;

/// Command opcodes
mod cmd {
    pub const READ_FAST: u8 = 0x0B;
    pub const WRITE_ENABLE: u8 = 0x06;
    pub const WRITE_DISABLE: u8 = 0x04;
    pub const ERASE_4K: u8 = 0x20;
    pub const AAI_WORD: u8 = 0xAD;
    pub const BYTE_PROGRAM: u8 = 0x02;
    pub const ENABLE_WRITE_STATUS: u8 = 0x50;
    pub const WRITE_STATUS: u8 = 0x01;
    pub const READ_STATUS: u8 = 0x05;
}

/// Status register: write in progress
const STATUS_BUSY: u8 = 0x01;

/// Errors from the flash driver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sst25Error<E> {
    /// SPI transfer failed
    Spi(E),
    /// The chip stayed busy past the wait budget
    Timeout,
    /// A busy wait was cancelled
    Cancelled,
    /// Address or length not aligned to the erase unit
    NotAligned,
    /// Access past the end of the chip
    OutOfBounds,
}

impl<E: core::fmt::Debug> NorFlashError for Sst25Error<E> {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::NotAligned => NorFlashErrorKind::NotAligned,
            Self::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Self::Spi(_) | Self::Timeout | Self::Cancelled => NorFlashErrorKind::Other,
        }
    }
}

impl<E> From<NorFlashErrorKind> for Sst25Error<E> {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => Self::NotAligned,
            _ => Self::OutOfBounds,
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for Sst25Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Spi(_) => defmt::write!(f, "Spi"),
            Self::Timeout => defmt::write!(f, "Timeout"),
            Self::Cancelled => defmt::write!(f, "Cancelled"),
            Self::NotAligned => defmt::write!(f, "NotAligned"),
            Self::OutOfBounds => defmt::write!(f, "OutOfBounds"),
        }
    }
}

/// 24-bit big-endian address bytes
const fn address_bytes(address: u32) -> [u8; 3] {
    [(address >> 16) as u8, (address >> 8) as u8, address as u8]
}

/// SST25 flash on an SPI device
pub struct Sst25Flash<'a, SPI, D> {
    spi: SPI,
    delay: D,
    wait: WaitPolicy,
    cancel: Option<&'a CancelToken>,
}

impl<'a, SPI: SpiDevice, D: DelayNs> Sst25Flash<'a, SPI, D> {
    /// Create a driver with the default busy-wait budget
    pub fn new(spi: SPI, delay: D) -> Self {
        Self {
            spi,
            delay,
            wait: WaitPolicy::default(),
            cancel: None,
        }
    }

    /// Abort busy waits once `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Replace the busy-wait budget
    pub fn set_wait_policy(&mut self, wait: WaitPolicy) {
        self.wait = wait;
    }

    /// Release the SPI device and delay
    pub fn release(self) -> (SPI, D) {
        (self.spi, self.delay)
    }

    /// Read the status register
    pub fn status(&mut self) -> Result<u8, Sst25Error<SPI::Error>> {
        let mut buf = [cmd::READ_STATUS, 0];
        self.spi.transfer_in_place(&mut buf).map_err(Sst25Error::Spi)?;
        Ok(buf[1])
    }

    /// Clear the block protection bits
    pub fn unprotect(&mut self) -> Result<(), Sst25Error<SPI::Error>> {
        self.command(&[cmd::ENABLE_WRITE_STATUS])?;
        self.command(&[cmd::WRITE_STATUS, 0x00])
    }

    /// Erase the 4 KiB sector containing `address`
    pub fn erase_sector(&mut self, address: u32) -> Result<(), Sst25Error<SPI::Error>> {
        let a = address_bytes(address & !(FLASH_SECTOR_SIZE - 1));
        self.unprotect()?;
        self.command(&[cmd::WRITE_ENABLE])?;
        self.command(&[cmd::ERASE_4K, a[0], a[1], a[2]])?;
        self.wait_ready()
    }

    /// Program bytes starting at `address`; the range must be erased
    pub fn program(&mut self, address: u32, data: &[u8]) -> Result<(), Sst25Error<SPI::Error>> {
        let mut address = address;
        let mut data = data;

        // AAI needs an even start address
        if address % 2 == 1 {
            if let Some((&first, rest)) = data.split_first() {
                self.program_byte(address, first)?;
                address += 1;
                data = rest;
            }
        }

        let mut words = data.chunks_exact(2);
        let mut started = false;
        for word in words.by_ref() {
            if started {
                self.command(&[cmd::AAI_WORD, word[0], word[1]])?;
            } else {
                let a = address_bytes(address);
                self.command(&[cmd::WRITE_ENABLE])?;
                self.command(&[cmd::AAI_WORD, a[0], a[1], a[2], word[0], word[1]])?;
                started = true;
            }
            self.wait_ready()?;
        }
        if started {
            self.command(&[cmd::WRITE_DISABLE])?;
        }

        if let [last] = words.remainder() {
            // Cannot overflow: range checked by the caller
            #[allow(clippy::cast_possible_truncation)]
            let tail = address + (data.len() - 1) as u32;
            self.program_byte(tail, *last)?;
        }
        Ok(())
    }

    /// Fast-read `buf.len()` bytes from `address`
    pub fn read_at(&mut self, address: u32, buf: &mut [u8]) -> Result<(), Sst25Error<SPI::Error>> {
        let a = address_bytes(address);
        self.spi
            .transaction(&mut [
                Operation::Write(&[cmd::READ_FAST, a[0], a[1], a[2], 0xFF]),
                Operation::Read(buf),
            ])
            .map_err(Sst25Error::Spi)
    }

    fn program_byte(&mut self, address: u32, byte: u8) -> Result<(), Sst25Error<SPI::Error>> {
        let a = address_bytes(address);
        self.command(&[cmd::WRITE_ENABLE])?;
        self.command(&[cmd::BYTE_PROGRAM, a[0], a[1], a[2], byte])?;
        self.wait_ready()
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), Sst25Error<SPI::Error>> {
        self.spi.write(bytes).map_err(Sst25Error::Spi)
    }

    fn wait_ready(&mut self) -> Result<(), Sst25Error<SPI::Error>> {
        let mut deadline = self.wait.start(self.cancel);
        loop {
            if deadline.check().is_err() {
                return Err(Sst25Error::Cancelled);
            }
            if self.status()? & STATUS_BUSY == 0 {
                return Ok(());
            }
            match deadline.tick(&mut self.delay) {
                Ok(()) => {}
                Err(Error::Cancelled) => return Err(Sst25Error::Cancelled),
                Err(_) => {
                    warn!("sst25: still busy after {} polls", deadline.polls());
                    return Err(Sst25Error::Timeout);
                }
            }
        }
    }
}

impl<SPI: SpiDevice, D: DelayNs> ErrorType for Sst25Flash<'_, SPI, D> {
    type Error = Sst25Error<SPI::Error>;
}

impl<SPI: SpiDevice, D: DelayNs> ReadNorFlash for Sst25Flash<'_, SPI, D> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        self.read_at(offset, bytes)
    }

    fn capacity(&self) -> usize {
        FLASH_CAPACITY
    }
}

impl<SPI: SpiDevice, D: DelayNs> NorFlash for Sst25Flash<'_, SPI, D> {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        trace!("sst25: erase {:#x}..{:#x}", from, to);
        for sector in (from..to).step_by(Self::ERASE_SIZE) {
            self.erase_sector(sector)?;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        trace!("sst25: write {} bytes at {:#x}", bytes.len(), offset);
        self.program(offset, bytes)
    }
}
