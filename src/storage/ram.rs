//! In-memory NOR flash
//!
//! Behaves like the SST25 program model: erase sets a whole sector to
//! 0xFF, a write may only clear bits. A write that would set a bit is
//! rejected and leaves the contents unchanged.

use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashError, NorFlashErrorKind,
    ReadNorFlash,
};

use crate::config::FLASH_SECTOR_SIZE;

/// Errors from [`RamFlash`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RamFlashError {
    /// Range not aligned to the erase unit
    NotAligned,
    /// Range past the end of the device
    OutOfBounds,
    /// Write would set a bit that is currently clear
    NotErased {
        /// First offending address
        address: u32,
    },
}

impl NorFlashError for RamFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::NotAligned => NorFlashErrorKind::NotAligned,
            Self::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Self::NotErased { .. } => NorFlashErrorKind::Other,
        }
    }
}

impl From<NorFlashErrorKind> for RamFlashError {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => Self::NotAligned,
            _ => Self::OutOfBounds,
        }
    }
}

/// `SIZE` bytes of NOR flash in RAM, starting fully erased
pub struct RamFlash<const SIZE: usize> {
    data: [u8; SIZE],
    erase_count: u32,
}

impl<const SIZE: usize> RamFlash<SIZE> {
    /// Create an erased device
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: [0xFF; SIZE],
            erase_count: 0,
        }
    }

    /// Raw contents
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SIZE] {
        &self.data
    }

    /// Sector erases performed so far
    #[must_use]
    pub const fn erase_count(&self) -> u32 {
        self.erase_count
    }
}

impl<const SIZE: usize> Default for RamFlash<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> ErrorType for RamFlash<SIZE> {
    type Error = RamFlashError;
}

impl<const SIZE: usize> ReadNorFlash for RamFlash<SIZE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        let start = offset as usize;
        bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SIZE
    }
}

impl<const SIZE: usize> NorFlash for RamFlash<SIZE> {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        self.data[from as usize..to as usize].fill(0xFF);
        self.erase_count += (to - from) / FLASH_SECTOR_SIZE;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        let start = offset as usize;
        let target = &mut self.data[start..start + bytes.len()];
        if let Some(i) = target
            .iter()
            .zip(bytes)
            .position(|(&old, &new)| new & !old != 0)
        {
            // Bounded by capacity, which fits the u32 address space
            #[allow(clippy::cast_possible_truncation)]
            let address = offset + i as u32;
            return Err(RamFlashError::NotErased { address });
        }
        for (old, new) in target.iter_mut().zip(bytes) {
            *old &= new;
        }
        Ok(())
    }
}
