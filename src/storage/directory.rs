//! Flash-backed service directory
//!
//! One service per erase sector. The first sectors of the store are
//! reserved for control data; service slot `i` lives at
//! `base + sector * (i + reserved)`.
//!
//! ```text
//! control sector (base):   count: u16 LE   tag: u16 LE (STORE_FORMAT_TAG)
//! service slot:            len: u16 LE, then
//!                          frequency_index u8, service_id u32, info1 u8,
//!                          info2 u8, label [16], num_comp x (id u32, info u8)
//! ```
//!
//! Every save erases its sector first. An erased or untagged control sector
//! reads as an empty directory; an erased slot reads as [`Error::EmptySlot`].

use embedded_storage::nor_flash::NorFlash;

use crate::config::{
    FLASH_SECTOR_SIZE, RECORD_CAPACITY, RESERVED_SECTORS, STORE_BASE_OFFSET, STORE_FORMAT_TAG,
};
use crate::error::{Error, Result};
use crate::protocol::{Component, Components, Service, LABEL_LEN};
use crate::stream::{StreamReader, StreamWriter, PREFIX_LEN};

/// Prefix value of an erased slot
const ERASED_PREFIX: u16 = 0xFFFF;

/// Where the store lives on the flash device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreLayout {
    /// Offset of the control sector, sector aligned
    pub base_offset: u32,
    /// Erase unit of the device
    pub sector_size: u32,
    /// Sectors before the first service slot
    pub reserved_sectors: u32,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            base_offset: STORE_BASE_OFFSET,
            sector_size: FLASH_SECTOR_SIZE,
            reserved_sectors: RESERVED_SECTORS,
        }
    }
}

/// Service directory on a NOR flash device
pub struct DirectoryStore<F> {
    flash: F,
    layout: StoreLayout,
}

impl<F: NorFlash> DirectoryStore<F> {
    /// Create a store with the given layout
    pub const fn new(flash: F, layout: StoreLayout) -> Self {
        Self { flash, layout }
    }

    /// Layout in use
    #[must_use]
    pub const fn layout(&self) -> StoreLayout {
        self.layout
    }

    /// Number of service slots that fit on the device
    #[must_use]
    pub fn capacity_slots(&self) -> u16 {
        let usable = self
            .flash
            .capacity()
            .saturating_sub(self.layout.base_offset as usize);
        let sectors = usable / self.layout.sector_size as usize;
        let slots = sectors.saturating_sub(self.layout.reserved_sectors as usize);
        u16::try_from(slots).unwrap_or(u16::MAX)
    }

    /// Flash address of slot `index`
    pub fn slot_address(&self, index: u16) -> Result<u32> {
        if index >= self.capacity_slots() {
            return Err(Error::SlotOutOfRange(index));
        }
        let sector = u32::from(index) + self.layout.reserved_sectors;
        Ok(self.layout.base_offset + self.layout.sector_size * sector)
    }

    /// Erase slot `index` and persist `service` there
    pub fn save(&mut self, service: &Service, index: u16) -> Result<()> {
        let address = self.slot_address(index)?;
        let record = encode(service)?;
        self.erase_sector(address)?;
        self.flash
            .write(address, &record)
            .map_err(|e| Error::storage(&e))?;
        debug!(
            "store: slot {} <- {:#x} ({} bytes)",
            index,
            service.service_id(),
            record.len()
        );
        Ok(())
    }

    /// Read the service stored in slot `index`
    pub fn load(&mut self, index: u16) -> Result<Service> {
        let address = self.slot_address(index)?;
        let mut prefix = [0u8; PREFIX_LEN];
        self.read(address, &mut prefix)?;
        let declared = u16::from_le_bytes(prefix);
        if declared == ERASED_PREFIX {
            return Err(Error::EmptySlot(index));
        }

        let total = PREFIX_LEN + usize::from(declared);
        if total > RECORD_CAPACITY {
            return Err(Error::Malformed);
        }
        let mut buf = [0u8; RECORD_CAPACITY];
        self.read(address, &mut buf[..total])?;
        decode(&buf[..total])
    }

    /// Service count from the control sector, 0 if it was never written
    pub fn service_count(&mut self) -> Result<u16> {
        let mut control = [0u8; 4];
        self.read(self.layout.base_offset, &mut control)?;
        let tag = u16::from_le_bytes([control[2], control[3]]);
        if tag != STORE_FORMAT_TAG {
            return Ok(0);
        }
        Ok(u16::from_le_bytes([control[0], control[1]]))
    }

    /// Rewrite the control sector with `count`
    pub fn write_service_count(&mut self, count: u16) -> Result<()> {
        self.erase_sector(self.layout.base_offset)?;
        let c = count.to_le_bytes();
        let t = STORE_FORMAT_TAG.to_le_bytes();
        self.flash
            .write(self.layout.base_offset, &[c[0], c[1], t[0], t[1]])
            .map_err(|e| Error::storage(&e))?;
        info!("store: {} services persisted", count);
        Ok(())
    }

    /// Invalidate the directory by erasing the control sector. Slot
    /// contents stay until overwritten.
    pub fn clear(&mut self) -> Result<()> {
        self.erase_sector(self.layout.base_offset)
    }

    /// Borrow the flash device
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Release the flash device
    pub fn release(self) -> F {
        self.flash
    }

    fn erase_sector(&mut self, address: u32) -> Result<()> {
        self.flash
            .erase(address, address + self.layout.sector_size)
            .map_err(|e| Error::storage(&e))
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.flash.read(address, buf).map_err(|e| Error::storage(&e))
    }
}

/// Serialise a service record
fn encode(service: &Service) -> Result<heapless::Vec<u8, RECORD_CAPACITY>> {
    let mut w = StreamWriter::<RECORD_CAPACITY>::new();
    w.write_u8(service.frequency_index())?;
    w.write_u32(service.service_id())?;
    w.write_u8(service.info1())?;
    w.write_u8(service.info2())?;
    w.write_bytes(service.label())?;
    for component in service.components() {
        w.write_u32(component.component_id)?;
        w.write_u8(component.info)?;
    }
    Ok(w.finish()?)
}

/// Parse a service record, prefix included
fn decode(record: &[u8]) -> Result<Service> {
    let mut r = StreamReader::load(record)?;
    let frequency_index = r.read_u8()?;
    let service_id = r.read_u32()?;
    let info1 = r.read_u8()?;
    let info2 = r.read_u8()?;
    let mut label = [0u8; LABEL_LEN];
    r.read_bytes(&mut label)?;

    let mut components = Components::new();
    for _ in 0..(info2 & 0x0F) {
        let component = Component::new(r.read_u32()?, r.read_u8()?);
        components.push(component).map_err(|_| Error::Malformed)?;
    }
    if r.remaining() != 0 {
        return Err(Error::Malformed);
    }
    Service::new(frequency_index, service_id, info1, info2, label, components)
}
