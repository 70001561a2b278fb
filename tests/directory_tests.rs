//! Service Directory Tests
//!
//! Tests for the flash-backed service directory on an in-memory NOR device.
//! Run with: cargo test --test directory_tests

mod common;

use embedded_storage::nor_flash::{NorFlash, NorFlashErrorKind, ReadNorFlash};

use dab_firmware::config::{FLASH_SECTOR_SIZE, STORE_FORMAT_TAG};
use dab_firmware::error::Error;
use dab_firmware::protocol::{decode_service_list, Component, Components, Service};
use dab_firmware::storage::directory::{DirectoryStore, StoreLayout};
use dab_firmware::storage::ram::{RamFlash, RamFlashError};

const SECTOR: usize = FLASH_SECTOR_SIZE as usize;
type Flash = RamFlash<{ 16 * SECTOR }>;

fn store() -> DirectoryStore<Flash> {
    DirectoryStore::new(Flash::new(), StoreLayout::default())
}

fn service(id: u32, freq_index: u8, components: &[(u32, u8)]) -> Service {
    let mut list = Components::new();
    for &(cid, info) in components {
        list.push(Component::new(cid, info)).unwrap();
    }
    Service::new(
        freq_index,
        id,
        0x02,
        components.len() as u8,
        *b"Station         ",
        list,
    )
    .unwrap()
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_slots_follow_reserved_sectors() {
    let s = store();
    assert_eq!(s.capacity_slots(), 14);
    assert_eq!(s.slot_address(0).unwrap(), 2 * FLASH_SECTOR_SIZE);
    assert_eq!(s.slot_address(13).unwrap(), 15 * FLASH_SECTOR_SIZE);
    assert_eq!(s.slot_address(14), Err(Error::SlotOutOfRange(14)));
}

#[test]
fn test_layout_offset_applies() {
    let layout = StoreLayout {
        base_offset: 4 * FLASH_SECTOR_SIZE,
        sector_size: FLASH_SECTOR_SIZE,
        reserved_sectors: 1,
    };
    let s = DirectoryStore::new(Flash::new(), layout);
    assert_eq!(s.capacity_slots(), 11);
    assert_eq!(s.slot_address(0).unwrap(), 5 * FLASH_SECTOR_SIZE);
}

// =============================================================================
// Record Tests
// =============================================================================

#[test]
fn test_save_then_load() {
    let mut s = store();
    let original = service(0xC221, 5, &[(0x11, 0x00), (0x12, 0x45)]);
    s.save(&original, 3).unwrap();
    assert_eq!(s.load(3).unwrap(), original);
}

#[test]
fn test_decoded_list_survives_storage() {
    let mut s = store();
    let list = decode_service_list(&common::two_services(), 9).unwrap();
    for (i, svc) in list.iter().enumerate() {
        s.save(svc, i as u16).unwrap();
    }
    assert_eq!(s.load(0).unwrap(), list[0]);
    assert_eq!(s.load(1).unwrap(), list[1]);
    assert_eq!(s.load(1).unwrap().frequency_index(), 9);
}

#[test]
fn test_record_bytes_on_flash() {
    let mut s = store();
    s.save(&service(0x0102_0304, 7, &[(0xAABB_CCDD, 0x05)]), 0)
        .unwrap();
    let base = 2 * SECTOR;
    let raw = &s.flash_mut().as_bytes()[base..base + 30];
    // len 28, then index, id LE, info1, info2
    assert_eq!(&raw[..9], &[28, 0, 7, 0x04, 0x03, 0x02, 0x01, 0x02, 0x01]);
    assert_eq!(&raw[9..25], b"Station         ");
    assert_eq!(&raw[25..30], &[0xDD, 0xCC, 0xBB, 0xAA, 0x05]);
}

#[test]
fn test_save_overwrites_used_slot() {
    let mut s = store();
    s.save(&service(1, 0, &[(1, 0), (2, 0), (3, 0)]), 0).unwrap();
    let replacement = service(2, 1, &[(9, 0)]);
    s.save(&replacement, 0).unwrap();
    assert_eq!(s.load(0).unwrap(), replacement);
}

#[test]
fn test_unerased_write_is_refused_by_device() {
    let mut s = store();
    s.save(&service(1, 0, &[(1, 0)]), 0).unwrap();
    let address = s.slot_address(0).unwrap();
    let flash = s.flash_mut();
    assert_eq!(
        flash.write(address, &[0xFF]),
        Err(RamFlashError::NotErased { address })
    );
    let mut prefix = [0u8; 2];
    flash.read(address, &mut prefix).unwrap();
    assert_eq!(prefix, [28, 0]);
}

#[test]
fn test_erased_slot_is_empty() {
    let mut s = store();
    assert_eq!(s.load(4), Err(Error::EmptySlot(4)));
}

#[test]
fn test_load_out_of_range() {
    let mut s = store();
    assert_eq!(s.load(200), Err(Error::SlotOutOfRange(200)));
    assert_eq!(
        s.save(&service(1, 0, &[]), 14),
        Err(Error::SlotOutOfRange(14))
    );
}

#[test]
fn test_corrupt_length_is_malformed() {
    let mut s = store();
    let address = s.slot_address(0).unwrap();
    s.flash_mut().write(address, &[0x00, 0x10]).unwrap();
    assert_eq!(s.load(0), Err(Error::Malformed));
}

#[test]
fn test_trailing_bytes_are_malformed() {
    let mut s = store();
    let address = s.slot_address(0).unwrap();
    // Declares 30 bytes but the component nibble accounts for 28
    let mut record = vec![30, 0, 0, 1, 0, 0, 0, 0x02, 0x01];
    record.extend_from_slice(b"Station         ");
    record.extend_from_slice(&[1, 0, 0, 0, 0, 0xEE, 0xEE]);
    s.flash_mut().write(address, &record).unwrap();
    assert_eq!(s.load(0), Err(Error::Malformed));
}

// =============================================================================
// Control Sector Tests
// =============================================================================

#[test]
fn test_fresh_device_has_no_services() {
    let mut s = store();
    assert_eq!(s.service_count().unwrap(), 0);
}

#[test]
fn test_count_is_tagged() {
    let mut s = store();
    s.write_service_count(7).unwrap();
    assert_eq!(s.service_count().unwrap(), 7);
    let tag = STORE_FORMAT_TAG.to_le_bytes();
    assert_eq!(&s.flash_mut().as_bytes()[..4], &[7, 0, tag[0], tag[1]]);
}

#[test]
fn test_count_can_be_rewritten() {
    let mut s = store();
    s.write_service_count(7).unwrap();
    s.write_service_count(3).unwrap();
    assert_eq!(s.service_count().unwrap(), 3);
}

#[test]
fn test_untagged_count_reads_zero() {
    let mut s = store();
    s.flash_mut().write(0, &[5, 0, 0x12, 0x34]).unwrap();
    assert_eq!(s.service_count().unwrap(), 0);
}

#[test]
fn test_clear_forgets_directory() {
    let mut s = store();
    s.save(&service(1, 0, &[(1, 0)]), 0).unwrap();
    s.write_service_count(1).unwrap();
    s.clear().unwrap();
    assert_eq!(s.service_count().unwrap(), 0);
}

#[test]
fn test_storage_errors_carry_kind() {
    let err = Error::storage(&RamFlashError::NotAligned);
    assert_eq!(err, Error::Storage(NorFlashErrorKind::NotAligned));
    assert!(!err.is_recoverable());
}
