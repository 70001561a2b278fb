//! Band Scan and Playback Tests
//!
//! Runs the scan state machine against the real driver talking to a
//! scripted receiver, with an in-memory flash behind the directory.
//! Run with: cargo test --test scan_tests

mod common;

use embedded_hal_mock::eh1::delay::NoopDelay;

use common::{service_list_payload, two_services, FakeSi468x, ServiceSpec};
use dab_firmware::config::FLASH_SECTOR_SIZE;
use dab_firmware::drivers::si468x::command::opcode;
use dab_firmware::drivers::si468x::Si468x;
use dab_firmware::error::Error;
use dab_firmware::hal::signal::{CancelToken, InterruptSignal};
use dab_firmware::hal::wait::WaitPolicy;
use dab_firmware::protocol::decode_service_list;
use dab_firmware::radio::playback::{play_slot, ServiceCursor};
use dab_firmware::radio::scan::{BandScanner, ScanConfig, ScanReport, ScanState};
use dab_firmware::storage::directory::{DirectoryStore, StoreLayout};
use dab_firmware::storage::ram::RamFlash;
use dab_firmware::types::{DabChannel, ImageMode};

const SECTOR: usize = FLASH_SECTOR_SIZE as usize;
type Flash = RamFlash<{ 16 * SECTOR }>;

type Radio<'a> = Si468x<'a, FakeSi468x<'a>, NoopDelay>;

fn radio<'a>(signal: &'a InterruptSignal, fake: FakeSi468x<'a>) -> Radio<'a> {
    let mut radio = Si468x::new(fake, NoopDelay::new(), signal, ImageMode::Dab);
    radio.set_interrupt_wait(true);
    radio
}

fn store() -> DirectoryStore<Flash> {
    DirectoryStore::new(Flash::new(), StoreLayout::default())
}

fn quick() -> ScanConfig {
    ScanConfig {
        service_list_wait: WaitPolicy::polls(5),
    }
}

// =============================================================================
// Full Scan Tests
// =============================================================================

#[test]
fn test_scan_persists_single_ensemble() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0];
    fake.svrlist_after = 2;
    fake.lists.insert(0, two_services());
    let mut radio = radio(&signal, fake);
    let mut store = store();

    let report = BandScanner::new(&mut radio, &mut store, ScanConfig::default())
        .run()
        .unwrap();
    assert_eq!(
        report,
        ScanReport {
            channels_scanned: 38,
            ensembles_found: 1,
            services_found: 2,
            channels_skipped: 0,
        }
    );

    let expected = decode_service_list(&two_services(), 0).unwrap();
    assert_eq!(store.service_count().unwrap(), 2);
    assert_eq!(store.load(0).unwrap(), expected[0]);
    assert_eq!(store.load(1).unwrap(), expected[1]);
    assert_eq!(store.load(2), Err(Error::EmptySlot(2)));

    let (fake, _) = radio.release();
    let tunes = fake.commands_with(opcode::DAB_TUNE_FREQ);
    assert_eq!(tunes.len(), 38);
    assert_eq!(tunes[0].as_slice(), &[0xB0, 0, 0, 0, 0, 0]);
    assert_eq!(tunes[37][2], 37);
    assert_eq!(fake.commands_with(opcode::DAB_GET_EVENT_STATUS).len(), 3);
    assert_eq!(fake.commands_with(opcode::GET_DIGITAL_SERVICE_LIST).len(), 1);
}

#[test]
fn test_scan_collects_several_ensembles() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0, 3];
    fake.lists.insert(0, two_services());
    fake.lists.insert(
        3,
        service_list_payload(&[ServiceSpec {
            service_id: 0xD00D,
            info1: 0x02,
            label: b"Gamma           ",
            components: &[(0x31, 0x00)],
        }]),
    );
    let mut radio = radio(&signal, fake);
    let mut store = store();

    let report = BandScanner::new(&mut radio, &mut store, quick())
        .run()
        .unwrap();
    assert_eq!(report.ensembles_found, 2);
    assert_eq!(report.services_found, 3);
    assert_eq!(store.service_count().unwrap(), 3);

    let gamma = store.load(2).unwrap();
    assert_eq!(gamma.service_id(), 0xD00D);
    assert_eq!(gamma.frequency_index(), 3);
}

#[test]
fn test_scan_of_empty_band() {
    let signal = InterruptSignal::new();
    let mut radio = radio(&signal, FakeSi468x::new(&signal));
    let mut store = store();
    store.write_service_count(4).unwrap();

    let report = BandScanner::new(&mut radio, &mut store, quick())
        .run()
        .unwrap();
    assert_eq!(report.ensembles_found, 0);
    assert_eq!(report.channels_scanned, 38);
    assert_eq!(store.service_count().unwrap(), 0);
}

// =============================================================================
// Per-Channel Failure Tests
// =============================================================================

#[test]
fn test_service_list_never_ready_skips_channel() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0];
    fake.svrlist_after = u32::MAX;
    fake.lists.insert(0, two_services());
    let mut radio = radio(&signal, fake);
    let mut store = store();

    let report = BandScanner::new(&mut radio, &mut store, quick())
        .run()
        .unwrap();
    assert_eq!(report.ensembles_found, 1);
    assert_eq!(report.channels_skipped, 1);
    assert_eq!(report.services_found, 0);
    assert_eq!(store.service_count().unwrap(), 0);

    let (fake, _) = radio.release();
    assert_eq!(fake.commands_with(opcode::DAB_GET_EVENT_STATUS).len(), 5);
    assert!(fake.commands_with(opcode::GET_DIGITAL_SERVICE_LIST).is_empty());
}

#[test]
fn test_rejected_service_list_skips_channel() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0, 1];
    fake.lists.insert(0, two_services());
    fake.lists.insert(1, two_services());
    fake.reject = vec![opcode::GET_DIGITAL_SERVICE_LIST];
    let mut radio = radio(&signal, fake);
    let mut store = store();

    let report = BandScanner::new(&mut radio, &mut store, quick())
        .run()
        .unwrap();
    assert_eq!(report.channels_skipped, 2);
    assert_eq!(report.services_found, 0);
    assert_eq!(store.service_count().unwrap(), 0);
}

#[test]
fn test_malformed_list_skips_channel() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![2];
    let mut payload = two_services();
    // Claim a third service that is not there
    payload[4] = 3;
    fake.lists.insert(2, payload);
    let mut radio = radio(&signal, fake);
    let mut store = store();

    let report = BandScanner::new(&mut radio, &mut store, quick())
        .run()
        .unwrap();
    assert_eq!(report.channels_skipped, 1);
    assert_eq!(store.service_count().unwrap(), 0);
}

#[test]
fn test_indefinite_wait_outlasts_default_budget() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0];
    fake.svrlist_after = 600;
    fake.lists.insert(0, two_services());
    let mut radio = radio(&signal, fake);
    let mut store = store();
    let config = ScanConfig {
        service_list_wait: WaitPolicy::indefinite(),
    };

    let report = BandScanner::new(&mut radio, &mut store, config)
        .run()
        .unwrap();
    assert_eq!(report.channels_skipped, 0);
    assert_eq!(report.services_found, 2);

    let (fake, _) = radio.release();
    assert_eq!(fake.commands_with(opcode::DAB_GET_EVENT_STATUS).len(), 601);
}

// =============================================================================
// Aborting Failure Tests
// =============================================================================

#[test]
fn test_cancelled_scan_leaves_directory_alone() {
    let signal = InterruptSignal::new();
    let token = CancelToken::new();
    token.cancel();
    let mut radio = radio(&signal, FakeSi468x::new(&signal)).with_cancel(&token);
    let mut store = store();
    store.write_service_count(4).unwrap();

    let result = BandScanner::new(&mut radio, &mut store, quick()).run();
    assert_eq!(result, Err(Error::Cancelled));
    assert_eq!(store.service_count().unwrap(), 4);

    let (fake, _) = radio.release();
    assert!(fake.opcodes().is_empty());
}

#[test]
fn test_cancel_stops_indefinite_service_list_wait() {
    let signal = InterruptSignal::new();
    let token = CancelToken::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0];
    fake.svrlist_after = u32::MAX;
    fake.lists.insert(0, two_services());
    let mut radio = radio(&signal, fake).with_cancel(&token);
    let mut store = store();
    let config = ScanConfig {
        service_list_wait: WaitPolicy::indefinite(),
    };
    let mut scan = BandScanner::new(&mut radio, &mut store, config);
    let ch0 = DabChannel::new(0).unwrap();

    scan.step().unwrap();
    scan.step().unwrap();
    assert_eq!(
        scan.step().unwrap(),
        ScanState::AwaitingServiceList {
            channel: ch0,
            polls: 1
        }
    );

    token.cancel();
    assert_eq!(scan.step(), Err(Error::Cancelled));
    assert_eq!(
        scan.state(),
        ScanState::AwaitingServiceList {
            channel: ch0,
            polls: 1
        }
    );
    drop(scan);

    let (fake, _) = radio.release();
    assert_eq!(fake.commands_with(opcode::DAB_GET_EVENT_STATUS).len(), 1);
}

#[test]
fn test_oversized_list_aborts_scan() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    let components: Vec<(u32, u8)> = (0..15).map(|i| (i, 0)).collect();
    let specs: Vec<ServiceSpec<'_>> = (0..32)
        .map(|id| ServiceSpec {
            service_id: id,
            info1: 0,
            label: b"Crowded         ",
            components: &components,
        })
        .collect();
    let payload = service_list_payload(&specs);
    let requested = payload.len() + 4;
    fake.valid = vec![0];
    fake.lists.insert(0, payload);
    let mut radio = radio(&signal, fake);
    let mut store = store();
    store.write_service_count(9).unwrap();

    let result = BandScanner::new(&mut radio, &mut store, quick()).run();
    assert_eq!(
        result,
        Err(Error::Allocation {
            requested,
            capacity: 2048,
        })
    );
    // Cleared at scan start, never rewritten
    assert_eq!(store.service_count().unwrap(), 0);
}

#[test]
fn test_full_store_aborts_scan() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0];
    fake.lists.insert(0, two_services());
    let mut radio = radio(&signal, fake);
    // Control sectors plus a single slot
    let mut store = DirectoryStore::new(RamFlash::<{ 3 * SECTOR }>::new(), StoreLayout::default());

    let result = BandScanner::new(&mut radio, &mut store, quick()).run();
    assert_eq!(
        result,
        Err(Error::Allocation {
            requested: 2,
            capacity: 1,
        })
    );
}

// =============================================================================
// State Machine Tests
// =============================================================================

#[test]
fn test_step_walks_through_states() {
    let signal = InterruptSignal::new();
    let mut fake = FakeSi468x::new(&signal);
    fake.valid = vec![0];
    fake.svrlist_after = 1;
    fake.lists.insert(0, two_services());
    let mut radio = radio(&signal, fake);
    let mut store = store();
    let mut scan = BandScanner::new(&mut radio, &mut store, quick());
    let ch0 = DabChannel::new(0).unwrap();

    assert_eq!(scan.state(), ScanState::Idle);
    assert_eq!(scan.step().unwrap(), ScanState::Tuning(ch0));
    assert_eq!(
        scan.step().unwrap(),
        ScanState::AwaitingServiceList {
            channel: ch0,
            polls: 0
        }
    );
    assert_eq!(
        scan.step().unwrap(),
        ScanState::AwaitingServiceList {
            channel: ch0,
            polls: 1
        }
    );
    assert_eq!(scan.step().unwrap(), ScanState::Decoding(ch0));
    assert_eq!(
        scan.step().unwrap(),
        ScanState::Persisting {
            channel: ch0,
            next: 0
        }
    );
    assert_eq!(
        scan.step().unwrap(),
        ScanState::Persisting {
            channel: ch0,
            next: 1
        }
    );
    assert_eq!(
        scan.step().unwrap(),
        ScanState::Persisting {
            channel: ch0,
            next: 2
        }
    );
    assert_eq!(
        scan.step().unwrap(),
        ScanState::Tuning(DabChannel::new(1).unwrap())
    );
    assert_eq!(scan.report().services_found, 2);
}

#[test]
fn test_finished_scan_stays_done() {
    let signal = InterruptSignal::new();
    let mut radio = radio(&signal, FakeSi468x::new(&signal));
    let mut store = store();
    let mut scan = BandScanner::new(&mut radio, &mut store, quick());

    scan.run().unwrap();
    assert_eq!(scan.state(), ScanState::Done);
    assert_eq!(scan.step().unwrap(), ScanState::Done);
}

// =============================================================================
// Playback Tests
// =============================================================================

fn scanned<'a>(signal: &'a InterruptSignal) -> (Radio<'a>, DirectoryStore<Flash>) {
    let mut fake = FakeSi468x::new(signal);
    fake.valid = vec![0];
    fake.lists.insert(0, two_services());
    let mut radio = radio(signal, fake);
    let mut store = store();
    BandScanner::new(&mut radio, &mut store, quick())
        .run()
        .unwrap();
    (radio, store)
}

#[test]
fn test_play_slot_starts_primary_component() {
    let signal = InterruptSignal::new();
    let (mut radio, mut store) = scanned(&signal);

    let service = play_slot(&mut radio, &mut store, 1).unwrap();
    assert_eq!(service.service_id(), 0xC3A5);

    let (fake, _) = radio.release();
    let last_tune = fake.commands_with(opcode::DAB_TUNE_FREQ).pop().unwrap();
    assert_eq!(last_tune[2], 0);
    let starts = fake.commands_with(opcode::START_DIGITAL_SERVICE);
    assert_eq!(starts.len(), 1);
    assert_eq!(
        starts[0].as_slice(),
        &[0x81, 0, 0, 0, 0xA5, 0xC3, 0, 0, 0x21, 0, 0, 0]
    );
}

#[test]
fn test_play_empty_slot_fails_without_tuning() {
    let signal = InterruptSignal::new();
    let (mut radio, mut store) = scanned(&signal);

    assert_eq!(play_slot(&mut radio, &mut store, 5), Err(Error::EmptySlot(5)));
    let (fake, _) = radio.release();
    assert!(fake.commands_with(opcode::START_DIGITAL_SERVICE).is_empty());
}

#[test]
fn test_cursor_walks_persisted_directory() {
    let signal = InterruptSignal::new();
    let (mut radio, mut store) = scanned(&signal);

    let mut cursor = ServiceCursor::from_store(&mut store).unwrap();
    assert_eq!(cursor.count(), 2);
    let first = play_slot(&mut radio, &mut store, cursor.current().unwrap()).unwrap();
    let second = play_slot(&mut radio, &mut store, cursor.next().unwrap()).unwrap();
    let wrapped = play_slot(&mut radio, &mut store, cursor.next().unwrap()).unwrap();
    assert_eq!(first.service_id(), 0xC221);
    assert_eq!(second.service_id(), 0xC3A5);
    assert_eq!(wrapped, first);
}
