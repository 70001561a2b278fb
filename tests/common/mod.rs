//! Shared test fixtures
//!
//! `FakeSi468x` is an in-process stand-in for the receiver on the I2C bus:
//! it records every command, raises the interrupt signal after each one and
//! answers `RD_REPLY` reads with a reply built from a small scripted model
//! (which channels lock, when the service list becomes ready, what it
//! contains).

#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;

use embedded_hal::i2c::{ErrorType, I2c, Operation};

use dab_firmware::config::DAB_FREQUENCIES_KHZ;
use dab_firmware::hal::signal::InterruptSignal;

pub const CTS: u8 = 0x80;
pub const ERR_CMD: u8 = 0x40;
pub const STC: u8 = 0x01;

/// Scripted receiver
pub struct FakeSi468x<'a> {
    signal: &'a InterruptSignal,
    reply: Vec<u8>,
    /// Every command frame written, `RD_REPLY` excluded
    pub commands: Vec<Vec<u8>>,
    /// Channel indices with a valid ensemble
    pub valid: Vec<u8>,
    /// Event-status polls before the service list is reported ready
    pub svrlist_after: u32,
    /// Service list payloads by channel index
    pub lists: HashMap<u8, Vec<u8>>,
    /// Opcodes answered with the command-error bit
    pub reject: Vec<u8>,
    /// Frequency reported by FM_RSQ_STATUS, 10 kHz units
    pub fm_frequency: u16,
    tuned: Option<u8>,
    event_polls: u32,
}

impl<'a> FakeSi468x<'a> {
    pub fn new(signal: &'a InterruptSignal) -> Self {
        Self {
            signal,
            reply: vec![CTS, 0, 0, 0],
            commands: Vec::new(),
            valid: Vec::new(),
            svrlist_after: 0,
            lists: HashMap::new(),
            reject: Vec::new(),
            fm_frequency: 10_110,
            tuned: None,
            event_polls: 0,
        }
    }

    /// Opcodes of all recorded commands, in order
    pub fn opcodes(&self) -> Vec<u8> {
        self.commands.iter().map(|c| c[0]).collect()
    }

    /// Recorded commands with the given opcode
    pub fn commands_with(&self, opcode: u8) -> Vec<&Vec<u8>> {
        self.commands.iter().filter(|c| c[0] == opcode).collect()
    }

    fn command(&mut self, frame: &[u8]) {
        self.commands.push(frame.to_vec());
        let opcode = frame[0];
        if self.reject.contains(&opcode) {
            self.reply = vec![CTS | ERR_CMD, 0, 0, 0];
            self.signal.on_signal();
            return;
        }

        self.reply = match opcode {
            // DAB_TUNE_FREQ
            0xB0 => {
                self.tuned = Some(frame[2]);
                self.event_polls = 0;
                vec![CTS | STC, 0, 0, 0]
            }
            // DAB_DIGRAD_STATUS
            0xB2 => self.digrad_reply(),
            // DAB_GET_EVENT_STATUS
            0xB3 => {
                self.event_polls += 1;
                let ready = u8::from(self.event_polls > self.svrlist_after);
                vec![CTS, 0, 0, 0, ready, ready, 1, 0]
            }
            // GET_DIGITAL_SERVICE_LIST
            0x80 => {
                let mut reply = vec![CTS, 0, 0, 0];
                let payload = self
                    .tuned
                    .and_then(|i| self.lists.get(&i))
                    .cloned()
                    .unwrap_or_else(|| service_list_payload(&[]));
                reply.extend_from_slice(&payload);
                reply
            }
            // FM_TUNE_FREQ, FM_SEEK_START
            0x30 | 0x31 => vec![CTS | STC, 0, 0, 0],
            // FM_RSQ_STATUS
            0x32 => {
                let mut reply = vec![CTS, 0, 0, 0, 0, 0];
                reply.extend_from_slice(&self.fm_frequency.to_le_bytes());
                reply.resize(22, 0);
                reply
            }
            _ => vec![CTS, 0, 0, 0],
        };
        self.signal.on_signal();
    }

    fn digrad_reply(&self) -> Vec<u8> {
        let mut reply = vec![CTS, 0, 0, 0];
        let mut status = [0u8; 19];
        if let Some(index) = self.tuned {
            if self.valid.contains(&index) {
                status[1] = 0x05; // VALID | ACQ
                status[2] = 40; // rssi
                status[3] = 18; // snr
            }
            let khz = DAB_FREQUENCIES_KHZ[usize::from(index)];
            status[8..12].copy_from_slice(&khz.to_le_bytes());
            status[12] = index;
        }
        reply.extend_from_slice(&status);
        reply
    }
}

impl ErrorType for FakeSi468x<'_> {
    type Error = Infallible;
}

impl I2c for FakeSi468x<'_> {
    fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let frame: &[u8] = bytes;
                    if frame != [0x00u8] {
                        self.command(frame);
                    }
                }
                Operation::Read(buf) => {
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = self.reply.get(i).copied().unwrap_or(0);
                    }
                }
            }
        }
        Ok(())
    }
}

/// One service for [`service_list_payload`]
pub struct ServiceSpec<'s> {
    pub service_id: u32,
    pub info1: u8,
    pub label: &'s [u8; 16],
    pub components: &'s [(u32, u8)],
}

/// Encode a service list payload: size, version, count, reserved, records
pub fn service_list_payload(services: &[ServiceSpec<'_>]) -> Vec<u8> {
    let mut payload = vec![0, 0, 1, 0, services.len() as u8, 0, 0, 0];
    for s in services {
        payload.extend_from_slice(&s.service_id.to_le_bytes());
        payload.push(s.info1);
        payload.push(s.components.len() as u8);
        payload.extend_from_slice(&[0, 0]);
        payload.extend_from_slice(s.label);
        for &(id, info) in s.components {
            payload.extend_from_slice(&id.to_le_bytes());
            payload.extend_from_slice(&[0, 0, 0]);
            payload.push(info);
        }
    }
    let size = payload.len() as u16;
    payload[..2].copy_from_slice(&size.to_le_bytes());
    payload
}

/// Two-service ensemble used by the scan scenarios
pub fn two_services() -> Vec<u8> {
    service_list_payload(&[
        ServiceSpec {
            service_id: 0x0000_C221,
            info1: 0x02,
            label: b"Radio Alpha     ",
            components: &[(0x0000_0011, 0x00)],
        },
        ServiceSpec {
            service_id: 0x0000_C3A5,
            info1: 0x14,
            label: b"Beta Beats      ",
            components: &[(0x0000_0021, 0x00), (0x0000_0022, 0x45)],
        },
    ])
}
