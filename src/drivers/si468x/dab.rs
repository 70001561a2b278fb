//! DAB image commands
//!
//! Tuning is by index into the frequency table programmed with
//! [`Si468x::set_freq_list`]. All commands here fail with
//! [`Error::WrongMode`] on the FM image.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::command::{opcode, Command};
use super::status::{DigRadStatus, EventStatus, Interrupt};
use super::{Si468x, REPLY_HEADER_LEN};
use crate::config::{DAB_FREQUENCIES_KHZ, SERVICE_LIST_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::protocol::{decode_service_list, ServiceList};
use crate::types::{DabChannel, ImageMode};

/// Size prefix of the service list reply (header + size field)
const SERVICE_LIST_PREAMBLE: usize = 6;

/// Arguments of `DAB_SET_FREQ_LIST`: count, two pad bytes, then LE u32 kHz
const FREQ_LIST_ARGS: usize = 3 + 4 * DAB_FREQUENCIES_KHZ.len();

impl<I2C: I2c, D: DelayNs> Si468x<'_, I2C, D> {
    /// Program the receiver's DAB frequency table
    pub fn set_freq_list(&mut self) -> Result<()> {
        self.require_mode(ImageMode::Dab)?;
        let mut args = [0u8; FREQ_LIST_ARGS];
        #[allow(clippy::cast_possible_truncation)]
        let count = DAB_FREQUENCIES_KHZ.len() as u8;
        args[0] = count;
        for (chunk, khz) in args[3..].chunks_exact_mut(4).zip(DAB_FREQUENCIES_KHZ) {
            chunk.copy_from_slice(&khz.to_le_bytes());
        }
        self.send(opcode::DAB_SET_FREQ_LIST, &args)
    }

    /// Tune to `channel` and wait for seek/tune complete
    pub fn dab_tune(&mut self, channel: DabChannel) -> Result<()> {
        self.require_mode(ImageMode::Dab)?;
        info!(
            "si468x: tune DAB #{} ({} kHz)",
            channel.index(),
            channel.frequency_khz()
        );
        let command = Command::new(opcode::DAB_TUNE_FREQ, &[0, channel.index(), 0, 0, 0])?;
        self.run_until(&command, Interrupt::Stc)
    }

    /// Query ensemble acquisition status
    pub fn digrad_status(&mut self) -> Result<DigRadStatus> {
        self.require_mode(ImageMode::Dab)?;
        let mut reply = [0u8; REPLY_HEADER_LEN + DigRadStatus::LEN];
        self.query(opcode::DAB_DIGRAD_STATUS, &[0], &mut reply)?;
        let mut snapshot = [0u8; DigRadStatus::LEN];
        snapshot.copy_from_slice(&reply[REPLY_HEADER_LEN..]);
        Ok(DigRadStatus::from_bytes(snapshot))
    }

    /// Query digital service events
    pub fn event_status(&mut self) -> Result<EventStatus> {
        self.require_mode(ImageMode::Dab)?;
        let mut reply = [0u8; REPLY_HEADER_LEN + EventStatus::LEN];
        self.query(opcode::DAB_GET_EVENT_STATUS, &[0], &mut reply)?;
        let mut snapshot = [0u8; EventStatus::LEN];
        snapshot.copy_from_slice(&reply[REPLY_HEADER_LEN..]);
        Ok(EventStatus::from_bytes(snapshot))
    }

    /// Fetch and decode the service list of the tuned ensemble.
    ///
    /// Every service is tagged with `frequency_index`. A list larger than
    /// the response buffer fails with [`Error::Allocation`] before it is
    /// read.
    pub fn get_digital_service_list(&mut self, frequency_index: u8) -> Result<ServiceList> {
        self.require_mode(ImageMode::Dab)?;
        let mut preamble = [0u8; SERVICE_LIST_PREAMBLE];
        self.query(opcode::GET_DIGITAL_SERVICE_LIST, &[0], &mut preamble)?;
        let size = usize::from(u16::from_le_bytes([preamble[4], preamble[5]]));

        let requested = size + REPLY_HEADER_LEN;
        if requested > SERVICE_LIST_BUFFER_SIZE {
            return Err(Error::Allocation {
                requested,
                capacity: SERVICE_LIST_BUFFER_SIZE,
            });
        }
        let mut buffer = [0u8; SERVICE_LIST_BUFFER_SIZE];
        let response = &mut buffer[..requested];
        if self.read_response(response)? {
            return Err(Error::Device {
                opcode: opcode::GET_DIGITAL_SERVICE_LIST,
            });
        }
        let list = decode_service_list(&response[REPLY_HEADER_LEN..], frequency_index)?;
        debug!("si468x: {} services on #{}", list.len(), frequency_index);
        Ok(list)
    }

    /// Start decoding one component of a service
    pub fn start_digital_service(&mut self, service_id: u32, component_id: u32) -> Result<()> {
        self.require_mode(ImageMode::Dab)?;
        let s = service_id.to_le_bytes();
        let c = component_id.to_le_bytes();
        info!("si468x: start service {:#x}/{:#x}", service_id, component_id);
        self.send(
            opcode::START_DIGITAL_SERVICE,
            &[0, 0, 0, s[0], s[1], s[2], s[3], c[0], c[1], c[2], c[3]],
        )
    }

    /// Run a status query and read its reply into `reply`
    pub(super) fn query(&mut self, opcode: u8, args: &[u8], reply: &mut [u8]) -> Result<()> {
        self.send(opcode, args)?;
        if self.read_response(reply)? {
            return Err(Error::Device { opcode });
        }
        Ok(())
    }
}
