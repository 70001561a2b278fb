//! Command frames
//!
//! A command is `[opcode][args][payload]`, sent verbatim in one bus write.

use heapless::Vec;

use crate::config::COMMAND_CAPACITY;
use crate::error::{Error, Result};

/// Receiver opcodes
pub mod opcode {
    //! Command identifiers

    /// Read the reply of the previous command
    pub const RD_REPLY: u8 = 0x00;
    /// Power up the core
    pub const POWER_UP: u8 = 0x01;
    /// Load an image chunk from the host
    pub const HOST_LOAD: u8 = 0x04;
    /// Load an image from the receiver's flash (also `FLASH_SET_PROP_LIST`)
    pub const FLASH_LOAD: u8 = 0x05;
    /// Prepare for an image load
    pub const LOAD_INIT: u8 = 0x06;
    /// Boot the loaded image
    pub const BOOT: u8 = 0x07;
    /// Set a property
    pub const SET_PROPERTY: u8 = 0x13;
    /// Retrieve the digital service list
    pub const GET_DIGITAL_SERVICE_LIST: u8 = 0x80;
    /// Start a digital service
    pub const START_DIGITAL_SERVICE: u8 = 0x81;

    /// Tune FM
    pub const FM_TUNE_FREQ: u8 = 0x30;
    /// Seek FM
    pub const FM_SEEK_START: u8 = 0x31;
    /// FM signal quality
    pub const FM_RSQ_STATUS: u8 = 0x32;

    /// Tune DAB by frequency index
    pub const DAB_TUNE_FREQ: u8 = 0xB0;
    /// DAB acquisition status
    pub const DAB_DIGRAD_STATUS: u8 = 0xB2;
    /// DAB event status
    pub const DAB_GET_EVENT_STATUS: u8 = 0xB3;
    /// Program the DAB frequency table
    pub const DAB_SET_FREQ_LIST: u8 = 0xB8;
}

/// `FLASH_LOAD` sub-command selecting the property list
pub const FLASH_SET_PROP_LIST: u8 = 0x10;

/// An encoded command frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    frame: Vec<u8, COMMAND_CAPACITY>,
}

impl Command {
    /// Build a command with arguments only
    pub fn new(opcode: u8, args: &[u8]) -> Result<Self> {
        Self::with_payload(opcode, args, &[])
    }

    /// Build a command with arguments followed by a payload
    pub fn with_payload(opcode: u8, args: &[u8], payload: &[u8]) -> Result<Self> {
        let requested = 1 + args.len() + payload.len();
        if requested > COMMAND_CAPACITY {
            return Err(Error::Allocation {
                requested,
                capacity: COMMAND_CAPACITY,
            });
        }
        let mut frame = Vec::new();
        // Cannot fail: length checked above
        let _ = frame.push(opcode);
        let _ = frame.extend_from_slice(args);
        let _ = frame.extend_from_slice(payload);
        Ok(Self { frame })
    }

    /// Command identifier
    #[must_use]
    pub fn opcode(&self) -> u8 {
        self.frame[0]
    }

    /// Wire bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.frame
    }

    /// Wire length (1 + args + payload)
    #[must_use]
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    /// Never true: a frame always carries its opcode
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}
