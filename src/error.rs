//! Error types
//!
//! All fallible driver, decoder and storage operations return [`Result<T>`]
//! with [`Error`]. Transport, device, capacity, timing and flash failures are
//! all captured here so callers can decide per variant whether to abort,
//! skip or retry.

use embedded_hal::i2c::ErrorKind as BusErrorKind;
use embedded_storage::nor_flash::NorFlashErrorKind;

/// Failure while writing or reading a [`crate::stream`] buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A byte run larger than the staging area was rejected
    #[error("byte run of {len} bytes exceeds the {max}-byte staging area")]
    Oversize {
        /// Length of the rejected run
        len: usize,
        /// Staging capacity
        max: usize,
    },
    /// The backing buffer is full
    #[error("stream backing buffer is full")]
    Capacity,
    /// A read would run past the declared record length
    #[error("read past end of stream")]
    Underrun,
}

/// The error type for all driver operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Bus write or read failed. Fatal for the current operation, never
    /// retried automatically.
    #[error("bus transport error: {0}")]
    Transport(BusErrorKind),

    /// The receiver flagged the command with its error bit.
    #[error("device rejected command 0x{opcode:02X}")]
    Device {
        /// Opcode of the rejected command
        opcode: u8,
    },

    /// A buffer could not hold the requested data. Decodes abort instead of
    /// truncating.
    #[error("need {requested} bytes but only {capacity} available")]
    Allocation {
        /// Bytes required
        requested: usize,
        /// Bytes available
        capacity: usize,
    },

    /// A wait exceeded its poll budget.
    #[error("timed out waiting for the receiver")]
    Timeout,

    /// A wait was cancelled through its cancel token.
    #[error("wait cancelled")]
    Cancelled,

    /// Serialisation buffer failure.
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),

    /// A response or stored record did not match its declared layout.
    #[error("malformed record")]
    Malformed,

    /// The flash device reported an error.
    #[error("storage error: {0:?}")]
    Storage(NorFlashErrorKind),

    /// The directory slot has never been written since its last erase.
    #[error("directory slot {0} is empty")]
    EmptySlot(u16),

    /// The directory slot lies outside the flash device or the persisted
    /// directory.
    #[error("directory slot {0} out of range")]
    SlotOutOfRange(u16),

    /// A control pin (receiver reset) could not be driven.
    #[error("control pin error")]
    Pin,

    /// The command belongs to an image (FM or DAB) that is not running.
    #[error("command not available in the current receiver mode")]
    WrongMode,
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Wrap a bus error
    pub fn transport<E: embedded_hal::i2c::Error>(err: &E) -> Self {
        Self::Transport(err.kind())
    }

    /// Wrap a flash error
    pub fn storage<E: embedded_storage::nor_flash::NorFlashError>(err: &E) -> Self {
        Self::Storage(err.kind())
    }

    /// Errors that only concern the current frequency during a scan
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Device { .. } | Self::Timeout | Self::Malformed)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StreamError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Oversize { len, max } => defmt::write!(f, "Oversize({}/{})", len, max),
            Self::Capacity => defmt::write!(f, "Capacity"),
            Self::Underrun => defmt::write!(f, "Underrun"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Transport(kind) => defmt::write!(f, "Transport({})", kind),
            Self::Device { opcode } => defmt::write!(f, "Device({:#x})", opcode),
            Self::Allocation {
                requested,
                capacity,
            } => defmt::write!(f, "Allocation({}/{})", requested, capacity),
            Self::Timeout => defmt::write!(f, "Timeout"),
            Self::Cancelled => defmt::write!(f, "Cancelled"),
            Self::Stream(e) => defmt::write!(f, "Stream({})", e),
            Self::Malformed => defmt::write!(f, "Malformed"),
            Self::Storage(_) => defmt::write!(f, "Storage"),
            Self::EmptySlot(i) => defmt::write!(f, "EmptySlot({})", i),
            Self::SlotOutOfRange(i) => defmt::write!(f, "SlotOutOfRange({})", i),
            Self::Pin => defmt::write!(f, "Pin"),
            Self::WrongMode => defmt::write!(f, "WrongMode"),
        }
    }
}
