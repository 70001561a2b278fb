//! Status register model
//!
//! [`InterruptStatus`] mirrors the first status byte the receiver returns
//! on every read. [`DigRadStatus`] and [`EventStatus`] are snapshots of the
//! DAB status replies, copied from offset 4 of the response.

use core::fmt;

/// Bits of the interrupt/status byte
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Interrupt {
    /// Seek/tune complete
    Stc = 0,
    /// Audio control fault (FM)
    Acf = 1,
    /// RDS data available (FM)
    Rds = 2,
    /// Signal quality changed
    Rsq = 3,
    /// Digital service event
    Dsrv = 4,
    /// Digital radio acquisition changed
    Dacq = 5,
    /// Last command failed
    ErrCmd = 6,
    /// Clear to send the next command
    Cts = 7,
}

impl Interrupt {
    /// Bit mask in the status byte
    #[must_use]
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stc => "STC",
            Self::Acf => "ACF",
            Self::Rds => "RDS",
            Self::Rsq => "RSQ",
            Self::Dsrv => "DSRV",
            Self::Dacq => "DACQ",
            Self::ErrCmd => "ERR_CMD",
            Self::Cts => "CTS",
        };
        f.write_str(name)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Interrupt {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "bit {}", *self as u8);
    }
}

/// Mirror of the receiver's interrupt/status byte
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptStatus(u8);

impl InterruptStatus {
    /// Wrap a raw status byte
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw status byte
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether `flag` is set
    #[must_use]
    pub const fn is_set(self, flag: Interrupt) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Clear `flag` ahead of a command that will raise it
    pub fn clear(&mut self, flag: Interrupt) {
        self.0 &= !flag.mask();
    }

    /// Whether a wait for `flag` is over.
    ///
    /// A wait for CTS also ends on ERR_CMD, so a failed command releases its
    /// caller, which then reads the error from the reply header.
    #[must_use]
    pub const fn satisfies(self, flag: Interrupt) -> bool {
        match flag {
            Interrupt::Cts => self.is_set(Interrupt::Cts) || self.is_set(Interrupt::ErrCmd),
            other => self.is_set(other),
        }
    }
}

impl fmt::Debug for InterruptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterruptStatus({:#010b})", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InterruptStatus {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u8:08b}", self.0);
    }
}

/// Snapshot of `DAB_DIGRAD_STATUS` (reply bytes 4..23)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DigRadStatus([u8; DigRadStatus::LEN]);

impl DigRadStatus {
    /// Snapshot length
    pub const LEN: usize = 19;

    /// Copy a snapshot out of a reply buffer's status data
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Raw snapshot
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Ensemble acquired and the signal is usable
    #[must_use]
    pub const fn valid(&self) -> bool {
        self.0[1] & 0x01 != 0
    }

    /// Ensemble acquisition complete
    #[must_use]
    pub const fn acquired(&self) -> bool {
        self.0[1] & 0x04 != 0
    }

    /// FIC decoder reports errors
    #[must_use]
    pub const fn fic_error(&self) -> bool {
        self.0[1] & 0x08 != 0
    }

    /// Audio hard-muted
    #[must_use]
    pub const fn hard_mute(&self) -> bool {
        self.0[1] & 0x10 != 0
    }

    /// Received signal strength in dBµV
    #[must_use]
    pub const fn rssi(&self) -> i8 {
        self.0[2] as i8
    }

    /// Signal to noise ratio in dB
    #[must_use]
    pub const fn snr(&self) -> i8 {
        self.0[3] as i8
    }

    /// FIC quality, 0-100
    #[must_use]
    pub const fn fic_quality(&self) -> u8 {
        self.0[4]
    }

    /// Tuned frequency in kHz
    #[must_use]
    pub const fn tune_frequency_khz(&self) -> u32 {
        u32::from_le_bytes([self.0[8], self.0[9], self.0[10], self.0[11]])
    }

    /// Tuned table index
    #[must_use]
    pub const fn tune_index(&self) -> u8 {
        self.0[12]
    }
}

/// Snapshot of `DAB_GET_EVENT_STATUS` (reply bytes 4..8)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventStatus([u8; EventStatus::LEN]);

impl EventStatus {
    /// Snapshot length
    pub const LEN: usize = 4;

    /// Copy a snapshot out of a reply buffer's status data
    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Raw snapshot
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Service list changed since the last acknowledged event
    #[must_use]
    pub const fn service_list_interrupt(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Service list is ready to be read
    #[must_use]
    pub const fn service_list_ready(&self) -> bool {
        self.0[1] & 0x01 != 0
    }

    /// Service list version
    #[must_use]
    pub const fn service_list_version(&self) -> u16 {
        u16::from_le_bytes([self.0[2], self.0[3]])
    }
}
