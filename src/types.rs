//! Shared types used across the receiver firmware
//!
//! Domain types that keep tuning values inside the ranges the receiver
//! accepts.

use core::fmt;

use crate::config::{self, DAB_FREQUENCIES_KHZ};

/// Firmware image running on the receiver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImageMode {
    /// FM receiver image
    Fm,
    /// DAB receiver image
    #[default]
    Dab,
}

impl ImageMode {
    /// Address of this image in the receiver's flash
    #[must_use]
    pub const fn flash_address(self) -> u32 {
        match self {
            Self::Fm => config::image::FM,
            Self::Dab => config::image::DAB,
        }
    }
}

impl fmt::Display for ImageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fm => f.write_str("FM"),
            Self::Dab => f.write_str("DAB"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ImageMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Fm => defmt::write!(f, "FM"),
            Self::Dab => defmt::write!(f, "DAB"),
        }
    }
}

/// Index into the DAB frequency table
///
/// The receiver is tuned by table index, never by raw frequency.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DabChannel(u8);

impl DabChannel {
    /// Number of channels in the table
    pub const COUNT: usize = DAB_FREQUENCIES_KHZ.len();

    /// Create a channel, returns None past the end of the table
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Table index
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Centre frequency in kHz
    #[must_use]
    pub const fn frequency_khz(self) -> u32 {
        DAB_FREQUENCIES_KHZ[self.0 as usize]
    }

    /// Following channel, None at the end of the table
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    /// Iterate over the whole table in order
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }
}

impl fmt::Debug for DabChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DabChannel({}: {} kHz)", self.0, self.frequency_khz())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DabChannel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "#{} ({} kHz)", self.0, self.frequency_khz());
    }
}

/// FM broadcast frequency in 10 kHz units
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FmFrequency(u16);

impl FmFrequency {
    /// Lower band edge (87.5 MHz)
    pub const MIN_10KHZ: u16 = 8_750;

    /// Upper band edge (108 MHz)
    pub const MAX_10KHZ: u16 = 10_800;

    /// Create from 10 kHz units, returns None outside the FM band
    #[must_use]
    pub const fn from_10khz(units: u16) -> Option<Self> {
        if units >= Self::MIN_10KHZ && units <= Self::MAX_10KHZ {
            Some(Self(units))
        } else {
            None
        }
    }

    /// Create from kHz (rounded down to 10 kHz)
    #[must_use]
    pub const fn from_khz(khz: u32) -> Option<Self> {
        let units = khz / 10;
        if units > u16::MAX as u32 {
            return None;
        }
        Self::from_10khz(units as u16)
    }

    /// Value in 10 kHz units, as sent to the receiver
    #[must_use]
    pub const fn as_10khz(self) -> u16 {
        self.0
    }

    /// Value in kHz
    #[must_use]
    pub const fn as_khz(self) -> u32 {
        self.0 as u32 * 10
    }
}

impl fmt::Debug for FmFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FmFrequency({}.{:02} MHz)", self.0 / 100, self.0 % 100)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FmFrequency {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}.{} MHz", self.0 / 100, self.0 % 100);
    }
}

/// Seek direction for FM
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekDirection {
    /// Towards lower frequencies
    Down,
    /// Towards higher frequencies
    Up,
}
