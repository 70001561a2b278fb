//! DAB/FM Receiver Firmware Library
//!
//! Driver stack for an Si4684 DAB/FM receiver with a serial flash holding
//! the scanned service directory. Runs on an STM32F7 board under embassy
//! and, unchanged, on the host against simulated devices.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                         │
//! │        Band Scan        │        Playback by index           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 PROTOCOL / STORAGE LAYER                     │
//! │  Service list decoder  │  Directory store  │  Stream buffer  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  Si468x command engine  │  SST25 flash  │  I2C  │  Signal    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │        embassy-rs (EXTI on a high-priority executor)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Explicit context**: the receiver driver owns its status mirror, no
//!   globals besides the interrupt flag
//! - **Owned containers**: `heapless` collections sized in [`config`]
//! - **Bounded waits**: every poll loop has a budget and a cancel hook
//! - **No unsafe in application code**
//! - **Explicit error handling**: all fallible operations return `Result`

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Must come first so the logging macros are visible in every module
#[macro_use]
mod fmt;

// Re-export dependencies needed by the board binary
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// Bus wrapper, interrupt signal and bounded waits over `embedded-hal`.
pub mod hal;

/// Peripheral Drivers
///
/// `Si468x` receiver and SST25 serial flash.
pub mod drivers;

/// Radio Control Logic
///
/// Band scan state machine and playback by directory index.
pub mod radio;

/// Service Directory Storage
///
/// Fixed-slot service records on NOR flash.
pub mod storage;

/// Communication Protocols
///
/// Service list entities and wire decoder.
pub mod protocol;

/// Binary stream buffer for persisted records
pub mod stream;

/// Error types
pub mod error;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::drivers::si468x::status::{DigRadStatus, EventStatus, Interrupt};
    pub use crate::drivers::si468x::Si468x;
    pub use crate::error::{Error, Result};
    pub use crate::hal::signal::{CancelToken, InterruptSignal};
    pub use crate::hal::wait::WaitPolicy;
    pub use crate::protocol::{Component, Service, ServiceList};
    pub use crate::radio::playback::{play_slot, ServiceCursor};
    pub use crate::radio::scan::{BandScanner, DabReceiver, ScanConfig, ScanReport};
    pub use crate::storage::directory::{DirectoryStore, StoreLayout};

    // Common traits
    pub use embedded_hal::delay::DelayNs;
    pub use embedded_hal::digital::OutputPin;
    pub use embedded_hal::i2c::I2c;
    pub use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
}
