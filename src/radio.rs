//! Radio Control Logic
//!
//! Band scanning and playback on top of the receiver driver and the
//! directory store.

pub mod playback;
pub mod scan;
