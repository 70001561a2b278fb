//! Hardware Abstraction Layer
//!
//! Board-independent plumbing shared by the drivers: the addressed bus
//! wrapper, the interrupt-line signal and bounded waits. Everything here is
//! generic over `embedded-hal` traits so the drivers run unchanged against
//! embassy peripherals on the target and against mocks on the host.

pub mod i2c;
pub mod signal;
pub mod wait;
