//! Peripheral Drivers
//!
//! Drivers for the external ICs on the receiver board: the `Si468x` DAB/FM
//! receiver on I2C and the SST25 serial flash holding the service directory.

pub mod si468x;
pub mod sst25;
