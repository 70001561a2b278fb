//! Service Directory Storage
//!
//! Fixed-slot persistence of scanned services on NOR flash:
//! - `directory`: slot layout, record encoding and the control sector
//! - `ram`: in-memory NOR flash with real program semantics for host runs

pub mod directory;
pub mod ram;
