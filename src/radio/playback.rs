//! Playback by Directory Index
//!
//! The user steps through the persisted directory; each step reloads the
//! slot, retunes its ensemble and starts the service's primary component.

use embedded_storage::nor_flash::NorFlash;

use super::scan::DabReceiver;
use crate::error::{Error, Result};
use crate::protocol::Service;
use crate::storage::directory::DirectoryStore;
use crate::types::DabChannel;

/// Position in the persisted directory, wrapping at both ends
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceCursor {
    index: u16,
    count: u16,
}

impl ServiceCursor {
    /// Cursor over `count` persisted services, starting at the first
    #[must_use]
    pub const fn new(count: u16) -> Self {
        Self { index: 0, count }
    }

    /// Cursor over the directory currently persisted in `store`
    pub fn from_store<F: NorFlash>(store: &mut DirectoryStore<F>) -> Result<Self> {
        Ok(Self::new(store.service_count()?))
    }

    /// Selected slot, None for an empty directory
    #[must_use]
    pub const fn current(&self) -> Option<u16> {
        if self.count == 0 {
            None
        } else {
            Some(self.index)
        }
    }

    /// Persisted services
    #[must_use]
    pub const fn count(&self) -> u16 {
        self.count
    }

    /// Select the following slot
    pub fn next(&mut self) -> Option<u16> {
        if self.count > 0 {
            self.index = (self.index + 1) % self.count;
        }
        self.current()
    }

    /// Select the preceding slot
    pub fn prev(&mut self) -> Option<u16> {
        if self.count > 0 {
            self.index = self.index.checked_sub(1).unwrap_or(self.count - 1);
        }
        self.current()
    }
}

/// Load slot `index`, tune its ensemble and start its primary component
pub fn play_slot<R: DabReceiver, F: NorFlash>(
    receiver: &mut R,
    store: &mut DirectoryStore<F>,
    index: u16,
) -> Result<Service> {
    let service = store.load(index)?;
    let channel = DabChannel::new(service.frequency_index()).ok_or(Error::Malformed)?;
    let component = service.primary_component().ok_or(Error::Malformed)?;

    receiver.tune(channel)?;
    receiver.start_service(service.service_id(), component.component_id)?;
    info!(
        "playback: slot {} -> {:#x} on #{}",
        index,
        service.service_id(),
        channel.index()
    );
    Ok(service)
}
