//! Band Scan
//!
//! Sweeps the DAB frequency table, collecting every ensemble's services
//! into the directory store.
//!
//! ```text
//! Idle -> Tuning(i) -> [invalid] -> Tuning(i+1)
//!                   -> [valid]   -> AwaitingServiceList -> Decoding
//!                                -> Persisting -> Tuning(i+1)
//! Tuning(last+1) -> Done (service count written)
//! ```
//!
//! A scan starts by invalidating the control sector, so an interrupted scan
//! leaves an empty directory rather than a stale count. Device errors,
//! timeouts and malformed lists only skip the current channel; bus,
//! storage and capacity failures abort the scan. A fired cancel token
//! aborts the scan at the next step.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_storage::nor_flash::NorFlash;

use crate::config::{SERVICE_LIST_POLLS, SERVICE_LIST_POLL_DELAY_MS};
use crate::drivers::si468x::status::{DigRadStatus, EventStatus};
use crate::drivers::si468x::Si468x;
use crate::error::{Error, Result};
use crate::hal::signal::CancelToken;
use crate::hal::wait::WaitPolicy;
use crate::protocol::ServiceList;
use crate::storage::directory::DirectoryStore;
use crate::types::DabChannel;

/// Receiver operations the scan and playback logic need
pub trait DabReceiver {
    /// Tune to a table channel and wait for tune complete
    fn tune(&mut self, channel: DabChannel) -> Result<()>;
    /// Ensemble acquisition status
    fn digrad_status(&mut self) -> Result<DigRadStatus>;
    /// Service event status
    fn event_status(&mut self) -> Result<EventStatus>;
    /// Fetch and decode the service list, tagging it with `frequency_index`
    fn service_list(&mut self, frequency_index: u8) -> Result<ServiceList>;
    /// Start a service component
    fn start_service(&mut self, service_id: u32, component_id: u32) -> Result<()>;
    /// Sleep between polls
    fn pause_us(&mut self, us: u32);
    /// Token that cancels the receiver's waits
    fn cancel_token(&self) -> Option<&CancelToken> {
        None
    }
}

impl<I2C: I2c, D: DelayNs> DabReceiver for Si468x<'_, I2C, D> {
    fn tune(&mut self, channel: DabChannel) -> Result<()> {
        self.dab_tune(channel)
    }

    fn digrad_status(&mut self) -> Result<DigRadStatus> {
        Si468x::digrad_status(self)
    }

    fn event_status(&mut self) -> Result<EventStatus> {
        Si468x::event_status(self)
    }

    fn service_list(&mut self, frequency_index: u8) -> Result<ServiceList> {
        self.get_digital_service_list(frequency_index)
    }

    fn start_service(&mut self, service_id: u32, component_id: u32) -> Result<()> {
        self.start_digital_service(service_id, component_id)
    }

    fn pause_us(&mut self, us: u32) {
        self.delay_us(us);
    }

    fn cancel_token(&self) -> Option<&CancelToken> {
        Si468x::cancel_token(self)
    }
}

/// Scan tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanConfig {
    /// Event-status poll budget and interval while waiting for a
    /// service list. [`WaitPolicy::indefinite`] waits until cancelled.
    pub service_list_wait: WaitPolicy,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            service_list_wait: WaitPolicy::polls(SERVICE_LIST_POLLS)
                .with_interval_us(SERVICE_LIST_POLL_DELAY_MS * 1000),
        }
    }
}

/// Scan progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// Not started
    Idle,
    /// About to tune and check lock on a channel
    Tuning(DabChannel),
    /// Locked, polling event status for the service list
    AwaitingServiceList {
        /// Tuned channel
        channel: DabChannel,
        /// Polls so far
        polls: u32,
    },
    /// Service list ready, fetching it
    Decoding(DabChannel),
    /// Writing the fetched services to the store
    Persisting {
        /// Channel the list came from
        channel: DabChannel,
        /// Next list entry to write
        next: usize,
    },
    /// Table exhausted, count written
    Done,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScanState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "Idle"),
            Self::Tuning(c) => defmt::write!(f, "Tuning({})", c),
            Self::AwaitingServiceList { channel, polls } => {
                defmt::write!(f, "AwaitingServiceList({}, {})", channel, polls);
            }
            Self::Decoding(c) => defmt::write!(f, "Decoding({})", c),
            Self::Persisting { channel, next } => {
                defmt::write!(f, "Persisting({}, {})", channel, next);
            }
            Self::Done => defmt::write!(f, "Done"),
        }
    }
}

/// Outcome of a finished scan
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Channels tuned
    pub channels_scanned: u16,
    /// Channels with a valid ensemble
    pub ensembles_found: u16,
    /// Services persisted
    pub services_found: u16,
    /// Channels skipped after a device error, timeout or malformed list
    pub channels_skipped: u16,
}

/// Band scan state machine
pub struct BandScanner<'a, R, F> {
    receiver: &'a mut R,
    store: &'a mut DirectoryStore<F>,
    config: ScanConfig,
    state: ScanState,
    list: ServiceList,
    report: ScanReport,
}

impl<'a, R: DabReceiver, F: NorFlash> BandScanner<'a, R, F> {
    /// Create an idle scanner
    pub fn new(receiver: &'a mut R, store: &'a mut DirectoryStore<F>, config: ScanConfig) -> Self {
        Self {
            receiver,
            store,
            config,
            state: ScanState::Idle,
            list: ServiceList::new(),
            report: ScanReport::default(),
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// Progress so far
    #[must_use]
    pub const fn report(&self) -> ScanReport {
        self.report
    }

    /// Run the scan to completion
    pub fn run(&mut self) -> Result<ScanReport> {
        while self.step()? != ScanState::Done {}
        Ok(self.report)
    }

    /// Advance by one transition and return the new state.
    ///
    /// Stepping a finished scan stays in [`ScanState::Done`].
    pub fn step(&mut self) -> Result<ScanState> {
        if self.state != ScanState::Done {
            self.check_cancelled()?;
        }
        let next = match self.state {
            ScanState::Idle => self.start()?,
            ScanState::Tuning(channel) => self.recover(channel, Self::tune)?,
            ScanState::AwaitingServiceList { channel, polls } => {
                self.recover(channel, |s, c| s.await_service_list(c, polls))?
            }
            ScanState::Decoding(channel) => self.recover(channel, Self::decode)?,
            ScanState::Persisting { channel, next } => self.persist(channel, next)?,
            ScanState::Done => ScanState::Done,
        };
        self.state = next;
        Ok(next)
    }

    fn check_cancelled(&self) -> Result<()> {
        self.config
            .service_list_wait
            .start(self.receiver.cancel_token())
            .check()
            .inspect_err(|_| warn!("scan: cancelled"))
    }

    fn start(&mut self) -> Result<ScanState> {
        info!("scan: start");
        self.store.clear()?;
        self.report = ScanReport::default();
        match DabChannel::new(0) {
            Some(first) => Ok(ScanState::Tuning(first)),
            None => self.finish(),
        }
    }

    /// Run `f`, turning a per-channel error into a skip
    fn recover(
        &mut self,
        channel: DabChannel,
        f: impl FnOnce(&mut Self, DabChannel) -> Result<ScanState>,
    ) -> Result<ScanState> {
        match f(self, channel) {
            Err(e) if e.is_recoverable() => {
                warn!("scan: skipping #{}: {}", channel.index(), e);
                self.report.channels_skipped += 1;
                self.advance(channel)
            }
            other => other,
        }
    }

    fn tune(&mut self, channel: DabChannel) -> Result<ScanState> {
        self.report.channels_scanned += 1;
        self.receiver.tune(channel)?;
        let status = self.receiver.digrad_status()?;
        if status.valid() {
            info!(
                "scan: ensemble on #{} (rssi {}, snr {})",
                channel.index(),
                status.rssi(),
                status.snr()
            );
            self.report.ensembles_found += 1;
            Ok(ScanState::AwaitingServiceList { channel, polls: 0 })
        } else {
            self.advance(channel)
        }
    }

    fn await_service_list(&mut self, channel: DabChannel, polls: u32) -> Result<ScanState> {
        if self.receiver.event_status()?.service_list_ready() {
            return Ok(ScanState::Decoding(channel));
        }
        let polls = polls.saturating_add(1);
        let wait = self.config.service_list_wait;
        if wait.is_exhausted(polls) {
            return Err(Error::Timeout);
        }
        self.receiver.pause_us(wait.poll_interval_us);
        Ok(ScanState::AwaitingServiceList { channel, polls })
    }

    fn decode(&mut self, channel: DabChannel) -> Result<ScanState> {
        self.list = self.receiver.service_list(channel.index())?;
        Ok(ScanState::Persisting { channel, next: 0 })
    }

    fn persist(&mut self, channel: DabChannel, next: usize) -> Result<ScanState> {
        let Some(service) = self.list.get(next) else {
            self.list.clear();
            return self.advance(channel);
        };
        let slot = self.report.services_found;
        if slot >= self.store.capacity_slots() {
            return Err(Error::Allocation {
                requested: usize::from(slot) + 1,
                capacity: usize::from(self.store.capacity_slots()),
            });
        }
        self.store.save(service, slot)?;
        self.report.services_found += 1;
        Ok(ScanState::Persisting {
            channel,
            next: next + 1,
        })
    }

    fn advance(&mut self, channel: DabChannel) -> Result<ScanState> {
        match channel.next() {
            Some(next) => Ok(ScanState::Tuning(next)),
            None => self.finish(),
        }
    }

    fn finish(&mut self) -> Result<ScanState> {
        self.store.write_service_count(self.report.services_found)?;
        info!(
            "scan: done, {} services on {} ensembles",
            self.report.services_found,
            self.report.ensembles_found
        );
        Ok(ScanState::Done)
    }
}
