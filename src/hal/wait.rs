//! Bounded waits
//!
//! Every busy-wait in the drivers runs through a [`Deadline`]: a poll
//! budget derived from a [`WaitPolicy`], a delay between polls and an
//! optional [`CancelToken`]. [`WaitPolicy::indefinite`] keeps the receiver's
//! native "poll until the flag appears" behaviour for protocol tests.

use embedded_hal::delay::DelayNs;

use super::signal::CancelToken;
use crate::config::{DEFAULT_WAIT_POLLS, POLL_INTERVAL_US};
use crate::error::{Error, Result};

/// How long a wait may poll before giving up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between polls in microseconds
    pub poll_interval_us: u32,
    /// Poll budget, None waits forever
    pub max_polls: Option<u32>,
}

impl WaitPolicy {
    /// Poll until the condition holds, however long it takes
    #[must_use]
    pub const fn indefinite() -> Self {
        Self {
            poll_interval_us: POLL_INTERVAL_US,
            max_polls: None,
        }
    }

    /// Give up after `polls` unsuccessful polls
    #[must_use]
    pub const fn polls(polls: u32) -> Self {
        Self {
            poll_interval_us: POLL_INTERVAL_US,
            max_polls: Some(polls),
        }
    }

    /// Give up after roughly `ms` milliseconds at the default interval
    #[must_use]
    pub const fn timeout_ms(ms: u32) -> Self {
        Self::polls(ms.saturating_mul(1000) / POLL_INTERVAL_US)
    }

    /// Same budget with a different poll interval
    #[must_use]
    pub const fn with_interval_us(self, poll_interval_us: u32) -> Self {
        Self {
            poll_interval_us,
            max_polls: self.max_polls,
        }
    }

    /// Whether `polls` unsuccessful polls use up the budget
    #[must_use]
    pub const fn is_exhausted(self, polls: u32) -> bool {
        match self.max_polls {
            Some(max) => polls >= max,
            None => false,
        }
    }

    /// Start a wait
    #[must_use]
    pub const fn start<'c>(self, cancel: Option<&'c CancelToken>) -> Deadline<'c> {
        Deadline {
            policy: self,
            polls: 0,
            cancel,
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::polls(DEFAULT_WAIT_POLLS)
    }
}

/// A running wait
#[derive(Debug)]
pub struct Deadline<'c> {
    policy: WaitPolicy,
    polls: u32,
    cancel: Option<&'c CancelToken>,
}

impl Deadline<'_> {
    /// Account for one unsuccessful poll and sleep until the next one.
    ///
    /// Returns [`Error::Cancelled`] if the token fired and [`Error::Timeout`]
    /// once the budget is spent.
    pub fn tick<D: DelayNs>(&mut self, delay: &mut D) -> Result<()> {
        self.check()?;
        self.polls = self.polls.saturating_add(1);
        if self.policy.is_exhausted(self.polls) {
            return Err(Error::Timeout);
        }
        delay.delay_us(self.policy.poll_interval_us);
        Ok(())
    }

    /// Fail with [`Error::Cancelled`] if the token fired, without spending
    /// a poll
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Unsuccessful polls so far
    #[must_use]
    pub const fn polls(&self) -> u32 {
        self.polls
    }
}
