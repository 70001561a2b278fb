//! Interrupt-line signalling
//!
//! The receiver pulls its interrupt line whenever its status register
//! changes. The board's edge handler calls [`InterruptSignal::on_signal`]
//! from interrupt context; the driver drains the flag from the main thread
//! before refreshing its status mirror. One slot only: edges that arrive
//! before the driver looks collapse into a single refresh.

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-slot "status refresh pending" flag
#[derive(Debug, Default)]
pub struct InterruptSignal {
    pending: AtomicBool,
}

impl InterruptSignal {
    /// Create a cleared signal, usable in a `static`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Record an edge on the interrupt line. Safe to call from interrupt
    /// context.
    pub fn on_signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume the pending flag, returns whether it was set
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Check without consuming
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Cooperative cancellation for driver waits
///
/// Any context may cancel; the next poll of a wait holding this token
/// returns [`crate::error::Error::Cancelled`].
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    /// Create an armed token, usable in a `static`
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Re-arm after a cancellation was handled
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
