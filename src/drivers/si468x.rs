//! `Si468x` DAB/FM Receiver Driver
//!
//! Command/response engine for the Si4684 digital baseband receiver on the
//! I2C bus.
//!
//! Every command is written as one frame and answered through `RD_REPLY`.
//! Completion is signalled on the interrupt line: the board calls
//! [`InterruptSignal::on_signal`] on each edge and the driver refreshes its
//! [`InterruptStatus`] mirror only when that flag is pending. Before the
//! patch is loaded the interrupt line is not configured, so boot commands
//! run without interrupt wait.
//!
//! All waits run under the driver's [`WaitPolicy`] and optional
//! [`CancelToken`].

pub mod boot;
pub mod command;
pub mod dab;
pub mod fm;
pub mod status;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use self::command::{opcode, Command};
use self::status::{Interrupt, InterruptStatus};
use crate::error::{Error, Result};
use crate::hal::i2c::{I2cAddress, I2cBus};
use crate::hal::signal::{CancelToken, InterruptSignal};
use crate::hal::wait::{Deadline, WaitPolicy};
use crate::types::ImageMode;

/// Bytes of the reply header returned for every command
pub const REPLY_HEADER_LEN: usize = 4;

/// Error bit in the first reply byte
const REPLY_ERR_CMD: u8 = 0x40;

/// `Si468x` driver context
///
/// Owns the bus and the interrupt-status mirror; borrows the interrupt
/// signal written by the board's edge handler.
pub struct Si468x<'a, I2C, D> {
    bus: I2cBus<I2C>,
    delay: D,
    status: InterruptStatus,
    signal: &'a InterruptSignal,
    cancel: Option<&'a CancelToken>,
    wait: WaitPolicy,
    mode: ImageMode,
    interrupt_wait: bool,
}

impl<'a, I2C: I2c, D: DelayNs> Si468x<'a, I2C, D> {
    /// Create a driver for a receiver that will run `mode`.
    ///
    /// Interrupt wait starts disabled; [`Self::init`] enables it once the
    /// patch is running.
    pub fn new(i2c: I2C, delay: D, signal: &'a InterruptSignal, mode: ImageMode) -> Self {
        Self {
            bus: I2cBus::new(i2c, I2cAddress::SI468X),
            delay,
            status: InterruptStatus::default(),
            signal,
            cancel: None,
            wait: WaitPolicy::default(),
            mode,
            interrupt_wait: false,
        }
    }

    /// Attach a cancel token checked on every poll
    #[must_use]
    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Replace the wait policy used by all polling loops
    pub fn set_wait_policy(&mut self, wait: WaitPolicy) {
        self.wait = wait;
    }

    /// Current wait policy
    #[must_use]
    pub const fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    /// Enable or disable interrupt wait for [`Self::run`]
    pub fn set_interrupt_wait(&mut self, enabled: bool) {
        self.interrupt_wait = enabled;
    }

    /// Whether [`Self::run`] waits for CTS on the interrupt line
    #[must_use]
    pub const fn interrupt_wait(&self) -> bool {
        self.interrupt_wait
    }

    /// Image the receiver is running
    #[must_use]
    pub const fn mode(&self) -> ImageMode {
        self.mode
    }

    /// Cancel token attached with [`Self::with_cancel`]
    #[must_use]
    pub const fn cancel_token(&self) -> Option<&'a CancelToken> {
        self.cancel
    }

    /// Last mirrored interrupt status
    #[must_use]
    pub const fn interrupt_status(&self) -> InterruptStatus {
        self.status
    }

    /// Block on the driver's delay
    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Block on the driver's delay, microseconds
    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Release the bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.bus.release(), self.delay)
    }

    /// Transmit `command`, optionally wait for CTS, then read the 4-byte
    /// reply header.
    ///
    /// Returns whether the receiver set the command-error bit. Without
    /// `use_interrupt` the status mirror is left untouched.
    ///
    /// Only CTS is cleared before the write. An ERR_CMD bit still mirrored
    /// from an earlier rejected command satisfies the CTS wait at once, so
    /// the header is then read without waiting for an interrupt edge.
    pub fn execute(&mut self, command: &Command, use_interrupt: bool) -> Result<bool> {
        trace!("si468x: cmd {:#x} ({} bytes)", command.opcode(), command.len());
        if use_interrupt {
            self.status.clear(Interrupt::Cts);
        }
        self.bus.write(command.as_bytes())?;
        if use_interrupt {
            self.wait_for_interrupt(Interrupt::Cts)?;
        }
        let mut header = [0u8; REPLY_HEADER_LEN];
        self.read_response(&mut header)
    }

    /// Execute with the driver's interrupt-wait setting and turn a
    /// command-error bit into [`Error::Device`]
    pub fn run(&mut self, command: &Command) -> Result<()> {
        if self.execute(command, self.interrupt_wait)? {
            warn!("si468x: cmd {:#x} rejected", command.opcode());
            return Err(Error::Device {
                opcode: command.opcode(),
            });
        }
        Ok(())
    }

    /// Build and run a command without payload
    pub fn send(&mut self, opcode: u8, args: &[u8]) -> Result<()> {
        self.run(&Command::new(opcode, args)?)
    }

    /// Issue `RD_REPLY` and read `buffer.len()` bytes of reply.
    ///
    /// Returns whether bit 6 of the first byte (command error) is set.
    pub fn read_response(&mut self, buffer: &mut [u8]) -> Result<bool> {
        self.bus.write(&[opcode::RD_REPLY])?;
        self.bus.read(buffer)?;
        Ok(buffer.first().is_some_and(|b| b & REPLY_ERR_CMD != 0))
    }

    /// Poll the status mirror until `flag` is set.
    ///
    /// The mirror is refreshed from the receiver only when the interrupt
    /// signal is pending. A wait for [`Interrupt::Cts`] also ends on
    /// [`Interrupt::ErrCmd`]; the caller then reads the error from the
    /// reply header.
    pub fn wait_for_interrupt(&mut self, flag: Interrupt) -> Result<()> {
        let mut deadline = self.wait.start(self.cancel);
        deadline.check()?;
        loop {
            if self.signal.take() {
                self.refresh_status(&mut deadline)?;
            }
            if self.status.satisfies(flag) {
                return Ok(());
            }
            deadline.tick(&mut self.delay).inspect_err(|_| {
                warn!(
                    "si468x: gave up waiting for {} after {} polls",
                    flag,
                    deadline.polls()
                );
            })?;
        }
    }

    /// Read the status byte into the mirror.
    ///
    /// The receiver answers 0x00 while it is still busy; such reads are
    /// repeated under the wait policy.
    pub fn update_interrupts(&mut self) -> Result<()> {
        let mut deadline = self.wait.start(self.cancel);
        self.refresh_status(&mut deadline)
    }

    /// Status refresh spending polls from the caller's `deadline`
    fn refresh_status(&mut self, deadline: &mut Deadline<'_>) -> Result<()> {
        let mut byte = [0u8; 1];
        loop {
            self.read_response(&mut byte)?;
            if byte[0] != 0 {
                break;
            }
            deadline.tick(&mut self.delay)?;
        }
        self.status = InterruptStatus::from_bits(byte[0]);
        trace!("si468x: status {:#x}", byte[0]);
        Ok(())
    }

    /// Clear `flag`, run `command`, then wait for `flag`.
    ///
    /// Used for commands that complete asynchronously (tune, seek).
    fn run_until(&mut self, command: &Command, flag: Interrupt) -> Result<()> {
        self.status.clear(flag);
        self.run(command)?;
        self.wait_for_interrupt(flag)
    }

    /// Fail with [`Error::WrongMode`] unless the receiver runs `mode`
    fn require_mode(&self, mode: ImageMode) -> Result<()> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(Error::WrongMode)
        }
    }

    /// Write one property
    pub fn set_property(&mut self, property: u16, value: u16) -> Result<()> {
        let p = property.to_le_bytes();
        let v = value.to_le_bytes();
        debug!("si468x: property {:#x} = {:#x}", property, value);
        self.send(opcode::SET_PROPERTY, &[0, p[0], p[1], v[0], v[1]])
    }
}
