//! Receiver boot sequence
//!
//! Reset, power up, load the host mini-patch, load the flash patch and the
//! selected image from the receiver's own SPI flash, boot, then apply the
//! property set. Boot commands before the patch run without interrupt
//! wait; the interrupt line is only driven once the patch is running.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

use super::command::{opcode, Command, FLASH_SET_PROP_LIST};
use super::Si468x;
use crate::config::{image, property, HOST_LOAD_CHUNK, PATCH_SETTLE_MS, RESET_DELAY_MS};
use crate::error::{Error, Result};
use crate::types::ImageMode;

/// `POWER_UP` arguments: CTS interrupt on, crystal mode, 19.2 MHz crystal,
/// tuning capacitance and run bias
const POWER_UP_ARGS: [u8; 15] = [
    0x80, 0x14, 0x7F, 0x80, 0x8D, 0x5B, 0x00, 0x3F, 0x10, 0x00, 0x00, 0x00, 0x7F, 0x00, 0x00,
];

impl<I2C: I2c, D: DelayNs> Si468x<'_, I2C, D> {
    /// Bring the receiver up in the driver's [`ImageMode`].
    ///
    /// `reset` is the active-low reset line, `minipatch` the host-loaded
    /// bootstrap patch. Leaves interrupt wait enabled.
    pub fn init<P: OutputPin>(&mut self, reset: &mut P, minipatch: &[u8]) -> Result<()> {
        info!("si468x: boot {}", self.mode);
        self.interrupt_wait = false;

        reset.set_low().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        reset.set_high().map_err(|_| Error::Pin)?;
        self.delay.delay_ms(RESET_DELAY_MS);

        self.power_up()?;
        self.delay.delay_ms(RESET_DELAY_MS);

        self.load_init()?;
        self.host_load(minipatch)?;
        self.delay.delay_ms(RESET_DELAY_MS);

        self.load_init()?;
        self.flash_load(image::PATCH)?;
        self.interrupt_wait = true;
        self.delay.delay_ms(PATCH_SETTLE_MS);

        for (prop, value) in property::FLASH {
            self.flash_set_property(prop, value)?;
        }

        self.load_init()?;
        self.flash_load(self.mode.flash_address())?;
        self.boot()?;

        for (prop, value) in property::BOOT {
            self.set_property(prop, value)?;
        }

        if self.mode == ImageMode::Dab {
            self.set_freq_list()?;
        }
        info!("si468x: {} image running", self.mode);
        Ok(())
    }

    /// Power up the core
    pub fn power_up(&mut self) -> Result<()> {
        self.send(opcode::POWER_UP, &POWER_UP_ARGS)
    }

    /// Prepare for an image load
    pub fn load_init(&mut self) -> Result<()> {
        self.send(opcode::LOAD_INIT, &[0])
    }

    /// Send an image from the host, split into `HOST_LOAD` frames
    pub fn host_load(&mut self, image: &[u8]) -> Result<()> {
        debug!("si468x: host load {} bytes", image.len());
        for chunk in image.chunks(HOST_LOAD_CHUNK) {
            let command = Command::with_payload(opcode::HOST_LOAD, &[0, 0, 0], chunk)?;
            self.run(&command)?;
        }
        Ok(())
    }

    /// Load the image at `address` of the receiver's flash
    pub fn flash_load(&mut self, address: u32) -> Result<()> {
        debug!("si468x: flash load {:#x}", address);
        let a = address.to_le_bytes();
        self.send(
            opcode::FLASH_LOAD,
            &[0, 0, 0, a[0], a[1], a[2], a[3], 0, 0, 0, 0],
        )
    }

    /// Set a property of the receiver's flash interface
    pub fn flash_set_property(&mut self, property: u16, value: u16) -> Result<()> {
        let p = property.to_le_bytes();
        let v = value.to_le_bytes();
        self.send(
            opcode::FLASH_LOAD,
            &[FLASH_SET_PROP_LIST, 0, 0, p[0], p[1], v[0], v[1]],
        )
    }

    /// Boot the loaded image
    pub fn boot(&mut self) -> Result<()> {
        self.send(opcode::BOOT, &[0])
    }
}
