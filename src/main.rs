//! DAB Receiver Main Application
//!
//! Entry point for the STM32F767-based DAB/FM receiver.
//! Boots the Si4684, scans Band III into the service directory, then plays
//! the directory entry by entry on each press of the user button.

#![no_std]
#![no_main]

use defmt::{error, info, warn};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_time::{Delay, Duration, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use {defmt_rtt as _, panic_probe as _};

use dab_firmware::drivers::sst25::Sst25Flash;
use dab_firmware::prelude::*;

/// Receiver interrupt flag, set from the EXTI task
static SI468X_SIGNAL: InterruptSignal = InterruptSignal::new();

/// Executor for the receiver's interrupt line; preempts the blocking
/// driver code on the thread executor
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

/// Host-loaded bootstrap patch, provided at build time
static MINIPATCH: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/minipatch.bin"));

#[interrupt]
unsafe fn UART4() {
    EXECUTOR_HIGH.on_interrupt();
}

/// Main entry point
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("DAB Receiver Firmware v{}", env!("CARGO_PKG_VERSION"));

    let config = embassy_stm32::Config::default();
    let p = embassy_stm32::init(config);

    info!("Peripherals initialized");

    // Receiver interrupt line (PG0, active low)
    let si_int = ExtiInput::new(p.PG0, p.EXTI0, Pull::Up);
    interrupt::UART4.set_priority(Priority::P6);
    let high = EXECUTOR_HIGH.start(interrupt::UART4);
    high.must_spawn(si468x_irq_task(si_int));

    // Receiver reset (PB5, active low) and I2C1 (PB8 = SCL, PB9 = SDA)
    let mut si_rst = Output::new(p.PB5, Level::Low, Speed::Low);
    let i2c = I2c::new_blocking(
        p.I2C1,
        p.PB8,
        p.PB9,
        Hertz(I2C_FREQUENCY_HZ),
        Default::default(),
    );

    // Directory flash on SPI5 (PF7 = SCK, PF9 = MOSI, PF8 = MISO, PF6 = CS)
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = Hertz(FLASH_SPI_FREQUENCY_HZ);
    let spi = Spi::new_blocking(p.SPI5, p.PF7, p.PF9, p.PF8, spi_config);
    let cs = Output::new(p.PF6, Level::High, Speed::VeryHigh);
    let Ok(spi_device) = ExclusiveDevice::new(spi, cs, Delay) else {
        error!("Flash chip select init failed");
        halt().await
    };
    let flash = Sst25Flash::new(spi_device, Delay);
    let mut store = DirectoryStore::new(flash, StoreLayout::default());

    info!("I2C1 at {} Hz, SPI5 at {} Hz", I2C_FREQUENCY_HZ, FLASH_SPI_FREQUENCY_HZ);

    let mut radio = Si468x::new(i2c, Delay, &SI468X_SIGNAL, ImageMode::Dab);
    if let Err(e) = radio.init(&mut si_rst, MINIPATCH) {
        error!("Receiver boot failed: {}", e);
        halt().await
    }

    match BandScanner::new(&mut radio, &mut store, ScanConfig::default()).run() {
        Ok(report) => info!(
            "Scan: {} services, {} ensembles, {} skipped",
            report.services_found,
            report.ensembles_found,
            report.channels_skipped
        ),
        Err(e) => error!("Scan aborted: {}", e),
    }

    let mut cursor = match ServiceCursor::from_store(&mut store) {
        Ok(cursor) => cursor,
        Err(e) => {
            error!("Directory unreadable: {}", e);
            halt().await
        }
    };

    // User button (PC13) steps through the directory
    let mut button = ExtiInput::new(p.PC13, p.EXTI13, Pull::Down);
    let mut selected = cursor.current();
    loop {
        match selected {
            Some(slot) => {
                if let Err(e) = play_slot(&mut radio, &mut store, slot) {
                    warn!("Slot {} not playable: {}", slot, e);
                }
            }
            None => warn!("Directory is empty"),
        }
        button.wait_for_rising_edge().await;
        selected = cursor.next();
    }
}

/// Park the main task after an unrecoverable error
async fn halt() -> ! {
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

/// Forwards receiver interrupt edges to the driver
#[embassy_executor::task]
async fn si468x_irq_task(mut line: ExtiInput<'static>) {
    loop {
        line.wait_for_falling_edge().await;
        SI468X_SIGNAL.on_signal();
    }
}
