//! System configuration and hardware constants
//!
//! Compile-time constants for the receiver board: bus addresses, flash
//! layout, buffer capacities, boot properties and the DAB Band III channel
//! table. Runtime knobs live next to the code that consumes them
//! ([`crate::hal::wait::WaitPolicy`], [`crate::storage::directory::StoreLayout`],
//! [`crate::radio::scan::ScanConfig`]).

/// `Si468x` 7-bit I2C address
pub const SI468X_I2C_ADDR: u8 = 0x64;

/// I2C bus frequency for the receiver
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// SPI clock for the directory flash
pub const FLASH_SPI_FREQUENCY_HZ: u32 = 20_000_000;

/// Erase unit of the directory flash
pub const FLASH_SECTOR_SIZE: u32 = 4096;

/// Total size of the SST25VF016B directory flash (2 MiB)
pub const FLASH_CAPACITY: usize = 2 * 1024 * 1024;

/// Sectors at the start of the store reserved for control data
pub const RESERVED_SECTORS: u32 = 2;

/// Offset of the directory store inside the flash
pub const STORE_BASE_OFFSET: u32 = 0;

/// Tag written after the service count in the control sector
pub const STORE_FORMAT_TAG: u16 = 0xDA01;

/// Stream buffer staging area
pub const STREAM_STAGING_SIZE: usize = 128;

/// Largest serialised service record, including its length prefix
pub const RECORD_CAPACITY: usize = 256;

/// Components a service can carry (4-bit count)
pub const MAX_COMPONENTS: usize = 15;

/// Services kept from one ensemble
pub const MAX_SERVICES: usize = 32;

/// Response buffer for `GET_DIGITAL_SERVICE_LIST`, reply header included
pub const SERVICE_LIST_BUFFER_SIZE: usize = 2048;

/// Largest command frame (opcode, arguments and payload)
pub const COMMAND_CAPACITY: usize = 512;

/// Bytes of a `HOST_LOAD` image sent per command
pub const HOST_LOAD_CHUNK: usize = COMMAND_CAPACITY - 4;

/// Interval between status polls in microseconds
pub const POLL_INTERVAL_US: u32 = 100;

/// Default poll budget for a single command (1 s at the default interval)
pub const DEFAULT_WAIT_POLLS: u32 = 10_000;

/// Event-status polls allowed while waiting for a service list
pub const SERVICE_LIST_POLLS: u32 = 500;

/// Delay between event-status polls in milliseconds
pub const SERVICE_LIST_POLL_DELAY_MS: u32 = 10;

/// Reset pulse and power-up settle time in milliseconds
pub const RESET_DELAY_MS: u32 = 10;

/// Settle time after the patch is loaded
pub const PATCH_SETTLE_MS: u32 = 15;

/// Receiver firmware images in the receiver's own SPI flash
pub mod image {
    //! Flash addresses passed to `FLASH_LOAD`

    /// Mini-patch follow-up patch
    pub const PATCH: u32 = 0x0000_2000;

    /// FM receiver image
    pub const FM: u32 = 0x0000_6000;

    /// DAB receiver image
    pub const DAB: u32 = 0x0009_2000;
}

/// Receiver properties set during boot
pub mod property {
    //! `SET_PROPERTY` identifiers and the values written at boot

    /// Interrupt sources enabled
    pub const INT_CTL_ENABLE: u16 = 0x0000;
    /// Interrupt repeat control
    pub const INT_CTL_REPEAT: u16 = 0x0001;
    /// I2S output select
    pub const DIGITAL_IO_OUTPUT_SELECT: u16 = 0x0200;
    /// I2S sample rate
    pub const DIGITAL_IO_OUTPUT_SAMPLE_RATE: u16 = 0x0201;
    /// Pin configuration
    pub const PIN_CONFIG_ENABLE: u16 = 0x0800;
    /// DAB front-end configuration
    pub const DAB_TUNE_FE_CFG: u16 = 0x1712;
    /// FM RDS configuration
    pub const FM_RDS_CONFIG: u16 = 0x3C02;

    /// Receiver SPI flash clock (`FLASH_SET_PROP_LIST`)
    pub const FLASH_SPI_CLOCK_FREQ_KHZ: u16 = 0x0001;
    /// Receiver SPI flash high-speed read clock (`FLASH_SET_PROP_LIST`)
    pub const HIGH_SPEED_READ_MAX_FREQ_MHZ: u16 = 0x0103;

    /// Properties written after `BOOT`, in order
    pub const BOOT: [(u16, u16); 7] = [
        (INT_CTL_ENABLE, 0x00D1),                 // CTS, STC, DACQ
        (INT_CTL_REPEAT, 0x0001),                 // repeat STC
        (DIGITAL_IO_OUTPUT_SELECT, 0x8000),       // I2S master
        (DIGITAL_IO_OUTPUT_SAMPLE_RATE, 0xAC44),  // 44.1 kHz
        (PIN_CONFIG_ENABLE, 0x8002),              // I2S enable
        (DAB_TUNE_FE_CFG, 0x0001),                // VHF switch
        (FM_RDS_CONFIG, 0x0001),                  // RDS processor on
    ];

    /// Receiver flash properties written before the image load
    pub const FLASH: [(u16, u16); 2] = [
        (FLASH_SPI_CLOCK_FREQ_KHZ, 0x9C40),       // 40 MHz
        (HIGH_SPEED_READ_MAX_FREQ_MHZ, 0x00FF),
    ];
}

/// DAB Band III channel centre frequencies in kHz (5A to 13F)
pub const DAB_FREQUENCIES_KHZ: [u32; 38] = [
    174_928, 176_640, 178_352, 180_064, 181_936, 183_648, 185_360, 187_072, 188_928, 190_640,
    192_352, 194_064, 195_936, 197_648, 199_360, 201_072, 202_928, 204_640, 206_352, 208_064,
    209_936, 211_648, 213_360, 215_072, 216_928, 218_640, 220_352, 222_064, 223_936, 225_648,
    227_360, 229_072, 230_748, 232_496, 234_208, 235_776, 237_448, 239_200,
];

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic

    /// Receiver reset (active low)
    pub const SI_RST: &str = "PB5";

    /// Receiver interrupt line (active low)
    pub const SI_INT: &str = "PG0";

    /// I2C1 SCL (receiver)
    pub const I2C1_SCL: &str = "PB8";

    /// I2C1 SDA (receiver)
    pub const I2C1_SDA: &str = "PB9";

    /// Directory flash chip select
    pub const FLASH_SS: &str = "PF6";

    /// Heartbeat LED
    pub const LED_STATUS: &str = "PB7";
}
