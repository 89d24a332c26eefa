//! Build-time settings for the serial link.

/// Capacity of the transmit FIFO in bytes.
pub const TX_BUFFER_SIZE: usize = 64;
/// Capacity of the receive FIFO in bytes.
pub const RX_BUFFER_SIZE: usize = 64;

/// Line speed in bits per second (8N1).
pub const BAUD_RATE: u32 = 9600;

/// ST-LINK chip provides an 8 MHz clock in default configuration.
pub const HSE_FREQ_MHZ: u32 = 8;
