//! Interrupt-safe byte FIFOs and the buffered serial driver built on top of them.
//!
//! A [`FIFO`] decouples an interrupt-driven peripheral from application code: one context
//! writes, another reads, and every operation is a short critical section. [`BufferedSerial`]
//! owns one FIFO per direction and is driven from the foreground through its read/write methods
//! and from the UART interrupt through [`BufferedSerial::on_interrupt`].
//!
//! The critical section implementation is supplied by the final binary, e.g. `cortex-m` with
//! its `critical-section-single-core` feature on target or `critical-section/std` on a host.

#![cfg_attr(not(test), no_std)]

pub mod config;
mod error;
mod fifo;
pub mod serial;

pub use error::Error;
pub use fifo::FIFO;
pub use serial::{BufferedOutput, BufferedSerial, ReceiveError, SerialPort};

/// Serial driver with the buffer sizes from [`config`].
pub type Uart<P> = BufferedSerial<P, { config::TX_BUFFER_SIZE }, { config::RX_BUFFER_SIZE }>;
