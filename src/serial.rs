//! Interrupt-driven serial driver using one FIFO per direction.
//!
//! Foreground code queues outgoing bytes with [`BufferedSerial::write`] and drains incoming
//! bytes with [`BufferedSerial::read`]. The UART interrupt calls
//! [`BufferedSerial::on_interrupt`], which moves received bytes into the receive FIFO and feeds
//! the transmitter from the transmit FIFO. Once the transmit FIFO runs dry the transmit-ready
//! interrupt is switched off until the next write switches it back on.

use core::cell::{Cell, RefCell};
use core::fmt;
use critical_section::Mutex;
use heapless::Vec;
use crate::{Error, FIFO};

/// A received byte was lost in the UART itself (overrun, framing, noise or parity error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveError;

/// Register level access to a UART, implemented by the board support code.
pub trait SerialPort {
    /// Byte waiting in the receive register, `Ok(None)` if there is none.
    fn read(&mut self) -> Result<Option<u8>, ReceiveError>;
    /// Whether the transmit register can take another byte.
    fn is_tx_ready(&self) -> bool;
    /// Load a byte into the transmit register.
    fn write(&mut self, byte: u8);
    /// Enable the transmit-ready interrupt.
    fn listen_tx(&mut self);
    /// Disable the transmit-ready interrupt.
    fn unlisten_tx(&mut self);
    /// Enable the receive interrupt.
    fn listen_rx(&mut self);
    /// Disable the receive interrupt.
    fn unlisten_rx(&mut self);
}

/// Serial port with a `TX` byte transmit FIFO and an `RX` byte receive FIFO.
///
/// Meant to live in a `static` shared by the application and the interrupt handler.
pub struct BufferedSerial<P, const TX: usize, const RX: usize> {
    port: Mutex<RefCell<Option<P>>>,
    tx: FIFO<TX>,
    rx: FIFO<RX>,
    /// Received bytes lost to a full receive FIFO or a UART receive error.
    overruns: Mutex<Cell<u32>>,
}

impl<P: SerialPort, const TX: usize, const RX: usize> BufferedSerial<P, TX, RX> {
    /// Create a driver with empty buffers and no port installed.
    pub const fn new() -> Self {
        Self {
            port: Mutex::new(RefCell::new(None)),
            tx: FIFO::new(),
            rx: FIFO::new(),
            overruns: Mutex::new(Cell::new(0)),
        }
    }

    /// Reset both buffers, take over `port` and start listening for received data.
    ///
    /// Bytes queued before this call are discarded. A previously installed port is handed back
    /// with both of its interrupts switched off.
    pub fn begin(&self, mut port: P) -> Option<P> {
        critical_section::with(|cs| {
            self.tx.clear();
            self.rx.clear();
            self.overruns.borrow(cs).set(0);
            port.listen_rx();
            let mut previous = self.port.borrow_ref_mut(cs).replace(port)?;
            previous.unlisten_tx();
            previous.unlisten_rx();
            Some(previous)
        })
    }

    /// Stop both interrupts and hand the port back. Buffered data is kept.
    pub fn end(&self) -> Option<P> {
        critical_section::with(|cs| {
            let mut port = self.port.borrow_ref_mut(cs).take()?;
            port.unlisten_tx();
            port.unlisten_rx();
            Some(port)
        })
    }

    /// Whether a port has been installed with [`begin`](Self::begin).
    pub fn is_open(&self) -> bool {
        critical_section::with(|cs| self.port.borrow_ref(cs).is_some())
    }

    fn with_port<R>(&self, f: impl FnOnce(&mut P) -> R) -> Option<R> {
        critical_section::with(|cs| self.port.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Take the oldest received byte.
    pub fn read(&self) -> Result<u8, Error> {
        self.rx.get()
    }

    /// Look at the oldest received byte without consuming it.
    pub fn peek(&self) -> Result<u8, Error> {
        self.rx.peek()
    }

    /// Number of received bytes waiting to be read.
    pub fn available(&self) -> usize {
        self.rx.count()
    }

    /// Discard everything received so far.
    pub fn flush_rx(&self) {
        self.rx.clear()
    }

    /// Move received bytes into `line` until `delimiter` has been appended.
    ///
    /// Returns `Ok(true)` once the delimiter is in `line`, `Ok(false)` if the receive FIFO ran
    /// empty first. Fails with [`Error::Full`] when `line` has no room left; the byte that did
    /// not fit stays in the receive FIFO.
    pub fn read_line<const N: usize>(
        &self,
        line: &mut Vec<u8, N>,
        delimiter: u8,
    ) -> Result<bool, Error> {
        loop {
            let byte = match self.rx.peek() {
                Ok(byte) => byte,
                Err(_) => return Ok(false),
            };
            line.push(byte).map_err(|_| Error::Full)?;
            self.rx.get()?;
            if byte == delimiter {
                return Ok(true);
            }
        }
    }

    /// Queue a byte for transmission and make sure the transmitter is running.
    ///
    /// A full transmit FIFO is reported as [`Error::Full`]; the byte is not queued.
    pub fn write(&self, byte: u8) -> Result<(), Error> {
        self.tx.put(byte)?;
        self.with_port(P::listen_tx);
        Ok(())
    }

    /// Queue as many of `bytes` as fit. Returns how many were queued.
    pub fn write_all(&self, bytes: &[u8]) -> usize {
        let queued = bytes
            .iter()
            .take_while(|&&byte| self.tx.put(byte).is_ok())
            .count();
        if queued > 0 {
            self.with_port(P::listen_tx);
        }
        queued
    }

    /// Number of bytes still waiting to be sent.
    pub fn pending_tx(&self) -> usize {
        self.tx.count()
    }

    /// Spin until the interrupt handler has handed every queued byte to the transmitter.
    /// Returns immediately when no port is installed, as nothing would drain the buffer.
    pub fn wait_tx(&self) {
        while !self.tx.is_empty() && self.is_open() {
            core::hint::spin_loop();
        }
    }

    /// Number of received bytes lost since the last call, either to a full receive FIFO or to
    /// a receive error reported by the port.
    pub fn take_overruns(&self) -> u32 {
        critical_section::with(|cs| self.overruns.borrow(cs).replace(0))
    }

    /// Buffered [`fmt::Write`] adapter.
    pub fn output(&self) -> BufferedOutput<'_, P, TX, RX> {
        BufferedOutput { serial: self }
    }

    /// Service the UART. Call this from the interrupt handler.
    pub fn on_interrupt(&self) {
        critical_section::with(|cs| {
            let mut port = self.port.borrow_ref_mut(cs);
            let Some(port) = port.as_mut() else {
                return;
            };

            let overruns = self.overruns.borrow(cs);
            loop {
                let lost = match port.read() {
                    Ok(Some(byte)) => self.rx.put(byte).is_err(),
                    Ok(None) => break,
                    Err(ReceiveError) => true,
                };
                if lost {
                    overruns.set(overruns.get().saturating_add(1));
                }
            }

            if port.is_tx_ready() {
                match self.tx.get() {
                    Ok(byte) => port.write(byte),
                    // Nothing left to send, stop until the next write.
                    Err(_) => port.unlisten_tx(),
                }
            }
        })
    }
}

impl<P: SerialPort, const TX: usize, const RX: usize> Default for BufferedSerial<P, TX, RX> {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffered output with interrupt.
pub struct BufferedOutput<'a, P, const TX: usize, const RX: usize> {
    serial: &'a BufferedSerial<P, TX, RX>,
}

impl<P: SerialPort, const TX: usize, const RX: usize> fmt::Write for BufferedOutput<'_, P, TX, RX> {
    /// Queues what fits; reports [`fmt::Error`] if part of `string` was dropped.
    fn write_str(&mut self, string: &str) -> fmt::Result {
        if self.serial.write_all(string.as_bytes()) == string.len() {
            Ok(())
        } else {
            Err(fmt::Error)
        }
    }
}
