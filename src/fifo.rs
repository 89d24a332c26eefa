//! Single byte FIFO shared between foreground code and an interrupt handler.
//!
//! The buffer never overwrites: once full, new bytes are rejected and the oldest data is kept.
//! Every operation runs inside a critical section, so a writer in one context and a reader in
//! another (each possibly preempting the other) always see a consistent read head, write head
//! and count. The critical section restores the previous interrupt state on exit, which makes
//! calls from within an interrupt handler or another critical section safe.

use core::cell::RefCell;
use critical_section::Mutex;
use crate::Error;

/// Ring storage. Only ever touched from inside a critical section.
#[derive(Debug)]
struct Ring<const SIZE: usize> {
    /// Buffer of data.
    data: [u8; SIZE],
    /// Slot of the next byte to read.
    read_head: usize,
    /// Slot of the next byte to write.
    write_head: usize,
    /// Number of unread bytes.
    count: usize,
}

impl<const SIZE: usize> Ring<SIZE> {
    const fn new() -> Self {
        Self {
            data: [0u8; SIZE],
            read_head: 0,
            write_head: 0,
            count: 0,
        }
    }

    fn clear(&mut self) {
        self.count = 0;
        self.read_head = 0;
        self.write_head = 0;
    }

    fn push_back(&mut self, byte: u8) -> Result<(), Error> {
        if self.count >= SIZE {
            return Err(Error::Full);
        }
        self.data[self.write_head] = byte;
        self.write_head = (self.write_head + 1) % SIZE;
        self.count += 1;
        Ok(())
    }

    fn front(&self) -> Result<u8, Error> {
        if self.count == 0 {
            return Err(Error::Empty);
        }
        Ok(self.data[self.read_head])
    }

    fn pop_front(&mut self) -> Result<u8, Error> {
        let byte = self.front()?;
        self.read_head = (self.read_head + 1) % SIZE;
        self.count -= 1;
        Ok(byte)
    }
}

/// Fixed capacity, non-overwriting circular byte buffer.
///
/// `SIZE` is the capacity and must be greater than zero. Storage is inline, so a `FIFO` can be
/// placed in a `static` and shared by reference between contexts.
pub struct FIFO<const SIZE: usize> {
    ring: Mutex<RefCell<Ring<SIZE>>>,
}

impl<const SIZE: usize> FIFO<SIZE> {
    const NON_ZERO: () = assert!(SIZE > 0, "FIFO capacity must be greater than zero");

    /// Create an empty buffer.
    ///
    /// A capacity of zero does not compile:
    ///
    /// ```compile_fail
    /// use serial_fifo::FIFO;
    ///
    /// static EMPTY: FIFO<0> = FIFO::new();
    /// ```
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_ZERO;
        Self {
            ring: Mutex::new(RefCell::new(Ring::new())),
        }
    }

    /// Run `f` on the ring with interrupts disabled.
    fn with<R>(&self, f: impl FnOnce(&mut Ring<SIZE>) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.ring.borrow_ref_mut(cs)))
    }

    /// Discard all stored bytes and reset both heads.
    pub fn clear(&self) {
        self.with(Ring::clear)
    }

    /// Total number of byte slots.
    pub const fn capacity(&self) -> usize {
        SIZE
    }

    /// Append a byte.
    /// Fails with [`Error::Full`] and leaves the buffer untouched if no slot is free.
    pub fn put(&self, byte: u8) -> Result<(), Error> {
        self.with(|ring| ring.push_back(byte))
    }

    /// Remove and return the oldest byte, or [`Error::Empty`].
    pub fn get(&self) -> Result<u8, Error> {
        self.with(Ring::pop_front)
    }

    /// Return the oldest byte without removing it, or [`Error::Empty`].
    pub fn peek(&self) -> Result<u8, Error> {
        self.with(|ring| ring.front())
    }

    /// Number of bytes available to read.
    pub fn count(&self) -> usize {
        self.with(|ring| ring.count)
    }

    /// Number of free slots.
    pub fn free(&self) -> usize {
        SIZE - self.count()
    }

    /// Whether there is nothing to read.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the next [`put`](Self::put) would fail.
    pub fn is_full(&self) -> bool {
        self.count() == SIZE
    }
}

impl<const SIZE: usize> Default for FIFO<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
