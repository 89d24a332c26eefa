use core::fmt;

/// Recoverable conditions reported by FIFO operations.
///
/// Neither condition changes the state of the buffer; it stays usable and the caller decides
/// whether to drop data, retry or disable a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Read from a buffer holding no data.
    Empty,
    /// Write to a buffer with no free slot. The byte was not stored.
    Full,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Empty => f.write_str("buffer empty"),
            Error::Full => f.write_str("buffer full"),
        }
    }
}
