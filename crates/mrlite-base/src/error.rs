use std::fmt;
use std::io;

/// Errors that can arise while reading or writing the wire format shared by
/// `Transport` framing and `SortedBuffer` spill files.
#[derive(Debug)]
pub enum WireError {
    Io(io::Error),
    /// A length prefix was read but the stream ended before the payload did.
    Truncated,
    /// A record's length prefix exceeds the caller-supplied bound.
    PayloadTooLarge { size: u64, limit: u64 },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Io(err) => write!(f, "i/o error: {}", err),
            WireError::Truncated => write!(f, "stream ended mid-record"),
            WireError::PayloadTooLarge { size, limit } => {
                write!(f, "record of {} bytes exceeds limit of {} bytes", size, limit)
            }
        }
    }
}

impl std::error::Error for WireError {}

impl From<io::Error> for WireError {
    fn from(err: io::Error) -> Self {
        WireError::Io(err)
    }
}
