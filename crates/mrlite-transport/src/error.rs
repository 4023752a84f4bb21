use std::fmt;
use std::io;

/// Errors raised by [`crate::mapper::MapperTransport`] and
/// [`crate::reducer::ReducerTransport`]. Per spec.md §7, any socket error
/// here is fatal for the worker — the driver is expected to log at
/// `crit!` and abort rather than retry.
#[derive(Debug)]
pub enum TransportError {
    Io(io::Error),
    /// A peer's connection closed before it sent its terminator frame.
    UnexpectedClose { peer: usize },
    /// A record's combined `klen + vlen + 8` exceeds the configured bound.
    OversizeRecord { size: u64, limit: u64 },
    Wire(mrlite_base::WireError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(err) => write!(f, "i/o error: {}", err),
            TransportError::UnexpectedClose { peer } => {
                write!(f, "peer {} closed its connection before signaling end-of-stream", peer)
            }
            TransportError::OversizeRecord { size, limit } => {
                write!(f, "record of {} bytes exceeds max_map_output_size of {} bytes", size, limit)
            }
            TransportError::Wire(err) => write!(f, "wire format error: {}", err),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(err)
    }
}

impl From<mrlite_base::WireError> for TransportError {
    fn from(err: mrlite_base::WireError) -> Self {
        TransportError::Wire(err)
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
