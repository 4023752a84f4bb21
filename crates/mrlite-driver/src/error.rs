use std::fmt;
use std::io;

/// The error taxonomy of spec.md §7, collected behind one enum so
/// `mrlite-worker`'s `main` has a single match to turn into an exit code
/// and a log line.
#[derive(Debug)]
pub enum DriverError {
    /// Invalid flag combination or value, caught before any resource is
    /// opened.
    Configuration(String),
    /// Could not open an input/output/spill resource.
    Resource(String),
    /// A socket or spill-file I/O error once the worker is running.
    Io(io::Error),
    Queue(String),
    Transport(mrlite_transport::TransportError),
    SortedBuffer(mrlite_sorted::SortedBufferError),
    Merge(mrlite_sorted::MergeError),
    Wire(mrlite_base::WireError),
    /// A record's `klen + vlen + 8` exceeds `max_map_output_size`.
    OversizeRecord { size: u64, limit: u64 },
    /// `OutputToShard`/`OutputToAllShards` called from a map-only worker.
    UserContract(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            DriverError::Resource(msg) => write!(f, "resource error: {}", msg),
            DriverError::Io(err) => write!(f, "i/o error: {}", err),
            DriverError::Queue(msg) => write!(f, "queue error: {}", msg),
            DriverError::Transport(err) => write!(f, "transport error: {}", err),
            DriverError::SortedBuffer(err) => write!(f, "sorted buffer error: {}", err),
            DriverError::Merge(err) => write!(f, "merge error: {}", err),
            DriverError::Wire(err) => write!(f, "wire format error: {}", err),
            DriverError::OversizeRecord { size, limit } => {
                write!(f, "record of {} bytes exceeds max_map_output_size of {} bytes", size, limit)
            }
            DriverError::UserContract(msg) => write!(f, "user contract violation: {}", msg),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<io::Error> for DriverError {
    fn from(err: io::Error) -> Self {
        DriverError::Io(err)
    }
}

impl From<mrlite_transport::TransportError> for DriverError {
    fn from(err: mrlite_transport::TransportError) -> Self {
        DriverError::Transport(err)
    }
}

impl From<mrlite_sorted::SortedBufferError> for DriverError {
    fn from(err: mrlite_sorted::SortedBufferError) -> Self {
        DriverError::SortedBuffer(err)
    }
}

impl From<mrlite_sorted::MergeError> for DriverError {
    fn from(err: mrlite_sorted::MergeError) -> Self {
        DriverError::Merge(err)
    }
}

impl From<mrlite_base::WireError> for DriverError {
    fn from(err: mrlite_base::WireError) -> Self {
        DriverError::Wire(err)
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
