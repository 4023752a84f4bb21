//! `Mapper`/`IncrementalReducer`/`BatchReducer`, CLI flag parsing and
//! validation, the worker state machine, and the map/reduce driver loops
//! of spec.md §4.5. `mrlite-worker` wires registry lookups on top of this
//! crate; this crate never looks a class name up itself.

pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod run;
pub mod spill;
pub mod state;
pub mod traits;

pub use config::{JobConfig, RecordFormat, WorkerRole};
pub use context::MapContext;
pub use error::{DriverError, Result};
pub use mrlite_io::reader::DEFAULT_MAX_INPUT_LINE_LENGTH;
pub use output::OutputChannels;
pub use run::{run, run_batch_reducer, run_incremental_reducer, run_mapper, Job};
pub use state::{StateMachine, WorkerState};
pub use traits::{BatchReducer, IncrementalReducer, Mapper};
