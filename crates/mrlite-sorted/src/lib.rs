//! `SortedBuffer`: a bounded-memory ingest buffer that spills sorted,
//! grouped runs to disk, plus a k-way grouped merge iterator over the
//! resulting run files (spec.md §4.4).
//!
//! The in-memory side is a bump-allocated byte arena indexed by
//! `(offset, length)` descriptors — sorting moves descriptors, never
//! payload bytes, mirroring the originating codebase's own buffer-pool
//! style (`networking::chunkpool`) of keeping bytes in place and moving
//! cheap handles instead.

mod arena;
mod buffer;
mod merge;

pub use arena::Arena;
pub use buffer::{SortedBuffer, SortedBufferError};
pub use merge::{GroupedMergeIter, MergeError};

/// Formats the standalone `<filebase>-<10-digit run index>` spill name used
/// by `SortedBuffer` itself (spec.md §4.4/§6). The mapper/reducer-qualified
/// naming scheme in spec.md §6's "Persisted state" line lives in
/// `mrlite-driver`, one layer up, since it needs the job's worker ids.
pub fn run_file_name(filebase: &str, run_index: u64) -> String {
    format!("{}-{:010}", filebase, run_index)
}
