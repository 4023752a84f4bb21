//! The three user-implemented roles of spec.md §3: `Mapper`,
//! `IncrementalReducer`, and `BatchReducer`. A job implements exactly one
//! of the two reducer traits, never both.

use crate::context::MapContext;
use crate::error::Result;
use crate::output::OutputChannels;
use mrlite_sorted::GroupedMergeIter;
use std::any::Any;

/// Transforms one input `(key, value)` record into zero or more output
/// records via `context`.
pub trait Mapper {
    fn map(&mut self, key: &[u8], value: &[u8], context: &mut MapContext) -> Result<()>;

    /// Called before the first record of each input shard. Default is a
    /// no-op; a mapper that accumulates combiner state across a shard
    /// resets it here (spec.md §4.5 point 5).
    fn start(&mut self, _context: &mut MapContext) -> Result<()> {
        Ok(())
    }

    /// Called after the last record of each input shard, once per shard
    /// per pass. Default is a no-op; a combining mapper flushes its
    /// accumulated state here.
    fn finish_shard(&mut self, _context: &mut MapContext) -> Result<()> {
        Ok(())
    }
}

/// A reducer driven one value at a time, carrying its own per-key
/// accumulator across calls (spec.md §3). The accumulator is a
/// `Box<dyn Any>` so each key's state can be any concrete type the
/// implementation needs; the driver never inspects it.
pub trait IncrementalReducer {
    /// Starts accumulating for a new key, given the first value seen for
    /// it. Returns the initial accumulator, which `partial_reduce`
    /// receives on every subsequent call for this key.
    fn begin_reduce(&mut self, key: &[u8], value: &[u8]) -> Box<dyn Any>;

    /// Folds one more value for `key` into `accumulator`.
    fn partial_reduce(&mut self, key: &[u8], value: &[u8], accumulator: &mut Box<dyn Any>) -> Result<()>;

    /// Emits the final result for `key` once every value for it has been
    /// folded in, and drops the accumulator.
    fn end_reduce(&mut self, key: &[u8], accumulator: Box<dyn Any>, output: &mut OutputChannels) -> Result<()>;
}

/// A reducer driven once per key with the full, already-sorted run of
/// values for that key (spec.md §3's batch mode). `values` yields only
/// the values belonging to the current key; advancing past them is the
/// driver's job.
pub trait BatchReducer {
    fn reduce(&mut self, key: &[u8], values: &mut GroupedMergeIter, output: &mut OutputChannels) -> Result<()>;
}
