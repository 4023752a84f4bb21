//! `MapContext`: the handle a `Mapper::map` call uses to emit records
//! (spec.md §3's `Output`/`OutputToShard`/`OutputToAllShards`) and to ask
//! which pass of a multipass job it is in (SPEC_FULL.md §14).

use crate::error::{DriverError, Result};
use crate::output::OutputChannels;
use mrlite_base::hashing::HashFn;
use mrlite_base::wire::record_wire_size;
use mrlite_sorted::SortedBuffer;
use mrlite_transport::MapperTransport;

/// Where a mapper's routed output actually goes (spec.md §3's map-output
/// shard id): a live `MapperTransport` in incremental mode, one
/// `SortedBuffer` per destination in batch mode, or — in `map_only` mode,
/// which has no reduce phase at all — directly to the job's own
/// `OutputChannels`.
enum Sink<'a> {
    Transport(&'a MapperTransport),
    SortedBuffers(&'a mut [SortedBuffer]),
    Channels(&'a mut OutputChannels),
}

pub struct MapContext<'a> {
    sink: Sink<'a>,
    hash_fn: HashFn,
    pass: u32,
    max_output_size: u64,
}

impl<'a> MapContext<'a> {
    pub fn for_transport(transport: &'a MapperTransport, hash_fn: HashFn, pass: u32, max_output_size: u64) -> MapContext<'a> {
        MapContext {
            sink: Sink::Transport(transport),
            hash_fn,
            pass,
            max_output_size,
        }
    }

    pub fn for_sorted_buffers(buffers: &'a mut [SortedBuffer], hash_fn: HashFn, pass: u32, max_output_size: u64) -> MapContext<'a> {
        MapContext {
            sink: Sink::SortedBuffers(buffers),
            hash_fn,
            pass,
            max_output_size,
        }
    }

    /// `map_only` mode has exactly one reduce-less output path: `Output`
    /// writes straight through to channel 0 (spec.md §4.5's "In map-only
    /// mode, Output writes directly to the local output writer; the other
    /// two [OutputToShard/OutputToAllShards] are forbidden").
    pub fn for_channels(channels: &'a mut OutputChannels, hash_fn: HashFn, pass: u32, max_output_size: u64) -> MapContext<'a> {
        MapContext {
            sink: Sink::Channels(channels),
            hash_fn,
            pass,
            max_output_size,
        }
    }

    /// Which pass of `multipass_map` is currently running, zero-indexed.
    pub fn current_pass(&self) -> u32 {
        self.pass
    }

    /// Routes `(key, value)` to the shard `key` hashes to. This is the
    /// call a `Mapper` uses in the common case. In `map_only` mode this
    /// writes directly to the single local output channel.
    pub fn output(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_size(key, value)?;
        match &mut self.sink {
            Sink::Channels(channels) => Ok(channels.write_to_shard(0, key, value)?),
            Sink::Transport(_) | Sink::SortedBuffers(_) => {
                let shard = (self.hash_fn.hash(key) as usize) % self.num_shards();
                self.route(shard, key, value)
            }
        }
    }

    /// Routes `(key, value)` to a caller-chosen reduce shard, bypassing
    /// hashing. Forbidden in `map_only` mode, which has no reduce shards.
    pub fn output_to_shard(&mut self, shard: usize, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_size(key, value)?;
        if let Sink::Channels(_) = &self.sink {
            return Err(DriverError::UserContract(
                "output_to_shard is forbidden in map_only mode".to_string(),
            ));
        }
        self.route(shard, key, value)
    }

    /// Routes `(key, value)` to every reduce shard. Forbidden in
    /// `map_only` mode.
    pub fn output_to_all_shards(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_size(key, value)?;
        match &mut self.sink {
            Sink::Transport(transport) => {
                for shard in 0..transport.num_destinations() {
                    transport.send(shard, key, value)?;
                }
                Ok(())
            }
            Sink::SortedBuffers(buffers) => {
                for buffer in buffers.iter_mut() {
                    buffer.insert(key, value)?;
                }
                Ok(())
            }
            Sink::Channels(_) => Err(DriverError::UserContract(
                "output_to_all_shards is forbidden in map_only mode".to_string(),
            )),
        }
    }

    fn route(&mut self, shard: usize, key: &[u8], value: &[u8]) -> Result<()> {
        match &mut self.sink {
            Sink::Transport(transport) => {
                if shard >= transport.num_destinations() {
                    return Err(DriverError::UserContract(format!("reduce shard {} does not exist", shard)));
                }
                transport.send(shard, key, value)?;
                Ok(())
            }
            Sink::SortedBuffers(buffers) => {
                let buffer = buffers
                    .get_mut(shard)
                    .ok_or_else(|| DriverError::UserContract(format!("reduce shard {} does not exist", shard)))?;
                buffer.insert(key, value)?;
                Ok(())
            }
            Sink::Channels(channels) => Ok(channels.write_to_shard(shard, key, value)?),
        }
    }

    fn num_shards(&self) -> usize {
        match &self.sink {
            Sink::Transport(transport) => transport.num_destinations(),
            Sink::SortedBuffers(buffers) => buffers.len(),
            Sink::Channels(channels) => channels.len(),
        }
    }

    /// Enforces `max_map_output_size` before the record reaches Transport
    /// or SortedBuffer (SPEC_FULL.md §14): a fatal Oversize error, not a
    /// dropped record.
    fn check_size(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let size = record_wire_size(key, value);
        if size > self.max_output_size {
            return Err(DriverError::OversizeRecord {
                size,
                limit: self.max_output_size,
            });
        }
        Ok(())
    }
}
