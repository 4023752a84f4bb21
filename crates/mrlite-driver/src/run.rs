//! The map/reduce driver loops of spec.md §4.5: the mapper role (sharding
//! user output across reducers, either live over `Transport` or spilled to
//! `SortedBuffer`), the incremental reducer role (per-pair accumulation
//! over `Transport`'s inbound queue) and the batch reducer role (grouped
//! iteration over merged spill files).

use crate::config::{JobConfig, RecordFormat};
use crate::context::MapContext;
use crate::error::{DriverError, Result};
use crate::output::OutputChannels;
use crate::spill::mapper_spill_filebase;
use crate::state::{StateMachine, WorkerState};
use crate::traits::{BatchReducer, IncrementalReducer, Mapper};
use mrlite_base::hashing::HashFn;
use mrlite_base::wire::decode_record;
use mrlite_io::{expand_glob, FramedReader, Reader, TextReader};
use mrlite_sorted::{run_file_name, GroupedMergeIter, SortedBuffer};
use mrlite_transport::{MapperTransport, ReducerTransport};
use slog::{info, o, warn, Logger};
use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

fn open_reader(path: &Path, format: RecordFormat, max_input_line_length: usize, log: &Logger) -> Result<Box<dyn Reader>> {
    Ok(match format {
        RecordFormat::Text => Box::new(TextReader::open(path, max_input_line_length, log.clone())?),
        RecordFormat::Protofile => Box::new(FramedReader::open(path)?),
    })
}

/// Drains one input shard into `mapper`, calling `start`/`finish_shard`
/// around it (spec.md §4.5 point 5). A read error is logged and treated as
/// end of this shard, per spec.md §7's "Read returning false" non-fatal
/// case; it does not abort the worker.
fn drive_shard(
    path: &Path,
    format: RecordFormat,
    max_input_line_length: usize,
    mapper: &mut dyn Mapper,
    context: &mut MapContext,
    log: &Logger,
) -> Result<()> {
    let mut reader = open_reader(path, format, max_input_line_length, log)?;
    mapper.start(context)?;
    loop {
        match reader.read() {
            Ok(Some((key, value))) => mapper.map(&key, &value, context)?,
            Ok(None) => break,
            Err(err) => {
                warn!(log, "input read error, advancing to next shard"; "path" => %path.display(), "error" => %err);
                break;
            }
        }
    }
    mapper.finish_shard(context)?;
    Ok(())
}

/// Runs the mapper role: reads `config.input_filepattern`'s shards
/// `config.multipass_map` times, routing each `Mapper::map` emission to
/// the job's reducers (or, in `map_only` mode, straight to the output
/// channels).
pub fn run_mapper(config: &JobConfig, mapper: &mut dyn Mapper, log: &Logger) -> Result<()> {
    let mapper_id = config.map_worker_id.expect("run_mapper called without map_worker_id");
    let log = log.new(o!("component" => "mapper-driver"));
    let mut sm = StateMachine::new(log.clone());
    sm.advance(WorkerState::Validated);

    let inputs = expand_glob(&config.input_filepattern)?;
    sm.advance(WorkerState::ResourcesOpen);
    sm.advance(WorkerState::Running);

    if config.map_only {
        let mut channels = OutputChannels::open(&config.output_files, config.output_format)?;
        for pass in 0..config.multipass_map {
            for path in &inputs {
                let mut context = MapContext::for_channels(&mut channels, HashFn::default(), pass, config.max_map_output_size);
                drive_shard(path, config.input_format, config.max_input_line_length, mapper, &mut context, &log)?;
            }
        }
        sm.advance(WorkerState::Draining);
        channels.flush_all()?;
    } else if config.batch_reduction {
        let mut buffers: Vec<SortedBuffer> = (0..config.reduce_workers.len())
            .map(|dest| {
                let filebase = mapper_spill_filebase(&config.reduce_input_filebase, mapper_id, dest);
                SortedBuffer::new(filebase, config.reduce_input_buffer_size_bytes as usize)
            })
            .collect();

        for pass in 0..config.multipass_map {
            for path in &inputs {
                let mut context = MapContext::for_sorted_buffers(&mut buffers, HashFn::default(), pass, config.max_map_output_size);
                drive_shard(path, config.input_format, config.max_input_line_length, mapper, &mut context, &log)?;
            }
        }
        sm.advance(WorkerState::Draining);
        for (dest, buffer) in buffers.into_iter().enumerate() {
            let runs = buffer.close()?;
            info!(log, "spilled runs for destination"; "dest" => dest, "runs" => runs);
        }
    } else {
        let transport = MapperTransport::connect(&config.reduce_workers, config.mapper_message_queue_size_bytes, &log)?;
        for pass in 0..config.multipass_map {
            for path in &inputs {
                let mut context = MapContext::for_transport(&transport, HashFn::default(), pass, config.max_map_output_size);
                drive_shard(path, config.input_format, config.max_input_line_length, mapper, &mut context, &log)?;
            }
        }
        sm.advance(WorkerState::Draining);
        transport.signal_all();
        transport.join()?;
    }

    sm.advance(WorkerState::Finalized);
    Ok(())
}

/// Runs the incremental reducer role: drains `Transport`'s inbound queue,
/// threading each key's accumulator through `BeginReduce`/`PartialReduce`,
/// then calls `EndReduce` once per key after end-of-stream (spec.md §4.5's
/// "Incremental Reducer role" and §8's accumulator-call-count property).
pub fn run_incremental_reducer(config: &JobConfig, reducer: &mut dyn IncrementalReducer, log: &Logger) -> Result<()> {
    let reducer_id = config.reduce_worker_id.expect("run_incremental_reducer called without reduce_worker_id");
    let log = log.new(o!("component" => "reducer-driver"));
    let mut sm = StateMachine::new(log.clone());
    sm.advance(WorkerState::Validated);

    let addr = config.reduce_workers[reducer_id];
    let transport = ReducerTransport::bind(&addr, config.num_map_workers, config.reducer_message_queue_size_bytes, &log)?;
    let mut channels = OutputChannels::open(&config.output_files, config.output_format)?;
    sm.advance(WorkerState::ResourcesOpen);
    sm.advance(WorkerState::Running);

    let mut table: HashMap<Vec<u8>, Box<dyn Any>> = HashMap::new();
    while let Some(payload) = transport.recv() {
        let (key, value) = decode_record(&payload)?;
        match table.remove(&key) {
            Some(mut accumulator) => {
                reducer.partial_reduce(&key, &value, &mut accumulator)?;
                table.insert(key, accumulator);
            }
            None => {
                let accumulator = reducer.begin_reduce(&key, &value);
                table.insert(key, accumulator);
            }
        }
    }

    sm.advance(WorkerState::Draining);
    for (key, accumulator) in table.drain() {
        reducer.end_reduce(&key, accumulator, &mut channels)?;
    }
    channels.flush_all()?;
    transport.join()?;

    sm.advance(WorkerState::Finalized);
    Ok(())
}

/// Runs the batch reducer role: opens the grouped merge iterator over the
/// spill runs the external scheduler has staged for this reducer, calls
/// `Reduce` once per key, then flushes output and deletes the spill files
/// (spec.md §4.5's "Batch Reducer role").
pub fn run_batch_reducer(config: &JobConfig, reducer: &mut dyn BatchReducer, log: &Logger) -> Result<()> {
    let log = log.new(o!("component" => "reducer-driver"));
    let mut sm = StateMachine::new(log.clone());
    sm.advance(WorkerState::Validated);

    let mut iter = GroupedMergeIter::open(&config.reduce_input_filebase, config.num_reduce_input_buffer_files)?;
    let mut channels = OutputChannels::open(&config.output_files, config.output_format)?;
    sm.advance(WorkerState::ResourcesOpen);
    sm.advance(WorkerState::Running);

    while !iter.finished_all() {
        let key = iter.key().to_vec();
        reducer.reduce(&key, &mut iter, &mut channels)?;
        // The user may leave before exhausting this key's values; the
        // driver, not the user, is responsible for reaching `Done`.
        while !iter.done() {
            iter.next()?;
        }
        iter.next_key()?;
    }

    sm.advance(WorkerState::Draining);
    channels.flush_all()?;
    delete_spill_files(&config.reduce_input_filebase, config.num_reduce_input_buffer_files, &log);

    sm.advance(WorkerState::Finalized);
    Ok(())
}

/// Best-effort cleanup of a batch reducer's spill files on successful
/// Finalize (spec.md §6's "Persisted state"). A failure here is logged,
/// not fatal — the job has already produced its output.
fn delete_spill_files(filebase: &str, num_runs: u64, log: &Logger) {
    for i in 0..num_runs {
        let path = run_file_name(filebase, i);
        if let Err(err) = fs::remove_file(&path) {
            warn!(log, "failed to delete spill file"; "path" => %path, "error" => %err);
        }
    }
}

/// Dispatches to the correct role/mode loop based on `config`. This is
/// what `mrlite-worker`'s `main` calls after resolving `mapper_class`/
/// `reducer_class` through the registry.
pub enum Job<'a> {
    Mapper(&'a mut dyn Mapper),
    IncrementalReducer(&'a mut dyn IncrementalReducer),
    BatchReducer(&'a mut dyn BatchReducer),
}

pub fn run(config: &JobConfig, job: Job, log: &Logger) -> Result<()> {
    match job {
        Job::Mapper(mapper) => run_mapper(config, mapper, log),
        Job::IncrementalReducer(reducer) => {
            if config.batch_reduction {
                return Err(DriverError::Configuration(
                    "an IncrementalReducer was supplied for a batch_reduction job".to_string(),
                ));
            }
            run_incremental_reducer(config, reducer, log)
        }
        Job::BatchReducer(reducer) => {
            if !config.batch_reduction {
                return Err(DriverError::Configuration(
                    "a BatchReducer was supplied for an incremental job".to_string(),
                ));
            }
            run_batch_reducer(config, reducer, log)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordFormat;
    use mrlite_io::reader::DEFAULT_MAX_INPUT_LINE_LENGTH;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    struct WordCountMapper;
    impl Mapper for WordCountMapper {
        fn map(&mut self, _key: &[u8], value: &[u8], context: &mut MapContext) -> Result<()> {
            for word in String::from_utf8_lossy(value).split_whitespace() {
                context.output(word.as_bytes(), b"1")?;
            }
            Ok(())
        }
    }

    struct SumReducer;
    impl IncrementalReducer for SumReducer {
        fn begin_reduce(&mut self, _key: &[u8], _value: &[u8]) -> Box<dyn Any> {
            Box::new(1u64)
        }
        fn partial_reduce(&mut self, _key: &[u8], _value: &[u8], accumulator: &mut Box<dyn Any>) -> Result<()> {
            let count = accumulator.downcast_mut::<u64>().unwrap();
            *count += 1;
            Ok(())
        }
        fn end_reduce(&mut self, key: &[u8], accumulator: Box<dyn Any>, output: &mut OutputChannels) -> Result<()> {
            let count = accumulator.downcast::<u64>().unwrap();
            output.write_to_shard(0, key, count.to_string().as_bytes())?;
            Ok(())
        }
    }

    struct SumBatchReducer;
    impl BatchReducer for SumBatchReducer {
        fn reduce(&mut self, key: &[u8], values: &mut mrlite_sorted::GroupedMergeIter, output: &mut OutputChannels) -> Result<()> {
            let mut count = 0u64;
            while !values.done() {
                count += 1;
                values.next()?;
            }
            output.write_to_shard(0, key, count.to_string().as_bytes())?;
            Ok(())
        }
    }

    #[test]
    fn map_only_writes_records_straight_through() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("shard-0.txt");
        fs::write(&input_path, b"the quick brown fox\n").unwrap();
        let output_path = dir.path().join("out-0");

        let config = JobConfig {
            num_map_workers: 1,
            reduce_workers: Vec::new(),
            map_worker_id: Some(0),
            reduce_worker_id: None,
            map_only: true,
            batch_reduction: false,
            mapper_class: "wordcount".to_string(),
            reducer_class: String::new(),
            input_filepattern: dir.path().join("shard-*.txt").to_string_lossy().into_owned(),
            output_files: vec![output_path.to_string_lossy().into_owned()],
            input_format: RecordFormat::Text,
            output_format: RecordFormat::Text,
            reduce_input_filebase: String::new(),
            num_reduce_input_buffer_files: 0,
            reduce_input_buffer_size_bytes: 1 << 20,
            mapper_message_queue_size_bytes: 1 << 20,
            reducer_message_queue_size_bytes: 1 << 20,
            max_map_output_size: 1 << 20,
            log_filebase: None,
            multipass_map: 1,
            max_input_line_length: DEFAULT_MAX_INPUT_LINE_LENGTH,
        };

        let mut mapper = WordCountMapper;
        run_mapper(&config, &mut mapper, &mrlite_base::logging::discard()).unwrap();

        let mut contents = String::new();
        fs::File::open(&output_path).unwrap().read_to_string(&mut contents).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["1", "1", "1", "1"]);
    }

    #[test]
    fn batch_mapper_then_batch_reducer_round_trips_one_destination() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("shard-0.txt"), b"the fox the\n").unwrap();

        let filebase = dir.path().join("spill");
        let config = JobConfig {
            num_map_workers: 1,
            reduce_workers: vec!["127.0.0.1:9001".parse().unwrap()],
            map_worker_id: Some(0),
            reduce_worker_id: None,
            map_only: false,
            batch_reduction: true,
            mapper_class: "wordcount".to_string(),
            reducer_class: "wordcount".to_string(),
            input_filepattern: dir.path().join("shard-*.txt").to_string_lossy().into_owned(),
            output_files: vec![dir.path().join("out-0").to_string_lossy().into_owned()],
            input_format: RecordFormat::Text,
            output_format: RecordFormat::Text,
            reduce_input_filebase: filebase.to_string_lossy().into_owned(),
            num_reduce_input_buffer_files: 0,
            reduce_input_buffer_size_bytes: 1 << 20,
            mapper_message_queue_size_bytes: 1 << 20,
            reducer_message_queue_size_bytes: 1 << 20,
            max_map_output_size: 1 << 20,
            log_filebase: None,
            multipass_map: 1,
            max_input_line_length: DEFAULT_MAX_INPUT_LINE_LENGTH,
        };

        let mut mapper = WordCountMapper;
        run_mapper(&config, &mut mapper, &mrlite_base::logging::discard()).unwrap();

        // Mapper worker 0 spilled for destination 0 under
        // `<reduce_input_filebase>-mapper-00000-reducer-00000`; a real
        // scheduler would move these into the reducer's plain
        // `<reduce_input_filebase>` namespace. Here we do it by hand.
        let mapper_base = mapper_spill_filebase(&config.reduce_input_filebase, 0, 0);
        let src = run_file_name(&mapper_base, 0);
        let dst = run_file_name(&config.reduce_input_filebase, 0);
        fs::rename(&src, &dst).unwrap();

        let mut reducer_config = config.clone();
        reducer_config.map_worker_id = None;
        reducer_config.reduce_worker_id = Some(0);
        reducer_config.num_reduce_input_buffer_files = 1;

        let mut reducer = SumBatchReducer;
        run_batch_reducer(&reducer_config, &mut reducer, &mrlite_base::logging::discard()).unwrap();

        let mut contents = String::new();
        fs::File::open(dir.path().join("out-0")).unwrap().read_to_string(&mut contents).unwrap();
        let mut lines: Vec<&str> = contents.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["1", "2"]); // fox:1, the:2

        // Spill files are deleted on successful Finalize.
        assert!(!Path::new(&dst).exists());
    }
}
