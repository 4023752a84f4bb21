//! WordCount: the canonical MapReduce-Lite job (spec.md §8's seed
//! scenarios 1 and 2). A single algorithm, exercised through all three of
//! the driver's user-facing roles (spec.md §3) — `Mapper`,
//! `IncrementalReducer` and `BatchReducer` — so the same job can run in
//! either `batch_reduction` mode or incremental/streaming mode.

use mrlite_driver::{IncrementalReducer, Mapper, MapContext, OutputChannels};
use mrlite_sorted::GroupedMergeIter;
use std::any::Any;

type Result<T> = mrlite_driver::Result<T>;

/// Splits each input line on whitespace and emits `(word, "1")` for every
/// occurrence.
pub struct WordCountMapper;

impl Mapper for WordCountMapper {
    fn map(&mut self, _key: &[u8], value: &[u8], context: &mut MapContext) -> Result<()> {
        for word in String::from_utf8_lossy(value).split_whitespace() {
            context.output(word.as_bytes(), b"1")?;
        }
        Ok(())
    }
}

/// Sums occurrences per word, one pair at a time, over `Transport`.
pub struct WordCountIncrementalReducer;

impl IncrementalReducer for WordCountIncrementalReducer {
    fn begin_reduce(&mut self, _key: &[u8], value: &[u8]) -> Box<dyn Any> {
        Box::new(parse_count(value))
    }

    fn partial_reduce(&mut self, _key: &[u8], value: &[u8], accumulator: &mut Box<dyn Any>) -> Result<()> {
        let count = accumulator.downcast_mut::<u64>().expect("WordCount accumulator is always a u64");
        *count += parse_count(value);
        Ok(())
    }

    fn end_reduce(&mut self, key: &[u8], accumulator: Box<dyn Any>, output: &mut OutputChannels) -> Result<()> {
        let count = accumulator.downcast::<u64>().expect("WordCount accumulator is always a u64");
        output.write_to_shard(0, key, format_line(key, count).as_bytes())?;
        Ok(())
    }
}

/// Sums occurrences per word by counting the grouped values the batch
/// merge iterator hands back for each key.
pub struct WordCountBatchReducer;

impl mrlite_driver::BatchReducer for WordCountBatchReducer {
    fn reduce(&mut self, key: &[u8], values: &mut GroupedMergeIter, output: &mut OutputChannels) -> Result<()> {
        let mut count = 0u64;
        while !values.done() {
            count += 1;
            values.next()?;
        }
        output.write_to_shard(0, key, format_line(key, count).as_bytes())?;
        Ok(())
    }
}

/// The `text` output format writes only the value and omits the key
/// (spec.md §4.5), so WordCount's reducers fold the word into the value
/// themselves: `<word> <count>`, matching the seed scenarios of spec.md §8.
fn format_line(key: &[u8], count: u64) -> String {
    format!("{} {}", String::from_utf8_lossy(key), count)
}

/// Each emitted value is the literal `"1"`; parsed rather than assumed so
/// the accumulator is genuinely seeded from the first value instead of a
/// hard-coded constant.
fn parse_count(value: &[u8]) -> u64 {
    String::from_utf8_lossy(value).trim().parse().unwrap_or(0)
}

/// Registers all three WordCount implementations under the class name
/// `"wordcount"`, the value `--mapper_class`/`--reducer_class` must carry
/// to select this job.
pub fn register(registries: &mut mrlite_worker::Registries) {
    registries.mappers.register("wordcount", || Box::new(WordCountMapper));
    registries.incremental_reducers.register("wordcount", || Box::new(WordCountIncrementalReducer));
    registries.batch_reducers.register("wordcount", || Box::new(WordCountBatchReducer));
}
