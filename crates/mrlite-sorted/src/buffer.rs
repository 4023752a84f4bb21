//! `SortedBuffer`: ingest side of the external sort (spec.md §4.4). Pairs
//! are accumulated in an [`Arena`] up to a configured budget `B`; crossing
//! the budget triggers a flush that stable-sorts an index of
//! `(key_piece, value_piece)` descriptors and writes one sorted, grouped run
//! file per flush.

use crate::arena::Arena;
use crate::run_file_name;
use mrlite_base::varint::write_varint32;
use mrlite_base::wire::write_length_prefixed;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum SortedBufferError {
    Io(io::Error),
    /// A single `(key, value)` pair is larger than the configured budget
    /// `B`, so it cannot fit even in a freshly flushed arena.
    RecordExceedsBudget { size: usize, budget: usize },
}

impl fmt::Display for SortedBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortedBufferError::Io(err) => write!(f, "i/o error: {}", err),
            SortedBufferError::RecordExceedsBudget { size, budget } => write!(
                f,
                "record of {} bytes exceeds SortedBuffer budget of {} bytes",
                size, budget
            ),
        }
    }
}

impl std::error::Error for SortedBufferError {}

impl From<io::Error> for SortedBufferError {
    fn from(err: io::Error) -> Self {
        SortedBufferError::Io(err)
    }
}

/// One arena-resident `(key, value)` pair, as a pair of `(offset, length)`
/// descriptors. Only these descriptors move during sort.
#[derive(Clone, Copy)]
struct Entry {
    key: (usize, usize),
    value: (usize, usize),
}

/// Bounded-memory ingest buffer that spills sorted, grouped runs to
/// `<filebase>-<10-digit run index>` files.
pub struct SortedBuffer {
    filebase: PathBuf,
    budget: usize,
    arena: Arena,
    index: Vec<Entry>,
    next_run: u64,
}

impl SortedBuffer {
    /// `budget` is `B` in bytes: the in-memory arena is flushed once it
    /// would exceed this many live payload bytes.
    pub fn new<P: AsRef<Path>>(filebase: P, budget: usize) -> SortedBuffer {
        assert!(budget > 0, "SortedBuffer budget must be positive");
        SortedBuffer {
            filebase: filebase.as_ref().to_path_buf(),
            budget,
            arena: Arena::with_capacity(budget.min(1 << 20)),
            index: Vec::new(),
            next_run: 0,
        }
    }

    /// Number of run files written so far.
    pub fn num_runs(&self) -> u64 {
        self.next_run
    }

    fn entry_size(key: &[u8], value: &[u8]) -> usize {
        key.len() + value.len() + 2 * std::mem::size_of::<u32>()
    }

    /// Inserts `(key, value)`. Flushes first if the arena cannot hold the
    /// new pair; if it still cannot hold it after a flush, the pair alone
    /// exceeds the budget and this is a fatal configuration mismatch.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), SortedBufferError> {
        let size = Self::entry_size(key, value);
        if self.arena.len() + size > self.budget {
            self.flush()?;
        }
        if size > self.budget {
            return Err(SortedBufferError::RecordExceedsBudget {
                size,
                budget: self.budget,
            });
        }

        let key_piece = self.arena.push(key);
        let value_piece = self.arena.push(value);
        self.index.push(Entry {
            key: key_piece,
            value: value_piece,
        });
        Ok(())
    }

    /// Stable-sorts the index by key and writes one run file of grouped,
    /// strictly-ascending-key records, then resets the arena for reuse.
    /// A no-op if nothing has been inserted since the last flush.
    pub fn flush(&mut self) -> Result<(), SortedBufferError> {
        if self.index.is_empty() {
            return Ok(());
        }

        self.index
            .sort_by(|a, b| self.arena.get(a.key.0, a.key.1).cmp(self.arena.get(b.key.0, b.key.1)));

        let path = run_file_name(self.filebase.to_string_lossy().as_ref(), self.next_run);
        let file = File::create(&path)?;
        let mut out = BufWriter::new(file);

        let mut i = 0;
        while i < self.index.len() {
            let key = {
                let k = self.index[i].key;
                self.arena.get(k.0, k.1)
            };
            let mut j = i + 1;
            while j < self.index.len() && self.arena.get(self.index[j].key.0, self.index[j].key.1) == key {
                j += 1;
            }

            write_length_prefixed(&mut out, key)?;
            write_varint32(&mut out, (j - i) as u32)?;
            for entry in &self.index[i..j] {
                let v = self.arena.get(entry.value.0, entry.value.1);
                write_length_prefixed(&mut out, v)?;
            }

            i = j;
        }

        out.flush()?;
        self.next_run += 1;
        self.index.clear();
        self.arena.reset();
        Ok(())
    }

    /// Flushes any remaining in-memory pairs and returns the number of run
    /// files this buffer has produced in total.
    pub fn close(mut self) -> Result<u64, SortedBufferError> {
        self.flush()?;
        Ok(self.next_run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::GroupedMergeIter;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn flush_produces_strictly_ascending_keys() {
        let dir = tempdir().unwrap();
        let filebase = dir.path().join("run");
        let mut buf = SortedBuffer::new(&filebase, 1 << 16);
        buf.insert(b"fox", b"1").unwrap();
        buf.insert(b"brown", b"1").unwrap();
        buf.insert(b"fox", b"1").unwrap();
        let runs = buf.close().unwrap();
        assert_eq!(runs, 1);

        let mut it = GroupedMergeIter::open(&filebase, runs).unwrap();
        let mut seen = Vec::new();
        while !it.finished_all() {
            seen.push(it.key().to_vec());
            while !it.done() {
                it.next().unwrap();
            }
            it.next_key().unwrap();
        }
        assert_eq!(seen, vec![b"brown".to_vec(), b"fox".to_vec()]);
    }

    #[test]
    fn insert_past_budget_triggers_a_flush() {
        let dir = tempdir().unwrap();
        let filebase = dir.path().join("run");
        // Budget barely fits one ~(3 + 1 + 8) = 12 byte entry.
        let mut buf = SortedBuffer::new(&filebase, 16);
        buf.insert(b"abc", b"1").unwrap();
        buf.insert(b"xyz", b"2").unwrap();
        let runs = buf.close().unwrap();
        assert!(runs >= 2, "expected at least two flushed runs, got {}", runs);
    }

    #[test]
    fn record_larger_than_budget_is_fatal() {
        let dir = tempdir().unwrap();
        let filebase = dir.path().join("run");
        let mut buf = SortedBuffer::new(&filebase, 8);
        let big_value = vec![0u8; 64];
        assert!(matches!(
            buf.insert(b"k", &big_value),
            Err(SortedBufferError::RecordExceedsBudget { .. })
        ));
    }

    #[test]
    fn multiset_survives_flush_and_merge() {
        let dir = tempdir().unwrap();
        let filebase = dir.path().join("run");
        let mut buf = SortedBuffer::new(&filebase, 64);

        let mut expected: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
        let pairs: Vec<(&[u8], &[u8])> = vec![
            (b"the", b"1"),
            (b"quick", b"1"),
            (b"the", b"1"),
            (b"fox", b"1"),
            (b"the", b"1"),
        ];
        for (k, v) in &pairs {
            buf.insert(k, v).unwrap();
            expected.entry(k.to_vec()).or_default().push(v.to_vec());
        }
        let runs = buf.close().unwrap();

        let mut it = GroupedMergeIter::open(&filebase, runs).unwrap();
        let mut actual: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
        while !it.finished_all() {
            let key = it.key().to_vec();
            while !it.done() {
                actual.entry(key.clone()).or_default().push(it.value().to_vec());
                it.next().unwrap();
            }
            it.next_key().unwrap();
        }
        for values in actual.values_mut() {
            values.sort();
        }
        for values in expected.values_mut() {
            values.sort();
        }
        assert_eq!(actual, expected);
    }

    #[test]
    fn empty_key_and_value_survive_a_round_trip() {
        let dir = tempdir().unwrap();
        let filebase = dir.path().join("run");
        let mut buf = SortedBuffer::new(&filebase, 64);
        buf.insert(b"", b"").unwrap();
        let runs = buf.close().unwrap();

        let mut it = GroupedMergeIter::open(&filebase, runs).unwrap();
        assert_eq!(it.key(), b"");
        assert_eq!(it.value(), b"");
    }
}
