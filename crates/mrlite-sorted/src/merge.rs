//! `GroupedMergeIter`: a k-way grouped merge over the run files a
//! [`SortedBuffer`](crate::SortedBuffer) produces (spec.md §4.4). Opens all
//! `F` files, primes each with its first group, and visits keys in
//! ascending order, exposing every value for a key — across every file
//! that has it — before advancing.

use mrlite_base::varint::read_varint32;
use mrlite_base::wire::read_length_prefixed;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::run_file_name;

#[derive(Debug)]
pub enum MergeError {
    Io(io::Error),
    Wire(mrlite_base::WireError),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::Io(err) => write!(f, "i/o error: {}", err),
            MergeError::Wire(err) => write!(f, "wire format error: {}", err),
        }
    }
}

impl std::error::Error for MergeError {}

impl From<io::Error> for MergeError {
    fn from(err: io::Error) -> Self {
        MergeError::Io(err)
    }
}

impl From<mrlite_base::WireError> for MergeError {
    fn from(err: mrlite_base::WireError) -> Self {
        MergeError::Wire(err)
    }
}

/// One open run file, primed with its current group (key + all values
/// sharing it, read eagerly since the group's count is already known).
struct RunFile {
    reader: BufReader<File>,
    current_key: Vec<u8>,
    values: Vec<Vec<u8>>,
    value_idx: usize,
    /// `true` once this file has yielded every group it has.
    exhausted: bool,
}

impl RunFile {
    fn open(path: &Path) -> Result<RunFile, MergeError> {
        let file = File::open(path)?;
        let mut run = RunFile {
            reader: BufReader::new(file),
            current_key: Vec::new(),
            values: Vec::new(),
            value_idx: 0,
            exhausted: false,
        };
        run.advance_group()?;
        Ok(run)
    }

    /// Reads the next group (key + values) from the underlying file. Marks
    /// the file exhausted on a clean EOF at a group boundary.
    fn advance_group(&mut self) -> Result<(), MergeError> {
        let key = match read_length_prefixed(&mut self.reader) {
            Ok(key) => key,
            Err(mrlite_base::WireError::Io(ref err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                self.exhausted = true;
                self.values.clear();
                self.value_idx = 0;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let n = read_varint32(&mut self.reader)?;
        let mut values = Vec::with_capacity(n as usize);
        for _ in 0..n {
            values.push(read_length_prefixed(&mut self.reader)?);
        }
        self.current_key = key;
        self.values = values;
        self.value_idx = 0;
        Ok(())
    }

    fn has_more_values(&self) -> bool {
        self.value_idx < self.values.len()
    }

    fn current_value(&self) -> &[u8] {
        &self.values[self.value_idx]
    }
}

/// One entry in the min-heap of files ordered by their current key.
/// `std::collections::BinaryHeap` is a max-heap, so ordering is reversed to
/// pop the lexicographically smallest key first; ties between files sharing
/// a key are broken by file index, which is arbitrary but stable.
struct HeapEntry {
    key: Vec<u8>,
    file_idx: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.file_idx == other.file_idx
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.file_idx.cmp(&self.file_idx))
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Grouped merge iterator over `F` run files written under a common
/// `<filebase>`. See spec.md §4.4 for the operation contract:
/// `Key`/`Value`/`Next`/`NextKey`/`FinishedAll`.
pub struct GroupedMergeIter {
    files: Vec<RunFile>,
    heap: BinaryHeap<HeapEntry>,
    current_key: Vec<u8>,
    /// Files still owing values for `current_key`, not yet started.
    pending: VecDeque<usize>,
    /// File currently being drained for `current_key`'s values, if any.
    active: Option<usize>,
    /// `true` once every file contributing to `current_key` is drained.
    done: bool,
    /// `true` before the first `NextKey` call; no key has been adopted yet.
    primed: bool,
}

impl GroupedMergeIter {
    /// Opens all `F` run files named `<filebase>-<10-digit index>` and
    /// primes the merge, positioning at the first key.
    pub fn open<P: AsRef<Path>>(filebase: P, num_runs: u64) -> Result<GroupedMergeIter, MergeError> {
        let base = filebase.as_ref().to_string_lossy().into_owned();
        let mut files = Vec::with_capacity(num_runs as usize);
        for i in 0..num_runs {
            files.push(RunFile::open(Path::new(&run_file_name(&base, i)))?);
        }

        let mut heap = BinaryHeap::new();
        for (idx, run) in files.iter().enumerate() {
            if !run.exhausted {
                heap.push(HeapEntry {
                    key: run.current_key.clone(),
                    file_idx: idx,
                });
            }
        }

        let mut iter = GroupedMergeIter {
            files,
            heap,
            current_key: Vec::new(),
            pending: VecDeque::new(),
            active: None,
            done: true,
            primed: false,
        };
        if !iter.heap.is_empty() {
            iter.next_key()?;
        }
        Ok(iter)
    }

    /// The key currently being visited.
    pub fn key(&self) -> &[u8] {
        &self.current_key
    }

    /// The value under the current key that `Next` will advance past.
    /// Panics if called after `FinishedAll` or while `Done`.
    pub fn value(&self) -> &[u8] {
        let idx = self.active.expect("value() called with no active file");
        self.files[idx].current_value()
    }

    /// `true` once every file contributing to the current key has been
    /// drained of its values.
    pub fn done(&self) -> bool {
        self.done
    }

    /// `true` once there is no more data in any run file.
    pub fn finished_all(&self) -> bool {
        self.heap.is_empty() && self.pending.is_empty() && self.active.is_none() && self.done
    }

    /// Advances within the current key's value list, pulling in the next
    /// contributing file when one is exhausted, and setting `Done` once all
    /// contributing files are drained.
    pub fn next(&mut self) -> Result<(), MergeError> {
        let idx = match self.active {
            Some(idx) => idx,
            None => {
                self.done = true;
                return Ok(());
            }
        };

        self.files[idx].value_idx += 1;
        if !self.files[idx].has_more_values() {
            self.files[idx].advance_group()?;
            if !self.files[idx].exhausted {
                self.heap.push(HeapEntry {
                    key: self.files[idx].current_key.clone(),
                    file_idx: idx,
                });
            }
            self.active = self.pending.pop_front();
            if self.active.is_none() {
                self.done = true;
            }
        }
        Ok(())
    }

    /// Adopts the heap-top key as the new current key. Requires `Done`.
    pub fn next_key(&mut self) -> Result<(), MergeError> {
        debug_assert!(self.done || !self.primed, "NextKey called before Done");
        self.primed = true;

        self.current_key.clear();
        self.pending.clear();
        self.active = None;
        self.done = false;

        if let Some(top) = self.heap.peek() {
            self.current_key = top.key.clone();
        } else {
            self.done = true;
            return Ok(());
        }

        while let Some(top) = self.heap.peek() {
            if top.key != self.current_key {
                break;
            }
            let entry = self.heap.pop().unwrap();
            self.pending.push_back(entry.file_idx);
        }

        self.active = self.pending.pop_front();
        if self.active.is_none() {
            self.done = true;
        }
        Ok(())
    }
}
