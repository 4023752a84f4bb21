//! `OutputChannels`: the `O`-wide set of output files a worker writes
//! records into (spec.md §3's `OutputToShard`/`OutputToAllShards`).

use crate::config::RecordFormat;
use crate::error::{DriverError, Result};
use mrlite_io::{FramedWriter, TextWriter, Writer};
use std::path::Path;

/// Owns one `Writer` per output channel, in flag order. A map-only worker
/// writes through a single channel; a reducer fans its output across
/// `output_files` by caller-chosen shard index.
pub struct OutputChannels {
    channels: Vec<Box<dyn Writer>>,
}

impl OutputChannels {
    pub fn new(channels: Vec<Box<dyn Writer>>) -> Result<OutputChannels> {
        if channels.is_empty() {
            return Err(DriverError::Configuration("at least one output channel is required".to_string()));
        }
        Ok(OutputChannels { channels })
    }

    /// Opens one writer per path in `output_files`, in order, in the
    /// configured `output_format` (spec.md §6's `output_files`/
    /// `output_format` flags).
    pub fn open(output_files: &[String], format: RecordFormat) -> Result<OutputChannels> {
        let mut channels: Vec<Box<dyn Writer>> = Vec::with_capacity(output_files.len());
        for path in output_files {
            let writer: Box<dyn Writer> = match format {
                RecordFormat::Text => Box::new(TextWriter::create(Path::new(path))?),
                RecordFormat::Protofile => Box::new(FramedWriter::create(Path::new(path))?),
            };
            channels.push(writer);
        }
        OutputChannels::new(channels)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Writes to a single named shard. `OutputToShard` in spec.md §3.
    pub fn write_to_shard(&mut self, shard: usize, key: &[u8], value: &[u8]) -> Result<()> {
        let channel = self
            .channels
            .get_mut(shard)
            .ok_or_else(|| DriverError::UserContract(format!("output shard {} does not exist", shard)))?;
        channel.write(key, value)?;
        Ok(())
    }

    /// Writes to every channel. `OutputToAllShards` in spec.md §3.
    pub fn write_to_all(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        for channel in self.channels.iter_mut() {
            channel.write(key, value)?;
        }
        Ok(())
    }

    pub fn flush_all(&mut self) -> Result<()> {
        for channel in self.channels.iter_mut() {
            channel.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct RecordingWriter {
        records: Rc<RefCell<Vec<(Vec<u8>, Vec<u8>)>>>,
    }

    impl Writer for RecordingWriter {
        fn write(&mut self, key: &[u8], value: &[u8]) -> std::io::Result<()> {
            self.records.borrow_mut().push((key.to_vec(), value.to_vec()));
            Ok(())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_to_all_reaches_every_channel() {
        let a = Rc::new(RefCell::new(Vec::new()));
        let b = Rc::new(RefCell::new(Vec::new()));
        let mut channels = OutputChannels::new(vec![
            Box::new(RecordingWriter { records: a.clone() }),
            Box::new(RecordingWriter { records: b.clone() }),
        ])
        .unwrap();

        channels.write_to_all(b"k", b"v").unwrap();

        assert_eq!(a.borrow().len(), 1);
        assert_eq!(b.borrow().len(), 1);
    }

    #[test]
    fn write_to_unknown_shard_is_a_user_contract_error() {
        let mut channels = OutputChannels::new(vec![Box::new(RecordingWriter {
            records: Rc::new(RefCell::new(Vec::new())),
        })])
        .unwrap();

        assert!(matches!(channels.write_to_shard(5, b"k", b"v"), Err(DriverError::UserContract(_))));
    }
}
