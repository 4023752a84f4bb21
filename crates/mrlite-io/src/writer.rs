//! `output_format` writers (spec.md §4.5): `text` (value + newline, key
//! omitted) and `protofile` (length-prefixed framed `(key, value)` pair).

use std::fs::File;
use std::io::{self, BufWriter, Write as IoWrite};
use std::path::Path;

/// One output channel. `Output(k, v)` on channel 0 per spec.md §4.5; a job
/// opens `NumOutputChannels()` of these at Initialize.
pub trait Writer {
    fn write(&mut self, key: &[u8], value: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Writes `value` followed by `\n`; `key` is accepted for trait uniformity
/// and ignored, per the `text` format's definition.
pub struct TextWriter<W> {
    inner: BufWriter<W>,
}

impl TextWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<TextWriter<File>> {
        Ok(TextWriter {
            inner: BufWriter::new(File::create(path)?),
        })
    }
}

impl<W: IoWrite> TextWriter<W> {
    pub fn new(inner: W) -> TextWriter<W> {
        TextWriter {
            inner: BufWriter::new(inner),
        }
    }
}

impl<W: IoWrite> Writer for TextWriter<W> {
    fn write(&mut self, _key: &[u8], value: &[u8]) -> io::Result<()> {
        self.inner.write_all(value)?;
        self.inner.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writes `[klen][vlen][key][value]`, the same wire layout `Transport`
/// frames carry, so a `protofile` output can be fed straight back in as a
/// `protofile` input elsewhere in the pipeline.
pub struct FramedWriter<W> {
    inner: BufWriter<W>,
}

impl FramedWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<FramedWriter<File>> {
        Ok(FramedWriter {
            inner: BufWriter::new(File::create(path)?),
        })
    }
}

impl<W: IoWrite> FramedWriter<W> {
    pub fn new(inner: W) -> FramedWriter<W> {
        FramedWriter {
            inner: BufWriter::new(inner),
        }
    }
}

impl<W: IoWrite> Writer for FramedWriter<W> {
    fn write(&mut self, key: &[u8], value: &[u8]) -> io::Result<()> {
        let frame = mrlite_base::wire::encode_record(key, value);
        mrlite_base::wire::write_length_prefixed(&mut self.inner, &frame)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
