//! Record-format readers: `text` (line-oriented, key omitted) and
//! `protofile` (length-prefixed framed `(key, value)` pairs), matching the
//! `input_format` flag of spec.md §6.

use slog::{warn, Logger};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// A sequential source of `(key, value)` records over one input shard.
/// `read` returning `Ok(None)` is ordinary end of input, not an error; a
/// malformed record is the caller's concern to log and skip per spec.md §7.
pub trait Reader {
    fn read(&mut self) -> io::Result<Option<(Vec<u8>, Vec<u8>)>>;
}

/// Default bound on a `text`-format input line, matching the original's
/// `kDefaultMaxInputLineLength` (16 KB).
pub const DEFAULT_MAX_INPUT_LINE_LENGTH: usize = 16 * 1024;

/// Reads newline-delimited text. Each line becomes one record with an
/// empty key and the line's bytes (newline stripped) as the value,
/// mirroring the symmetric `text` output format's "value + newline; key
/// omitted". A line longer than `max_line_length` is not fatal (spec.md
/// §7): it is skipped with a `warn!` and reading resumes at the next line.
pub struct TextReader<R> {
    inner: BufReader<R>,
    max_line_length: usize,
    log: Logger,
}

impl TextReader<File> {
    pub fn open<P: AsRef<Path>>(path: P, max_line_length: usize, log: Logger) -> io::Result<TextReader<File>> {
        Ok(TextReader {
            inner: BufReader::new(File::open(path)?),
            max_line_length,
            log,
        })
    }
}

impl<R: Read> TextReader<R> {
    pub fn new(inner: R, max_line_length: usize, log: Logger) -> TextReader<R> {
        TextReader {
            inner: BufReader::new(inner),
            max_line_length,
            log,
        }
    }
}

impl<R: Read> Reader for TextReader<R> {
    fn read(&mut self) -> io::Result<Option<(Vec<u8>, Vec<u8>)>> {
        loop {
            let mut line = Vec::new();
            let read = self.inner.read_until(b'\n', &mut line)?;
            if read == 0 {
                return Ok(None);
            }

            if line.last() == Some(&b'\n') {
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
            }

            if line.len() > self.max_line_length {
                warn!(self.log, "skipping too-long input line";
                    "length" => line.len(), "limit" => self.max_line_length);
                continue;
            }

            return Ok(Some((Vec::new(), line)));
        }
    }
}

/// Reads the length-prefixed `[klen][vlen][key][value]` records produced by
/// [`crate::writer::FramedWriter`] (the `protofile` format), sharing the
/// wire layout `Transport` uses between workers.
pub struct FramedReader<R> {
    inner: BufReader<R>,
}

impl FramedReader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<FramedReader<File>> {
        Ok(FramedReader {
            inner: BufReader::new(File::open(path)?),
        })
    }
}

impl<R: Read> FramedReader<R> {
    pub fn new(inner: R) -> FramedReader<R> {
        FramedReader {
            inner: BufReader::new(inner),
        }
    }
}

impl<R: Read> Reader for FramedReader<R> {
    fn read(&mut self) -> io::Result<Option<(Vec<u8>, Vec<u8>)>> {
        let frame = match mrlite_base::wire::read_length_prefixed(&mut self.inner) {
            Ok(frame) => frame,
            Err(mrlite_base::WireError::Io(ref err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(None)
            }
            Err(mrlite_base::WireError::Io(err)) => return Err(err),
            Err(other) => return Err(io::Error::new(io::ErrorKind::InvalidData, other.to_string())),
        };
        mrlite_base::wire::decode_record(&frame)
            .map(Some)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    }
}
