//! A dynamically sized, double-ended byte FIFO: bytes are appended at the
//! head and drained from the tail. Used as the write-side staging buffer
//! for a [`crate::connector::SendConnector`] and the read-side staging
//! buffer for a [`crate::connector::RecvConnector`].
//!
//! Adapted from the originating codebase's `networking::buffer::Buffer`:
//! same chunk-list-plus-pool design, generalized to any `io::Read`/`Write`
//! so it drops straight onto a `mio::net::TcpStream`.

use crate::chunk::Chunk;
use crate::chunkpool::ChunkPool;
use std::collections::VecDeque;
use std::io;

pub struct Buffer {
    chunks: VecDeque<Chunk>,
    pool: ChunkPool,
}

impl Buffer {
    #[inline]
    pub fn new() -> Buffer {
        let mut chunks = VecDeque::new();
        chunks.push_back(Chunk::new());
        Buffer {
            chunks,
            pool: ChunkPool::new(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.len() == 1 && self.chunks[0].remaining_data() == 0
    }

    /// Appends `bytes` to the tail of the FIFO, growing as needed.
    pub fn push(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let chunk = self.chunks.back_mut().unwrap();
            let take = bytes.len().min(chunk.capacity());
            if take == 0 {
                self.chunks.push_back(self.pool.alloc());
                continue;
            }
            chunk.writeable_slice()[..take].copy_from_slice(&bytes[..take]);
            chunk.expand(take);
            bytes = &bytes[take..];
        }
    }

    /// Writes as much of the buffered data as `writer` accepts. Returns
    /// `Ok(n)` for the number of bytes written; a `WouldBlock` error part
    /// way through is swallowed and reported as the count written so far.
    pub fn egress<W: io::Write>(&mut self, mut writer: W) -> io::Result<usize> {
        let mut total = 0usize;
        loop {
            let chunk = self.chunks.front_mut().unwrap();
            if chunk.remaining_data() == 0 {
                return Ok(total);
            }
            match writer.write(chunk.readable_slice()) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    chunk.advance(n);
                    total += n;
                    if chunk.remaining_data() == 0 && self.chunks.len() > 1 {
                        let spent = self.chunks.pop_front().unwrap();
                        self.pool.reclaim(spent);
                    }
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(total),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Reads as much as `reader` offers into the FIFO. Returns `Ok(n)` for
    /// the number of bytes read; a `WouldBlock` partway through is
    /// swallowed and reported as the count read so far. `Ok(0)` on a real
    /// reader means EOF — callers distinguish EOF from "nothing available
    /// right now" the same way `std::io::Read` always has.
    pub fn ingress<R: io::Read>(&mut self, mut reader: R) -> io::Result<usize> {
        let mut total = 0usize;
        loop {
            let chunk = self.chunks.back_mut().unwrap();
            if chunk.capacity() == 0 {
                self.chunks.push_back(self.pool.alloc());
                continue;
            }
            match reader.read(chunk.writeable_slice()) {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    chunk.expand(n);
                    total += n;
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(total),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Drains up to `len` bytes from the head of the FIFO into a fresh
    /// `Vec`. Panics if fewer than `len` bytes are buffered — callers must
    /// check `len()` first.
    pub fn take(&mut self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        let mut filled = 0usize;
        while filled < len {
            let chunk = self.chunks.front_mut().unwrap();
            let available = chunk.remaining_data();
            assert!(available > 0, "Buffer::take called with fewer than len bytes buffered");
            let want = (len - filled).min(available);
            out[filled..filled + want].copy_from_slice(&chunk.readable_slice()[..want]);
            chunk.advance(want);
            filled += want;
            if chunk.remaining_data() == 0 && self.chunks.len() > 1 {
                let spent = self.chunks.pop_front().unwrap();
                self.pool.reclaim(spent);
            }
        }
        out
    }

    /// Total bytes currently buffered, head to tail.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Chunk::remaining_data).sum()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}
