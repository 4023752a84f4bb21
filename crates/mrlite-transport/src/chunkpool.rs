use crate::chunk::Chunk;

/// Simple free-list of chunks, so `Buffer` doesn't allocate a fresh 8 KB
/// region on every read past a chunk boundary.
pub struct ChunkPool {
    pool: Vec<Chunk>,
}

impl ChunkPool {
    pub fn new() -> ChunkPool {
        ChunkPool { pool: Vec::new() }
    }

    pub fn alloc(&mut self) -> Chunk {
        self.pool.pop().unwrap_or_else(Chunk::new)
    }

    pub fn reclaim(&mut self, chunk: Chunk) {
        self.pool.push(chunk)
    }
}

impl Default for ChunkPool {
    fn default() -> Self {
        ChunkPool::new()
    }
}
