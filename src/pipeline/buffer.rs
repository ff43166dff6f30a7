use bytes::Bytes;

/// Accumulates encoded fragments into chunks bounded by `chunk_limit` bytes.
#[derive(Debug)]
pub struct ChunkBuffer {
    chunk_limit: usize,
    fragments: Vec<Bytes>,
    size: usize,
}

impl ChunkBuffer {
    pub fn new(chunk_limit: usize) -> Self {
        Self {
            chunk_limit,
            fragments: Vec::new(),
            size: 0,
        }
    }

    /// Add a fragment, returning the previous chunk if this one would overflow it.
    ///
    /// A fragment larger than the limit still becomes a chunk of its own and is
    /// left for the size check to judge.
    pub fn push(&mut self, fragment: Bytes) -> Option<Vec<Bytes>> {
        let full = if !self.fragments.is_empty() && self.size + fragment.len() > self.chunk_limit
        {
            Some(self.take())
        } else {
            None
        };

        self.size += fragment.len();
        self.fragments.push(fragment);
        full
    }

    /// Drain the current chunk.
    pub fn take(&mut self) -> Vec<Bytes> {
        self.size = 0;
        std::mem::take(&mut self.fragments)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Bytes currently buffered.
    pub fn size(&self) -> usize {
        self.size
    }
}
