// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// The position of a row block: the chunk it belongs to, and its index within
/// that chunk. Subchunks order by chunk, then by subchunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subchunk {
    chunk: usize,
    subchunk: usize,
}

impl Subchunk {
    pub fn new(chunk: usize, subchunk: usize) -> Subchunk {
        Subchunk { chunk, subchunk }
    }

    /// The first subchunk of the first chunk.
    pub fn origin() -> Subchunk {
        Subchunk::new(0, 0)
    }

    /// The position after the last subchunk of the last chunk.
    pub fn no_more_data() -> Subchunk {
        Subchunk::new(usize::MAX, usize::MAX)
    }

    pub fn is_no_more_data(&self) -> bool {
        *self == Subchunk::no_more_data()
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }

    pub fn subchunk(&self) -> usize {
        self.subchunk
    }

    pub(crate) fn increment_subchunk(&mut self) {
        self.subchunk += 1;
    }

    pub(crate) fn increment_chunk(&mut self) {
        self.chunk += 1;
        self.subchunk = 0;
    }

    pub(crate) fn reset_subchunk(&mut self) {
        self.subchunk = 0;
    }
}

impl Default for Subchunk {
    fn default() -> Self {
        Subchunk::origin()
    }
}

impl std::fmt::Display for Subchunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_no_more_data() {
            write!(f, "(no more data)")
        } else {
            write!(f, "({},{})", self.chunk, self.subchunk)
        }
    }
}
