// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Outer iteration over chunks.

use log::debug;

use crate::{
    selection::FrequencySelections,
    store::{RowGroup, SortKey, StoreError, TableAccessor},
};

/// Walks the chunks (groups of rows sharing a [`SortKey`]) of a table.
/// Chunks on spectral windows that the frequency selections don't want are
/// skipped, and don't count towards chunk indices.
pub struct ChunkCursor {
    table: Box<dyn TableAccessor>,
    chunks: Vec<RowGroup>,
    /// Index into `chunks`; `None` before the first call to `origin_chunks`.
    position: Option<usize>,
}

impl ChunkCursor {
    pub fn new(table: Box<dyn TableAccessor>) -> ChunkCursor {
        ChunkCursor {
            table,
            chunks: vec![],
            position: None,
        }
    }

    pub fn table(&self) -> &dyn TableAccessor {
        self.table.as_ref()
    }

    /// Group the table's rows with `key` and position the cursor on the first
    /// wanted chunk.
    pub fn origin_chunks(
        &mut self,
        key: &SortKey,
        selections: &FrequencySelections,
    ) -> Result<(), StoreError> {
        let groups = self.table.open_grouped_read(key)?;
        let num_groups = groups.len();
        self.chunks = groups
            .into_iter()
            .filter(|g| !g.is_empty() && selections.is_window_selected(g.source, g.spectral_window))
            .collect();
        self.position = Some(0);
        debug!(
            "{} chunks with key {key} ({} skipped by the frequency selection)",
            self.chunks.len(),
            num_groups - self.chunks.len()
        );
        Ok(())
    }

    /// Is the cursor on a chunk?
    pub fn more_chunks(&self) -> bool {
        self.position.map(|p| p < self.chunks.len()).unwrap_or(false)
    }

    /// Move to the following chunk, returning it if there is one.
    pub fn next_chunk(&mut self) -> Option<&RowGroup> {
        let p = self.position.as_mut()?;
        *p = (*p + 1).min(self.chunks.len());
        self.current()
    }

    /// The chunk the cursor is on.
    pub fn current(&self) -> Option<&RowGroup> {
        self.position.and_then(|p| self.chunks.get(p))
    }

    /// Is there a chunk after the current one?
    pub fn has_next_chunk(&self) -> bool {
        self.position.map(|p| p + 1 < self.chunks.len()).unwrap_or(false)
    }

    /// The number of wanted chunks, once started.
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

impl std::fmt::Debug for ChunkCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCursor")
            .field("num_chunks", &self.chunks.len())
            .field("position", &self.position)
            .finish()
    }
}
