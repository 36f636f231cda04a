// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Two-level iteration over the rows of a visibility table.
//!
//! Rows are grouped into chunks by a [`SortKey`]; each chunk is then walked
//! one subchunk (row block) at a time. The usual loop is:
//!
//! ```ignore
//! cursor.origin_chunks()?;
//! while cursor.more_chunks() {
//!     cursor.origin()?;
//!     while cursor.more() {
//!         let block = cursor.next()?;
//!         // ...
//!     }
//!     cursor.next_chunk()?;
//! }
//! ```

mod block;
mod chunk;
mod error;
mod subchunk;

pub use block::RowBlock;
pub use chunk::ChunkCursor;
pub use error::IterationStateError;
pub use subchunk::Subchunk;

use std::ops::Range;
use std::sync::Arc;

use hifitime::Epoch;
use log::{debug, trace, warn};

use crate::{
    config::{ConfigError, CursorConfig},
    error::CursorError,
    math::average_epoch,
    selection::{
        ChannelFrameResolver, ChannelSelection, FrequencyConverter, FrequencySelections,
        IdentityConverter,
    },
    store::{ColumnSet, RowGroup, SortKey, StoreError, TableAccessor},
    weights::WeightScaling,
};

/// Where a [`SubchunkCursor`] is in its iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// `origin_chunks` hasn't been called.
    Unstarted,
    /// On a chunk, before its first subchunk.
    AtChunkOrigin,
    /// Some, but not all, subchunks of the chunk have been read.
    MidChunk,
    /// Every subchunk of the chunk has been read.
    ChunkExhausted,
    /// There are no more chunks.
    AllExhausted,
    /// An error was returned; only `origin_chunks` will help.
    Failed,
}

/// Settings changes that take effect at the next `origin_chunks`.
#[derive(Debug, Default)]
struct PendingChanges {
    selections: Option<FrequencySelections>,
    row_blocking: Option<Option<usize>>,
    time_interval: Option<f64>,
}

impl PendingChanges {
    fn is_empty(&self) -> bool {
        self.selections.is_none() && self.row_blocking.is_none() && self.time_interval.is_none()
    }
}

/// Walks the subchunks of each chunk of a table, producing [`RowBlock`]s
/// containing only the selected channels.
///
/// Frequency selections are resolved into channels once per chunk, at the
/// average time of the chunk's rows.
pub struct SubchunkCursor {
    chunks: ChunkCursor,
    sort_key: SortKey,
    /// If set, a subchunk is up to this many rows. Otherwise, a subchunk is
    /// all of the consecutive rows sharing a timestamp.
    row_blocking: Option<usize>,
    columns: ColumnSet,
    weight_scaling: WeightScaling,
    selections: FrequencySelections,
    converter: Arc<dyn FrequencyConverter>,
    /// One per data source.
    resolvers: Vec<ChannelFrameResolver>,
    pending: PendingChanges,

    state: CursorState,
    position: Subchunk,

    subchunk_rows: Vec<Range<usize>>,
    resolved: Option<ChannelSelection>,
    channels: Vec<usize>,
    frequencies_hz: Vec<f64>,
}

static_assertions::assert_impl_all!(SubchunkCursor: Send);

impl SubchunkCursor {
    /// A cursor with the default sort key, no frequency selection and
    /// unscaled weights.
    pub fn new(table: Box<dyn TableAccessor>) -> SubchunkCursor {
        SubchunkCursor {
            chunks: ChunkCursor::new(table),
            sort_key: SortKey::default(),
            row_blocking: None,
            columns: ColumnSet::default(),
            weight_scaling: WeightScaling::default(),
            selections: FrequencySelections::new(),
            converter: Arc::new(IdentityConverter),
            resolvers: vec![],
            pending: PendingChanges::default(),
            state: CursorState::Unstarted,
            position: Subchunk::origin(),
            subchunk_rows: vec![],
            resolved: None,
            channels: vec![],
            frequencies_hz: vec![],
        }
    }

    /// A cursor set up by a (validated) config.
    pub fn from_config(
        table: Box<dyn TableAccessor>,
        config: &CursorConfig,
    ) -> Result<SubchunkCursor, CursorError> {
        config.validate()?;
        let cursor = SubchunkCursor::new(table)
            .with_sort_key(config.sort_key())
            .with_row_blocking(config.row_blocking)?
            .with_weight_scaling(config.weight_scaling()?)
            .with_columns(config.column_set());
        Ok(cursor)
    }

    pub fn with_sort_key(mut self, sort_key: SortKey) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn with_row_blocking(mut self, row_blocking: Option<usize>) -> Result<Self, CursorError> {
        if row_blocking == Some(0) {
            return Err(ConfigError::ZeroRowBlocking.into());
        }
        self.row_blocking = row_blocking;
        Ok(self)
    }

    pub fn with_weight_scaling(mut self, weight_scaling: WeightScaling) -> Self {
        self.weight_scaling = weight_scaling;
        self
    }

    /// Read these columns; the mandatory columns are always read.
    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    /// Use this to convert frame selections into the observed frame. Without
    /// one, every frame is treated as the observed frame.
    pub fn with_frequency_converter(mut self, converter: Arc<dyn FrequencyConverter>) -> Self {
        self.converter = converter;
        self.resolvers.clear();
        self
    }

    pub fn with_frequency_selections(
        mut self,
        selections: FrequencySelections,
    ) -> Result<Self, CursorError> {
        selections.finalise(self.chunks.table().num_sources())?;
        self.selections = selections;
        Ok(self)
    }

    /// Change the frequency selections. This takes effect at the next
    /// `origin_chunks`.
    pub fn set_frequency_selections(
        &mut self,
        selections: FrequencySelections,
    ) -> Result<(), CursorError> {
        selections.finalise(self.chunks.table().num_sources())?;
        self.pending.selections = Some(selections);
        Ok(())
    }

    /// Change the row blocking. This takes effect at the next
    /// `origin_chunks`.
    pub fn set_row_blocking(&mut self, row_blocking: Option<usize>) -> Result<(), CursorError> {
        if row_blocking == Some(0) {
            return Err(ConfigError::ZeroRowBlocking.into());
        }
        self.pending.row_blocking = Some(row_blocking);
        Ok(())
    }

    /// Change the time interval \[seconds\] of the sort key. This takes
    /// effect at the next `origin_chunks`.
    pub fn set_time_interval(&mut self, time_interval: f64) -> Result<(), CursorError> {
        if !time_interval.is_finite() || time_interval < 0.0 {
            return Err(ConfigError::NegativeInterval(time_interval).into());
        }
        self.pending.time_interval = Some(time_interval);
        Ok(())
    }

    fn apply_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        if let Some(selections) = pending.selections {
            debug!("New frequency selections: {selections}");
            self.selections = selections;
        }
        if let Some(row_blocking) = pending.row_blocking {
            debug!("New row blocking: {row_blocking:?}");
            self.row_blocking = row_blocking;
        }
        if let Some(time_interval) = pending.time_interval {
            debug!("New time interval: {time_interval} s");
            self.sort_key = self.sort_key.with_time_interval(time_interval);
        }
    }

    fn check_usable(&self) -> Result<(), IterationStateError> {
        match self.state {
            CursorState::Unstarted => Err(IterationStateError::NotStarted),
            _ if !self.pending.is_empty() => Err(IterationStateError::PendingChanges),
            CursorState::Failed => Err(IterationStateError::Failed),
            _ => Ok(()),
        }
    }

    /// Apply any pending changes, regroup the table's rows and go to the
    /// first subchunk of the first chunk.
    pub fn origin_chunks(&mut self) -> Result<(), CursorError> {
        self.apply_pending();
        let result = self.start();
        if result.is_err() {
            self.state = CursorState::Failed;
        }
        result
    }

    fn start(&mut self) -> Result<(), CursorError> {
        let table = self.chunks.table();
        if self.resolvers.len() != table.num_sources() {
            self.resolvers = (0..table.num_sources())
                .map(|s| {
                    Ok(ChannelFrameResolver::new(
                        table.spectral_metadata(s)?,
                        Arc::clone(&self.converter),
                    ))
                })
                .collect::<Result<_, StoreError>>()?;
        }
        self.chunks.origin_chunks(&self.sort_key, &self.selections)?;
        self.position = Subchunk::origin();
        self.enter_chunk()
    }

    /// Work out the subchunks and channels of the chunk the chunk cursor is
    /// on.
    fn enter_chunk(&mut self) -> Result<(), CursorError> {
        self.subchunk_rows.clear();
        self.resolved = None;
        self.channels.clear();
        self.frequencies_hz.clear();

        let group = match self.chunks.current() {
            Some(g) => g,
            None => {
                debug!("No more chunks");
                self.state = CursorState::AllExhausted;
                self.position = Subchunk::no_more_data();
                return Ok(());
            }
        };
        let num_sources = self.resolvers.len();
        let resolver =
            self.resolvers
                .get_mut(group.source)
                .ok_or(StoreError::UnknownSource {
                    got: group.source,
                    num_sources,
                })?;
        let window = group.spectral_window;
        let num_chans = resolver.num_channels(window)?;
        let (resolved, channels) = match average_epoch(&group.times) {
            Some(epoch) => {
                let resolved = self.selections.resolve(group.source, resolver, epoch)?;
                let channels = if resolved.is_empty() {
                    (0..num_chans).collect()
                } else {
                    resolved.channels(window).unwrap_or_default()
                };
                (Some(resolved), channels)
            }
            None => (None, vec![]),
        };
        let frequencies_hz = resolver.channel_frequencies(window, &channels)?;
        if channels.is_empty() {
            warn!(
                "No channels of spectral window {window} are selected for chunk {}",
                self.position.chunk()
            );
        }

        self.subchunk_rows = partition_rows(&group.times, self.row_blocking);
        debug!(
            "Chunk {}/{}: source {}, field {}, scan {}, window {window}, {} rows in {} subchunks, {} channels",
            self.position.chunk() + 1,
            self.chunks.num_chunks(),
            group.source,
            group.field_id,
            group.scan,
            group.num_rows(),
            self.subchunk_rows.len(),
            channels.len(),
        );
        self.resolved = resolved;
        self.channels = channels;
        self.frequencies_hz = frequencies_hz;
        self.state = CursorState::AtChunkOrigin;
        Ok(())
    }

    /// Is the cursor on a chunk?
    pub fn more_chunks(&self) -> bool {
        match self.state {
            CursorState::AtChunkOrigin | CursorState::MidChunk | CursorState::ChunkExhausted => {
                self.chunks.more_chunks()
            }
            _ => false,
        }
    }

    /// Move to the first subchunk of the next chunk. Moving past the last
    /// chunk leaves `more_chunks` false; moving again is an error.
    pub fn next_chunk(&mut self) -> Result<(), CursorError> {
        self.check_usable()?;
        if self.state == CursorState::AllExhausted {
            return Err(IterationStateError::PastEndOfData.into());
        }
        if self.chunks.next_chunk().is_some() {
            self.position.increment_chunk();
        }
        let result = self.enter_chunk();
        if result.is_err() {
            self.state = CursorState::Failed;
        }
        result
    }

    /// Go back to the first subchunk of the current chunk.
    pub fn origin(&mut self) -> Result<(), CursorError> {
        self.check_usable()?;
        if self.state == CursorState::AllExhausted {
            return Err(IterationStateError::PastEndOfData.into());
        }
        self.position.reset_subchunk();
        self.state = CursorState::AtChunkOrigin;
        Ok(())
    }

    /// Does the current chunk have another subchunk?
    pub fn more(&self) -> bool {
        matches!(
            self.state,
            CursorState::AtChunkOrigin | CursorState::MidChunk
        ) && self.position.subchunk() < self.subchunk_rows.len()
    }

    /// Read the subchunk the cursor is on and move to the following one.
    pub fn next(&mut self) -> Result<RowBlock, CursorError> {
        self.check_usable()?;
        if self.state == CursorState::AllExhausted {
            return Err(IterationStateError::PastEndOfData.into());
        }
        if !self.more() {
            return Err(IterationStateError::PastEndOfChunk {
                subchunk: self.position,
            }
            .into());
        }

        match self.read_block() {
            Ok(block) => {
                self.position.increment_subchunk();
                self.state = if self.position.subchunk() < self.subchunk_rows.len() {
                    CursorState::MidChunk
                } else {
                    CursorState::ChunkExhausted
                };
                Ok(block)
            }
            Err(e) => {
                self.state = CursorState::Failed;
                Err(e)
            }
        }
    }

    fn read_block(&self) -> Result<RowBlock, CursorError> {
        let group = self
            .chunks
            .current()
            .ok_or(IterationStateError::PastEndOfData)?;
        let rows = self.subchunk_rows[self.position.subchunk()].clone();
        trace!(
            "Reading rows {}..{} of chunk {} for subchunk {}",
            rows.start,
            rows.end,
            self.position.chunk(),
            self.position
        );
        let raw = self
            .chunks
            .table()
            .read_column_range(group, rows.clone(), &self.columns)?;
        RowBlock::assemble(
            self.position,
            group,
            rows,
            raw,
            &self.channels,
            self.frequencies_hz.clone(),
            &self.weight_scaling,
        )
    }

    /// The next block in iteration order, moving through chunks as needed.
    /// `None` once every chunk has been read.
    pub fn next_block(&mut self) -> Result<Option<RowBlock>, CursorError> {
        loop {
            match self.state {
                CursorState::Unstarted => return Err(IterationStateError::NotStarted.into()),
                CursorState::Failed => return Err(IterationStateError::Failed.into()),
                CursorState::AllExhausted => return Ok(None),
                CursorState::AtChunkOrigin | CursorState::MidChunk if self.more() => {
                    return self.next().map(Some)
                }
                _ => self.next_chunk()?,
            }
        }
    }

    /// Would [`SubchunkCursor::next_block`] produce a block?
    pub fn has_more_blocks(&self) -> bool {
        match self.state {
            CursorState::AtChunkOrigin | CursorState::MidChunk => {
                self.more() || self.chunks.has_next_chunk()
            }
            CursorState::ChunkExhausted => self.chunks.has_next_chunk(),
            _ => false,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state != CursorState::Unstarted
    }

    /// The subchunk that `next` will read. Once all chunks are done, this is
    /// [`Subchunk::no_more_data`].
    pub fn current_subchunk(&self) -> Subchunk {
        self.position
    }

    /// The chunk the cursor is on.
    pub fn current_chunk(&self) -> Option<&RowGroup> {
        match self.state {
            CursorState::Unstarted | CursorState::AllExhausted | CursorState::Failed => None,
            _ => self.chunks.current(),
        }
    }

    /// The number of subchunks in the current chunk.
    pub fn num_subchunks(&self) -> usize {
        self.subchunk_rows.len()
    }

    /// The channel selection resolved for the current chunk. An empty
    /// selection selects every channel.
    pub fn resolved_selection(&self) -> Option<&ChannelSelection> {
        self.resolved.as_ref()
    }

    /// The channels that blocks of the current chunk will contain.
    pub fn selected_channels(&self) -> &[usize] {
        &self.channels
    }

    pub fn frequency_selections(&self) -> &FrequencySelections {
        &self.selections
    }

    pub fn sort_key(&self) -> &SortKey {
        &self.sort_key
    }

    pub fn row_blocking(&self) -> Option<usize> {
        self.row_blocking
    }

    pub fn weight_scaling(&self) -> &WeightScaling {
        &self.weight_scaling
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl std::fmt::Debug for SubchunkCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubchunkCursor")
            .field("state", &self.state)
            .field("position", &self.position)
            .field("sort_key", &self.sort_key)
            .field("row_blocking", &self.row_blocking)
            .field("weight_scaling", &self.weight_scaling)
            .field("chunks", &self.chunks)
            .finish()
    }
}

/// Split a chunk's rows into subchunks: runs of `row_blocking` rows if given,
/// otherwise runs of rows with the same time.
fn partition_rows(times: &[Epoch], row_blocking: Option<usize>) -> Vec<Range<usize>> {
    let num_rows = times.len();
    match row_blocking {
        Some(n) if n > 0 => (0..num_rows)
            .step_by(n)
            .map(|start| start..(start + n).min(num_rows))
            .collect(),
        _ => {
            let mut ranges = vec![];
            let mut start = 0;
            for i in 1..=num_rows {
                if i == num_rows || times[i] != times[start] {
                    ranges.push(start..i);
                    start = i;
                }
            }
            ranges
        }
    }
}
