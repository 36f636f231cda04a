// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Chunked iteration over radio-interferometric visibility tables.

Rows are grouped into chunks by a sort key, and each chunk is handed out one
row block at a time, with only the frequency channels that the caller's
frequency selections ask for. Blocks can optionally be read ahead on a
background thread.
 */

pub mod config;
pub mod constants;
pub mod coord;
pub mod cursor;
mod error;
pub mod math;
pub mod prefetch;
pub mod selection;
pub mod store;
pub mod weights;

// Re-exports.
pub use config::{ConfigError, CursorConfig, PrefetchConfig};
pub use coord::{LatLngHeight, RADec};
pub use cursor::{
    ChunkCursor, CursorState, IterationStateError, RowBlock, Subchunk, SubchunkCursor,
};
pub use error::CursorError;
pub use prefetch::{AsyncError, PrefetchScheduler};
pub use selection::{
    ChannelFrameResolver, ChannelSelection, DopplerConverter, FrameOfReference, FrameSelection,
    FrequencyConverter, FrequencySelection, FrequencySelections, IdentityConverter,
    SelectionError, SelectionRefiner, SpectralWindowTable,
};
pub use store::{
    Column, ColumnSet, DataColumn, MemoryTable, SortColumn, SortKey, StoreError, TableAccessor,
};
pub use weights::WeightScaling;
