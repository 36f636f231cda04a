// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading visibility tables.

use thiserror::Error;

use super::Column;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Data source {got} doesn't exist; there are {num_sources} sources")]
    UnknownSource { got: usize, num_sources: usize },

    #[error("Asked for rows {start}..{end} of a row group with only {num_rows} rows")]
    RowRange {
        start: usize,
        end: usize,
        num_rows: usize,
    },

    #[error("Column {0} is not present in this table")]
    MissingColumn(Column),

    #[error("Column {column} has shape {got:?}, but {expected:?} was expected")]
    ShapeMismatch {
        column: Column,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Spectral window {window} of data source {source_index} has no channel-frequency metadata")]
    UnknownWindow { source_index: usize, window: u32 },

    #[error("Couldn't read row {row} of data source {source_index}: {reason}")]
    Read {
        source_index: usize,
        row: usize,
        reason: String,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
