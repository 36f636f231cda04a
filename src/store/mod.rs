// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Access to the rows of visibility tables.
//!
//! The cursor doesn't care how visibilities are stored; anything that can
//! group its rows by a [`SortKey`] and read column ranges of those groups can
//! be iterated over. [`MemoryTable`] is provided for data that's already in
//! memory (and for testing).

mod error;
mod memory;
mod sort;

pub use error::StoreError;
pub use memory::{MemoryRow, MemoryTable, SyntheticObservation, SyntheticScan};
pub use sort::{group_rows, RowAttributes, SortColumn, SortKey, DEFAULT_SORT_COLUMNS};

use std::collections::BTreeSet;
use std::ops::Range;

use hifitime::Epoch;
use ndarray::prelude::*;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::selection::SpectralMetadata;

/// A column of a visibility table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Column {
    Time,
    Antenna1,
    Antenna2,
    Data,
    Flag,
    Weight,
}

/// Which visibilities are read for [`Column::Data`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum DataColumn {
    #[default]
    Observed,
    Corrected,
    Model,
}

/// The columns to read from a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    columns: BTreeSet<Column>,
    data_column: DataColumn,
}

impl ColumnSet {
    /// The columns every row block needs.
    pub const MANDATORY: [Column; 5] = [
        Column::Time,
        Column::Antenna1,
        Column::Antenna2,
        Column::Data,
        Column::Flag,
    ];

    /// The mandatory columns, plus `extra`.
    pub fn new(extra: &[Column], data_column: DataColumn) -> ColumnSet {
        ColumnSet {
            columns: Self::MANDATORY.iter().chain(extra).copied().collect(),
            data_column,
        }
    }

    pub fn contains(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn data_column(&self) -> DataColumn {
        self.data_column
    }

    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        ColumnSet::new(&[Column::Weight], DataColumn::default())
    }
}

/// Rows of a data source that share a sort key; one chunk of iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup {
    pub source: usize,
    pub array_id: i32,
    pub field_id: i32,
    pub spectral_window: u32,
    pub scan: i32,
    /// The time of each row, in iteration order.
    pub times: Vec<Epoch>,
    /// The table row of each row, in iteration order.
    pub row_ids: Vec<usize>,
}

impl RowGroup {
    pub fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }
}

/// Columns read from a range of rows. Columns that weren't asked for are
/// `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawColumns {
    pub times: Option<Vec<Epoch>>,
    pub antenna1: Option<Vec<u32>>,
    pub antenna2: Option<Vec<u32>>,
    /// Visibilities for every channel of the spectral window. The dimensions
    /// are [row][channel][polarisation].
    pub vis: Option<Array3<Complex32>>,
    /// Flags with the same dimensions as `vis`.
    pub flags: Option<Array3<bool>>,
    /// Weights per [row][polarisation].
    pub weights: Option<Array2<f32>>,
}

impl RawColumns {
    /// Check that every column present describes `num_rows` rows, and that
    /// the flags and weights agree with the visibilities.
    pub fn validate(&self, num_rows: usize) -> Result<(), StoreError> {
        let check = |column, expected: Vec<usize>, got: &[usize]| {
            if expected.as_slice() == got {
                Ok(())
            } else {
                Err(StoreError::ShapeMismatch {
                    column,
                    expected,
                    got: got.to_vec(),
                })
            }
        };

        if let Some(t) = &self.times {
            check(Column::Time, vec![num_rows], &[t.len()])?;
        }
        if let Some(a) = &self.antenna1 {
            check(Column::Antenna1, vec![num_rows], &[a.len()])?;
        }
        if let Some(a) = &self.antenna2 {
            check(Column::Antenna2, vec![num_rows], &[a.len()])?;
        }
        if let Some(vis) = &self.vis {
            let (rows, chans, pols) = vis.dim();
            check(Column::Data, vec![num_rows, chans, pols], &[rows, chans, pols])?;
            if let Some(flags) = &self.flags {
                check(Column::Flag, vec![num_rows, chans, pols], flags.shape())?;
            }
            if let Some(weights) = &self.weights {
                check(Column::Weight, vec![num_rows, pols], weights.shape())?;
            }
        } else if let Some(flags) = &self.flags {
            check(Column::Flag, vec![num_rows], &flags.shape()[..1])?;
        }
        Ok(())
    }
}

/// Something that holds visibility rows for one or more data sources.
///
/// Implementors are moved to the prefetch thread along with the cursor, so
/// they must be [`Send`].
pub trait TableAccessor: Send {
    /// The number of data sources (e.g. measurement sets) in this table.
    fn num_sources(&self) -> usize;

    /// The channel-frequency metadata of a data source.
    fn spectral_metadata(&self, source: usize) -> Result<Box<dyn SpectralMetadata>, StoreError>;

    /// Sort the rows of every data source with `key`, and group them. Groups
    /// are ordered by source, then by key.
    fn open_grouped_read(&self, key: &SortKey) -> Result<Vec<RowGroup>, StoreError>;

    /// Read `columns` for `rows` (indices into `group`'s rows).
    fn read_column_range(
        &self,
        group: &RowGroup,
        rows: Range<usize>,
        columns: &ColumnSet,
    ) -> Result<RawColumns, StoreError>;
}
