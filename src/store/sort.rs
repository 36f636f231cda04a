// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sort keys, and grouping rows into chunks with them.

use hifitime::Epoch;
use itertools::Itertools;
use log::trace;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::RowGroup;

/// A row attribute that rows can be sorted and grouped on.
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
pub enum SortColumn {
    ArrayId,
    FieldId,
    SpectralWindow,
    Scan,
    Time,
}

/// The columns appended to a sort key (if missing) so that iteration is
/// deterministic.
pub const DEFAULT_SORT_COLUMNS: [SortColumn; 4] = [
    SortColumn::ArrayId,
    SortColumn::FieldId,
    SortColumn::SpectralWindow,
    SortColumn::Time,
];

/// How rows are ordered and split into chunks.
///
/// Rows with equal values for every column of the key belong to the same
/// chunk. Times are compared in bins of `time_interval` seconds, counted from
/// the earliest time of the data source; an interval of zero puts every time
/// in the same bin, so time then only orders rows within a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    columns: Vec<SortColumn>,
    time_interval: f64,
}

impl SortKey {
    /// Make a sort key from `columns`, in order. When `add_defaults` is set,
    /// any of [`DEFAULT_SORT_COLUMNS`] that are missing are appended. A chunk
    /// never spans spectral windows, so [`SortColumn::SpectralWindow`] is
    /// appended regardless.
    pub fn new(columns: &[SortColumn], add_defaults: bool, time_interval: f64) -> SortKey {
        let mut columns: Vec<SortColumn> = columns.iter().copied().unique().collect();
        let extra: &[SortColumn] = if add_defaults {
            &DEFAULT_SORT_COLUMNS
        } else {
            &[SortColumn::SpectralWindow]
        };
        for &c in extra {
            if !columns.contains(&c) {
                columns.push(c);
            }
        }
        SortKey {
            columns,
            time_interval,
        }
    }

    pub fn columns(&self) -> &[SortColumn] {
        &self.columns
    }

    /// \[seconds\]
    pub fn time_interval(&self) -> f64 {
        self.time_interval
    }

    pub fn with_time_interval(&self, time_interval: f64) -> SortKey {
        SortKey {
            columns: self.columns.clone(),
            time_interval,
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::new(&[], true, 0.0)
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] (time interval {} s)",
            self.columns.iter().join(", "),
            self.time_interval
        )
    }
}

/// The attributes of a row that matter for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowAttributes {
    pub array_id: i32,
    pub field_id: i32,
    pub spectral_window: u32,
    pub scan: i32,
    pub time: Epoch,
}

/// Sort the rows of a data source by `key` and group them into chunks. The
/// row IDs of the groups are indices into `rows`. Within a group, rows are
/// ordered by time, then by row ID.
pub fn group_rows(source: usize, rows: &[RowAttributes], key: &SortKey) -> Vec<RowGroup> {
    let t0 = match rows.iter().map(|r| r.time).reduce(|a, b| if b < a { b } else { a }) {
        Some(t) => t,
        None => return vec![],
    };
    let interval_ns = (key.time_interval * 1e9).round() as i128;
    let nanos = |r: &RowAttributes| (r.time - t0).total_nanoseconds();
    let group_values = |r: &RowAttributes| -> Vec<i128> {
        key.columns
            .iter()
            .map(|c| match c {
                SortColumn::ArrayId => i128::from(r.array_id),
                SortColumn::FieldId => i128::from(r.field_id),
                SortColumn::SpectralWindow => i128::from(r.spectral_window),
                SortColumn::Scan => i128::from(r.scan),
                SortColumn::Time if interval_ns > 0 => nanos(r).div_euclid(interval_ns),
                SortColumn::Time => 0,
            })
            .collect()
    };

    let keyed: Vec<Vec<i128>> = rows.iter().map(group_values).collect();
    let order = (0..rows.len())
        .sorted_by(|&a, &b| {
            keyed[a]
                .cmp(&keyed[b])
                .then_with(|| nanos(&rows[a]).cmp(&nanos(&rows[b])))
                .then_with(|| a.cmp(&b))
        })
        .collect::<Vec<_>>();

    let groups: Vec<RowGroup> = order
        .into_iter()
        .group_by(|&i| &keyed[i])
        .into_iter()
        .map(|(_, members)| {
            let row_ids: Vec<usize> = members.collect();
            let first = &rows[row_ids[0]];
            RowGroup {
                source,
                array_id: first.array_id,
                field_id: first.field_id,
                spectral_window: first.spectral_window,
                scan: first.scan,
                times: row_ids.iter().map(|&i| rows[i].time).collect(),
                row_ids,
            }
        })
        .collect();
    trace!(
        "Grouped {} rows of source {source} into {} chunks with key {key}",
        rows.len(),
        groups.len()
    );
    groups
}
