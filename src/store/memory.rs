// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A visibility table held entirely in memory.

use std::collections::HashSet;
use std::ops::Range;

use hifitime::{Duration, Epoch};
use log::debug;
use ndarray::prelude::*;
use num_complex::Complex32;

use super::*;
use crate::{
    math::BaselineMaps,
    selection::{SpectralMetadata, SpectralWindowTable},
};

/// A single row of a [`MemoryTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    pub attributes: RowAttributes,
    pub antenna1: u32,
    pub antenna2: u32,
    /// Observed visibilities. The dimensions are [channel][polarisation].
    pub data: Array2<Complex32>,
    pub corrected: Option<Array2<Complex32>>,
    pub model: Option<Array2<Complex32>>,
    /// Flags with the same dimensions as `data`.
    pub flags: Array2<bool>,
    /// One weight per polarisation.
    pub weights: Vec<f32>,
}

#[derive(Debug, Clone, Default)]
struct MemorySource {
    spectral_windows: SpectralWindowTable,
    rows: Vec<MemoryRow>,
}

/// Rows of one or more data sources, held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    sources: Vec<MemorySource>,
    /// Reads touching this (source, row) fail.
    failing_row: Option<(usize, usize)>,
}

impl MemoryTable {
    pub fn new() -> MemoryTable {
        MemoryTable::default()
    }

    /// Add a data source with the given spectral windows, returning its
    /// index.
    pub fn add_source(&mut self, spectral_windows: SpectralWindowTable) -> usize {
        self.sources.push(MemorySource {
            spectral_windows,
            rows: vec![],
        });
        self.sources.len() - 1
    }

    fn source(&self, source: usize) -> Result<&MemorySource, StoreError> {
        self.sources.get(source).ok_or(StoreError::UnknownSource {
            got: source,
            num_sources: self.sources.len(),
        })
    }

    /// Append a row to a data source. The row's spectral window must be known
    /// to the source, and all of the row's arrays must agree with it.
    pub fn push_row(&mut self, source: usize, row: MemoryRow) -> Result<(), StoreError> {
        let num_sources = self.sources.len();
        let src = self.sources.get_mut(source).ok_or(StoreError::UnknownSource {
            got: source,
            num_sources,
        })?;
        let window = row.attributes.spectral_window;
        let num_chans = src
            .spectral_windows
            .channels(window)
            .ok_or(StoreError::UnknownWindow {
                source_index: source,
                window,
            })?
            .len();
        let num_pols = row.data.len_of(Axis(1));

        let expected = vec![num_chans, num_pols];
        let mismatch = |column, got: &[usize]| {
            if got == expected.as_slice() {
                Ok(())
            } else {
                Err(StoreError::ShapeMismatch {
                    column,
                    expected: expected.clone(),
                    got: got.to_vec(),
                })
            }
        };
        mismatch(Column::Data, row.data.shape())?;
        mismatch(Column::Flag, row.flags.shape())?;
        for other in [&row.corrected, &row.model].into_iter().flatten() {
            mismatch(Column::Data, other.shape())?;
        }
        if row.weights.len() != num_pols {
            return Err(StoreError::ShapeMismatch {
                column: Column::Weight,
                expected: vec![num_pols],
                got: vec![row.weights.len()],
            });
        }

        src.rows.push(row);
        Ok(())
    }

    pub fn num_rows(&self, source: usize) -> Option<usize> {
        self.sources.get(source).map(|s| s.rows.len())
    }

    /// Make every read that touches `row` of `source` fail.
    pub fn fail_reads_at(&mut self, source: usize, row: usize) {
        self.failing_row = Some((source, row));
    }

    /// Build a table of a made-up observation. Every source gets the same
    /// scans; scans follow one another in time. Visibility values are
    /// deterministic functions of the source, row, channel and polarisation.
    pub fn synthetic(obs: &SyntheticObservation) -> Result<MemoryTable, StoreError> {
        let maps = BaselineMaps::new(obs.num_antennas, &obs.flagged_antennas);
        let pairs = maps.antenna_pairs();
        let mut table = MemoryTable::new();
        for _ in 0..obs.num_sources {
            let source = table.add_source(obs.spectral_windows.clone());
            let mut timestep = 0;
            let mut row_id = 0;
            for (i_scan, scan) in obs.scans.iter().enumerate() {
                let num_chans = obs
                    .spectral_windows
                    .channels(scan.spectral_window)
                    .map(|c| c.len())
                    .unwrap_or(0);
                for _ in 0..scan.num_timesteps {
                    let time = obs.start
                        + Duration::from_seconds(timestep as f64 * obs.integration_time_s);
                    for &(antenna1, antenna2) in &pairs {
                        let seed = (source * 100_000 + row_id) as f32;
                        let data = Array2::from_shape_fn((num_chans, obs.num_pols), |(c, p)| {
                            Complex32::new(seed + c as f32 * 0.01, (p + 1) as f32 - c as f32)
                        });
                        let flags = Array2::from_shape_fn((num_chans, obs.num_pols), |(c, p)| {
                            (row_id + c + p) % 7 == 0
                        });
                        table.push_row(
                            source,
                            MemoryRow {
                                attributes: RowAttributes {
                                    array_id: scan.array_id,
                                    field_id: scan.field_id,
                                    spectral_window: scan.spectral_window,
                                    scan: i_scan as i32,
                                    time,
                                },
                                antenna1,
                                antenna2,
                                corrected: Some(data.mapv(|v| v * 2.0)),
                                model: Some(Array2::from_elem(data.dim(), Complex32::new(1.0, 0.0))),
                                data,
                                flags,
                                weights: (0..obs.num_pols)
                                    .map(|p| 1.0 + ((row_id + p) % 4) as f32 * 0.5)
                                    .collect(),
                            },
                        )?;
                        row_id += 1;
                    }
                    timestep += 1;
                }
            }
        }
        debug!(
            "Made a synthetic table with {} sources and {} baselines",
            obs.num_sources,
            pairs.len()
        );
        Ok(table)
    }
}

impl TableAccessor for MemoryTable {
    fn num_sources(&self) -> usize {
        self.sources.len()
    }

    fn spectral_metadata(&self, source: usize) -> Result<Box<dyn SpectralMetadata>, StoreError> {
        Ok(Box::new(self.source(source)?.spectral_windows.clone()))
    }

    fn open_grouped_read(&self, key: &SortKey) -> Result<Vec<RowGroup>, StoreError> {
        let mut groups = vec![];
        for (i, src) in self.sources.iter().enumerate() {
            let attributes: Vec<RowAttributes> = src.rows.iter().map(|r| r.attributes).collect();
            groups.extend(group_rows(i, &attributes, key));
        }
        Ok(groups)
    }

    fn read_column_range(
        &self,
        group: &RowGroup,
        rows: Range<usize>,
        columns: &ColumnSet,
    ) -> Result<RawColumns, StoreError> {
        let src = self.source(group.source)?;
        if rows.start > rows.end || rows.end > group.num_rows() {
            return Err(StoreError::RowRange {
                start: rows.start,
                end: rows.end,
                num_rows: group.num_rows(),
            });
        }

        let mut selected = Vec::with_capacity(rows.len());
        for &row in &group.row_ids[rows] {
            if self.failing_row == Some((group.source, row)) {
                return Err(StoreError::Read {
                    source_index: group.source,
                    row,
                    reason: "injected read failure".to_string(),
                });
            }
            let r = src.rows.get(row).ok_or_else(|| StoreError::Read {
                source_index: group.source,
                row,
                reason: "no such row".to_string(),
            })?;
            selected.push(r);
        }

        let n = selected.len();
        let mut out = RawColumns::default();
        if columns.contains(Column::Time) {
            out.times = Some(selected.iter().map(|r| r.attributes.time).collect());
        }
        if columns.contains(Column::Antenna1) {
            out.antenna1 = Some(selected.iter().map(|r| r.antenna1).collect());
        }
        if columns.contains(Column::Antenna2) {
            out.antenna2 = Some(selected.iter().map(|r| r.antenna2).collect());
        }

        let (num_chans, num_pols) = selected.first().map(|r| r.data.dim()).unwrap_or((0, 0));
        if columns.contains(Column::Data) {
            let mut planes = Vec::with_capacity(n);
            for r in &selected {
                let plane = match columns.data_column() {
                    DataColumn::Observed => &r.data,
                    DataColumn::Corrected => {
                        r.corrected.as_ref().ok_or(StoreError::MissingColumn(Column::Data))?
                    }
                    DataColumn::Model => {
                        r.model.as_ref().ok_or(StoreError::MissingColumn(Column::Data))?
                    }
                };
                if plane.dim() != (num_chans, num_pols) {
                    return Err(StoreError::ShapeMismatch {
                        column: Column::Data,
                        expected: vec![num_chans, num_pols],
                        got: plane.shape().to_vec(),
                    });
                }
                planes.push(plane);
            }
            out.vis = Some(Array3::from_shape_fn((n, num_chans, num_pols), |(r, c, p)| {
                planes[r][[c, p]]
            }));
        }
        if columns.contains(Column::Flag) {
            if let Some(r) = selected.iter().find(|r| r.flags.dim() != (num_chans, num_pols)) {
                return Err(StoreError::ShapeMismatch {
                    column: Column::Flag,
                    expected: vec![num_chans, num_pols],
                    got: r.flags.shape().to_vec(),
                });
            }
            out.flags = Some(Array3::from_shape_fn((n, num_chans, num_pols), |(r, c, p)| {
                selected[r].flags[[c, p]]
            }));
        }
        if columns.contains(Column::Weight) {
            if let Some(r) = selected.iter().find(|r| r.weights.len() != num_pols) {
                return Err(StoreError::ShapeMismatch {
                    column: Column::Weight,
                    expected: vec![num_pols],
                    got: vec![r.weights.len()],
                });
            }
            out.weights = Some(Array2::from_shape_fn((n, num_pols), |(r, p)| {
                selected[r].weights[p]
            }));
        }
        Ok(out)
    }
}

/// A scan of a [`SyntheticObservation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticScan {
    pub array_id: i32,
    pub field_id: i32,
    pub spectral_window: u32,
    pub num_timesteps: usize,
}

/// The shape of a made-up observation; see [`MemoryTable::synthetic`].
#[derive(Debug, Clone)]
pub struct SyntheticObservation {
    pub num_sources: usize,
    pub num_antennas: u32,
    pub flagged_antennas: HashSet<u32>,
    pub num_pols: usize,
    pub start: Epoch,
    /// \[seconds\]
    pub integration_time_s: f64,
    pub spectral_windows: SpectralWindowTable,
    pub scans: Vec<SyntheticScan>,
}

impl Default for SyntheticObservation {
    fn default() -> Self {
        SyntheticObservation {
            num_sources: 1,
            num_antennas: 4,
            flagged_antennas: HashSet::new(),
            num_pols: 2,
            start: Epoch::from_gpst_seconds(1090008640.0),
            integration_time_s: 2.0,
            spectral_windows: SpectralWindowTable::new().with_regular(0, 150e6, 40e3, 16),
            scans: vec![SyntheticScan {
                array_id: 0,
                field_id: 0,
                spectral_window: 0,
                num_timesteps: 3,
            }],
        }
    }
}
