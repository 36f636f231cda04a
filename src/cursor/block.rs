// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Materialised blocks of rows.

use std::ops::Range;

use hifitime::Epoch;
use ndarray::prelude::*;
use num_complex::Complex32;

use super::Subchunk;
use crate::{
    error::CursorError,
    math::BaselineMaps,
    selection::SelectionError,
    store::{Column, RawColumns, RowGroup, StoreError},
    weights::WeightScaling,
};

/// Rows of one subchunk, with only the selected channels. Once handed out, a
/// block is never changed.
///
/// The visibility and flag cubes have the dimensions
/// [row][selected channel][polarisation]; weights are per
/// [row][polarisation] and have already been through the cursor's
/// [`WeightScaling`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowBlock {
    subchunk: Subchunk,
    source: usize,
    array_id: i32,
    field_id: i32,
    scan: i32,
    spectral_window: u32,
    row_ids: Vec<usize>,
    times: Vec<Epoch>,
    antenna_pairs: Vec<(u32, u32)>,
    vis: Array3<Complex32>,
    flags: Array3<bool>,
    weights: Option<Array2<f32>>,
    channels: Vec<usize>,
    frequencies_hz: Vec<f64>,
}

static_assertions::assert_impl_all!(RowBlock: Send);

impl RowBlock {
    /// Make a block out of columns read for `rows` of `group`, keeping only
    /// `channels`.
    pub(crate) fn assemble(
        subchunk: Subchunk,
        group: &RowGroup,
        rows: Range<usize>,
        raw: RawColumns,
        channels: &[usize],
        frequencies_hz: Vec<f64>,
        weight_scaling: &WeightScaling,
    ) -> Result<RowBlock, CursorError> {
        raw.validate(rows.len())?;
        let RawColumns {
            times,
            antenna1,
            antenna2,
            vis,
            flags,
            weights,
        } = raw;
        let times = times.ok_or(StoreError::MissingColumn(Column::Time))?;
        let antenna1 = antenna1.ok_or(StoreError::MissingColumn(Column::Antenna1))?;
        let antenna2 = antenna2.ok_or(StoreError::MissingColumn(Column::Antenna2))?;
        let vis = vis.ok_or(StoreError::MissingColumn(Column::Data))?;
        let flags = flags.ok_or(StoreError::MissingColumn(Column::Flag))?;

        let num_chans = vis.len_of(Axis(1));
        if let Some(&channel) = channels.iter().find(|&&c| c >= num_chans) {
            return Err(SelectionError::ChannelOutOfRange {
                window: group.spectral_window,
                channel,
                num_channels: num_chans,
            }
            .into());
        }

        Ok(RowBlock {
            subchunk,
            source: group.source,
            array_id: group.array_id,
            field_id: group.field_id,
            scan: group.scan,
            spectral_window: group.spectral_window,
            row_ids: group.row_ids[rows].to_vec(),
            times,
            antenna_pairs: antenna1.into_iter().zip(antenna2).collect(),
            vis: vis.select(Axis(1), channels),
            flags: flags.select(Axis(1), channels),
            weights: weights.map(|w| w.mapv(|x| weight_scaling.apply(x))),
            channels: channels.to_vec(),
            frequencies_hz,
        })
    }

    pub fn subchunk(&self) -> Subchunk {
        self.subchunk
    }

    /// The data source the rows came from.
    pub fn source(&self) -> usize {
        self.source
    }

    pub fn array_id(&self) -> i32 {
        self.array_id
    }

    pub fn field_id(&self) -> i32 {
        self.field_id
    }

    pub fn scan(&self) -> i32 {
        self.scan
    }

    pub fn spectral_window(&self) -> u32 {
        self.spectral_window
    }

    pub fn row_ids(&self) -> &[usize] {
        &self.row_ids
    }

    pub fn times(&self) -> &[Epoch] {
        &self.times
    }

    pub fn antenna_pairs(&self) -> &[(u32, u32)] {
        &self.antenna_pairs
    }

    pub fn vis(&self) -> ArrayView3<Complex32> {
        self.vis.view()
    }

    pub fn flags(&self) -> ArrayView3<bool> {
        self.flags.view()
    }

    pub fn weights(&self) -> Option<ArrayView2<f32>> {
        self.weights.as_ref().map(|w| w.view())
    }

    /// The selected channel numbers of the spectral window.
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    /// The observed-frame frequency of each selected channel \[Hz\].
    pub fn frequencies_hz(&self) -> &[f64] {
        &self.frequencies_hz
    }

    pub fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn num_channels(&self) -> usize {
        self.vis.len_of(Axis(1))
    }

    pub fn num_pols(&self) -> usize {
        self.vis.len_of(Axis(2))
    }

    /// The raw bytes of the visibility cube, in [row][channel][polarisation]
    /// order.
    pub fn vis_bytes(&self) -> &[u8] {
        // Selected cubes are freshly allocated in standard layout.
        self.vis
            .as_slice()
            .map(bytemuck::cast_slice)
            .unwrap_or_default()
    }

    /// The cross-correlation baseline index of each row. Autocorrelations
    /// and rows with flagged antennas have none.
    pub fn baseline_indices(&self, maps: &BaselineMaps) -> Vec<Option<usize>> {
        self.antenna_pairs
            .iter()
            .map(|&(a1, a2)| maps.baseline_index(a1, a2))
            .collect()
    }
}
