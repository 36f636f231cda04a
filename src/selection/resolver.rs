// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resolving frequency ranges into channel ranges.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use hifitime::Epoch;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::{
    ChannelSlice, FrameOfReference, FrequencyConverter, FrequencyTransform, IdentityConverter,
    SelectionError,
};

/// A single channel of a spectral window, as recorded in the observed frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel: usize,
    /// The centre frequency of the channel \[Hz\]
    pub freq_hz: f64,
    /// The width of the channel \[Hz\]. May be negative if frequencies
    /// decrease with channel number.
    pub width_hz: f64,
}

impl ChannelInfo {
    fn lower_edge(&self) -> f64 {
        self.freq_hz - self.width_hz.abs() / 2.0
    }

    fn upper_edge(&self) -> f64 {
        self.freq_hz + self.width_hz.abs() / 2.0
    }
}

/// Channel-frequency metadata for spectral windows.
pub trait SpectralMetadata: Send {
    /// The spectral windows this metadata knows about.
    fn windows(&self) -> BTreeSet<u32>;

    /// The channels of a spectral window, ordered by channel number. `None`
    /// if the window is unknown.
    fn channels(&self, window: u32) -> Option<Vec<ChannelInfo>>;
}

/// A spectral-window table held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralWindowTable {
    windows: BTreeMap<u32, Vec<ChannelInfo>>,
}

impl SpectralWindowTable {
    pub fn new() -> SpectralWindowTable {
        SpectralWindowTable::default()
    }

    pub fn add_window(&mut self, window: u32, channels: Vec<ChannelInfo>) {
        self.windows.insert(window, channels);
    }

    /// Add a window of evenly-spaced channels. A negative width gives
    /// frequencies that decrease with channel number.
    pub fn add_regular(
        &mut self,
        window: u32,
        first_freq_hz: f64,
        width_hz: f64,
        num_channels: usize,
    ) {
        let channels = (0..num_channels)
            .map(|channel| ChannelInfo {
                channel,
                freq_hz: first_freq_hz + channel as f64 * width_hz,
                width_hz,
            })
            .collect();
        self.add_window(window, channels);
    }

    /// Builder form of [`SpectralWindowTable::add_regular`].
    pub fn with_regular(
        mut self,
        window: u32,
        first_freq_hz: f64,
        width_hz: f64,
        num_channels: usize,
    ) -> Self {
        self.add_regular(window, first_freq_hz, width_hz, num_channels);
        self
    }
}

impl SpectralMetadata for SpectralWindowTable {
    fn windows(&self) -> BTreeSet<u32> {
        self.windows.keys().copied().collect()
    }

    fn channels(&self, window: u32) -> Option<Vec<ChannelInfo>> {
        self.windows.get(&window).cloned()
    }
}

type RangeKey = (u32, u64, u64, FrameOfReference);

/// Turns frequency ranges in a frame of reference into the channels of a
/// spectral window that cover them at some epoch.
///
/// Frame conversions depend on the epoch, so the transforms and the ranges
/// resolved with them are memoised only for the most recent epoch; asking
/// about a new epoch clears them. Channel tables don't depend on the epoch
/// and are kept for the resolver's lifetime.
pub struct ChannelFrameResolver {
    metadata: Box<dyn SpectralMetadata>,
    converter: Arc<dyn FrequencyConverter>,

    tables: HashMap<u32, Arc<[ChannelInfo]>>,
    epoch: Option<Epoch>,
    transforms: HashMap<FrameOfReference, FrequencyTransform>,
    resolved: HashMap<RangeKey, ChannelSlice>,
}

impl ChannelFrameResolver {
    pub fn new(
        metadata: Box<dyn SpectralMetadata>,
        converter: Arc<dyn FrequencyConverter>,
    ) -> ChannelFrameResolver {
        ChannelFrameResolver {
            metadata,
            converter,
            tables: HashMap::new(),
            epoch: None,
            transforms: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// A resolver that treats every frame as the observed frame.
    pub fn without_conversion(metadata: Box<dyn SpectralMetadata>) -> ChannelFrameResolver {
        Self::new(metadata, Arc::new(IdentityConverter))
    }

    pub fn known_windows(&self) -> BTreeSet<u32> {
        self.metadata.windows()
    }

    fn channel_table(&mut self, window: u32) -> Result<Arc<[ChannelInfo]>, SelectionError> {
        if let Some(table) = self.tables.get(&window) {
            return Ok(Arc::clone(table));
        }
        let channels = self
            .metadata
            .channels(window)
            .ok_or(SelectionError::UnknownWindow { window })?;
        if channels.is_empty() {
            return Err(SelectionError::NoChannels { window });
        }
        let table: Arc<[ChannelInfo]> = channels.into();
        self.tables.insert(window, Arc::clone(&table));
        Ok(table)
    }

    /// The number of channels on a spectral window.
    pub fn num_channels(&mut self, window: u32) -> Result<usize, SelectionError> {
        Ok(self.channel_table(window)?.len())
    }

    /// The observed-frame frequencies \[Hz\] of some channels of a spectral
    /// window.
    pub fn channel_frequencies(
        &mut self,
        window: u32,
        channels: &[usize],
    ) -> Result<Vec<f64>, SelectionError> {
        let table = self.channel_table(window)?;
        channels
            .iter()
            .map(|&c| {
                table
                    .get(c)
                    .map(|info| info.freq_hz)
                    .ok_or(SelectionError::ChannelOutOfRange {
                        window,
                        channel: c,
                        num_channels: table.len(),
                    })
            })
            .collect()
    }

    fn set_epoch(&mut self, epoch: Epoch) {
        if self.epoch != Some(epoch) {
            if self.epoch.is_some() {
                trace!("New resolution epoch {epoch}; clearing memoised ranges");
            }
            self.epoch = Some(epoch);
            self.transforms.clear();
            self.resolved.clear();
        }
    }

    fn transform(
        &mut self,
        frame: FrameOfReference,
        epoch: Epoch,
    ) -> Result<FrequencyTransform, SelectionError> {
        if let Some(t) = self.transforms.get(&frame) {
            return Ok(*t);
        }
        let t = self.converter.transform(frame, epoch)?;
        debug!(
            "{frame} -> observed Doppler factor at {epoch}: {:.9}",
            t.factor()
        );
        self.transforms.insert(frame, t);
        Ok(t)
    }

    /// The smallest contiguous run of channels on `window` covering
    /// `begin_hz` to `end_hz` in `frame` at `epoch`. A channel covers the
    /// range if some part of it (its centre plus or minus half its width)
    /// overlaps the range; sharing only an edge isn't enough, except for a
    /// zero-width range on an edge, which takes the first such channel in
    /// the window's table.
    /// A range that misses the window entirely resolves to an empty slice.
    pub fn resolve(
        &mut self,
        window: u32,
        begin_hz: f64,
        end_hz: f64,
        frame: FrameOfReference,
        epoch: Epoch,
    ) -> Result<ChannelSlice, SelectionError> {
        self.set_epoch(epoch);
        let key = (window, begin_hz.to_bits(), end_hz.to_bits(), frame);
        if let Some(slice) = self.resolved.get(&key) {
            trace!("Resolved range for window {window} was memoised");
            return Ok(*slice);
        }

        let table = self.channel_table(window)?;
        let transform = self.transform(frame, epoch)?;
        let (a, b) = (transform.to_observed(begin_hz), transform.to_observed(end_hz));
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        // A zero-width range on an edge touches two channels; it only needs
        // one.
        let mut covered = table
            .iter()
            .filter(|c| {
                if lo < hi {
                    c.lower_edge() < hi && c.upper_edge() > lo
                } else {
                    c.lower_edge() <= hi && c.upper_edge() >= lo
                }
            })
            .map(|c| c.channel)
            .take(if lo < hi { usize::MAX } else { 1 });
        let slice = match covered.next() {
            None => ChannelSlice::empty(),
            Some(first) => {
                let (min, max) = covered.fold((first, first), |(min, max), c| {
                    (min.min(c), max.max(c))
                });
                ChannelSlice::contiguous(min..max + 1)
            }
        };
        if slice.is_empty() {
            warn!(
                "{frame} range {begin_hz} Hz to {end_hz} Hz doesn't overlap any channels of spectral window {window}"
            );
        } else {
            trace!("{frame} range {begin_hz} Hz to {end_hz} Hz on window {window} -> channels {slice}");
        }
        self.resolved.insert(key, slice);
        Ok(slice)
    }
}

impl std::fmt::Debug for ChannelFrameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelFrameResolver")
            .field("known_windows", &self.known_windows())
            .field("epoch", &self.epoch)
            .field("num_memoised", &self.resolved.len())
            .finish()
    }
}
