// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Selections of channels by index.

use std::collections::BTreeSet;
use std::ops::Range;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::SelectionError;

/// A strided run of channel indices. Slices are always kept in a canonical
/// form: empty slices are `(0, 0, 1)` and single-channel slices have a stride
/// of 1, so two slices selecting the same channels compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelSlice {
    first: usize,
    count: usize,
    stride: usize,
}

impl ChannelSlice {
    /// Make a new slice. A zero stride is treated as 1; callers that care
    /// about rejecting it (e.g. [`ChannelSelection::add`]) check beforehand.
    pub fn new(first: usize, count: usize, stride: usize) -> ChannelSlice {
        match (count, stride) {
            (0, _) => ChannelSlice::empty(),
            (1, _) | (_, 0) => ChannelSlice {
                first,
                count,
                stride: 1,
            },
            _ => ChannelSlice {
                first,
                count,
                stride,
            },
        }
    }

    /// A slice of contiguous channels.
    pub fn contiguous(range: Range<usize>) -> ChannelSlice {
        ChannelSlice::new(range.start, range.len(), 1)
    }

    pub fn empty() -> ChannelSlice {
        ChannelSlice {
            first: 0,
            count: 0,
            stride: 1,
        }
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The last channel in this slice.
    pub fn last(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.first + (self.count - 1) * self.stride)
        }
    }

    /// One past the last channel in this slice.
    pub fn end(&self) -> usize {
        self.last().map(|l| l + 1).unwrap_or(self.first)
    }

    pub fn channels(&self) -> impl Iterator<Item = usize> {
        let ChannelSlice {
            first,
            count,
            stride,
        } = *self;
        (0..count).map(move |i| first + i * stride)
    }

    pub fn contains(&self, channel: usize) -> bool {
        match self.last() {
            Some(last) => {
                (self.first..=last).contains(&channel) && (channel - self.first) % self.stride == 0
            }
            None => false,
        }
    }

    /// Do these slices share any channels?
    pub fn overlaps(&self, other: &ChannelSlice) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.first >= other.end() || other.first >= self.end() {
            return false;
        }
        let (small, big) = if self.count <= other.count {
            (self, other)
        } else {
            (other, self)
        };
        small.channels().any(|c| big.contains(c))
    }

    /// The channels of this slice that also lie in `range`. The stride is
    /// preserved.
    pub fn intersect_range(&self, range: &Range<usize>) -> ChannelSlice {
        let last = match self.last() {
            Some(l) => l.min(range.end.saturating_sub(1)),
            None => return ChannelSlice::empty(),
        };
        if range.is_empty() {
            return ChannelSlice::empty();
        }
        let lo = self.first.max(range.start);
        let start = self.first + (lo - self.first).div_ceil(self.stride) * self.stride;
        if start > last {
            return ChannelSlice::empty();
        }
        ChannelSlice::new(start, (last - start) / self.stride + 1, self.stride)
    }
}

impl std::fmt::Display for ChannelSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.last() {
            None => write!(f, "<none>"),
            Some(last) if self.stride == 1 => write!(f, "{}~{}", self.first, last),
            Some(last) => write!(f, "{}~{}^{}", self.first, last, self.stride),
        }
    }
}

/// Channels selected by index, per spectral window.
///
/// Within a window, slices never overlap; contiguous (stride 1) slices that
/// touch are merged as they're added. A window may be listed with a single
/// empty slice, meaning "selected, but no channels survive"; this is what
/// refinement produces when a channel selection and a frequency selection
/// don't intersect.
///
/// A selection without any windows selects everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSelection {
    windows: IndexMap<u32, Vec<ChannelSlice>>,
}

impl ChannelSelection {
    pub fn new() -> ChannelSelection {
        ChannelSelection::default()
    }

    /// Select `count` channels starting at `first`, separated by `stride`, on
    /// spectral window `window`.
    pub fn add(
        &mut self,
        window: u32,
        first: usize,
        count: usize,
        stride: usize,
    ) -> Result<(), SelectionError> {
        if stride == 0 {
            return Err(SelectionError::ZeroStride { window });
        }
        let new = ChannelSlice::new(first, count, stride);
        let existing = self.windows.entry(window).or_default();
        if new.is_empty() {
            if existing.is_empty() {
                existing.push(new);
            }
            return Ok(());
        }

        // Work on a copy so that a rejected slice leaves the selection alone.
        let mut slices: Vec<ChannelSlice> = existing
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect();
        let mut merged = new;
        if merged.stride == 1 {
            loop {
                let touching = slices.iter().position(|s| {
                    s.stride == 1 && s.first <= merged.end() && merged.first <= s.end()
                });
                match touching {
                    Some(i) => {
                        let s = slices.swap_remove(i);
                        let start = s.first.min(merged.first);
                        let end = s.end().max(merged.end());
                        merged = ChannelSlice::contiguous(start..end);
                    }
                    None => break,
                }
            }
        }
        if slices.iter().any(|s| s.overlaps(&merged)) {
            return Err(SelectionError::OverlappingChannels {
                window,
                first,
                count,
                stride,
            });
        }
        slices.push(merged);
        slices.sort_unstable_by_key(|s| (s.first, s.stride));
        *existing = slices;
        Ok(())
    }

    /// Replace whatever is selected on `window` with already-disjoint slices.
    /// An empty list (or a list of empty slices) lists the window with no
    /// channels.
    pub(crate) fn set_window(&mut self, window: u32, slices: Vec<ChannelSlice>) {
        let mut slices: Vec<ChannelSlice> = slices.into_iter().filter(|s| !s.is_empty()).collect();
        if slices.is_empty() {
            slices.push(ChannelSlice::empty());
        }
        slices.sort_unstable_by_key(|s| (s.first, s.stride));
        self.windows.insert(window, slices);
    }

    /// No windows are listed.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn addressed_windows(&self) -> BTreeSet<u32> {
        self.windows.keys().copied().collect()
    }

    pub fn addresses(&self, window: u32) -> bool {
        self.windows.contains_key(&window)
    }

    pub fn slices(&self, window: u32) -> Option<&[ChannelSlice]> {
        self.windows.get(&window).map(|v| v.as_slice())
    }

    /// All (window, slices) pairs in the order windows were first added.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[ChannelSlice])> {
        self.windows.iter().map(|(w, s)| (*w, s.as_slice()))
    }

    /// The ascending channel indices selected on `window`.
    pub fn channels(&self, window: u32) -> Option<Vec<usize>> {
        self.windows.get(&window).map(|slices| {
            slices
                .iter()
                .flat_map(|s| s.channels())
                .sorted_unstable()
                .collect()
        })
    }

    /// The number of channels selected on `window`.
    pub fn num_channels(&self, window: u32) -> Option<usize> {
        self.windows
            .get(&window)
            .map(|slices| slices.iter().map(|s| s.count).sum())
    }

    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "all channels".to_string();
        }
        self.windows
            .iter()
            .map(|(w, slices)| format!("{w}:{}", slices.iter().join(";")))
            .join(", ")
    }
}

impl std::fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}
