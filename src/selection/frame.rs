// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Selections of frequency ranges in a frame of reference.

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{FrameOfReference, SelectionError};

/// A frequency range on a spectral window. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRange {
    pub window: u32,
    pub begin_hz: f64,
    pub end_hz: f64,
}

/// Frequency ranges, all expressed in one frame of reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSelection {
    frame: FrameOfReference,
    ranges: Vec<FrameRange>,
}

impl FrameSelection {
    /// A selection with no ranges yet. [`FrameOfReference::Channels`] isn't a
    /// physical frame and is rejected.
    pub fn new(frame: FrameOfReference) -> Result<FrameSelection, SelectionError> {
        if frame == FrameOfReference::Channels {
            return Err(SelectionError::ChannelFrameInFrequencySelection(frame));
        }
        Ok(FrameSelection {
            frame,
            ranges: vec![],
        })
    }

    /// Select the frequencies between `begin_hz` and `end_hz` on `window`.
    /// Several ranges may be given for a single window.
    pub fn add(&mut self, window: u32, begin_hz: f64, end_hz: f64) -> Result<(), SelectionError> {
        if !begin_hz.is_finite() || !end_hz.is_finite() || begin_hz > end_hz {
            return Err(SelectionError::InvalidFrequencyRange {
                window,
                begin_hz,
                end_hz,
            });
        }
        self.ranges.push(FrameRange {
            window,
            begin_hz,
            end_hz,
        });
        Ok(())
    }

    /// Builder form of [`FrameSelection::add`].
    pub fn with(mut self, window: u32, begin_hz: f64, end_hz: f64) -> Result<Self, SelectionError> {
        self.add(window, begin_hz, end_hz)?;
        Ok(self)
    }

    pub fn frame(&self) -> FrameOfReference {
        self.frame
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[FrameRange] {
        &self.ranges
    }

    pub fn ranges_for(&self, window: u32) -> impl Iterator<Item = &FrameRange> {
        self.ranges.iter().filter(move |r| r.window == window)
    }

    pub fn addressed_windows(&self) -> BTreeSet<u32> {
        self.ranges.iter().map(|r| r.window).collect()
    }

    pub fn describe(&self) -> String {
        if self.is_empty() {
            return format!("{}: all frequencies", self.frame);
        }
        let ranges = self
            .ranges
            .iter()
            .map(|r| {
                format!(
                    "{}:{:.6}~{:.6} MHz",
                    r.window,
                    r.begin_hz / 1e6,
                    r.end_hz / 1e6
                )
            })
            .join(", ");
        format!("{}: {ranges}", self.frame)
    }
}

impl std::fmt::Display for FrameSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}
