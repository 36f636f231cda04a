// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One frequency selection per data source.

use hifitime::Epoch;
use itertools::Itertools;

use super::{
    refine, ChannelFrameResolver, ChannelSelection, FrameOfReference, FrameSelection,
    FrequencySelection, SelectionError,
};

#[derive(Debug, Clone, PartialEq)]
struct SourceSelection {
    selection: FrequencySelection,
    /// Channel limits applied on top of a frame selection.
    limits: Option<ChannelSelection>,
}

impl SourceSelection {
    fn selects_window(&self, window: u32) -> bool {
        match &self.limits {
            None => self.selection.selects_window(window),
            Some(limits) => {
                (self.selection.is_empty() && limits.is_empty())
                    || self.selection.addressed_windows().contains(&window)
                    || limits.addresses(window)
            }
        }
    }
}

/// The frequency selections of jointly-iterated data sources; selection `i`
/// applies to source `i`. Every selection must use the same frame of
/// reference.
///
/// A collection without any selections selects every channel of every
/// source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencySelections {
    selections: Vec<SourceSelection>,
}

impl FrequencySelections {
    pub fn new() -> FrequencySelections {
        FrequencySelections::default()
    }

    fn check_frame(&self, got: FrameOfReference) -> Result<(), SelectionError> {
        match self.frame() {
            Some(expected) if expected != got => Err(SelectionError::MismatchedFrames {
                index: self.selections.len(),
                expected,
                got,
            }),
            _ => Ok(()),
        }
    }

    /// Add the selection for the next source.
    pub fn add(&mut self, selection: FrequencySelection) -> Result<(), SelectionError> {
        self.check_frame(selection.frame())?;
        self.selections.push(SourceSelection {
            selection,
            limits: None,
        });
        Ok(())
    }

    /// Add a frequency selection for the next source, further limited to the
    /// channels in `limits`.
    pub fn add_limited(
        &mut self,
        selection: FrameSelection,
        limits: ChannelSelection,
    ) -> Result<(), SelectionError> {
        self.check_frame(selection.frame())?;
        self.selections.push(SourceSelection {
            selection: FrequencySelection::ByFrame(selection),
            limits: Some(limits),
        });
        Ok(())
    }

    /// Check that there is a selection for each of `num_sources` sources.
    pub fn finalise(&self, num_sources: usize) -> Result<(), SelectionError> {
        if self.selections.is_empty() || self.selections.len() == num_sources {
            Ok(())
        } else {
            Err(SelectionError::CountMismatch {
                num_selections: self.selections.len(),
                num_sources,
            })
        }
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// The frame of reference shared by all selections.
    pub fn frame(&self) -> Option<FrameOfReference> {
        self.selections.first().map(|s| s.selection.frame())
    }

    pub fn get(&self, source: usize) -> Option<&FrequencySelection> {
        self.selections.get(source).map(|s| &s.selection)
    }

    pub fn limits(&self, source: usize) -> Option<&ChannelSelection> {
        self.selections.get(source).and_then(|s| s.limits.as_ref())
    }

    /// Is data from `source` on spectral `window` wanted?
    pub fn is_window_selected(&self, source: usize, window: u32) -> bool {
        if self.selections.is_empty() {
            return true;
        }
        self.selections
            .get(source)
            .map(|s| s.selects_window(window))
            .unwrap_or(false)
    }

    /// The channels selected for `source` at `epoch`. Frame selections are
    /// resolved with `resolver` and refined with any channel limits. An empty
    /// result selects everything.
    pub fn resolve(
        &self,
        source: usize,
        resolver: &mut ChannelFrameResolver,
        epoch: Epoch,
    ) -> Result<ChannelSelection, SelectionError> {
        if self.selections.is_empty() {
            return Ok(ChannelSelection::new());
        }
        let s = self
            .selections
            .get(source)
            .ok_or(SelectionError::NoSelectionForSource(source))?;
        match &s.selection {
            FrequencySelection::ByChannel(c) => Ok(c.clone()),
            FrequencySelection::ByFrame(f) => {
                let empty = ChannelSelection::new();
                refine(s.limits.as_ref().unwrap_or(&empty), f, resolver, epoch)
            }
        }
    }

    pub fn describe(&self) -> String {
        if self.selections.is_empty() {
            return "everything".to_string();
        }
        self.selections
            .iter()
            .enumerate()
            .map(|(i, s)| match &s.limits {
                None => format!("source {i}: {}", s.selection),
                Some(l) => format!("source {i}: {} limited to {{{l}}}", s.selection),
            })
            .join("; ")
    }
}

impl std::fmt::Display for FrequencySelections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}
