// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Intersecting channel selections with frequency selections.

use std::ops::Range;

use hifitime::Epoch;
use log::debug;

use super::{ChannelFrameResolver, ChannelSelection, ChannelSlice, FrameSelection, SelectionError};

/// Namespace for [`refine`].
#[derive(Debug, Clone, Copy)]
pub struct SelectionRefiner;

impl SelectionRefiner {
    pub fn refine(
        channels: &ChannelSelection,
        frames: &FrameSelection,
        resolver: &mut ChannelFrameResolver,
        epoch: Epoch,
    ) -> Result<ChannelSelection, SelectionError> {
        refine(channels, frames, resolver, epoch)
    }
}

/// Tighten a channel selection with the channels a frequency selection
/// resolves to at `epoch`.
///
/// - A window in both selections gets the intersection of its channel slices
///   with the resolved channels (strides are kept);
/// - a window only in `channels` passes through untouched;
/// - a window only in `frames` gets its resolved channels.
///
/// A window whose intersection is empty stays listed with no channels.
/// Refining a result again with the same `frames` and `epoch` changes
/// nothing.
pub fn refine(
    channels: &ChannelSelection,
    frames: &FrameSelection,
    resolver: &mut ChannelFrameResolver,
    epoch: Epoch,
) -> Result<ChannelSelection, SelectionError> {
    let known = resolver.known_windows();
    let frame_windows = frames.addressed_windows();
    if let Some(&window) = frame_windows.iter().find(|w| !known.contains(w)) {
        return Err(SelectionError::UnknownWindow { window });
    }

    let mut refined = ChannelSelection::new();
    for (window, slices) in channels.iter() {
        if frame_windows.contains(&window) {
            let resolved = resolve_window(frames, window, resolver, epoch)?;
            let pieces = slices
                .iter()
                .flat_map(|s| resolved.iter().map(move |r| s.intersect_range(r)))
                .filter(|s| !s.is_empty())
                .collect();
            refined.set_window(window, pieces);
        } else {
            refined.set_window(window, slices.to_vec());
        }
    }
    for &window in frame_windows.iter().filter(|w| !channels.addresses(**w)) {
        let resolved = resolve_window(frames, window, resolver, epoch)?;
        refined.set_window(
            window,
            resolved.into_iter().map(ChannelSlice::contiguous).collect(),
        );
    }

    debug!("Refined selection at {epoch}: {refined}");
    Ok(refined)
}

/// The disjoint, non-touching channel ranges that all of the frequency ranges
/// on `window` resolve to, in ascending order.
fn resolve_window(
    frames: &FrameSelection,
    window: u32,
    resolver: &mut ChannelFrameResolver,
    epoch: Epoch,
) -> Result<Vec<Range<usize>>, SelectionError> {
    let mut ranges = vec![];
    for r in frames.ranges_for(window) {
        let slice = resolver.resolve(window, r.begin_hz, r.end_hz, frames.frame(), epoch)?;
        if !slice.is_empty() {
            ranges.push(slice.first()..slice.end());
        }
    }
    ranges.sort_unstable_by_key(|r| r.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match merged.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => merged.push(r),
        }
    }
    Ok(merged)
}
