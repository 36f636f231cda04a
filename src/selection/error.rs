// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with frequency selections.

use thiserror::Error;

use super::FrameOfReference;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Frequency selection #{index} has frame of reference {got}, but the earlier selections use {expected}")]
    MismatchedFrames {
        index: usize,
        expected: FrameOfReference,
        got: FrameOfReference,
    },

    #[error("There are {num_selections} frequency selections, but {num_sources} data sources are being iterated")]
    CountMismatch {
        num_selections: usize,
        num_sources: usize,
    },

    #[error("Spectral window {window} is not known to the channel-frequency metadata")]
    UnknownWindow { window: u32 },

    #[error("Spectral window {window} has no channels in its channel-frequency table")]
    NoChannels { window: u32 },

    #[error("A channel selection on spectral window {window} has a stride of 0")]
    ZeroStride { window: u32 },

    #[error("Channel selection (first={first}, count={count}, stride={stride}) overlaps an existing selection on spectral window {window}")]
    OverlappingChannels {
        window: u32,
        first: usize,
        count: usize,
        stride: usize,
    },

    #[error("Frequency range {begin_hz} Hz to {end_hz} Hz on spectral window {window} is inverted or not finite")]
    InvalidFrequencyRange {
        window: u32,
        begin_hz: f64,
        end_hz: f64,
    },

    #[error("A frequency-range selection cannot use the '{0}' pseudo-frame")]
    ChannelFrameInFrequencySelection(FrameOfReference),

    #[error("Could not convert frequencies from frame {frame}: {reason}")]
    Conversion {
        frame: FrameOfReference,
        reason: String,
    },

    #[error("Channel {channel} was selected on spectral window {window}, but that window only has {num_channels} channels")]
    ChannelOutOfRange {
        window: u32,
        channel: usize,
        num_channels: usize,
    },

    #[error("There is no frequency selection for data source {0}")]
    NoSelectionForSource(usize),
}
