// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frequency selections.
//!
//! Channels can be selected either by index ([`ChannelSelection`]) or by a
//! frequency range in some frame of reference ([`FrameSelection`]). Frame
//! selections depend on the observing epoch, so they're resolved into channel
//! indices by a [`ChannelFrameResolver`] once per chunk, and intersected with
//! any channel limits by [`refine`].

mod channels;
mod collection;
mod doppler;
mod error;
mod frame;
mod refine;
mod resolver;

pub use channels::{ChannelSelection, ChannelSlice};
pub use collection::FrequencySelections;
pub use doppler::{DopplerConverter, FrequencyConverter, FrequencyTransform, IdentityConverter};
pub use error::SelectionError;
pub use frame::{FrameRange, FrameSelection};
pub use refine::{refine, SelectionRefiner};
pub use resolver::{ChannelFrameResolver, ChannelInfo, SpectralMetadata, SpectralWindowTable};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The frame of rest that frequencies are expressed in.
#[derive(
    Debug,
    Clone,
    Copy,
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
#[strum(ascii_case_insensitive)]
pub enum FrameOfReference {
    /// Not a physical frame; the "frame" of selections made by channel index.
    #[strum(serialize = "CHANNELS")]
    Channels,

    /// Topocentric; the frame of the observatory.
    #[strum(serialize = "TOPO")]
    Topo,

    /// Geocentric.
    #[strum(serialize = "GEO")]
    Geo,

    /// Barycentric.
    #[strum(serialize = "BARY")]
    Bary,

    /// Kinematic local standard of rest.
    #[strum(serialize = "LSRK")]
    Lsrk,
}

/// A selection of channels, either by index or by frequency.
#[derive(Debug, Clone, PartialEq)]
pub enum FrequencySelection {
    ByChannel(ChannelSelection),
    ByFrame(FrameSelection),
}

impl FrequencySelection {
    /// Does this selection list no spectral windows? An empty selection
    /// selects everything.
    pub fn is_empty(&self) -> bool {
        match self {
            FrequencySelection::ByChannel(c) => c.is_empty(),
            FrequencySelection::ByFrame(f) => f.is_empty(),
        }
    }

    pub fn addressed_windows(&self) -> BTreeSet<u32> {
        match self {
            FrequencySelection::ByChannel(c) => c.addressed_windows(),
            FrequencySelection::ByFrame(f) => f.addressed_windows(),
        }
    }

    /// Is data on this spectral window wanted?
    pub fn selects_window(&self, window: u32) -> bool {
        self.is_empty() || self.addressed_windows().contains(&window)
    }

    pub fn frame(&self) -> FrameOfReference {
        match self {
            FrequencySelection::ByChannel(_) => FrameOfReference::Channels,
            FrequencySelection::ByFrame(f) => f.frame(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FrequencySelection::ByChannel(c) => format!("ByChannel {{{}}}", c.describe()),
            FrequencySelection::ByFrame(f) => format!("ByFrame {{{}}}", f.describe()),
        }
    }
}

impl Default for FrequencySelection {
    fn default() -> Self {
        FrequencySelection::ByChannel(ChannelSelection::default())
    }
}

impl std::fmt::Display for FrequencySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl From<ChannelSelection> for FrequencySelection {
    fn from(c: ChannelSelection) -> Self {
        FrequencySelection::ByChannel(c)
    }
}

impl From<FrameSelection> for FrequencySelection {
    fn from(f: FrameSelection) -> Self {
        FrequencySelection::ByFrame(f)
    }
}
