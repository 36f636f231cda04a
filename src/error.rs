// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all cursor-related errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CursorError {
    #[error("{0}")]
    Selection(#[from] crate::selection::SelectionError),

    #[error("{0}")]
    IterationState(#[from] crate::cursor::IterationStateError),

    #[error("{0}")]
    Store(#[from] crate::store::StoreError),

    #[error("{0}")]
    Async(#[from] crate::prefetch::AsyncError),

    #[error("{0}")]
    Config(#[from] crate::config::ConfigError),
}
