// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from the prefetch producer.

use thiserror::Error;

use crate::error::CursorError;

#[derive(Error, Debug)]
pub enum AsyncError {
    /// The producer's cursor returned an error; it is passed on unchanged.
    #[error("Error while prefetching: {0}")]
    Producer(Box<CursorError>),

    #[error("The prefetch thread panicked")]
    ProducerPanicked,

    #[error("The prefetch thread stopped without finishing")]
    ProducerDisconnected,

    #[error("Couldn't start the prefetch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl AsyncError {
    /// The error the producer's cursor returned, if that's what this is.
    pub fn producer_error(&self) -> Option<&CursorError> {
        match self {
            AsyncError::Producer(e) => Some(e),
            _ => None,
        }
    }
}
