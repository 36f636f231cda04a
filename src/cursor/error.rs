// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from using a cursor out of order.

use thiserror::Error;

use super::Subchunk;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IterationStateError {
    #[error("The cursor hasn't been started; call origin_chunks first")]
    NotStarted,

    #[error("There are no more subchunks in chunk {}; the cursor is at {subchunk}", subchunk.chunk())]
    PastEndOfChunk { subchunk: Subchunk },

    #[error("There is no more data")]
    PastEndOfData,

    #[error("Iteration settings were changed; call origin_chunks to apply them before continuing")]
    PendingChanges,

    #[error("An earlier error left the cursor unusable; call origin_chunks to restart it")]
    Failed,

    #[error("Blocks are being prefetched; drain or cancel the prefetch before restarting")]
    PrefetchInFlight,

    #[error("The prefetch scheduler was cancelled")]
    Cancelled,

    #[error("The prefetch scheduler was already cancelled")]
    AlreadyCancelled,
}
