// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading row blocks ahead of the consumer.
//!
//! A [`PrefetchScheduler`] owns a [`SubchunkCursor`]. Until prefetching is
//! enabled, it simply hands out the cursor's blocks. Once enabled, the cursor
//! is moved to a producer thread, which reads blocks into a bounded channel
//! while the consumer works on earlier ones. Blocks come out in exactly the
//! order the cursor would produce them; only the channel and a cancellation
//! flag are shared between the two threads.

mod error;
#[cfg(test)]
mod tests;

pub use error::AsyncError;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use crossbeam_utils::atomic::AtomicCell;
use log::{debug, trace};
use scopeguard::defer_on_unwind;

use crate::{
    config::{ConfigError, PrefetchConfig},
    constants::PREFETCH_THREAD_NAME,
    cursor::{IterationStateError, RowBlock, SubchunkCursor},
    error::CursorError,
};

/// What the producer sends.
enum Message {
    Block(RowBlock),
    /// The cursor returned an error; nothing follows.
    Failed(CursorError),
    /// Every block has been sent; nothing follows.
    EndOfData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Drained,
    Failed,
}

/// The consumer's side of a producer thread.
struct Producer {
    rx: Option<Receiver<Message>>,
    handle: Option<JoinHandle<Option<Box<SubchunkCursor>>>>,
    cancel: Arc<AtomicCell<bool>>,
    panicked: Arc<AtomicCell<bool>>,
    /// A message received by `more` but not yet handed out.
    peeked: Option<Message>,
    finished: Option<Finish>,
}

impl Producer {
    /// Start a producer thread reading from `cursor`. If the thread can't be
    /// started, the cursor is handed back.
    fn spawn(
        cursor: Box<SubchunkCursor>,
        lookahead_depth: usize,
    ) -> Result<Producer, (std::io::Error, Box<SubchunkCursor>)> {
        let (tx, rx) = bounded(lookahead_depth);
        // The cursor is only sent over once the thread exists, so a failed
        // spawn doesn't lose it.
        let (tx_cursor, rx_cursor) = bounded::<Box<SubchunkCursor>>(1);
        let cancel = Arc::new(AtomicCell::new(false));
        let panicked = Arc::new(AtomicCell::new(false));

        let handle = {
            let cancel = Arc::clone(&cancel);
            let panicked = Arc::clone(&panicked);
            thread::Builder::new()
                .name(PREFETCH_THREAD_NAME.to_string())
                .spawn(move || {
                    // If a panic happens, let the consumer know.
                    defer_on_unwind! { panicked.store(true); }
                    let mut cursor = rx_cursor.recv().ok()?;
                    produce(&mut cursor, &tx, &cancel);
                    Some(cursor)
                })
        };
        let handle = match handle {
            Ok(h) => h,
            Err(e) => return Err((e, cursor)),
        };
        if let Err(send_error) = tx_cursor.send(cursor) {
            let _ = handle.join();
            let e = std::io::Error::new(
                std::io::ErrorKind::Other,
                "the prefetch thread exited before starting",
            );
            return Err((e, send_error.into_inner()));
        }
        debug!("Prefetching up to {lookahead_depth} blocks ahead");

        Ok(Producer {
            rx: Some(rx),
            handle: Some(handle),
            cancel,
            panicked,
            peeked: None,
            finished: None,
        })
    }

    fn disconnected(&self) -> CursorError {
        if self.panicked.load() {
            AsyncError::ProducerPanicked.into()
        } else {
            AsyncError::ProducerDisconnected.into()
        }
    }

    fn receive(&mut self) -> Result<Message, CursorError> {
        if let Some(message) = self.peeked.take() {
            return Ok(message);
        }
        let rx = self
            .rx
            .as_ref()
            .ok_or(IterationStateError::Cancelled)?;
        rx.recv().map_err(|_| self.disconnected())
    }

    fn more(&mut self) -> bool {
        if self.finished.is_some() {
            return false;
        }
        if self.peeked.is_none() {
            match self.receive() {
                Ok(message) => self.peeked = Some(message),
                // Let `next` report the problem.
                Err(_) => return true,
            }
        }
        if matches!(self.peeked, Some(Message::EndOfData)) {
            debug!("The prefetch producer has finished");
            self.peeked = None;
            self.finished = Some(Finish::Drained);
            return false;
        }
        true
    }

    fn next(&mut self) -> Result<RowBlock, CursorError> {
        match self.finished {
            Some(Finish::Drained) => return Err(IterationStateError::PastEndOfData.into()),
            Some(Finish::Failed) => return Err(IterationStateError::Failed.into()),
            None => (),
        }
        match self.receive() {
            Ok(Message::Block(block)) => {
                trace!("Handing out prefetched subchunk {}", block.subchunk());
                Ok(block)
            }
            Ok(Message::EndOfData) => {
                debug!("The prefetch producer has finished");
                self.finished = Some(Finish::Drained);
                Err(IterationStateError::PastEndOfData.into())
            }
            Ok(Message::Failed(e)) => {
                self.finished = Some(Finish::Failed);
                Err(AsyncError::Producer(Box::new(e)).into())
            }
            Err(e) => {
                self.finished = Some(Finish::Failed);
                Err(e)
            }
        }
    }

    /// Stop the thread and take back its cursor. Any blocks waiting in the
    /// channel are dropped.
    fn stop(mut self) -> Result<Box<SubchunkCursor>, CursorError> {
        self.halt();
        let handle = self.handle.take().ok_or(AsyncError::ProducerDisconnected)?;
        match handle.join() {
            Ok(Some(cursor)) => Ok(cursor),
            Ok(None) => Err(AsyncError::ProducerDisconnected.into()),
            Err(_) => Err(AsyncError::ProducerPanicked.into()),
        }
    }

    fn halt(&mut self) {
        self.cancel.store(true);
        self.peeked = None;
        // A producer blocked on a full channel fails its send and exits.
        drop(self.rx.take());
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.halt();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// The producer thread's work: read blocks until the data runs out, the
/// cursor fails, the consumer goes away or cancellation is requested.
/// Cancellation is only noticed between blocks.
fn produce(cursor: &mut SubchunkCursor, tx: &Sender<Message>, cancel: &AtomicCell<bool>) {
    loop {
        if cancel.load() {
            debug!("Prefetch cancelled");
            return;
        }
        let (message, last) = match cursor.next_block() {
            Ok(Some(block)) => {
                trace!("Prefetched subchunk {}", block.subchunk());
                (Message::Block(block), false)
            }
            Ok(None) => (Message::EndOfData, true),
            Err(e) => {
                debug!("Prefetch producer hit an error: {e}");
                (Message::Failed(e), true)
            }
        };
        match tx.send(message) {
            Ok(()) => (),
            // If we can't send the message, it's because the channel has
            // been closed on the other side; the consumer has cancelled or
            // gone away.
            Err(_) => return,
        }
        if last {
            return;
        }
    }
}

enum Mode {
    Synchronous(Box<SubchunkCursor>),
    Asynchronous(Producer),
    Cancelled(Box<SubchunkCursor>),
    /// The producer thread died and took the cursor with it.
    Poisoned,
}

/// Hands out the row blocks of a [`SubchunkCursor`] in order, optionally
/// reading them ahead on a background thread.
///
/// `next` (and the [`Iterator`] impl) walk every block of every chunk.
/// Errors raised by the cursor on the producer thread come out wrapped in
/// [`AsyncError::Producer`]; without prefetching, they come out unchanged.
pub struct PrefetchScheduler {
    mode: Mode,
    /// Set once prefetching is enabled.
    lookahead_depth: Option<usize>,
}

static_assertions::assert_impl_all!(PrefetchScheduler: Send);

impl PrefetchScheduler {
    /// Wrap a cursor. Prefetching starts disabled.
    pub fn new(cursor: SubchunkCursor) -> PrefetchScheduler {
        PrefetchScheduler {
            mode: Mode::Synchronous(Box::new(cursor)),
            lookahead_depth: None,
        }
    }

    /// Wrap a cursor, enabling prefetching if the config says to.
    pub fn from_config(
        cursor: SubchunkCursor,
        config: &PrefetchConfig,
    ) -> Result<PrefetchScheduler, CursorError> {
        let mut scheduler = PrefetchScheduler::new(cursor);
        if config.enabled {
            scheduler.enable(config.lookahead_depth)?;
        }
        Ok(scheduler)
    }

    /// Read up to `lookahead_depth` blocks ahead of the consumer. If the
    /// cursor has been started, the producer starts now; otherwise, it starts
    /// with the next `origin_chunks`.
    pub fn enable(&mut self, lookahead_depth: usize) -> Result<(), CursorError> {
        if lookahead_depth == 0 {
            return Err(ConfigError::ZeroLookahead.into());
        }
        match &self.mode {
            Mode::Asynchronous(_) => return Err(IterationStateError::PrefetchInFlight.into()),
            Mode::Poisoned => return Err(AsyncError::ProducerPanicked.into()),
            Mode::Synchronous(_) | Mode::Cancelled(_) => (),
        }
        self.lookahead_depth = Some(lookahead_depth);
        let started = matches!(&self.mode, Mode::Synchronous(cursor) if cursor.is_started());
        if started {
            self.spawn(lookahead_depth)
        } else {
            Ok(())
        }
    }

    fn spawn(&mut self, lookahead_depth: usize) -> Result<(), CursorError> {
        let cursor = match std::mem::replace(&mut self.mode, Mode::Poisoned) {
            Mode::Synchronous(cursor) => cursor,
            other => {
                self.mode = other;
                return Ok(());
            }
        };
        match Producer::spawn(cursor, lookahead_depth) {
            Ok(producer) => {
                self.mode = Mode::Asynchronous(producer);
                Ok(())
            }
            Err((e, cursor)) => {
                self.mode = Mode::Synchronous(cursor);
                Err(AsyncError::Spawn(e).into())
            }
        }
    }

    /// (Re)start iteration from the first block. While prefetching, this is
    /// only allowed once the producer has drained (or failed) or has been
    /// cancelled.
    pub fn origin_chunks(&mut self) -> Result<(), CursorError> {
        let mut cursor = match std::mem::replace(&mut self.mode, Mode::Poisoned) {
            Mode::Synchronous(cursor) | Mode::Cancelled(cursor) => cursor,
            Mode::Asynchronous(producer) if producer.finished.is_none() => {
                self.mode = Mode::Asynchronous(producer);
                return Err(IterationStateError::PrefetchInFlight.into());
            }
            Mode::Asynchronous(producer) => producer.stop()?,
            Mode::Poisoned => return Err(AsyncError::ProducerPanicked.into()),
        };
        let result = cursor.origin_chunks();
        self.mode = Mode::Synchronous(cursor);
        result?;
        match self.lookahead_depth {
            Some(depth) => self.spawn(depth),
            None => Ok(()),
        }
    }

    /// Is there another block (or an error) to hand out?
    pub fn more(&mut self) -> bool {
        match &mut self.mode {
            Mode::Synchronous(cursor) => cursor.has_more_blocks(),
            Mode::Asynchronous(producer) => producer.more(),
            Mode::Cancelled(_) | Mode::Poisoned => false,
        }
    }

    /// The next block, in the order the cursor produces them.
    pub fn next(&mut self) -> Result<RowBlock, CursorError> {
        match &mut self.mode {
            Mode::Synchronous(cursor) => cursor
                .next_block()?
                .ok_or_else(|| IterationStateError::PastEndOfData.into()),
            Mode::Asynchronous(producer) => producer.next(),
            Mode::Cancelled(_) => Err(IterationStateError::Cancelled.into()),
            Mode::Poisoned => Err(AsyncError::ProducerPanicked.into()),
        }
    }

    /// Stop handing out blocks. A running producer is told to stop after the
    /// block it is reading, and is joined; blocks it had read ahead are
    /// dropped. Afterwards, `next` fails until `origin_chunks` is called.
    pub fn cancel(&mut self) -> Result<(), CursorError> {
        match std::mem::replace(&mut self.mode, Mode::Poisoned) {
            Mode::Synchronous(cursor) => {
                self.mode = Mode::Cancelled(cursor);
                Ok(())
            }
            Mode::Asynchronous(producer) => {
                debug!("Cancelling the prefetch producer");
                let cursor = producer.stop()?;
                self.mode = Mode::Cancelled(cursor);
                Ok(())
            }
            Mode::Cancelled(cursor) => {
                self.mode = Mode::Cancelled(cursor);
                Err(IterationStateError::AlreadyCancelled.into())
            }
            Mode::Poisoned => Err(AsyncError::ProducerPanicked.into()),
        }
    }

    pub fn is_prefetching(&self) -> bool {
        matches!(self.mode, Mode::Asynchronous(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.mode, Mode::Cancelled(_))
    }

    pub fn lookahead_depth(&self) -> Option<usize> {
        self.lookahead_depth
    }

    /// The cursor, unless it's on the producer thread.
    pub fn cursor(&self) -> Option<&SubchunkCursor> {
        match &self.mode {
            Mode::Synchronous(cursor) | Mode::Cancelled(cursor) => Some(cursor.as_ref()),
            Mode::Asynchronous(_) | Mode::Poisoned => None,
        }
    }

    /// The cursor, for changing its settings between runs. Fails while the
    /// producer has it.
    pub fn cursor_mut(&mut self) -> Result<&mut SubchunkCursor, CursorError> {
        match &mut self.mode {
            Mode::Synchronous(cursor) | Mode::Cancelled(cursor) => Ok(cursor.as_mut()),
            Mode::Asynchronous(_) => Err(IterationStateError::PrefetchInFlight.into()),
            Mode::Poisoned => Err(AsyncError::ProducerPanicked.into()),
        }
    }

    /// Stop any producer and give back the cursor. Blocks that were read
    /// ahead but not handed out are dropped; the cursor is past them.
    pub fn into_cursor(self) -> Result<SubchunkCursor, CursorError> {
        match self.mode {
            Mode::Synchronous(cursor) | Mode::Cancelled(cursor) => Ok(*cursor),
            Mode::Asynchronous(producer) => producer.stop().map(|cursor| *cursor),
            Mode::Poisoned => Err(AsyncError::ProducerPanicked.into()),
        }
    }
}

impl Iterator for PrefetchScheduler {
    type Item = Result<RowBlock, CursorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.more() {
            Some(PrefetchScheduler::next(self))
        } else {
            None
        }
    }
}

impl std::fmt::Debug for PrefetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.mode {
            Mode::Synchronous(_) => "synchronous",
            Mode::Asynchronous(_) => "prefetching",
            Mode::Cancelled(_) => "cancelled",
            Mode::Poisoned => "poisoned",
        };
        f.debug_struct("PrefetchScheduler")
            .field("mode", &mode)
            .field("lookahead_depth", &self.lookahead_depth)
            .finish()
    }
}
