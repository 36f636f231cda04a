// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use crate::{
    cursor::Subchunk,
    store::{MemoryTable, StoreError, SyntheticObservation, SyntheticScan},
};

fn scan(field_id: i32, num_timesteps: usize) -> SyntheticScan {
    SyntheticScan {
        array_id: 0,
        field_id,
        spectral_window: 0,
        num_timesteps,
    }
}

fn table() -> MemoryTable {
    MemoryTable::synthetic(&SyntheticObservation {
        scans: vec![scan(0, 4), scan(1, 2), scan(2, 5)],
        ..Default::default()
    })
    .unwrap()
}

fn started_cursor(table: MemoryTable) -> SubchunkCursor {
    let mut cursor = SubchunkCursor::new(Box::new(table));
    cursor.origin_chunks().unwrap();
    cursor
}

fn synchronous_blocks() -> Vec<RowBlock> {
    let mut cursor = started_cursor(table());
    let mut blocks = vec![];
    while let Some(block) = cursor.next_block().unwrap() {
        blocks.push(block);
    }
    blocks
}

#[test]
fn test_synchronous_scheduler_matches_cursor() {
    let expected = synchronous_blocks();
    assert_eq!(expected.len(), 11);

    let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
    assert!(!scheduler.is_prefetching());
    let blocks: Vec<RowBlock> = scheduler.by_ref().collect::<Result<_, _>>().unwrap();
    assert_eq!(blocks, expected);
    assert!(!scheduler.more());
    assert!(matches!(
        scheduler.next(),
        Err(CursorError::IterationState(IterationStateError::PastEndOfData))
    ));
}

#[test]
fn test_prefetched_blocks_are_identical() {
    let expected = synchronous_blocks();
    for depth in [1, 2, 5] {
        let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
        scheduler.enable(depth).unwrap();
        assert!(scheduler.is_prefetching());
        assert_eq!(scheduler.lookahead_depth(), Some(depth));

        let mut blocks = vec![];
        while scheduler.more() {
            blocks.push(scheduler.next().unwrap());
        }
        assert_eq!(blocks.len(), expected.len());
        for (got, expected) in blocks.iter().zip(&expected) {
            assert_eq!(got.subchunk(), expected.subchunk());
            assert_eq!(got.vis_bytes(), expected.vis_bytes());
            assert_eq!(got.flags(), expected.flags());
        }
        assert!(matches!(
            scheduler.next(),
            Err(CursorError::IterationState(IterationStateError::PastEndOfData))
        ));
    }
}

#[test]
fn test_enable_before_start() {
    let mut scheduler = PrefetchScheduler::new(SubchunkCursor::new(Box::new(table())));
    scheduler.enable(1).unwrap();
    // Nothing to prefetch until the cursor is started.
    assert!(!scheduler.is_prefetching());
    assert!(!scheduler.more());
    assert!(matches!(
        scheduler.next(),
        Err(CursorError::IterationState(IterationStateError::NotStarted))
    ));

    scheduler.origin_chunks().unwrap();
    assert!(scheduler.is_prefetching());
    assert_eq!(scheduler.count(), 11);
}

#[test]
fn test_enable_validation() {
    let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
    assert!(matches!(
        scheduler.enable(0),
        Err(CursorError::Config(ConfigError::ZeroLookahead))
    ));
    scheduler.enable(2).unwrap();
    assert!(matches!(
        scheduler.enable(2),
        Err(CursorError::IterationState(IterationStateError::PrefetchInFlight))
    ));
}

#[test]
fn test_origin_chunks_needs_a_drained_producer() {
    let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
    scheduler.enable(1).unwrap();
    let first = scheduler.next().unwrap();
    assert_eq!(first.subchunk(), Subchunk::origin());
    assert!(matches!(
        scheduler.origin_chunks(),
        Err(CursorError::IterationState(IterationStateError::PrefetchInFlight))
    ));
    assert!(matches!(
        scheduler.cursor_mut(),
        Err(CursorError::IterationState(IterationStateError::PrefetchInFlight))
    ));
    // The failed restart didn't disturb the producer.
    assert_eq!(scheduler.next().unwrap().subchunk(), Subchunk::new(0, 1));

    while scheduler.more() {
        scheduler.next().unwrap();
    }
    scheduler.origin_chunks().unwrap();
    assert!(scheduler.is_prefetching());
    assert_eq!(scheduler.next().unwrap(), first);
}

#[test]
fn test_cancel() {
    let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
    scheduler.enable(1).unwrap();
    scheduler.next().unwrap();
    scheduler.next().unwrap();
    // The producer is likely blocked on a full queue here.
    scheduler.cancel().unwrap();
    assert!(scheduler.is_cancelled());
    assert!(!scheduler.is_prefetching());
    assert!(!scheduler.more());
    assert!(matches!(
        scheduler.next(),
        Err(CursorError::IterationState(IterationStateError::Cancelled))
    ));
    assert!(matches!(
        scheduler.cancel(),
        Err(CursorError::IterationState(IterationStateError::AlreadyCancelled))
    ));

    // The cursor survives and can start over.
    assert!(scheduler.cursor().unwrap().is_started());
    scheduler.origin_chunks().unwrap();
    assert!(scheduler.is_prefetching());
    assert_eq!(scheduler.count(), 11);
}

#[test]
fn test_cancel_without_prefetching() {
    let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
    scheduler.next().unwrap();
    scheduler.cancel().unwrap();
    assert!(matches!(
        scheduler.next(),
        Err(CursorError::IterationState(IterationStateError::Cancelled))
    ));
    assert!(scheduler.cancel().is_err());
}

#[test]
fn test_producer_errors_are_wrapped() {
    let mut table = table();
    table.fail_reads_at(0, 20);
    let mut scheduler = PrefetchScheduler::new(started_cursor(table));
    scheduler.enable(2).unwrap();

    let results: Vec<_> = scheduler.by_ref().collect();
    // Rows 18..24 are the fourth timestep of the first field.
    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(|r| r.is_ok()));
    match &results[3] {
        Err(CursorError::Async(e)) => assert!(matches!(
            e.producer_error(),
            Some(CursorError::Store(StoreError::Read { row: 20, .. }))
        )),
        other => panic!("unexpected result {other:?}"),
    }
    assert!(!scheduler.more());
    assert!(matches!(
        scheduler.next(),
        Err(CursorError::IterationState(IterationStateError::Failed))
    ));

    // A failed producer counts as drained.
    let cursor = scheduler.into_cursor().unwrap();
    assert_eq!(cursor.state(), crate::cursor::CursorState::Failed);
}

#[test]
fn test_synchronous_errors_are_not_wrapped() {
    let mut table = table();
    table.fail_reads_at(0, 20);
    let mut scheduler = PrefetchScheduler::new(started_cursor(table));
    let results: Vec<_> = scheduler.by_ref().collect();
    assert_eq!(results.len(), 4);
    assert!(matches!(
        results[3],
        Err(CursorError::Store(StoreError::Read { row: 20, .. }))
    ));
}

#[test]
fn test_into_cursor_stops_the_producer() {
    let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
    scheduler.enable(3).unwrap();
    scheduler.next().unwrap();
    let mut cursor = scheduler.into_cursor().unwrap();
    cursor.origin_chunks().unwrap();
    assert_eq!(cursor.current_subchunk(), Subchunk::origin());
}

#[test]
fn test_dropping_a_busy_scheduler() {
    let mut scheduler = PrefetchScheduler::new(started_cursor(table()));
    scheduler.enable(1).unwrap();
    scheduler.next().unwrap();
    drop(scheduler);
}

#[test]
fn test_from_config() {
    let config = PrefetchConfig {
        enabled: true,
        lookahead_depth: 2,
    };
    let scheduler = PrefetchScheduler::from_config(started_cursor(table()), &config).unwrap();
    assert!(scheduler.is_prefetching());

    let config = PrefetchConfig {
        enabled: true,
        lookahead_depth: 0,
    };
    assert!(PrefetchScheduler::from_config(started_cursor(table()), &config).is_err());

    let scheduler =
        PrefetchScheduler::from_config(started_cursor(table()), &PrefetchConfig::default())
            .unwrap();
    assert!(!scheduler.is_prefetching());
    assert_eq!(scheduler.lookahead_depth(), None);
}
