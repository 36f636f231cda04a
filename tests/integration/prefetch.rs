// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Prefetched iteration must be indistinguishable from synchronous iteration.

use std::time::Duration;

use super::*;
use vis_cursor::{
    ChannelSelection, CursorError, FrequencySelections, IterationStateError, PrefetchConfig,
    PrefetchScheduler,
};

fn assert_same_blocks(got: &[RowBlock], expected: &[RowBlock]) {
    assert_eq!(got.len(), expected.len());
    for (g, e) in got.iter().zip(expected) {
        assert_eq!(g.subchunk(), e.subchunk());
        assert_eq!(g.row_ids(), e.row_ids());
        assert_eq!(g.vis_bytes(), e.vis_bytes());
        assert_eq!(g.flags(), e.flags());
        assert_eq!(g.weights(), e.weights());
    }
}

fn windowed_cursor() -> SubchunkCursor {
    let mut channels = ChannelSelection::new();
    channels.add(0, 3, 4, 1).unwrap();
    channels.add(1, 0, 12, 1).unwrap();
    let mut selections = FrequencySelections::new();
    selections.add(channels.clone().into()).unwrap();
    selections.add(channels.into()).unwrap();
    SubchunkCursor::new(Box::new(two_sources()))
        .with_frequency_selections(selections)
        .unwrap()
}

#[test]
fn test_prefetching_is_byte_identical() {
    setup_logging(1);
    let expected = walk(&mut SubchunkCursor::new(Box::new(three_fields())));
    let expected_windowed = walk(&mut windowed_cursor());

    for depth in 1..=4 {
        let mut scheduler = PrefetchScheduler::new(SubchunkCursor::new(Box::new(three_fields())));
        scheduler.enable(depth).unwrap();
        scheduler.origin_chunks().unwrap();
        let got: Vec<RowBlock> = scheduler.by_ref().collect::<Result<_, _>>().unwrap();
        assert_same_blocks(&got, &expected);

        let mut scheduler = PrefetchScheduler::new(windowed_cursor());
        scheduler.enable(depth).unwrap();
        scheduler.origin_chunks().unwrap();
        let got: Vec<RowBlock> = scheduler.by_ref().collect::<Result<_, _>>().unwrap();
        assert_same_blocks(&got, &expected_windowed);
    }
}

#[test]
fn test_slow_consumer() {
    let expected = walk(&mut SubchunkCursor::new(Box::new(three_fields())));
    let mut scheduler = PrefetchScheduler::new(SubchunkCursor::new(Box::new(three_fields())));
    scheduler.enable(2).unwrap();
    scheduler.origin_chunks().unwrap();
    let mut got = vec![];
    while scheduler.more() {
        got.push(scheduler.next().unwrap());
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_same_blocks(&got, &expected);
}

#[test]
fn test_cancel_mid_stream() {
    setup_logging(1);
    let mut scheduler = PrefetchScheduler::new(SubchunkCursor::new(Box::new(three_fields())));
    scheduler.enable(1).unwrap();
    scheduler.origin_chunks().unwrap();
    for _ in 0..5 {
        scheduler.next().unwrap();
    }
    scheduler.cancel().unwrap();
    assert!(matches!(
        scheduler.next(),
        Err(CursorError::IterationState(IterationStateError::Cancelled))
    ));
    assert!(matches!(
        scheduler.cancel(),
        Err(CursorError::IterationState(IterationStateError::AlreadyCancelled))
    ));

    let mut cursor = scheduler.into_cursor().unwrap();
    assert_eq!(walk(&mut cursor).len(), 11);
}

#[test]
fn test_scheduler_from_config() {
    let config = PrefetchConfig {
        enabled: true,
        lookahead_depth: 3,
    };
    let mut scheduler =
        PrefetchScheduler::from_config(SubchunkCursor::new(Box::new(three_fields())), &config)
            .unwrap();
    assert_eq!(scheduler.lookahead_depth(), Some(3));
    scheduler.origin_chunks().unwrap();
    assert!(scheduler.is_prefetching());
    let got: Vec<Subchunk> = scheduler
        .map(|r| r.map(|b| b.subchunk()))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(got.len(), 11);
    assert_eq!(got.last(), Some(&Subchunk::new(2, 4)));
}
