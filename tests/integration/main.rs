// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod iteration;
mod prefetch;

use vis_cursor::{
    selection::SpectralWindowTable,
    store::{MemoryTable, SyntheticObservation, SyntheticScan},
    RowBlock, Subchunk, SubchunkCursor,
};

/// Log to stdout at a level chosen by `verbosity`. Only the first call has an
/// effect.
fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    builder.is_test(true);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        _ => builder.filter_level(log::LevelFilter::Trace),
    };
    let _ = builder.try_init();
}

fn scan(field_id: i32, spectral_window: u32, num_timesteps: usize) -> SyntheticScan {
    SyntheticScan {
        array_id: 0,
        field_id,
        spectral_window,
        num_timesteps,
    }
}

/// Three fields observed for 4, 2 and 5 timesteps on one spectral window.
fn three_fields() -> MemoryTable {
    MemoryTable::synthetic(&SyntheticObservation {
        scans: vec![scan(0, 0, 4), scan(1, 0, 2), scan(2, 0, 5)],
        ..Default::default()
    })
    .unwrap()
}

/// Two sources observing two fields on two spectral windows, with a flagged
/// antenna.
fn two_sources() -> MemoryTable {
    MemoryTable::synthetic(&SyntheticObservation {
        num_sources: 2,
        num_antennas: 5,
        flagged_antennas: [3].into_iter().collect(),
        spectral_windows: SpectralWindowTable::new()
            .with_regular(0, 150e6, 40e3, 16)
            .with_regular(1, 182e6, -80e3, 12),
        scans: vec![scan(0, 0, 3), scan(0, 1, 3), scan(1, 0, 2), scan(1, 1, 4)],
        ..Default::default()
    })
    .unwrap()
}

/// Walk a cursor with the nested chunk/subchunk loop.
fn walk(cursor: &mut SubchunkCursor) -> Vec<RowBlock> {
    let mut blocks = vec![];
    cursor.origin_chunks().unwrap();
    while cursor.more_chunks() {
        cursor.origin().unwrap();
        while cursor.more() {
            blocks.push(cursor.next().unwrap());
        }
        cursor.next_chunk().unwrap();
    }
    blocks
}

fn subchunks(blocks: &[RowBlock]) -> Vec<Subchunk> {
    blocks.iter().map(|b| b.subchunk()).collect()
}
