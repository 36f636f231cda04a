// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Walking tables with the synchronous cursor.

use std::io::Write;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use indoc::indoc;
use num_complex::Complex32;

use super::*;
use vis_cursor::{
    math::BaselineMaps, ChannelSelection, CursorConfig, DopplerConverter, FrameOfReference,
    FrameSelection, FrequencySelections, LatLngHeight, RADec, WeightScaling,
};

#[test]
fn test_chunks_of_four_two_and_five_subchunks() {
    setup_logging(1);
    let mut cursor = SubchunkCursor::new(Box::new(three_fields()));
    let blocks = walk(&mut cursor);

    let expected: Vec<Subchunk> = [(0, 4), (1, 2), (2, 5)]
        .into_iter()
        .flat_map(|(chunk, n)| (0..n).map(move |s| Subchunk::new(chunk, s)))
        .collect();
    assert_eq!(subchunks(&blocks), expected);
    assert!(!cursor.more_chunks());

    // Every subchunk is one timestep of one field.
    for block in &blocks {
        assert_eq!(block.num_rows(), 6);
        assert!(block.times().iter().all(|&t| t == block.times()[0]));
        assert_eq!(block.field_id() as usize, block.subchunk().chunk());
    }
    // Time always increases.
    assert!(blocks.windows(2).all(|w| w[0].times()[0] < w[1].times()[0]));

    // Starting again gives the same blocks.
    assert_eq!(walk(&mut cursor), blocks);
}

#[test]
fn test_per_source_frame_selections() {
    setup_logging(1);
    let mut limits = ChannelSelection::new();
    limits.add(1, 0, 6, 2).unwrap();
    let mut selections = FrequencySelections::new();
    selections
        .add(
            FrameSelection::new(FrameOfReference::Bary)
                .unwrap()
                .with(0, 150.1e6, 150.3e6)
                .unwrap()
                .into(),
        )
        .unwrap();
    selections
        .add_limited(
            FrameSelection::new(FrameOfReference::Bary)
                .unwrap()
                .with(1, 181.3e6, 181.9e6)
                .unwrap(),
            limits,
        )
        .unwrap();

    let converter = DopplerConverter::new(LatLngHeight::new_mwa(), RADec::new_degrees(0.0, -27.0));
    let mut cursor = SubchunkCursor::new(Box::new(two_sources()))
        .with_frequency_converter(Arc::new(converter))
        .with_frequency_selections(selections)
        .unwrap();
    let blocks = walk(&mut cursor);

    // Source 0 only wants window 0 (3 + 2 timesteps), source 1 only window 1
    // (3 + 4 timesteps).
    assert_eq!(blocks.len(), 12);
    assert_eq!(blocks.last().unwrap().subchunk(), Subchunk::new(3, 3));
    let maps = BaselineMaps::new(5, &[3].into_iter().collect());
    for block in &blocks {
        assert_eq!(block.spectral_window() as usize, block.source());
        assert!(block.num_channels() > 0);
        assert_eq!(block.flags().dim(), block.vis().dim());
        assert!(block.baseline_indices(&maps).iter().all(|b| b.is_some()));

        let (low, high, half_width) = match block.source() {
            0 => (150.1e6, 150.3e6, 20e3),
            _ => (181.3e6, 181.9e6, 40e3),
        };
        // Doppler shifts are well under 20 kHz at these frequencies.
        for &f in block.frequencies_hz() {
            assert!(f > low - half_width - 20e3 && f < high + half_width + 20e3);
        }
        if block.source() == 1 {
            assert!(block.channels().iter().all(|c| c % 2 == 0));
            for c in [2, 4, 6, 8] {
                assert!(block.channels().contains(&c));
            }
        }
    }
}

#[test]
fn test_custom_weight_scaling() {
    let mut cursor = SubchunkCursor::new(Box::new(three_fields()));
    let plain = walk(&mut cursor);

    let mut cursor = SubchunkCursor::new(Box::new(three_fields()))
        .with_weight_scaling(WeightScaling::custom(|w| 2.0 * w + 1.0));
    let scaled = walk(&mut cursor);

    assert_eq!(plain.len(), scaled.len());
    for (p, s) in plain.iter().zip(&scaled) {
        assert_eq!(p.vis(), s.vis());
        let (p, s) = (p.weights().unwrap(), s.weights().unwrap());
        for (&p, &s) in p.iter().zip(s.iter()) {
            assert_abs_diff_eq!(s, 2.0 * p + 1.0);
        }
    }
}

#[test]
fn test_cursor_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        indoc! {r#"
            sort_columns = ["SCAN"]
            row_blocking = 5
            weight_scaling = "unity"
            data_column = "model"
        "#}
        .as_bytes(),
    )
    .unwrap();
    let config = CursorConfig::from_file(file.path()).unwrap();
    let mut cursor = SubchunkCursor::from_config(Box::new(three_fields()), &config).unwrap();
    assert_eq!(cursor.row_blocking(), Some(5));
    let blocks = walk(&mut cursor);

    // 24, 12 and 30 rows in blocks of at most 5.
    assert_eq!(blocks.len(), 5 + 3 + 6);
    assert_eq!(blocks.iter().map(|b| b.num_rows()).sum::<usize>(), 66);
    assert!(blocks.iter().all(|b| b.num_rows() <= 5));
    for block in &blocks {
        assert!(block.vis().iter().all(|&v| v == Complex32::new(1.0, 0.0)));
        assert!(block.weights().unwrap().iter().all(|&w| w == 1.0));
    }
}

#[test]
fn test_changing_the_selection_between_passes() {
    let mut cursor = SubchunkCursor::new(Box::new(three_fields()));
    let all = walk(&mut cursor);
    assert!(all.iter().all(|b| b.num_channels() == 16));

    let mut channels = ChannelSelection::new();
    channels.add(0, 1, 5, 3).unwrap();
    let mut selections = FrequencySelections::new();
    selections.add(channels.into()).unwrap();
    cursor.set_frequency_selections(selections).unwrap();
    assert!(cursor.has_pending_changes());

    let some = walk(&mut cursor);
    assert_eq!(some.len(), all.len());
    for (a, s) in all.iter().zip(&some) {
        assert_eq!(s.channels(), &[1, 4, 7, 10, 13]);
        for (i, &c) in s.channels().iter().enumerate() {
            assert_eq!(s.vis()[[0, i, 0]], a.vis()[[0, c, 0]]);
            assert_eq!(s.flags()[[2, i, 1]], a.flags()[[2, c, 1]]);
        }
    }
}
