// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_average_epoch() {
    let epochs = [
        Epoch::from_gpst_seconds(1065880128.0),
        Epoch::from_gpst_seconds(1065880130.0),
        Epoch::from_gpst_seconds(1065880132.0),
    ];

    let average = average_epoch(&epochs).unwrap();
    assert_abs_diff_eq!(average.to_gpst_seconds(), 1065880130.0, epsilon = 1e-6);

    assert!(average_epoch(&[]).is_none());
}

#[test]
fn test_num_cross_baselines() {
    assert_eq!(num_cross_baselines(0), 0);
    assert_eq!(num_cross_baselines(1), 0);
    assert_eq!(num_cross_baselines(4), 6);
    assert_eq!(num_cross_baselines(128), 8128);
}

#[test]
fn test_generate_baseline_maps() {
    let total_num_antennas = 128;
    let mut antenna_flags = HashSet::new();
    let maps = BaselineMaps::new(total_num_antennas, &antenna_flags);
    assert_eq!(maps.num_baselines(), 8128);
    assert_eq!(maps.antenna_to_baseline[&(0, 1)], 0);
    assert_eq!(maps.baseline_to_antenna[&0], (0, 1));

    antenna_flags.insert(1);
    let maps = BaselineMaps::new(total_num_antennas, &antenna_flags);
    assert_eq!(maps.num_baselines(), num_cross_baselines(127));
    assert_eq!(maps.antenna_to_baseline[&(0, 2)], 0);
    assert_eq!(maps.antenna_to_baseline[&(2, 3)], 126);
    assert_eq!(maps.baseline_to_antenna[&0], (0, 2));
    assert_eq!(maps.baseline_to_antenna[&126], (2, 3));
    assert_eq!(maps.baseline_index(3, 2), Some(126));
    assert_eq!(maps.baseline_index(1, 2), None);
    assert_eq!(maps.baseline_index(5, 5), None);
}

#[test]
fn test_antenna_pairs_are_in_baseline_order() {
    let maps = BaselineMaps::new(4, &HashSet::new());
    assert_eq!(
        maps.antenna_pairs(),
        vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
    );
}
