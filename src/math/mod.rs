// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use hifitime::{Duration, Epoch};

/// The number of cross-correlation baselines for a number of antennas.
pub fn num_cross_baselines(num_antennas: usize) -> usize {
    (num_antennas * num_antennas.saturating_sub(1)) / 2
}

/// Get the average of some epochs. Returns `None` if there are no epochs.
///
/// The average is accumulated as offsets from the first epoch, which keeps
/// precision when the epochs are close together.
pub fn average_epoch(epochs: &[Epoch]) -> Option<Epoch> {
    let first = *epochs.first()?;
    let offset = epochs
        .iter()
        .map(|&e| (e - first).to_seconds())
        .sum::<f64>()
        / epochs.len() as f64;
    Some(first + Duration::from_seconds(offset))
}

/// Maps between antenna pairs and cross-correlation baseline indices, skipping
/// any flagged antennas.
#[derive(Debug, Clone)]
pub struct BaselineMaps {
    pub antenna_to_baseline: HashMap<(u32, u32), usize>,
    pub baseline_to_antenna: HashMap<usize, (u32, u32)>,
}

impl BaselineMaps {
    pub fn new(total_num_antennas: u32, antenna_flags: &HashSet<u32>) -> BaselineMaps {
        let num_unflagged = (0..total_num_antennas)
            .filter(|a| !antenna_flags.contains(a))
            .count();
        let num_baselines = num_cross_baselines(num_unflagged);
        let mut antenna_to_baseline = HashMap::with_capacity(num_baselines);
        let mut baseline_to_antenna = HashMap::with_capacity(num_baselines);
        let mut bl = 0;
        for ant1 in 0..total_num_antennas {
            if antenna_flags.contains(&ant1) {
                continue;
            }
            for ant2 in ant1 + 1..total_num_antennas {
                if antenna_flags.contains(&ant2) {
                    continue;
                }
                antenna_to_baseline.insert((ant1, ant2), bl);
                baseline_to_antenna.insert(bl, (ant1, ant2));
                bl += 1;
            }
        }

        Self {
            antenna_to_baseline,
            baseline_to_antenna,
        }
    }

    pub fn num_baselines(&self) -> usize {
        self.baseline_to_antenna.len()
    }

    /// Get the baseline index of an antenna pair, regardless of the order of
    /// the antennas. Autocorrelations and flagged antennas have no index.
    pub fn baseline_index(&self, ant1: u32, ant2: u32) -> Option<usize> {
        let pair = if ant1 <= ant2 {
            (ant1, ant2)
        } else {
            (ant2, ant1)
        };
        self.antenna_to_baseline.get(&pair).copied()
    }

    /// The antenna pairs in baseline order.
    pub fn antenna_pairs(&self) -> Vec<(u32, u32)> {
        (0..self.num_baselines())
            .map(|bl| self.baseline_to_antenna[&bl])
            .collect()
    }
}
