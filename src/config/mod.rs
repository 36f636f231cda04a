// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cursor settings that can be read from a TOML or JSON file.
//!
//! An example TOML file:
//!
//! ```toml
//! sort_columns = ["FIELD_ID", "SCAN"]
//! time_interval = 10.0
//! row_blocking = 256
//! weight_scaling = "square"
//! data_column = "corrected"
//!
//! [prefetch]
//! enabled = true
//! lookahead_depth = 2
//! ```

mod error;
#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    constants::DEFAULT_LOOKAHEAD_DEPTH,
    store::{Column, ColumnSet, DataColumn, SortColumn, SortKey},
    weights::WeightScaling,
};

/// Settings for a [`crate::SubchunkCursor`] and its
/// [`crate::PrefetchScheduler`]. Anything not given takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CursorConfig {
    /// Columns to sort and group rows on, in order.
    pub sort_columns: Vec<SortColumn>,

    /// Append any missing default sort columns to `sort_columns`.
    pub add_default_sort_columns: bool,

    /// Width of the time bins used to group rows \[seconds\]. Zero means
    /// rows aren't split into chunks by time.
    pub time_interval: f64,

    /// If given, subchunks are at most this many rows. Otherwise, each
    /// subchunk is a single timestep.
    pub row_blocking: Option<usize>,

    /// The name of a [`WeightScaling`].
    pub weight_scaling: String,

    /// Columns to read on top of the mandatory ones.
    pub columns: Vec<Column>,

    pub data_column: DataColumn,

    pub prefetch: PrefetchConfig,
}

impl Default for CursorConfig {
    fn default() -> Self {
        CursorConfig {
            sort_columns: vec![],
            add_default_sort_columns: true,
            time_interval: 0.0,
            row_blocking: None,
            weight_scaling: WeightScaling::Identity.name().to_string(),
            columns: vec![Column::Weight],
            data_column: DataColumn::default(),
            prefetch: PrefetchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrefetchConfig {
    pub enabled: bool,

    /// How many blocks may be read ahead of the consumer.
    pub lookahead_depth: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        PrefetchConfig {
            enabled: false,
            lookahead_depth: DEFAULT_LOOKAHEAD_DEPTH,
        }
    }
}

impl CursorConfig {
    /// Read and validate a config file. The format is determined by the
    /// file's extension (.toml or .json).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<CursorConfig, ConfigError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let config: CursorConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                debug!("Parsing {} as TOML", path.display());
                toml::from_str(&contents)?
            }
            Some("json") => {
                debug!("Parsing {} as JSON", path.display());
                serde_json::from_str(&contents)?
            }
            _ => return Err(ConfigError::UnknownExtension(path.to_path_buf())),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefetch.lookahead_depth == 0 {
            return Err(ConfigError::ZeroLookahead);
        }
        if self.row_blocking == Some(0) {
            return Err(ConfigError::ZeroRowBlocking);
        }
        if !self.time_interval.is_finite() || self.time_interval < 0.0 {
            return Err(ConfigError::NegativeInterval(self.time_interval));
        }
        self.weight_scaling()?;
        Ok(())
    }

    pub fn weight_scaling(&self) -> Result<WeightScaling, ConfigError> {
        self.weight_scaling.parse()
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey::new(
            &self.sort_columns,
            self.add_default_sort_columns,
            self.time_interval,
        )
    }

    pub fn column_set(&self) -> ColumnSet {
        ColumnSet::new(&self.columns, self.data_column)
    }
}
