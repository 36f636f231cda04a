// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from cursor configuration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown weight scaling '{0}'; valid names are 'unity', 'identity' and 'square'")]
    UnknownWeightScaling(String),

    #[error("Config file '{}' doesn't have a recognised file extension; valid extensions are .toml and .json", .0.display())]
    UnknownExtension(PathBuf),

    #[error("The prefetch lookahead depth must be at least 1")]
    ZeroLookahead,

    #[error("Row blocking must be at least 1 row; use no row blocking to split chunks by time")]
    ZeroRowBlocking,

    #[error("The time interval must be a non-negative number of seconds, got {0}")]
    NegativeInterval(f64),

    #[error("Couldn't parse the TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Couldn't parse the JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
