// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use indoc::indoc;
use tempfile::NamedTempFile;

use super::*;

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_defaults() {
    let config = CursorConfig::default();
    config.validate().unwrap();
    assert_eq!(config.sort_key(), SortKey::default());
    assert_eq!(config.column_set(), ColumnSet::default());
    assert!(matches!(config.weight_scaling(), Ok(WeightScaling::Identity)));
    assert!(!config.prefetch.enabled);
    assert_eq!(config.prefetch.lookahead_depth, 1);
}

#[test]
fn test_toml_file() {
    let file = config_file(
        ".toml",
        indoc! {r#"
            sort_columns = ["SCAN"]
            time_interval = 10.0
            row_blocking = 256
            weight_scaling = "square"
            columns = ["WEIGHT"]
            data_column = "corrected"

            [prefetch]
            enabled = true
            lookahead_depth = 3
        "#},
    );
    let config = CursorConfig::from_file(file.path()).unwrap();
    assert_eq!(
        config.sort_key().columns(),
        &[
            SortColumn::Scan,
            SortColumn::ArrayId,
            SortColumn::FieldId,
            SortColumn::SpectralWindow,
            SortColumn::Time
        ]
    );
    assert_eq!(config.sort_key().time_interval(), 10.0);
    assert_eq!(config.row_blocking, Some(256));
    assert!(matches!(config.weight_scaling(), Ok(WeightScaling::Square)));
    assert_eq!(config.column_set().data_column(), DataColumn::Corrected);
    assert!(config.column_set().contains(Column::Weight));
    assert_eq!(
        config.prefetch,
        PrefetchConfig {
            enabled: true,
            lookahead_depth: 3
        }
    );
}

#[test]
fn test_json_file() {
    let file = config_file(
        ".json",
        indoc! {r#"
            {
                "sort_columns": ["FIELD_ID"],
                "add_default_sort_columns": false,
                "weight_scaling": "Unity"
            }
        "#},
    );
    let config = CursorConfig::from_file(file.path()).unwrap();
    assert_eq!(
        config.sort_key().columns(),
        &[SortColumn::FieldId, SortColumn::SpectralWindow]
    );
    assert!(matches!(config.weight_scaling(), Ok(WeightScaling::Unity)));
    // Unspecified settings keep their defaults.
    assert_eq!(config.prefetch, PrefetchConfig::default());
    assert_eq!(config.data_column, DataColumn::Observed);
}

#[test]
fn test_bad_files() {
    let file = config_file(".yaml", "row_blocking: 4");
    assert!(matches!(
        CursorConfig::from_file(file.path()),
        Err(ConfigError::UnknownExtension(_))
    ));

    let file = config_file(".toml", "row_blocking = \"lots\"");
    assert!(matches!(
        CursorConfig::from_file(file.path()),
        Err(ConfigError::Toml(_))
    ));

    let file = config_file(".json", r#"{"not_a_setting": 1}"#);
    assert!(matches!(
        CursorConfig::from_file(file.path()),
        Err(ConfigError::Json(_))
    ));

    assert!(matches!(
        CursorConfig::from_file("/this/file/does/not/exist.toml"),
        Err(ConfigError::IO(_))
    ));
}

#[test]
fn test_validation() {
    let file = config_file(".toml", "row_blocking = 0");
    assert!(matches!(
        CursorConfig::from_file(file.path()),
        Err(ConfigError::ZeroRowBlocking)
    ));

    let config = CursorConfig {
        prefetch: PrefetchConfig {
            enabled: true,
            lookahead_depth: 0,
        },
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::ZeroLookahead)));

    let config = CursorConfig {
        time_interval: -2.0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NegativeInterval(i)) if i == -2.0
    ));

    let config = CursorConfig {
        weight_scaling: "cubed".to_string(),
        ..Default::default()
    };
    match config.validate() {
        Err(e @ ConfigError::UnknownWeightScaling(_)) => {
            assert!(e.to_string().contains("'cubed'"))
        }
        other => panic!("unexpected result {other:?}"),
    }
}
