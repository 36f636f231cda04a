// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mapping stored visibility weights to the weights handed to consumers.

use std::str::FromStr;
use std::sync::Arc;

use crate::config::ConfigError;

/// A pure function of a stored weight. The scaling is applied to every weight
/// of every row block; it never fails (callers are responsible for feeding it
/// sensible weights).
#[derive(Clone, Default)]
pub enum WeightScaling {
    /// Every weight becomes 1.
    Unity,

    /// Weights are untouched.
    #[default]
    Identity,

    /// Weights are squared.
    Square,

    /// A user-supplied function.
    Custom(Arc<dyn Fn(f32) -> f32 + Send + Sync>),
}

impl WeightScaling {
    /// Wrap a user-supplied function.
    pub fn custom<F>(f: F) -> WeightScaling
    where
        F: Fn(f32) -> f32 + Send + Sync + 'static,
    {
        WeightScaling::Custom(Arc::new(f))
    }

    #[inline]
    pub fn apply(&self, weight: f32) -> f32 {
        match self {
            WeightScaling::Unity => 1.0,
            WeightScaling::Identity => weight,
            WeightScaling::Square => weight * weight,
            WeightScaling::Custom(f) => f(weight),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WeightScaling::Unity => "unity",
            WeightScaling::Identity => "identity",
            WeightScaling::Square => "square",
            WeightScaling::Custom(_) => "custom",
        }
    }
}

impl std::fmt::Debug for WeightScaling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeightScaling({})", self.name())
    }
}

impl std::fmt::Display for WeightScaling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeightScaling {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unity" => Ok(WeightScaling::Unity),
            "identity" => Ok(WeightScaling::Identity),
            "square" => Ok(WeightScaling::Square),
            _ => Err(ConfigError::UnknownWeightScaling(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_fixed_scalings() {
        for w in [0.0, 0.25, 1.0, 8.0] {
            assert_abs_diff_eq!(WeightScaling::Unity.apply(w), 1.0);
            assert_abs_diff_eq!(WeightScaling::Identity.apply(w), w);
            assert_abs_diff_eq!(WeightScaling::Square.apply(w), w * w);
        }
    }

    #[test]
    fn test_custom_scaling() {
        let doubler = WeightScaling::custom(|w| 2.0 * w);
        assert_abs_diff_eq!(doubler.apply(3.5), 7.0);
        assert_eq!(doubler.name(), "custom");
        // Clones share the function.
        let clone = doubler.clone();
        assert_abs_diff_eq!(clone.apply(-1.0), -2.0);
    }

    #[test]
    fn test_parse_scaling_names() {
        assert!(matches!(
            "Square".parse::<WeightScaling>(),
            Ok(WeightScaling::Square)
        ));
        assert!(matches!(
            " unity ".parse::<WeightScaling>(),
            Ok(WeightScaling::Unity)
        ));
        let result = "cube".parse::<WeightScaling>();
        assert!(matches!(result, Err(ConfigError::UnknownWeightScaling(_))));
        assert_eq!(WeightScaling::default().to_string(), "identity");
    }
}
