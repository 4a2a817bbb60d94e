//! Dynamic, cluster-scoped settings (§6).
use std::time::Duration;

use serde::Deserialize;

const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// Lowest accepted `poll_interval` (§6): updates below this are rejected by the setter, not
/// silently clamped, so a misconfiguration is visible rather than quietly ignored.
pub const MIN_POLL_INTERVAL: Duration = secs(1);

/// Lowest accepted merge factor (§6).
pub const MIN_MERGE_FACTOR: u32 = 2;

const MEBIBYTE: u64 = 1024 * 1024;

/// Desired merge-policy shape a managed index must reach before it is force-merged (§4.5, §6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergePolicyTarget {
    #[serde(default = "default_merge_factor")]
    pub merge_factor: u32,

    #[serde(default = "default_floor_segment_bytes")]
    pub floor_segment_bytes: u64,
}

fn default_merge_factor() -> u32 {
    16
}

fn default_floor_segment_bytes() -> u64 {
    100 * MEBIBYTE
}

impl Default for MergePolicyTarget {
    fn default() -> Self {
        MergePolicyTarget {
            merge_factor: default_merge_factor(),
            floor_segment_bytes: default_floor_segment_bytes(),
        }
    }
}

impl MergePolicyTarget {
    /// Whether an index's current settings already match this target (§4.5 force-merge gate).
    pub fn matches(&self, merge_factor: u32, floor_segment_bytes: u64) -> bool {
        merge_factor == self.merge_factor && floor_segment_bytes == self.floor_segment_bytes
    }
}

/// `data_streams.lifecycle.*` dynamic settings (§6).
///
/// Deserialised from the surrounding process's cluster-settings document; `Default` mirrors the
/// table in §6 exactly so a cluster that never sets these keys still behaves correctly.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_poll_interval", with = "duration_as_secs")]
    pub poll_interval: Duration,

    #[serde(default)]
    pub merge_target: MergePolicyTarget,
}

fn default_poll_interval() -> Duration {
    secs(300)
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            poll_interval: default_poll_interval(),
            merge_target: MergePolicyTarget::default(),
        }
    }
}

impl Settings {
    /// Validate against the §6 minimums. Left to the caller: whether to apply an invalid update
    /// or keep the previous settings (the watch-based updater in `lifecycle-master` keeps the
    /// previous value and logs a warning).
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(SettingsError::PollIntervalTooLow {
                configured: self.poll_interval,
                minimum: MIN_POLL_INTERVAL,
            });
        }
        if self.merge_target.merge_factor < MIN_MERGE_FACTOR {
            return Err(SettingsError::MergeFactorTooLow {
                configured: self.merge_target.merge_factor,
                minimum: MIN_MERGE_FACTOR,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("poll_interval of {configured:?} is below the minimum of {minimum:?}")]
    PollIntervalTooLow {
        configured: Duration,
        minimum: Duration,
    },

    #[error("merge_factor of {configured} is below the minimum of {minimum}")]
    MergeFactorTooLow { configured: u32, minimum: u32 },
}

mod duration_as_secs {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_table() {
        let settings = Settings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(300));
        assert_eq!(settings.merge_target.merge_factor, 16);
        assert_eq!(settings.merge_target.floor_segment_bytes, 100 * MEBIBYTE);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_poll_interval_below_minimum() {
        let settings = Settings {
            poll_interval: Duration::from_millis(500),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::PollIntervalTooLow { .. })
        ));
    }

    #[test]
    fn rejects_merge_factor_below_minimum() {
        let settings = Settings {
            merge_target: MergePolicyTarget {
                merge_factor: 1,
                ..MergePolicyTarget::default()
            },
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::MergeFactorTooLow { .. })
        ));
    }

    #[test]
    fn merge_policy_target_matches_equal_settings() {
        let target = MergePolicyTarget::default();
        assert!(target.matches(16, 100 * MEBIBYTE));
        assert!(!target.matches(8, 100 * MEBIBYTE));
    }

    #[test]
    fn deserialize_from_json() {
        let json = r#"{"poll_interval": 60, "merge_target": {"merge_factor": 32, "floor_segment_bytes": 1024}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        assert_eq!(settings.merge_target.merge_factor, 32);
    }
}
