//! Pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default time a challenge stays open: five minutes.
pub const DEFAULT_VALIDATION_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Configuration for the validation pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// How long a challenge may be answered before it expires.
    #[serde(rename = "validation_window_secs", with = "duration_secs")]
    pub validation_window: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            validation_window: DEFAULT_VALIDATION_WINDOW,
        }
    }
}

/// Serde adapter for a [`Duration`] written as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        assert_eq!(PoolConfig::default().validation_window.as_secs(), 300);
    }

    #[test]
    fn test_deserialize_seconds() {
        let config: PoolConfig = serde_json::from_str(r#"{"validation_window_secs": 60}"#).unwrap();
        assert_eq!(config.validation_window, Duration::from_secs(60));

        let config: PoolConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PoolConfig::default());
    }
}
