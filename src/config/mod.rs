//! Configuration module for glitch.

use crate::chaos::ChaosConfig;
use crate::error::{GlitchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for a glitch process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchConfig {
    /// Chaos run configuration.
    pub chaos: ChaosConfig,
    /// Observability configuration.
    pub observability: ObservabilityConfig,
}

impl GlitchConfig {
    /// Load configuration from a file. `.json` files are parsed as JSON,
    /// anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GlitchError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GlitchError::Config(format!("Failed to parse config: {}", e)))?,
            _ => serde_yaml::from_str(&content)
                .map_err(|e| GlitchError::Config(format!("Failed to parse config: {}", e)))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chaos.plan_path.as_os_str().is_empty() {
            return Err(GlitchError::InvalidConfig {
                field: "chaos.plan_path".to_string(),
                reason: "Plan path must not be empty".to_string(),
            });
        }

        if self.chaos.origin.trim().is_empty() {
            return Err(GlitchError::InvalidConfig {
                field: "chaos.origin".to_string(),
                reason: "Origin marker must not be empty".to_string(),
            });
        }

        if self.chaos.event_kind.trim().is_empty() {
            return Err(GlitchError::InvalidConfig {
                field: "chaos.event_kind".to_string(),
                reason: "Event kind must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Create a development configuration.
    pub fn development() -> Self {
        Self {
            chaos: ChaosConfig::development(),
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                json_logs: false,
            },
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Serde helper for Duration using humantime format.
pub mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        } else if let Some(s_val) = s.strip_suffix('s') {
            s_val
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string())
        } else if let Some(m) = s.strip_suffix('m') {
            m.parse::<u64>()
                .map(|v| Duration::from_secs(v * 60))
                .map_err(|e| e.to_string())
        } else {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = GlitchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = GlitchConfig::development();
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_origin() {
        let mut config = GlitchConfig::default();
        config.chaos.origin = " ".into();
        assert!(matches!(
            config.validate(),
            Err(GlitchError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            concat!(
                "chaos:\n",
                "  pacing_interval: 3s\n",
                "  plan_path: /tmp/plan.yaml\n",
                "observability:\n",
                "  json_logs: true"
            )
        )
        .unwrap();

        let config = GlitchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chaos.pacing_interval, Duration::from_secs(3));
        assert!(config.observability.json_logs);
        assert_eq!(config.chaos.default_count, 5);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"chaos": {{"default_count": 9}}}}"#).unwrap();

        let config = GlitchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chaos.default_count, 9);
    }

    #[test]
    fn test_parse_duration() {
        use humantime_serde::parse_duration;
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("40"), Ok(Duration::from_millis(40)));
        assert!(parse_duration("soon").is_err());
    }
}
