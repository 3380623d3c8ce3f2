//! vmjudge.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wall-clock budget for a single contestant response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(15);

/// Default time the contestant gets to exit after the final request.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_LOG_FILTER: &str = "vmjudge=info";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub session: Option<SessionConfig>,
    pub scoring: Option<ScoringConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub response_timeout: Option<String>,
    pub shutdown_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub placed_weight: Option<f64>,
    pub soft_weight: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

impl JudgeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: JudgeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a vmjudge.toml spelling out every default.
    pub fn scaffold() -> Self {
        JudgeConfig {
            session: Some(SessionConfig {
                response_timeout: Some(format!("{}s", DEFAULT_RESPONSE_TIMEOUT.as_secs())),
                shutdown_timeout: Some(format!("{}s", DEFAULT_SHUTDOWN_TIMEOUT.as_secs())),
            }),
            scoring: Some(ScoringConfig {
                placed_weight: Some(0.8),
                soft_weight: Some(0.2),
            }),
            logging: Some(LoggingConfig {
                filter: Some(DEFAULT_LOG_FILTER.to_string()),
            }),
        }
    }

    pub fn response_timeout(&self) -> anyhow::Result<Duration> {
        self.duration(
            self.session.as_ref().and_then(|s| s.response_timeout.as_deref()),
            DEFAULT_RESPONSE_TIMEOUT,
        )
    }

    pub fn shutdown_timeout(&self) -> anyhow::Result<Duration> {
        self.duration(
            self.session.as_ref().and_then(|s| s.shutdown_timeout.as_deref()),
            DEFAULT_SHUTDOWN_TIMEOUT,
        )
    }

    /// `(placed_weight, soft_weight)`, defaulting to `(0.8, 0.2)`.
    pub fn score_weights(&self) -> (f64, f64) {
        let scoring = self.scoring.clone().unwrap_or_default();
        (
            scoring.placed_weight.unwrap_or(0.8),
            scoring.soft_weight.unwrap_or(0.2),
        )
    }

    pub fn log_filter(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.filter.as_deref())
            .unwrap_or(DEFAULT_LOG_FILTER)
    }

    fn duration(&self, value: Option<&str>, default: Duration) -> anyhow::Result<Duration> {
        match value {
            Some(s) => parse_duration(s).ok_or_else(|| anyhow::anyhow!("invalid duration: {s:?}")),
            None => Ok(default),
        }
    }
}

/// Parse `500ms`, `15s`, `2m`, or a bare number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
