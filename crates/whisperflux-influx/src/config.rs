//! Writer configuration.

use std::time::Duration;

/// Timestamp precision of written points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Seconds.
    #[default]
    Seconds,
    /// Milliseconds.
    Milliseconds,
    /// Microseconds.
    Microseconds,
    /// Nanoseconds.
    Nanoseconds,
}

impl Precision {
    /// Returns the value of the `precision` query parameter.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "u",
            Self::Nanoseconds => "ns",
        }
    }

    /// Scales a timestamp in seconds to this precision.
    #[must_use]
    pub const fn scale(&self, seconds: u32) -> u64 {
        let seconds = seconds as u64;
        match self {
            Self::Seconds => seconds,
            Self::Milliseconds => seconds * 1_000,
            Self::Microseconds => seconds * 1_000_000,
            Self::Nanoseconds => seconds * 1_000_000_000,
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for the InfluxDB writer.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL of the server, e.g. `http://localhost:8086`.
    pub url: String,
    /// User name, sent with basic auth when set.
    pub username: Option<String>,
    /// Password, sent with basic auth.
    pub password: Option<String>,
    /// Target database.
    pub database: String,
    /// Target retention policy; the database default when unset.
    pub retention_policy: Option<String>,
    /// Timestamp precision.
    pub precision: Precision,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_size: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            username: Some("graphite".to_string()),
            password: Some("graphite".to_string()),
            database: "graphite".to_string(),
            retention_policy: None,
            precision: Precision::Seconds,
            timeout: Duration::from_secs(60),
            pool_size: 10,
            user_agent: format!("whisperflux/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
