use std::time::Duration;

use chrono::FixedOffset;
use pulseward_core::episodes::DEFAULT_ALERT_WINDOW;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Delay between simulation iterations in milliseconds (default: `200`).
    pub simulation_tick_ms: u64,
    /// Interval between write-behind flushes in seconds (default: `60`).
    pub record_flush_interval_secs: u64,
    /// Number of recent alerts read to rebuild episodes (default: `100`).
    pub alert_log_limit: i64,
    /// Offset used to render episode time labels (default: UTC).
    pub alert_log_offset: FixedOffset,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `SIMULATION_TICK_MS`           | `200`                   |
    /// | `RECORD_FLUSH_INTERVAL_SECS`   | `60`                    |
    /// | `ALERT_LOG_LIMIT`              | `100`                   |
    /// | `ALERT_LOG_UTC_OFFSET_MINUTES` | `0`                     |
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let simulation_tick_ms: u64 = env_or("SIMULATION_TICK_MS", "200")
            .parse()
            .expect("SIMULATION_TICK_MS must be a valid u64");
        assert!(simulation_tick_ms > 0, "SIMULATION_TICK_MS must be positive");

        let record_flush_interval_secs: u64 = env_or("RECORD_FLUSH_INTERVAL_SECS", "60")
            .parse()
            .expect("RECORD_FLUSH_INTERVAL_SECS must be a valid u64");
        assert!(
            record_flush_interval_secs > 0,
            "RECORD_FLUSH_INTERVAL_SECS must be positive"
        );

        let alert_log_limit = parse_alert_log_limit(std::env::var("ALERT_LOG_LIMIT").ok());

        let offset_minutes: i32 = env_or("ALERT_LOG_UTC_OFFSET_MINUTES", "0")
            .parse()
            .expect("ALERT_LOG_UTC_OFFSET_MINUTES must be a valid i32");
        let alert_log_offset = FixedOffset::east_opt(offset_minutes * 60)
            .expect("ALERT_LOG_UTC_OFFSET_MINUTES must be within +/- 24 hours");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            simulation_tick_ms,
            record_flush_interval_secs,
            alert_log_limit,
            alert_log_offset,
        }
    }

    pub fn simulation_tick(&self) -> Duration {
        Duration::from_millis(self.simulation_tick_ms)
    }

    pub fn record_flush_interval(&self) -> Duration {
        Duration::from_secs(self.record_flush_interval_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_alert_log_limit(raw: Option<String>) -> i64 {
    let limit = match raw {
        Some(raw) => raw
            .parse()
            .expect("ALERT_LOG_LIMIT must be a valid i64"),
        None => DEFAULT_ALERT_WINDOW,
    };
    assert!(limit > 0, "ALERT_LOG_LIMIT must be positive");
    limit
}
