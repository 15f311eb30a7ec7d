use std::time::Duration;

use lockerdesk_occupancy::RetryPolicy;

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
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Deltas buffered per locker before a slow viewer lags (default: `256`).
    pub live_channel_capacity: usize,
    /// Attempts per assignment, including the first (default: `3`).
    pub assign_max_attempts: u32,
    /// Delay before the first retry in milliseconds (default: `100`).
    pub assign_retry_base_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `LIVE_CHANNEL_CAPACITY` | `256`                      |
    /// | `ASSIGN_MAX_ATTEMPTS`   | `3`                        |
    /// | `ASSIGN_RETRY_BASE_MS`  | `100`                      |
    ///
    /// `DATABASE_URL` is read separately by the binary.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let live_channel_capacity: usize = std::env::var("LIVE_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| "256".into())
            .parse()
            .expect("LIVE_CHANNEL_CAPACITY must be a valid usize");

        let assign_max_attempts: u32 = std::env::var("ASSIGN_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("ASSIGN_MAX_ATTEMPTS must be a valid u32");

        let assign_retry_base_ms: u64 = std::env::var("ASSIGN_RETRY_BASE_MS")
            .unwrap_or_else(|_| "100".into())
            .parse()
            .expect("ASSIGN_RETRY_BASE_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            live_channel_capacity,
            assign_max_attempts,
            assign_retry_base_ms,
        }
    }

    /// Retry policy for orchestrated door operations.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.assign_max_attempts.max(1),
            initial_delay: Duration::from_millis(self.assign_retry_base_ms),
            ..Default::default()
        }
    }
}
