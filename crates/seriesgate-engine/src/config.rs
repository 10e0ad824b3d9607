//! Engine configuration.
//!
//! Read from environment variables with defaults:
//! - `SERIESGATE_MAX_SUBREQUESTS`: chunk size limit (default 300)
//! - `SERIESGATE_DISPATCH_CONCURRENCY`: in-flight chunk calls (default 1)
//! - `SERIESGATE_BATCH_TIMEOUT_SECS`: batch deadline (default none)
//! - `SERIESGATE_HTTP_TIMEOUT_SECS`: per-call HTTP timeout (default 30)
//! - `SERIESGATE_BUCKET_WARNING_THRESHOLD`: bucket count warning (default 10000)

use std::time::Duration;

use seriesgate_core::classify::BUCKET_WARNING_THRESHOLD;

use crate::error::ConfigError;

/// Server-side ceiling on subrequests per batch compute call.
pub const DEFAULT_MAX_SUBREQUESTS: usize = 300;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of compute requests per chunk. Never zero.
    pub max_subrequests: usize,
    /// Maximum number of chunk calls in flight. 1 dispatches sequentially.
    pub dispatch_concurrency: usize,
    /// Deadline for a whole batch, measured from the start of execution.
    pub batch_timeout: Option<Duration>,
    pub http_timeout: Duration,
    pub bucket_warning_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_subrequests: DEFAULT_MAX_SUBREQUESTS,
            dispatch_concurrency: 1,
            batch_timeout: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            bucket_warning_threshold: BUCKET_WARNING_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();
        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            match lookup(var) {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
            }
        };

        let config = EngineConfig {
            max_subrequests: number("SERIESGATE_MAX_SUBREQUESTS")?
                .map_or(defaults.max_subrequests, |n| n as usize),
            dispatch_concurrency: number("SERIESGATE_DISPATCH_CONCURRENCY")?
                .map_or(defaults.dispatch_concurrency, |n| n as usize),
            batch_timeout: number("SERIESGATE_BATCH_TIMEOUT_SECS")?.map(Duration::from_secs),
            http_timeout: number("SERIESGATE_HTTP_TIMEOUT_SECS")?
                .map_or(defaults.http_timeout, Duration::from_secs),
            bucket_warning_threshold: number("SERIESGATE_BUCKET_WARNING_THRESHOLD")?
                .unwrap_or(defaults.bucket_warning_threshold),
        };
        Ok(config.normalized())
    }

    /// Clamps limits that must be at least one.
    pub fn normalized(mut self) -> Self {
        self.max_subrequests = self.max_subrequests.max(1);
        self.dispatch_concurrency = self.dispatch_concurrency.max(1);
        self
    }
}
