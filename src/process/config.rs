/*!
 * Pool Configuration
 * Immutable tuning parameters fixed at pool construction
 */

use crate::core::errors::{PoolError, PoolResult};
use crate::core::limits::{DEFAULT_MAX_CONCURRENT, DEFAULT_RUN_TIMEOUT};
use crate::signals::KillSignal;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_MAX_CONCURRENT: &str = "POOL_MAX_CONCURRENT";
pub const ENV_DEFAULT_TIMEOUT_MS: &str = "POOL_DEFAULT_TIMEOUT_MS";
pub const ENV_KILL_SIGNAL: &str = "POOL_KILL_SIGNAL";
pub const ENV_METRICS_ENABLED: &str = "POOL_METRICS_ENABLED";
pub const ENV_HANDLE_SIGNALS: &str = "POOL_HANDLE_SIGNALS";
pub const ENV_TIMEOUT_KILL_GRACE_MS: &str = "POOL_TIMEOUT_KILL_GRACE_MS";

/// Pool configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PoolConfig {
    /// Concurrency ceiling (at least 1)
    pub max_concurrent: usize,

    /// Timeout applied when a call does not set one; zero disables it
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub default_timeout: Duration,

    /// Sent on timeout and at the start of graceful shutdown
    pub kill_signal: KillSignal,

    pub metrics_enabled: bool,

    /// Install a watcher for the host's own SIGINT/SIGTERM/SIGQUIT
    pub handle_host_signals: bool,

    /// After a timeout signal, wait this long and then SIGKILL a survivor.
    /// `None` sends the timeout signal once and never escalates.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub timeout_kill_grace: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            default_timeout: DEFAULT_RUN_TIMEOUT,
            kill_signal: KillSignal::default(),
            metrics_enabled: true,
            handle_host_signals: false,
            timeout_kill_grace: None,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Disable the default per-run timeout
    pub fn without_timeout(self) -> Self {
        self.with_default_timeout(Duration::ZERO)
    }

    pub fn with_kill_signal(mut self, signal: KillSignal) -> Self {
        self.kill_signal = signal;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    pub fn with_host_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_host_signals = enabled;
        self
    }

    pub fn with_timeout_kill_grace(mut self, grace: Duration) -> Self {
        self.timeout_kill_grace = Some(grace);
        self
    }

    /// Check invariants that the type alone cannot express
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_concurrent == 0 {
            return Err(PoolError::InvalidConfig(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Timeout that applies to a run given its per-call override
    ///
    /// Returns `None` when the run should not be timed.
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Option<Duration> {
        let timeout = requested.unwrap_or(self.default_timeout);
        (!timeout.is_zero()).then_some(timeout)
    }

    /// Defaults overlaid with `POOL_*` environment variables
    pub fn from_env() -> PoolResult<Self> {
        let mut config = Self::default();

        if let Some(max) = env_parse::<usize>(ENV_MAX_CONCURRENT)? {
            config.max_concurrent = max;
        }
        if let Some(ms) = env_parse::<u64>(ENV_DEFAULT_TIMEOUT_MS)? {
            config.default_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = env_var(ENV_KILL_SIGNAL) {
            config.kill_signal = raw.parse()?;
        }
        if let Some(enabled) = env_flag(ENV_METRICS_ENABLED)? {
            config.metrics_enabled = enabled;
        }
        if let Some(enabled) = env_flag(ENV_HANDLE_SIGNALS)? {
            config.handle_host_signals = enabled;
        }
        if let Some(ms) = env_parse::<u64>(ENV_TIMEOUT_KILL_GRACE_MS)? {
            config.timeout_kill_grace = Some(Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> PoolResult<Option<T>> {
    env_var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| PoolError::InvalidConfig(format!("{}={:?} is not valid", key, raw)))
        })
        .transpose()
}

fn env_flag(key: &str) -> PoolResult<Option<bool>> {
    env_var(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(PoolError::InvalidConfig(format!(
                "{}={:?} is not a boolean",
                key, raw
            ))),
        })
        .transpose()
}
