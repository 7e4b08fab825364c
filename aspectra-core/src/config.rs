//! Configuration types

use crate::constants::{DEFAULT_ARG_RENDER_LIMIT, DEFAULT_RESULT_RENDER_LIMIT, ENV_PREFIX};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How derived and explicit cache keys are partitioned between callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    /// Every key is qualified by the caller identity. Two principals never
    /// share a cached result.
    #[default]
    PerCaller,
    /// Keys ignore the caller. A result cached for one principal is served
    /// to every principal that passes access control.
    Shared,
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerCaller => f.write_str("per_caller"),
            Self::Shared => f.write_str("shared"),
        }
    }
}

impl FromStr for KeyScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_caller" | "caller" => Ok(Self::PerCaller),
            "shared" => Ok(Self::Shared),
            _ => Err(ConfigError::InvalidValue {
                field: "key_scope".to_string(),
                value: s.to_string(),
                reason: "expected per_caller or shared".to_string(),
            }),
        }
    }
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum rendered length of each argument in log records.
    pub arg_render_limit: usize,
    /// Maximum rendered length of a result in log records.
    pub result_render_limit: usize,
    /// Cache key partitioning.
    pub key_scope: KeyScope,
    /// Interval of the background expiry sweep; `None` disables it.
    ///
    /// Reads never remove expired entries. With no sweep, an entry whose key
    /// is never looked up or written again stays resident until it is
    /// invalidated or the store is cleared. Per-caller keys make such
    /// one-off keys common in long-running processes.
    pub sweep_interval: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            arg_render_limit: DEFAULT_ARG_RENDER_LIMIT,
            result_render_limit: DEFAULT_RESULT_RENDER_LIMIT,
            key_scope: KeyScope::default(),
            sweep_interval: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg_render_limit(mut self, limit: usize) -> Self {
        self.arg_render_limit = limit;
        self
    }

    pub fn with_result_render_limit(mut self, limit: usize) -> Self {
        self.result_render_limit = limit;
        self
    }

    pub fn with_key_scope(mut self, scope: KeyScope) -> Self {
        self.key_scope = scope;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Create PipelineConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `ASPECTRA_ARG_RENDER_LIMIT`: argument render cap (default: 50)
    /// - `ASPECTRA_RESULT_RENDER_LIMIT`: result render cap (default: 100)
    /// - `ASPECTRA_CACHE_KEY_SCOPE`: `per_caller` or `shared` (default: per_caller)
    /// - `ASPECTRA_SWEEP_INTERVAL_SECS`: expiry sweep interval, 0 disables (default: off)
    ///
    /// Unset variables fall back to defaults; malformed ones are reported.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let arg_render_limit =
            parse_env("ARG_RENDER_LIMIT")?.unwrap_or(defaults.arg_render_limit);
        let result_render_limit =
            parse_env("RESULT_RENDER_LIMIT")?.unwrap_or(defaults.result_render_limit);
        let key_scope = parse_env("CACHE_KEY_SCOPE")?.unwrap_or(defaults.key_scope);
        let sweep_interval = match parse_env::<u64>("SWEEP_INTERVAL_SECS")? {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };

        let config = Self {
            arg_render_limit,
            result_render_limit,
            key_scope,
            sweep_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arg_render_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "arg_render_limit".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.result_render_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "result_render_limit".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(interval) = self.sweep_interval {
            if interval.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "sweep_interval".to_string(),
                    value: format!("{:?}", interval),
                    reason: "must be greater than zero when set".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_env<T>(suffix: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    let name = format!("{}{}", ENV_PREFIX, suffix);
    match std::env::var(&name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                field: name,
                value: raw.clone(),
                reason: "could not be parsed".to_string(),
            }),
        Err(_) => Ok(None),
    }
}
