//! Static per-operation configuration.

use crate::constants::DEFAULT_CACHE_TTL_SECS;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Severity used for an operation's log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidValue {
                field: "level".to_string(),
                value: s.to_string(),
                reason: "expected one of TRACE, DEBUG, INFO, WARN, ERROR".to_string(),
            }),
        }
    }
}

/// Execution logging settings for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingSpec {
    /// Free-form message attached to the start record (empty = none).
    pub message: String,
    pub level: LogLevel,
}

impl LoggingSpec {
    pub fn message(&self) -> Option<&str> {
        if self.message.is_empty() {
            None
        } else {
            Some(&self.message)
        }
    }
}

/// Result caching settings for an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachingSpec {
    /// Explicit cache key. When absent the key is derived from the call.
    pub key: Option<String>,
    pub ttl: Duration,
}

impl Default for CachingSpec {
    fn default() -> Self {
        Self {
            key: None,
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// Which concerns wrap an operation, attached once per operation kind and
/// shared read-only by every call.
///
/// # Example
///
/// ```
/// use aspectra_core::{LogLevel, OperationDescriptor};
/// use std::time::Duration;
///
/// let remove_agent = OperationDescriptor::new("remove_agent")
///     .logged("removing agent", LogLevel::Warn)
///     .requires_roles(["ADMIN"]);
///
/// let top_transaction = OperationDescriptor::new("top_transaction")
///     .logged("", LogLevel::Info)
///     .cached_for(Duration::from_secs(60));
///
/// assert!(remove_agent.logging().is_some());
/// assert!(top_transaction.caching().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    name: String,
    logging: Option<LoggingSpec>,
    caching: Option<CachingSpec>,
    required_roles: BTreeSet<String>,
}

impl OperationDescriptor {
    /// A descriptor with every concern disabled.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logging: None,
            caching: None,
            required_roles: BTreeSet::new(),
        }
    }

    /// Enable execution logging with a message and level.
    pub fn logged(mut self, message: impl Into<String>, level: LogLevel) -> Self {
        self.logging = Some(LoggingSpec {
            message: message.into(),
            level,
        });
        self
    }

    /// Enable caching with a derived key and the default TTL.
    pub fn cached(mut self) -> Self {
        self.caching = Some(CachingSpec::default());
        self
    }

    /// Enable caching with a derived key and an explicit TTL.
    pub fn cached_for(mut self, ttl: Duration) -> Self {
        self.caching = Some(CachingSpec { key: None, ttl });
        self
    }

    /// Enable caching under an explicit key.
    pub fn cached_as(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.caching = Some(CachingSpec {
            key: Some(key.into()),
            ttl,
        });
        self
    }

    /// Restrict the operation to callers holding at least one of `roles`.
    pub fn requires_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.required_roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logging(&self) -> Option<&LoggingSpec> {
        self.logging.as_ref()
    }

    pub fn caching(&self) -> Option<&CachingSpec> {
        self.caching.as_ref()
    }

    /// Roles of which the caller needs at least one (empty = unrestricted).
    pub fn required_roles(&self) -> &BTreeSet<String> {
        &self.required_roles
    }

    pub fn is_restricted(&self) -> bool {
        !self.required_roles.is_empty()
    }
}
