//! Configuration types for the record set controller
//!
//! This module defines the reconciler settings and per-resource timeout overrides.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Default bounds for the waiting operations
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Delay between two polls of the control plane (in milliseconds)
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
}

impl ReconcilerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            poll_interval_millis: default_poll_interval_millis(),
        }
    }

    /// Set the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_millis = interval.as_millis() as u64;
        self
    }

    /// Set all three default timeouts at once
    pub fn with_timeouts(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs().max(1);
        self.timeouts = TimeoutConfig {
            create_secs: secs,
            update_secs: secs,
            delete_secs: secs,
        };
        self
    }

    /// Delay between two polls
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_millis == 0 {
            return Err(crate::Error::config("poll interval must be > 0"));
        }

        self.timeouts.validate()?;

        let shortest = self
            .timeouts
            .create()
            .min(self.timeouts.update())
            .min(self.timeouts.delete());
        if self.poll_interval() >= shortest {
            return Err(crate::Error::config(format!(
                "poll interval ({:?}) must be shorter than every timeout (shortest: {:?})",
                self.poll_interval(),
                shortest
            )));
        }

        Ok(())
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Default timeouts per operation (in seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Bound for create to become visible
    #[serde(default = "default_timeout_secs")]
    pub create_secs: u64,

    /// Bound for update to settle
    #[serde(default = "default_timeout_secs")]
    pub update_secs: u64,

    /// Bound for delete to take effect
    #[serde(default = "default_timeout_secs")]
    pub delete_secs: u64,
}

impl TimeoutConfig {
    /// Create timeout
    pub fn create(&self) -> Duration {
        Duration::from_secs(self.create_secs)
    }

    /// Update timeout
    pub fn update(&self) -> Duration {
        Duration::from_secs(self.update_secs)
    }

    /// Delete timeout
    pub fn delete(&self) -> Duration {
        Duration::from_secs(self.delete_secs)
    }

    /// Validate the timeouts
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (name, secs) in [
            ("create", self.create_secs),
            ("update", self.update_secs),
            ("delete", self.delete_secs),
        ] {
            if secs == 0 {
                return Err(crate::Error::config(format!("{} timeout must be > 0", name)));
            }
        }
        Ok(())
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            create_secs: default_timeout_secs(),
            update_secs: default_timeout_secs(),
            delete_secs: default_timeout_secs(),
        }
    }
}

/// Per-resource timeout overrides
///
/// Unset entries fall back to [`TimeoutConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceTimeouts {
    /// Create override
    pub create: Option<Duration>,
    /// Update override
    pub update: Option<Duration>,
    /// Delete override
    pub delete: Option<Duration>,
}

impl ResourceTimeouts {
    /// The same bound for all three operations
    pub fn all(timeout: Duration) -> Self {
        Self {
            create: Some(timeout),
            update: Some(timeout),
            delete: Some(timeout),
        }
    }

    /// Parse overrides written as duration strings ("5m", "30s", ...)
    pub fn parse(
        create: Option<&str>,
        update: Option<&str>,
        delete: Option<&str>,
    ) -> Result<Self, crate::Error> {
        Ok(Self {
            create: create.map(parse_duration).transpose()?,
            update: update.map(parse_duration).transpose()?,
            delete: delete.map(parse_duration).transpose()?,
        })
    }
}

/// Parse a duration such as `"250ms"`, `"30s"`, `"5m"` or `"1h"`
///
/// A bare number is taken as seconds.
pub fn parse_duration(value: &str) -> Result<Duration, crate::Error> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| crate::Error::config(format!("invalid duration: '{}'", value)))?;

    let scaled = |factor: u64| {
        amount
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| crate::Error::config(format!("duration out of range: '{}'", value)))
    };

    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "" | "s" => Duration::from_secs(amount),
        "m" => scaled(60)?,
        "h" => scaled(3600)?,
        _ => {
            return Err(crate::Error::config(format!(
                "invalid duration unit in '{}' (expected ms, s, m or h)",
                value
            )));
        }
    };

    if duration.is_zero() {
        return Err(crate::Error::config(format!("duration must be > 0: '{}'", value)));
    }

    Ok(duration)
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_poll_interval_millis() -> u64 {
    3000
}
