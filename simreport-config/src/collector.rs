//! Remote collector connection parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Where the collector lives and how long the client may block on it.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CollectorConfig {
    /// Collector host name or address. No connection is attempted when unset.
    #[serde(default)]
    #[validate(length(min = 1, max = 253))]
    #[validate(custom(function = validation::validate_host))]
    pub host: Option<String>,

    /// Collector TCP port.
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Upper bound on a single connect attempt (milliseconds).
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1, max = 600_000))]
    pub connect_timeout_ms: u64,

    /// Upper bound on a single blocking socket write (milliseconds).
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1, max = 600_000))]
    pub write_timeout_ms: u64,
}

fn default_port() -> u16 {
    9900
}

fn default_timeout_ms() -> u64 {
    2000
}

impl CollectorConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            connect_timeout_ms: default_timeout_ms(),
            write_timeout_ms: default_timeout_ms(),
        }
    }
}
