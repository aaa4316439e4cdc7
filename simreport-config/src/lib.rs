//! # simreport configuration
//!
//! Layered configuration for the reporting client: where the collector lives,
//! how long the client may block on it, and how local output is produced.
//!
//! ## Hierarchy
//! 1. Default values
//! 2. `config/simreport.yaml`
//! 3. `config/<SIMREPORT_ENV>.yaml`
//! 4. `SIMREPORT_*` environment variables (`__` separates nested keys)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod collector;
mod error;
mod output;
mod validation;

pub use collector::CollectorConfig;
pub use error::ConfigError;
pub use output::OutputConfig;
pub use validation::SINK_NAMES;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "SIMREPORT_";

/// Top-level configuration for a reporting session.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct ReporterConfig {
    /// Remote collector connection parameters.
    #[validate(nested)]
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Send buffer, logfile and sink defaults.
    #[validate(nested)]
    #[serde(default)]
    pub output: OutputConfig,
}

impl ReporterConfig {
    /// Load configuration from the default files and the environment.
    ///
    /// Missing files are skipped; the defaults stand in for anything not set.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ReporterConfig::default()));

        if Path::new("config/simreport.yaml").exists() {
            figment = figment.merge(Yaml::file("config/simreport.yaml"));
        }

        let env = std::env::var("SIMREPORT_ENV").unwrap_or_else(|_| "development".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific YAML file plus the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::extract(
            Figment::from(Serialized::defaults(ReporterConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
