//! Local output parameters: send buffer sizing, logfile, default sinks.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct OutputConfig {
    /// Buffered bytes beyond which a send is forced.
    #[serde(default = "default_capacity")]
    #[validate(range(min = 1, max = 1_048_576))]
    pub send_buffer_capacity: usize,

    /// Append-only logfile opened for the run, if any.
    #[serde(default)]
    pub logfile: Option<PathBuf>,

    /// Sinks used by `log` calls that do not name their own.
    #[serde(default = "default_sinks")]
    #[validate(custom(function = validation::validate_sink_names))]
    pub default_sinks: Vec<String>,
}

fn default_capacity() -> usize {
    1000
}

fn default_sinks() -> Vec<String> {
    vec!["console".into(), "remote".into()]
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            send_buffer_capacity: default_capacity(),
            logfile: None,
            default_sinks: default_sinks(),
        }
    }
}
