//! Custom validation functions for configuration.

use validator::ValidationError;

/// Sink names accepted in `output.default_sinks`.
pub const SINK_NAMES: [&str; 4] = ["console", "err", "logfile", "remote"];

/// Validate that every entry names a known sink.
pub fn validate_sink_names(names: &[String]) -> Result<(), ValidationError> {
    if names
        .iter()
        .all(|name| SINK_NAMES.contains(&name.to_lowercase().as_str()))
    {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_sink"))
    }
}

/// Validate that a host is a plausible DNS name or IP literal.
pub fn validate_host(host: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^[A-Za-z0-9.\-:\[\]]+$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(host) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_host"))
    }
}
