//! Errors raised while loading a reporter configuration.

use std::fmt::Write;
use std::path::PathBuf;

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested YAML file does not exist.
    #[error("Reporter configuration not found: {0}")]
    FileNotFound(PathBuf),

    /// A value was read but is out of range or names an unknown sink.
    #[error("Invalid reporter configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// YAML or environment input could not be merged or deserialized.
    #[error("Cannot parse reporter configuration: {0}")]
    Parsing(#[from] figment::Error),
}

/// Renders one line per failed field, keyed by its dotted path
/// (`collector.port`, `output.default_sinks`).
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut output = String::new();
    collect_errors(errors, "", &mut output);
    output
}

fn collect_errors(errors: &ValidationErrors, prefix: &str, output: &mut String) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let message = match &failure.message {
                        Some(msg) => msg.to_string(),
                        None => failure.code.to_string(),
                    };
                    let _ = writeln!(output, "  {path}: {message}");
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(nested, &path, output),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(nested, &format!("{path}[{index}]"), output);
                }
            }
        }
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}
