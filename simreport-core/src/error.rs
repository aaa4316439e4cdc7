//! Reporting client errors and the fatal-condition value.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Resolution or connection to the collector failed (timeouts included).
    #[error("Cannot reach collector {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Writing the send buffer failed; the remote sink is disabled.
    #[error("Send of {pending} bytes to {peer} failed: {source}")]
    Send {
        peer: String,
        pending: usize,
        #[source]
        source: io::Error,
    },

    /// Opening or appending to the logfile failed; the logfile sink is disabled.
    #[error("Logfile {} unavailable: {source}", path.display())]
    Logfile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Reporting session is closed")]
    Closed,

    #[error("Unknown sink name: {0}")]
    UnknownSink(String),

    #[error("Record encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Malformed frame: {0}")]
    Decode(String),

    #[error(transparent)]
    Fatal(#[from] FatalCondition),
}

impl ReportError {
    /// Name of the sink this failure disables.
    pub fn sink(&self) -> &'static str {
        match self {
            ReportError::Connection { .. } | ReportError::Send { .. } => "remote",
            ReportError::Logfile { .. } => "logfile",
            _ => "session",
        }
    }
}

/// An unrecoverable simulation condition raised through
/// [`ReportingSession::fatal`](crate::ReportingSession::fatal).
///
/// By the time this value exists the session has already been closed. The
/// engine decides how to unwind; [`FatalCondition::terminate`] ends the
/// process the abrupt way.
#[derive(Debug, Clone, Error)]
#[error("Fatal simulation condition: {message}")]
pub struct FatalCondition {
    message: String,
}

impl FatalCondition {
    pub(crate) fn new(message: String) -> Self {
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Exits the process with a failure status.
    pub fn terminate(self) -> ! {
        std::process::exit(self.exit_code())
    }
}
