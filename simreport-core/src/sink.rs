//! Sink selection flags and log qualifiers.

use bitflags::bitflags;

use crate::error::ReportError;

bitflags! {
    /// Destinations a record is routed to, combinable with `|`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SinkMask: u8 {
        /// Standard output.
        const CONSOLE = 1 << 0;
        /// Standard error.
        const ERR = 1 << 1;
        /// The run's logfile, if one is open.
        const LOGFILE = 1 << 2;
        /// The remote collector, if connected.
        const REMOTE = 1 << 3;
    }
}

impl Default for SinkMask {
    fn default() -> Self {
        SinkMask::CONSOLE | SinkMask::REMOTE
    }
}

impl SinkMask {
    /// Parses a single lowercase sink name as used in configuration.
    pub fn from_sink_name(name: &str) -> Result<Self, ReportError> {
        match name.to_ascii_lowercase().as_str() {
            "console" => Ok(SinkMask::CONSOLE),
            "err" => Ok(SinkMask::ERR),
            "logfile" => Ok(SinkMask::LOGFILE),
            "remote" => Ok(SinkMask::REMOTE),
            _ => Err(ReportError::UnknownSink(name.to_string())),
        }
    }

    /// Combines several sink names into one mask.
    pub fn from_sink_names<I, S>(names: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names.into_iter().try_fold(SinkMask::empty(), |mask, name| {
            Ok(mask | SinkMask::from_sink_name(name.as_ref())?)
        })
    }
}

/// Severity carried alongside a log message. It never affects routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qualifier {
    #[default]
    Info,
    Notable,
}

impl Qualifier {
    pub fn is_notable(self) -> bool {
        matches!(self, Qualifier::Notable)
    }

    pub fn label(self) -> &'static str {
        match self {
            Qualifier::Info => "INFO",
            Qualifier::Notable => "NOTE",
        }
    }
}

impl From<bool> for Qualifier {
    fn from(notable: bool) -> Self {
        if notable {
            Qualifier::Notable
        } else {
            Qualifier::Info
        }
    }
}
