//! ## simreport-telemetry::logging
//! Diagnostic subscriber setup for `tracing`.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global `tracing` subscriber used by the client and the CLI.
#[derive(Clone, Copy, Debug)]
pub struct ReportLogger;

impl ReportLogger {
    /// Installs the fmt subscriber, honouring `RUST_LOG` (default `info`).
    ///
    /// # Panics
    /// If a global subscriber was already installed.
    pub fn init() {
        Self::builder().init()
    }

    /// Like [`ReportLogger::init`] but returns `false` when a subscriber is
    /// already installed instead of panicking.
    pub fn try_init() -> bool {
        Self::builder().try_init().is_ok()
    }

    fn builder() -> fmt::SubscriberBuilder<fmt::format::DefaultFields, fmt::format::Format, EnvFilter> {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(true)
    }
}
