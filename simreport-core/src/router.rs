//! Mask-driven dispatch of records to console, logfile and collector.

use std::path::Path;

use simreport_telemetry::ReportMetrics;
use tracing::{debug, warn};

use crate::console::Console;
use crate::error::ReportError;
use crate::logfile::Logfile;
use crate::record::Record;
use crate::sink::SinkMask;
use crate::transport::Transport;

/// Routes records to the sinks selected by a [`SinkMask`].
///
/// Sink failures stop here: the failing sink is disabled, a notice goes to
/// standard error, and the caller carries on.
pub struct SinkRouter {
    console: Console,
    logfile: Option<Logfile>,
    metrics: ReportMetrics,
}

impl SinkRouter {
    pub fn new(console: Console, metrics: ReportMetrics) -> Self {
        Self {
            console,
            logfile: None,
            metrics,
        }
    }

    pub fn has_logfile(&self) -> bool {
        self.logfile.is_some()
    }

    pub fn logfile_path(&self) -> Option<&Path> {
        self.logfile.as_ref().map(Logfile::path)
    }

    /// Opens (or replaces) the logfile. On failure the logfile sink is left
    /// disabled and the error returned after being reported.
    pub fn open_logfile(&mut self, path: &Path) -> Result<(), ReportError> {
        self.logfile = None;
        match Logfile::open(path) {
            Ok(logfile) => {
                debug!(path = %path.display(), "logfile opened");
                self.logfile = Some(logfile);
                Ok(())
            }
            Err(e) => {
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    pub fn close_logfile(&mut self) {
        if let Some(logfile) = self.logfile.take() {
            debug!(path = %logfile.path().display(), "logfile closed");
        }
    }

    pub fn route(&mut self, transport: &mut Transport, record: &Record, mask: SinkMask) {
        self.metrics.record_routed(record.kind());

        if mask.intersects(SinkMask::CONSOLE | SinkMask::ERR) {
            let text = record.text();
            if mask.contains(SinkMask::CONSOLE) {
                if let Err(e) = self.console.out_line(&text) {
                    debug!(error = %e, "stdout write failed");
                }
            }
            if mask.contains(SinkMask::ERR) {
                if let Err(e) = self.console.err_line(&text) {
                    debug!(error = %e, "stderr write failed");
                }
            }
        }

        if mask.contains(SinkMask::LOGFILE) {
            if let Some(logfile) = self.logfile.as_mut() {
                if let Err(e) = logfile.append(record) {
                    self.logfile = None;
                    self.report_failure(&e);
                }
            }
        }

        if mask.contains(SinkMask::REMOTE) && transport.is_enabled() {
            let result = record
                .frame()
                .and_then(|frame| transport.add_to_send_buffer(&frame));
            if let Err(e) = result {
                self.report_failure(&e);
            }
        }
    }

    /// Writes a line to standard output that is not a record: it is neither
    /// framed for the collector nor counted.
    pub fn notice(&mut self, line: &str) {
        if let Err(e) = self.console.out_line(line) {
            debug!(error = %e, "stdout write failed");
        }
    }

    /// Writes a notice for a failed sink to standard error and the diagnostics log.
    pub fn report_failure(&mut self, error: &ReportError) {
        warn!(sink = error.sink(), %error, "reporting sink disabled");
        self.metrics.sink_failed(error.sink());
        if let Err(e) = self.console.err_line(&format!("simreport: {error}")) {
            debug!(error = %e, "stderr write failed");
        }
    }
}
