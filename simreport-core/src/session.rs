//! The engine-facing reporting API.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use simreport_config::ReporterConfig;
use simreport_telemetry::ReportMetrics;
use tracing::{debug, info};

use crate::console::Console;
use crate::error::{FatalCondition, ReportError};
use crate::record::Record;
use crate::registry::{ElementId, Registry};
use crate::router::SinkRouter;
use crate::sink::{Qualifier, SinkMask};
use crate::time::SimClock;
use crate::transport::{Transport, DEFAULT_TIMEOUT, MAX_BUFFER_SIZE};

/// Lifecycle of a [`ReportingSession`]. There is no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Connected,
    Running,
    Closed,
}

const RUN_START_SINKS: SinkMask = SinkMask::CONSOLE
    .union(SinkMask::LOGFILE)
    .union(SinkMask::REMOTE);
const RECORD_SINKS: SinkMask = SinkMask::LOGFILE.union(SinkMask::REMOTE);

/// Reporting state for one simulation run.
///
/// Owned by the engine and passed to reporting call sites. Use
/// [`SharedSession`](crate::SharedSession) when several threads report.
pub struct ReportingSession {
    state: SessionState,
    transport: Transport,
    router: SinkRouter,
    registry: Registry,
    clock: SimClock,
    run: Option<String>,
    target: Option<(String, u16)>,
    default_sinks: SinkMask,
    metrics: ReportMetrics,
}

impl Default for ReportingSession {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ReportingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Builds a session from configuration, opening the configured logfile
    /// and connecting to the configured collector.
    ///
    /// Logfile and connection failures only disable their sink. Invalid sink
    /// names are the one hard error.
    pub fn from_config(config: &ReporterConfig) -> Result<Self, ReportError> {
        let default_sinks = SinkMask::from_sink_names(&config.output.default_sinks)?;
        let mut session = Self::builder()
            .send_buffer_capacity(config.output.send_buffer_capacity)
            .timeouts(
                config.collector.connect_timeout(),
                config.collector.write_timeout(),
            )
            .default_sinks(default_sinks)
            .build();

        if let Some(path) = &config.output.logfile {
            let _ = session.open_logfile(path);
        }
        if let Some(host) = &config.collector.host {
            let _ = session.connect(host, config.collector.port);
        }
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn is_network_enabled(&self) -> bool {
        self.transport.is_enabled()
    }

    pub fn run_name(&self) -> Option<&str> {
        self.run.as_deref()
    }

    /// The last collector address passed to [`ReportingSession::connect`].
    pub fn target(&self) -> Option<(&str, u16)> {
        self.target.as_ref().map(|(host, port)| (host.as_str(), *port))
    }

    pub fn default_sinks(&self) -> SinkMask {
        self.default_sinks
    }

    pub fn buffered_bytes(&self) -> usize {
        self.transport.buffered()
    }

    pub fn registered_elements(&self) -> u64 {
        self.registry.registered()
    }

    /// Clone of the simulation clock that stamps events.
    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    pub fn metrics(&self) -> &ReportMetrics {
        &self.metrics
    }

    fn ensure_open(&self) -> Result<(), ReportError> {
        if self.is_closed() {
            Err(ReportError::Closed)
        } else {
            Ok(())
        }
    }

    fn emit(&mut self, record: &Record, mask: SinkMask) {
        self.router.route(&mut self.transport, record, mask);
    }

    /// Connects to the collector, replacing any current connection.
    ///
    /// On failure the session keeps running without the remote sink; the
    /// failure is written to standard error and also returned.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), ReportError> {
        self.ensure_open()?;
        self.target = Some((host.to_string(), port));
        match self.transport.connect(host, port) {
            Ok(()) => {
                if self.state == SessionState::Uninitialized {
                    self.state = SessionState::Connected;
                }
                Ok(())
            }
            Err(e) => {
                if self.state == SessionState::Connected {
                    self.state = SessionState::Uninitialized;
                }
                self.router.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Opens (or replaces) the run logfile. Failure leaves the logfile sink
    /// disabled.
    pub fn open_logfile(&mut self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        self.ensure_open()?;
        self.router.open_logfile(path.as_ref())
    }

    /// Records the run name and announces the run on console, logfile and collector.
    pub fn start_run(&mut self, name: &str) -> Result<(), ReportError> {
        self.ensure_open()?;
        info!(run = name, "run started");
        self.run = Some(name.to_string());
        self.state = SessionState::Running;
        let record = Record::RunStart {
            run: name.to_string(),
            started_at: Utc::now(),
        };
        self.emit(&record, RUN_START_SINKS);
        Ok(())
    }

    /// Allocates a fresh element id and tells the collector what it stands for.
    pub fn register_element(
        &mut self,
        element_type: &str,
        external_id: i64,
    ) -> Result<ElementId, ReportError> {
        self.ensure_open()?;
        let element = self.registry.register(element_type, external_id);
        let record = Record::Element {
            id: element.id,
            element_type: element.element_type,
            external_id: element.external_id,
        };
        self.emit(&record, SinkMask::REMOTE);
        Ok(element.id)
    }

    /// Reports an event for a registered element at the current simulation time.
    pub fn report_event(
        &mut self,
        element: ElementId,
        event: &str,
        data: &str,
    ) -> Result<(), ReportError> {
        self.ensure_open()?;
        let record = Record::Event {
            element,
            event: event.to_string(),
            data: data.to_string(),
            sim_time_ns: self.clock.now_ns(),
            at: Utc::now(),
        };
        self.emit(&record, RECORD_SINKS);
        Ok(())
    }

    /// Reports a named attribute (static or periodic metadata) of an element.
    pub fn report_attribute(
        &mut self,
        element: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), ReportError> {
        self.ensure_open()?;
        let record = Record::Attribute {
            element,
            name: name.to_string(),
            value: value.to_string(),
        };
        self.emit(&record, RECORD_SINKS);
        Ok(())
    }

    /// Logs to the session's default sinks (console and collector unless configured otherwise).
    pub fn log(
        &mut self,
        qualifier: impl Into<Qualifier>,
        message: impl Into<String>,
    ) -> Result<(), ReportError> {
        let mask = self.default_sinks;
        self.log_to(qualifier, message, mask)
    }

    pub fn log_to(
        &mut self,
        qualifier: impl Into<Qualifier>,
        message: impl Into<String>,
        sinks: SinkMask,
    ) -> Result<(), ReportError> {
        self.ensure_open()?;
        let record = Record::log(qualifier.into(), message);
        self.emit(&record, sinks);
        Ok(())
    }

    /// Sends whatever is buffered. A failure disables the remote sink.
    pub fn flush(&mut self) -> Result<(), ReportError> {
        self.ensure_open()?;
        if let Err(e) = self.transport.send() {
            self.router.report_failure(&e);
        }
        Ok(())
    }

    /// Logs an unrecoverable condition, closes the session and hands the
    /// condition back for the engine to unwind with.
    ///
    /// ```no_run
    /// # use simreport_core::ReportingSession;
    /// let mut session = ReportingSession::new();
    /// session.fatal("routing table corrupt").terminate();
    /// ```
    pub fn fatal(&mut self, message: impl Into<String>) -> FatalCondition {
        let message = message.into();
        if !self.is_closed() {
            let mask = self.default_sinks | SinkMask::LOGFILE;
            self.emit(&Record::log(Qualifier::Notable, message.clone()), mask);
            self.router.notice("Terminating");
            self.close();
        }
        FatalCondition::new(message)
    }

    /// Flushes the collector connection, closes socket and logfile.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.run.is_some() {
            let record = Record::RunEnd {
                run: self.run.clone(),
                ended_at: Utc::now(),
            };
            self.emit(&record, RECORD_SINKS);
        }
        self.transport.close();
        self.router.close_logfile();
        self.state = SessionState::Closed;
        debug!(run = ?self.run, "reporting session closed");
    }
}

impl Drop for ReportingSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Configures a [`ReportingSession`] before any sink is opened.
pub struct SessionBuilder {
    capacity: usize,
    connect_timeout: Duration,
    write_timeout: Duration,
    default_sinks: SinkMask,
    console: Option<Console>,
    clock: SimClock,
    metrics: Option<ReportMetrics>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            capacity: MAX_BUFFER_SIZE,
            connect_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            default_sinks: SinkMask::default(),
            console: None,
            clock: SimClock::default(),
            metrics: None,
        }
    }
}

impl SessionBuilder {
    pub fn send_buffer_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn timeouts(mut self, connect: Duration, write: Duration) -> Self {
        self.connect_timeout = connect;
        self.write_timeout = write;
        self
    }

    pub fn default_sinks(mut self, sinks: SinkMask) -> Self {
        self.default_sinks = sinks;
        self
    }

    /// Replaces standard output/error, e.g. with [`CaptureBuffer`](crate::CaptureBuffer)s.
    pub fn console(mut self, console: Console) -> Self {
        self.console = Some(console);
        self
    }

    /// Shares an engine-owned clock instead of starting a new one at 0.
    pub fn clock(mut self, clock: SimClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(mut self, metrics: ReportMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> ReportingSession {
        let metrics = self.metrics.unwrap_or_default();
        let transport = Transport::new(self.capacity, metrics.clone())
            .with_timeouts(self.connect_timeout, self.write_timeout);
        let router = SinkRouter::new(self.console.unwrap_or_default(), metrics.clone());
        ReportingSession {
            state: SessionState::Uninitialized,
            transport,
            router,
            registry: Registry::new(),
            clock: self.clock,
            run: None,
            target: None,
            default_sinks: self.default_sinks,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CaptureBuffer;
    use crate::record::FrameDecoder;

    struct Captured {
        session: ReportingSession,
        out: CaptureBuffer,
        err: CaptureBuffer,
        wire: CaptureBuffer,
    }

    fn captured() -> Captured {
        let out = CaptureBuffer::new();
        let err = CaptureBuffer::new();
        let wire = CaptureBuffer::new();
        let mut session = ReportingSession::builder()
            .console(Console::new(out.clone(), err.clone()))
            .build();
        session.transport.attach(wire.clone(), "memory");
        Captured {
            session,
            out,
            err,
            wire,
        }
    }

    fn decode(wire: &CaptureBuffer) -> Vec<Record> {
        let mut decoder = FrameDecoder::new();
        decoder.extend(&wire.bytes());
        decoder.drain().map(Result::unwrap).collect()
    }

    #[test]
    fn router_registered_twice_gets_two_ids() {
        let mut session = ReportingSession::new();
        let first = session.register_element("Router", 5).unwrap();
        let second = session.register_element("Router", 5).unwrap();
        assert_eq!(first, ElementId::new(0));
        assert_eq!(second, ElementId::new(1));
        assert_eq!(session.registered_elements(), 2);
    }

    #[test]
    fn lifecycle_transitions() {
        let mut c = captured();
        assert_eq!(c.session.state(), SessionState::Uninitialized);
        c.session.start_run("mesh_4x4").unwrap();
        assert_eq!(c.session.state(), SessionState::Running);
        assert_eq!(c.session.run_name(), Some("mesh_4x4"));
        assert_eq!(c.out.contents(), "Starting run mesh_4x4\n");

        c.session.close();
        assert_eq!(c.session.state(), SessionState::Closed);
        assert!(matches!(
            c.session.start_run("again"),
            Err(ReportError::Closed)
        ));
        assert!(matches!(
            c.session.register_element("Router", 1),
            Err(ReportError::Closed)
        ));
        assert!(matches!(c.session.log(false, "late"), Err(ReportError::Closed)));
    }

    #[test]
    fn disk_full_goes_to_both_console_streams_only() {
        let mut c = captured();
        c.session
            .log_to(true, "disk full", SinkMask::CONSOLE | SinkMask::ERR)
            .unwrap();
        assert_eq!(c.out.contents(), "disk full\n");
        assert_eq!(c.err.contents(), "disk full\n");
        assert_eq!(c.session.buffered_bytes(), 0);
    }

    #[test]
    fn default_log_reaches_console_and_collector() {
        let mut c = captured();
        c.session.log(false, "warming up").unwrap();
        assert_eq!(c.out.contents(), "warming up\n");
        assert!(c.err.contents().is_empty());
        assert!(c.session.buffered_bytes() > 0);
    }

    #[test]
    fn events_carry_simulation_time() {
        let mut c = captured();
        let clock = c.session.clock();
        let router = c.session.register_element("Router", 12).unwrap();
        clock.advance(4_000);
        c.session.report_event(router, "flit_in", "vc=1").unwrap();
        c.session.report_attribute(router, "ports", "5").unwrap();
        c.session.flush().unwrap();

        let records = decode(&c.wire);
        assert_eq!(records.len(), 3);
        assert!(matches!(
            &records[0],
            Record::Element { id, element_type, external_id: 12 }
                if *id == router && element_type == "Router"
        ));
        assert!(matches!(
            &records[1],
            Record::Event { element, sim_time_ns: 4_000, event, .. }
                if *element == router && event == "flit_in"
        ));
        assert!(matches!(&records[2], Record::Attribute { name, value, .. } if name == "ports" && value == "5"));
        assert!(c.out.contents().is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let mut c = captured();
        c.session.start_run("idem").unwrap();
        c.session.close();
        let after_first = c.wire.bytes();
        c.session.close();
        assert_eq!(c.wire.bytes(), after_first);

        let records = decode(&c.wire);
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[1], Record::RunEnd { run: Some(run), .. } if run == "idem"));
        assert_eq!(c.session.metrics().flushes.get(), 1);
    }

    #[test]
    fn fatal_logs_closes_and_returns_condition() {
        let mut c = captured();
        let condition = c.session.fatal("routing table corrupt");
        assert_eq!(condition.message(), "routing table corrupt");
        assert_eq!(condition.exit_code(), 1);
        assert!(c.session.is_closed());
        assert_eq!(c.out.contents(), "routing table corrupt\nTerminating\n");
        assert_eq!(
            c.session.metrics().records.with_label_values(&["log"]).get(),
            1
        );

        let records = decode(&c.wire);
        assert!(matches!(&records[0], Record::Log { notable: true, message, .. } if message == "routing table corrupt"));

        let err: ReportError = condition.into();
        assert!(err.to_string().contains("routing table corrupt"));
    }

    #[test]
    fn from_config_applies_default_sinks() {
        let mut config = ReporterConfig::default();
        config.output.default_sinks = vec!["err".into()];
        let session = ReportingSession::from_config(&config).unwrap();
        assert_eq!(session.default_sinks(), SinkMask::ERR);
        assert!(!session.is_network_enabled());

        config.output.default_sinks = vec!["pager".into()];
        assert!(matches!(
            ReportingSession::from_config(&config),
            Err(ReportError::UnknownSink(_))
        ));
    }
}
