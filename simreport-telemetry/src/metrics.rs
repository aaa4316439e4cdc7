//! ## simreport-telemetry::metrics
//! Prometheus counters describing what the reporting client delivered.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters shared by the transport and the sink router.
///
/// Cloning is cheap; clones update the same underlying counters.
#[derive(Debug, Clone)]
pub struct ReportMetrics {
    pub registry: Registry,
    /// Records routed, labelled by record kind.
    pub records: IntCounterVec,
    /// Bytes successfully written to the collector.
    pub bytes_flushed: IntCounter,
    /// Successful whole-buffer sends.
    pub flushes: IntCounter,
    /// Sinks disabled after a failure, labelled by sink.
    pub sink_failures: IntCounterVec,
}

impl Default for ReportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportMetrics {
    pub fn new() -> Self {
        Self::try_new().expect("static metric definitions are valid")
    }

    pub fn try_new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let records = IntCounterVec::new(
            Opts::new("simreport_records_total", "Records routed by kind"),
            &["kind"],
        )?;
        let bytes_flushed =
            IntCounter::new("simreport_bytes_flushed_total", "Bytes written to the collector")?;
        let flushes = IntCounter::new("simreport_flushes_total", "Send buffer flushes")?;
        let sink_failures = IntCounterVec::new(
            Opts::new("simreport_sink_failures_total", "Sinks disabled after a failure"),
            &["sink"],
        )?;

        registry.register(Box::new(records.clone()))?;
        registry.register(Box::new(bytes_flushed.clone()))?;
        registry.register(Box::new(flushes.clone()))?;
        registry.register(Box::new(sink_failures.clone()))?;

        Ok(Self {
            registry,
            records,
            bytes_flushed,
            flushes,
            sink_failures,
        })
    }

    pub fn record_routed(&self, kind: &str) {
        self.records.with_label_values(&[kind]).inc();
    }

    pub fn flushed(&self, bytes: usize) {
        self.flushes.inc();
        self.bytes_flushed.inc_by(bytes as u64);
    }

    pub fn sink_failed(&self, sink: &str) {
        self.sink_failures.with_label_values(&[sink]).inc();
    }

    /// Renders all counters in the Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
