//! Outbound connection to the collector and its send buffer.

use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::BytesMut;
use simreport_telemetry::ReportMetrics;
use tracing::{debug, info, warn};

use crate::error::ReportError;

/// Buffered bytes beyond which a send is forced.
pub const MAX_BUFFER_SIZE: usize = 1000;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Byte sink the transport flushes into. Implemented for every `Write`.
pub trait Connection: Write + Send {}

impl<T: Write + Send> Connection for T {}

pub struct Transport {
    stream: Option<Box<dyn Connection>>,
    peer: String,
    buffer: BytesMut,
    capacity: usize,
    connect_timeout: Duration,
    write_timeout: Duration,
    metrics: ReportMetrics,
}

impl Transport {
    pub fn new(capacity: usize, metrics: ReportMetrics) -> Self {
        Self {
            stream: None,
            peer: String::new(),
            buffer: BytesMut::with_capacity(capacity * 2),
            capacity,
            connect_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            metrics,
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, write: Duration) -> Self {
        self.connect_timeout = connect;
        self.write_timeout = write;
        self
    }

    /// Whether the remote sink is live.
    pub fn is_enabled(&self) -> bool {
        self.stream.is_some()
    }

    pub fn peer(&self) -> Option<&str> {
        self.stream.as_ref().map(|_| self.peer.as_str())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Opens a TCP connection to `host:port`, replacing any existing one.
    ///
    /// Every resolved address is tried in turn, each bounded by the connect
    /// timeout. On failure the transport stays disabled.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), ReportError> {
        self.close();
        let target = format!("{host}:{port}");

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| ReportError::Connection {
                target: target.clone(),
                source,
            })?;

        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
        for addr in addrs {
            debug!(%addr, "connecting to collector");
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_write_timeout(Some(self.write_timeout))
                        .and_then(|_| stream.set_nodelay(true))
                        .map_err(|source| ReportError::Connection {
                            target: target.clone(),
                            source,
                        })?;
                    info!(%target, "connected to collector");
                    self.attach(stream, target);
                    return Ok(());
                }
                Err(e) => last_error = e,
            }
        }

        Err(ReportError::Connection {
            target,
            source: last_error,
        })
    }

    /// Uses an already established connection, e.g. a pipe or an in-memory writer.
    pub fn attach(&mut self, stream: impl Connection + 'static, peer: impl Into<String>) {
        self.stream = Some(Box::new(stream));
        self.peer = peer.into();
    }

    /// Appends one framed record, sending the whole buffer once it exceeds
    /// the capacity. Does nothing while the transport is disabled.
    pub fn add_to_send_buffer(&mut self, frame: &[u8]) -> Result<(), ReportError> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.buffer.extend_from_slice(frame);
        if self.buffer.len() > self.capacity {
            self.send()?;
        }
        Ok(())
    }

    /// Writes the whole buffer, continuing after partial writes.
    ///
    /// Any write error other than an interruption disables the transport for
    /// the rest of the run; buffered bytes are discarded.
    pub fn send(&mut self) -> Result<(), ReportError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let Some(stream) = self.stream.as_mut() else {
            self.buffer.clear();
            return Ok(());
        };

        let pending = self.buffer.len();
        match write_fully(&mut **stream, &self.buffer) {
            Ok(()) => {
                debug!(bytes = pending, peer = %self.peer, "flushed send buffer");
                self.metrics.flushed(pending);
                self.buffer.clear();
                Ok(())
            }
            Err(source) => {
                warn!(error = %source, peer = %self.peer, "collector write failed, disabling remote sink");
                self.stream = None;
                self.buffer.clear();
                Err(ReportError::Send {
                    peer: std::mem::take(&mut self.peer),
                    pending,
                    source,
                })
            }
        }
    }

    /// Best-effort final flush, then drops the connection.
    pub fn close(&mut self) {
        if self.stream.is_some() {
            if let Err(e) = self.send() {
                debug!(error = %e, "final flush failed");
            }
        }
        self.buffer.clear();
        if self.stream.take().is_some() {
            debug!(peer = %self.peer, "collector connection closed");
        }
    }
}

fn write_fully(stream: &mut dyn Connection, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match stream.write(bytes) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "collector accepted no bytes",
                ))
            }
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    loop {
        match stream.flush() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CaptureBuffer;
    use proptest::prelude::*;

    /// Accepts at most `chunk` bytes per write call.
    struct Trickle {
        sink: CaptureBuffer,
        chunk: usize,
        calls: usize,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 3 == 0 {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = buf.len().min(self.chunk);
            self.sink.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Reset;

    impl Write for Reset {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn transport() -> Transport {
        Transport::new(MAX_BUFFER_SIZE, ReportMetrics::new())
    }

    #[test]
    fn disabled_transport_buffers_nothing() {
        let mut transport = transport();
        transport.add_to_send_buffer(b"{}\n").unwrap();
        assert_eq!(transport.buffered(), 0);
        assert!(transport.peer().is_none());
    }

    #[test]
    fn flushes_once_capacity_exceeded() {
        let sink = CaptureBuffer::new();
        let mut transport = transport();
        transport.attach(sink.clone(), "memory");

        let frame = [b'x'; 400];
        transport.add_to_send_buffer(&frame).unwrap();
        transport.add_to_send_buffer(&frame).unwrap();
        assert_eq!(transport.buffered(), 800);
        assert!(sink.bytes().is_empty());

        transport.add_to_send_buffer(&frame).unwrap();
        assert_eq!(transport.buffered(), 0);
        assert_eq!(sink.bytes().len(), 1200);
    }

    #[test]
    fn exactly_full_buffer_is_not_flushed() {
        let sink = CaptureBuffer::new();
        let mut transport = transport();
        transport.attach(sink.clone(), "memory");
        transport.add_to_send_buffer(&[b'y'; MAX_BUFFER_SIZE]).unwrap();
        assert_eq!(transport.buffered(), MAX_BUFFER_SIZE);
        assert!(sink.bytes().is_empty());
    }

    #[test]
    fn partial_writes_are_retried() {
        let sink = CaptureBuffer::new();
        let mut transport = transport();
        transport.attach(
            Trickle {
                sink: sink.clone(),
                chunk: 7,
                calls: 0,
            },
            "trickle",
        );

        let payload: Vec<u8> = (0..=255u8).cycle().take(1500).collect();
        transport.add_to_send_buffer(&payload).unwrap();
        assert_eq!(sink.bytes(), payload);
        assert_eq!(transport.buffered(), 0);
    }

    #[test]
    fn write_error_disables_transport() {
        let metrics = ReportMetrics::new();
        let mut transport = Transport::new(MAX_BUFFER_SIZE, metrics.clone());
        transport.attach(Reset, "flaky");
        transport.add_to_send_buffer(b"hello\n").unwrap();

        let err = transport.send().unwrap_err();
        assert!(matches!(err, ReportError::Send { pending: 6, .. }));
        assert!(!transport.is_enabled());
        assert_eq!(transport.buffered(), 0);
        assert_eq!(metrics.flushes.get(), 0);

        transport.add_to_send_buffer(b"ignored\n").unwrap();
        assert_eq!(transport.buffered(), 0);
    }

    #[test]
    fn close_flushes_remaining_bytes() {
        let sink = CaptureBuffer::new();
        let metrics = ReportMetrics::new();
        let mut transport = Transport::new(MAX_BUFFER_SIZE, metrics.clone());
        transport.attach(sink.clone(), "memory");
        transport.add_to_send_buffer(b"tail\n").unwrap();

        transport.close();
        transport.close();
        assert_eq!(sink.contents(), "tail\n");
        assert!(!transport.is_enabled());
        assert_eq!(metrics.flushes.get(), 1);
    }

    #[test]
    fn connect_refused_leaves_transport_disabled() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = transport();
        let err = transport.connect("127.0.0.1", port).unwrap_err();
        assert!(matches!(err, ReportError::Connection { .. }));
        assert!(!transport.is_enabled());
    }

    proptest! {
        #[test]
        fn buffer_never_exceeds_capacity_without_flush(
            sizes in proptest::collection::vec(1usize..600, 1..60)
        ) {
            let sink = CaptureBuffer::new();
            let mut transport = transport();
            transport.attach(sink.clone(), "memory");
            let mut total = 0;
            for size in sizes {
                let before = sink.bytes().len();
                transport.add_to_send_buffer(&vec![b'z'; size]).unwrap();
                total += size;
                if sink.bytes().len() == before {
                    prop_assert!(transport.buffered() <= MAX_BUFFER_SIZE);
                } else {
                    prop_assert_eq!(transport.buffered(), 0);
                }
            }
            prop_assert_eq!(sink.bytes().len() + transport.buffered(), total);
        }
    }
}
