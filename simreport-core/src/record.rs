//! Wire records and their framing.
//!
//! Records travel as JSON lines: one `serde_json` object per record, each
//! terminated by `\n`. JSON escaping keeps raw newlines out of the payload,
//! so a collector can split the stream on `\n` no matter where a buffer
//! flush cut it.

use bytes::{Buf, BytesMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::registry::ElementId;
use crate::sink::Qualifier;

/// One unit of reporting output, independent of the sink it goes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    RunStart {
        run: String,
        started_at: DateTime<Utc>,
    },
    Element {
        id: ElementId,
        element_type: String,
        external_id: i64,
    },
    Event {
        element: ElementId,
        event: String,
        data: String,
        sim_time_ns: u64,
        at: DateTime<Utc>,
    },
    Attribute {
        element: ElementId,
        name: String,
        value: String,
    },
    Log {
        notable: bool,
        message: String,
        at: DateTime<Utc>,
    },
    RunEnd {
        run: Option<String>,
        ended_at: DateTime<Utc>,
    },
}

impl Record {
    pub fn log(qualifier: Qualifier, message: impl Into<String>) -> Self {
        Record::Log {
            notable: qualifier.is_notable(),
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Record::RunStart { .. } => "run_start",
            Record::Element { .. } => "element",
            Record::Event { .. } => "event",
            Record::Attribute { .. } => "attribute",
            Record::Log { .. } => "log",
            Record::RunEnd { .. } => "run_end",
        }
    }

    /// Short tag used in logfile lines.
    pub fn tag(&self) -> &'static str {
        match self {
            Record::Log { notable, .. } => Qualifier::from(*notable).label(),
            Record::RunStart { .. } => "RUN",
            Record::Element { .. } => "ELEMENT",
            Record::Event { .. } => "EVENT",
            Record::Attribute { .. } => "ATTR",
            Record::RunEnd { .. } => "END",
        }
    }

    /// Human-readable rendering for the console and logfile sinks.
    pub fn text(&self) -> String {
        match self {
            Record::RunStart { run, .. } => format!("Starting run {run}"),
            Record::Element {
                id,
                element_type,
                external_id,
            } => format!("Registered {element_type} {external_id} as element {id}"),
            Record::Event {
                element,
                event,
                data,
                sim_time_ns,
                ..
            } => format!("@{sim_time_ns}ns element {element} {event}: {data}"),
            Record::Attribute {
                element,
                name,
                value,
            } => format!("element {element} {name} = {value}"),
            Record::Log { message, .. } => message.clone(),
            Record::RunEnd { run: Some(run), .. } => format!("Finished run {run}"),
            Record::RunEnd { run: None, .. } => "Session closed".to_string(),
        }
    }

    /// Encodes the record as one newline-terminated JSON line.
    pub fn frame(&self) -> Result<Vec<u8>, ReportError> {
        let mut frame = serde_json::to_vec(self)?;
        frame.push(b'\n');
        Ok(frame)
    }
}

/// Collector-side reassembly of records from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes. Complete records become available through
    /// [`FrameDecoder::next_record`].
    pub fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Returns the next complete record, or `None` if only a partial line is
    /// buffered. A malformed line is consumed and reported as an error.
    pub fn next_record(&mut self) -> Option<Result<Record, ReportError>> {
        loop {
            let end = self.pending.iter().position(|b| *b == b'\n')?;
            let line = self.pending.split_to(end);
            self.pending.advance(1);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(
                serde_json::from_slice(&line).map_err(|e| ReportError::Decode(e.to_string())),
            );
        }
    }

    /// Iterates over every complete record currently buffered.
    pub fn drain(&mut self) -> impl Iterator<Item = Result<Record, ReportError>> + '_ {
        std::iter::from_fn(move || self.next_record())
    }

    /// Bytes of an incomplete trailing record.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
