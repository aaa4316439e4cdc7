//! # simreport-core
//!
//! Reporting client for discrete-event simulations. The engine registers the
//! elements it simulates, then reports events, attributes and log lines
//! about them. Each record is routed to any combination of four sinks:
//!
//! - standard output and standard error,
//! - a timestamped, append-only run logfile,
//! - a remote collector reached over TCP, fed newline-delimited JSON records
//!   through a send buffer that is flushed once it exceeds 1000 bytes.
//!
//! A failing sink is switched off for the rest of the run; reporting never
//! brings the simulation down. The one deliberate exit path is
//! [`ReportingSession::fatal`].
//!
//! ```no_run
//! use simreport_core::prelude::*;
//!
//! let mut session = ReportingSession::new();
//! let _ = session.connect("127.0.0.1", 9900);
//! session.start_run("mesh_4x4")?;
//! let router = session.register_element("Router", 5)?;
//! session.report_event(router, "flit_in", "vc=1")?;
//! session.log_to(Qualifier::Notable, "buffer overflow", SinkMask::CONSOLE | SinkMask::ERR)?;
//! session.close();
//! # Ok::<(), ReportError>(())
//! ```

pub mod console;
pub mod error;
pub mod logfile;
pub mod record;
pub mod registry;
pub mod router;
pub mod session;
pub mod shared;
pub mod sink;
pub mod time;
pub mod transport;

pub mod prelude {
    pub use crate::error::{FatalCondition, ReportError};
    pub use crate::registry::ElementId;
    pub use crate::session::{ReportingSession, SessionState};
    pub use crate::shared::SharedSession;
    pub use crate::sink::{Qualifier, SinkMask};
    pub use crate::time::SimClock;
}

pub use console::{CaptureBuffer, Console};
pub use error::{FatalCondition, ReportError};
pub use record::{FrameDecoder, Record};
pub use registry::{ElementId, RegisteredElement, Registry};
pub use session::{ReportingSession, SessionBuilder, SessionState};
pub use shared::SharedSession;
pub use sink::{Qualifier, SinkMask};
pub use time::SimClock;
pub use transport::{Transport, MAX_BUFFER_SIZE};
