//! Mutex-guarded session for engines that report from several threads.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::session::ReportingSession;

/// Cloneable handle serializing all access to one [`ReportingSession`].
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<ReportingSession>>,
}

impl SharedSession {
    pub fn new(session: ReportingSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Locks the session for a sequence of calls that must not interleave.
    pub fn lock(&self) -> MutexGuard<'_, ReportingSession> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut ReportingSession) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl From<ReportingSession> for SharedSession {
    fn from(session: ReportingSession) -> Self {
        Self::new(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn concurrent_registrations_get_unique_ids() {
        let shared = SharedSession::new(ReportingSession::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let shared = shared.clone();
                thread::spawn(move || {
                    (0..50)
                        .map(|n| {
                            shared
                                .with(|s| s.register_element("Queue", worker * 100 + n))
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|id| id.get())
            .collect();
        assert_eq!(ids.len(), 200);
        assert_eq!(ids.iter().max(), Some(&199));
        assert_eq!(shared.lock().registered_elements(), 200);
    }
}
