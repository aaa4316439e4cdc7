//! Element identity allocation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Internal identity handed out at registration and used to tag events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u64);

impl ElementId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The result of one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredElement {
    pub id: ElementId,
    pub element_type: String,
    pub external_id: i64,
}

/// Sequential id allocator. Registrations are never deduplicated: the same
/// (type, external id) pair gets a fresh id every time.
#[derive(Debug, Default)]
pub struct Registry {
    next: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, element_type: &str, external_id: i64) -> RegisteredElement {
        let id = ElementId(self.next);
        self.next += 1;
        RegisteredElement {
            id,
            element_type: element_type.to_string(),
            external_id,
        }
    }

    /// Number of registrations performed so far.
    pub fn registered(&self) -> u64 {
        self.next
    }
}
