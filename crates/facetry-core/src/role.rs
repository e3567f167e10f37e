//! Traffic role of a host

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host role
///
/// The service exposes two host lists:
/// - Read: search, browse and multi-query traffic
/// - Write: indexing and settings traffic
///
/// A host name may appear in both lists; each entry keeps its own failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostRole {
    Read,
    Write,
}

impl HostRole {
    /// Returns true if this is the read role
    pub fn is_read(&self) -> bool {
        matches!(self, HostRole::Read)
    }

    /// Returns true if this is the write role
    pub fn is_write(&self) -> bool {
        matches!(self, HostRole::Write)
    }
}

impl fmt::Display for HostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRole::Read => write!(f, "read"),
            HostRole::Write => write!(f, "write"),
        }
    }
}
