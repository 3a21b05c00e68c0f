//! Types shared across the scheduling and lecturer subsystems.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier issued by the remote collaborator.
///
/// The server hands out integer ids today, but nothing in the data layer
/// depends on that, so string ids are accepted as well and written back in
/// whatever form they arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{id}"),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the UI boundary (the snackbar in the admin tool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Result of a read whose response may have been superseded while in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// The response belonged to the latest request and was applied.
    Applied(T),
    /// A newer request was issued before this one returned; nothing changed.
    Stale,
    /// The request failed. The affected view falls back to an empty result.
    Failed(Notice),
}

impl<T> FetchOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, FetchOutcome::Applied(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, FetchOutcome::Stale)
    }

    /// Returns the applied value, if any.
    pub fn applied(self) -> Option<T> {
        match self {
            FetchOutcome::Applied(value) => Some(value),
            _ => None,
        }
    }
}
